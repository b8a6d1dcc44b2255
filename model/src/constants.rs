/// Helper macro to avoid retyping the Kubernetes well-known label domain when creating further
/// string constants from it. When given no parameters, this returns the domain. When given a
/// string literal parameter it adds `/parameter` to the end.
macro_rules! k8s_io {
    () => {
        "kubernetes.io"
    };
    ($s:literal) => {
        concat!(k8s_io!(), "/", $s)
    };
}

/// Helper macro for the ARNs of AWS managed IAM policies.
macro_rules! aws_managed_policy {
    ($s:literal) => {
        concat!("arn:aws:iam::aws:policy/", $s)
    };
}

// Subnet discovery tags
pub const TAG_CLUSTER_PREFIX: &str = k8s_io!("cluster");
pub const TAG_CLUSTER_SHARED: &str = "shared";
pub const TAG_ROLE_ELB: &str = k8s_io!("role/elb");
pub const TAG_ROLE_INTERNAL_ELB: &str = k8s_io!("role/internal-elb");
pub const TAG_ROLE_ENABLED: &str = "1";

// AWS managed policies
pub const EKS_CLUSTER_POLICY: &str = aws_managed_policy!("AmazonEKSClusterPolicy");
pub const EKS_WORKER_NODE_POLICY: &str = aws_managed_policy!("AmazonEKSWorkerNodePolicy");
pub const EKS_CNI_POLICY: &str = aws_managed_policy!("AmazonEKS_CNI_Policy");
pub const EC2_CONTAINER_REGISTRY_READONLY: &str =
    aws_managed_policy!("AmazonEC2ContainerRegistryReadOnly");
pub const ELB_FULL_ACCESS: &str = aws_managed_policy!("ElasticLoadBalancingFullAccess");

// IAM
pub const IAM_POLICY_VERSION: &str = "2012-10-17";
pub const EKS_SERVICE_PRINCIPAL: &str = "eks.amazonaws.com";
pub const EC2_SERVICE_PRINCIPAL: &str = "ec2.amazonaws.com";

// OIDC
pub const OIDC_CLIENT_ID: &str = "sts.amazonaws.com";
pub const OIDC_THUMBPRINT: &str = "9e99a48a9960b14926bb7f3b02e22da2b0ab7280";

// Network
pub const DEFAULT_EGRESS_CIDR: &str = "0.0.0.0/0";
pub const HTTPS_PORT: u16 = 443;
pub const AWS_SERVICE_ENDPOINTS: [&str; 3] = ["s3", "ec2", "sts"];

// Control plane logging
pub const CLUSTER_LOG_TYPES: [&str; 5] = [
    "api",
    "audit",
    "authenticator",
    "controllerManager",
    "scheduler",
];

// Cluster secrets encryption
pub const ENCRYPTED_RESOURCES: [&str; 1] = ["secrets"];

// AWS Load Balancer Controller
pub const ALB_CONTROLLER_NAMESPACE: &str = "kube-system";
pub const ALB_CONTROLLER_SERVICE_ACCOUNT: &str = "aws-load-balancer-controller";
pub const ALB_CONTROLLER_CHART: &str = "aws-load-balancer-controller";
pub const ALB_CONTROLLER_CHART_VERSION: &str = "1.6.1";
pub const ALB_CONTROLLER_CHART_REPOSITORY: &str = "https://aws.github.io/eks-charts";
pub const ANNOTATION_ROLE_ARN: &str = "eks.amazonaws.com/role-arn";

#[test]
fn constants_macro_test() {
    assert_eq!("kubernetes.io", k8s_io!());
    assert_eq!("kubernetes.io/role/elb", TAG_ROLE_ELB);
    assert_eq!("kubernetes.io/role/internal-elb", TAG_ROLE_INTERNAL_ELB);
    assert_eq!(
        "arn:aws:iam::aws:policy/AmazonEKS_CNI_Policy",
        EKS_CNI_POLICY
    );
}

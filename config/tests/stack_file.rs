use eksplan_config::{AmiType, ConfigResolver, Error, StackFile};
use std::path::PathBuf;

fn data(file: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(file)
}

#[test]
fn resolve_staging_stack_file() {
    let path = data("Pulumi.staging.yaml");
    let stack = StackFile::from_path(&path).unwrap();
    let environment = StackFile::stack_name(&path).unwrap();
    let resolved = ConfigResolver::new(&stack).resolve(&environment).unwrap();

    assert_eq!(resolved.environment, "staging");
    assert_eq!(resolved.cluster_name(), "eks-cluster-staging");
    assert_eq!(resolved.region, "us-west-2");
    assert_eq!(resolved.environment_config.instance_type, "t3.medium");
    assert_eq!(resolved.environment_config.min_size, 1);
    assert_eq!(resolved.environment_config.desired_size, 2);
    assert_eq!(resolved.environment_config.max_size, 3);
    assert_eq!(resolved.environment_config.nat_gateways, 1);
    assert_eq!(resolved.common.node_ami_type, AmiType::Al2023X86_64Standard);
    assert!(resolved.common.enable_vpc_endpoints);
    assert!(resolved.common.enable_cluster_logging);
    assert!(resolved.common.enable_public_endpoint);

    let json = serde_json::to_value(&resolved).unwrap();
    assert_eq!(json["environmentConfig"]["kubernetesVersion"], "1.28");
    assert_eq!(json["common"]["vpcCidr"], "10.0.0.0/16");
    assert_eq!(json["tags"]["CostCenter"], "engineering");
}

#[test]
fn missing_stack_file() {
    let err = StackFile::from_path(data("Pulumi.missing.yaml")).unwrap_err();
    assert!(matches!(err, Error::StackFileRead { .. }));
}

use assert_cmd::Command;
use serde_json::Value;

fn json_output(args: &[&str]) -> Value {
    let mut cmd = Command::cargo_bin("eksplan").unwrap();
    cmd.args(args);
    let output = cmd.output().unwrap();
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn plan_json() {
    let path = data::staging_stack_path();
    let plan = json_output(&["plan", "--stack-file", path.to_str().unwrap(), "--json"]);
    let plan = plan.as_array().unwrap();
    let vpc = plan
        .iter()
        .find(|row| row["name"] == "eks-vpc-staging")
        .unwrap();
    assert_eq!(vpc["stage"], 1);
    assert_eq!(vpc["kind"], "vpc");
    assert!(plan.iter().any(|row| row["name"] == "s3-endpoint-staging"));
    let cluster = plan
        .iter()
        .find(|row| row["name"] == "eks-cluster-staging")
        .unwrap();
    assert!(cluster["dependsOn"]
        .as_array()
        .unwrap()
        .contains(&Value::from("eks-cluster-role-staging")));
}

#[test]
fn plan_table() {
    let path = data::staging_stack_path();
    let mut cmd = Command::cargo_bin("eksplan").unwrap();
    cmd.args(&["plan", "--stack-file", path.to_str().unwrap()]);
    let output = cmd.output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("STAGE"));
    assert!(stdout.contains("eks-nodegroup-staging"));
}

#[test]
fn preview_outputs() {
    let path = data::staging_stack_path();
    let outputs = json_output(&["preview", "--stack-file", path.to_str().unwrap()]);
    assert_eq!(outputs["clusterName"], "eks-cluster-staging");
    assert_eq!(
        outputs["kubectlCommand"],
        "aws eks update-kubeconfig --name eks-cluster-staging --region us-west-2"
    );
    assert_eq!(outputs["privateSubnetIds"].as_array().unwrap().len(), 3);
    assert!(outputs.get("albControllerRoleArn").is_none());
}

#[test]
fn explicit_stack_name() {
    let path = data::staging_stack_path();
    let outputs = json_output(&[
        "preview",
        "--stack-file",
        path.to_str().unwrap(),
        "--stack",
        "dev",
        "--account-id",
        "111122223333",
    ]);
    assert_eq!(outputs["clusterName"], "eks-cluster-dev");
    assert!(outputs["clusterArn"]
        .as_str()
        .unwrap()
        .starts_with("arn:aws:eks:us-west-2:111122223333:cluster/"));
}

#[test]
fn missing_stack_file() {
    let mut cmd = Command::cargo_bin("eksplan").unwrap();
    cmd.args(&["plan", "--stack-file", "/nonexistent/Pulumi.dev.yaml"]);
    cmd.assert().failure();
}

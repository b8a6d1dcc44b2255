use crate::cidr::Ipv4Cidr;
use crate::error::{self, Result};
use crate::source::ConfigSource;
use crate::types::{AmiType, CommonConfig, EnvironmentConfig, K8sVersion};
use eksplan_model::Tags;
use log::{debug, trace};
use serde::Serialize;
use snafu::{ensure, OptionExt};
use std::fmt::Display;
use std::str::FromStr;

/// The namespace of every key this resolver reads, except the region.
pub const NAMESPACE: &str = "eks";
pub const REGION_KEY: &str = "aws:region";
pub const DEFAULT_REGION: &str = "us-west-2";
pub const DEFAULT_NODE_DISK_SIZE: u32 = 100;
pub const DEFAULT_VPC_CIDR: &str = "10.0.0.0/16";
pub const DEFAULT_VPC_MAX_AZS: u32 = 3;
/// The longest accepted environment name. Node names add at most 33 characters to it and may
/// not exceed 128.
pub const MAX_ENVIRONMENT_LEN: usize = 64;

const REFERENCE_MARKER: &str = "${";

/// Everything the blueprint needs, validated.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedConfig {
    pub environment: String,
    pub region: String,
    pub environment_config: EnvironmentConfig,
    pub common: CommonConfig,
    pub tags: Tags,
}

impl ResolvedConfig {
    /// The physical name of the EKS cluster, `<prefix>-<environment>`.
    pub fn cluster_name(&self) -> String {
        format!("{}-{}", self.common.cluster_name_prefix, self.environment)
    }

    /// The names of the availability zones in use, `<region>a`, `<region>b`, ...
    pub fn availability_zones(&self) -> Vec<String> {
        (b'a'..=b'z')
            .take(self.common.vpc_max_azs as usize)
            .map(|letter| format!("{}{}", self.region, letter as char))
            .collect()
    }
}

/// Reads the `eks:` keys of a [`ConfigSource`] for one environment (stack) and validates them.
pub struct ConfigResolver<'a, S: ConfigSource + ?Sized> {
    source: &'a S,
}

impl<'a, S: ConfigSource + ?Sized> ConfigResolver<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self { source }
    }

    pub fn resolve(&self, environment: &str) -> Result<ResolvedConfig> {
        ensure!(
            is_valid_environment(environment),
            error::InvalidEnvironmentSnafu { environment }
        );

        let environment_config = self.environment_config()?;
        let common = self.common_config()?;
        let tags = Tags {
            environment: environment.to_string(),
            project: self.required("project-name")?,
            managed_by: self.required("managed-by")?,
            cost_center: self.required("cost-center")?,
        };
        let region = literal(REGION_KEY, self.source.get(REGION_KEY))?
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        validate(&environment_config, &common)?;

        let resolved = ResolvedConfig {
            environment: environment.to_string(),
            region,
            environment_config,
            common,
            tags,
        };
        debug!(
            "Resolved configuration for environment '{}' (cluster '{}')",
            resolved.environment,
            resolved.cluster_name()
        );
        Ok(resolved)
    }

    pub fn environment_config(&self) -> Result<EnvironmentConfig> {
        Ok(EnvironmentConfig {
            instance_type: self.required("instance-type")?,
            min_size: self.required_parsed("min-size", "a positive integer")?,
            max_size: self.required_parsed("max-size", "a positive integer")?,
            desired_size: self.required_parsed("desired-size", "a positive integer")?,
            nat_gateways: self.required_parsed("nat-gateways", "a positive integer")?,
            kubernetes_version: self.required_parsed::<K8sVersion>(
                "kubernetes-version",
                "a Kubernetes version such as 1.28",
            )?,
        })
    }

    pub fn common_config(&self) -> Result<CommonConfig> {
        let default_cidr = DEFAULT_VPC_CIDR.parse::<Ipv4Cidr>().map_err(|reason| {
            error::InvalidValueSnafu {
                key: key("vpc-cidr"),
                value: DEFAULT_VPC_CIDR,
                expected: "an IPv4 CIDR block",
                reason,
            }
            .build()
        })?;
        Ok(CommonConfig {
            node_disk_size: self.optional_parsed(
                "node-disk-size",
                "a size in GiB",
                DEFAULT_NODE_DISK_SIZE,
            )?,
            node_ami_type: self.optional_parsed(
                "node-ami-type",
                "an EKS AMI type such as AL2023_x86_64_STANDARD",
                AmiType::default(),
            )?,
            vpc_cidr: self.optional_parsed("vpc-cidr", "an IPv4 CIDR block", default_cidr)?,
            vpc_max_azs: self.optional_parsed(
                "vpc-max-azs",
                "a number of availability zones",
                DEFAULT_VPC_MAX_AZS,
            )?,
            enable_vpc_endpoints: self.flag("enable-vpc-endpoints", false)?,
            enable_cluster_logging: self.flag("enable-cluster-logging", false)?,
            enable_public_endpoint: self.flag("enable-public-endpoint", true)?,
            enable_private_endpoint: self.flag("enable-private-endpoint", false)?,
            enable_alb_controller: self.flag("enable-alb-controller", false)?,
            enable_encryption: self.flag("enable-encryption", false)?,
            kms_key_id: self.optional("kms-key-id")?,
            cluster_name_prefix: self.required("cluster-name-prefix")?,
        })
    }

    /// The value of `eks:<name>`, treating an empty string as absent.
    fn optional(&self, name: &str) -> Result<Option<String>> {
        let key = key(name);
        let value = literal(&key, self.source.get(&key))?;
        trace_value(name, &value);
        Ok(value)
    }

    fn required(&self, name: &str) -> Result<String> {
        self.optional(name)?
            .context(error::MissingConfigurationSnafu { key: key(name) })
    }

    fn required_parsed<T>(&self, name: &str, expected: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        let value = self.required(name)?;
        parse(name, &value, expected)
    }

    fn optional_parsed<T>(&self, name: &str, expected: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.optional(name)? {
            Some(value) => parse(name, &value, expected),
            None => Ok(default),
        }
    }

    fn flag(&self, name: &str, default: bool) -> Result<bool> {
        self.optional_parsed(name, "true or false", default)
    }
}

fn key(name: &str) -> String {
    format!("{}:{}", NAMESPACE, name)
}

/// Configuration values are literals. A value that looks like a reference to another resource's
/// attribute would be resolved as one once it reaches the graph, so it is rejected here.
fn literal(key: &str, value: Option<String>) -> Result<Option<String>> {
    match value {
        Some(value) if value.contains(REFERENCE_MARKER) => error::InvalidValueSnafu {
            key,
            value,
            expected: "a literal value",
            reason: format!("'{}' is reserved for resource references", REFERENCE_MARKER),
        }
        .fail(),
        Some(value) if value.is_empty() => Ok(None),
        value => Ok(value),
    }
}

fn trace_value(name: &str, value: &Option<String>) {
    match value {
        Some(value) => trace!("Configuration '{}' = '{}'", key(name), value),
        None => trace!("Configuration '{}' is not set", key(name)),
    }
}

fn parse<T>(name: &str, value: &str, expected: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    value.trim().parse::<T>().map_err(|e| {
        error::InvalidValueSnafu {
            key: key(name),
            value,
            expected,
            reason: e.to_string(),
        }
        .build()
    })
}

fn is_valid_environment(environment: &str) -> bool {
    !environment.is_empty()
        && environment.len() <= MAX_ENVIRONMENT_LEN
        && !environment.starts_with('-')
        && !environment.ends_with('-')
        && environment
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

fn validate(environment: &EnvironmentConfig, common: &CommonConfig) -> Result<()> {
    let sizing = |reason: &str| {
        error::InvalidSizingSnafu {
            min_size: environment.min_size,
            desired_size: environment.desired_size,
            max_size: environment.max_size,
            reason,
        }
        .fail()
    };
    if environment.min_size < 1 {
        return sizing("min_size must be at least 1");
    }
    if environment.min_size > environment.max_size {
        return sizing("min_size cannot be greater than max_size");
    }
    if environment.desired_size < environment.min_size {
        return sizing("desired_size cannot be less than min_size");
    }
    if environment.desired_size > environment.max_size {
        return sizing("desired_size cannot be greater than max_size");
    }

    ensure!(
        environment.nat_gateways >= 1 && environment.nat_gateways <= common.vpc_max_azs,
        error::InvalidNatTopologySnafu {
            nat_gateways: environment.nat_gateways,
            vpc_max_azs: common.vpc_max_azs,
        }
    );

    ensure!(
        common.kms_key_id.is_none() || common.enable_encryption,
        error::InvalidEncryptionConfigSnafu
    );

    let azs = |reason: &str| {
        error::InvalidAvailabilityZonesSnafu {
            vpc_max_azs: common.vpc_max_azs,
            vpc_cidr: common.vpc_cidr.to_string(),
            reason,
        }
        .fail()
    };
    if common.vpc_max_azs == 0 {
        return azs("at least one availability zone is required");
    }
    if common.vpc_max_azs > 26 {
        return azs("no more than 26 availability zones can be named");
    }
    if common.vpc_cidr.split(common.vpc_max_azs * 2).is_none() {
        return azs("the VPC block is too small for a public and a private /28 per zone");
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::{is_valid_environment, ConfigResolver, DEFAULT_REGION, MAX_ENVIRONMENT_LEN};
    use crate::error::Error;
    use crate::types::{AmiType, K8sVersion};
    use maplit::btreemap;
    use std::collections::BTreeMap;

    fn staging() -> BTreeMap<String, String> {
        btreemap! {
            "eks:instance-type".to_string() => "t3.medium".to_string(),
            "eks:min-size".to_string() => "1".to_string(),
            "eks:max-size".to_string() => "3".to_string(),
            "eks:desired-size".to_string() => "2".to_string(),
            "eks:nat-gateways".to_string() => "1".to_string(),
            "eks:kubernetes-version".to_string() => "1.28".to_string(),
            "eks:cluster-name-prefix".to_string() => "eks-cluster".to_string(),
            "eks:project-name".to_string() => "eks-pulumi".to_string(),
            "eks:managed-by".to_string() => "pulumi".to_string(),
            "eks:cost-center".to_string() => "engineering".to_string(),
        }
    }

    fn with(mut config: BTreeMap<String, String>, key: &str, value: &str) -> BTreeMap<String, String> {
        config.insert(key.to_string(), value.to_string());
        config
    }

    #[test]
    fn defaults() {
        let config = staging();
        let resolved = ConfigResolver::new(&config).resolve("staging").unwrap();
        assert_eq!(resolved.cluster_name(), "eks-cluster-staging");
        assert_eq!(resolved.region, DEFAULT_REGION);
        assert_eq!(resolved.tags.environment, "staging");
        assert_eq!(resolved.tags.project, "eks-pulumi");
        let common = &resolved.common;
        assert_eq!(common.node_disk_size, 100);
        assert_eq!(common.node_ami_type, AmiType::Al2023X86_64Standard);
        assert_eq!(common.vpc_cidr.to_string(), "10.0.0.0/16");
        assert_eq!(common.vpc_max_azs, 3);
        assert!(common.enable_public_endpoint);
        assert!(!common.enable_private_endpoint);
        assert!(!common.enable_vpc_endpoints);
        assert!(!common.enable_cluster_logging);
        assert!(!common.enable_alb_controller);
        assert!(!common.enable_encryption);
        assert!(common.kms_key_id.is_none());
        assert_eq!(
            resolved.environment_config.kubernetes_version,
            K8sVersion::new(1, 28, None)
        );
        assert_eq!(
            resolved.availability_zones(),
            vec!["us-west-2a", "us-west-2b", "us-west-2c"]
        );
    }

    #[test]
    fn explicit_false_public_endpoint_is_honored() {
        let config = with(staging(), "eks:enable-public-endpoint", "false");
        let resolved = ConfigResolver::new(&config).resolve("staging").unwrap();
        assert!(!resolved.common.enable_public_endpoint);
    }

    #[test]
    fn missing_required_key() {
        let mut config = staging();
        config.remove("eks:cost-center");
        let err = ConfigResolver::new(&config).resolve("staging").unwrap_err();
        assert!(matches!(err, Error::MissingConfiguration { key } if key == "eks:cost-center"));

        let config = with(staging(), "eks:instance-type", "");
        let err = ConfigResolver::new(&config).resolve("staging").unwrap_err();
        assert!(matches!(err, Error::MissingConfiguration { key } if key == "eks:instance-type"));
    }

    #[test]
    fn invalid_values() {
        for (key, value) in [
            ("eks:min-size", "one"),
            ("eks:min-size", "-1"),
            ("eks:enable-alb-controller", "yes"),
            ("eks:node-ami-type", "WINDOWS"),
            ("eks:vpc-cidr", "10.0.0.0"),
            ("eks:kubernetes-version", "latest"),
        ] {
            let config = with(staging(), key, value);
            let err = ConfigResolver::new(&config).resolve("staging").unwrap_err();
            assert!(
                matches!(&err, Error::InvalidValue { key: k, .. } if k == key),
                "{}: {}",
                key,
                err
            );
        }
    }

    #[test]
    fn sizing() {
        for (min, desired, max) in [("4", "4", "3"), ("2", "1", "3"), ("1", "4", "3"), ("0", "0", "3")] {
            let config = with(
                with(with(staging(), "eks:min-size", min), "eks:desired-size", desired),
                "eks:max-size",
                max,
            );
            let err = ConfigResolver::new(&config).resolve("staging").unwrap_err();
            assert!(matches!(err, Error::InvalidSizing { .. }), "{}", err);
        }
        let config = with(
            with(with(staging(), "eks:min-size", "3"), "eks:desired-size", "3"),
            "eks:max-size",
            "3",
        );
        assert!(ConfigResolver::new(&config).resolve("staging").is_ok());
    }

    #[test]
    fn nat_topology() {
        for nat in ["0", "4"] {
            let config = with(staging(), "eks:nat-gateways", nat);
            let err = ConfigResolver::new(&config).resolve("staging").unwrap_err();
            assert!(matches!(err, Error::InvalidNatTopology { .. }), "{}", err);
        }
        let config = with(
            with(staging(), "eks:nat-gateways", "2"),
            "eks:vpc-max-azs",
            "2",
        );
        assert!(ConfigResolver::new(&config).resolve("staging").is_ok());
    }

    #[test]
    fn kms_requires_encryption() {
        let config = with(staging(), "eks:kms-key-id", "arn:aws:kms:us-west-2:111122223333:key/abc");
        let err = ConfigResolver::new(&config).resolve("staging").unwrap_err();
        assert!(matches!(err, Error::InvalidEncryptionConfig { .. }));

        let config = with(config, "eks:enable-encryption", "true");
        let resolved = ConfigResolver::new(&config).resolve("staging").unwrap();
        assert!(resolved.common.enable_encryption);
    }

    #[test]
    fn availability_zones() {
        let config = with(staging(), "eks:vpc-max-azs", "0");
        let err = ConfigResolver::new(&config).resolve("staging").unwrap_err();
        // nat-gateways (1) exceeds vpc-max-azs (0) first.
        assert!(matches!(err, Error::InvalidNatTopology { .. }));

        let config = with(staging(), "eks:vpc-cidr", "10.0.0.0/26");
        let err = ConfigResolver::new(&config).resolve("staging").unwrap_err();
        assert!(matches!(err, Error::InvalidAvailabilityZones { .. }), "{}", err);
    }

    #[test]
    fn environments() {
        assert!(is_valid_environment("staging"));
        assert!(is_valid_environment("prod-2"));
        assert!(!is_valid_environment(""));
        assert!(!is_valid_environment("Prod"));
        assert!(!is_valid_environment("dev_1"));
        assert!(!is_valid_environment("-dev"));
        let config = staging();
        let err = ConfigResolver::new(&config).resolve("Staging").unwrap_err();
        assert!(matches!(err, Error::InvalidEnvironment { .. }));
    }

    #[test]
    fn long_environment_names() {
        let config = staging();
        let longest = "e".repeat(MAX_ENVIRONMENT_LEN);
        assert!(ConfigResolver::new(&config).resolve(&longest).is_ok());
        let too_long = "e".repeat(MAX_ENVIRONMENT_LEN + 1);
        let err = ConfigResolver::new(&config).resolve(&too_long).unwrap_err();
        assert!(matches!(err, Error::InvalidEnvironment { .. }), "{}", err);
    }

    #[test]
    fn values_cannot_reference_resources() {
        for key in [
            "eks:project-name",
            "eks:managed-by",
            "eks:cost-center",
            "eks:cluster-name-prefix",
            "eks:instance-type",
            "eks:kms-key-id",
            "aws:region",
        ] {
            for value in ["${eks-vpc-staging.id}", "prefix-${nope.x}"] {
                let config = with(staging(), key, value);
                let err = ConfigResolver::new(&config).resolve("staging").unwrap_err();
                assert!(
                    matches!(&err, Error::InvalidValue { key: k, .. } if k == key),
                    "{} = {}: {}",
                    key,
                    value,
                    err
                );
            }
        }
        // A lone '$' or brace is fine.
        let config = with(staging(), "eks:cost-center", "r&d $1 {ops}");
        let resolved = ConfigResolver::new(&config).resolve("staging").unwrap();
        assert_eq!(resolved.tags.cost_center, "r&d $1 {ops}");
    }
}

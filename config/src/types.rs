use crate::cidr::Ipv4Cidr;
use serde::{Deserialize, Serialize};
use serde_plain::{
    derive_deserialize_from_fromstr, derive_display_from_serialize,
    derive_fromstr_from_deserialize, derive_serialize_from_display,
};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// The sizing and version settings that differ from one environment to the next.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentConfig {
    pub instance_type: String,
    pub min_size: u32,
    pub max_size: u32,
    pub desired_size: u32,
    pub nat_gateways: u32,
    pub kubernetes_version: K8sVersion,
}

/// Settings shared by every environment.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonConfig {
    pub node_disk_size: u32,
    pub node_ami_type: AmiType,
    pub vpc_cidr: Ipv4Cidr,
    pub vpc_max_azs: u32,
    pub enable_vpc_endpoints: bool,
    pub enable_cluster_logging: bool,
    pub enable_public_endpoint: bool,
    pub enable_private_endpoint: bool,
    pub enable_alb_controller: bool,
    pub enable_encryption: bool,
    pub kms_key_id: Option<String>,
    pub cluster_name_prefix: String,
}

/// The AMI family used by the managed node group.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum AmiType {
    #[serde(rename = "AL2_x86_64")]
    Al2X86_64,
    #[serde(rename = "AL2023_x86_64_STANDARD")]
    Al2023X86_64Standard,
    #[serde(rename = "BOTTLEROCKET_x86_64")]
    BottlerocketX86_64,
    #[serde(rename = "AL2_ARM_64")]
    Al2Arm64,
    #[serde(rename = "AL2023_ARM_64_STANDARD")]
    Al2023Arm64Standard,
    #[serde(rename = "BOTTLEROCKET_ARM_64")]
    BottlerocketArm64,
}

impl Default for AmiType {
    fn default() -> Self {
        Self::Al2023X86_64Standard
    }
}

derive_display_from_serialize!(AmiType);
derive_fromstr_from_deserialize!(AmiType);

/// A Kubernetes version such as `1.28`. A `v` prefix and a patch number are accepted when parsing
/// (`v1.28`, `1.28.3`), but EKS only takes the major and minor numbers.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct K8sVersion {
    major: u8,
    minor: u8,
    patch: Option<u8>,
}

impl K8sVersion {
    pub const fn new(major: u8, minor: u8, patch: Option<u8>) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// The version as EKS expects it, e.g. `1.28`.
    pub fn major_minor(&self) -> String {
        format!("{}.{}", self.major, self.minor)
    }

    pub fn parse<S: AsRef<str>>(s: S) -> Result<Self, String> {
        let original = s.as_ref();
        let version = original.strip_prefix('v').unwrap_or(original);
        let mut parts = version.split('.');
        let mut number = |which: &str| -> Result<u8, String> {
            parts
                .next()
                .filter(|part| !part.is_empty())
                .ok_or_else(|| format!("'{}' has no {} version number", original, which))?
                .parse::<u8>()
                .map_err(|e| format!("bad {} version number in '{}': {}", which, original, e))
        };
        let major = number("major")?;
        let minor = number("minor")?;
        let patch = match parts.next() {
            None => None,
            Some(patch) => Some(
                patch
                    .parse::<u8>()
                    .map_err(|e| format!("bad patch version number in '{}': {}", original, e))?,
            ),
        };
        if parts.next().is_some() {
            return Err(format!("'{}' has too many version components", original));
        }
        Ok(Self::new(major, minor, patch))
    }
}

impl Display for K8sVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.patch {
            Some(patch) => write!(f, "{}.{}.{}", self.major, self.minor, patch),
            None => write!(f, "{}.{}", self.major, self.minor),
        }
    }
}

impl FromStr for K8sVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        K8sVersion::parse(s)
    }
}

derive_serialize_from_display!(K8sVersion);
derive_deserialize_from_fromstr!(K8sVersion, "k8s version such as 1.28 or v1.28.3");

use snafu::Snafu;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

/// Configuration errors. Every one of them is raised before any resource is declared.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Required configuration '{}' is not set", key))]
    MissingConfiguration { key: String },

    #[snafu(display("Invalid value '{}' for '{}', expected {}: {}", value, key, expected, reason))]
    InvalidValue {
        key: String,
        value: String,
        expected: String,
        reason: String,
    },

    #[snafu(display(
        "Invalid node group sizing (min {}, desired {}, max {}): {}",
        min_size,
        desired_size,
        max_size,
        reason
    ))]
    InvalidSizing {
        min_size: u32,
        desired_size: u32,
        max_size: u32,
        reason: String,
    },

    #[snafu(display(
        "Invalid NAT topology: nat_gateways is {} but must be between 1 and vpc_max_azs ({})",
        nat_gateways,
        vpc_max_azs
    ))]
    InvalidNatTopology { nat_gateways: u32, vpc_max_azs: u32 },

    #[snafu(display("kms_key_id requires enable_encryption to be true"))]
    InvalidEncryptionConfig {},

    #[snafu(display(
        "Invalid environment '{}': up to 64 lowercase letters, digits and '-' are allowed",
        environment
    ))]
    InvalidEnvironment { environment: String },

    #[snafu(display(
        "Unable to place {} availability zones in '{}': {}",
        vpc_max_azs,
        vpc_cidr,
        reason
    ))]
    InvalidAvailabilityZones {
        vpc_max_azs: u32,
        vpc_cidr: String,
        reason: String,
    },

    #[snafu(display("Unable to read stack file '{}': {}", path.display(), source))]
    StackFileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display(
        "In stack file '{}', '{}' is read as the decimal number {}; quote the value to keep it as written, e.g. \"1.30\"",
        path.display(),
        key,
        value
    ))]
    StackFileDecimal {
        path: PathBuf,
        key: String,
        value: String,
    },

    #[snafu(display("Unable to parse stack file '{}': {}", path.display(), source))]
    StackFileParse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

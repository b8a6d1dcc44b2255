use crate::error::{self, Result};
use serde::Deserialize;
use serde_yaml::Value;
use snafu::{ensure, ResultExt};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

/// A flat key-value store of configuration. Keys are namespaced, e.g. `eks:min-size` or
/// `aws:region`.
pub trait ConfigSource {
    fn get(&self, key: &str) -> Option<String>;
}

impl ConfigSource for BTreeMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        BTreeMap::get(self, key).cloned()
    }
}

impl ConfigSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

impl<T: ConfigSource + ?Sized> ConfigSource for &T {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }
}

/// A Pulumi stack settings file (`Pulumi.<stack>.yaml`):
///
/// ```yaml
/// config:
///   aws:region: us-west-2
///   eks:instance-type: t3.medium
///   eks:min-size: 1
///   eks:enable-vpc-endpoints: true
/// ```
///
/// Strings, booleans and integers are converted to their string form. Decimal numbers must be
/// quoted. Structured values (including Pulumi's encrypted
/// `secure:` values) are not supported and read as absent.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct StackFile {
    #[serde(default)]
    config: BTreeMap<String, Value>,
}

impl StackFile {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).context(error::StackFileReadSnafu { path })?;
        Self::parse(&contents, path)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Self::parse(yaml, Path::new("<inline>"))
    }

    /// YAML reads an unquoted `1.30` as the float `1.3`. None of the settings is a decimal
    /// number, so such a value is rejected rather than silently changed.
    fn parse(yaml: &str, path: &Path) -> Result<Self> {
        let stack: Self = serde_yaml::from_str(yaml).context(error::StackFileParseSnafu { path })?;
        for (key, value) in &stack.config {
            if let Value::Number(number) = value {
                ensure!(
                    !number.is_f64(),
                    error::StackFileDecimalSnafu {
                        path,
                        key,
                        value: number.to_string(),
                    }
                );
            }
        }
        Ok(stack)
    }

    /// The stack name encoded in a stack file's name, e.g. `staging` for `Pulumi.staging.yaml`.
    pub fn stack_name<P: AsRef<Path>>(path: P) -> Option<String> {
        let file_name = path.as_ref().file_name()?.to_str()?;
        let stack = file_name
            .strip_prefix("Pulumi.")?
            .strip_suffix(".yaml")
            .or_else(|| file_name.strip_prefix("Pulumi.")?.strip_suffix(".yml"))?;
        if stack.is_empty() {
            None
        } else {
            Some(stack.to_string())
        }
    }
}

impl ConfigSource for StackFile {
    fn get(&self, key: &str) -> Option<String> {
        match self.config.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

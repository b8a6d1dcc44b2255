use anyhow::{Context, Result};
use clap::Parser;
use eksplan_blueprint::Blueprint;
use eksplan_config::{ConfigResolver, StackFile};
use log::info;
use std::path::PathBuf;

/// Arguments shared by every command that reads a stack file.
#[derive(Debug, Parser)]
pub(crate) struct StackArgs {
    /// Path to the stack file, e.g. `Pulumi.staging.yaml`.
    #[clap(long = "stack-file", short = 'f', parse(from_os_str))]
    stack_file: PathBuf,

    /// The environment to build. Defaults to the stack name in the file name.
    #[clap(long = "stack", short = 's')]
    stack: Option<String>,
}

impl StackArgs {
    /// Resolve the stack file into a blueprint.
    pub(crate) fn blueprint(&self) -> Result<Blueprint> {
        let environment = match &self.stack {
            Some(stack) => stack.clone(),
            None => StackFile::stack_name(&self.stack_file).context(format!(
                "Unable to determine the stack name from '{}', use --stack",
                self.stack_file.display()
            ))?,
        };
        let stack_file = StackFile::from_path(&self.stack_file)
            .context(format!("Unable to read '{}'", self.stack_file.display()))?;
        let config = ConfigResolver::new(&stack_file)
            .resolve(&environment)
            .context(format!(
                "Invalid configuration for environment '{}'",
                environment
            ))?;
        info!(
            "Resolved environment '{}' in region '{}'",
            environment, config.region
        );
        Blueprint::build(&config).context("Unable to build the blueprint")
    }
}

use crate::stack::StackArgs;
use anyhow::{Context, Result};
use clap::Parser;
use eksplan_blueprint::engine::LocalEngine;
use log::info;

/// Apply an environment with an in-memory engine and print the outputs it would export. The
/// identifiers are made up but stable for a given stack file.
#[derive(Debug, Parser)]
pub(crate) struct Preview {
    #[clap(flatten)]
    stack: StackArgs,

    /// The account id used in the generated ARNs.
    #[clap(long = "account-id")]
    account_id: Option<String>,
}

impl Preview {
    pub(crate) async fn run(self) -> Result<()> {
        let blueprint = self.stack.blueprint()?;
        let mut engine = LocalEngine::new(blueprint.config().region.as_str());
        if let Some(account_id) = self.account_id {
            engine = engine.with_account_id(account_id);
        }
        let deployment = blueprint
            .apply(&engine)
            .await
            .context("Unable to apply the blueprint")?;
        info!(
            "Created {} resources",
            deployment.report.created.len()
        );
        println!("{}", deployment.outputs);
        Ok(())
    }
}

use crate::stack::StackArgs;
use anyhow::{Context, Result};
use clap::Parser;
use eksplan_blueprint::PlannedNode;
use tabled::{Alignment, Full, MaxWidth, Modify, Style, Table, Tabled};
use terminal_size::{Height, Width};

/// Print the resources of an environment in the order they would be created.
#[derive(Debug, Parser)]
pub(crate) struct Plan {
    #[clap(flatten)]
    stack: StackArgs,

    /// Output the plan in JSON format.
    #[clap(long = "json")]
    json: bool,
}

impl Plan {
    pub(crate) fn run(self) -> Result<()> {
        let blueprint = self.stack.blueprint()?;
        let plan = blueprint.plan().context("Unable to order the resources")?;
        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&plan).context("Could not create string from plan.")?
            );
        } else {
            let (Width(width), _) =
                terminal_size::terminal_size().unwrap_or((Width(120), Height(0)));
            println!("{}", plan_table(&plan, width as usize));
        }
        Ok(())
    }
}

#[derive(Tabled)]
struct PlanRow {
    #[tabled(rename = "STAGE")]
    stage: usize,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "KIND")]
    kind: String,
    #[tabled(rename = "DEPENDS ON")]
    depends_on: String,
}

impl From<&PlannedNode> for PlanRow {
    fn from(node: &PlannedNode) -> Self {
        Self {
            stage: node.stage,
            name: node.name.to_string(),
            kind: node.kind.to_string(),
            depends_on: node
                .depends_on
                .iter()
                .map(|name| name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

fn plan_table(plan: &[PlannedNode], width: usize) -> String {
    Table::new(plan.iter().map(PlanRow::from))
        .with(Style::blank())
        .with(Modify::new(Full).with(Alignment::left()))
        .with(MaxWidth::truncating(width))
        .to_string()
}

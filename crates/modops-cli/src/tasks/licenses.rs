//! Dependency license report task body, driving `nuget-license`.

use super::TaskContext;
use crate::artifacts::ArtifactFolder;
use anyhow::Result;
use clap::Parser;
use modops_core::{Picked, TaskOutcome, ToolCommand, resolve_solution};

/// Arguments for the licenses subcommand.
#[derive(Parser, Debug)]
pub struct LicensesArgs {}

pub fn run(ctx: &TaskContext<'_>, _args: &LicensesArgs) -> Result<TaskOutcome> {
    let solution = match resolve_solution(ctx.root, ctx.prompter)? {
        Picked::Cancelled => return Ok(TaskOutcome::Cancelled),
        Picked::Chosen(solution) => solution,
    };

    let mut folder = ArtifactFolder::create(&ctx.artifacts_dir()?, "licenses")?;
    let report_file = "licenses.json";

    let outcome = TaskOutcome::from_step(
        ToolCommand::new("nuget-license")
            .arg("--input")
            .arg(solution.display().to_string())
            .args(["--include-transitive", "--output", "JsonPretty", "--file-output"])
            .arg(folder.file(report_file).display().to_string())
            .run_passthrough("license report generation failed"),
    );

    if folder.record_if_exists(report_file) {
        folder.write_summary()?;
        println!("License report written to {}", folder.dir().display());
    }
    Ok(outcome)
}

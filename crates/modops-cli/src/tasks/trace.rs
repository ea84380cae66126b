//! Performance tracing task bodies, driving `dotnet-trace`.

use super::TaskContext;
use crate::artifacts::ArtifactFolder;
use anyhow::Result;
use clap::{Parser, Subcommand};
use modops_core::{
    Failure, Picked, ProcessTarget, StepPlan, TaskOutcome, ToolCommand, resolve_process,
};
use std::path::PathBuf;

/// Collect and convert performance traces.
#[derive(Parser, Debug)]
pub struct TraceArgs {
    #[command(subcommand)]
    pub command: TraceCommands,
}

#[derive(Subcommand, Debug)]
pub enum TraceCommands {
    /// Collect a trace from a running process into the artifacts directory
    Collect(CollectArgs),

    /// Convert an existing trace file to speedscope format
    Convert(ConvertArgs),
}

/// Arguments for the trace collect subcommand.
#[derive(Parser, Debug)]
pub struct CollectArgs {
    /// Process id to trace (prompted from running processes when omitted)
    #[arg(short, long)]
    pub pid: Option<u32>,

    /// Stop collecting after this many seconds
    #[arg(long)]
    pub duration: Option<u64>,
}

/// Arguments for the trace convert subcommand.
#[derive(Parser, Debug)]
pub struct ConvertArgs {
    /// Trace file to convert
    pub file: PathBuf,
}

pub fn run(ctx: &TaskContext<'_>, args: &TraceArgs) -> Result<TaskOutcome> {
    match &args.command {
        TraceCommands::Collect(args) => collect(ctx, args),
        TraceCommands::Convert(args) => convert(args),
    }
}

/// Parses the process table printed by `dotnet-trace ps`.
///
/// Each line starts with the numeric id followed by the process name;
/// anything that does not fit that shape is skipped.
fn parse_process_list(raw: &str) -> Vec<ProcessTarget> {
    raw.lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let pid = parts.next()?.parse::<u32>().ok()?;
            let name = parts.next()?.to_string();
            Some(ProcessTarget { pid, name })
        })
        .collect()
}

/// Renders seconds in the tool's `dd:hh:mm:ss` duration format.
fn format_duration(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;
    let secs = seconds % 60;
    format!("{days:02}:{hours:02}:{minutes:02}:{secs:02}")
}

fn collect(ctx: &TaskContext<'_>, args: &CollectArgs) -> Result<TaskOutcome> {
    let listing = ToolCommand::new("dotnet-trace")
        .arg("ps")
        .run_capture(&Failure::new("failed to list traceable processes", 1))?;
    let processes = parse_process_list(&listing);

    let pid = match resolve_process(&processes, args.pid, ctx.prompter)? {
        Picked::Cancelled => return Ok(TaskOutcome::Cancelled),
        Picked::Chosen(pid) => pid,
    };

    let mut folder = ArtifactFolder::create(&ctx.artifacts_dir()?, "trace")?;
    let trace_file = "trace.nettrace";
    let trace_path = folder.file(trace_file).display().to_string();

    let mut collect_command = ToolCommand::new("dotnet-trace")
        .args(["collect", "--process-id"])
        .arg(pid.to_string())
        .arg("--output")
        .arg(trace_path.clone());
    if let Some(duration) = args.duration {
        collect_command = collect_command
            .arg("--duration")
            .arg(format_duration(duration));
    }

    let convert_command = ToolCommand::new("dotnet-trace")
        .args(["convert", "--format", "speedscope"])
        .arg(trace_path);

    let outcome = StepPlan::new("trace")
        .must(format!("collect trace from process {pid}"), move || {
            collect_command.run_passthrough(format!("trace collection failed for process {pid}"))
        })
        // The raw trace is still useful when the converter is missing.
        .best_effort("convert to speedscope", move || {
            convert_command.run_passthrough("speedscope conversion failed")
        })
        .run();

    folder.record_if_exists(trace_file);
    folder.record_if_exists("trace.speedscope.json");
    if let TaskOutcome::Success = outcome {
        folder.write_summary()?;
        println!("Trace written to {}", folder.dir().display());
    }
    Ok(outcome)
}

fn convert(args: &ConvertArgs) -> Result<TaskOutcome> {
    Ok(TaskOutcome::from_step(
        ToolCommand::new("dotnet-trace")
            .args(["convert", "--format", "speedscope"])
            .arg(args.file.display().to_string())
            .run_passthrough(format!("failed to convert {}", args.file.display())),
    ))
}

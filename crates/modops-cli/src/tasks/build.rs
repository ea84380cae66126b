//! Build toolchain task bodies: build, test, lint, pack, publish.

use super::{ENV_RID, TaskContext};
use anyhow::Result;
use clap::Parser;
use modops_core::{
    Module, Picked, Resolution, RidResolution, StepPlan, TaskOutcome, ToolCommand,
    resolve_runtime_id, resolve_solution,
};
use std::path::{Path, PathBuf};

/// Arguments for the build subcommand.
#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Module to build, or "all" for the whole solution
    #[arg(short, long)]
    pub module: Option<String>,

    /// Skip the implicit package restore
    #[arg(long)]
    pub no_restore: bool,
}

/// Arguments for the test subcommand.
#[derive(Parser, Debug)]
pub struct TestArgs {
    /// Module to test, or "all" for the whole solution
    #[arg(short, long)]
    pub module: Option<String>,
}

/// Arguments for the lint subcommand.
#[derive(Parser, Debug)]
pub struct LintArgs {
    /// Apply formatting fixes instead of only verifying
    #[arg(long)]
    pub fix: bool,
}

/// Arguments for the pack subcommand.
#[derive(Parser, Debug)]
pub struct PackArgs {}

/// Arguments for the publish subcommand.
#[derive(Parser, Debug)]
pub struct PublishArgs {
    /// Module to publish, or "all" for every module
    #[arg(short, long)]
    pub module: Option<String>,

    /// Runtime identifier, or "framework-dependent"
    #[arg(long)]
    pub rid: Option<String>,
}

fn path_arg(path: &Path) -> String {
    path.display().to_string()
}

/// Fixes the build/test scope: a single module's source directory, or the
/// solution file for the wildcard.
enum Scope {
    Solution(PathBuf),
    Module(Module),
}

fn resolve_scope(ctx: &TaskContext<'_>, explicit: Option<&str>) -> Result<Picked<Scope>> {
    match ctx.resolve_module(explicit, true)? {
        Resolution::Cancelled => Ok(Picked::Cancelled),
        Resolution::Target(name) => Ok(Picked::Chosen(Scope::Module(Module { name }))),
        Resolution::All => match resolve_solution(ctx.root, ctx.prompter)? {
            Picked::Cancelled => Ok(Picked::Cancelled),
            Picked::Chosen(solution) => Ok(Picked::Chosen(Scope::Solution(solution))),
        },
    }
}

pub fn build(ctx: &TaskContext<'_>, args: &BuildArgs) -> Result<TaskOutcome> {
    let scope = match resolve_scope(ctx, args.module.as_deref())? {
        Picked::Cancelled => return Ok(TaskOutcome::Cancelled),
        Picked::Chosen(scope) => scope,
    };

    let (target, what) = match &scope {
        Scope::Solution(solution) => (path_arg(solution), "solution".to_string()),
        Scope::Module(module) => (path_arg(&module.source_dir(ctx.root)), module.to_string()),
    };

    let mut command = ToolCommand::new("dotnet").arg("build").arg(target);
    if args.no_restore {
        command = command.arg("--no-restore");
    }
    Ok(TaskOutcome::from_step(
        command.run_passthrough(format!("Build failed for {what}")),
    ))
}

pub fn test(ctx: &TaskContext<'_>, args: &TestArgs) -> Result<TaskOutcome> {
    let scope = match resolve_scope(ctx, args.module.as_deref())? {
        Picked::Cancelled => return Ok(TaskOutcome::Cancelled),
        Picked::Chosen(scope) => scope,
    };

    let (target, what) = match &scope {
        Scope::Solution(solution) => (path_arg(solution), "solution".to_string()),
        Scope::Module(module) => (path_arg(&module.source_dir(ctx.root)), module.to_string()),
    };

    Ok(TaskOutcome::from_step(
        ToolCommand::new("dotnet")
            .arg("test")
            .arg(target)
            .run_passthrough(format!("Tests failed for {what}")),
    ))
}

pub fn lint(ctx: &TaskContext<'_>, args: &LintArgs) -> Result<TaskOutcome> {
    let solution = match resolve_solution(ctx.root, ctx.prompter)? {
        Picked::Cancelled => return Ok(TaskOutcome::Cancelled),
        Picked::Chosen(solution) => solution,
    };

    let mut command = ToolCommand::new("dotnet").arg("format").arg(path_arg(&solution));
    if !args.fix {
        command = command.arg("--verify-no-changes");
    }
    Ok(TaskOutcome::from_step(
        command.run_passthrough("Formatting check failed"),
    ))
}

pub fn pack(ctx: &TaskContext<'_>, _args: &PackArgs) -> Result<TaskOutcome> {
    let solution = match resolve_solution(ctx.root, ctx.prompter)? {
        Picked::Cancelled => return Ok(TaskOutcome::Cancelled),
        Picked::Chosen(solution) => solution,
    };
    let destination = ctx.output_dir()?.join("packages");

    Ok(TaskOutcome::from_step(
        ToolCommand::new("dotnet")
            .arg("pack")
            .arg(path_arg(&solution))
            .args(["--configuration", "Release", "--output"])
            .arg(path_arg(&destination))
            .run_passthrough("Packing failed"),
    ))
}

pub fn publish(ctx: &TaskContext<'_>, args: &PublishArgs) -> Result<TaskOutcome> {
    let modules = match ctx.resolve_module(args.module.as_deref(), true)? {
        Resolution::Cancelled => return Ok(TaskOutcome::Cancelled),
        Resolution::Target(name) => vec![name],
        Resolution::All => ctx
            .modules()?
            .into_iter()
            .map(|module| module.name)
            .collect(),
    };

    let rid = match resolve_runtime_id(args.rid.as_deref(), Some(ENV_RID), ctx.prompter)? {
        RidResolution::Cancelled => return Ok(TaskOutcome::Cancelled),
        RidResolution::Rid(rid) => Some(rid),
        RidResolution::FrameworkDependent => None,
    };

    let publish_root = ctx.output_dir()?.join("publish");
    let mut plan = StepPlan::new("publish");
    for name in modules {
        let module = Module { name };
        let project = path_arg(&module.source_dir(ctx.root));
        let destination = path_arg(&publish_root.join(&module.name));
        let rid = rid.clone();
        let label = format!("publish {module}");
        let failure = format!("Publish failed for {module}");
        plan = plan.must(label, move || {
            let mut command = ToolCommand::new("dotnet")
                .arg("publish")
                .arg(project)
                .args(["--configuration", "Release", "--output"])
                .arg(destination);
            command = match rid {
                Some(rid) => command.args(["--runtime", rid.as_str(), "--self-contained"]),
                None => command.arg("--no-self-contained"),
            };
            command.run_passthrough(failure)
        });
    }

    Ok(plan.run())
}

//! Schema-migration task bodies, driving `dotnet ef`.
//!
//! Undo and reset derive their targets from the migration tool's `--json`
//! output instead of scraping human-readable text.

use super::TaskContext;
use crate::artifacts::ArtifactFolder;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use modops_core::{
    DatabaseContext, Failure, Module, Picked, PromptOptions, Selection, StepPlan, TaskOutcome,
    ToolCommand,
};
use serde::Deserialize;

/// Migration target meaning "before the first migration".
const INITIAL_STATE: &str = "0";

/// Database migration operations.
#[derive(Parser, Debug)]
pub struct DbArgs {
    #[command(subcommand)]
    pub command: DbCommands,
}

#[derive(Subcommand, Debug)]
pub enum DbCommands {
    /// List migrations for a database context
    List(TargetArgs),

    /// Add a new migration
    Add(AddArgs),

    /// Remove the most recent migration source
    Remove(TargetArgs),

    /// Apply pending migrations to the database
    Apply(ApplyArgs),

    /// Write an idempotent SQL script into the artifacts directory
    Script(TargetArgs),

    /// Revert the most recent applied migration and delete its source
    Undo(TargetArgs),

    /// Revert everything and delete all migration sources
    Reset(TargetArgs),
}

/// Module/context selection shared by every migration verb.
#[derive(Parser, Debug)]
pub struct TargetArgs {
    /// Module owning the database context
    #[arg(short, long)]
    pub module: Option<String>,

    /// Database context name
    #[arg(long)]
    pub context: Option<String>,
}

/// Arguments for the db add subcommand.
#[derive(Parser, Debug)]
pub struct AddArgs {
    /// Name of the new migration
    pub name: String,

    #[command(flatten)]
    pub target: TargetArgs,
}

/// Arguments for the db apply subcommand.
#[derive(Parser, Debug)]
pub struct ApplyArgs {
    /// Migrate to this specific migration instead of the latest
    #[arg(long)]
    pub migration: Option<String>,

    #[command(flatten)]
    pub target: TargetArgs,
}

/// One entry of `dotnet ef migrations list --json`.
#[derive(Debug, Clone, Deserialize)]
pub struct MigrationRecord {
    pub id: String,
    #[serde(default)]
    pub applied: bool,
}

pub fn run(ctx: &TaskContext<'_>, args: &DbArgs) -> Result<TaskOutcome> {
    match &args.command {
        DbCommands::List(target) => list(ctx, target),
        DbCommands::Add(args) => add(ctx, args),
        DbCommands::Remove(target) => remove(ctx, target),
        DbCommands::Apply(args) => apply(ctx, args),
        DbCommands::Script(target) => script(ctx, target),
        DbCommands::Undo(target) => undo(ctx, target),
        DbCommands::Reset(target) => reset(ctx, target),
    }
}

/// Base `dotnet ef` invocation pinned to one module's context.
fn ef(ctx: &TaskContext<'_>, module: &Module, context: &DatabaseContext) -> ToolCommand {
    ToolCommand::new("dotnet")
        .arg("ef")
        .args([
            "--project".to_string(),
            module.infrastructure_dir(ctx.root).display().to_string(),
            "--context".to_string(),
            context.name.clone(),
        ])
}

fn pick_target(
    ctx: &TaskContext<'_>,
    target: &TargetArgs,
) -> Result<Picked<(Module, DatabaseContext)>> {
    ctx.resolve_db_target(target.module.as_deref(), target.context.as_deref())
}

fn list(ctx: &TaskContext<'_>, target: &TargetArgs) -> Result<TaskOutcome> {
    let (module, context) = match pick_target(ctx, target)? {
        Picked::Cancelled => return Ok(TaskOutcome::Cancelled),
        Picked::Chosen(chosen) => chosen,
    };

    Ok(TaskOutcome::from_step(
        ef(ctx, &module, &context)
            .args(["migrations", "list"])
            .run_passthrough(format!("failed to list migrations for {context}")),
    ))
}

fn add(ctx: &TaskContext<'_>, args: &AddArgs) -> Result<TaskOutcome> {
    let (module, context) = match pick_target(ctx, &args.target)? {
        Picked::Cancelled => return Ok(TaskOutcome::Cancelled),
        Picked::Chosen(chosen) => chosen,
    };

    Ok(TaskOutcome::from_step(
        ef(ctx, &module, &context)
            .args(["migrations", "add"])
            .arg(args.name.as_str())
            .run_passthrough(format!("failed to add migration {}", args.name)),
    ))
}

fn remove(ctx: &TaskContext<'_>, target: &TargetArgs) -> Result<TaskOutcome> {
    let (module, context) = match pick_target(ctx, target)? {
        Picked::Cancelled => return Ok(TaskOutcome::Cancelled),
        Picked::Chosen(chosen) => chosen,
    };

    Ok(TaskOutcome::from_step(
        ef(ctx, &module, &context)
            .args(["migrations", "remove"])
            .run_passthrough(format!("failed to remove migration from {context}")),
    ))
}

fn apply(ctx: &TaskContext<'_>, args: &ApplyArgs) -> Result<TaskOutcome> {
    let (module, context) = match pick_target(ctx, &args.target)? {
        Picked::Cancelled => return Ok(TaskOutcome::Cancelled),
        Picked::Chosen(chosen) => chosen,
    };

    let mut command = ef(ctx, &module, &context).args(["database", "update"]);
    if let Some(migration) = &args.migration {
        command = command.arg(migration.as_str());
    }
    Ok(TaskOutcome::from_step(
        command.run_passthrough(format!("failed to update database for {context}")),
    ))
}

fn script(ctx: &TaskContext<'_>, target: &TargetArgs) -> Result<TaskOutcome> {
    let (module, context) = match pick_target(ctx, target)? {
        Picked::Cancelled => return Ok(TaskOutcome::Cancelled),
        Picked::Chosen(chosen) => chosen,
    };

    let mut folder = ArtifactFolder::create(&ctx.artifacts_dir()?, "migration-script")?;
    let file_name = format!("{}.sql", context.name);
    let outcome = TaskOutcome::from_step(
        ef(ctx, &module, &context)
            .args(["migrations", "script", "--idempotent", "--output"])
            .arg(folder.file(&file_name).display().to_string())
            .run_passthrough(format!("failed to script migrations for {context}")),
    );

    if folder.record_if_exists(&file_name) {
        folder.write_summary()?;
        println!("Migration script written to {}", folder.dir().display());
    }
    Ok(outcome)
}

/// Reads the migration list through the tool's structured output mode.
fn read_migrations(
    ctx: &TaskContext<'_>,
    module: &Module,
    context: &DatabaseContext,
) -> Result<Vec<MigrationRecord>> {
    let raw = ef(ctx, module, context)
        .args(["migrations", "list", "--json"])
        .run_capture(&Failure::new(
            format!("failed to list migrations for {context}"),
            1,
        ))?;
    parse_migration_list(&raw)
}

/// Extracts and parses the JSON array from the tool's stdout.
///
/// The tool may emit build progress lines around the payload, so parsing
/// starts at the first bracket and ends at the last.
fn parse_migration_list(raw: &str) -> Result<Vec<MigrationRecord>> {
    let start = raw.find('[').context("no JSON array in migration list output")?;
    let end = raw.rfind(']').context("no JSON array in migration list output")?;
    serde_json::from_str(&raw[start..=end]).context("malformed migration list JSON")
}

/// The update target that reverts the most recent applied migration:
/// the previous applied migration's id, or the initial state when only one
/// is applied. `None` when nothing is applied.
fn rollback_target(migrations: &[MigrationRecord]) -> Option<(String, String)> {
    let applied: Vec<&MigrationRecord> = migrations.iter().filter(|m| m.applied).collect();
    let last = applied.last()?;
    let target = if applied.len() >= 2 {
        applied[applied.len() - 2].id.clone()
    } else {
        INITIAL_STATE.to_string()
    };
    Some((last.id.clone(), target))
}

fn undo(ctx: &TaskContext<'_>, target: &TargetArgs) -> Result<TaskOutcome> {
    let (module, context) = match pick_target(ctx, target)? {
        Picked::Cancelled => return Ok(TaskOutcome::Cancelled),
        Picked::Chosen(chosen) => chosen,
    };

    let migrations = read_migrations(ctx, &module, &context)?;
    let Some((last, rollback)) = rollback_target(&migrations) else {
        println!("No applied migrations to revert for {context}.");
        return Ok(TaskOutcome::Success);
    };

    let revert = ef(ctx, &module, &context)
        .args(["database", "update"])
        .arg(rollback);
    let remove_source = ef(ctx, &module, &context).args(["migrations", "remove"]);

    Ok(StepPlan::new("db undo")
        .must(format!("revert {last}"), move || {
            revert.run_passthrough(format!("failed to revert migration {last}"))
        })
        .must("remove migration source", move || {
            remove_source.run_passthrough("failed to remove the reverted migration")
        })
        .run())
}

fn reset(ctx: &TaskContext<'_>, target: &TargetArgs) -> Result<TaskOutcome> {
    let (module, context) = match pick_target(ctx, target)? {
        Picked::Cancelled => return Ok(TaskOutcome::Cancelled),
        Picked::Chosen(chosen) => chosen,
    };

    let confirm = ctx.prompter.select(
        &format!("Reset all migrations for {context}?"),
        &[format!("Delete all migrations for {context}")],
        &PromptOptions {
            filter: false,
            ..PromptOptions::default()
        },
    )?;
    if confirm == Selection::Cancelled {
        return Ok(TaskOutcome::Cancelled);
    }

    let migrations = read_migrations(ctx, &module, &context)?;
    if migrations.is_empty() {
        println!("No migrations to remove for {context}.");
        return Ok(TaskOutcome::Success);
    }

    let revert = ef(ctx, &module, &context)
        .args(["database", "update", INITIAL_STATE]);
    let mut plan = StepPlan::new("db reset").must("revert database to initial state", move || {
        revert.run_passthrough("failed to revert the database")
    });

    // `migrations remove` deletes the newest source, so one step per entry
    // unwinds the whole chain.
    for record in migrations.iter().rev() {
        let remove_source = ef(ctx, &module, &context).args(["migrations", "remove"]);
        let id = record.id.clone();
        plan = plan.must(format!("remove {id}"), move || {
            remove_source.run_passthrough(format!("failed to remove migration {id}"))
        });
    }

    Ok(plan.run())
}

//! Container engine task bodies: image build, compose stack, logs.

use super::TaskContext;
use anyhow::Result;
use clap::{Parser, Subcommand};
use modops_core::{
    Failure, Resolution, SelectionRequest, StepPlan, TaskOutcome, ToolCommand, resolve_target,
};

/// Settings key for the application image tag.
const KEY_DOCKER_IMAGE: &str = "DOCKER_IMAGE";

/// Settings key for the shared compose network name.
const KEY_DOCKER_NETWORK: &str = "DOCKER_NETWORK";

/// Settings key for the compose file path.
const KEY_COMPOSE_FILE: &str = "COMPOSE_FILE";

/// Container image and compose stack operations.
#[derive(Parser, Debug)]
pub struct DockerArgs {
    #[command(subcommand)]
    pub command: DockerCommands,
}

#[derive(Subcommand, Debug)]
pub enum DockerCommands {
    /// Build the application container image
    Build(BuildImageArgs),

    /// Start the compose stack (ensures the shared network first)
    Up,

    /// Stop the compose stack
    Down,

    /// Show logs from a running container
    Logs(LogsArgs),
}

/// Arguments for the docker build subcommand.
#[derive(Parser, Debug)]
pub struct BuildImageArgs {
    /// Image tag (defaults to the configured DOCKER_IMAGE)
    #[arg(short, long)]
    pub tag: Option<String>,
}

/// Arguments for the docker logs subcommand.
#[derive(Parser, Debug)]
pub struct LogsArgs {
    /// Container name (prompted from running containers when omitted)
    #[arg(short, long)]
    pub container: Option<String>,
}

pub fn run(ctx: &TaskContext<'_>, args: &DockerArgs) -> Result<TaskOutcome> {
    match &args.command {
        DockerCommands::Build(args) => build_image(ctx, args),
        DockerCommands::Up => up(ctx),
        DockerCommands::Down => down(ctx),
        DockerCommands::Logs(args) => logs(ctx, args),
    }
}

fn build_image(ctx: &TaskContext<'_>, args: &BuildImageArgs) -> Result<TaskOutcome> {
    let configured = ctx.settings.get_or(KEY_DOCKER_IMAGE, "modapp:latest");
    let tag = args.tag.as_deref().unwrap_or(configured);

    Ok(TaskOutcome::from_step(
        ToolCommand::new("docker")
            .args(["build", "--tag", tag, "."])
            .current_dir(ctx.root)
            .run_passthrough(format!("Image build failed for {tag}")),
    ))
}

/// Whether the named docker network already exists.
///
/// A pure existence probe: the inspect output carries no diagnostic value
/// here, so this is one of the few call sites that discards it.
fn network_exists(network: &str) -> bool {
    ToolCommand::new("docker")
        .args(["network", "inspect", network])
        .quiet()
        .run(&Failure::new("network missing", 1))
        .is_ok()
}

fn up(ctx: &TaskContext<'_>) -> Result<TaskOutcome> {
    let network = ctx.settings.get_or(KEY_DOCKER_NETWORK, "modapp-net").to_string();
    let compose_file = ctx
        .settings
        .get_or(KEY_COMPOSE_FILE, "docker-compose.yml")
        .to_string();
    let root = ctx.root.to_path_buf();

    let mut plan = StepPlan::new("docker up");
    if !network_exists(&network) {
        // The network may already be created by a parallel compose project;
        // losing this race is harmless, so the step is best-effort.
        let network = network.clone();
        plan = plan.best_effort("create shared network", move || {
            ToolCommand::new("docker")
                .args(["network", "create", network.as_str()])
                .run(&Failure::new(
                    format!("failed to create docker network {network}"),
                    1,
                ))
        });
    }

    plan = plan.must("compose up", move || {
        ToolCommand::new("docker")
            .args(["compose", "--file", compose_file.as_str(), "up", "--detach"])
            .current_dir(root)
            .run_passthrough("Compose stack failed to start")
    });

    Ok(plan.run())
}

fn down(ctx: &TaskContext<'_>) -> Result<TaskOutcome> {
    let compose_file = ctx.settings.get_or(KEY_COMPOSE_FILE, "docker-compose.yml");

    Ok(TaskOutcome::from_step(
        ToolCommand::new("docker")
            .args(["compose", "--file", compose_file, "down"])
            .current_dir(ctx.root)
            .run_passthrough("Compose stack failed to stop"),
    ))
}

fn logs(ctx: &TaskContext<'_>, args: &LogsArgs) -> Result<TaskOutcome> {
    let listing = ToolCommand::new("docker")
        .args(["ps", "--format", "{{.Names}}"])
        .run_capture(&Failure::new("failed to list running containers", 1))?;
    let containers: Vec<String> = listing
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    let container = match resolve_target(
        &SelectionRequest {
            title: "Select container",
            what: "container",
            candidates: &containers,
            explicit: args.container.as_deref(),
            env_var: None,
            allow_all: false,
        },
        ctx.prompter,
    )? {
        Resolution::Cancelled => return Ok(TaskOutcome::Cancelled),
        Resolution::Target(name) => name,
        Resolution::All => unreachable!("wildcard not offered for containers"),
    };

    Ok(TaskOutcome::from_step(
        ToolCommand::new("docker")
            .args(["logs", "--tail", "200", container.as_str()])
            .run_passthrough(format!("failed to read logs for {container}")),
    ))
}

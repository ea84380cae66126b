//! # modops-cli
//!
//! Binary entry point for the modops task orchestrator.
//!
//! This crate provides:
//! - CLI argument parsing using `clap`
//! - Settings loading and prompter selection at startup
//! - Dispatch from verbs to task bodies
//! - Translation of task outcomes into process exit codes

mod artifacts;
mod display;
mod menu;
mod tasks;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use modops_core::{NonInteractivePrompter, Prompter, Settings, TaskOutcome};
use std::io::{IsTerminal, stdin, stdout};
use std::path::PathBuf;

use display::colors;
use tasks::TaskContext;

/// Installs a panic hook that restores terminal state before printing
/// panic info.
///
/// A panic while the selection menu is open would otherwise leave the
/// terminal in raw mode with the cursor hidden.
fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = crossterm::terminal::disable_raw_mode();
        let _ = crossterm::execute!(std::io::stdout(), crossterm::cursor::Show);
        default_hook(panic_info);
    }));
}

/// Color output mode for terminal display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorMode {
    /// Automatically detect if stdout is a TTY
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl ColorMode {
    fn should_use_colors(self) -> bool {
        match self {
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Auto => stdout().is_terminal(),
        }
    }
}

/// modops - task orchestration for the modular application
#[derive(Parser, Debug)]
#[command(name = "modops", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    // ─────────────────────────────────────────────────────────────────────────
    // Global options (available for all subcommands)
    // ─────────────────────────────────────────────────────────────────────────
    /// Repository root containing src/Modules and the settings files
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Color output mode (auto, always, never)
    #[arg(long, value_enum, default_value_t = ColorMode::Auto, global = true)]
    color: ColorMode,

    /// Never prompt; fail when a selection would be required
    #[arg(long, global = true)]
    non_interactive: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build a module, or the whole solution
    Build(tasks::build::BuildArgs),

    /// Run tests for a module, or the whole solution
    Test(tasks::build::TestArgs),

    /// Check (or fix) source formatting
    Lint(tasks::build::LintArgs),

    /// Pack the solution's packages into the output directory
    Pack(tasks::build::PackArgs),

    /// Publish a module for deployment
    Publish(tasks::build::PublishArgs),

    /// Container image and compose stack operations
    Docker(tasks::docker::DockerArgs),

    /// Database migration operations
    Db(tasks::migrations::DbArgs),

    /// Collect and convert performance traces
    Trace(tasks::trace::TraceArgs),

    /// Produce a dependency license report
    Licenses(tasks::licenses::LicensesArgs),
}

/// Top-level verbs, as spelled in the command table.
const VERBS: &[&str] = &[
    "build", "test", "lint", "pack", "publish", "docker", "db", "trace", "licenses",
];

/// Global options that consume the following argument.
const VALUE_FLAGS: &[&str] = &["--root", "--color"];

fn namespace_verbs(verb: &str) -> Option<&'static [&'static str]> {
    match verb {
        "docker" => Some(&["build", "up", "down", "logs"]),
        "db" => Some(&["list", "add", "remove", "apply", "script", "undo", "reset"]),
        "trace" => Some(&["collect", "convert"]),
        _ => None,
    }
}

/// Lower-cases the verb (and namespace sub-verb) so the command table is
/// matched case-insensitively. Arguments that are not recognized verbs are
/// left untouched for clap's own diagnostics.
fn normalize_verb_case(mut args: Vec<String>) -> Vec<String> {
    let mut index = 1;
    let mut skip_value = false;
    let mut namespace: Option<&'static [&'static str]> = None;
    let mut saw_verb = false;

    while index < args.len() {
        let arg = args[index].clone();
        if skip_value {
            skip_value = false;
            index += 1;
            continue;
        }
        if arg == "--" {
            break;
        }
        if arg.starts_with('-') {
            skip_value = VALUE_FLAGS.contains(&arg.as_str());
            index += 1;
            continue;
        }

        if !saw_verb {
            let Some(known) = VERBS.iter().find(|verb| arg.eq_ignore_ascii_case(verb)) else {
                break;
            };
            args[index] = (*known).to_string();
            saw_verb = true;
            namespace = namespace_verbs(known);
            if namespace.is_none() {
                break;
            }
        } else {
            if let Some(subverbs) = namespace
                && let Some(known) = subverbs.iter().find(|verb| arg.eq_ignore_ascii_case(verb))
            {
                args[index] = (*known).to_string();
            }
            break;
        }
        index += 1;
    }

    args
}

fn main() {
    install_panic_hook();

    let args = normalize_verb_case(std::env::args().collect());
    let cli = Cli::parse_from(args);

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let use_colors = cli.color.should_use_colors();
    let code = match run(&cli) {
        Ok(TaskOutcome::Success) => 0,
        Ok(TaskOutcome::Cancelled) => {
            println!("Cancelled.");
            0
        }
        Ok(TaskOutcome::Failed { message, code }) => {
            if use_colors {
                eprintln!("{}error:{} {message}", colors::RED, colors::RESET);
            } else {
                eprintln!("error: {message}");
            }
            code
        }
        Err(error) => {
            if use_colors {
                eprintln!("{}error:{} {error:#}", colors::RED, colors::RESET);
            } else {
                eprintln!("error: {error:#}");
            }
            1
        }
    };
    std::process::exit(code);
}

fn run(cli: &Cli) -> Result<TaskOutcome> {
    let settings = Settings::load(&Settings::standard_layers(&cli.root))
        .context("failed to load settings")?;

    // Capability is fixed once at startup; nothing prompts lazily later.
    let interactive = !cli.non_interactive && stdin().is_terminal() && stdout().is_terminal();
    tracing::debug!(
        "interactive prompting {}",
        if interactive { "enabled" } else { "disabled" }
    );
    let prompter: Box<dyn Prompter> = if interactive {
        Box::new(menu::TerminalPrompter::new())
    } else {
        Box::new(NonInteractivePrompter)
    };

    let ctx = TaskContext {
        root: &cli.root,
        settings: &settings,
        prompter: prompter.as_ref(),
    };

    match &cli.command {
        Commands::Build(args) => tasks::build::build(&ctx, args),
        Commands::Test(args) => tasks::build::test(&ctx, args),
        Commands::Lint(args) => tasks::build::lint(&ctx, args),
        Commands::Pack(args) => tasks::build::pack(&ctx, args),
        Commands::Publish(args) => tasks::build::publish(&ctx, args),
        Commands::Docker(args) => tasks::docker::run(&ctx, args),
        Commands::Db(args) => tasks::migrations::run(&ctx, args),
        Commands::Trace(args) => tasks::trace::run(&ctx, args),
        Commands::Licenses(args) => tasks::licenses::run(&ctx, args),
    }
}

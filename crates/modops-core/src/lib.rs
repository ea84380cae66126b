//! # modops-core
//!
//! Core engine shared by every modops task body.
//!
//! This crate provides:
//! - Layered settings loading with deterministic override semantics
//! - Module and database-context discovery by filesystem convention
//! - Precedence-ordered target resolution (argument, environment, menu)
//! - The prompter capability interface used for interactive selection
//! - A uniform external-process invocation contract
//! - Must/best-effort step sequencing for task bodies

mod discovery;
mod process;
mod prompt;
mod resolve;
mod settings;
mod steps;
pub mod testing;

pub use discovery::{
    DatabaseContext, DiscoveryError, Module, discover_db_contexts, discover_modules,
};
pub use process::{Failure, ProcessError, ToolCommand};
pub use prompt::{NonInteractivePrompter, PromptError, PromptOptions, Prompter, Selection};
pub use resolve::{
    Picked, ProcessTarget, RUNTIME_IDS, Resolution, ResolveError, RidResolution, SelectionRequest,
    WILDCARD, resolve_process, resolve_runtime_id, resolve_solution, resolve_target,
};
pub use settings::{
    KEY_ARTIFACTS_DIRECTORY, KEY_OUTPUT_DIRECTORY, OperationalPaths, Settings, SettingsError,
    TOOL_SETTINGS_FILE,
};
pub use steps::{StepPlan, TaskOutcome};

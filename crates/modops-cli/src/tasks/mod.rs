//! Task bodies: thin, enumerable sequences of external-tool invocations
//! over the core engine.

pub mod build;
pub mod docker;
pub mod licenses;
pub mod migrations;
pub mod trace;

use anyhow::{Result, bail};
use modops_core::{
    DatabaseContext, KEY_OUTPUT_DIRECTORY, Module, OperationalPaths, Picked, Prompter, Resolution,
    SelectionRequest, Settings, discover_db_contexts, discover_modules, resolve_target,
};
use std::path::{Path, PathBuf};

/// Environment variable naming the preferred module.
pub const ENV_MODULE: &str = "MODOPS_MODULE";

/// Environment variable naming the preferred database context.
pub const ENV_DB_CONTEXT: &str = "MODOPS_DB_CONTEXT";

/// Environment variable naming the preferred runtime identifier.
pub const ENV_RID: &str = "MODOPS_RID";

/// Everything a task body needs, wired once at process entry.
pub struct TaskContext<'a> {
    pub root: &'a Path,
    pub settings: &'a Settings,
    pub prompter: &'a dyn Prompter,
}

impl TaskContext<'_> {
    /// Discovered modules, sorted. Empty is not an error here; resolution
    /// decides whether that is fatal.
    pub fn modules(&self) -> Result<Vec<Module>> {
        Ok(discover_modules(self.root)?)
    }

    /// The configured output directory, resolved against the root.
    pub fn output_dir(&self) -> Result<PathBuf> {
        Ok(self.root.join(self.settings.get_required(KEY_OUTPUT_DIRECTORY)?))
    }

    /// Both operational paths, resolved against the root.
    ///
    /// Artifact-producing tasks validate the pair up front so a settings
    /// file missing both keys reports both at once.
    pub fn operational_paths(&self) -> Result<OperationalPaths> {
        let paths = OperationalPaths::from_settings(self.settings)?;
        Ok(OperationalPaths {
            output_dir: self.root.join(paths.output_dir),
            artifacts_dir: self.root.join(paths.artifacts_dir),
        })
    }

    /// The configured artifacts directory, resolved against the root.
    pub fn artifacts_dir(&self) -> Result<PathBuf> {
        Ok(self.operational_paths()?.artifacts_dir)
    }

    /// Resolves a module name: explicit argument, then `MODOPS_MODULE`,
    /// then the menu.
    pub fn resolve_module(
        &self,
        explicit: Option<&str>,
        allow_all: bool,
    ) -> Result<Resolution> {
        let modules = self.modules()?;
        let names: Vec<String> = modules.into_iter().map(|module| module.name).collect();
        Ok(resolve_target(
            &SelectionRequest {
                title: "Select module",
                what: "module",
                candidates: &names,
                explicit,
                env_var: Some(ENV_MODULE),
                allow_all,
            },
            self.prompter,
        )?)
    }

    /// Resolves a module and one of its database contexts.
    ///
    /// A module without any discovered context is fatal here: every caller
    /// of this needs one to exist.
    pub fn resolve_db_target(
        &self,
        explicit_module: Option<&str>,
        explicit_context: Option<&str>,
    ) -> Result<Picked<(Module, DatabaseContext)>> {
        let module = match self.resolve_module(explicit_module, false)? {
            Resolution::Cancelled => return Ok(Picked::Cancelled),
            Resolution::Target(name) => Module { name },
            // allow_all is false above, so the wildcard cannot appear.
            Resolution::All => bail!("database operations apply to a single module"),
        };

        let contexts = discover_db_contexts(self.root, &module);
        if contexts.is_empty() {
            bail!(
                "module {} has no database contexts under {}",
                module,
                module.infrastructure_dir(self.root).display()
            );
        }
        let names: Vec<String> = contexts.iter().map(|context| context.name.clone()).collect();

        match resolve_target(
            &SelectionRequest {
                title: "Select database context",
                what: "database context",
                candidates: &names,
                explicit: explicit_context,
                env_var: Some(ENV_DB_CONTEXT),
                allow_all: false,
            },
            self.prompter,
        )? {
            Resolution::Cancelled => Ok(Picked::Cancelled),
            Resolution::Target(name) => Ok(Picked::Chosen((module, DatabaseContext { name }))),
            Resolution::All => bail!("database operations apply to a single context"),
        }
    }
}

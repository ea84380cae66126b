//! Module and database-context discovery.
//!
//! Targets are discovered by filesystem convention: modules are the
//! immediate subdirectories of `src/Modules`, and each module's persistence
//! contexts are the `*DbContext.cs` files under its `.Infrastructure`
//! project. Discovery is computed fresh on every call.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Directory names that are never modules, compared case-insensitively.
const MODULE_DENYLIST: &[&str] = &["common", "shared"];

/// Filename suffix identifying a persistence-context definition.
const CONTEXT_FILE_SUFFIX: &str = "DbContext.cs";

/// Errors raised during target discovery.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("failed to list {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A named vertical slice of the application, discovered under
/// `src/Modules`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub name: String,
}

impl Module {
    /// Path of the module's source directory under `root`.
    pub fn source_dir(&self, root: &Path) -> PathBuf {
        modules_root(root).join(&self.name)
    }

    /// Path of the module's infrastructure project under `root`.
    pub fn infrastructure_dir(&self, root: &Path) -> PathBuf {
        self.source_dir(root)
            .join(format!("{}.Infrastructure", self.name))
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A named persistence unit belonging to one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseContext {
    pub name: String,
}

impl fmt::Display for DatabaseContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

fn modules_root(root: &Path) -> PathBuf {
    root.join("src").join("Modules")
}

/// Lists the modules under `root/src/Modules`, sorted by name.
///
/// A missing modules directory yields an empty list. Denylisted
/// infrastructure folders are excluded even when structurally valid.
pub fn discover_modules(root: &Path) -> Result<Vec<Module>, DiscoveryError> {
    let modules_dir = modules_root(root);
    if !modules_dir.is_dir() {
        debug!("No modules directory at {}", modules_dir.display());
        return Ok(Vec::new());
    }

    let entries = modules_dir.read_dir().map_err(|source| DiscoveryError::Io {
        path: modules_dir.clone(),
        source,
    })?;

    let mut modules = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| DiscoveryError::Io {
            path: modules_dir.clone(),
            source,
        })?;
        if !entry.path().is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if MODULE_DENYLIST
            .iter()
            .any(|deny| name.eq_ignore_ascii_case(deny))
        {
            debug!("Skipping infrastructure folder {name}");
            continue;
        }
        modules.push(Module { name });
    }

    modules.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(modules)
}

/// Lists the database contexts defined in `module`'s infrastructure
/// project, deduplicated and sorted by name.
///
/// A module without an infrastructure subtree yields an empty list; whether
/// that is an error is the caller's decision.
pub fn discover_db_contexts(root: &Path, module: &Module) -> Vec<DatabaseContext> {
    let infrastructure = module.infrastructure_dir(root);
    if !infrastructure.is_dir() {
        debug!(
            "Module {} has no infrastructure project at {}",
            module,
            infrastructure.display()
        );
        return Vec::new();
    }

    let mut names: Vec<String> = WalkDir::new(&infrastructure)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let file_name = entry.file_name().to_string_lossy().into_owned();
            file_name
                .ends_with(CONTEXT_FILE_SUFFIX)
                .then(|| file_name.trim_end_matches(".cs").to_string())
        })
        .collect();

    names.sort();
    names.dedup();
    names
        .into_iter()
        .map(|name| DatabaseContext { name })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn make_module(root: &Path, name: &str) {
        fs::create_dir_all(root.join("src").join("Modules").join(name)).unwrap();
    }

    #[test]
    fn test_discover_modules_sorted() {
        let dir = TempDir::new().unwrap();
        make_module(dir.path(), "Users");
        make_module(dir.path(), "Billing");
        make_module(dir.path(), "Orders");

        let modules = discover_modules(dir.path()).unwrap();
        let names: Vec<_> = modules.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["Billing", "Orders", "Users"]);
    }

    #[test]
    fn test_discover_modules_missing_root_is_empty() {
        let dir = TempDir::new().unwrap();
        let modules = discover_modules(dir.path()).unwrap();
        assert!(modules.is_empty());
    }

    #[test]
    fn test_discover_modules_excludes_denylist_case_insensitively() {
        let dir = TempDir::new().unwrap();
        make_module(dir.path(), "Alpha");
        make_module(dir.path(), "Beta");
        make_module(dir.path(), "Common");
        make_module(dir.path(), "SHARED");

        let modules = discover_modules(dir.path()).unwrap();
        let names: Vec<_> = modules.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["Alpha", "Beta"]);
    }

    #[test]
    fn test_discover_modules_ignores_plain_files() {
        let dir = TempDir::new().unwrap();
        make_module(dir.path(), "Alpha");
        fs::write(
            dir.path().join("src").join("Modules").join("readme.txt"),
            "not a module",
        )
        .unwrap();

        let modules = discover_modules(dir.path()).unwrap();
        assert_eq!(modules.len(), 1);
        assert_eq!(modules[0].name, "Alpha");
    }

    #[test]
    fn test_discover_db_contexts_recursive_and_sorted() {
        let dir = TempDir::new().unwrap();
        make_module(dir.path(), "Users");
        let module = Module {
            name: "Users".to_string(),
        };
        let infra = module.infrastructure_dir(dir.path());
        fs::create_dir_all(infra.join("Persistence").join("Nested")).unwrap();
        fs::write(infra.join("Persistence").join("UsersDbContext.cs"), "").unwrap();
        fs::write(
            infra
                .join("Persistence")
                .join("Nested")
                .join("AuditDbContext.cs"),
            "",
        )
        .unwrap();
        fs::write(infra.join("Persistence").join("Repository.cs"), "").unwrap();

        let contexts = discover_db_contexts(dir.path(), &module);
        let names: Vec<_> = contexts.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["AuditDbContext", "UsersDbContext"]);
    }

    #[test]
    fn test_discover_db_contexts_deduplicates() {
        let dir = TempDir::new().unwrap();
        make_module(dir.path(), "Users");
        let module = Module {
            name: "Users".to_string(),
        };
        let infra = module.infrastructure_dir(dir.path());
        fs::create_dir_all(infra.join("A")).unwrap();
        fs::create_dir_all(infra.join("B")).unwrap();
        fs::write(infra.join("A").join("UsersDbContext.cs"), "").unwrap();
        fs::write(infra.join("B").join("UsersDbContext.cs"), "").unwrap();

        let contexts = discover_db_contexts(dir.path(), &module);
        assert_eq!(contexts.len(), 1);
        assert_eq!(contexts[0].name, "UsersDbContext");
    }

    #[test]
    fn test_discover_db_contexts_without_infrastructure_is_empty() {
        let dir = TempDir::new().unwrap();
        make_module(dir.path(), "Users");
        let module = Module {
            name: "Users".to_string(),
        };

        assert!(discover_db_contexts(dir.path(), &module).is_empty());
    }
}

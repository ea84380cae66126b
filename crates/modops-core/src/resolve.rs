//! Precedence-ordered target resolution.
//!
//! A target (module, database context, runtime identifier, process,
//! container) is fixed from, in order: an explicit argument, an environment
//! variable, and finally an interactive menu. An explicit or environment
//! value that is not in the candidate set is never silently accepted; it
//! degrades to the next source with a warning. Resolution always terminates
//! in a verified candidate, the wildcard (where permitted), or
//! cancellation.

use crate::prompt::{PromptError, PromptOptions, Prompter, Selection};
use regex::Regex;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::warn;

/// Wildcard sentinel accepted from arguments and environment variables.
pub const WILDCARD: &str = "all";

/// Menu label for the wildcard choice.
const WILDCARD_LABEL: &str = "All";

/// Menu label for the framework-dependent (no runtime identifier) choice.
const FRAMEWORK_DEPENDENT_LABEL: &str = "Framework-dependent";

/// Runtime identifiers offered for publishing.
pub const RUNTIME_IDS: &[&str] = &["linux-x64", "linux-arm64", "osx-x64", "osx-arm64", "win-x64"];

/// Errors raised during resolution.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// There is nothing to choose from; resolution fails before prompting.
    #[error("no {what} found; nothing to select")]
    NoCandidates { what: String },

    /// The selector returned a value outside the candidate set.
    #[error("selection '{value}' is not a known {what}")]
    NotACandidate { value: String, what: String },

    /// A menu label was expected to end in `(pid)` but did not.
    #[error("cannot extract a process id from '{label}'")]
    BadProcessLabel { label: String },

    #[error("failed to list {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Prompt(#[from] PromptError),
}

/// The intent for "which target to operate on".
#[derive(Debug)]
pub struct SelectionRequest<'a> {
    /// Menu title, e.g. `"Select module"`.
    pub title: &'a str,
    /// Noun used in error messages, e.g. `"module"`.
    pub what: &'a str,
    /// The discovered candidate set.
    pub candidates: &'a [String],
    /// Explicitly requested value, highest priority.
    pub explicit: Option<&'a str>,
    /// Environment variable consulted when no valid explicit value exists.
    pub env_var: Option<&'a str>,
    /// Whether the wildcard "All" pseudo-candidate is permitted.
    pub allow_all: bool,
}

/// Terminal state of a resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A verified member of the candidate set.
    Target(String),
    /// The wildcard: run against every candidate.
    All,
    /// The user declined to choose; the owning task aborts cleanly.
    Cancelled,
}

/// Outcome of the single-value specializations (solution file, process).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Picked<T> {
    Chosen(T),
    Cancelled,
}

/// Outcome of runtime-identifier resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RidResolution {
    Rid(String),
    /// Publish framework-dependent, without a runtime identifier.
    FrameworkDependent,
    Cancelled,
}

/// Returns the canonical candidate matching `value`, ignoring ASCII case.
fn find_candidate<'c>(candidates: &'c [String], value: &str) -> Option<&'c str> {
    candidates
        .iter()
        .find(|candidate| candidate.eq_ignore_ascii_case(value))
        .map(String::as_str)
}

/// Resolves one target name against a discovered candidate set.
///
/// Precedence: explicit argument, then environment variable, then the
/// interactive menu. An empty candidate set fails before any prompt.
pub fn resolve_target(
    request: &SelectionRequest<'_>,
    prompter: &dyn Prompter,
) -> Result<Resolution, ResolveError> {
    if request.candidates.is_empty() {
        return Err(ResolveError::NoCandidates {
            what: request.what.to_string(),
        });
    }

    if let Some(explicit) = request.explicit {
        match check_value(request, explicit) {
            Some(resolution) => return Ok(resolution),
            None => warn!(
                "Requested {} '{}' is not one of: {}",
                request.what,
                explicit,
                request.candidates.join(", ")
            ),
        }
    }

    if let Some(env_var) = request.env_var
        && let Ok(value) = std::env::var(env_var)
        && !value.trim().is_empty()
    {
        match check_value(request, value.trim()) {
            Some(resolution) => return Ok(resolution),
            None => warn!(
                "{env_var}='{value}' is not a known {}, ignoring",
                request.what
            ),
        }
    }

    let mut choices: Vec<String> = request.candidates.to_vec();
    if request.allow_all {
        choices.push(WILDCARD_LABEL.to_string());
    }

    match prompter.select(request.title, &choices, &PromptOptions::default())? {
        Selection::Cancelled => Ok(Resolution::Cancelled),
        Selection::Choice(choice) => {
            if request.allow_all && choice == WILDCARD_LABEL {
                return Ok(Resolution::All);
            }
            match find_candidate(request.candidates, &choice) {
                Some(canonical) => Ok(Resolution::Target(canonical.to_string())),
                None => Err(ResolveError::NotACandidate {
                    value: choice,
                    what: request.what.to_string(),
                }),
            }
        }
    }
}

/// Applies the membership/wildcard check shared by the explicit-argument
/// and environment-variable stages.
fn check_value(request: &SelectionRequest<'_>, value: &str) -> Option<Resolution> {
    if request.allow_all && value.eq_ignore_ascii_case(WILDCARD) {
        return Some(Resolution::All);
    }
    find_candidate(request.candidates, value).map(|canonical| Resolution::Target(canonical.to_string()))
}

/// Resolves the solution file to operate on.
///
/// A single discovered solution is auto-selected without prompting. More
/// than one always prompts, regardless of any hint. None is an error.
pub fn resolve_solution(
    root: &Path,
    prompter: &dyn Prompter,
) -> Result<Picked<PathBuf>, ResolveError> {
    let entries = root.read_dir().map_err(|source| ResolveError::Io {
        path: root.to_path_buf(),
        source,
    })?;

    let mut solutions: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "sln"))
        .collect();
    solutions.sort();

    match solutions.len() {
        0 => Err(ResolveError::NoCandidates {
            what: "solution file".to_string(),
        }),
        1 => Ok(Picked::Chosen(solutions.remove(0))),
        _ => {
            let labels: Vec<String> = solutions
                .iter()
                .map(|path| {
                    path.file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                        .unwrap_or_else(|| path.display().to_string())
                })
                .collect();
            match prompter.select("Select solution", &labels, &PromptOptions::default())? {
                Selection::Cancelled => Ok(Picked::Cancelled),
                Selection::Choice(choice) => {
                    let index = labels.iter().position(|label| *label == choice).ok_or(
                        ResolveError::NotACandidate {
                            value: choice,
                            what: "solution file".to_string(),
                        },
                    )?;
                    Ok(Picked::Chosen(solutions.swap_remove(index)))
                }
            }
        }
    }
}

/// Resolves the runtime identifier for publishing.
///
/// The allowed set is fixed; the extra "framework-dependent" choice
/// resolves to no identifier at all. `env_var` is consulted between the
/// explicit argument and the menu.
pub fn resolve_runtime_id(
    explicit: Option<&str>,
    env_var: Option<&str>,
    prompter: &dyn Prompter,
) -> Result<RidResolution, ResolveError> {
    let check = |value: &str| -> Option<RidResolution> {
        if value.eq_ignore_ascii_case("framework-dependent") || value.eq_ignore_ascii_case("fdd") {
            return Some(RidResolution::FrameworkDependent);
        }
        RUNTIME_IDS
            .iter()
            .find(|rid| rid.eq_ignore_ascii_case(value))
            .map(|rid| RidResolution::Rid((*rid).to_string()))
    };

    if let Some(explicit) = explicit {
        match check(explicit) {
            Some(resolution) => return Ok(resolution),
            None => warn!(
                "Requested runtime '{}' is not one of: {}",
                explicit,
                RUNTIME_IDS.join(", ")
            ),
        }
    }

    if let Some(env_var) = env_var
        && let Ok(value) = std::env::var(env_var)
        && !value.trim().is_empty()
    {
        match check(value.trim()) {
            Some(resolution) => return Ok(resolution),
            None => warn!("{env_var}='{value}' is not a known runtime, ignoring"),
        }
    }

    let mut choices: Vec<String> = RUNTIME_IDS.iter().map(|rid| (*rid).to_string()).collect();
    choices.push(FRAMEWORK_DEPENDENT_LABEL.to_string());

    match prompter.select("Select runtime", &choices, &PromptOptions::default())? {
        Selection::Cancelled => Ok(RidResolution::Cancelled),
        Selection::Choice(choice) if choice == FRAMEWORK_DEPENDENT_LABEL => {
            Ok(RidResolution::FrameworkDependent)
        }
        Selection::Choice(choice) => Ok(RidResolution::Rid(choice)),
    }
}

/// An OS process offered for selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessTarget {
    pub pid: u32,
    pub name: String,
}

impl ProcessTarget {
    /// The display label shown in the menu.
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.pid)
    }
}

impl fmt::Display for ProcessTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

fn pid_label_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\((\d+)\)\s*$").unwrap())
}

/// Resolves a process id from a list of running processes.
///
/// Menu labels are `"name (pid)"`; the chosen label is mapped back to its
/// numeric id by the trailing parenthesized number.
pub fn resolve_process(
    processes: &[ProcessTarget],
    explicit_pid: Option<u32>,
    prompter: &dyn Prompter,
) -> Result<Picked<u32>, ResolveError> {
    if processes.is_empty() {
        return Err(ResolveError::NoCandidates {
            what: "process".to_string(),
        });
    }

    if let Some(pid) = explicit_pid {
        if processes.iter().any(|process| process.pid == pid) {
            return Ok(Picked::Chosen(pid));
        }
        warn!("Requested process id {pid} is not running, ignoring");
    }

    let labels: Vec<String> = processes.iter().map(ProcessTarget::label).collect();
    match prompter.select("Select process", &labels, &PromptOptions::default())? {
        Selection::Cancelled => Ok(Picked::Cancelled),
        Selection::Choice(label) => {
            let captures =
                pid_label_pattern()
                    .captures(&label)
                    .ok_or_else(|| ResolveError::BadProcessLabel {
                        label: label.clone(),
                    })?;
            let pid = captures[1]
                .parse::<u32>()
                .map_err(|_| ResolveError::BadProcessLabel {
                    label: label.clone(),
                })?;
            Ok(Picked::Chosen(pid))
        }
    }
}

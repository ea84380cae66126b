//! Declarative step sequencing for task bodies.
//!
//! A task body is a sequence of steps, each either `must` (failure aborts
//! the plan immediately) or `best_effort` (failure is logged and the plan
//! continues). The distinction is declared up front instead of being
//! scattered through control flow.

use crate::process::ProcessError;
use tracing::{info, warn};

/// Terminal result of one task body. Becomes the CLI's own exit code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    /// The user backed out of a selection; a clean abort, not a failure.
    Cancelled,
    Failed {
        message: String,
        code: i32,
    },
}

impl TaskOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            TaskOutcome::Success | TaskOutcome::Cancelled => 0,
            TaskOutcome::Failed { code, .. } => *code,
        }
    }

    /// Maps a single invocation result to an outcome.
    pub fn from_step(result: Result<(), ProcessError>) -> Self {
        match result {
            Ok(()) => TaskOutcome::Success,
            Err(error) => TaskOutcome::Failed {
                code: error.exit_code(),
                message: error.to_string(),
            },
        }
    }
}

enum StepMode {
    Must,
    BestEffort,
}

struct Step<'a> {
    label: String,
    mode: StepMode,
    action: Box<dyn FnOnce() -> Result<(), ProcessError> + 'a>,
}

/// An ordered sequence of must/best-effort steps.
pub struct StepPlan<'a> {
    name: String,
    steps: Vec<Step<'a>>,
}

impl<'a> StepPlan<'a> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    /// Adds a step whose failure aborts the plan.
    pub fn must(
        mut self,
        label: impl Into<String>,
        action: impl FnOnce() -> Result<(), ProcessError> + 'a,
    ) -> Self {
        self.steps.push(Step {
            label: label.into(),
            mode: StepMode::Must,
            action: Box::new(action),
        });
        self
    }

    /// Adds a step whose failure is logged but does not abort.
    pub fn best_effort(
        mut self,
        label: impl Into<String>,
        action: impl FnOnce() -> Result<(), ProcessError> + 'a,
    ) -> Self {
        self.steps.push(Step {
            label: label.into(),
            mode: StepMode::BestEffort,
            action: Box::new(action),
        });
        self
    }

    /// Runs the steps in order and returns the plan's outcome.
    pub fn run(self) -> TaskOutcome {
        let mut errors = 0usize;

        for step in self.steps {
            info!("{}: {}", self.name, step.label);
            match (step.action)() {
                Ok(()) => {}
                Err(error) => match step.mode {
                    StepMode::Must => {
                        return TaskOutcome::Failed {
                            code: error.exit_code(),
                            message: error.to_string(),
                        };
                    }
                    StepMode::BestEffort => {
                        warn!("{} failed: {error} (continuing)", step.label);
                        errors += 1;
                    }
                },
            }
        }

        if errors > 0 {
            println!("{} completed with {errors} error(s)", self.name);
        }
        TaskOutcome::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn fail(code: i32) -> Result<(), ProcessError> {
        Err(ProcessError::Step {
            message: format!("step failed with {code}"),
            code,
        })
    }

    #[test]
    fn test_all_steps_succeed() {
        let ran = Cell::new(0);
        let outcome = StepPlan::new("demo")
            .must("first", || {
                ran.set(ran.get() + 1);
                Ok(())
            })
            .must("second", || {
                ran.set(ran.get() + 1);
                Ok(())
            })
            .run();
        assert_eq!(outcome, TaskOutcome::Success);
        assert_eq!(ran.get(), 2);
    }

    #[test]
    fn test_must_failure_aborts_immediately() {
        let later_ran = Cell::new(false);
        let outcome = StepPlan::new("demo")
            .must("boom", || fail(4))
            .must("after", || {
                later_ran.set(true);
                Ok(())
            })
            .run();
        match outcome {
            TaskOutcome::Failed { code, .. } => assert_eq!(code, 4),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(!later_ran.get());
    }

    #[test]
    fn test_best_effort_failure_continues() {
        let later_ran = Cell::new(false);
        let outcome = StepPlan::new("demo")
            .best_effort("shrug", || fail(4))
            .must("after", || {
                later_ran.set(true);
                Ok(())
            })
            .run();
        assert_eq!(outcome, TaskOutcome::Success);
        assert!(later_ran.get());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(TaskOutcome::Success.exit_code(), 0);
        assert_eq!(TaskOutcome::Cancelled.exit_code(), 0);
        assert_eq!(
            TaskOutcome::Failed {
                message: "x".to_string(),
                code: 5
            }
            .exit_code(),
            5
        );
    }

    #[test]
    fn test_from_step() {
        assert_eq!(TaskOutcome::from_step(Ok(())), TaskOutcome::Success);
        match TaskOutcome::from_step(fail(7)) {
            TaskOutcome::Failed { code, .. } => assert_eq!(code, 7),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}

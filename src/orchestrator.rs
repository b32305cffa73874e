//! Clone pipeline
//!
//! This module sequences a whole clone and gives it all-or-nothing
//! semantics:
//!
//! 1. **Create destination**: create the new root and any missing parents;
//!    the root must not exist yet.
//! 2. **Copy tree**: deep-copy the source environment into it.
//! 3. **Patch activate script**: `bin/activate.sh`.
//! 4. **Patch ini**: `etc/php.ini`.
//! 5. **Patch wrapper**: `bin/php`.
//! 6. **Patch PEAR config**: `etc/pear.conf`.
//!
//! Each step runs only if the previous one succeeded. The first failure,
//! whatever its kind, stops the pipeline and removes the new root. If that
//! removal fails too, the outcome carries a rollback error next to the
//! original one so the caller knows the directory must be cleaned up by
//! hand. Once step 1 has succeeded the destination, together with any
//! parent directories step 1 had to create, is held by a [`RollbackGuard`],
//! which also removes it if the pipeline unwinds.
//!
//! Two clones racing into the same target are only separated by the
//! `create_dir` in step 1; the loser fails there and removes nothing.

use std::fmt;
use std::path::{Path, PathBuf};

use log::{error, info};
use serde::{Serialize, Serializer};

use crate::cloner::DirectoryCloner;
use crate::environment::{EnvLayout, Environment};
use crate::error::{Error, ErrorKind, FsErrorKind, Result};
use crate::filesystem::Filesystem;
use crate::output::ProgressSink;
use crate::patch::{patcher_for, PatchReport, PatchTarget};

/// The steps of a clone, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CloneStep {
    CreateDestination,
    CopyTree,
    PatchActivateScript,
    PatchIni,
    PatchWrapper,
    PatchPearConfig,
}

impl CloneStep {
    /// Every step, in the order the pipeline runs them.
    pub const ALL: [CloneStep; 6] = [
        CloneStep::CreateDestination,
        CloneStep::CopyTree,
        CloneStep::PatchActivateScript,
        CloneStep::PatchIni,
        CloneStep::PatchWrapper,
        CloneStep::PatchPearConfig,
    ];
}

impl fmt::Display for CloneStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CloneStep::CreateDestination => "create destination",
            CloneStep::CopyTree => "copy environment",
            CloneStep::PatchActivateScript => "update activate script",
            CloneStep::PatchIni => "update PHP ini file",
            CloneStep::PatchWrapper => "update PHP bin wrapper",
            CloneStep::PatchPearConfig => "update PEAR configuration",
        };
        f.write_str(name)
    }
}

/// Why a clone failed.
#[derive(Debug)]
pub struct CloneFailure {
    /// The step that failed.
    pub step: CloneStep,
    /// What went wrong in that step.
    pub error: Error,
    /// Set when the destination could not be removed afterwards.
    pub rollback_error: Option<Error>,
}

/// The result of one clone.
#[derive(Debug)]
pub struct CloneOutcome {
    pub success: bool,
    /// Steps that completed, in order. On failure the failing step is not
    /// included.
    pub completed_steps: Vec<CloneStep>,
    pub failure: Option<CloneFailure>,
    /// One report per patched file.
    pub patches: Vec<PatchReport>,
}

impl CloneOutcome {
    /// The class of the error that ended the clone.
    pub fn failure_kind(&self) -> Option<ErrorKind> {
        self.failure.as_ref().map(|f| f.error.kind())
    }

    /// True when a failed clone left a directory behind.
    pub fn needs_manual_cleanup(&self) -> bool {
        self.failure
            .as_ref()
            .is_some_and(|f| f.rollback_error.is_some())
    }

    /// Convert into a `Result`, keeping the step's error.
    pub fn into_result(self) -> Result<()> {
        match self.failure {
            None => Ok(()),
            Some(failure) => Err(failure.error),
        }
    }
}

impl Serialize for CloneOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct FailureReport {
            step: CloneStep,
            kind: ErrorKind,
            message: String,
            rollback_error: Option<String>,
        }

        #[derive(Serialize)]
        struct OutcomeReport<'a> {
            success: bool,
            completed_steps: &'a [CloneStep],
            failure: Option<FailureReport>,
            patches: &'a [PatchReport],
        }

        OutcomeReport {
            success: self.success,
            completed_steps: &self.completed_steps,
            failure: self.failure.as_ref().map(|f| FailureReport {
                step: f.step,
                kind: f.error.kind(),
                message: f.error.to_string(),
                rollback_error: f.rollback_error.as_ref().map(ToString::to_string),
            }),
            patches: &self.patches,
        }
        .serialize(serializer)
    }
}

/// Removes a destination directory unless the clone that created it commits.
pub struct RollbackGuard<'a> {
    fs: &'a dyn Filesystem,
    path: PathBuf,
    armed: bool,
}

impl<'a> RollbackGuard<'a> {
    pub fn new(fs: &'a dyn Filesystem, path: &Path) -> Self {
        Self {
            fs,
            path: path.to_path_buf(),
            armed: true,
        }
    }

    /// Keep the directory.
    pub fn commit(mut self) {
        self.armed = false;
    }

    /// Remove the directory now and report whether that worked.
    pub fn rollback(mut self) -> Result<()> {
        self.armed = false;
        remove_destination(self.fs, &self.path)
    }
}

impl Drop for RollbackGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            if let Err(err) = remove_destination(self.fs, &self.path) {
                error!("{}", err);
            }
        }
    }
}

fn remove_destination(fs: &dyn Filesystem, path: &Path) -> Result<()> {
    info!("Rolling back: removing {}", path.display());
    fs.remove_all(path).map_err(|err| Error::Rollback {
        path: path.display().to_string(),
        message: err.to_string(),
    })
}

/// Runs the clone pipeline against a filesystem.
pub struct CloneOrchestrator<'a> {
    fs: &'a dyn Filesystem,
    sink: &'a dyn ProgressSink,
    layout: EnvLayout,
}

impl<'a> CloneOrchestrator<'a> {
    pub fn new(fs: &'a dyn Filesystem, sink: &'a dyn ProgressSink) -> Self {
        Self {
            fs,
            sink,
            layout: EnvLayout::standard(),
        }
    }

    /// Use a different set of patch targets.
    pub fn with_layout(mut self, layout: EnvLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Clone `env.source_root()` to `env.target_root()`.
    pub fn run(&self, env: &Environment) -> CloneOutcome {
        let mut outcome = CloneOutcome {
            success: false,
            completed_steps: Vec::new(),
            failure: None,
            patches: Vec::new(),
        };

        self.sink.progress(&format!(
            "Creating new virtPHP env {} at {}",
            env.name(),
            env.target_root().display()
        ));
        // Ancestors created along with the root are removed with it.
        let created_root = self.first_missing_ancestor(env.target_root());
        if let Err(error) = self.create_destination(env.target_root()) {
            // The target itself is not ours; only ancestors made on the way
            // to it are.
            let made_parents =
                created_root != env.target_root() && self.fs.exists(&created_root);
            let rollback_error = if made_parents {
                RollbackGuard::new(self.fs, &created_root).rollback().err()
            } else {
                None
            };
            return self.fail(outcome, CloneStep::CreateDestination, error, rollback_error);
        }
        outcome.completed_steps.push(CloneStep::CreateDestination);

        let guard = RollbackGuard::new(self.fs, &created_root);
        match self.run_steps(env, &mut outcome) {
            Ok(()) => {
                guard.commit();
                outcome.success = true;
                self.sink.success(&format!(
                    "Cloned {} to {}",
                    env.source_root().display(),
                    env.target_root().display()
                ));
                outcome
            }
            Err((step, error)) => {
                let rollback_error = guard.rollback().err();
                self.fail(outcome, step, error, rollback_error)
            }
        }
    }

    /// The outermost directory step 1 will create for `target`.
    fn first_missing_ancestor(&self, target: &Path) -> PathBuf {
        let mut root = target;
        while let Some(parent) = root.parent() {
            if self.fs.exists(parent) {
                break;
            }
            root = parent;
        }
        root.to_path_buf()
    }

    fn create_destination(&self, target: &Path) -> Result<()> {
        info!("Creating {}", target.display());
        self.fs.create_dir(target).map_err(|err| match err.fs_kind() {
            Some(FsErrorKind::AlreadyExists) => Error::Clone {
                message: format!("destination {} already exists", target.display()),
            },
            _ => Error::Clone {
                message: err.to_string(),
            },
        })
    }

    fn run_steps(
        &self,
        env: &Environment,
        outcome: &mut CloneOutcome,
    ) -> std::result::Result<(), (CloneStep, Error)> {
        self.sink.progress(&format!(
            "Copying contents of {}",
            env.source_root().display()
        ));
        info!("Step {}: copying tree", CloneStep::CopyTree);
        DirectoryCloner::new(self.fs)
            .clone_tree(env.source_root(), env.target_root())
            .map_err(|e| (CloneStep::CopyTree, e))?;
        outcome.completed_steps.push(CloneStep::CopyTree);

        let patches: [(CloneStep, &PatchTarget, &str); 4] = [
            (
                CloneStep::PatchActivateScript,
                &self.layout.activate_script,
                "Updating activate file",
            ),
            (
                CloneStep::PatchIni,
                &self.layout.interpreter_config,
                "Updating PHP ini file",
            ),
            (
                CloneStep::PatchWrapper,
                &self.layout.interpreter_wrapper,
                "Updating PHP bin wrapper",
            ),
            (
                CloneStep::PatchPearConfig,
                &self.layout.package_config,
                "Updating PEAR configuration",
            ),
        ];

        for (step, target, message) in patches {
            self.sink.progress(message);
            info!("Step {}: {}", step, target.relative_path.display());
            let report = self
                .patch_target(env, target)
                .map_err(|e| (step, e))?;
            outcome.patches.push(report);
            outcome.completed_steps.push(step);
        }

        Ok(())
    }

    fn patch_target(&self, env: &Environment, target: &PatchTarget) -> Result<PatchReport> {
        let file = env.target_root().join(&target.relative_path);
        if !self.fs.exists(&file) {
            return Err(Error::Patch {
                file: file.display().to_string(),
                message: format!("{} file is missing from the environment", target.format),
            });
        }
        patcher_for(target.format).patch(self.fs, &file, env.rule())
    }

    fn fail(
        &self,
        mut outcome: CloneOutcome,
        step: CloneStep,
        error: Error,
        rollback_error: Option<Error>,
    ) -> CloneOutcome {
        self.sink.error(&format!("{} failed: {}", step, error));
        if let Some(rollback) = &rollback_error {
            error!("{}", rollback);
            self.sink.error(&format!(
                "{}; remove it by hand before retrying",
                rollback
            ));
        }
        outcome.success = false;
        outcome.failure = Some(CloneFailure {
            step,
            error,
            rollback_error,
        });
        outcome
    }
}

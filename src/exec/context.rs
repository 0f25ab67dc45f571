use std::collections::{HashMap, HashSet, VecDeque};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::exec::ExecError;
use crate::shell::Host;

/// Mutable state threaded through one invocation of the command tree
pub struct ExecutionContext<'h> {
    pub throw_on_failure: bool,
    pub working_dir: Option<PathBuf>,
    pub remaining_args: VecDeque<String>,
    host: &'h mut dyn Host,
}

/// The scoped part of an [`ExecutionContext`], restored when a scope exits
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub throw_on_failure: bool,
    pub working_dir: Option<PathBuf>,
}

/// Values the environment held before a scope overrode them (`None` = unset)
pub type SavedEnv = Vec<(String, Option<OsString>)>;

impl<'h> ExecutionContext<'h> {
    /// Fresh context: failures are ignored and the working directory is the host's.
    pub fn new(host: &'h mut dyn Host, args: impl IntoIterator<Item = String>) -> Self {
        let working_dir = host.current_dir().ok();
        ExecutionContext {
            throw_on_failure: false,
            working_dir,
            remaining_args: args.into_iter().collect(),
            host,
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            throw_on_failure: self.throw_on_failure,
            working_dir: self.working_dir.clone(),
        }
    }

    /// Puts back a snapshot, moving the host back to the saved directory if it changed.
    pub fn restore(&mut self, snapshot: Snapshot) {
        self.throw_on_failure = snapshot.throw_on_failure;
        if self.working_dir == snapshot.working_dir {
            return;
        }
        if let Some(dir) = &snapshot.working_dir {
            if let Err(e) = self.host.set_current_dir(dir) {
                warn!("Unable to return to {}: {e}", dir.display());
            }
        }
        self.working_dir = snapshot.working_dir;
    }

    /// Makes `dir` the working directory of this context and of the host.
    ///
    /// # Errors
    ///
    /// Returns `ExecError::WorkingDir` if the host cannot change into `dir`.
    pub fn change_dir(&mut self, dir: &Path) -> Result<(), ExecError> {
        debug!("Changing directory to {}", dir.display());
        self.host
            .set_current_dir(dir)
            .map_err(|e| ExecError::WorkingDir {
                path: dir.to_path_buf(),
                source: e,
            })?;
        self.working_dir = Some(dir.to_path_buf());
        Ok(())
    }

    /// Sets every variable, returning what has to be put back on scope exit.
    pub fn apply_env(&mut self, vars: &HashMap<String, String>) -> SavedEnv {
        vars.iter()
            .map(|(name, value)| {
                let previous = self.host.var_os(name);
                debug!("Setting {name}");
                self.host.set_var(name, OsStr::new(value));
                (name.clone(), previous)
            })
            .collect()
    }

    pub fn restore_env(&mut self, saved: SavedEnv) {
        for (name, previous) in saved {
            match previous {
                Some(value) => self.host.set_var(&name, &value),
                None => self.host.remove_var(&name),
            }
        }
    }

    /// # Errors
    ///
    /// Returns `ExecError::MissingEnv` naming the first required variable that is not set,
    /// and `command`, the command that cannot run without it.
    pub fn ensure_env(&self, required: &HashSet<String>, command: &str) -> Result<(), ExecError> {
        let mut names: Vec<&String> = required.iter().collect();
        names.sort();
        match names.into_iter().find(|name| !self.host.has_var(name)) {
            Some(name) => Err(ExecError::MissingEnv {
                name: name.clone(),
                command: command.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Runs a command line through the host in the current working directory.
    ///
    /// # Errors
    ///
    /// Returns `ExecError::Spawn` if the shell cannot be started.
    pub fn run_shell(&mut self, command_line: &str) -> Result<i32, ExecError> {
        debug!(
            "Running `{command_line}` (throw: {}, cwd: {:?})",
            self.throw_on_failure, self.working_dir
        );
        self.host
            .run(command_line, self.working_dir.as_deref())
            .map_err(|e| ExecError::Spawn {
                command: command_line.to_string(),
                source: e,
            })
    }
}

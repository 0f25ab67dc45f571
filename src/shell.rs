//! Access to the process: running shell command lines, the environment table and the
//! working directory.
//!
//! The execution engine only reaches these process-wide resources through [`Host`], so the
//! scoping rules can be exercised against a recording implementation in tests.

use std::ffi::{OsStr, OsString};
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command as ProcessCommand;

use log::debug;

/// Exit status reported for processes terminated by a signal
pub const SIGNALED_STATUS: i32 = -1;

/// The process-wide resources the execution engine runs against
pub trait Host {
    /// Run a command line through the shell and wait for it, returning its exit status.
    ///
    /// # Errors
    ///
    /// Returns an error if the shell could not be spawned.
    fn run(&mut self, command_line: &str, cwd: Option<&Path>) -> io::Result<i32>;

    /// The raw value of a variable, which need not be valid Unicode.
    fn var_os(&self, name: &str) -> Option<OsString>;

    fn var(&self, name: &str) -> Option<String> {
        self.var_os(name).map(|v| v.to_string_lossy().into_owned())
    }

    fn set_var(&mut self, name: &str, value: &OsStr);

    fn remove_var(&mut self, name: &str);

    fn has_var(&self, name: &str) -> bool {
        self.var_os(name).is_some()
    }

    /// # Errors
    ///
    /// Returns an error if the working directory cannot be determined.
    fn current_dir(&self) -> io::Result<PathBuf>;

    /// # Errors
    ///
    /// Returns an error if `dir` does not exist or is not accessible.
    fn set_current_dir(&mut self, dir: &Path) -> io::Result<()>;
}

/// [`Host`] backed by the real process
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemHost;

fn shell_command(command_line: &str) -> ProcessCommand {
    if cfg!(target_os = "windows") {
        let mut command = ProcessCommand::new("cmd");
        command.arg("/C").arg(command_line);
        command
    } else {
        let mut command = ProcessCommand::new("sh");
        command.arg("-c").arg(command_line);
        command
    }
}

impl Host for SystemHost {
    fn run(&mut self, command_line: &str, cwd: Option<&Path>) -> io::Result<i32> {
        let mut command = shell_command(command_line);
        if let Some(dir) = cwd {
            command.current_dir(dir);
        }
        let status = command.status()?;
        debug!("`{command_line}` exited with {status}");
        Ok(status.code().unwrap_or(SIGNALED_STATUS))
    }

    fn var_os(&self, name: &str) -> Option<OsString> {
        std::env::var_os(name)
    }

    fn set_var(&mut self, name: &str, value: &OsStr) {
        // SAFETY: commands run one at a time on the main thread; no other thread reads the
        // environment while it is modified.
        unsafe { std::env::set_var(name, value) };
    }

    fn remove_var(&mut self, name: &str) {
        // SAFETY: see `set_var`.
        unsafe { std::env::remove_var(name) };
    }

    fn current_dir(&self) -> io::Result<PathBuf> {
        std::env::current_dir()
    }

    fn set_current_dir(&mut self, dir: &Path) -> io::Result<()> {
        std::env::set_current_dir(dir)
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use std::collections::HashMap;
    use std::ffi::{OsStr, OsString};
    use std::io;
    use std::path::{Path, PathBuf};

    use super::Host;

    /// A command line as seen by the host, with the state it ran under
    #[derive(Debug, Clone, PartialEq)]
    pub struct Invocation {
        pub command: String,
        pub cwd: Option<PathBuf>,
        pub process_dir: PathBuf,
        pub env: HashMap<String, String>,
    }

    /// In-memory [`Host`] that records every command instead of running it
    #[derive(Debug, Clone)]
    pub struct RecordingHost {
        pub cwd: PathBuf,
        pub env: HashMap<String, String>,
        pub statuses: HashMap<String, i32>,
        pub invocations: Vec<Invocation>,
    }

    impl RecordingHost {
        pub fn new() -> Self {
            RecordingHost {
                cwd: PathBuf::from("/start"),
                env: HashMap::new(),
                statuses: HashMap::from([("false".to_string(), 1)]),
                invocations: Vec::new(),
            }
        }

        pub fn commands(&self) -> Vec<&str> {
            self.invocations.iter().map(|i| i.command.as_str()).collect()
        }
    }

    impl Host for RecordingHost {
        fn run(&mut self, command_line: &str, cwd: Option<&Path>) -> io::Result<i32> {
            if command_line == "spawn-error" {
                return Err(io::Error::new(io::ErrorKind::NotFound, "no shell"));
            }
            self.invocations.push(Invocation {
                command: command_line.to_string(),
                cwd: cwd.map(Path::to_path_buf),
                process_dir: self.cwd.clone(),
                env: self.env.clone(),
            });
            Ok(self.statuses.get(command_line).copied().unwrap_or(0))
        }

        fn var_os(&self, name: &str) -> Option<OsString> {
            self.env.get(name).map(OsString::from)
        }

        fn set_var(&mut self, name: &str, value: &OsStr) {
            self.env
                .insert(name.to_string(), value.to_string_lossy().into_owned());
        }

        fn remove_var(&mut self, name: &str) {
            self.env.remove(name);
        }

        fn current_dir(&self) -> io::Result<PathBuf> {
            Ok(self.cwd.clone())
        }

        fn set_current_dir(&mut self, dir: &Path) -> io::Result<()> {
            if dir.starts_with("/missing") {
                return Err(io::Error::new(io::ErrorKind::NotFound, "no such directory"));
            }
            self.cwd = dir.to_path_buf();
            Ok(())
        }
    }
}

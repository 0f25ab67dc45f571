//! Execution of the command tree
//!
//! Resolution turns the command-line arguments into a node of the tree; the engine then walks
//! that node, carrying an [`ExecutionContext`] whose scoped fields (failure policy and working
//! directory) and environment overrides are undone whenever a sequence or scoped command exits,
//! whether it succeeded or failed.

use std::path::PathBuf;

use log::debug;
use thiserror::Error;

use crate::config_file::RunConfig;
use crate::shell::Host;

pub mod context;
pub mod engine;
pub mod resolve;

pub use context::ExecutionContext;
pub use engine::execute;
pub use resolve::resolve;

/// Errors raised while resolving or running a command
#[derive(Error, Debug)]
pub enum ExecError {
    #[error("Missing command(s)\n{available}")]
    MissingCommand { available: String },
    #[error("Unknown command: {name}\n{available}")]
    UnknownCommand { name: String, available: String },
    #[error("Missing environment variable: {name}\nWhile executing command: \"{command}\"")]
    MissingEnv { name: String, command: String },
    #[error("Command `{command}` failed with exit status {status}")]
    CommandFailed { command: String, status: i32 },
    #[error("Unable to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Unable to change directory to {path:?}: {source}")]
    WorkingDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ExecError {
    /// Process exit code to end with: the failed command's own status, 1 for anything else.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            ExecError::CommandFailed { status, .. } => {
                u8::try_from(*status).ok().filter(|s| *s != 0).unwrap_or(1)
            }
            _ => 1,
        }
    }
}

/// Resolves `args` against the configuration and runs the resulting command.
///
/// # Errors
///
/// Returns the first `ExecError` raised anywhere in the tree; every scope entered on the way
/// has been exited (and its context restored) by the time it is returned.
pub fn run(
    config: &RunConfig,
    args: impl IntoIterator<Item = String>,
    host: &mut dyn Host,
) -> Result<(), ExecError> {
    let mut ctx = ExecutionContext::new(host, args);
    debug!("Running with arguments {:?}", ctx.remaining_args);
    let node = resolve(&config.root, &mut ctx.remaining_args)?;
    if !ctx.remaining_args.is_empty() {
        debug!("Ignoring trailing arguments {:?}", ctx.remaining_args);
    }
    execute(node, &mut ctx)
}

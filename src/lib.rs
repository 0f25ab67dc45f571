//! Core implementation of shrun, a runner for nested shell commands
//!
//! Commands are declared in a `run.yml` file as a tree: named groups of commands, lists of
//! commands run in order, and command objects that run with their own working directory,
//! environment and failure policy. A per-user file can provide commands everywhere; a project
//! file overrides it name by name.

use std::path::{Path, PathBuf};

use log::debug;

use crate::config_file::{ConfigError, RunConfig};

pub mod commands;
pub mod config_file;
pub mod exec;
pub mod init;
pub mod logger;
pub mod shell;

/// Load and merge the per-user and project configurations.
///
/// `project_dir` is searched for a project file; `system_file`, when given, is the per-user
/// file. Project commands replace per-user commands with the same top-level name.
///
/// # Errors
///
/// Returns `ConfigError::NoConfig` if neither file exists, or any error from parsing one of them.
pub fn load_config(project_dir: &Path, system_file: Option<&Path>) -> Result<RunConfig, ConfigError> {
    let system = system_file
        .filter(|path| path.exists())
        .map(RunConfig::from_file)
        .transpose()?;
    let project = config_file::find_project_config(project_dir)
        .map(|path| RunConfig::from_file(&path))
        .transpose()?;
    debug!(
        "Loaded configuration (system: {}, project: {})",
        system.is_some(),
        project.is_some()
    );
    match (system, project) {
        (Some(system), Some(project)) => Ok(system.override_with(project)),
        (Some(config), None) | (None, Some(config)) => Ok(config),
        (None, None) => Err(ConfigError::NoConfig),
    }
}

/// Load configuration from the current directory and the per-user configuration directory.
///
/// # Errors
///
/// Returns `ConfigError` if the working directory is unknown, no configuration file exists,
/// or a configuration file is invalid.
pub fn load_default_config() -> Result<RunConfig, ConfigError> {
    let cwd = std::env::current_dir()
        .map_err(|e| ConfigError::UnknownWorkingDirectory(e.to_string()))?;
    let system: Option<PathBuf> = config_file::system_config_path().ok();
    load_config(&cwd, system.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::command::{CommandNode, Entry};

    #[test]
    fn test_project_overrides_system() {
        let dir = tempfile::tempdir().unwrap();
        let system = dir.path().join("system.yml");
        std::fs::write(&system, "commands:\n  x: '1'\n  y: '2'\n").unwrap();
        let project = dir.path().join("project");
        std::fs::create_dir(&project).unwrap();
        std::fs::write(project.join("run.yml"), "commands:\n  x: '3'\n").unwrap();

        let config = load_config(&project, Some(system.as_path())).unwrap();
        assert_eq!(config.root.get("x"), Some(&Entry::Command(CommandNode::literal("3"))));
        assert_eq!(config.root.get("y"), Some(&Entry::Command(CommandNode::literal("2"))));
    }

    #[test]
    fn test_missing_system_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("run.yml"), "commands:\n  x: ls\n").unwrap();
        let config = load_config(dir.path(), Some(dir.path().join("absent.yml").as_path())).unwrap();
        assert_eq!(config.root.len(), 1);
    }

    #[test]
    fn test_no_config() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_config(dir.path(), None),
            Err(ConfigError::NoConfig)
        ));
    }
}

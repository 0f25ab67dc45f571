use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum InitError {
    #[error("failed to write config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Example configuration written by `run --init` and `run --edit`
pub const EXAMPLE_CONFIG: &str = include_str!("../assets/run-example.yml");

/// Write the example configuration to `path`, creating parent directories as needed.
///
/// Returns `false` without touching anything if the file already exists.
///
/// # Errors
///
/// Returns `InitError::Io` if the directory or the file cannot be written.
pub fn generate_config_file(path: &Path) -> Result<bool, InitError> {
    if path.exists() {
        return Ok(false);
    }
    let io_err = |source| InitError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    std::fs::write(path, EXAMPLE_CONFIG).map_err(io_err)?;
    Ok(true)
}

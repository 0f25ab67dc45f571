//! Configuration file handling for shrun

use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};

use log::{debug, info};
use serde_yaml::{Mapping, Value};
use thiserror::Error;

use crate::commands::command::{CommandNode, Entry, Scoped, Sequence};
use crate::commands::registry::CommandRegistry;

/// Token in a `cwd` value replaced by the directory holding the config file
pub const THIS_DIR_TOKEN: &str = "$THIS_DIR";

/// List of supported project configuration file names, in lookup order
pub const FILENAMES: [&str; 3] = ["run.yml", "run.yaml", "run.json"];

/// Name of the per-user configuration directory
pub const APP_DIR: &str = "shrun";

/// Errors that can occur while loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No configuration file found: {}", FILENAMES[0])]
    NoConfig,
    #[error("Unable to read config file {path}: {source}")]
    Read {
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("Unable to parse YAML config file {path}: {source}")]
    Yaml {
        source: serde_yaml::Error,
        path: PathBuf,
    },
    #[error("Unable to parse JSON config file {path}: {source}")]
    Json {
        source: serde_json::Error,
        path: PathBuf,
    },
    #[error("Unable to find the user configuration directory")]
    NoConfigDir,
    #[error("Unknown working directory: {0}")]
    UnknownWorkingDirectory(String),
    #[error("Invalid configuration, expected a mapping at the top level")]
    NotAMapping,
    #[error("Missing 'commands' key in configuration")]
    MissingCommands,
    #[error("Unexpected keys in command definition: {}", .0.join(", "))]
    UnexpectedKeys(Vec<String>),
    #[error("Expected a command in list, found a command registry: {0}")]
    ExpectedCommand(String),
    #[error("Expected a string 'desc', found: {0}")]
    InvalidDescription(String),
    #[error("Invalid value for '{key}': expected {expected}, found: {found}")]
    InvalidValue {
        key: String,
        expected: &'static str,
        found: String,
    },
}

/// Parsed configuration: the root of the command tree
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunConfig {
    pub root: CommandRegistry,
}

impl RunConfig {
    /// Shallow merge: every top-level command of `other` replaces the one with the same name.
    #[must_use]
    pub fn override_with(mut self, other: RunConfig) -> RunConfig {
        self.root.extend(other.root);
        self
    }

    /// Loads and parses a configuration file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Read` if the file cannot be read, `ConfigError::Yaml`/`ConfigError::Json`
    /// if it is not valid, or any structural error from [`parse_document`].
    pub fn from_file(file: &Path) -> Result<RunConfig, ConfigError> {
        debug!("Parsing config file {}", file.display());
        let contents = std::fs::read_to_string(file).map_err(|e| ConfigError::Read {
            source: e,
            path: file.to_path_buf(),
        })?;
        let document: Value = if file.extension().is_some_and(|ext| ext == "json") {
            let json: serde_json::Value =
                serde_json::from_str(&contents).map_err(|e| ConfigError::Json {
                    source: e,
                    path: file.to_path_buf(),
                })?;
            serde_yaml::to_value(json).map_err(|e| ConfigError::Yaml {
                source: e,
                path: file.to_path_buf(),
            })?
        } else {
            serde_yaml::from_str(&contents).map_err(|e| ConfigError::Yaml {
                source: e,
                path: file.to_path_buf(),
            })?
        };
        parse_document(&document, file)
    }
}

/// Turns a loaded document into a [`RunConfig`].
///
/// `config_path` is the file the document came from; it anchors `$THIS_DIR`.
///
/// # Errors
///
/// Returns `ConfigError` if the document is not a mapping, has no `commands` mapping,
/// or any command in the tree is malformed.
pub fn parse_document(document: &Value, config_path: &Path) -> Result<RunConfig, ConfigError> {
    let Value::Mapping(root) = document else {
        return Err(ConfigError::NotAMapping);
    };
    let commands = root.get("commands").ok_or(ConfigError::MissingCommands)?;
    let Value::Mapping(commands) = commands else {
        return Err(ConfigError::InvalidValue {
            key: "commands".to_string(),
            expected: "a mapping",
            found: describe(commands),
        });
    };
    let parser = Parser { config_path };
    let mut config = RunConfig::default();
    for (key, value) in commands {
        config.root.insert(key_string(key), parser.parse_entry(value)?);
    }
    Ok(config)
}

struct Parser<'a> {
    config_path: &'a Path,
}

impl Parser<'_> {
    fn parse_entry(&self, value: &Value) -> Result<Entry, ConfigError> {
        match value {
            Value::Sequence(items) => {
                let nodes = items
                    .iter()
                    .map(|item| match self.parse_entry(item)? {
                        Entry::Command(node) => Ok(node),
                        Entry::Registry(_) => Err(ConfigError::ExpectedCommand(describe(item))),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(CommandNode::Sequence(Sequence::new(nodes)).into())
            }
            Value::Mapping(mapping) => self.parse_mapping(mapping),
            Value::Tagged(tagged) => self.parse_entry(&tagged.value),
            scalar => Ok(CommandNode::Literal(scalar_string("command", scalar)?).into()),
        }
    }

    fn parse_mapping(&self, mapping: &Mapping) -> Result<Entry, ConfigError> {
        if mapping.len() == 1 {
            if let Some(value) = mapping.get("throw") {
                return Ok(CommandNode::Throw(bool_value("throw", value)?).into());
            }
            if let Some(value) = mapping.get("desc") {
                return Ok(CommandNode::Desc(scalar_string("desc", value)?).into());
            }
        }
        if let Some(cmd) = mapping.get("cmd") {
            let mut rest = mapping.clone();
            rest.remove("cmd");
            return self.parse_scoped(cmd, rest).map(Entry::from);
        }
        self.parse_registry(mapping).map(Entry::from)
    }

    fn parse_scoped(&self, cmd: &Value, mut mapping: Mapping) -> Result<CommandNode, ConfigError> {
        let description = mapping
            .remove("desc")
            .map(|v| scalar_string("desc", &v))
            .transpose()?
            .unwrap_or_default();
        let required_env = mapping
            .remove("ensure_env")
            .map(|v| string_set("ensure_env", &v))
            .transpose()?
            .unwrap_or_default();
        let set_env = mapping
            .remove("set_env")
            .map(|v| string_map("set_env", &v))
            .transpose()?
            .unwrap_or_default();
        let throw_override = match mapping.remove("throw") {
            None | Some(Value::Null) => None,
            Some(v) => Some(bool_value("throw", &v)?),
        };
        let working_dir = match mapping.remove("cwd") {
            None | Some(Value::Null) => None,
            Some(v) => {
                let raw = scalar_string("cwd", &v)?;
                if raw.trim().is_empty() {
                    None
                } else {
                    Some(resolve_cwd(&raw, self.config_path)?)
                }
            }
        };
        let inner = self.parse_entry(cmd)?;
        if !mapping.is_empty() {
            let mut keys: Vec<String> = mapping.keys().map(key_string).collect();
            keys.sort();
            return Err(ConfigError::UnexpectedKeys(keys));
        }
        Ok(Scoped {
            inner,
            working_dir,
            required_env,
            set_env,
            throw_override,
            description,
        }
        .into())
    }

    fn parse_registry(&self, mapping: &Mapping) -> Result<CommandRegistry, ConfigError> {
        let mut registry = CommandRegistry::new();
        for (key, value) in mapping {
            let entry = self.parse_entry(value)?;
            let name = key_string(key);
            if name == "desc" {
                match entry {
                    Entry::Command(CommandNode::Literal(text)) => registry.description = text,
                    _ => return Err(ConfigError::InvalidDescription(describe(value))),
                }
            } else {
                registry.insert(name, entry);
            }
        }
        Ok(registry)
    }
}

/// Resolves the raw `cwd` value of a command object.
///
/// A value starting with `$THIS_DIR` is taken relative to the directory containing the
/// configuration file; anything else is made absolute against the process working directory.
///
/// # Errors
///
/// Returns `ConfigError::UnknownWorkingDirectory` if the process working directory is needed
/// and cannot be determined.
pub fn resolve_cwd(raw: &str, config_path: &Path) -> Result<PathBuf, ConfigError> {
    let trimmed = raw.trim();
    if let Some(rest) = trimmed.strip_prefix(THIS_DIR_TOKEN) {
        let base = config_path.parent().unwrap_or_else(|| Path::new(""));
        let rest = rest.trim_start_matches(['/', '\\']);
        return Ok(normalize(&base.join(rest)));
    }
    std::path::absolute(trimmed).map_err(|e| ConfigError::UnknownWorkingDirectory(e.to_string()))
}

/// Lexically drops `.` components.
fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// Searches the given directory for a project configuration file.
#[must_use]
pub fn find_project_config(dir: &Path) -> Option<PathBuf> {
    debug!("Searching for config file in {}", dir.display());
    let found = FILENAMES.iter().map(|f| dir.join(f)).find(|p| p.exists());
    if let Some(path) = &found {
        info!("Found config file: {}", path.display());
    }
    found
}

/// Path of the per-user configuration file.
///
/// # Errors
///
/// Returns `ConfigError::NoConfigDir` if the platform has no user configuration directory.
pub fn system_config_path() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR).join(FILENAMES[0]))
        .ok_or(ConfigError::NoConfigDir)
}

fn key_string(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => scalar_string("key", other).unwrap_or_else(|_| describe(other)),
    }
}

fn scalar_string(key: &str, value: &Value) -> Result<String, ConfigError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Tagged(tagged) => scalar_string(key, &tagged.value),
        other => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            expected: "a string",
            found: describe(other),
        }),
    }
}

fn bool_value(key: &str, value: &Value) -> Result<bool, ConfigError> {
    value.as_bool().ok_or_else(|| ConfigError::InvalidValue {
        key: key.to_string(),
        expected: "a boolean",
        found: describe(value),
    })
}

fn string_set(key: &str, value: &Value) -> Result<HashSet<String>, ConfigError> {
    match value {
        Value::Sequence(items) => items.iter().map(|v| scalar_string(key, v)).collect(),
        Value::Null => Ok(HashSet::new()),
        scalar => Ok(HashSet::from([scalar_string(key, scalar)?])),
    }
}

fn string_map(key: &str, value: &Value) -> Result<HashMap<String, String>, ConfigError> {
    match value {
        Value::Mapping(mapping) => mapping
            .iter()
            .map(|(k, v)| Ok((key_string(k), scalar_string(key, v)?)))
            .collect(),
        Value::Null => Ok(HashMap::new()),
        other => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            expected: "a mapping",
            found: describe(other),
        }),
    }
}

/// Short single-line rendering of a value for error messages.
fn describe(value: &Value) -> String {
    serde_yaml::to_string(value)
        .map(|s| s.trim().replace('\n', " "))
        .unwrap_or_else(|_| format!("{value:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> Result<RunConfig, ConfigError> {
        let document: Value = serde_yaml::from_str(yaml).unwrap();
        parse_document(&document, Path::new("/etc/run.yml"))
    }

    fn entry(yaml: &str) -> Entry {
        let config = parse(&format!("commands:\n  it: {yaml}\n")).unwrap();
        config.root.get("it").unwrap().clone()
    }

    #[test]
    fn test_scalar_is_literal() {
        assert_eq!(entry("echo hi"), Entry::Command(CommandNode::literal("echo hi")));
        assert_eq!(entry("42"), Entry::Command(CommandNode::literal("42")));
    }

    #[test]
    fn test_throw_directive() {
        assert_eq!(entry("{throw: true}"), Entry::Command(CommandNode::Throw(true)));
    }

    #[test]
    fn test_throw_with_other_key_is_registry() {
        let Entry::Registry(registry) = entry("{throw: true, other: ls}") else {
            panic!("expected a registry");
        };
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["throw", "other"]);
    }

    #[test]
    fn test_throw_requires_bool() {
        let result = parse("commands:\n  it: {throw: maybe}\n");
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_sequence_hoists_desc() {
        let Entry::Command(CommandNode::Sequence(sequence)) =
            entry("[{desc: Build}, {throw: true}, make]")
        else {
            panic!("expected a sequence");
        };
        assert_eq!(sequence.description, "Build");
        assert_eq!(
            sequence.items,
            vec![CommandNode::Throw(true), CommandNode::literal("make")]
        );
    }

    #[test]
    fn test_registry_in_list_is_rejected() {
        let result = parse("commands:\n  it:\n    - {a: ls, b: pwd}\n");
        assert!(matches!(result, Err(ConfigError::ExpectedCommand(_))));
    }

    #[test]
    fn test_command_object() {
        let yaml = r"
commands:
  deploy:
    desc: Deploy it
    cmd: ./deploy.sh
    cwd: $THIS_DIR/sub
    throw: true
    ensure_env: [TOKEN]
    set_env:
      MODE: prod
      RETRIES: 3
";
        let config = parse(yaml).unwrap();
        let Some(Entry::Command(CommandNode::Scoped(scoped))) = config.root.get("deploy") else {
            panic!("expected a scoped command");
        };
        assert_eq!(scoped.description, "Deploy it");
        assert_eq!(scoped.inner, Entry::Command(CommandNode::literal("./deploy.sh")));
        assert_eq!(scoped.working_dir, Some(PathBuf::from("/etc/sub")));
        assert_eq!(scoped.throw_override, Some(true));
        assert_eq!(scoped.required_env, HashSet::from(["TOKEN".to_string()]));
        assert_eq!(scoped.set_env.get("MODE").map(String::as_str), Some("prod"));
        assert_eq!(scoped.set_env.get("RETRIES").map(String::as_str), Some("3"));
    }

    #[test]
    fn test_command_object_defaults() {
        let Entry::Command(CommandNode::Scoped(scoped)) = entry("{cmd: ls}") else {
            panic!("expected a scoped command");
        };
        assert!(scoped.description.is_empty());
        assert!(scoped.working_dir.is_none());
        assert!(scoped.throw_override.is_none());
        assert!(scoped.required_env.is_empty());
        assert!(scoped.set_env.is_empty());
    }

    #[test]
    fn test_blank_cwd_is_absent() {
        for value in ["''", "'   '"] {
            let Entry::Command(CommandNode::Scoped(scoped)) =
                entry(&format!("{{cmd: ls, cwd: {value}}}"))
            else {
                panic!("expected a scoped command");
            };
            assert!(scoped.working_dir.is_none(), "cwd {value}");
        }
    }

    #[test]
    fn test_command_object_wrapping_registry() {
        let Entry::Command(CommandNode::Scoped(scoped)) = entry("{cmd: {a: ls, b: pwd}}") else {
            panic!("expected a scoped command");
        };
        let Entry::Registry(registry) = &scoped.inner else {
            panic!("expected a registry inside the command object");
        };
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_unexpected_keys() {
        let result = parse("commands:\n  it: {cmd: ls, foo: 1, bar: 2}\n");
        match result {
            Err(ConfigError::UnexpectedKeys(keys)) => assert_eq!(keys, vec!["bar", "foo"]),
            other => panic!("Expected UnexpectedKeys, got: {other:?}"),
        }
    }

    #[test]
    fn test_registry_description() {
        let Entry::Registry(registry) = entry("{desc: Helpers, a: ls, b: pwd}") else {
            panic!("expected a registry");
        };
        assert_eq!(registry.description, "Helpers");
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_registry_description_must_be_string() {
        let result = parse("commands:\n  it: {desc: [ls], a: ls}\n");
        assert!(matches!(result, Err(ConfigError::InvalidDescription(_))));
    }

    #[test]
    fn test_document_must_be_mapping() {
        assert!(matches!(parse("- ls\n"), Err(ConfigError::NotAMapping)));
    }

    #[test]
    fn test_missing_commands() {
        assert!(matches!(parse("other: 1\n"), Err(ConfigError::MissingCommands)));
    }

    #[test]
    fn test_resolve_cwd_this_dir() {
        let path = resolve_cwd("$THIS_DIR/sub", Path::new("/etc/run.yml")).unwrap();
        assert_eq!(path, PathBuf::from("/etc/sub"));
        let path = resolve_cwd("  $THIS_DIR  ", Path::new("/etc/run.yml")).unwrap();
        assert_eq!(path, PathBuf::from("/etc"));
    }

    #[test]
    fn test_resolve_cwd_relative_to_process() {
        let path = resolve_cwd("some/dir", Path::new("/etc/run.yml")).unwrap();
        assert_eq!(path, std::env::current_dir().unwrap().join("some/dir"));
    }

    #[test]
    fn test_override_with() {
        let mut system = RunConfig::default();
        system.root.insert("x", CommandNode::literal("1"));
        system.root.insert("y", CommandNode::literal("2"));
        let mut project = RunConfig::default();
        project.root.insert("x", CommandNode::literal("3"));

        let merged = system.override_with(project);
        assert_eq!(merged.root.get("x"), Some(&Entry::Command(CommandNode::literal("3"))));
        assert_eq!(merged.root.get("y"), Some(&Entry::Command(CommandNode::literal("2"))));
        assert_eq!(merged.root.len(), 2);
    }

    #[test]
    fn test_from_file_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        std::fs::write(&path, r#"{"commands": {"hello": "echo hello"}}"#).unwrap();
        let config = RunConfig::from_file(&path).unwrap();
        assert_eq!(
            config.root.get("hello"),
            Some(&Entry::Command(CommandNode::literal("echo hello")))
        );
    }

    #[test]
    fn test_from_file_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.yml");
        std::fs::write(&path, "commands:\n  here:\n    cmd: pwd\n    cwd: $THIS_DIR\n").unwrap();
        let config = RunConfig::from_file(&path).unwrap();
        let Some(Entry::Command(CommandNode::Scoped(scoped))) = config.root.get("here") else {
            panic!("expected a scoped command");
        };
        assert_eq!(scoped.working_dir.as_deref(), Some(dir.path()));
    }

    #[test]
    fn test_find_project_config() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_project_config(dir.path()).is_none());
        std::fs::write(dir.path().join("run.yaml"), "commands: {}\n").unwrap();
        assert_eq!(
            find_project_config(dir.path()),
            Some(dir.path().join("run.yaml"))
        );
    }
}

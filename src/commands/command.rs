use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use crate::commands::registry::CommandRegistry;

/// One node of the command tree
#[derive(Debug, Clone, PartialEq)]
pub enum CommandNode {
    /// A shell command line, run verbatim
    Literal(String),
    Sequence(Sequence),
    /// Sets "abort on non-zero exit" for the rest of the enclosing scope
    Throw(bool),
    /// Documentation only, inert when executed
    Desc(String),
    Scoped(Box<Scoped>),
}

impl CommandNode {
    #[must_use]
    pub fn literal(text: impl Into<String>) -> Self {
        CommandNode::Literal(text.into())
    }

    /// Description shown next to the command in usage listings
    #[must_use]
    pub fn description(&self) -> &str {
        match self {
            CommandNode::Sequence(sequence) => &sequence.description,
            CommandNode::Scoped(scoped) => &scoped.description,
            CommandNode::Literal(_) | CommandNode::Throw(_) | CommandNode::Desc(_) => "",
        }
    }
}

/// Either a runnable node or a nested namespace of commands
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Command(CommandNode),
    Registry(CommandRegistry),
}

impl Entry {
    #[must_use]
    pub fn description(&self) -> &str {
        match self {
            Entry::Command(node) => node.description(),
            Entry::Registry(registry) => &registry.description,
        }
    }
}

impl From<CommandNode> for Entry {
    fn from(node: CommandNode) -> Self {
        Entry::Command(node)
    }
}

impl From<CommandRegistry> for Entry {
    fn from(registry: CommandRegistry) -> Self {
        Entry::Registry(registry)
    }
}

/// Commands executed in order, sharing one scope
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sequence {
    pub items: Vec<CommandNode>,
    pub description: String,
}

impl Sequence {
    /// Builds a sequence, hoisting the first `Desc` item into the description.
    #[must_use]
    pub fn new(mut items: Vec<CommandNode>) -> Self {
        let mut description = String::new();
        if let Some(pos) = items.iter().position(|i| matches!(i, CommandNode::Desc(_))) {
            if let CommandNode::Desc(text) = items.remove(pos) {
                description = text;
            }
        }
        Sequence { items, description }
    }
}

/// A command (or nested registry) run with an overridden context
#[derive(Debug, Clone, PartialEq)]
pub struct Scoped {
    pub inner: Entry,
    pub working_dir: Option<PathBuf>,
    pub required_env: HashSet<String>,
    pub set_env: HashMap<String, String>,
    pub throw_override: Option<bool>,
    pub description: String,
}

impl Scoped {
    #[must_use]
    pub fn new(inner: impl Into<Entry>) -> Self {
        Scoped {
            inner: inner.into(),
            working_dir: None,
            required_env: HashSet::new(),
            set_env: HashMap::new(),
            throw_override: None,
            description: String::new(),
        }
    }

    /// Short name for messages: the description, else the command line(s) it wraps.
    #[must_use]
    pub fn label(&self) -> String {
        if !self.description.is_empty() {
            return self.description.clone();
        }
        match &self.inner {
            Entry::Command(CommandNode::Literal(text)) => text.clone(),
            Entry::Command(CommandNode::Sequence(sequence)) => sequence
                .items
                .iter()
                .filter_map(|item| match item {
                    CommandNode::Literal(text) => Some(text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("; "),
            Entry::Command(node) => node.description().to_string(),
            Entry::Registry(registry) => {
                format!("[{}]", registry.names().collect::<Vec<_>>().join(", "))
            }
        }
    }
}

impl From<Scoped> for CommandNode {
    fn from(scoped: Scoped) -> Self {
        CommandNode::Scoped(Box::new(scoped))
    }
}

impl From<Sequence> for CommandNode {
    fn from(sequence: Sequence) -> Self {
        CommandNode::Sequence(sequence)
    }
}

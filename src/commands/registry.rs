use std::fmt::Write;

use anstyle::{AnsiColor, Style};

use crate::commands::command::Entry;

const HEADER_STYLE: Style = Style::new().fg_color(Some(anstyle::Color::Ansi(AnsiColor::Green)));
const NAME_STYLE: Style = Style::new().fg_color(Some(anstyle::Color::Ansi(AnsiColor::Blue)));
const AVAILABLE_STYLE: Style =
    Style::new().fg_color(Some(anstyle::Color::Ansi(AnsiColor::Yellow)));

fn pick(style: Style, color: bool) -> Style {
    if color { style } else { Style::new() }
}

/// One level of the command namespace, keeping children in document order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CommandRegistry {
    pub description: String,
    children: Vec<(String, Entry)>,
}

impl CommandRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a child, replacing (in place) any existing child with the same name.
    pub fn insert(&mut self, name: impl Into<String>, entry: impl Into<Entry>) {
        let name = name.into();
        let entry = entry.into();
        match self.children.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = entry,
            None => self.children.push((name, entry)),
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.children
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, entry)| entry)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Entry)> {
        self.children.iter().map(|(n, e)| (n.as_str(), e))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.children.iter().map(|(n, _)| n.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Moves every child of `other` into this registry; names in `other` win.
    pub fn extend(&mut self, other: CommandRegistry) {
        for (name, entry) in other.children {
            self.insert(name, entry);
        }
    }

    /// Renders the `Commands:` listing with aligned descriptions.
    #[must_use]
    pub fn usage(&self, color: bool) -> String {
        let header = pick(HEADER_STYLE, color);
        let name_style = pick(NAME_STYLE, color);
        let mut out = format!("{}Commands:{}\n", header.render(), header.render_reset());
        let width = self.names().map(str::len).max().unwrap_or(0);
        for (name, entry) in self.iter() {
            let line = format!(
                "  {}{name:<width$}{}  {}",
                name_style.render(),
                name_style.render_reset(),
                entry.description()
            );
            let _ = writeln!(out, "{}", line.trim_end());
        }
        out
    }

    /// Renders `Available commands: [a, b]`, used after resolution errors.
    #[must_use]
    pub fn available_commands(&self, color: bool) -> String {
        let style = pick(AVAILABLE_STYLE, color);
        let names: Vec<String> = self
            .names()
            .map(|n| format!("{}{n}{}", style.render(), style.render_reset()))
            .collect();
        format!("Available commands: [{}]", names.join(", "))
    }
}

//! The command tree
//!
//! A configuration is a tree of registries (named namespaces) whose leaves are command nodes.
//! Nodes are either shell command lines, sequences of nodes, directives that change the
//! execution context for the rest of their scope, or scoped wrappers that override the working
//! directory, environment and failure policy for the command (or registry) they wrap.

pub mod command;
pub mod registry;

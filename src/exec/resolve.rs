use std::collections::VecDeque;

use log::debug;

use crate::commands::command::{CommandNode, Entry};
use crate::commands::registry::CommandRegistry;
use crate::exec::ExecError;

/// Walks registries by popping names off the front of `args` until a command node is reached.
///
/// Arguments left over after the node is found stay in `args`.
///
/// # Errors
///
/// Returns `ExecError::MissingCommand` if `args` runs out before a command is reached, or
/// `ExecError::UnknownCommand` if a name is not present in its registry.
pub fn resolve<'r>(
    registry: &'r CommandRegistry,
    args: &mut VecDeque<String>,
) -> Result<&'r CommandNode, ExecError> {
    let mut registry = registry;
    loop {
        let Some(name) = args.pop_front() else {
            return Err(ExecError::MissingCommand {
                available: registry.available_commands(false),
            });
        };
        match registry.get(&name) {
            Some(Entry::Registry(nested)) => {
                debug!("Entering registry '{name}'");
                registry = nested;
            }
            Some(Entry::Command(node)) => {
                debug!("Resolved command '{name}'");
                return Ok(node);
            }
            None => {
                return Err(ExecError::UnknownCommand {
                    name,
                    available: registry.available_commands(false),
                });
            }
        }
    }
}

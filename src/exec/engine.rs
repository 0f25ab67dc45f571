use log::debug;

use crate::commands::command::{CommandNode, Entry, Scoped, Sequence};
use crate::exec::{ExecError, ExecutionContext, resolve};

/// Interprets one node against the context.
///
/// Directives change the context for the rest of the enclosing scope. Sequences and scoped
/// commands open a new scope: whatever they change is put back before this returns, including
/// when an error is propagating.
///
/// # Errors
///
/// Returns `ExecError::CommandFailed` when a command exits non-zero while failures abort,
/// and any resolution, environment, directory or spawn error raised below this node.
pub fn execute(node: &CommandNode, ctx: &mut ExecutionContext) -> Result<(), ExecError> {
    match node {
        CommandNode::Throw(value) => {
            ctx.throw_on_failure = *value;
            Ok(())
        }
        CommandNode::Desc(_) => Ok(()),
        CommandNode::Literal(command) => execute_literal(command, ctx),
        CommandNode::Sequence(sequence) => execute_sequence(sequence, ctx),
        CommandNode::Scoped(scoped) => execute_scoped(scoped, ctx),
    }
}

fn execute_literal(command: &str, ctx: &mut ExecutionContext) -> Result<(), ExecError> {
    let status = ctx.run_shell(command)?;
    if status != 0 && ctx.throw_on_failure {
        return Err(ExecError::CommandFailed {
            command: command.to_string(),
            status,
        });
    }
    Ok(())
}

fn execute_sequence(sequence: &Sequence, ctx: &mut ExecutionContext) -> Result<(), ExecError> {
    let saved = ctx.snapshot();
    let mut ctx = scopeguard::guard(ctx, move |ctx| ctx.restore(saved));
    for item in &sequence.items {
        execute(item, &mut ctx)?;
    }
    Ok(())
}

fn execute_scoped(scoped: &Scoped, ctx: &mut ExecutionContext) -> Result<(), ExecError> {
    let saved = ctx.snapshot();
    let saved_env = ctx.apply_env(&scoped.set_env);
    let mut ctx = scopeguard::guard(ctx, move |ctx| {
        ctx.restore(saved);
        ctx.restore_env(saved_env);
        debug!("Left scope");
    });

    ctx.ensure_env(&scoped.required_env, &scoped.label())?;
    if let Some(throw) = scoped.throw_override {
        ctx.throw_on_failure = throw;
    }
    if let Some(dir) = &scoped.working_dir {
        ctx.change_dir(dir)?;
    }

    match &scoped.inner {
        Entry::Command(node) => execute(node, &mut ctx),
        Entry::Registry(registry) => {
            let node = resolve(registry, &mut ctx.remaining_args)?;
            execute(node, &mut ctx)
        }
    }
}

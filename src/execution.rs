// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Execution
//!
//! [`ExecutorCoordinator`] runs a command's handler to completion and
//! turns the outcome into a [`CommandResult`], funneling any failure
//! through an [`ExceptionController`] as a side effect before handing the
//! result back to the caller. It never spawns a thread itself (§5): how
//! the handler's future is actually driven is delegated to an injected
//! [`CommandExecutor`], so embedding an existing async runtime (tokio,
//! async-std, a game engine's own scheduler) is the caller's choice, not
//! this crate's.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use thiserror::Error;

use crate::caption::CaptionRegistry;
use crate::command::CommandHandler;
use crate::context::CommandContext;
use crate::exception::{CommandExecutionError, ExceptionContext, ExceptionController, HandlerOutcome};

/// How a handler's execution concluded.
pub enum CommandOutcome {
    /// The handler ran to completion without error.
    Success,
    /// The handler returned an error, or panicked.
    Failure {
        /// The error the handler (or the panic-catching wrapper) produced.
        error: Arc<dyn std::error::Error + Send + Sync>,
        /// The caption the exception controller's matching default handler
        /// rendered for display to the sender, if any did.
        caption: Option<String>,
    },
}

impl CommandOutcome {
    /// `true` for [`CommandOutcome::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, CommandOutcome::Success)
    }
}

/// The context as it stood after execution, plus how it concluded.
pub struct CommandResult<C> {
    /// The context, carrying every value parsed and any side effects the
    /// handler recorded into it before failing (if it failed).
    pub context: CommandContext<C>,
    /// How execution concluded.
    pub outcome: CommandOutcome,
}

/// A handler panicked instead of returning an error.
#[derive(Debug, Error)]
#[error("command handler panicked: {0}")]
pub struct HandlerPanicError(pub String);

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Decides how a handler's future is actually driven to completion.
///
/// This crate ships three implementations reflecting the three ways a host
/// application typically wants to run a command: block the calling
/// thread, hand the future back unmodified to an async caller that will
/// await it itself, or drive it via an externally owned spawner (a real
/// runtime's task queue) without this crate depending on that runtime.
pub trait CommandExecutor<C>: Send + Sync {
    /// Drive `fut` to completion, returning a future of its result.
    /// Implementations must not block the thread calling `run` itself if
    /// `fut` does — only the future *returned* may do the actual waiting
    /// (`SimpleExecutor` is the one exception: it exists specifically for
    /// non-async callers and documents the trade-off).
    fn run(&self, fut: BoxFuture<'static, CommandResult<C>>) -> BoxFuture<'static, CommandResult<C>>;
}

/// Runs the future to completion immediately on the calling thread via
/// `futures::executor::block_on`, for hosts with no async runtime of their
/// own (tests, simple CLIs).
pub struct SimpleExecutor;

impl<C: Send + 'static> CommandExecutor<C> for SimpleExecutor {
    fn run(&self, fut: BoxFuture<'static, CommandResult<C>>) -> BoxFuture<'static, CommandResult<C>> {
        let result = futures::executor::block_on(fut);
        futures::future::ready(result).boxed()
    }
}

/// Returns the future unchanged, for callers already inside an async
/// context who will await the result themselves; this coordinator performs
/// no scheduling at all.
pub struct NonSchedulingExecutor;

impl<C: Send + 'static> CommandExecutor<C> for NonSchedulingExecutor {
    fn run(&self, fut: BoxFuture<'static, CommandResult<C>>) -> BoxFuture<'static, CommandResult<C>> {
        fut
    }
}

/// Delegates to an externally supplied spawn function — typically a thin
/// wrapper around `tokio::spawn` or an equivalent — so this crate never
/// takes a direct dependency on any particular async runtime.
pub struct AsyncExecutor<C> {
    spawn: Arc<dyn Fn(BoxFuture<'static, CommandResult<C>>) -> BoxFuture<'static, CommandResult<C>> + Send + Sync>,
}

impl<C> AsyncExecutor<C> {
    /// Wrap a host-supplied spawn function.
    pub fn new(
        spawn: impl Fn(BoxFuture<'static, CommandResult<C>>) -> BoxFuture<'static, CommandResult<C>> + Send + Sync + 'static,
    ) -> Self {
        AsyncExecutor { spawn: Arc::new(spawn) }
    }
}

impl<C: Send + 'static> CommandExecutor<C> for AsyncExecutor<C> {
    fn run(&self, fut: BoxFuture<'static, CommandResult<C>>) -> BoxFuture<'static, CommandResult<C>> {
        (self.spawn)(fut)
    }
}

impl<C> fmt::Debug for AsyncExecutor<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AsyncExecutor(..)")
    }
}

/// Runs a resolved command's handler and reports the outcome, catching
/// both handler errors and handler panics (§4.5 — a panic is not allowed
/// to unwind past the crate boundary) and funneling failures through an
/// [`ExceptionController`] as a side effect.
pub struct ExecutorCoordinator<C> {
    executor: Arc<dyn CommandExecutor<C>>,
    exception_controller: Arc<ExceptionController<C>>,
    captions: Arc<dyn CaptionRegistry>,
}

impl<C: Send + Sync + 'static> ExecutorCoordinator<C> {
    /// Construct a coordinator from its three collaborators.
    pub fn new(
        executor: Arc<dyn CommandExecutor<C>>,
        exception_controller: Arc<ExceptionController<C>>,
        captions: Arc<dyn CaptionRegistry>,
    ) -> Self {
        ExecutorCoordinator {
            executor,
            exception_controller,
            captions,
        }
    }

    /// A coordinator using [`SimpleExecutor`], for synchronous callers.
    pub fn simple(exception_controller: Arc<ExceptionController<C>>, captions: Arc<dyn CaptionRegistry>) -> Self {
        Self::new(Arc::new(SimpleExecutor), exception_controller, captions)
    }

    /// Run `handler` against `ctx`, driven by this coordinator's
    /// [`CommandExecutor`], and report the outcome. On failure, dispatches
    /// the resulting error through the exception controller before
    /// returning: besides logging and any other side effects a handler
    /// performs, the caption the matching default handler rendered is
    /// attached to the returned [`CommandOutcome::Failure`] so the caller
    /// can surface it to the sender.
    pub async fn execute(&self, ctx: CommandContext<C>, handler: Arc<dyn CommandHandler<C>>) -> CommandResult<C> {
        let fut = run_handler_catching_panics(ctx, handler).boxed();
        let mut result = self.executor.run(fut).await;
        let rendered_caption = if let CommandOutcome::Failure { ref error, .. } = result.outcome {
            let exception_ctx = ExceptionContext {
                command_context: Some(&result.context),
                captions: self.captions.as_ref(),
            };
            match self.exception_controller.dispatch(Arc::clone(error), &exception_ctx) {
                HandlerOutcome::Handled(caption) => caption,
                _ => None,
            }
        } else {
            None
        };
        if let CommandOutcome::Failure { ref mut caption, .. } = result.outcome {
            *caption = rendered_caption;
        }
        result
    }
}

async fn run_handler_catching_panics<C: Send + 'static>(
    mut ctx: CommandContext<C>,
    handler: Arc<dyn CommandHandler<C>>,
) -> CommandResult<C>
where
    C: Sync,
{
    let outcome = AssertUnwindSafe(handler.execute(&mut ctx)).catch_unwind().await;
    let outcome = match outcome {
        Ok(Ok(())) => CommandOutcome::Success,
        Ok(Err(handler_error)) => CommandOutcome::Failure {
            error: Arc::new(CommandExecutionError { source: Arc::from(handler_error) }),
            caption: None,
        },
        Err(panic) => CommandOutcome::Failure {
            error: Arc::new(CommandExecutionError {
                source: Arc::new(HandlerPanicError(panic_message(panic.as_ref()))),
            }),
            caption: None,
        },
    };
    CommandResult { context: ctx, outcome }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caption::DefaultCaptionRegistry;
    use crate::exception::ExceptionController;

    fn coordinator() -> ExecutorCoordinator<()> {
        ExecutorCoordinator::simple(
            Arc::new(ExceptionController::with_default_handlers()),
            Arc::new(DefaultCaptionRegistry::new()),
        )
    }

    #[tokio::test]
    async fn successful_handler_reports_success() {
        let coordinator = coordinator();
        let handler: Arc<dyn CommandHandler<()>> = Arc::new(|_ctx: &mut CommandContext<()>| Ok(()));
        let result = coordinator.execute(CommandContext::new(()), handler).await;
        assert!(result.outcome.is_success());
    }

    #[tokio::test]
    async fn failing_handler_reports_failure() {
        let coordinator = coordinator();
        let handler: Arc<dyn CommandHandler<()>> =
            Arc::new(|_ctx: &mut CommandContext<()>| Err("nope".into()));
        let result = coordinator.execute(CommandContext::new(()), handler).await;
        assert!(!result.outcome.is_success());
    }

    #[tokio::test]
    async fn panicking_handler_is_caught_as_failure() {
        let coordinator = coordinator();
        let handler: Arc<dyn CommandHandler<()>> = Arc::new(|_ctx: &mut CommandContext<()>| panic!("boom"));
        let result = coordinator.execute(CommandContext::new(()), handler).await;
        assert!(!result.outcome.is_success());
    }
}

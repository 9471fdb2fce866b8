// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Exception handling
//!
//! Rust has no exception-class hierarchy to walk, so the dispatch this
//! module implements (§4.5) is built on `Box`/`Arc<dyn std::error::Error +
//! Send + Sync>` plus `downcast_ref`: a handler is registered "for type
//! `E`" and matches an in-flight error by attempting
//! `error.downcast_ref::<E>()`. [`ExceptionController::dispatch`] then
//! walks registered handlers in reverse insertion order — the most
//! recently registered handler gets first refusal, exactly as the last
//! `catch` block nearest the call site would in a language with real
//! exceptions — and supports the same three outcomes a handler can
//! produce: handle it, rethrow the same error to the next handler, or
//! rethrow a *different* error, which restarts the walk from the most
//! recently registered handler against the new error.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::caption::{Caption, CaptionKey, CaptionRegistry};
use crate::context::CommandContext;
use crate::parser::ArgumentParseError;

/// No command in the tree matched the typed input.
#[derive(Debug, Clone, Error)]
#[error("no command matched '{input}'")]
pub struct NoSuchCommandError {
    /// The full line the sender typed.
    pub input: String,
}

/// The command line did not match the tree's grammar at `remaining`.
#[derive(Debug, Clone, Error)]
#[error("invalid syntax near '{remaining}'")]
pub struct InvalidSyntaxError {
    /// The suffix of the input that could not be matched.
    pub remaining: String,
    /// A generated usage string for the command(s) that were closest to
    /// matching.
    pub usage: String,
}

/// The sender lacked a permission a component or command required.
#[derive(Debug, Clone, Error)]
#[error("missing permission '{permission}'")]
pub struct NoPermissionError {
    /// The permission name that was denied (empty for a predicate-only
    /// permission).
    pub permission: String,
}

/// The sender's concrete type was not one the command accepts.
#[derive(Debug, Clone, Error)]
#[error("command cannot be run by senders of type {actual}")]
pub struct InvalidSenderError {
    /// The sender type name that attempted to run the command.
    pub actual: String,
}

/// A command's handler returned an error while executing.
#[derive(Debug, Clone, Error)]
#[error("command execution failed: {source}")]
pub struct CommandExecutionError {
    /// The error the handler returned, kept reference-counted so a
    /// handler (e.g. [`unwrapping`]) can rethrow it without cloning its
    /// contents.
    pub source: Arc<dyn std::error::Error + Send + Sync>,
}

/// What a dispatched exception resolved to, once
/// [`ExceptionController::dispatch`] has walked every matching handler.
pub enum HandlerOutcome {
    /// A handler fully handled the error; nothing further happens. Carries
    /// the caption text rendered for the sender, if the handler rendered
    /// one.
    Handled(Option<String>),
    /// The current handler declined to act; continue to the next matching
    /// handler with the same error.
    Rethrow,
    /// The current handler replaced the error with a different one;
    /// restart the walk from the beginning against the new error.
    RethrowDifferent(Arc<dyn std::error::Error + Send + Sync>),
}

impl fmt::Debug for HandlerOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerOutcome::Handled(caption) => write!(f, "Handled({caption:?})"),
            HandlerOutcome::Rethrow => write!(f, "Rethrow"),
            HandlerOutcome::RethrowDifferent(e) => write!(f, "RethrowDifferent({e})"),
        }
    }
}

/// Read-only context made available to an exception handler: the command
/// context the failure occurred in, and the caption registry to render a
/// message through.
pub struct ExceptionContext<'a, C> {
    /// The context of the execution that failed. `None` if the failure
    /// happened before a context existed (e.g. no command matched at all).
    pub command_context: Option<&'a CommandContext<C>>,
    /// The registry used to render captions into display strings.
    pub captions: &'a dyn CaptionRegistry,
}

struct RegisteredHandler<C> {
    matches: Box<dyn Fn(&(dyn std::error::Error + Send + Sync)) -> bool + Send + Sync>,
    handle: Box<dyn Fn(&(dyn std::error::Error + Send + Sync), &ExceptionContext<'_, C>) -> HandlerOutcome + Send + Sync>,
}

/// An ordered set of exception handlers, dispatched per §4.5.
pub struct ExceptionController<C> {
    handlers: Vec<RegisteredHandler<C>>,
}

impl<C> Default for ExceptionController<C> {
    fn default() -> Self {
        ExceptionController { handlers: Vec::new() }
    }
}

impl<C> ExceptionController<C> {
    /// An empty controller with no handlers registered; an unhandled error
    /// dispatched against it resolves to [`HandlerOutcome::Rethrow`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a controller with the crate's default handlers installed: a
    /// catch-all equivalent to a `Throwable` handler, followed by
    /// `ArgumentParseError`, `NoSuchCommandError`, `NoPermissionError`,
    /// `InvalidSenderError`, `InvalidSyntaxError`, and
    /// `CommandExecutionError`. Because dispatch walks handlers in
    /// reverse insertion order, the specific handlers all run before the
    /// catch-all, and user handlers registered after this call run before
    /// any of these defaults.
    pub fn with_default_handlers() -> Self {
        let mut controller = Self::new();
        controller.register_catch_all(|e, _ctx: &ExceptionContext<'_, C>| {
            log::error!("unhandled exception: {e}");
            HandlerOutcome::Handled(None)
        });
        controller.register(|e: &ArgumentParseError, ctx: &ExceptionContext<'_, C>| {
            log::error!("argument parse failure: {e}");
            let caption = ctx
                .captions
                .render(&Caption::new(CaptionKey::ARGUMENT_PARSE_FAILURE).with_variable("cause", e.to_string()));
            HandlerOutcome::Handled(Some(caption))
        });
        controller.register(|e: &NoSuchCommandError, ctx: &ExceptionContext<'_, C>| {
            log::warn!("no such command: {}", e.input);
            let caption = ctx.captions.render(&Caption::new(CaptionKey::NO_SUCH_COMMAND).with_variable("input", e.input.clone()));
            HandlerOutcome::Handled(Some(caption))
        });
        controller.register(|e: &NoPermissionError, ctx: &ExceptionContext<'_, C>| {
            log::warn!("permission denied: {}", e.permission);
            let caption = ctx.captions.render(&Caption::new(CaptionKey::NO_PERMISSION));
            HandlerOutcome::Handled(Some(caption))
        });
        controller.register(|e: &InvalidSenderError, ctx: &ExceptionContext<'_, C>| {
            log::warn!("invalid sender: {}", e.actual);
            let caption = ctx
                .captions
                .render(&Caption::new(CaptionKey::INVALID_SENDER).with_variable("sender_type", e.actual.clone()));
            HandlerOutcome::Handled(Some(caption))
        });
        controller.register(|e: &InvalidSyntaxError, ctx: &ExceptionContext<'_, C>| {
            log::warn!("invalid syntax near '{}'", e.remaining);
            let caption = ctx.captions.render(&Caption::new(CaptionKey::INVALID_SYNTAX).with_variable("usage", e.usage.clone()));
            HandlerOutcome::Handled(Some(caption))
        });
        controller.register(|e: &CommandExecutionError, ctx: &ExceptionContext<'_, C>| {
            log::error!("command execution failed: {}", e.source);
            let caption = ctx.captions.render(&Caption::new(CaptionKey::COMMAND_EXECUTION_FAILURE));
            HandlerOutcome::Handled(Some(caption))
        });
        controller
    }

    /// Register a handler that only fires for errors downcastable to `E`.
    pub fn register<E>(&mut self, handler: impl Fn(&E, &ExceptionContext<'_, C>) -> HandlerOutcome + Send + Sync + 'static)
    where
        E: std::error::Error + 'static,
    {
        self.handlers.push(RegisteredHandler {
            matches: Box::new(|e| e.downcast_ref::<E>().is_some()),
            handle: Box::new(move |e, ctx| handler(e.downcast_ref::<E>().expect("matched by type"), ctx)),
        });
    }

    /// Register a handler that fires for *any* error, the equivalent of a
    /// `catch (Throwable t)` block.
    pub fn register_catch_all(
        &mut self,
        handler: impl Fn(&(dyn std::error::Error + Send + Sync), &ExceptionContext<'_, C>) -> HandlerOutcome + Send + Sync + 'static,
    ) {
        self.handlers.push(RegisteredHandler {
            matches: Box::new(|_| true),
            handle: Box::new(handler),
        });
    }

    /// Walk registered handlers in reverse insertion order until one
    /// returns [`HandlerOutcome::Handled`], or none match (in which case
    /// the final outcome is [`HandlerOutcome::Rethrow`]).
    pub fn dispatch(
        &self,
        error: Arc<dyn std::error::Error + Send + Sync>,
        ctx: &ExceptionContext<'_, C>,
    ) -> HandlerOutcome {
        let mut current = error;
        loop {
            let mut rethrown_different = None;
            let mut handled_caption = None;
            let mut handled = false;
            for registered in self.handlers.iter().rev() {
                if !(registered.matches)(current.as_ref()) {
                    continue;
                }
                match (registered.handle)(current.as_ref(), ctx) {
                    HandlerOutcome::Handled(caption) => {
                        handled = true;
                        handled_caption = caption;
                        break;
                    }
                    HandlerOutcome::Rethrow => continue,
                    HandlerOutcome::RethrowDifferent(new_error) => {
                        rethrown_different = Some(new_error);
                        break;
                    }
                }
            }
            if handled {
                return HandlerOutcome::Handled(handled_caption);
            }
            match rethrown_different {
                Some(new_error) => current = new_error,
                None => return HandlerOutcome::Rethrow,
            }
        }
    }
}

/// A handler that does nothing and marks the error handled, silencing it.
pub fn noop<E, C>() -> impl Fn(&E, &ExceptionContext<'_, C>) -> HandlerOutcome + Send + Sync + Clone
where
    E: std::error::Error,
{
    |_e, _ctx| HandlerOutcome::Handled(None)
}

/// A handler that never handles the error, always forwarding it to the
/// next matching handler (or back to the caller of `dispatch` if none
/// remain).
pub fn pass_through<E, C>() -> impl Fn(&E, &ExceptionContext<'_, C>) -> HandlerOutcome + Send + Sync + Clone
where
    E: std::error::Error,
{
    |_e, _ctx| HandlerOutcome::Rethrow
}

/// A handler that runs `consumer` as a side effect (typically logging or
/// notifying the sender) and then forwards the error unchanged.
pub fn pass_through_with<E, C>(
    consumer: impl Fn(&E, &ExceptionContext<'_, C>) + Send + Sync + 'static,
) -> impl Fn(&E, &ExceptionContext<'_, C>) -> HandlerOutcome + Send + Sync
where
    E: std::error::Error,
{
    move |e, ctx| {
        consumer(e, ctx);
        HandlerOutcome::Rethrow
    }
}

/// A handler for [`CommandExecutionError`] that strips the wrapper and
/// rethrows the handler's original cause, letting a handler registered for
/// that cause's concrete type catch it on the restarted walk.
pub fn unwrapping<C>() -> impl Fn(&CommandExecutionError, &ExceptionContext<'_, C>) -> HandlerOutcome + Send + Sync {
    |e, _ctx| HandlerOutcome::RethrowDifferent(Arc::clone(&e.source))
}

/// Like [`unwrapping`], but only unwraps when the wrapped cause satisfies
/// `predicate`; otherwise the wrapper itself is handled (silenced).
pub fn unwrapping_if<C>(
    predicate: impl Fn(&(dyn std::error::Error + Send + Sync)) -> bool + Send + Sync + 'static,
) -> impl Fn(&CommandExecutionError, &ExceptionContext<'_, C>) -> HandlerOutcome + Send + Sync {
    move |e, _ctx| {
        if predicate(e.source.as_ref()) {
            HandlerOutcome::RethrowDifferent(Arc::clone(&e.source))
        } else {
            HandlerOutcome::Handled(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caption::DefaultCaptionRegistry;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn ctx<'a, C>(captions: &'a DefaultCaptionRegistry) -> ExceptionContext<'a, C> {
        ExceptionContext {
            command_context: None,
            captions,
        }
    }

    #[derive(Debug, Error)]
    #[error("boom")]
    struct Boom;

    #[test]
    fn most_recently_registered_handler_runs_first() {
        let mut controller: ExceptionController<()> = ExceptionController::new();
        let first_ran = Arc::new(AtomicBool::new(false));
        let second_ran = Arc::new(AtomicBool::new(false));
        let first_flag = Arc::clone(&first_ran);
        let second_flag = Arc::clone(&second_ran);
        controller.register(move |_e: &Boom, _ctx: &ExceptionContext<'_, ()>| {
            first_flag.store(true, Ordering::SeqCst);
            HandlerOutcome::Rethrow
        });
        controller.register(move |_e: &Boom, _ctx: &ExceptionContext<'_, ()>| {
            second_flag.store(true, Ordering::SeqCst);
            HandlerOutcome::Handled(None)
        });
        let captions = DefaultCaptionRegistry::new();
        let outcome = controller.dispatch(Arc::new(Boom), &ctx(&captions));
        assert!(matches!(outcome, HandlerOutcome::Handled(None)));
        assert!(second_ran.load(Ordering::SeqCst));
        assert!(!first_ran.load(Ordering::SeqCst));
    }

    #[test]
    fn rethrow_different_restarts_dispatch() {
        #[derive(Debug, Error)]
        #[error("wrapped")]
        struct Wrapped;

        let mut controller: ExceptionController<()> = ExceptionController::new();
        controller.register(|_e: &Wrapped, _ctx: &ExceptionContext<'_, ()>| HandlerOutcome::Handled(None));
        controller.register(|_e: &Boom, _ctx: &ExceptionContext<'_, ()>| HandlerOutcome::RethrowDifferent(Arc::new(Wrapped)));
        let captions = DefaultCaptionRegistry::new();
        let outcome = controller.dispatch(Arc::new(Boom), &ctx(&captions));
        assert!(matches!(outcome, HandlerOutcome::Handled(None)));
    }

    #[test]
    fn unmatched_error_falls_through_as_rethrow() {
        let controller: ExceptionController<()> = ExceptionController::new();
        let captions = DefaultCaptionRegistry::new();
        let outcome = controller.dispatch(Arc::new(Boom), &ctx(&captions));
        assert!(matches!(outcome, HandlerOutcome::Rethrow));
    }

    #[test]
    fn catch_all_handler_matches_any_type() {
        let mut controller: ExceptionController<()> = ExceptionController::new();
        controller.register_catch_all(|_e, _ctx| HandlerOutcome::Handled(None));
        let captions = DefaultCaptionRegistry::new();
        let outcome = controller.dispatch(Arc::new(Boom), &ctx(&captions));
        assert!(matches!(outcome, HandlerOutcome::Handled(None)));
    }

    #[test]
    fn unwrapping_handler_exposes_inner_cause() {
        let mut controller: ExceptionController<()> = ExceptionController::new();
        controller.register(|_e: &Boom, _ctx: &ExceptionContext<'_, ()>| HandlerOutcome::Handled(None));
        controller.register(unwrapping::<()>());
        let wrapped = CommandExecutionError { source: Arc::new(Boom) };
        let captions = DefaultCaptionRegistry::new();
        let outcome = controller.dispatch(Arc::new(wrapped), &ctx(&captions));
        assert!(matches!(outcome, HandlerOutcome::Handled(None)));
    }
}

// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Command definitions
//!
//! [`CommandBuilder`] assembles an ordered chain of
//! [`CommandComponent`](crate::tree::CommandComponent)s plus a handler into
//! a [`Command`], the unit [`crate::manager::CommandManager::command`]
//! inserts into the tree. This mirrors the teacher's `parser::builder`
//! module, generalized from a fixed node/parameter distinction to the
//! three-way `LITERAL`/`REQUIRED`/`OPTIONAL` split (§4.1, §6).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::context::CommandContext;
use crate::meta::{MetaKey, MetaMap};
use crate::parser::flag::FlagSet;
use crate::parser::{ArgumentParser, ErasedParserHandle};
use crate::permission::Permission;
use crate::tree::{ArgumentDescription, CommandComponent, ComponentKind, DefaultValue};

/// The error type a handler returns on failure; wrapped by the executor
/// into a `CommandExecutionException` for the exception controller (§4.5).
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// The result of running a command's handler.
pub type HandlerResult = Result<(), HandlerError>;

/// A command's business logic: given the fully parsed context, perform the
/// command's effect.
///
/// Async so a handler can await platform I/O without blocking the executor
/// thread (§5); a purely synchronous handler can still implement this
/// trait via the blanket `Fn` impl below.
#[async_trait]
pub trait CommandHandler<C>: Send + Sync
where
    C: Send + Sync,
{
    /// Run the handler against the fully populated context.
    async fn execute(&self, ctx: &mut CommandContext<C>) -> HandlerResult;
}

#[async_trait]
impl<C, F> CommandHandler<C> for F
where
    C: Send + Sync,
    F: Fn(&mut CommandContext<C>) -> HandlerResult + Send + Sync,
{
    async fn execute(&self, ctx: &mut CommandContext<C>) -> HandlerResult {
        self(ctx)
    }
}

/// A boxed future, for handlers constructed from an async closure via
/// [`async_handler`].
pub type BoxHandlerFuture<'a> = Pin<Box<dyn Future<Output = HandlerResult> + Send + 'a>>;

struct AsyncFnHandler<F> {
    f: F,
}

#[async_trait]
impl<C, F, Fut> CommandHandler<C> for AsyncFnHandler<F>
where
    C: Send + Sync,
    F: for<'a> Fn(&'a mut CommandContext<C>) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send,
{
    async fn execute(&self, ctx: &mut CommandContext<C>) -> HandlerResult {
        (self.f)(ctx).await
    }
}

/// Wrap an `async fn(&mut CommandContext<C>) -> HandlerResult`-shaped
/// closure as a [`CommandHandler`], since a plain `async` closure does not
/// yet implement `Fn` directly returning a named trait.
pub fn async_handler<C, F, Fut>(f: F) -> impl CommandHandler<C>
where
    C: Send + Sync,
    F: for<'a> Fn(&'a mut CommandContext<C>) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send,
{
    AsyncFnHandler { f }
}

/// The terminal, executable payload attached to a tree node: the
/// permission guarding it, its handler, and any metadata attached by the
/// builder.
pub struct ExecutableCommand<C> {
    /// The permission required to run this command (in addition to any
    /// permission on its path's components).
    pub permission: Permission<C>,
    /// The handler invoked once parsing succeeds.
    pub handler: Arc<dyn CommandHandler<C>>,
    /// Builder-attached metadata (e.g. a description, a category).
    pub meta: MetaMap,
    /// The flags this command accepts, consulted once its positional
    /// components have all been matched.
    pub flags: Option<Arc<FlagSet<C>>>,
    /// A restriction on which senders may run this command (e.g. "console
    /// only", "players only"), checked before the handler runs. The
    /// `String` names the expected sender kind, used to render
    /// `InvalidSenderError`.
    pub sender_check: Option<(String, Arc<dyn Fn(&C) -> bool + Send + Sync>)>,
}

impl<C> ExecutableCommand<C> {
    /// Construct directly from a permission and handler, with empty
    /// metadata and no flags. Most callers should go through
    /// [`CommandBuilder`] instead.
    pub fn new(permission: Permission<C>, handler: Arc<dyn CommandHandler<C>>) -> Self {
        ExecutableCommand {
            permission,
            handler,
            meta: MetaMap::new(),
            flags: None,
            sender_check: None,
        }
    }
}

/// A fully built command: its path of components, and the executable
/// payload attached at the final one.
pub struct Command<C> {
    /// The ordered path of components from the tree root.
    pub components: Vec<CommandComponent<C>>,
    /// The permission/handler/meta payload to attach at the last
    /// component.
    pub executable: Arc<ExecutableCommand<C>>,
}

/// Building a [`Command`] violated one of the tree's structural
/// invariants (§4.1, §6).
#[derive(Debug, Clone, Error)]
pub enum CommandBuildError {
    /// A `REQUIRED` component was declared after an `OPTIONAL` one.
    #[error("REQUIRED component '{0}' cannot follow an OPTIONAL component")]
    RequiredAfterOptional(String),
    /// No components were declared at all.
    #[error("a command must have at least one component")]
    Empty,
}

/// Fluent builder for a [`Command`] (§6): add components in order with
/// `.literal`/`.required`/`.optional`, then finish with `.handler`.
pub struct CommandBuilder<C> {
    components: Vec<CommandComponent<C>>,
    permission: Permission<C>,
    meta: MetaMap,
    flags: Option<FlagSet<C>>,
    sender_check: Option<(String, Arc<dyn Fn(&C) -> bool + Send + Sync>)>,
}

impl<C: Send + Sync + 'static> CommandBuilder<C> {
    /// Start a new command rooted at the literal `name` (with `name` as its
    /// sole alias to start; add more via [`CommandBuilder::alias`]).
    pub fn new(name: impl Into<String>) -> Self {
        CommandBuilder {
            components: vec![CommandComponent::literal(vec![name.into()])],
            permission: Permission::empty(),
            meta: MetaMap::new(),
            flags: None,
            sender_check: None,
        }
    }

    /// Restrict which senders may run this command. `type_name` names the
    /// expected kind (used to render [`crate::exception::InvalidSenderError`]);
    /// `predicate` decides whether a given sender qualifies.
    pub fn sender_type(mut self, type_name: impl Into<String>, predicate: impl Fn(&C) -> bool + Send + Sync + 'static) -> Self {
        self.sender_check = Some((type_name.into(), Arc::new(predicate)));
        self
    }

    /// Declare the flags this command accepts (§4.2.1). Flags are matched
    /// once every positional component has matched, in any order and
    /// interleaved with nothing else.
    pub fn flags(mut self, flags: FlagSet<C>) -> Self {
        self.flags = Some(flags);
        self
    }

    /// Add an additional alias to the root literal.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        if let Some(first) = self.components.first_mut() {
            if let ComponentKind::Literal { aliases } = &mut first.kind {
                aliases.push(alias.into());
            }
        }
        self
    }

    /// Append a `LITERAL` sub-command component.
    pub fn literal(mut self, aliases: Vec<String>) -> Self {
        self.components.push(CommandComponent::literal(aliases));
        self
    }

    /// Append a `REQUIRED` argument component parsed by `parser`.
    pub fn required<T: Send + Sync + 'static>(
        mut self,
        name: impl Into<String>,
        parser: impl ArgumentParser<C, T> + 'static,
    ) -> Self {
        self.components
            .push(CommandComponent::required(name, ErasedParserHandle::new(parser)));
        self
    }

    /// Append an `OPTIONAL` argument component parsed by `parser`, falling
    /// back to `default` when omitted.
    pub fn optional<T: Send + Sync + 'static>(
        mut self,
        name: impl Into<String>,
        parser: impl ArgumentParser<C, T> + 'static,
        default: DefaultValue<C>,
    ) -> Self {
        self.components
            .push(CommandComponent::optional(name, ErasedParserHandle::new(parser), default));
        self
    }

    /// Attach a description to the most recently added component.
    pub fn describe(mut self, description: ArgumentDescription) -> Self {
        if let Some(last) = self.components.last_mut() {
            let taken = std::mem::replace(last, CommandComponent::literal(vec![]));
            *last = taken.described(description);
        }
        self
    }

    /// Attach a permission to the most recently added component.
    pub fn component_permission(mut self, permission: Permission<C>) -> Self {
        if let Some(last) = self.components.last_mut() {
            let taken = std::mem::replace(last, CommandComponent::literal(vec![]));
            *last = taken.permitted(permission);
        }
        self
    }

    /// Set the permission required to execute the whole command.
    pub fn permission(mut self, permission: Permission<C>) -> Self {
        self.permission = permission;
        self
    }

    /// Attach command-level metadata.
    pub fn meta<V: Send + Sync + 'static>(mut self, key: MetaKey<V>, value: V) -> Self {
        self.meta.insert(key, value);
        self
    }

    /// Finish the command with the given handler, validating that no
    /// `REQUIRED` component follows an `OPTIONAL` one (§6).
    pub fn handler(self, handler: impl CommandHandler<C> + 'static) -> Result<Command<C>, CommandBuildError> {
        if self.components.is_empty() {
            return Err(CommandBuildError::Empty);
        }
        let mut seen_optional = false;
        for component in &self.components {
            match &component.kind {
                ComponentKind::Optional { .. } => seen_optional = true,
                ComponentKind::Required { .. } if seen_optional => {
                    return Err(CommandBuildError::RequiredAfterOptional(component.name.clone()));
                }
                _ => {}
            }
        }
        Ok(Command {
            components: self.components,
            executable: Arc::new(ExecutableCommand {
                permission: self.permission,
                handler: Arc::new(handler),
                meta: self.meta,
                flags: self.flags.map(Arc::new),
                sender_check: self.sender_check,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::standard::IntegerParser;

    #[test]
    fn builder_produces_component_chain() {
        let command = CommandBuilder::<()>::new("give")
            .required("amount", IntegerParser::new())
            .handler(|_ctx: &mut CommandContext<()>| Ok(()))
            .unwrap();
        assert_eq!(command.components.len(), 2);
    }

    #[test]
    fn required_after_optional_is_rejected() {
        let result = CommandBuilder::<()>::new("give")
            .optional("amount", IntegerParser::new(), DefaultValue::ParsedLiteral("1".into()))
            .required("target", IntegerParser::new())
            .handler(|_ctx: &mut CommandContext<()>| Ok(()));
        assert!(matches!(result, Err(CommandBuildError::RequiredAfterOptional(_))));
    }

    #[test]
    fn alias_extends_root_literal() {
        let command = CommandBuilder::<()>::new("teleport")
            .alias("tp")
            .handler(|_ctx: &mut CommandContext<()>| Ok(()))
            .unwrap();
        match &command.components[0].kind {
            ComponentKind::Literal { aliases } => assert_eq!(aliases, &vec!["teleport".to_string(), "tp".to_string()]),
            _ => panic!("expected literal"),
        }
    }

    #[test]
    fn sender_type_predicate_is_attached_to_executable() {
        let command = CommandBuilder::<i32>::new("shutdown")
            .sender_type("console", |sender: &i32| *sender == 0)
            .handler(|_ctx: &mut CommandContext<i32>| Ok(()))
            .unwrap();
        let (type_name, predicate) = command.executable.sender_check.as_ref().unwrap();
        assert_eq!(type_name, "console");
        assert!(predicate(&0));
        assert!(!predicate(&1));
    }

    #[tokio::test]
    async fn async_handler_runs_to_completion() {
        let handler = async_handler(|_ctx: &mut CommandContext<()>| async { Ok(()) });
        let mut ctx = CommandContext::new(());
        handler.execute(&mut ctx).await.unwrap();
    }
}

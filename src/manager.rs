// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Command manager
//!
//! [`CommandManager`] is the single facade a host application talks to: it
//! owns the tree, the parser registry, the permission check, the exception
//! controller, and the executor coordinator, and exposes exactly three
//! entry points a host needs — register a command, execute a line, and
//! suggest completions for a partial one (§4, §6).

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::caption::{CaptionRegistry, DefaultCaptionRegistry};
use crate::command::{Command, CommandBuildError, CommandBuilder};
use crate::context::{CommandContext, ParsingContext};
use crate::exception::{
    ExceptionContext, ExceptionController, HandlerOutcome, InvalidSenderError, InvalidSyntaxError, NoPermissionError, NoSuchCommandError,
};
use crate::execution::{CommandExecutor, CommandOutcome, CommandResult, ExecutorCoordinator};
use crate::input::CommandInput;
use crate::parser::flag::FlagParseError;
use crate::parser::{ArgumentParser, ParseResult, ParserRegistry};
use crate::permission::Permission;
use crate::settings::{CommandManagerSettings, RegistrationState};
use crate::suggestion::{post_filter, Suggestion};
use crate::tree::{CommandNode, ComponentKind, DefaultValue};

/// Registering (or re-registering) a command failed.
#[derive(Debug, Clone, Error)]
pub enum RegistrationError {
    /// Building the command itself failed (e.g. REQUIRED after OPTIONAL).
    #[error(transparent)]
    Build(#[from] CommandBuildError),
    /// The tree rejected the insertion (ambiguous sibling, or conflict).
    #[error(transparent)]
    Tree(#[from] crate::tree::TreeError),
    /// `state` is `AfterRegistration` and `allow_unsafe_registration` is
    /// not set.
    #[error("the manager has left its registration phase; set allow_unsafe_registration to register more commands")]
    RegistrationClosed,
}

enum WalkOutcome<'n, C> {
    Matched(&'n CommandNode<C>),
    NoMatch,
    PermissionDenied(String),
    ArgumentError(crate::parser::ArgumentParseError),
    FlagError(FlagParseError),
}

/// The top-level facade tying the tree, parsers, permissions, and
/// execution pipeline together.
pub struct CommandManager<C> {
    root: CommandNode<C>,
    parsers: ParserRegistry<C>,
    settings: CommandManagerSettings,
    state: RegistrationState,
    has_permission: Arc<dyn Fn(&C, &str) -> bool + Send + Sync>,
    exception_controller: Arc<ExceptionController<C>>,
    captions: Arc<dyn CaptionRegistry>,
    coordinator: ExecutorCoordinator<C>,
}

impl<C> fmt::Debug for CommandManager<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandManager")
            .field("state", &self.state)
            .field("settings", &self.settings)
            .finish()
    }
}

impl<C: Send + Sync + 'static> CommandManager<C> {
    /// Construct a manager with the given settings and permission check,
    /// a default exception controller, the default English caption
    /// registry, and a [`SimpleExecutor`] (suitable for synchronous hosts;
    /// see [`CommandManager::with_executor`] to supply an async one).
    pub fn new(settings: CommandManagerSettings, has_permission: impl Fn(&C, &str) -> bool + Send + Sync + 'static) -> Self {
        let exception_controller = Arc::new(ExceptionController::with_default_handlers());
        let captions: Arc<dyn CaptionRegistry> = Arc::new(DefaultCaptionRegistry::new());
        let coordinator = ExecutorCoordinator::simple(Arc::clone(&exception_controller), Arc::clone(&captions));
        CommandManager {
            root: CommandNode::root(),
            parsers: ParserRegistry::new(),
            settings,
            state: RegistrationState::Registering,
            has_permission: Arc::new(has_permission),
            exception_controller,
            captions,
            coordinator,
        }
    }

    /// Replace the executor driving handler futures (e.g. to route through
    /// a host's existing tokio runtime via [`crate::execution::AsyncExecutor`]).
    pub fn with_executor(mut self, executor: Arc<dyn CommandExecutor<C>>) -> Self {
        self.coordinator = ExecutorCoordinator::new(executor, Arc::clone(&self.exception_controller), Arc::clone(&self.captions));
        self
    }

    /// Replace the exception controller (e.g. to add platform-specific
    /// handlers before the built-in defaults run).
    pub fn with_exception_controller(mut self, controller: Arc<ExceptionController<C>>) -> Self {
        self.exception_controller = Arc::clone(&controller);
        self.coordinator = ExecutorCoordinator::simple(controller, Arc::clone(&self.captions));
        self
    }

    /// Replace the caption registry (e.g. to route through a localization
    /// system).
    pub fn with_captions(mut self, captions: Arc<dyn CaptionRegistry>) -> Self {
        self.captions = Arc::clone(&captions);
        self.coordinator = ExecutorCoordinator::simple(Arc::clone(&self.exception_controller), captions);
        self
    }

    /// Start building a command named `name`.
    pub fn command_builder(&self, name: impl Into<String>) -> CommandBuilder<C> {
        CommandBuilder::new(name)
    }

    /// Register a fully built command.
    pub fn command(&mut self, command: Command<C>) -> Result<(), RegistrationError> {
        if self.state == RegistrationState::AfterRegistration && !self.settings.allow_unsafe_registration {
            return Err(RegistrationError::RegistrationClosed);
        }
        let allow_override = self.settings.override_existing_commands;
        self.root
            .insert(command.components.into_iter(), command.executable, allow_override)?;
        Ok(())
    }

    /// Register the default parser for `T`.
    pub fn register_parser<T: Send + Sync + 'static>(&mut self, parser: impl ArgumentParser<C, T> + 'static) {
        let _ = self.parsers.register_for_type(parser);
    }

    /// The parser registry, for advanced callers building components by
    /// hand rather than through [`CommandBuilder`].
    pub fn parsers(&self) -> &ParserRegistry<C> {
        &self.parsers
    }

    /// The manager's current settings.
    pub fn settings(&self) -> CommandManagerSettings {
        self.settings
    }

    fn mark_registered(&mut self) {
        self.state = RegistrationState::AfterRegistration;
    }

    fn check_permission(&self, sender: &C, permission: &Permission<C>) -> bool {
        permission.evaluate(sender, self.has_permission.as_ref()).is_allowed()
    }

    fn walk<'n>(&self, node: &'n CommandNode<C>, ctx: &mut CommandContext<C>, input: &mut CommandInput) -> WalkOutcome<'n, C> {
        loop {
            input.skip_whitespace();
            if input.is_empty(true) {
                return WalkOutcome::Matched(node);
            }

            if let Some(token) = input.peek_string().map(str::to_string) {
                if let Some(child) = node.matching_literals(&token).next() {
                    let component = child.component().unwrap();
                    if !self.check_permission(ctx.sender(), &component.permission) {
                        return WalkOutcome::PermissionDenied(component.name.clone());
                    }
                    input.read_string();
                    ctx.record_parsing(component.name.clone(), ParsingContext::literal(token.clone(), token));
                    return self.walk(child, ctx, input);
                }
            }

            if let Some(child) = node.argument_child() {
                let component = child.component().unwrap();
                if !self.check_permission(ctx.sender(), &component.permission) {
                    return WalkOutcome::PermissionDenied(component.name.clone());
                }
                match &component.kind {
                    ComponentKind::Required { parser } => {
                        let start = input.cursor();
                        match parser.parse(ctx, input) {
                            ParseResult::Success(value) => {
                                let consumed = input.original_input()[start..input.cursor()].to_string();
                                ctx.set_erased(component.name.clone(), value);
                                ctx.record_parsing(component.name.clone(), ParsingContext::new(consumed));
                                return self.walk(child, ctx, input);
                            }
                            ParseResult::Failure(e) => return WalkOutcome::ArgumentError(e),
                        }
                    }
                    ComponentKind::Optional { parser, default } => {
                        let snapshot = input.copy();
                        let start = input.cursor();
                        match parser.parse(ctx, input) {
                            ParseResult::Success(value) => {
                                let consumed = input.original_input()[start..input.cursor()].to_string();
                                ctx.set_erased(component.name.clone(), value);
                                ctx.record_parsing(component.name.clone(), ParsingContext::new(consumed));
                            }
                            ParseResult::Failure(_) => {
                                *input = snapshot;
                                let value = resolve_default(default, ctx, parser);
                                ctx.set_erased_arc(component.name.clone(), value);
                            }
                        }
                        return self.walk(child, ctx, input);
                    }
                    ComponentKind::Literal { .. } => unreachable!("argument_child never returns a literal"),
                }
            }

            if let Some(command) = node.command() {
                if let Some(flags) = &command.flags {
                    match flags.try_consume(ctx, input) {
                        Ok(true) => continue,
                        Ok(false) => return WalkOutcome::NoMatch,
                        Err(e) => return WalkOutcome::FlagError(e),
                    }
                }
            }
            return WalkOutcome::NoMatch;
        }
    }

    /// Parse and run `line` against `sender`.
    pub async fn execute(&mut self, sender: C, line: &str) -> CommandResult<C> {
        self.mark_registered();
        let mut ctx = CommandContext::new(sender);
        let mut input = CommandInput::new(line);

        let outcome = self.walk(&self.root, &mut ctx, &mut input);
        match outcome {
            WalkOutcome::Matched(node) => match node.command() {
                Some(command) => {
                    if let Some((type_name, accepts)) = &command.sender_check {
                        if !accepts(ctx.sender()) {
                            return self.fail(ctx, InvalidSenderError { actual: type_name.clone() }).await;
                        }
                    }
                    if !self.check_permission(ctx.sender(), &command.permission) {
                        return self.fail(ctx, NoPermissionError { permission: String::new() }).await;
                    }
                    self.coordinator.execute(ctx, Arc::clone(&command.handler)).await
                }
                None => self.fail(ctx, NoSuchCommandError { input: line.to_string() }).await,
            },
            WalkOutcome::NoMatch => {
                self.fail(
                    ctx,
                    InvalidSyntaxError {
                        remaining: input.remaining_input().to_string(),
                        usage: line.to_string(),
                    },
                )
                .await
            }
            WalkOutcome::PermissionDenied(permission) => self.fail(ctx, NoPermissionError { permission }).await,
            WalkOutcome::ArgumentError(e) => self.fail(ctx, e).await,
            WalkOutcome::FlagError(e) => {
                self.fail(
                    ctx,
                    InvalidSyntaxError {
                        remaining: e.to_string(),
                        usage: line.to_string(),
                    },
                )
                .await
            }
        }
    }

    async fn fail<E: std::error::Error + Send + Sync + 'static>(&self, ctx: CommandContext<C>, error: E) -> CommandResult<C> {
        let wrapped: Arc<dyn std::error::Error + Send + Sync> = Arc::new(error);
        let exception_ctx = ExceptionContext {
            command_context: Some(&ctx),
            captions: self.captions.as_ref(),
        };
        let caption = match self.exception_controller.dispatch(Arc::clone(&wrapped), &exception_ctx) {
            HandlerOutcome::Handled(caption) => caption,
            _ => None,
        };
        CommandResult {
            context: ctx,
            outcome: CommandOutcome::Failure { error: wrapped, caption },
        }
    }

    /// Offer completions for the partially typed `line`.
    pub fn suggest(&self, sender: C, line: &str) -> Vec<Suggestion> {
        let mut ctx = CommandContext::new_for_suggestions(sender);
        let mut input = CommandInput::new(line);
        let (suggestions, literal_siblings) = self.collect_suggestions(&self.root, &mut ctx, &mut input);
        let mut filtered = post_filter(suggestions, &literal_siblings, line);
        if self.settings.force_suggestion_lowercase {
            for s in &mut filtered {
                s.value = s.value.to_lowercase();
            }
        }
        filtered
    }

    /// Returns the collected suggestions alongside the literal aliases of
    /// the node they were ultimately collected against, so `suggest` can
    /// drop an argument suggestion that collides with a sibling literal
    /// even when that literal itself isn't in the returned list (e.g.
    /// because the sender lacks permission for it).
    fn collect_suggestions(&self, node: &CommandNode<C>, ctx: &mut CommandContext<C>, input: &mut CommandInput) -> (Vec<Suggestion>, Vec<String>) {
        input.skip_whitespace();
        let token = input.peek_string().map(str::to_string);
        let own_literal_siblings: Vec<String> = node
            .literal_children()
            .flat_map(|child| match &child.component().unwrap().kind {
                ComponentKind::Literal { aliases } => aliases.clone(),
                _ => Vec::new(),
            })
            .collect();

        match &token {
            None => {
                let mut options: Vec<Suggestion> = node
                    .literal_children()
                    .filter(|child| {
                        let component = child.component().unwrap();
                        self.check_permission(ctx.sender(), &component.permission)
                    })
                    .flat_map(|child| match &child.component().unwrap().kind {
                        ComponentKind::Literal { aliases } => aliases.iter().cloned().map(Suggestion::simple).collect::<Vec<_>>(),
                        _ => Vec::new(),
                    })
                    .collect();
                if let Some(child) = node.argument_child() {
                    let component = child.component().unwrap();
                    if self.check_permission(ctx.sender(), &component.permission) {
                        options.extend(component_suggestions(component, ctx, input));
                    }
                }
                (options, own_literal_siblings)
            }
            Some(partial) => {
                for child in node.matching_literals(partial) {
                    let component = child.component().unwrap();
                    if !self.check_permission(ctx.sender(), &component.permission) {
                        continue;
                    }
                    input.read_string();
                    return self.collect_suggestions(child, ctx, input);
                }
                // Matching literals beginning with this prefix, for partial
                // typing. Computed unconditionally so it can be merged with
                // (rather than shadowed by) an argument sibling's own
                // suggestions below.
                let prefix_matches: Vec<Suggestion> = own_literal_siblings
                    .iter()
                    .filter(|alias| alias.starts_with(partial.as_str()))
                    .cloned()
                    .map(Suggestion::simple)
                    .collect();

                if let Some(child) = node.argument_child() {
                    let component = child.component().unwrap();
                    if !self.check_permission(ctx.sender(), &component.permission) {
                        return (prefix_matches, own_literal_siblings);
                    }
                    let snapshot = input.copy();
                    let is_final_token = input.remaining_input().trim() == partial.as_str();
                    if is_final_token {
                        let mut options = prefix_matches;
                        options.extend(component_suggestions(component, ctx, &snapshot));
                        return (options, own_literal_siblings);
                    }
                    match &component.kind {
                        ComponentKind::Required { parser } => match parser.parse(ctx, input) {
                            ParseResult::Success(value) => {
                                ctx.set_erased(component.name.clone(), value);
                                return self.collect_suggestions(child, ctx, input);
                            }
                            ParseResult::Failure(_) => return (prefix_matches, own_literal_siblings),
                        },
                        ComponentKind::Optional { parser, default } => {
                            match parser.parse(ctx, input) {
                                ParseResult::Success(value) => ctx.set_erased(component.name.clone(), value),
                                ParseResult::Failure(_) => {
                                    *input = snapshot;
                                    match default {
                                        DefaultValue::Dynamic(_) => {
                                            // Running a dynamic default's closure here would
                                            // have observable side effects outside of real
                                            // execution; leave this argument unset instead.
                                        }
                                        _ => {
                                            let value = resolve_default(default, ctx, parser);
                                            ctx.set_erased_arc(component.name.clone(), value);
                                        }
                                    }
                                }
                            }
                            return self.collect_suggestions(child, ctx, input);
                        }
                        ComponentKind::Literal { .. } => {}
                    }
                }
                (prefix_matches, own_literal_siblings)
            }
        }
    }
}

fn resolve_default<C>(
    default: &DefaultValue<C>,
    ctx: &mut CommandContext<C>,
    parser: &crate::parser::ErasedParserHandle<C>,
) -> Arc<dyn std::any::Any + Send + Sync> {
    match default {
        DefaultValue::Constant(value) => Arc::clone(value),
        DefaultValue::Dynamic(f) => Arc::from(f(ctx)),
        DefaultValue::ParsedLiteral(text) => {
            let mut literal_input = CommandInput::new(text.clone());
            match parser.parse(ctx, &mut literal_input) {
                ParseResult::Success(value) => Arc::from(value),
                ParseResult::Failure(_) => panic!("default literal '{text}' was rejected by its own component's parser"),
            }
        }
    }
}

fn component_suggestions<C>(
    component: &crate::tree::CommandComponent<C>,
    ctx: &CommandContext<C>,
    input: &CommandInput,
) -> Vec<Suggestion> {
    if let Some(provider) = &component.suggestion_override {
        return provider.suggest(ctx, input);
    }
    match &component.kind {
        ComponentKind::Required { parser } | ComponentKind::Optional { parser, .. } => parser.suggestions(ctx, input),
        ComponentKind::Literal { aliases } => aliases.iter().cloned().map(Suggestion::simple).collect(),
    }
}

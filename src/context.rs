// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Command Context
//!
//! [`CommandContext`] is the per-execution mutable store threaded through
//! one call to [`crate::manager::CommandManager::execute`] (or `suggest`).
//! It is private to that one execution: concurrent executions each get
//! their own context (§5: "The context is private to one execution").

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use crate::meta::MetaMap;

/// Per-execution mutable store.
///
/// Holds the sender, the typed values parsed so far (keyed by component
/// name), flag values, and an `is_suggestions` flag that parsers and
/// default-value evaluation must honor: while `true`, no side effects may
/// be observed (§4.2.2, §4.4).
pub struct CommandContext<C> {
    sender: C,
    values: HashMap<String, Arc<dyn Any + Send + Sync>>,
    flags: FlagContext,
    parsing: HashMap<String, ParsingContext>,
    is_suggestions: bool,
    meta: MetaMap,
}

impl<C> CommandContext<C> {
    /// Construct a new context for execution against `sender`.
    pub fn new(sender: C) -> Self {
        CommandContext {
            sender,
            values: HashMap::new(),
            flags: FlagContext::default(),
            parsing: HashMap::new(),
            is_suggestions: false,
            meta: MetaMap::new(),
        }
    }

    /// Construct a context used only for suggestion parsing; parsers and
    /// default-value evaluation must avoid observable side effects when
    /// [`is_suggestions`](CommandContext::is_suggestions) is `true`.
    pub fn new_for_suggestions(sender: C) -> Self {
        let mut ctx = CommandContext::new(sender);
        ctx.is_suggestions = true;
        ctx
    }

    /// The sender that issued this command.
    pub fn sender(&self) -> &C {
        &self.sender
    }

    /// Mutable access to the sender, for platform adapters that need it
    /// (e.g. to accumulate output before the handler runs).
    pub fn sender_mut(&mut self) -> &mut C {
        &mut self.sender
    }

    /// `true` while this context is being used to compute suggestions
    /// rather than to actually execute a command.
    pub fn is_suggestions(&self) -> bool {
        self.is_suggestions
    }

    /// Store a parsed value under `name`, overwriting any previous value.
    pub fn set<T: Send + Sync + 'static>(&mut self, name: impl Into<String>, value: T) {
        self.values.insert(name.into(), Arc::new(value));
    }

    /// Retrieve a previously stored value by component name.
    pub fn get<T: Send + Sync + 'static>(&self, name: &str) -> Option<&T> {
        self.values.get(name).and_then(|v| v.downcast_ref::<T>())
    }

    /// Store a value that has already been boxed by a type-erased parser
    /// (used by the tree walk, which only knows a component's value type
    /// through an `ErasedParserHandle`).
    pub(crate) fn set_erased(&mut self, name: impl Into<String>, value: Box<dyn Any + Send + Sync>) {
        self.values.insert(name.into(), Arc::from(value));
    }

    /// Store a value that is already reference-counted (used for `OPTIONAL`
    /// defaults, so a `Constant` default is a cheap `Arc` clone rather than
    /// a fresh allocation on every resolution).
    pub(crate) fn set_erased_arc(&mut self, name: impl Into<String>, value: Arc<dyn Any + Send + Sync>) {
        self.values.insert(name.into(), value);
    }

    /// Retrieve a previously stored value, or a default if absent.
    pub fn get_or<'a, T: Send + Sync + 'static>(&'a self, name: &str, default: &'a T) -> &'a T {
        self.get(name).unwrap_or(default)
    }

    /// `true` if a value has been stored under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// The flag values collected during parsing.
    pub fn flags(&self) -> &FlagContext {
        &self.flags
    }

    /// Mutable access to the flag values, used by the flag parser.
    pub fn flags_mut(&mut self) -> &mut FlagContext {
        &mut self.flags
    }

    /// Record the parsing context (consumed substring, alias) for a
    /// component.
    pub fn record_parsing(&mut self, name: impl Into<String>, parsing: ParsingContext) {
        self.parsing.insert(name.into(), parsing);
    }

    /// Retrieve the recorded parsing context for a component, if any.
    pub fn parsing_context(&self, name: &str) -> Option<&ParsingContext> {
        self.parsing.get(name)
    }

    /// Per-execution metadata, set by preprocessors to communicate with
    /// later pipeline stages.
    pub fn meta(&self) -> &MetaMap {
        &self.meta
    }

    /// Mutable access to per-execution metadata.
    pub fn meta_mut(&mut self) -> &mut MetaMap {
        &mut self.meta
    }
}

/// The exact substring a component consumed while parsing, plus (for
/// `LITERAL` components) the alias that was actually matched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsingContext {
    /// The substring of the original input this component consumed.
    pub consumed_input: String,
    /// For `LITERAL` components, the specific alias the user typed (which
    /// may differ from the component's canonical `name`).
    pub matched_alias: Option<String>,
}

impl ParsingContext {
    /// Construct a parsing context for a non-literal component.
    pub fn new(consumed_input: impl Into<String>) -> Self {
        ParsingContext {
            consumed_input: consumed_input.into(),
            matched_alias: None,
        }
    }

    /// Construct a parsing context for a `LITERAL` component, recording
    /// which alias matched.
    pub fn literal(consumed_input: impl Into<String>, matched_alias: impl Into<String>) -> Self {
        ParsingContext {
            consumed_input: consumed_input.into(),
            matched_alias: Some(matched_alias.into()),
        }
    }
}

/// Flag values collected while parsing `--name value` / `-n` / `-abc`
/// tokens (§4.2.1).
#[derive(Default)]
pub struct FlagContext {
    present: HashMap<String, bool>,
    values: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl FlagContext {
    /// Record that a flag was present (with or without a value).
    pub fn mark_present(&mut self, name: impl Into<String>) {
        self.present.insert(name.into(), true);
    }

    /// Store a flag's parsed value.
    pub fn set_value<T: Send + Sync + 'static>(&mut self, name: impl Into<String>, value: T) {
        let name = name.into();
        self.present.insert(name.clone(), true);
        self.values.insert(name, Arc::new(value));
    }

    /// Store a flag's value that has already been boxed by a type-erased
    /// parser (used by the flag grammar, which only knows the value's type
    /// through an `ErasedParserHandle`).
    pub(crate) fn set_value_arc(&mut self, name: impl Into<String>, value: Arc<dyn Any + Send + Sync>) {
        let name = name.into();
        self.present.insert(name.clone(), true);
        self.values.insert(name, value);
    }

    /// `true` if the named flag appeared on the command line at all
    /// (presence-only or value-carrying).
    pub fn was_present(&self, name: &str) -> bool {
        self.present.get(name).copied().unwrap_or(false)
    }

    /// The parsed value for a value-carrying flag, if present.
    pub fn get_value<T: Send + Sync + 'static>(&self, name: &str) -> Option<&T> {
        self.values.get(name).and_then(|v| v.downcast_ref::<T>())
    }

    /// The parsed value for a value-carrying flag, or a default.
    pub fn get_value_or<'a, T: Send + Sync + 'static>(&'a self, name: &str, default: &'a T) -> &'a T {
        self.get_value(name).unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get_roundtrip() {
        let mut ctx = CommandContext::new(());
        ctx.set("name", "world".to_string());
        assert_eq!(ctx.get::<String>("name"), Some(&"world".to_string()));
    }

    #[test]
    fn missing_value_is_none() {
        let ctx: CommandContext<()> = CommandContext::new(());
        assert_eq!(ctx.get::<String>("missing"), None);
    }

    #[test]
    fn suggestions_context_flag() {
        let ctx: CommandContext<()> = CommandContext::new_for_suggestions(());
        assert!(ctx.is_suggestions());
    }

    #[test]
    fn flag_presence_and_value() {
        let mut flags = FlagContext::default();
        flags.mark_present("verbose");
        flags.set_value("count", 3i64);
        assert!(flags.was_present("verbose"));
        assert!(flags.was_present("count"));
        assert_eq!(flags.get_value::<i64>("count"), Some(&3));
        assert!(!flags.was_present("other"));
    }

    #[test]
    fn parsing_context_records_literal_alias() {
        let parsing = ParsingContext::literal("t", "t");
        assert_eq!(parsing.consumed_input, "t");
        assert_eq!(parsing.matched_alias.as_deref(), Some("t"));
    }
}

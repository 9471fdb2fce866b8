// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Parser Pipeline
//!
//! This module provides the [`ArgumentParser`] trait that every typed
//! component parser implements, the [`ParseResult`] sum type parsers return
//! (never an exception: §3, §7 — "parsers never throw; all failures are
//! values"), and the [`ParserRegistry`] that maps a Rust type or a name to a
//! registered parser instance (§4.2.3).
//!
//! [`standard`] provides the reference parser set (§4.7); [`flag`]
//! implements the flag-token sub-grammar (§4.2.1).

pub mod flag;
pub mod standard;

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use thiserror::Error;

use crate::context::CommandContext;
use crate::input::CommandInput;
use crate::suggestion::Suggestion;

/// The outcome of a single parser invocation: success carrying a typed
/// value, or failure carrying an [`ArgumentParseError`]. Parsers return this
/// directly; they never propagate a `Result` via `?` to their caller (§3).
#[derive(Debug, Clone)]
pub enum ParseResult<T> {
    /// The parser consumed what it needed and produced a value.
    Success(T),
    /// The parser could not produce a value from the given input.
    Failure(ArgumentParseError),
}

impl<T> ParseResult<T> {
    /// Construct a successful result.
    pub fn success(value: T) -> Self {
        ParseResult::Success(value)
    }

    /// Construct a failed result for the given component, wrapping `cause`.
    pub fn failure(component_name: impl Into<String>, cause: ParserFailure) -> Self {
        ParseResult::Failure(ArgumentParseError {
            component_name: component_name.into(),
            cause,
        })
    }

    /// `true` if this is a [`ParseResult::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, ParseResult::Success(_))
    }

    /// Convert into a standard `Result`, for callers that prefer `?`
    /// plumbing once they've left the no-throw parser boundary (e.g. the
    /// default-value "parsed" evaluator, for which failure is a
    /// configuration error and *is* allowed to propagate, per §4.2.2).
    pub fn into_result(self) -> Result<T, ArgumentParseError> {
        match self {
            ParseResult::Success(v) => Ok(v),
            ParseResult::Failure(e) => Err(e),
        }
    }
}

/// A component's parser failed to produce a value for `component_name`,
/// because of `cause`.
#[derive(Debug, Clone, Error)]
#[error("invalid value for '{component_name}': {cause}")]
pub struct ArgumentParseError {
    /// The name of the component whose parser failed.
    pub component_name: String,
    /// The specific reason parsing failed.
    pub cause: ParserFailure,
}

/// The specific reason a standard parser rejected its input.
#[derive(Debug, Clone, Error)]
pub enum ParserFailure {
    /// A numeric value could not be parsed in the expected format.
    #[error("'{input}' is not a valid {expected}")]
    NumberFormat {
        /// The raw input that failed to parse.
        input: String,
        /// A human-readable name for the expected numeric type.
        expected: &'static str,
    },
    /// A numeric value parsed, but fell outside the configured range.
    #[error("'{input}' is not in range [{min}, {max}]")]
    NumberOutOfRange {
        /// The raw input.
        input: String,
        /// The inclusive minimum, formatted.
        min: String,
        /// The inclusive maximum, formatted.
        max: String,
    },
    /// A boolean value was not one of the accepted literals.
    #[error("'{input}' is not a valid boolean")]
    InvalidBoolean {
        /// The raw input.
        input: String,
    },
    /// An enum value did not case-insensitively match any variant.
    #[error("'{input}' is not one of {variants:?}")]
    UnknownEnumVariant {
        /// The raw input.
        input: String,
        /// The accepted variant names.
        variants: Vec<String>,
    },
    /// No input remained where a value was required.
    #[error("expected a value but input was exhausted")]
    MissingInput,
    /// A literal component did not match any of its aliases.
    #[error("'{input}' does not match any of {expected:?}")]
    NoMatchingLiteral {
        /// The raw input.
        input: String,
        /// The aliases the literal accepted.
        expected: Vec<String>,
    },
    /// A parser-specific failure not covered by the above.
    #[error("{0}")]
    Custom(String),
}

/// A typed parser: given the context accumulated so far and the remaining
/// input, produce a value of type `T` or fail.
///
/// Implementations must be pure with respect to observable side effects:
/// §5 requires "Parsers must be pure: no shared mutable state, no blocking
/// I/O." A parser *may* consult `ctx` (e.g. a parser for "online player
/// name" might check previously parsed arguments) but must not mutate
/// external state.
pub trait ArgumentParser<C, T>: Send + Sync {
    /// Parse a value of type `T` from the head of `input`, advancing the
    /// cursor past whatever was consumed on success. On failure, `input`'s
    /// cursor position is unspecified; callers must use a
    /// [`copy`](CommandInput::copy) taken before calling `parse` to retry
    /// with more input or route to a sibling.
    fn parse(&self, ctx: &mut CommandContext<C>, input: &mut CommandInput) -> ParseResult<T>;

    /// Suggestions for completing a partially typed value. The default
    /// implementation offers none; parsers with a closed value set (enums,
    /// booleans, literals) should override this.
    fn suggestions(&self, _ctx: &CommandContext<C>, _input: &CommandInput) -> Vec<Suggestion> {
        Vec::new()
    }
}

/// Blanket impl so a plain closure `Fn(&mut CommandContext<C>, &mut
/// CommandInput) -> ParseResult<T>` can be used directly as a parser,
/// matching how most standard parsers in this crate are constructed.
impl<C, T, F> ArgumentParser<C, T> for F
where
    F: Fn(&mut CommandContext<C>, &mut CommandInput) -> ParseResult<T> + Send + Sync,
{
    fn parse(&self, ctx: &mut CommandContext<C>, input: &mut CommandInput) -> ParseResult<T> {
        self(ctx, input)
    }
}

/// Internal, type-erased view of an [`ArgumentParser`], used so the tree can
/// hold heterogeneous components in one `Vec` (§3: "Components are
/// exclusively owned by the node that carries them").
pub(crate) trait ErasedParser<C>: Send + Sync {
    fn parse_erased(
        &self,
        ctx: &mut CommandContext<C>,
        input: &mut CommandInput,
    ) -> ParseResult<Box<dyn Any + Send + Sync>>;

    fn suggestions_erased(&self, ctx: &CommandContext<C>, input: &CommandInput) -> Vec<Suggestion>;

    fn value_type_id(&self) -> TypeId;

    fn value_type_name(&self) -> &'static str;
}

struct ParserAdapter<C, T, P> {
    parser: P,
    _marker: PhantomData<fn(C) -> T>,
}

impl<C, T, P> ErasedParser<C> for ParserAdapter<C, T, P>
where
    C: 'static,
    T: Send + Sync + 'static,
    P: ArgumentParser<C, T> + 'static,
{
    fn parse_erased(
        &self,
        ctx: &mut CommandContext<C>,
        input: &mut CommandInput,
    ) -> ParseResult<Box<dyn Any + Send + Sync>> {
        match self.parser.parse(ctx, input) {
            ParseResult::Success(value) => ParseResult::Success(Box::new(value) as Box<dyn Any + Send + Sync>),
            ParseResult::Failure(e) => ParseResult::Failure(e),
        }
    }

    fn suggestions_erased(&self, ctx: &CommandContext<C>, input: &CommandInput) -> Vec<Suggestion> {
        self.parser.suggestions(ctx, input)
    }

    fn value_type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn value_type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// A type-erased, cheaply cloneable handle to an [`ArgumentParser`]
/// implementation, stored by [`crate::tree::CommandComponent`].
#[derive(Clone)]
pub struct ErasedParserHandle<C> {
    pub(crate) inner: Arc<dyn ErasedParser<C>>,
}

impl<C> ErasedParserHandle<C> {
    /// Wrap a concrete parser implementation for storage in the tree.
    pub fn new<T>(parser: impl ArgumentParser<C, T> + 'static) -> Self
    where
        C: 'static,
        T: Send + Sync + 'static,
    {
        ErasedParserHandle {
            inner: Arc::new(ParserAdapter::<C, T, _> {
                parser,
                _marker: PhantomData,
            }),
        }
    }

    pub(crate) fn value_type_id(&self) -> TypeId {
        self.inner.value_type_id()
    }

    pub(crate) fn value_type_name(&self) -> &'static str {
        self.inner.value_type_name()
    }

    pub(crate) fn parse(
        &self,
        ctx: &mut CommandContext<C>,
        input: &mut CommandInput,
    ) -> ParseResult<Box<dyn Any + Send + Sync>> {
        self.inner.parse_erased(ctx, input)
    }

    pub(crate) fn suggestions(&self, ctx: &CommandContext<C>, input: &CommandInput) -> Vec<Suggestion> {
        self.inner.suggestions_erased(ctx, input)
    }
}

impl<C> fmt::Debug for ErasedParserHandle<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ErasedParserHandle<{}>", self.inner.value_type_name())
    }
}

/// Maps a value type (via [`TypeId`]) or a name to a registered parser
/// instance (§4.2.3).
///
/// Lookup order for an unnamed argument is parameters-first (not modeled
/// here — that is the annotation front-end's job) then by-type; for a named
/// argument, by-name only. Registering a parser twice under the same key is
/// an error.
pub struct ParserRegistry<C> {
    by_type: HashMap<TypeId, ErasedParserHandle<C>>,
    by_name: HashMap<String, ErasedParserHandle<C>>,
}

impl<C> Default for ParserRegistry<C> {
    fn default() -> Self {
        ParserRegistry {
            by_type: HashMap::new(),
            by_name: HashMap::new(),
        }
    }
}

/// Raised when a parser is registered twice under the same key.
#[derive(Debug, Clone, Error)]
#[error("a parser is already registered for {0}")]
pub struct DuplicateParserError(pub String);

impl<C: 'static> ParserRegistry<C> {
    /// Construct an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `parser` as the default parser for values of type `T`.
    pub fn register_for_type<T>(&mut self, parser: impl ArgumentParser<C, T> + 'static) -> Result<(), DuplicateParserError>
    where
        T: Send + Sync + 'static,
    {
        let type_id = TypeId::of::<T>();
        if self.by_type.contains_key(&type_id) {
            return Err(DuplicateParserError(std::any::type_name::<T>().to_string()));
        }
        self.by_type.insert(type_id, ErasedParserHandle::new(parser));
        Ok(())
    }

    /// Register `parser` under a lookup name, for named-argument
    /// resolution.
    pub fn register_named<T>(
        &mut self,
        name: impl Into<String>,
        parser: impl ArgumentParser<C, T> + 'static,
    ) -> Result<(), DuplicateParserError>
    where
        T: Send + Sync + 'static,
    {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return Err(DuplicateParserError(name));
        }
        self.by_name.insert(name, ErasedParserHandle::new(parser));
        Ok(())
    }

    /// Look up the default parser for `T`.
    pub fn for_type<T: 'static>(&self) -> Option<ErasedParserHandle<C>> {
        self.by_type.get(&TypeId::of::<T>()).cloned()
    }

    /// Look up a parser by registered name.
    pub fn by_name(&self, name: &str) -> Option<ErasedParserHandle<C>> {
        self.by_name.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CommandContext;

    fn int_parser(_ctx: &mut CommandContext<()>, input: &mut CommandInput) -> ParseResult<i64> {
        match input.read_string() {
            Some(tok) => match tok.parse::<i64>() {
                Ok(v) => ParseResult::success(v),
                Err(_) => ParseResult::failure(
                    "n",
                    ParserFailure::NumberFormat {
                        input: tok,
                        expected: "integer",
                    },
                ),
            },
            None => ParseResult::failure("n", ParserFailure::MissingInput),
        }
    }

    #[test]
    fn closure_can_be_used_as_parser() {
        let mut ctx = CommandContext::new(());
        let mut input = CommandInput::new("42");
        let result = ArgumentParser::parse(&int_parser, &mut ctx, &mut input);
        assert!(matches!(result, ParseResult::Success(42)));
    }

    #[test]
    fn registry_rejects_duplicate_type_registration() {
        let mut registry: ParserRegistry<()> = ParserRegistry::new();
        registry.register_for_type::<i64>(int_parser).unwrap();
        let err = registry.register_for_type::<i64>(int_parser).unwrap_err();
        assert!(err.0.contains("i64"));
    }

    #[test]
    fn registry_resolves_by_type_and_name() {
        let mut registry: ParserRegistry<()> = ParserRegistry::new();
        registry.register_for_type::<i64>(int_parser).unwrap();
        registry.register_named("count", int_parser).unwrap();
        assert!(registry.for_type::<i64>().is_some());
        assert!(registry.by_name("count").is_some());
        assert!(registry.by_name("missing").is_none());
    }

    #[test]
    fn erased_handle_roundtrips_through_any() {
        let handle = ErasedParserHandle::new(int_parser);
        let mut ctx = CommandContext::new(());
        let mut input = CommandInput::new("7");
        let result = handle.parse(&mut ctx, &mut input);
        match result {
            ParseResult::Success(boxed) => {
                assert_eq!(*boxed.downcast::<i64>().unwrap(), 7);
            }
            ParseResult::Failure(_) => panic!("expected success"),
        }
    }
}

// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Flag parsing
//!
//! The flag sub-grammar (§4.2.1): `--name value` for a value-carrying long
//! flag, `--name` alone for a presence-only (boolean) flag, `-n` for a short
//! alias of either kind, and `-abc` as shorthand for `-a -b -c` when `a`,
//! `b`, and `c` are all presence-only. A value-carrying short flag (`-n 8`)
//! consumes the rest of that token group as its value and cannot be
//! combined with other short flags in the same `-xyz` group.

use std::fmt;

use crate::context::{CommandContext, FlagContext};
use crate::input::CommandInput;
use crate::parser::{ArgumentParseError, ErasedParserHandle, ParseResult, ParserFailure};
use crate::suggestion::Suggestion;

/// Describes one flag a command accepts: its long name, optional short
/// alias, and whether it carries a value.
pub struct FlagDescriptor<C> {
    /// The long flag name, written after `--` (e.g. `"verbose"` for
    /// `--verbose`).
    pub name: String,
    /// An optional single-character short alias (e.g. `'v'` for `-v`).
    pub short: Option<char>,
    /// `None` for a presence-only (boolean) flag; `Some` for a flag that
    /// consumes a value parsed by the given handle.
    pub value_parser: Option<ErasedParserHandle<C>>,
}

impl<C> fmt::Debug for FlagDescriptor<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlagDescriptor")
            .field("name", &self.name)
            .field("short", &self.short)
            .field("value_carrying", &self.value_parser.is_some())
            .finish()
    }
}

impl<C: 'static> FlagDescriptor<C> {
    /// A presence-only flag (no value).
    pub fn presence(name: impl Into<String>, short: Option<char>) -> Self {
        FlagDescriptor {
            name: name.into(),
            short,
            value_parser: None,
        }
    }

    /// A value-carrying flag, whose value is parsed by `parser`.
    pub fn value<T: Send + Sync + 'static>(
        name: impl Into<String>,
        short: Option<char>,
        parser: impl crate::parser::ArgumentParser<C, T> + 'static,
    ) -> Self {
        FlagDescriptor {
            name: name.into(),
            short,
            value_parser: Some(ErasedParserHandle::new(parser)),
        }
    }

    fn is_value_carrying(&self) -> bool {
        self.value_parser.is_some()
    }
}

/// The set of flags a single command accepts, consulted by the tree walk
/// whenever [`CommandInput::peek_is_flag`] is `true` at a given position.
pub struct FlagSet<C> {
    descriptors: Vec<FlagDescriptor<C>>,
}

impl<C> Default for FlagSet<C> {
    fn default() -> Self {
        FlagSet { descriptors: Vec::new() }
    }
}

/// A flag token did not match any declared descriptor, or was malformed.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FlagParseError {
    /// No descriptor matches the given flag name or short alias.
    #[error("unknown flag '{0}'")]
    UnknownFlag(String),
    /// A value-carrying flag was given no value.
    #[error("flag '{0}' requires a value")]
    MissingValue(String),
    /// Two or more short flags were combined (`-abc`) but at least one of
    /// them is value-carrying, which is only legal alone.
    #[error("flag '-{0}' carries a value and cannot be combined with other short flags")]
    ValueCarryingInCombination(char),
    /// The value-carrying flag's parser rejected the value.
    #[error(transparent)]
    InvalidValue(#[from] ArgumentParseError),
}

impl<C: 'static> FlagSet<C> {
    /// Construct an empty flag set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a flag descriptor.
    pub fn push(&mut self, descriptor: FlagDescriptor<C>) {
        self.descriptors.push(descriptor);
    }

    fn find_by_long(&self, name: &str) -> Option<&FlagDescriptor<C>> {
        self.descriptors.iter().find(|d| d.name == name)
    }

    fn find_by_short(&self, short: char) -> Option<&FlagDescriptor<C>> {
        self.descriptors.iter().find(|d| d.short == Some(short))
    }

    /// If the next token in `input` is a flag token, consume it (and, for a
    /// value-carrying flag, its value) and record the result into
    /// `ctx`'s [`FlagContext`]. Returns `Ok(true)` if a flag was consumed,
    /// `Ok(false)` if the next token is not flag-shaped (caller should try
    /// a different component), or `Err` if it looked like a flag but failed
    /// to parse.
    pub fn try_consume(&self, ctx: &mut CommandContext<C>, input: &mut CommandInput) -> Result<bool, FlagParseError> {
        if !input.peek_is_flag() {
            return Ok(false);
        }
        let token = input.peek_string().unwrap().to_string();

        if let Some(name) = token.strip_prefix("--") {
            input.read_string();
            return self.consume_named(name, ctx, input).map(|()| true);
        }

        let shorts = token.strip_prefix('-').unwrap();
        if shorts.len() == 1 {
            input.read_string();
            let c = shorts.chars().next().unwrap();
            let name = self
                .find_by_short(c)
                .map(|d| d.name.clone())
                .ok_or(FlagParseError::UnknownFlag(token.clone()))?;
            return self.consume_named(&name, ctx, input).map(|()| true);
        }

        // Combined short flags: every character must resolve to a
        // presence-only descriptor.
        for c in shorts.chars() {
            let descriptor = self.find_by_short(c).ok_or_else(|| FlagParseError::UnknownFlag(format!("-{c}")))?;
            if descriptor.is_value_carrying() {
                return Err(FlagParseError::ValueCarryingInCombination(c));
            }
        }
        input.read_string();
        for c in shorts.chars() {
            let name = self.find_by_short(c).unwrap().name.clone();
            ctx.flags_mut().mark_present(name);
        }
        Ok(true)
    }

    fn consume_named(&self, name: &str, ctx: &mut CommandContext<C>, input: &mut CommandInput) -> Result<(), FlagParseError> {
        let descriptor = self.find_by_long(name).ok_or_else(|| FlagParseError::UnknownFlag(name.to_string()))?;
        match &descriptor.value_parser {
            None => {
                ctx.flags_mut().mark_present(descriptor.name.clone());
                Ok(())
            }
            Some(parser) => {
                if input.is_empty(true) {
                    return Err(FlagParseError::MissingValue(descriptor.name.clone()));
                }
                match parser.parse(ctx, input) {
                    ParseResult::Success(value) => {
                        ctx.flags_mut().set_erased(descriptor.name.clone(), value);
                        Ok(())
                    }
                    ParseResult::Failure(e) => Err(FlagParseError::InvalidValue(e)),
                }
            }
        }
    }

    /// Suggestions for the flag names/aliases declared in this set, used
    /// when the in-progress token already looks like a flag sigil.
    pub fn suggestions(&self) -> Vec<Suggestion> {
        let mut out: Vec<Suggestion> = self.descriptors.iter().map(|d| Suggestion::simple(format!("--{}", d.name))).collect();
        out.extend(
            self.descriptors
                .iter()
                .filter_map(|d| d.short)
                .map(|c| Suggestion::simple(format!("-{c}"))),
        );
        out
    }
}

impl FlagContext {
    /// Store a flag's value already boxed as `Box<dyn Any + Send + Sync>`,
    /// used by the flag parser which only knows the value's type through an
    /// [`ErasedParserHandle`].
    pub(crate) fn set_erased(&mut self, name: impl Into<String>, value: Box<dyn std::any::Any + Send + Sync>) {
        self.set_value_arc(name, value.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::standard::IntegerParser;

    fn set() -> FlagSet<()> {
        let mut set = FlagSet::new();
        set.push(FlagDescriptor::presence("verbose", Some('v')));
        set.push(FlagDescriptor::presence("quiet", Some('q')));
        set.push(FlagDescriptor::value::<i32>("count", Some('c'), IntegerParser::new()));
        set
    }

    #[test]
    fn long_presence_flag_is_recorded() {
        let flags = set();
        let mut ctx = CommandContext::new(());
        let mut input = CommandInput::new("--verbose rest");
        assert!(flags.try_consume(&mut ctx, &mut input).unwrap());
        assert!(ctx.flags().was_present("verbose"));
        assert_eq!(input.peek_string(), Some("rest"));
    }

    #[test]
    fn short_value_flag_parses_value() {
        let flags = set();
        let mut ctx = CommandContext::new(());
        let mut input = CommandInput::new("-c 5");
        assert!(flags.try_consume(&mut ctx, &mut input).unwrap());
        assert_eq!(ctx.flags().get_value::<i32>("count"), Some(&5));
    }

    #[test]
    fn combined_short_presence_flags_expand() {
        let flags = set();
        let mut ctx = CommandContext::new(());
        let mut input = CommandInput::new("-vq");
        assert!(flags.try_consume(&mut ctx, &mut input).unwrap());
        assert!(ctx.flags().was_present("verbose"));
        assert!(ctx.flags().was_present("quiet"));
    }

    #[test]
    fn combined_short_rejects_value_carrying_member() {
        let flags = set();
        let mut ctx = CommandContext::new(());
        let mut input = CommandInput::new("-vc");
        let err = flags.try_consume(&mut ctx, &mut input).unwrap_err();
        assert!(matches!(err, FlagParseError::ValueCarryingInCombination('c')));
    }

    #[test]
    fn non_flag_token_is_not_consumed() {
        let flags = set();
        let mut ctx = CommandContext::new(());
        let mut input = CommandInput::new("plain");
        assert!(!flags.try_consume(&mut ctx, &mut input).unwrap());
    }

    #[test]
    fn unknown_flag_is_an_error() {
        let flags = set();
        let mut ctx = CommandContext::new(());
        let mut input = CommandInput::new("--bogus");
        assert!(flags.try_consume(&mut ctx, &mut input).is_err());
    }
}

// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Standard parsers
//!
//! The reference parser set (§4.7): numeric parsers with optional
//! [`Range`] bounds, [`BooleanParser`], string parsers in single/quoted/
//! greedy flavors, [`StringArrayParser`], a case-insensitive [`EnumParser`],
//! and [`LiteralParser`] used internally by `LITERAL` tree components.

use std::fmt::Display;
use std::marker::PhantomData;
use std::str::FromStr;

use crate::context::CommandContext;
use crate::input::CommandInput;
use crate::parser::{ArgumentParser, ParseResult, ParserFailure};
use crate::suggestion::Suggestion;

/// An inclusive numeric range used to bound a numeric parser's accepted
/// values.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Range<T> {
    /// The smallest accepted value, inclusive.
    pub min: T,
    /// The largest accepted value, inclusive.
    pub max: T,
}

impl<T: PartialOrd> Range<T> {
    /// Construct a new inclusive range.
    pub fn new(min: T, max: T) -> Self {
        Range { min, max }
    }

    fn contains(&self, value: &T) -> bool {
        *value >= self.min && *value <= self.max
    }
}

macro_rules! numeric_parser {
    ($name:ident, $ty:ty, $label:expr) => {
        #[doc = concat!("Parses a `", stringify!($ty), "` token, optionally bounded by a [`Range`].")]
        #[derive(Clone, Copy, Debug, Default)]
        pub struct $name {
            range: Option<Range<$ty>>,
        }

        impl $name {
            /// An unbounded parser.
            pub fn new() -> Self {
                $name { range: None }
            }

            /// A parser that rejects values outside `range`.
            pub fn ranged(range: Range<$ty>) -> Self {
                $name { range: Some(range) }
            }
        }

        impl<C> ArgumentParser<C, $ty> for $name {
            fn parse(&self, _ctx: &mut CommandContext<C>, input: &mut CommandInput) -> ParseResult<$ty> {
                let token = match input.read_string() {
                    Some(t) => t,
                    None => return ParseResult::failure(stringify!($name), ParserFailure::MissingInput),
                };
                let value: $ty = match token.parse() {
                    Ok(v) => v,
                    Err(_) => {
                        return ParseResult::failure(
                            stringify!($name),
                            ParserFailure::NumberFormat {
                                input: token,
                                expected: $label,
                            },
                        )
                    }
                };
                if let Some(range) = &self.range {
                    if !range.contains(&value) {
                        return ParseResult::failure(
                            stringify!($name),
                            ParserFailure::NumberOutOfRange {
                                input: token,
                                min: range.min.to_string(),
                                max: range.max.to_string(),
                            },
                        );
                    }
                }
                ParseResult::success(value)
            }
        }
    };
}

numeric_parser!(IntegerParser, i32, "integer");
numeric_parser!(LongParser, i64, "integer");
numeric_parser!(ShortParser, i16, "integer");
numeric_parser!(ByteParser, i8, "integer");
numeric_parser!(FloatParser, f32, "decimal number");
numeric_parser!(DoubleParser, f64, "decimal number");

/// Parses one of a configurable set of truthy/falsy tokens as a `bool`.
///
/// By default accepts `true`/`false` case-insensitively; `liberal()` also
/// accepts `yes`/`no`/`y`/`n`/`on`/`off`, matching the
/// `liberal_flag_parsing` setting's spirit for boolean-shaped arguments.
#[derive(Clone, Copy, Debug, Default)]
pub struct BooleanParser {
    liberal: bool,
}

impl BooleanParser {
    /// Accepts only `true`/`false` (case-insensitive).
    pub fn new() -> Self {
        BooleanParser { liberal: false }
    }

    /// Also accepts `yes`/`no`/`y`/`n`/`on`/`off` (case-insensitive).
    pub fn liberal() -> Self {
        BooleanParser { liberal: true }
    }
}

impl<C> ArgumentParser<C, bool> for BooleanParser {
    fn parse(&self, _ctx: &mut CommandContext<C>, input: &mut CommandInput) -> ParseResult<bool> {
        let token = match input.read_string() {
            Some(t) => t,
            None => return ParseResult::failure("boolean", ParserFailure::MissingInput),
        };
        let lower = token.to_ascii_lowercase();
        let value = match lower.as_str() {
            "true" => Some(true),
            "false" => Some(false),
            "yes" | "y" | "on" if self.liberal => Some(true),
            "no" | "n" | "off" if self.liberal => Some(false),
            _ => None,
        };
        match value {
            Some(v) => ParseResult::success(v),
            None => ParseResult::failure("boolean", ParserFailure::InvalidBoolean { input: token }),
        }
    }

    fn suggestions(&self, _ctx: &CommandContext<C>, _input: &CommandInput) -> Vec<Suggestion> {
        if self.liberal {
            vec!["true", "false", "yes", "no"]
        } else {
            vec!["true", "false"]
        }
        .into_iter()
        .map(Suggestion::simple)
        .collect()
    }
}

/// How a string-valued parser should read its token(s) from the input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StringMode {
    /// A single whitespace-delimited token.
    Single,
    /// A single token, with `"quoted groups"` treated as one token.
    Quoted,
    /// Everything remaining on the line, verbatim.
    Greedy,
}

/// Parses a `String` argument in one of three modes: a single token, a
/// quote-aware token, or the rest of the line (§4.7).
#[derive(Clone, Copy, Debug)]
pub struct StringParser {
    mode: StringMode,
}

impl StringParser {
    /// A single whitespace-delimited token.
    pub fn single() -> Self {
        StringParser { mode: StringMode::Single }
    }

    /// A single token, honoring `"quoted groups"`.
    pub fn quoted() -> Self {
        StringParser { mode: StringMode::Quoted }
    }

    /// Everything remaining on the line.
    pub fn greedy() -> Self {
        StringParser { mode: StringMode::Greedy }
    }
}

impl<C> ArgumentParser<C, String> for StringParser {
    fn parse(&self, _ctx: &mut CommandContext<C>, input: &mut CommandInput) -> ParseResult<String> {
        match self.mode {
            StringMode::Single => match input.read_string() {
                Some(s) => ParseResult::success(s),
                None => ParseResult::failure("string", ParserFailure::MissingInput),
            },
            StringMode::Quoted => match input.read_quoted_string() {
                Some(s) => ParseResult::success(s),
                None => ParseResult::failure("string", ParserFailure::MissingInput),
            },
            StringMode::Greedy => {
                if input.is_empty(true) {
                    ParseResult::failure("string", ParserFailure::MissingInput)
                } else {
                    ParseResult::success(input.read_remaining())
                }
            }
        }
    }
}

/// Parses the remainder of the line as a vector of whitespace-delimited
/// tokens, stopping early at the next flag sigil if `stop_at_flags` is set
/// (used for a flag-yielding `String...` parameter, §4.2.1).
#[derive(Clone, Copy, Debug)]
pub struct StringArrayParser {
    stop_at_flags: bool,
}

impl StringArrayParser {
    /// Consume every remaining token, including any that look like flags.
    pub fn new() -> Self {
        StringArrayParser { stop_at_flags: false }
    }

    /// Consume tokens up to (but not including) the next flag-shaped token.
    pub fn flag_yielding() -> Self {
        StringArrayParser { stop_at_flags: true }
    }
}

impl Default for StringArrayParser {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> ArgumentParser<C, Vec<String>> for StringArrayParser {
    fn parse(&self, _ctx: &mut CommandContext<C>, input: &mut CommandInput) -> ParseResult<Vec<String>> {
        let mut values = Vec::new();
        loop {
            if input.is_empty(true) {
                break;
            }
            if self.stop_at_flags && input.peek_is_flag() {
                break;
            }
            match input.read_string() {
                Some(token) => values.push(token),
                None => break,
            }
        }
        if values.is_empty() {
            ParseResult::failure("string_array", ParserFailure::MissingInput)
        } else {
            ParseResult::success(values)
        }
    }
}

/// Case-insensitively parses a token into one of `T`'s known variants,
/// using a caller-supplied `(name, value)` table (§4.7 — enums are
/// open-ended, so this parser is generic over any `T: Clone`).
pub struct EnumParser<T> {
    variants: Vec<(&'static str, T)>,
    _marker: PhantomData<T>,
}

impl<T: Clone> EnumParser<T> {
    /// Construct a parser accepting exactly the given `(name, value)`
    /// pairs, matched case-insensitively against `name`.
    pub fn new(variants: Vec<(&'static str, T)>) -> Self {
        EnumParser {
            variants,
            _marker: PhantomData,
        }
    }
}

impl<C, T: Clone + Send + Sync> ArgumentParser<C, T> for EnumParser<T> {
    fn parse(&self, _ctx: &mut CommandContext<C>, input: &mut CommandInput) -> ParseResult<T> {
        let token = match input.read_string() {
            Some(t) => t,
            None => return ParseResult::failure("enum", ParserFailure::MissingInput),
        };
        match self
            .variants
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(&token))
        {
            Some((_, value)) => ParseResult::success(value.clone()),
            None => ParseResult::failure(
                "enum",
                ParserFailure::UnknownEnumVariant {
                    input: token,
                    variants: self.variants.iter().map(|(name, _)| name.to_string()).collect(),
                },
            ),
        }
    }

    fn suggestions(&self, _ctx: &CommandContext<C>, _input: &CommandInput) -> Vec<Suggestion> {
        self.variants.iter().map(|(name, _)| Suggestion::simple(*name)).collect()
    }
}

/// Matches a single token against a fixed set of aliases,
/// case-insensitively, producing the canonical alias that matched. Used
/// by `LITERAL` tree components rather than by user-facing command
/// builders (§4.1).
#[derive(Clone, Debug)]
pub struct LiteralParser {
    aliases: Vec<String>,
}

impl LiteralParser {
    /// Construct a parser matching any of `aliases` exactly.
    pub fn new(aliases: Vec<String>) -> Self {
        LiteralParser { aliases }
    }
}

impl<C> ArgumentParser<C, String> for LiteralParser {
    fn parse(&self, _ctx: &mut CommandContext<C>, input: &mut CommandInput) -> ParseResult<String> {
        let token = match input.peek_string() {
            Some(t) => t.to_string(),
            None => return ParseResult::failure("literal", ParserFailure::MissingInput),
        };
        if self.aliases.iter().any(|alias| alias.eq_ignore_ascii_case(&token)) {
            input.read_string();
            ParseResult::success(token)
        } else {
            ParseResult::failure(
                "literal",
                ParserFailure::NoMatchingLiteral {
                    input: token,
                    expected: self.aliases.clone(),
                },
            )
        }
    }

    fn suggestions(&self, _ctx: &CommandContext<C>, _input: &CommandInput) -> Vec<Suggestion> {
        self.aliases.iter().map(Suggestion::simple).collect()
    }
}

/// A generic `FromStr`-backed parser for user-defined value types that
/// don't need a dedicated type in this module; failures are reported with
/// `expected` as the type label.
pub struct FromStrParser<T> {
    expected: &'static str,
    _marker: PhantomData<T>,
}

impl<T> FromStrParser<T> {
    /// Construct a parser that reads one token and parses it via `FromStr`,
    /// labeling failures with `expected`.
    pub fn new(expected: &'static str) -> Self {
        FromStrParser {
            expected,
            _marker: PhantomData,
        }
    }
}

impl<C, T> ArgumentParser<C, T> for FromStrParser<T>
where
    T: FromStr + Send + Sync,
    T::Err: Display,
{
    fn parse(&self, _ctx: &mut CommandContext<C>, input: &mut CommandInput) -> ParseResult<T> {
        let token = match input.read_string() {
            Some(t) => t,
            None => return ParseResult::failure(self.expected, ParserFailure::MissingInput),
        };
        match token.parse::<T>() {
            Ok(value) => ParseResult::success(value),
            Err(_) => ParseResult::failure(
                self.expected,
                ParserFailure::NumberFormat {
                    input: token,
                    expected: self.expected,
                },
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CommandContext;

    fn ctx() -> CommandContext<()> {
        CommandContext::new(())
    }

    #[test]
    fn integer_parser_accepts_valid_input() {
        let mut input = CommandInput::new("42");
        let result = IntegerParser::new().parse(&mut ctx(), &mut input);
        assert!(matches!(result, ParseResult::Success(42)));
    }

    #[test]
    fn integer_parser_rejects_non_numeric() {
        let mut input = CommandInput::new("abc");
        let result = IntegerParser::new().parse(&mut ctx(), &mut input);
        assert!(!result.is_success());
    }

    #[test]
    fn ranged_integer_rejects_out_of_bounds() {
        let parser = IntegerParser::ranged(Range::new(0, 10));
        let mut input = CommandInput::new("20");
        let result = parser.parse(&mut ctx(), &mut input);
        assert!(!result.is_success());
    }

    #[test]
    fn boolean_parser_strict_rejects_yes() {
        let mut input = CommandInput::new("yes");
        let result = BooleanParser::new().parse(&mut ctx(), &mut input);
        assert!(!result.is_success());
    }

    #[test]
    fn boolean_parser_liberal_accepts_yes() {
        let mut input = CommandInput::new("yes");
        let result = BooleanParser::liberal().parse(&mut ctx(), &mut input);
        assert!(matches!(result, ParseResult::Success(true)));
    }

    #[test]
    fn greedy_string_consumes_rest_of_line() {
        let mut input = CommandInput::new("hello there world");
        let result = StringParser::greedy().parse(&mut ctx(), &mut input);
        assert!(matches!(result, ParseResult::Success(ref s) if s == "hello there world"));
    }

    #[test]
    fn string_array_stops_at_flag_when_yielding() {
        let mut input = CommandInput::new("a b --flag c");
        let result = StringArrayParser::flag_yielding().parse(&mut ctx(), &mut input);
        match result {
            ParseResult::Success(values) => assert_eq!(values, vec!["a", "b"]),
            ParseResult::Failure(_) => panic!("expected success"),
        }
    }

    #[derive(Clone, Debug, PartialEq)]
    enum Color {
        Red,
        Green,
    }

    #[test]
    fn enum_parser_matches_case_insensitively() {
        let parser = EnumParser::new(vec![("red", Color::Red), ("green", Color::Green)]);
        let mut input = CommandInput::new("RED");
        let result = ArgumentParser::<(), Color>::parse(&parser, &mut ctx(), &mut input);
        assert!(matches!(result, ParseResult::Success(Color::Red)));
    }

    #[test]
    fn literal_parser_matches_any_alias() {
        let parser = LiteralParser::new(vec!["show".to_string(), "sh".to_string()]);
        let mut input = CommandInput::new("sh interface");
        let result = parser.parse(&mut ctx(), &mut input);
        assert!(matches!(result, ParseResult::Success(ref s) if s == "sh"));
        assert_eq!(input.peek_string(), Some("interface"));
    }

    #[test]
    fn literal_parser_matches_alias_case_insensitively() {
        let parser = LiteralParser::new(vec!["show".to_string()]);
        let mut input = CommandInput::new("SHOW interface");
        let result = parser.parse(&mut ctx(), &mut input);
        assert!(result.is_success());
        assert_eq!(input.peek_string(), Some("interface"));
    }

    #[test]
    fn literal_parser_rejects_unknown_token() {
        let parser = LiteralParser::new(vec!["show".to_string()]);
        let mut input = CommandInput::new("hide");
        let result = parser.parse(&mut ctx(), &mut input);
        assert!(!result.is_success());
    }
}

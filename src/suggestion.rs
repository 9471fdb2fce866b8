// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Suggestions
//!
//! Candidate completions for a partially typed command line, produced by
//! [`crate::manager::CommandManager::suggest`]. A [`Suggestion`] carries an
//! optional tooltip; the tooltip type is kept abstract as [`Message`], a
//! handle the platform adapter renders (e.g. into a localized string), the
//! same way the teacher's `Completion`/`CompletionOption` kept help text as
//! plain strings rather than baking in a rendering format.

use std::fmt;

/// An opaque message handle, suitable for later localisation.
///
/// Today this simply wraps a `String`; a platform adapter with a caption
/// registry can replace the inner representation without the public
/// [`Suggestion`] shape changing.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Message(String);

impl Message {
    /// Wrap a plain string as a message.
    pub fn plain(text: impl Into<String>) -> Self {
        Message(text.into())
    }

    /// The underlying text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Message {
    fn from(value: &str) -> Self {
        Message::plain(value)
    }
}

impl From<String> for Message {
    fn from(value: String) -> Self {
        Message::plain(value)
    }
}

/// A single candidate completion for a partially typed command line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Suggestion {
    /// The text the UI should offer to complete to.
    pub value: String,
    /// An optional tooltip describing this suggestion.
    pub tooltip: Option<Message>,
}

impl Suggestion {
    /// Construct a suggestion with no tooltip.
    pub fn simple(value: impl Into<String>) -> Self {
        Suggestion {
            value: value.into(),
            tooltip: None,
        }
    }

    /// Construct a suggestion with a tooltip.
    pub fn with_tooltip(value: impl Into<String>, tooltip: impl Into<Message>) -> Self {
        Suggestion {
            value: value.into(),
            tooltip: Some(tooltip.into()),
        }
    }
}

/// Apply the suggestion engine's two post-filters (§4.4):
///
/// * Drop suggestions whose value equals a literal already offered by a
///   sibling (`literal_siblings`).
/// * If a suggestion's text contains the last space-separated prefix of
///   `partial_input`, trim everything up to and including that space, so the
///   UI does not double-print prefix tokens already on the line.
pub fn post_filter(
    mut suggestions: Vec<Suggestion>,
    literal_siblings: &[String],
    partial_input: &str,
) -> Vec<Suggestion> {
    suggestions.retain(|s| !literal_siblings.iter().any(|lit| lit == &s.value));

    let last_prefix = partial_input.rsplit(' ').next().unwrap_or("");
    let trim_point = partial_input.len() - last_prefix.len();
    if trim_point > 0 && !last_prefix.is_empty() {
        for s in &mut suggestions {
            if s.value.contains(last_prefix) && s.value.len() >= trim_point {
                s.value = s.value[trim_point.min(s.value.len())..].to_string();
            }
        }
    }

    let mut seen = std::collections::HashSet::new();
    suggestions.retain(|s| seen.insert(s.value.clone()));
    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_drops_repeated_values() {
        let suggestions = vec![Suggestion::simple("foo"), Suggestion::simple("foo")];
        let filtered = post_filter(suggestions, &[], "");
        assert_eq!(filtered.len(), 1);
    }

    #[test]
    fn literal_sibling_is_dropped() {
        let suggestions = vec![Suggestion::simple("foo"), Suggestion::simple("bar")];
        let filtered = post_filter(suggestions, &["foo".to_string()], "");
        assert_eq!(filtered, vec![Suggestion::simple("bar")]);
    }

    #[test]
    fn prefix_trimmed_when_reoffering_full_line() {
        let suggestions = vec![Suggestion::simple("test one")];
        let filtered = post_filter(suggestions, &[], "test o");
        assert_eq!(filtered[0].value, "one");
    }
}

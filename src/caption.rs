// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Captions
//!
//! A [`Caption`] is a localizable, templated message: a [`CaptionKey`]
//! naming which message it is, plus the variables to substitute into it.
//! [`CaptionRegistry`] turns a caption into the final string a platform
//! adapter shows the sender; [`DefaultCaptionRegistry`] is the built-in,
//! English, `{name}`-style implementation every default exception handler
//! falls back to (§4.5, §4.6).

use std::collections::HashMap;

/// Identifies which built-in (or platform-defined) message template a
/// [`Caption`] refers to.
///
/// Modeled as a wrapped name rather than a closed enum so platform adapters
/// can mint their own keys without a crate-level registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CaptionKey(pub &'static str);

impl CaptionKey {
    /// A parser rejected an argument's value.
    pub const ARGUMENT_PARSE_FAILURE: CaptionKey = CaptionKey("argument.parse_failure");
    /// No command matched the typed input.
    pub const NO_SUCH_COMMAND: CaptionKey = CaptionKey("command.no_such_command");
    /// The sender lacked the permission a component or command required.
    pub const NO_PERMISSION: CaptionKey = CaptionKey("command.no_permission");
    /// The sender's type was not one the command accepts.
    pub const INVALID_SENDER: CaptionKey = CaptionKey("command.invalid_sender");
    /// The command line did not match the tree's grammar.
    pub const INVALID_SYNTAX: CaptionKey = CaptionKey("command.invalid_syntax");
    /// A numeric argument parsed, but fell outside its configured range.
    pub const NUMBER_OUT_OF_RANGE: CaptionKey = CaptionKey("argument.number_out_of_range");
    /// The handler itself raised an error during execution.
    pub const COMMAND_EXECUTION_FAILURE: CaptionKey = CaptionKey("command.execution_failure");
}

/// A templated, localizable message: which template, and what to
/// substitute into it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Caption {
    /// Which message template this caption refers to.
    pub key: CaptionKey,
    /// The `(name, value)` pairs substituted into the template.
    pub variables: Vec<(String, String)>,
}

impl Caption {
    /// Construct a caption with no variables.
    pub fn new(key: CaptionKey) -> Self {
        Caption { key, variables: Vec::new() }
    }

    /// Attach a substitution variable.
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.push((name.into(), value.into()));
        self
    }
}

/// Renders a [`Caption`] into the string a sender ultimately sees.
///
/// A platform adapter normally implements this to route through its own
/// localization system; [`DefaultCaptionRegistry`] is provided so the crate
/// is usable without one.
pub trait CaptionRegistry: Send + Sync {
    /// Render `caption` to a final display string.
    fn render(&self, caption: &Caption) -> String;
}

/// A minimal, English-only [`CaptionRegistry`] with `{name}`-style
/// templates for every built-in [`CaptionKey`], and a generic fallback for
/// keys it doesn't recognize.
pub struct DefaultCaptionRegistry {
    templates: HashMap<&'static str, &'static str>,
}

impl Default for DefaultCaptionRegistry {
    fn default() -> Self {
        let mut templates = HashMap::new();
        templates.insert(CaptionKey::ARGUMENT_PARSE_FAILURE.0, "Invalid value for '{component_name}': {cause}");
        templates.insert(CaptionKey::NO_SUCH_COMMAND.0, "Unknown command: '{input}'");
        templates.insert(CaptionKey::NO_PERMISSION.0, "You do not have permission to do that.");
        templates.insert(CaptionKey::INVALID_SENDER.0, "This command cannot be run by {sender_type}.");
        templates.insert(CaptionKey::INVALID_SYNTAX.0, "Invalid syntax. Usage: {usage}");
        templates.insert(CaptionKey::NUMBER_OUT_OF_RANGE.0, "'{input}' is not in range [{min}, {max}]");
        templates.insert(CaptionKey::COMMAND_EXECUTION_FAILURE.0, "An error occurred while running that command.");
        DefaultCaptionRegistry { templates }
    }
}

impl DefaultCaptionRegistry {
    /// Construct the default registry.
    pub fn new() -> Self {
        Self::default()
    }
}

impl CaptionRegistry for DefaultCaptionRegistry {
    fn render(&self, caption: &Caption) -> String {
        let mut text = self
            .templates
            .get(caption.key.0)
            .copied()
            .unwrap_or("{message}")
            .to_string();
        for (name, value) in &caption.variables {
            text = text.replace(&format!("{{{name}}}"), value);
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_named_variables() {
        let registry = DefaultCaptionRegistry::new();
        let caption = Caption::new(CaptionKey::NO_SUCH_COMMAND).with_variable("input", "flyy");
        assert_eq!(registry.render(&caption), "Unknown command: 'flyy'");
    }

    #[test]
    fn unrecognized_key_falls_back_to_generic_template() {
        let registry = DefaultCaptionRegistry::new();
        let caption = Caption::new(CaptionKey("custom.thing"));
        assert_eq!(registry.render(&caption), "{message}");
    }

    #[test]
    fn missing_variable_leaves_placeholder_untouched() {
        let registry = DefaultCaptionRegistry::new();
        let caption = Caption::new(CaptionKey::INVALID_SYNTAX);
        assert_eq!(registry.render(&caption), "Invalid syntax. Usage: {usage}");
    }
}

// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Manager settings
//!
//! [`CommandManagerSettings`] holds the small set of booleans that change
//! how [`crate::manager::CommandManager`] builds and parses its tree (§6).
//! There is no persisted or file-based configuration: the manager has no
//! state that outlives the process, so these are just constructor
//! arguments with a mutable grace period before the first registration
//! locks most of them in.

/// Tree-construction and parsing toggles for a [`crate::manager::CommandManager`].
///
/// All fields default to their conservative (`false`) setting. Settings
/// are free to change while the manager's [`RegistrationState`] is
/// `Registering`; after the first successful registration they become
/// read-only unless `allow_unsafe_registration` was set before that point.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CommandManagerSettings {
    /// Permit registering new commands (or new literal siblings on an
    /// existing node) after the manager has already left the `Registering`
    /// state. Without this, a second registration pass is rejected outright
    /// rather than risk a tree mutation racing a concurrent parse.
    pub allow_unsafe_registration: bool,
    /// Permit a newly registered command to replace one already registered
    /// under the same root literal, instead of treating it as a conflict.
    pub override_existing_commands: bool,
    /// Lowercase every offered suggestion before returning it, regardless
    /// of the case the user actually typed.
    pub force_suggestion_lowercase: bool,
    /// Relax flag-token recognition: accept `-name` as equivalent to
    /// `--name` for long flags, and tolerate `=`-joined values (`--name=value`).
    pub liberal_flag_parsing: bool,
}

impl CommandManagerSettings {
    /// All settings at their default (most conservative) values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter for `allow_unsafe_registration`.
    pub fn with_allow_unsafe_registration(mut self, value: bool) -> Self {
        self.allow_unsafe_registration = value;
        self
    }

    /// Builder-style setter for `override_existing_commands`.
    pub fn with_override_existing_commands(mut self, value: bool) -> Self {
        self.override_existing_commands = value;
        self
    }

    /// Builder-style setter for `force_suggestion_lowercase`.
    pub fn with_force_suggestion_lowercase(mut self, value: bool) -> Self {
        self.force_suggestion_lowercase = value;
        self
    }

    /// Builder-style setter for `liberal_flag_parsing`.
    pub fn with_liberal_flag_parsing(mut self, value: bool) -> Self {
        self.liberal_flag_parsing = value;
        self
    }
}

/// Where a [`crate::manager::CommandManager`] is in its registration
/// lifecycle.
///
/// A manager starts `Registering`; the first time it is asked to parse or
/// suggest against real input, it transitions to `AfterRegistration`, at
/// which point mutating settings (other than through
/// `allow_unsafe_registration`'s escape hatch) and registering brand new
/// root commands is rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegistrationState {
    /// Commands, parsers, and settings may still be freely added/changed.
    Registering,
    /// At least one parse or suggestion call has happened; further
    /// structural changes require `allow_unsafe_registration`.
    AfterRegistration,
}

impl Default for RegistrationState {
    fn default() -> Self {
        RegistrationState::Registering
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_conservative() {
        let settings = CommandManagerSettings::new();
        assert!(!settings.allow_unsafe_registration);
        assert!(!settings.override_existing_commands);
        assert!(!settings.force_suggestion_lowercase);
        assert!(!settings.liberal_flag_parsing);
    }

    #[test]
    fn builder_methods_set_individual_fields() {
        let settings = CommandManagerSettings::new()
            .with_allow_unsafe_registration(true)
            .with_liberal_flag_parsing(true);
        assert!(settings.allow_unsafe_registration);
        assert!(settings.liberal_flag_parsing);
        assert!(!settings.override_existing_commands);
    }

    #[test]
    fn registration_state_defaults_to_registering() {
        assert_eq!(RegistrationState::default(), RegistrationState::Registering);
    }
}

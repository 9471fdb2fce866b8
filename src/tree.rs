// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Command tree
//!
//! The tree is a prefix trie over command components (§3, §4.1). Each
//! [`CommandNode`] carries one [`CommandComponent`] (a `LITERAL` matching a
//! fixed set of aliases, a `REQUIRED` argument, or an `OPTIONAL` argument
//! with a [`DefaultValue`]) and a list of children, ordered so that
//! `LITERAL` children are tried before `REQUIRED`, which are tried before
//! `OPTIONAL` — a `LITERAL` always wins an otherwise-ambiguous match
//! against a same-position argument, the same rule the teacher's node
//! system encoded with `PRIORITY_MINIMUM`/`PRIORITY_PARAMETER`/`PRIORITY_DEFAULT`.
//!
//! Two sibling components are ambiguous, and rejected at registration time,
//! when they could both match the same token: two `LITERAL`s sharing an
//! alias, or more than one non-`LITERAL` child on the same node (without a
//! parameter-level disambiguator, nothing short of trying every parser can
//! tell them apart, which this crate does not do).

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::command::ExecutableCommand;
use crate::context::CommandContext;
use crate::input::CommandInput;
use crate::parser::ErasedParserHandle;
use crate::permission::Permission;
use crate::suggestion::Suggestion;

/// The three component shapes a node can carry (§3).
pub enum ComponentKind<C> {
    /// Matches one of a fixed set of literal aliases (e.g. `show`/`sh`).
    Literal {
        /// The accepted aliases; the first is the canonical name.
        aliases: Vec<String>,
    },
    /// A mandatory typed argument.
    Required {
        /// The parser used to consume and convert the argument's token(s).
        parser: ErasedParserHandle<C>,
    },
    /// An optional typed argument, with a [`DefaultValue`] supplying a
    /// value when the user omits it.
    Optional {
        /// The parser used when the argument is present.
        parser: ErasedParserHandle<C>,
        /// The value substituted when the argument is absent.
        default: DefaultValue<C>,
    },
}

impl<C> ComponentKind<C> {
    fn priority(&self) -> u8 {
        match self {
            ComponentKind::Literal { .. } => 0,
            ComponentKind::Required { .. } => 1,
            ComponentKind::Optional { .. } => 2,
        }
    }

    /// `true` for [`ComponentKind::Literal`].
    pub fn is_literal(&self) -> bool {
        matches!(self, ComponentKind::Literal { .. })
    }
}

impl<C> fmt::Debug for ComponentKind<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentKind::Literal { aliases } => f.debug_struct("Literal").field("aliases", aliases).finish(),
            ComponentKind::Required { .. } => f.debug_struct("Required").finish(),
            ComponentKind::Optional { .. } => f.debug_struct("Optional").finish(),
        }
    }
}

/// How an `OPTIONAL` component's value is produced when the user omits it
/// (§4.2.2).
pub enum DefaultValue<C> {
    /// A fixed value computed once at registration time.
    Constant(Arc<dyn Any + Send + Sync>),
    /// A value computed from the context at resolution time. Must not
    /// observe or cause side effects when
    /// [`CommandContext::is_suggestions`] is `true`.
    Dynamic(Arc<dyn Fn(&CommandContext<C>) -> Box<dyn Any + Send + Sync> + Send + Sync>),
    /// A literal string, fed through the component's own parser at
    /// resolution time, so the default is guaranteed to be a value the
    /// parser itself would accept.
    ParsedLiteral(String),
}

impl<C> fmt::Debug for DefaultValue<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Constant(_) => write!(f, "DefaultValue::Constant(..)"),
            DefaultValue::Dynamic(_) => write!(f, "DefaultValue::Dynamic(..)"),
            DefaultValue::ParsedLiteral(lit) => write!(f, "DefaultValue::ParsedLiteral({lit:?})"),
        }
    }
}

/// Human-readable documentation attached to a component, shown by help and
/// suggestion UIs (§4.4).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArgumentDescription {
    /// A one-line summary.
    pub summary: String,
    /// Optional additional detail.
    pub long_description: Option<String>,
}

impl ArgumentDescription {
    /// A description with only a summary.
    pub fn new(summary: impl Into<String>) -> Self {
        ArgumentDescription {
            summary: summary.into(),
            long_description: None,
        }
    }

    /// Attach a long-form description.
    pub fn with_long_description(mut self, text: impl Into<String>) -> Self {
        self.long_description = Some(text.into());
        self
    }
}

/// Overrides the parser's own suggestions for one component, e.g. to offer
/// values drawn from live platform state (online player names, loaded world
/// names, …) instead of a closed parser-level set.
pub trait SuggestionProvider<C>: Send + Sync {
    /// Produce suggestions for the partially typed token at `input`'s
    /// current position.
    fn suggest(&self, ctx: &CommandContext<C>, input: &CommandInput) -> Vec<Suggestion>;
}

impl<C, F> SuggestionProvider<C> for F
where
    F: Fn(&CommandContext<C>, &CommandInput) -> Vec<Suggestion> + Send + Sync,
{
    fn suggest(&self, ctx: &CommandContext<C>, input: &CommandInput) -> Vec<Suggestion> {
        self(ctx, input)
    }
}

/// One component of a command's path: a name, a [`ComponentKind`], and the
/// metadata attached to it (permission, description, suggestion override).
pub struct CommandComponent<C> {
    /// The component's name: for `LITERAL`, the canonical (first) alias;
    /// for arguments, the parameter name used as the key into
    /// [`CommandContext`].
    pub name: String,
    /// Which of the three component shapes this is.
    pub kind: ComponentKind<C>,
    /// Documentation for help/suggestion UIs.
    pub description: ArgumentDescription,
    /// A permission evaluated, in addition to any permission on ancestors,
    /// before this component is allowed to be parsed.
    pub permission: Permission<C>,
    /// Overrides the parser's own suggestions, if set.
    pub suggestion_override: Option<Arc<dyn SuggestionProvider<C>>>,
}

impl<C> fmt::Debug for CommandComponent<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandComponent")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

impl<C: 'static> CommandComponent<C> {
    /// A `LITERAL` component matching any of `aliases`.
    pub fn literal(aliases: Vec<String>) -> Self {
        let name = aliases.first().cloned().unwrap_or_default();
        CommandComponent {
            name,
            kind: ComponentKind::Literal { aliases },
            description: ArgumentDescription::default(),
            permission: Permission::empty(),
            suggestion_override: None,
        }
    }

    /// A `REQUIRED` component named `name`, parsed by `parser`.
    pub fn required(name: impl Into<String>, parser: ErasedParserHandle<C>) -> Self {
        CommandComponent {
            name: name.into(),
            kind: ComponentKind::Required { parser },
            description: ArgumentDescription::default(),
            permission: Permission::empty(),
            suggestion_override: None,
        }
    }

    /// An `OPTIONAL` component named `name`, parsed by `parser`, defaulting
    /// via `default` when absent.
    pub fn optional(name: impl Into<String>, parser: ErasedParserHandle<C>, default: DefaultValue<C>) -> Self {
        CommandComponent {
            name: name.into(),
            kind: ComponentKind::Optional { parser, default },
            description: ArgumentDescription::default(),
            permission: Permission::empty(),
            suggestion_override: None,
        }
    }

    /// Attach a description.
    pub fn described(mut self, description: ArgumentDescription) -> Self {
        self.description = description;
        self
    }

    /// Attach a permission.
    pub fn permitted(mut self, permission: Permission<C>) -> Self {
        self.permission = permission;
        self
    }

    /// Attach a suggestion override.
    pub fn suggested_by(mut self, provider: impl SuggestionProvider<C> + 'static) -> Self {
        self.suggestion_override = Some(Arc::new(provider));
        self
    }

    fn aliases(&self) -> Option<&[String]> {
        match &self.kind {
            ComponentKind::Literal { aliases } => Some(aliases),
            _ => None,
        }
    }
}

/// One node in the command tree: a component plus its children.
///
/// The virtual [`CommandNode::root`] carries no component of its own; its
/// children are the root literals under which whole commands live.
pub struct CommandNode<C> {
    pub(crate) component: Option<CommandComponent<C>>,
    pub(crate) children: Vec<CommandNode<C>>,
    pub(crate) command: Option<Arc<ExecutableCommand<C>>>,
}

/// A structural problem detected while inserting a command into the tree
/// (§4.1's ambiguity and ordering rules).
#[derive(Debug, Clone, Error)]
pub enum TreeError {
    /// Two `LITERAL` siblings share at least one alias.
    #[error("literal alias '{alias}' is already used by a sibling component")]
    AmbiguousLiteral {
        /// The colliding alias.
        alias: String,
    },
    /// A node already has a non-`LITERAL` child, and another was inserted.
    #[error("node already has a {existing} child; only one non-literal child is allowed per node")]
    AmbiguousArgument {
        /// The kind of the existing child (`"REQUIRED"` or `"OPTIONAL"`).
        existing: &'static str,
    },
    /// A command was already registered at this exact path, and
    /// `override_existing_commands` was not set.
    #[error("a command is already registered at this path")]
    Conflict,
}

impl<C: 'static> Default for CommandNode<C> {
    fn default() -> Self {
        CommandNode::root()
    }
}

impl<C: 'static> CommandNode<C> {
    /// The virtual root of the tree.
    pub fn root() -> Self {
        CommandNode {
            component: None,
            children: Vec::new(),
            command: None,
        }
    }

    /// This node's component, or `None` for the root.
    pub fn component(&self) -> Option<&CommandComponent<C>> {
        self.component.as_ref()
    }

    /// This node's children, ordered `LITERAL`, then `REQUIRED`, then
    /// `OPTIONAL`.
    pub fn children(&self) -> &[CommandNode<C>] {
        &self.children
    }

    /// The command registered at this exact node, if any (a node can both
    /// have children and terminate a command, e.g. `/gamemode` alone vs
    /// `/gamemode survival`).
    pub fn command(&self) -> Option<&Arc<ExecutableCommand<C>>> {
        self.command.as_ref()
    }

    /// Insert `path`'s components as a chain below this node, attaching
    /// `command` at the final node. Existing nodes along a shared prefix
    /// (matching `LITERAL` alias set, or matching non-literal name) are
    /// reused rather than duplicated, matching how the teacher's
    /// `CommandTree` merges subcommands under a shared root literal.
    pub fn insert(
        &mut self,
        mut path: impl Iterator<Item = CommandComponent<C>>,
        command: Arc<ExecutableCommand<C>>,
        allow_override: bool,
    ) -> Result<(), TreeError> {
        match path.next() {
            None => {
                if self.command.is_some() && !allow_override {
                    return Err(TreeError::Conflict);
                }
                self.command = Some(command);
                Ok(())
            }
            Some(component) => {
                let index = self.find_or_insert_child(component)?;
                self.children[index].insert(path, command, allow_override)
            }
        }
    }

    fn find_or_insert_child(&mut self, component: CommandComponent<C>) -> Result<usize, TreeError> {
        if let ComponentKind::Literal { aliases } = &component.kind {
            for (i, child) in self.children.iter().enumerate() {
                if let Some(existing_aliases) = child.component.as_ref().and_then(CommandComponent::aliases) {
                    if existing_aliases.iter().any(|a| aliases.contains(a)) {
                        if existing_aliases.iter().collect::<Vec<_>>() == aliases.iter().collect::<Vec<_>>() {
                            return Ok(i);
                        }
                        return Err(TreeError::AmbiguousLiteral {
                            alias: aliases.iter().find(|a| existing_aliases.contains(a)).unwrap().clone(),
                        });
                    }
                }
            }
        } else {
            for (i, child) in self.children.iter().enumerate() {
                match &child.component {
                    Some(existing) if !existing.kind.is_literal() => {
                        if existing.name == component.name {
                            return Ok(i);
                        }
                        return Err(TreeError::AmbiguousArgument {
                            existing: if matches!(existing.kind, ComponentKind::Required { .. }) {
                                "REQUIRED"
                            } else {
                                "OPTIONAL"
                            },
                        });
                    }
                    _ => {}
                }
            }
        }

        // Insert in priority order directly rather than push-then-sort: a
        // sort by priority alone can't tell two freshly-pushed elements
        // apart from identical pre-existing ones, so recovering the index
        // of the node we just inserted from a re-sorted vec is not
        // reliable. A stable insertion point keeps existing children in
        // their relative order.
        let priority = component.kind.priority();
        let insert_at = self
            .children
            .iter()
            .position(|c| c.component.as_ref().map(|comp| comp.kind.priority()).unwrap_or(0) > priority)
            .unwrap_or(self.children.len());
        self.children.insert(
            insert_at,
            CommandNode {
                component: Some(component),
                children: Vec::new(),
                command: None,
            },
        );
        Ok(insert_at)
    }

    fn sort_children(&mut self) {
        self.children
            .sort_by_key(|c| c.component.as_ref().map(|comp| comp.kind.priority()).unwrap_or(0));
    }

    /// Children whose component is a `LITERAL` matching `token` exactly.
    pub fn matching_literals<'a>(&'a self, token: &str) -> impl Iterator<Item = &'a CommandNode<C>> {
        self.children.iter().filter(move |child| {
            child
                .component
                .as_ref()
                .and_then(CommandComponent::aliases)
                .map(|aliases| aliases.iter().any(|a| a.eq_ignore_ascii_case(token)))
                .unwrap_or(false)
        })
    }

    /// The single non-`LITERAL` child, if this node has one.
    pub fn argument_child(&self) -> Option<&CommandNode<C>> {
        self.children
            .iter()
            .find(|child| matches!(child.component.as_ref().map(|c| &c.kind), Some(k) if !k.is_literal()))
    }

    /// All `LITERAL` children, for suggestion/help listing.
    pub fn literal_children(&self) -> impl Iterator<Item = &CommandNode<C>> {
        self.children
            .iter()
            .filter(|child| matches!(child.component.as_ref().map(|c| c.kind.is_literal()), Some(true)))
    }
}

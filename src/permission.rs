// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Permissions
//!
//! [`Permission`] is a closed-world tagged sum: empty, an atomic named
//! permission, a conjunction, a disjunction, or a predicate over the sender.
//! Evaluating a `Permission` against a sender requires a platform-supplied
//! `has_permission` function, since only the platform adapter knows how to
//! check a named permission string against a concrete sender type.

use std::fmt;
use std::sync::Arc;

/// A boolean assertion on the sender, possibly composite.
#[derive(Clone)]
pub enum Permission<C> {
    /// Always allowed.
    Empty,
    /// An atomic, named permission, checked via the platform's
    /// `has_permission` function.
    Named(Arc<str>),
    /// Allowed iff every child is allowed.
    And(Vec<Permission<C>>),
    /// Allowed iff at least one child is allowed.
    Or(Vec<Permission<C>>),
    /// Allowed iff the predicate returns `true` for the sender.
    Predicate(Arc<dyn Fn(&C) -> bool + Send + Sync>),
}

impl<C> fmt::Debug for Permission<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Permission::Empty => write!(f, "Permission::Empty"),
            Permission::Named(name) => write!(f, "Permission::Named({name:?})"),
            Permission::And(children) => write!(f, "Permission::And({children:?})"),
            Permission::Or(children) => write!(f, "Permission::Or({children:?})"),
            Permission::Predicate(_) => write!(f, "Permission::Predicate(..)"),
        }
    }
}

impl<C> Permission<C> {
    /// A permission that is always satisfied.
    pub fn empty() -> Self {
        Permission::Empty
    }

    /// An atomic named permission.
    pub fn named(name: impl Into<Arc<str>>) -> Self {
        Permission::Named(name.into())
    }

    /// The conjunction of the given permissions: allowed iff all are
    /// allowed.
    pub fn and(children: impl IntoIterator<Item = Permission<C>>) -> Self {
        Permission::And(children.into_iter().collect())
    }

    /// The disjunction of the given permissions: allowed iff any is
    /// allowed.
    pub fn or(children: impl IntoIterator<Item = Permission<C>>) -> Self {
        Permission::Or(children.into_iter().collect())
    }

    /// A permission computed by an arbitrary predicate over the sender.
    pub fn predicate(f: impl Fn(&C) -> bool + Send + Sync + 'static) -> Self {
        Permission::Predicate(Arc::new(f))
    }

    /// Evaluate this permission for `sender`, delegating named-permission
    /// checks to `has_permission`.
    pub fn evaluate(&self, sender: &C, has_permission: &dyn Fn(&C, &str) -> bool) -> PermissionResult<C> {
        match self {
            Permission::Empty => PermissionResult {
                allowed: true,
                source: self.clone(),
            },
            Permission::Named(name) => PermissionResult {
                allowed: has_permission(sender, name),
                source: self.clone(),
            },
            Permission::And(children) => {
                for child in children {
                    let result = child.evaluate(sender, has_permission);
                    if !result.allowed {
                        return PermissionResult {
                            allowed: false,
                            source: result.source,
                        };
                    }
                }
                PermissionResult {
                    allowed: true,
                    source: self.clone(),
                }
            }
            Permission::Or(children) => {
                let mut last = PermissionResult {
                    allowed: children.is_empty(),
                    source: self.clone(),
                };
                for child in children {
                    let result = child.evaluate(sender, has_permission);
                    if result.allowed {
                        return result;
                    }
                    last = result;
                }
                last
            }
            Permission::Predicate(pred) => PermissionResult {
                allowed: pred(sender),
                source: self.clone(),
            },
        }
    }
}

/// The (cacheable) outcome of evaluating a [`Permission`].
///
/// `source` names the specific sub-permission responsible for the result:
/// for `And`, the first denied child; for `Or`, whichever child was
/// actually evaluated to produce the result.
#[derive(Clone)]
pub struct PermissionResult<C> {
    /// Whether the sender was allowed.
    pub allowed: bool,
    /// The permission (sub-tree) that produced this result.
    pub source: Permission<C>,
}

impl<C> PermissionResult<C> {
    /// `true` if the sender was allowed.
    pub fn is_allowed(&self) -> bool {
        self.allowed
    }
}

impl<C> fmt::Debug for PermissionResult<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PermissionResult")
            .field("allowed", &self.allowed)
            .field("source", &self.source)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn always_true(_: &(), _: &str) -> bool {
        true
    }
    fn always_false(_: &(), _: &str) -> bool {
        false
    }

    #[test]
    fn empty_always_allows() {
        let perm: Permission<()> = Permission::empty();
        assert!(perm.evaluate(&(), &always_false).allowed);
    }

    #[test]
    fn and_denies_if_any_child_denies() {
        let allow: Permission<()> = Permission::named("a");
        let deny: Permission<()> = Permission::Predicate(Arc::new(|_| false));
        let combined = Permission::and([allow, deny]);
        assert!(!combined.evaluate(&(), &always_true).allowed);
    }

    #[test]
    fn and_allows_if_all_children_allow() {
        let a: Permission<()> = Permission::named("a");
        let b: Permission<()> = Permission::named("b");
        let combined = Permission::and([a, b]);
        assert!(combined.evaluate(&(), &always_true).allowed);
    }

    #[test]
    fn or_allows_if_any_child_allows() {
        let a: Permission<()> = Permission::Predicate(Arc::new(|_| false));
        let b: Permission<()> = Permission::named("b");
        let combined = Permission::or([a, b]);
        assert!(combined.evaluate(&(), &always_true).allowed);
    }

    #[test]
    fn or_denies_if_all_children_deny() {
        let a: Permission<()> = Permission::named("a");
        let b: Permission<()> = Permission::named("b");
        let combined = Permission::or([a, b]);
        assert!(!combined.evaluate(&(), &always_false).allowed);
    }

    #[test]
    fn predicate_delegates_to_closure() {
        let perm: Permission<i32> = Permission::predicate(|sender| *sender > 0);
        assert!(perm.evaluate(&1, &always_false).allowed);
        assert!(!perm.evaluate(&-1, &always_false).allowed);
    }
}

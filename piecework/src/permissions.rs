//! Owners and permission levels.

use piecework_core::Message;
use std::{
    collections::{BTreeMap, HashSet},
    fmt,
    sync::{Arc, PoisonError, RwLock},
};

/// Highest permission level, reserved for owners by default.
pub const OWNER_LEVEL: u8 = 10;

/// Shared, mutable set of owner user ids. Clones share the same set.
#[derive(Debug, Clone, Default)]
pub struct OwnerSet(Arc<RwLock<HashSet<String>>>);

impl OwnerSet {
    /// A set holding `owners`.
    pub fn new<I, S>(owners: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(Arc::new(RwLock::new(
            owners.into_iter().map(Into::into).collect(),
        )))
    }

    /// Add an owner. Returns `true` if they were not already one.
    pub fn add(&self, id: impl Into<String>) -> bool {
        self.0
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.into())
    }

    /// Remove an owner. Returns `true` if they were one.
    pub fn remove(&self, id: &str) -> bool {
        self.0
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
    }

    /// Whether `id` is an owner.
    pub fn contains(&self, id: &str) -> bool {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(id)
    }

    /// Number of owners.
    pub fn len(&self) -> usize {
        self.0.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether there are no owners.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What a permission check can look at.
pub struct PermissionContext<'a> {
    /// The message being authorized.
    pub message: &'a Message,
    /// Current owners.
    pub owners: &'a OwnerSet,
}

type PermissionCheck = Arc<dyn Fn(&PermissionContext<'_>) -> bool + Send + Sync>;

/// Ordered permission levels.
///
/// A user satisfies level `n` when any check registered at a level of `n`
/// or above passes, so higher levels imply every lower one.
#[derive(Clone)]
pub struct PermissionLevels {
    levels: BTreeMap<u8, Vec<PermissionCheck>>,
}

impl PermissionLevels {
    /// Levels with no checks at all; nothing is permitted.
    pub fn empty() -> Self {
        Self {
            levels: BTreeMap::new(),
        }
    }

    /// Add a check at `level`.
    pub fn add<F>(mut self, level: u8, check: F) -> Self
    where
        F: Fn(&PermissionContext<'_>) -> bool + Send + Sync + 'static,
    {
        self.levels.entry(level).or_default().push(Arc::new(check));
        self
    }

    /// Whether `ctx` satisfies `level`.
    pub fn permits(&self, level: u8, ctx: &PermissionContext<'_>) -> bool {
        self.levels
            .range(level..)
            .any(|(_, checks)| checks.iter().any(|check| check(ctx)))
    }

    /// Levels that have at least one check, ascending.
    pub fn levels(&self) -> impl Iterator<Item = u8> + '_ {
        self.levels.keys().copied()
    }
}

impl Default for PermissionLevels {
    /// Level 0 for everyone, [`OWNER_LEVEL`] for owners.
    fn default() -> Self {
        Self::empty()
            .add(0, |_| true)
            .add(OWNER_LEVEL, |ctx| ctx.owners.contains(&ctx.message.author.id))
    }
}

impl fmt::Debug for PermissionLevels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PermissionLevels")
            .field("levels", &self.levels.keys().collect::<Vec<_>>())
            .finish()
    }
}

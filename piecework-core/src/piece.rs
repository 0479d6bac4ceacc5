//! The shared piece record.
//!
//! Every piece, whatever its variant, is a [`Piece<V>`]: a name, an enabled
//! flag, the variant's options and a shared behavior value. Variants are
//! selected with zero-sized marker types implementing [`Variant`].

use crate::error::BoxError;
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

/// Closed set of piece variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PieceKind {
    /// User-invoked command.
    Command,
    /// Listener for runtime events.
    Event,
    /// Handler run for every inbound message.
    Filter,
    /// Predicate that may block a command.
    Guard,
    /// Named unit of deferred work.
    Task,
    /// Post-processor run after a command succeeds.
    Finalizer,
}

impl PieceKind {
    /// Every kind, in store creation order.
    pub const ALL: [PieceKind; 6] = [
        PieceKind::Command,
        PieceKind::Event,
        PieceKind::Filter,
        PieceKind::Guard,
        PieceKind::Task,
        PieceKind::Finalizer,
    ];

    /// Name of the default store for this kind.
    pub fn store_name(self) -> &'static str {
        match self {
            PieceKind::Command => "commands",
            PieceKind::Event => "events",
            PieceKind::Filter => "filters",
            PieceKind::Guard => "guards",
            PieceKind::Task => "tasks",
            PieceKind::Finalizer => "finalizers",
        }
    }
}

impl fmt::Display for PieceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PieceKind::Command => "command",
            PieceKind::Event => "event",
            PieceKind::Filter => "filter",
            PieceKind::Guard => "guard",
            PieceKind::Task => "task",
            PieceKind::Finalizer => "finalizer",
        };
        f.write_str(name)
    }
}

/// A handle for toggling a piece's enabled state at runtime.
///
/// Clones share the same flag.
#[derive(Debug, Clone)]
pub struct EnabledHandle(Arc<AtomicBool>);

impl EnabledHandle {
    /// Create a new enabled handle with the given initial state.
    pub fn new(enabled: bool) -> Self {
        Self(Arc::new(AtomicBool::new(enabled)))
    }

    /// Check if the piece is currently enabled.
    pub fn is_enabled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Enable the piece. Returns `true` if the state changed.
    pub fn enable(&self) -> bool {
        !self.0.swap(true, Ordering::AcqRel)
    }

    /// Disable the piece. Returns `true` if the state changed.
    pub fn disable(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }

    /// Set the enabled state. Returns `true` if the state changed.
    pub fn set(&self, enabled: bool) -> bool {
        self.0.swap(enabled, Ordering::AcqRel) != enabled
    }
}

impl Default for EnabledHandle {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Marker type describing one piece variant.
///
/// `Behavior` is the object-safe trait the variant's pieces store, for
/// example `dyn DynCommand`.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a piece variant",
    label = "missing `Variant` implementation",
    note = "Use one of the provided variants such as `CommandVariant` or `GuardVariant`."
)]
pub trait Variant: Send + Sync + Sized + 'static {
    /// The kind tag shared by every piece of this variant.
    const KIND: PieceKind;

    /// Variant-specific configuration.
    type Options: Clone + fmt::Debug + Default + Send + Sync + 'static;

    /// Stored behavior.
    type Behavior: ?Sized + Send + Sync + 'static;

    /// Run the piece's `init` hook. Called whenever a piece enters a store.
    fn init(piece: &Piece<Self>) -> Result<(), BoxError>;
}

/// Context handed to a piece's `init` hook.
pub struct InitContext<'a> {
    name: &'a str,
    kind: PieceKind,
    enabled: &'a EnabledHandle,
}

impl<'a> InitContext<'a> {
    /// Build the context for a piece.
    pub fn of<V: Variant>(piece: &'a Piece<V>) -> Self {
        Self {
            name: &piece.name,
            kind: V::KIND,
            enabled: &piece.enabled,
        }
    }

    /// Name of the piece being initialized.
    pub fn name(&self) -> &str {
        self.name
    }

    /// Kind of the piece being initialized.
    pub fn kind(&self) -> PieceKind {
        self.kind
    }

    /// Start the piece disabled.
    pub fn disable(&self) {
        self.enabled.disable();
    }

    /// Handle to the piece's enabled flag.
    pub fn enabled_handle(&self) -> EnabledHandle {
        self.enabled.clone()
    }
}

/// Plain summary of a piece, used in events and reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PieceInfo {
    /// Piece name.
    pub name: String,
    /// Variant tag.
    pub kind: PieceKind,
    /// Enabled state when the summary was taken.
    pub enabled: bool,
}

/// One pluggable unit of behavior.
pub struct Piece<V: Variant> {
    name: String,
    enabled: EnabledHandle,
    options: V::Options,
    behavior: Arc<V::Behavior>,
}

impl<V: Variant> Piece<V> {
    /// Create a piece from an already shared behavior, with default options.
    pub fn from_arc(name: impl Into<String>, behavior: Arc<V::Behavior>) -> Self {
        Self {
            name: name.into(),
            enabled: EnabledHandle::default(),
            options: V::Options::default(),
            behavior,
        }
    }

    /// Replace the options.
    pub fn with_options(mut self, options: V::Options) -> Self {
        self.options = options;
        self
    }

    /// Set the initial enabled state.
    pub fn with_enabled(self, enabled: bool) -> Self {
        self.enabled.set(enabled);
        self
    }

    /// Piece name, unique within its store.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Variant tag.
    pub fn kind(&self) -> PieceKind {
        V::KIND
    }

    /// Variant-specific options.
    pub fn options(&self) -> &V::Options {
        &self.options
    }

    /// The stored behavior.
    pub fn behavior(&self) -> &V::Behavior {
        &self.behavior
    }

    /// Check if the piece is currently enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled.is_enabled()
    }

    /// Enable the piece. Returns `true` if the state changed.
    pub fn enable(&self) -> bool {
        self.enabled.enable()
    }

    /// Disable the piece. Returns `true` if the state changed.
    pub fn disable(&self) -> bool {
        self.enabled.disable()
    }

    /// Get a handle for toggling enabled state at runtime.
    pub fn enabled_handle(&self) -> EnabledHandle {
        self.enabled.clone()
    }

    /// Summarize the piece.
    pub fn info(&self) -> PieceInfo {
        PieceInfo {
            name: self.name.clone(),
            kind: V::KIND,
            enabled: self.is_enabled(),
        }
    }
}

impl<V: Variant> fmt::Debug for Piece<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Piece")
            .field("name", &self.name)
            .field("kind", &V::KIND)
            .field("enabled", &self.is_enabled())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enabled_handle_is_idempotent() {
        let handle = EnabledHandle::default();
        assert!(!handle.enable());
        assert!(handle.disable());
        assert!(!handle.disable());
        assert!(!handle.is_enabled());
        assert!(handle.set(true));
        assert!(!handle.set(true));
    }

    #[test]
    fn test_clones_share_state() {
        let handle = EnabledHandle::new(true);
        let other = handle.clone();
        other.disable();
        assert!(!handle.is_enabled());
    }

    #[test]
    fn test_store_names() {
        assert_eq!(PieceKind::Guard.store_name(), "guards");
        assert_eq!(PieceKind::Filter.to_string(), "filter");
    }
}

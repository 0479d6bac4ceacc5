//! Type-erased view of a store, for hosts that keep stores of every variant
//! side by side.

use super::{LoadReport, Store};
use futures::future::BoxFuture;
use piecework_core::{PieceInfo, PieceKind, StoreError, Variant};

/// Object-safe operations shared by every [`Store`].
pub trait StoreHandle: Send + Sync + 'static {
    /// Store name.
    fn name(&self) -> &'static str;

    /// Variant of the pieces held.
    fn kind(&self) -> PieceKind;

    /// Number of pieces held.
    fn len(&self) -> usize;

    /// Whether the store is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Summary of one piece.
    fn info(&self, name: &str) -> Option<PieceInfo>;

    /// Summaries of every piece.
    fn infos(&self) -> Vec<PieceInfo>;

    /// Reload every source; see [`Store::load_all`].
    fn load_all(&self) -> BoxFuture<'_, LoadReport>;

    /// Enable a piece. Returns `true` if its state changed.
    fn enable(&self, name: &str) -> Result<bool, StoreError>;

    /// Disable a piece. Returns `true` if its state changed.
    fn disable(&self, name: &str) -> Result<bool, StoreError>;

    /// Remove a piece.
    fn unload(&self, name: &str) -> Result<PieceInfo, StoreError>;

    /// Replace a piece from its source.
    fn reload<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<PieceInfo, StoreError>>;
}

impl<V: Variant> StoreHandle for Store<V> {
    fn name(&self) -> &'static str {
        Store::name(self)
    }

    fn kind(&self) -> PieceKind {
        V::KIND
    }

    fn len(&self) -> usize {
        Store::len(self)
    }

    fn info(&self, name: &str) -> Option<PieceInfo> {
        self.get(name).map(|piece| piece.info())
    }

    fn infos(&self) -> Vec<PieceInfo> {
        Store::infos(self)
    }

    fn load_all(&self) -> BoxFuture<'_, LoadReport> {
        Box::pin(self.load_all_contained())
    }

    fn enable(&self, name: &str) -> Result<bool, StoreError> {
        Store::enable(self, name)
    }

    fn disable(&self, name: &str) -> Result<bool, StoreError> {
        Store::disable(self, name)
    }

    fn unload(&self, name: &str) -> Result<PieceInfo, StoreError> {
        Store::unload(self, name).map(|piece| piece.info())
    }

    fn reload<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<PieceInfo, StoreError>> {
        Box::pin(async move { Store::reload(self, name).await.map(|piece| piece.info()) })
    }
}

//! Where pieces come from.
//!
//! A store never builds pieces itself. It asks its sources, once per bulk
//! load and again on every reload, so a source must be able to produce a
//! fresh piece each time it is called.

use futures::future::BoxFuture;
use piecework_core::{BoxError, Piece, Variant};
use std::future::Future;

/// Something that can produce a piece for a store.
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot load `{V}` pieces",
    label = "missing `PieceSource` implementation",
    note = "Sources must implement `load(defaults)`; closures can be wrapped with `FnSource`."
)]
pub trait PieceSource<V: Variant>: Send + Sync + 'static {
    /// Human-readable description, used in logs and load reports.
    fn origin(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }

    /// Produce a new piece. `defaults` are the store's default options.
    fn load(&self, defaults: &V::Options) -> impl Future<Output = Result<Piece<V>, BoxError>> + Send;
}

/// Dynamic object-safe version of [`PieceSource`].
pub trait DynPieceSource<V: Variant>: Send + Sync + 'static {
    /// Description of the source.
    fn origin_dyn(&self) -> String;

    /// Produce a new piece (dynamic dispatch version).
    fn load_dyn<'a>(&'a self, defaults: &'a V::Options) -> BoxFuture<'a, Result<Piece<V>, BoxError>>;
}

impl<V: Variant, S: PieceSource<V>> DynPieceSource<V> for S {
    fn origin_dyn(&self) -> String {
        self.origin()
    }

    fn load_dyn<'a>(&'a self, defaults: &'a V::Options) -> BoxFuture<'a, Result<Piece<V>, BoxError>> {
        Box::pin(self.load(defaults))
    }
}

/// A source backed by a synchronous builder function.
pub struct FnSource<F> {
    origin: String,
    build: F,
}

impl<F> FnSource<F> {
    /// Wrap a builder function. Prefer [`Store::add_source_fn`], which lets
    /// the compiler infer the closure's argument types.
    ///
    /// [`Store::add_source_fn`]: crate::store::Store::add_source_fn
    pub fn new(origin: impl Into<String>, build: F) -> Self {
        Self {
            origin: origin.into(),
            build,
        }
    }
}

impl<V, F> PieceSource<V> for FnSource<F>
where
    V: Variant,
    F: Fn(&V::Options) -> Result<Piece<V>, BoxError> + Send + Sync + 'static,
{
    fn origin(&self) -> String {
        self.origin.clone()
    }

    fn load(&self, defaults: &V::Options) -> impl Future<Output = Result<Piece<V>, BoxError>> + Send {
        async move { (self.build)(defaults) }
    }
}

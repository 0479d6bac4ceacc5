//! Finalizers: post-processors run after a command succeeds.

use crate::{
    command::CommandPiece,
    error::BoxError,
    message::Message,
    piece::{InitContext, Piece, PieceKind, Variant},
    response::Response,
    stopwatch::Stopwatch,
};
use futures::future::BoxFuture;
use std::{future::Future, sync::Arc};

/// Marker for finalizer pieces.
pub struct FinalizerVariant;

/// A registered finalizer.
pub type FinalizerPiece = Piece<FinalizerVariant>;

impl Variant for FinalizerVariant {
    const KIND: PieceKind = PieceKind::Finalizer;
    type Options = ();
    type Behavior = dyn DynFinalizer;

    fn init(piece: &Piece<Self>) -> Result<(), BoxError> {
        piece.behavior().init_dyn(&InitContext::of(piece))
    }
}

impl Piece<FinalizerVariant> {
    /// Create a finalizer piece.
    pub fn new<F: Finalizer>(name: impl Into<String>, finalizer: F) -> Self {
        Self::from_arc(name, Arc::new(finalizer))
    }
}

/// A post-processor.
///
/// `timer` was stopped when the command handed back its future, so it
/// measures hand-off time rather than the command's full run time.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a `Finalizer`",
    label = "missing `Finalizer` implementation",
    note = "Finalizers must implement `run(message, command, response, timer)`."
)]
pub trait Finalizer: Send + Sync + 'static {
    /// React to a successful command.
    fn run(
        &self,
        message: Arc<Message>,
        command: Arc<CommandPiece>,
        response: Response,
        timer: Stopwatch,
    ) -> impl Future<Output = Result<(), BoxError>> + Send;

    /// Called when the piece enters a store.
    fn init(&self, _ctx: &InitContext<'_>) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Dynamic object-safe version of [`Finalizer`].
pub trait DynFinalizer: Send + Sync + 'static {
    /// Run the finalizer (dynamic dispatch version).
    fn run_dyn(
        &self,
        message: Arc<Message>,
        command: Arc<CommandPiece>,
        response: Response,
        timer: Stopwatch,
    ) -> BoxFuture<'_, Result<(), BoxError>>;

    /// Run the init hook (dynamic dispatch version).
    fn init_dyn(&self, ctx: &InitContext<'_>) -> Result<(), BoxError>;
}

impl<T: Finalizer> DynFinalizer for T {
    fn run_dyn(
        &self,
        message: Arc<Message>,
        command: Arc<CommandPiece>,
        response: Response,
        timer: Stopwatch,
    ) -> BoxFuture<'_, Result<(), BoxError>> {
        Box::pin(self.run(message, command, response, timer))
    }

    fn init_dyn(&self, ctx: &InitContext<'_>) -> Result<(), BoxError> {
        self.init(ctx)
    }
}

impl<F, Fut> Finalizer for F
where
    F: Fn(Arc<Message>, Arc<CommandPiece>, Response, Stopwatch) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send,
{
    fn run(
        &self,
        message: Arc<Message>,
        command: Arc<CommandPiece>,
        response: Response,
        timer: Stopwatch,
    ) -> impl Future<Output = Result<(), BoxError>> + Send {
        (self)(message, command, response, timer)
    }
}

//! Tasks: named units of work triggered outside the message pipeline.

use crate::{
    error::{BoxError, contain_panic},
    piece::{InitContext, Piece, PieceKind, Variant},
};
use futures::future::BoxFuture;
use std::{future::Future, sync::Arc};

/// Marker for task pieces.
pub struct TaskVariant;

/// A registered task.
pub type TaskPiece = Piece<TaskVariant>;

impl Variant for TaskVariant {
    const KIND: PieceKind = PieceKind::Task;
    type Options = ();
    type Behavior = dyn DynTask;

    fn init(piece: &Piece<Self>) -> Result<(), BoxError> {
        piece.behavior().init_dyn(&InitContext::of(piece))
    }
}

impl Piece<TaskVariant> {
    /// Create a task piece.
    pub fn new<T: Task>(name: impl Into<String>, task: T) -> Self {
        Self::from_arc(name, Arc::new(task))
    }

    /// Run the task, containing panics.
    pub async fn execute(&self, data: Option<String>) -> Result<(), BoxError> {
        contain_panic(self.behavior().run_dyn(data)).await
    }
}

/// A task.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a `Task`",
    label = "missing `Task` implementation",
    note = "Tasks must implement `run(data)`."
)]
pub trait Task: Send + Sync + 'static {
    /// Run the task with its optional payload.
    fn run(&self, data: Option<String>) -> impl Future<Output = Result<(), BoxError>> + Send;

    /// Called when the piece enters a store.
    fn init(&self, _ctx: &InitContext<'_>) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Dynamic object-safe version of [`Task`].
pub trait DynTask: Send + Sync + 'static {
    /// Run the task (dynamic dispatch version).
    fn run_dyn(&self, data: Option<String>) -> BoxFuture<'_, Result<(), BoxError>>;

    /// Run the init hook (dynamic dispatch version).
    fn init_dyn(&self, ctx: &InitContext<'_>) -> Result<(), BoxError>;
}

impl<T: Task> DynTask for T {
    fn run_dyn(&self, data: Option<String>) -> BoxFuture<'_, Result<(), BoxError>> {
        Box::pin(self.run(data))
    }

    fn init_dyn(&self, ctx: &InitContext<'_>) -> Result<(), BoxError> {
        self.init(ctx)
    }
}

impl<F, Fut> Task for F
where
    F: Fn(Option<String>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send,
{
    fn run(&self, data: Option<String>) -> impl Future<Output = Result<(), BoxError>> + Send {
        (self)(data)
    }
}

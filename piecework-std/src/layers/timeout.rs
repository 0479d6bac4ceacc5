//! Time-limited execution for commands, guards and filters.

use piecework_core::{
    BoxError, Command, CommandPiece, Filter, Guard, GuardResult, InitContext, Message, PieceError,
    Response,
};
use std::{future::Future, sync::Arc, time::Duration};
use tokio::time::timeout;

/// Runs the wrapped piece under a deadline.
///
/// When the deadline passes the inner future is dropped and the piece fails
/// with [`PieceError::Timeout`].
pub struct Timeout<T> {
    inner: T,
    duration: Duration,
}

impl<T> Timeout<T> {
    /// Wrap `inner` with a deadline of `duration`.
    pub fn new(inner: T, duration: Duration) -> Self {
        Self { inner, duration }
    }

    /// The deadline.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    async fn limit<R>(
        &self,
        future: impl Future<Output = Result<R, BoxError>>,
    ) -> Result<R, BoxError> {
        match timeout(self.duration, future).await {
            Ok(result) => result,
            Err(_) => Err(PieceError::Timeout(self.duration).into()),
        }
    }
}

impl<C: Command> Command for Timeout<C> {
    async fn run(&self, message: Arc<Message>, params: Vec<String>) -> Result<Response, BoxError> {
        self.limit(self.inner.run(message, params)).await
    }

    async fn run_subcommand(
        &self,
        name: &str,
        message: Arc<Message>,
        params: Vec<String>,
    ) -> Result<Response, BoxError> {
        self.limit(self.inner.run_subcommand(name, message, params))
            .await
    }

    fn init(&self, ctx: &InitContext<'_>) -> Result<(), BoxError> {
        self.inner.init(ctx)
    }
}

impl<G: Guard> Guard for Timeout<G> {
    async fn run(
        &self,
        message: Arc<Message>,
        command: Arc<CommandPiece>,
    ) -> Result<GuardResult, BoxError> {
        self.limit(self.inner.run(message, command)).await
    }

    fn init(&self, ctx: &InitContext<'_>) -> Result<(), BoxError> {
        self.inner.init(ctx)
    }
}

impl<F: Filter> Filter for Timeout<F> {
    fn should_run(&self, message: &Message) -> bool {
        self.inner.should_run(message)
    }

    async fn run(&self, message: Arc<Message>) -> Result<(), BoxError> {
        self.limit(self.inner.run(message)).await
    }

    fn init(&self, ctx: &InitContext<'_>) -> Result<(), BoxError> {
        self.inner.init(ctx)
    }
}

//! Error types for Piecework.
//!
//! This module provides a structured error hierarchy using `thiserror`:
//!
//! - [`PieceworkError`] - Top-level error type for all Piecework operations
//! - [`StoreError`] - Errors raised by piece registries
//! - [`PieceError`] - Failures raised while a piece runs
//!
//! Piece bodies themselves return [`BoxError`], so plugins are free to use
//! whatever error type they like. Events carry [`SharedError`] so they stay
//! cheap to clone across listeners.

use futures::FutureExt;
use std::{any::Any, future::Future, panic::AssertUnwindSafe, sync::Arc, time::Duration};
use thiserror::Error;

/// A boxed error type for dynamic error handling.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A reference-counted error, shared between every listener of an event.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level error type for all Piecework operations.
#[derive(Error, Debug)]
pub enum PieceworkError {
    /// A registry operation failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A piece failed while running.
    #[error("piece error: {0}")]
    Piece(#[from] PieceError),

    /// A custom error occurred.
    #[error(transparent)]
    Custom(BoxError),
}

/// Errors raised by piece registries.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A piece with the same name is already registered.
    #[error("a piece named `{name}` is already registered in the {store} store")]
    DuplicateName {
        /// Store that rejected the piece.
        store: &'static str,
        /// Conflicting name.
        name: String,
    },

    /// No piece with the given name exists.
    #[error("no piece named `{name}` in the {store} store")]
    NotFound {
        /// Store that was searched.
        store: &'static str,
        /// Requested name.
        name: String,
    },

    /// The piece was registered directly and has no source to reload from.
    #[error("piece `{name}` was registered directly and cannot be reloaded")]
    NoSource {
        /// Piece name.
        name: String,
    },

    /// A piece source failed to produce a piece.
    #[error("failed to load a piece from {origin}")]
    Load {
        /// Description of the source.
        origin: String,
        /// Underlying failure.
        #[source]
        error: BoxError,
    },

    /// A piece's `init` hook failed.
    #[error("piece `{name}` failed to initialize")]
    Init {
        /// Piece name.
        name: String,
        /// Underlying failure.
        #[source]
        error: BoxError,
    },

    /// No store with the given name is registered with the runtime.
    #[error("no store named `{0}` is registered")]
    UnknownStore(String),
}

/// Failures raised while a piece runs.
#[derive(Error, Debug)]
pub enum PieceError {
    /// The piece panicked.
    #[error("piece panicked: {0}")]
    Panic(String),

    /// The piece did not finish in time.
    #[error("piece timed out after {0:?}")]
    Timeout(Duration),

    /// A subcommand was requested that the command does not provide.
    #[error("no subcommand named `{0}`")]
    UnknownSubcommand(String),

    /// A subcommanded command ran without a subcommand.
    #[error("a subcommand is required")]
    MissingSubcommand,
}

impl From<BoxError> for PieceworkError {
    fn from(err: BoxError) -> Self {
        PieceworkError::Custom(err)
    }
}

/// Extract a readable message from a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Await a piece future, turning a panic into [`PieceError::Panic`].
///
/// Every piece body the runtime drives goes through this, so a panicking
/// plugin is reported like any other failure.
pub async fn contain_panic<T, F>(future: F) -> Result<T, BoxError>
where
    F: Future<Output = Result<T, BoxError>>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(Box::new(PieceError::Panic(panic_message(payload.as_ref())))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn explode() -> Result<(), BoxError> {
        panic!("kaboom")
    }

    #[tokio::test]
    async fn test_contain_panic_reports_message() {
        let err = contain_panic(explode()).await.unwrap_err();
        assert_eq!(err.to_string(), "piece panicked: kaboom");
    }

    #[tokio::test]
    async fn test_contain_panic_passes_through() {
        let result = contain_panic(async { Ok::<_, BoxError>(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[test]
    fn test_store_error_display() {
        let err = StoreError::DuplicateName {
            store: "commands",
            name: "ping".into(),
        };
        assert_eq!(
            err.to_string(),
            "a piece named `ping` is already registered in the commands store"
        );
    }
}

//! # piecework-core
//!
//! Core types and traits for the Piecework command dispatch runtime.
//!
//! This crate has minimal dependencies and is meant to be imported by
//! plugins that only need to describe pieces, not host them.
//!
//! # Pieces
//!
//! A [`Piece`] is one named, toggleable unit of behavior. Every piece belongs
//! to exactly one variant, described by a [`Variant`] marker type:
//!
//! | variant | behavior trait | runs when |
//! |---|---|---|
//! | [`CommandVariant`] | [`Command`] | a message resolves to the command |
//! | [`GuardVariant`] | [`Guard`] | before a resolved command runs |
//! | [`FilterVariant`] | [`Filter`] | for every inbound message |
//! | [`FinalizerVariant`] | [`Finalizer`] | after a command succeeds |
//! | [`EventVariant`] | [`Event`] | a [`RuntimeEvent`] is emitted |
//! | [`TaskVariant`] | [`Task`] | a task is triggered by name |
//!
//! Each behavior trait uses native `async fn` for static dispatch and has an
//! object-safe `Dyn*` twin with a blanket implementation, which is what a
//! [`Piece`] stores.
//!
//! # Error Types
//!
//! - [`PieceworkError`] - Top-level error type
//! - [`StoreError`] - Registry errors
//! - [`PieceError`] - Failures raised while running a piece

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod command;
mod error;
mod event;
mod filter;
mod finalizer;
mod guard;
mod message;
mod piece;
mod response;
mod stopwatch;
mod task;

pub use command::{
    ChannelScope, Command, CommandOptions, CommandPiece, CommandVariant, DynCommand, Subcommands,
};
pub use error::{
    BoxError, PieceError, PieceworkError, SharedError, StoreError, contain_panic, panic_message,
};
pub use event::{
    DynEvent, Emitter, Event, EventKind, EventOptions, EventPiece, EventVariant, RuntimeEvent,
};
pub use filter::{DynFilter, Filter, FilterOptions, FilterPiece, FilterVariant, IgnoreFlags};
pub use finalizer::{DynFinalizer, Finalizer, FinalizerPiece, FinalizerVariant};
pub use guard::{
    DynGuard, Guard, GuardOptions, GuardPiece, GuardResult, GuardVariant, GuardVerdict,
};
pub use message::{
    Author, Channel, Invocation, Message, MessageKind, Prefix, Settings, StaticSettings,
};
pub use piece::{EnabledHandle, InitContext, Piece, PieceInfo, PieceKind, Variant};
pub use response::{IntoResponse, Response};
pub use stopwatch::Stopwatch;
pub use task::{DynTask, Task, TaskPiece, TaskVariant};

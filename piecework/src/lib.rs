//! # piecework - Pluggable Command Dispatch
//!
//! `piecework` hosts a chat-style command runtime assembled from **pieces**:
//! small named units of behavior that live in stores, can be toggled,
//! unloaded and reloaded while the runtime runs.
//!
//! | piece | runs when |
//! |---|---|
//! | [`Command`] | a message resolves to it |
//! | [`Guard`] | before a resolved command, and may block it |
//! | [`Filter`] | for every inbound message |
//! | [`Finalizer`] | after a command succeeded |
//! | [`Event`] | a [`RuntimeEvent`] is emitted |
//! | [`Task`] | triggered by name |
//!
//! Commands are dispatched by the built-in `commandHandler` filter
//! ([`CommandHandler`]): parse, resolve, guard, run, finalize, each step
//! reported through events.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use piecework::prelude::*;
//!
//! #[piecework::command(aliases = ["p"], description = "Replies with pong")]
//! async fn ping(message: Arc<Message>, _params: Vec<String>) -> Result<&'static str, BoxError> {
//!     message.send("pong").await?;
//!     Ok("pong")
//! }
//!
//! let config = RuntimeConfig::from_path("piecework.toml")?;
//! piecework::console::init_console(&config.console)?;
//!
//! let runtime = Runtime::builder(config)
//!     .plugin(|runtime: &Runtime| {
//!         runtime.commands().register(ping::piece())?;
//!         Ok::<_, BoxError>(())
//!     })
//!     .build()?;
//! runtime.start().await;
//! ```
//!
//! ## Crates
//!
//! - `piecework-core`: piece traits, messages, events and errors
//! - `piecework-std`: stores and test doubles
//! - `piecework-macros`: `#[command]`, `#[guard]` and `#[event]` (feature `macros`)

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

pub use piecework_core::{
    // Messages
    Author,
    // Errors
    BoxError,
    Channel,
    ChannelScope,
    // Commands
    Command,
    CommandOptions,
    CommandPiece,
    CommandVariant,
    DynCommand,
    DynEvent,
    DynFilter,
    DynFinalizer,
    DynGuard,
    DynTask,
    Emitter,
    // Pieces
    EnabledHandle,
    // Events
    Event,
    EventKind,
    EventOptions,
    EventPiece,
    EventVariant,
    // Filters
    Filter,
    FilterOptions,
    FilterPiece,
    FilterVariant,
    // Finalizers
    Finalizer,
    FinalizerPiece,
    FinalizerVariant,
    // Guards
    Guard,
    GuardOptions,
    GuardPiece,
    GuardResult,
    GuardVariant,
    GuardVerdict,
    IgnoreFlags,
    InitContext,
    IntoResponse,
    Invocation,
    Message,
    MessageKind,
    Piece,
    PieceError,
    PieceInfo,
    PieceKind,
    PieceworkError,
    Prefix,
    // Responses
    Response,
    RuntimeEvent,
    Settings,
    SharedError,
    StaticSettings,
    Stopwatch,
    StoreError,
    Subcommands,
    // Tasks
    Task,
    TaskPiece,
    TaskVariant,
    Variant,
    contain_panic,
    panic_message,
};

// Stores
pub use piecework_std::{
    store::{FnSource, LoadFailure, LoadReport, PieceSource, Store, StoreHandle},
    stores::{
        CommandStore, EventStore, FilterFault, FilterReport, FilterStore, FinalizerFault,
        FinalizerStore, GuardFault, GuardReport, GuardStore, TaskStore,
    },
    testing,
};

#[cfg(feature = "timeout")]
pub use piecework_std::layers::Timeout;

// Macros
#[cfg(feature = "macros")]
pub use piecework_macros::{command, event, guard};

pub mod builtins;
pub mod config;
pub mod console;
pub mod dispatcher;
pub mod parser;
pub mod permissions;
pub mod runtime;

pub use config::{ConfigError, RuntimeConfig};
pub use dispatcher::{CommandHandler, DispatchOutcome};
pub use parser::PrefixParser;
pub use permissions::{OWNER_LEVEL, OwnerSet, PermissionContext, PermissionLevels};
pub use runtime::{BuildError, Plugin, Runtime, RuntimeBuilder, StartupReport};

/// The usual imports for writing pieces and hosting a runtime.
pub mod prelude {
    pub use crate::{
        BoxError, Command, CommandOptions, CommandPiece, Event, EventKind, EventPiece, Filter,
        FilterPiece, Finalizer, FinalizerPiece, Guard, GuardPiece, GuardResult, Message,
        Response, Runtime, RuntimeConfig, RuntimeEvent, Task, TaskPiece,
    };
    pub use std::sync::Arc;
}

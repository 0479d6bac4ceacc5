//! Runtime events and the pieces that listen to them.
//!
//! Every outcome of the dispatch pipeline is reported as a [`RuntimeEvent`].
//! Event names returned by [`EventKind::name`] are the wire contract other
//! subsystems listen on.

use crate::{
    command::CommandPiece,
    error::{BoxError, SharedError},
    message::{Message, Prefix},
    piece::{InitContext, Piece, PieceInfo, PieceKind, Variant},
    response::Response,
    stopwatch::Stopwatch,
};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::{fmt, future::Future, sync::Arc};

/// Event names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    /// A prefixed message named no known command.
    CommandUnknown,
    /// A command was resolved and is about to be guarded.
    CommandRun,
    /// The guard chain blocked a command.
    CommandInhibited,
    /// A command finished successfully.
    CommandSuccess,
    /// A command failed.
    CommandError,
    /// A finalizer failed after a successful command.
    FinalizerError,
    /// A filter failed.
    #[serde(rename = "monitorError")]
    FilterError,
    /// A guard malfunctioned.
    GuardError,
    /// An event listener failed.
    EventError,
    /// A task failed.
    TaskError,
    /// A piece entered a store.
    PieceLoaded,
    /// A piece left a store.
    PieceUnloaded,
    /// A piece was replaced from its source.
    PieceReloaded,
    /// A piece was enabled.
    PieceEnabled,
    /// A piece was disabled.
    PieceDisabled,
    /// A piece source failed to load.
    PieceLoadFailed,
    /// Startup finished.
    Ready,
    /// Informational console line.
    Log,
    /// Warning console line.
    Warn,
    /// Error console line.
    Error,
    /// Something that should never happen.
    Critical,
    /// Chatty console line.
    Verbose,
    /// Debug console line.
    Debug,
}

impl EventKind {
    /// Every event kind.
    pub const ALL: [EventKind; 23] = [
        EventKind::CommandUnknown,
        EventKind::CommandRun,
        EventKind::CommandInhibited,
        EventKind::CommandSuccess,
        EventKind::CommandError,
        EventKind::FinalizerError,
        EventKind::FilterError,
        EventKind::GuardError,
        EventKind::EventError,
        EventKind::TaskError,
        EventKind::PieceLoaded,
        EventKind::PieceUnloaded,
        EventKind::PieceReloaded,
        EventKind::PieceEnabled,
        EventKind::PieceDisabled,
        EventKind::PieceLoadFailed,
        EventKind::Ready,
        EventKind::Log,
        EventKind::Warn,
        EventKind::Error,
        EventKind::Critical,
        EventKind::Verbose,
        EventKind::Debug,
    ];

    /// Wire name of the event.
    pub fn name(self) -> &'static str {
        match self {
            EventKind::CommandUnknown => "commandUnknown",
            EventKind::CommandRun => "commandRun",
            EventKind::CommandInhibited => "commandInhibited",
            EventKind::CommandSuccess => "commandSuccess",
            EventKind::CommandError => "commandError",
            EventKind::FinalizerError => "finalizerError",
            EventKind::FilterError => "monitorError",
            EventKind::GuardError => "guardError",
            EventKind::EventError => "eventError",
            EventKind::TaskError => "taskError",
            EventKind::PieceLoaded => "pieceLoaded",
            EventKind::PieceUnloaded => "pieceUnloaded",
            EventKind::PieceReloaded => "pieceReloaded",
            EventKind::PieceEnabled => "pieceEnabled",
            EventKind::PieceDisabled => "pieceDisabled",
            EventKind::PieceLoadFailed => "pieceLoadFailed",
            EventKind::Ready => "ready",
            EventKind::Log => "log",
            EventKind::Warn => "warn",
            EventKind::Error => "error",
            EventKind::Critical => "critical",
            EventKind::Verbose => "verbose",
            EventKind::Debug => "debug",
        }
    }

    /// Look an event up by wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An emitted event with its payload.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// `commandUnknown(message, commandText, prefix, prefixLength)`
    CommandUnknown {
        /// Triggering message.
        message: Arc<Message>,
        /// The unmatched command text.
        command_text: String,
        /// The matched prefix.
        prefix: Prefix,
        /// Byte length of the prefix.
        prefix_length: usize,
    },
    /// `commandRun(message, command, args)`
    CommandRun {
        /// Triggering message.
        message: Arc<Message>,
        /// Resolved command.
        command: Arc<CommandPiece>,
        /// Arguments as parsed.
        args: Vec<String>,
    },
    /// `commandInhibited(message, command, reasons)`; `None` for silent blocks.
    CommandInhibited {
        /// Triggering message.
        message: Arc<Message>,
        /// Blocked command.
        command: Arc<CommandPiece>,
        /// Reasons, when the block was explained.
        reasons: Option<Vec<String>>,
    },
    /// `commandSuccess(message, command, params, response)`
    CommandSuccess {
        /// Triggering message.
        message: Arc<Message>,
        /// Command that ran.
        command: Arc<CommandPiece>,
        /// Parameters the handler received.
        params: Vec<String>,
        /// What the handler produced.
        response: Response,
    },
    /// `commandError(message, command, params, error)`
    CommandError {
        /// Triggering message.
        message: Arc<Message>,
        /// Command that failed.
        command: Arc<CommandPiece>,
        /// Parameters the handler received.
        params: Vec<String>,
        /// The failure.
        error: SharedError,
    },
    /// `finalizerError(message, command, response, timer, finalizer, error)`
    FinalizerError {
        /// Triggering message.
        message: Arc<Message>,
        /// Command that ran.
        command: Arc<CommandPiece>,
        /// The command's response.
        response: Response,
        /// Hand-off timer of the command.
        timer: Stopwatch,
        /// Failing finalizer.
        finalizer: PieceInfo,
        /// The failure.
        error: SharedError,
    },
    /// `monitorError(message, filter, error)`
    FilterError {
        /// Triggering message.
        message: Arc<Message>,
        /// Failing filter.
        filter: PieceInfo,
        /// The failure.
        error: SharedError,
    },
    /// `guardError(message, command, guard, error)`
    GuardError {
        /// Triggering message.
        message: Arc<Message>,
        /// Command being guarded.
        command: Arc<CommandPiece>,
        /// Malfunctioning guard.
        guard: PieceInfo,
        /// The failure.
        error: SharedError,
    },
    /// `eventError(event, kind, error)`
    EventError {
        /// Failing listener.
        event: PieceInfo,
        /// Event it was handling.
        kind: EventKind,
        /// The failure.
        error: SharedError,
    },
    /// `taskError(task, error)`
    TaskError {
        /// Failing task.
        task: PieceInfo,
        /// The failure.
        error: SharedError,
    },
    /// `pieceLoaded(piece)`
    PieceLoaded(PieceInfo),
    /// `pieceUnloaded(piece)`
    PieceUnloaded(PieceInfo),
    /// `pieceReloaded(piece)`
    PieceReloaded(PieceInfo),
    /// `pieceEnabled(piece)`
    PieceEnabled(PieceInfo),
    /// `pieceDisabled(piece)`
    PieceDisabled(PieceInfo),
    /// `pieceLoadFailed(store, origin, error)`
    PieceLoadFailed {
        /// Store the source belongs to.
        store: &'static str,
        /// Description of the source.
        origin: String,
        /// The failure.
        error: SharedError,
    },
    /// `ready`
    Ready,
    /// `log(line)`
    Log(String),
    /// `warn(line)`
    Warn(String),
    /// `error(line)`
    Error(String),
    /// `critical(line)`
    Critical(String),
    /// `verbose(line)`
    Verbose(String),
    /// `debug(line)`
    Debug(String),
}

impl RuntimeEvent {
    /// The event's name.
    pub fn kind(&self) -> EventKind {
        match self {
            RuntimeEvent::CommandUnknown { .. } => EventKind::CommandUnknown,
            RuntimeEvent::CommandRun { .. } => EventKind::CommandRun,
            RuntimeEvent::CommandInhibited { .. } => EventKind::CommandInhibited,
            RuntimeEvent::CommandSuccess { .. } => EventKind::CommandSuccess,
            RuntimeEvent::CommandError { .. } => EventKind::CommandError,
            RuntimeEvent::FinalizerError { .. } => EventKind::FinalizerError,
            RuntimeEvent::FilterError { .. } => EventKind::FilterError,
            RuntimeEvent::GuardError { .. } => EventKind::GuardError,
            RuntimeEvent::EventError { .. } => EventKind::EventError,
            RuntimeEvent::TaskError { .. } => EventKind::TaskError,
            RuntimeEvent::PieceLoaded(_) => EventKind::PieceLoaded,
            RuntimeEvent::PieceUnloaded(_) => EventKind::PieceUnloaded,
            RuntimeEvent::PieceReloaded(_) => EventKind::PieceReloaded,
            RuntimeEvent::PieceEnabled(_) => EventKind::PieceEnabled,
            RuntimeEvent::PieceDisabled(_) => EventKind::PieceDisabled,
            RuntimeEvent::PieceLoadFailed { .. } => EventKind::PieceLoadFailed,
            RuntimeEvent::Ready => EventKind::Ready,
            RuntimeEvent::Log(_) => EventKind::Log,
            RuntimeEvent::Warn(_) => EventKind::Warn,
            RuntimeEvent::Error(_) => EventKind::Error,
            RuntimeEvent::Critical(_) => EventKind::Critical,
            RuntimeEvent::Verbose(_) => EventKind::Verbose,
            RuntimeEvent::Debug(_) => EventKind::Debug,
        }
    }

    /// The message that triggered the event, if any.
    pub fn message(&self) -> Option<&Arc<Message>> {
        match self {
            RuntimeEvent::CommandUnknown { message, .. }
            | RuntimeEvent::CommandRun { message, .. }
            | RuntimeEvent::CommandInhibited { message, .. }
            | RuntimeEvent::CommandSuccess { message, .. }
            | RuntimeEvent::CommandError { message, .. }
            | RuntimeEvent::FinalizerError { message, .. }
            | RuntimeEvent::FilterError { message, .. }
            | RuntimeEvent::GuardError { message, .. } => Some(message),
            _ => None,
        }
    }
}

/// Anything events can be sent to.
pub trait Emitter: Send + Sync + 'static {
    /// Deliver an event to every interested listener.
    fn emit(&self, event: RuntimeEvent) -> BoxFuture<'_, ()>;
}

/// Options shared by every event listener.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventOptions {
    /// Event to listen to; defaults to the event named like the piece.
    pub event: Option<EventKind>,
    /// Fire at most once, then disable.
    pub once: bool,
}

/// Marker for event pieces.
pub struct EventVariant;

/// A registered event listener.
pub type EventPiece = Piece<EventVariant>;

impl Variant for EventVariant {
    const KIND: PieceKind = PieceKind::Event;
    type Options = EventOptions;
    type Behavior = dyn DynEvent;

    fn init(piece: &Piece<Self>) -> Result<(), BoxError> {
        if piece.listens_to().is_none() {
            return Err(format!("event piece `{}` does not name an event", piece.name()).into());
        }
        piece.behavior().init_dyn(&InitContext::of(piece))
    }
}

impl Piece<EventVariant> {
    /// Create an event piece listening to the event named like the piece.
    pub fn new<E: Event>(name: impl Into<String>, event: E) -> Self {
        Self::from_arc(name, Arc::new(event))
    }

    /// Create an event piece listening to `kind`.
    pub fn on<E: Event>(name: impl Into<String>, kind: EventKind, event: E) -> Self {
        Self::new(name, event).with_options(EventOptions {
            event: Some(kind),
            once: false,
        })
    }

    /// Fire at most once.
    pub fn once(self) -> Self {
        let options = EventOptions {
            once: true,
            ..self.options().clone()
        };
        self.with_options(options)
    }

    /// The event this piece listens to.
    pub fn listens_to(&self) -> Option<EventKind> {
        self.options()
            .event
            .or_else(|| EventKind::from_name(self.name()))
    }
}

/// An event listener.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not an `Event`",
    label = "missing `Event` implementation",
    note = "Event listeners must implement `run(event)`."
)]
pub trait Event: Send + Sync + 'static {
    /// Handle one event.
    fn run(&self, event: RuntimeEvent) -> impl Future<Output = Result<(), BoxError>> + Send;

    /// Called when the piece enters a store.
    fn init(&self, _ctx: &InitContext<'_>) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Dynamic object-safe version of [`Event`].
pub trait DynEvent: Send + Sync + 'static {
    /// Handle one event (dynamic dispatch version).
    fn run_dyn(&self, event: RuntimeEvent) -> BoxFuture<'_, Result<(), BoxError>>;

    /// Run the init hook (dynamic dispatch version).
    fn init_dyn(&self, ctx: &InitContext<'_>) -> Result<(), BoxError>;
}

impl<T: Event> DynEvent for T {
    fn run_dyn(&self, event: RuntimeEvent) -> BoxFuture<'_, Result<(), BoxError>> {
        Box::pin(self.run(event))
    }

    fn init_dyn(&self, ctx: &InitContext<'_>) -> Result<(), BoxError> {
        self.init(ctx)
    }
}

impl<F, Fut> Event for F
where
    F: Fn(RuntimeEvent) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send,
{
    fn run(&self, event: RuntimeEvent) -> impl Future<Output = Result<(), BoxError>> + Send {
        (self)(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> impl Event {
        |_event: RuntimeEvent| async { Ok::<(), BoxError>(()) }
    }

    #[test]
    fn test_wire_names_round_trip() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(EventKind::FilterError.name(), "monitorError");
        assert_eq!(EventKind::from_name("nope"), None);
    }

    #[test]
    fn test_listener_defaults_to_piece_name() {
        let piece = EventPiece::new("commandError", noop());
        assert_eq!(piece.listens_to(), Some(EventKind::CommandError));
        assert!(EventVariant::init(&piece).is_ok());
    }

    #[test]
    fn test_unnamed_listener_fails_init() {
        let piece = EventPiece::new("replyOnInhibit", noop());
        assert!(EventVariant::init(&piece).is_err());

        let piece = EventPiece::on("replyOnInhibit", EventKind::CommandInhibited, noop()).once();
        assert!(EventVariant::init(&piece).is_ok());
        assert!(piece.options().once);
    }
}

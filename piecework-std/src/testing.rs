//! Testing utilities for Piecework.
//!
//! This module provides doubles that make it easy to exercise stores and
//! dispatch without a real transport.
//!
//! # Features
//!
//! - [`MockChannel`]: A channel that records everything posted to it
//! - [`RecordingEmitter`] / [`RecordingEvent`]: Capture emitted events
//! - [`StaticGuard`]: A guard with a fixed answer
//! - [`EchoCommand`] / [`FailingCommand`]: Predictable command bodies
//! - [`message`] / [`invoked`]: Message builders

use async_trait::async_trait;
use futures::future::BoxFuture;
use piecework_core::{
    Author, BoxError, Channel, Command, CommandPiece, Emitter, Event, EventKind, Guard,
    GuardResult, Invocation, Message, Prefix, Response, RuntimeEvent, StaticSettings,
};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

// ============================================================================
// Mock Channel
// ============================================================================

/// A channel that records what is posted to it.
///
/// # Example
///
/// ```rust,ignore
/// let channel = MockChannel::new();
/// let msg = message_in(channel.clone(), "!ping");
///
/// runtime.handle_message(msg).await;
///
/// assert_eq!(channel.sent(), ["pong"]);
/// ```
#[derive(Clone)]
pub struct MockChannel {
    sent: Arc<Mutex<Vec<String>>>,
    postable: Arc<AtomicBool>,
}

impl MockChannel {
    /// Create a postable channel.
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            postable: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Create a channel the runtime may not post in.
    pub fn unpostable() -> Self {
        let channel = Self::new();
        channel.postable.store(false, Ordering::SeqCst);
        channel
    }

    /// Everything posted so far.
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

impl Default for MockChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Channel for MockChannel {
    fn postable(&self) -> bool {
        self.postable.load(Ordering::SeqCst)
    }

    async fn send(&self, content: String) -> Result<(), BoxError> {
        self.sent.lock().unwrap().push(content);
        Ok(())
    }
}

// ============================================================================
// Recording Emitter
// ============================================================================

/// An emitter that records every event instead of dispatching it.
#[derive(Clone, Default)]
pub struct RecordingEmitter {
    events: Arc<Mutex<Vec<RuntimeEvent>>>,
}

impl RecordingEmitter {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a clone of the recorded events.
    pub fn events(&self) -> Vec<RuntimeEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Names of the recorded events, in emission order.
    pub fn kinds(&self) -> Vec<EventKind> {
        self.events.lock().unwrap().iter().map(RuntimeEvent::kind).collect()
    }

    /// Clear all recorded events.
    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl Emitter for RecordingEmitter {
    fn emit(&self, event: RuntimeEvent) -> BoxFuture<'_, ()> {
        self.events.lock().unwrap().push(event);
        Box::pin(async {})
    }
}

// ============================================================================
// Recording Event
// ============================================================================

/// An event listener that records what it receives.
#[derive(Clone, Default)]
pub struct RecordingEvent {
    events: Arc<Mutex<Vec<RuntimeEvent>>>,
}

impl RecordingEvent {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a clone of the received events.
    pub fn events(&self) -> Vec<RuntimeEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Names of the received events.
    pub fn kinds(&self) -> Vec<EventKind> {
        self.events.lock().unwrap().iter().map(RuntimeEvent::kind).collect()
    }
}

impl Event for RecordingEvent {
    async fn run(&self, event: RuntimeEvent) -> Result<(), BoxError> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

// ============================================================================
// Static Guard
// ============================================================================

/// A guard that always answers the same way and counts its calls.
pub struct StaticGuard {
    outcome: Result<GuardResult, String>,
    calls: Arc<AtomicUsize>,
}

impl StaticGuard {
    fn with(outcome: Result<GuardResult, String>) -> Self {
        Self {
            outcome,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Always pass.
    pub fn pass() -> Self {
        Self::with(Ok(GuardResult::Pass))
    }

    /// Always block silently.
    pub fn silent() -> Self {
        Self::with(Ok(GuardResult::Silent))
    }

    /// Always block with `reason`.
    pub fn reason(reason: impl Into<String>) -> Self {
        Self::with(Ok(GuardResult::Reason(reason.into())))
    }

    /// Always fail with `error`.
    pub fn failing(error: impl Into<String>) -> Self {
        Self::with(Err(error.into()))
    }

    /// Shared call counter.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

impl Guard for StaticGuard {
    async fn run(
        &self,
        _message: Arc<Message>,
        _command: Arc<CommandPiece>,
    ) -> Result<GuardResult, BoxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone().map_err(BoxError::from)
    }
}

// ============================================================================
// Commands
// ============================================================================

/// A command that replies with its parameters joined by spaces.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoCommand;

impl Command for EchoCommand {
    async fn run(&self, _message: Arc<Message>, params: Vec<String>) -> Result<Response, BoxError> {
        Ok(Response::Text(params.join(" ")))
    }
}

/// A command that always fails with the given message.
#[derive(Debug, Clone)]
pub struct FailingCommand(pub String);

impl FailingCommand {
    /// Create a failing command.
    pub fn new(error: impl Into<String>) -> Self {
        Self(error.into())
    }
}

impl Command for FailingCommand {
    async fn run(&self, _message: Arc<Message>, _params: Vec<String>) -> Result<Response, BoxError> {
        Err(self.0.clone().into())
    }
}

// ============================================================================
// Messages
// ============================================================================

/// The author used by [`message`].
pub fn test_author() -> Author {
    Author::new("100", "tester")
}

/// A guild-less message from [`test_author`] posted to `channel`, with the
/// `!` prefix configured.
pub fn message_in(channel: MockChannel, content: &str) -> Message {
    Message::new(
        content,
        test_author(),
        Arc::new(channel),
        Arc::new(StaticSettings::with_prefix("!")),
    )
}

/// A guild-less message posted to a fresh [`MockChannel`].
pub fn message(content: &str) -> Arc<Message> {
    Arc::new(message_in(MockChannel::new(), content))
}

/// A message already parsed as `!<command_text> <args>`.
pub fn invoked(command_text: &str, args: &[&str]) -> Arc<Message> {
    let content = std::iter::once(format!("!{command_text}"))
        .chain(args.iter().map(|arg| arg.to_string()))
        .collect::<Vec<_>>()
        .join(" ");
    let invocation = Invocation::new(
        Prefix::Text("!".into()),
        command_text,
        args.iter().map(|arg| arg.to_string()).collect(),
    );
    Arc::new(message_in(MockChannel::new(), &content).with_invocation(invocation))
}

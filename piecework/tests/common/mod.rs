#![allow(dead_code)]

use piecework::{
    Author, BoxError, EventKind, EventPiece, Message, Response, Runtime, RuntimeBuilder,
    RuntimeConfig, RuntimeEvent,
    config::PrefixSetting,
    testing::{MockChannel, RecordingEvent},
};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

// ============================================================================
// Runtime
// ============================================================================

pub const OWNER: &str = "1";
pub const USER: &str = "100";
pub const MENTION: &str = "<@42>";

/// `!` prefix, one owner, a mention prefix.
pub fn config() -> RuntimeConfig {
    RuntimeConfig {
        prefix: PrefixSetting::from("!"),
        mention_prefix: Some(MENTION.to_string()),
        owners: vec![OWNER.to_string()],
        ..RuntimeConfig::default()
    }
}

/// Build and start a runtime, letting `setup` register pieces first.
pub async fn started<F>(setup: F) -> Arc<Runtime>
where
    F: Fn(&Runtime) -> Result<(), BoxError> + Send + Sync + 'static,
{
    let runtime = RuntimeBuilder::new(config())
        .plugin(setup)
        .build()
        .unwrap();
    runtime.start().await;
    runtime
}

/// Record every event of the given kinds.
pub fn record(runtime: &Runtime, kinds: &[EventKind]) -> RecordingEvent {
    let recorder = RecordingEvent::new();
    for kind in kinds {
        runtime
            .events()
            .register(EventPiece::on(
                format!("record:{}", kind.name()),
                *kind,
                recorder.clone(),
            ))
            .unwrap();
    }
    recorder
}

// ============================================================================
// Messages
// ============================================================================

pub fn user() -> Author {
    Author::new(USER, "user")
}

pub fn owner() -> Author {
    Author::new(OWNER, "owner")
}

/// A direct message from `author`.
pub fn message_from(runtime: &Runtime, author: Author, content: &str) -> (Message, MockChannel) {
    let channel = MockChannel::new();
    let message = runtime.message(content, author, Arc::new(channel.clone()));
    (message, channel)
}

/// Send `content` as a direct message from a regular user and return the
/// channel it was posted in.
pub async fn send(runtime: &Runtime, content: &str) -> MockChannel {
    let (message, channel) = message_from(runtime, user(), content);
    runtime.handle_message(message).await;
    channel
}

// ============================================================================
// Commands
// ============================================================================

/// A command that counts its runs and replies with its parameters.
#[derive(Clone, Default)]
pub struct CountingCommand {
    pub runs: Arc<AtomicUsize>,
    pub params: Arc<Mutex<Vec<Vec<String>>>>,
}

impl CountingCommand {
    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

impl piecework::Command for CountingCommand {
    async fn run(&self, message: Arc<Message>, params: Vec<String>) -> Result<Response, BoxError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        self.params.lock().unwrap().push(params.clone());
        message.send(params.join(" ")).await?;
        Ok(Response::Text(params.join(" ")))
    }
}

// ============================================================================
// Events
// ============================================================================

pub fn command_error_text(event: &RuntimeEvent) -> Option<String> {
    match event {
        RuntimeEvent::CommandError { error, .. } => Some(error.to_string()),
        _ => None,
    }
}

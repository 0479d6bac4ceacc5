//! Built-in event listeners.

use piecework_core::{BoxError, Event, EventKind, InitContext, RuntimeEvent};
use tracing::{debug, error, info, trace, warn};

/// Tells the user why a command was blocked.
#[derive(Debug, Clone, Copy, Default)]
pub struct InhibitedReply;

impl Event for InhibitedReply {
    async fn run(&self, event: RuntimeEvent) -> Result<(), BoxError> {
        let RuntimeEvent::CommandInhibited {
            message,
            reasons: Some(reasons),
            ..
        } = event
        else {
            return Ok(());
        };
        let text = reasons
            .iter()
            .filter(|reason| !reason.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n");
        if text.is_empty() || !message.postable() {
            return Ok(());
        }
        message.send(text).await
    }
}

/// Logs command failures.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandErrorLog;

impl Event for CommandErrorLog {
    async fn run(&self, event: RuntimeEvent) -> Result<(), BoxError> {
        if let RuntimeEvent::CommandError {
            message,
            command,
            error,
            ..
        } = event
        {
            error!(
                command = command.name(),
                author = %message.author.id,
                error = %error,
                "command failed"
            );
        }
        Ok(())
    }
}

/// Forwards one console event to `tracing`.
///
/// Disables itself on init when its switch is off.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleEvent {
    kind: EventKind,
    enabled: bool,
}

impl ConsoleEvent {
    /// Console kinds, in severity order.
    pub const KINDS: [EventKind; 6] = [
        EventKind::Critical,
        EventKind::Error,
        EventKind::Warn,
        EventKind::Log,
        EventKind::Verbose,
        EventKind::Debug,
    ];

    /// Forwarder for `kind`.
    pub fn new(kind: EventKind, enabled: bool) -> Self {
        Self { kind, enabled }
    }

    /// The event this forwarder handles.
    pub fn kind(&self) -> EventKind {
        self.kind
    }
}

impl Event for ConsoleEvent {
    async fn run(&self, event: RuntimeEvent) -> Result<(), BoxError> {
        match event {
            RuntimeEvent::Critical(line) => error!(critical = true, "{line}"),
            RuntimeEvent::Error(line) => error!("{line}"),
            RuntimeEvent::Warn(line) => warn!("{line}"),
            RuntimeEvent::Log(line) => info!("{line}"),
            RuntimeEvent::Verbose(line) => debug!("{line}"),
            RuntimeEvent::Debug(line) => trace!("{line}"),
            _ => {}
        }
        Ok(())
    }

    fn init(&self, ctx: &InitContext<'_>) -> Result<(), BoxError> {
        if !self.enabled {
            ctx.disable();
        }
        Ok(())
    }
}

//! The command handler: the filter that turns messages into command runs.
//!
//! One dispatch walks a fixed sequence of stages:
//!
//! 1. Skip channels the runtime cannot post in.
//! 2. Take the parsed [`Invocation`]. A bare mention prefix gets a prefix
//!    reminder; anything else without command text is ignored.
//! 3. Resolve the command, emitting `commandUnknown` when nothing matches.
//! 4. Emit `commandRun` and evaluate the guard chain. A block emits
//!    `commandInhibited` and ends the dispatch.
//! 5. Pick the handler (the first parameter selects a subcommand when the
//!    command declares subcommands), start it and stop the timer as soon as
//!    its future exists.
//! 6. On success run the finalizers, then emit `commandSuccess`. On failure
//!    emit `commandError`.
//!
//! Guard, handler and finalizer failures never leave this module as errors;
//! they become events. The only error [`CommandHandler::handle`] returns is
//! a failed prefix reminder reply.

use crate::parser::PrefixParser;
use piecework_core::{
    BoxError, CommandPiece, Emitter, Filter, Invocation, Message, PieceError, Response,
    RuntimeEvent, SharedError, Stopwatch, contain_panic, panic_message,
};
use piecework_std::stores::{CommandStore, FinalizerStore, GuardStore};
use std::{
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};
use tracing::{debug, info, trace};

/// How a single dispatch ended.
#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    /// Nothing to do: unpostable channel or no command text.
    Ignored,
    /// A bare mention was answered with the prefix reminder.
    Reminded,
    /// The command text matched no command.
    Unknown,
    /// The guard chain blocked the command; `None` for silent blocks.
    Inhibited(Option<Vec<String>>),
    /// The handler succeeded.
    Success(Response),
    /// The handler failed.
    Error(SharedError),
}

/// The dispatcher, registered as the `commandHandler` filter.
pub struct CommandHandler {
    commands: Arc<CommandStore>,
    guards: Arc<GuardStore>,
    finalizers: Arc<FinalizerStore>,
    events: Arc<dyn Emitter>,
    parser: Arc<PrefixParser>,
    command_logging: bool,
}

impl CommandHandler {
    /// Create a handler over the given stores.
    pub fn new(
        commands: Arc<CommandStore>,
        guards: Arc<GuardStore>,
        finalizers: Arc<FinalizerStore>,
        events: Arc<dyn Emitter>,
        parser: Arc<PrefixParser>,
    ) -> Self {
        Self {
            commands,
            guards,
            finalizers,
            events,
            parser,
            command_logging: false,
        }
    }

    /// Log every command run at info level.
    pub fn command_logging(mut self, enabled: bool) -> Self {
        self.command_logging = enabled;
        self
    }

    /// Dispatch one message.
    pub async fn handle(&self, message: Arc<Message>) -> Result<DispatchOutcome, BoxError> {
        if !message.postable() {
            trace!("channel not postable, skipping");
            return Ok(DispatchOutcome::Ignored);
        }

        let Some(invocation) = message
            .invocation
            .clone()
            .or_else(|| self.parser.parse(&message))
        else {
            return Ok(DispatchOutcome::Ignored);
        };

        if invocation.command_text.is_empty() {
            if !invocation.prefix.is_mention() {
                return Ok(DispatchOutcome::Ignored);
            }
            let prefixes = self.parser.prefixes_for(&message);
            message.send(self.parser.reminder(&prefixes)).await?;
            return Ok(DispatchOutcome::Reminded);
        }

        let Invocation {
            prefix,
            prefix_length,
            command_text,
            args,
        } = invocation;

        let Some(command) = self.commands.resolve(&command_text) else {
            debug!(command = %command_text, "unknown command");
            self.events
                .emit(RuntimeEvent::CommandUnknown {
                    message,
                    command_text,
                    prefix,
                    prefix_length,
                })
                .await;
            return Ok(DispatchOutcome::Unknown);
        };

        self.events
            .emit(RuntimeEvent::CommandRun {
                message: message.clone(),
                command: command.clone(),
                args: args.clone(),
            })
            .await;

        Ok(self.run_command(message, command, args).await)
    }

    async fn run_command(
        &self,
        message: Arc<Message>,
        command: Arc<CommandPiece>,
        mut params: Vec<String>,
    ) -> DispatchOutcome {
        let mut timer = Stopwatch::start();

        let report = self.guards.run(&message, &command, false).await;
        for fault in report.faults {
            self.events
                .emit(RuntimeEvent::GuardError {
                    message: message.clone(),
                    command: command.clone(),
                    guard: fault.guard,
                    error: fault.error,
                })
                .await;
        }
        if report.verdict.is_blocked() {
            let reasons = report.verdict.reasons().map(<[String]>::to_vec);
            self.events
                .emit(RuntimeEvent::CommandInhibited {
                    message,
                    command,
                    reasons: reasons.clone(),
                })
                .await;
            return DispatchOutcome::Inhibited(reasons);
        }

        let subcommand =
            (command.options().subcommands && !params.is_empty()).then(|| params.remove(0));

        // The timer measures hand-off: it stops once the handler's future exists.
        let runner = command.clone();
        let pending = panic::catch_unwind(AssertUnwindSafe(|| {
            let behavior = runner.behavior();
            match subcommand.as_deref() {
                Some(name) => behavior.run_subcommand_dyn(name, message.clone(), params.clone()),
                None => behavior.run_dyn(message.clone(), params.clone()),
            }
        }));
        timer.stop();

        let result = match pending {
            Ok(future) => contain_panic(future).await,
            Err(payload) => Err(Box::new(PieceError::Panic(panic_message(payload.as_ref()))) as BoxError),
        };

        if self.command_logging {
            info!(
                command = command.name(),
                subcommand = subcommand.as_deref(),
                author = %message.author.id,
                guild = message.guild_id.as_deref(),
                elapsed = %timer,
                ok = result.is_ok(),
                "command executed"
            );
        }

        match result {
            Ok(response) => {
                let faults = self
                    .finalizers
                    .run(&message, &command, &response, timer)
                    .await;
                for fault in faults {
                    self.events
                        .emit(RuntimeEvent::FinalizerError {
                            message: message.clone(),
                            command: command.clone(),
                            response: response.clone(),
                            timer,
                            finalizer: fault.finalizer,
                            error: fault.error,
                        })
                        .await;
                }
                self.events
                    .emit(RuntimeEvent::CommandSuccess {
                        message,
                        command,
                        params,
                        response: response.clone(),
                    })
                    .await;
                DispatchOutcome::Success(response)
            }
            Err(err) => {
                let error: SharedError = Arc::from(err);
                self.events
                    .emit(RuntimeEvent::CommandError {
                        message,
                        command,
                        params,
                        error: error.clone(),
                    })
                    .await;
                DispatchOutcome::Error(error)
            }
        }
    }
}

impl Filter for CommandHandler {
    async fn run(&self, message: Arc<Message>) -> Result<(), BoxError> {
        self.handle(message).await.map(|_| ())
    }
}

//! Commands: the pieces users invoke by name.

use crate::{
    error::{BoxError, PieceError},
    message::Message,
    piece::{InitContext, Piece, PieceKind, Variant},
    response::{IntoResponse, Response},
};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, future::Future, sync::Arc};

/// Where a command may be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelScope {
    /// Channels that belong to a guild.
    Guild,
    /// Direct messages.
    Direct,
}

impl ChannelScope {
    /// Scope of the channel a message was sent in.
    pub fn of(message: &Message) -> Self {
        if message.guild_id.is_some() {
            ChannelScope::Guild
        } else {
            ChannelScope::Direct
        }
    }
}

/// Options shared by every command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandOptions {
    /// Alternative names.
    pub aliases: Vec<String>,
    /// One-line description.
    pub description: String,
    /// Usage string shown in help output.
    pub usage: String,
    /// Whether the first parameter selects a subcommand.
    pub subcommands: bool,
    /// Minimum permission level required.
    pub permission_level: u8,
    /// Cooldown window in milliseconds, `0` for none.
    pub cooldown_ms: u64,
    /// Uses allowed per cooldown window.
    pub bucket: u32,
    /// Channel scopes the command may run in.
    pub run_in: Vec<ChannelScope>,
}

impl Default for CommandOptions {
    fn default() -> Self {
        Self {
            aliases: Vec::new(),
            description: String::new(),
            usage: String::new(),
            subcommands: false,
            permission_level: 0,
            cooldown_ms: 0,
            bucket: 1,
            run_in: vec![ChannelScope::Guild, ChannelScope::Direct],
        }
    }
}

/// Marker for command pieces.
pub struct CommandVariant;

/// A registered command.
pub type CommandPiece = Piece<CommandVariant>;

impl Variant for CommandVariant {
    const KIND: PieceKind = PieceKind::Command;
    type Options = CommandOptions;
    type Behavior = dyn DynCommand;

    fn init(piece: &Piece<Self>) -> Result<(), BoxError> {
        piece.behavior().init_dyn(&InitContext::of(piece))
    }
}

impl Piece<CommandVariant> {
    /// Create a command piece. The name is lowercased.
    pub fn new<C: Command>(name: impl Into<String>, command: C) -> Self {
        Self::from_arc(name.into().to_lowercase(), Arc::new(command))
    }

    /// Whether `name` is this command's name or one of its aliases.
    pub fn answers_to(&self, name: &str) -> bool {
        self.name() == name
            || self
                .options()
                .aliases
                .iter()
                .any(|alias| alias.eq_ignore_ascii_case(name))
    }
}

/// A command handler.
///
/// Closures of the shape `Fn(Arc<Message>, Vec<String>) -> impl Future<Output =
/// Result<T, BoxError>>` with `T: IntoResponse` implement this trait.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a `Command`",
    label = "missing `Command` implementation",
    note = "Commands must implement `run(message, params)`."
)]
pub trait Command: Send + Sync + 'static {
    /// Run the command with the parsed parameters.
    fn run(
        &self,
        message: Arc<Message>,
        params: Vec<String>,
    ) -> impl Future<Output = Result<Response, BoxError>> + Send;

    /// Run a named subcommand. Only called for commands whose options enable
    /// subcommands; the subcommand name has already been removed from `params`.
    fn run_subcommand(
        &self,
        name: &str,
        message: Arc<Message>,
        params: Vec<String>,
    ) -> impl Future<Output = Result<Response, BoxError>> + Send {
        let _ = (message, params);
        let error = PieceError::UnknownSubcommand(name.to_string());
        async move { Err::<Response, BoxError>(error.into()) }
    }

    /// Called when the piece enters a store.
    fn init(&self, _ctx: &InitContext<'_>) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Dynamic object-safe version of [`Command`].
pub trait DynCommand: Send + Sync + 'static {
    /// Run the command (dynamic dispatch version).
    fn run_dyn(
        &self,
        message: Arc<Message>,
        params: Vec<String>,
    ) -> BoxFuture<'_, Result<Response, BoxError>>;

    /// Run a subcommand (dynamic dispatch version).
    fn run_subcommand_dyn<'a>(
        &'a self,
        name: &'a str,
        message: Arc<Message>,
        params: Vec<String>,
    ) -> BoxFuture<'a, Result<Response, BoxError>>;

    /// Run the init hook (dynamic dispatch version).
    fn init_dyn(&self, ctx: &InitContext<'_>) -> Result<(), BoxError>;
}

impl<T: Command> DynCommand for T {
    fn run_dyn(
        &self,
        message: Arc<Message>,
        params: Vec<String>,
    ) -> BoxFuture<'_, Result<Response, BoxError>> {
        Box::pin(self.run(message, params))
    }

    fn run_subcommand_dyn<'a>(
        &'a self,
        name: &'a str,
        message: Arc<Message>,
        params: Vec<String>,
    ) -> BoxFuture<'a, Result<Response, BoxError>> {
        Box::pin(self.run_subcommand(name, message, params))
    }

    fn init_dyn(&self, ctx: &InitContext<'_>) -> Result<(), BoxError> {
        self.init(ctx)
    }
}

impl<F, Fut, R> Command for F
where
    F: Fn(Arc<Message>, Vec<String>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, BoxError>> + Send,
    R: IntoResponse,
{
    fn run(
        &self,
        message: Arc<Message>,
        params: Vec<String>,
    ) -> impl Future<Output = Result<Response, BoxError>> + Send {
        let pending = (self)(message, params);
        async move { pending.await.map(IntoResponse::into_response) }
    }
}

/// A command made of named sub-handlers.
///
/// Register it with [`CommandOptions::subcommands`] set so the first
/// parameter selects the handler.
#[derive(Default)]
pub struct Subcommands {
    handlers: HashMap<String, Arc<dyn DynCommand>>,
    fallback: Option<Arc<dyn DynCommand>>,
}

impl Subcommands {
    /// Create an empty set of subcommands.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named sub-handler. Names are matched case-insensitively.
    pub fn with<C: Command>(mut self, name: impl Into<String>, handler: C) -> Self {
        self.handlers
            .insert(name.into().to_lowercase(), Arc::new(handler));
        self
    }

    /// Handler used when the command is run without a subcommand.
    pub fn fallback<C: Command>(mut self, handler: C) -> Self {
        self.fallback = Some(Arc::new(handler));
        self
    }

    /// Registered subcommand names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }
}

impl Command for Subcommands {
    async fn run(&self, message: Arc<Message>, params: Vec<String>) -> Result<Response, BoxError> {
        match &self.fallback {
            Some(handler) => handler.run_dyn(message, params).await,
            None => Err(PieceError::MissingSubcommand.into()),
        }
    }

    async fn run_subcommand(
        &self,
        name: &str,
        message: Arc<Message>,
        params: Vec<String>,
    ) -> Result<Response, BoxError> {
        match self.handlers.get(&name.to_lowercase()) {
            Some(handler) => handler.run_dyn(message, params).await,
            None => Err(PieceError::UnknownSubcommand(name.to_string()).into()),
        }
    }
}

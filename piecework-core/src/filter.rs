//! Filters: handlers that see every inbound message.

use crate::{
    error::BoxError,
    message::{Message, MessageKind},
    piece::{InitContext, Piece, PieceKind, Variant},
};
use bitflags::bitflags;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::{future::Future, sync::Arc};

bitflags! {
    /// Classes of messages a filter skips.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct IgnoreFlags: u8 {
        /// Messages written by bots.
        const BOTS = 1;
        /// Messages written by the runtime's own account.
        const SELF = 1 << 1;
        /// Messages written by anyone but the runtime's own account.
        const OTHERS = 1 << 2;
        /// Messages delivered through webhooks.
        const WEBHOOKS = 1 << 3;
        /// Edits of earlier messages.
        const EDITS = 1 << 4;
        /// Messages from blacklisted users.
        const BLACKLISTED_USERS = 1 << 5;
        /// Messages from blacklisted guilds.
        const BLACKLISTED_GUILDS = 1 << 6;
    }
}

/// Options shared by every filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterOptions {
    /// Message classes to skip.
    pub ignore: IgnoreFlags,
    /// Message kinds the filter accepts.
    pub allowed_kinds: Vec<MessageKind>,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            ignore: IgnoreFlags::all(),
            allowed_kinds: vec![MessageKind::Default],
        }
    }
}

impl FilterOptions {
    /// Whether the message passes the ignore flags and kind list.
    pub fn admits(&self, message: &Message) -> bool {
        let skip = |flag: IgnoreFlags, hit: bool| self.ignore.contains(flag) && hit;

        !(skip(IgnoreFlags::BOTS, message.author.bot)
            || skip(IgnoreFlags::SELF, message.self_authored)
            || skip(IgnoreFlags::OTHERS, !message.self_authored)
            || skip(IgnoreFlags::WEBHOOKS, message.webhook)
            || skip(IgnoreFlags::EDITS, message.edited)
            || skip(IgnoreFlags::BLACKLISTED_USERS, message.author_blacklisted())
            || skip(IgnoreFlags::BLACKLISTED_GUILDS, message.guild_blacklisted()))
            && self.allowed_kinds.contains(&message.kind)
    }
}

/// Marker for filter pieces.
pub struct FilterVariant;

/// A registered filter.
pub type FilterPiece = Piece<FilterVariant>;

impl Variant for FilterVariant {
    const KIND: PieceKind = PieceKind::Filter;
    type Options = FilterOptions;
    type Behavior = dyn DynFilter;

    fn init(piece: &Piece<Self>) -> Result<(), BoxError> {
        piece.behavior().init_dyn(&InitContext::of(piece))
    }
}

impl Piece<FilterVariant> {
    /// Create a filter piece.
    pub fn new<F: Filter>(name: impl Into<String>, filter: F) -> Self {
        Self::from_arc(name, Arc::new(filter))
    }

    /// Cheap, side-effect-free check run before the filter body.
    pub fn should_run(&self, message: &Message) -> bool {
        self.is_enabled() && self.options().admits(message) && self.behavior().should_run_dyn(message)
    }
}

/// A filter.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a `Filter`",
    label = "missing `Filter` implementation",
    note = "Filters must implement `run(message)`."
)]
pub trait Filter: Send + Sync + 'static {
    /// Extra synchronous predicate on top of the piece's ignore flags.
    fn should_run(&self, _message: &Message) -> bool {
        true
    }

    /// React to the message.
    fn run(&self, message: Arc<Message>) -> impl Future<Output = Result<(), BoxError>> + Send;

    /// Called when the piece enters a store.
    fn init(&self, _ctx: &InitContext<'_>) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Dynamic object-safe version of [`Filter`].
pub trait DynFilter: Send + Sync + 'static {
    /// Synchronous predicate (dynamic dispatch version).
    fn should_run_dyn(&self, message: &Message) -> bool;

    /// Run the filter (dynamic dispatch version).
    fn run_dyn(&self, message: Arc<Message>) -> BoxFuture<'_, Result<(), BoxError>>;

    /// Run the init hook (dynamic dispatch version).
    fn init_dyn(&self, ctx: &InitContext<'_>) -> Result<(), BoxError>;
}

impl<T: Filter> DynFilter for T {
    fn should_run_dyn(&self, message: &Message) -> bool {
        self.should_run(message)
    }

    fn run_dyn(&self, message: Arc<Message>) -> BoxFuture<'_, Result<(), BoxError>> {
        Box::pin(self.run(message))
    }

    fn init_dyn(&self, ctx: &InitContext<'_>) -> Result<(), BoxError> {
        self.init(ctx)
    }
}

impl<F, Fut> Filter for F
where
    F: Fn(Arc<Message>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send,
{
    fn run(&self, message: Arc<Message>) -> impl Future<Output = Result<(), BoxError>> + Send {
        (self)(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Author, Channel, StaticSettings};
    use async_trait::async_trait;

    struct Nowhere;

    #[async_trait]
    impl Channel for Nowhere {
        async fn send(&self, _content: String) -> Result<(), BoxError> {
            Ok(())
        }
    }

    fn message(author: Author) -> Message {
        let mut settings = StaticSettings::default();
        settings.blacklisted_users.insert("666".into());
        Message::new("hi", author, Arc::new(Nowhere), Arc::new(settings))
    }

    fn everyone() -> FilterOptions {
        FilterOptions {
            ignore: IgnoreFlags::all() - IgnoreFlags::OTHERS,
            ..FilterOptions::default()
        }
    }

    #[test]
    fn test_defaults_ignore_other_users() {
        let options = FilterOptions::default();
        assert!(!options.admits(&message(Author::new("1", "alice"))));
    }

    #[test]
    fn test_ignore_flags() {
        let options = everyone();
        assert!(options.admits(&message(Author::new("1", "alice"))));
        assert!(!options.admits(&message(Author::bot("2", "robot"))));
        assert!(!options.admits(&message(Author::new("666", "spammer"))));

        let mut edited = message(Author::new("1", "alice"));
        edited.edited = true;
        assert!(!options.admits(&edited));
    }

    #[test]
    fn test_allowed_kinds() {
        let options = everyone();
        let system = message(Author::new("1", "alice")).with_kind(MessageKind::System);
        assert!(!options.admits(&system));
    }
}

//! Inbound messages and the collaborators they carry.
//!
//! A [`Message`] is produced by the transport layer and consumed by the
//! dispatch pipeline. It never outlives one dispatch: pieces receive it behind
//! an `Arc` and must not stash it away.

use crate::error::BoxError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{
    collections::{HashMap, HashSet},
    fmt,
    sync::Arc,
};

/// The user who wrote a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Author {
    /// Stable user identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Whether the author is an automated account.
    pub bot: bool,
}

impl Author {
    /// Create a human author.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            bot: false,
        }
    }

    /// Create an automated author.
    pub fn bot(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            bot: true,
            ..Self::new(id, name)
        }
    }
}

/// Message subtype as reported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// A regular user message.
    #[default]
    Default,
    /// A reply to another message.
    Reply,
    /// A system notice (joins, pins, ...).
    System,
}

/// Where a message can be answered.
#[async_trait]
pub trait Channel: Send + Sync + 'static {
    /// Whether the runtime is allowed to post in this channel.
    fn postable(&self) -> bool {
        true
    }

    /// Post a message to the channel.
    async fn send(&self, content: String) -> Result<(), BoxError>;
}

/// Read-only access to resolved settings.
///
/// Storage and schema live outside the runtime; only the resolved values
/// are visible here.
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot be used as a settings accessor",
    label = "missing `Settings` implementation",
    note = "Implement `Settings::prefixes`, or use `StaticSettings`."
)]
pub trait Settings: Send + Sync + 'static {
    /// Prefixes that apply in the given guild (`None` for direct messages).
    fn prefixes(&self, guild: Option<&str>) -> Vec<String>;

    /// Whether the user is blacklisted.
    fn is_user_blacklisted(&self, _user: &str) -> bool {
        false
    }

    /// Whether the guild is blacklisted.
    fn is_guild_blacklisted(&self, _guild: &str) -> bool {
        false
    }
}

/// In-memory [`Settings`] with default prefixes and per-guild overrides.
#[derive(Debug, Clone, Default)]
pub struct StaticSettings {
    /// Prefixes used wherever no guild override exists.
    pub default_prefixes: Vec<String>,
    /// Guild id to prefixes.
    pub guild_prefixes: HashMap<String, Vec<String>>,
    /// Blacklisted user ids.
    pub blacklisted_users: HashSet<String>,
    /// Blacklisted guild ids.
    pub blacklisted_guilds: HashSet<String>,
}

impl StaticSettings {
    /// Settings with a single default prefix.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            default_prefixes: vec![prefix.into()],
            ..Self::default()
        }
    }
}

impl Settings for StaticSettings {
    fn prefixes(&self, guild: Option<&str>) -> Vec<String> {
        guild
            .and_then(|id| self.guild_prefixes.get(id))
            .unwrap_or(&self.default_prefixes)
            .clone()
    }

    fn is_user_blacklisted(&self, user: &str) -> bool {
        self.blacklisted_users.contains(user)
    }

    fn is_guild_blacklisted(&self, guild: &str) -> bool {
        self.blacklisted_guilds.contains(guild)
    }
}

/// The prefix that introduced a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prefix {
    /// The runtime was mentioned.
    Mention(String),
    /// A configured text prefix.
    Text(String),
}

impl Prefix {
    /// The matched text.
    pub fn as_str(&self) -> &str {
        match self {
            Prefix::Mention(text) | Prefix::Text(text) => text,
        }
    }

    /// Whether this is the mention prefix.
    pub fn is_mention(&self) -> bool {
        matches!(self, Prefix::Mention(_))
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of prefix parsing, attached to a message before dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// The matched prefix.
    pub prefix: Prefix,
    /// Byte length of the matched prefix within the content.
    pub prefix_length: usize,
    /// Lowercased command name; empty when only the prefix was sent.
    pub command_text: String,
    /// Whitespace separated arguments after the command name.
    pub args: Vec<String>,
}

impl Invocation {
    /// Build an invocation by hand.
    pub fn new(prefix: Prefix, command_text: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            prefix_length: prefix.as_str().len(),
            prefix,
            command_text: command_text.into(),
            args,
        }
    }
}

/// One inbound message.
pub struct Message {
    /// Raw text.
    pub content: String,
    /// Who wrote it.
    pub author: Author,
    /// Guild the message was sent in, `None` for direct messages.
    pub guild_id: Option<String>,
    /// Subtype reported by the transport.
    pub kind: MessageKind,
    /// Whether this is an edit of an earlier message.
    pub edited: bool,
    /// Whether the message came through a webhook.
    pub webhook: bool,
    /// Whether the runtime's own account wrote it.
    pub self_authored: bool,
    /// Parsed prefix and command, if any.
    pub invocation: Option<Invocation>,
    channel: Arc<dyn Channel>,
    settings: Arc<dyn Settings>,
}

impl Message {
    /// Create a plain message with no invocation attached.
    pub fn new(
        content: impl Into<String>,
        author: Author,
        channel: Arc<dyn Channel>,
        settings: Arc<dyn Settings>,
    ) -> Self {
        Self {
            content: content.into(),
            author,
            guild_id: None,
            kind: MessageKind::Default,
            edited: false,
            webhook: false,
            self_authored: false,
            invocation: None,
            channel,
            settings,
        }
    }

    /// Set the guild.
    pub fn in_guild(mut self, guild: impl Into<String>) -> Self {
        self.guild_id = Some(guild.into());
        self
    }

    /// Set the subtype.
    pub fn with_kind(mut self, kind: MessageKind) -> Self {
        self.kind = kind;
        self
    }

    /// Attach a parsed invocation.
    pub fn with_invocation(mut self, invocation: Invocation) -> Self {
        self.invocation = Some(invocation);
        self
    }

    /// The channel the message was posted in.
    pub fn channel(&self) -> &dyn Channel {
        self.channel.as_ref()
    }

    /// Settings accessor for this message's context.
    pub fn settings(&self) -> &dyn Settings {
        self.settings.as_ref()
    }

    /// Whether replies can be posted.
    pub fn postable(&self) -> bool {
        self.channel.postable()
    }

    /// Reply in the same channel.
    pub async fn send(&self, content: impl Into<String>) -> Result<(), BoxError> {
        self.channel.send(content.into()).await
    }

    /// Prefixes that apply where this message was sent.
    pub fn prefixes(&self) -> Vec<String> {
        self.settings.prefixes(self.guild_id.as_deref())
    }

    /// Whether the author is blacklisted.
    pub fn author_blacklisted(&self) -> bool {
        self.settings.is_user_blacklisted(&self.author.id)
    }

    /// Whether the guild the message came from is blacklisted.
    pub fn guild_blacklisted(&self) -> bool {
        self.guild_id
            .as_deref()
            .is_some_and(|guild| self.settings.is_guild_blacklisted(guild))
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("content", &self.content)
            .field("author", &self.author)
            .field("guild_id", &self.guild_id)
            .field("kind", &self.kind)
            .field("invocation", &self.invocation)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_settings_guild_override() {
        let mut settings = StaticSettings::with_prefix("!");
        settings
            .guild_prefixes
            .insert("g1".into(), vec!["?".into(), "$".into()]);

        assert_eq!(settings.prefixes(None), vec!["!".to_string()]);
        assert_eq!(settings.prefixes(Some("g2")), vec!["!".to_string()]);
        assert_eq!(
            settings.prefixes(Some("g1")),
            vec!["?".to_string(), "$".to_string()]
        );
    }

    #[test]
    fn test_invocation_prefix_length() {
        let invocation = Invocation::new(Prefix::Text("pw!".into()), "ping", vec![]);
        assert_eq!(invocation.prefix_length, 3);
        assert!(!invocation.prefix.is_mention());
    }
}

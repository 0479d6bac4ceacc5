//! Prefix parsing: turning raw message text into an [`Invocation`].

use crate::config::RuntimeConfig;
use piecework_core::{Invocation, Message, Prefix};

/// Splits a message into prefix, command text and parameters.
#[derive(Debug, Clone, Default)]
pub struct PrefixParser {
    defaults: Vec<String>,
    mention: Option<String>,
    case_insensitive: bool,
}

impl PrefixParser {
    /// A parser with fallback prefixes and an optional mention prefix.
    pub fn new(defaults: Vec<String>, mention: Option<String>) -> Self {
        Self {
            defaults,
            mention,
            case_insensitive: false,
        }
    }

    /// Match prefixes regardless of case.
    pub fn case_insensitive(mut self, enabled: bool) -> Self {
        self.case_insensitive = enabled;
        self
    }

    /// A parser for a runtime configuration.
    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self::new(config.prefix.to_vec(), config.mention_prefix.clone())
            .case_insensitive(config.prefix_case_insensitive)
    }

    /// The mention prefix, if configured.
    pub fn mention(&self) -> Option<&str> {
        self.mention.as_deref()
    }

    /// Prefixes that apply to `message`: its settings, or the fallback
    /// prefixes when the settings have none.
    pub fn prefixes_for(&self, message: &Message) -> Vec<String> {
        let prefixes = message.prefixes();
        if prefixes.is_empty() {
            self.defaults.clone()
        } else {
            prefixes
        }
    }

    /// Parse `message`, or `None` if it does not start with a prefix.
    pub fn parse(&self, message: &Message) -> Option<Invocation> {
        self.parse_content(&message.content, &self.prefixes_for(message))
    }

    /// Parse raw text against `prefixes`. The mention prefix is always tried
    /// first and must be followed by whitespace or the end of the text; the
    /// others are tried longest first.
    pub fn parse_content(&self, content: &str, prefixes: &[String]) -> Option<Invocation> {
        let mention = self
            .mention
            .as_deref()
            .filter(|mention| !mention.is_empty())
            .filter(|mention| {
                content
                    .strip_prefix(*mention)
                    .is_some_and(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
            })
            .map(|mention| Prefix::Mention(mention.to_string()));

        let prefix = mention.or_else(|| {
            let mut candidates: Vec<&String> =
                prefixes.iter().filter(|prefix| !prefix.is_empty()).collect();
            candidates.sort_by_key(|prefix| std::cmp::Reverse(prefix.len()));
            candidates
                .into_iter()
                .find_map(|prefix| self.strip(content, prefix))
                .map(|head| Prefix::Text(head.to_string()))
        })?;

        let rest = &content[prefix.as_str().len()..];
        let mut tokens = rest.split_whitespace();
        let command_text = tokens.next().unwrap_or_default().to_lowercase();
        let args = tokens.map(str::to_string).collect();

        Some(Invocation::new(prefix, command_text, args))
    }

    /// Text listing the prefixes, sent when someone mentions the runtime
    /// without naming a command.
    pub fn reminder(&self, prefixes: &[String]) -> String {
        match prefixes {
            [] => match self.mention() {
                Some(mention) => format!("There is no prefix set here. Use {mention} instead."),
                None => "There is no prefix set here.".to_string(),
            },
            [prefix] => format!("The prefix here is set to: `{prefix}`"),
            prefixes => {
                let listed: Vec<_> = prefixes.iter().map(|prefix| format!("`{prefix}`")).collect();
                format!("The prefixes here are: {}", listed.join(", "))
            }
        }
    }

    /// The slice of `content` matching `prefix`, honoring case sensitivity.
    fn strip<'c>(&self, content: &'c str, prefix: &str) -> Option<&'c str> {
        let head = content.get(..prefix.len())?;
        let matches = if self.case_insensitive {
            head == prefix || head.to_lowercase() == prefix.to_lowercase()
        } else {
            head == prefix
        };
        matches.then_some(head)
    }
}

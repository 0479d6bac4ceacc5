//! Runtime configuration.
//!
//! Everything is optional; a missing key takes its default.
//!
//! # Example TOML
//!
//! ```toml
//! prefix = ["!", "?"]
//! mention_prefix = "<@42>"
//! owners = ["100"]
//! disabled_core_pieces = ["finalizer"]
//!
//! [console]
//! level = "debug"
//! timestamps = false
//!
//! [piece_defaults.commands]
//! cooldown_ms = 2000
//!
//! [settings.guild_prefixes]
//! "1234" = ["$"]
//! ```

use piecework_core::{
    CommandOptions, EventKind, EventOptions, FilterOptions, GuardOptions, PieceKind,
    StaticSettings,
};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Errors raised while reading or writing configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// File that was read.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: std::io::Error,
    },

    /// The TOML was malformed or had the wrong shape.
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration could not be rendered as TOML.
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// One prefix or several.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrefixSetting {
    /// A single prefix.
    One(String),
    /// Several prefixes.
    Many(Vec<String>),
}

impl PrefixSetting {
    /// The prefixes as a list, empty strings dropped.
    pub fn to_vec(&self) -> Vec<String> {
        let prefixes = match self {
            PrefixSetting::One(prefix) => vec![prefix.clone()],
            PrefixSetting::Many(prefixes) => prefixes.clone(),
        };
        prefixes
            .into_iter()
            .filter(|prefix| !prefix.is_empty())
            .collect()
    }
}

impl Default for PrefixSetting {
    fn default() -> Self {
        PrefixSetting::One(String::new())
    }
}

impl From<&str> for PrefixSetting {
    fn from(prefix: &str) -> Self {
        PrefixSetting::One(prefix.to_string())
    }
}

/// Console output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Default filter directive, overridden by `RUST_LOG`.
    pub level: String,
    /// Prefix lines with a timestamp.
    pub timestamps: bool,
    /// Colored output.
    pub ansi: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            timestamps: true,
            ansi: true,
        }
    }
}

/// Which console events write to the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleEvents {
    /// `log`
    pub log: bool,
    /// `warn`
    pub warn: bool,
    /// `error`
    pub error: bool,
    /// `critical`
    pub critical: bool,
    /// `verbose`
    pub verbose: bool,
    /// `debug`
    pub debug: bool,
}

impl Default for ConsoleEvents {
    fn default() -> Self {
        Self {
            log: true,
            warn: true,
            error: true,
            critical: true,
            verbose: false,
            debug: false,
        }
    }
}

impl ConsoleEvents {
    /// Whether the console event for `kind` is switched on. Kinds that are
    /// not console events are always off.
    pub fn enabled(&self, kind: EventKind) -> bool {
        match kind {
            EventKind::Log => self.log,
            EventKind::Warn => self.warn,
            EventKind::Error => self.error,
            EventKind::Critical => self.critical,
            EventKind::Verbose => self.verbose,
            EventKind::Debug => self.debug,
            _ => false,
        }
    }
}

/// Default options handed to piece sources, per store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PieceDefaults {
    /// Command defaults.
    pub commands: CommandOptions,
    /// Event listener defaults.
    pub events: EventOptions,
    /// Filter defaults.
    pub filters: FilterOptions,
    /// Guard defaults.
    pub guards: GuardOptions,
}

/// Resolved settings served by the default settings accessor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsConfig {
    /// Guild id to its prefixes.
    pub guild_prefixes: HashMap<String, PrefixSetting>,
    /// Blacklisted user ids.
    pub blacklisted_users: Vec<String>,
    /// Blacklisted guild ids.
    pub blacklisted_guilds: Vec<String>,
}

/// Top-level runtime configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Default prefix or prefixes.
    pub prefix: PrefixSetting,
    /// Text that addresses the runtime directly, such as a mention.
    pub mention_prefix: Option<String>,
    /// Match prefixes regardless of case.
    pub prefix_case_insensitive: bool,
    /// Owner user ids.
    pub owners: Vec<String>,
    /// Log every command execution at info level.
    pub command_logging: bool,
    /// Line logged once the runtime is ready.
    pub ready_message: String,
    /// Console output.
    pub console: ConsoleConfig,
    /// Console event switches.
    pub console_events: ConsoleEvents,
    /// Kinds whose built-in pieces are not installed.
    pub disabled_core_pieces: Vec<PieceKind>,
    /// Per-store default options.
    pub piece_defaults: PieceDefaults,
    /// Settings served to pieces.
    pub settings: SettingsConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            prefix: PrefixSetting::default(),
            mention_prefix: None,
            prefix_case_insensitive: false,
            owners: Vec::new(),
            command_logging: false,
            ready_message: "Successfully initialized.".to_string(),
            console: ConsoleConfig::default(),
            console_events: ConsoleEvents::default(),
            disabled_core_pieces: Vec::new(),
            piece_defaults: PieceDefaults::default(),
            settings: SettingsConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Read and parse a TOML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }

    /// Whether built-ins of `kind` are installed.
    pub fn core_pieces_enabled(&self, kind: PieceKind) -> bool {
        !self.disabled_core_pieces.contains(&kind)
    }

    /// The default settings accessor for this configuration.
    pub fn static_settings(&self) -> StaticSettings {
        StaticSettings {
            default_prefixes: self.prefix.to_vec(),
            guild_prefixes: self
                .settings
                .guild_prefixes
                .iter()
                .map(|(guild, prefixes)| (guild.clone(), prefixes.to_vec()))
                .collect(),
            blacklisted_users: self.settings.blacklisted_users.iter().cloned().collect(),
            blacklisted_guilds: self.settings.blacklisted_guilds.iter().cloned().collect(),
        }
    }
}

use crate::store::Store;
use piecework_core::{CommandPiece, CommandVariant};
use std::sync::Arc;

/// Store of commands.
pub type CommandStore = Store<CommandVariant>;

impl Store<CommandVariant> {
    /// Resolve a command by name, then by alias, case-insensitively.
    ///
    /// Names win over aliases; among aliases, the earliest registered
    /// command wins.
    pub fn resolve(&self, text: &str) -> Option<Arc<CommandPiece>> {
        let text = text.to_lowercase();
        self.get(&text)
            .or_else(|| self.values().find(|command| command.answers_to(&text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::EchoCommand;
    use piecework_core::CommandOptions;

    fn aliased(name: &str, aliases: &[&str]) -> CommandPiece {
        CommandPiece::new(name, EchoCommand).with_options(CommandOptions {
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            ..CommandOptions::default()
        })
    }

    #[test]
    fn test_resolve_by_name_and_alias() {
        let store = CommandStore::new();
        store.register(aliased("help", &["h", "commands"])).unwrap();

        assert_eq!(store.resolve("HELP").unwrap().name(), "help");
        assert_eq!(store.resolve("commands").unwrap().name(), "help");
        assert!(store.resolve("foo").is_none());
    }

    #[test]
    fn test_name_beats_alias() {
        let store = CommandStore::new();
        store.register(aliased("stats", &["info"])).unwrap();
        store.register(aliased("info", &[])).unwrap();

        assert_eq!(store.resolve("info").unwrap().name(), "info");
    }
}

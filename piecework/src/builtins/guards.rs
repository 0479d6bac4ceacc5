//! Built-in guards: disabled commands, permission levels and channel scope.

use crate::permissions::{OwnerSet, PermissionContext, PermissionLevels};
use piecework_core::{BoxError, ChannelScope, CommandPiece, Guard, GuardResult, Message};
use std::sync::Arc;

/// Blocks commands that were disabled after being resolved.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledGuard;

impl Guard for DisabledGuard {
    async fn run(
        &self,
        _message: Arc<Message>,
        command: Arc<CommandPiece>,
    ) -> Result<GuardResult, BoxError> {
        Ok(if command.is_enabled() {
            GuardResult::Pass
        } else {
            GuardResult::Reason("This command has been disabled.".to_string())
        })
    }
}

/// Checks the author against the command's permission level.
pub struct PermissionsGuard {
    levels: Arc<PermissionLevels>,
    owners: OwnerSet,
}

impl PermissionsGuard {
    /// Guard checking `levels`.
    pub fn new(levels: Arc<PermissionLevels>, owners: OwnerSet) -> Self {
        Self { levels, owners }
    }
}

impl Guard for PermissionsGuard {
    async fn run(
        &self,
        message: Arc<Message>,
        command: Arc<CommandPiece>,
    ) -> Result<GuardResult, BoxError> {
        let ctx = PermissionContext {
            message: &message,
            owners: &self.owners,
        };
        Ok(
            if self.levels.permits(command.options().permission_level, &ctx) {
                GuardResult::Pass
            } else {
                GuardResult::Reason("You do not have permission to use this command.".to_string())
            },
        )
    }
}

/// Keeps commands to the channel scopes they allow.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunInGuard;

impl Guard for RunInGuard {
    async fn run(
        &self,
        message: Arc<Message>,
        command: Arc<CommandPiece>,
    ) -> Result<GuardResult, BoxError> {
        let allowed = &command.options().run_in;
        if allowed.is_empty() {
            return Ok(GuardResult::Silent);
        }
        if allowed.contains(&ChannelScope::of(&message)) {
            return Ok(GuardResult::Pass);
        }
        let scope = match allowed[0] {
            ChannelScope::Guild => "guild",
            ChannelScope::Direct => "direct",
        };
        Ok(GuardResult::Reason(format!(
            "This command is only available in {scope} channels."
        )))
    }
}

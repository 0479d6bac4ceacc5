//! Guards: predicates that may block a resolved command.

use crate::{
    command::CommandPiece,
    error::BoxError,
    message::Message,
    piece::{InitContext, Piece, PieceKind, Variant},
};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::{future::Future, sync::Arc};

/// Outcome of a single guard.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GuardResult {
    /// The guard passed or does not apply.
    #[default]
    Pass,
    /// Block without telling the user why.
    Silent,
    /// Block with a human-readable reason.
    Reason(String),
}

impl From<bool> for GuardResult {
    /// `true` blocks silently, `false` passes.
    fn from(block: bool) -> Self {
        if block {
            GuardResult::Silent
        } else {
            GuardResult::Pass
        }
    }
}

impl From<Option<String>> for GuardResult {
    fn from(reason: Option<String>) -> Self {
        reason.map_or(GuardResult::Pass, GuardResult::Reason)
    }
}

impl From<String> for GuardResult {
    fn from(reason: String) -> Self {
        GuardResult::Reason(reason)
    }
}

impl From<&str> for GuardResult {
    fn from(reason: &str) -> Self {
        GuardResult::Reason(reason.to_string())
    }
}

impl From<()> for GuardResult {
    fn from((): ()) -> Self {
        GuardResult::Pass
    }
}

/// Aggregated decision of a guard chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardVerdict {
    /// Every guard passed.
    Passed,
    /// Blocked with nothing to tell the user.
    SilentBlock,
    /// Blocked with every collected reason, in guard registration order.
    ExplainedBlock(Vec<String>),
}

impl GuardVerdict {
    /// Fold individual results, given in guard registration order.
    ///
    /// A silent block wins over reasons. Empty reasons count as a pass.
    /// `faulted` marks that at least one guard malfunctioned; with no
    /// silent block and no reasons, a fault blocks silently.
    pub fn aggregate<I>(results: I, faulted: bool) -> Self
    where
        I: IntoIterator<Item = GuardResult>,
    {
        let mut silent = false;
        let mut reasons = Vec::new();
        for result in results {
            match result {
                GuardResult::Pass => {}
                GuardResult::Silent => silent = true,
                GuardResult::Reason(reason) if reason.is_empty() => {}
                GuardResult::Reason(reason) => reasons.push(reason),
            }
        }

        if silent {
            GuardVerdict::SilentBlock
        } else if !reasons.is_empty() {
            GuardVerdict::ExplainedBlock(reasons)
        } else if faulted {
            GuardVerdict::SilentBlock
        } else {
            GuardVerdict::Passed
        }
    }

    /// Whether the command must not run.
    pub fn is_blocked(&self) -> bool {
        !matches!(self, GuardVerdict::Passed)
    }

    /// Reasons to show the user, if any.
    pub fn reasons(&self) -> Option<&[String]> {
        match self {
            GuardVerdict::ExplainedBlock(reasons) => Some(reasons),
            _ => None,
        }
    }
}

/// Options shared by every guard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardOptions {
    /// Skipped by selective runs, so retries are not charged twice.
    pub spam_protection: bool,
}

/// Marker for guard pieces.
pub struct GuardVariant;

/// A registered guard.
pub type GuardPiece = Piece<GuardVariant>;

impl Variant for GuardVariant {
    const KIND: PieceKind = PieceKind::Guard;
    type Options = GuardOptions;
    type Behavior = dyn DynGuard;

    fn init(piece: &Piece<Self>) -> Result<(), BoxError> {
        piece.behavior().init_dyn(&InitContext::of(piece))
    }
}

impl Piece<GuardVariant> {
    /// Create a guard piece.
    pub fn new<G: Guard>(name: impl Into<String>, guard: G) -> Self {
        Self::from_arc(name, Arc::new(guard))
    }

    /// Flag the guard as spam protection.
    pub fn spam_protection(self) -> Self {
        self.with_options(GuardOptions {
            spam_protection: true,
        })
    }
}

/// A guard.
///
/// Return [`GuardResult`] for expected outcomes; an `Err` means the guard
/// itself malfunctioned.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a `Guard`",
    label = "missing `Guard` implementation",
    note = "Guards must implement `run(message, command)` returning a `GuardResult`."
)]
pub trait Guard: Send + Sync + 'static {
    /// Decide whether `command` may run for `message`.
    fn run(
        &self,
        message: Arc<Message>,
        command: Arc<CommandPiece>,
    ) -> impl Future<Output = Result<GuardResult, BoxError>> + Send;

    /// Called when the piece enters a store.
    fn init(&self, _ctx: &InitContext<'_>) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Dynamic object-safe version of [`Guard`].
pub trait DynGuard: Send + Sync + 'static {
    /// Run the guard (dynamic dispatch version).
    fn run_dyn(
        &self,
        message: Arc<Message>,
        command: Arc<CommandPiece>,
    ) -> BoxFuture<'_, Result<GuardResult, BoxError>>;

    /// Run the init hook (dynamic dispatch version).
    fn init_dyn(&self, ctx: &InitContext<'_>) -> Result<(), BoxError>;
}

impl<T: Guard> DynGuard for T {
    fn run_dyn(
        &self,
        message: Arc<Message>,
        command: Arc<CommandPiece>,
    ) -> BoxFuture<'_, Result<GuardResult, BoxError>> {
        Box::pin(self.run(message, command))
    }

    fn init_dyn(&self, ctx: &InitContext<'_>) -> Result<(), BoxError> {
        self.init(ctx)
    }
}

impl<F, Fut, R> Guard for F
where
    F: Fn(Arc<Message>, Arc<CommandPiece>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, BoxError>> + Send,
    R: Into<GuardResult>,
{
    fn run(
        &self,
        message: Arc<Message>,
        command: Arc<CommandPiece>,
    ) -> impl Future<Output = Result<GuardResult, BoxError>> + Send {
        let pending = (self)(message, command);
        async move { pending.await.map(Into::into) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reason(text: &str) -> GuardResult {
        GuardResult::Reason(text.to_string())
    }

    #[test]
    fn test_reason_is_collected() {
        let verdict = GuardVerdict::aggregate([GuardResult::Pass, reason("cooldown active")], false);
        assert_eq!(
            verdict,
            GuardVerdict::ExplainedBlock(vec!["cooldown active".to_string()])
        );
    }

    #[test]
    fn test_silent_wins_over_reasons() {
        let verdict = GuardVerdict::aggregate([GuardResult::Silent, reason("cooldown active")], false);
        assert_eq!(verdict, GuardVerdict::SilentBlock);
        assert!(verdict.reasons().is_none());
    }

    #[test]
    fn test_all_reasons_kept_in_order() {
        let verdict = GuardVerdict::aggregate([reason("b"), GuardResult::Pass, reason("a")], false);
        assert_eq!(verdict.reasons().unwrap().to_vec(), vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn test_empty_reason_passes() {
        assert_eq!(GuardVerdict::aggregate([reason("")], false), GuardVerdict::Passed);
        assert_eq!(
            GuardVerdict::aggregate(Vec::<GuardResult>::new(), false),
            GuardVerdict::Passed
        );
    }

    #[test]
    fn test_fault_blocks_silently_only_without_reasons() {
        assert_eq!(
            GuardVerdict::aggregate([GuardResult::Pass], true),
            GuardVerdict::SilentBlock
        );
        assert_eq!(
            GuardVerdict::aggregate([reason("nope")], true),
            GuardVerdict::ExplainedBlock(vec!["nope".to_string()])
        );
    }

    #[test]
    fn test_conversions() {
        assert_eq!(GuardResult::from(true), GuardResult::Silent);
        assert_eq!(GuardResult::from(false), GuardResult::Pass);
        assert_eq!(GuardResult::from(None), GuardResult::Pass);
        assert_eq!(GuardResult::from("x"), reason("x"));
    }
}

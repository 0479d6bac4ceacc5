use crate::store::Store;
use futures::future::join_all;
use piecework_core::{
    CommandPiece, GuardVariant, GuardVerdict, Message, PieceInfo, SharedError, contain_panic,
};
use std::sync::Arc;
use tracing::{debug, error};

/// Store of guards.
pub type GuardStore = Store<GuardVariant>;

/// A guard that failed instead of returning a result.
#[derive(Debug, Clone)]
pub struct GuardFault {
    /// The malfunctioning guard.
    pub guard: PieceInfo,
    /// What went wrong.
    pub error: SharedError,
}

/// Outcome of one guard chain run.
#[derive(Debug, Clone)]
pub struct GuardReport {
    /// Aggregated decision.
    pub verdict: GuardVerdict,
    /// Guards that malfunctioned, in registration order. They took no part
    /// in the verdict beyond blocking silently when nothing else blocked.
    pub faults: Vec<GuardFault>,
}

impl Store<GuardVariant> {
    /// Evaluate the guard chain for `command`.
    ///
    /// Enabled guards run concurrently over a snapshot of the store. With
    /// `selective`, spam-protection guards are left out entirely. Every
    /// selected guard runs to completion, and reasons are collected in
    /// registration order regardless of completion order.
    pub async fn run(
        &self,
        message: &Arc<Message>,
        command: &Arc<CommandPiece>,
        selective: bool,
    ) -> GuardReport {
        let guards: Vec<_> = self
            .values()
            .filter(|guard| guard.is_enabled())
            .filter(|guard| !(selective && guard.options().spam_protection))
            .collect();

        let results = join_all(guards.iter().map(|guard| {
            contain_panic(
                guard
                    .behavior()
                    .run_dyn(message.clone(), command.clone()),
            )
        }))
        .await;

        let mut outcomes = Vec::with_capacity(results.len());
        let mut faults = Vec::new();
        for (guard, result) in guards.iter().zip(results) {
            match result {
                Ok(outcome) => outcomes.push(outcome),
                Err(err) => {
                    error!(
                        guard = guard.name(),
                        command = command.name(),
                        error = %err,
                        "guard malfunctioned"
                    );
                    faults.push(GuardFault {
                        guard: guard.info(),
                        error: Arc::from(err),
                    });
                }
            }
        }

        let verdict = GuardVerdict::aggregate(outcomes, !faults.is_empty());
        if verdict.is_blocked() {
            debug!(command = command.name(), ?verdict, "command inhibited");
        }
        GuardReport { verdict, faults }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{EchoCommand, StaticGuard, message};
    use piecework_core::{BoxError, GuardPiece, GuardResult};
    use std::{sync::atomic::Ordering, time::Duration};
    use tokio::sync::Barrier;

    fn command() -> Arc<CommandPiece> {
        Arc::new(CommandPiece::new("ping", EchoCommand))
    }

    fn store(guards: Vec<(&str, StaticGuard)>) -> GuardStore {
        let store = GuardStore::new();
        for (name, guard) in guards {
            store.register(GuardPiece::new(name, guard)).unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_scenario_reason_only() {
        let store = store(vec![
            ("g1", StaticGuard::pass()),
            ("g2", StaticGuard::reason("cooldown active")),
        ]);
        let report = store.run(&message("!ping"), &command(), false).await;
        assert_eq!(
            report.verdict,
            GuardVerdict::ExplainedBlock(vec!["cooldown active".to_string()])
        );
    }

    #[tokio::test]
    async fn test_scenario_silent_wins() {
        let store = store(vec![
            ("g1", StaticGuard::silent()),
            ("g2", StaticGuard::reason("cooldown active")),
        ]);
        let report = store.run(&message("!ping"), &command(), false).await;
        assert_eq!(report.verdict, GuardVerdict::SilentBlock);
    }

    #[tokio::test]
    async fn test_all_pass() {
        let store = store(vec![("g1", StaticGuard::pass()), ("g2", StaticGuard::pass())]);
        let report = store.run(&message("!ping"), &command(), false).await;
        assert_eq!(report.verdict, GuardVerdict::Passed);
        assert!(report.faults.is_empty());
    }

    #[tokio::test]
    async fn test_disabled_guards_do_not_run() {
        let blocker = StaticGuard::silent();
        let calls = blocker.calls();
        let store = store(vec![("blocker", blocker)]);
        store.disable("blocker").unwrap();

        let report = store.run(&message("!ping"), &command(), false).await;
        assert_eq!(report.verdict, GuardVerdict::Passed);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_selective_skips_spam_protection() {
        let limiter = StaticGuard::silent();
        let calls = limiter.calls();
        let store = GuardStore::new();
        store
            .register(GuardPiece::new("cooldown", limiter).spam_protection())
            .unwrap();
        store
            .register(GuardPiece::new("other", StaticGuard::pass()))
            .unwrap();

        let report = store.run(&message("!ping"), &command(), true).await;
        assert_eq!(report.verdict, GuardVerdict::Passed);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let report = store.run(&message("!ping"), &command(), false).await;
        assert_eq!(report.verdict, GuardVerdict::SilentBlock);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_guards_run_concurrently_and_keep_order() {
        let barrier = Arc::new(Barrier::new(2));
        let store = GuardStore::new();
        for (name, delay) in [("slow", 30), ("fast", 0)] {
            let barrier = barrier.clone();
            store
                .register(GuardPiece::new(
                    name,
                    move |_m: Arc<Message>, _c: Arc<CommandPiece>| {
                        let barrier = barrier.clone();
                        async move {
                            // Both guards must be in flight for either to pass the barrier.
                            barrier.wait().await;
                            tokio::time::sleep(Duration::from_millis(delay)).await;
                            Ok::<_, BoxError>(GuardResult::Reason(name.to_string()))
                        }
                    },
                ))
                .unwrap();
        }

        let report = tokio::time::timeout(
            Duration::from_secs(2),
            store.run(&message("!ping"), &command(), false),
        )
        .await
        .expect("guards were evaluated sequentially");

        assert_eq!(
            report.verdict,
            GuardVerdict::ExplainedBlock(vec!["slow".to_string(), "fast".to_string()])
        );
    }

    #[tokio::test]
    async fn test_malfunction_is_isolated() {
        let store = GuardStore::new();
        store
            .register(GuardPiece::new("broken", StaticGuard::failing("db down")))
            .unwrap();
        store
            .register(GuardPiece::new("nsfw", StaticGuard::reason("not here")))
            .unwrap();

        let report = store.run(&message("!ping"), &command(), false).await;

        assert_eq!(
            report.verdict,
            GuardVerdict::ExplainedBlock(vec!["not here".to_string()])
        );
        assert_eq!(report.faults.len(), 1);
        assert_eq!(report.faults[0].guard.name, "broken");
        assert_eq!(report.faults[0].error.to_string(), "db down");
    }

    #[tokio::test]
    async fn test_lone_malfunction_blocks_silently() {
        let store = store(vec![("broken", StaticGuard::failing("db down"))]);
        let report = store.run(&message("!ping"), &command(), false).await;
        assert_eq!(report.verdict, GuardVerdict::SilentBlock);
    }
}

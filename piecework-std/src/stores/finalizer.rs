use crate::store::Store;
use futures::future::join_all;
use piecework_core::{
    CommandPiece, FinalizerVariant, Message, PieceInfo, Response, SharedError, Stopwatch,
    contain_panic,
};
use std::sync::Arc;
use tracing::error;

/// Store of finalizers.
pub type FinalizerStore = Store<FinalizerVariant>;

/// A finalizer that failed after a successful command.
#[derive(Debug, Clone)]
pub struct FinalizerFault {
    /// The failing finalizer.
    pub finalizer: PieceInfo,
    /// What went wrong.
    pub error: SharedError,
}

impl Store<FinalizerVariant> {
    /// Run every enabled finalizer concurrently over a successful command.
    pub async fn run(
        &self,
        message: &Arc<Message>,
        command: &Arc<CommandPiece>,
        response: &Response,
        timer: Stopwatch,
    ) -> Vec<FinalizerFault> {
        let finalizers = self.enabled();
        let results = join_all(finalizers.iter().map(|finalizer| {
            contain_panic(finalizer.behavior().run_dyn(
                message.clone(),
                command.clone(),
                response.clone(),
                timer,
            ))
        }))
        .await;

        finalizers
            .iter()
            .zip(results)
            .filter_map(|(finalizer, result)| {
                let err = result.err()?;
                error!(
                    finalizer = finalizer.name(),
                    command = command.name(),
                    error = %err,
                    "finalizer failed"
                );
                Some(FinalizerFault {
                    finalizer: finalizer.info(),
                    error: Arc::from(err),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{EchoCommand, message};
    use piecework_core::{BoxError, FinalizerPiece};
    use std::sync::Mutex;

    #[tokio::test]
    async fn test_all_finalizers_run_despite_failure() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let store = FinalizerStore::new();
        store
            .register(FinalizerPiece::new(
                "broken",
                |_m: Arc<Message>, _c: Arc<CommandPiece>, _r: Response, _t: Stopwatch| async {
                    Err::<(), BoxError>("cannot log".into())
                },
            ))
            .unwrap();
        let log = seen.clone();
        store
            .register(FinalizerPiece::new(
                "record",
                move |_m: Arc<Message>, c: Arc<CommandPiece>, r: Response, _t: Stopwatch| {
                    let text = r.to_text().unwrap_or_default();
                    log.lock().unwrap().push(format!("{}:{text}", c.name()));
                    async { Ok::<(), BoxError>(()) }
                },
            ))
            .unwrap();

        let mut timer = Stopwatch::start();
        timer.stop();
        let faults = store
            .run(
                &message("!ping"),
                &Arc::new(CommandPiece::new("ping", EchoCommand)),
                &Response::Text("pong".into()),
                timer,
            )
            .await;

        assert_eq!(faults.len(), 1);
        assert_eq!(faults[0].finalizer.name, "broken");
        assert_eq!(*seen.lock().unwrap(), ["ping:pong"]);
    }
}

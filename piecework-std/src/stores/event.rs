use crate::store::Store;
use futures::future::{BoxFuture, join_all};
use piecework_core::{
    Emitter, EventKind, EventPiece, EventVariant, RuntimeEvent, contain_panic,
};
use std::sync::Arc;
use tracing::{error, trace};

/// Store of event listeners. Emitting through it fans the event out to every
/// listener registered for its kind.
pub type EventStore = Store<EventVariant>;

impl Store<EventVariant> {
    /// Enabled listeners for `kind`, in registration order.
    pub fn listeners(&self, kind: EventKind) -> Vec<Arc<EventPiece>> {
        self.values()
            .filter(|listener| listener.is_enabled() && listener.listens_to() == Some(kind))
            .collect()
    }

    /// Deliver `event` to its listeners and wait for all of them.
    ///
    /// Listeners run concurrently. A failing listener is reported through an
    /// `eventError` event, except while delivering `eventError` itself.
    /// Returns how many listeners ran.
    pub async fn dispatch(&self, event: RuntimeEvent) -> usize {
        let kind = event.kind();
        let mut listeners = self.listeners(kind);
        // A `once` listener is claimed by whoever flips it off first.
        listeners.retain(|listener| !listener.options().once || listener.disable());
        if listeners.is_empty() {
            return 0;
        }
        trace!(event = %kind, listeners = listeners.len(), "dispatching event");

        let results = join_all(
            listeners
                .iter()
                .map(|listener| contain_panic(listener.behavior().run_dyn(event.clone()))),
        )
        .await;

        for (listener, result) in listeners.iter().zip(results) {
            let Err(err) = result else { continue };
            error!(listener = listener.name(), event = %kind, error = %err, "event listener failed");
            if kind != EventKind::EventError {
                self.emit(RuntimeEvent::EventError {
                    event: listener.info(),
                    kind,
                    error: Arc::from(err),
                })
                .await;
            }
        }
        listeners.len()
    }
}

impl Emitter for Store<EventVariant> {
    fn emit(&self, event: RuntimeEvent) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.dispatch(event).await;
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingEvent;
    use piecework_core::BoxError;

    #[tokio::test]
    async fn test_listeners_matched_by_name_or_option() {
        let by_name = RecordingEvent::new();
        let by_option = RecordingEvent::new();
        let other = RecordingEvent::new();
        let store = EventStore::new();
        store
            .register(EventPiece::new("ready", by_name.clone()))
            .unwrap();
        store
            .register(EventPiece::on("announce", EventKind::Ready, by_option.clone()))
            .unwrap();
        store
            .register(EventPiece::new("log", other.clone()))
            .unwrap();

        assert_eq!(store.dispatch(RuntimeEvent::Ready).await, 2);
        assert_eq!(by_name.kinds(), [EventKind::Ready]);
        assert_eq!(by_option.kinds(), [EventKind::Ready]);
        assert!(other.kinds().is_empty());
    }

    #[tokio::test]
    async fn test_once_listener_fires_once() {
        let recorder = RecordingEvent::new();
        let store = EventStore::new();
        store
            .register(EventPiece::on("first-ready", EventKind::Ready, recorder.clone()).once())
            .unwrap();

        store.emit(RuntimeEvent::Ready).await;
        store.emit(RuntimeEvent::Ready).await;

        assert_eq!(recorder.kinds().len(), 1);
        assert!(!store.get("first-ready").unwrap().is_enabled());
    }

    #[tokio::test]
    async fn test_failing_listener_reports_event_error() {
        let errors = RecordingEvent::new();
        let store = EventStore::new();
        store
            .register(EventPiece::on(
                "broken",
                EventKind::Log,
                |_event: RuntimeEvent| async { Err::<(), BoxError>("listener broke".into()) },
            ))
            .unwrap();
        store
            .register(EventPiece::new("eventError", errors.clone()))
            .unwrap();

        store.emit(RuntimeEvent::Log("hello".into())).await;

        let seen = errors.events();
        assert_eq!(seen.len(), 1);
        match &seen[0] {
            RuntimeEvent::EventError { event, kind, error } => {
                assert_eq!(event.name, "broken");
                assert_eq!(*kind, EventKind::Log);
                assert_eq!(error.to_string(), "listener broke");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failing_error_listener_does_not_recurse() {
        let store = EventStore::new();
        store
            .register(EventPiece::new("eventError", |_event: RuntimeEvent| async {
                Err::<(), BoxError>("still broken".into())
            }))
            .unwrap();

        let ran = store
            .dispatch(RuntimeEvent::EventError {
                event: store.get("eventError").unwrap().info(),
                kind: EventKind::Log,
                error: Arc::from(BoxError::from("first")),
            })
            .await;
        assert_eq!(ran, 1);
    }

    #[tokio::test]
    async fn test_disabled_listener_skipped() {
        let recorder = RecordingEvent::new();
        let store = EventStore::new();
        store
            .register(EventPiece::new("ready", recorder.clone()))
            .unwrap();
        store.disable("ready").unwrap();

        assert_eq!(store.dispatch(RuntimeEvent::Ready).await, 0);
        assert!(recorder.kinds().is_empty());
    }
}

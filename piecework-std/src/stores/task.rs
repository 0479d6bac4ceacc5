use crate::store::Store;
use piecework_core::{BoxError, PieceworkError, StoreError, TaskVariant};
use tracing::{debug, error};

/// Store of tasks.
pub type TaskStore = Store<TaskVariant>;

impl Store<TaskVariant> {
    /// Run the task called `name` with an optional payload.
    ///
    /// Disabled tasks are skipped and report success.
    pub async fn run(&self, name: &str, data: Option<String>) -> Result<(), PieceworkError> {
        let task = self.get(name).ok_or_else(|| StoreError::NotFound {
            store: self.name(),
            name: name.to_string(),
        })?;
        if !task.is_enabled() {
            debug!(task = name, "skipping disabled task");
            return Ok(());
        }
        task.execute(data).await.map_err(|err: BoxError| {
            error!(task = name, error = %err, "task failed");
            PieceworkError::Custom(err)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use piecework_core::TaskPiece;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn test_run_passes_payload() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let store = TaskStore::new();
        let log = seen.clone();
        store
            .register(TaskPiece::new("remind", move |data: Option<String>| {
                log.lock().unwrap().push(data);
                async { Ok::<(), BoxError>(()) }
            }))
            .unwrap();

        store.run("remind", Some("tea".into())).await.unwrap();
        store.run("remind", None).await.unwrap();
        assert_eq!(*seen.lock().unwrap(), [Some("tea".to_string()), None]);
    }

    #[tokio::test]
    async fn test_run_unknown_and_failing() {
        let store = TaskStore::new();
        store
            .register(TaskPiece::new("broken", |_data: Option<String>| async {
                Err::<(), BoxError>("no database".into())
            }))
            .unwrap();

        assert!(matches!(
            store.run("missing", None).await,
            Err(PieceworkError::Store(StoreError::NotFound { .. }))
        ));
        let err = store.run("broken", None).await.unwrap_err();
        assert_eq!(err.to_string(), "no database");
    }
}

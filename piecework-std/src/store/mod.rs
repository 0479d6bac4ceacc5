//! The generic piece registry.
//!
//! A [`Store`] holds the pieces of one variant in insertion order. Lookups
//! are by name; iteration always works on a point-in-time snapshot, so a
//! piece may register or unload others while a pass is in flight without
//! disturbing it.

mod handle;
mod source;

pub use handle::StoreHandle;
pub use source::{DynPieceSource, FnSource, PieceSource};

use futures::{FutureExt, future::join_all};
use piecework_core::{
    BoxError, Piece, PieceInfo, SharedError, StoreError, Variant, contain_panic, panic_message,
};
use std::{
    fmt,
    panic::AssertUnwindSafe,
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};
use tracing::{debug, warn};

struct Entry<V: Variant> {
    piece: Arc<Piece<V>>,
    /// Index into the store's sources; `None` for direct registrations.
    source: Option<usize>,
}

/// A keyed registry of pieces of one variant.
pub struct Store<V: Variant> {
    name: &'static str,
    entries: RwLock<Vec<Entry<V>>>,
    sources: RwLock<Vec<Arc<dyn DynPieceSource<V>>>>,
    defaults: RwLock<V::Options>,
}

/// A piece source that failed during a bulk load.
#[derive(Debug, Clone)]
pub struct LoadFailure {
    /// Description of the source.
    pub origin: String,
    /// What went wrong.
    pub error: SharedError,
}

/// Outcome of [`Store::load_all`].
#[derive(Debug, Clone)]
pub struct LoadReport {
    /// Name of the store that loaded.
    pub store: &'static str,
    /// Pieces that made it into the store.
    pub loaded: Vec<PieceInfo>,
    /// Sources that failed; their pieces are absent.
    pub failed: Vec<LoadFailure>,
}

impl LoadReport {
    /// An empty report for `store`.
    pub fn new(store: &'static str) -> Self {
        Self {
            store,
            loaded: Vec::new(),
            failed: Vec::new(),
        }
    }

    /// Number of pieces loaded successfully.
    pub fn count(&self) -> usize {
        self.loaded.len()
    }

    fn fail(&mut self, origin: String, error: BoxError) {
        warn!(store = self.store, %origin, %error, "failed to load piece");
        self.failed.push(LoadFailure {
            origin,
            error: Arc::from(error),
        });
    }
}

impl fmt::Display for LoadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Loaded {} {}.", self.count(), self.store)
    }
}

impl<V: Variant> Default for Store<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Variant> Store<V> {
    /// Create an empty store named after its variant.
    pub fn new() -> Self {
        Self::named(V::KIND.store_name())
    }

    /// Create an empty store with a custom name.
    pub fn named(name: &'static str) -> Self {
        Self {
            name,
            entries: RwLock::new(Vec::new()),
            sources: RwLock::new(Vec::new()),
            defaults: RwLock::new(V::Options::default()),
        }
    }

    /// Set the default options handed to sources.
    pub fn with_defaults(self, defaults: V::Options) -> Self {
        self.set_defaults(defaults);
        self
    }

    /// Replace the default options handed to sources.
    pub fn set_defaults(&self, defaults: V::Options) {
        *self.defaults.write().unwrap_or_else(PoisonError::into_inner) = defaults;
    }

    /// Default options handed to sources.
    pub fn defaults(&self) -> V::Options {
        self.defaults
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Store name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Insert a piece directly, bypassing sources.
    ///
    /// Directly registered pieces survive [`load_all`](Self::load_all) but
    /// cannot be reloaded.
    pub fn register(&self, piece: Piece<V>) -> Result<Arc<Piece<V>>, StoreError> {
        self.insert(piece)
    }

    /// Look a piece up by name.
    pub fn get(&self, name: &str) -> Option<Arc<Piece<V>>> {
        self.read()
            .iter()
            .find(|entry| entry.piece.name() == name)
            .map(|entry| entry.piece.clone())
    }

    /// Whether a piece with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of registered pieces.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Point-in-time copy of every piece, in insertion order.
    pub fn snapshot(&self) -> Vec<Arc<Piece<V>>> {
        self.read().iter().map(|entry| entry.piece.clone()).collect()
    }

    /// Iterate over a snapshot of every piece, in insertion order.
    ///
    /// Each call takes a new snapshot, so the sequence can be restarted.
    pub fn values(&self) -> impl Iterator<Item = Arc<Piece<V>>> + use<V> {
        self.snapshot().into_iter()
    }

    /// Snapshot of the enabled pieces, in insertion order.
    pub fn enabled(&self) -> Vec<Arc<Piece<V>>> {
        self.values().filter(|piece| piece.is_enabled()).collect()
    }

    /// Summaries of every piece.
    pub fn infos(&self) -> Vec<PieceInfo> {
        self.values().map(|piece| piece.info()).collect()
    }

    /// Enable a piece. Returns `true` if its state changed.
    pub fn enable(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.require(name)?.enable())
    }

    /// Disable a piece. Returns `true` if its state changed.
    pub fn disable(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.require(name)?.disable())
    }

    /// Remove a piece.
    pub fn unload(&self, name: &str) -> Result<Arc<Piece<V>>, StoreError> {
        let mut entries = self.write();
        let position = entries
            .iter()
            .position(|entry| entry.piece.name() == name)
            .ok_or_else(|| self.not_found(name))?;
        let entry = entries.remove(position);
        debug!(store = self.name, piece = name, "piece unloaded");
        Ok(entry.piece)
    }

    /// Remove every piece. Sources stay registered.
    pub fn clear(&self) {
        self.write().clear();
    }

    /// Register a source for [`load_all`](Self::load_all) without loading it.
    pub fn add_source<S: PieceSource<V>>(&self, source: S) {
        self.sources
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(source));
    }

    /// Register a builder function as a source.
    pub fn add_source_fn<F>(&self, origin: impl Into<String>, build: F)
    where
        F: Fn(&V::Options) -> Result<Piece<V>, BoxError> + Send + Sync + 'static,
    {
        self.add_source(FnSource::new(origin, build));
    }

    /// Register a source and load its piece right away.
    ///
    /// The source is only kept when its piece makes it into the store.
    pub async fn load<S: PieceSource<V>>(&self, source: S) -> Result<Arc<Piece<V>>, StoreError> {
        let source: Arc<dyn DynPieceSource<V>> = Arc::new(source);
        let piece = self.produce(source.as_ref()).await?;
        if self.contains(piece.name()) {
            return Err(self.duplicate(piece.name()));
        }
        self.initialize(&piece)?;

        let mut sources = self.sources.write().unwrap_or_else(PoisonError::into_inner);
        let mut entries = self.write();
        let piece = self.push(&mut entries, piece, Some(sources.len()))?;
        sources.push(source);
        Ok(piece)
    }

    /// Re-run every source concurrently and replace all source-loaded pieces.
    ///
    /// One source failing does not stop the others; failures are logged,
    /// reported and left out of the store. The old pieces stay visible until
    /// the new set is swapped in under a single write.
    pub async fn load_all(&self) -> LoadReport {
        let sources = self.sources_snapshot();
        let defaults = self.defaults();
        let results = join_all(
            sources
                .iter()
                .map(|source| contain_panic(source.load_dyn(&defaults))),
        )
        .await;

        let mut report = LoadReport::new(self.name);
        let mut staged = Vec::with_capacity(results.len());
        for (index, (source, result)) in sources.iter().zip(results).enumerate() {
            let initialized = result.and_then(|piece| {
                self.initialize(&piece)
                    .map(|()| piece)
                    .map_err(|error| Box::new(error) as BoxError)
            });
            match initialized {
                Ok(piece) => staged.push((index, piece)),
                Err(error) => report.fail(source.origin_dyn(), error),
            }
        }

        let mut rejected = Vec::new();
        {
            let mut entries = self.write();
            entries.retain(|entry| entry.source.is_none());
            for (index, piece) in staged {
                match self.push(&mut entries, piece, Some(index)) {
                    Ok(piece) => report.loaded.push(piece.info()),
                    Err(error) => rejected.push((index, error)),
                }
            }
        }

        for info in &report.loaded {
            debug!(store = self.name, piece = %info.name, "piece loaded");
        }
        for (index, error) in rejected {
            report.fail(sources[index].origin_dyn(), Box::new(error));
        }
        report
    }

    /// [`load_all`](Self::load_all), with a panic in the store machinery
    /// itself reported as a failure instead of unwinding.
    pub async fn load_all_contained(&self) -> LoadReport {
        match AssertUnwindSafe(self.load_all()).catch_unwind().await {
            Ok(report) => report,
            Err(payload) => {
                let mut report = LoadReport::new(self.name);
                report.fail(self.name.to_string(), panic_message(payload.as_ref()).into());
                report
            }
        }
    }

    /// Replace a piece with a fresh one from its source.
    ///
    /// The new piece takes the old one's position. If the source now fails,
    /// the old piece stays in place.
    pub async fn reload(&self, name: &str) -> Result<Arc<Piece<V>>, StoreError> {
        let index = {
            let entries = self.read();
            let entry = entries
                .iter()
                .find(|entry| entry.piece.name() == name)
                .ok_or_else(|| self.not_found(name))?;
            entry.source.ok_or_else(|| StoreError::NoSource {
                name: name.to_string(),
            })?
        };
        let source = self.sources_snapshot()[index].clone();
        let piece = self.produce(source.as_ref()).await?;
        self.initialize(&piece)?;

        let mut entries = self.write();
        if entries
            .iter()
            .any(|entry| entry.piece.name() == piece.name() && entry.piece.name() != name)
        {
            return Err(self.duplicate(piece.name()));
        }
        let piece = Arc::new(piece);
        let replacement = Entry {
            piece: piece.clone(),
            source: Some(index),
        };
        match entries.iter().position(|entry| entry.piece.name() == name) {
            Some(position) => entries[position] = replacement,
            None => entries.push(replacement),
        }
        debug!(store = self.name, piece = piece.name(), "piece reloaded");
        Ok(piece)
    }

    async fn produce(&self, source: &dyn DynPieceSource<V>) -> Result<Piece<V>, StoreError> {
        let defaults = self.defaults();
        contain_panic(source.load_dyn(&defaults))
            .await
            .map_err(|error| StoreError::Load {
                origin: source.origin_dyn(),
                error,
            })
    }

    fn insert(&self, piece: Piece<V>) -> Result<Arc<Piece<V>>, StoreError> {
        if self.contains(piece.name()) {
            return Err(self.duplicate(piece.name()));
        }
        self.initialize(&piece)?;
        self.push(&mut self.write(), piece, None)
    }

    fn push(
        &self,
        entries: &mut Vec<Entry<V>>,
        piece: Piece<V>,
        source: Option<usize>,
    ) -> Result<Arc<Piece<V>>, StoreError> {
        if entries.iter().any(|entry| entry.piece.name() == piece.name()) {
            return Err(self.duplicate(piece.name()));
        }
        let piece = Arc::new(piece);
        entries.push(Entry {
            piece: piece.clone(),
            source,
        });
        Ok(piece)
    }

    fn initialize(&self, piece: &Piece<V>) -> Result<(), StoreError> {
        V::init(piece).map_err(|error| StoreError::Init {
            name: piece.name().to_string(),
            error,
        })
    }

    fn require(&self, name: &str) -> Result<Arc<Piece<V>>, StoreError> {
        self.get(name).ok_or_else(|| self.not_found(name))
    }

    fn not_found(&self, name: &str) -> StoreError {
        StoreError::NotFound {
            store: self.name,
            name: name.to_string(),
        }
    }

    fn duplicate(&self, name: &str) -> StoreError {
        StoreError::DuplicateName {
            store: self.name,
            name: name.to_string(),
        }
    }

    fn sources_snapshot(&self) -> Vec<Arc<dyn DynPieceSource<V>>> {
        self.sources
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Entry<V>>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Entry<V>>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<V: Variant> fmt::Debug for Store<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("name", &self.name)
            .field("pieces", &self.infos())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{EchoCommand, StaticGuard};
    use piecework_core::{
        CommandOptions, CommandPiece, CommandVariant, Guard, GuardPiece, GuardResult,
        GuardVariant, InitContext, Message,
    };
    use std::sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    fn command(name: &str) -> CommandPiece {
        CommandPiece::new(name, EchoCommand)
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let store = Store::<CommandVariant>::new();
        store.register(command("ping")).unwrap();
        let err = store.register(command("ping")).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateName { store: "commands", .. }));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_values_in_insertion_order() {
        let store = Store::<CommandVariant>::new();
        for name in ["zeta", "alpha", "mid"] {
            store.register(command(name)).unwrap();
        }
        let names: Vec<_> = store.values().map(|p| p.name().to_string()).collect();
        assert_eq!(names, ["zeta", "alpha", "mid"]);
        // Restartable.
        assert_eq!(store.values().count(), 3);
    }

    #[test]
    fn test_enable_disable_are_idempotent() {
        let store = Store::<GuardVariant>::new();
        store
            .register(GuardPiece::new("g", StaticGuard::pass()))
            .unwrap();

        assert!(!store.enable("g").unwrap());
        assert!(store.disable("g").unwrap());
        assert!(!store.disable("g").unwrap());
        assert!(!store.get("g").unwrap().is_enabled());
        assert!(store.enable("g").unwrap());
        assert!(matches!(
            store.disable("missing"),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_load_all_skips_failed_piece() {
        let store = Store::<CommandVariant>::new();
        store.add_source_fn("first", |defaults| {
            Ok(command("first").with_options(defaults.clone()))
        });
        store.add_source_fn("second", |_defaults| Err("syntax error".into()));
        store.add_source_fn("third", |_defaults| Ok(command("third")));

        let report = store.load_all().await;

        assert_eq!(report.count(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].origin, "second");
        assert!(store.get("first").is_some());
        assert!(store.get("third").is_some());
        assert_eq!(report.to_string(), "Loaded 2 commands.");
    }

    #[tokio::test]
    async fn test_load_all_contains_panicking_source() {
        let store = Store::<CommandVariant>::new();
        store.add_source_fn("boom", |_defaults| panic!("bad plugin"));
        store.add_source_fn("ok", |_defaults| Ok(command("ok")));

        let report = store.load_all().await;

        assert_eq!(report.count(), 1);
        assert!(report.failed[0].error.to_string().contains("bad plugin"));
    }

    #[tokio::test]
    async fn test_load_all_replaces_source_pieces_and_keeps_direct_ones() {
        let store = Store::<CommandVariant>::new();
        store.register(command("direct")).unwrap();
        store.add_source_fn("loaded", |_defaults| Ok(command("loaded")));

        assert_eq!(store.load_all().await.count(), 1);
        assert_eq!(store.load_all().await.count(), 1);
        assert_eq!(store.len(), 2);
    }

    /// Records, when initialized, whether `watched` is in the store.
    struct Watcher {
        store: Arc<Store<GuardVariant>>,
        watched: &'static str,
        seen: Arc<Mutex<Vec<bool>>>,
    }

    impl Guard for Watcher {
        async fn run(
            &self,
            _message: Arc<Message>,
            _command: Arc<CommandPiece>,
        ) -> Result<GuardResult, BoxError> {
            Ok(GuardResult::Pass)
        }

        fn init(&self, _ctx: &InitContext<'_>) -> Result<(), BoxError> {
            self.seen.lock().unwrap().push(self.store.contains(self.watched));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_load_all_keeps_old_pieces_visible_until_swap() {
        let store = Arc::new(Store::<GuardVariant>::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (inner, log) = (store.clone(), seen.clone());
        store.add_source_fn("watcher", move |_defaults| {
            Ok(GuardPiece::new(
                "watcher",
                Watcher {
                    store: inner.clone(),
                    watched: "blocker",
                    seen: log.clone(),
                },
            ))
        });
        store.add_source_fn("blocker", |_defaults| {
            Ok(GuardPiece::new("blocker", StaticGuard::silent()))
        });

        assert_eq!(store.load_all().await.count(), 2);
        assert_eq!(store.load_all().await.count(), 2);

        // First pass: nothing loaded yet. Second pass: the previous blocker
        // is still registered while the new pieces initialize.
        assert_eq!(*seen.lock().unwrap(), [false, true]);
        let names: Vec<_> = store.values().map(|p| p.name().to_string()).collect();
        assert_eq!(names, ["watcher", "blocker"]);
    }

    #[tokio::test]
    async fn test_load_all_reports_name_clash_with_direct_piece() {
        let store = Store::<CommandVariant>::new();
        store.register(command("ping")).unwrap();
        store.add_source_fn("clash", |_defaults| Ok(command("ping")));
        store.add_source_fn("pong", |_defaults| Ok(command("pong")));

        let report = store.load_all().await;

        assert_eq!(report.count(), 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].origin, "clash");
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_load_does_not_keep_source() {
        let store = Store::<CommandVariant>::new();
        store.register(command("ping")).unwrap();

        let err = store
            .load(FnSource::new("dup", |_defaults: &CommandOptions| {
                Ok::<_, BoxError>(command("ping"))
            }))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateName { .. }));

        let err = store
            .load(FnSource::new("broken", |_defaults: &CommandOptions| {
                Err::<CommandPiece, BoxError>("syntax error".into())
            }))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Load { .. }));

        let report = store.load_all().await;
        assert!(report.failed.is_empty());
        assert_eq!(report.count(), 0);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_sources_receive_defaults() {
        let store = Store::<CommandVariant>::new().with_defaults(CommandOptions {
            permission_level: 6,
            ..CommandOptions::default()
        });
        store.add_source_fn("admin", |defaults| {
            Ok(command("admin").with_options(defaults.clone()))
        });
        store.load_all().await;
        assert_eq!(store.get("admin").unwrap().options().permission_level, 6);
    }

    #[tokio::test]
    async fn test_reload_replaces_wholesale() {
        let builds = Arc::new(AtomicUsize::new(0));
        let store = Store::<CommandVariant>::new();
        store.register(command("before")).unwrap();
        let counter = builds.clone();
        store
            .load(FnSource::new("counted", move |_defaults: &CommandOptions| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, BoxError>(command("counted"))
            }))
            .await
            .unwrap();
        store.register(command("after")).unwrap();

        let old = store.get("counted").unwrap();
        old.disable();
        let new = store.reload("counted").await.unwrap();

        assert_eq!(builds.load(Ordering::SeqCst), 2);
        assert!(new.is_enabled());
        assert!(!Arc::ptr_eq(&old, &new));
        let names: Vec<_> = store.values().map(|p| p.name().to_string()).collect();
        assert_eq!(names, ["before", "counted", "after"]);
    }

    #[tokio::test]
    async fn test_reload_requires_source() {
        let store = Store::<CommandVariant>::new();
        store.register(command("direct")).unwrap();
        assert!(matches!(
            store.reload("direct").await,
            Err(StoreError::NoSource { .. })
        ));
    }

    #[test]
    fn test_unload() {
        let store = Store::<CommandVariant>::new();
        store.register(command("gone")).unwrap();
        assert_eq!(store.unload("gone").unwrap().name(), "gone");
        assert!(store.is_empty());
        assert!(store.unload("gone").is_err());
    }
}

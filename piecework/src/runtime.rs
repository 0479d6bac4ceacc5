//! The runtime host: stores, plugins, startup and message intake.
//!
//! ```rust,ignore
//! let runtime = RuntimeBuilder::new(RuntimeConfig::from_path("piecework.toml")?)
//!     .plugin(|runtime: &Runtime| {
//!         runtime.commands().add_source_fn("ping", |defaults| {
//!             Ok(CommandPiece::new("ping", ping).with_options(defaults.clone()))
//!         });
//!         Ok::<_, BoxError>(())
//!     })
//!     .build()?;
//!
//! runtime.start().await;
//! runtime.handle_message(runtime.message("!ping", author, channel)).await;
//! ```

use crate::{
    builtins::{self, Cooldowns},
    config::RuntimeConfig,
    parser::PrefixParser,
    permissions::{OwnerSet, PermissionLevels},
};
use futures::future::join_all;
use piecework_core::{
    Author, BoxError, Channel, Message, PieceInfo, PieceworkError, RuntimeEvent, Settings,
    SharedError, Stopwatch, StoreError,
};
use piecework_std::{
    store::{LoadReport, StoreHandle},
    stores::{
        CommandStore, EventStore, FilterReport, FilterStore, FinalizerStore, GuardStore, TaskStore,
    },
};
use std::sync::{
    Arc, PoisonError, RwLock,
    atomic::{AtomicBool, Ordering},
};
use thiserror::Error;
use tracing::{debug, info, trace};

/// Errors raised while building a [`Runtime`].
#[derive(Error, Debug)]
pub enum BuildError {
    /// A plugin's install hook failed.
    #[error("plugin `{name}` failed to install")]
    Plugin {
        /// Plugin name.
        name: String,
        /// Underlying failure.
        #[source]
        error: BoxError,
    },
}

/// An extension installed into a runtime while it is built.
///
/// Plugins usually add piece sources or custom stores. Closures taking
/// `&Runtime` are plugins too.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a `Plugin`",
    label = "missing `Plugin` implementation",
    note = "Plugins must implement `install(&Runtime)`, or be a closure `Fn(&Runtime) -> Result<(), BoxError>`."
)]
pub trait Plugin: Send + Sync + 'static {
    /// Name used in logs and errors.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Add whatever the plugin provides.
    fn install(&self, runtime: &Runtime) -> Result<(), BoxError>;
}

impl<F> Plugin for F
where
    F: Fn(&Runtime) -> Result<(), BoxError> + Send + Sync + 'static,
{
    fn install(&self, runtime: &Runtime) -> Result<(), BoxError> {
        (self)(runtime)
    }
}

/// Builds a [`Runtime`].
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    plugins: Vec<Box<dyn Plugin>>,
    settings: Option<Arc<dyn Settings>>,
    permission_levels: PermissionLevels,
}

impl RuntimeBuilder {
    /// Start from a configuration.
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            config,
            plugins: Vec::new(),
            settings: None,
            permission_levels: PermissionLevels::default(),
        }
    }

    /// Add a plugin. Plugins install in the order they were added, after
    /// the built-in pieces.
    pub fn plugin<P: Plugin>(mut self, plugin: P) -> Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    /// Replace the settings accessor derived from the configuration.
    pub fn settings(mut self, settings: Arc<dyn Settings>) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Replace the default permission levels.
    pub fn permission_levels(mut self, levels: PermissionLevels) -> Self {
        self.permission_levels = levels;
        self
    }

    /// Create the stores, install the built-ins, then every plugin.
    pub fn build(self) -> Result<Arc<Runtime>, BuildError> {
        let config = self.config;
        let defaults = &config.piece_defaults;

        let commands = Arc::new(CommandStore::new().with_defaults(defaults.commands.clone()));
        let events = Arc::new(EventStore::new().with_defaults(defaults.events.clone()));
        let filters = Arc::new(FilterStore::new().with_defaults(defaults.filters.clone()));
        let guards = Arc::new(GuardStore::new().with_defaults(defaults.guards.clone()));
        let finalizers = Arc::new(FinalizerStore::new());
        let tasks = Arc::new(TaskStore::new());

        let stores: Vec<Arc<dyn StoreHandle>> = vec![
            commands.clone(),
            events.clone(),
            filters.clone(),
            guards.clone(),
            finalizers.clone(),
            tasks.clone(),
        ];

        let runtime = Runtime {
            settings: self
                .settings
                .unwrap_or_else(|| Arc::new(config.static_settings())),
            parser: Arc::new(PrefixParser::from_config(&config)),
            owners: OwnerSet::new(config.owners.iter().cloned()),
            permission_levels: Arc::new(self.permission_levels),
            cooldowns: Cooldowns::new(),
            commands,
            events,
            filters,
            guards,
            finalizers,
            tasks,
            stores: RwLock::new(stores),
            ready: AtomicBool::new(false),
            config,
        };

        builtins::install(&runtime);
        for plugin in &self.plugins {
            plugin.install(&runtime).map_err(|error| BuildError::Plugin {
                name: plugin.name().to_string(),
                error,
            })?;
            debug!(plugin = plugin.name(), "plugin installed");
        }

        Ok(Arc::new(runtime))
    }
}

/// Result of [`Runtime::start`].
#[derive(Debug, Clone)]
pub struct StartupReport {
    /// One report per store, in store registration order.
    pub stores: Vec<LoadReport>,
    /// Time spent loading.
    pub elapsed: Stopwatch,
}

impl StartupReport {
    /// Pieces loaded across every store.
    pub fn total(&self) -> usize {
        self.stores.iter().map(LoadReport::count).sum()
    }

    /// Sources that failed across every store.
    pub fn failures(&self) -> usize {
        self.stores.iter().map(|report| report.failed.len()).sum()
    }

    /// The report of one store.
    pub fn store(&self, name: &str) -> Option<&LoadReport> {
        self.stores.iter().find(|report| report.store == name)
    }
}

/// Hosts every store and feeds messages through the filters.
pub struct Runtime {
    config: RuntimeConfig,
    commands: Arc<CommandStore>,
    events: Arc<EventStore>,
    filters: Arc<FilterStore>,
    guards: Arc<GuardStore>,
    finalizers: Arc<FinalizerStore>,
    tasks: Arc<TaskStore>,
    stores: RwLock<Vec<Arc<dyn StoreHandle>>>,
    owners: OwnerSet,
    permission_levels: Arc<PermissionLevels>,
    settings: Arc<dyn Settings>,
    parser: Arc<PrefixParser>,
    cooldowns: Cooldowns,
    ready: AtomicBool,
}

impl Runtime {
    /// Shortcut for [`RuntimeBuilder::new`].
    pub fn builder(config: RuntimeConfig) -> RuntimeBuilder {
        RuntimeBuilder::new(config)
    }

    /// Load every store concurrently, report the results and become ready.
    ///
    /// A store that fails as a whole is reported like a failed source; the
    /// other stores still load.
    pub async fn start(&self) -> StartupReport {
        let mut elapsed = Stopwatch::start();
        let handles = self.store_handles();
        let stores = join_all(handles.iter().map(|store| store.load_all())).await;
        elapsed.stop();

        for report in &stores {
            for piece in &report.loaded {
                self.emit(RuntimeEvent::PieceLoaded(piece.clone())).await;
            }
            for failure in &report.failed {
                self.emit(RuntimeEvent::PieceLoadFailed {
                    store: report.store,
                    origin: failure.origin.clone(),
                    error: failure.error.clone(),
                })
                .await;
            }
        }

        for report in &stores {
            debug!(
                store = report.store,
                loaded = report.count(),
                failed = report.failed.len(),
                "store loaded"
            );
            self.emit(RuntimeEvent::Log(report.to_string())).await;
        }
        self.emit(RuntimeEvent::Log(format!("Loaded in {elapsed}."))).await;

        self.ready.store(true, Ordering::SeqCst);
        info!(pieces = stores.iter().map(LoadReport::count).sum::<usize>(), "runtime ready");
        self.emit(RuntimeEvent::Log(self.config.ready_message.clone())).await;
        self.emit(RuntimeEvent::Ready).await;

        StartupReport { stores, elapsed }
    }

    /// Whether [`start`](Self::start) has completed.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Feed one inbound message through the filters.
    ///
    /// Messages arriving before the runtime is ready are dropped and yield
    /// `None`. The invocation is parsed here unless the transport already
    /// attached one.
    pub async fn handle_message(&self, message: Message) -> Option<FilterReport> {
        if !self.is_ready() {
            trace!("runtime not ready, dropping message");
            return None;
        }

        let message = if message.invocation.is_some() {
            message
        } else {
            match self.parser.parse(&message) {
                Some(invocation) => message.with_invocation(invocation),
                None => message,
            }
        };
        let message = Arc::new(message);

        let report = self.filters.run(&message).await;
        for fault in &report.faults {
            self.emit(RuntimeEvent::FilterError {
                message: message.clone(),
                filter: fault.filter.clone(),
                error: fault.error.clone(),
            })
            .await;
        }
        Some(report)
    }

    /// Build a message with the runtime's settings accessor.
    pub fn message(
        &self,
        content: impl Into<String>,
        author: Author,
        channel: Arc<dyn Channel>,
    ) -> Message {
        Message::new(content, author, channel, self.settings.clone())
    }

    /// Deliver an event to its listeners. Returns how many ran.
    pub async fn emit(&self, event: RuntimeEvent) -> usize {
        self.events.dispatch(event).await
    }

    /// Run a task by name, reporting a failure as `taskError`.
    pub async fn run_task(&self, name: &str, data: Option<String>) -> Result<(), PieceworkError> {
        match self.tasks.run(name, data).await {
            Err(PieceworkError::Custom(err)) => {
                let error: SharedError = Arc::from(err);
                if let Some(task) = self.tasks.get(name) {
                    self.emit(RuntimeEvent::TaskError {
                        task: task.info(),
                        error: error.clone(),
                    })
                    .await;
                }
                Err(PieceworkError::Custom(Box::new(error)))
            }
            other => other,
        }
    }

    // ========================================================================
    // Stores
    // ========================================================================

    /// Add a custom store. Names must be unique.
    pub fn register_store(&self, store: Arc<dyn StoreHandle>) -> Result<(), StoreError> {
        let mut stores = self.stores.write().unwrap_or_else(PoisonError::into_inner);
        if stores.iter().any(|existing| existing.name() == store.name()) {
            return Err(StoreError::DuplicateName {
                store: "runtime",
                name: store.name().to_string(),
            });
        }
        debug!(store = store.name(), "store registered");
        stores.push(store);
        Ok(())
    }

    /// Remove a store by name.
    pub fn unregister_store(&self, name: &str) -> Option<Arc<dyn StoreHandle>> {
        let mut stores = self.stores.write().unwrap_or_else(PoisonError::into_inner);
        let position = stores.iter().position(|store| store.name() == name)?;
        Some(stores.remove(position))
    }

    /// Look a store up by name.
    pub fn store(&self, name: &str) -> Option<Arc<dyn StoreHandle>> {
        self.stores
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|store| store.name() == name)
            .cloned()
    }

    /// Names of every registered store.
    pub fn store_names(&self) -> Vec<&'static str> {
        self.store_handles().iter().map(|store| store.name()).collect()
    }

    fn store_handles(&self) -> Vec<Arc<dyn StoreHandle>> {
        self.stores
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn require_store(&self, name: &str) -> Result<Arc<dyn StoreHandle>, StoreError> {
        self.store(name)
            .ok_or_else(|| StoreError::UnknownStore(name.to_string()))
    }

    // ========================================================================
    // Piece administration
    // ========================================================================

    /// Enable a piece. Emits `pieceEnabled` when its state changed.
    pub async fn enable(&self, store: &str, piece: &str) -> Result<bool, StoreError> {
        let store = self.require_store(store)?;
        let changed = store.enable(piece)?;
        if changed {
            self.announce(store.info(piece), RuntimeEvent::PieceEnabled)
                .await;
        }
        Ok(changed)
    }

    /// Disable a piece. Emits `pieceDisabled` when its state changed.
    pub async fn disable(&self, store: &str, piece: &str) -> Result<bool, StoreError> {
        let store = self.require_store(store)?;
        let changed = store.disable(piece)?;
        if changed {
            self.announce(store.info(piece), RuntimeEvent::PieceDisabled)
                .await;
        }
        Ok(changed)
    }

    /// Remove a piece. Emits `pieceUnloaded`.
    pub async fn unload(&self, store: &str, piece: &str) -> Result<PieceInfo, StoreError> {
        let info = self.require_store(store)?.unload(piece)?;
        self.announce(Some(info.clone()), RuntimeEvent::PieceUnloaded)
            .await;
        Ok(info)
    }

    /// Replace a piece from its source. Emits `pieceReloaded`.
    pub async fn reload(&self, store: &str, piece: &str) -> Result<PieceInfo, StoreError> {
        let info = self.require_store(store)?.reload(piece).await?;
        self.announce(Some(info.clone()), RuntimeEvent::PieceReloaded)
            .await;
        Ok(info)
    }

    async fn announce(&self, info: Option<PieceInfo>, event: fn(PieceInfo) -> RuntimeEvent) {
        let Some(info) = info else { return };
        debug!(piece = %info.name, kind = %info.kind, "piece state changed");
        self.emit(event(info)).await;
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// The configuration the runtime was built from.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Command store.
    pub fn commands(&self) -> &Arc<CommandStore> {
        &self.commands
    }

    /// Event store.
    pub fn events(&self) -> &Arc<EventStore> {
        &self.events
    }

    /// Filter store.
    pub fn filters(&self) -> &Arc<FilterStore> {
        &self.filters
    }

    /// Guard store.
    pub fn guards(&self) -> &Arc<GuardStore> {
        &self.guards
    }

    /// Finalizer store.
    pub fn finalizers(&self) -> &Arc<FinalizerStore> {
        &self.finalizers
    }

    /// Task store.
    pub fn tasks(&self) -> &Arc<TaskStore> {
        &self.tasks
    }

    /// Owner ids.
    pub fn owners(&self) -> &OwnerSet {
        &self.owners
    }

    /// Permission levels used by the `permissions` guard.
    pub fn permission_levels(&self) -> &Arc<PermissionLevels> {
        &self.permission_levels
    }

    /// Settings accessor handed to messages built by [`message`](Self::message).
    pub fn settings(&self) -> &Arc<dyn Settings> {
        &self.settings
    }

    /// Prefix parser.
    pub fn parser(&self) -> &Arc<PrefixParser> {
        &self.parser
    }

    /// Cooldown buckets.
    pub fn cooldowns(&self) -> &Cooldowns {
        &self.cooldowns
    }
}

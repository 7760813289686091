// ── Application context ──
//
// Owns one StateStore, one DataRegistry, one RuleEngine, and the
// background tasks that drive component bindings.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures_util::StreamExt;
use pagewire_api::TextClient;
use pagewire_api::transport::{TlsMode, TransportConfig};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{ContextConfig, HttpSettings, SourceConfig, TlsVerification};
use crate::data::{DataRegistry, DataState, HttpTextSource, StaticListingSource};
use crate::engine::{ActionHandler, DispatchReport, RuleEngine};
use crate::error::CoreError;
use crate::model::{Binding, Event, Value};
use crate::store::StateStore;
use crate::stream::DataStateStream;

/// StateStore key suffixes written by binding watchers.
pub mod status_keys {
    pub const STATUS: &str = "status";
    pub const COUNT: &str = "count";
    pub const ERROR: &str = "error";
}

const SETTLE_POLL: Duration = Duration::from_millis(10);

// ── AppContext ───────────────────────────────────────────────────

/// Explicitly constructed handle tying the reactive pieces together.
///
/// Cheaply cloneable via `Arc<ContextInner>`. Nothing runs in the
/// background until [`start()`](Self::start); [`shutdown()`](Self::shutdown)
/// cancels and joins every binding task.
#[derive(Clone)]
pub struct AppContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    config: ContextConfig,
    store: Arc<StateStore>,
    registry: Arc<DataRegistry>,
    engine: Arc<RuleEngine>,
    bindings: Mutex<Vec<Binding>>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
    started: Mutex<bool>,
}

impl AppContext {
    /// Build the store, registry, and engine, and register every source
    /// in `config`. Does NOT spawn anything -- call [`start()`](Self::start).
    pub fn new(config: ContextConfig, handler: Arc<dyn ActionHandler>) -> Result<Self, CoreError> {
        let store = Arc::new(StateStore::new());
        let registry = Arc::new(DataRegistry::with_overlap(config.overlap));
        let engine = Arc::new(RuleEngine::new(
            Arc::clone(&store),
            Arc::clone(&registry),
            handler,
        ));

        register_sources(&registry, &config)?;

        Ok(Self {
            inner: Arc::new(ContextInner {
                bindings: Mutex::new(config.bindings.clone()),
                config,
                store,
                registry,
                engine,
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
                started: Mutex::new(false),
            }),
        })
    }

    pub fn config(&self) -> &ContextConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<StateStore> {
        &self.inner.store
    }

    pub fn registry(&self) -> &Arc<DataRegistry> {
        &self.inner.registry
    }

    pub fn engine(&self) -> &Arc<RuleEngine> {
        &self.inner.engine
    }

    pub fn bindings(&self) -> Vec<Binding> {
        lock(&self.inner.bindings).clone()
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Record a binding. On a started context its tasks are spawned
    /// immediately.
    pub fn bind(&self, binding: Binding) -> Result<(), CoreError> {
        // Held until the binding is recorded so `start` cannot spawn it again.
        let started = lock(&self.inner.started);
        if *started {
            let handle = runtime("bind")?;
            self.spawn_binding_tasks(&handle, &binding);
        }
        debug!(component = %binding.component, source = %binding.source, "binding added");
        lock(&self.inner.bindings).push(binding);
        drop(started);
        Ok(())
    }

    /// Spawn the watcher and refresh tasks of every binding. Calling it
    /// again is a no-op.
    pub fn start(&self) -> Result<(), CoreError> {
        let handle = runtime("start")?;
        let mut started = lock(&self.inner.started);
        if *started {
            debug!("context already started");
            return Ok(());
        }
        *started = true;

        let bindings = self.bindings();
        for binding in &bindings {
            self.spawn_binding_tasks(&handle, binding);
        }
        drop(started);
        info!(bindings = bindings.len(), "context started");
        Ok(())
    }

    /// Cancel background tasks and wait for them to finish. In-flight
    /// loads are not cancelled; they settle on their own.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let handles: Vec<JoinHandle<()>> = lock(&self.inner.task_handles).drain(..).collect();
        for handle in handles {
            let _ = handle.await;
        }
        info!("context shut down");
    }

    // ── Dispatch ─────────────────────────────────────────────────

    /// Refresh on-enter-page bindings for `OnEnterPage` events, then run
    /// the event through the rule engine.
    pub fn emit(&self, event: &Event) -> DispatchReport {
        if let Event::OnEnterPage { path } = event {
            for binding in self.bindings() {
                if binding.refreshes_on_enter(path.as_deref()) {
                    debug!(component = %binding.component, "page entered, refreshing binding");
                    if let Err(e) = self.inner.registry.refresh(&binding.source) {
                        warn!(component = %binding.component, error = %e, "binding refresh failed");
                    }
                }
            }
        }
        self.inner.engine.emit(event)
    }

    /// Wait until no source is loading and every binding has published the
    /// current state of its source. Returns `false` if `limit` elapsed first.
    pub async fn wait_settled(&self, limit: Duration) -> bool {
        tokio::time::timeout(limit, async {
            loop {
                if self.is_settled() {
                    // One more poll lets a rule-triggered refetch show up.
                    tokio::time::sleep(SETTLE_POLL).await;
                    if self.is_settled() {
                        return;
                    }
                }
                tokio::time::sleep(SETTLE_POLL).await;
            }
        })
        .await
        .is_ok()
    }

    fn is_settled(&self) -> bool {
        let registry = &self.inner.registry;
        registry.is_settled()
            && self.bindings().iter().all(|binding| {
                match registry.current(&binding.source) {
                    DataState::Idle => true,
                    state => {
                        self.inner.store.get(&binding.state_key(status_keys::STATUS))
                            == Some(Value::from(state.phase()))
                    }
                }
            })
    }

    // ── Private helpers ──────────────────────────────────────────

    #[cfg(test)]
    fn task_count(&self) -> usize {
        lock(&self.inner.task_handles).len()
    }

    fn spawn_binding_tasks(&self, handle: &Handle, binding: &Binding) {
        let mut handles = lock(&self.inner.task_handles);

        // Subscribe before spawning so no transition is missed.
        let states = self.inner.registry.state_of(&binding.source);
        handles.push(handle.spawn(binding_watch_task(
            states,
            Arc::clone(&self.inner.store),
            Arc::clone(&self.inner.engine),
            binding.clone(),
            self.inner.cancel.clone(),
        )));

        if let Some(period) = binding.refresh.interval() {
            handles.push(handle.spawn(interval_refresh_task(
                Arc::clone(&self.inner.registry),
                binding.source.clone(),
                period,
                self.inner.cancel.clone(),
            )));
        }
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Mirror a binding's source state into the StateStore and emit load
/// events on every settled transition. The state current at subscription
/// is published first, so a binding added after a load still reports it.
async fn binding_watch_task(
    states: DataStateStream,
    store: Arc<StateStore>,
    engine: Arc<RuleEngine>,
    binding: Binding,
    cancel: CancellationToken,
) {
    let mut states = states.into_stream();
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = states.next() => {
                let Some(state) = next else { break };
                if let Some(event) = publish_state(&store, &binding, &state) {
                    let report = engine.emit(&event);
                    debug!(
                        %event,
                        matched = report.matched.len(),
                        failures = report.failures.len(),
                        "load event dispatched"
                    );
                }
            }
        }
    }
}

/// Periodically refresh a bound source.
async fn interval_refresh_task(
    registry: Arc<DataRegistry>,
    source: String,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(period);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                if let Err(e) = registry.refresh(&source) {
                    warn!(source = %source, error = %e, "periodic refresh failed");
                }
            }
        }
    }
}

/// Write `<component>.status` (plus count or error) and return the load
/// event to emit, if the state is terminal.
fn publish_state(store: &StateStore, binding: &Binding, state: &DataState) -> Option<Event> {
    let status = binding.state_key(status_keys::STATUS);
    let count = binding.state_key(status_keys::COUNT);
    let error = binding.state_key(status_keys::ERROR);
    let path = Some(binding.component.clone());

    match state {
        DataState::Idle => None,
        DataState::Loading => {
            store.set(status, state.phase());
            None
        }
        DataState::Success(_) | DataState::Empty(_) => {
            let rows = state.rows().map_or(0, |rows| rows.len());
            store.update(|map| {
                map.remove(&error);
                map.insert(status, Value::from(state.phase()));
                map.insert(count, Value::from(rows));
            });
            Some(Event::OnLoadSuccess { path })
        }
        DataState::Error(err) => {
            store.set_all([
                (status, Value::from(state.phase())),
                (error, Value::from(err.to_string())),
            ]);
            Some(Event::OnLoadError { path })
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────

fn register_sources(registry: &DataRegistry, config: &ContextConfig) -> Result<(), CoreError> {
    let mut client: Option<TextClient> = None;

    for source in &config.sources {
        match source {
            SourceConfig::Http {
                id,
                url,
                separator,
                token,
            } => {
                let client = match &client {
                    Some(c) => c.clone(),
                    None => {
                        let built = TextClient::new(&build_transport(&config.http))?;
                        client = Some(built.clone());
                        built
                    }
                };
                let mut http = HttpTextSource::new(client, url.clone()).with_separator(*separator);
                if let Some(token) = token {
                    http = http.with_token(token.clone());
                }
                registry.register(id.clone(), http);
            }
            SourceConfig::Listing {
                id,
                files,
                base_url,
            } => {
                let mut listing = StaticListingSource::new(files.iter().cloned());
                if let Some(base) = base_url {
                    listing = listing.with_base_url(base.clone());
                }
                registry.register(id.clone(), listing);
            }
        }
    }
    Ok(())
}

/// Build a [`TransportConfig`] from the context's HTTP settings.
fn build_transport(http: &HttpSettings) -> TransportConfig {
    TransportConfig {
        tls: tls_to_transport(&http.tls),
        connect_timeout: http.connect_timeout,
        timeout: http.timeout,
    }
}

fn tls_to_transport(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}

fn runtime(operation: &str) -> Result<Handle, CoreError> {
    Handle::try_current().map_err(|_| CoreError::NoRuntime {
        operation: operation.to_owned(),
    })
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::data::{LoadError, source_fn};
    use crate::engine::{NoopHandler, RecordingHandler};
    use crate::model::{Action, RefreshPolicy, Row, Rule};

    fn context(config: ContextConfig) -> AppContext {
        AppContext::new(config, Arc::new(NoopHandler)).unwrap()
    }

    fn rows(n: usize) -> Vec<Row> {
        (0..n)
            .map(|i| Row::new().with("label", format!("item {i}")))
            .collect()
    }

    #[tokio::test]
    async fn listing_sources_are_registered_from_config() {
        let ctx = context(ContextConfig {
            sources: vec![SourceConfig::Listing {
                id: "media".into(),
                files: vec!["a.mp4".into()],
                base_url: None,
            }],
            ..ContextConfig::default()
        });
        assert!(ctx.registry().is_registered("media"));
        ctx.registry().refresh("media").unwrap().await.unwrap();
        assert_eq!(ctx.registry().current("media").rows().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn load_success_publishes_status_and_emits_event() {
        let ctx = context(ContextConfig::default());
        ctx.registry()
            .register("news", source_fn(|| async { Ok(rows(3)) }));
        ctx.bind(Binding::new("home.news", "news")).unwrap();
        ctx.engine().set_rules(vec![
            Rule::new("onLoadSuccess")
                .when("${home.news.count} > 2")
                .then(Action::set_var("news.ready", true)),
        ]);
        ctx.start().unwrap();

        ctx.registry().refresh("news").unwrap();
        assert!(ctx.wait_settled(Duration::from_secs(2)).await);

        let store = ctx.store();
        assert_eq!(store.get("home.news.status"), Some(Value::from("success")));
        assert_eq!(store.get("home.news.count"), Some(Value::from(3_u32)));
        assert_eq!(store.get("news.ready"), Some(Value::Bool(true)));
        ctx.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_bind_and_start_spawn_each_watcher_once() {
        for _ in 0..20 {
            let ctx = context(ContextConfig::default());
            let binders: Vec<_> = (0..8)
                .map(|i| {
                    let ctx = ctx.clone();
                    tokio::spawn(async move {
                        ctx.bind(Binding::new(format!("page.c{i}"), "news")).unwrap();
                    })
                })
                .collect();
            ctx.start().unwrap();
            for binder in binders {
                binder.await.unwrap();
            }

            assert_eq!(ctx.bindings().len(), 8);
            assert_eq!(ctx.task_count(), 8);
            ctx.shutdown().await;
        }
    }

    #[tokio::test]
    async fn recovery_clears_the_error_in_one_notification() {
        let store = StateStore::new();
        let binding = Binding::new("home.news", "news");
        publish_state(
            &store,
            &binding,
            &DataState::Error(LoadError::source_failure("offline")),
        );
        let mut stream = store.subscribe();

        let event = publish_state(&store, &binding, &DataState::Success(Arc::new(rows(2))));
        assert_eq!(
            event,
            Some(Event::OnLoadSuccess {
                path: Some("home.news".into())
            })
        );

        let snap = stream.changed().await.unwrap();
        assert_eq!(snap.get("home.news.status"), Some(&Value::from("success")));
        assert_eq!(snap.get("home.news.count"), Some(&Value::from(2_u32)));
        assert!(!snap.contains_key("home.news.error"));
        let pending = tokio::time::timeout(Duration::from_millis(20), stream.changed()).await;
        assert!(pending.is_err());
    }

    #[tokio::test]
    async fn load_failure_emits_error_event() {
        let ctx = context(ContextConfig::default());
        ctx.registry().register(
            "news",
            source_fn(|| async { Err(LoadError::source_failure("offline")) }),
        );
        ctx.bind(Binding::new("home.news", "news")).unwrap();
        ctx.engine().set_rules(vec![
            Rule::new("onLoadError").then(Action::set_var("news.failed", true)),
        ]);
        ctx.start().unwrap();

        ctx.registry().refresh("news").unwrap();
        assert!(ctx.wait_settled(Duration::from_secs(2)).await);

        let store = ctx.store();
        assert_eq!(store.get("home.news.status"), Some(Value::from("error")));
        assert_eq!(store.get("home.news.error"), Some(Value::from("offline")));
        assert_eq!(store.get("news.failed"), Some(Value::Bool(true)));
        ctx.shutdown().await;
    }

    #[tokio::test]
    async fn enter_page_refreshes_matching_bindings_only() {
        let ctx = context(ContextConfig::default());
        let home_calls = Arc::new(AtomicUsize::new(0));
        let shop_calls = Arc::new(AtomicUsize::new(0));
        for (id, calls) in [("home-feed", &home_calls), ("shop-feed", &shop_calls)] {
            let calls = Arc::clone(calls);
            ctx.registry().register(
                id,
                source_fn(move || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Ok(rows(1)) }
                }),
            );
        }
        ctx.bind(Binding::new("home.feed", "home-feed").with_refresh(RefreshPolicy::OnEnterPage))
            .unwrap();
        ctx.bind(Binding::new("shop.feed", "shop-feed").with_refresh(RefreshPolicy::OnEnterPage))
            .unwrap();
        ctx.start().unwrap();

        ctx.emit(&Event::OnEnterPage {
            path: Some("home".into()),
        });
        assert!(ctx.wait_settled(Duration::from_secs(2)).await);
        assert_eq!(home_calls.load(Ordering::SeqCst), 1);
        assert_eq!(shop_calls.load(Ordering::SeqCst), 0);

        ctx.emit(&Event::OnEnterPage { path: None });
        assert!(ctx.wait_settled(Duration::from_secs(2)).await);
        assert_eq!(home_calls.load(Ordering::SeqCst), 2);
        assert_eq!(shop_calls.load(Ordering::SeqCst), 1);
        ctx.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn interval_binding_refreshes_until_shutdown() {
        let ctx = context(ContextConfig::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let source_calls = Arc::clone(&calls);
        ctx.registry().register(
            "clock",
            source_fn(move || {
                source_calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(rows(1)) }
            }),
        );
        ctx.bind(
            Binding::new("home.clock", "clock").with_refresh(RefreshPolicy::Interval { secs: 5 }),
        )
        .unwrap();
        ctx.start().unwrap();

        // First tick is skipped.
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(ctx.wait_settled(Duration::from_secs(1)).await);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        ctx.shutdown().await;
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn refetch_rule_on_load_success_chains_sources() {
        let handler = Arc::new(RecordingHandler::new());
        let ctx = AppContext::new(ContextConfig::default(), Arc::clone(&handler) as _).unwrap();
        ctx.registry()
            .register("first", source_fn(|| async { Ok(rows(1)) }));
        ctx.registry()
            .register("second", source_fn(|| async { Ok(rows(2)) }));
        ctx.bind(Binding::new("a.first", "first")).unwrap();
        ctx.bind(Binding::new("b.second", "second")).unwrap();
        ctx.engine().set_rules(vec![
            Rule::new("onLoadSuccess")
                .when("${chain.pending} == true")
                .then(Action::set_var("chain.pending", false))
                .then(Action::Refetch {
                    source: "second".into(),
                }),
            Rule::new("onLoadSuccess")
                .when("${b.second.count} == 2")
                .then(Action::ShowBanner {
                    text: "all loaded".into(),
                }),
        ]);
        ctx.store().set("chain.pending", true);
        ctx.start().unwrap();

        ctx.registry().refresh("first").unwrap();
        assert!(ctx.wait_settled(Duration::from_secs(2)).await);
        assert_eq!(
            ctx.store().get("b.second.status"),
            Some(Value::from("success"))
        );
        assert_eq!(handler.calls().len(), 1);
        ctx.shutdown().await;
    }

    #[tokio::test]
    async fn binding_added_after_a_load_publishes_it() {
        let ctx = context(ContextConfig::default());
        ctx.registry()
            .register("news", source_fn(|| async { Ok(rows(2)) }));
        ctx.engine().set_rules(vec![
            Rule::new("onLoadSuccess").then(Action::set_var("news.seen", true)),
        ]);
        ctx.start().unwrap();
        ctx.registry().refresh("news").unwrap().await.unwrap();

        ctx.bind(Binding::new("home.news", "news")).unwrap();
        assert!(ctx.wait_settled(Duration::from_secs(2)).await);

        let store = ctx.store();
        assert_eq!(store.get("home.news.status"), Some(Value::from("success")));
        assert_eq!(store.get("home.news.count"), Some(Value::from(2_u32)));
        assert_eq!(store.get("news.seen"), Some(Value::Bool(true)));
        ctx.shutdown().await;
    }

    #[test]
    fn start_requires_a_runtime() {
        let ctx = context(ContextConfig::default());
        assert!(matches!(ctx.start(), Err(CoreError::NoRuntime { .. })));
    }
}

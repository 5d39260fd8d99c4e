//! The controller task.

mod handle;

use std::sync::Arc;

use handle::Command;
pub use handle::ControllerHandle;
use oxvgui_core::{
    CompressionMode, Dimensions, Fingerprint, KeyValueStore, ResultCache, ResultValue, Settings,
};
use oxvgui_worker::{Endpoint, OptimizationQueue, WorkerError, WorkerRequest, WorkerResponse};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::presenter::{Presentation, Presenter};
use crate::resolver::{JobRaceResolver, JobToken};
use crate::{ControllerConfig, Failure, FailureKind, TRACING_TARGET_CONTROLLER};

/// Store key holding the last applied settings.
pub const SETTINGS_KEY: &str = "settings";

/// Store key holding the last application version the user has seen.
pub const LAST_SEEN_VERSION_KEY: &str = "last-seen-version";

/// The document currently loaded.
struct Input {
    value: ResultValue,
    filename: String,
}

/// Asynchronous work finishing on another task.
enum Completion {
    Optimized {
        token: JobToken,
        fingerprint: Fingerprint,
        mode: CompressionMode,
        outcome: Result<ResultValue, WorkerError>,
    },
    Inspected {
        load: u64,
        data: String,
        filename: String,
        outcome: Result<Dimensions, WorkerError>,
    },
}

/// Coordinates document loads and settings changes.
///
/// Owns the loaded document, the current settings, the result cache and the
/// optimization queue. All of them are only touched from the controller
/// task, which handles one event or completion at a time.
pub struct Controller<E>
where
    E: Endpoint<Request = WorkerRequest, Response = WorkerResponse>,
{
    config: ControllerConfig,
    queue: OptimizationQueue<E>,
    presenter: Arc<dyn Presenter>,
    store: Arc<dyn KeyValueStore>,

    cache: ResultCache,
    resolver: JobRaceResolver,
    settings: Settings,
    input: Option<Input>,
    /// Generation of the most recent load.
    loads: u64,
    busy: bool,
    initialization_reported: bool,

    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,

    /// Settings waiting to be written, in the order they were applied.
    settings_tx: mpsc::UnboundedSender<Value>,
    settings_rx: Option<mpsc::UnboundedReceiver<Value>>,
}

impl<E> Controller<E>
where
    E: Endpoint<Request = WorkerRequest, Response = WorkerResponse>,
{
    /// Creates a controller. Nothing runs until [`spawn`] is called.
    ///
    /// [`spawn`]: Controller::spawn
    pub fn new(
        config: ControllerConfig,
        queue: OptimizationQueue<E>,
        presenter: Arc<dyn Presenter>,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        let (settings_tx, settings_rx) = mpsc::unbounded_channel();
        Self {
            cache: ResultCache::new(config.cache_capacity),
            config,
            queue,
            presenter,
            store,
            resolver: JobRaceResolver::new(),
            settings: Settings::default(),
            input: None,
            loads: 0,
            busy: false,
            initialization_reported: false,
            completions_tx,
            completions_rx,
            settings_tx,
            settings_rx: Some(settings_rx),
        }
    }

    /// Uses `settings` until the store or the user provide others.
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Spawns the controller as a background task.
    ///
    /// The task first restores persisted state, then processes events until
    /// [`ControllerHandle::shutdown`] is called or every handle is dropped.
    pub fn spawn(mut self) -> (ControllerHandle, JoinHandle<()>) {
        if let Some(writes) = self.settings_rx.take() {
            tokio::spawn(write_settings(Arc::clone(&self.store), writes));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();
        let handle = ControllerHandle::new(tx, shutdown.clone());
        let task = tokio::spawn(self.run(rx, shutdown));
        (handle, task)
    }

    #[tracing::instrument(skip_all, target = TRACING_TARGET_CONTROLLER, name = "controller")]
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        shutdown: CancellationToken,
    ) {
        tracing::info!(target: TRACING_TARGET_CONTROLLER, "Starting controller");

        self.restore_settings().await;
        self.check_version().await;

        loop {
            tokio::select! {
                biased;

                () = shutdown.cancelled() => {
                    tracing::info!(
                        target: TRACING_TARGET_CONTROLLER,
                        "Shutdown requested, stopping controller"
                    );
                    break;
                }

                Some(completion) = self.completions_rx.recv() => self.complete(completion),

                command = commands.recv() => match command {
                    Some(command) => self.execute(command),
                    None => break,
                },
            }
        }

        self.queue.cancel();
        tracing::debug!(target: TRACING_TARGET_CONTROLLER, "Controller stopped");
    }

    async fn restore_settings(&mut self) {
        let value = match self.store.get(SETTINGS_KEY).await {
            Ok(Some(value)) => value,
            Ok(None) => return,
            Err(err) => {
                tracing::warn!(
                    target: TRACING_TARGET_CONTROLLER,
                    error = %err,
                    "Failed to read persisted settings"
                );
                return;
            }
        };

        match Settings::from_persisted(value) {
            Ok(settings) => {
                tracing::debug!(target: TRACING_TARGET_CONTROLLER, "Restored persisted settings");
                self.presenter.on_settings_restored(&settings);
                self.settings = settings;
            }
            Err(err) => {
                tracing::warn!(
                    target: TRACING_TARGET_CONTROLLER,
                    error = %err,
                    "Ignoring unreadable persisted settings"
                );
            }
        }
    }

    async fn check_version(&mut self) {
        let current = self.config.app_version.clone();

        match self.store.get(LAST_SEEN_VERSION_KEY).await {
            Ok(Some(Value::String(previous))) if previous != current => {
                tracing::info!(
                    target: TRACING_TARGET_CONTROLLER,
                    previous = %previous,
                    current = %current,
                    "Application version changed"
                );
                self.presenter.on_version_change(&previous, &current);
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(
                    target: TRACING_TARGET_CONTROLLER,
                    error = %err,
                    "Failed to read last seen version"
                );
            }
        }

        if let Err(err) = self.store.set(LAST_SEEN_VERSION_KEY, Value::String(current)).await {
            tracing::warn!(
                target: TRACING_TARGET_CONTROLLER,
                error = %err,
                "Failed to record last seen version"
            );
        }
    }

    fn execute(&mut self, command: Command) {
        match command {
            Command::LoadInput { data, filename } => self.load_input(data, filename),
            Command::ChangeSettings(settings) => {
                self.settings = settings;
                self.persist_settings();
                self.compress();
            }
            Command::ResetSettings(settings) => {
                let previous = std::mem::replace(&mut self.settings, settings);
                self.presenter.on_settings_reset(&previous);
                self.persist_settings();
                self.compress();
            }
        }
    }

    fn load_input(&mut self, data: String, filename: String) {
        self.loads += 1;
        let load = self.loads;

        tracing::debug!(
            target: TRACING_TARGET_CONTROLLER,
            load,
            filename = %filename,
            bytes = data.len(),
            "Loading document"
        );

        let inspect = self.queue.inspect(data.clone());
        let tx = self.completions_tx.clone();
        tokio::spawn(async move {
            let outcome = inspect.await;
            let _ = tx.send(Completion::Inspected {
                load,
                data,
                filename,
                outcome,
            });
        });
    }

    /// Brings the presented result in line with the current settings.
    fn compress(&mut self) {
        let token = self.resolver.mint();
        self.queue.cancel();

        let Some(input) = &self.input else {
            tracing::debug!(
                target: TRACING_TARGET_CONTROLLER,
                %token,
                "No document loaded, keeping settings for later"
            );
            return;
        };

        let mode = CompressionMode::from_gzip(self.settings.gzip);

        if self.settings.original {
            let presentation = Presentation {
                value: input.value.clone(),
                filename: input.filename.clone(),
                mode,
                size: input.value.size(mode),
                comparison_size: None,
            };
            self.set_busy(false);
            self.presenter.on_original_ready(&presentation);
            return;
        }

        let fingerprint = self.settings.fingerprint();
        if let Some(value) = self.cache.lookup(&fingerprint) {
            tracing::debug!(target: TRACING_TARGET_CONTROLLER, %token, "Presenting cached result");
            self.set_busy(false);
            self.present(value, mode);
            return;
        }

        tracing::debug!(target: TRACING_TARGET_CONTROLLER, %token, "Optimizing document");
        let job = self
            .queue
            .optimize(input.value.text(), self.settings.clone());
        self.set_busy(true);

        let tx = self.completions_tx.clone();
        tokio::spawn(async move {
            let outcome = job.await;
            let _ = tx.send(Completion::Optimized {
                token,
                fingerprint,
                mode,
                outcome,
            });
        });
    }

    fn complete(&mut self, completion: Completion) {
        match completion {
            Completion::Optimized {
                token,
                fingerprint,
                mode,
                outcome,
            } => self.complete_optimization(token, fingerprint, mode, outcome),
            Completion::Inspected {
                load,
                data,
                filename,
                outcome,
            } => self.complete_load(load, data, filename, outcome),
        }
    }

    fn complete_optimization(
        &mut self,
        token: JobToken,
        fingerprint: Fingerprint,
        mode: CompressionMode,
        outcome: Result<ResultValue, WorkerError>,
    ) {
        if !self.resolver.is_current(token) {
            tracing::debug!(target: TRACING_TARGET_CONTROLLER, %token, "Discarding stale result");
            return;
        }

        self.set_busy(false);
        match outcome {
            Ok(value) => {
                self.present(value.clone(), mode);
                self.cache.add(fingerprint, value);
            }
            Err(err) if err.is_cancelled() => {
                tracing::trace!(
                    target: TRACING_TARGET_CONTROLLER,
                    %token,
                    kind = err.name(),
                    "Optimization cancelled"
                );
            }
            Err(err) => self.report(FailureKind::Minify, &err),
        }
    }

    fn complete_load(
        &mut self,
        load: u64,
        data: String,
        filename: String,
        outcome: Result<Dimensions, WorkerError>,
    ) {
        if load != self.loads {
            tracing::debug!(target: TRACING_TARGET_CONTROLLER, load, "Discarding superseded load");
            return;
        }

        let dimensions = match outcome {
            Ok(dimensions) => dimensions,
            Err(err) if err.is_cancelled() => return,
            Err(err) => return self.report(FailureKind::Load, &err),
        };

        tracing::info!(
            target: TRACING_TARGET_CONTROLLER,
            filename = %filename,
            width = dimensions.width,
            height = dimensions.height,
            "Document loaded"
        );

        self.presenter.on_input_loaded(&filename, dimensions);
        self.input = Some(Input {
            value: ResultValue::new(data, dimensions),
            filename,
        });
        self.cache.purge();
        self.compress();
    }

    fn present(&self, value: ResultValue, mode: CompressionMode) {
        let Some(input) = &self.input else {
            return;
        };

        let presentation = Presentation {
            size: value.size(mode),
            comparison_size: Some(input.value.size(mode)),
            value,
            filename: input.filename.clone(),
            mode,
        };
        self.presenter.on_result_ready(&presentation);
    }

    fn report(&mut self, kind: FailureKind, error: &WorkerError) {
        let failure = Failure::from_worker(kind, error);
        if failure.kind() == FailureKind::Initialization {
            if self.initialization_reported {
                return;
            }
            self.initialization_reported = true;
        }

        tracing::error!(target: TRACING_TARGET_CONTROLLER, error = %failure, "Reporting failure");
        self.presenter.on_error(&failure);
    }

    fn set_busy(&mut self, busy: bool) {
        if self.busy != busy {
            self.busy = busy;
            self.presenter.on_busy(busy);
        }
    }

    fn persist_settings(&self) {
        let value = match self.settings.to_persisted() {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(
                    target: TRACING_TARGET_CONTROLLER,
                    error = %err,
                    "Failed to serialize settings"
                );
                return;
            }
        };

        if self.settings_tx.send(value).is_err() {
            tracing::warn!(
                target: TRACING_TARGET_CONTROLLER,
                "Settings writer stopped, settings not persisted"
            );
        }
    }
}

/// Writes persisted settings one at a time, in the order they were applied.
///
/// Values queued behind a slow write are collapsed into the newest one.
/// Stops once the controller is gone and every queued value is written.
async fn write_settings(
    store: Arc<dyn KeyValueStore>,
    mut writes: mpsc::UnboundedReceiver<Value>,
) {
    while let Some(mut value) = writes.recv().await {
        let mut skipped = 0usize;
        while let Ok(newer) = writes.try_recv() {
            value = newer;
            skipped += 1;
        }

        tracing::trace!(target: TRACING_TARGET_CONTROLLER, skipped, "Persisting settings");
        if let Err(err) = store.set(SETTINGS_KEY, value).await {
            tracing::warn!(
                target: TRACING_TARGET_CONTROLLER,
                error = %err,
                "Failed to persist settings"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use oxvgui_core::MemoryStore;
    use oxvgui_worker::OptimizerEndpoint;
    use oxvgui_worker::testing::{FailingEndpoint, ScriptedEngine};
    use serde_json::json;
    use tokio::sync::mpsc::UnboundedReceiver;
    use tokio::time::timeout;

    use super::*;
    use crate::presenter::{ChannelPresenter, Notification};

    const DOCUMENT: &str = "<svg>doc</svg>";

    fn spawn_with<E>(
        endpoint: E,
        store: MemoryStore,
        settings: Settings,
    ) -> (ControllerHandle, UnboundedReceiver<Notification>)
    where
        E: Endpoint<Request = WorkerRequest, Response = WorkerResponse>,
    {
        let (presenter, rx) = ChannelPresenter::new();
        let controller = Controller::new(
            ControllerConfig::new().with_app_version("2.0.0"),
            OptimizationQueue::with_endpoint(endpoint),
            Arc::new(presenter),
            Arc::new(store),
        )
        .with_settings(settings);

        let (handle, _task) = controller.spawn();
        (handle, rx)
    }

    async fn next(rx: &mut UnboundedReceiver<Notification>) -> Notification {
        timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for a notification")
            .expect("controller stopped")
    }

    async fn next_shown(rx: &mut UnboundedReceiver<Notification>) -> Notification {
        loop {
            match next(rx).await {
                n @ (Notification::ResultReady(_)
                | Notification::OriginalReady(_)
                | Notification::Error(_)) => return n,
                _ => {}
            }
        }
    }

    #[tokio::test]
    async fn test_settings_before_load_are_used_for_first_result() {
        let engine = ScriptedEngine::new();
        let endpoint = OptimizerEndpoint::new(engine.clone());
        let (handle, mut rx) = spawn_with(endpoint, MemoryStore::new(), Settings::empty());

        let settings = Settings::empty().with_job("removeTitle", true);
        handle.change_settings(settings.clone()).unwrap();
        handle.load_input(DOCUMENT, "doc.svg").unwrap();

        let Notification::ResultReady(shown) = next_shown(&mut rx).await else {
            panic!("expected a result");
        };
        assert_eq!(shown.value.text(), ScriptedEngine::output(DOCUMENT, &settings));
        assert_eq!(shown.filename, "doc.svg");
        assert_eq!(
            shown.comparison_size,
            Some(ResultValue::new(DOCUMENT, Dimensions::default()).size(shown.mode))
        );
        assert_eq!(engine.optimised().len(), 1);
    }

    #[tokio::test]
    async fn test_result_finished_before_a_newer_change_is_discarded() {
        let (presenter, mut rx) = ChannelPresenter::new();
        let mut controller = Controller::new(
            ControllerConfig::new(),
            OptimizationQueue::with_endpoint(OptimizerEndpoint::new(ScriptedEngine::new())),
            Arc::new(presenter),
            Arc::new(MemoryStore::new()),
        );
        controller.input = Some(Input {
            value: ResultValue::new(DOCUMENT, ScriptedEngine::DIMENSIONS),
            filename: "doc.svg".into(),
        });

        let a = Settings::empty().with_job("removeTitle", true);
        let b = Settings::empty().with_job("removeDesc", true);

        controller.settings = a.clone();
        controller.compress();

        // A succeeds before the change to B is handled.
        let finished = timeout(Duration::from_secs(5), controller.completions_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(
            &finished,
            Completion::Optimized { outcome: Ok(_), .. }
        ));

        controller.settings = b.clone();
        controller.compress();
        controller.complete(finished);

        assert!(controller.cache.lookup(&a.fingerprint()).is_none());
        while let Ok(notification) = rx.try_recv() {
            assert!(!matches!(notification, Notification::ResultReady(_)));
        }

        let current = timeout(Duration::from_secs(5), controller.completions_rx.recv())
            .await
            .unwrap()
            .unwrap();
        controller.complete(current);

        let Notification::ResultReady(shown) = next_shown(&mut rx).await else {
            panic!("expected a result");
        };
        assert_eq!(shown.value.text(), ScriptedEngine::output(DOCUMENT, &b));
        assert!(controller.cache.lookup(&b.fingerprint()).is_some());
        assert!(controller.cache.lookup(&a.fingerprint()).is_none());
    }

    #[tokio::test]
    async fn test_original_mode_skips_the_engine() {
        let engine = ScriptedEngine::new();
        let endpoint = OptimizerEndpoint::new(engine.clone());
        let settings = Settings::empty().with_original(true).with_gzip(false);
        let (handle, mut rx) = spawn_with(endpoint, MemoryStore::new(), settings);

        handle.load_input(DOCUMENT, "doc.svg").unwrap();

        let Notification::OriginalReady(shown) = next_shown(&mut rx).await else {
            panic!("expected the original document");
        };
        assert_eq!(shown.value.text(), DOCUMENT);
        assert_eq!(shown.size, DOCUMENT.len());
        assert_eq!(shown.comparison_size, None);
        assert!(engine.optimised().is_empty());
    }

    #[tokio::test]
    async fn test_load_failure_is_reported() {
        let endpoint = OptimizerEndpoint::new(ScriptedEngine::new());
        let (handle, mut rx) = spawn_with(endpoint, MemoryStore::new(), Settings::empty());

        handle.load_input("<svg>fail</svg>", "bad.svg").unwrap();

        let Notification::Error(failure) = next_shown(&mut rx).await else {
            panic!("expected a failure");
        };
        assert_eq!(failure.kind(), FailureKind::Load);
        assert!(failure.to_string().starts_with("Load failed: "));
    }

    #[tokio::test]
    async fn test_initialization_failure_is_reported_once() {
        let endpoint = FailingEndpoint::<WorkerRequest, WorkerResponse>::new("no engine");
        let (handle, mut rx) = spawn_with(endpoint, MemoryStore::new(), Settings::empty());

        handle.load_input(DOCUMENT, "a.svg").unwrap();
        let Notification::Error(failure) = next_shown(&mut rx).await else {
            panic!("expected a failure");
        };
        assert_eq!(failure.kind(), FailureKind::Initialization);

        handle.load_input(DOCUMENT, "b.svg").unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        while let Ok(notification) = rx.try_recv() {
            assert!(!matches!(notification, Notification::Error(_)));
        }
    }

    #[tokio::test]
    async fn test_startup_restores_state_and_reports_new_version() {
        let store = MemoryStore::new();
        let persisted = Settings::empty().with_pretty(true);
        store
            .set(SETTINGS_KEY, persisted.to_persisted().unwrap())
            .await
            .unwrap();
        store.set(LAST_SEEN_VERSION_KEY, json!("1.0.0")).await.unwrap();

        let endpoint = OptimizerEndpoint::new(ScriptedEngine::new());
        let (_handle, mut rx) = spawn_with(endpoint, store.clone(), Settings::empty());

        assert!(matches!(
            next(&mut rx).await,
            Notification::SettingsRestored(settings) if settings == persisted
        ));
        assert!(matches!(
            next(&mut rx).await,
            Notification::VersionChanged { previous, current }
                if previous == "1.0.0" && current == "2.0.0"
        ));

        // The new version is recorded right after the check.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(
            store.get(LAST_SEEN_VERSION_KEY).await.unwrap(),
            Some(json!("2.0.0"))
        );
    }

    #[tokio::test]
    async fn test_reset_reports_previous_settings_and_persists() {
        let store = MemoryStore::new();
        let endpoint = OptimizerEndpoint::new(ScriptedEngine::new());
        let initial = Settings::empty().with_job("removeDesc", true);
        let (handle, mut rx) = spawn_with(endpoint, store.clone(), initial.clone());

        let reset = Settings::empty().with_original(true);
        handle.reset_settings(reset.clone()).unwrap();

        loop {
            if let Notification::SettingsReset { previous } = next(&mut rx).await {
                assert_eq!(previous, initial);
                break;
            }
        }

        tokio::time::sleep(Duration::from_millis(20)).await;
        let stored = store.get(SETTINGS_KEY).await.unwrap().unwrap();
        assert!(stored.get("original").is_none());
        assert_eq!(Settings::from_persisted(stored).unwrap(), reset.with_original(false));
    }

    #[tokio::test]
    async fn test_handle_fails_after_shutdown() {
        let endpoint = OptimizerEndpoint::new(ScriptedEngine::new());
        let (handle, _rx) = spawn_with(endpoint, MemoryStore::new(), Settings::empty());

        handle.shutdown();
        assert!(handle.is_shutdown());
        assert!(handle.change_settings(Settings::empty()).is_err());
    }
}

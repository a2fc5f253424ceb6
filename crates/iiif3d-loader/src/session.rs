//! Loading Session
//!
//! Steps one model configuration through its LOD levels, lowest first,
//! replacing the displayed asset after each level and publishing telemetry.
//!
//! A session starts at most once, runs at most one fetch/decode at a time and
//! stops publishing the moment it is cancelled. Results of a fetch that was
//! already in flight when the session was cancelled are discarded.
//!
//! Telemetry writes and asset installs hold the session's fence, and so does
//! [`LoadingSession::cancel`]. Once `cancel` returns, nothing from this session
//! reaches the store, on any runtime flavor. Store subscribers therefore must
//! not cancel the session that is publishing to them.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use iiif3d_core::{DEFAULT_TARGET_SIZE, LodDelays, LodLevel, ModelConfiguration};
use iiif3d_platform::{FetchProgress, Stopwatch};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use smallvec::{SmallVec, smallvec};
use tokio_util::sync::CancellationToken;

use crate::asset::DecodedAsset;
use crate::telemetry::{COMPLETE_STATUS, Reading, TelemetryUpdate};
use crate::viewer::LoaderContext;
use crate::{LoadError, LoadResult};

/// Loader tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoaderConfig {
    /// Largest bounds dimension after normalization
    pub target_size: f32,
    /// Pause after each level of a progressive run
    pub lod_delays: LodDelays,
}

impl LoaderConfig {
    /// Same configuration with every inter-level pause removed
    pub fn without_delays(mut self) -> Self {
        self.lod_delays = LodDelays::none();
        self
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            target_size: DEFAULT_TARGET_SIZE,
            lod_delays: LodDelays::default(),
        }
    }
}

/// What a session loads when started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Exactly one level
    Single(LodLevel),
    /// Every configured level in ascending order
    Progressive,
}

impl LoadMode {
    /// Load only the best level the configuration has
    pub fn highest(config: &ModelConfiguration) -> Self {
        Self::Single(config.highest_level())
    }
}

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Loading(LodLevel),
    Loaded(LodLevel),
    Complete,
}

/// Result of [`LoadingSession::start`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyStarted,
}

/// Why a level was not loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another load is in flight
    Busy,
    /// The configuration has no asset for the level
    Unavailable,
    /// The session was torn down
    Cancelled,
}

/// Result of [`LoadingSession::load_level`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelOutcome {
    Loaded { level: LodLevel, vertices: usize },
    /// The asset failed and the placeholder was installed instead
    Fallback { level: LodLevel },
    Skipped(SkipReason),
}

type Plan = SmallVec<[LodLevel; 5]>;

#[derive(Default)]
struct SessionInner {
    plan: Plan,
    single: bool,
    state: SessionState,
    current_level_index: Option<usize>,
    current_asset: Option<Arc<DecodedAsset>>,
}

/// Clears the in-flight flag when a load ends, however it ends
struct LoadingGuard<'a>(&'a AtomicBool);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Progressive loading of one model configuration
pub struct LoadingSession {
    config: Arc<ModelConfiguration>,
    context: LoaderContext,
    started: AtomicBool,
    is_loading: AtomicBool,
    cancel: CancellationToken,
    /// Held across every liveness check that is followed by a write
    fence: Mutex<()>,
    inner: Mutex<SessionInner>,
}

impl LoadingSession {
    /// Create an idle session
    pub fn new(config: impl Into<Arc<ModelConfiguration>>, context: LoaderContext) -> Self {
        Self {
            config: config.into(),
            context,
            started: AtomicBool::new(false),
            is_loading: AtomicBool::new(false),
            cancel: CancellationToken::new(),
            fence: Mutex::new(()),
            inner: Mutex::new(SessionInner::default()),
        }
    }

    /// The configuration being loaded
    pub fn config(&self) -> &ModelConfiguration {
        &self.config
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.inner.lock().state
    }

    /// The asset currently on display
    pub fn current_asset(&self) -> Option<Arc<DecodedAsset>> {
        self.inner.lock().current_asset.clone()
    }

    /// Configuration index of the level currently on display
    pub fn current_level_index(&self) -> Option<usize> {
        self.inner.lock().current_level_index
    }

    /// Levels this run intends to load
    pub fn plan(&self) -> Plan {
        self.inner.lock().plan.clone()
    }

    /// True while a fetch/decode is in flight
    pub fn is_loading(&self) -> bool {
        self.is_loading.load(Ordering::Acquire)
    }

    /// True once [`start`](Self::start) has been called
    pub fn has_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// True once the session has been torn down
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stop scheduling loads and discard any in-flight result.
    ///
    /// Waits for a publish or install already past its liveness check.
    pub fn cancel(&self) {
        let _fence = self.fence.lock();
        if !self.cancel.is_cancelled() {
            log::debug!("Cancelling loading session for '{}'", self.config.metadata.name);
            self.cancel.cancel();
        }
    }

    /// Run the session. Only the first call does anything.
    pub async fn start(&self, mode: LoadMode) -> StartOutcome {
        if self
            .started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            log::debug!("Loading session already started");
            return StartOutcome::AlreadyStarted;
        }

        let mode = match mode {
            LoadMode::Progressive if !self.config.progressive => LoadMode::highest(&self.config),
            mode => mode,
        };
        log::info!("Starting {:?} load of '{}'", mode, self.config.metadata.name);

        match mode {
            LoadMode::Single(level) => {
                self.set_plan(smallvec![level], true);
                self.load_level(level).await;
            }
            LoadMode::Progressive => {
                let plan = self.config.lod_levels();
                self.set_plan(plan.clone(), false);
                self.run_progressive(&plan).await;
            }
        }
        StartOutcome::Started
    }

    /// Load every planned level in ascending order, pausing between levels
    async fn run_progressive(&self, plan: &[LodLevel]) {
        let delays = self.context.config.lod_delays;

        for (index, level) in plan.iter().copied().enumerate() {
            if self.is_cancelled() {
                log::debug!("Progressive loading stopped before {}", level);
                return;
            }

            if let LevelOutcome::Skipped(reason) = self.load_level(level).await {
                log::warn!("LOD {} skipped: {:?}", level, reason);
            }

            if index + 1 < plan.len() {
                tokio::select! {
                    _ = self.cancel.cancelled() => {
                        log::debug!("Progressive loading cancelled after {}", level);
                        return;
                    }
                    _ = tokio::time::sleep(delays.delay_after(level)) => {}
                }
            }
        }
    }

    /// Fetch, decode and install one level
    pub async fn load_level(&self, level: LodLevel) -> LevelOutcome {
        if self.is_cancelled() {
            return LevelOutcome::Skipped(SkipReason::Cancelled);
        }
        if self
            .is_loading
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            log::debug!("Ignoring load of {}, another load is in flight", level);
            return LevelOutcome::Skipped(SkipReason::Busy);
        }
        let _loading = LoadingGuard(&self.is_loading);

        let url = match self.resolve(level) {
            Ok(url) => url,
            Err(e) => {
                log::warn!("{}", e);
                return LevelOutcome::Skipped(SkipReason::Unavailable);
            }
        };

        let (index, total, is_final) = self.position(level);
        let band = 100.0 / total as f64;
        let base = index as f64 * band;
        let finished = base + band;

        self.set_state(SessionState::Loading(level));
        self.publish(
            TelemetryUpdate::new()
                .status(format!("Loading {}", level))
                .lod_level(level)
                .file_size(Reading::Calculating)
                .progress(base),
        );
        log::info!("Loading {} model from {}", level, url);

        let timer = Stopwatch::start();
        let target_size = self.context.config.target_size;

        match self.fetch_and_decode(&url, base, band).await {
            Ok((mut asset, size)) => {
                asset.normalize(target_size);
                let vertices = asset.vertex_count();
                if !self.install(asset, level, is_final) {
                    return LevelOutcome::Skipped(SkipReason::Cancelled);
                }

                let load_time = timer.elapsed();
                let status = if is_final {
                    COMPLETE_STATUS.to_string()
                } else {
                    format!("LOD {} loaded", level)
                };
                let mut update = TelemetryUpdate::new()
                    .status(status)
                    .lod_level(level)
                    .vertices(Reading::Value(vertices as u64))
                    .file_size(Reading::Value(size))
                    .load_time(load_time)
                    .progress(finished);
                if is_final {
                    update = update.complete(true);
                }
                self.publish(update);

                log::info!(
                    "LOD {} loaded: {} vertices, {} bytes in {}ms",
                    level,
                    vertices,
                    size,
                    load_time.as_millis()
                );
                LevelOutcome::Loaded { level, vertices }
            }
            Err(LoadError::Cancelled) => {
                log::debug!("Discarding {} result of cancelled session", level);
                LevelOutcome::Skipped(SkipReason::Cancelled)
            }
            Err(e) => {
                log::error!("Error loading {} model: {}", level, e);

                let mut placeholder = self.context.fallback.placeholder(level);
                placeholder.normalize(target_size);
                if !self.install(placeholder, level, is_final) {
                    return LevelOutcome::Skipped(SkipReason::Cancelled);
                }

                let mut update = TelemetryUpdate::new()
                    .status(format!("Fallback {} loaded", level))
                    .lod_level(level)
                    .vertices(Reading::Procedural)
                    .file_size(Reading::Procedural)
                    .progress(finished);
                if is_final {
                    update = update.complete(true);
                }
                self.publish(update);
                LevelOutcome::Fallback { level }
            }
        }
    }

    async fn fetch_and_decode(
        &self,
        url: &str,
        base: f64,
        band: f64,
    ) -> LoadResult<(DecodedAsset, u64)> {
        let mut on_progress = |progress: FetchProgress| {
            let mut update = TelemetryUpdate::new()
                .file_size(progress.total.map_or(Reading::Calculating, Reading::Value));
            if let Some(fraction) = progress.fraction() {
                update = update.progress(base + fraction * band);
            }
            self.publish(update);
        };

        let bytes = self.context.fetcher.fetch(url, &mut on_progress).await?;
        if self.is_cancelled() {
            return Err(LoadError::Cancelled);
        }

        let size = bytes.len() as u64;
        let decoder = Arc::clone(&self.context.decoder);
        let asset = tokio::task::spawn_blocking(move || decoder.decode(&bytes))
            .await
            .map_err(|e| LoadError::Decode(format!("decoder task failed: {}", e)))??;

        if self.is_cancelled() {
            return Err(LoadError::Cancelled);
        }
        Ok((asset, size))
    }

    fn resolve(&self, level: LodLevel) -> LoadResult<String> {
        self.config
            .url(level)
            .map(str::to_owned)
            .ok_or(LoadError::ConfigurationMissing(level))
    }

    /// `(index, plan length, is final)` of a level within the current run
    fn position(&self, level: LodLevel) -> (usize, usize, bool) {
        let inner = self.inner.lock();
        if let Some(index) = inner.plan.iter().position(|planned| *planned == level) {
            let total = inner.plan.len();
            return (index, total, inner.single || index + 1 == total);
        }

        // Loaded directly, outside any run: place it within the whole configuration
        let total = self.config.len().max(1);
        let index = self.config.index_of(level).unwrap_or(0);
        (index, total, index + 1 == total)
    }

    fn set_plan(&self, plan: Plan, single: bool) {
        let mut inner = self.inner.lock();
        inner.plan = plan;
        inner.single = single;
    }

    fn set_state(&self, state: SessionState) {
        self.inner.lock().state = state;
    }

    /// Replace the displayed asset. Returns false if the session is dead.
    fn install(&self, asset: DecodedAsset, level: LodLevel, is_final: bool) -> bool {
        let _fence = self.fence.lock();
        if self.is_cancelled() {
            return false;
        }
        let mut inner = self.inner.lock();
        inner.current_asset = Some(Arc::new(asset));
        inner.current_level_index = self.config.index_of(level);
        inner.state = if is_final {
            SessionState::Complete
        } else {
            SessionState::Loaded(level)
        };
        true
    }

    fn publish(&self, update: TelemetryUpdate) {
        let _fence = self.fence.lock();
        if self.is_cancelled() {
            return;
        }
        self.context.store.update(update);
    }
}

impl Drop for LoadingSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for LoadingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadingSession")
            .field("model", &self.config.metadata.name)
            .field("state", &self.state())
            .field("started", &self.has_started())
            .field("is_loading", &self.is_loading())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

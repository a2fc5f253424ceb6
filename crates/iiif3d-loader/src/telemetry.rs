//! Loading Telemetry
//!
//! Observable loading state shared between the active session (the only
//! writer) and any number of display observers.
//!
//! The store is an ordinary object handed around in an `Arc`, so every viewer
//! (and every test) can own an isolated one.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use iiif3d_core::LodLevel;
use parking_lot::RwLock;

/// Status text of a freshly reset store
pub const INITIAL_STATUS: &str = "Initializing";
/// Status text of the final transition of a run
pub const COMPLETE_STATUS: &str = "Complete";
/// Rendering of an unset field
pub const UNSET_TEXT: &str = "-";

/// A measured quantity that may not be known yet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Reading<T> {
    #[default]
    Unset,
    Calculating,
    Value(T),
    Procedural,
}

impl<T: Copy> Reading<T> {
    /// The measured value, if there is one
    pub fn value(&self) -> Option<T> {
        match self {
            Self::Value(value) => Some(*value),
            _ => None,
        }
    }
}

/// Point-in-time view of the loading state
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetrySnapshot {
    pub status: String,
    pub lod_level: Option<LodLevel>,
    pub vertices: Reading<u64>,
    /// Asset size in bytes
    pub file_size: Reading<u64>,
    pub load_time: Option<Duration>,
    /// Overall progress, `0.0..=100.0`
    pub progress: f64,
    pub is_complete: bool,
}

impl TelemetrySnapshot {
    /// The state before anything has loaded
    pub fn initial() -> Self {
        Self {
            status: INITIAL_STATUS.to_string(),
            lod_level: None,
            vertices: Reading::Unset,
            file_size: Reading::Unset,
            load_time: None,
            progress: 0.0,
            is_complete: false,
        }
    }

    /// Merge an update into this snapshot
    pub fn apply(&mut self, update: TelemetryUpdate) {
        let is_complete = match (update.is_complete, update.status.as_deref()) {
            (Some(explicit), _) => explicit,
            (None, Some(COMPLETE_STATUS)) => true,
            (None, _) => self.is_complete,
        };

        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(level) = update.lod_level {
            self.lod_level = Some(level);
        }
        if let Some(vertices) = update.vertices {
            self.vertices = vertices;
        }
        if let Some(file_size) = update.file_size {
            self.file_size = file_size;
        }
        if let Some(load_time) = update.load_time {
            self.load_time = Some(load_time);
        }
        if let Some(progress) = update.progress {
            self.progress = progress.clamp(0.0, 100.0);
        }
        self.is_complete = is_complete;
    }

    /// Level as shown in the panel (`LOW`, ... or `-`)
    pub fn lod_level_text(&self) -> String {
        self.lod_level
            .map(|level| level.label().to_string())
            .unwrap_or_else(|| UNSET_TEXT.to_string())
    }

    /// Vertex count as shown in the panel
    pub fn vertices_text(&self) -> String {
        reading_text(&self.vertices, |count| count.to_string())
    }

    /// File size as shown in the panel (`12.34 MB`)
    pub fn file_size_text(&self) -> String {
        reading_text(&self.file_size, |bytes| {
            format!("{:.2} MB", bytes as f64 / 1024.0 / 1024.0)
        })
    }

    /// Load time as shown in the panel (`850ms`)
    pub fn load_time_text(&self) -> String {
        self.load_time
            .map(|time| format!("{}ms", time.as_millis()))
            .unwrap_or_else(|| UNSET_TEXT.to_string())
    }
}

fn reading_text(reading: &Reading<u64>, format_value: impl Fn(u64) -> String) -> String {
    match reading {
        Reading::Unset => UNSET_TEXT.to_string(),
        Reading::Calculating => "Calculating...".to_string(),
        Reading::Value(value) => format_value(*value),
        Reading::Procedural => "Procedural".to_string(),
    }
}

impl Default for TelemetrySnapshot {
    fn default() -> Self {
        Self::initial()
    }
}

impl fmt::Display for TelemetrySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let badge = if self.is_complete { "Complete" } else { "Loading" };
        writeln!(f, "Status:    {} ({})", badge, self.status)?;
        writeln!(f, "LOD Level: {}", self.lod_level_text())?;
        writeln!(f, "Vertices:  {}", self.vertices_text())?;
        writeln!(f, "File Size: {}", self.file_size_text())?;
        writeln!(f, "Load Time: {}", self.load_time_text())?;
        write!(f, "Progress:  {:.0}%", self.progress)
    }
}

/// Partial update; absent fields keep their current value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetryUpdate {
    pub status: Option<String>,
    pub lod_level: Option<LodLevel>,
    pub vertices: Option<Reading<u64>>,
    pub file_size: Option<Reading<u64>>,
    pub load_time: Option<Duration>,
    pub progress: Option<f64>,
    pub is_complete: Option<bool>,
}

impl TelemetryUpdate {
    /// Empty update
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn lod_level(mut self, level: LodLevel) -> Self {
        self.lod_level = Some(level);
        self
    }

    pub fn vertices(mut self, vertices: Reading<u64>) -> Self {
        self.vertices = Some(vertices);
        self
    }

    pub fn file_size(mut self, file_size: Reading<u64>) -> Self {
        self.file_size = Some(file_size);
        self
    }

    pub fn load_time(mut self, load_time: Duration) -> Self {
        self.load_time = Some(load_time);
        self
    }

    pub fn progress(mut self, progress: f64) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn complete(mut self, is_complete: bool) -> Self {
        self.is_complete = Some(is_complete);
        self
    }
}

/// Handle returned by [`TelemetryStore::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Arc<dyn Fn(&TelemetrySnapshot) + Send + Sync>;

/// Observable telemetry store
pub struct TelemetryStore {
    state: RwLock<TelemetrySnapshot>,
    subscribers: RwLock<Vec<(SubscriptionId, Subscriber)>>,
    next_id: AtomicU64,
}

impl TelemetryStore {
    /// Create a store in the initial state
    pub fn new() -> Self {
        Self {
            state: RwLock::new(TelemetrySnapshot::initial()),
            subscribers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Clone of the current state
    pub fn snapshot(&self) -> TelemetrySnapshot {
        self.state.read().clone()
    }

    /// Merge an update and notify subscribers
    pub fn update(&self, update: TelemetryUpdate) {
        let snapshot = {
            let mut state = self.state.write();
            state.apply(update);
            state.clone()
        };
        self.notify(&snapshot);
    }

    /// Restore the initial state and notify subscribers
    pub fn reset(&self) {
        let snapshot = {
            let mut state = self.state.write();
            *state = TelemetrySnapshot::initial();
            state.clone()
        };
        self.notify(&snapshot);
    }

    /// Register an observer called with every new snapshot
    pub fn subscribe<F>(&self, subscriber: F) -> SubscriptionId
    where
        F: Fn(&TelemetrySnapshot) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers.write().push((id, Arc::new(subscriber)));
        id
    }

    /// Remove an observer. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|(existing, _)| *existing != id);
        subscribers.len() != before
    }

    /// Number of registered observers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    fn notify(&self, snapshot: &TelemetrySnapshot) {
        // Called without holding either lock so observers may read or unsubscribe
        let subscribers: Vec<Subscriber> = self
            .subscribers
            .read()
            .iter()
            .map(|(_, subscriber)| Arc::clone(subscriber))
            .collect();
        for subscriber in subscribers {
            subscriber(snapshot);
        }
    }
}

impl Default for TelemetryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TelemetryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelemetryStore")
            .field("state", &*self.state.read())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_initial_literals() {
        let store = TelemetryStore::new();
        let snapshot = store.snapshot();
        assert_eq!(snapshot.status, "Initializing");
        assert_eq!(snapshot.lod_level_text(), "-");
        assert_eq!(snapshot.vertices_text(), "-");
        assert_eq!(snapshot.file_size_text(), "-");
        assert_eq!(snapshot.load_time_text(), "-");
        assert_eq!(snapshot.progress, 0.0);
        assert!(!snapshot.is_complete);
    }

    #[test]
    fn test_shallow_merge() {
        let store = TelemetryStore::new();
        store.update(TelemetryUpdate::new().status("Loading low").lod_level(LodLevel::Low));
        store.update(TelemetryUpdate::new().vertices(Reading::Value(1234)).progress(25.0));

        let snapshot = store.snapshot();
        assert_eq!(snapshot.status, "Loading low");
        assert_eq!(snapshot.lod_level_text(), "LOW");
        assert_eq!(snapshot.vertices_text(), "1234");
        assert_eq!(snapshot.progress, 25.0);
    }

    #[test]
    fn test_complete_precedence() {
        let store = TelemetryStore::new();

        // Status "Complete" forces the flag when it is not given
        store.update(TelemetryUpdate::new().status(COMPLETE_STATUS));
        assert!(store.snapshot().is_complete);

        // Unrelated updates keep it
        store.update(TelemetryUpdate::new().status("LOD high loaded"));
        assert!(store.snapshot().is_complete);

        // An explicit value always wins
        store.update(TelemetryUpdate::new().status(COMPLETE_STATUS).complete(false));
        assert!(!store.snapshot().is_complete);
        store.update(TelemetryUpdate::new().complete(true));
        assert!(store.snapshot().is_complete);
    }

    #[test]
    fn test_reset_restores_initial_state() {
        let store = TelemetryStore::new();
        store.update(
            TelemetryUpdate::new()
                .status(COMPLETE_STATUS)
                .lod_level(LodLevel::Ultra)
                .vertices(Reading::Procedural)
                .file_size(Reading::Value(2 * 1024 * 1024))
                .load_time(Duration::from_millis(850))
                .progress(100.0),
        );
        assert_eq!(store.snapshot().file_size_text(), "2.00 MB");
        assert_eq!(store.snapshot().load_time_text(), "850ms");

        store.reset();
        assert_eq!(store.snapshot(), TelemetrySnapshot::initial());
    }

    #[test]
    fn test_progress_is_clamped() {
        let store = TelemetryStore::new();
        store.update(TelemetryUpdate::new().progress(140.0));
        assert_eq!(store.snapshot().progress, 100.0);
    }

    #[test]
    fn test_subscribers() {
        let store = TelemetryStore::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        let id = store.subscribe(move |snapshot| sink.lock().push(snapshot.status.clone()));
        assert_eq!(store.subscriber_count(), 1);

        store.update(TelemetryUpdate::new().status("Loading low"));
        store.reset();
        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        store.update(TelemetryUpdate::new().status("ignored"));

        assert_eq!(*seen.lock(), vec!["Loading low".to_string(), "Initializing".to_string()]);
    }

    #[test]
    fn test_subscriber_can_read_store() {
        let store = Arc::new(TelemetryStore::new());
        let observed = Arc::new(Mutex::new(None));

        let reader = Arc::clone(&store);
        let sink = Arc::clone(&observed);
        store.subscribe(move |_| *sink.lock() = Some(reader.snapshot().progress));

        store.update(TelemetryUpdate::new().progress(50.0));
        assert_eq!(*observed.lock(), Some(50.0));
    }

    #[test]
    fn test_panel_rendering() {
        let mut snapshot = TelemetrySnapshot::initial();
        snapshot.apply(TelemetryUpdate::new().file_size(Reading::Calculating));
        let panel = snapshot.to_string();
        assert!(panel.contains("Status:    Loading (Initializing)"));
        assert!(panel.contains("File Size: Calculating..."));
        assert!(panel.ends_with("Progress:  0%"));
    }
}

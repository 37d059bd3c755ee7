//! Media collaborators: probing, asset handles, and the interruption bus.
//!
//! A clip never talks to a decoder directly. It owns an [`AssetHandle`]
//! that the sampler reads at dispatch time, so a refresh performed while a
//! batch is in flight is picked up by every sample that starts afterwards.
//!
//! Interruptions (the platform's media services being reset) are delivered
//! through an explicit [`InterruptionBus`]. Clips subscribe when they are
//! constructed and unsubscribe when dropped.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};

use montage_common::{MontageError, MontageResult};

/// What a probe learns about a source.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInfo {
    /// Total duration in seconds. `None` for still images.
    pub duration_secs: Option<f64>,
    /// Native width in pixels (0 for audio-only sources).
    pub width: u32,
    /// Native height in pixels (0 for audio-only sources).
    pub height: u32,
    /// Volume the container asks for, if any.
    pub preferred_volume: Option<f32>,
}

/// Resolves a source URI into basic media facts.
pub trait MediaProbe: Send + Sync {
    /// Probe a source. Unresolvable or unreadable sources yield
    /// [`MontageError::Resource`].
    fn probe(&self, uri: &str) -> MontageResult<MediaInfo>;
}

/// An RGBA8 still frame held in memory.
#[derive(Clone)]
pub struct StillFrame {
    width: u32,
    height: u32,
    pixels: Arc<[u8]>,
}

impl StillFrame {
    /// Wrap raw RGBA8 pixels. The buffer length must be `width * height * 4`.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> MontageResult<Self> {
        if width == 0 || height == 0 {
            return Err(MontageError::resource("still image has no pixels"));
        }
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(MontageError::resource(format!(
                "still image buffer is {} bytes, expected {expected} for {width}x{height} RGBA",
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels: pixels.into(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

impl fmt::Debug for StillFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StillFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

/// Where an asset's frames come from.
#[derive(Debug, Clone)]
pub enum AssetLocation {
    /// A local file resolved by the decoder.
    Uri(String),
    /// An in-memory still image; no decoder involved.
    Memory(StillFrame),
}

/// A point-in-time view of an asset handle, handed to the decoder.
#[derive(Debug, Clone)]
pub struct AssetSource {
    pub location: AssetLocation,
    /// Incremented by every successful refresh.
    pub generation: u64,
}

#[derive(Debug)]
struct AssetState {
    generation: u64,
    available: bool,
    last_error: Option<String>,
}

/// The decoder-facing half of a clip.
#[derive(Debug)]
pub struct AssetHandle {
    location: AssetLocation,
    state: RwLock<AssetState>,
}

impl AssetHandle {
    pub fn new(location: AssetLocation) -> Arc<Self> {
        Arc::new(Self {
            location,
            state: RwLock::new(AssetState {
                generation: 0,
                available: true,
                last_error: None,
            }),
        })
    }

    /// An independent handle for the same location with the same state.
    pub fn duplicate(&self) -> Arc<Self> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        Arc::new(Self {
            location: self.location.clone(),
            state: RwLock::new(AssetState {
                generation: state.generation,
                available: state.available,
                last_error: state.last_error.clone(),
            }),
        })
    }

    pub fn location(&self) -> &AssetLocation {
        &self.location
    }

    pub fn uri(&self) -> Option<&str> {
        match &self.location {
            AssetLocation::Uri(uri) => Some(uri),
            AssetLocation::Memory(_) => None,
        }
    }

    pub fn generation(&self) -> u64 {
        self.state.read().unwrap_or_else(|e| e.into_inner()).generation
    }

    pub fn is_available(&self) -> bool {
        self.state.read().unwrap_or_else(|e| e.into_inner()).available
    }

    /// Current source for a decode request.
    pub fn source(&self) -> MontageResult<AssetSource> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        if !state.available {
            let reason = state.last_error.as_deref().unwrap_or("asset needs a refresh");
            return Err(MontageError::decoder_unavailable(reason.to_string()));
        }
        Ok(AssetSource {
            location: self.location.clone(),
            generation: state.generation,
        })
    }

    /// Mark the handle stale without re-acquiring it.
    pub fn invalidate(&self, reason: impl Into<String>) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.available = false;
        state.last_error = Some(reason.into());
    }

    /// Re-acquire the handle by probing the source again.
    ///
    /// On failure the handle stays unavailable and the error is
    /// [`MontageError::DecoderUnavailable`].
    pub fn refresh(&self, probe: &dyn MediaProbe) -> MontageResult<u64> {
        let probed = match &self.location {
            AssetLocation::Memory(_) => Ok(()),
            AssetLocation::Uri(uri) => probe.probe(uri).map(|_| ()),
        };

        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        match probed {
            Ok(()) => {
                state.generation += 1;
                state.available = true;
                state.last_error = None;
                tracing::debug!(generation = state.generation, "Asset handle refreshed");
                Ok(state.generation)
            }
            Err(e) => {
                let message = format!("refresh failed: {e}");
                state.available = false;
                state.last_error = Some(message.clone());
                Err(MontageError::decoder_unavailable(message))
            }
        }
    }
}

/// Outcome of delivering one interruption.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub refreshed: usize,
    pub failed: usize,
}

struct BusInner {
    probe: Arc<dyn MediaProbe>,
    next_id: AtomicU64,
    subscribers: Mutex<HashMap<u64, Weak<AssetHandle>>>,
}

/// Process-wide interruption notifications.
///
/// Cloning the bus yields another handle to the same subscriber set.
#[derive(Clone)]
pub struct InterruptionBus {
    inner: Arc<BusInner>,
}

impl InterruptionBus {
    pub fn new(probe: Arc<dyn MediaProbe>) -> Self {
        Self {
            inner: Arc::new(BusInner {
                probe,
                next_id: AtomicU64::new(1),
                subscribers: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Register an asset handle to be refreshed on every interruption.
    pub fn subscribe(&self, handle: &Arc<AssetHandle>) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, Arc::downgrade(handle));
        Subscription {
            id,
            bus: Arc::downgrade(&self.inner),
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Deliver an interruption: every subscribed handle is refreshed.
    ///
    /// Individual refresh failures are logged and counted; they leave that
    /// handle unavailable until a later refresh succeeds.
    pub fn notify(&self) -> RefreshReport {
        let handles: Vec<Arc<AssetHandle>> = {
            let mut subscribers = self
                .inner
                .subscribers
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            subscribers.retain(|_, weak| weak.strong_count() > 0);
            subscribers.values().filter_map(Weak::upgrade).collect()
        };

        tracing::info!(handles = handles.len(), "Media services interrupted, refreshing assets");

        let mut report = RefreshReport::default();
        for handle in handles {
            match handle.refresh(self.inner.probe.as_ref()) {
                Ok(_) => report.refreshed += 1,
                Err(e) => {
                    tracing::warn!(uri = ?handle.uri(), error = %e, "Asset refresh failed");
                    report.failed += 1;
                }
            }
        }
        report
    }

    pub fn probe(&self) -> &Arc<dyn MediaProbe> {
        &self.inner.probe
    }
}

impl fmt::Debug for InterruptionBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterruptionBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Keeps a handle registered on a bus; unsubscribes on drop.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    bus: Weak<BusInner>,
}

impl Subscription {
    /// Subscribe another handle to the same bus, if it is still alive.
    pub fn resubscribe(&self, handle: &Arc<AssetHandle>) -> Option<Subscription> {
        self.bus
            .upgrade()
            .map(|inner| InterruptionBus { inner }.subscribe(handle))
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.bus.upgrade() {
            inner
                .subscribers
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .remove(&self.id);
        }
    }
}

/// Everything clip construction needs from the outside world.
#[derive(Debug, Clone)]
pub struct MediaContext {
    bus: InterruptionBus,
    image_duration_secs: f64,
}

impl MediaContext {
    /// Default main-track duration for image clips opened from a file.
    pub const DEFAULT_IMAGE_DURATION_SECS: f64 = 3.0;

    pub fn new(probe: Arc<dyn MediaProbe>) -> Self {
        Self {
            bus: InterruptionBus::new(probe),
            image_duration_secs: Self::DEFAULT_IMAGE_DURATION_SECS,
        }
    }

    pub fn with_image_duration(mut self, secs: f64) -> Self {
        self.image_duration_secs = secs;
        self
    }

    pub fn probe(&self) -> &Arc<dyn MediaProbe> {
        self.bus.probe()
    }

    pub fn bus(&self) -> &InterruptionBus {
        &self.bus
    }

    pub fn image_duration_secs(&self) -> f64 {
        self.image_duration_secs
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory probe used by tests across the crate.

    use super::*;

    #[derive(Default)]
    pub struct FakeProbe {
        pub sources: Mutex<HashMap<String, MediaInfo>>,
        pub calls: AtomicU64,
    }

    impl FakeProbe {
        pub fn with_video(self, uri: &str, duration_secs: f64, width: u32, height: u32) -> Self {
            self.insert(
                uri,
                MediaInfo {
                    duration_secs: Some(duration_secs),
                    width,
                    height,
                    preferred_volume: Some(0.8),
                },
            );
            self
        }

        pub fn with_image(self, uri: &str, width: u32, height: u32) -> Self {
            self.insert(
                uri,
                MediaInfo {
                    duration_secs: None,
                    width,
                    height,
                    preferred_volume: None,
                },
            );
            self
        }

        pub fn insert(&self, uri: &str, info: MediaInfo) {
            self.sources
                .lock()
                .unwrap()
                .insert(uri.to_string(), info);
        }

        pub fn remove(&self, uri: &str) {
            self.sources.lock().unwrap().remove(uri);
        }
    }

    impl MediaProbe for FakeProbe {
        fn probe(&self, uri: &str) -> MontageResult<MediaInfo> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            self.sources
                .lock()
                .unwrap()
                .get(uri)
                .cloned()
                .ok_or_else(|| MontageError::resource(format!("no such source: {uri}")))
        }
    }

    pub fn context(probe: FakeProbe) -> (Arc<FakeProbe>, MediaContext) {
        let probe = Arc::new(probe);
        let ctx = MediaContext::new(probe.clone());
        (probe, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn test_still_frame_validates_buffer() {
        assert!(StillFrame::new(2, 2, vec![0; 16]).is_ok());
        assert!(matches!(
            StillFrame::new(2, 2, vec![0; 15]),
            Err(MontageError::Resource { .. })
        ));
        assert!(StillFrame::new(0, 2, vec![]).is_err());
    }

    #[test]
    fn test_refresh_bumps_generation() {
        let (probe, _ctx) = context(FakeProbe::default().with_video("a.mp4", 10.0, 640, 360));
        let handle = AssetHandle::new(AssetLocation::Uri("a.mp4".into()));
        assert_eq!(handle.generation(), 0);
        assert_eq!(handle.refresh(probe.as_ref()).unwrap(), 1);
        assert_eq!(handle.source().unwrap().generation, 1);
    }

    #[test]
    fn test_failed_refresh_marks_unavailable() {
        let (probe, _ctx) = context(FakeProbe::default());
        let handle = AssetHandle::new(AssetLocation::Uri("gone.mp4".into()));
        let err = handle.refresh(probe.as_ref()).unwrap_err();
        assert!(matches!(err, MontageError::DecoderUnavailable { .. }));
        assert!(matches!(
            handle.source(),
            Err(MontageError::DecoderUnavailable { .. })
        ));
    }

    #[test]
    fn test_bus_refreshes_subscribers_and_forgets_dropped_ones() {
        let (_probe, ctx) = context(FakeProbe::default().with_video("a.mp4", 10.0, 640, 360));
        let a = AssetHandle::new(AssetLocation::Uri("a.mp4".into()));
        let b = AssetHandle::new(AssetLocation::Uri("missing.mp4".into()));

        let sub_a = ctx.bus().subscribe(&a);
        let sub_b = ctx.bus().subscribe(&b);
        assert_eq!(ctx.bus().subscriber_count(), 2);

        let report = ctx.bus().notify();
        assert_eq!(report, RefreshReport { refreshed: 1, failed: 1 });
        assert_eq!(a.generation(), 1);
        assert!(!b.is_available());

        drop(sub_b);
        assert_eq!(ctx.bus().subscriber_count(), 1);
        drop(sub_a);
        assert_eq!(ctx.bus().subscriber_count(), 0);
    }
}

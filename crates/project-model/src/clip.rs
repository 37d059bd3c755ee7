//! Clips: one media segment and how it is placed in time and space.
//!
//! A [`Clip`] is either audio/video (trim range, speed, volume) or a still
//! image (fixed frame, explicit duration). The kind is a closed variant;
//! time fields are only changed through [`TimeMapper`] so that
//! `speed == trim.duration / main_track_duration` always holds.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use montage_common::{Diagnostic, MontageError, MontageResult, TimeRange};

use crate::media::{AssetHandle, AssetLocation, MediaContext, MediaProbe, StillFrame, Subscription};
use crate::region::{DestRegion, Size, SourceRegion};
use crate::time_map::TimeMapper;

/// Type of clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipKind {
    AudioVideo,
    Image,
}

/// What a clip kind supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Has a trim range and playback speed.
    pub has_trim_and_speed: bool,
    /// Shows a single fixed frame for its whole duration.
    pub is_still_image: bool,
}

impl ClipKind {
    pub fn capabilities(self) -> Capabilities {
        match self {
            ClipKind::AudioVideo => Capabilities {
                has_trim_and_speed: true,
                is_still_image: false,
            },
            ClipKind::Image => Capabilities {
                has_trim_and_speed: false,
                is_still_image: true,
            },
        }
    }
}

/// How the source region is fitted into the destination region when their
/// aspect ratios differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalingMode {
    /// No scaling; native size, centered.
    None,
    /// Preserve aspect ratio, letterbox.
    #[default]
    Fit,
    /// Preserve aspect ratio, crop.
    Fill,
    /// Ignore aspect ratio.
    Stretch,
}

/// Time state of an audio/video clip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct AvTiming {
    pub(crate) source_duration_secs: f64,
    pub(crate) trim: TimeRange,
    pub(crate) speed: f64,
    pub(crate) volume: f32,
}

#[derive(Debug, Clone)]
pub(crate) enum ClipMedia {
    AudioVideo(AvTiming),
    Image,
}

/// One media segment on a timeline.
pub struct Clip {
    id: String,
    kind: ClipKind,
    source_size: Size,
    source_region: SourceRegion,
    dest_region: DestRegion,
    rotation: f64,
    scaling_mode: ScalingMode,
    pub(crate) main_track_duration_secs: f64,
    pub(crate) media: ClipMedia,
    asset: Arc<AssetHandle>,
    probe: Arc<dyn MediaProbe>,
    subscription: Option<Subscription>,
}

impl Clip {
    /// Open a clip from a local source.
    ///
    /// Audio/video sources must report a positive duration; image sources
    /// must report non-zero dimensions and get the context's default image
    /// duration. Any failure is a [`MontageError::Resource`].
    pub fn open(kind: ClipKind, uri: impl Into<String>, ctx: &MediaContext) -> MontageResult<Self> {
        let uri = uri.into();
        let info = ctx.probe().probe(&uri).map_err(|e| match e {
            MontageError::Resource { .. } => e,
            other => MontageError::resource(format!("cannot open {uri}: {other}")),
        })?;

        let source_size = Size::new(info.width as f64, info.height as f64);

        let (media, main_track_duration_secs) = match kind {
            ClipKind::AudioVideo => {
                let duration = info
                    .duration_secs
                    .filter(|d| d.is_finite() && *d > 0.0)
                    .ok_or_else(|| {
                        MontageError::resource(format!("{uri} does not report a playable duration"))
                    })?;
                let timing = AvTiming {
                    source_duration_secs: duration,
                    trim: TimeRange::from_duration(duration),
                    speed: 1.0,
                    volume: info.preferred_volume.unwrap_or(1.0).clamp(0.0, 1.0),
                };
                (ClipMedia::AudioVideo(timing), duration)
            }
            ClipKind::Image => {
                if source_size.is_empty() {
                    return Err(MontageError::resource(format!("{uri} is not a readable image")));
                }
                (ClipMedia::Image, ctx.image_duration_secs())
            }
        };

        tracing::debug!(%uri, ?kind, duration = main_track_duration_secs, "Opened clip");

        Ok(Self::assemble(
            kind,
            source_size,
            media,
            main_track_duration_secs,
            AssetLocation::Uri(uri),
            ctx,
        ))
    }

    /// Create an image clip from an in-memory frame shown for `duration_secs`.
    pub fn from_image(
        frame: StillFrame,
        duration_secs: f64,
        ctx: &MediaContext,
    ) -> MontageResult<Self> {
        if !duration_secs.is_finite() || duration_secs < 0.0 {
            return Err(MontageError::invalid_parameter(format!(
                "image duration must be a non-negative number of seconds, got {duration_secs}"
            )));
        }
        let source_size = Size::new(frame.width() as f64, frame.height() as f64);
        Ok(Self::assemble(
            ClipKind::Image,
            source_size,
            ClipMedia::Image,
            duration_secs,
            AssetLocation::Memory(frame),
            ctx,
        ))
    }

    /// Rebuild a clip from its persisted description, re-validating the source.
    pub fn from_spec(spec: &ClipSpec, ctx: &MediaContext) -> MontageResult<Self> {
        let uri = spec.source_uri.as_deref().ok_or_else(|| {
            MontageError::project(format!(
                "clip '{}' has no source; in-memory images cannot be restored",
                spec.id
            ))
        })?;

        let mut clip = Self::open(spec.kind, uri, ctx)?;
        clip.id = spec.id.clone();
        clip.source_region = spec.source_region;
        clip.dest_region = spec.dest_region;
        clip.set_rotation(spec.rotation)?;
        clip.scaling_mode = spec.scaling_mode;

        // Trim first: it sets speed against the full-length duration, and the
        // duration below then brings speed back to the saved value.
        if let Some(trim) = spec.trim {
            TimeMapper::set_trim_range(&mut clip, trim)?;
        }
        TimeMapper::set_main_track_duration(&mut clip, spec.main_track_duration_secs)?;
        if let Some(volume) = spec.volume {
            clip.set_volume(volume)?;
        }
        Ok(clip)
    }

    fn assemble(
        kind: ClipKind,
        source_size: Size,
        media: ClipMedia,
        main_track_duration_secs: f64,
        location: AssetLocation,
        ctx: &MediaContext,
    ) -> Self {
        let asset = AssetHandle::new(location);
        let subscription = Some(ctx.bus().subscribe(&asset));
        Self {
            id: String::new(),
            kind,
            source_size,
            source_region: SourceRegion::Full,
            dest_region: DestRegion::Full,
            rotation: 0.0,
            scaling_mode: ScalingMode::default(),
            main_track_duration_secs,
            media,
            asset,
            probe: ctx.probe().clone(),
            subscription,
        }
    }

    /// The persisted description of this clip.
    pub fn spec(&self) -> ClipSpec {
        ClipSpec {
            id: self.id.clone(),
            kind: self.kind,
            source_uri: self.source_uri().map(str::to_string),
            source_region: self.source_region,
            dest_region: self.dest_region,
            rotation: self.rotation,
            scaling_mode: self.scaling_mode,
            main_track_duration_secs: self.main_track_duration_secs,
            trim: self.trim_range(),
            volume: self.volume(),
        }
    }

    /// Re-acquire the decoder handle after an interruption.
    ///
    /// Public fields are never touched. Fails with
    /// [`MontageError::DecoderUnavailable`] if the source no longer resolves.
    pub fn refresh_asset(&self) -> MontageResult<()> {
        self.asset.refresh(self.probe.as_ref()).map(|generation| {
            tracing::debug!(id = %self.id, generation, "Clip asset refreshed");
        })
    }

    // --- identity and placement ---

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    pub fn kind(&self) -> ClipKind {
        self.kind
    }

    pub fn capabilities(&self) -> Capabilities {
        self.kind.capabilities()
    }

    /// Local source path; `None` for in-memory images.
    pub fn source_uri(&self) -> Option<&str> {
        self.asset.uri()
    }

    /// Native size of the source content.
    pub fn source_size(&self) -> Size {
        self.source_size
    }

    pub fn source_region(&self) -> SourceRegion {
        self.source_region
    }

    pub fn set_source_region(&mut self, region: SourceRegion) {
        self.source_region = region;
    }

    pub fn dest_region(&self) -> DestRegion {
        self.dest_region
    }

    pub fn set_dest_region(&mut self, region: DestRegion) {
        self.dest_region = region;
    }

    /// Rotation in radians around the center of the destination region.
    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    pub fn set_rotation(&mut self, radians: f64) -> MontageResult<()> {
        if !radians.is_finite() {
            return Err(MontageError::invalid_parameter("rotation must be finite"));
        }
        self.rotation = radians;
        Ok(())
    }

    pub fn scaling_mode(&self) -> ScalingMode {
        self.scaling_mode
    }

    pub fn set_scaling_mode(&mut self, mode: ScalingMode) {
        self.scaling_mode = mode;
    }

    // --- time ---

    /// Seconds this clip occupies on the main track.
    pub fn main_track_duration_secs(&self) -> f64 {
        self.main_track_duration_secs
    }

    /// See [`TimeMapper::set_main_track_duration`].
    pub fn set_main_track_duration(&mut self, secs: f64) -> MontageResult<()> {
        TimeMapper::set_main_track_duration(self, secs)
    }

    /// See [`TimeMapper::set_speed`].
    pub fn set_speed(&mut self, speed: f64) -> MontageResult<()> {
        TimeMapper::set_speed(self, speed)
    }

    /// See [`TimeMapper::set_trim_range`].
    pub fn set_trim_range(&mut self, range: TimeRange) -> MontageResult<Option<Diagnostic>> {
        TimeMapper::set_trim_range(self, range)
    }

    /// Total length of the source, audio/video only.
    pub fn source_duration_secs(&self) -> Option<f64> {
        self.timing().map(|t| t.source_duration_secs)
    }

    /// Used part of the source, audio/video only.
    pub fn trim_range(&self) -> Option<TimeRange> {
        self.timing().map(|t| t.trim)
    }

    /// Playback speed, audio/video only.
    pub fn speed(&self) -> Option<f64> {
        self.timing().map(|t| t.speed)
    }

    pub fn volume(&self) -> Option<f32> {
        self.timing().map(|t| t.volume)
    }

    pub fn set_volume(&mut self, volume: f32) -> MontageResult<()> {
        if !(0.0..=1.0).contains(&volume) {
            return Err(MontageError::invalid_parameter(format!(
                "volume must be within [0, 1], got {volume}"
            )));
        }
        match &mut self.media {
            ClipMedia::AudioVideo(timing) => {
                timing.volume = volume;
                Ok(())
            }
            ClipMedia::Image => Err(MontageError::invalid_parameter("image clips have no volume")),
        }
    }

    /// The in-memory frame of an image clip built with [`Clip::from_image`].
    pub fn still_frame(&self) -> Option<&StillFrame> {
        match self.asset.location() {
            AssetLocation::Memory(frame) => Some(frame),
            AssetLocation::Uri(_) => None,
        }
    }

    /// The shared decoder-facing handle.
    pub fn asset(&self) -> &Arc<AssetHandle> {
        &self.asset
    }

    pub(crate) fn timing(&self) -> Option<&AvTiming> {
        match &self.media {
            ClipMedia::AudioVideo(timing) => Some(timing),
            ClipMedia::Image => None,
        }
    }
}

impl Clone for Clip {
    /// A value-independent duplicate with its own asset handle and its own
    /// bus subscription.
    fn clone(&self) -> Self {
        let asset = self.asset.duplicate();
        let subscription = self
            .subscription
            .as_ref()
            .and_then(|sub| sub.resubscribe(&asset));
        Self {
            id: self.id.clone(),
            kind: self.kind,
            source_size: self.source_size,
            source_region: self.source_region,
            dest_region: self.dest_region,
            rotation: self.rotation,
            scaling_mode: self.scaling_mode,
            main_track_duration_secs: self.main_track_duration_secs,
            media: self.media.clone(),
            asset,
            probe: self.probe.clone(),
            subscription,
        }
    }
}

impl fmt::Debug for Clip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Clip")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("source", &self.asset.location())
            .field("main_track_duration_secs", &self.main_track_duration_secs)
            .field("trim", &self.trim_range())
            .field("speed", &self.speed())
            .field("scaling_mode", &self.scaling_mode)
            .finish_non_exhaustive()
    }
}

/// Serializable description of a clip, re-validated on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipSpec {
    #[serde(default)]
    pub id: String,
    pub kind: ClipKind,
    pub source_uri: Option<String>,
    #[serde(default)]
    pub source_region: SourceRegion,
    #[serde(default)]
    pub dest_region: DestRegion,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub scaling_mode: ScalingMode,
    pub main_track_duration_secs: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trim: Option<TimeRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::testing::{context, FakeProbe};
    use crate::region::Rect;

    fn probe() -> FakeProbe {
        FakeProbe::default()
            .with_video("a.mp4", 10.0, 1920, 1080)
            .with_image("still.png", 800, 600)
    }

    #[test]
    fn test_open_av_defaults_to_full_source() {
        let (_, ctx) = context(probe());
        let clip = Clip::open(ClipKind::AudioVideo, "a.mp4", &ctx).unwrap();
        assert_eq!(clip.trim_range(), Some(TimeRange::new(0.0, 10.0)));
        assert_eq!(clip.speed(), Some(1.0));
        assert_eq!(clip.main_track_duration_secs(), 10.0);
        assert_eq!(clip.volume(), Some(0.8));
        assert_eq!(clip.source_size(), Size::new(1920.0, 1080.0));
        assert_eq!(clip.source_region(), SourceRegion::Full);
        assert_eq!(clip.dest_region(), DestRegion::Full);
    }

    #[test]
    fn test_open_unresolvable_is_resource_error() {
        let (_, ctx) = context(probe());
        let err = Clip::open(ClipKind::AudioVideo, "missing.mp4", &ctx).unwrap_err();
        assert!(matches!(err, MontageError::Resource { .. }));
    }

    #[test]
    fn test_open_image_as_av_is_rejected() {
        let (_, ctx) = context(probe());
        let err = Clip::open(ClipKind::AudioVideo, "still.png", &ctx).unwrap_err();
        assert!(matches!(err, MontageError::Resource { .. }));
    }

    #[test]
    fn test_image_clip_uses_default_duration_and_has_no_speed() {
        let (_, ctx) = context(probe());
        let clip = Clip::open(ClipKind::Image, "still.png", &ctx).unwrap();
        assert_eq!(clip.main_track_duration_secs(), MediaContext::DEFAULT_IMAGE_DURATION_SECS);
        assert!(clip.speed().is_none());
        assert!(clip.capabilities().is_still_image);
    }

    #[test]
    fn test_from_image_validates_duration() {
        let (_, ctx) = context(probe());
        let frame = StillFrame::new(2, 2, vec![255; 16]).unwrap();
        assert!(Clip::from_image(frame.clone(), 2.5, &ctx).is_ok());
        assert!(matches!(
            Clip::from_image(frame, -1.0, &ctx),
            Err(MontageError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_clone_is_value_independent() {
        let (_, ctx) = context(probe());
        let mut original = Clip::open(ClipKind::AudioVideo, "a.mp4", &ctx).unwrap();
        original.set_id("a");
        let mut copy = original.clone();

        copy.set_id("b");
        copy.set_speed(2.0).unwrap();
        copy.set_dest_region(DestRegion::Rect(Rect::new(0.0, 0.0, 10.0, 10.0)));
        copy.refresh_asset().unwrap();

        assert_eq!(original.id(), "a");
        assert_eq!(original.speed(), Some(1.0));
        assert_eq!(original.dest_region(), DestRegion::Full);
        assert_eq!(original.asset().generation(), 0);
        assert_eq!(copy.asset().generation(), 1);
        assert_eq!(ctx.bus().subscriber_count(), 2);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let (_, ctx) = context(probe());
        let clip = Clip::open(ClipKind::AudioVideo, "a.mp4", &ctx).unwrap();
        assert_eq!(ctx.bus().subscriber_count(), 1);
        drop(clip);
        assert_eq!(ctx.bus().subscriber_count(), 0);
    }

    #[test]
    fn test_refresh_failure_keeps_fields() {
        let (probe, ctx) = context(probe());
        let mut clip = Clip::open(ClipKind::AudioVideo, "a.mp4", &ctx).unwrap();
        clip.set_speed(2.0).unwrap();
        probe.remove("a.mp4");

        let err = clip.refresh_asset().unwrap_err();
        assert!(matches!(err, MontageError::DecoderUnavailable { .. }));
        assert_eq!(clip.speed(), Some(2.0));
        assert_eq!(clip.main_track_duration_secs(), 5.0);
        assert_eq!(clip.source_uri(), Some("a.mp4"));
    }

    #[test]
    fn test_interruption_refreshes_live_clips() {
        let (_, ctx) = context(probe());
        let clip = Clip::open(ClipKind::AudioVideo, "a.mp4", &ctx).unwrap();
        let report = ctx.bus().notify();
        assert_eq!(report.refreshed, 1);
        assert_eq!(clip.asset().generation(), 1);
    }

    #[test]
    fn test_spec_round_trip_restores_timing() {
        let (_, ctx) = context(probe());
        let mut clip = Clip::open(ClipKind::AudioVideo, "a.mp4", &ctx).unwrap();
        clip.set_id("intro");
        clip.set_trim_range(TimeRange::new(2.0, 6.0)).unwrap();
        clip.set_main_track_duration(3.0).unwrap();
        clip.set_volume(0.5).unwrap();
        clip.set_scaling_mode(ScalingMode::Fill);

        let json = serde_json::to_string(&clip.spec()).unwrap();
        let spec: ClipSpec = serde_json::from_str(&json).unwrap();
        let restored = Clip::from_spec(&spec, &ctx).unwrap();

        assert_eq!(restored.id(), "intro");
        assert_eq!(restored.trim_range(), Some(TimeRange::new(2.0, 6.0)));
        assert!((restored.speed().unwrap() - 2.0).abs() < 1e-9);
        assert!((restored.main_track_duration_secs() - 3.0).abs() < 1e-9);
        assert_eq!(restored.volume(), Some(0.5));
        assert_eq!(restored.scaling_mode(), ScalingMode::Fill);
    }

    #[test]
    fn test_volume_bounds() {
        let (_, ctx) = context(probe());
        let mut clip = Clip::open(ClipKind::AudioVideo, "a.mp4", &ctx).unwrap();
        assert!(clip.set_volume(1.5).is_err());
        assert_eq!(clip.volume(), Some(0.8));

        let mut image = Clip::open(ClipKind::Image, "still.png", &ctx).unwrap();
        assert!(image.set_volume(0.5).is_err());
    }
}

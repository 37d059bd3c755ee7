//! Montage Processing Core
//!
//! Turns the editing model into per-time answers:
//! - **Geometry:** where a clip's source lands in the output frame
//! - **Composer:** which clips are active at a timeline time, and at what source time
//! - **Transitions:** per-layer opacity, offset, and reveal inside a transition window
//! - **Sampling:** evenly spaced snapshot times
//!
//! This crate is pure computation: no I/O and no decoding. All inputs are
//! data; all outputs are data.

pub mod composer;
pub mod geometry;
pub mod sampling;
pub mod transition;

pub use composer::{ActiveClip, ActiveOverlay, ActiveTransition, Resolution, TimelineComposer};
pub use geometry::{Affine2D, ClipPlacement, GeometryResolver, Placement};
pub use sampling::GeneratorRequest;
pub use transition::{evaluate_transition, LayerModification, TransitionEffect};

#[cfg(test)]
pub(crate) mod testing {
    //! Clip builders for unit tests.

    use std::sync::Arc;

    use montage_common::{MontageResult, TimeRange};
    use montage_project_model::clip::{Clip, ClipKind};
    use montage_project_model::media::{MediaContext, MediaInfo, MediaProbe, StillFrame};

    /// Every source is a one-minute 1280x720 video.
    struct MinuteProbe;

    impl MediaProbe for MinuteProbe {
        fn probe(&self, _uri: &str) -> MontageResult<MediaInfo> {
            Ok(MediaInfo {
                duration_secs: Some(60.0),
                width: 1280,
                height: 720,
                preferred_volume: None,
            })
        }
    }

    pub fn context() -> MediaContext {
        MediaContext::new(Arc::new(MinuteProbe))
    }

    /// A clip playing the first `duration` seconds of its source at speed 1.
    pub fn av_clip(ctx: &MediaContext, id: &str, duration: f64) -> Clip {
        let mut clip = Clip::open(ClipKind::AudioVideo, format!("{id}.mp4"), ctx).unwrap();
        clip.set_id(id);
        clip.set_trim_range(TimeRange::new(0.0, duration)).unwrap();
        clip.set_speed(1.0).unwrap();
        clip
    }

    pub fn image_clip(ctx: &MediaContext, id: &str, duration: f64) -> Clip {
        let frame = StillFrame::new(2, 2, vec![255; 16]).unwrap();
        let mut clip = Clip::from_image(frame, duration, ctx).unwrap();
        clip.set_id(id);
        clip
    }
}

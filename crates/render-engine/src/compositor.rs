//! Frame compositor: combines main-track clips, transitions, and overlays.
//!
//! This module computes the per-frame composition instructions a renderer
//! or exporter consumes: which clips to draw, at what source time, where,
//! and with what opacity. It does no pixel work itself.

use serde::Serialize;

use montage_common::{MontageError, MontageResult};
use montage_processing_core::composer::{ActiveClip, TimelineComposer};
use montage_processing_core::geometry::{Affine2D, GeometryResolver};
use montage_processing_core::transition::{evaluate_transition, LayerModification};
use montage_project_model::clip::Clip;
use montage_project_model::region::{Rect, Size};

/// Where a layer comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerRole {
    /// Main-track clip being transitioned away from.
    Outgoing,
    /// The active main-track clip.
    Main,
    /// An overlay clip.
    Overlay,
}

/// Drawing instructions for one clip in one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerInstruction {
    pub role: LayerRole,
    /// Index on the main track or the overlay list.
    pub track_index: usize,
    pub clip_id: String,
    /// Source time to decode.
    pub local_time_secs: f64,
    /// Source pixels to output pixels, including any transition offset.
    pub transform: Affine2D,
    /// Output area to draw into, before rotation.
    pub visible: Rect,
    /// Source area that lands in `visible`.
    pub visible_source: Rect,
    /// Output area the layer is restricted to by a wipe.
    pub reveal: Option<Rect>,
    pub opacity: f64,
    /// Audio/video clips only.
    pub volume: Option<f32>,
    /// Zero-area geometry; renderers skip the layer.
    pub degenerate: bool,
}

/// A single frame's composition instructions, bottom layer first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameComposition {
    /// Frame number.
    pub frame_index: u64,

    /// Time in seconds.
    pub time_secs: f64,

    pub layers: Vec<LayerInstruction>,
}

/// Compose the frame at `time_secs`.
///
/// Layers are ordered outgoing clip, main clip, then overlays in insertion
/// order.
pub fn compose_frame(
    composer: &TimelineComposer,
    frame_index: u64,
    time_secs: f64,
) -> MontageResult<FrameComposition> {
    let resolution = composer.resolve(time_secs)?;
    let timeline = composer.timeline();
    let render_size = timeline.render_size;

    let mut layers = Vec::with_capacity(2 + resolution.overlays.len());

    match &resolution.transition {
        Some(transition) => {
            let effect = evaluate_transition(transition.kind, transition.progress);
            let outgoing = &timeline.main_track()[transition.outgoing.index].clip;
            layers.push(layer(
                LayerRole::Outgoing,
                &transition.outgoing,
                outgoing,
                render_size,
                &effect.outgoing,
            ));
            let main = &timeline.main_track()[resolution.main.index].clip;
            layers.push(layer(
                LayerRole::Main,
                &resolution.main,
                main,
                render_size,
                &effect.incoming,
            ));
        }
        None => {
            let main = &timeline.main_track()[resolution.main.index].clip;
            layers.push(layer(
                LayerRole::Main,
                &resolution.main,
                main,
                render_size,
                &LayerModification::default(),
            ));
        }
    }

    for active in &resolution.overlays {
        let overlay = &timeline.overlays()[active.index].clip;
        layers.push(layer(
            LayerRole::Overlay,
            active,
            overlay,
            render_size,
            &LayerModification::default(),
        ));
    }

    Ok(FrameComposition {
        frame_index,
        time_secs,
        layers,
    })
}

fn layer(
    role: LayerRole,
    active: &ActiveClip,
    clip: &Clip,
    render_size: Size,
    modification: &LayerModification,
) -> LayerInstruction {
    let placed = GeometryResolver::resolve_clip(clip, render_size);
    let placement = placed.placement;

    let [dx, dy] = modification.offset;
    let offset = (dx * render_size.width, dy * render_size.height);
    let transform = placement
        .transform
        .then(&Affine2D::translation(offset.0, offset.1));
    let visible = Rect::new(
        placement.visible.x + offset.0,
        placement.visible.y + offset.1,
        placement.visible.w,
        placement.visible.h,
    );
    let reveal = modification.reveal.map(|r| {
        Rect::new(
            r.x * render_size.width,
            r.y * render_size.height,
            r.w * render_size.width,
            r.h * render_size.height,
        )
    });

    LayerInstruction {
        role,
        track_index: active.index,
        clip_id: active.id.clone(),
        local_time_secs: active.local_time_secs,
        transform,
        visible,
        visible_source: placement.visible_source,
        reveal,
        opacity: modification.opacity,
        volume: clip.volume(),
        degenerate: placement.degenerate,
    }
}

/// Compute the composition for each output frame of the timeline.
pub fn compute_compositions(
    composer: &TimelineComposer,
    fps: u32,
) -> MontageResult<Vec<FrameComposition>> {
    if fps == 0 {
        return Err(MontageError::invalid_parameter("fps must be at least 1"));
    }

    let duration_secs = composer.total_duration_secs();
    let total_frames = (duration_secs * fps as f64).ceil() as u64;
    let mut compositions = Vec::with_capacity(total_frames as usize);

    for frame in 0..total_frames {
        let time_secs = frame as f64 / fps as f64;
        compositions.push(compose_frame(composer, frame, time_secs)?);
    }

    tracing::debug!(frames = compositions.len(), fps, "Computed frame compositions");
    Ok(compositions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{av_clip, context, image_clip};
    use montage_project_model::region::DestRegion;
    use montage_project_model::timeline::{Direction, Timeline, Transition, TransitionKind};

    fn composer() -> TimelineComposer {
        let ctx = context();
        let mut timeline = Timeline::new(Size::new(1280.0, 720.0));
        timeline.push_main(av_clip(&ctx, "a", 2.0));
        timeline.push_main(av_clip(&ctx, "b", 2.0));
        let slide = TransitionKind::Slide {
            direction: Direction::Left,
        };
        timeline
            .set_transition(0, Some(Transition::new(slide, 1.0).unwrap()))
            .unwrap();
        let mut logo = image_clip(&ctx, "logo", 1.0);
        logo.set_dest_region(DestRegion::Rect(Rect::new(0.0, 0.0, 100.0, 100.0)));
        timeline.add_overlay(logo, 0.0).unwrap();
        TimelineComposer::new(timeline)
    }

    #[test]
    fn test_single_clip_frame() {
        let frame = compose_frame(&composer(), 0, 0.0).unwrap();
        let roles: Vec<LayerRole> = frame.layers.iter().map(|l| l.role).collect();
        assert_eq!(roles, vec![LayerRole::Main, LayerRole::Overlay]);
        assert_eq!(frame.layers[0].opacity, 1.0);
        assert_eq!(frame.layers[0].volume, Some(1.0));
        assert_eq!(frame.layers[1].volume, None);
    }

    #[test]
    fn test_transition_frame_has_offset_layers() {
        let frame = compose_frame(&composer(), 0, 1.5).unwrap();
        let roles: Vec<LayerRole> = frame.layers.iter().map(|l| l.role).collect();
        assert_eq!(roles, vec![LayerRole::Outgoing, LayerRole::Main]);

        // Halfway through a left slide: outgoing is half a frame left,
        // incoming half a frame right.
        assert!((frame.layers[0].visible.x + 640.0).abs() < 1e-9);
        assert!((frame.layers[1].visible.x - 640.0).abs() < 1e-9);
        assert!((frame.layers[1].transform.tx - 640.0).abs() < 1e-9);
    }

    #[test]
    fn test_compute_compositions_covers_timeline() {
        let frames = compute_compositions(&composer(), 10).unwrap();
        assert_eq!(frames.len(), 30);
        assert_eq!(frames[29].frame_index, 29);
        assert!(compute_compositions(&composer(), 0).is_err());
    }
}

//! End-to-end resolution over a small short-video edit.

use std::collections::HashMap;
use std::sync::Arc;

use montage_common::{MontageError, MontageResult, TimeRange};
use montage_processing_core::{GeneratorRequest, GeometryResolver, TimelineComposer};
use montage_project_model::{
    Clip, ClipKind, DestRegion, Direction, MediaContext, MediaInfo, MediaProbe, Rect, ScalingMode,
    Size, Timeline, Transition, TransitionKind,
};

struct LibraryProbe(HashMap<&'static str, MediaInfo>);

impl MediaProbe for LibraryProbe {
    fn probe(&self, uri: &str) -> MontageResult<MediaInfo> {
        self.0
            .get(uri)
            .cloned()
            .ok_or_else(|| MontageError::resource(format!("unknown source {uri}")))
    }
}

fn video(duration: f64, width: u32, height: u32) -> MediaInfo {
    MediaInfo {
        duration_secs: Some(duration),
        width,
        height,
        preferred_volume: None,
    }
}

fn reel() -> (MediaContext, TimelineComposer) {
    let probe = LibraryProbe(HashMap::from([
        ("beach.mp4", video(10.0, 1920, 1080)),
        ("city.mp4", video(8.0, 1080, 1920)),
        (
            "sticker.png",
            MediaInfo {
                duration_secs: None,
                width: 256,
                height: 256,
                preferred_volume: None,
            },
        ),
    ]));
    let ctx = MediaContext::new(Arc::new(probe));

    let mut beach = Clip::open(ClipKind::AudioVideo, "beach.mp4", &ctx).unwrap();
    beach.set_id("beach");
    beach.set_trim_range(TimeRange::new(2.0, 6.0)).unwrap();
    beach.set_main_track_duration(3.0).unwrap();
    beach.set_scaling_mode(ScalingMode::Fill);

    let mut city = Clip::open(ClipKind::AudioVideo, "city.mp4", &ctx).unwrap();
    city.set_id("city");

    let mut sticker = Clip::open(ClipKind::Image, "sticker.png", &ctx).unwrap();
    sticker.set_id("sticker");
    sticker.set_dest_region(DestRegion::Rect(Rect::new(40.0, 40.0, 200.0, 200.0)));

    let mut timeline = Timeline::new(Size::new(1080.0, 1920.0));
    timeline.push_main(beach);
    timeline.push_main(city);
    timeline
        .set_transition(
            0,
            Some(Transition::new(TransitionKind::Slide { direction: Direction::Up }, 0.5).unwrap()),
        )
        .unwrap();
    timeline.add_overlay(sticker, 1.0).unwrap();

    (ctx, TimelineComposer::new(timeline))
}

#[test]
fn resolves_main_transition_and_overlay() {
    let (_ctx, composer) = reel();
    assert!((composer.total_duration_secs() - 10.5).abs() < 1e-9);

    let r = composer.resolve(1.0).unwrap();
    assert_eq!(r.main.id, "beach");
    // Trim [2, 8] squeezed into 3s plays at double speed.
    assert!((r.main.local_time_secs - 4.0).abs() < 1e-9);
    assert_eq!(r.overlays.len(), 1);
    assert_eq!(r.overlays[0].local_time_secs, 0.0);

    let r = composer.resolve(2.75).unwrap();
    assert_eq!(r.main.id, "city");
    let transition = r.transition.as_ref().unwrap();
    assert_eq!(transition.outgoing.id, "beach");
    assert!((transition.progress - 0.5).abs() < 1e-9);

    let json = serde_json::to_value(&r).unwrap();
    assert_eq!(json["transition"]["kind"]["slide"]["direction"], "up");
}

#[test]
fn places_every_active_clip() {
    let (_ctx, composer) = reel();
    let render = composer.timeline().render_size;

    let beach = &composer.timeline().main_track()[0].clip;
    let placed = GeometryResolver::resolve_clip(beach, render);
    assert!(!placed.placement.degenerate);
    assert!(placed.placement.visible.approx_eq(&Rect::new(0.0, 0.0, 1080.0, 1920.0)));

    let sticker = &composer.timeline().overlays()[0].clip;
    let placed = GeometryResolver::resolve_clip(sticker, render);
    assert!(placed.placement.placed.approx_eq(&Rect::new(40.0, 40.0, 200.0, 200.0)));
    assert!(placed.diagnostics.is_empty());
}

#[test]
fn sample_times_resolve_across_the_reel() {
    let (_ctx, composer) = reel();
    let range = TimeRange::new(0.0, composer.total_duration_secs());
    let request = GeneratorRequest::new(range, 4).unwrap();
    let ids: Vec<String> = request
        .target_times()
        .into_iter()
        .map(|t| composer.resolve(t).unwrap().main.id)
        .collect();
    assert_eq!(ids, vec!["beach", "city", "city", "city"]);
}

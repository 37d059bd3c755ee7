//! Show what is active at one timeline time.

use std::path::PathBuf;

use montage_common::AppConfig;
use montage_processing_core::{GeometryResolver, TimelineComposer};

use super::open_project;

pub fn run(config: &AppConfig, path: PathBuf, time: f64, json: bool) -> anyhow::Result<()> {
    let open = open_project(config, &path)?;
    let composer = TimelineComposer::new(open.timeline);

    let resolution = composer
        .resolve(time)
        .map_err(|e| anyhow::anyhow!("Cannot resolve {time}s: {e}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&resolution)?);
        return Ok(());
    }

    let timeline = composer.timeline();
    println!("At {:.3}s:", resolution.time_secs);

    let main = &resolution.main;
    let clip = &timeline.main_track()[main.index].clip;
    let placed = GeometryResolver::resolve_clip(clip, timeline.render_size);
    println!(
        "  Main: [{}] {} at {:.3}s (visible {:?})",
        main.index,
        main.id,
        main.local_time_secs,
        placed.placement.visible.to_array()
    );

    if let Some(transition) = &resolution.transition {
        println!(
            "  Transition: {:?} from [{}] {} at {:.3}s, {:.0}% done",
            transition.kind,
            transition.outgoing.index,
            transition.outgoing.id,
            transition.outgoing.local_time_secs,
            transition.progress * 100.0
        );
    }

    for overlay in &resolution.overlays {
        println!(
            "  Overlay: [{}] {} at {:.3}s",
            overlay.index, overlay.id, overlay.local_time_secs
        );
    }

    Ok(())
}

//! Show project information.

use std::path::PathBuf;

use montage_common::AppConfig;
use montage_processing_core::TimelineComposer;
use montage_project_model::ClipSpec;

use super::{load_project, open_project};

pub fn run(config: &AppConfig, path: PathBuf) -> anyhow::Result<()> {
    let project = load_project(&path)?;
    let p = &project.project;

    println!("Project: {}", p.name);
    println!("  ID: {}", p.id);
    println!("  Created: {}", p.created_at);
    println!("  Modified: {}", p.modified_at);
    println!(
        "  Output: {}x{} @ {}fps",
        p.output.width, p.output.height, p.output.fps
    );
    println!();

    println!("Main track:");
    if project.timeline.main_track.is_empty() {
        println!("  (empty)");
    }
    for (i, entry) in project.timeline.main_track.iter().enumerate() {
        println!("  [{i}] {}", describe(&entry.clip));
        if let Some(t) = entry.transition_out {
            println!("      -> {:?} ({:.2}s)", t.kind, t.duration_secs);
        }
    }
    println!();

    println!("Overlays:");
    if project.timeline.overlays.is_empty() {
        println!("  (none)");
    }
    for (i, entry) in project.timeline.overlays.iter().enumerate() {
        println!("  [{i}] at {:.2}s: {}", entry.start_secs, describe(&entry.clip));
    }
    println!();

    // Windows need the real durations, which requires probing the sources.
    let open = match open_project(config, &path) {
        Ok(open) => open,
        Err(e) => {
            println!("Timeline: unavailable ({e})");
            return Ok(());
        }
    };
    let composer = TimelineComposer::new(open.timeline);

    println!("Timeline:");
    for i in 0..composer.timeline().main_track().len() {
        if let Some(window) = composer.clip_window(i) {
            println!(
                "  [{i}] {:.3}s - {:.3}s",
                window.start_secs,
                window.end_secs()
            );
        }
    }
    println!("  Total duration: {:.3}s", composer.total_duration_secs());
    for diagnostic in composer.diagnostics() {
        println!("  [WARN] {diagnostic}");
    }

    Ok(())
}

fn describe(clip: &ClipSpec) -> String {
    let source = clip.source_uri.as_deref().unwrap_or("(in-memory)");
    let mut line = format!(
        "{} {:?} {} ({:.2}s, {:?})",
        clip.id, clip.kind, source, clip.main_track_duration_secs, clip.scaling_mode
    );
    if let Some(trim) = clip.trim {
        line.push_str(&format!(
            " trim {:.2}s+{:.2}s",
            trim.start_secs, trim.duration_secs
        ));
    }
    line
}

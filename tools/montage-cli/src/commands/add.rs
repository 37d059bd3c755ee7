//! Add a clip to a project's timeline.

use std::path::PathBuf;

use clap::Args;

use montage_common::{AppConfig, TimeRange};
use montage_project_model::{Clip, ClipKind, ScalingMode, Transition};

use super::{open_project, parse_transition};

#[derive(Debug, Args)]
pub struct AddArgs {
    /// Path to the project directory
    pub path: PathBuf,

    /// Media file to add
    pub source: PathBuf,

    /// Treat the source as a still image
    #[arg(long)]
    pub image: bool,

    /// Place the clip on an overlay track starting at this time (seconds)
    #[arg(long)]
    pub overlay_at: Option<f64>,

    /// Clip identifier (defaults to the file stem)
    #[arg(long)]
    pub id: Option<String>,

    /// Trim start within the source (seconds)
    #[arg(long, requires = "trim_duration")]
    pub trim_start: Option<f64>,

    /// Trim length within the source (seconds)
    #[arg(long, requires = "trim_start")]
    pub trim_duration: Option<f64>,

    /// Playback speed
    #[arg(long, conflicts_with = "duration")]
    pub speed: Option<f64>,

    /// Time the clip occupies on the timeline (seconds)
    #[arg(long)]
    pub duration: Option<f64>,

    /// Scaling mode: none, fit, fill or stretch
    #[arg(long, default_value = "fit")]
    pub scaling: String,

    /// Transition into this clip from the previous main-track clip
    /// (dissolve, fade, wipe-<dir>, slide-<dir>)
    #[arg(long)]
    pub transition: Option<String>,

    /// Transition length (seconds)
    #[arg(long, default_value = "0.5")]
    pub transition_secs: f64,
}

pub fn run(config: &AppConfig, args: AddArgs) -> anyhow::Result<()> {
    let mut open = open_project(config, &args.path)?;
    let ctx = super::media_context(config, open.backend.clone());

    let source = std::fs::canonicalize(&args.source)
        .map_err(|e| anyhow::anyhow!("Cannot read {}: {e}", args.source.display()))?;
    let kind = if args.image {
        ClipKind::Image
    } else {
        ClipKind::AudioVideo
    };

    let mut clip = Clip::open(kind, source.to_string_lossy().to_string(), &ctx)
        .map_err(|e| anyhow::anyhow!("Failed to open clip: {e}"))?;
    let id = args.id.clone().unwrap_or_else(|| {
        source
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| format!("clip-{}", open.timeline.main_track().len()))
    });
    clip.set_id(id);
    clip.set_scaling_mode(parse_scaling(&args.scaling)?);

    if let (Some(start), Some(duration)) = (args.trim_start, args.trim_duration) {
        if let Some(diagnostic) = clip.set_trim_range(TimeRange::new(start, duration))? {
            println!("[WARN] {diagnostic}");
        }
    }
    if let Some(speed) = args.speed {
        clip.set_speed(speed)?;
    }
    if let Some(duration) = args.duration {
        clip.set_main_track_duration(duration)?;
    }

    let label = clip.id().to_string();
    let length = clip.main_track_duration_secs();
    match args.overlay_at {
        Some(start) => {
            open.timeline.add_overlay(clip, start)?;
            println!("Added overlay '{label}' at {start:.2}s ({length:.2}s)");
        }
        None => {
            if let Some(name) = &args.transition {
                let previous = open.timeline.main_track().len().checked_sub(1).ok_or_else(|| {
                    anyhow::anyhow!("A transition needs a previous main-track clip")
                })?;
                let transition = Transition::new(parse_transition(name)?, args.transition_secs)?;
                open.timeline.set_transition(previous, Some(transition))?;
            }
            open.timeline.push_main(clip);
            println!(
                "Added main-track clip '{label}' at position {} ({length:.2}s)",
                open.timeline.main_track().len() - 1
            );
        }
    }

    open.project.store_timeline(&open.timeline);
    open.project
        .save()
        .map_err(|e| anyhow::anyhow!("Failed to save project: {e}"))?;

    tracing::info!(project = %open.project.root.display(), clip = %label, "Timeline updated");
    Ok(())
}

fn parse_scaling(value: &str) -> anyhow::Result<ScalingMode> {
    match value.to_ascii_lowercase().as_str() {
        "none" => Ok(ScalingMode::None),
        "fit" => Ok(ScalingMode::Fit),
        "fill" => Ok(ScalingMode::Fill),
        "stretch" => Ok(ScalingMode::Stretch),
        other => anyhow::bail!("Unknown scaling mode '{other}'"),
    }
}

//! Subcommand implementations.

use std::path::Path;
use std::sync::Arc;

use montage_common::AppConfig;
use montage_project_model::{Direction, LoadedProject, MediaContext, Timeline, TransitionKind};
use montage_render_engine::FfmpegBackend;

pub mod add;
pub mod check;
pub mod info;
pub mod init;
pub mod resolve;
pub mod thumbnails;

/// A project opened against the ffmpeg backend.
pub struct OpenProject {
    pub project: LoadedProject,
    pub backend: Arc<FfmpegBackend>,
    pub timeline: Timeline,
}

pub fn load_project(path: &Path) -> anyhow::Result<LoadedProject> {
    LoadedProject::load(path).map_err(|e| anyhow::anyhow!("Failed to load project: {e}"))
}

pub fn media_context(config: &AppConfig, backend: Arc<FfmpegBackend>) -> MediaContext {
    MediaContext::new(backend).with_image_duration(config.clips.image_duration_secs)
}

/// Load a project and rebuild its live timeline, probing every source.
pub fn open_project(config: &AppConfig, path: &Path) -> anyhow::Result<OpenProject> {
    let project = load_project(path)?;
    let backend = Arc::new(FfmpegBackend::default());
    let ctx = media_context(config, backend.clone());
    let timeline = project
        .open_timeline(&ctx)
        .map_err(|e| anyhow::anyhow!("Failed to open timeline: {e}"))?;
    Ok(OpenProject {
        project,
        backend,
        timeline,
    })
}

/// Parse `dissolve`, `fade`, `wipe-<dir>` or `slide-<dir>`.
pub fn parse_transition(value: &str) -> anyhow::Result<TransitionKind> {
    let value = value.to_ascii_lowercase();
    let kind = match value.split_once('-') {
        None if value == "dissolve" => TransitionKind::Dissolve,
        None if value == "fade" => TransitionKind::Fade,
        Some(("wipe", dir)) => TransitionKind::Wipe {
            direction: parse_direction(dir)?,
        },
        Some(("slide", dir)) => TransitionKind::Slide {
            direction: parse_direction(dir)?,
        },
        _ => anyhow::bail!(
            "Unknown transition '{value}' (expected dissolve, fade, wipe-<dir> or slide-<dir>)"
        ),
    };
    Ok(kind)
}

fn parse_direction(value: &str) -> anyhow::Result<Direction> {
    match value {
        "left" => Ok(Direction::Left),
        "right" => Ok(Direction::Right),
        "up" => Ok(Direction::Up),
        "down" => Ok(Direction::Down),
        other => anyhow::bail!("Unknown direction '{other}' (expected left, right, up or down)"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_transition() {
        assert_eq!(parse_transition("dissolve").unwrap(), TransitionKind::Dissolve);
        assert_eq!(parse_transition("Fade").unwrap(), TransitionKind::Fade);
        assert_eq!(
            parse_transition("slide-up").unwrap(),
            TransitionKind::Slide {
                direction: Direction::Up
            }
        );
        assert_eq!(
            parse_transition("wipe-left").unwrap(),
            TransitionKind::Wipe {
                direction: Direction::Left
            }
        );
        assert!(parse_transition("slide-sideways").is_err());
        assert!(parse_transition("spin").is_err());
    }
}

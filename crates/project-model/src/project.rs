//! Project metadata and persisted timeline documents.
//!
//! A project directory holds `meta/project.json` (metadata and output
//! settings) and `meta/timeline.json` (clip descriptions). Clips are stored
//! as [`ClipSpec`]s and re-validated against their sources on load.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use montage_common::MontageResult;

use crate::clip::{Clip, ClipSpec};
use crate::media::MediaContext;
use crate::region::Size;
use crate::timeline::{Timeline, Transition};

/// Top-level project file (`project.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Schema version.
    pub version: String,

    /// Human-readable project name.
    pub name: String,

    /// Unique project identifier.
    pub id: String,

    /// Creation timestamp (ISO 8601).
    pub created_at: String,

    /// Last modified timestamp (ISO 8601).
    pub modified_at: String,

    /// Output settings.
    pub output: OutputConfig,
}

/// Output frame settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output resolution (pixels).
    pub width: u32,
    pub height: u32,

    /// Output frame rate.
    pub fps: u32,
}

impl OutputConfig {
    pub fn render_size(&self) -> Size {
        Size::new(self.width as f64, self.height as f64)
    }
}

/// A main-track entry as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MainTrackSpec {
    pub clip: ClipSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition_out: Option<Transition>,
}

/// An overlay entry as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlaySpec {
    pub clip: ClipSpec,
    pub start_secs: f64,
}

/// Persisted form of a [`Timeline`] (`timeline.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineDocument {
    /// Schema version.
    pub version: String,

    #[serde(default)]
    pub main_track: Vec<MainTrackSpec>,

    #[serde(default)]
    pub overlays: Vec<OverlaySpec>,
}

impl Default for TimelineDocument {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            main_track: vec![],
            overlays: vec![],
        }
    }
}

impl TimelineDocument {
    /// Describe a live timeline.
    pub fn from_timeline(timeline: &Timeline) -> Self {
        Self {
            version: "1.0".to_string(),
            main_track: timeline
                .main_track()
                .iter()
                .map(|item| MainTrackSpec {
                    clip: item.clip.spec(),
                    transition_out: item.transition_out,
                })
                .collect(),
            overlays: timeline
                .overlays()
                .iter()
                .map(|item| OverlaySpec {
                    clip: item.clip.spec(),
                    start_secs: item.start_secs,
                })
                .collect(),
        }
    }

    /// Rebuild a live timeline, opening every clip through `ctx`.
    ///
    /// The first clip that fails validation aborts the load.
    pub fn to_timeline(&self, render_size: Size, ctx: &MediaContext) -> MontageResult<Timeline> {
        let mut timeline = Timeline::new(render_size);
        for (index, entry) in self.main_track.iter().enumerate() {
            timeline.push_main(Clip::from_spec(&entry.clip, ctx)?);
            timeline.set_transition(index, entry.transition_out)?;
        }
        for entry in &self.overlays {
            timeline.add_overlay(Clip::from_spec(&entry.clip, ctx)?, entry.start_secs)?;
        }
        Ok(timeline)
    }
}

/// The complete on-disk representation of a loaded project.
#[derive(Debug, Clone)]
pub struct LoadedProject {
    /// Filesystem path to the project directory.
    pub root: PathBuf,

    /// Project metadata.
    pub project: Project,

    /// Persisted timeline.
    pub timeline: TimelineDocument,
}

impl Project {
    /// Create a new project with defaults.
    pub fn new(name: impl Into<String>, width: u32, height: u32, fps: u32) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            version: "1.0".to_string(),
            name: name.into(),
            id: project_id(),
            created_at: now.clone(),
            modified_at: now,
            output: OutputConfig { width, height, fps },
        }
    }
}

impl LoadedProject {
    /// Load a project from a directory.
    pub fn load(root: impl AsRef<Path>) -> Result<Self, ProjectError> {
        let root = root.as_ref().to_path_buf();

        let project_path = root.join("meta").join("project.json");
        let timeline_path = root.join("meta").join("timeline.json");

        let project: Project = read_json(&project_path)?;
        let timeline = if timeline_path.exists() {
            read_json(&timeline_path)?
        } else {
            TimelineDocument::default()
        };

        if project.output.width == 0 || project.output.height == 0 {
            return Err(ProjectError::ValidationError {
                message: format!(
                    "output size {}x{} has no area",
                    project.output.width, project.output.height
                ),
            });
        }

        Ok(Self {
            root,
            project,
            timeline,
        })
    }

    /// Save project and timeline to disk, bumping `modified_at`.
    pub fn save(&mut self) -> Result<(), ProjectError> {
        let meta_dir = self.root.join("meta");
        std::fs::create_dir_all(&meta_dir).map_err(|e| ProjectError::IoError {
            path: meta_dir.clone(),
            source: e,
        })?;

        self.project.modified_at = chrono::Utc::now().to_rfc3339();
        write_json(&meta_dir.join("project.json"), &self.project)?;
        write_json(&meta_dir.join("timeline.json"), &self.timeline)?;
        Ok(())
    }

    /// Create a new project on disk with the standard directory structure.
    pub fn create(
        root: impl AsRef<Path>,
        name: impl Into<String>,
        width: u32,
        height: u32,
        fps: u32,
    ) -> Result<Self, ProjectError> {
        let root = root.as_ref().to_path_buf();

        for subdir in &["sources", "meta", "thumbnails"] {
            std::fs::create_dir_all(root.join(subdir)).map_err(|e| ProjectError::IoError {
                path: root.join(subdir),
                source: e,
            })?;
        }

        let mut loaded = Self {
            root,
            project: Project::new(name, width, height, fps),
            timeline: TimelineDocument::default(),
        };
        loaded.save()?;
        Ok(loaded)
    }

    /// Build the live timeline for this project.
    pub fn open_timeline(&self, ctx: &MediaContext) -> MontageResult<Timeline> {
        self.timeline
            .to_timeline(self.project.output.render_size(), ctx)
    }

    /// Replace the persisted timeline with a live one.
    pub fn store_timeline(&mut self, timeline: &Timeline) {
        self.timeline = TimelineDocument::from_timeline(timeline);
    }

    /// Resolve a clip source path relative to the project root.
    pub fn resolve_source(&self, uri: &str) -> PathBuf {
        let path = Path::new(uri);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Validate that all referenced source files exist.
    pub fn validate_sources(&self) -> Vec<String> {
        let main = self.timeline.main_track.iter().map(|e| ("Main", &e.clip));
        let overlays = self.timeline.overlays.iter().map(|e| ("Overlay", &e.clip));

        main.chain(overlays)
            .filter_map(|(label, clip)| match clip.source_uri.as_deref() {
                None => Some(format!("{label} clip '{}' has no source", clip.id)),
                Some(uri) if !self.resolve_source(uri).exists() => {
                    Some(format!("{label} source missing: {uri}"))
                }
                Some(_) => None,
            })
            .collect()
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ProjectError> {
    let json = std::fs::read_to_string(path).map_err(|e| ProjectError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;
    serde_json::from_str(&json).map_err(|e| ProjectError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ProjectError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| ProjectError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;
    std::fs::write(path, json).map_err(|e| ProjectError::IoError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Errors that can occur when working with projects.
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid project: {message}")]
    ValidationError { message: String },
}

/// Time-derived identifier in UUID v4 layout.
fn project_id() -> String {
    let nanos = chrono::Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_default() as u128;
    let seed = nanos ^ (std::process::id() as u128) << 64;
    format!(
        "{:08x}-{:04x}-4{:03x}-{:04x}-{:012x}",
        (seed & 0xFFFF_FFFF) as u32,
        ((seed >> 32) & 0xFFFF) as u16,
        ((seed >> 48) & 0x0FFF) as u16,
        (((seed >> 60) & 0x3FFF) as u16) | 0x8000,
        (seed >> 64) & 0xFFFF_FFFF_FFFF,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::ClipKind;
    use crate::media::testing::{context, FakeProbe};
    use crate::timeline::TransitionKind;

    #[test]
    fn test_project_creation() {
        let project = Project::new("Test Reel", 1080, 1920, 30);
        assert_eq!(project.name, "Test Reel");
        assert_eq!(project.output.render_size(), Size::new(1080.0, 1920.0));
        assert_eq!(project.id.len(), 36);
    }

    #[test]
    fn test_loaded_project_create_and_load() {
        let dir = std::env::temp_dir().join("montage_test_project");
        let _ = std::fs::remove_dir_all(&dir);

        let created = LoadedProject::create(&dir, "Integration Test", 1280, 720, 30).unwrap();
        assert_eq!(created.project.name, "Integration Test");

        let loaded = LoadedProject::load(&dir).unwrap();
        assert_eq!(loaded.project.name, "Integration Test");
        assert_eq!(loaded.timeline.version, "1.0");
        assert!(loaded.timeline.main_track.is_empty());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_timeline_document_round_trip() {
        let (_, ctx) = context(
            FakeProbe::default()
                .with_video("a.mp4", 10.0, 1280, 720)
                .with_video("b.mp4", 5.0, 1280, 720)
                .with_image("logo.png", 200, 100),
        );
        let mut timeline = Timeline::new(Size::new(1280.0, 720.0));
        timeline.push_main(Clip::open(ClipKind::AudioVideo, "a.mp4", &ctx).unwrap());
        timeline.push_main(Clip::open(ClipKind::AudioVideo, "b.mp4", &ctx).unwrap());
        timeline
            .set_transition(0, Some(Transition::new(TransitionKind::Dissolve, 1.0).unwrap()))
            .unwrap();
        timeline
            .add_overlay(Clip::open(ClipKind::Image, "logo.png", &ctx).unwrap(), 2.0)
            .unwrap();

        let doc = TimelineDocument::from_timeline(&timeline);
        let json = serde_json::to_string_pretty(&doc).unwrap();
        let parsed: TimelineDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, doc);

        let rebuilt = parsed.to_timeline(Size::new(1280.0, 720.0), &ctx).unwrap();
        assert_eq!(rebuilt.main_track().len(), 2);
        assert!(rebuilt.main_track()[0].transition_out.is_some());
        assert_eq!(rebuilt.overlays()[0].start_secs, 2.0);
    }

    #[test]
    fn test_validate_sources_reports_missing() {
        let dir = std::env::temp_dir().join("montage_test_validate");
        let _ = std::fs::remove_dir_all(&dir);

        let mut loaded = LoadedProject::create(&dir, "Validate Test", 1280, 720, 30).unwrap();
        loaded.timeline.main_track.push(MainTrackSpec {
            clip: ClipSpec {
                id: "intro".into(),
                kind: ClipKind::AudioVideo,
                source_uri: Some("sources/intro.mp4".into()),
                source_region: Default::default(),
                dest_region: Default::default(),
                rotation: 0.0,
                scaling_mode: Default::default(),
                main_track_duration_secs: 4.0,
                trim: None,
                volume: None,
            },
            transition_out: None,
        });

        let errors = loaded.validate_sources();
        assert_eq!(errors, vec!["Main source missing: sources/intro.mp4".to_string()]);

        std::fs::remove_dir_all(&dir).ok();
    }
}

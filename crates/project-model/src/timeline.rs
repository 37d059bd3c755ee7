//! The timeline entity: an ordered main track plus free-floating overlays.
//!
//! The main track is contiguous: each clip starts where the previous one
//! ends, minus the overlap of any transition between them. Overlays carry
//! their own start time and never change the total duration.

use serde::{Deserialize, Serialize};

use montage_common::{MontageError, MontageResult, TimeRange};

use crate::clip::Clip;
use crate::region::Size;

/// Direction of travel for wipes and slides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

/// Visual style of a transition between two main-track clips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    /// Cross-fade between the two clips.
    Dissolve,
    /// Fade the outgoing clip out, then the incoming clip in.
    Fade,
    /// Reveal the incoming clip behind an edge moving in `direction`.
    Wipe { direction: Direction },
    /// Push the incoming clip in, travelling in `direction`.
    Slide { direction: Direction },
}

/// A transition from one main-track clip into the next.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub kind: TransitionKind,
    /// Requested overlap in seconds. The composer may clamp it.
    pub duration_secs: f64,
}

impl Transition {
    pub fn new(kind: TransitionKind, duration_secs: f64) -> MontageResult<Self> {
        if !duration_secs.is_finite() || duration_secs < 0.0 {
            return Err(MontageError::invalid_parameter(format!(
                "transition duration must be >= 0, got {duration_secs}"
            )));
        }
        Ok(Self {
            kind,
            duration_secs,
        })
    }
}

/// A clip on the main track with its outgoing transition.
#[derive(Debug, Clone)]
pub struct MainTrackItem {
    pub clip: Clip,
    /// Transition into the next main-track clip. Ignored on the last clip.
    pub transition_out: Option<Transition>,
}

/// A clip placed on an overlay (mix) track.
#[derive(Debug, Clone)]
pub struct OverlayItem {
    pub clip: Clip,
    /// Where on the main-track timeline the overlay becomes active.
    pub start_secs: f64,
}

impl OverlayItem {
    /// End of the activation window `[start, start + duration)`.
    pub fn end_secs(&self) -> f64 {
        self.start_secs + self.clip.main_track_duration_secs()
    }

    pub fn is_active_at(&self, t: f64) -> bool {
        TimeRange::new(self.start_secs, self.clip.main_track_duration_secs()).contains(t)
    }
}

/// Editing timeline owned by the caller.
#[derive(Debug, Clone)]
pub struct Timeline {
    /// Output frame size; the destination space for every clip.
    pub render_size: Size,
    main_track: Vec<MainTrackItem>,
    overlays: Vec<OverlayItem>,
}

impl Timeline {
    pub fn new(render_size: Size) -> Self {
        Self {
            render_size,
            main_track: Vec::new(),
            overlays: Vec::new(),
        }
    }

    pub fn main_track(&self) -> &[MainTrackItem] {
        &self.main_track
    }

    pub fn overlays(&self) -> &[OverlayItem] {
        &self.overlays
    }

    pub fn main_track_mut(&mut self) -> &mut [MainTrackItem] {
        &mut self.main_track
    }

    pub fn overlays_mut(&mut self) -> &mut [OverlayItem] {
        &mut self.overlays
    }

    /// Append a clip to the end of the main track.
    pub fn push_main(&mut self, clip: Clip) {
        self.main_track.push(MainTrackItem {
            clip,
            transition_out: None,
        });
    }

    /// Insert a clip at `index` on the main track.
    pub fn insert_main(&mut self, index: usize, clip: Clip) -> MontageResult<()> {
        if index > self.main_track.len() {
            return Err(MontageError::out_of_range(format!(
                "main-track index {index} beyond length {}",
                self.main_track.len()
            )));
        }
        self.main_track.insert(
            index,
            MainTrackItem {
                clip,
                transition_out: None,
            },
        );
        Ok(())
    }

    /// Remove and return the main-track clip at `index`.
    pub fn remove_main(&mut self, index: usize) -> MontageResult<Clip> {
        if index >= self.main_track.len() {
            return Err(MontageError::out_of_range(format!(
                "main-track index {index} beyond length {}",
                self.main_track.len()
            )));
        }
        Ok(self.main_track.remove(index).clip)
    }

    /// Set or clear the transition after the main-track clip at `index`.
    pub fn set_transition(
        &mut self,
        index: usize,
        transition: Option<Transition>,
    ) -> MontageResult<()> {
        let len = self.main_track.len();
        let item = self.main_track.get_mut(index).ok_or_else(|| {
            MontageError::out_of_range(format!("main-track index {index} beyond length {len}"))
        })?;
        item.transition_out = transition;
        Ok(())
    }

    /// Add an overlay clip active from `start_secs`.
    pub fn add_overlay(&mut self, clip: Clip, start_secs: f64) -> MontageResult<()> {
        if !start_secs.is_finite() || start_secs < 0.0 {
            return Err(MontageError::invalid_parameter(format!(
                "overlay start must be >= 0, got {start_secs}"
            )));
        }
        self.overlays.push(OverlayItem { clip, start_secs });
        Ok(())
    }

    /// Remove and return the overlay at `index`.
    pub fn remove_overlay(&mut self, index: usize) -> MontageResult<Clip> {
        if index >= self.overlays.len() {
            return Err(MontageError::out_of_range(format!(
                "overlay index {index} beyond length {}",
                self.overlays.len()
            )));
        }
        Ok(self.overlays.remove(index).clip)
    }

    /// Sum of main-track durations, ignoring transition overlap.
    pub fn nominal_duration_secs(&self) -> f64 {
        self.main_track
            .iter()
            .map(|item| item.clip.main_track_duration_secs())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.main_track.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::ClipKind;
    use crate::media::testing::{context, FakeProbe};

    #[test]
    fn test_main_track_ordering_and_removal() {
        let (_, ctx) = context(
            FakeProbe::default()
                .with_video("a.mp4", 4.0, 640, 360)
                .with_video("b.mp4", 6.0, 640, 360),
        );
        let mut timeline = Timeline::new(Size::new(1280.0, 720.0));
        timeline.push_main(Clip::open(ClipKind::AudioVideo, "b.mp4", &ctx).unwrap());
        timeline
            .insert_main(0, Clip::open(ClipKind::AudioVideo, "a.mp4", &ctx).unwrap())
            .unwrap();

        assert_eq!(timeline.main_track()[0].clip.source_uri(), Some("a.mp4"));
        assert!((timeline.nominal_duration_secs() - 10.0).abs() < 1e-9);

        let removed = timeline.remove_main(0).unwrap();
        assert_eq!(removed.source_uri(), Some("a.mp4"));
        assert!(timeline.remove_main(5).is_err());
    }

    #[test]
    fn test_overlay_window_is_half_open() {
        let (_, ctx) = context(FakeProbe::default().with_image("sticker.png", 100, 100));
        let mut timeline = Timeline::new(Size::new(1280.0, 720.0));
        let mut sticker = Clip::open(ClipKind::Image, "sticker.png", &ctx).unwrap();
        sticker.set_main_track_duration(2.0).unwrap();
        timeline.add_overlay(sticker, 1.0).unwrap();

        let overlay = &timeline.overlays()[0];
        assert!(overlay.is_active_at(1.0));
        assert!(overlay.is_active_at(2.999));
        assert!(!overlay.is_active_at(3.0));

        let copy = overlay.clip.clone();
        assert!(timeline.add_overlay(copy, -1.0).is_err());
    }

    #[test]
    fn test_transition_rejects_negative_duration() {
        assert!(Transition::new(TransitionKind::Dissolve, -0.5).is_err());
        let t = Transition::new(TransitionKind::Wipe { direction: Direction::Right }, 0.5).unwrap();
        let json = serde_json::to_string(&t.kind).unwrap();
        assert_eq!(json, r#"{"wipe":{"direction":"right"}}"#);
    }
}

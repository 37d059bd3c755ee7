//! Timeline composition: which clips are active at a given time.
//!
//! The composer owns a [`Timeline`] and a lazily built index of main-track
//! boundaries. Every mutation goes through `&mut self` and drops the index;
//! the next [`TimelineComposer::resolve`] rebuilds it once. Concurrent
//! readers either all see no index or the same complete one.
//!
//! With a transition between clips `i` and `i + 1`, clip `i + 1` starts
//! `overlap` seconds before clip `i` ends. Inside that window clip `i + 1`
//! is the main clip and clip `i` is reported as the outgoing side of the
//! transition.

use std::sync::OnceLock;

use serde::Serialize;

use montage_common::{Diagnostic, MontageError, MontageResult, TimeRange, EPSILON};
use montage_project_model::clip::Clip;
use montage_project_model::time_map::TimeMapper;
use montage_project_model::timeline::{Timeline, Transition, TransitionKind};

use crate::transition::progress_in;

/// A clip active at the resolved time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveClip {
    /// Position on its track.
    pub index: usize,
    pub id: String,
    /// Where the clip starts on the timeline.
    pub start_secs: f64,
    /// Time within the clip's source.
    pub local_time_secs: f64,
}

/// A transition in progress at the resolved time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveTransition {
    pub kind: TransitionKind,
    /// The clip being transitioned away from.
    pub outgoing: ActiveClip,
    /// Applied overlap window on the timeline.
    pub window: TimeRange,
    /// `0` at the start of the window, `1` at its end.
    pub progress: f64,
}

/// Everything active at one point on the timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    pub time_secs: f64,
    pub main: ActiveClip,
    pub transition: Option<ActiveTransition>,
    /// Active overlays in insertion order.
    pub overlays: Vec<ActiveOverlay>,
}

/// An overlay active at the resolved time.
pub type ActiveOverlay = ActiveClip;

#[derive(Debug)]
struct BoundaryIndex {
    starts: Vec<f64>,
    ends: Vec<f64>,
    /// Applied overlap between clip `i` and `i + 1`.
    overlaps: Vec<f64>,
    diagnostics: Vec<Diagnostic>,
}

impl BoundaryIndex {
    fn build(timeline: &Timeline) -> Self {
        let items = timeline.main_track();
        let mut starts = Vec::with_capacity(items.len());
        let mut ends = Vec::with_capacity(items.len());
        let mut overlaps = Vec::with_capacity(items.len().saturating_sub(1));
        let mut diagnostics = Vec::new();

        let mut start = 0.0;
        let mut incoming_overlap = 0.0;
        for (i, item) in items.iter().enumerate() {
            let duration = item.clip.main_track_duration_secs();
            starts.push(start);
            ends.push(start + duration);

            let Some(next) = items.get(i + 1) else {
                break;
            };

            let requested = item.transition_out.map_or(0.0, |t| t.duration_secs);
            // A clip cannot give away time it already shares with its predecessor.
            let available = (duration - incoming_overlap).max(0.0);
            let applied = requested.min(available).min(next.clip.main_track_duration_secs());
            if requested - applied > EPSILON {
                diagnostics.push(
                    Diagnostic::TransitionClamped {
                        boundary: i,
                        requested_secs: requested,
                        applied_secs: applied,
                    }
                    .emitted(),
                );
            }

            overlaps.push(applied);
            start += duration - applied;
            incoming_overlap = applied;
        }

        tracing::debug!(
            clips = items.len(),
            total_secs = ends.last().copied().unwrap_or(0.0),
            "Built main-track boundary index"
        );

        Self {
            starts,
            ends,
            overlaps,
            diagnostics,
        }
    }

    fn total(&self) -> f64 {
        self.ends.last().copied().unwrap_or(0.0)
    }
}

/// Resolves timeline time to active clips.
#[derive(Debug)]
pub struct TimelineComposer {
    timeline: Timeline,
    index: OnceLock<BoundaryIndex>,
}

impl TimelineComposer {
    pub fn new(timeline: Timeline) -> Self {
        Self {
            timeline,
            index: OnceLock::new(),
        }
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn into_timeline(self) -> Timeline {
        self.timeline
    }

    /// Mutable access to the timeline. The boundary index is rebuilt on
    /// the next read.
    pub fn timeline_mut(&mut self) -> &mut Timeline {
        self.invalidate();
        &mut self.timeline
    }

    pub fn push_main(&mut self, clip: Clip) {
        self.timeline_mut().push_main(clip);
    }

    pub fn insert_main(&mut self, index: usize, clip: Clip) -> MontageResult<()> {
        self.timeline_mut().insert_main(index, clip)
    }

    pub fn remove_main(&mut self, index: usize) -> MontageResult<Clip> {
        self.timeline_mut().remove_main(index)
    }

    pub fn set_transition(
        &mut self,
        index: usize,
        transition: Option<Transition>,
    ) -> MontageResult<()> {
        self.timeline_mut().set_transition(index, transition)
    }

    pub fn add_overlay(&mut self, clip: Clip, start_secs: f64) -> MontageResult<()> {
        self.timeline_mut().add_overlay(clip, start_secs)
    }

    pub fn remove_overlay(&mut self, index: usize) -> MontageResult<Clip> {
        self.timeline_mut().remove_overlay(index)
    }

    /// Mutable access to one main-track clip, for time or placement edits.
    pub fn main_clip_mut(&mut self, index: usize) -> MontageResult<&mut Clip> {
        let len = self.timeline.main_track().len();
        self.timeline_mut()
            .main_track_mut()
            .get_mut(index)
            .map(|item| &mut item.clip)
            .ok_or_else(|| {
                MontageError::out_of_range(format!("main-track index {index} beyond length {len}"))
            })
    }

    /// Whether the boundary index is currently built.
    pub fn is_indexed(&self) -> bool {
        self.index.get().is_some()
    }

    fn invalidate(&mut self) {
        self.index.take();
    }

    fn index(&self) -> &BoundaryIndex {
        self.index.get_or_init(|| BoundaryIndex::build(&self.timeline))
    }

    /// Timeline length after transition overlaps.
    pub fn total_duration_secs(&self) -> f64 {
        self.index().total()
    }

    /// Transition clamps applied by the current index.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.index().diagnostics
    }

    /// Where main-track clip `index` sits on the timeline.
    pub fn clip_window(&self, index: usize) -> Option<TimeRange> {
        let idx = self.index();
        let start = *idx.starts.get(index)?;
        Some(TimeRange::new(start, idx.ends[index] - start))
    }

    /// Applied overlap after main-track clip `index`.
    pub fn applied_overlap(&self, index: usize) -> Option<f64> {
        self.index().overlaps.get(index).copied()
    }

    /// Find the active main clip, any transition in progress, and the
    /// active overlays at `t`.
    ///
    /// At the exact boundary between two clips the later clip is returned
    /// with local time at its trim start. Fails with
    /// [`MontageError::OutOfRange`] on an empty timeline or when `t` lies
    /// outside `[0, total]`.
    pub fn resolve(&self, t: f64) -> MontageResult<Resolution> {
        let idx = self.index();
        if idx.starts.is_empty() {
            return Err(MontageError::out_of_range("timeline has no main-track clips"));
        }
        let total = idx.total();
        if !t.is_finite() || t < 0.0 || t > total + EPSILON {
            return Err(MontageError::out_of_range(format!(
                "time {t}s outside timeline [0, {total}]"
            )));
        }

        let items = self.timeline.main_track();
        let current = idx.starts.partition_point(|&start| start <= t).saturating_sub(1);
        let main = self.active_main(current, t);

        let transition = current
            .checked_sub(1)
            .filter(|&prev| idx.overlaps[prev] > 0.0 && t < idx.ends[prev])
            .and_then(|prev| {
                let transition = items[prev].transition_out?;
                let window = TimeRange::new(idx.starts[current], idx.overlaps[prev]);
                Some(ActiveTransition {
                    kind: transition.kind,
                    outgoing: self.active_main(prev, t),
                    window,
                    progress: progress_in(window, t),
                })
            });

        let overlays = self
            .timeline
            .overlays()
            .iter()
            .enumerate()
            .filter(|(_, overlay)| overlay.is_active_at(t))
            .map(|(index, overlay)| ActiveClip {
                index,
                id: overlay.clip.id().to_string(),
                start_secs: overlay.start_secs,
                local_time_secs: TimeMapper::global_to_local(&overlay.clip, t - overlay.start_secs),
            })
            .collect();

        Ok(Resolution {
            time_secs: t,
            main,
            transition,
            overlays,
        })
    }

    fn active_main(&self, index: usize, t: f64) -> ActiveClip {
        let start = self.index().starts[index];
        let clip = &self.timeline.main_track()[index].clip;
        ActiveClip {
            index,
            id: clip.id().to_string(),
            start_secs: start,
            local_time_secs: TimeMapper::global_to_local(clip, t - start),
        }
    }
}

impl From<Timeline> for TimelineComposer {
    fn from(timeline: Timeline) -> Self {
        Self::new(timeline)
    }
}

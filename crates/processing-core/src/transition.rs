//! Transition evaluation between adjacent main-track clips.
//!
//! Inside a transition window both clips are drawn. This module turns the
//! transition kind and its progress into per-layer modifications: an
//! opacity multiplier, a translation in units of the frame size, and a
//! reveal rectangle in normalized frame coordinates.

use serde::Serialize;

use montage_common::TimeRange;
use montage_project_model::region::Rect;
use montage_project_model::timeline::{Direction, TransitionKind};

/// Modifications applied to one layer during a transition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LayerModification {
    /// Multiplied into the layer's opacity.
    pub opacity: f64,
    /// Translation as a fraction of the frame size.
    pub offset: [f64; 2],
    /// Only this part of the frame (normalized `[0, 1]`) shows the layer.
    pub reveal: Option<Rect>,
}

impl Default for LayerModification {
    fn default() -> Self {
        Self {
            opacity: 1.0,
            offset: [0.0, 0.0],
            reveal: None,
        }
    }
}

impl LayerModification {
    fn with_opacity(opacity: f64) -> Self {
        Self {
            opacity,
            ..Default::default()
        }
    }

    fn with_offset(offset: [f64; 2]) -> Self {
        Self {
            offset,
            ..Default::default()
        }
    }
}

/// Per-layer result of evaluating a transition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TransitionEffect {
    pub outgoing: LayerModification,
    pub incoming: LayerModification,
}

/// Evaluate `kind` at `progress` (clamped to `[0, 1]`).
pub fn evaluate_transition(kind: TransitionKind, progress: f64) -> TransitionEffect {
    let p = if progress.is_nan() { 0.0 } else { progress.clamp(0.0, 1.0) };

    match kind {
        TransitionKind::Dissolve => TransitionEffect {
            outgoing: LayerModification::with_opacity(1.0 - p),
            incoming: LayerModification::with_opacity(p),
        },
        TransitionKind::Fade => fade(p),
        TransitionKind::Wipe { direction } => TransitionEffect {
            outgoing: LayerModification::default(),
            incoming: LayerModification {
                reveal: Some(wipe_reveal(p, direction)),
                ..Default::default()
            },
        },
        TransitionKind::Slide { direction } => {
            let (dx, dy) = unit(direction);
            TransitionEffect {
                outgoing: LayerModification::with_offset([dx * p, dy * p]),
                incoming: LayerModification::with_offset([-dx * (1.0 - p), -dy * (1.0 - p)]),
            }
        }
    }
}

/// Fade through black: the outgoing clip goes out in the first half, the
/// incoming clip comes in during the second.
fn fade(p: f64) -> TransitionEffect {
    if p < 0.5 {
        TransitionEffect {
            outgoing: LayerModification::with_opacity(1.0 - p * 2.0),
            incoming: LayerModification::with_opacity(0.0),
        }
    } else {
        TransitionEffect {
            outgoing: LayerModification::with_opacity(0.0),
            incoming: LayerModification::with_opacity((p - 0.5) * 2.0),
        }
    }
}

/// The revealed area grows from the edge opposite to `direction`.
fn wipe_reveal(p: f64, direction: Direction) -> Rect {
    match direction {
        Direction::Right => Rect::new(0.0, 0.0, p, 1.0),
        Direction::Left => Rect::new(1.0 - p, 0.0, p, 1.0),
        Direction::Down => Rect::new(0.0, 0.0, 1.0, p),
        Direction::Up => Rect::new(0.0, 1.0 - p, 1.0, p),
    }
}

fn unit(direction: Direction) -> (f64, f64) {
    match direction {
        Direction::Left => (-1.0, 0.0),
        Direction::Right => (1.0, 0.0),
        Direction::Up => (0.0, -1.0),
        Direction::Down => (0.0, 1.0),
    }
}

/// Progress of `t` through `window`, in `[0, 1]`.
///
/// A zero-length window is already complete.
pub fn progress_in(window: TimeRange, t: f64) -> f64 {
    if window.duration_secs <= 0.0 {
        return 1.0;
    }
    ((t - window.start_secs) / window.duration_secs).clamp(0.0, 1.0)
}

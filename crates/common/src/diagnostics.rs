//! Non-fatal diagnostics.
//!
//! Clamps that keep an operation valid (transition overlap, region bounds,
//! trim bounds, sample times) are never silent: each one is returned to the
//! caller as a [`Diagnostic`] and logged as a warning when emitted.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which region of a clip's placement was clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionRole {
    Source,
    Destination,
}

/// A non-fatal adjustment applied to caller-supplied values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A transition's overlap was shortened to fit its neighbouring clips.
    TransitionClamped {
        /// Index of the outgoing main-track clip.
        boundary: usize,
        requested_secs: f64,
        applied_secs: f64,
    },

    /// A region rectangle was intersected with its bounds.
    /// Rectangles are `[x, y, w, h]`.
    RegionClamped {
        role: RegionRole,
        requested: [f64; 4],
        applied: [f64; 4],
    },

    /// A trim range was clipped to the source's total duration.
    TrimClamped {
        requested_start_secs: f64,
        requested_duration_secs: f64,
        applied_duration_secs: f64,
    },

    /// A sample time past the timeline bounds was pulled back inside.
    SampleTimeClamped {
        index: usize,
        requested_secs: f64,
        applied_secs: f64,
    },
}

impl Diagnostic {
    /// Log this diagnostic as a warning.
    pub fn emit(&self) {
        tracing::warn!(diagnostic = %self, "Clamped input");
    }

    /// Log and return self.
    pub fn emitted(self) -> Self {
        self.emit();
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::TransitionClamped {
                boundary,
                requested_secs,
                applied_secs,
            } => write!(
                f,
                "transition after clip {boundary} clamped from {requested_secs:.3}s \
                 to {applied_secs:.3}s"
            ),
            Diagnostic::RegionClamped {
                role,
                requested,
                applied,
            } => write!(
                f,
                "{role:?} region clamped from {requested:?} to {applied:?}"
            ),
            Diagnostic::TrimClamped {
                requested_start_secs,
                requested_duration_secs,
                applied_duration_secs,
            } => write!(
                f,
                "trim [{requested_start_secs:.3}s +{requested_duration_secs:.3}s] \
                 clipped to +{applied_duration_secs:.3}s"
            ),
            Diagnostic::SampleTimeClamped {
                index,
                requested_secs,
                applied_secs,
            } => write!(
                f,
                "sample {index} time clamped from {requested_secs:.3}s to {applied_secs:.3}s"
            ),
        }
    }
}

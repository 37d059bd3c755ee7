//! The speed/duration coupling of a clip.
//!
//! For audio/video clips the relation
//!
//! ```text
//! speed = trim.duration / main_track_duration
//! ```
//!
//! holds after every successful mutation. There are exactly three setters,
//! each owning one field and recomputing one other:
//!
//! | setter                    | holds fixed          | recomputes            |
//! |---------------------------|----------------------|-----------------------|
//! | `set_main_track_duration` | trim                 | speed                 |
//! | `set_speed`               | trim                 | main-track duration   |
//! | `set_trim_range`          | main-track duration  | speed                 |
//!
//! A rejected call leaves every field as it was.

use montage_common::{Diagnostic, MontageError, MontageResult, TimeRange};

use crate::clip::{Clip, ClipMedia};

/// Stateless time mapping over [`Clip`] values.
pub struct TimeMapper;

impl TimeMapper {
    /// Set the main-track duration; speed follows.
    ///
    /// Image clips simply take the new duration.
    pub fn set_main_track_duration(clip: &mut Clip, secs: f64) -> MontageResult<()> {
        if !secs.is_finite() || secs < 0.0 {
            return Err(MontageError::invalid_parameter(format!(
                "main-track duration must be >= 0, got {secs}"
            )));
        }

        match &mut clip.media {
            ClipMedia::Image => {
                clip.main_track_duration_secs = secs;
            }
            ClipMedia::AudioVideo(timing) => {
                let speed = checked_speed(timing.trim.duration_secs, secs)?;
                timing.speed = speed;
                clip.main_track_duration_secs = secs;
            }
        }
        Ok(())
    }

    /// Set the playback speed; main-track duration follows.
    pub fn set_speed(clip: &mut Clip, speed: f64) -> MontageResult<()> {
        if !speed.is_finite() || speed <= 0.0 {
            return Err(MontageError::invalid_parameter(format!(
                "speed must be > 0, got {speed}"
            )));
        }

        match &mut clip.media {
            ClipMedia::Image => Err(MontageError::invalid_parameter(
                "image clips have no playback speed",
            )),
            ClipMedia::AudioVideo(timing) => {
                let duration = timing.trim.duration_secs / speed;
                if !duration.is_finite() {
                    return Err(MontageError::invalid_parameter(format!(
                        "speed {speed} yields an unrepresentable duration"
                    )));
                }
                timing.speed = speed;
                clip.main_track_duration_secs = duration;
                Ok(())
            }
        }
    }

    /// Set the trim range; speed follows at the current main-track duration.
    ///
    /// A range reaching past the end of the source is clipped to the
    /// source and reported through the returned diagnostic.
    pub fn set_trim_range(clip: &mut Clip, range: TimeRange) -> MontageResult<Option<Diagnostic>> {
        if !range.is_well_formed() {
            return Err(MontageError::invalid_parameter(format!(
                "malformed trim range [{} +{}]",
                range.start_secs, range.duration_secs
            )));
        }

        let main = clip.main_track_duration_secs;
        match &mut clip.media {
            ClipMedia::Image => Err(MontageError::invalid_parameter(
                "image clips have no trim range",
            )),
            ClipMedia::AudioVideo(timing) => {
                let clipped = range.clipped_to(timing.source_duration_secs);
                let speed = checked_speed(clipped.duration_secs, main)?;

                let diagnostic = (!clipped.approx_eq(&range)).then(|| {
                    Diagnostic::TrimClamped {
                        requested_start_secs: range.start_secs,
                        requested_duration_secs: range.duration_secs,
                        applied_duration_secs: clipped.duration_secs,
                    }
                    .emitted()
                });

                timing.trim = clipped;
                timing.speed = speed;
                Ok(diagnostic)
            }
        }
    }

    /// Map a time on the main track (relative to the clip's start) to a
    /// time in the source.
    ///
    /// `local = trim.start + t * speed`, clamped to the trim range. Image
    /// clips always map to `0`.
    pub fn global_to_local(clip: &Clip, t: f64) -> f64 {
        match clip.timing() {
            None => 0.0,
            Some(timing) => timing.trim.clamp(timing.trim.start_secs + t * timing.speed),
        }
    }

    /// Inverse of [`TimeMapper::global_to_local`] for times inside the trim range.
    pub fn local_to_global(clip: &Clip, local: f64) -> f64 {
        match clip.timing() {
            None => 0.0,
            Some(timing) => {
                let t = (timing.trim.clamp(local) - timing.trim.start_secs) / timing.speed;
                t.clamp(0.0, clip.main_track_duration_secs)
            }
        }
    }
}

fn checked_speed(trim_secs: f64, main_secs: f64) -> MontageResult<f64> {
    if main_secs <= 0.0 {
        return Err(MontageError::invalid_parameter(
            "audio/video clips need a main-track duration > 0",
        ));
    }
    let speed = trim_secs / main_secs;
    if !speed.is_finite() || speed <= 0.0 {
        return Err(MontageError::invalid_parameter(format!(
            "trim of {trim_secs}s over {main_secs}s gives an invalid speed"
        )));
    }
    Ok(speed)
}

//! Montage Project Model
//!
//! Defines the editing entities of a Montage project:
//! - **Clips:** audio/video and still-image segments with placement and timing
//! - **Regions:** source crops and destination placement, with explicit "full" variants
//! - **Time mapping:** the coupling between trim range, speed, and main-track duration
//! - **Timeline:** the ordered main track, transitions, and overlays
//! - **Media:** probing, asset handles, and the interruption bus
//! - **Project:** on-disk metadata and timeline documents
//!
//! Times are seconds as `f64`; regions are in pixels of their reference
//! space (source content or render frame).

pub mod clip;
pub mod media;
pub mod project;
pub mod region;
pub mod time_map;
pub mod timeline;

pub use clip::*;
pub use media::*;
pub use project::*;
pub use region::*;
pub use time_map::*;
pub use timeline::*;

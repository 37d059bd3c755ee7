//! Montage Render Engine
//!
//! Produces pixels and per-frame drawing plans from a composed timeline:
//! - **Decoder:** the [`FrameDecoder`] collaborator and its ffmpeg backend
//! - **Compositor:** per-frame layer instructions (geometry, opacity, transitions)
//! - **Snapshots:** batched, concurrent thumbnail extraction
//!
//! # Snapshot Pipeline
//!
//! ```text
//! GeneratorRequest ──► target times ──► TimelineComposer::resolve
//!                                              │
//!                                   (clip asset, local time)
//!                                              │
//!                     JoinSet fan-out ◄────────┘
//!                 (semaphore + per-sample timeout)
//!                              │
//!                     FrameDecoder::decode_frame
//!                              │
//!                  reorder by request index ──► GeneratorBatch
//! ```

pub mod compositor;
pub mod decoder;
pub mod ffmpeg;
pub mod snapshot;

pub use compositor::{
    compose_frame, compute_compositions, FrameComposition, LayerInstruction, LayerRole,
};
pub use decoder::{DecodedFrame, FrameDecoder};
pub use ffmpeg::FfmpegBackend;
pub use snapshot::{
    BatchStatus, CancelToken, GeneratorBatch, GeneratorResult, SampleFailure, SamplerConfig,
    SnapshotSampler,
};

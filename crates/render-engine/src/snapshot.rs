//! Snapshot sampling: still frames at evenly spaced timeline times.
//!
//! A batch is planned synchronously against the composer (time resolution
//! is cheap and needs no decoder), then the decode requests fan out on a
//! [`JoinSet`], capped by a semaphore and each bounded by a timeout.
//! Results are reassembled in request order before the batch is returned.
//!
//! Each task reads its clip's asset handle when it starts, so a refresh
//! that lands while a batch is in flight is used by every later sample.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use image::RgbaImage;
use serde::Serialize;
use tokio::sync::{Notify, Semaphore};
use tokio::task::JoinSet;

use montage_common::{Diagnostic, ErrorKind, MontageError, SamplerDefaults, EPSILON};
use montage_processing_core::composer::TimelineComposer;
use montage_processing_core::sampling::GeneratorRequest;
use montage_project_model::media::{AssetHandle, AssetLocation};
use montage_project_model::time_map::TimeMapper;

use crate::decoder::{still_to_image, DecodedFrame, FrameDecoder};

/// Sampler tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerConfig {
    /// Decode requests in flight at once.
    pub max_concurrency: usize,
    /// Budget for a single decode; `None` waits indefinitely.
    pub sample_timeout: Option<Duration>,
    /// Pull times outside the timeline back to its bounds instead of
    /// failing the sample.
    pub clamp_out_of_range: bool,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self::from(&SamplerDefaults::default())
    }
}

impl From<&SamplerDefaults> for SamplerConfig {
    fn from(defaults: &SamplerDefaults) -> Self {
        Self {
            max_concurrency: defaults.max_concurrency.max(1),
            sample_timeout: (defaults.sample_timeout_ms > 0)
                .then(|| Duration::from_millis(defaults.sample_timeout_ms)),
            clamp_out_of_range: defaults.clamp_out_of_range,
        }
    }
}

#[derive(Debug, Default)]
struct CancelState {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Cooperative cancellation flag for a batch.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<CancelState>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop dispatching samples that have not started yet.
    pub fn cancel(&self) {
        self.0.cancelled.store(true, Ordering::SeqCst);
        self.0.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once [`CancelToken::cancel`] has been called.
    pub async fn cancelled(&self) {
        loop {
            // Registered before the check so a concurrent cancel is not missed.
            let notified = self.0.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// One produced snapshot.
#[derive(Debug, Clone)]
pub struct GeneratorResult {
    /// Position in the request.
    pub index: usize,
    pub requested_time_secs: f64,
    /// Timeline time of the frame actually decoded.
    pub actual_time_secs: f64,
    pub image: RgbaImage,
}

/// A sample that produced no image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleFailure {
    pub index: usize,
    pub requested_time_secs: f64,
    pub kind: ErrorKind,
    pub message: String,
    /// Refreshing the clip's asset may let a retry succeed.
    pub recoverable: bool,
}

/// Aggregate outcome of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// Every sample produced an image.
    Complete,
    /// Some samples failed; the rest are in the results.
    PartialFailure,
    /// No sample produced an image.
    Failed,
    /// Cancelled before every sample was dispatched.
    Cancelled,
}

/// Everything a batch produced.
#[derive(Debug, Clone)]
pub struct GeneratorBatch {
    pub request: GeneratorRequest,
    pub status: BatchStatus,
    /// Successful samples in request order.
    pub results: Vec<GeneratorResult>,
    /// Failed samples in request order.
    pub failures: Vec<SampleFailure>,
    /// Samples never dispatched because of cancellation.
    pub skipped: Vec<usize>,
    /// Sample times that were clamped into the timeline.
    pub diagnostics: Vec<Diagnostic>,
}

struct SampleTarget {
    index: usize,
    requested_secs: f64,
    applied_secs: f64,
    /// Main-track clip the time resolved to, and where it starts.
    clip_index: usize,
    clip_start_secs: f64,
    local_secs: f64,
    asset: Arc<AssetHandle>,
}

/// A decoded frame not yet placed back on the timeline.
struct DecodedSample {
    index: usize,
    requested_secs: f64,
    applied_secs: f64,
    clip_index: usize,
    clip_start_secs: f64,
    frame: DecodedFrame,
}

/// Extracts snapshot batches through a [`FrameDecoder`].
pub struct SnapshotSampler {
    decoder: Arc<dyn FrameDecoder>,
    config: SamplerConfig,
}

impl SnapshotSampler {
    pub fn new(decoder: Arc<dyn FrameDecoder>, config: SamplerConfig) -> Self {
        Self { decoder, config }
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// Run a batch and hand it to `handler` exactly once.
    pub async fn generate_with_handler<F>(
        &self,
        composer: &TimelineComposer,
        request: GeneratorRequest,
        cancel: &CancelToken,
        handler: F,
    ) where
        F: FnOnce(GeneratorBatch) + Send,
    {
        let batch = self.generate(composer, request, cancel).await;
        handler(batch);
    }

    /// Sample `request.image_count` frames.
    ///
    /// Never fails as a whole: per-sample problems are recorded in
    /// [`GeneratorBatch::failures`] and summarized in its status.
    pub async fn generate(
        &self,
        composer: &TimelineComposer,
        request: GeneratorRequest,
        cancel: &CancelToken,
    ) -> GeneratorBatch {
        let times = request.target_times();
        tracing::info!(
            samples = times.len(),
            start = request.time_range.start_secs,
            duration = request.time_range.duration_secs,
            decoder = self.decoder.name(),
            "Starting snapshot batch"
        );

        let mut failures = Vec::new();
        let mut diagnostics = Vec::new();
        let targets: Vec<SampleTarget> = times
            .iter()
            .enumerate()
            .filter_map(|(index, &t)| match self.plan(composer, index, t, &mut diagnostics) {
                Ok(target) => Some(target),
                Err(e) => {
                    failures.push(failure_from(index, t, &e));
                    None
                }
            })
            .collect();

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let mut tasks = JoinSet::new();
        let mut pending = BTreeSet::new();
        let mut skipped = Vec::new();

        for target in targets {
            // A cancel must not wait for a busy decoder to free a permit.
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                permit = semaphore.clone().acquire_owned() => permit.ok(),
            };
            let Some(permit) = permit else {
                skipped.push(target.index);
                continue;
            };

            pending.insert(target.index);
            let decoder = self.decoder.clone();
            let timeout = self.config.sample_timeout;
            tasks.spawn(async move {
                let outcome = run_sample(decoder.as_ref(), target, timeout).await;
                drop(permit);
                outcome
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(decoded)) => {
                    pending.remove(&decoded.index);
                    results.push(place_on_timeline(composer, decoded));
                }
                Ok(Err(failed)) => {
                    pending.remove(&failed.index);
                    tracing::warn!(
                        index = failed.index,
                        time = failed.requested_time_secs,
                        kind = ?failed.kind,
                        error = %failed.message,
                        "Snapshot sample failed"
                    );
                    failures.push(failed);
                }
                Err(e) => tracing::error!(error = %e, "Snapshot task aborted"),
            }
        }
        // Tasks that panicked never reported their index.
        for index in pending {
            failures.push(failure(
                index,
                times[index],
                ErrorKind::Other,
                "decode task aborted".into(),
            ));
        }

        results.sort_by_key(|r| r.index);
        failures.sort_by_key(|f| f.index);

        let status = if !skipped.is_empty() {
            BatchStatus::Cancelled
        } else if failures.is_empty() {
            BatchStatus::Complete
        } else if results.is_empty() {
            BatchStatus::Failed
        } else {
            BatchStatus::PartialFailure
        };

        tracing::info!(
            ?status,
            produced = results.len(),
            failed = failures.len(),
            skipped = skipped.len(),
            "Snapshot batch finished"
        );

        GeneratorBatch {
            request,
            status,
            results,
            failures,
            skipped,
            diagnostics,
        }
    }

    fn plan(
        &self,
        composer: &TimelineComposer,
        index: usize,
        requested: f64,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<SampleTarget, MontageError> {
        let total = composer.total_duration_secs();
        let mut applied = requested;
        if !composer.timeline().is_empty() && (requested < 0.0 || requested > total + EPSILON) {
            if !self.config.clamp_out_of_range {
                return Err(MontageError::out_of_range(format!(
                    "sample time {requested}s outside timeline [0, {total}]"
                )));
            }
            applied = requested.clamp(0.0, total);
            diagnostics.push(
                Diagnostic::SampleTimeClamped {
                    index,
                    requested_secs: requested,
                    applied_secs: applied,
                }
                .emitted(),
            );
        }

        let resolution = composer.resolve(applied)?;
        let main = resolution.main;
        let clip = &composer.timeline().main_track()[main.index].clip;
        Ok(SampleTarget {
            index,
            requested_secs: requested,
            applied_secs: applied,
            clip_index: main.index,
            clip_start_secs: main.start_secs,
            local_secs: main.local_time_secs,
            asset: clip.asset().clone(),
        })
    }
}

async fn run_sample(
    decoder: &dyn FrameDecoder,
    target: SampleTarget,
    timeout: Option<Duration>,
) -> Result<DecodedSample, SampleFailure> {
    let fail = |e: MontageError| failure_from(target.index, target.requested_secs, &e);

    let source = target.asset.source().map_err(fail)?;

    let frame = match &source.location {
        AssetLocation::Memory(still) => DecodedFrame {
            image: still_to_image(still).map_err(fail)?,
            actual_time_secs: target.local_secs,
        },
        AssetLocation::Uri(_) => {
            let decode = decoder.decode_frame(&source, target.local_secs);
            let decoded = match timeout {
                Some(limit) => tokio::time::timeout(limit, decode).await.map_err(|_| {
                    failure(
                        target.index,
                        target.requested_secs,
                        ErrorKind::Timeout,
                        format!("decode exceeded {}ms", limit.as_millis()),
                    )
                })?,
                None => decode.await,
            };
            decoded.map_err(fail)?
        }
    };

    tracing::debug!(
        index = target.index,
        local = target.local_secs,
        decoded = frame.actual_time_secs,
        generation = source.generation,
        "Snapshot sample decoded"
    );

    Ok(DecodedSample {
        index: target.index,
        requested_secs: target.requested_secs,
        applied_secs: target.applied_secs,
        clip_index: target.clip_index,
        clip_start_secs: target.clip_start_secs,
        frame,
    })
}

/// Report where the decoded frame sits on the timeline.
///
/// Decoders may land on a different source time than asked (keyframe
/// snapping); that time is mapped back through the clip and stays inside
/// the clip's window. Stills look the same at every time, so they keep the
/// sampled time.
fn place_on_timeline(composer: &TimelineComposer, decoded: DecodedSample) -> GeneratorResult {
    let clip = &composer.timeline().main_track()[decoded.clip_index].clip;
    let actual_time_secs = if clip.capabilities().is_still_image {
        decoded.applied_secs
    } else {
        decoded.clip_start_secs + TimeMapper::local_to_global(clip, decoded.frame.actual_time_secs)
    };

    GeneratorResult {
        index: decoded.index,
        requested_time_secs: decoded.requested_secs,
        actual_time_secs,
        image: decoded.frame.image,
    }
}

fn failure(index: usize, requested: f64, kind: ErrorKind, message: String) -> SampleFailure {
    SampleFailure {
        index,
        requested_time_secs: requested,
        kind,
        message,
        recoverable: false,
    }
}

fn failure_from(index: usize, requested: f64, error: &MontageError) -> SampleFailure {
    SampleFailure {
        recoverable: error.is_recoverable(),
        ..failure(index, requested, error.kind(), error.to_string())
    }
}

//! Extract evenly spaced snapshots from a project's timeline.

use std::path::PathBuf;

use montage_common::{AppConfig, TimeRange};
use montage_processing_core::{GeneratorRequest, TimelineComposer};
use montage_render_engine::{BatchStatus, CancelToken, SamplerConfig, SnapshotSampler};

use super::open_project;

pub async fn run(
    config: &AppConfig,
    path: PathBuf,
    count: usize,
    start: f64,
    duration: Option<f64>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let open = open_project(config, &path)?;
    let output = output.unwrap_or_else(|| open.project.root.join("thumbnails"));
    std::fs::create_dir_all(&output)
        .map_err(|e| anyhow::anyhow!("Cannot create {}: {e}", output.display()))?;

    let composer = TimelineComposer::new(open.timeline);
    let total = composer.total_duration_secs();
    let duration = duration.unwrap_or((total - start).max(0.0));
    let request = GeneratorRequest::new(TimeRange::new(start, duration), count)?;

    println!(
        "Extracting {count} snapshot(s) from {:.3}s to {:.3}s (timeline {:.3}s)",
        start,
        start + duration,
        total
    );

    let sampler = SnapshotSampler::new(open.backend, SamplerConfig::from(&config.sampler));
    let cancel = CancelToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };
    let batch = sampler.generate(&composer, request, &cancel).await;
    ctrl_c.abort();

    for diagnostic in &batch.diagnostics {
        println!("  [WARN] {diagnostic}");
    }
    for result in &batch.results {
        let file = output.join(format!("snapshot_{:03}.png", result.index));
        result
            .image
            .save(&file)
            .map_err(|e| anyhow::anyhow!("Failed to write {}: {e}", file.display()))?;
        println!(
            "  [OK] #{} {:.3}s (actual {:.3}s) -> {}",
            result.index,
            result.requested_time_secs,
            result.actual_time_secs,
            file.display()
        );
    }
    for failure in &batch.failures {
        println!(
            "  [FAIL] #{} {:.3}s: {:?} {}{}",
            failure.index,
            failure.requested_time_secs,
            failure.kind,
            failure.message,
            if failure.recoverable {
                " (may succeed after a retry)"
            } else {
                ""
            }
        );
    }
    if !batch.skipped.is_empty() {
        println!("  Skipped: {:?}", batch.skipped);
    }

    println!();
    println!("Status: {:?}", batch.status);
    match batch.status {
        BatchStatus::Complete | BatchStatus::PartialFailure => Ok(()),
        BatchStatus::Failed => anyhow::bail!("No snapshot could be extracted"),
        BatchStatus::Cancelled => anyhow::bail!("Extraction cancelled"),
    }
}

//! Exercises the ffmpeg backend against a generated still image.
//!
//! Skipped when ffmpeg/ffprobe are not installed.

use std::sync::Arc;

use image::{Rgba, RgbaImage};
use montage_common::TimeRange;
use montage_processing_core::{GeneratorRequest, TimelineComposer};
use montage_project_model::{Clip, ClipKind, MediaContext, MediaProbe, Size, Timeline};
use montage_render_engine::{
    BatchStatus, CancelToken, FfmpegBackend, SamplerConfig, SnapshotSampler,
};

fn write_fixture(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join("montage_ffmpeg_backend");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    let image = RgbaImage::from_pixel(64, 32, Rgba([200, 40, 40, 255]));
    image.save(&path).unwrap();
    path
}

#[tokio::test]
async fn probes_and_samples_a_still_image() {
    let backend = FfmpegBackend::default();
    if !backend.is_available() {
        eprintln!("ffmpeg not available, skipping");
        return;
    }

    let path = write_fixture("red.png");
    let uri = path.to_string_lossy().to_string();

    let info = backend.probe(&uri).unwrap();
    assert_eq!((info.width, info.height), (64, 32));

    let backend = Arc::new(backend);
    let ctx = MediaContext::new(backend.clone());
    let clip = Clip::open(ClipKind::Image, uri, &ctx).unwrap();
    let mut timeline = Timeline::new(Size::new(64.0, 32.0));
    timeline.push_main(clip);
    let composer = TimelineComposer::new(timeline);

    let sampler = SnapshotSampler::new(backend, SamplerConfig::default());
    let request = GeneratorRequest::new(TimeRange::new(0.0, 1.0), 2).unwrap();
    let batch = sampler.generate(&composer, request, &CancelToken::new()).await;

    assert_eq!(batch.status, BatchStatus::Complete, "{:?}", batch.failures);
    let frame = &batch.results[0].image;
    assert_eq!(frame.dimensions(), (64, 32));
    assert_eq!(frame.get_pixel(10, 10).0, [200, 40, 40, 255]);
}

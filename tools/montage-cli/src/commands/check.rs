//! Check system capabilities.

use montage_common::{config_file_path, AppConfig};
use montage_render_engine::ffmpeg::command_exists;

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("Montage System Check");
    println!("{}", "=".repeat(50));

    let mut all_ok = true;
    for (binary, purpose) in [("ffmpeg", "frame extraction"), ("ffprobe", "media probing")] {
        if command_exists(binary) {
            println!("[OK] {binary} found ({purpose})");
        } else {
            println!("[WARN] {binary} not found on PATH ({purpose} unavailable)");
            all_ok = false;
        }
    }

    let config_path = config_file_path();
    if config_path.exists() {
        println!("[OK] Config: {}", config_path.display());
    } else {
        println!("[OK] Config: defaults ({} not present)", config_path.display());
    }
    println!("     Projects dir: {}", config.projects_dir.display());
    println!(
        "     Sampler: {} concurrent, timeout {}ms, clamp out-of-range: {}",
        config.sampler.max_concurrency,
        config.sampler.sample_timeout_ms,
        config.sampler.clamp_out_of_range
    );

    println!();
    if all_ok {
        println!("All required tools are available. Montage is ready.");
    } else {
        println!("Some required tools are missing. Install ffmpeg to probe and decode media.");
    }

    Ok(())
}

//! Initialize a new Montage project.

use std::path::PathBuf;

use montage_common::AppConfig;
use montage_project_model::LoadedProject;

pub fn run(
    config: &AppConfig,
    name: String,
    output: Option<PathBuf>,
    width: u32,
    height: u32,
    fps: u32,
) -> anyhow::Result<()> {
    let output = output.unwrap_or_else(|| config.projects_dir.clone());
    let project_dir = output.join(&name);
    println!("Creating project '{}' at {}", name, project_dir.display());

    let project = LoadedProject::create(&project_dir, &name, width, height, fps)
        .map_err(|e| anyhow::anyhow!("Failed to create project: {e}"))?;

    println!("Project created successfully:");
    println!("  Directory: {}", project.root.display());
    println!("  Output: {}x{} @ {}fps", width, height, fps);
    println!();
    println!("Directory structure:");
    println!("  {}/", name);
    println!("  ├── sources/     (media files)");
    println!("  ├── meta/        (project.json, timeline.json)");
    println!("  └── thumbnails/  (extracted snapshots)");

    Ok(())
}

use std::path::PathBuf;

use anyhow::{Context, Result};
use winit::dpi::LogicalSize;

use prism_engine::device::GpuInit;
use prism_engine::logging::{init_logging, LoggingConfig};
use prism_engine::texture::load_images;
use prism_engine::window::{Runtime, RuntimeConfig};

mod scene;

const IMAGE_FILES: [&str; 7] = [
    "matcap.png",
    "px.jpg",
    "py.jpg",
    "pz.jpg",
    "nx.jpg",
    "ny.jpg",
    "nz.jpg",
];

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let asset_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("assets/images"));

    let paths: Vec<PathBuf> = IMAGE_FILES.iter().map(|f| asset_dir.join(f)).collect();
    let images = pollster::block_on(load_images(&paths))
        .with_context(|| format!("failed to load images from {}", asset_dir.display()))?;
    log::info!("loaded {} images from {}", images.len(), asset_dir.display());

    let config = RuntimeConfig {
        title: "prism viewer".to_string(),
        initial_size: LogicalSize::new(960.0, 720.0),
    };

    Runtime::run(config, GpuInit::default(), scene::Scene::new(images))
}

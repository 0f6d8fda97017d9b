//! Lumen - render a frame to PNG.
//!
//! Usage: `lumen [frame.json]`. Without a config the demo room is rendered
//! with default settings.

mod config;
mod demo;

use std::path::Path;

use anyhow::{Context, Result};
use lumen_renderer::{HdrImage, Renderer};

use crate::config::FrameConfig;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => FrameConfig::load(&path)?,
        None => {
            log::info!("No config given, rendering the demo scene");
            FrameConfig::default()
        }
    };

    let mut scene = demo::build_scene(&config)?;
    let camera = config.camera();
    let renderer = Renderer::new(config.render_mode());

    log::info!(
        "Rendering {}x{}, {} samples, {:?}",
        config.width,
        config.height,
        config.samples,
        renderer.mode()
    );
    let image = renderer.render_frame(
        &mut scene,
        &camera,
        config.width,
        config.height,
        config.samples,
        config.seed,
    )?;

    save_png(&config.output, &image)?;
    log::info!("Wrote {}", config.output.display());
    Ok(())
}

fn save_png(path: &Path, hdr: &HdrImage) -> Result<()> {
    image::save_buffer(
        path,
        &hdr.to_rgba8(),
        hdr.width,
        hdr.height,
        image::ColorType::Rgba8,
    )
    .with_context(|| format!("writing {}", path.display()))
}

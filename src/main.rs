//! Monte Carlo path tracer for a scene of spheres lit by point lamps.
//!
//! Diffuse, mirror and glass surfaces are shaded by recursive ray sampling and
//! the averaged result is written as a plain-text PPM image.

use std::fs::File;

use clap::Parser;
use log::{debug, info, LevelFilter};

use crate::cli::Args;
use crate::error::RenderResult;

mod camera;
mod cli;
mod config;
mod error;
mod material;
mod object;
mod picture;
mod ray;
mod render;
mod scene;

fn init_logger(level: LevelFilter) {
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();
}

fn main() -> RenderResult<()> {
    let args = Args::parse();
    init_logger(args.log_level.clone().into());

    let config = args.render_config();
    debug!(target: "app", "Render configuration: {:?}", config);
    info!(
        target: "app",
        "Rendering {}x{} at {} samples per pixel into {}",
        config.width, config.height, config.samples_per_pixel, args.output,
    );

    let (picture, stats) = render::render(&config)?;
    picture.write_ppm(File::create(&args.output)?)?;

    info!(target: "app", "Wrote {} ({} rays in {:?})", args.output, stats.rays, stats.elapsed);
    println!("{}", stats.rays);
    Ok(())
}

use clap::{Parser, ValueEnum};
use log::LevelFilter;

use crate::config::{RenderConfig, DEFAULT_MAX_DEPTH, DEFAULT_SAMPLES};
use crate::render::DiffuseSampler;

#[derive(Debug, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, ValueEnum)]
pub enum SamplerArg {
    /// Normalized cube samples (matches earlier renders)
    Cube,
    /// Cosine-weighted hemisphere samples
    Cosine,
}

impl From<SamplerArg> for DiffuseSampler {
    fn from(sampler: SamplerArg) -> Self {
        match sampler {
            SamplerArg::Cube => DiffuseSampler::Cube,
            SamplerArg::Cosine => DiffuseSampler::Cosine,
        }
    }
}

/// Renders the built-in sphere scene to a plain PPM image.
#[derive(Parser, Debug)]
#[command(name = "sphere-tracer")]
#[command(about = "Monte Carlo path tracer for spheres and point lamps")]
pub struct Args {
    /// Image width in pixels
    #[arg(long, default_value_t = 800)]
    pub width: u32,

    /// Image height in pixels
    #[arg(long, default_value_t = 600)]
    pub height: u32,

    /// Number of samples per pixel
    #[arg(long = "samples", short = 's', default_value_t = DEFAULT_SAMPLES)]
    pub samples_per_pixel: u32,

    /// Recursion depth past which paths return black
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    pub max_depth: u32,

    /// Seed for the random stream; omitted means a fresh seed every run
    #[arg(long)]
    pub seed: Option<u64>,

    /// Indirect sampling strategy for diffuse surfaces
    #[arg(long, value_enum, default_value = "cube")]
    pub sampler: SamplerArg,

    /// Render rows in parallel, one random stream per row
    #[arg(long)]
    pub parallel: bool,

    /// Output file path
    #[arg(short, long, default_value = "im.ppm")]
    pub output: String,

    /// Set the logging level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,
}

impl Args {
    pub fn render_config(&self) -> RenderConfig {
        RenderConfig {
            width: self.width,
            height: self.height,
            samples_per_pixel: self.samples_per_pixel,
            max_depth: self.max_depth,
            seed: self.seed,
            sampler: self.sampler.clone().into(),
            parallel: self.parallel,
            ..RenderConfig::default()
        }
    }
}

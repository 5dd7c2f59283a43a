use nalgebra::{point, Point3};

use crate::error::{RenderError, RenderResult};
use crate::render::DiffuseSampler;
use crate::scene::Scene;

pub const DEFAULT_MAX_DEPTH: u32 = 40;
pub const DEFAULT_SAMPLES: u32 = 100;

/// Everything needed to produce one image.
#[derive(Clone, Debug)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    pub samples_per_pixel: u32,
    pub camera_origin: Point3<f32>,
    pub scene: Scene,
    /// Recursion depth past which a path returns black.
    pub max_depth: u32,
    /// `None` seeds from entropy.
    pub seed: Option<u64>,
    pub sampler: DiffuseSampler,
    /// Render rows on the rayon pool, each with its own random stream.
    pub parallel: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            width: 800,
            height: 600,
            samples_per_pixel: DEFAULT_SAMPLES,
            camera_origin: point![400.0, 300.0, -2000.0],
            scene: Scene::demo(),
            max_depth: DEFAULT_MAX_DEPTH,
            seed: None,
            sampler: DiffuseSampler::Cube,
            parallel: false,
        }
    }
}

fn invalid(message: impl Into<String>) -> RenderError {
    RenderError::InvalidConfiguration(message.into())
}

impl RenderConfig {
    pub fn validate(&self) -> RenderResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(invalid(format!("image size {}x{} is empty", self.width, self.height)));
        }
        if self.samples_per_pixel == 0 {
            return Err(invalid("samples per pixel must be positive"));
        }
        if !self.camera_origin.coords.iter().all(|c| c.is_finite()) {
            return Err(invalid(format!("camera origin {} is not finite", self.camera_origin)));
        }
        if self.camera_origin.z == 0.0 {
            return Err(invalid("camera origin lies on the image plane"));
        }
        for (index, object) in self.scene.objects.iter().enumerate() {
            let radius = object.sphere.radius;
            if !(radius.is_finite() && radius > 0.0) {
                return Err(invalid(format!("object {index} has radius {radius}")));
            }
            if !object.sphere.center.coords.iter().all(|c| c.is_finite()) {
                return Err(invalid(format!("object {index} has a non-finite center")));
            }
        }
        Ok(())
    }
}

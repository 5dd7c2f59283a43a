use nalgebra::{Point3, Vector3};

use crate::material::Material;
use crate::picture::Color;

#[derive(Clone, Debug)]
pub struct Ray {
    pub origin: Point3<f32>,
    pub direction: Vector3<f32>,
}

impl Ray {
    pub fn new(origin: Point3<f32>, direction: Vector3<f32>) -> Self {
        Self { origin, direction }
    }

    pub fn at(&self, t: f32) -> Point3<f32> {
        self.origin + self.direction * t
    }

    /// Ray leaving `point` along `direction`, nudged forward by `offset` to clear the surface.
    pub fn offset(point: Point3<f32>, direction: Vector3<f32>, offset: f32) -> Self {
        Self::new(point + direction * offset, direction)
    }
}

/// Nearest intersection of a ray with the scene.
///
/// The normal always points away from the sphere center, whichever side the ray came from.
#[derive(Clone, Debug)]
pub struct Hit {
    pub t: f32,
    pub albedo: Color,
    pub material: Material,
    pub point: Point3<f32>,
    pub normal: Vector3<f32>,
}

use nalgebra::{point, Point3};

use crate::ray::Ray;

/// Pinhole camera looking through the image plane `z = 0`, where pixel
/// `(x, y)` sits at world position `(x, y, 0)`.
#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
}

impl Camera {
    pub fn new(position: Point3<f32>) -> Self {
        Camera { position }
    }

    /// Unit-direction ray from the camera through image-plane coordinates `(x, y)`.
    pub fn ray_through(&self, x: f32, y: f32) -> Ray {
        let direction = (point![x, y, 0.0] - self.position).normalize();
        Ray::new(self.position, direction)
    }
}

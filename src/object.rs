use float_ord::FloatOrd;
use nalgebra::Point3;

use crate::material::Material;
use crate::picture::Color;
use crate::ray::{Hit, Ray};

/// Minimum distance accepted for camera and bounce intersections.
pub const HIT_EPSILON: f32 = 1e-4;

#[derive(Clone, Debug)]
pub struct Sphere {
    pub center: Point3<f32>,
    pub radius: f32,
}

impl Sphere {
    pub fn new(center: Point3<f32>, radius: f32) -> Self {
        Sphere { center, radius }
    }

    /// Distance along `ray` to the first crossing of the surface beyond `t_min`.
    ///
    /// The direction does not need to be normalized; `t` is expressed in units of it.
    pub fn hit(&self, ray: &Ray, t_min: f32) -> Option<f32> {
        let oc = ray.origin - self.center;
        let a = ray.direction.magnitude_squared();
        let b = 2.0 * ray.direction.dot(&oc);
        let c = oc.magnitude_squared() - self.radius * self.radius;

        let discriminant = b * b - 4.0 * a * c;
        if discriminant < 0.0 {
            return None;
        }
        let sqrtd = discriminant.sqrt();

        let near = (-b - sqrtd) / (2.0 * a);
        if near > t_min {
            return Some(near);
        }
        let far = (-b + sqrtd) / (2.0 * a);
        if far > t_min {
            return Some(far);
        }
        None
    }
}

#[derive(Clone, Debug)]
pub struct Object {
    pub sphere: Sphere,
    pub albedo: Color,
    pub material: Material,
}

impl Object {
    pub fn new(sphere: Sphere, albedo: Color, material: Material) -> Self {
        Object { sphere, albedo, material }
    }
}

/// Closest object along `ray`. Equal distances resolve to the object listed first.
pub fn nearest_hit(ray: &Ray, objects: &[Object]) -> Option<Hit> {
    let (t, object) = objects.iter()
        .filter_map(|obj| obj.sphere.hit(ray, HIT_EPSILON).map(|t| (t, obj)))
        .min_by_key(|(t, _)| FloatOrd(*t))?;

    let point = ray.at(t);
    let normal = (point - object.sphere.center).normalize();
    Some(Hit {
        t,
        albedo: object.albedo,
        material: object.material,
        point,
        normal,
    })
}

/// Whether anything blocks `ray` strictly between `t_min` and `t_max`.
pub fn occluded(ray: &Ray, objects: &[Object], t_min: f32, t_max: f32) -> bool {
    objects.iter()
        .filter_map(|obj| obj.sphere.hit(ray, t_min))
        .any(|t| t > t_min && t < t_max)
}

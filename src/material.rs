use nalgebra::Vector3;

/// Refractive index of every glass surface.
pub const GLASS_IOR: f32 = 1.5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Material {
    Diffuse,
    Mirror,
    Glass,
}

pub fn reflect(i: &Vector3<f32>, n: &Vector3<f32>) -> Vector3<f32> {
    i - 2.0 * n.dot(i) * n
}

/// Refracted direction for relative index `eta`, or `None` on total internal reflection.
///
/// `n` must face against `i`.
pub fn refract(eta: f32, i: &Vector3<f32>, n: &Vector3<f32>) -> Option<Vector3<f32>> {
    let cos_i = n.dot(i);
    let k = 1.0 - eta * eta * (1.0 - cos_i * cos_i);
    if k < 0.0 {
        return None;
    }
    Some(eta * i - (eta * cos_i + k.sqrt()) * n)
}

/// Schlick's approximation of the Fresnel reflectance between media `n1` and `n2`.
///
/// Matching indices form no interface and reflect nothing.
pub fn schlick(n1: f32, n2: f32, cos_theta: f32) -> f32 {
    debug_assert!(n1 + n2 != 0.0, "indices of refraction sum to zero");
    if n1 == n2 {
        return 0.0;
    }
    let r0 = ((n1 - n2) / (n1 + n2)).powi(2);
    r0 + (1.0 - r0) * (1.0 - cos_theta).powi(5)
}

/// Relative index and oriented normal for a ray crossing a glass surface.
pub fn refraction_setup(direction: &Vector3<f32>, normal: &Vector3<f32>) -> (f32, Vector3<f32>) {
    if direction.dot(normal) < 0.0 {
        (1.0 / GLASS_IOR, *normal)
    } else {
        (GLASS_IOR, -normal)
    }
}

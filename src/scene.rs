use nalgebra::{point, Point3};

use crate::material::Material;
use crate::object::{Object, Sphere};
use crate::picture::Color;

/// Point light with unbounded emitted radiance.
#[derive(Clone, Debug)]
pub struct Lamp {
    pub position: Point3<f32>,
    pub emission: Color,
}

impl Lamp {
    pub fn new(position: Point3<f32>, emission: Color) -> Self {
        Lamp { position, emission }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Scene {
    pub objects: Vec<Object>,
    pub lamps: Vec<Lamp>,
}

impl Scene {
    pub fn new(objects: Vec<Object>, lamps: Vec<Lamp>) -> Self {
        Scene { objects, lamps }
    }

    /// Floor, three material test spheres, two small accents and a single lamp,
    /// framed for an 800x600 image seen from (400, 300, -2000).
    pub fn demo() -> Self {
        let sphere = |center, radius, albedo, material| Object::new(Sphere::new(center, radius), albedo, material);
        Scene::new(
            vec![
                sphere(point![400.0, 100000.0, 500.0], 99500.0, Color::WHITE, Material::Diffuse),
                sphere(point![200.0, 400.0, 500.0], 100.0, Color::new(1.0, 0.0, 0.0), Material::Diffuse),
                sphere(point![400.0, 400.0, 700.0], 100.0, Color::splat(0.9), Material::Mirror),
                sphere(point![600.0, 400.0, 500.0], 100.0, Color::splat(0.9), Material::Glass),
                sphere(point![400.0, 300.0, 410.0], 20.0, Color::new(0.0, 0.5, 1.0), Material::Diffuse),
                sphere(point![200.0, 100.0, 500.0], 100.0, Color::new(0.0, 1.0, 1.0), Material::Diffuse),
            ],
            vec![
                Lamp::new(point![400.0, 200.0, 500.0], Color::splat(200000.0)),
            ],
        )
    }
}

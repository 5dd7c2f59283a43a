use std::f32::consts::PI;
use std::iter::repeat_with;
use std::time::{Duration, Instant};

use log::{info, trace};
use nalgebra::Vector3;
use rayon::prelude::*;

use crate::camera::Camera;
use crate::config::RenderConfig;
use crate::error::RenderResult;
use crate::material::{reflect, refract, refraction_setup, schlick, Material, GLASS_IOR};
use crate::object::{nearest_hit, occluded};
use crate::picture::{Color, Picture, RGB8};
use crate::ray::{Hit, Ray};
use crate::scene::Scene;

/// Radiance of rays that escape the scene.
pub const BACKGROUND_COLOR: Color = Color::new(0.9, 0.3, 0.7);

/// Distance secondary and shadow rays travel before they may hit anything.
const BOUNCE_OFFSET: f32 = 0.1;

/// How diffuse surfaces pick their indirect bounce direction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DiffuseSampler {
    /// Normalized point drawn uniformly from the [-1, 1] cube, weighted by `2 * albedo * cos`.
    ///
    /// The cube is not uniform over directions, so images carry a slight bias toward
    /// the diagonals. Kept as the default so output matches earlier renders.
    #[default]
    Cube,
    /// Cosine-weighted hemisphere around the normal, weighted by `albedo`.
    Cosine,
}

/// Mutable state threaded through every traced ray: the random stream and counters.
pub struct RenderContext {
    rng: fastrand::Rng,
    rays: u64,
    max_depth: u32,
    sampler: DiffuseSampler,
}

impl RenderContext {
    pub fn new(seed: Option<u64>, max_depth: u32, sampler: DiffuseSampler) -> Self {
        let rng = match seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        RenderContext { rng, rays: 0, max_depth, sampler }
    }

    /// Number of `render_ray` calls made through this context.
    pub fn rays(&self) -> u64 {
        self.rays
    }

    pub fn random(&mut self) -> f32 {
        self.rng.f32()
    }

    pub fn random_vec(&mut self) -> Vector3<f32> {
        Vector3::new(self.random() * 2.0 - 1.0, self.random() * 2.0 - 1.0, self.random() * 2.0 - 1.0)
    }

    /// Unit vector from a normalized cube sample. Near-zero draws are redrawn.
    pub fn random_cube_direction(&mut self) -> Vector3<f32> {
        repeat_with(|| self.random_vec())
            .find_map(|vec| vec.try_normalize(1e-6))
            .expect("infinite iterator")
    }

    pub fn random_vec_in_unit_sphere(&mut self) -> Vector3<f32> {
        repeat_with(|| self.random_vec())
            .find(|vec| vec.magnitude_squared() < 1.0 && vec.magnitude_squared() > 1e-12)
            .expect("infinite iterator")
    }

    pub fn random_unit_vec(&mut self) -> Vector3<f32> {
        self.random_vec_in_unit_sphere().normalize()
    }

    /// Cosine-distributed direction in the hemisphere around `normal`.
    pub fn random_cosine_direction(&mut self, normal: &Vector3<f32>) -> Vector3<f32> {
        (normal + self.random_unit_vec())
            .try_normalize(1e-6)
            .unwrap_or(*normal)
    }
}

/// Estimates the radiance arriving along `ray`.
pub fn render_ray(ray: &Ray, scene: &Scene, ctx: &mut RenderContext, depth: u32) -> Color {
    ctx.rays += 1;
    if depth > ctx.max_depth {
        return Color::BLACK;
    }

    let Some(hit) = nearest_hit(ray, &scene.objects) else {
        return BACKGROUND_COLOR;
    };

    match hit.material {
        Material::Diffuse => direct_light(&hit, scene) + indirect_light(&hit, scene, ctx, depth),
        Material::Mirror => mirror(ray, &hit, scene, ctx, depth),
        Material::Glass => {
            let reflectance = schlick(1.0, GLASS_IOR, hit.normal.dot(&ray.direction).abs());
            // each branch is weighted by its own selection probability, which cancels
            if ctx.random() < reflectance {
                mirror(ray, &hit, scene, ctx, depth)
            } else {
                transmit(ray, &hit, scene, ctx, depth)
            }
        }
    }
}

/// Refracted radiance through a glass surface. Total internal reflection transmits nothing.
fn transmit(ray: &Ray, hit: &Hit, scene: &Scene, ctx: &mut RenderContext, depth: u32) -> Color {
    let (eta, normal) = refraction_setup(&ray.direction, &hit.normal);
    match refract(eta, &ray.direction, &normal) {
        Some(direction) => {
            let refracted = Ray::offset(hit.point, direction, BOUNCE_OFFSET);
            render_ray(&refracted, scene, ctx, depth + 1) * hit.albedo
        }
        None => Color::BLACK,
    }
}

fn mirror(ray: &Ray, hit: &Hit, scene: &Scene, ctx: &mut RenderContext, depth: u32) -> Color {
    let direction = reflect(&ray.direction, &hit.normal);
    let reflected = Ray::offset(hit.point, direction, BOUNCE_OFFSET);
    render_ray(&reflected, scene, ctx, depth + 1) * hit.albedo
}

/// Lambertian contribution of every lamp visible from the hit point.
fn direct_light(hit: &Hit, scene: &Scene) -> Color {
    scene.lamps.iter()
        .filter_map(|lamp| {
            let to_lamp = lamp.position - hit.point;
            let dist2 = to_lamp.magnitude_squared();
            if dist2 == 0.0 {
                return None;
            }
            let distance = dist2.sqrt();
            let direction = to_lamp / distance;

            let shadow = Ray::new(hit.point, direction);
            if occluded(&shadow, &scene.objects, BOUNCE_OFFSET, distance) {
                return None;
            }
            let cos = hit.normal.dot(&direction).max(0.0);
            Some(cos * lamp.emission * hit.albedo / dist2 / PI)
        })
        .sum()
}

fn indirect_light(hit: &Hit, scene: &Scene, ctx: &mut RenderContext, depth: u32) -> Color {
    match ctx.sampler {
        DiffuseSampler::Cube => {
            let direction = ctx.random_cube_direction();
            let bounce = Ray::offset(hit.point, direction, BOUNCE_OFFSET);
            let incoming = render_ray(&bounce, scene, ctx, depth + 1) * (2.0 * PI);
            let cos = direction.dot(&hit.normal).max(0.0);
            hit.albedo * incoming * cos / PI
        }
        DiffuseSampler::Cosine => {
            let direction = ctx.random_cosine_direction(&hit.normal);
            let bounce = Ray::offset(hit.point, direction, BOUNCE_OFFSET);
            hit.albedo * render_ray(&bounce, scene, ctx, depth + 1)
        }
    }
}

/// Produces the mean radiance of pixel `(x, y)` from `samples` jittered camera rays.
pub fn render_pixel(x: u32, y: u32, camera: &Camera, scene: &Scene, ctx: &mut RenderContext, samples: u32) -> Color {
    let sum: Color = (0..samples)
        .map(|_| {
            let u = ctx.random() - 0.5;
            let v = ctx.random() - 0.5;
            let ray = camera.ray_through(x as f32 + u, y as f32 + v);
            render_ray(&ray, scene, ctx, 0)
        })
        .sum();
    sum / samples as f32
}

#[derive(Clone, Copy, Debug)]
pub struct RenderStats {
    pub rays: u64,
    pub elapsed: Duration,
}

/// Pixel coordinates in row-major order, top row first.
fn pixel_coords(width: u32, height: u32) -> impl Iterator<Item=(u32, u32)> {
    (0..height).flat_map(move |y| (0..width).map(move |x| (x, y)))
}

/// Renders the configured image on the current thread with a single random stream.
pub fn render_picture(config: &RenderConfig) -> (Picture<RGB8>, u64) {
    let camera = Camera::new(config.camera_origin);
    let mut ctx = RenderContext::new(config.seed, config.max_depth, config.sampler);
    let (width, height) = (config.width, config.height);

    let pixels: Vec<RGB8> = pixel_coords(width, height)
        .map(|(x, y)| render_pixel(x, y, &camera, &config.scene, &mut ctx, config.samples_per_pixel))
        .map(RGB8::from)
        .collect();
    (Picture::new(pixels, (width, height)), ctx.rays())
}

fn row_seed(seed: Option<u64>, row: u32) -> Option<u64> {
    seed.map(|seed| seed.wrapping_add(row as u64))
}

/// Renders rows on the rayon pool. Row `y` draws from its own stream seeded with `seed + y`.
pub fn render_picture_par(config: &RenderConfig) -> (Picture<RGB8>, u64) {
    let camera = Camera::new(config.camera_origin);
    let (width, height) = (config.width, config.height);

    let rows: Vec<(Vec<RGB8>, u64)> = (0..height)
        .into_par_iter()
        .map(|y| {
            let mut ctx = RenderContext::new(row_seed(config.seed, y), config.max_depth, config.sampler);
            trace!(target: "app", "Rendering row: {}", y);
            let row = (0..width)
                .map(|x| render_pixel(x, y, &camera, &config.scene, &mut ctx, config.samples_per_pixel))
                .map(RGB8::from)
                .collect();
            (row, ctx.rays())
        })
        .collect();

    let rays: u64 = rows.iter().map(|(_, rays)| rays).sum();
    let pixels = rows.into_iter().flat_map(|(row, _)| row).collect();
    (Picture::new(pixels, (width, height)), rays)
}

/// Validates `config` and renders it, sequentially or in parallel as configured.
pub fn render(config: &RenderConfig) -> RenderResult<(Picture<RGB8>, RenderStats)> {
    config.validate()?;

    info!(target: "app", "Starting frame render...");
    let start = Instant::now();
    let (picture, rays) = if config.parallel {
        render_picture_par(config)
    } else {
        render_picture(config)
    };
    let elapsed = start.elapsed();
    info!(target: "app", "Finished rendering. Took {:?}, traced {} rays", elapsed, rays);

    Ok((picture, RenderStats { rays, elapsed }))
}

#[cfg(test)]
mod tests {
    use nalgebra::{point, vector, Point3};

    use super::*;
    use crate::config::DEFAULT_MAX_DEPTH;
    use crate::object::{Object, Sphere};
    use crate::scene::Lamp;

    fn context(seed: u64, max_depth: u32) -> RenderContext {
        RenderContext::new(Some(seed), max_depth, DiffuseSampler::Cube)
    }

    fn sphere(center: Point3<f32>, radius: f32, albedo: Color, material: Material) -> Object {
        Object::new(Sphere::new(center, radius), albedo, material)
    }

    fn assert_color_close(actual: Color, expected: Color) {
        let error = (actual.r - expected.r).abs() + (actual.g - expected.g).abs() + (actual.b - expected.b).abs();
        assert!(error < 1e-5, "{actual:?} != {expected:?}");
    }

    #[test]
    fn empty_scene_returns_background_at_every_depth() {
        let scene = Scene::default();
        let mut ctx = context(1, DEFAULT_MAX_DEPTH);
        let ray = Ray::new(point![0.0, 0.0, 0.0], vector![0.3, -0.2, 1.0].normalize());
        for depth in 0..=DEFAULT_MAX_DEPTH {
            assert_eq!(render_ray(&ray, &scene, &mut ctx, depth), BACKGROUND_COLOR);
        }
        assert_eq!(ctx.rays(), DEFAULT_MAX_DEPTH as u64 + 1);
    }

    #[test]
    fn past_max_depth_is_black() {
        let scene = Scene::demo();
        let mut ctx = context(2, DEFAULT_MAX_DEPTH);
        let camera = Camera::new(point![400.0, 300.0, -2000.0]);
        for (x, y) in [(200.0, 400.0), (400.0, 300.0), (0.0, 0.0)] {
            let ray = camera.ray_through(x, y);
            assert_eq!(render_ray(&ray, &scene, &mut ctx, DEFAULT_MAX_DEPTH + 1), Color::BLACK);
        }
    }

    #[test]
    fn lit_red_sphere_is_red() {
        let center = point![200.0, 400.0, 500.0];
        let scene = Scene::new(
            vec![sphere(center, 100.0, Color::new(1.0, 0.0, 0.0), Material::Diffuse)],
            vec![Lamp::new(point![400.0, 200.0, 500.0], Color::splat(200000.0))],
        );
        let origin = point![500.0, 250.0, 500.0];
        let ray = Ray::new(origin, (center - origin).normalize());
        let mut ctx = context(3, 0);

        let pixel = RGB8::from(render_ray(&ray, &scene, &mut ctx, 0));
        assert!(pixel.r > pixel.g && pixel.r > pixel.b, "{pixel:?}");
    }

    #[test]
    fn shadowed_point_gets_no_direct_light() {
        let scene = Scene::new(
            vec![
                sphere(point![0.0, 0.0, 10.0], 5.0, Color::WHITE, Material::Diffuse),
                sphere(point![0.0, 0.0, -20.0], 2.0, Color::WHITE, Material::Diffuse),
            ],
            vec![Lamp::new(point![0.0, 0.0, -40.0], Color::splat(1000.0))],
        );
        let ray = Ray::new(point![0.0, 0.0, 0.0], Vector3::z());
        let mut ctx = context(4, 0);
        assert_eq!(render_ray(&ray, &scene, &mut ctx, 0), Color::BLACK);
    }

    #[test]
    fn objects_behind_lamp_cast_no_shadow() {
        let scene = Scene::new(
            vec![
                sphere(point![0.0, 0.0, 10.0], 5.0, Color::WHITE, Material::Diffuse),
                sphere(point![0.0, 0.0, -60.0], 2.0, Color::WHITE, Material::Diffuse),
            ],
            vec![Lamp::new(point![0.0, 0.0, -40.0], Color::splat(1000.0))],
        );
        let ray = Ray::new(point![0.0, 0.0, 0.0], Vector3::z());
        let mut ctx = context(5, 0);
        let expected = Color::splat(1000.0) / (45.0 * 45.0) / PI;
        assert_color_close(render_ray(&ray, &scene, &mut ctx, 0), expected);
    }

    #[test]
    fn mirror_reflects_background_tinted() {
        let albedo = Color::splat(0.5);
        let scene = Scene::new(vec![sphere(point![0.0, 0.0, 10.0], 2.0, albedo, Material::Mirror)], vec![]);
        let ray = Ray::new(point![0.0, 0.0, 0.0], Vector3::z());
        let mut ctx = context(6, DEFAULT_MAX_DEPTH);
        assert_color_close(render_ray(&ray, &scene, &mut ctx, 0), BACKGROUND_COLOR * albedo);
        assert_eq!(ctx.rays(), 2);
    }

    #[test]
    fn clear_glass_passes_background_head_on() {
        let scene = Scene::new(vec![sphere(point![0.0, 0.0, 20.0], 5.0, Color::WHITE, Material::Glass)], vec![]);
        let ray = Ray::new(point![0.0, 0.0, 0.0], Vector3::z());
        let mut ctx = context(7, DEFAULT_MAX_DEPTH);
        for _ in 0..50 {
            assert_color_close(render_ray(&ray, &scene, &mut ctx, 0), BACKGROUND_COLOR);
        }
    }

    #[test]
    fn sampled_directions_are_unit() {
        let mut ctx = context(8, DEFAULT_MAX_DEPTH);
        let normal = vector![0.0, 1.0, 0.0];
        for _ in 0..1000 {
            let cube = ctx.random_cube_direction();
            assert!((cube.magnitude() - 1.0).abs() < 1e-5);
            let cosine = ctx.random_cosine_direction(&normal);
            assert!((cosine.magnitude() - 1.0).abs() < 1e-5);
            assert!(cosine.dot(&normal) >= -1e-6);
        }
    }

    fn variance_of_pixel(samples: u32, trials: u64) -> f32 {
        let scene = Scene::new(
            vec![sphere(point![0.0, 0.0, 10.0], 5.0, Color::splat(0.8), Material::Diffuse)],
            vec![Lamp::new(point![0.0, -20.0, 0.0], Color::splat(1000.0))],
        );
        let camera = Camera::new(point![0.0, 0.0, -10.0]);
        let values: Vec<f32> = (0..trials)
            .map(|trial| {
                let mut ctx = context(1000 + trial, 3);
                let color = render_pixel(0, 0, &camera, &scene, &mut ctx, samples);
                color.r + color.g + color.b
            })
            .collect();
        let mean = values.iter().sum::<f32>() / values.len() as f32;
        values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / (values.len() - 1) as f32
    }

    #[test]
    fn more_samples_reduce_variance() {
        let coarse = variance_of_pixel(4, 40);
        let fine = variance_of_pixel(64, 40);
        assert!(coarse > 0.0);
        assert!(fine < coarse, "fine {fine} >= coarse {coarse}");
    }

    fn small_config(seed: u64, parallel: bool) -> RenderConfig {
        RenderConfig {
            width: 8,
            height: 6,
            samples_per_pixel: 2,
            camera_origin: point![4.0, 3.0, -20.0],
            scene: Scene::new(
                vec![
                    sphere(point![4.0, 3.0, 10.0], 3.0, Color::new(0.2, 0.9, 0.2), Material::Diffuse),
                    sphere(point![1.0, 1.0, 8.0], 1.5, Color::splat(0.9), Material::Glass),
                ],
                vec![Lamp::new(point![0.0, -10.0, 0.0], Color::splat(5000.0))],
            ),
            max_depth: 5,
            seed: Some(seed),
            sampler: DiffuseSampler::Cube,
            parallel,
        }
    }

    #[test]
    fn seeded_render_is_reproducible() {
        for parallel in [false, true] {
            let (first, first_stats) = render(&small_config(9, parallel)).expect("render");
            let (second, second_stats) = render(&small_config(9, parallel)).expect("render");
            assert_eq!(first.pixels(), second.pixels());
            assert_eq!(first_stats.rays, second_stats.rays);
            assert_eq!((first.width(), first.height()), (8, 6));
            assert!(first_stats.rays >= 8 * 6 * 2);
        }
    }

    #[test]
    fn cosine_sampler_reflects_albedo_times_background() {
        let albedo = Color::new(0.8, 0.5, 0.2);
        // huge sphere standing in for a plane at z = 10 facing the camera
        let scene = Scene::new(vec![sphere(point![0.0, 0.0, 1000.0], 990.0, albedo, Material::Diffuse)], vec![]);
        let camera = Camera::new(point![0.0, 0.0, -10.0]);
        let mut ctx = RenderContext::new(Some(10), 1, DiffuseSampler::Cosine);

        let mean = render_pixel(0, 0, &camera, &scene, &mut ctx, 64);
        let expected = albedo * BACKGROUND_COLOR;
        let error = (mean.r - expected.r).abs() + (mean.g - expected.g).abs() + (mean.b - expected.b).abs();
        assert!(error < 1e-4, "{mean:?} != {expected:?}");
    }

    /// Ray inside a glass sphere meeting its wall at 53 degrees, past the critical angle.
    /// The internal reflection lands on a lit diffuse sphere also inside the glass.
    fn internal_reflection_scene() -> (Scene, Ray) {
        let scene = Scene::new(
            vec![
                sphere(point![0.0, 0.0, 0.0], 10.0, Color::new(0.5, 1.0, 1.0), Material::Glass),
                sphere(point![3.2, 0.0, 7.4], 1.0, Color::WHITE, Material::Diffuse),
            ],
            vec![Lamp::new(point![8.0, 0.0, 2.0], Color::splat(100.0))],
        );
        (scene, Ray::new(point![8.0, 0.0, -5.0], Vector3::z()))
    }

    #[test]
    fn total_internal_reflection_transmits_nothing() {
        let (scene, ray) = internal_reflection_scene();
        let hit = nearest_hit(&ray, &scene.objects).expect("hit glass wall");
        assert_eq!(hit.material, Material::Glass);
        assert!((hit.point - point![8.0, 0.0, 6.0]).magnitude() < 1e-4);

        let mut ctx = context(12, 1);
        assert_eq!(transmit(&ray, &hit, &scene, &mut ctx, 0), Color::BLACK);

        let reflected = mirror(&ray, &hit, &scene, &mut ctx, 0);
        assert!(reflected.r > 0.0, "{reflected:?}");
        assert!((reflected.g - 2.0 * reflected.r).abs() < 1e-5, "{reflected:?}");
        assert_eq!(reflected.g, reflected.b);
    }

    #[test]
    fn glass_past_critical_angle_is_black_or_reflected() {
        let (scene, ray) = internal_reflection_scene();
        let hit = nearest_hit(&ray, &scene.objects).expect("hit glass wall");
        let reflected = mirror(&ray, &hit, &scene, &mut context(13, 1), 0);

        let mut blacks = 0;
        for seed in 0..200 {
            let color = render_ray(&ray, &scene, &mut context(seed, 1), 0);
            if color == Color::BLACK {
                blacks += 1;
            } else {
                assert_eq!(color, reflected);
            }
        }
        // reflectance here is about 0.05, so most draws take the transmission branch
        assert!(blacks > 150, "{blacks} black samples");
    }

    #[test]
    fn pixel_coords_cover_rows_without_overflow() {
        let coords: Vec<(u32, u32)> = pixel_coords(3, 2).collect();
        assert_eq!(coords, vec![(0, 0), (1, 0), (2, 0), (0, 1), (1, 1), (2, 1)]);

        // width * height exceeds u32::MAX
        let mut wide = pixel_coords(70_000, 70_000);
        assert_eq!(wide.nth(70_001), Some((1, 1)));
    }

    #[test]
    fn render_rejects_invalid_config() {
        let mut config = small_config(11, false);
        config.samples_per_pixel = 0;
        assert!(render(&config).is_err());
    }
}

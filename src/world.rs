use crate::color::RGB;
use crate::kd::{KdConfig, KdTree};
use crate::matrix::Matrix4;
use crate::point::Point3;
use crate::ray::Ray;
use crate::shape::{Hit, Primitive};
use crate::utils;
use crate::vector::Vector3;

use rand::Rng;
use serde::Deserialize;

// Minimum 2 to see one reflection.
const DEFAULT_MAX_DEPTH: u32 = 5;

fn reflect(v: Vector3, n: Vector3) -> Vector3 {
    v - 2.0 * v.dot(n) * n
}

// Transmitted direction through a boundary with refractive indices n1
// (incident side) and n2, or None on total internal reflection.
fn refract(incident: Vector3, n: Vector3, n1: f64, n2: f64) -> Option<Vector3> {
    let cos_i = -n.dot(incident);
    let eta = n1 / n2;
    let sin2_t = eta * eta * (1.0 - cos_i * cos_i);
    if sin2_t > 1.0 {
        return None;
    }
    let cos_t = (1.0 - sin2_t).sqrt();
    Some((incident * eta + n * (eta * cos_i - cos_t)).normalized())
}

// Schlick's approximation of the Fresnel reflectance.
fn schlick(cos_i: f64, n1: f64, n2: f64) -> f64 {
    let r0 = ((n1 - n2) / (n1 + n2)).powi(2);
    r0 + (1.0 - r0) * (1.0 - cos_i).powi(5)
}

#[derive(Deserialize)]
pub struct Light {
    pub position: Point3,
    pub color: RGB,
}

// Owns the scene's primitives and the spatial index over them, and runs
// the recursive Whitted integrator. The index is rebuilt whenever the
// primitive set or a primitive's placement changes; during a render
// everything here is read-only.
pub struct World {
    objects: Vec<Primitive>,
    pub light: Light,
    pub background: RGB,
    max_depth: u32,
    kd_config: KdConfig,
    tree: KdTree,
}

impl World {
    pub fn new(light: Light, background: RGB) -> World {
        World {
            objects: Vec::new(),
            light: light,
            background: background,
            max_depth: DEFAULT_MAX_DEPTH,
            kd_config: KdConfig::default(),
            tree: KdTree::empty(),
        }
    }

    pub fn set_max_depth(&mut self, max_depth: u32) {
        self.max_depth = max_depth;
    }

    pub fn set_kd_config(&mut self, config: KdConfig) {
        self.kd_config = config;
        self.rebuild_tree();
    }

    pub fn objects(&self) -> &[Primitive] {
        &self.objects
    }

    pub fn add(&mut self, primitive: Primitive) {
        self.objects.push(primitive);
        self.rebuild_tree();
    }

    // Adds a batch with a single index rebuild at the end.
    pub fn add_all<I>(&mut self, primitives: I)
    where
        I: IntoIterator<Item = Primitive>,
    {
        self.objects.extend(primitives);
        self.rebuild_tree();
    }

    pub fn rebuild_tree(&mut self) {
        self.tree = KdTree::build(&self.objects, &self.kd_config);
    }

    pub fn transform_object(&mut self, index: usize, m: &Matrix4) -> Result<(), &'static str> {
        self.objects[index].transform(m)?;
        self.rebuild_tree();
        Ok(())
    }

    pub fn transform_all_objects(&mut self, m: &Matrix4) -> Result<(), &'static str> {
        for primitive in &mut self.objects {
            primitive.transform(m)?;
        }
        self.rebuild_tree();
        Ok(())
    }

    pub fn intersect(&self, r: &Ray) -> Option<(usize, Hit)> {
        self.tree.intersect(r, &self.objects)
    }

    // Whitted-style recursive trace. Depth starts at 1 for primary rays;
    // anything past the cap, and any miss, resolves to the background.
    pub fn spawn_ray(&self, r: &Ray, depth: u32) -> RGB {
        if depth > self.max_depth {
            return self.background;
        }
        let (index, hit) = match self.intersect(r) {
            Some(found) => found,
            None => return self.background,
        };
        let primitive = &self.objects[index];

        let p = hit.point;
        let n = hit.normal;
        let view_dir = (r.origin - p).normalized();
        let light_dir = (self.light.position - p).normalized();

        // Shadow factor: an opaque blocker kills direct light, a
        // transparent one attenuates it by its own transmission only.
        let shadow_ray = Ray::spawned(p + n * utils::RAY_EPSILON, light_dir, index);
        let shadow = match self.intersect(&shadow_ray) {
            Some((blocker_index, _)) => {
                let blocker = &self.objects[blocker_index];
                if blocker.kt == 0.0 {
                    0.0
                } else {
                    1.0 - blocker.kt
                }
            }
            None => 1.0,
        };

        // The local term is split so the first bounce keeps its full
        // specular highlight even on transparent surfaces.
        let attenuation = if depth == 1 { 1.0 } else { 1.0 - primitive.kt };

        let mut ad_material = primitive.material.clone();
        ad_material.specular_color = RGB::black();
        let ad_local = primitive.shading().illuminate(
            primitive.color,
            self.light.color,
            n,
            light_dir,
            view_dir,
            &ad_material,
            p,
            hit.uv,
        ) * (shadow * attenuation);

        let mut specular_material = primitive.material.clone();
        specular_material.ambient_color = RGB::black();
        let specular_local = primitive.shading().illuminate(
            RGB::black(),
            self.light.color,
            n,
            light_dir,
            view_dir,
            &specular_material,
            p,
            hit.uv,
        ) * shadow;

        let local = if primitive.kt > 0.0 {
            ad_local * (1.0 - primitive.kt) + specular_local * primitive.kt
        } else {
            ad_local + specular_local
        };

        let mut reflected = RGB::black();
        let mut refracted = RGB::black();
        if primitive.kt > 0.0 {
            // Flip the normal and swap indices when the ray starts inside
            // the medium.
            let index_of_refraction = primitive.material.refractive_index.unwrap_or(1.0);
            let (facing_n, n1, n2) = if n.dot(r.dir) > 0.0 {
                (-n, index_of_refraction, 1.0)
            } else {
                (n, 1.0, index_of_refraction)
            };
            let cos_i = -facing_n.dot(r.dir);

            // A physical reflection ray is always traced; it carries the
            // Fresnel share of the radiance.
            let reflect_ray = Ray::spawned(
                p + facing_n * utils::RAY_EPSILON,
                reflect(r.dir, facing_n),
                index,
            );
            reflected = self.spawn_ray(&reflect_ray, depth + 1);

            match refract(r.dir, facing_n, n1, n2) {
                Some(transmitted) => {
                    let fresnel = schlick(cos_i, n1, n2);
                    let refract_ray =
                        Ray::spawned(p + transmitted * utils::RAY_EPSILON, transmitted, index);
                    refracted = self.spawn_ray(&refract_ray, depth + 1) * (1.0 - fresnel);
                    reflected = reflected * fresnel;
                }
                // Total internal reflection: the reflection keeps full
                // Fresnel weight, nothing is transmitted.
                None => {}
            }
        } else if primitive.kr > 0.0 {
            reflected = self.basic_reflection(p, n, r, depth) * primitive.kr;
        }

        (local + reflected + refracted * primitive.kt).clamped()
    }

    // Mirror reflection, the mainline reflection path.
    fn basic_reflection(&self, p: Point3, n: Vector3, r: &Ray, depth: u32) -> RGB {
        let reflect_ray = Ray::new(p + n * utils::RAY_EPSILON, reflect(r.dir, n));
        self.spawn_ray(&reflect_ray, depth + 1)
    }

    // Stochastic Phong-lobe reflection. Samples directions around the
    // mirror direction, weighted by the lobe, and blends the result over
    // the base radiance by kr. The caller owns the generator so pixels
    // can be seeded deterministically.
    pub fn glossy_reflection<R: Rng>(
        &self,
        index: usize,
        p: Point3,
        n: Vector3,
        r: &Ray,
        depth: u32,
        samples: u32,
        rng: &mut R,
        base: RGB,
    ) -> RGB {
        let primitive = &self.objects[index];
        if primitive.kr <= 0.0 {
            return base;
        }

        let ideal = reflect(r.dir, n).normalized();
        let exponent = primitive.material.shininess;

        let mut accumulated = RGB::black();
        let mut total_weight = 0.0;
        for _ in 0..samples {
            let sampled = sample_phong_lobe(ideal, exponent, rng);
            let sample_ray = Ray::spawned(p + n * utils::RAY_EPSILON, sampled, index);
            let sample_color = self.spawn_ray(&sample_ray, depth + 1);

            let cos_theta = sampled.dot(ideal).max(0.0);
            let weight =
                (exponent + 2.0) / (2.0 * std::f64::consts::PI) * cos_theta.powf(exponent);
            accumulated = accumulated + sample_color * weight;
            total_weight += weight;
        }
        if total_weight > 0.0 {
            accumulated = accumulated * (1.0 / total_weight);
        }

        base * (1.0 - primitive.kr) + accumulated * primitive.kr
    }

    // Walks a shadow ray toward the light, multiplying through the
    // transmission of everything it passes. 0 is fully blocked, 1 fully
    // clear. Unlike the primary shadow rule this composes stacked
    // transparent blockers.
    pub fn shadow_transmittance(&self, mut shadow_ray: Ray, max_dist: f64) -> f64 {
        let mut transmittance = 1.0;
        loop {
            let (index, hit) = match self.intersect(&shadow_ray) {
                Some(found) => found,
                None => break,
            };
            if hit.t > max_dist {
                break;
            }

            transmittance *= self.objects[index].kt;
            if transmittance <= 0.0 {
                return 0.0;
            }

            // March past this surface and keep going.
            shadow_ray.advance(hit.t + utils::RAY_EPSILON);
        }
        transmittance
    }
}

// Samples a direction around `ideal` from a Phong lobe with the given
// exponent.
fn sample_phong_lobe<R: Rng>(ideal: Vector3, exponent: f64, rng: &mut R) -> Vector3 {
    let u: f64 = rng.gen();
    let v: f64 = rng.gen();
    let theta = u.powf(1.0 / (exponent + 1.0)).acos();
    let phi = 2.0 * std::f64::consts::PI * v;

    let x = theta.sin() * phi.cos();
    let y = theta.sin() * phi.sin();
    let z = theta.cos();

    let w = ideal.normalized();
    let up = if w.y.abs() < 0.9 {
        Vector3::new(0.0, 1.0, 0.0)
    } else {
        Vector3::new(1.0, 0.0, 0.0)
    };
    let u_axis = w.cross(up).normalized();
    let v_axis = w.cross(u_axis);

    (u_axis * x + v_axis * y + w * z).normalized()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shading::{Material, Phong};
    use crate::shape::{Cuboid, Geometry, Sphere};

    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use std::rc::Rc;

    fn test_light() -> Light {
        Light {
            position: Point3::new(0.0, 10.0, 0.0),
            color: RGB::white(),
        }
    }

    fn opaque_sphere(x: f64, y: f64, z: f64, radius: f64, color: RGB, kr: f64) -> Primitive {
        Primitive::new(
            Geometry::Sphere(Sphere::new(Point3::new(x, y, z), radius)),
            color,
            kr,
            0.0,
            Material::default(),
            Rc::new(Phong::default()),
        )
        .unwrap()
    }

    fn glass_sphere(x: f64, y: f64, z: f64, radius: f64, kt: f64, eta: f64) -> Primitive {
        let mut material = Material::default();
        material.refractive_index = Some(eta);
        Primitive::new(
            Geometry::Sphere(Sphere::new(Point3::new(x, y, z), radius)),
            RGB::white(),
            0.0,
            kt,
            material,
            Rc::new(Phong::default()),
        )
        .unwrap()
    }

    #[test]
    fn reflect_twice_round_trips() {
        let n = Vector3::new(0.0, 1.0, 0.0);
        let d = Vector3::new(0.3, -0.8, 0.5).normalized();
        let twice = reflect(reflect(d, n), n);
        assert!((twice - d).length() < 1e-9);
    }

    #[test]
    fn schlick_normal_incidence_is_base_reflectance() {
        let f = schlick(1.0, 1.0, 1.5);
        assert!((f - 0.04).abs() < 1e-9);
    }

    #[test]
    fn refract_straight_through_at_normal_incidence() {
        let transmitted =
            refract(Vector3::new(0.0, 0.0, 1.0), Vector3::new(0.0, 0.0, -1.0), 1.0, 1.5).unwrap();
        assert!((transmitted.z - 1.0).abs() < 1e-9);
    }

    #[test]
    fn refract_reports_total_internal_reflection() {
        // Shallow exit from dense glass.
        let incident = Vector3::new(0.9, 0.0, 0.4358898943540673);
        let result = refract(incident, Vector3::new(0.0, 0.0, -1.0), 1.5, 1.0);
        assert!(result.is_none());
    }

    #[test]
    fn empty_world_returns_background() {
        let world = World::new(test_light(), RGB::new(0.5, 0.7, 1.0));
        let r = Ray::new(Point3::origin(), Vector3::new(0.0, 0.0, 1.0));
        let color = world.spawn_ray(&r, 1);
        assert_eq!(color.r, 0.5);
        assert_eq!(color.g, 0.7);
        assert_eq!(color.b, 1.0);
    }

    #[test]
    fn facing_mirrors_terminate_at_depth_cap() {
        let mut world = World::new(test_light(), RGB::black());
        let mirror = |z: f64| {
            Primitive::new(
                Geometry::Cuboid(Cuboid::new(Point3::new(0.0, 0.0, z), 4.0, 4.0, 0.5)),
                RGB::white(),
                1.0,
                0.0,
                Material::default(),
                Rc::new(Phong::default()),
            )
            .unwrap()
        };
        let front = mirror(2.0);
        let back = mirror(-2.0);
        world.add_all(vec![front, back]);

        let r = Ray::new(Point3::origin(), Vector3::new(0.0, 0.0, 1.0));
        let color = world.spawn_ray(&r, 1);
        for channel in [color.r, color.g, color.b].iter() {
            assert!(*channel >= 0.0 && *channel <= 1.0);
        }
    }

    #[test]
    fn occluder_blocks_direct_light() {
        let mut world = World::new(test_light(), RGB::black());
        // Floor top face at y = 0.25, occluder hovering above its center.
        let floor = Primitive::new(
            Geometry::Cuboid(Cuboid::new(Point3::origin(), 10.0, 0.5, 10.0)),
            RGB::new(1.0, 0.0, 0.0),
            0.0,
            0.0,
            Material::default(),
            Rc::new(Phong::default()),
        )
        .unwrap();
        let occluder = Primitive::new(
            Geometry::Cuboid(Cuboid::new(Point3::new(0.0, 5.0, 0.0), 2.0, 0.5, 2.0)),
            RGB::white(),
            0.0,
            0.0,
            Material::default(),
            Rc::new(Phong::default()),
        )
        .unwrap();
        world.add_all(vec![floor, occluder]);

        // Straight down at the umbra: the opaque blocker kills the whole
        // direct term.
        let shadowed = world.spawn_ray(
            &Ray::new(Point3::new(0.0, 2.0, 0.0), Vector3::new(0.0, -1.0, 0.0)),
            1,
        );
        assert_eq!(shadowed.r, 0.0);

        // Outside the umbra the diffuse term contributes.
        let lit = world.spawn_ray(
            &Ray::new(Point3::new(4.0, 2.0, 0.0), Vector3::new(0.0, -1.0, 0.0)),
            1,
        );
        assert!(lit.r > 0.1);
    }

    #[test]
    fn transparent_blocker_attenuates_shadow() {
        let mut world = World::new(test_light(), RGB::black());
        let floor = Primitive::new(
            Geometry::Cuboid(Cuboid::new(Point3::origin(), 10.0, 0.5, 10.0)),
            RGB::new(1.0, 0.0, 0.0),
            0.0,
            0.0,
            Material::default(),
            Rc::new(Phong::default()),
        )
        .unwrap();
        world.add_all(vec![floor, glass_sphere(0.0, 5.0, 0.0, 1.0, 0.8, 1.5)]);

        let color = world.spawn_ray(
            &Ray::new(Point3::new(0.0, 2.0, 0.0), Vector3::new(0.0, -1.0, 0.0)),
            1,
        );
        // shadow factor 1 - kt = 0.2 leaves some diffuse light.
        assert!(color.r > 0.02);
    }

    #[test]
    fn shadow_transmittance_composes_blockers() {
        let mut world = World::new(test_light(), RGB::black());
        world.add_all(vec![
            glass_sphere(0.0, 3.0, 0.0, 0.5, 0.9, 1.5),
            glass_sphere(0.0, 6.0, 0.0, 0.5, 0.5, 1.5),
        ]);

        let shadow_ray = Ray::new(Point3::origin(), Vector3::new(0.0, 1.0, 0.0));
        let transmittance = world.shadow_transmittance(shadow_ray, 100.0);
        assert!((transmittance - 0.45).abs() < 1e-9);

        let mut world = World::new(test_light(), RGB::black());
        world.add_all(vec![
            glass_sphere(0.0, 3.0, 0.0, 0.5, 0.9, 1.5),
            opaque_sphere(0.0, 6.0, 0.0, 0.5, RGB::white(), 0.0),
        ]);
        let shadow_ray = Ray::new(Point3::origin(), Vector3::new(0.0, 1.0, 0.0));
        assert_eq!(world.shadow_transmittance(shadow_ray, 100.0), 0.0);
    }

    #[test]
    fn glossy_reflection_is_deterministic_per_seed() {
        let mut world = World::new(test_light(), RGB::new(0.2, 0.4, 0.6));
        world.add_all(vec![
            opaque_sphere(0.0, 0.0, 0.0, 1.0, RGB::white(), 0.5),
            opaque_sphere(0.0, 0.0, -6.0, 1.0, RGB::new(1.0, 0.0, 0.0), 0.0),
        ]);

        let r = Ray::new(Point3::new(0.0, 0.0, -4.0), Vector3::new(0.0, 0.0, 1.0));
        let (index, hit) = world.intersect(&r).unwrap();

        let mut first_rng = SmallRng::seed_from_u64(99);
        let first = world.glossy_reflection(
            index,
            hit.point,
            hit.normal,
            &r,
            1,
            5,
            &mut first_rng,
            RGB::black(),
        );
        let mut second_rng = SmallRng::seed_from_u64(99);
        let second = world.glossy_reflection(
            index,
            hit.point,
            hit.normal,
            &r,
            1,
            5,
            &mut second_rng,
            RGB::black(),
        );
        assert_eq!(first.r, second.r);
        assert_eq!(first.g, second.g);
        assert_eq!(first.b, second.b);
    }
}

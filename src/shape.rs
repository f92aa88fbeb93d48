use crate::aabb::Aabb;
use crate::color::RGB;
use crate::matrix::Matrix4;
use crate::point::Point3;
use crate::ray::Ray;
use crate::shading::{Material, ShadingModel};
use crate::utils;
use crate::vector::Vector3;

use std::f64::consts::PI;
use std::rc::Rc;

// Nudge applied to surface coordinates so texture lookups never land
// exactly on a wrap seam.
const SEAM_EPSILON: f64 = 1e-5;

pub struct Hit {
    pub t: f64,
    pub point: Point3,
    pub normal: Vector3,
    pub uv: (f64, f64),
}

// The closed set of shapes. Dispatching over an enum keeps the per-ray
// intersection calls monomorphic.
pub enum Geometry {
    Triangle(Triangle),
    Sphere(Sphere),
    Cuboid(Cuboid),
    Cylinder(Cylinder),
    Torus(Torus),
}

impl Geometry {
    pub fn intersect(&self, r: &Ray) -> Option<Hit> {
        match self {
            Geometry::Triangle(t) => t.intersect(r),
            Geometry::Sphere(s) => s.intersect(r),
            Geometry::Cuboid(c) => c.intersect(r),
            Geometry::Cylinder(c) => c.intersect(r),
            Geometry::Torus(t) => t.intersect(r),
        }
    }

    pub fn bounds(&self) -> Aabb {
        match self {
            Geometry::Triangle(t) => t.bounds(),
            Geometry::Sphere(s) => s.bounds(),
            Geometry::Cuboid(c) => c.bounds(),
            Geometry::Cylinder(c) => c.bounds(),
            Geometry::Torus(t) => t.bounds(),
        }
    }

    pub fn transform(&mut self, m: &Matrix4) -> Result<(), &'static str> {
        match self {
            Geometry::Triangle(t) => {
                let normal_matrix = m.inverse()?.transpose();
                t.transform(m, &normal_matrix);
            }
            Geometry::Sphere(s) => s.center = m * s.center,
            Geometry::Cuboid(c) => {
                let normal_matrix = m.inverse()?.transpose();
                c.center = m * c.center;
                for triangle in &mut c.triangles {
                    triangle.transform(m, &normal_matrix);
                }
            }
            Geometry::Cylinder(c) => c.center = m * c.center,
            Geometry::Torus(t) => t.center = m * t.center,
        }
        Ok(())
    }
}

pub struct Triangle {
    vertices: [Point3; 3],
    uvs: [(f64, f64); 3],
    // Face normal, flat shaded.
    normal: Vector3,
}

impl Triangle {
    pub fn new(vertices: [Point3; 3], uvs: Option<[(f64, f64); 3]>) -> Triangle {
        let normal = (vertices[1] - vertices[0])
            .cross(vertices[2] - vertices[0])
            .normalized();
        Triangle::with_normal(vertices, normal, uvs)
    }

    pub fn with_normal(
        vertices: [Point3; 3],
        normal: Vector3,
        uvs: Option<[(f64, f64); 3]>,
    ) -> Triangle {
        Triangle {
            vertices: vertices,
            uvs: uvs.unwrap_or([(0.0, 0.0); 3]),
            normal: normal,
        }
    }

    // Uses Moller-Trumbore ray-triangle intersection.
    // https://en.wikipedia.org/wiki/M%C3%B6ller%E2%80%93Trumbore_intersection_algorithm
    fn intersect(&self, r: &Ray) -> Option<Hit> {
        let vertex0 = self.vertices[0];
        let vertex1 = self.vertices[1];
        let vertex2 = self.vertices[2];

        let edge_1 = vertex1 - vertex0;
        let edge_2 = vertex2 - vertex0;
        let p_vec = r.dir.cross(edge_2);
        let determinant = edge_1.dot(p_vec);

        if determinant.abs() < utils::PARALLEL_EPSILON {
            return None; // Indicates parallel ray and triangle
        }

        let inverse_determinant = 1.0 / determinant;
        let t_vec = r.origin - vertex0;
        let beta = t_vec.dot(p_vec) * inverse_determinant;
        if beta < 0.0 || beta > 1.0 {
            return None;
        }

        let q_vec = t_vec.cross(edge_1);
        let gamma = r.dir.dot(q_vec) * inverse_determinant;
        if gamma < 0.0 || beta + gamma > 1.0 {
            return None;
        }

        let t_hit = edge_2.dot(q_vec) * inverse_determinant;
        if t_hit <= utils::PARALLEL_EPSILON {
            return None;
        }

        let alpha = 1.0 - beta - gamma;
        let (u0, v0) = self.uvs[0];
        let (u1, v1) = self.uvs[1];
        let (u2, v2) = self.uvs[2];
        Some(Hit {
            t: t_hit,
            point: r.point_at(t_hit),
            normal: self.normal,
            uv: (
                alpha * u0 + beta * u1 + gamma * u2,
                alpha * v0 + beta * v1 + gamma * v2,
            ),
        })
    }

    fn bounds(&self) -> Aabb {
        Aabb::from_points(self.vertices.iter().copied())
    }

    fn transform(&mut self, m: &Matrix4, normal_matrix: &Matrix4) {
        for vertex in &mut self.vertices {
            *vertex = m * *vertex;
        }
        self.normal = (normal_matrix * self.normal).normalized();
    }
}

pub struct Sphere {
    center: Point3,
    radius: f64,
}

impl Sphere {
    pub fn new(center: Point3, radius: f64) -> Sphere {
        Sphere {
            center: center,
            radius: radius,
        }
    }

    fn intersect(&self, r: &Ray) -> Option<Hit> {
        let oc = r.origin - self.center;
        let a = r.dir.dot(r.dir);
        let b = 2.0 * oc.dot(r.dir);
        let c = oc.dot(oc) - self.radius * self.radius;
        let discriminant = b * b - 4.0 * a * c;
        if discriminant < 0.0 {
            return None;
        }

        let sqrt_disc = discriminant.sqrt();
        let t1 = (-b - sqrt_disc) / (2.0 * a);
        let t2 = (-b + sqrt_disc) / (2.0 * a);
        let t_hit = if t1 > utils::RAY_EPSILON {
            t1
        } else if t2 > utils::RAY_EPSILON {
            t2
        } else {
            return None;
        };

        let point = r.point_at(t_hit);
        let normal = (point - self.center).normalized();

        // Spherical surface coordinates, nudged off the wrap seam.
        let theta = normal.z.atan2(normal.x);
        let phi = utils::clamp(normal.y, -1.0, 1.0).acos();
        let mut u = ((theta + PI) / (2.0 * PI)).rem_euclid(1.0);
        let v = phi / PI;
        if u < SEAM_EPSILON {
            u += SEAM_EPSILON;
        } else if u > 1.0 - SEAM_EPSILON {
            u -= SEAM_EPSILON;
        }

        Some(Hit {
            t: t_hit,
            point: point,
            normal: normal,
            uv: (u, v),
        })
    }

    fn bounds(&self) -> Aabb {
        let extent = Vector3::new(self.radius, self.radius, self.radius);
        Aabb::new(self.center - extent, self.center + extent)
    }
}

// An axis-aligned box realized as twelve triangles with per-face planar
// surface coordinates. The owning primitive reports itself as the hit
// object, so self-hit suppression works at the box level rather than per
// face.
pub struct Cuboid {
    center: Point3,
    triangles: Vec<Triangle>,
}

impl Cuboid {
    pub fn new(center: Point3, width: f64, height: f64, depth: f64) -> Cuboid {
        let half_w = width / 2.0;
        let half_h = height / 2.0;
        let half_d = depth / 2.0;

        let corners = [
            Point3::new(center.x - half_w, center.y - half_h, center.z - half_d),
            Point3::new(center.x + half_w, center.y - half_h, center.z - half_d),
            Point3::new(center.x + half_w, center.y + half_h, center.z - half_d),
            Point3::new(center.x - half_w, center.y + half_h, center.z - half_d),
            Point3::new(center.x - half_w, center.y - half_h, center.z + half_d),
            Point3::new(center.x + half_w, center.y - half_h, center.z + half_d),
            Point3::new(center.x + half_w, center.y + half_h, center.z + half_d),
            Point3::new(center.x - half_w, center.y + half_h, center.z + half_d),
        ];

        // Planar uv per projection axis, one entry per corner.
        let mut uv_xy = [(0.0, 0.0); 8];
        let mut uv_yz = [(0.0, 0.0); 8];
        let mut uv_xz = [(0.0, 0.0); 8];
        for (i, p) in corners.iter().enumerate() {
            let local = *p - center;
            uv_xy[i] = (local.x / width + 0.5, local.y / height + 0.5);
            uv_yz[i] = (local.y / height + 0.5, local.z / depth + 0.5);
            uv_xz[i] = (local.x / width + 0.5, local.z / depth + 0.5);
        }

        let faces: [([usize; 4], Vector3, &[(f64, f64); 8]); 6] = [
            ([0, 1, 2, 3], Vector3::new(0.0, 0.0, -1.0), &uv_xy), // Front
            ([5, 4, 7, 6], Vector3::new(0.0, 0.0, 1.0), &uv_xy),  // Back
            ([4, 0, 3, 7], Vector3::new(-1.0, 0.0, 0.0), &uv_yz), // Left
            ([1, 5, 6, 2], Vector3::new(1.0, 0.0, 0.0), &uv_yz),  // Right
            ([3, 2, 6, 7], Vector3::new(0.0, 1.0, 0.0), &uv_xz),  // Top
            ([4, 5, 1, 0], Vector3::new(0.0, -1.0, 0.0), &uv_xz), // Bottom
        ];

        let mut triangles = Vec::with_capacity(12);
        for (indices, normal, uvs) in faces.iter() {
            let [i0, i1, i2, i3] = *indices;
            triangles.push(Triangle::with_normal(
                [corners[i0], corners[i1], corners[i2]],
                *normal,
                Some([uvs[i0], uvs[i1], uvs[i2]]),
            ));
            triangles.push(Triangle::with_normal(
                [corners[i0], corners[i2], corners[i3]],
                *normal,
                Some([uvs[i0], uvs[i2], uvs[i3]]),
            ));
        }

        Cuboid {
            center: center,
            triangles: triangles,
        }
    }

    fn intersect(&self, r: &Ray) -> Option<Hit> {
        let mut closest: Option<Hit> = None;
        for triangle in &self.triangles {
            if let Some(hit) = triangle.intersect(r) {
                if closest.as_ref().map_or(true, |c| hit.t < c.t) {
                    closest = Some(hit);
                }
            }
        }
        closest
    }

    fn bounds(&self) -> Aabb {
        Aabb::from_points(
            self.triangles
                .iter()
                .flat_map(|t| t.vertices.iter().copied()),
        )
    }
}

// A finite cylinder with flat caps. The local frame is Y-axis aligned and
// rotated a quarter turn about X into world space.
pub struct Cylinder {
    center: Point3,
    radius: f64,
    half_height: f64,
    rotation: Matrix4,
    inverse_rotation: Matrix4,
}

impl Cylinder {
    pub fn new(center: Point3, radius: f64, height: f64) -> Cylinder {
        let angle = std::f64::consts::FRAC_PI_2;
        Cylinder {
            center: center,
            radius: radius,
            half_height: height / 2.0,
            rotation: Matrix4::new_rotation_x(angle),
            inverse_rotation: Matrix4::new_rotation_x(-angle),
        }
    }

    fn intersect(&self, r: &Ray) -> Option<Hit> {
        let o = &self.inverse_rotation * (r.origin - self.center);
        let d = &self.inverse_rotation * r.dir;

        // Side surface, Y-axis aligned in local space.
        let a = d.x * d.x + d.z * d.z;
        let b = 2.0 * (o.x * d.x + o.z * d.z);
        let c = o.x * o.x + o.z * o.z - self.radius * self.radius;

        let mut t_side: Option<f64> = None;
        if a != 0.0 {
            let discriminant = b * b - 4.0 * a * c;
            if discriminant >= 0.0 {
                let sqrt_disc = discriminant.sqrt();
                for &t in [(-b - sqrt_disc) / (2.0 * a), (-b + sqrt_disc) / (2.0 * a)].iter() {
                    if t <= utils::RAY_EPSILON {
                        continue;
                    }
                    let y = o.y + d.y * t;
                    if -self.half_height <= y && y <= self.half_height {
                        if t_side.map_or(true, |current| t < current) {
                            t_side = Some(t);
                        }
                    }
                }
            }
        }

        // Flat caps at y = +-half_height.
        let mut t_cap: Option<f64> = None;
        if d.y.abs() > utils::PARALLEL_EPSILON {
            for &cap_sign in [-1.0, 1.0].iter() {
                let t = (cap_sign * self.half_height - o.y) / d.y;
                if t > utils::RAY_EPSILON {
                    let x = o.x + d.x * t;
                    let z = o.z + d.z * t;
                    if x * x + z * z <= self.radius * self.radius {
                        if t_cap.map_or(true, |current| t < current) {
                            t_cap = Some(t);
                        }
                    }
                }
            }
        }

        let (t_hit, hit_cap) = match (t_side, t_cap) {
            (Some(side), Some(cap)) => {
                if cap < side {
                    (cap, true)
                } else {
                    (side, false)
                }
            }
            (Some(side), None) => (side, false),
            (None, Some(cap)) => (cap, true),
            (None, None) => return None,
        };

        let hit_local = o + d * t_hit;
        let n_local = if hit_cap {
            Vector3::new(0.0, if hit_local.y > 0.0 { 1.0 } else { -1.0 }, 0.0)
        } else {
            Vector3::new(hit_local.x, 0.0, hit_local.z).normalized()
        };

        let uv = if hit_cap {
            (
                hit_local.x / (2.0 * self.radius) + 0.5,
                hit_local.z / (2.0 * self.radius) + 0.5,
            )
        } else {
            (
                (hit_local.z.atan2(hit_local.x) + PI) / (2.0 * PI),
                (hit_local.y + self.half_height) / (2.0 * self.half_height),
            )
        };

        Some(Hit {
            t: t_hit,
            point: self.center + (&self.rotation * hit_local),
            normal: (&self.rotation * n_local).normalized(),
            uv: uv,
        })
    }

    // Rotated-corner bounds: carry the eight local box corners into world
    // space and reduce.
    fn bounds(&self) -> Aabb {
        let r = self.radius;
        let h = self.half_height;
        let mut corners = [Point3::origin(); 8];
        let mut i = 0;
        for &x in [-r, r].iter() {
            for &y in [-h, h].iter() {
                for &z in [-r, r].iter() {
                    corners[i] = self.center + (&self.rotation * Vector3::new(x, y, z));
                    i += 1;
                }
            }
        }
        Aabb::from_points(corners.iter().copied())
    }
}

// Torus lying in the local xz-plane around its center.
pub struct Torus {
    center: Point3,
    major_radius: f64,
    minor_radius: f64,
}

impl Torus {
    pub fn new(center: Point3, major_radius: f64, minor_radius: f64) -> Torus {
        Torus {
            center: center,
            major_radius: major_radius,
            minor_radius: minor_radius,
        }
    }

    fn intersect(&self, r: &Ray) -> Option<Hit> {
        let o = r.origin - self.center;
        let d = r.dir;
        let big_r = self.major_radius;
        let small_r = self.minor_radius;

        // The implicit form (|P|^2 + R^2 - r^2)^2 = 4R^2 (Px^2 + Pz^2)
        // expands to a quartic in t.
        let g = d.dot(d);
        let h = 2.0 * o.dot(d);
        let i = o.dot(o) + big_r * big_r - small_r * small_r;
        let four_r2 = 4.0 * big_r * big_r;

        let (roots, count) = utils::solve_quartic(
            g * g,
            2.0 * g * h,
            2.0 * g * i + h * h - four_r2 * (d.x * d.x + d.z * d.z),
            2.0 * h * i - 2.0 * four_r2 * (d.x * o.x + d.z * o.z),
            i * i - four_r2 * (o.x * o.x + o.z * o.z),
        );

        let mut t_hit = std::f64::MAX;
        for &t in roots.iter().take(count) {
            if t > 1e-5 && t < t_hit {
                t_hit = t;
            }
        }
        if t_hit == std::f64::MAX {
            return None;
        }

        let point = r.point_at(t_hit);
        let local = point - self.center;

        // Gradient of the implicit form.
        let sum2 = local.dot(local) + big_r * big_r - small_r * small_r;
        let normal = Vector3::new(
            4.0 * local.x * sum2 - 2.0 * four_r2 * local.x,
            4.0 * local.y * sum2,
            4.0 * local.z * sum2 - 2.0 * four_r2 * local.z,
        )
        .normalized();

        // u runs around the big circle, v around the tube cross-section.
        let theta = local.z.atan2(local.x);
        let u = ((theta + PI) / (2.0 * PI)).rem_euclid(1.0);
        let tube_x = local.x - big_r * theta.cos();
        let tube_z = local.z - big_r * theta.sin();
        let phi = local.y.atan2(tube_x.hypot(tube_z));
        let v = phi / (2.0 * PI) + 0.5;

        Some(Hit {
            t: t_hit,
            point: point,
            normal: normal,
            uv: (
                utils::clamp(u, SEAM_EPSILON, 1.0 - SEAM_EPSILON),
                utils::clamp(v, SEAM_EPSILON, 1.0 - SEAM_EPSILON),
            ),
        })
    }

    fn bounds(&self) -> Aabb {
        let extent = Vector3::new(
            self.major_radius + self.minor_radius,
            self.minor_radius,
            self.major_radius + self.minor_radius,
        );
        Aabb::new(self.center - extent, self.center + extent)
    }
}

// A shape plus everything the integrator needs to shade it. Bounds are
// cached and recomputed whenever the geometry moves.
pub struct Primitive {
    geometry: Geometry,
    pub color: RGB,
    pub kr: f64,
    pub kt: f64,
    pub material: Material,
    shading: Rc<dyn ShadingModel>,
    bounds: Aabb,
}

impl Primitive {
    pub fn new(
        geometry: Geometry,
        color: RGB,
        kr: f64,
        kt: f64,
        material: Material,
        shading: Rc<dyn ShadingModel>,
    ) -> Result<Primitive, String> {
        if kr < 0.0 || kr > 1.0 {
            return Err(format!("Reflection coefficient {} is outside [0, 1]", kr));
        }
        if kt < 0.0 || kt > 1.0 {
            return Err(format!("Transmission coefficient {} is outside [0, 1]", kt));
        }
        if kt > 0.0 && material.refractive_index.is_none() {
            return Err(String::from(
                "A transmissive primitive requires a refractive index",
            ));
        }
        let bounds = geometry.bounds();
        Ok(Primitive {
            geometry: geometry,
            color: color,
            kr: kr,
            kt: kt,
            material: material,
            shading: shading,
            bounds: bounds,
        })
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn shading(&self) -> &dyn ShadingModel {
        &*self.shading
    }

    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    pub fn intersect(&self, r: &Ray) -> Option<Hit> {
        self.geometry.intersect(r)
    }

    pub fn transform(&mut self, m: &Matrix4) -> Result<(), &'static str> {
        self.geometry.transform(m)?;
        self.bounds = self.geometry.bounds();
        Ok(())
    }
}

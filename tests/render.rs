use std::rc::Rc;

use whitted_raytracer::camera::{Camera, Sampling};
use whitted_raytracer::color::RGB;
use whitted_raytracer::point::Point3;
use whitted_raytracer::shading::{Material, Phong};
use whitted_raytracer::shape::{Cuboid, Geometry, Primitive, Sphere};
use whitted_raytracer::vector::Vector3;
use whitted_raytracer::world::{Light, World};

const BACKGROUND: RGB = RGB {
    r: 0.5,
    g: 0.7,
    b: 1.0,
};

fn light_at(x: f64, y: f64, z: f64) -> Light {
    Light {
        position: Point3::new(x, y, z),
        color: RGB::white(),
    }
}

fn sphere(
    center: Point3,
    radius: f64,
    color: RGB,
    kr: f64,
    kt: f64,
    refractive_index: Option<f64>,
) -> Primitive {
    let mut material = Material::default();
    material.refractive_index = refractive_index;
    Primitive::new(
        Geometry::Sphere(Sphere::new(center, radius)),
        color,
        kr,
        kt,
        material,
        Rc::new(Phong::default()),
    )
    .unwrap()
}

fn cuboid(center: Point3, width: f64, height: f64, depth: f64, color: RGB) -> Primitive {
    Primitive::new(
        Geometry::Cuboid(Cuboid::new(center, width, height, depth)),
        color,
        0.0,
        0.0,
        Material::default(),
        Rc::new(Phong::default()),
    )
    .unwrap()
}

fn camera_11x11(position: Point3, sampling: Sampling) -> Camera {
    Camera::new(
        position,
        Point3::origin(),
        Vector3::new(0.0, 1.0, 0.0),
        60.0,
        11,
        11,
        sampling,
    )
}

#[test]
fn empty_world_renders_background_everywhere() {
    let world = World::new(light_at(0.0, 0.0, -5.0), BACKGROUND);
    let camera = camera_11x11(Point3::new(0.0, 0.0, -3.0), Sampling::Normal);
    let film = camera.render(&world);
    for y in 0..film.height() {
        for x in 0..film.width() {
            let pixel = film.pixel(x, y);
            assert_eq!(pixel.r, BACKGROUND.r);
            assert_eq!(pixel.g, BACKGROUND.g);
            assert_eq!(pixel.b, BACKGROUND.b);
        }
    }
}

#[test]
fn single_sphere_hits_center_misses_corners() {
    let mut world = World::new(light_at(0.0, 0.0, -5.0), BACKGROUND);
    world.add(sphere(
        Point3::origin(),
        1.0,
        RGB::new(1.0, 0.0, 0.0),
        0.0,
        0.0,
        None,
    ));
    let camera = camera_11x11(Point3::new(0.0, 0.0, -3.0), Sampling::Normal);
    let film = camera.render(&world);

    // The center pixel shades the sphere; its ambient share alone keeps
    // the red channel strictly positive.
    let center = film.pixel(5, 5);
    assert!(center.r > 0.0);
    assert!(center.r != BACKGROUND.r || center.g != BACKGROUND.g);

    // Corner rays clear the sphere and return the background untouched.
    for &(x, y) in [(0, 0), (10, 0), (0, 10), (10, 10)].iter() {
        let corner = film.pixel(x, y);
        assert_eq!(corner.r, BACKGROUND.r);
        assert_eq!(corner.g, BACKGROUND.g);
        assert_eq!(corner.b, BACKGROUND.b);
    }
}

#[test]
fn supersampling_averages_but_keeps_clear_corners() {
    let mut world = World::new(light_at(0.0, 0.0, -5.0), BACKGROUND);
    world.add(sphere(
        Point3::origin(),
        1.0,
        RGB::new(1.0, 0.0, 0.0),
        0.0,
        0.0,
        None,
    ));
    let camera = camera_11x11(Point3::new(0.0, 0.0, -3.0), Sampling::Super2x2);
    let film = camera.render(&world);

    assert!(film.pixel(5, 5).r > 0.0);
    let corner = film.pixel(0, 0);
    assert_eq!(corner.r, BACKGROUND.r);
    assert_eq!(corner.b, BACKGROUND.b);
}

#[test]
fn mirror_sphere_sees_red_sphere_at_depth_two() {
    let mut world = World::new(light_at(0.0, 5.0, -5.0), RGB::black());
    world.add_all(vec![
        // Mirror in front of the camera.
        sphere(Point3::origin(), 1.0, RGB::white(), 1.0, 0.0, None),
        // Red sphere behind the camera, visible only in the mirror.
        sphere(
            Point3::new(0.0, 0.0, -10.0),
            1.0,
            RGB::new(1.0, 0.0, 0.0),
            0.0,
            0.0,
            None,
        ),
    ]);
    let camera = camera_11x11(Point3::new(0.0, 0.0, -4.0), Sampling::Normal);
    let center = camera.render(&world).pixel(5, 5);

    assert!(center.r > 0.0);
    assert!(center.g <= center.r);
    assert!(center.b <= center.r);
}

#[test]
fn glass_sphere_transmits_the_blue_backdrop() {
    let mut world = World::new(light_at(0.0, 5.0, -5.0), RGB::black());
    world.add_all(vec![
        sphere(Point3::origin(), 1.0, RGB::white(), 0.0, 0.9, Some(1.5)),
        // Blue wall behind the sphere.
        cuboid(
            Point3::new(0.0, 0.0, 6.0),
            20.0,
            20.0,
            0.5,
            RGB::new(0.0, 0.0, 1.0),
        ),
    ]);
    let camera = camera_11x11(Point3::new(0.0, 0.0, -4.0), Sampling::Normal);
    let center = camera.render(&world).pixel(5, 5);

    // The transmitted blue dominates whatever the thin Fresnel
    // reflection contributes.
    assert!(center.b > 0.0);
    assert!(center.b > center.r);
}

#[test]
fn occluder_casts_a_hard_shadow() {
    let mut world = World::new(light_at(0.0, 10.0, 0.0), RGB::black());
    world.add_all(vec![
        // Red floor with its top face at y = 0.25.
        cuboid(Point3::origin(), 10.0, 0.5, 10.0, RGB::new(1.0, 0.0, 0.0)),
        // Opaque slab hovering above the floor's center.
        cuboid(
            Point3::new(0.0, 5.0, 0.0),
            2.0,
            0.5,
            2.0,
            RGB::white(),
        ),
    ]);

    let down_camera = |x: f64| {
        Camera::new(
            Point3::new(x, 2.0, 0.0),
            Point3::new(x, 0.0, 0.0),
            Vector3::new(0.0, 0.0, 1.0),
            60.0,
            1,
            1,
            Sampling::Normal,
        )
    };

    let shadowed = down_camera(0.0).render(&world).pixel(0, 0);
    let lit = down_camera(4.0).render(&world).pixel(0, 0);

    // Inside the umbra the opaque blocker removes the direct term
    // entirely; outside it the diffuse term shows.
    assert_eq!(shadowed.r, 0.0);
    assert!(lit.r > 0.1);
}

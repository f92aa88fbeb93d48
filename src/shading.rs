use crate::color::RGB;
use crate::point::Point3;
use crate::vector::Vector3;

use crate::utils;

use image::{DynamicImage, GenericImageView};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use std::convert::TryFrom;

// Fixed material description shared by every primitive. Unknown keys in a
// scene spec are rejected at load time rather than silently ignored.
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Material {
    #[serde(default = "default_ambient_color")]
    pub ambient_color: RGB,
    #[serde(default = "default_specular_color")]
    pub specular_color: RGB,
    #[serde(default = "default_shininess")]
    pub shininess: f64,
    #[serde(default)]
    pub refractive_index: Option<f64>,
}

fn default_ambient_color() -> RGB {
    RGB::new(0.1, 0.1, 0.1)
}
fn default_specular_color() -> RGB {
    RGB::white()
}
fn default_shininess() -> f64 {
    50.0
}

impl Default for Material {
    fn default() -> Material {
        Material {
            ambient_color: default_ambient_color(),
            specular_color: default_specular_color(),
            shininess: default_shininess(),
            refractive_index: None,
        }
    }
}

// The boundary between the integrator and concrete illumination models.
// Implementations receive everything about the shading point as pure
// inputs and return radiance; channels may exceed 1, clamping is the
// integrator's job.
#[typetag::deserialize]
pub trait ShadingModel {
    fn illuminate(
        &self,
        base_color: RGB,
        light_color: RGB,
        normal: Vector3,
        light_dir: Vector3,
        view_dir: Vector3,
        material: &Material,
        point: Point3,
        uv: (f64, f64),
    ) -> RGB;
}

#[derive(Deserialize)]
pub struct Phong {
    #[serde(default = "default_ambient_factor")]
    ambient: f64,
    #[serde(default = "default_diffuse_factor")]
    diffuse: f64,
    #[serde(default = "default_specular_factor")]
    specular: f64,
    #[serde(default = "default_specular_exponent")]
    specular_exponent: f64,
}

fn default_ambient_factor() -> f64 {
    0.2
}
fn default_diffuse_factor() -> f64 {
    0.8
}
fn default_specular_factor() -> f64 {
    0.1
}
fn default_specular_exponent() -> f64 {
    50.0
}

impl Default for Phong {
    fn default() -> Phong {
        Phong {
            ambient: default_ambient_factor(),
            diffuse: default_diffuse_factor(),
            specular: default_specular_factor(),
            specular_exponent: default_specular_exponent(),
        }
    }
}

#[typetag::deserialize]
impl ShadingModel for Phong {
    fn illuminate(
        &self,
        base_color: RGB,
        light_color: RGB,
        normal: Vector3,
        light_dir: Vector3,
        view_dir: Vector3,
        material: &Material,
        _point: Point3,
        _uv: (f64, f64),
    ) -> RGB {
        let light_dir = light_dir.normalized();

        let ambient = base_color * material.ambient_color * self.ambient;

        let diffuse_intensity = normal.dot(light_dir).max(0.0);
        let diffuse = base_color * light_color * (diffuse_intensity * self.diffuse);

        let reflection = normal * (2.0 * normal.dot(light_dir)) - light_dir;
        let specular_intensity = reflection
            .dot(view_dir)
            .max(0.0)
            .powf(self.specular_exponent);
        let specular = material.specular_color * light_color * (specular_intensity * self.specular);

        ambient + diffuse + specular
    }
}

// Same terms as Phong but with the halfway-vector specular lobe.
#[derive(Deserialize)]
pub struct BlinnPhong {
    #[serde(default = "default_ambient_factor")]
    ambient: f64,
    #[serde(default = "default_diffuse_factor")]
    diffuse: f64,
    #[serde(default = "default_specular_factor")]
    specular: f64,
    #[serde(default = "default_specular_exponent")]
    specular_exponent: f64,
}

#[typetag::deserialize]
impl ShadingModel for BlinnPhong {
    fn illuminate(
        &self,
        base_color: RGB,
        light_color: RGB,
        normal: Vector3,
        light_dir: Vector3,
        view_dir: Vector3,
        material: &Material,
        _point: Point3,
        _uv: (f64, f64),
    ) -> RGB {
        let light_dir = light_dir.normalized();

        let ambient = base_color * material.ambient_color * self.ambient;

        let diffuse_intensity = normal.dot(light_dir).max(0.0);
        let diffuse = base_color * light_color * (diffuse_intensity * self.diffuse);

        let halfway = (light_dir + view_dir).normalized();
        let specular_intensity = normal.dot(halfway).max(0.0).powf(self.specular_exponent);
        let specular = material.specular_color * light_color * (specular_intensity * self.specular);

        ambient + diffuse + specular
    }
}

// Procedural models are deliberately unlit: they paint the surface
// directly from the hit position.
#[derive(Deserialize)]
pub struct Checkerboard {
    #[serde(default = "default_check_color1")]
    color1: RGB,
    #[serde(default = "default_check_color2")]
    color2: RGB,
    #[serde(default = "default_check_size")]
    check_size: f64,
}

fn default_check_color1() -> RGB {
    RGB::new(1.0, 0.0, 0.0)
}
fn default_check_color2() -> RGB {
    RGB::new(1.0, 1.0, 0.0)
}
fn default_check_size() -> f64 {
    0.9
}

#[typetag::deserialize]
impl ShadingModel for Checkerboard {
    fn illuminate(
        &self,
        _base_color: RGB,
        _light_color: RGB,
        _normal: Vector3,
        _light_dir: Vector3,
        _view_dir: Vector3,
        _material: &Material,
        point: Point3,
        _uv: (f64, f64),
    ) -> RGB {
        let u_scaled = (point.x * self.check_size).rem_euclid(1.0);
        let v_scaled = (point.y * self.check_size).rem_euclid(1.0);
        if (u_scaled < 0.5) ^ (v_scaled < 0.5) {
            self.color1
        } else {
            self.color2
        }
    }
}

#[derive(Deserialize)]
pub struct Brick {
    #[serde(default = "default_brick_color1")]
    brick_color1: RGB,
    #[serde(default = "default_brick_color2")]
    brick_color2: RGB,
    #[serde(default = "default_mortar_color")]
    mortar_color: RGB,
    #[serde(default = "default_brick_width")]
    brick_width: f64,
    #[serde(default = "default_brick_height")]
    brick_height: f64,
    #[serde(default = "default_mortar_thickness")]
    mortar_thickness: f64,
}

fn default_brick_color1() -> RGB {
    RGB::new(0.6, 0.1, 0.1)
}
fn default_brick_color2() -> RGB {
    RGB::new(0.5, 0.05, 0.05)
}
fn default_mortar_color() -> RGB {
    RGB::new(0.85, 0.85, 0.85)
}
fn default_brick_width() -> f64 {
    1.0
}
fn default_brick_height() -> f64 {
    0.5
}
fn default_mortar_thickness() -> f64 {
    0.05
}

#[typetag::deserialize]
impl ShadingModel for Brick {
    fn illuminate(
        &self,
        _base_color: RGB,
        _light_color: RGB,
        _normal: Vector3,
        _light_dir: Vector3,
        _view_dir: Vector3,
        _material: &Material,
        point: Point3,
        _uv: (f64, f64),
    ) -> RGB {
        let u = point.x;
        let v = point.y;

        let row = (v / self.brick_height).floor() as i64;
        // Every other course is offset by half a brick.
        let row_offset = if row.rem_euclid(2) != 0 {
            self.brick_width / 2.0
        } else {
            0.0
        };
        let col = ((u + row_offset) / self.brick_width).floor() as i64;

        let u_mod = (u + row_offset).rem_euclid(self.brick_width);
        let v_mod = v.rem_euclid(self.brick_height);
        if u_mod < self.mortar_thickness || v_mod < self.mortar_thickness {
            return self.mortar_color;
        }

        if (row + col).rem_euclid(2) == 0 {
            self.brick_color1
        } else {
            self.brick_color2
        }
    }
}

// Escape-time coloring of the Mandelbrot set, mapped over the hit
// position. Points that never escape stay black.
#[derive(Deserialize)]
pub struct Mandelbrot {
    #[serde(default = "default_mandelbrot_zoom")]
    zoom: f64,
    #[serde(default = "default_mandelbrot_center_x")]
    center_x: f64,
    #[serde(default = "default_mandelbrot_center_y")]
    center_y: f64,
    #[serde(default = "default_mandelbrot_max_iter")]
    max_iter: u32,
}

fn default_mandelbrot_zoom() -> f64 {
    7.0
}
fn default_mandelbrot_center_x() -> f64 {
    -0.75
}
fn default_mandelbrot_center_y() -> f64 {
    0.0
}
fn default_mandelbrot_max_iter() -> u32 {
    300
}

impl Mandelbrot {
    // Smoothed iteration count for c, or max_iter if it never escapes.
    fn escape_time(&self, c_re: f64, c_im: f64) -> f64 {
        let mut z_re = 0.0;
        let mut z_im = 0.0;
        for n in 0..self.max_iter {
            let next_re = z_re * z_re - z_im * z_im + c_re;
            let next_im = 2.0 * z_re * z_im + c_im;
            z_re = next_re;
            z_im = next_im;
            let magnitude = (z_re * z_re + z_im * z_im).sqrt();
            if magnitude > 2.0 {
                return n as f64 + 1.0 - magnitude.ln().ln() / 2.0_f64.ln();
            }
        }
        self.max_iter as f64
    }

    // Blue-to-white gradient over the normalized escape time.
    fn map_color(t: f64) -> RGB {
        RGB::new(
            (t * 4.0).min(1.0),
            (t * t * 1.5).min(1.0),
            (0.5 + t).min(1.0),
        )
    }
}

#[typetag::deserialize]
impl ShadingModel for Mandelbrot {
    fn illuminate(
        &self,
        _base_color: RGB,
        _light_color: RGB,
        _normal: Vector3,
        _light_dir: Vector3,
        _view_dir: Vector3,
        _material: &Material,
        point: Point3,
        _uv: (f64, f64),
    ) -> RGB {
        let c_re = (point.x * 2.0 - self.center_x) / self.zoom;
        let c_im = (point.y * 2.0 - self.center_y) / self.zoom;

        let smooth_iter = self.escape_time(c_re, c_im);
        if smooth_iter >= self.max_iter as f64 {
            return RGB::black();
        }
        Mandelbrot::map_color(smooth_iter / self.max_iter as f64)
    }
}

// Voronoi mosaic over a jittered grid. Each grid cell hashes to a site
// and a tile color, so the pattern is deterministic for a given seed;
// points near the boundary between the two closest sites get grout.
#[derive(Deserialize)]
pub struct Mosaic {
    #[serde(default = "default_mosaic_cell_count")]
    cell_count: f64,
    #[serde(default = "default_mosaic_border_thickness")]
    border_thickness: f64,
    #[serde(default = "default_mosaic_seed")]
    seed: u64,
}

fn default_mosaic_cell_count() -> f64 {
    10.0
}
fn default_mosaic_border_thickness() -> f64 {
    0.05
}
fn default_mosaic_seed() -> u64 {
    42
}

impl Mosaic {
    // Site position and tile color for one grid cell, drawn from a
    // generator seeded by the cell's hash.
    fn cell_site(&self, cell_x: i64, cell_y: i64) -> (f64, f64, RGB) {
        let hash = (cell_x.wrapping_mul(73_856_093))
            .wrapping_add(cell_y.wrapping_mul(19_349_663)) as u64;
        let mut rng = SmallRng::seed_from_u64(hash.wrapping_add(self.seed) & 0xFFFF_FFFF);

        let site_x = cell_x as f64 + rng.gen::<f64>();
        let site_y = cell_y as f64 + rng.gen::<f64>();
        // Tile colors stay in [0.1, 0.8] for deeper tones.
        let color = RGB::new(
            0.1 + rng.gen::<f64>() * 0.7,
            0.1 + rng.gen::<f64>() * 0.7,
            0.1 + rng.gen::<f64>() * 0.7,
        );
        (site_x, site_y, color)
    }

    // Contrast boost around mid-gray.
    fn boost(channel: f64) -> f64 {
        utils::clamp((channel - 0.5) * 1.5 + 0.5, 0.0, 1.0)
    }
}

#[typetag::deserialize]
impl ShadingModel for Mosaic {
    fn illuminate(
        &self,
        _base_color: RGB,
        _light_color: RGB,
        _normal: Vector3,
        _light_dir: Vector3,
        _view_dir: Vector3,
        _material: &Material,
        point: Point3,
        _uv: (f64, f64),
    ) -> RGB {
        let u = point.x * self.cell_count;
        let v = point.y * self.cell_count;
        let cell_x = u.floor() as i64;
        let cell_y = v.floor() as i64;

        // Nearest and second-nearest sites over this cell and its eight
        // neighbors.
        let mut min_dist = std::f64::MAX;
        let mut second_dist = std::f64::MAX;
        let mut chosen = RGB::black();
        for ix in (cell_x - 1)..=(cell_x + 1) {
            for iy in (cell_y - 1)..=(cell_y + 1) {
                let (site_x, site_y, color) = self.cell_site(ix, iy);
                let dist = (u - site_x).hypot(v - site_y);
                if dist < min_dist {
                    second_dist = min_dist;
                    min_dist = dist;
                    chosen = color;
                } else if dist < second_dist {
                    second_dist = dist;
                }
            }
        }

        if second_dist - min_dist < self.border_thickness {
            return RGB::new(0.05, 0.05, 0.05);
        }
        RGB::new(
            Mosaic::boost(chosen.r),
            Mosaic::boost(chosen.g),
            Mosaic::boost(chosen.b),
        )
    }
}

// Samples a decoded image by the hit's surface coordinates. The file is
// read once, while the scene spec is being deserialized.
#[derive(Deserialize)]
#[serde(try_from = "ImageTextureSpec")]
pub struct ImageTexture {
    image: DynamicImage,
    width: u32,
    height: u32,
}

#[derive(Deserialize)]
struct ImageTextureSpec {
    path: String,
}

impl TryFrom<ImageTextureSpec> for ImageTexture {
    type Error = String;

    fn try_from(spec: ImageTextureSpec) -> Result<Self, Self::Error> {
        let image = image::open(&spec.path)
            .map_err(|e| format!("Could not open texture image {}: {}", spec.path, e))?;
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(format!("Texture image {} is empty", spec.path));
        }
        Ok(ImageTexture {
            image: image,
            width: width,
            height: height,
        })
    }
}

#[typetag::deserialize]
impl ShadingModel for ImageTexture {
    fn illuminate(
        &self,
        _base_color: RGB,
        _light_color: RGB,
        _normal: Vector3,
        _light_dir: Vector3,
        _view_dir: Vector3,
        _material: &Material,
        _point: Point3,
        uv: (f64, f64),
    ) -> RGB {
        let u = uv.0.rem_euclid(1.0);
        // Flip v so 0 is the bottom of the image.
        let v = uv.1.rem_euclid(1.0);
        let px = (u * (self.width - 1) as f64) as u32;
        let py = ((1.0 - v) * (self.height - 1) as f64) as u32;
        let pixel = self.image.get_pixel(px, py);
        RGB::new(
            pixel[0] as f64 / 255.0,
            pixel[1] as f64 / 255.0,
            pixel[2] as f64 / 255.0,
        )
    }
}

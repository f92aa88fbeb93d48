use crate::color::RGB;
use crate::point::Point3;
use crate::ray::Ray;
use crate::vector::Vector3;
use crate::world::World;

pub enum Sampling {
    // One centered primary ray per pixel.
    Normal,
    // Four sub-pixel rays, averaged.
    Super2x2,
}

impl Copy for Sampling {}
impl Clone for Sampling {
    fn clone(&self) -> Sampling {
        *self
    }
}

// Unclamped H x W radiance buffer, row major. Consumers apply their own
// tone mapping.
pub struct Film {
    width: u32,
    height: u32,
    pixels: Vec<RGB>,
}

impl Film {
    pub fn new(width: u32, height: u32) -> Film {
        Film {
            width: width,
            height: height,
            pixels: vec![RGB::black(); (width * height) as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel(&self, x: u32, y: u32) -> RGB {
        self.pixels[(y * self.width + x) as usize]
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, color: RGB) {
        self.pixels[(y * self.width + x) as usize] = color;
    }
}

pub struct Camera {
    position: Point3,
    forward: Vector3,
    right: Vector3,
    up: Vector3,
    film_width: f64,
    film_height: f64,
    width: u32,
    height: u32,
    sampling: Sampling,
}

impl Camera {
    pub fn new(
        position: Point3,
        look_at: Point3,
        up: Vector3,
        vertical_fov: f64,
        width: u32,
        height: u32,
        sampling: Sampling,
    ) -> Camera {
        let forward = (look_at - position).normalized();
        let right = forward.cross(up).normalized();
        let up = right.cross(forward).normalized();

        // Film plane extents in world units at unit distance.
        let aspect_ratio = width as f64 / height as f64;
        let film_height = 2.0 * (vertical_fov.to_radians() / 2.0).tan();
        let film_width = film_height * aspect_ratio;

        Camera {
            position: position,
            forward: forward,
            right: right,
            up: up,
            film_width: film_width,
            film_height: film_height,
            width: width,
            height: height,
            sampling: sampling,
        }
    }

    // Primary ray through the continuous pixel coordinate (x, y).
    pub fn generate_ray(&self, x: f64, y: f64) -> Ray {
        let u = (x + 0.5) / self.width as f64 * self.film_width - self.film_width / 2.0;
        let v = (y + 0.5) / self.height as f64 * self.film_height - self.film_height / 2.0;
        Ray::new(
            self.position,
            self.forward + self.right * u + self.up * v,
        )
    }

    pub fn render_pixel(&self, world: &World, x: u32, y: u32) -> RGB {
        match self.sampling {
            Sampling::Normal => world.spawn_ray(&self.generate_ray(x as f64, y as f64), 1),
            Sampling::Super2x2 => {
                let mut color = RGB::black();
                for i in 0..2 {
                    for j in 0..2 {
                        let r = self.generate_ray(
                            x as f64 + i as f64 / 2.0,
                            y as f64 + j as f64 / 2.0,
                        );
                        color = color + world.spawn_ray(&r, 1);
                    }
                }
                color / 4.0
            }
        }
    }

    pub fn render(&self, world: &World) -> Film {
        let mut film = Film::new(self.width, self.height);
        for y in 0..self.height {
            for x in 0..self.width {
                film.set_pixel(x, y, self.render_pixel(world, x, y));
            }
        }
        film
    }
}

use crate::vector::Axis;
use crate::vector::Vector3;

use serde::Deserialize;
use std::convert;
use std::ops;
use wavefront_obj::obj;

#[derive(Deserialize)]
#[serde(try_from = "Vec<f64>")]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Copy for Point3 {}
impl Clone for Point3 {
    fn clone(&self) -> Point3 {
        *self
    }
}

impl Point3 {
    pub fn origin() -> Point3 {
        Point3::new(0.0, 0.0, 0.0)
    }

    pub fn new(x: f64, y: f64, z: f64) -> Point3 {
        Point3 { x: x, y: y, z: z }
    }

    pub fn min(p1: Point3, p2: Point3) -> Point3 {
        Point3::new(p1.x.min(p2.x), p1.y.min(p2.y), p1.z.min(p2.z))
    }

    pub fn max(p1: Point3, p2: Point3) -> Point3 {
        Point3::new(p1.x.max(p2.x), p1.y.max(p2.y), p1.z.max(p2.z))
    }
}

impl ops::Add<Vector3> for Point3 {
    type Output = Point3;
    fn add(self, rhs: Vector3) -> Point3 {
        Point3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl ops::Sub for Point3 {
    type Output = Vector3;
    fn sub(self, rhs: Point3) -> Vector3 {
        Vector3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl ops::Sub<Vector3> for Point3 {
    type Output = Point3;
    fn sub(self, rhs: Vector3) -> Point3 {
        Point3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl convert::TryFrom<Vec<f64>> for Point3 {
    type Error = &'static str;

    fn try_from(vec: Vec<f64>) -> Result<Self, Self::Error> {
        if vec.len() != 3 {
            Err("Deserializing in to Point3 requires a Vec of length 3!")
        } else {
            Ok(Point3::new(vec[0], vec[1], vec[2]))
        }
    }
}

impl convert::From<obj::Vertex> for Point3 {
    fn from(vertex: obj::Vertex) -> Self {
        Point3::new(vertex.x, vertex.y, vertex.z)
    }
}

impl ops::Index<Axis> for Point3 {
    type Output = f64;
    fn index(&self, index: Axis) -> &f64 {
        match index {
            Axis::X => &self.x,
            Axis::Y => &self.y,
            Axis::Z => &self.z,
        }
    }
}

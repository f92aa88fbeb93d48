use crate::point::Point3;
use crate::ray::Ray;
use crate::vector::Axis;

use std::mem;

// Axis Aligned Bounding Box
pub struct Aabb {
    pub min: Point3,
    pub max: Point3,
}

impl Copy for Aabb {}
impl Clone for Aabb {
    fn clone(&self) -> Aabb {
        *self
    }
}

impl Aabb {
    pub fn new(min: Point3, max: Point3) -> Aabb {
        Aabb { min: min, max: max }
    }

    // The box produced for empty input.
    pub fn degenerate() -> Aabb {
        Aabb::new(Point3::origin(), Point3::origin())
    }

    pub fn union(box1: &Aabb, box2: &Aabb) -> Aabb {
        Aabb::new(
            Point3::min(box1.min, box2.min),
            Point3::max(box1.max, box2.max),
        )
    }

    pub fn from_points<I>(points: I) -> Aabb
    where
        I: IntoIterator<Item = Point3>,
    {
        let mut iter = points.into_iter();
        let first = match iter.next() {
            Some(p) => p,
            None => return Aabb::degenerate(),
        };
        let mut bounds = Aabb::new(first, first);
        for p in iter {
            bounds.min = Point3::min(bounds.min, p);
            bounds.max = Point3::max(bounds.max, p);
        }
        bounds
    }

    pub fn center(&self) -> Point3 {
        Point3::new(
            (self.min.x + self.max.x) * 0.5,
            (self.min.y + self.max.y) * 0.5,
            (self.min.z + self.max.z) * 0.5,
        )
    }

    pub fn center_on(&self, axis: Axis) -> f64 {
        (self.min[axis] + self.max[axis]) * 0.5
    }

    pub fn surface_area(&self) -> f64 {
        let diagonal = self.max - self.min;
        2.0 * (diagonal.x * diagonal.y + diagonal.x * diagonal.z + diagonal.y * diagonal.z)
    }

    pub fn contains(&self, p: Point3) -> bool {
        self.min.x <= p.x
            && p.x <= self.max.x
            && self.min.y <= p.y
            && p.y <= self.max.y
            && self.min.z <= p.z
            && p.z <= self.max.z
    }

    // Slab method. Zero direction components divide out to signed
    // infinities, which the min/max folds below absorb (f64::max and
    // f64::min drop NaN operands).
    pub fn intersects(&self, r: &Ray) -> bool {
        let (t1_x, t2_x) = self.slab(r, Axis::X);
        let (t1_y, t2_y) = self.slab(r, Axis::Y);
        let (t1_z, t2_z) = self.slab(r, Axis::Z);

        let t_enter = t1_x.max(t1_y).max(t1_z);
        let t_exit = t2_x.min(t2_y).min(t2_z);
        t_exit > t_enter.max(0.0)
    }

    fn slab(&self, r: &Ray, axis: Axis) -> (f64, f64) {
        let inverse_direction = 1.0 / r.dir[axis];
        let mut t1 = (self.min[axis] - r.origin[axis]) * inverse_direction;
        let mut t2 = (self.max[axis] - r.origin[axis]) * inverse_direction;
        if inverse_direction < 0.0 {
            mem::swap(&mut t1, &mut t2);
        }
        (t1, t2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::Vector3;

    #[test]
    fn empty_input_is_degenerate() {
        let bounds = Aabb::from_points(Vec::new());
        assert_eq!(bounds.min.x, 0.0);
        assert_eq!(bounds.max.z, 0.0);
    }

    #[test]
    fn slab_hit_and_miss() {
        let bounds = Aabb::new(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0));
        let hit = Ray::new(Point3::new(0.0, 0.0, -5.0), Vector3::new(0.0, 0.0, 1.0));
        assert!(bounds.intersects(&hit));
        let miss = Ray::new(Point3::new(0.0, 3.0, -5.0), Vector3::new(0.0, 0.0, 1.0));
        assert!(!bounds.intersects(&miss));
        // Behind the origin does not count.
        let behind = Ray::new(Point3::new(0.0, 0.0, -5.0), Vector3::new(0.0, 0.0, -1.0));
        assert!(!bounds.intersects(&behind));
    }

    #[test]
    fn slab_handles_zero_direction_component() {
        let bounds = Aabb::new(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0));
        // Parallel to the X slabs, passing through the box.
        let inside = Ray::new(Point3::new(0.5, -5.0, 0.0), Vector3::new(0.0, 1.0, 0.0));
        assert!(bounds.intersects(&inside));
        // Parallel to the X slabs, outside of them.
        let outside = Ray::new(Point3::new(2.0, -5.0, 0.0), Vector3::new(0.0, 1.0, 0.0));
        assert!(!bounds.intersects(&outside));
    }
}

use crate::point::Point3;
use crate::vector::Vector3;

pub struct Ray {
    pub origin: Point3,
    // Stored normalized.
    pub dir: Vector3,
    // Index of the primitive this ray was spawned from, if any. Used only
    // for identity comparison so secondary rays never re-hit the surface
    // they left.
    pub spawned_by: Option<usize>,
}

impl Ray {
    pub fn new(origin: Point3, dir: Vector3) -> Ray {
        Ray {
            origin: origin,
            dir: dir.normalized(),
            spawned_by: None,
        }
    }

    pub fn spawned(origin: Point3, dir: Vector3, source: usize) -> Ray {
        Ray {
            origin: origin,
            dir: dir.normalized(),
            spawned_by: Some(source),
        }
    }

    pub fn point_at(&self, t: f64) -> Point3 {
        self.origin + (self.dir * t)
    }

    // Rays are immutable after construction except for this helper, which
    // the shadow transmittance walk uses to march past transparent
    // surfaces.
    pub(crate) fn advance(&mut self, t: f64) {
        self.origin = self.origin + (self.dir * t);
    }
}

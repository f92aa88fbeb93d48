use crate::matrix::Matrix4;
use crate::vector::Vector3;

use serde::Deserialize;

// All runtime calculations are done in world space; a Transform is
// consumed at scene-build time (or through World::transform_object) to
// produce the matrix that moves geometry there. Rotation components are
// Euler angles in radians.
#[derive(Clone, Deserialize)]
pub struct Transform {
    #[serde(default = "Vector3::new_empty")]
    translate: Vector3,
    #[serde(default = "Vector3::new_empty")]
    rotate: Vector3,
    #[serde(default = "Vector3::new_identity")]
    scale: Vector3,
}

impl Transform {
    pub fn new(translate: Vector3, rotate: Vector3, scale: Vector3) -> Transform {
        Transform {
            translate: translate,
            rotate: rotate,
            scale: scale,
        }
    }

    pub fn create_matrix(&self) -> Matrix4 {
        Matrix4::new_translation(&self.translate)
            * Matrix4::new_rotation_x(self.rotate.x)
            * Matrix4::new_rotation_y(self.rotate.y)
            * Matrix4::new_rotation_z(self.rotate.z)
            * Matrix4::new_scale(&self.scale)
    }
}

use serde::Deserialize;
use std::convert;
use std::ops;

// Radiance values are not restricted to the display range; channels may
// exceed 1 until the integrator clamps its final composition.
#[derive(Deserialize)]
#[serde(try_from = "Vec<f64>")]
pub struct RGB {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Copy for RGB {}
impl Clone for RGB {
    fn clone(&self) -> RGB {
        *self
    }
}

impl RGB {
    pub fn new(r: f64, g: f64, b: f64) -> RGB {
        RGB { r: r, g: g, b: b }
    }

    pub fn black() -> RGB {
        RGB::new(0.0, 0.0, 0.0)
    }

    pub fn white() -> RGB {
        RGB::new(1.0, 1.0, 1.0)
    }

    pub fn clamped(self) -> RGB {
        RGB::new(
            self.r.max(0.0).min(1.0),
            self.g.max(0.0).min(1.0),
            self.b.max(0.0).min(1.0),
        )
    }
}

impl ops::Add for RGB {
    type Output = RGB;
    fn add(self, rhs: RGB) -> RGB {
        RGB::new(self.r + rhs.r, self.g + rhs.g, self.b + rhs.b)
    }
}

impl ops::Mul for RGB {
    type Output = RGB;
    fn mul(self, rhs: RGB) -> RGB {
        RGB::new(self.r * rhs.r, self.g * rhs.g, self.b * rhs.b)
    }
}

impl ops::Mul<f64> for RGB {
    type Output = RGB;
    fn mul(self, rhs: f64) -> RGB {
        RGB::new(self.r * rhs, self.g * rhs, self.b * rhs)
    }
}

impl ops::Div<f64> for RGB {
    type Output = RGB;
    fn div(self, rhs: f64) -> RGB {
        RGB::new(self.r / rhs, self.g / rhs, self.b / rhs)
    }
}

impl convert::TryFrom<Vec<f64>> for RGB {
    type Error = &'static str;

    fn try_from(vec: Vec<f64>) -> Result<Self, Self::Error> {
        if vec.len() != 3 {
            Err("Deserializing in to RGB requires a Vec of length 3!")
        } else {
            Ok(RGB::new(vec[0], vec[1], vec[2]))
        }
    }
}

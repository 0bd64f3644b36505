use nalgebra::{Scalar, Vector3};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SRgb<T> {
    pub r: T,
    pub g: T,
    pub b: T,
}

impl<T> SRgb<T> {
    pub const fn new(r: T, g: T, b: T) -> Self {
        Self { r, g, b }
    }
}

impl SRgb<u8> {
    /// Unpacks a `0xRRGGBB` color.
    pub const fn from_hex(hex: u32) -> Self {
        Self {
            r: (hex >> 16) as u8,
            g: (hex >> 8) as u8,
            b: hex as u8,
        }
    }

    pub const fn to_hex(&self) -> u32 {
        (self.r as u32) << 16 | (self.g as u32) << 8 | self.b as u32
    }

    /// CSS style `#rrggbb` string.
    pub fn css(&self) -> String {
        format!("#{:06x}", self.to_hex())
    }
}

impl<T> From<SRgb<T>> for Vector3<T> {
    fn from(value: SRgb<T>) -> Self {
        Vector3::new(value.r, value.g, value.b)
    }
}

impl<T: Scalar + Copy> From<Vector3<T>> for SRgb<T> {
    fn from(value: Vector3<T>) -> Self {
        Self {
            r: value.x,
            g: value.y,
            b: value.z,
        }
    }
}

//! RGBA colors

use serde::{Deserialize, Serialize};

/// A color with red, green, blue and alpha channels in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rgba {
    /// Red channel
    pub r: f64,
    /// Green channel
    pub g: f64,
    /// Blue channel
    pub b: f64,
    /// Alpha channel
    pub a: f64,
}

impl Rgba {
    /// Fully transparent black, the default for color fields
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);
    /// Opaque white
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);
    /// Opaque black
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    /// Create a color from all four channels
    #[must_use]
    pub const fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    /// Create an opaque color
    #[must_use]
    pub const fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self::new(r, g, b, 1.0)
    }

    /// Channels as an array, useful for GPU uploads
    #[must_use]
    pub fn to_array(self) -> [f32; 4] {
        [self.r as f32, self.g as f32, self.b as f32, self.a as f32]
    }
}

impl From<(f64, f64, f64)> for Rgba {
    fn from((r, g, b): (f64, f64, f64)) -> Self {
        Self::rgb(r, g, b)
    }
}

impl From<(f64, f64, f64, f64)> for Rgba {
    fn from((r, g, b, a): (f64, f64, f64, f64)) -> Self {
        Self::new(r, g, b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgba_from_tuples() {
        assert_eq!(Rgba::from((1.0, 0.5, 0.0)), Rgba::new(1.0, 0.5, 0.0, 1.0));
        assert_eq!(Rgba::from((0.1, 0.2, 0.3, 0.4)).a, 0.4);
        assert_eq!(Rgba::default(), Rgba::TRANSPARENT);
    }
}

//! RGB colors for drawing operations.

use serde::{Deserialize, Serialize};

/// An opaque 8-bit-per-channel RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    pub const RED: Self = Self::rgb(255, 0, 0);
    pub const GREEN: Self = Self::rgb(0, 128, 0);
    pub const BLUE: Self = Self::rgb(0, 0, 255);
    pub const LIGHT_BLUE: Self = Self::rgb(173, 216, 230);
    pub const YELLOW: Self = Self::rgb(255, 255, 0);
    pub const GRAY: Self = Self::rgb(128, 128, 128);

    /// Create a color from its components.
    #[inline]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Pack into a `0x00RRGGBB` pixel, the layout used by window surfaces.
    #[inline]
    pub const fn to_u32(self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }

    /// Unpack from a `0x00RRGGBB` pixel. The top byte is ignored.
    #[inline]
    pub const fn from_u32(pixel: u32) -> Self {
        Self {
            r: (pixel >> 16) as u8,
            g: (pixel >> 8) as u8,
            b: pixel as u8,
        }
    }

    /// Blend `self` over `background` with `alpha` coverage (0 = background, 255 = self).
    pub fn blend_over(self, background: Self, alpha: u8) -> Self {
        let a = alpha as u32;
        let mix = |fg: u8, bg: u8| ((fg as u32 * a + bg as u32 * (255 - a) + 127) / 255) as u8;
        Self {
            r: mix(self.r, background.r),
            g: mix(self.g, background.g),
            b: mix(self.b, background.b),
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_unpack() {
        let color = Color::rgb(0x12, 0x34, 0x56);
        assert_eq!(color.to_u32(), 0x0012_3456);
        assert_eq!(Color::from_u32(0xFF12_3456), color);
    }

    #[test]
    fn test_blend_extremes() {
        assert_eq!(Color::RED.blend_over(Color::BLUE, 255), Color::RED);
        assert_eq!(Color::RED.blend_over(Color::BLUE, 0), Color::BLUE);
        let half = Color::WHITE.blend_over(Color::BLACK, 128);
        assert_eq!(half, Color::rgb(128, 128, 128));
    }
}

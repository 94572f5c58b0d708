//! Page height derivation from container width.

use serde::{Deserialize, Serialize};

/// Fixed page aspect ratio, expressed in physical units (inches).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageAspect {
    pub width: f64,
    pub height: f64,
}

impl PageAspect {
    /// 8.5 x 11 inch US Letter.
    pub const US_LETTER: Self = Self { width: 8.5, height: 11.0 };

    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    /// `floor(width_px * height / width)`; zero for non-positive or non-finite widths.
    pub fn height_for_width(&self, width_px: f32) -> u32 {
        if !width_px.is_finite() || width_px <= 0.0 || !self.is_valid() {
            return 0;
        }

        let height = (f64::from(width_px) * self.height / self.width).floor();
        height.min(f64::from(u32::MAX)) as u32
    }
}

impl Default for PageAspect {
    fn default() -> Self {
        Self::US_LETTER
    }
}

/// Container width paired with the page height derived from it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layout {
    pub width_px: f32,
    pub height_px: u32,
}

impl Layout {
    pub fn for_width(width_px: f32, aspect: PageAspect) -> Self {
        Self { width_px, height_px: aspect.height_for_width(width_px) }
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;

/// A fixed rectangle selecting the pixel area of interest in a source image.
///
/// Coordinates are source-image pixels, origin top-left. A region is shared
/// read-only configuration: it is built once (usually as a `const`) and never
/// mutated at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRegion {
    /// Builds a region. Usable in `const` position; a zero width or height
    /// fails the build there instead of surfacing at runtime.
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        assert!(width > 0, "crop region width must be positive");
        assert!(height > 0, "crop region height must be positive");
        CropRegion { x, y, width, height }
    }

    /// Right edge of the region, exclusive. Widened to avoid overflow at the
    /// extremes of `u32` coordinate space.
    pub const fn right(&self) -> u64 {
        self.x as u64 + self.width as u64
    }

    /// Bottom edge of the region, exclusive.
    pub const fn bottom(&self) -> u64 {
        self.y as u64 + self.height as u64
    }

    /// Whether the region lies entirely inside a frame of the given size.
    pub fn fits_within(&self, frame_width: u32, frame_height: u32) -> bool {
        self.right() <= frame_width as u64 && self.bottom() <= frame_height as u64
    }
}

impl fmt::Display for CropRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_geometry_form() {
        assert_eq!(CropRegion::new(40, 12, 320, 96).to_string(), "320x96+40+12");
    }

    #[test]
    fn fits_within_inclusive_of_exact_fit() {
        let r = CropRegion::new(0, 0, 100, 50);
        assert!(r.fits_within(100, 50));
        assert!(!r.fits_within(99, 50));
        assert!(!r.fits_within(100, 49));
    }

    #[test]
    fn fits_within_offset_region() {
        let r = CropRegion::new(10, 20, 30, 40);
        assert!(r.fits_within(40, 60));
        assert!(!r.fits_within(39, 60));
        assert!(!r.fits_within(40, 59));
    }

    #[test]
    fn edges_do_not_overflow_u32() {
        let r = CropRegion::new(u32::MAX, u32::MAX, 1, 1);
        assert_eq!(r.right(), u32::MAX as u64 + 1);
        assert_eq!(r.bottom(), u32::MAX as u64 + 1);
        assert!(!r.fits_within(u32::MAX, u32::MAX));
    }
}

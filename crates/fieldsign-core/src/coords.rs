//! Coordinate transformation between canvas, fractional and PDF page space
//!
//! Signature fields are stored as fractions of the page in [0, 1] with a
//! top-left origin (y grows downward), so they survive any render scale.
//! The compositor converts them to the PDF's bottom-left point coordinates.

use serde::{Deserialize, Serialize};

/// A rectangle in fractional page coordinates, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FracRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// A rectangle in canvas pixels, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// A rectangle in PDF page points, bottom-left origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Convert a canvas pixel position (top-left origin) to page fractions
pub fn to_fraction(px: f64, py: f64, canvas_width: f64, canvas_height: f64) -> (f64, f64) {
    (px / canvas_width, py / canvas_height)
}

/// Convert a fractional rect to canvas pixels for overlay positioning
pub fn to_pixels(rect: &FracRect, canvas_width: f64, canvas_height: f64) -> PixelRect {
    PixelRect {
        x: rect.x * canvas_width,
        y: rect.y * canvas_height,
        width: rect.width * canvas_width,
        height: rect.height * canvas_height,
    }
}

/// Convert a fractional rect (top-left origin) to PDF page points
/// (bottom-left origin, Y axis flipped)
pub fn to_page_rect(rect: &FracRect, page_width: f64, page_height: f64) -> PageRect {
    PageRect {
        x: page_width * rect.x,
        y: page_height * (1.0 - rect.y - rect.height),
        width: page_width * rect.width,
        height: page_height * rect.height,
    }
}

impl FracRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Clamp the rect into the unit square.
    ///
    /// The size is reduced to fit before the origin is clamped, so a rect
    /// that is too large shrinks instead of acquiring a negative origin.
    pub fn clamped(&self) -> FracRect {
        let width = self.width.clamp(0.0, 1.0);
        let height = self.height.clamp(0.0, 1.0);
        FracRect {
            x: self.x.clamp(0.0, 1.0 - width),
            y: self.y.clamp(0.0, 1.0 - height),
            width,
            height,
        }
    }

    /// True when the rect satisfies the storage invariants
    pub fn in_bounds(&self) -> bool {
        self.x >= 0.0
            && self.y >= 0.0
            && self.width >= 0.0
            && self.height >= 0.0
            && self.x + self.width <= 1.0 + f64::EPSILON
            && self.y + self.height <= 1.0 + f64::EPSILON
    }

    /// True when the point (fractional) falls inside the rect
    pub fn contains(&self, fx: f64, fy: f64) -> bool {
        fx >= self.x && fx <= self.x + self.width && fy >= self.y && fy <= self.y + self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_click_to_fraction_center() {
        // Click at (400, 300) on an 800x600 canvas lands at the page center
        let (x, y) = to_fraction(400.0, 300.0, 800.0, 600.0);
        assert_eq!(x, 0.5);
        assert_eq!(y, 0.5);
    }

    #[test]
    fn test_fraction_to_page_rect_flips_y() {
        // Letter page, field at 10% from the top-left, 20% x 5%
        let rect = FracRect::new(0.1, 0.1, 0.2, 0.05);
        let page = to_page_rect(&rect, 612.0, 792.0);
        assert!((page.x - 61.2).abs() < 1e-9);
        assert!((page.y - 673.2).abs() < 1e-9);
        assert!((page.width - 122.4).abs() < 1e-9);
        assert!((page.height - 39.6).abs() < 1e-9);
    }

    #[test]
    fn test_bottom_edge_field_lands_at_page_origin() {
        let rect = FracRect::new(0.0, 0.95, 0.15, 0.05);
        let page = to_page_rect(&rect, 612.0, 792.0);
        assert!((page.y - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_to_pixels_scales_with_canvas() {
        let rect = FracRect::new(0.25, 0.5, 0.1, 0.1);
        let px = to_pixels(&rect, 1000.0, 500.0);
        assert_eq!(px.x, 250.0);
        assert_eq!(px.y, 250.0);
        assert_eq!(px.width, 100.0);
        assert_eq!(px.height, 50.0);
    }

    #[test]
    fn test_clamp_pulls_origin_back() {
        let rect = FracRect::new(0.95, 0.98, 0.15, 0.05).clamped();
        assert_eq!(rect.x, 0.85);
        assert_eq!(rect.y, 0.95);
        assert!(rect.in_bounds());
    }

    #[test]
    fn test_clamp_shrinks_oversized_before_moving_origin() {
        let rect = FracRect::new(0.2, 0.2, 1.5, 2.0).clamped();
        assert_eq!(rect.width, 1.0);
        assert_eq!(rect.height, 1.0);
        assert_eq!(rect.x, 0.0);
        assert_eq!(rect.y, 0.0);
    }

    #[test]
    fn test_clamp_negative_origin() {
        let rect = FracRect::new(-0.3, -0.1, 0.2, 0.1).clamped();
        assert_eq!(rect.x, 0.0);
        assert_eq!(rect.y, 0.0);
        assert!(rect.in_bounds());
    }

    #[test]
    fn test_contains() {
        let rect = FracRect::new(0.4, 0.4, 0.2, 0.2);
        assert!(rect.contains(0.5, 0.5));
        assert!(rect.contains(0.4, 0.4));
        assert!(!rect.contains(0.39, 0.5));
        assert!(!rect.contains(0.5, 0.75));
    }
}

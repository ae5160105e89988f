//! Pure calculation functions for derivative dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Calculate derivative dimensions for a fixed target width.
///
/// The height follows the source aspect ratio,
/// `round(target_width / (w0 / h0))`, and never drops below one pixel (a
/// 4000x1 panorama squeezed to 100px wide is still one row tall).
///
/// # Arguments
/// * `source` - Original image dimensions (width, height)
/// * `target_width` - Width of the derivative in pixels
///
/// # Returns
/// * `(width, height)` - Derivative dimensions
///
/// # Examples
/// ```
/// # use folio::imaging::derivative_dimensions;
/// // 4:3 landscape at 600px wide → 600x450
/// assert_eq!(derivative_dimensions((1600, 1200), 600), (600, 450));
///
/// // 2:3 portrait at 700px wide → 700x1050
/// assert_eq!(derivative_dimensions((2000, 3000), 700), (700, 1050));
/// ```
pub fn derivative_dimensions(source: (u32, u32), target_width: u32) -> (u32, u32) {
    let (src_w, src_h) = source;
    let aspect = src_w as f64 / src_h as f64;
    let h = (target_width as f64 / aspect).round() as u32;
    (target_width, h.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn landscape_keeps_aspect() {
        // 800x600 (4:3) → 600 wide: 600 / (4/3) = 450
        assert_eq!(derivative_dimensions((800, 600), 600), (600, 450));
    }

    #[test]
    fn portrait_keeps_aspect() {
        // 600x800 (3:4) → 600 wide: 600 / (3/4) = 800
        assert_eq!(derivative_dimensions((600, 800), 600), (600, 800));
    }

    #[test]
    fn square() {
        assert_eq!(derivative_dimensions((1000, 1000), 700), (700, 700));
    }

    #[test]
    fn upscales_small_sources() {
        // No size filtering: the derivative is always target_width wide
        assert_eq!(derivative_dimensions((300, 200), 600), (600, 400));
    }

    #[test]
    fn rounds_to_nearest() {
        // 1000x333 at 600: 600 * 333 / 1000 = 199.8 → 200
        assert_eq!(derivative_dimensions((1000, 333), 600), (600, 200));
        // 1000x334 at 700: 700 * 334 / 1000 = 233.8 → 234
        assert_eq!(derivative_dimensions((1000, 334), 700), (700, 234));
    }

    #[test]
    fn extreme_panorama_is_at_least_one_pixel_tall() {
        assert_eq!(derivative_dimensions((4000, 1), 100), (100, 1));
    }

    #[test]
    fn matches_height_formula_within_one_pixel() {
        for &(w0, h0) in &[(1920, 1080), (3024, 4032), (1234, 567), (7, 13)] {
            for &w in &[600, 700, 1] {
                let (dw, dh) = derivative_dimensions((w0, h0), w);
                let expected = h0 as f64 * w as f64 / w0 as f64;
                assert_eq!(dw, w);
                assert!(
                    (dh as f64 - expected.round().max(1.0)).abs() <= 1.0,
                    "{w0}x{h0} → {w}: got {dh}, expected ~{expected}"
                );
            }
        }
    }
}

use crate::Homography;
use ndarray::Array2;
use nalgebra::Point2;

/// The pixel dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageShape {
    pub height: usize,
    pub width: usize,
}

impl ImageShape {
    pub fn new(height: usize, width: usize) -> Self {
        Self { height, width }
    }

    pub fn of<P: image::Pixel + 'static>(image: &image::ImageBuffer<P, Vec<P::Subpixel>>) -> Self
    where
        P::Subpixel: 'static,
    {
        Self::new(image.height() as usize, image.width() as usize)
    }

    /// Checks whether a real coordinate lies in `[0, width) x [0, height)`.
    pub fn contains(&self, point: Point2<f64>) -> bool {
        point.x >= 0.0
            && point.y >= 0.0
            && point.x < self.width as f64
            && point.y < self.height as f64
    }
}

/// The region of the reference image that is still visible in a transformed image.
///
/// Pixels are indexed with the floor convention: pixel `(col, row)` is represented by the real
/// coordinate `(col, row)`, and a real coordinate `(x, y)` belongs to the pixel
/// `(floor(x), floor(y))`. Construction and lookup both use this, so any pixel coordinate that
/// was accepted while building the mask is also reported as contained by it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlapMask {
    /// Indexed as `[row, col]`.
    mask: Array2<bool>,
}

impl OverlapMask {
    /// Computes which pixels of an image of `shape` land inside an image of the same shape when
    /// mapped through `homography`.
    ///
    /// Pixels that map onto the line at infinity are outside the region.
    pub fn compute(shape: ImageShape, homography: &Homography) -> Self {
        let mask = Array2::from_shape_fn((shape.height, shape.width), |(row, col)| {
            homography
                .transform_point(Point2::new(col as f64, row as f64))
                .map(|p| shape.contains(p))
                .unwrap_or(false)
        });
        Self { mask }
    }

    /// A mask where every pixel is part of the region.
    pub fn full(shape: ImageShape) -> Self {
        Self {
            mask: Array2::from_elem((shape.height, shape.width), true),
        }
    }

    pub fn shape(&self) -> ImageShape {
        let (height, width) = self.mask.dim();
        ImageShape { height, width }
    }

    /// Checks whether the pixel containing `point` is part of the region.
    ///
    /// Anything outside the pixel grid, including non-finite coordinates, is not contained.
    pub fn contains(&self, point: Point2<f64>) -> bool {
        if !self.shape().contains(point) {
            return false;
        }
        let col = point.x.floor() as usize;
        let row = point.y.floor() as usize;
        self.contains_pixel(col, row)
    }

    pub fn contains_pixel(&self, col: usize, row: usize) -> bool {
        self.mask.get((row, col)).copied().unwrap_or(false)
    }

    /// The number of pixels in the region.
    pub fn area(&self) -> usize {
        self.mask.iter().filter(|&&inside| inside).count()
    }

    pub fn is_empty(&self) -> bool {
        !self.mask.iter().any(|&inside| inside)
    }
}

/// Computes the overlap region of the reference frame. See [`OverlapMask::compute`].
pub fn compute_overlap_mask(reference_shape: ImageShape, homography: &Homography) -> OverlapMask {
    OverlapMask::compute(reference_shape, homography)
}

/// Checks whether `point` falls inside `mask`. See [`OverlapMask::contains`].
pub fn is_in_mask(point: Point2<f64>, mask: &OverlapMask) -> bool {
    mask.contains(point)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHAPE: ImageShape = ImageShape {
        height: 40,
        width: 60,
    };

    #[test]
    fn identity_covers_everything() {
        let mask = compute_overlap_mask(SHAPE, &Homography::identity());
        assert_eq!(mask, OverlapMask::full(SHAPE));
        assert_eq!(mask.area(), 40 * 60);
    }

    #[test]
    fn translation_out_of_bounds_is_empty() {
        let mask = compute_overlap_mask(SHAPE, &Homography::translation(1000.0, 1000.0));
        assert!(mask.is_empty());
        assert_eq!(mask.area(), 0);
        assert!(!is_in_mask(Point2::new(10.0, 10.0), &mask));
    }

    #[test]
    fn translation_keeps_the_overlapping_part() {
        // Moving right by 10 pixels leaves the first 50 columns inside the target.
        let mask = compute_overlap_mask(SHAPE, &Homography::translation(10.0, 0.0));
        assert_eq!(mask.area(), 40 * 50);
        assert!(mask.contains_pixel(49, 0));
        assert!(!mask.contains_pixel(50, 0));
        assert!(is_in_mask(Point2::new(49.9, 39.9), &mask));
        assert!(!is_in_mask(Point2::new(50.0, 0.0), &mask));
    }

    #[test]
    fn fractional_coordinates_use_floor() {
        // Moving left by 2.5 pixels: column 2 maps to -0.5 (outside), column 3 to 0.5 (inside).
        let mask = compute_overlap_mask(SHAPE, &Homography::translation(-2.5, 0.0));
        assert!(!mask.contains_pixel(2, 5));
        assert!(mask.contains_pixel(3, 5));
        assert!(!is_in_mask(Point2::new(2.99, 5.0), &mask));
        assert!(is_in_mask(Point2::new(3.0, 5.0), &mask));
        assert!(is_in_mask(Point2::new(3.7, 5.2), &mask));
    }

    #[test]
    fn outside_the_grid_is_not_contained() {
        let mask = OverlapMask::full(SHAPE);
        assert!(!mask.contains(Point2::new(-0.1, 0.0)));
        assert!(!mask.contains(Point2::new(0.0, -0.1)));
        assert!(!mask.contains(Point2::new(60.0, 0.0)));
        assert!(!mask.contains(Point2::new(0.0, 40.0)));
        assert!(!mask.contains(Point2::new(f64::NAN, 1.0)));
        assert!(!mask.contains(Point2::new(f64::INFINITY, 1.0)));
        assert!(!mask.contains_pixel(60, 0));
        assert!(mask.contains(Point2::new(59.999, 39.999)));
    }

    #[test]
    fn pixels_accepted_during_construction_are_contained() {
        let h = Homography::from_rows([
            [0.8, 0.1, 5.0],
            [-0.05, 0.9, 3.0],
            [2e-3, 1e-3, 1.0],
        ]);
        let mask = compute_overlap_mask(SHAPE, &h);
        for row in 0..SHAPE.height {
            for col in 0..SHAPE.width {
                let p = Point2::new(col as f64, row as f64);
                let inside = h.transform_point(p).map(|t| SHAPE.contains(t)).unwrap();
                assert_eq!(is_in_mask(p, &mask), inside);
            }
        }
    }

    #[test]
    fn points_at_infinity_are_outside() {
        // Column 10 maps onto w = 0.
        let h = Homography::from_rows([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [-0.1, 0.0, 1.0]]);
        let mask = compute_overlap_mask(SHAPE, &h);
        assert!(!mask.contains_pixel(10, 0));
        assert!(mask.contains_pixel(0, 0));
    }

    #[test]
    fn zero_sized_shape() {
        let shape = ImageShape::new(0, 0);
        let mask = compute_overlap_mask(shape, &Homography::identity());
        assert!(mask.is_empty());
        assert!(!mask.contains(Point2::new(0.0, 0.0)));
    }
}

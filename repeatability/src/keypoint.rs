use derive_more::{AsMut, AsRef, Deref, DerefMut, From, Into};
use nalgebra::Point2;

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// Anything the matcher can compare by pixel position.
///
/// Detector outputs of different crates only need this to be fed to
/// [`RepeatabilityMatcher`](crate::RepeatabilityMatcher) without conversion.
pub trait ImagePoint {
    fn image_point(&self) -> Point2<f64>;
}

/// A detected feature location in pixel coordinates of the image it was found in.
///
/// `x` grows to the right and `y` grows downwards, both starting at the top left corner.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, AsMut, AsRef, Deref, DerefMut, From, Into)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct KeyPoint(pub Point2<f64>);

impl KeyPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self(Point2::new(x, y))
    }
}

impl ImagePoint for KeyPoint {
    fn image_point(&self) -> Point2<f64> {
        self.0
    }
}

impl ImagePoint for Point2<f64> {
    fn image_point(&self) -> Point2<f64> {
        *self
    }
}

impl ImagePoint for akaze::KeyPoint {
    fn image_point(&self) -> Point2<f64> {
        Point2::new(self.point.0 as f64, self.point.1 as f64)
    }
}

impl<P: ImagePoint> ImagePoint for &P {
    fn image_point(&self) -> Point2<f64> {
        (*self).image_point()
    }
}

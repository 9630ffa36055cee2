use crate::{Error, KeyPoint, Result};
use akaze::Akaze;
use image::{DynamicImage, GrayImage};
use imageproc::corners::{corners_fast12, corners_fast9, Corner};
use std::fmt;
use std::str::FromStr;

/// A keypoint detector under evaluation.
///
/// The order of the returned keypoints does not affect the measured repeatability.
pub trait Detector: Send + Sync {
    fn detect(&self, image: &GrayImage) -> Vec<KeyPoint>;
}

impl<F> Detector for F
where
    F: Fn(&GrayImage) -> Vec<KeyPoint> + Send + Sync,
{
    fn detect(&self, image: &GrayImage) -> Vec<KeyPoint> {
        self(image)
    }
}

/// AKAZE keypoints. Descriptors are computed by the extractor but discarded.
#[derive(Debug, Copy, Clone)]
pub struct AkazeDetector(pub Akaze);

impl AkazeDetector {
    pub fn new(threshold: f64) -> Self {
        Self(Akaze::new(threshold))
    }
}

impl Default for AkazeDetector {
    fn default() -> Self {
        Self(Akaze::default())
    }
}

impl Detector for AkazeDetector {
    fn detect(&self, image: &GrayImage) -> Vec<KeyPoint> {
        let (keypoints, _) = self.0.extract(&DynamicImage::ImageLuma8(image.clone()));
        keypoints
            .into_iter()
            .map(|kp| KeyPoint::new(kp.point.0 as f64, kp.point.1 as f64))
            .collect()
    }
}

/// The number of contiguous pixels on the Bresenham circle required by FAST.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FastVariant {
    Fast9,
    Fast12,
}

/// FAST corners.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FastDetector {
    pub variant: FastVariant,
    /// Intensity difference to the center pixel that makes a circle pixel count as brighter or darker.
    pub threshold: u8,
}

impl FastDetector {
    pub fn new(variant: FastVariant, threshold: u8) -> Self {
        Self { variant, threshold }
    }
}

impl Detector for FastDetector {
    fn detect(&self, image: &GrayImage) -> Vec<KeyPoint> {
        let corners = match self.variant {
            FastVariant::Fast9 => corners_fast9(image, self.threshold),
            FastVariant::Fast12 => corners_fast12(image, self.threshold),
        };
        corners
            .into_iter()
            .map(|Corner { x, y, .. }| KeyPoint::new(x as f64, y as f64))
            .collect()
    }
}

pub const DEFAULT_AKAZE_THRESHOLD: f64 = 0.001;
pub const DEFAULT_FAST_THRESHOLD: u8 = 10;

/// A detector configuration that can be named on the command line or in settings.
///
/// The textual form is `name[:threshold]` with the names `akaze`, `fast9` and `fast12`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum DetectorKind {
    Akaze { threshold: f64 },
    Fast { variant: FastVariant, threshold: u8 },
}

impl DetectorKind {
    pub fn build(&self) -> Box<dyn Detector> {
        match *self {
            DetectorKind::Akaze { threshold } => Box::new(AkazeDetector::new(threshold)),
            DetectorKind::Fast { variant, threshold } => {
                Box::new(FastDetector::new(variant, threshold))
            }
        }
    }
}

impl FromStr for DetectorKind {
    type Err = Error;

    fn from_str(label: &str) -> Result<Self> {
        let (name, threshold) = match label.split_once(':') {
            Some((name, threshold)) => (name, Some(threshold)),
            None => (label, None),
        };
        let invalid = |reason: String| Error::InvalidDetector {
            label: label.to_owned(),
            reason,
        };
        let fast = |variant| -> Result<Self> {
            let threshold = threshold
                .map(|t| {
                    t.parse::<u8>()
                        .map_err(|_| invalid(format!("`{}` is not a threshold in 0..=255", t)))
                })
                .transpose()?
                .unwrap_or(DEFAULT_FAST_THRESHOLD);
            Ok(DetectorKind::Fast { variant, threshold })
        };
        match name.to_ascii_lowercase().as_str() {
            "akaze" => {
                let threshold = threshold
                    .map(|t| match t.parse::<f64>() {
                        Ok(v) if v.is_finite() && v > 0.0 => Ok(v),
                        _ => Err(invalid(format!("`{}` is not a positive threshold", t))),
                    })
                    .transpose()?
                    .unwrap_or(DEFAULT_AKAZE_THRESHOLD);
                Ok(DetectorKind::Akaze { threshold })
            }
            "fast9" => fast(FastVariant::Fast9),
            "fast12" => fast(FastVariant::Fast12),
            _ => Err(Error::UnknownDetector(label.to_owned())),
        }
    }
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectorKind::Akaze { threshold } => write!(f, "akaze:{}", threshold),
            DetectorKind::Fast {
                variant: FastVariant::Fast9,
                threshold,
            } => write!(f, "fast9:{}", threshold),
            DetectorKind::Fast {
                variant: FastVariant::Fast12,
                threshold,
            } => write!(f, "fast12:{}", threshold),
        }
    }
}

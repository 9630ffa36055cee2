use crate::{Error, Homography, ImagePoint, ImageShape, OverlapMask, Result};
use log::*;
use nalgebra::{distance, Point2};
use rstar::RTree;

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// The distance in pixels below which a mapped keypoint counts as repeated.
pub const DEFAULT_THRESHOLD: f64 = 2.0;

/// The outcome of comparing one image of a sequence against the reference image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct MatchingResult {
    /// Reference keypoints inside the overlap region.
    pub common: usize,
    /// Keypoints of the compared image that were found again among the common ones.
    pub repeated: usize,
}

impl MatchingResult {
    /// `repeated / common`, or `None` if there is nothing in common.
    pub fn ratio(&self) -> Option<f64> {
        if self.common == 0 {
            None
        } else {
            Some(self.repeated as f64 / self.common as f64)
        }
    }
}

/// A [`MatchingResult`] together with intermediate counts of the comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameMatch {
    pub result: MatchingResult,
    /// Keypoints of the compared image that map back into the overlap region.
    pub current_in_overlap: usize,
}

/// Compares keypoints of a transformed image against those of the reference image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RepeatabilityMatcher {
    threshold: f64,
}

impl RepeatabilityMatcher {
    /// A match requires a distance strictly below `threshold` pixels.
    ///
    /// Fails with [`Error::InvalidThreshold`] unless `threshold` is finite and positive, since
    /// nothing could ever match otherwise.
    pub fn new(threshold: f64) -> Result<Self> {
        if threshold.is_finite() && threshold > 0.0 {
            Ok(Self { threshold })
        } else {
            Err(Error::InvalidThreshold(threshold))
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// The reference image trivially repeats all of its own keypoints.
    pub fn match_reference<P>(&self, reference: &[P]) -> MatchingResult {
        MatchingResult {
            common: reference.len(),
            repeated: reference.len(),
        }
    }

    /// Compares the keypoints of a transformed image against the reference keypoints.
    ///
    /// `homography` maps the reference frame (of dimensions `shape`) into the frame of `current`.
    /// Both images are assumed to share `shape`.
    pub fn match_frame<R, C>(
        &self,
        shape: ImageShape,
        reference: &[R],
        current: &[C],
        homography: &Homography,
    ) -> Result<MatchingResult>
    where
        R: ImagePoint,
        C: ImagePoint,
    {
        self.match_frame_detailed(shape, reference, current, homography)
            .map(|m| m.result)
    }

    /// Same as [`RepeatabilityMatcher::match_frame`], but also reports intermediate counts.
    pub fn match_frame_detailed<R, C>(
        &self,
        shape: ImageShape,
        reference: &[R],
        current: &[C],
        homography: &Homography,
    ) -> Result<FrameMatch>
    where
        R: ImagePoint,
        C: ImagePoint,
    {
        let inverse = homography.inverse()?;
        let mask = OverlapMask::compute(shape, homography);

        let common: Vec<[f64; 2]> = reference
            .iter()
            .map(|p| p.image_point())
            .filter(|&p| mask.contains(p))
            .map(|p| [p.x, p.y])
            .collect();
        let num_common = common.len();
        let index = RTree::bulk_load(common);

        let mut current_in_overlap = 0;
        let mut repeated = 0;
        for point in current {
            let mapped = inverse.transform_point(point.image_point())?;
            if !mask.contains(mapped) {
                continue;
            }
            current_in_overlap += 1;
            // An empty index yields no neighbor, so nothing can be repeated.
            if let Some(&[x, y]) = index.nearest_neighbor(&[mapped.x, mapped.y]) {
                if distance(&mapped, &Point2::new(x, y)) < self.threshold {
                    repeated += 1;
                }
            }
        }
        debug!(
            "overlap area {}, common {}, current in overlap {}/{}, repeated {}",
            mask.area(),
            num_common,
            current_in_overlap,
            current.len(),
            repeated
        );

        Ok(FrameMatch {
            result: MatchingResult {
                common: num_common,
                repeated,
            },
            current_in_overlap,
        })
    }
}

impl Default for RepeatabilityMatcher {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

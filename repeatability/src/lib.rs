//! # Repeatability
//!
//! This crate measures the repeatability of keypoint detectors. Given a sequence of images of
//! the same planar scene together with the homographies relating the first image (the reference)
//! to every other image, it counts how many of the keypoints detected in the reference are
//! detected again, at a compatible location, in each transformed image.
//!
//! For one image pair the process is:
//!
//! 1. Compute the [`OverlapMask`], the set of reference pixels that land inside the transformed
//!    image when mapped through the homography.
//! 2. Restrict the reference keypoints to that mask. Their count is the `common` count.
//! 3. Map every keypoint of the transformed image back into the reference frame with the inverse
//!    homography. If it lands inside the mask and its nearest restricted reference keypoint is
//!    closer than the threshold (2 pixels by default), it counts as `repeated`.
//!
//! ```text
//!   reference frame                 transformed frame
//!   +-------------+                 +-------------+
//!   |   +------+  |       H         |             |
//!   |   | mask |  |  ---------->    |   (image    |
//!   |   +------+  |  <----------    |    bounds)  |
//!   +-------------+      H^-1       +-------------+
//! ```
//!
//! The [`RepeatabilityTest`] drives this over several detectors and image sequences, and the
//! resulting [`RepeatabilityReport`] can be exported as CSV tables and a plot.

mod detector;
mod error;
mod homography;
mod keypoint;
mod mask;
mod matcher;
mod report;
mod runner;
mod sequence;
mod settings;

pub use detector::*;
pub use error::*;
pub use homography::*;
pub use image;
pub use keypoint::*;
pub use mask::*;
pub use matcher::*;
pub use nalgebra;
pub use report::*;
pub use runner::*;
pub use sequence::*;
pub use settings::*;

use std::path::PathBuf;
use thiserror::Error;

/// Everything that can abort the evaluation of an image pair or sequence.
///
/// Degenerate inputs (no keypoints, an empty overlap) are not errors and never show up here.
#[derive(Debug, Error)]
pub enum Error {
    #[error("homography is singular and cannot be inverted")]
    SingularHomography,
    #[error("point ({x}, {y}) maps onto the line at infinity")]
    PointAtInfinity { x: f64, y: f64 },
    #[error("malformed homography: {0}")]
    MalformedHomography(String),
    #[error("malformed homography file {path}: {reason}")]
    HomographyFile { path: PathBuf, reason: String },
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to load image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("image {path} is {found_width}x{found_height}, expected {width}x{height}")]
    DimensionMismatch {
        path: PathBuf,
        width: usize,
        height: usize,
        found_width: usize,
        found_height: usize,
    },
    #[error("no reference image (img1) found in {0}")]
    MissingReference(PathBuf),
    #[error("no images found in {0}")]
    EmptySequence(PathBuf),
    #[error("match threshold {0} is not a positive number of pixels")]
    InvalidThreshold(f64),
    #[error("unknown detector `{0}`")]
    UnknownDetector(String),
    #[error("invalid detector `{label}`: {reason}")]
    InvalidDetector { label: String, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;

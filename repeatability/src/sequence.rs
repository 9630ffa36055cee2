use crate::{Error, Homography, ImageShape, Result};
use image::GrayImage;
use itertools::Itertools;
use log::*;
use std::path::{Path, PathBuf};

/// The image extensions searched for when none are configured.
pub const DEFAULT_EXTENSIONS: &[&str] = &["pgm", "ppm", "png"];

/// One image of a sequence, `img<number>.<ext>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub number: usize,
    pub path: PathBuf,
}

impl Frame {
    /// Frame 1 is the reference every other frame is compared against.
    pub fn is_reference(&self) -> bool {
        self.number == 1
    }
}

/// A directory holding images of one scene and the homographies from the first image to the others.
///
/// The layout follows the Oxford affine-covariant-features dataset: `img1.ppm`, `img2.ppm`, ...
/// alongside `H1to2p`, `H1to3p`, ...
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSequence {
    dir: PathBuf,
    frames: Vec<Frame>,
}

impl ImageSequence {
    /// Finds the frames of a sequence in `dir`, ordered by frame number.
    ///
    /// Only files whose extension is in `extensions` (compared case-insensitively) are considered.
    pub fn discover(dir: impl AsRef<Path>, extensions: &[impl AsRef<str>]) -> Result<Self> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir).map_err(|source| Error::Io {
            path: dir.to_owned(),
            source,
        })?;
        let mut frames = vec![];
        for entry in entries {
            let path = entry
                .map_err(|source| Error::Io {
                    path: dir.to_owned(),
                    source,
                })?
                .path();
            if !path.is_file() {
                continue;
            }
            let number = path
                .file_name()
                .and_then(|name| name.to_str())
                .and_then(|name| parse_frame_name(name, extensions));
            if let Some(number) = number {
                frames.push(Frame { number, path });
            }
        }
        Self::from_frames(dir, frames)
    }

    /// Builds a sequence from already known frames.
    pub fn from_frames(dir: impl Into<PathBuf>, frames: Vec<Frame>) -> Result<Self> {
        let dir = dir.into();
        let frames = frames
            .into_iter()
            .sorted_by_key(|frame| frame.number)
            .collect_vec();
        match frames.first() {
            None => return Err(Error::EmptySequence(dir)),
            Some(first) if !first.is_reference() => return Err(Error::MissingReference(dir)),
            _ => {}
        }
        info!("found {} images in {}", frames.len(), dir.display());
        Ok(Self { dir, frames })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The frames in order, the reference first.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn reference(&self) -> &Frame {
        &self.frames[0]
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// A short name for the sequence, its directory name.
    pub fn name(&self) -> String {
        self.dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.dir.display().to_string())
    }

    /// `<sequence name>/<file name>` for every frame.
    pub fn frame_labels(&self) -> Vec<String> {
        let name = self.name();
        self.frames
            .iter()
            .map(|frame| {
                let file = frame
                    .path
                    .file_name()
                    .map(|f| f.to_string_lossy().into_owned())
                    .unwrap_or_default();
                format!("{}/{}", name, file)
            })
            .collect()
    }

    /// Loads a frame as an 8-bit grayscale image.
    pub fn load_image(&self, frame: &Frame) -> Result<GrayImage> {
        let image = image::open(&frame.path).map_err(|source| Error::Image {
            path: frame.path.clone(),
            source,
        })?;
        Ok(image.into_luma8())
    }

    /// Loads the homography from the reference to `frame`.
    pub fn load_homography(&self, frame: &Frame) -> Result<Homography> {
        Homography::load_for_frame(&self.dir, frame.number)
    }
}

/// Checks that `image` has the dimensions of the reference image.
pub fn check_shape(path: &Path, expected: ImageShape, image: &GrayImage) -> Result<()> {
    let found = ImageShape::of(image);
    if found == expected {
        Ok(())
    } else {
        Err(Error::DimensionMismatch {
            path: path.to_owned(),
            width: expected.width,
            height: expected.height,
            found_width: found.width,
            found_height: found.height,
        })
    }
}

/// Extracts `N` from a file named `img<N>.<ext>`.
fn parse_frame_name(name: &str, extensions: &[impl AsRef<str>]) -> Option<usize> {
    let (stem, ext) = name.rsplit_once('.')?;
    if !extensions
        .iter()
        .any(|allowed| allowed.as_ref().eq_ignore_ascii_case(ext))
    {
        return None;
    }
    let digits = stem.strip_prefix("img")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

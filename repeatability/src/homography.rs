use crate::{Error, Result};
use derive_more::{AsRef, Deref, From, Into};
use nalgebra::{Matrix3, Point2, Vector3};
use std::path::{Path, PathBuf};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// A projective transform between the pixel frames of two images of the same planar scene.
///
/// The matrix acts on homogeneous column vectors `(x, y, 1)`. A homography loaded for frame `N`
/// of a sequence maps reference (frame 1) coordinates into frame `N` coordinates.
#[derive(Debug, Clone, Copy, PartialEq, AsRef, Deref, From, Into)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Homography(pub Matrix3<f64>);

impl Homography {
    pub fn identity() -> Self {
        Self(Matrix3::identity())
    }

    /// Creates a homography from its rows.
    pub fn from_rows(rows: [[f64; 3]; 3]) -> Self {
        Self(Matrix3::new(
            rows[0][0], rows[0][1], rows[0][2], //
            rows[1][0], rows[1][1], rows[1][2], //
            rows[2][0], rows[2][1], rows[2][2],
        ))
    }

    /// A pure translation by `(tx, ty)` pixels.
    pub fn translation(tx: f64, ty: f64) -> Self {
        Self::from_rows([[1.0, 0.0, tx], [0.0, 1.0, ty], [0.0, 0.0, 1.0]])
    }

    /// Maps `point` through the homography, including the perspective division.
    ///
    /// Fails with [`Error::PointAtInfinity`] if the third homogeneous component is zero, or if
    /// the mapped point is not finite. A NaN here would otherwise poison every distance computed
    /// from it.
    pub fn transform_point(&self, point: Point2<f64>) -> Result<Point2<f64>> {
        let mapped = self.0 * Vector3::new(point.x, point.y, 1.0);
        let w = mapped.z;
        if w == 0.0 || !w.is_finite() {
            return Err(Error::PointAtInfinity {
                x: point.x,
                y: point.y,
            });
        }
        let out = Point2::new(mapped.x / w, mapped.y / w);
        if out.x.is_finite() && out.y.is_finite() {
            Ok(out)
        } else {
            Err(Error::PointAtInfinity {
                x: point.x,
                y: point.y,
            })
        }
    }

    /// The homography mapping in the reverse direction.
    pub fn inverse(&self) -> Result<Self> {
        let det = self.0.determinant();
        if det == 0.0 || !det.is_finite() {
            return Err(Error::SingularHomography);
        }
        self.0
            .try_inverse()
            .filter(|inv| inv.iter().all(|v| v.is_finite()))
            .map(Self)
            .ok_or(Error::SingularHomography)
    }

    /// Parses the plain-text matrix format of the Oxford affine-covariant-features dataset.
    ///
    /// That is nine whitespace separated numbers in row-major order, usually written as three
    /// lines of three. Blank lines and lines starting with `#` are skipped.
    pub fn parse(text: &str) -> Result<Self> {
        let mut values = Vec::with_capacity(9);
        for line in text.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            for token in line.split_whitespace() {
                let value: f64 = token.parse().map_err(|_| {
                    Error::MalformedHomography(format!("`{}` is not a number", token))
                })?;
                values.push(value);
            }
        }
        if values.len() != 9 {
            return Err(Error::MalformedHomography(format!(
                "expected 9 values, found {}",
                values.len()
            )));
        }
        Ok(Self(Matrix3::from_row_slice(&values)))
    }

    /// Reads a homography file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::parse(&text).map_err(|e| match e {
            Error::MalformedHomography(reason) => Error::HomographyFile {
                path: path.to_owned(),
                reason,
            },
            e => e,
        })
    }

    /// Reads the homography from frame 1 to frame `frame` of the sequence stored in `dir`.
    pub fn load_for_frame(dir: impl AsRef<Path>, frame: usize) -> Result<Self> {
        Self::load(homography_path(dir, frame))
    }
}

impl Default for Homography {
    fn default() -> Self {
        Self::identity()
    }
}

/// `<dir>/H1to<frame>p`
pub fn homography_path(dir: impl AsRef<Path>, frame: usize) -> PathBuf {
    dir.as_ref().join(format!("H1to{}p", frame))
}

/// Applies `homography` to `point`. See [`Homography::transform_point`].
pub fn transform_point(point: Point2<f64>, homography: &Homography) -> Result<Point2<f64>> {
    homography.transform_point(point)
}

/// Inverts `homography`. See [`Homography::inverse`].
pub fn invert(homography: &Homography) -> Result<Homography> {
    homography.inverse()
}

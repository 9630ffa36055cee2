use crate::{DetectorKind, Result, DEFAULT_EXTENSIONS, DEFAULT_THRESHOLD};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// The settings for a repeatability test.
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct RepeatabilitySettings {
    /// The distance in pixels below which a keypoint counts as repeated
    #[cfg_attr(feature = "serde-serialize", serde(default = "default_threshold"))]
    pub threshold: f64,
    /// The detectors to evaluate, in the `name[:threshold]` form of [`DetectorKind`]
    #[cfg_attr(feature = "serde-serialize", serde(default = "default_detectors"))]
    pub detectors: Vec<String>,
    /// The file extensions of sequence images
    #[cfg_attr(feature = "serde-serialize", serde(default = "default_extensions"))]
    pub extensions: Vec<String>,
}

impl RepeatabilitySettings {
    /// Parses every configured detector label.
    pub fn detector_kinds(&self) -> Result<Vec<DetectorKind>> {
        self.detectors.iter().map(|label| label.parse()).collect()
    }
}

impl Default for RepeatabilitySettings {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            detectors: default_detectors(),
            extensions: default_extensions(),
        }
    }
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

fn default_detectors() -> Vec<String> {
    vec!["akaze".to_owned(), "fast9".to_owned()]
}

fn default_extensions() -> Vec<String> {
    DEFAULT_EXTENSIONS.iter().map(|&ext| ext.to_owned()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn defaults_parse() {
        let settings = RepeatabilitySettings::default();
        assert_eq!(settings.threshold, 2.0);
        assert_eq!(settings.detector_kinds().unwrap().len(), 2);
    }

    #[test]
    fn bad_detector_label() {
        let settings = RepeatabilitySettings {
            detectors: vec!["akaze".to_owned(), "orb".to_owned()],
            ..Default::default()
        };
        assert!(matches!(
            settings.detector_kinds(),
            Err(Error::UnknownDetector(label)) if label == "orb"
        ));
    }
}

use crate::{
    check_shape, Detector, DetectorRun, Homography, ImageSequence, ImageShape, KeyPoint,
    MatchingResult, RepeatabilityMatcher, RepeatabilityReport, Result, SequenceRun,
};
use image::GrayImage;
use log::*;
use std::path::Path;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Runs a detector over every image of `sequence` and compares each image with the first.
///
/// The first result is always the trivial match of the reference with itself. Any error aborts
/// the whole sequence.
pub fn evaluate_sequence<D: Detector + ?Sized>(
    matcher: &RepeatabilityMatcher,
    detector: &D,
    sequence: &ImageSequence,
) -> Result<Vec<MatchingResult>> {
    let reference_frame = sequence.reference();
    info!("processing {}", reference_frame.path.display());
    let reference_image = sequence.load_image(reference_frame)?;
    let shape = ImageShape::of(&reference_image);
    let reference = detector.detect(&reference_image);
    debug!("{} reference keypoints", reference.len());

    let mut results = Vec::with_capacity(sequence.len());
    results.push(matcher.match_reference(&reference));
    for frame in &sequence.frames()[1..] {
        info!("processing {}", frame.path.display());
        let image = sequence.load_image(frame)?;
        let homography = sequence.load_homography(frame)?;
        results.push(evaluate_frame(
            matcher,
            detector,
            shape,
            &reference,
            &frame.path,
            &image,
            &homography,
        )?);
    }
    Ok(results)
}

/// Same as [`evaluate_sequence`] for images already in memory.
///
/// Each of `frames` pairs an image with the homography from `reference` to it.
pub fn evaluate_images<D: Detector + ?Sized>(
    matcher: &RepeatabilityMatcher,
    detector: &D,
    reference: &GrayImage,
    frames: &[(GrayImage, Homography)],
) -> Result<Vec<MatchingResult>> {
    let shape = ImageShape::of(reference);
    let reference_keypoints = detector.detect(reference);
    let mut results = Vec::with_capacity(frames.len() + 1);
    results.push(matcher.match_reference(&reference_keypoints));
    for (index, (image, homography)) in frames.iter().enumerate() {
        let name = format!("frame {}", index + 2);
        results.push(evaluate_frame(
            matcher,
            detector,
            shape,
            &reference_keypoints,
            Path::new(&name),
            image,
            homography,
        )?);
    }
    Ok(results)
}

fn evaluate_frame<D: Detector + ?Sized>(
    matcher: &RepeatabilityMatcher,
    detector: &D,
    shape: ImageShape,
    reference: &[KeyPoint],
    path: &Path,
    image: &GrayImage,
    homography: &Homography,
) -> Result<MatchingResult> {
    check_shape(path, shape, image)?;
    let keypoints = detector.detect(image);
    let result = matcher.match_frame(shape, reference, &keypoints, homography)?;
    debug!(
        "{}: {} keypoints, common {}, repeated {}",
        path.display(),
        keypoints.len(),
        result.common,
        result.repeated
    );
    Ok(result)
}

/// Evaluates several detectors over several image sequences.
///
/// Detectors are kept in the order they were added. A failure of one detector on one sequence is
/// recorded in the report and does not stop the others.
#[derive(Default)]
pub struct RepeatabilityTest {
    matcher: RepeatabilityMatcher,
    detectors: Vec<(String, Box<dyn Detector>)>,
    sequences: Vec<ImageSequence>,
}

impl RepeatabilityTest {
    pub fn new(matcher: RepeatabilityMatcher) -> Self {
        Self {
            matcher,
            detectors: vec![],
            sequences: vec![],
        }
    }

    /// Adds a detector under `label`. A label that was already added is ignored.
    pub fn add_detector(&mut self, label: impl Into<String>, detector: Box<dyn Detector>) {
        let label = label.into();
        if self.detectors.iter().any(|(existing, _)| *existing == label) {
            warn!("detector {} was already added, ignoring it", label);
            return;
        }
        self.detectors.push((label, detector));
    }

    pub fn add_sequence(&mut self, sequence: ImageSequence) {
        self.sequences.push(sequence);
    }

    pub fn detector_labels(&self) -> impl Iterator<Item = &str> {
        self.detectors.iter().map(|(label, _)| label.as_str())
    }

    pub fn sequences(&self) -> &[ImageSequence] {
        &self.sequences
    }

    /// Runs every detector on every sequence.
    pub fn run(&self) -> RepeatabilityReport {
        let frame_labels = self
            .sequences
            .iter()
            .flat_map(ImageSequence::frame_labels)
            .collect();
        let mut report = RepeatabilityReport::new(frame_labels);

        #[cfg(not(feature = "rayon"))]
        let runs = self
            .detectors
            .iter()
            .enumerate()
            .map(|(index, (label, detector))| self.run_detector(index, label, detector.as_ref()))
            .collect::<Vec<_>>();
        #[cfg(feature = "rayon")]
        let runs = self
            .detectors
            .par_iter()
            .enumerate()
            .map(|(index, (label, detector))| self.run_detector(index, label, detector.as_ref()))
            .collect::<Vec<_>>();

        for run in runs {
            report.push(run);
        }
        report
    }

    fn run_detector(&self, index: usize, label: &str, detector: &dyn Detector) -> DetectorRun {
        info!(
            "running test {}/{} - {}",
            index + 1,
            self.detectors.len(),
            label
        );
        let mut run = DetectorRun::new(label);
        for sequence in &self.sequences {
            let outcome = evaluate_sequence(&self.matcher, detector, sequence);
            if let Err(e) = &outcome {
                error!(
                    "detector {} failed on sequence {}: {}",
                    label,
                    sequence.dir().display(),
                    e
                );
            }
            run.sequences.push(SequenceRun {
                sequence: sequence.name(),
                frames: sequence.len(),
                outcome,
            });
        }
        run
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use image::Luma;

    fn fixed(points: &'static [(f64, f64)]) -> Box<dyn Detector> {
        Box::new(move |_: &GrayImage| {
            points
                .iter()
                .map(|&(x, y)| KeyPoint::new(x, y))
                .collect::<Vec<_>>()
        })
    }

    #[test]
    fn in_memory_images() {
        let matcher = RepeatabilityMatcher::default();
        let detector = fixed(&[(10.0, 10.0), (50.0, 50.0)]);
        let image = GrayImage::from_pixel(100, 80, Luma([0]));
        let frames = vec![
            (image.clone(), Homography::identity()),
            (image.clone(), Homography::translation(1000.0, 1000.0)),
        ];
        let results = evaluate_images(&matcher, detector.as_ref(), &image, &frames).unwrap();
        assert_eq!(
            results,
            vec![
                MatchingResult {
                    common: 2,
                    repeated: 2
                },
                MatchingResult {
                    common: 2,
                    repeated: 2
                },
                MatchingResult::default(),
            ]
        );
    }

    #[test]
    fn mismatched_dimensions_abort() {
        let matcher = RepeatabilityMatcher::default();
        let detector = fixed(&[(10.0, 10.0)]);
        let reference = GrayImage::new(100, 80);
        let frames = vec![(GrayImage::new(80, 100), Homography::identity())];
        assert!(matches!(
            evaluate_images(&matcher, detector.as_ref(), &reference, &frames),
            Err(Error::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn duplicate_labels_keep_the_first() {
        let mut test = RepeatabilityTest::default();
        test.add_detector("a", fixed(&[]));
        test.add_detector("b", fixed(&[]));
        test.add_detector("a", fixed(&[(1.0, 1.0)]));
        assert_eq!(test.detector_labels().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn empty_test_gives_empty_report() {
        let report = RepeatabilityTest::default().run();
        assert!(report.detectors.is_empty());
        assert!(report.frame_labels.is_empty());
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn parallel_run_keeps_detector_order() {
        let dir = tempfile::tempdir().unwrap();
        GrayImage::new(40, 30).save(dir.path().join("img1.png")).unwrap();
        let mut test = RepeatabilityTest::default();
        test.add_sequence(ImageSequence::discover(dir.path(), crate::DEFAULT_EXTENSIONS).unwrap());
        let labels = (0..16).map(|i| format!("d{}", i)).collect::<Vec<_>>();
        for (count, label) in labels.iter().enumerate() {
            test.add_detector(
                label.as_str(),
                Box::new(move |_: &GrayImage| vec![KeyPoint::new(5.0, 5.0); count]),
            );
        }

        let report = test.run();
        assert_eq!(
            report.detectors.iter().map(|run| run.label.as_str()).collect::<Vec<_>>(),
            labels
        );
        for (count, run) in report.detectors.iter().enumerate() {
            assert_eq!(
                run.cells(),
                vec![Some(MatchingResult {
                    common: count,
                    repeated: count
                })]
            );
        }
    }
}

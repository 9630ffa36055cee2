use crate::{Error, MatchingResult, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing;
use imageproc::rect::Rect;
use itertools::Itertools;
use log::*;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

pub const COMMON_CSV: &str = "repeat-common.csv";
pub const REPEATING_CSV: &str = "repeat-repeating.csv";
pub const PLOT_FILE: &str = "repeatability.png";

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const AXIS: Rgb<u8> = Rgb([0, 0, 0]);
const GRID: Rgb<u8> = Rgb([220, 220, 220]);
const PLOT_MARGIN: f32 = 40.0;
const SERIES_COLORS: [Rgb<u8>; 8] = [
    Rgb([31, 119, 180]),
    Rgb([255, 127, 14]),
    Rgb([44, 160, 44]),
    Rgb([214, 39, 40]),
    Rgb([148, 103, 189]),
    Rgb([140, 86, 75]),
    Rgb([227, 119, 194]),
    Rgb([127, 127, 127]),
];

/// The results of one detector on one image sequence.
#[derive(Debug)]
pub struct SequenceRun {
    /// The name of the sequence.
    pub sequence: String,
    /// The number of images in the sequence.
    pub frames: usize,
    /// One result per image, the reference first, or the error that aborted the sequence.
    pub outcome: Result<Vec<MatchingResult>>,
}

impl SequenceRun {
    /// One cell per image, all `None` if the run failed.
    fn cells(&self) -> Vec<Option<MatchingResult>> {
        match &self.outcome {
            Ok(results) => results.iter().copied().map(Some).collect(),
            Err(_) => vec![None; self.frames],
        }
    }
}

/// The results of one detector across all sequences.
#[derive(Debug)]
pub struct DetectorRun {
    pub label: String,
    pub sequences: Vec<SequenceRun>,
}

impl DetectorRun {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            sequences: vec![],
        }
    }

    /// Checks whether every sequence finished without error.
    pub fn is_complete(&self) -> bool {
        self.sequences.iter().all(|run| run.outcome.is_ok())
    }

    /// The failed sequences and why they failed.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &Error)> {
        self.sequences.iter().filter_map(|run| match &run.outcome {
            Ok(_) => None,
            Err(e) => Some((run.sequence.as_str(), e)),
        })
    }

    /// One entry per image of every sequence, `None` where the sequence failed.
    pub fn cells(&self) -> Vec<Option<MatchingResult>> {
        self.sequences.iter().flat_map(SequenceRun::cells).collect()
    }

    /// `repeated / common` for every image except the reference of each sequence.
    ///
    /// `None` where the sequence failed or where nothing was in common.
    pub fn ratios(&self) -> Vec<Option<f64>> {
        self.sequences
            .iter()
            .flat_map(|run| {
                run.cells()
                    .into_iter()
                    .skip(1)
                    .map(|cell| cell.and_then(|result| result.ratio()))
            })
            .collect()
    }
}

/// Collected results of a repeatability test, one column per detector in insertion order.
#[derive(Debug, Default)]
pub struct RepeatabilityReport {
    /// `<sequence>/<file>` for every image of every sequence.
    pub frame_labels: Vec<String>,
    pub detectors: Vec<DetectorRun>,
}

impl RepeatabilityReport {
    pub fn new(frame_labels: Vec<String>) -> Self {
        Self {
            frame_labels,
            detectors: vec![],
        }
    }

    pub fn push(&mut self, run: DetectorRun) {
        self.detectors.push(run);
    }

    pub fn detector(&self, label: &str) -> Option<&DetectorRun> {
        self.detectors.iter().find(|run| run.label == label)
    }

    /// Every failed (detector, sequence) pair.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &str, &Error)> {
        self.detectors.iter().flat_map(|run| {
            run.failures()
                .map(move |(sequence, e)| (run.label.as_str(), sequence, e))
        })
    }

    pub fn is_complete(&self) -> bool {
        self.detectors.iter().all(DetectorRun::is_complete)
    }

    /// Writes the `common` counts, one row per image and one column per detector.
    pub fn write_common_csv(&self, writer: impl Write) -> io::Result<()> {
        self.write_csv(writer, |result| result.common)
    }

    /// Writes the `repeated` counts, one row per image and one column per detector.
    pub fn write_repeating_csv(&self, writer: impl Write) -> io::Result<()> {
        self.write_csv(writer, |result| result.repeated)
    }

    fn write_csv(
        &self,
        mut writer: impl Write,
        count: impl Fn(&MatchingResult) -> usize,
    ) -> io::Result<()> {
        let header = std::iter::once("image")
            .chain(self.detectors.iter().map(|run| run.label.as_str()))
            .map(csv_field)
            .join(",");
        writeln!(writer, "{}", header)?;

        let columns = self.detectors.iter().map(DetectorRun::cells).collect_vec();
        for (row, label) in self.frame_labels.iter().enumerate() {
            let cells = columns.iter().map(|column| {
                column
                    .get(row)
                    .copied()
                    .flatten()
                    .map(|result| count(&result).to_string())
                    .unwrap_or_default()
            });
            let line = std::iter::once(csv_field(label)).chain(cells).join(",");
            writeln!(writer, "{}", line)?;
        }
        writer.flush()
    }

    /// Plots the repeatability ratio of every detector over the non-reference images.
    ///
    /// The y axis runs from 0 % at the bottom to 100 % at the top with grid lines every 25 %.
    /// Each detector gets one color of a fixed palette, logged at `info` level as the legend.
    pub fn render_plot(&self, width: u32, height: u32) -> RgbImage {
        let mut image = RgbImage::from_pixel(width, height, BACKGROUND);
        let left = PLOT_MARGIN;
        let top = PLOT_MARGIN;
        let right = (width as f32 - PLOT_MARGIN).max(left + 1.0);
        let bottom = (height as f32 - PLOT_MARGIN).max(top + 1.0);

        for step in 0..=4 {
            let y = bottom - (bottom - top) * step as f32 / 4.0;
            drawing::draw_line_segment_mut(&mut image, (left, y), (right, y), GRID);
        }
        drawing::draw_hollow_rect_mut(
            &mut image,
            Rect::at(left as i32, top as i32)
                .of_size((right - left) as u32 + 1, (bottom - top) as u32 + 1),
            AXIS,
        );

        for (index, run) in self.detectors.iter().enumerate() {
            let color = SERIES_COLORS[index % SERIES_COLORS.len()];
            info!("plot legend: {} is rgb{:?}", run.label, color.0);
            let ratios = run.ratios();
            let x_of = |i: usize| {
                if ratios.len() <= 1 {
                    (left + right) / 2.0
                } else {
                    left + (right - left) * i as f32 / (ratios.len() - 1) as f32
                }
            };
            let y_of = |ratio: f64| bottom - (bottom - top) * ratio.clamp(0.0, 1.0) as f32;
            let points = ratios
                .iter()
                .enumerate()
                .map(|(i, ratio)| ratio.map(|r| (x_of(i), y_of(r))))
                .collect_vec();
            for (a, b) in points.iter().tuple_windows() {
                if let (Some(a), Some(b)) = (a, b) {
                    drawing::draw_line_segment_mut(&mut image, *a, *b, color);
                }
            }
            for &(x, y) in points.iter().flatten() {
                drawing::draw_filled_circle_mut(&mut image, (x as i32, y as i32), 3, color);
            }
        }
        image
    }

    /// Writes `repeat-common.csv`, `repeat-repeating.csv` and optionally `repeatability.png`
    /// into `dir`, creating it if needed.
    pub fn save(&self, dir: impl AsRef<Path>, plot: bool) -> Result<()> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|source| Error::Io {
            path: dir.to_owned(),
            source,
        })?;

        let common = dir.join(COMMON_CSV);
        create(&common)
            .and_then(|file| self.write_common_csv(file))
            .map_err(|source| Error::Io {
                path: common.clone(),
                source,
            })?;
        info!("wrote {}", common.display());

        let repeating = dir.join(REPEATING_CSV);
        create(&repeating)
            .and_then(|file| self.write_repeating_csv(file))
            .map_err(|source| Error::Io {
                path: repeating.clone(),
                source,
            })?;
        info!("wrote {}", repeating.display());

        if plot {
            let path = dir.join(PLOT_FILE);
            self.render_plot(800, 600)
                .save(&path)
                .map_err(|source| Error::Image {
                    path: path.clone(),
                    source,
                })?;
            info!("wrote {}", path.display());
        }
        Ok(())
    }
}

fn create(path: &Path) -> io::Result<BufWriter<File>> {
    File::create(path).map(BufWriter::new)
}

/// Quotes a CSV field if it contains a separator, quote or line break.
fn csv_field(field: &str) -> String {
    if field.contains(|c| matches!(c, ',' | '"' | '\n' | '\r')) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(common: usize, repeated: usize) -> MatchingResult {
        MatchingResult { common, repeated }
    }

    fn report() -> RepeatabilityReport {
        let mut report = RepeatabilityReport::new(vec![
            "graf/img1.ppm".to_owned(),
            "graf/img2.ppm".to_owned(),
            "graf/img3.ppm".to_owned(),
            "boat/img1.pgm".to_owned(),
            "boat/img2.pgm".to_owned(),
        ]);
        let mut akaze = DetectorRun::new("akaze:0.001");
        akaze.sequences.push(SequenceRun {
            sequence: "graf".to_owned(),
            frames: 3,
            outcome: Ok(vec![result(10, 10), result(8, 4), result(0, 0)]),
        });
        akaze.sequences.push(SequenceRun {
            sequence: "boat".to_owned(),
            frames: 2,
            outcome: Ok(vec![result(5, 5), result(4, 3)]),
        });
        let mut fast = DetectorRun::new("fast9:10");
        fast.sequences.push(SequenceRun {
            sequence: "graf".to_owned(),
            frames: 3,
            outcome: Ok(vec![result(20, 20), result(10, 5), result(2, 1)]),
        });
        fast.sequences.push(SequenceRun {
            sequence: "boat".to_owned(),
            frames: 2,
            outcome: Err(Error::SingularHomography),
        });
        report.push(akaze);
        report.push(fast);
        report
    }

    #[test]
    fn common_csv() {
        let mut out = vec![];
        report().write_common_csv(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "image,akaze:0.001,fast9:10\n\
             graf/img1.ppm,10,20\n\
             graf/img2.ppm,8,10\n\
             graf/img3.ppm,0,2\n\
             boat/img1.pgm,5,\n\
             boat/img2.pgm,4,\n"
        );
    }

    #[test]
    fn repeating_csv() {
        let mut out = vec![];
        report().write_repeating_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines = text.lines().collect_vec();
        assert_eq!(lines[0], "image,akaze:0.001,fast9:10");
        assert_eq!(lines[2], "graf/img2.ppm,4,5");
        assert_eq!(lines[5], "boat/img2.pgm,3,");
    }

    #[test]
    fn ratios_skip_references() {
        let report = report();
        assert_eq!(
            report.detector("akaze:0.001").unwrap().ratios(),
            vec![Some(0.5), None, Some(0.75)]
        );
        assert_eq!(
            report.detector("fast9:10").unwrap().ratios(),
            vec![Some(0.5), Some(0.5), None]
        );
    }

    #[test]
    fn failures_are_listed() {
        let report = report();
        assert!(!report.is_complete());
        let failures = report.failures().collect_vec();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "fast9:10");
        assert_eq!(failures[0].1, "boat");
        assert!(report.detector("akaze:0.001").unwrap().is_complete());
    }

    #[test]
    fn quoting() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn plot_has_requested_size() {
        let plot = report().render_plot(320, 240);
        assert_eq!(plot.dimensions(), (320, 240));
        // The top left corner is outside the plot area.
        assert_eq!(*plot.get_pixel(0, 0), BACKGROUND);
        // The frame of the plot area.
        assert_eq!(*plot.get_pixel(40, 45), AXIS);
    }

    #[test]
    fn save_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("results");
        report().save(&out, true).unwrap();
        assert!(out.join(COMMON_CSV).is_file());
        assert!(out.join(REPEATING_CSV).is_file());
        assert!(out.join(PLOT_FILE).is_file());
    }
}

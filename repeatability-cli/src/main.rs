use log::*;
use repeatability::{ImageSequence, RepeatabilityMatcher, RepeatabilitySettings, RepeatabilityTest};
use std::error::Error;
use std::path::{Path, PathBuf};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "repeatability",
    about = "Measures how repeatable keypoint detectors are across homography-related images"
)]
struct Opt {
    /// The file where settings are specified.
    ///
    /// This is in the format of `repeatability::RepeatabilitySettings` as JSON.
    /// Defaults are used if the file does not exist.
    #[structopt(short, long, default_value = "repeatability-settings.json")]
    settings: PathBuf,
    /// The distance in pixels below which a keypoint counts as repeated (overrides settings).
    #[structopt(short, long)]
    threshold: Option<f64>,
    /// A detector to evaluate, as `akaze[:threshold]`, `fast9[:threshold]` or `fast12[:threshold]`.
    ///
    /// May be given several times. Replaces the detectors from the settings.
    #[structopt(short, long = "detector", number_of_values = 1)]
    detectors: Vec<String>,
    /// An image extension to look for (overrides settings, may be given several times).
    #[structopt(short, long = "extension", number_of_values = 1)]
    extensions: Vec<String>,
    /// The directory the CSV tables and the plot are written to.
    #[structopt(short, long, default_value = "results", parse(from_os_str))]
    output: PathBuf,
    /// Do not render the repeatability plot.
    #[structopt(long)]
    no_plot: bool,
    /// Sequence directories, each holding `img1.<ext>`, `img2.<ext>`, ... and `H1to2p`, ...
    #[structopt(required = true, parse(from_os_str))]
    dirs: Vec<PathBuf>,
}

fn load_settings(path: &Path) -> Result<RepeatabilitySettings, Box<dyn Error>> {
    if !path.exists() {
        info!("used default settings");
        return Ok(RepeatabilitySettings::default());
    }
    let file = std::fs::File::open(path)?;
    let settings = serde_json::from_reader(std::io::BufReader::new(file))?;
    info!("loaded settings from {}", path.display());
    Ok(settings)
}

fn apply_overrides(settings: &mut RepeatabilitySettings, opt: &Opt) {
    if let Some(threshold) = opt.threshold {
        settings.threshold = threshold;
    }
    if !opt.detectors.is_empty() {
        settings.detectors = opt.detectors.clone();
    }
    if !opt.extensions.is_empty() {
        settings.extensions = opt.extensions.clone();
    }
}

fn run(opt: &Opt) -> Result<bool, Box<dyn Error>> {
    let mut settings = load_settings(&opt.settings)?;
    apply_overrides(&mut settings, opt);

    let mut test = RepeatabilityTest::new(RepeatabilityMatcher::new(settings.threshold)?);
    for kind in settings.detector_kinds()? {
        test.add_detector(kind.to_string(), kind.build());
    }
    // A directory that is not a usable sequence is left out of the tables, the rest still run.
    let mut skipped = 0;
    for dir in &opt.dirs {
        match ImageSequence::discover(dir, settings.extensions.as_slice()) {
            Ok(sequence) => test.add_sequence(sequence),
            Err(e) => {
                error!("skipping sequence {}: {}", dir.display(), e);
                skipped += 1;
            }
        }
    }

    let report = test.run();
    for run in &report.detectors {
        let ratios = run
            .ratios()
            .iter()
            .map(|ratio| match ratio {
                Some(ratio) => format!("{:.1}%", ratio * 100.0),
                None => "-".to_owned(),
            })
            .collect::<Vec<_>>();
        info!("{}: {}", run.label, ratios.join(" "));
    }
    report.save(&opt.output, !opt.no_plot)?;

    for (detector, sequence, e) in report.failures() {
        error!("{} on {}: {}", detector, sequence, e);
    }
    Ok(skipped == 0 && report.is_complete())
}

fn main() {
    pretty_env_logger::init_timed();
    let opt = Opt::from_args();
    match run(&opt) {
        Ok(true) => {}
        Ok(false) => {
            error!("some sequences were skipped or failed, see the errors above");
            std::process::exit(1);
        }
        Err(e) => {
            error!("{}", e);
            std::process::exit(2);
        }
    }
}

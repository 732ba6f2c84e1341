//! # Swara Monitor
//!
//! Headless front end for the swara tracker. Captures the default
//! microphone, runs every frame through a [`SwaraSession`] and reports
//! through the log: classifications at debug level, calibration results
//! and the running raga analysis at info level.
//!
//! ## Architecture
//! - **Audio Thread**: CPAL callback slicing samples into frames
//! - **Main Thread**: owns the session and drives it frame by frame
//! - **Communication**: bounded crossbeam channel; frames are dropped when full

mod audio;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::RecvTimeoutError;
use log::{debug, info, warn};
use swara_core::{AnalyzerConfig, FrameReport, RagaAnalysis, SwaraSession};

/// How often the raga analysis is refreshed.
const REPORT_INTERVAL: Duration = Duration::from_millis(500);

/// How long to wait for a frame before checking timers.
const RECV_TIMEOUT: Duration = Duration::from_millis(100);

/// Frames buffered between the audio callback and the analysis loop.
const CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Parser)]
#[command(name = "swara-monitor", about = "Live Carnatic swara and raga tracking")]
struct Args {
    /// Sa frequency in Hz. Overrides the configured default.
    #[arg(long)]
    tonic: Option<f32>,

    /// JSON file with analyzer settings. Missing fields keep their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Calibrate Sa from the first few seconds of singing.
    #[arg(long)]
    calibrate: bool,

    /// Stop after this many seconds. Runs until the input goes away otherwise.
    #[arg(long)]
    seconds: Option<u64>,

    /// Print the final raga summary as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// More log output (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => log::Level::Info,
        1 => log::Level::Debug,
        _ => log::Level::Trace,
    };
    simple_logger::init_with_level(level)?;

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => AnalyzerConfig::default(),
    };

    let mut session = SwaraSession::new(config)?;
    if let Some(tonic) = args.tonic {
        session.set_tonic(tonic)?;
    }

    let (sender, receiver) = crossbeam_channel::bounded(CHANNEL_CAPACITY);
    let (stream, sample_rate) = audio::start_audio_capture(sender)?;
    info!(
        "Listening at {sample_rate} Hz with Sa = {} (noise ceiling {:.1} Hz)",
        session.tonic(),
        session.noise_ceiling()
    );

    session.begin_capture();
    if args.calibrate {
        session.start_calibration()?;
        info!("Calibrating: sing your Sa steadily...");
    }

    let deadline = args
        .seconds
        .map(|secs| Instant::now() + Duration::from_secs(secs));
    let mut last_report = Instant::now();

    loop {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            break;
        }

        match receiver.recv_timeout(RECV_TIMEOUT) {
            Ok(frame) => {
                let report = session.process_frame(&frame);
                log_frame(&report);
            }
            Err(RecvTimeoutError::Timeout) => {
                session.poll_calibration();
            }
            Err(RecvTimeoutError::Disconnected) => {
                warn!("Audio input went away");
                break;
            }
        }

        if last_report.elapsed() >= REPORT_INTERVAL {
            last_report = Instant::now();
            if let Some(progress) = session.calibration_progress() {
                info!(
                    "Calibrating... {}s remaining ({} samples)",
                    progress.remaining_secs(),
                    progress.samples_collected
                );
            } else {
                info!("{}", describe_analysis(&session.raga_analysis()));
            }
        }
    }

    drop(stream);
    session.end_capture();

    let analysis = session.raga_analysis();
    if args.json {
        let json = serde_json::to_string_pretty(&analysis)
            .context("Failed to serialize the raga summary")?;
        println!("{json}");
    } else {
        info!("Final: {}", describe_analysis(&analysis));
    }

    Ok(())
}

fn load_config(path: &Path) -> Result<AnalyzerConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: AnalyzerConfig = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

fn log_frame(report: &FrameReport) {
    match (report.frequency, &report.swara, &report.western) {
        (Some(f), Some(swara), Some(western)) => {
            debug!("{f:.1} Hz  {swara}  {western}");
        }
        (Some(f), _, _) => debug!("{f:.1} Hz"),
        _ => {}
    }
}

fn describe_analysis(analysis: &RagaAnalysis) -> String {
    match analysis {
        RagaAnalysis::InsufficientData { remaining_ms, .. } => {
            format!("Analyzing... {}s left", remaining_ms.div_ceil(1000))
        }
        RagaAnalysis::Ready(summary) if summary.groups.is_empty() => {
            "No swaras detected yet".to_owned()
        }
        RagaAnalysis::Ready(summary) => summary
            .groups
            .iter()
            .map(|g| format!("{} {}%", g.variant, g.percentage))
            .collect::<Vec<_>>()
            .join(", "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swara_core::{BaseDegree, RagaSummary, VariantUsage};

    #[test]
    fn describes_pending_analysis() {
        let analysis = RagaAnalysis::InsufficientData {
            elapsed_ms: 3_200,
            remaining_ms: 1_800,
        };
        assert_eq!(describe_analysis(&analysis), "Analyzing... 2s left");
    }

    #[test]
    fn describes_dominant_variants() {
        let usage = |base, variant, percentage| VariantUsage {
            base,
            variant,
            variant_ms: 1_000,
            group_total_ms: 1_000,
            percentage,
            color: None,
        };
        let summary = RagaSummary {
            elapsed_ms: 6_000,
            groups: vec![
                usage(BaseDegree::Sa, "S", 100),
                usage(BaseDegree::Ga, "G3", 75),
            ],
        };
        assert_eq!(
            describe_analysis(&RagaAnalysis::Ready(summary)),
            "S 100%, G3 75%"
        );
    }

    #[test]
    fn parses_flags() {
        let args = Args::parse_from(["swara-monitor", "--tonic", "146.8", "--json", "-vv"]);
        assert_eq!(args.tonic, Some(146.8));
        assert!(args.json);
        assert!(!args.calibrate);
        assert_eq!(args.verbose, 2);
    }
}

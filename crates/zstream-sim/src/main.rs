//! zstream-sim - run the rolling z-score detector over a synthetic stream
//!
//! Usage:
//!   zstream-sim run --points 5000 --seed 7
//!   zstream-sim run --config run.json --format pretty
//!   zstream-sim defaults > run.json

use std::io::{BufWriter, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use zstream_core::{Decision, RollingAnomalyDetector};
use zstream_sim::{RunConfig, SimError, StreamGenerator, StreamPoint, run};

#[derive(Parser)]
#[command(name = "zstream-sim")]
#[command(about = "Rolling z-score anomaly detection over a synthetic stream")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a stream and print one decision per point
    Run {
        /// JSON run configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Points to report (after the pre-roll)
        #[arg(short, long)]
        points: Option<u64>,

        /// Random seed for the stream
        #[arg(short, long)]
        seed: Option<u64>,

        /// Pre-roll points fed to the detector but not reported
        #[arg(long)]
        skip: Option<u64>,

        /// Output format
        #[arg(short, long, default_value = "json")]
        format: OutputFormat,
    },

    /// Print the default run configuration
    Defaults,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// One JSON object per point, then the summary
    Json,
    /// Human-readable lines
    Pretty,
    /// Only the final summary
    Summary,
}

#[derive(Serialize)]
struct Line<'a> {
    index: u64,
    injected: bool,
    #[serde(flatten)]
    decision: &'a Decision,
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run {
            config,
            points,
            seed,
            skip,
            format,
        } => run_command(config, points, seed, skip, format),
        Commands::Defaults => print_defaults(),
    };

    if let Err(e) = result {
        error!(error = %e, "zstream-sim failed");
        std::process::exit(1);
    }
}

fn run_command(
    config: Option<PathBuf>,
    points: Option<u64>,
    seed: Option<u64>,
    skip: Option<u64>,
    format: OutputFormat,
) -> Result<(), SimError> {
    let mut cfg = match config {
        Some(path) => {
            info!(path = %path.display(), "loading run configuration");
            RunConfig::load(path)?
        }
        None => RunConfig::default(),
    };
    if let Some(points) = points {
        cfg.points = points;
    }
    if let Some(seed) = seed {
        cfg.seed = seed;
    }
    if let Some(skip) = skip {
        cfg.skip = skip;
    }

    info!(
        window = cfg.detector.window_size,
        base_threshold = cfg.detector.base_threshold,
        seed = cfg.seed,
        points = cfg.points,
        skip = cfg.skip,
        "starting run"
    );

    let mut detector = RollingAnomalyDetector::new(cfg.detector.clone())?;
    let total = cfg.skip.saturating_add(cfg.points);
    let stream = StreamGenerator::new(cfg.stream.clone(), cfg.seed)?
        .take(usize::try_from(total).unwrap_or(usize::MAX));

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    let summary = run(&mut detector, stream, cfg.skip, |point, decision| {
        write_point(&mut out, format, point, decision)
    })?;

    match format {
        OutputFormat::Pretty => {
            writeln!(
                out,
                "points={} flagged={} injected={} precision={:.3} recall={:.3} f1={:.3}",
                summary.points,
                summary.anomalies_flagged,
                summary.injected,
                summary.precision(),
                summary.recall(),
                summary.f1()
            )?;
        }
        OutputFormat::Json | OutputFormat::Summary => {
            serde_json::to_writer(&mut out, &summary)?;
            writeln!(out)?;
        }
    }
    out.flush()?;
    Ok(())
}

fn write_point(
    out: &mut impl Write,
    format: OutputFormat,
    point: &StreamPoint,
    decision: &Decision,
) -> Result<(), SimError> {
    match format {
        OutputFormat::Json => {
            let line = Line {
                index: point.index,
                injected: point.injected,
                decision,
            };
            serde_json::to_writer(&mut *out, &line)?;
            writeln!(out)?;
        }
        OutputFormat::Pretty => {
            writeln!(
                out,
                "{:>8} {:>10.4} z={:>8.3} thr={:.2} {}{}",
                point.index,
                point.value,
                decision.z_score,
                decision.threshold,
                if decision.is_anomaly { "ANOMALY" } else { "ok" },
                if point.injected { " (injected)" } else { "" }
            )?;
        }
        OutputFormat::Summary => {}
    }
    Ok(())
}

fn print_defaults() -> Result<(), SimError> {
    println!("{}", RunConfig::default().to_json_pretty()?);
    Ok(())
}

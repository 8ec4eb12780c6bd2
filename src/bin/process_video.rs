//! process_video - annotate one lane video and print its congestion report

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use lane_signal::ui::{Ui, UiMode};
use lane_signal::{
    select_backend, Annotator, FileConfig, FileSource, LaneConfig, LanePipeline, LaneReport,
    TextStyle,
};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Detect vehicles in a lane video, write an annotated copy and print a lane report"
)]
struct Args {
    /// Input video path (or `stub://name?frames=N` for a synthetic run).
    #[arg(long, env = "LANE_INPUT")]
    input: String,

    /// Annotated output video path. A `.rgb` extension writes raw RGB24 frames.
    #[arg(long, env = "LANE_OUTPUT")]
    output: PathBuf,

    /// Lane identifier copied into the report.
    #[arg(long, env = "LANE_NAME")]
    lane: String,

    /// ONNX detection model. Without one the simulated detector is used.
    #[arg(long)]
    model: Option<PathBuf>,

    /// Class names file, one label per line (default: coco.names beside the model).
    #[arg(long)]
    labels: Option<PathBuf>,

    /// Model output layout: 'center' or 'corner'.
    #[arg(long)]
    layout: Option<String>,

    /// Seed for the simulated detector.
    #[arg(long)]
    seed: Option<u64>,

    /// TrueType/OpenType font used to render box captions (default: bundled DejaVu Sans).
    #[arg(long)]
    font: Option<PathBuf>,

    /// Caption style: 'decimal' ("car 0.88") or 'percent' ("car 88%").
    #[arg(long)]
    label_style: Option<String>,

    /// Omit `processed_at` from the report.
    #[arg(long)]
    no_timestamp: bool,

    /// Progress output on stderr.
    #[arg(long, value_enum, default_value_t = UiMode::Auto)]
    ui: UiMode,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match run(args) {
        Ok(report) => match report.to_json() {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(err) => fail(anyhow!(err).context("failed to serialize report")),
        },
        Err(err) => fail(err),
    }
}

fn fail(err: anyhow::Error) -> ExitCode {
    log::error!("process_video failed: {:#}", err);
    eprintln!("{}", serde_json::json!({ "error": format!("{:#}", err) }));
    ExitCode::from(1)
}

fn run(args: Args) -> Result<LaneReport> {
    let is_tty = std::io::stderr().is_terminal();
    let stdout_is_tty = std::io::stdout().is_terminal();
    let ui = Ui::new(args.ui, is_tty, !stdout_is_tty);

    let config = {
        let _stage = ui.stage("load configuration");
        let mut config = LaneConfig::load()?;
        apply_args(&mut config, &args)?;
        config.validate()?;
        config
    };

    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create output directory {}", parent.display())
            })?;
        }
    }

    let mut source = {
        let _stage = ui.stage("open input");
        let mut file_config = FileConfig::new(args.input.clone());
        file_config.synthetic_frames = config.synthetic_frames;
        FileSource::new(file_config)?
    };

    let backend = {
        let _stage = ui.stage("load detector");
        select_backend(&config.detector)?
    };
    let text = TextStyle::load(config.annotation.font_path.as_deref())?;
    let annotator = Annotator::new(config.annotation.label_style, text);
    let mut pipeline = LanePipeline::new(backend, annotator, config.suppression);

    let summary = {
        let progress = ui.frames(source.expected_frames());
        pipeline.run_with_progress(&mut source, &args.output, |frames| progress.set(frames))?
    };

    let processed_at = config.timestamp.then(chrono::Utc::now);
    let report = LaneReport::new(&args.lane, &summary.output, summary.aggregate, processed_at);
    log::info!(
        "lane {}: {} frames, {} vehicles, phase {} ({} backend)",
        report.lane,
        summary.frames,
        report.total_vehicles,
        report.phase,
        pipeline.backend_name()
    );
    Ok(report)
}

fn apply_args(config: &mut LaneConfig, args: &Args) -> Result<()> {
    if let Some(model) = &args.model {
        config.detector.model_path = Some(model.clone());
    }
    if let Some(labels) = &args.labels {
        config.detector.labels_path = Some(labels.clone());
    }
    if let Some(layout) = &args.layout {
        config.detector.layout = layout.parse()?;
    }
    if let Some(seed) = args.seed {
        config.detector.seed = Some(seed);
    }
    if let Some(font) = &args.font {
        config.annotation.font_path = Some(font.clone());
    }
    if let Some(style) = &args.label_style {
        config.annotation.label_style = style.parse()?;
    }
    if args.no_timestamp {
        config.timestamp = false;
    }
    Ok(())
}

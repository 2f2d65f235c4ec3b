//! dartscore CLI: replay recorded detections through the scoring pipeline.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use dartscore::io::FrameLog;
use dartscore::{PipelineConfig, ReplayDetector, ScoringPipeline, StabilizerProfile};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "dartscore")]
#[command(about = "Calibrate a dartboard camera and score darts from detector output")]
#[command(version)]
struct Cli {
    /// Log level: off, error, warn, info, debug, trace.
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Emit structured JSON logs through `tracing` (needs the `tracing` feature).
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score every frame of a frame log, printing one JSON result per line.
    Score(ScoreArgs),

    /// Calibrate every frame of a frame log, printing one JSON report per line.
    Calibrate(CalibrateArgs),

    /// Write the default configuration as JSON.
    InitConfig {
        /// Destination file.
        path: PathBuf,

        /// Stabilizer profile to write.
        #[arg(long, value_enum, default_value_t = ProfileArg::Live)]
        profile: ProfileArg,
    },
}

#[derive(Debug, Clone, Args)]
struct ScoreArgs {
    /// Frame log (JSON) with detections per frame.
    #[arg(long)]
    frames: PathBuf,

    /// Pipeline configuration (JSON); defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Stabilizer profile, ignored when --config is given.
    #[arg(long, value_enum, default_value_t = ProfileArg::Live)]
    profile: ProfileArg,

    /// Commit the visit automatically once three darts are stable.
    #[arg(long)]
    commit_after_three: bool,
}

#[derive(Debug, Clone, Args)]
struct CalibrateArgs {
    /// Frame log (JSON) with detections per frame.
    #[arg(long)]
    frames: PathBuf,

    /// Pipeline configuration (JSON).
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ProfileArg {
    Static,
    Live,
}

impl From<ProfileArg> for StabilizerProfile {
    fn from(arg: ProfileArg) -> Self {
        match arg {
            ProfileArg::Static => StabilizerProfile::StaticImage,
            ProfileArg::Live => StabilizerProfile::LiveVideo,
        }
    }
}

fn load_config(path: Option<&Path>, profile: ProfileArg) -> CliResult<PipelineConfig> {
    Ok(match path {
        Some(p) => PipelineConfig::load_json(p)?,
        None => PipelineConfig::for_profile(profile.into()),
    })
}

fn run_score(args: &ScoreArgs) -> CliResult<()> {
    let config = load_config(args.config.as_deref(), args.profile)?;
    let log = FrameLog::load_json(&args.frames)?;
    let pipeline =
        ScoringPipeline::new(config)?.with_calibration_override(log.calibration_override);
    let mut visit = pipeline.new_visit();

    for frame in &log.frames {
        let result =
            pipeline.process_with_detector(&ReplayDetector, &frame.detections, &mut visit);
        println!("{}", serde_json::to_string(&result)?);
        if args.commit_after_three && visit.is_full() {
            visit.commit();
        }
    }
    Ok(())
}

fn run_calibrate(args: &CalibrateArgs) -> CliResult<()> {
    let config = load_config(args.config.as_deref(), ProfileArg::Live)?;
    let log = FrameLog::load_json(&args.frames)?;
    let pipeline =
        ScoringPipeline::new(config)?.with_calibration_override(log.calibration_override);
    for frame in &log.frames {
        println!("{}", serde_json::to_string(&pipeline.calibrate(&frame.detections))?);
    }
    Ok(())
}

fn init_logging(cli: &Cli) -> CliResult<()> {
    if cli.json_logs {
        #[cfg(feature = "tracing")]
        {
            dartscore::init_tracing(true);
            return Ok(());
        }
        #[cfg(not(feature = "tracing"))]
        return Err("--json-logs needs a build with the `tracing` feature".into());
    }
    let level = dartscore::core::parse_level(&cli.log_level)
        .ok_or_else(|| format!("unknown log level '{}'", cli.log_level))?;
    dartscore::core::init_with_level(level)?;
    Ok(())
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;
    match &cli.command {
        Commands::Score(args) => run_score(args),
        Commands::Calibrate(args) => run_calibrate(args),
        Commands::InitConfig { path, profile } => {
            PipelineConfig::for_profile((*profile).into()).write_json(path)?;
            Ok(())
        }
    }
}

//! imu-sync CLI - Command-line interface for imu-sync
//!
//! Commands:
//! - resample: Merge recordings and write the fixed-grid series
//! - stats: Print load statistics for a set of recordings
//! - validate: Check which recordings would be accepted
//! - sync: Build a sync model from anchors and optionally save it
//! - map: Convert times between the sensor and video timelines
//! - schema: Print the input row schema

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use imu_sync::config::{PipelineConfig, DEFAULT_TARGET_HZ};
use imu_sync::error::{ConfigError, LoadError, SchemaError, SyncError};
use imu_sync::ingest::Ingestor;
use imu_sync::pipeline::{load_from_ingestor, Recording};
use imu_sync::schema::{SampleSource, REQUIRED_FIELDS};
use imu_sync::sync::{RecomputeOutcome, SyncModel};
use imu_sync::types::GridPoint;
use imu_sync::IMU_SYNC_VERSION;

/// imu-sync - Resample IMU recordings and align them with video
#[derive(Parser)]
#[command(name = "imu-sync")]
#[command(version = IMU_SYNC_VERSION)]
#[command(about = "Resample IMU recordings onto a fixed grid and align them with video", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log output format
    #[arg(long, default_value = "compact", global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge recordings and write the fixed-grid series
    Resample {
        /// Input files (use - for stdin)
        #[arg(short, long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Print load statistics
    Stats {
        /// Input files (use - for stdin)
        #[arg(short, long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        #[command(flatten)]
        pipeline: PipelineArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check which recordings would be accepted
    Validate {
        /// Input files (use - for stdin)
        #[arg(short, long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Build a sync model from anchors
    Sync {
        /// Start anchor as LOCAL_MS:FOREIGN_MS
        #[arg(long, value_parser = parse_anchor, required_unless_present = "end")]
        start: Option<(f64, f64)>,

        /// End anchor as LOCAL_MS:FOREIGN_MS
        #[arg(long, value_parser = parse_anchor)]
        end: Option<(f64, f64)>,

        /// Save the model to this file
        #[arg(long)]
        save: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Convert times between timelines
    Map {
        /// Saved sync model (identity mapping when omitted)
        #[arg(long)]
        model: Option<PathBuf>,

        /// Conversion direction
        #[arg(long, default_value = "to-foreign")]
        direction: Direction,

        /// Times in milliseconds
        #[arg(required = true, allow_negative_numbers = true)]
        times: Vec<f64>,
    },

    /// Print the input row schema
    Schema {
        /// Output as JSON schema
        #[arg(long)]
        json_schema: bool,
    },
}

#[derive(clap::Args)]
struct PipelineArgs {
    /// Pipeline config file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Grid rate in Hz (overrides the config file)
    #[arg(long)]
    target_hz: Option<u32>,
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one row per line)
    Ndjson,
    /// JSON array of rows
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one grid point per line)
    Ndjson,
    /// Full recording as JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum Direction {
    /// Local (sensor) time to foreign (video) time
    ToForeign,
    /// Foreign (video) time to local (sensor) time
    ToLocal,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&cli) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_logging(cli: &Cli) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else {
        let default_level = match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    };

    let registry = tracing_subscriber::registry().with(filter);
    match cli.log_format {
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_writer(io::stderr))
            .try_init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().pretty().with_writer(io::stderr))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(io::stderr))
            .try_init(),
    }
}

fn run(cli: Cli) -> Result<(), ImuCliError> {
    match cli.command {
        Commands::Resample {
            input,
            output,
            input_format,
            output_format,
            pipeline,
        } => cmd_resample(&input, &output, &input_format, &output_format, &pipeline),

        Commands::Stats {
            input,
            input_format,
            pipeline,
            json,
        } => cmd_stats(&input, &input_format, &pipeline, json),

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, &input_format, json),

        Commands::Sync {
            start,
            end,
            save,
            json,
        } => cmd_sync(start, end, save.as_deref(), json),

        Commands::Map {
            model,
            direction,
            times,
        } => cmd_map(model.as_deref(), direction, &times),

        Commands::Schema { json_schema } => {
            cmd_schema(json_schema);
            Ok(())
        }
    }
}

fn cmd_resample(
    input: &[PathBuf],
    output: &Path,
    input_format: &InputFormat,
    output_format: &OutputFormat,
    pipeline: &PipelineArgs,
) -> Result<(), ImuCliError> {
    let config = resolve_config(pipeline)?;
    let recording = load_files(input, input_format, &config)?;

    let output_data = match output_format {
        OutputFormat::Ndjson => format_points_ndjson(recording.series.points())?,
        OutputFormat::Json => serde_json::to_string(&recording)?,
        OutputFormat::JsonPretty => serde_json::to_string_pretty(&recording)?,
    };

    if output.to_string_lossy() == "-" {
        print!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    Ok(())
}

fn cmd_stats(
    input: &[PathBuf],
    input_format: &InputFormat,
    pipeline: &PipelineArgs,
    json: bool,
) -> Result<(), ImuCliError> {
    let config = resolve_config(pipeline)?;
    let recording = load_files(input, input_format, &config)?;
    let stats = recording.stats;

    let report = StatsReport {
        recording_id: recording.id.to_string(),
        start: recording.series.start_timestamp_string(),
        duration: stats.duration_hms(),
        target_hz: recording.series.target_hz(),
        total_samples: stats.total_samples,
        expected_samples: stats.expected_samples,
        raw_samples: stats.raw_samples,
        missing_ratio: stats.missing_ratio,
        skipped_sources: recording.skipped.len(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Recording Stats");
        println!("===============");
        println!("Start:            {}", report.start.as_deref().unwrap_or("-"));
        println!("Duration:         {}", report.duration);
        println!("Grid rate:        {} Hz", report.target_hz);
        println!("Grid samples:     {}", report.total_samples);
        println!("Expected samples: {}", report.expected_samples);
        println!("Raw samples:      {}", report.raw_samples);
        println!("Missing ratio:    {:.1}%", report.missing_ratio * 100.0);
        if report.skipped_sources > 0 {
            println!("Skipped sources:  {}", report.skipped_sources);
        }
    }

    Ok(())
}

fn cmd_validate(
    input: &[PathBuf],
    input_format: &InputFormat,
    json: bool,
) -> Result<(), ImuCliError> {
    let ingestor = read_sources(input, input_format);
    let skipped = ingestor.skipped().to_vec();

    let report = ValidationReport {
        total_sources: input.len(),
        valid_sources: input.len() - skipped.len(),
        invalid_sources: skipped.len(),
        errors: skipped
            .iter()
            .map(|s| ValidationErrorDetail {
                source: s.name.clone(),
                error: s.reason.to_string(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total sources:   {}", report.total_sources);
        println!("Valid sources:   {}", report.valid_sources);
        println!("Invalid sources: {}", report.invalid_sources);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!("  - {}: {}", err.source, err.error);
            }
        }
    }

    if report.valid_sources == 0 {
        Err(ImuCliError::NoValidSources)
    } else {
        Ok(())
    }
}

fn cmd_sync(
    start: Option<(f64, f64)>,
    end: Option<(f64, f64)>,
    save: Option<&Path>,
    json: bool,
) -> Result<(), ImuCliError> {
    let mut model = SyncModel::new();
    let mut outcome = None;

    if let Some((local, foreign)) = start {
        outcome = Some(model.set_start_anchor(local, foreign));
    }
    if let Some((local, foreign)) = end {
        outcome = Some(model.set_end_anchor(local, foreign));
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&model)?);
    } else {
        let params = model.params();
        println!("State:  {:?}", model.state());
        println!("Offset: {:.0} ms", params.offset_ms);
        println!("Scale:  {:.6}", params.scale_factor);
    }

    if let Some(path) = save {
        fs::write(path, serde_json::to_string_pretty(&model)?)?;
    }

    match outcome {
        Some(RecomputeOutcome::CoincidentAnchors) => Err(ImuCliError::CoincidentAnchors),
        _ => Ok(()),
    }
}

fn cmd_map(model: Option<&Path>, direction: Direction, times: &[f64]) -> Result<(), ImuCliError> {
    let model: SyncModel = match model {
        Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
        None => SyncModel::new(),
    };

    for &t in times {
        let mapped = match direction {
            Direction::ToForeign => model.to_foreign(t),
            Direction::ToLocal => model.to_local(t)?,
        };
        println!("{}\t{}", t, mapped);
    }

    Ok(())
}

fn cmd_schema(json_schema: bool) {
    if json_schema {
        println!("{}", get_input_json_schema());
    } else {
        println!("Input rows (one object per sample):");
        println!();
        println!("  timestamp  string  yyyy/MM/dd HH:mm:ss.SSS");
        println!("  accelX/Y/Z number  acceleration in g");
        println!("  gyroX/Y/Z  number  angular rate in deg/s");
        println!();
        println!(
            "A source missing any of {:?} in every row is skipped.",
            REQUIRED_FIELDS
        );
        println!("Rows with a blank value or unreadable timestamp are dropped.");
        println!("Default grid rate: {} Hz", DEFAULT_TARGET_HZ);
    }
}

// Helper functions

fn resolve_config(args: &PipelineArgs) -> Result<PipelineConfig, ImuCliError> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_json(&fs::read_to_string(path)?)?,
        None => PipelineConfig::default(),
    };
    if let Some(hz) = args.target_hz {
        config.target_hz = hz;
    }
    config.validate()?;
    Ok(config)
}

fn read_input(path: &Path) -> io::Result<String> {
    if path.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        fs::read_to_string(path)
    }
}

fn parse_source(name: &str, data: &str, format: &InputFormat) -> Result<SampleSource, SchemaError> {
    match format {
        InputFormat::Ndjson => SampleSource::from_ndjson(name, data),
        InputFormat::Json => SampleSource::from_json_array(name, data),
    }
}

/// Feed every input into an ingestor, marking unreadable files as skipped
fn read_sources(input: &[PathBuf], format: &InputFormat) -> Ingestor {
    let mut ingestor = Ingestor::new();

    for path in input {
        let name = path.display().to_string();
        let source = read_input(path)
            .map_err(|e| e.to_string())
            .and_then(|data| parse_source(&name, &data, format).map_err(|e| e.to_string()));

        match source {
            Ok(source) => {
                ingestor.add_source(&source);
            }
            Err(message) => ingestor.mark_unreadable(name, message),
        }
    }

    ingestor
}

fn load_files(
    input: &[PathBuf],
    format: &InputFormat,
    config: &PipelineConfig,
) -> Result<Recording, ImuCliError> {
    let ingestor = read_sources(input, format);
    Ok(load_from_ingestor(ingestor, config)?)
}

fn format_points_ndjson(points: &[GridPoint]) -> Result<String, ImuCliError> {
    let mut lines: Vec<String> = Vec::with_capacity(points.len());
    for point in points {
        lines.push(serde_json::to_string(point)?);
    }
    Ok(lines.join("\n") + "\n")
}

fn parse_anchor(value: &str) -> Result<(f64, f64), String> {
    let (local, foreign) = value
        .split_once(':')
        .ok_or_else(|| format!("expected LOCAL_MS:FOREIGN_MS, got {:?}", value))?;
    let local = local
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid local time: {}", e))?;
    let foreign = foreign
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid foreign time: {}", e))?;
    Ok((local, foreign))
}

fn get_input_json_schema() -> String {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "imu_sample_row",
        "description": "One IMU reading as exported by the recording app",
        "type": "object",
        "required": REQUIRED_FIELDS,
        "properties": {
            "timestamp": {
                "type": "string",
                "pattern": "^\\d{4}/\\d{2}/\\d{2} \\d{2}:\\d{2}:\\d{2}(\\.\\d+)?$"
            },
            "accelX": { "type": "number" },
            "accelY": { "type": "number" },
            "accelZ": { "type": "number" },
            "gyroX": { "type": "number" },
            "gyroY": { "type": "number" },
            "gyroZ": { "type": "number" }
        }
    })
    .to_string()
}

// Error types

#[derive(Debug)]
enum ImuCliError {
    Io(io::Error),
    Load(LoadError),
    Config(ConfigError),
    Json(serde_json::Error),
    Sync(SyncError),
    NoValidSources,
    CoincidentAnchors,
}

impl From<io::Error> for ImuCliError {
    fn from(e: io::Error) -> Self {
        ImuCliError::Io(e)
    }
}

impl From<LoadError> for ImuCliError {
    fn from(e: LoadError) -> Self {
        ImuCliError::Load(e)
    }
}

impl From<ConfigError> for ImuCliError {
    fn from(e: ConfigError) -> Self {
        ImuCliError::Config(e)
    }
}

impl From<serde_json::Error> for ImuCliError {
    fn from(e: serde_json::Error) -> Self {
        ImuCliError::Json(e)
    }
}

impl From<SyncError> for ImuCliError {
    fn from(e: SyncError) -> Self {
        ImuCliError::Sync(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<ImuCliError> for CliError {
    fn from(e: ImuCliError) -> Self {
        match e {
            ImuCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            ImuCliError::Load(e) => CliError {
                code: "LOAD_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'imu-sync validate' for per-source details".to_string()),
            },
            ImuCliError::Config(e) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check the config file and --target-hz".to_string()),
            },
            ImuCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            ImuCliError::Sync(e) => CliError {
                code: "SYNC_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Set anchors with distinct video times".to_string()),
            },
            ImuCliError::NoValidSources => CliError {
                code: "NO_VALID_SOURCES".to_string(),
                message: "No input source passed validation".to_string(),
                hint: Some("Run 'imu-sync schema' for the required fields".to_string()),
            },
            ImuCliError::CoincidentAnchors => CliError {
                code: "COINCIDENT_ANCHORS".to_string(),
                message: "Start and end anchors share a local time; mapping unchanged"
                    .to_string(),
                hint: Some("Pick end anchor at a different sensor time".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct StatsReport {
    recording_id: String,
    start: Option<String>,
    duration: String,
    target_hz: u32,
    total_samples: usize,
    expected_samples: usize,
    raw_samples: usize,
    missing_ratio: f64,
    skipped_sources: usize,
}

#[derive(serde::Serialize)]
struct ValidationReport {
    total_sources: usize,
    valid_sources: usize,
    invalid_sources: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    source: String,
    error: String,
}

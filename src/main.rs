use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Duration, FixedOffset};
use clap::{ArgAction, Parser, ValueHint};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use xtrainer::processing::ConvertOptions;
use xtrainer::processing::display::summary_lines;
use xtrainer::processing::types::{DEFAULT_MERGE_TOLERANCE_SECONDS, DEFAULT_SESSION_GAP_SECONDS};
use xtrainer::tcx::OutputZone;
use xtrainer::upload::{CommandUploader, DEFAULT_UPLOADER};
use xtrainer::{RunConfig, upload_sessions, write_sessions};

#[derive(Parser, Debug)]
#[command(author, version, about = "Convert X-Trainer CSV exports to Garmin TCX", long_about = None)]
struct Cli {
    /// X-Trainer exports named like `XTR202403101800.csv`
    #[arg(required = true, value_hint = ValueHint::FilePath)]
    inputs: Vec<PathBuf>,

    /// Directory the TCX files are written to
    #[arg(short, long, default_value = ".", value_hint = ValueHint::DirPath)]
    output_dir: PathBuf,

    /// UTC offset of the trainer clock, e.g. `+01:00` (defaults to the system zone)
    #[arg(long, value_parser = parse_utc_offset, allow_hyphen_values = true)]
    utc_offset: Option<FixedOffset>,

    /// Gap (seconds) that starts a new session; also the longest bridged rest
    #[arg(long, default_value_t = DEFAULT_SESSION_GAP_SECONDS, value_parser = clap::value_parser!(i64).range(1..))]
    session_gap: i64,

    /// A file starting less than this many seconds after a lap continues it
    #[arg(long, default_value_t = DEFAULT_MERGE_TOLERANCE_SECONDS, value_parser = clap::value_parser!(i64).range(0..))]
    merge_tolerance: i64,

    /// Upload the written files to Garmin Connect
    #[arg(long, action = ArgAction::SetTrue)]
    upload: bool,

    /// Garmin Connect username
    #[arg(short, long, env = "GARMIN_USERNAME")]
    username: Option<String>,

    /// Garmin Connect password (visible in the process list; omit it to use ~/.guploadrc)
    #[arg(short, long, env = "GARMIN_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// garmin-uploader compatible program used for uploads
    #[arg(long, default_value = DEFAULT_UPLOADER, value_hint = ValueHint::CommandName)]
    uploader: String,

    /// Debug logging and a chatty uploader
    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,
}

fn parse_utc_offset(raw: &str) -> Result<FixedOffset, String> {
    let invalid = || format!("expected an offset like +01:00, got '{raw}'");

    let (sign, rest) = match raw.as_bytes().first() {
        Some(b'+') => (1, &raw[1..]),
        Some(b'-') => (-1, &raw[1..]),
        _ => return Err(invalid()),
    };
    let (hours, minutes) = rest.split_once(':').ok_or_else(invalid)?;
    let hours: i32 = hours.parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
    if !(0..60).contains(&minutes) {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

impl Cli {
    fn run_config(&self) -> RunConfig {
        let uploader = self.upload.then(|| CommandUploader {
            program: self.uploader.clone().into(),
            username: self.username.clone(),
            password: self.password.clone(),
            verbose: self.verbose,
        });

        RunConfig {
            inputs: self.inputs.clone(),
            output_dir: self.output_dir.clone(),
            zone: self.utc_offset.map_or(OutputZone::Local, OutputZone::Fixed),
            options: ConvertOptions {
                merge_tolerance: Duration::seconds(self.merge_tolerance),
                session_gap: Duration::seconds(self.session_gap),
                ..ConvertOptions::default()
            },
            uploader,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_filter = if cli.verbose {
        "xtrainer=debug,x_trainer_convert=debug,info"
    } else {
        "xtrainer=info,x_trainer_convert=info,warn"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let config = cli.run_config();
    let mut report = write_sessions(&config).with_context(|| {
        format!(
            "failed to convert {} file(s) into {}",
            config.inputs.len(),
            config.output_dir.display()
        )
    })?;

    for written in &report.sessions {
        println!("{}", written.path.display());
        for line in summary_lines(&written.summary) {
            println!("  {line}");
        }
    }

    upload_sessions(&config, &mut report).context("upload to Garmin Connect failed")?;
    if config.uploader.is_some() {
        info!(uploaded = report.uploaded, "all sessions uploaded");
    }
    Ok(())
}

pub mod processing;
pub mod tcx;
pub mod upload;

use std::path::PathBuf;

use processing::{ConvertError, ConvertOptions, SessionSummary, convert_files, summarize_session};
use tcx::{OutputZone, file_name, render_session, write_document};
use tracing::info;
use upload::{CommandUploader, upload_all};

/// Everything one invocation of the converter needs.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub inputs: Vec<PathBuf>,
    pub output_dir: PathBuf,
    pub zone: OutputZone,
    pub options: ConvertOptions,
    /// Upload each written file when set.
    pub uploader: Option<CommandUploader>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            output_dir: PathBuf::from("."),
            zone: OutputZone::default(),
            options: ConvertOptions::default(),
            uploader: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WrittenSession {
    pub path: PathBuf,
    pub summary: SessionSummary,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    pub sessions: Vec<WrittenSession>,
    pub uploaded: usize,
}

/// Convert the configured inputs and write one TCX file per session.
///
/// Every session is rendered before the first file is written, so a bad
/// input or an unrepresentable timestamp leaves the output directory alone.
pub fn write_sessions(config: &RunConfig) -> Result<RunReport, ConvertError> {
    let sessions = convert_files(&config.inputs, &config.options)?;

    let rendered = sessions
        .iter()
        .map(|session| render_session(session, &config.zone).map(|xml| (session, xml)))
        .collect::<Result<Vec<_>, _>>()?;

    let mut report = RunReport::default();
    for (session, xml) in rendered {
        let path = write_document(&config.output_dir, &file_name(session), &xml)?;
        report.sessions.push(WrittenSession {
            path,
            summary: summarize_session(session),
        });
    }
    Ok(report)
}

/// Hand the files in `report` to the configured uploader, if any.
pub fn upload_sessions(config: &RunConfig, report: &mut RunReport) -> Result<(), ConvertError> {
    if let Some(uploader) = &config.uploader {
        let files: Vec<PathBuf> = report.sessions.iter().map(|s| s.path.clone()).collect();
        report.uploaded = upload_all(uploader, &files)?;
    }
    Ok(())
}

/// Convert, write and optionally upload.
pub fn run(config: &RunConfig) -> Result<RunReport, ConvertError> {
    let mut report = write_sessions(config)?;
    upload_sessions(config, &mut report)?;

    info!(
        sessions = report.sessions.len(),
        uploaded = report.uploaded,
        "conversion finished"
    );
    Ok(report)
}

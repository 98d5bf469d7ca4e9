pub mod curve;
pub mod display;
pub mod lap;
pub mod merge;
pub mod parse;
pub mod rest;
pub mod segment;
pub mod summary;
pub mod types;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use curve::recompute_curves;
use merge::merge_files;
use parse::{parse_readings, parse_start_time};
use rest::interleave_rest_laps;
use segment::split_sessions;

pub use lap::Lap;
pub use summary::summarize_session;
pub use types::{
    ConvertError, ConvertOptions, Field, Intensity, Reading, Sample, Session, SessionSummary,
    SourceFile,
};

/// Read one export: start time from its name, readings from its rows.
pub fn read_source(path: &Path) -> Result<SourceFile, ConvertError> {
    let start = parse_start_time(path)?;
    let name = path.display().to_string();
    let bytes = fs::read(path).map_err(|source| ConvertError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let content =
        String::from_utf8(bytes).map_err(|err| ConvertError::format(&name, err.to_string()))?;
    let readings = parse_readings(&name, &content)?;
    debug!(file = %name, %start, readings = readings.len(), "read X-Trainer export");

    Ok(SourceFile {
        name,
        start,
        readings,
    })
}

/// Convert a set of X-Trainer exports into finished sessions.
///
/// The paths are sorted and de-duplicated, then every file is read before any
/// lap is built, so a single malformed file aborts the whole run.
pub fn convert_files<P: AsRef<Path>>(
    paths: &[P],
    options: &ConvertOptions,
) -> Result<Vec<Session>, ConvertError> {
    let mut files: Vec<PathBuf> = paths.iter().map(|path| path.as_ref().to_path_buf()).collect();
    files.sort();
    files.dedup();

    let sources = files
        .iter()
        .map(|path| read_source(path))
        .collect::<Result<Vec<_>, _>>()?;

    build_sessions(sources, options)
}

/// Run the core pipeline over already decoded files.
///
/// The function performs four stages:
/// 1. [`merge::merge_files`] joins continuation files into laps.
/// 2. [`segment::split_sessions`] cuts the lap list at long gaps.
/// 3. [`rest::interleave_rest_laps`] bridges the gaps left inside a session.
/// 4. [`curve::recompute_curves`] writes cumulative distance and the
///    floor-adjusted altitude.
pub fn build_sessions(
    sources: Vec<SourceFile>,
    options: &ConvertOptions,
) -> Result<Vec<Session>, ConvertError> {
    let laps = merge_files(sources, options.merge_tolerance);

    let mut sessions = Vec::new();
    for group in split_sessions(laps, options.session_gap) {
        let mut laps = interleave_rest_laps(group, options.max_rest())?;
        recompute_curves(&mut laps, options.altitude_floor);
        sessions.extend(Session::new(laps));
    }

    for session in &sessions {
        info!(
            start = %session.start_time(),
            end = %session.end_time(),
            laps = session.laps().len(),
            "built session"
        );
    }
    Ok(sessions)
}

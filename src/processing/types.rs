use std::fmt;
use std::path::PathBuf;

use chrono::{Duration, NaiveDateTime};
use thiserror::Error;

use crate::processing::lap::Lap;

/// Column names expected on the `col` header row, in file order.
pub const COLUMN_NAMES: [&str; 6] = ["time", "pulse", "rpm", "watt", "climb%", "km/t"];

/// Only version of the X-Trainer export format understood by the parser.
pub const FORMAT_VERSION: &str = "4";

pub const DEFAULT_MERGE_TOLERANCE_SECONDS: i64 = 5;
pub const DEFAULT_SESSION_GAP_SECONDS: i64 = 20 * 60;
pub const DEFAULT_ALTITUDE_FLOOR_METERS: f64 = 10.0;

/// Rolling windows (in seconds) reported as maximum power in a session summary.
pub const MAX_POWER_WINDOWS: [usize; 5] = [1, 10, 30, 60, 120];

/// One data row of an X-Trainer CSV file before timestamps are derived.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub pulse: i32,
    pub cadence: i32,
    pub power: i32,
    /// Hill grade as 10x the percentage.
    pub grade: i32,
    /// Speed in km/h.
    pub speed: f64,
}

/// One second of telemetry inside a lap.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub time: NaiveDateTime,
    /// Heart rate in bpm, 0 when no strap was connected.
    pub pulse: i32,
    pub cadence: i32,
    pub power: i32,
    pub grade: i32,
    /// Speed in km/h.
    pub speed: f64,
    /// Meters travelled during this second.
    pub distance_delta: f64,
    /// Meters climbed during this second.
    pub altitude_delta: f64,
    /// Cumulative distance, written by the curve passes.
    pub distance: f64,
    /// Cumulative altitude, written by the curve passes.
    pub altitude: f64,
}

/// Numeric sample fields that can be aggregated over a lap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Pulse,
    Cadence,
    Power,
    Grade,
    Speed,
    DistanceDelta,
    AltitudeDelta,
    Distance,
    Altitude,
}

impl Sample {
    pub fn value(&self, field: Field) -> f64 {
        match field {
            Field::Pulse => f64::from(self.pulse),
            Field::Cadence => f64::from(self.cadence),
            Field::Power => f64::from(self.power),
            Field::Grade => f64::from(self.grade),
            Field::Speed => self.speed,
            Field::DistanceDelta => self.distance_delta,
            Field::AltitudeDelta => self.altitude_delta,
            Field::Distance => self.distance,
            Field::Altitude => self.altitude,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Intensity {
    #[default]
    Active,
    Resting,
}

impl Intensity {
    pub fn as_str(self) -> &'static str {
        match self {
            Intensity::Active => "Active",
            Intensity::Resting => "Resting",
        }
    }
}

impl fmt::Display for Intensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An input file after its name and rows have been decoded.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Name used in log and error messages.
    pub name: String,
    /// Nominal start time taken from the file name.
    pub start: NaiveDateTime,
    pub readings: Vec<Reading>,
}

/// Thresholds that drive lap merging, session splitting and the altitude floor.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// A file starting less than this after the previous lap's end continues that lap.
    pub merge_tolerance: Duration,
    /// Gaps strictly longer than this split sessions. Also the longest rest that
    /// may be bridged with a synthesized lap.
    pub session_gap: Duration,
    /// Lowest altitude of every session after the floor adjustment.
    pub altitude_floor: f64,
}

impl ConvertOptions {
    pub fn max_rest(&self) -> Duration {
        self.session_gap
    }
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            merge_tolerance: Duration::seconds(DEFAULT_MERGE_TOLERANCE_SECONDS),
            session_gap: Duration::seconds(DEFAULT_SESSION_GAP_SECONDS),
            altitude_floor: DEFAULT_ALTITUDE_FLOOR_METERS,
        }
    }
}

/// One continuous workout: active laps with resting laps interleaved.
#[derive(Debug, Clone)]
pub struct Session {
    laps: Vec<Lap>,
}

impl Session {
    /// Wrap a lap list, returning `None` when there is nothing to wrap.
    pub fn new(laps: Vec<Lap>) -> Option<Self> {
        if laps.is_empty() {
            None
        } else {
            Some(Self { laps })
        }
    }

    pub fn laps(&self) -> &[Lap] {
        &self.laps
    }

    pub fn start_time(&self) -> NaiveDateTime {
        self.laps[0].start_time()
    }

    pub fn end_time(&self) -> NaiveDateTime {
        self.laps[self.laps.len() - 1].end_time()
    }
}

/// Derived overview metrics for one session. Displayed, never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSummary {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub active_laps: usize,
    pub resting_laps: usize,
    /// Elapsed seconds summed over active laps only.
    pub active_seconds: f64,
    /// Elapsed seconds summed over every lap.
    pub total_seconds: f64,
    pub distance_meters: f64,
    pub power_mean: Option<f64>,
    /// `(window seconds, watts)` for each of [`MAX_POWER_WINDOWS`].
    pub power_max: Vec<(usize, f64)>,
    pub speed_max_kmh: Option<f64>,
    pub heart_rate_mean: Option<f64>,
    pub heart_rate_max: Option<f64>,
}

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("invalid X-Trainer file {file}: {reason}")]
    Format { file: String, reason: String },
    #[error("rest gap of {gap_seconds}s exceeds the {max_seconds}s limit")]
    GapTooLarge { gap_seconds: i64, max_seconds: i64 },
    #[error("failed to upload {}: {reason}", file.display())]
    Upload { file: PathBuf, reason: String },
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConvertError {
    pub fn format(file: impl Into<String>, reason: impl Into<String>) -> Self {
        ConvertError::Format {
            file: file.into(),
            reason: reason.into(),
        }
    }
}

use chrono::Duration;
use tracing::debug;

use crate::processing::lap::Lap;
use crate::processing::types::{ConvertError, Intensity, Reading};

pub const REST_CADENCE: i32 = 70;
pub const REST_POWER: i32 = 100;
pub const REST_SPEED_KMH: f64 = 15.0;
pub const REST_PULSE_FLOOR: f64 = 130.0;
pub const REST_PULSE_DROP_PER_MINUTE: f64 = 20.0;

/// Synthesize the resting lap that bridges `previous` and `next`.
///
/// The lap covers every second strictly between the two laps, so its last
/// sample sits one second before `next` starts. Returns `Ok(None)` when the
/// laps are back to back.
pub fn rest_lap(previous: &Lap, next: &Lap, max_rest: Duration) -> Result<Option<Lap>, ConvertError> {
    let gap = next.start_time() - previous.end_time();
    if gap > max_rest {
        return Err(ConvertError::GapTooLarge {
            gap_seconds: gap.num_seconds(),
            max_seconds: max_rest.num_seconds(),
        });
    }

    let one_second = Duration::seconds(1);
    if gap <= one_second {
        return Ok(None);
    }

    let mut lap = Lap::resting(previous.end_time() + one_second);
    let start_pulse = previous.last_pulse().map_or(0.0, f64::from);

    for elapsed in 0..(gap - one_second).num_seconds() {
        // Drop computed from the elapsed time so whole beats stay exact.
        let pulse = start_pulse - elapsed as f64 * REST_PULSE_DROP_PER_MINUTE / 60.0;
        lap.push(Reading {
            pulse: pulse.max(REST_PULSE_FLOOR).floor() as i32,
            cadence: REST_CADENCE,
            power: REST_POWER,
            grade: 0,
            speed: REST_SPEED_KMH,
        });
    }

    debug!(
        start = %lap.start_time(),
        seconds = lap.len(),
        "synthesized rest lap"
    );
    Ok(Some(lap))
}

/// Insert a resting lap after every active lap that is followed by a gap.
pub fn interleave_rest_laps(laps: Vec<Lap>, max_rest: Duration) -> Result<Vec<Lap>, ConvertError> {
    let mut interleaved = Vec::with_capacity(laps.len() * 2);
    let mut laps = laps.into_iter().peekable();

    while let Some(lap) = laps.next() {
        let rest = match laps.peek() {
            Some(next)
                if lap.intensity() == Intensity::Active && next.intensity() == Intensity::Active =>
            {
                rest_lap(&lap, next, max_rest)?
            }
            _ => None,
        };
        interleaved.push(lap);
        interleaved.extend(rest);
    }

    Ok(interleaved)
}

use tracing::debug;

use crate::processing::lap::Lap;
use crate::processing::types::Field;

/// Rewrite cumulative distance across `laps`, threading the running offset
/// from one lap into the next. Returns the final cumulative distance.
pub fn accumulate_distance(laps: &mut [Lap], start: f64) -> f64 {
    laps.iter_mut()
        .fold(start, |offset, lap| lap.update_distance(offset))
}

/// Rewrite cumulative altitude across `laps`. Returns the final altitude.
pub fn accumulate_altitude(laps: &mut [Lap], start: f64) -> f64 {
    laps.iter_mut()
        .fold(start, |offset, lap| lap.update_altitude(offset))
}

pub fn minimum_altitude(laps: &[Lap]) -> Option<f64> {
    laps.iter()
        .filter_map(|lap| lap.minimum(Field::Altitude))
        .reduce(f64::min)
}

/// Recompute the distance and altitude curves of a whole session.
///
/// Altitude is computed twice: once from zero to find the session's lowest
/// point, then again shifted so that lowest point sits at `altitude_floor`.
/// Garmin Connect renders altitude charts poorly below about -500 m, so the
/// shift is applied to every session.
pub fn recompute_curves(laps: &mut [Lap], altitude_floor: f64) {
    let distance = accumulate_distance(laps, 0.0);
    accumulate_altitude(laps, 0.0);

    if let Some(lowest) = minimum_altitude(laps) {
        let end = accumulate_altitude(laps, altitude_floor - lowest);
        debug!(distance, lowest, end_altitude = end, "recomputed session curves");
    }
}

use crate::processing::lap::Lap;
use crate::processing::types::{Field, Intensity, MAX_POWER_WINDOWS, Session, SessionSummary};

/// Derive the overview metrics shown after a session has been converted.
pub fn summarize_session(session: &Session) -> SessionSummary {
    summarize_laps(session.laps())
}

pub fn summarize_laps(laps: &[Lap]) -> SessionSummary {
    let (active, resting): (Vec<&Lap>, Vec<&Lap>) = laps
        .iter()
        .partition(|lap| lap.intensity() == Intensity::Active);

    let sample_count: usize = laps.iter().map(Lap::len).sum();
    let power_total: f64 = laps.iter().map(|lap| lap.sum(Field::Power)).sum();
    let power_mean = (sample_count > 0).then(|| power_total / sample_count as f64);

    let power_max = MAX_POWER_WINDOWS
        .iter()
        .filter_map(|&window| {
            laps.iter()
                .filter_map(|lap| lap.max_average(Field::Power, window))
                .reduce(f64::max)
                .map(|watts| (window, watts))
        })
        .collect();

    let heart_rates: Vec<f64> = laps
        .iter()
        .flat_map(|lap| lap.samples())
        .filter(|sample| sample.pulse > 0)
        .map(|sample| f64::from(sample.pulse))
        .collect();
    let heart_rate_mean = if heart_rates.is_empty() {
        None
    } else {
        Some(heart_rates.iter().sum::<f64>() / heart_rates.len() as f64)
    };

    SessionSummary {
        start: laps.first().map(Lap::start_time),
        end: laps.last().map(Lap::end_time),
        active_laps: active.len(),
        resting_laps: resting.len(),
        active_seconds: active.iter().map(|lap| lap.total_time_seconds()).sum(),
        total_seconds: laps.iter().map(Lap::total_time_seconds).sum(),
        distance_meters: laps.iter().map(Lap::distance_meters).sum(),
        power_mean,
        power_max,
        speed_max_kmh: laps
            .iter()
            .filter_map(|lap| lap.maximum(Field::Speed))
            .reduce(f64::max),
        heart_rate_mean,
        heart_rate_max: heart_rates.iter().copied().reduce(f64::max),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::lap::tests::{at, reading};
    use crate::processing::types::Reading;

    #[test]
    fn empty_lap_list_has_no_metrics() {
        let summary = summarize_laps(&[]);
        assert_eq!(summary.start, None);
        assert_eq!(summary.power_mean, None);
        assert!(summary.power_max.is_empty());
        assert_eq!(summary.speed_max_kmh, None);
    }

    #[test]
    fn metrics_span_active_and_resting_laps() {
        let mut first = Lap::active(at(18, 0, 0));
        first.extend((0..60).map(|i| reading(if i < 10 { 400 } else { 200 }, 0, 36.0)));
        let mut rest = Lap::resting(at(18, 1, 0));
        rest.extend((0..20).map(|_| Reading {
            pulse: 0,
            ..reading(100, 0, 15.0)
        }));
        let mut second = Lap::active(at(18, 1, 20));
        second.extend((0..30).map(|_| reading(250, 0, 40.0)));

        let summary = summarize_laps(&[first, rest, second]);

        assert_eq!(summary.active_laps, 2);
        assert_eq!(summary.resting_laps, 1);
        assert_eq!(summary.active_seconds, 59.0 + 29.0);
        assert_eq!(summary.total_seconds, 59.0 + 19.0 + 29.0);
        assert_eq!(summary.start, Some(at(18, 0, 0)));
        assert_eq!(summary.end, Some(at(18, 1, 49)));

        let expected_mean = (10.0 * 400.0 + 50.0 * 200.0 + 20.0 * 100.0 + 30.0 * 250.0) / 110.0;
        assert!((summary.power_mean.expect("power") - expected_mean).abs() < 1e-9);

        assert_eq!(summary.power_max[0], (1, 400.0));
        assert_eq!(summary.power_max[1], (10, 400.0));
        assert_eq!(summary.power_max[2], (30, (10.0 * 400.0 + 20.0 * 200.0) / 30.0));
        assert_eq!(summary.power_max[3], (60, (10.0 * 400.0 + 50.0 * 200.0) / 60.0));
        assert_eq!(summary.power_max[4].0, 120);

        assert_eq!(summary.speed_max_kmh, Some(40.0));
        assert_eq!(summary.heart_rate_mean, Some(140.0));
        assert_eq!(summary.heart_rate_max, Some(140.0));
    }
}

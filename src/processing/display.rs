use crate::processing::types::SessionSummary;

/// `H:MM:SS`, the way the converter has always printed elapsed time.
pub fn format_duration(seconds: f64) -> String {
    let rounded = seconds.round().max(0.0) as u64;
    let hours = rounded / 3600;
    let minutes = (rounded % 3600) / 60;
    let seconds = rounded % 60;
    format!("{}:{:02}:{:02}", hours, minutes, seconds)
}

pub fn format_distance(meters: f64) -> String {
    format!("{:.2}km", meters / 1000.0)
}

fn format_watts(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(watts) if watts.is_finite() => format!("{:.*}W", decimals, watts),
        _ => "—".to_string(),
    }
}

/// Human-readable lines describing one converted session.
pub fn summary_lines(summary: &SessionSummary) -> Vec<String> {
    let mut lines = Vec::new();

    if let (Some(start), Some(end)) = (summary.start, summary.end) {
        lines.push(format!(
            "session: {} -> {} ({} active, {} resting laps)",
            start, end, summary.active_laps, summary.resting_laps
        ));
    }
    lines.push(format!(
        "active time: {}",
        format_duration(summary.active_seconds)
    ));
    lines.push(format!(
        "total time: {}",
        format_duration(summary.total_seconds)
    ));
    lines.push(format!(
        "total distance: {}",
        format_distance(summary.distance_meters)
    ));
    lines.push(format!("avg watt: {}", format_watts(summary.power_mean, 2)));
    for (window, watts) in &summary.power_max {
        lines.push(format!(
            "max {}s watt: {}",
            window,
            format_watts(Some(*watts), 0)
        ));
    }
    if let Some(speed) = summary.speed_max_kmh {
        lines.push(format!("max speed: {}km/t", speed));
    }
    if let (Some(mean), Some(max)) = (summary.heart_rate_mean, summary.heart_rate_max) {
        lines.push(format!("heart rate: {:.0} avg, {:.0} max bpm", mean, max));
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_render_as_hours_minutes_seconds() {
        assert_eq!(format_duration(0.0), "0:00:00");
        assert_eq!(format_duration(59.4), "0:00:59");
        assert_eq!(format_duration(3725.0), "1:02:05");
    }

    #[test]
    fn summary_lines_include_power_windows() {
        let summary = SessionSummary {
            active_seconds: 1800.0,
            total_seconds: 2100.0,
            distance_meters: 15_432.1,
            power_mean: Some(187.456),
            power_max: vec![(1, 412.0), (10, 388.6)],
            speed_max_kmh: Some(41.0),
            ..SessionSummary::default()
        };

        let lines = summary_lines(&summary);
        assert_eq!(
            lines,
            vec![
                "active time: 0:30:00",
                "total time: 0:35:00",
                "total distance: 15.43km",
                "avg watt: 187.46W",
                "max 1s watt: 412W",
                "max 10s watt: 389W",
                "max speed: 41km/t",
            ]
        );
    }
}

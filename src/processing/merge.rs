use chrono::Duration;
use tracing::{debug, info};

use crate::processing::lap::Lap;
use crate::processing::types::SourceFile;

/// Append one file's readings to the lap list.
///
/// The X-Trainer splits long rides into several exports and rounds their
/// start to the minute, so a file that starts less than `tolerance` after the
/// previous lap ends (or overlaps it) continues that lap. Files without any
/// readings leave the list untouched. A file that does not start after the
/// previous lap's last sample always continues it, whatever the tolerance.
pub fn merge_file(laps: &mut Vec<Lap>, source: SourceFile, tolerance: Duration) {
    let mut lap = match laps.pop() {
        Some(previous) if continues(&previous, &source, tolerance) => {
            debug!(
                file = %source.name,
                lap_start = %previous.start_time(),
                "continuing previous lap"
            );
            previous
        }
        Some(previous) => {
            laps.push(previous);
            Lap::active(source.start)
        }
        None => Lap::active(source.start),
    };

    lap.extend(source.readings);

    if !lap.is_empty() {
        laps.push(lap);
    }
}

fn continues(previous: &Lap, source: &SourceFile, tolerance: Duration) -> bool {
    let gap = source.start - previous.end_time();
    gap <= Duration::zero() || gap < tolerance
}

/// Build the ordered lap list from files already sorted by name.
pub fn merge_files<I>(sources: I, tolerance: Duration) -> Vec<Lap>
where
    I: IntoIterator<Item = SourceFile>,
{
    let mut laps = Vec::new();
    for source in sources {
        merge_file(&mut laps, source, tolerance);
    }

    for lap in &laps {
        info!(
            start = %lap.start_time(),
            end = %lap.end_time(),
            samples = lap.len(),
            "assembled lap"
        );
    }
    laps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::lap::tests::{at, reading};
    use chrono::NaiveDateTime;

    fn source(start: NaiveDateTime, rows: usize) -> SourceFile {
        SourceFile {
            name: format!("tr{}.csv", start.format("%Y%m%d%H%M%S")),
            start,
            readings: (0..rows).map(|_| reading(180, 0, 36.0)).collect(),
        }
    }

    fn tolerance() -> Duration {
        Duration::seconds(5)
    }

    #[test]
    fn overlapping_file_continues_previous_lap() {
        let laps = merge_files(
            [source(at(18, 0, 0), 10), source(at(18, 0, 2), 10)],
            tolerance(),
        );

        assert_eq!(laps.len(), 1);
        assert_eq!(laps[0].len(), 20);
        assert_eq!(laps[0].end_time(), at(18, 0, 19));
    }

    #[test]
    fn start_just_inside_tolerance_merges() {
        // First lap ends at 18:00:09; 18:00:13 is four seconds later.
        let laps = merge_files(
            [source(at(18, 0, 0), 10), source(at(18, 0, 13), 10)],
            tolerance(),
        );
        assert_eq!(laps.len(), 1);
        assert_eq!(laps[0].len(), 20);
    }

    #[test]
    fn start_at_tolerance_opens_new_lap() {
        let laps = merge_files(
            [source(at(18, 0, 0), 10), source(at(18, 0, 14), 10)],
            tolerance(),
        );

        assert_eq!(laps.len(), 2);
        assert_eq!(laps[1].start_time(), at(18, 0, 14));
        assert_eq!(laps[1].len(), 10);
    }

    #[test]
    fn zero_tolerance_still_joins_a_file_starting_on_the_last_sample() {
        let laps = merge_files(
            [source(at(18, 0, 0), 10), source(at(18, 0, 9), 10)],
            Duration::zero(),
        );

        assert_eq!(laps.len(), 1);
        assert_eq!(laps[0].len(), 20);
        assert!(laps[0].samples().windows(2).all(|pair| pair[1].time > pair[0].time));
    }

    #[test]
    fn zero_tolerance_keeps_a_file_one_second_later_apart() {
        let laps = merge_files(
            [source(at(18, 0, 0), 10), source(at(18, 0, 10), 10)],
            Duration::zero(),
        );
        assert_eq!(laps.len(), 2);
        assert_eq!(laps[1].start_time(), at(18, 0, 10));
    }

    #[test]
    fn empty_files_are_dropped() {
        let laps = merge_files(
            [
                source(at(17, 0, 0), 0),
                source(at(18, 0, 0), 10),
                source(at(18, 0, 5), 0),
                source(at(18, 30, 0), 0),
            ],
            tolerance(),
        );

        assert_eq!(laps.len(), 1);
        assert_eq!(laps[0].start_time(), at(18, 0, 0));
        assert_eq!(laps[0].len(), 10);
    }
}

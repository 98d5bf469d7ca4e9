use chrono::Duration;
use tracing::debug;

use crate::processing::lap::Lap;

/// Partition an ordered lap list into sessions.
///
/// A gap between one lap's last sample and the next lap's start that is
/// strictly longer than `session_gap` starts a new session. Every returned
/// session is non-empty.
pub fn split_sessions(laps: Vec<Lap>, session_gap: Duration) -> Vec<Vec<Lap>> {
    let mut sessions: Vec<Vec<Lap>> = Vec::new();

    for lap in laps {
        let gap = sessions
            .last()
            .and_then(|session| session.last())
            .map(|previous| lap.start_time() - previous.end_time());

        match gap {
            Some(gap) if gap <= session_gap => {
                if let Some(current) = sessions.last_mut() {
                    current.push(lap);
                    continue;
                }
            }
            Some(gap) => debug!(
                gap_seconds = gap.num_seconds(),
                start = %lap.start_time(),
                "starting new session"
            ),
            None => {}
        }
        sessions.push(vec![lap]);
    }

    sessions
}

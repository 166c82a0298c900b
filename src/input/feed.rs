//! Line-delimited JSON feed of device reports.
//!
//! Each non-empty line is one raw device record as the companion app sends
//! it. Lines are handed to [`DeviceStore::identify`]; bad lines are logged
//! and skipped.

use crate::ios::DeviceStore;
use log::{info, warn};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::task::JoinHandle;

/// Outcome counters for a finished feed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FeedStats {
    pub accepted: usize,
    pub rejected: usize,
}

/// Read reports from `reader` until EOF.
pub async fn run_feed<R>(reader: R, store: Arc<DeviceStore>) -> FeedStats
where
    R: AsyncBufRead + Unpin,
{
    let mut stats = FeedStats::default();
    let mut lines = reader.lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!("[Feed] Read error: {}", e);
                break;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let result = serde_json::from_str::<serde_json::Value>(line)
            .map_err(Into::into)
            .and_then(|raw| store.identify(raw));

        match result {
            Ok(notified) => {
                stats.accepted += 1;
                info!("[Feed] Report accepted ({} listener(s))", notified);
            }
            Err(e) => {
                stats.rejected += 1;
                warn!("[Feed] Rejected report: {}", e);
            }
        }
    }

    info!(
        "[Feed] Finished: {} accepted, {} rejected",
        stats.accepted, stats.rejected
    );
    stats
}

/// Spawn a task feeding reports from stdin into `store`.
pub fn spawn_stdin_feed(store: Arc<DeviceStore>) -> JoinHandle<FeedStats> {
    tokio::spawn(async move {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        run_feed(stdin, store).await
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ios::device::fixtures::raw_record;

    #[tokio::test]
    async fn test_feed_applies_good_lines_and_skips_bad_ones() {
        let store = Arc::new(DeviceStore::in_memory());
        let input = format!(
            "{}\n\nnot json\n{{\"deviceId\": \"x\"}}\n{}\n",
            raw_record("abc", "Phone", 10, "Charging"),
            raw_record("abc", "Phone", 12, "Charging"),
        );

        let stats = run_feed(input.as_bytes(), store.clone()).await;

        assert_eq!(
            stats,
            FeedStats {
                accepted: 2,
                rejected: 2
            }
        );
        assert_eq!(store.get("abc").unwrap().battery.level, 12);
    }
}

//! Link health monitor
//!
//! Logs the link counters whenever they change.

use defmt::*;
use embassy_time::{Duration, Ticker};

use softserial_core::LinkStats;

use crate::serial::SERIAL;

/// Interval between counter checks
const MONITOR_INTERVAL_SECS: u64 = 5;

#[embassy_executor::task]
pub async fn monitor_task() {
    info!("Monitor task started");

    let mut ticker = Ticker::every(Duration::from_secs(MONITOR_INTERVAL_SECS));
    let mut last = LinkStats::default();

    loop {
        ticker.next().await;

        let stats = SERIAL.stats();
        if stats == last {
            continue;
        }

        if stats.faults() > last.faults() {
            warn!(
                "Link faults: framing={} overrun={} false_start={}",
                stats.framing_errors, stats.overruns, stats.false_starts
            );
        }
        info!("Link: {}", stats);
        last = stats;
    }
}

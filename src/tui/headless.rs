//! Plain log output for runs without a terminal UI

use crate::bench::Aggregator;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Log one progress line every `every` until cancelled
pub async fn log_progress(aggregator: Arc<Aggregator>, every: Duration, cancel: CancellationToken) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let s = aggregator.snapshot();
                info!(
                    total = s.total_requests,
                    unique = s.unique_ips,
                    repeated = s.repeated_ips,
                    residential = s.residential_proxies(),
                    mobile = s.mobile_proxies(),
                    datacenter = s.datacenter_leaks(),
                    unknown = s.unknown_network(),
                    errors = s.error_count,
                    avg_latency = %format!("{:.2}s", s.latency.average()),
                    "progress"
                );
            }
        }
    }
}

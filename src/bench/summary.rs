//! Periodic summary file
//!
//! The file is rewritten from scratch on every pass, so it always holds
//! exactly one summary: the most recent one.

use crate::bench::aggregator::Aggregator;
use crate::bench::snapshot::Snapshot;
use crate::Result;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Summary file name for a run started at `started`
pub fn log_file_name(started: DateTime<Local>) -> String {
    format!("log_{}.txt", started.format("%Y%m%d_%H%M%S"))
}

/// Render the summary text for `snapshot`
pub fn render_summary(proxy_host: &str, snapshot: &Snapshot) -> String {
    let distribution: Vec<String> = snapshot
        .country_distribution()
        .iter()
        .map(|share| format!("{}: {} ({:.2}%)", share.country, share.count, share.percent))
        .collect();

    format!(
        "Proxy: {}\n\
         Total Requests Sent: {}\n\
         Unique IPs: {}\n\
         Repeated IPs: {}\n\
         Residential Network: {}\n\
         Mobile Network: {}\n\
         Datacenter Network: {}\n\
         Unknown Network: {}\n\
         Error: {}\n\
         Average Response Time: {:.2} seconds\n\
         Lowest Response Time: {:.2} seconds\n\
         Highest Response Time: {:.2} seconds\n\n\
         Country Distribution:\n{}\n",
        proxy_host,
        snapshot.total_requests,
        snapshot.unique_ips,
        snapshot.repeated_ips,
        snapshot.residential_proxies(),
        snapshot.mobile_proxies(),
        snapshot.datacenter_leaks(),
        snapshot.unknown_network(),
        snapshot.error_count,
        snapshot.latency.average(),
        snapshot.latency.lowest(),
        snapshot.latency.highest(),
        distribution.join("\n"),
    )
}

/// Owner of the summary file for one run
pub struct SummaryWriter {
    path: PathBuf,
    proxy_host: String,
}

impl SummaryWriter {
    /// Create the summary file in `dir`, stamped with the current time
    pub async fn create(dir: impl AsRef<Path>, proxy_host: impl Into<String>) -> Result<Self> {
        let started = Local::now();
        let path = dir.as_ref().join(log_file_name(started));
        let header = format!(
            "Log started at {}\n\n",
            started.format("%Y-%m-%d %H:%M:%S")
        );
        tokio::fs::write(&path, header).await?;
        info!(path = %path.display(), "summary file created");

        Ok(Self {
            path,
            proxy_host: proxy_host.into(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the file contents with a summary of `snapshot`
    pub async fn write(&self, snapshot: &Snapshot) -> Result<()> {
        tokio::fs::write(&self.path, render_summary(&self.proxy_host, snapshot)).await?;
        Ok(())
    }

    /// Rewrite the summary every `every` until cancelled, then once more
    pub async fn run(self, aggregator: Arc<Aggregator>, every: Duration, cancel: CancellationToken) {
        let mut ticker = interval_at(Instant::now() + every, every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.write(&aggregator.snapshot()).await {
                        warn!(path = %self.path.display(), "failed to write summary: {}", e);
                    }
                }
            }
        }

        match self.write(&aggregator.snapshot()).await {
            Ok(()) => debug!(path = %self.path.display(), "final summary written"),
            Err(e) => warn!(path = %self.path.display(), "failed to write final summary: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bench::aggregator::{ObservationRecord, Outcome};
    use crate::bench::classifier::NetworkType;
    use crate::bench::worker::ProbeError;
    use chrono::TimeZone;

    fn record(agg: &Aggregator, ip: &str, latency: f64, country: &str, network_type: NetworkType) {
        agg.record(Outcome::Observed(ObservationRecord {
            ip: ip.to_string(),
            latency,
            country_name: country.to_string(),
            network_type,
        }));
    }

    #[test]
    fn test_log_file_name() {
        let started = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 2).unwrap();
        assert_eq!(log_file_name(started), "log_20240309_070502.txt");
    }

    #[test]
    fn test_render_summary() {
        let agg = Aggregator::new();
        record(&agg, "9.9.9.9", 0.5, "United States", NetworkType::Hosting);
        record(&agg, "9.9.9.9", 0.3, "United States", NetworkType::Hosting);
        record(&agg, "8.8.8.8", 1.0, "Germany", NetworkType::Isp);
        record(&agg, "7.7.7.7", 0.6, "Germany", NetworkType::Mobile);
        agg.record(Outcome::Failed(ProbeError::UnknownCountry("ZZ".to_string())));

        let text = render_summary("gate.example.net", &agg.snapshot());
        let expected = "\
Proxy: gate.example.net
Total Requests Sent: 5
Unique IPs: 3
Repeated IPs: 1
Residential Network: 1
Mobile Network: 1
Datacenter Network: 1
Unknown Network: 0
Error: 1
Average Response Time: 0.60 seconds
Lowest Response Time: 0.30 seconds
Highest Response Time: 1.00 seconds

Country Distribution:
Germany: 2 (66.67%)
United States: 1 (33.33%)
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_render_empty_summary() {
        let text = render_summary("gate.example.net", &Snapshot::default());
        assert!(text.contains("Average Response Time: 0.00 seconds"));
        assert!(text.ends_with("Country Distribution:\n\n"));
    }

    #[tokio::test]
    async fn test_writer_overwrites_file() {
        let dir = tempfile::tempdir().unwrap();
        let writer = SummaryWriter::create(dir.path(), "gate.example.net")
            .await
            .unwrap();
        let header = std::fs::read_to_string(writer.path()).unwrap();
        assert!(header.starts_with("Log started at "));

        let agg = Aggregator::new();
        record(&agg, "1.1.1.1", 0.2, "Australia", NetworkType::Isp);
        writer.write(&agg.snapshot()).await.unwrap();
        record(&agg, "2.2.2.2", 0.2, "Australia", NetworkType::Isp);
        writer.write(&agg.snapshot()).await.unwrap();

        let text = std::fs::read_to_string(writer.path()).unwrap();
        assert!(!text.contains("Log started at"));
        assert_eq!(text.matches("Proxy: ").count(), 1);
        assert!(text.contains("Unique IPs: 2"));
        assert!(text.contains("Australia: 2 (100.00%)"));
    }

    #[tokio::test]
    async fn test_run_writes_final_summary_on_cancel() {
        let dir = tempfile::tempdir().unwrap();
        let writer = SummaryWriter::create(dir.path(), "gate.example.net")
            .await
            .unwrap();
        let path = writer.path().to_path_buf();
        let agg = Arc::new(Aggregator::new());
        record(&agg, "1.1.1.1", 0.2, "Australia", NetworkType::Isp);

        let cancel = CancellationToken::new();
        cancel.cancel();
        writer
            .run(Arc::clone(&agg), Duration::from_secs(3600), cancel)
            .await;

        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.contains("Total Requests Sent: 1"));
    }
}

//! Worker loops driving resolve, classify and record

use crate::bench::aggregator::{Aggregator, ObservationRecord, Outcome};
use crate::bench::classifier::{classify, NetworkType};
use crate::bench::config::BenchConfig;
use crate::proxy::country::CountryLookup;
use crate::proxy::resolver::{AddressResolver, MetadataResolver, ResolveError};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Why an iteration produced no observation
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("metadata lookup failed: {0}")]
    Metadata(#[from] ResolveError),

    #[error("malformed metadata payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    #[error("unknown country code: {0:?}")]
    UnknownCountry(String),

    #[error("metadata payload has no asn type")]
    MissingAsnType,
}

#[derive(Debug, Deserialize)]
struct MetadataPayload {
    data: MetadataData,
}

#[derive(Debug, Deserialize)]
struct MetadataData {
    country: String,
    asn: serde_json::Map<String, serde_json::Value>,
}

/// Extract the country name and network type from a metadata payload
///
/// `data.country`, the `data.asn` object and its `type` key are required.
/// A `type` that is null or not a string classifies as
/// [`NetworkType::Unknown`].
pub fn parse_metadata(
    payload: &str,
    countries: &dyn CountryLookup,
) -> Result<(String, NetworkType), ProbeError> {
    let payload: MetadataPayload = serde_json::from_str(payload)?;
    let code = payload.data.country;
    let country_name = countries
        .country_name(&code)
        .ok_or(ProbeError::UnknownCountry(code))?;
    let asn_type = payload
        .data
        .asn
        .get("type")
        .ok_or(ProbeError::MissingAsnType)?
        .as_str()
        .unwrap_or_default();
    Ok((country_name, classify(asn_type)))
}

/// The collaborators one iteration needs
#[derive(Clone)]
pub struct Probe {
    address: Arc<dyn AddressResolver>,
    metadata: Arc<dyn MetadataResolver>,
    countries: Arc<dyn CountryLookup>,
}

impl Probe {
    pub fn new(
        address: Arc<dyn AddressResolver>,
        metadata: Arc<dyn MetadataResolver>,
        countries: Arc<dyn CountryLookup>,
    ) -> Self {
        Self {
            address,
            metadata,
            countries,
        }
    }

    /// Run one resolve, look up, classify pass
    pub async fn run_once(&self) -> Outcome {
        let (ip, latency) = match self.address.resolve_exit().await {
            Ok(exit) => (exit.ip, exit.latency.as_secs_f64()),
            Err(err) => {
                // The error text is looked up in place of an address.
                // TODO: record exit lookup failures as errors directly.
                debug!(error = %err, "exit address lookup failed");
                (err.to_string(), 0.0)
            }
        };

        let payload = match self.metadata.resolve_metadata(&ip).await {
            Ok(payload) => payload,
            Err(err) => return Outcome::Failed(err.into()),
        };

        match parse_metadata(&payload, self.countries.as_ref()) {
            Ok((country_name, network_type)) => Outcome::Observed(ObservationRecord {
                ip,
                latency,
                country_name,
                network_type,
            }),
            Err(err) => Outcome::Failed(err),
        }
    }
}

/// Per-worker loop settings
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkerSettings {
    pub max_iterations: Option<u64>,
    pub retry_delay: Duration,
}

impl From<&BenchConfig> for WorkerSettings {
    fn from(config: &BenchConfig) -> Self {
        Self {
            max_iterations: config.max_iterations,
            retry_delay: config.retry_delay,
        }
    }
}

/// What a worker did before it stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerReport {
    pub worker_id: usize,
    pub iterations: u64,
    pub failures: u64,
}

pub struct Worker {
    id: usize,
    probe: Probe,
    aggregator: Arc<Aggregator>,
    settings: WorkerSettings,
    cancel: CancellationToken,
}

impl Worker {
    pub fn new(
        id: usize,
        probe: Probe,
        aggregator: Arc<Aggregator>,
        settings: WorkerSettings,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id,
            probe,
            aggregator,
            settings,
            cancel,
        }
    }

    fn limit_reached(&self, iterations: u64) -> bool {
        self.settings
            .max_iterations
            .map_or(false, |max| iterations >= max)
    }

    /// Loop until cancelled or the iteration limit is hit
    ///
    /// A probe cut short by cancellation records nothing.
    pub async fn run(self) -> WorkerReport {
        let mut report = WorkerReport {
            worker_id: self.id,
            iterations: 0,
            failures: 0,
        };
        debug!(worker = self.id, "worker started");

        while !self.cancel.is_cancelled() && !self.limit_reached(report.iterations) {
            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                outcome = self.probe.run_once() => outcome,
            };

            if let Outcome::Failed(ref err) = outcome {
                debug!(worker = self.id, error = %err, "iteration failed");
                report.failures += 1;
            }
            self.aggregator.record(outcome);
            report.iterations += 1;

            if self.settings.retry_delay.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::select! {
                    _ = self.cancel.cancelled() => break,
                    _ = tokio::time::sleep(self.settings.retry_delay) => {}
                }
            }
        }

        debug!(
            worker = self.id,
            iterations = report.iterations,
            failures = report.failures,
            "worker stopped"
        );
        report
    }
}

/// A fixed set of workers sharing one aggregator
pub struct WorkerPool {
    handles: Vec<JoinHandle<WorkerReport>>,
}

impl WorkerPool {
    /// Spawn `count` workers on the current runtime
    pub fn spawn(
        count: usize,
        probe: Probe,
        aggregator: Arc<Aggregator>,
        settings: WorkerSettings,
        cancel: CancellationToken,
    ) -> Self {
        let handles = (0..count)
            .map(|id| {
                let worker = Worker::new(
                    id,
                    probe.clone(),
                    Arc::clone(&aggregator),
                    settings,
                    cancel.clone(),
                );
                tokio::spawn(worker.run())
            })
            .collect();
        info!(workers = count, "worker pool started");
        Self { handles }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every worker to stop
    pub async fn join(self) -> Vec<WorkerReport> {
        futures::future::join_all(self.handles)
            .await
            .into_iter()
            .filter_map(|joined| match joined {
                Ok(report) => Some(report),
                Err(err) => {
                    warn!("worker task ended abnormally: {}", err);
                    None
                }
            })
            .collect()
    }
}

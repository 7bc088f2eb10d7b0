//! Shared statistics store updated by every worker

use crate::bench::classifier::NetworkType;
use crate::bench::snapshot::{LatencySummary, NetworkTypeCounts, Snapshot};
use crate::bench::worker::ProbeError;
use parking_lot::Mutex;
use std::collections::HashMap;

/// One successful probe: the exit address and how it was classified
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationRecord {
    pub ip: String,
    /// Exit address round trip in seconds
    pub latency: f64,
    pub country_name: String,
    pub network_type: NetworkType,
}

/// Result of one worker iteration
#[derive(Debug)]
pub enum Outcome {
    Observed(ObservationRecord),
    Failed(ProbeError),
}

#[derive(Debug, Default)]
struct AggregateState {
    total_requests: u64,
    ip_occurrence: HashMap<String, u64>,
    unique_ip_count: u64,
    repeated_ip_count: u64,
    country_index: HashMap<String, usize>,
    country_counts: Vec<(String, u64)>,
    network_type_counts: NetworkTypeCounts,
    error_count: u64,
    latency_samples: Vec<f64>,
    latency: LatencySummary,
}

impl AggregateState {
    fn count_country(&mut self, country: String) {
        match self.country_index.get(&country) {
            Some(&idx) => self.country_counts[idx].1 += 1,
            None => {
                self.country_index.insert(country.clone(), self.country_counts.len());
                self.country_counts.push((country, 1));
            }
        }
    }
}

/// Aggregated run statistics behind a single lock
///
/// [`record`](Self::record) and [`snapshot`](Self::snapshot) each hold the
/// lock for their whole body, so a snapshot never sees half of an update.
/// Nothing under the lock blocks or awaits.
#[derive(Debug, Default)]
pub struct Aggregator {
    state: Mutex<AggregateState>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one iteration's outcome into the totals
    ///
    /// An address seen before only bumps the repeat counters; its country
    /// and network type were fixed at first sighting.
    pub fn record(&self, outcome: Outcome) {
        let mut state = self.state.lock();
        state.total_requests += 1;

        let obs = match outcome {
            Outcome::Observed(obs) => obs,
            Outcome::Failed(_) => {
                state.error_count += 1;
                return;
            }
        };

        state.latency_samples.push(obs.latency);
        state.latency.add(obs.latency);

        if let Some(count) = state.ip_occurrence.get_mut(&obs.ip) {
            *count += 1;
            state.repeated_ip_count += 1;
            return;
        }

        state.ip_occurrence.insert(obs.ip, 1);
        state.unique_ip_count += 1;
        state.count_country(obs.country_name);
        state.network_type_counts.increment(obs.network_type);
    }

    /// Consistent copy of all counters
    pub fn snapshot(&self) -> Snapshot {
        let state = self.state.lock();
        Snapshot {
            total_requests: state.total_requests,
            unique_ips: state.unique_ip_count,
            repeated_ips: state.repeated_ip_count,
            error_count: state.error_count,
            network_types: state.network_type_counts,
            countries: state.country_counts.clone(),
            latency: state.latency,
        }
    }

    /// How many times `ip` has been observed
    pub fn occurrences(&self, ip: &str) -> Option<u64> {
        self.state.lock().ip_occurrence.get(ip).copied()
    }

    /// Number of distinct addresses observed
    pub fn distinct_ips(&self) -> usize {
        self.state.lock().ip_occurrence.len()
    }

    /// Every latency sample in completion order
    pub fn latency_samples(&self) -> Vec<f64> {
        self.state.lock().latency_samples.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observed(ip: &str, latency: f64, country: &str, network_type: NetworkType) -> Outcome {
        Outcome::Observed(ObservationRecord {
            ip: ip.to_string(),
            latency,
            country_name: country.to_string(),
            network_type,
        })
    }

    fn failed() -> Outcome {
        Outcome::Failed(ProbeError::UnknownCountry("ZZ".to_string()))
    }

    #[test]
    fn test_new_aggregator_is_empty() {
        let snapshot = Aggregator::new().snapshot();
        assert_eq!(snapshot, Snapshot::default());
    }

    #[test]
    fn test_three_observation_scenario() {
        let agg = Aggregator::new();
        agg.record(observed("9.9.9.9", 0.5, "United States", NetworkType::Hosting));
        agg.record(observed("9.9.9.9", 0.3, "United States", NetworkType::Hosting));
        agg.record(observed("8.8.8.8", 1.0, "Germany", NetworkType::Isp));

        let snapshot = agg.snapshot();
        assert_eq!(snapshot.total_requests, 3);
        assert_eq!(snapshot.unique_ips, 2);
        assert_eq!(snapshot.repeated_ips, 1);
        assert_eq!(snapshot.datacenter_leaks(), 1);
        assert_eq!(snapshot.residential_proxies(), 1);
        assert_eq!(snapshot.mobile_proxies(), 0);
        assert_eq!(snapshot.error_count, 0);
        assert!((snapshot.latency.average() - 0.6).abs() < 1e-9);
        assert_eq!(snapshot.latency.lowest(), 0.3);
        assert_eq!(snapshot.latency.highest(), 1.0);
        assert_eq!(
            snapshot.countries,
            vec![("United States".to_string(), 1), ("Germany".to_string(), 1)]
        );
    }

    #[test]
    fn test_classification_is_sticky() {
        let agg = Aggregator::new();
        agg.record(observed("1.2.3.4", 0.1, "France", NetworkType::Mobile));
        agg.record(observed("1.2.3.4", 0.1, "Spain", NetworkType::Hosting));

        let snapshot = agg.snapshot();
        assert_eq!(snapshot.network_types.get(NetworkType::Mobile), 1);
        assert_eq!(snapshot.network_types.get(NetworkType::Hosting), 0);
        assert_eq!(snapshot.countries, vec![("France".to_string(), 1)]);
        assert_eq!(agg.occurrences("1.2.3.4"), Some(2));
    }

    #[test]
    fn test_errors_count_as_requests_only() {
        let agg = Aggregator::new();
        agg.record(failed());
        agg.record(observed("10.0.0.1", 0.4, "Japan", NetworkType::Unknown));
        agg.record(failed());

        let snapshot = agg.snapshot();
        assert_eq!(snapshot.total_requests, 3);
        assert_eq!(snapshot.error_count, 2);
        assert_eq!(snapshot.unique_ips, 1);
        assert_eq!(snapshot.latency.samples, 1);
        assert_eq!(agg.latency_samples(), vec![0.4]);
    }

    #[test]
    fn test_counter_invariants_hold_after_every_call() {
        let agg = Aggregator::new();
        let ips = ["a", "b", "a", "c", "a", "b"];
        let mut calls = 0u64;
        for (i, ip) in ips.iter().enumerate() {
            if i % 3 == 2 {
                agg.record(failed());
                calls += 1;
            }
            agg.record(observed(ip, 0.1, "Chile", NetworkType::Isp));
            calls += 1;

            let snapshot = agg.snapshot();
            assert_eq!(snapshot.total_requests, calls);
            assert_eq!(snapshot.unique_ips as usize, agg.distinct_ips());
            assert_eq!(
                snapshot.unique_ips + snapshot.repeated_ips,
                snapshot.total_requests - snapshot.error_count
            );
        }
        assert_eq!(agg.occurrences("a"), Some(3));
        assert_eq!(agg.occurrences("b"), Some(2));
        assert_eq!(agg.occurrences("c"), Some(1));
        assert_eq!(agg.occurrences("d"), None);
    }

    #[test]
    fn test_latency_samples_keep_completion_order() {
        let agg = Aggregator::new();
        for (ip, latency) in [("x", 0.9), ("y", 0.1), ("x", 0.5)] {
            agg.record(observed(ip, latency, "Peru", NetworkType::Isp));
        }
        assert_eq!(agg.latency_samples(), vec![0.9, 0.1, 0.5]);
    }
}

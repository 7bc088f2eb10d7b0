//! Point-in-time view of the aggregated statistics
//!
//! A [`Snapshot`] is a plain copy taken under the aggregator lock. Reporters
//! derive everything they display (latency figures, country percentages)
//! from it without touching the shared state again.

use crate::bench::classifier::NetworkType;

/// First-seen network type tallies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetworkTypeCounts {
    pub hosting: u64,
    pub isp: u64,
    pub mobile: u64,
    pub unknown: u64,
}

impl NetworkTypeCounts {
    pub fn get(&self, network_type: NetworkType) -> u64 {
        match network_type {
            NetworkType::Hosting => self.hosting,
            NetworkType::Isp => self.isp,
            NetworkType::Mobile => self.mobile,
            NetworkType::Unknown => self.unknown,
        }
    }

    pub(crate) fn increment(&mut self, network_type: NetworkType) {
        let slot = match network_type {
            NetworkType::Hosting => &mut self.hosting,
            NetworkType::Isp => &mut self.isp,
            NetworkType::Mobile => &mut self.mobile,
            NetworkType::Unknown => &mut self.unknown,
        };
        *slot += 1;
    }

    pub fn total(&self) -> u64 {
        self.hosting + self.isp + self.mobile + self.unknown
    }
}

/// Running latency figures in seconds
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LatencySummary {
    pub samples: u64,
    pub sum: f64,
    pub min: f64,
    pub max: f64,
}

impl LatencySummary {
    pub(crate) fn add(&mut self, seconds: f64) {
        if self.samples == 0 {
            self.min = seconds;
            self.max = seconds;
        } else {
            self.min = self.min.min(seconds);
            self.max = self.max.max(seconds);
        }
        self.samples += 1;
        self.sum += seconds;
    }

    /// Mean latency, 0 when nothing was sampled
    pub fn average(&self) -> f64 {
        if self.samples == 0 {
            0.0
        } else {
            self.sum / self.samples as f64
        }
    }

    pub fn lowest(&self) -> f64 {
        if self.samples == 0 {
            0.0
        } else {
            self.min
        }
    }

    pub fn highest(&self) -> f64 {
        if self.samples == 0 {
            0.0
        } else {
            self.max
        }
    }
}

/// A country's share of all classified unique addresses
#[derive(Debug, Clone, PartialEq)]
pub struct CountryShare {
    pub country: String,
    pub count: u64,
    pub percent: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub total_requests: u64,
    pub unique_ips: u64,
    pub repeated_ips: u64,
    pub error_count: u64,
    pub network_types: NetworkTypeCounts,
    /// Country tallies in order of first appearance
    pub countries: Vec<(String, u64)>,
    pub latency: LatencySummary,
}

impl Snapshot {
    pub fn datacenter_leaks(&self) -> u64 {
        self.network_types.hosting
    }

    pub fn residential_proxies(&self) -> u64 {
        self.network_types.isp
    }

    pub fn mobile_proxies(&self) -> u64 {
        self.network_types.mobile
    }

    pub fn unknown_network(&self) -> u64 {
        self.network_types.unknown
    }

    /// Requests that produced an observation
    pub fn successful_requests(&self) -> u64 {
        self.total_requests.saturating_sub(self.error_count)
    }

    /// Countries sorted by count, descending; ties keep first-appearance order
    pub fn country_distribution(&self) -> Vec<CountryShare> {
        let total: u64 = self.countries.iter().map(|(_, count)| count).sum();
        let mut shares: Vec<CountryShare> = self
            .countries
            .iter()
            .map(|(country, count)| CountryShare {
                country: country.clone(),
                count: *count,
                percent: if total == 0 {
                    0.0
                } else {
                    *count as f64 / total as f64 * 100.0
                },
            })
            .collect();
        // sort_by is stable, which gives the tie order
        shares.sort_by(|a, b| b.count.cmp(&a.count));
        shares
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_summary_empty() {
        let summary = LatencySummary::default();
        assert_eq!(summary.average(), 0.0);
        assert_eq!(summary.lowest(), 0.0);
        assert_eq!(summary.highest(), 0.0);
    }

    #[test]
    fn test_latency_summary_tracks_extremes() {
        let mut summary = LatencySummary::default();
        for s in [0.8, 0.2, 1.4] {
            summary.add(s);
        }
        assert_eq!(summary.samples, 3);
        assert_eq!(summary.lowest(), 0.2);
        assert_eq!(summary.highest(), 1.4);
        assert!((summary.average() - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_network_type_counts() {
        let mut counts = NetworkTypeCounts::default();
        counts.increment(NetworkType::Mobile);
        counts.increment(NetworkType::Mobile);
        counts.increment(NetworkType::Unknown);
        assert_eq!(counts.get(NetworkType::Mobile), 2);
        assert_eq!(counts.get(NetworkType::Hosting), 0);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn test_country_distribution_order_and_percentages() {
        let snapshot = Snapshot {
            countries: vec![
                ("France".to_string(), 1),
                ("Germany".to_string(), 3),
                ("Japan".to_string(), 1),
                ("Brazil".to_string(), 3),
            ],
            ..Default::default()
        };
        let shares = snapshot.country_distribution();
        let names: Vec<_> = shares.iter().map(|s| s.country.as_str()).collect();
        assert_eq!(names, ["Germany", "Brazil", "France", "Japan"]);
        assert!((shares[0].percent - 37.5).abs() < 1e-9);
        assert!((shares[3].percent - 12.5).abs() < 1e-9);
    }

    #[test]
    fn test_country_distribution_empty() {
        assert!(Snapshot::default().country_distribution().is_empty());
    }
}

//! Benchmark engine
//!
//! This module provides:
//! - Classification of exit addresses by ASN type
//! - The shared aggregator every worker records into
//! - Worker loops and the pool that runs them
//! - Snapshots and the periodic summary file

pub mod aggregator;
pub mod classifier;
pub mod config;
pub mod snapshot;
pub mod summary;
pub mod worker;

pub use aggregator::{Aggregator, ObservationRecord, Outcome};
pub use classifier::{classify, NetworkType};
pub use config::BenchConfig;
pub use snapshot::{CountryShare, LatencySummary, NetworkTypeCounts, Snapshot};
pub use summary::{render_summary, SummaryWriter};
pub use worker::{parse_metadata, Probe, ProbeError, Worker, WorkerPool, WorkerReport, WorkerSettings};

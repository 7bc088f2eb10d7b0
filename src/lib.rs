//! Proxy Bench - Rotating Proxy Benchmark
//!
//! Sends requests through a single proxy endpoint from many concurrent
//! workers, resolves each exit address and its network classification, and
//! aggregates unique/repeated address, network type, latency and error
//! statistics for a live view and a periodic summary file.

pub mod bench;
pub mod logging;
pub mod proxy;
pub mod tui;

pub use bench::*;
pub use proxy::*;

/// Application result type
pub type Result<T> = anyhow::Result<T>;

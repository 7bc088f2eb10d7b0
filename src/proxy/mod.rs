//! Proxy module for reaching the outside world through the benchmarked proxy
//!
//! This module provides functionality for:
//! - Parsing the proxy endpoint (HOST:PORT, USER:PASS@HOST:PORT, etc.)
//! - Resolving the proxy's exit address and its metadata via ipinfo.io
//! - Mapping country codes to display names

pub mod country;
pub mod models;
pub mod parser;
pub mod resolver;

pub use country::{CountryLookup, IsoCountries};
pub use models::{ProxyAuth, ProxyEndpoint, ProxyType};
pub use parser::EndpointParser;
pub use resolver::{AddressResolver, ExitAddress, IpinfoClient, MetadataResolver, ResolveError};

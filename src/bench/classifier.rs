//! Network type classification from the ASN type field

use std::fmt;

/// Kind of network an exit address belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetworkType {
    /// Datacenter address, a leak for a residential proxy
    Hosting,
    /// Residential ISP address
    Isp,
    /// Mobile carrier address
    Mobile,
    Unknown,
}

impl NetworkType {
    pub const ALL: [NetworkType; 4] = [
        NetworkType::Hosting,
        NetworkType::Isp,
        NetworkType::Mobile,
        NetworkType::Unknown,
    ];

    /// Label used in reports, e.g. "Datacenter" for hosting addresses
    pub fn label(&self) -> &'static str {
        match self {
            NetworkType::Hosting => "Datacenter",
            NetworkType::Isp => "Residential",
            NetworkType::Mobile => "Mobile",
            NetworkType::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Map an ASN type string to a network type; matching is exact
pub fn classify(asn_type: &str) -> NetworkType {
    match asn_type {
        "hosting" => NetworkType::Hosting,
        "isp" => NetworkType::Isp,
        "mobile" => NetworkType::Mobile,
        _ => NetworkType::Unknown,
    }
}

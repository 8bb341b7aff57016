//! Network origin classification.
//!
//! # Responsibilities
//! - Normalize client addresses (strip the IPv4-mapped IPv6 prefix)
//! - Resolve addresses to a coarse region through a local geo table
//! - Classify origins as private (trusted network) or public
//!
//! # Design Decisions
//! - The geo table is loaded once and held in memory; lookups never block
//! - Lookup failure is a signal (unknown location), never an error
//! - Private ranges use CIDR containment, not string prefixes

use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

const MAPPED_PREFIX: &str = "::ffff:";

/// Strip surrounding whitespace and the `::ffff:` prefix from an address.
pub fn normalize_origin(raw: &str) -> String {
    let trimmed = raw.trim();

    // Covers both the dotted (::ffff:1.2.3.4) and hex (::ffff:c0a8:10a) forms.
    if let Ok(IpAddr::V6(v6)) = trimmed.parse::<IpAddr>() {
        if let Some(v4) = v6.to_ipv4_mapped() {
            return v4.to_string();
        }
    }

    match trimmed.get(..MAPPED_PREFIX.len()) {
        Some(head) if head.eq_ignore_ascii_case(MAPPED_PREFIX) => {
            trimmed[MAPPED_PREFIX.len()..].to_string()
        }
        _ => trimmed.to_string(),
    }
}

/// One range of the geo table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct GeoRecord {
    pub cidr: IpNet,
    pub country: String,
    #[serde(default)]
    pub city: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct GeoFile {
    #[serde(default)]
    ranges: Vec<GeoRecord>,
}

#[derive(Debug, thiserror::Error)]
pub enum GeoDatabaseError {
    #[error("failed to read geo database {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse geo database: {0}")]
    Parse(#[from] toml::de::Error),
}

/// In-memory geo table with longest-prefix matching.
#[derive(Debug, Clone, Default)]
pub struct GeoDatabase {
    /// Sorted by prefix length, most specific first.
    ranges: Vec<GeoRecord>,
}

impl GeoDatabase {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_records(mut ranges: Vec<GeoRecord>) -> Self {
        ranges.sort_by(|a, b| b.cidr.prefix_len().cmp(&a.cidr.prefix_len()));
        Self { ranges }
    }

    /// Parse a table of `[[ranges]]` entries.
    pub fn from_toml_str(content: &str) -> Result<Self, GeoDatabaseError> {
        let file: GeoFile = toml::from_str(content)?;
        Ok(Self::from_records(file.ranges))
    }

    pub fn load(path: &Path) -> Result<Self, GeoDatabaseError> {
        let content = fs::read_to_string(path).map_err(|source| GeoDatabaseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self::from_toml_str(&content)?;
        tracing::info!(path = %path.display(), ranges = db.len(), "Geo database loaded");
        Ok(db)
    }

    pub fn lookup(&self, addr: IpAddr) -> Option<&GeoRecord> {
        self.ranges.iter().find(|record| record.cidr.contains(&addr))
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

/// Trust tuple derived from an origin address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrustClass {
    pub known_location: bool,
    pub high_risk_region: bool,
    pub is_private_range: bool,
    /// Resolved region code, when known.
    pub region: Option<String>,
}

/// Classifies origins by location and network trust.
#[derive(Debug, Clone)]
pub struct NetworkClassifier {
    database: GeoDatabase,
    high_risk_regions: Vec<String>,
    private_ranges: Vec<IpNet>,
}

impl NetworkClassifier {
    pub fn new(database: GeoDatabase, high_risk_regions: &[String], private_ranges: Vec<IpNet>) -> Self {
        Self {
            database,
            high_risk_regions: high_risk_regions
                .iter()
                .map(|r| r.trim().to_ascii_uppercase())
                .collect(),
            private_ranges,
        }
    }

    /// Classify an origin. Unparseable addresses are unknown and public.
    pub fn classify(&self, origin: &str) -> TrustClass {
        let addr = match normalize_origin(origin).parse::<IpAddr>() {
            Ok(addr) => addr,
            Err(_) => {
                return TrustClass {
                    known_location: false,
                    high_risk_region: false,
                    is_private_range: false,
                    region: None,
                }
            }
        };

        let region = self
            .database
            .lookup(addr)
            .map(|record| record.country.to_ascii_uppercase());
        let high_risk_region = region
            .as_ref()
            .map(|code| self.high_risk_regions.iter().any(|r| r == code))
            .unwrap_or(false);

        TrustClass {
            known_location: region.is_some(),
            high_risk_region,
            is_private_range: self.is_private(addr),
            region,
        }
    }

    fn is_private(&self, addr: IpAddr) -> bool {
        self.private_ranges.iter().any(|net| net.contains(&addr))
    }
}

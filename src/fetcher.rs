//! HTTP fetcher for per-country CIDR zone files.
//!
//! The remote contract is one plain-text document per country code, one CIDR
//! per line, at a URL templated on the code. An unreachable or zero-length
//! response is always `FetchFailed`; retry policy belongs to callers.

use anyhow::{Context, Result};
use async_trait::async_trait;
use ipnet::IpNet;
use reqwest::Client;
use std::net::IpAddr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::GeoblockError;
use crate::reconcile::CountryCode;

const TIMEOUT_SECS: u64 = 30;

/// Maximum zone file size (10 MB). The largest real zone files are well
/// under 1 MB, so this is ample margin.
const MAX_ZONE_SIZE: usize = 10 * 1024 * 1024;

/// Default URL template; `{country}` is replaced by the lowercase code.
pub const DEFAULT_ZONE_URL: &str =
    "https://www.ipdeny.com/ipblocks/data/aggregated/{country}-aggregated.zone";

/// Source of the authoritative CIDR list for a country.
#[async_trait]
pub trait CidrSource: Send + Sync {
    async fn fetch(&self, country: &CountryCode) -> Result<Vec<IpNet>, GeoblockError>;
}

/// HTTP zone-file fetcher.
pub struct ZoneFetcher {
    client: Client,
    url_template: String,
}

impl ZoneFetcher {
    pub fn new(url_template: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .user_agent(format!("geoblock/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            url_template: url_template.to_string(),
        })
    }

    fn zone_url(&self, country: &CountryCode) -> String {
        self.url_template
            .replace("{country}", &country.as_str().to_lowercase())
    }
}

#[async_trait]
impl CidrSource for ZoneFetcher {
    async fn fetch(&self, country: &CountryCode) -> Result<Vec<IpNet>, GeoblockError> {
        let url = self.zone_url(country);
        debug!("Fetching zone for {} from {}", country, url);

        let fail = |reason: String| GeoblockError::FetchFailed {
            country: country.to_string(),
            reason,
        };

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| fail(e.to_string()))?;

        if !response.status().is_success() {
            return Err(fail(format!("HTTP {}", response.status())));
        }

        let body = response.text().await.map_err(|e| fail(e.to_string()))?;
        if body.len() > MAX_ZONE_SIZE {
            return Err(fail(format!("zone file too large: {} bytes", body.len())));
        }

        let cidrs = parse_zone(&body);
        if cidrs.is_empty() {
            // An empty zone must never silently mean "block nothing".
            return Err(fail("empty zone file".to_string()));
        }

        info!("Fetched {} CIDRs for {}", cidrs.len(), country);
        Ok(cidrs)
    }
}

/// Parse a zone file: one IP or CIDR per line, `#` comments ignored.
pub fn parse_zone(content: &str) -> Vec<IpNet> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            if line.contains('/') {
                line.parse::<IpNet>().ok()
            } else {
                line.parse::<IpAddr>().ok().map(IpNet::from)
            }
        })
        .collect()
}

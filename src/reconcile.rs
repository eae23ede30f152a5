//! Reconciliation engine: drive the firewall to a desired blocking state.
//!
//! A desired state is a list of [`BlockTarget`]s. Each target is processed
//! independently to a per-target [`SyncResult`]; one country's failure never
//! aborts the others. Re-running with the same targets and the same fetched
//! data is a no-op (no duplicate rules, identical membership).

use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

use crate::cmd_abstraction::CommandExecutor;
use crate::error::GeoblockError;
use crate::fetcher::CidrSource;
use crate::ipset::SetStore;
use crate::rules::{RuleInventory, MANAGED_PREFIX};

/// A validated two-letter country code, stored uppercase.
///
/// The derived set name is stable: the same code always yields the same
/// name, so reconciliation and teardown agree on identities across runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CountryCode(String);

impl CountryCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the backing address set, `country_<CODE>`.
    pub fn set_name(&self) -> String {
        format!("{MANAGED_PREFIX}{}", self.0)
    }

    /// Recover the country code from a managed set name.
    pub fn from_set_name(name: &str) -> Option<Self> {
        name.strip_prefix(MANAGED_PREFIX)
            .and_then(|code| code.parse().ok())
    }
}

impl FromStr for CountryCode {
    type Err = GeoblockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        if code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(Self(code.to_ascii_uppercase()))
        } else {
            Err(GeoblockError::InvalidCountry(s.to_string()))
        }
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One unit of requested work: a country and the ports to drop it on.
#[derive(Debug, Clone)]
pub struct BlockTarget {
    pub country: CountryCode,
    pub ports: Vec<u16>,
}

/// Outcome of one country's fetch+apply cycle. Success carries the new (or
/// unchanged) membership count.
#[derive(Debug)]
pub struct SyncResult {
    pub country: CountryCode,
    pub set_name: String,
    pub outcome: Result<usize, GeoblockError>,
}

/// Drives [`SetStore`], [`RuleInventory`] and a [`CidrSource`] toward the
/// desired state.
pub struct Reconciler<'a, E: CommandExecutor> {
    sets: &'a SetStore<E>,
    rules: &'a RuleInventory<E>,
    source: &'a dyn CidrSource,
}

impl<'a, E: CommandExecutor> Reconciler<'a, E> {
    pub fn new(
        sets: &'a SetStore<E>,
        rules: &'a RuleInventory<E>,
        source: &'a dyn CidrSource,
    ) -> Self {
        Self { sets, rules, source }
    }

    /// Bring the firewall to the state described by `targets`, one result
    /// per target.
    pub async fn reconcile(&self, targets: &[BlockTarget]) -> Vec<SyncResult> {
        let mut results = Vec::with_capacity(targets.len());
        for target in targets {
            let set_name = target.country.set_name();
            let outcome = self.sync_target(target, &set_name).await;
            if let Err(e) = &outcome {
                warn!("Sync failed for {}: {}", target.country, e);
            }
            results.push(SyncResult {
                country: target.country.clone(),
                set_name,
                outcome,
            });
        }
        results
    }

    /// One target's cycle: fetch, create-or-update the set, install rules.
    ///
    /// The fetch happens before any firewall mutation, so a country with no
    /// data gets no set and no rules, and an already-synced country keeps
    /// its prior (stale but present) membership on fetch failure.
    async fn sync_target(
        &self,
        target: &BlockTarget,
        set_name: &str,
    ) -> Result<usize, GeoblockError> {
        let existed = self.sets.exists(set_name)?;
        let cidrs = self.source.fetch(&target.country).await?;

        if !existed {
            match self.sets.create(set_name) {
                Ok(()) => {}
                Err(e) if e.is_benign() => {}
                Err(e) => return Err(e),
            }
        }
        self.sets.replace_members(set_name, &cidrs)?;

        for &port in &target.ports {
            self.rules.insert_rule(set_name, port)?;
        }

        info!(
            "{} {} with {} CIDRs",
            if existed { "Updated" } else { "Created" },
            set_name,
            cidrs.len()
        );
        Ok(cidrs.len())
    }

    /// Periodic re-sync: refresh membership of every managed set already
    /// present, skipping rule insertion. Failures are reported per country
    /// as `RefreshFailed`; prior membership stays intact (the store replace
    /// is atomic).
    pub async fn refresh(&self) -> Result<Vec<SyncResult>, GeoblockError> {
        let names = self.rules.list_managed_set_names()?;
        let mut results = Vec::with_capacity(names.len());

        for set_name in names {
            let Some(country) = CountryCode::from_set_name(&set_name) else {
                warn!("Skipping managed set with unexpected name: {}", set_name);
                continue;
            };

            let outcome = self
                .refresh_one(&country, &set_name)
                .await
                .map_err(|e| GeoblockError::RefreshFailed {
                    country: country.to_string(),
                    reason: e.to_string(),
                });
            if let Err(e) = &outcome {
                warn!("{}", e);
            }
            results.push(SyncResult {
                country,
                set_name,
                outcome,
            });
        }
        Ok(results)
    }

    async fn refresh_one(
        &self,
        country: &CountryCode,
        set_name: &str,
    ) -> Result<usize, GeoblockError> {
        let cidrs = self.source.fetch(country).await?;
        self.sets.replace_members(set_name, &cidrs)?;
        Ok(cidrs.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_country_code_normalizes_case() {
        let code: CountryCode = "cn".parse().unwrap();
        assert_eq!(code.as_str(), "CN");
        assert_eq!(code.set_name(), "country_CN");
    }

    #[test]
    fn test_country_code_rejects_invalid() {
        assert!("C".parse::<CountryCode>().is_err());
        assert!("CHN".parse::<CountryCode>().is_err());
        assert!("C1".parse::<CountryCode>().is_err());
        assert!("".parse::<CountryCode>().is_err());
    }

    #[test]
    fn test_country_code_trims_whitespace() {
        let code: CountryCode = " ru ".parse().unwrap();
        assert_eq!(code.as_str(), "RU");
    }

    #[test]
    fn test_set_name_round_trip() {
        let code: CountryCode = "RU".parse().unwrap();
        assert_eq!(
            CountryCode::from_set_name(&code.set_name()),
            Some(code)
        );
        assert_eq!(CountryCode::from_set_name("blocklist"), None);
        assert_eq!(CountryCode::from_set_name("country_123"), None);
    }
}

//! Block command: reconcile the firewall toward the requested countries/ports.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use super::{check_root, check_subsystems, report_sync_results};
use crate::cmd_abstraction::RealCommandExecutor;
use crate::config::Config;
use crate::fetcher::ZoneFetcher;
use crate::ipset::SetStore;
use crate::lock::LockGuard;
use crate::reconcile::{BlockTarget, CountryCode, Reconciler};
use crate::rules::RuleInventory;

/// Parse operator input into targets; all countries share the port list.
pub fn build_targets(
    countries: &[String],
    ports: &[u16],
    default_ports: &[u16],
) -> Result<Vec<BlockTarget>> {
    let ports: Vec<u16> = if ports.is_empty() {
        default_ports.to_vec()
    } else {
        ports.to_vec()
    };
    if ports.is_empty() {
        anyhow::bail!("No ports given and no default ports configured");
    }

    countries
        .iter()
        .map(|raw| {
            let country: CountryCode = raw
                .parse()
                .with_context(|| format!("Invalid country code: {raw:?}"))?;
            Ok(BlockTarget {
                country,
                ports: ports.clone(),
            })
        })
        .collect()
}

pub async fn run(countries: &[String], ports: &[u16], config_path: &Path) -> Result<()> {
    check_root()?;
    let _lock = LockGuard::acquire()?;

    let config = Config::load(config_path)?;
    let targets = build_targets(countries, ports, &config.ports)?;

    let executor = RealCommandExecutor::new();
    check_subsystems(&executor)?;

    let sets = SetStore::new(executor.clone());
    let rules = RuleInventory::new(executor, config.removal_policy());
    let fetcher = ZoneFetcher::new(&config.zone_url_template)?;
    let reconciler = Reconciler::new(&sets, &rules, &fetcher);

    info!("Reconciling {} target(s)...", targets.len());
    let results = reconciler.reconcile(&targets).await;
    let failures = report_sync_results(&results);

    if failures == results.len() {
        anyhow::bail!("All {} target(s) failed", failures);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_targets_shares_ports() {
        let targets =
            build_targets(&["cn".to_string(), "ru".to_string()], &[22, 80], &[22]).unwrap();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].country.as_str(), "CN");
        assert_eq!(targets[0].ports, vec![22, 80]);
        assert_eq!(targets[1].ports, vec![22, 80]);
    }

    #[test]
    fn test_build_targets_falls_back_to_defaults() {
        let targets = build_targets(&["br".to_string()], &[], &[22]).unwrap();
        assert_eq!(targets[0].ports, vec![22]);
    }

    #[test]
    fn test_build_targets_rejects_bad_country() {
        assert!(build_targets(&["china".to_string()], &[22], &[22]).is_err());
    }

    #[test]
    fn test_build_targets_requires_some_port() {
        assert!(build_targets(&["cn".to_string()], &[], &[]).is_err());
    }
}

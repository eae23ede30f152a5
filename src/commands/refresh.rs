//! Refresh command: periodic membership re-sync, meant for a daily timer.

use anyhow::Result;
use std::path::Path;
use tracing::info;

use super::{check_root, check_subsystems, report_sync_results};
use crate::cmd_abstraction::RealCommandExecutor;
use crate::config::Config;
use crate::fetcher::ZoneFetcher;
use crate::ipset::SetStore;
use crate::lock::LockGuard;
use crate::reconcile::Reconciler;
use crate::rules::RuleInventory;

pub async fn run(config_path: &Path) -> Result<()> {
    check_root()?;
    let _lock = LockGuard::acquire()?;

    let config = Config::load(config_path)?;
    let executor = RealCommandExecutor::new();
    check_subsystems(&executor)?;

    let sets = SetStore::new(executor.clone());
    let rules = RuleInventory::new(executor, config.removal_policy());
    let fetcher = ZoneFetcher::new(&config.zone_url_template)?;
    let reconciler = Reconciler::new(&sets, &rules, &fetcher);

    let results = reconciler.refresh().await?;
    if results.is_empty() {
        info!("No managed sets to refresh");
        return Ok(());
    }

    let failures = report_sync_results(&results);
    info!(
        "Refreshed {}/{} managed set(s)",
        results.len() - failures,
        results.len()
    );
    // Per-country failures keep stale membership and are not fatal; the
    // next timer run retries them.
    Ok(())
}

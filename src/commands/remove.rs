//! Remove command: full or selective teardown of managed blocks.

use anyhow::Result;
use std::path::Path;

use super::{check_root, check_subsystems, report_teardown};
use crate::cmd_abstraction::RealCommandExecutor;
use crate::config::Config;
use crate::ipset::SetStore;
use crate::lock::LockGuard;
use crate::rules::RuleInventory;
use crate::teardown::Teardown;

pub async fn run(all: bool, select: &[usize], config_path: &Path) -> Result<()> {
    if !all && select.is_empty() {
        anyhow::bail!("Nothing to remove: pass --all or --select <indices from `geoblock list`>");
    }

    check_root()?;
    let _lock = LockGuard::acquire()?;

    let config = Config::load(config_path)?;
    let executor = RealCommandExecutor::new();
    check_subsystems(&executor)?;

    let sets = SetStore::new(executor.clone());
    let rules = RuleInventory::new(executor, config.removal_policy());
    let teardown = Teardown::new(&sets, &rules);

    let reports = if all {
        teardown.remove_all().await?
    } else {
        teardown.remove_selected(select).await?
    };

    if reports.is_empty() {
        println!("No managed country sets.");
        return Ok(());
    }

    let failures = report_teardown(&reports);
    if failures > 0 {
        anyhow::bail!("{failures} of {} removal(s) failed", reports.len());
    }
    Ok(())
}

//! List command: numbered listing of managed sets, as used for selection.

use anyhow::Result;
use std::path::Path;

use super::{check_root, check_subsystems};
use crate::cmd_abstraction::RealCommandExecutor;
use crate::config::Config;
use crate::ipset::SetStore;
use crate::rules::RuleInventory;

pub async fn run(config_path: &Path) -> Result<()> {
    check_root()?;

    let config = Config::load(config_path)?;
    let executor = RealCommandExecutor::new();
    check_subsystems(&executor)?;

    let sets = SetStore::new(executor.clone());
    let rules = RuleInventory::new(executor, config.removal_policy());

    let names = rules.list_managed_set_names()?;
    if names.is_empty() {
        println!("No managed country sets.");
        return Ok(());
    }

    for (i, name) in names.iter().enumerate() {
        let members = sets.member_count(name).unwrap_or(0);
        let ports = rules.referenced_ports(name).unwrap_or_default();
        let ports = ports
            .iter()
            .map(u16::to_string)
            .collect::<Vec<_>>()
            .join(",");
        println!("{:>3}. {} - {} CIDRs, ports [{}]", i + 1, name, members, ports);
    }
    Ok(())
}

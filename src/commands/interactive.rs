//! Interactive mode: numbered listing plus prompted block/delete choices.
//!
//! Mirrors the non-interactive surface: the operator picks one of
//! continue (block more countries), delete-all, or delete-selected.

use anyhow::{Context, Result};
use std::io::{self, BufRead, Write};
use std::path::Path;

use super::{check_root, check_subsystems, report_sync_results, report_teardown};
use crate::cmd_abstraction::RealCommandExecutor;
use crate::commands::block::build_targets;
use crate::config::Config;
use crate::fetcher::ZoneFetcher;
use crate::ipset::SetStore;
use crate::lock::LockGuard;
use crate::reconcile::Reconciler;
use crate::rules::RuleInventory;
use crate::teardown::Teardown;

fn prompt(question: &str) -> Result<String> {
    print!("{question}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read input")?;
    Ok(line.trim().to_string())
}

fn parse_ports(input: &str, defaults: &[u16]) -> Result<Vec<u16>> {
    if input.is_empty() {
        return Ok(defaults.to_vec());
    }
    input
        .split(',')
        .map(|p| {
            p.trim()
                .parse::<u16>()
                .with_context(|| format!("Invalid port: {p:?}"))
        })
        .collect()
}

fn parse_indices(input: &str) -> Result<Vec<usize>> {
    input
        .split(',')
        .map(|i| {
            i.trim()
                .parse::<usize>()
                .with_context(|| format!("Invalid index: {i:?}"))
        })
        .collect()
}

pub async fn run(config_path: &Path) -> Result<()> {
    check_root()?;
    let _lock = LockGuard::acquire()?;

    let config = Config::load(config_path)?;
    let executor = RealCommandExecutor::new();
    check_subsystems(&executor)?;

    let sets = SetStore::new(executor.clone());
    let rules = RuleInventory::new(executor, config.removal_policy());

    let names = rules.list_managed_set_names()?;
    if names.is_empty() {
        println!("No managed country sets yet.");
    } else {
        println!("Managed country sets:");
        for (i, name) in names.iter().enumerate() {
            let members = sets.member_count(name).unwrap_or(0);
            println!("{:>3}. {} - {} CIDRs", i + 1, name, members);
        }
    }
    println!();

    let choice = prompt("[c]ontinue (block countries), [d]elete all, [s]elect to delete, [q]uit: ")?;
    match choice.as_str() {
        "c" => {
            let countries_input =
                prompt("Country codes to block (comma-separated, e.g. cn,ru): ")?;
            let countries: Vec<String> = countries_input
                .split(',')
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect();
            if countries.is_empty() {
                anyhow::bail!("No country codes given");
            }

            let ports_input = prompt(&format!(
                "Ports to block [{}]: ",
                config
                    .ports
                    .iter()
                    .map(u16::to_string)
                    .collect::<Vec<_>>()
                    .join(",")
            ))?;
            let ports = parse_ports(&ports_input, &config.ports)?;
            let targets = build_targets(&countries, &ports, &config.ports)?;

            let fetcher = ZoneFetcher::new(&config.zone_url_template)?;
            let reconciler = Reconciler::new(&sets, &rules, &fetcher);
            let results = reconciler.reconcile(&targets).await;
            report_sync_results(&results);
        }
        "d" => {
            let teardown = Teardown::new(&sets, &rules);
            let reports = teardown.remove_all().await?;
            report_teardown(&reports);
        }
        "s" => {
            let indices_input = prompt("Indices to delete (comma-separated): ")?;
            let indices = parse_indices(&indices_input)?;
            let teardown = Teardown::new(&sets, &rules);
            let reports = teardown.remove_selected(&indices).await?;
            report_teardown(&reports);
        }
        "q" | "" => {}
        other => anyhow::bail!("Unknown choice: {other:?}"),
    }
    Ok(())
}

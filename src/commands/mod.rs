//! CLI command implementations — thin glue around the engines.

pub mod block;
pub mod interactive;
pub mod list;
pub mod refresh;
pub mod remove;

use anyhow::Result;

use crate::cmd_abstraction::{args_to_strings, CommandExecutor, RealCommandExecutor};
use crate::error::GeoblockError;
use crate::reconcile::SyncResult;
use crate::teardown::TeardownReport;

/// Check for root privileges (effective UID == 0). Firewall mutation
/// requires CAP_NET_ADMIN; a plain euid check covers the sudo case.
pub(crate) fn check_root() -> Result<()> {
    // SAFETY: geteuid() reads the effective user ID; no preconditions, no
    // failure modes, no state mutation.
    let euid = unsafe { libc::geteuid() };
    if euid != 0 {
        anyhow::bail!("This operation requires root privileges. Please run with sudo.")
    }
    Ok(())
}

/// Probe for the address-set and packet-filter subsystems before any core
/// call; a missing tool is a distinguishable error, not a crash later.
pub(crate) fn check_subsystems(executor: &RealCommandExecutor) -> Result<(), GeoblockError> {
    for program in ["ipset", "iptables"] {
        let available = executor
            .execute(program, &args_to_strings(&["--version"]))
            .map(|o| o.success)
            .unwrap_or(false);
        if !available {
            return Err(GeoblockError::SubsystemUnavailable(format!(
                "{program} not found; install it before running geoblock"
            )));
        }
    }
    Ok(())
}

/// Print per-country sync results; returns how many failed.
pub(crate) fn report_sync_results(results: &[SyncResult]) -> usize {
    let mut failures = 0;
    for result in results {
        match &result.outcome {
            Ok(count) => println!("[OK] {} - {} CIDRs", result.set_name, count),
            Err(e) => {
                failures += 1;
                println!("[FAIL] {} - {}", result.set_name, e);
            }
        }
    }
    failures
}

/// Print per-set teardown reports; returns how many failed.
pub(crate) fn report_teardown(reports: &[TeardownReport]) -> usize {
    let mut failures = 0;
    for report in reports {
        match &report.outcome {
            Ok(()) => println!("[OK] removed {}", report.set_name),
            Err(GeoblockError::InvalidSelection(idx)) => {
                failures += 1;
                println!("[FAIL] invalid selection: {idx}");
            }
            Err(e) => {
                failures += 1;
                println!("[FAIL] {} - {}", report.set_name, e);
            }
        }
    }
    failures
}

//! Teardown engine: verified removal of managed blocks.
//!
//! Removal order matters: rules first (with bounded retry), then a
//! reference check, and only then flush and destroy the backing set. A set
//! whose rules cannot be cleared is left standing and reported; the
//! remaining sets are still processed.

use std::collections::HashSet;
use tracing::{info, warn};

use crate::cmd_abstraction::CommandExecutor;
use crate::error::GeoblockError;
use crate::ipset::SetStore;
use crate::rules::RuleInventory;

/// Per-set teardown outcome.
#[derive(Debug)]
pub struct TeardownReport {
    pub set_name: String,
    pub outcome: Result<(), GeoblockError>,
}

/// Resolve 1-based operator selections against the displayed listing.
///
/// Index 0, out-of-range, and repeated ("already consumed") indices each
/// yield `InvalidSelection` for that entry without affecting the others.
pub fn resolve_selection(
    names: &[String],
    indices: &[usize],
) -> Vec<Result<String, GeoblockError>> {
    let mut consumed = HashSet::new();
    indices
        .iter()
        .map(|&idx| {
            if idx == 0 || idx > names.len() || !consumed.insert(idx) {
                Err(GeoblockError::InvalidSelection(idx))
            } else {
                Ok(names[idx - 1].clone())
            }
        })
        .collect()
}

/// Removes managed rules and their backing sets.
pub struct Teardown<'a, E: CommandExecutor> {
    sets: &'a SetStore<E>,
    rules: &'a RuleInventory<E>,
}

impl<'a, E: CommandExecutor> Teardown<'a, E> {
    pub fn new(sets: &'a SetStore<E>, rules: &'a RuleInventory<E>) -> Self {
        Self { sets, rules }
    }

    /// Tear down every managed set, continuing past per-set failures.
    pub async fn remove_all(&self) -> Result<Vec<TeardownReport>, GeoblockError> {
        let names = self.rules.list_managed_set_names()?;
        let mut reports = Vec::with_capacity(names.len());
        for name in names {
            let outcome = self.remove_set(&name).await;
            reports.push(TeardownReport {
                set_name: name,
                outcome,
            });
        }
        Ok(reports)
    }

    /// Tear down a subset chosen by 1-based index into the current listing.
    pub async fn remove_selected(
        &self,
        indices: &[usize],
    ) -> Result<Vec<TeardownReport>, GeoblockError> {
        let names = self.rules.list_managed_set_names()?;
        let mut reports = Vec::with_capacity(indices.len());
        for resolved in resolve_selection(&names, indices) {
            match resolved {
                Ok(name) => {
                    let outcome = self.remove_set(&name).await;
                    reports.push(TeardownReport {
                        set_name: name,
                        outcome,
                    });
                }
                Err(e) => {
                    warn!("{}", e);
                    reports.push(TeardownReport {
                        set_name: String::new(),
                        outcome: Err(e),
                    });
                }
            }
        }
        Ok(reports)
    }

    /// One set's teardown: discover referencing ports from the live rule
    /// table, remove each rule, verify nothing references the set anymore,
    /// then flush and destroy it.
    async fn remove_set(&self, name: &str) -> Result<(), GeoblockError> {
        let ports = self.rules.referenced_ports(name)?;
        for port in ports {
            self.rules.remove_rule(name, port).await?;
        }

        // Arbitrary managed rules might still reference the set; never
        // destroy while referenced.
        if self.rules.any_rule_references(name)? {
            return Err(GeoblockError::SetBusy(name.to_string()));
        }

        self.sets.replace_members(name, &[])?;
        self.sets.destroy(name)?;
        info!("Tore down {}", name);
        Ok(())
    }
}

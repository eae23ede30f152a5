//! Rule inventory over the iptables INPUT chain.
//!
//! Every rule this tool manages has the same shape: DROP inbound TCP to one
//! destination port when the source address is in a managed set. Rules are
//! checked with `-C` before insertion (`-I`, ahead of the default-accept
//! policy) so re-running reconciliation never duplicates them. Removal goes
//! through a bounded retry loop because the reported rule table can lag the
//! live kernel table while packet evaluation is in flight.

use std::time::Duration;
use tracing::{debug, info, warn};

use crate::cmd_abstraction::{CommandExecutor, CommandOutput};
use crate::error::GeoblockError;

const IPTABLES_BIN: &str = "iptables";
const IPSET_BIN: &str = "ipset";
const CHAIN: &str = "INPUT";

/// Naming convention for sets this tool owns.
pub const MANAGED_PREFIX: &str = "country_";

/// Bounded retry settings for rule removal.
#[derive(Debug, Clone)]
pub struct RemovalPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RemovalPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

/// Inventory of managed packet-filter rules.
pub struct RuleInventory<E: CommandExecutor> {
    executor: E,
    policy: RemovalPolicy,
}

/// Build the match portion of a managed rule for the given iptables
/// operation (`-C`, `-I`, `-D`).
fn rule_args(op: &str, set_name: &str, port: u16) -> Vec<String> {
    let port = port.to_string();
    [
        op, CHAIN, "-p", "tcp", "-m", "set", "--match-set", set_name, "src", "--dport",
        port.as_str(), "-j", "DROP",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Extract `(set name, port)` pairs from `iptables -S INPUT` output lines
/// that reference a managed set.
fn parse_managed_rules(listing: &str) -> Vec<(String, u16)> {
    let mut rules = Vec::new();
    for line in listing.lines() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let mut set_name = None;
        let mut port = None;
        for window in tokens.windows(2) {
            match window[0] {
                "--match-set" if window[1].starts_with(MANAGED_PREFIX) => {
                    set_name = Some(window[1].to_string());
                }
                "--dport" => port = window[1].parse::<u16>().ok(),
                _ => {}
            }
        }
        if let (Some(name), Some(port)) = (set_name, port) {
            rules.push((name, port));
        }
    }
    rules
}

impl<E: CommandExecutor> RuleInventory<E> {
    pub fn new(executor: E, policy: RemovalPolicy) -> Self {
        Self { executor, policy }
    }

    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, GeoblockError> {
        self.executor
            .execute(program, args)
            .map_err(|e| GeoblockError::SubsystemUnavailable(format!("{program}: {e}")))
    }

    /// All address-set names matching the managed naming convention, in
    /// listing order.
    pub fn list_managed_set_names(&self) -> Result<Vec<String>, GeoblockError> {
        let output = self.run(IPSET_BIN, &["-n".to_string(), "list".to_string()])?;
        if !output.success {
            return Err(GeoblockError::CommandFailed {
                program: IPSET_BIN.to_string(),
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output
            .stdout
            .lines()
            .map(str::trim)
            .filter(|name| name.starts_with(MANAGED_PREFIX))
            .map(str::to_string)
            .collect())
    }

    /// Whether the managed rule for (set, port) is installed.
    pub fn rule_exists(&self, set_name: &str, port: u16) -> Result<bool, GeoblockError> {
        Ok(self.run(IPTABLES_BIN, &rule_args("-C", set_name, port))?.success)
    }

    /// Insert the managed rule unless already present. Returns `true` when a
    /// rule was actually inserted.
    pub fn insert_rule(&self, set_name: &str, port: u16) -> Result<bool, GeoblockError> {
        if self.rule_exists(set_name, port)? {
            debug!("Rule {}:{} already present, skipping", set_name, port);
            return Ok(false);
        }
        let output = self.run(IPTABLES_BIN, &rule_args("-I", set_name, port))?;
        if !output.success {
            return Err(GeoblockError::CommandFailed {
                program: IPTABLES_BIN.to_string(),
                stderr: output.stderr.trim().to_string(),
            });
        }
        info!("Inserted DROP rule for {} dport {}", set_name, port);
        Ok(true)
    }

    /// Remove the managed rule, retrying while the rule table settles.
    ///
    /// Check, delete, re-check; the delete result itself is advisory since
    /// the listing can lag. After `max_attempts` with the rule still
    /// reported, gives up with `RuleStillPresent`.
    pub async fn remove_rule(&self, set_name: &str, port: u16) -> Result<(), GeoblockError> {
        for attempt in 1..=self.policy.max_attempts {
            if !self.rule_exists(set_name, port)? {
                return Ok(());
            }
            let _ = self.run(IPTABLES_BIN, &rule_args("-D", set_name, port))?;
            if !self.rule_exists(set_name, port)? {
                debug!("Removed rule {}:{} (attempt {})", set_name, port, attempt);
                return Ok(());
            }
            if attempt < self.policy.max_attempts {
                warn!(
                    "Rule {}:{} still reported after delete, retrying in {:?}",
                    set_name, port, self.policy.delay
                );
                tokio::time::sleep(self.policy.delay).await;
            }
        }
        Err(GeoblockError::RuleStillPresent {
            set_name: set_name.to_string(),
            port,
        })
    }

    fn managed_rules(&self) -> Result<Vec<(String, u16)>, GeoblockError> {
        let output = self.run(IPTABLES_BIN, &["-S".to_string(), CHAIN.to_string()])?;
        if !output.success {
            return Err(GeoblockError::CommandFailed {
                program: IPTABLES_BIN.to_string(),
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(parse_managed_rules(&output.stdout))
    }

    /// Whether any managed rule, on any port, still references the set.
    pub fn any_rule_references(&self, set_name: &str) -> Result<bool, GeoblockError> {
        Ok(self
            .managed_rules()?
            .iter()
            .any(|(name, _)| name == set_name))
    }

    /// Every port a set is referenced on, discovered from the live rule
    /// table rather than assumed from creation-time input.
    pub fn referenced_ports(&self, set_name: &str) -> Result<Vec<u16>, GeoblockError> {
        let mut ports: Vec<u16> = self
            .managed_rules()?
            .into_iter()
            .filter(|(name, _)| name == set_name)
            .map(|(_, port)| port)
            .collect();
        ports.sort_unstable();
        ports.dedup();
        Ok(ports)
    }
}

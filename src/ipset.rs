//! Address set store backed by ipset named sets.
//!
//! One set per blocked country (`hash:net`), usable as a single match target
//! in iptables rules. Membership replacement goes through `ipset restore`
//! with a temporary set and `swap`, so readers never observe a
//! half-populated set and no rule has to be removed first.

use ipnet::IpNet;
use tracing::{debug, info, warn};

use crate::cmd_abstraction::{args_to_strings, CommandExecutor, CommandOutput};
use crate::error::GeoblockError;

const IPSET_BIN: &str = "ipset";
const SET_TYPE: &str = "hash:net";

/// Validate that a CIDR string is safe to embed in an `ipset restore` script.
/// `IpNet::to_string()` output is already safe; this is a guard against any
/// other path feeding the script.
fn is_safe_set_element(s: &str) -> bool {
    !s.is_empty()
        && s.chars().all(|c| {
            c.is_ascii_digit() || c == '.' || c == ':' || c == '/' || ('a'..='f').contains(&c)
        })
}

/// Map an ipset failure to a typed error based on its stderr.
fn classify_failure(name: &str, output: &CommandOutput) -> GeoblockError {
    let stderr = output.stderr.trim();
    if stderr.contains("already exists") {
        GeoblockError::AlreadyExists(name.to_string())
    } else if stderr.contains("is in use") {
        GeoblockError::SetBusy(name.to_string())
    } else if stderr.contains("does not exist") {
        GeoblockError::SetNotFound(name.to_string())
    } else {
        GeoblockError::CommandFailed {
            program: IPSET_BIN.to_string(),
            stderr: stderr.to_string(),
        }
    }
}

/// Kernel address-set store.
pub struct SetStore<E: CommandExecutor> {
    executor: E,
}

impl<E: CommandExecutor> SetStore<E> {
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    fn run(&self, args: &[&str]) -> Result<CommandOutput, GeoblockError> {
        self.executor
            .execute(IPSET_BIN, &args_to_strings(args))
            .map_err(|e| GeoblockError::SubsystemUnavailable(format!("{IPSET_BIN}: {e}")))
    }

    /// Whether a set with this name exists.
    pub fn exists(&self, name: &str) -> Result<bool, GeoblockError> {
        Ok(self.run(&["-n", "list", name])?.success)
    }

    /// Create an empty set. Fails with `AlreadyExists` if present; callers
    /// on the reconcile path treat that as a no-op.
    pub fn create(&self, name: &str) -> Result<(), GeoblockError> {
        let output = self.run(&["create", name, SET_TYPE])?;
        if !output.success {
            return Err(classify_failure(name, &output));
        }
        debug!("Created address set {}", name);
        Ok(())
    }

    /// Atomically replace the membership of an existing set.
    ///
    /// Builds a shadow set, fills it, swaps it in, and destroys the shadow.
    /// The swap is atomic kernel-side, so rules referencing the set keep
    /// matching against a complete membership throughout.
    pub fn replace_members(&self, name: &str, cidrs: &[IpNet]) -> Result<(), GeoblockError> {
        let tmp = format!("{name}_tmp");
        let mut script = String::new();
        script.push_str(&format!("create {tmp} {SET_TYPE} -exist\n"));
        script.push_str(&format!("flush {tmp}\n"));
        for cidr in cidrs {
            let element = cidr.to_string();
            if !is_safe_set_element(&element) {
                warn!("Skipping unsafe set element: {}", element);
                continue;
            }
            script.push_str(&format!("add {tmp} {element} -exist\n"));
        }
        script.push_str(&format!("swap {name} {tmp}\n"));
        script.push_str(&format!("destroy {tmp}\n"));

        debug!("Replacing members of {} ({} entries)", name, cidrs.len());
        let output = self
            .executor
            .execute_with_stdin(IPSET_BIN, &args_to_strings(&["restore"]), &script)
            .map_err(|e| GeoblockError::SubsystemUnavailable(format!("{IPSET_BIN}: {e}")))?;

        if !output.success {
            // The shadow set may survive a failed swap; drop it quietly.
            let _ = self.run(&["destroy", &tmp]);
            return Err(classify_failure(name, &output));
        }

        info!("Set {} now holds {} entries", name, cidrs.len());
        Ok(())
    }

    /// Destroy a set. Fails with `SetBusy` while any rule still references
    /// it; the teardown engine verifies clearance before calling this.
    pub fn destroy(&self, name: &str) -> Result<(), GeoblockError> {
        let output = self.run(&["destroy", name])?;
        if !output.success {
            return Err(classify_failure(name, &output));
        }
        info!("Destroyed address set {}", name);
        Ok(())
    }

    /// Current membership size, from the `Members:` section of `ipset list`.
    pub fn member_count(&self, name: &str) -> Result<usize, GeoblockError> {
        let output = self.run(&["list", name])?;
        if !output.success {
            return Err(classify_failure(name, &output));
        }
        let count = output
            .stdout
            .lines()
            .skip_while(|line| !line.starts_with("Members:"))
            .skip(1)
            .filter(|line| !line.trim().is_empty())
            .count();
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd_abstraction::MockCommandExecutor;

    fn ok_output() -> CommandOutput {
        CommandOutput {
            success: true,
            code: Some(0),
            ..Default::default()
        }
    }

    fn failed_output(stderr: &str) -> CommandOutput {
        CommandOutput {
            stderr: stderr.to_string(),
            success: false,
            code: Some(1),
            ..Default::default()
        }
    }

    #[test]
    fn test_is_safe_set_element() {
        assert!(is_safe_set_element("10.0.0.0/8"));
        assert!(is_safe_set_element("2001:db8::/32"));
        assert!(!is_safe_set_element(""));
        assert!(!is_safe_set_element("1.2.3.4; rm -rf /"));
    }

    #[test]
    fn test_exists_true_and_false() {
        let mut mock = MockCommandExecutor::new();
        mock.expect_execute()
            .withf(|_, args| args.last().map(String::as_str) == Some("country_CN"))
            .returning(|_, _| Ok(ok_output()));
        mock.expect_execute()
            .withf(|_, args| args.last().map(String::as_str) == Some("country_RU"))
            .returning(|_, _| Ok(failed_output("The set with the given name does not exist")));

        let store = SetStore::new(mock);
        assert!(store.exists("country_CN").unwrap());
        assert!(!store.exists("country_RU").unwrap());
    }

    #[test]
    fn test_create_already_exists() {
        let mut mock = MockCommandExecutor::new();
        mock.expect_execute()
            .returning(|_, _| Ok(failed_output("Set cannot be created: set with the same name already exists")));

        let store = SetStore::new(mock);
        let err = store.create("country_CN").unwrap_err();
        assert!(matches!(err, GeoblockError::AlreadyExists(_)));
        assert!(err.is_benign());
    }

    #[test]
    fn test_replace_members_builds_swap_script() {
        let mut mock = MockCommandExecutor::new();
        mock.expect_execute_with_stdin()
            .withf(|cmd, args, script| {
                cmd == "ipset"
                    && args == ["restore".to_string()]
                    && script.contains("create country_CN_tmp hash:net -exist")
                    && script.contains("add country_CN_tmp 1.0.0.0/24 -exist")
                    && script.contains("swap country_CN country_CN_tmp")
                    && script.ends_with("destroy country_CN_tmp\n")
            })
            .times(1)
            .returning(|_, _, _| Ok(ok_output()));

        let store = SetStore::new(mock);
        store
            .replace_members("country_CN", &["1.0.0.0/24".parse().unwrap()])
            .unwrap();
    }

    #[test]
    fn test_replace_members_missing_set() {
        let mut mock = MockCommandExecutor::new();
        mock.expect_execute_with_stdin()
            .returning(|_, _, _| Ok(failed_output("The set with the given name does not exist")));
        // cleanup attempt for the shadow set
        mock.expect_execute().returning(|_, _| Ok(ok_output()));

        let store = SetStore::new(mock);
        let err = store.replace_members("country_CN", &[]).unwrap_err();
        assert!(matches!(err, GeoblockError::SetNotFound(_)));
    }

    #[test]
    fn test_destroy_busy() {
        let mut mock = MockCommandExecutor::new();
        mock.expect_execute()
            .returning(|_, _| Ok(failed_output("Set cannot be destroyed: it is in use by a kernel component")));

        let store = SetStore::new(mock);
        let err = store.destroy("country_CN").unwrap_err();
        assert!(matches!(err, GeoblockError::SetBusy(_)));
    }

    #[test]
    fn test_spawn_failure_maps_to_subsystem_unavailable() {
        let mut mock = MockCommandExecutor::new();
        mock.expect_execute()
            .returning(|_, _| Err(anyhow::anyhow!("No such file or directory")));

        let store = SetStore::new(mock);
        let err = store.exists("country_CN").unwrap_err();
        assert!(matches!(err, GeoblockError::SubsystemUnavailable(_)));
    }

    #[test]
    fn test_member_count_parses_members_section() {
        let mut mock = MockCommandExecutor::new();
        mock.expect_execute().returning(|_, _| {
            Ok(CommandOutput {
                stdout: "Name: country_CN\nType: hash:net\nMembers:\n1.0.0.0/24\n1.0.4.0/22\n"
                    .to_string(),
                success: true,
                code: Some(0),
                ..Default::default()
            })
        });

        let store = SetStore::new(mock);
        assert_eq!(store.member_count("country_CN").unwrap(), 2);
    }
}

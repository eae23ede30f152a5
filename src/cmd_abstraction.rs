//! Command execution abstraction for testability.
//!
//! All ipset/iptables invocations flow through the [`CommandExecutor`] trait
//! so unit tests can mock system commands and integration tests can run
//! against an in-memory fake firewall.

use anyhow::Result;
use std::io::Write;
use std::process::{Command, Stdio};

#[cfg(test)]
use mockall::automock;

/// Output from command execution
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// Whether the command exited with status 0
    pub success: bool,
    pub code: Option<i32>,
}

/// Trait for command execution, allowing dependency injection for testing.
///
/// A returned `Err` means the command could not be spawned at all (binary
/// missing, permission denied); a spawned-but-failed command is reported
/// through `CommandOutput::success`.
#[cfg_attr(test, automock)]
pub trait CommandExecutor: Send + Sync {
    /// Execute a command with the given arguments.
    fn execute(&self, cmd: &str, args: &[String]) -> Result<CommandOutput>;

    /// Execute a command, writing `stdin` to the child's standard input.
    fn execute_with_stdin(&self, cmd: &str, args: &[String], stdin: &str) -> Result<CommandOutput>;
}

/// Real implementation that runs actual system commands.
#[derive(Debug, Clone, Default)]
pub struct RealCommandExecutor;

impl RealCommandExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl CommandExecutor for RealCommandExecutor {
    fn execute(&self, cmd: &str, args: &[String]) -> Result<CommandOutput> {
        let output = Command::new(cmd)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        })
    }

    fn execute_with_stdin(
        &self,
        cmd: &str,
        args: &[String],
        stdin_data: &str,
    ) -> Result<CommandOutput> {
        let mut child = Command::new(cmd)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(stdin_data.as_bytes())?;
        }

        let output = child.wait_with_output()?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        })
    }
}

/// Convert a slice of &str to Vec<String>.
///
/// mockall has trouble with lifetimes in `&[&str]`, so the trait takes
/// `&[String]` and call sites convert through this helper.
pub fn args_to_strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_to_strings() {
        assert_eq!(args_to_strings(&["-n", "list"]), vec!["-n", "list"]);
        assert!(args_to_strings(&[]).is_empty());
    }

    #[test]
    fn test_real_executor_echo() {
        let executor = RealCommandExecutor::new();
        let output = executor
            .execute("echo", &args_to_strings(&["-n", "hello"]))
            .unwrap();
        assert!(output.success);
        assert_eq!(output.stdout, "hello");
    }

    #[test]
    fn test_real_executor_stdin() {
        let executor = RealCommandExecutor::new();
        let output = executor
            .execute_with_stdin("cat", &[], "swap country_CN country_CN_tmp")
            .unwrap();
        assert!(output.success);
        assert_eq!(output.stdout, "swap country_CN country_CN_tmp");
    }

    #[test]
    fn test_real_executor_spawn_failure() {
        let executor = RealCommandExecutor::new();
        let result = executor.execute("geoblock-no-such-binary", &[]);
        assert!(result.is_err());
    }

    #[test]
    fn test_mock_executor() {
        let mut mock = MockCommandExecutor::new();
        mock.expect_execute()
            .withf(|cmd, args| cmd == "ipset" && args == ["-n".to_string(), "list".to_string()])
            .times(1)
            .returning(|_, _| {
                Ok(CommandOutput {
                    stdout: "country_CN\n".to_string(),
                    success: true,
                    code: Some(0),
                    ..Default::default()
                })
            });

        let output = mock
            .execute("ipset", &args_to_strings(&["-n", "list"]))
            .unwrap();
        assert!(output.success);
        assert_eq!(output.stdout, "country_CN\n");
    }
}

//! Error types for Geoblock.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GeoblockError {
    #[error("Fetch failed for {country}: {reason}")]
    FetchFailed { country: String, reason: String },

    #[error("Address set not found: {0}")]
    SetNotFound(String),

    #[error("Address set busy: {0}")]
    SetBusy(String),

    #[error("Address set already exists: {0}")]
    AlreadyExists(String),

    #[error("Rule still present after removal attempts: {set_name} dport {port}")]
    RuleStillPresent { set_name: String, port: u16 },

    #[error("Invalid selection: {0}")]
    InvalidSelection(usize),

    #[error("Firewall subsystem unavailable: {0}")]
    SubsystemUnavailable(String),

    #[error("Refresh failed for {country}: {reason}")]
    RefreshFailed { country: String, reason: String },

    #[error("Invalid country code: {0}")]
    InvalidCountry(String),

    #[error("{program} failed: {stderr}")]
    CommandFailed { program: String, stderr: String },
}

impl GeoblockError {
    /// `AlreadyExists` is idempotence, not failure; callers may treat it as a no-op.
    pub fn is_benign(&self) -> bool {
        matches!(self, GeoblockError::AlreadyExists(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_exists_is_benign() {
        assert!(GeoblockError::AlreadyExists("country_CN".into()).is_benign());
        assert!(!GeoblockError::SetBusy("country_CN".into()).is_benign());
    }

    #[test]
    fn test_display_includes_identity() {
        let e = GeoblockError::RuleStillPresent {
            set_name: "country_RU".into(),
            port: 22,
        };
        let msg = e.to_string();
        assert!(msg.contains("country_RU"));
        assert!(msg.contains("22"));
    }
}

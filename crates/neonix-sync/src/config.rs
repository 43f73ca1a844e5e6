use serde::{Deserialize, Serialize};

use crate::error::{SyncError, SyncResult};

/// Knobs for one synchronization session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Recurse into child containers on write and read.
    pub cascade: bool,
    /// Leave objects whose content digest is unchanged untouched.
    pub skip_unchanged: bool,
    /// Reconcile cross-reference links even when the owning object is
    /// unchanged. Link and unlink are no-ops when nothing differs.
    pub relink_unchanged: bool,
    /// Default for `read_all`: defer bulk payloads behind placeholders.
    pub defer_payload: bool,
    /// Check that the channel arrays of a signal share metadata, length and
    /// unit when reading.
    pub verify_signal_groups: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            cascade: true,
            skip_unchanged: true,
            relink_unchanged: true,
            defer_payload: false,
            verify_signal_groups: true,
        }
    }
}

impl SyncConfig {
    /// Parse a configuration from TOML. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> SyncResult<Self> {
        toml::from_str(s).map_err(|e| SyncError::Config(e.to_string()))
    }

    /// Configuration that rewrites every object on every pass.
    pub fn always_write() -> Self {
        Self {
            skip_unchanged: false,
            ..Default::default()
        }
    }

    /// Configuration whose `read_all` defers bulk payloads.
    pub fn lazy() -> Self {
        Self {
            defer_payload: true,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = SyncConfig::default();
        assert!(c.cascade);
        assert!(c.skip_unchanged);
        assert!(c.relink_unchanged);
        assert!(!c.defer_payload);
        assert!(c.verify_signal_groups);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c = SyncConfig::from_toml_str("defer_payload = true\nrelink_unchanged = false\n").unwrap();
        assert!(c.defer_payload);
        assert!(!c.relink_unchanged);
        assert!(c.cascade);
    }

    #[test]
    fn bad_toml_is_config_error() {
        let err = SyncConfig::from_toml_str("cascade = \"yes\"").unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
    }

    #[test]
    fn presets() {
        assert!(!SyncConfig::always_write().skip_unchanged);
        assert!(SyncConfig::lazy().defer_payload);
    }

    #[test]
    fn json_roundtrip() {
        let c = SyncConfig::lazy();
        let json = serde_json::to_string(&c).unwrap();
        let back: SyncConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
    }
}

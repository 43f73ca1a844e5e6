use serde::{Deserialize, Serialize};

use neonix_store::StoreConfig;
use neonix_sync::SyncConfig;

use crate::error::{IoError, IoResult};

/// File and session settings, usually loaded from one TOML document:
///
/// ```toml
/// [store]
/// mode = "read_only"
///
/// [sync]
/// defer_payload = true
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IoConfig {
    pub store: StoreConfig,
    pub sync: SyncConfig,
}

impl IoConfig {
    pub fn from_toml_str(s: &str) -> IoResult<Self> {
        toml::from_str(s).map_err(|e| IoError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neonix_store::FileMode;

    #[test]
    fn empty_document_is_default() {
        assert_eq!(IoConfig::from_toml_str("").unwrap(), IoConfig::default());
    }

    #[test]
    fn sections_override_their_own_keys() {
        let cfg = IoConfig::from_toml_str(
            "[store]\nmode = \"read_only\"\n\n[sync]\ndefer_payload = true\n",
        )
        .unwrap();
        assert_eq!(cfg.store.mode, FileMode::ReadOnly);
        assert!(cfg.store.verify_checksum);
        assert!(cfg.sync.defer_payload);
        assert!(cfg.sync.skip_unchanged);
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let err = IoConfig::from_toml_str("[store]\nmode = \"append\"\n").unwrap_err();
        assert!(matches!(err, IoError::Config(_)));
    }
}

//! Snapshot configuration.

use crate::{SnapshotError, SnapshotResult};
use chrono::format::{Item, StrftimeItems};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default message of the first commit in a new store.
pub const DEFAULT_BASELINE_MESSAGE: &str = "first init";

/// Default commit message format: a sortable local timestamp, e.g. `20240315093005`.
pub const DEFAULT_MESSAGE_FORMAT: &str = "%Y%m%d%H%M%S";

/// Configuration for a snapshot store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Force-stage paths matched by ignore rules and report them as changes.
    pub include_ignored: bool,

    /// Message of the baseline commit made when a store is created.
    pub baseline_message: String,

    /// chrono format string for capture commit messages (local time).
    pub message_format: String,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            include_ignored: true,
            baseline_message: DEFAULT_BASELINE_MESSAGE.to_string(),
            message_format: DEFAULT_MESSAGE_FORMAT.to_string(),
        }
    }
}

impl SnapshotConfig {
    /// Load configuration from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> SnapshotResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Render the capture commit message for `now`.
    pub fn capture_message(&self, now: &NaiveDateTime) -> SnapshotResult<String> {
        let items: Vec<Item<'_>> = StrftimeItems::new(&self.message_format).collect();
        if items.iter().any(|item| matches!(item, Item::Error)) {
            return Err(SnapshotError::operation_failed(format!(
                "Invalid message format: {}",
                self.message_format
            )));
        }
        Ok(now.format_with_items(items.iter()).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn deploy_time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(9, 30, 5)
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = SnapshotConfig::default();
        assert!(config.include_ignored);
        assert_eq!(config.baseline_message, "first init");
        assert_eq!(config.message_format, "%Y%m%d%H%M%S");
    }

    #[test]
    fn test_load_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("deploysnap.json");
        std::fs::write(&path, r#"{ "include_ignored": false }"#).unwrap();

        let config = SnapshotConfig::load(&path).unwrap();
        assert!(!config.include_ignored);
        assert_eq!(config.baseline_message, DEFAULT_BASELINE_MESSAGE);
    }

    #[test]
    fn test_load_invalid_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("deploysnap.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = SnapshotConfig::load(&path).unwrap_err();
        assert!(matches!(err, SnapshotError::Config(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = SnapshotConfig::load(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, SnapshotError::Io(_)));
    }

    #[test]
    fn test_capture_message_is_sortable_timestamp() {
        let config = SnapshotConfig::default();
        assert_eq!(config.capture_message(&deploy_time()).unwrap(), "20240315093005");
    }

    #[test]
    fn test_capture_message_custom_format() {
        let config = SnapshotConfig {
            message_format: "deploy %Y-%m-%d %H:%M".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.capture_message(&deploy_time()).unwrap(),
            "deploy 2024-03-15 09:30"
        );
    }

    #[test]
    fn test_capture_message_rejects_bad_format() {
        let config = SnapshotConfig {
            message_format: "%Q".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.capture_message(&deploy_time()),
            Err(SnapshotError::OperationFailed(_))
        ));
    }
}

//! Snapshot data structures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Author and committer name on every snapshot.
pub const AUTHOR_NAME: &str = "deploysnap";

/// Author and committer email on every snapshot.
pub const AUTHOR_EMAIL: &str = "deploysnap@localhost";

/// Identifier of a snapshot: the hex id of its commit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnapshotId(pub String);

impl SnapshotId {
    /// Create a snapshot ID from a string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Abbreviated form, as shown by `git log --oneline`.
    pub fn short(&self) -> &str {
        self.0.get(..7).unwrap_or(&self.0)
    }
}

impl From<git2::Oid> for SnapshotId {
    fn from(oid: git2::Oid) -> Self {
        Self(oid.to_string())
    }
}

impl std::fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A committed snapshot of the project tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotInfo {
    /// Commit id.
    pub id: SnapshotId,

    /// Abbreviated commit id.
    pub short_id: String,

    /// Commit message (first line).
    pub message: String,

    /// Author name.
    pub author: String,

    /// Author email.
    pub email: String,

    /// When the snapshot was committed.
    pub timestamp: DateTime<Utc>,
}

impl SnapshotInfo {
    pub(crate) fn from_commit(commit: &git2::Commit) -> Self {
        let author = commit.author();
        let id = SnapshotId::from(commit.id());
        Self {
            short_id: id.short().to_string(),
            id,
            message: commit.summary().unwrap_or("").to_string(),
            author: author.name().unwrap_or("").to_string(),
            email: author.email().unwrap_or("").to_string(),
            timestamp: DateTime::<Utc>::from_timestamp(commit.time().seconds(), 0)
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_id() {
        let id = SnapshotId::from_string("0123456789abcdef0123456789abcdef01234567");
        assert_eq!(id.short(), "0123456");
        assert_eq!(SnapshotId::from_string("abc").short(), "abc");
    }

    #[test]
    fn test_id_from_oid() {
        let oid = git2::Oid::from_str("0123456789abcdef0123456789abcdef01234567").unwrap();
        let id = SnapshotId::from(oid);
        assert_eq!(id.to_string(), "0123456789abcdef0123456789abcdef01234567");
    }

    #[test]
    fn test_info_serializes_for_history_output() {
        let info = SnapshotInfo {
            id: SnapshotId::from_string("abc1234"),
            short_id: "abc1234".to_string(),
            message: "20240315093005".to_string(),
            author: AUTHOR_NAME.to_string(),
            email: AUTHOR_EMAIL.to_string(),
            timestamp: DateTime::<Utc>::from_timestamp(1_710_495_005, 0).unwrap(),
        };

        let json = serde_json::to_string(&info).unwrap();
        assert!(json.contains("\"message\":\"20240315093005\""));
        assert!(json.contains("\"author\":\"deploysnap\""));
        assert!(json.contains("\"short_id\":\"abc1234\""));
    }
}

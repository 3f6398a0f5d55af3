//! Working-tree change detection and staging.

use crate::{SnapshotResult, STORE_DIR};
use deploysnap_util::TimingGuard;
use git2::{IndexAddOption, Repository, Status, StatusOptions};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, error, info, warn};

const MODIFIED: Status = Status::WT_MODIFIED
    .union(Status::WT_DELETED)
    .union(Status::WT_TYPECHANGE)
    .union(Status::WT_RENAMED)
    .union(Status::INDEX_MODIFIED)
    .union(Status::INDEX_DELETED)
    .union(Status::INDEX_TYPECHANGE)
    .union(Status::INDEX_RENAMED);

/// Point-in-time classification of the working tree.
///
/// The categories overlap: a file staged as new and then edited again is
/// both `added` and `modified`. Use [`FileStatusSet::changed_paths`] for the
/// deduplicated view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileStatusSet {
    /// Tracked files changed or deleted, in the index or the working tree.
    pub modified: Vec<String>,
    /// Files never committed and not staged.
    pub untracked: Vec<String>,
    /// Files staged as new but not yet committed.
    pub added: Vec<String>,
    /// Files excluded by ignore rules.
    pub ignored: Vec<String>,
    /// Nested repositories inside the project. They cannot be staged, so they
    /// are listed here and never count as a change.
    pub nested_repositories: Vec<String>,
}

impl FileStatusSet {
    fn record(&mut self, path: &str, status: Status) {
        if status.intersects(MODIFIED) {
            self.modified.push(path.to_string());
        }
        if status.contains(Status::WT_NEW) {
            self.untracked.push(path.to_string());
        }
        if status.contains(Status::INDEX_NEW) {
            self.added.push(path.to_string());
        }
        if status.contains(Status::IGNORED) {
            self.ignored.push(path.to_string());
        }
    }

    /// True when nothing differs from the last snapshot.
    pub fn is_clean(&self) -> bool {
        self.modified.is_empty()
            && self.untracked.is_empty()
            && self.added.is_empty()
            && self.ignored.is_empty()
    }

    /// Every path in any category, each at most once, in first-seen order.
    pub fn changed_paths(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut paths = Vec::new();
        for path in self
            .modified
            .iter()
            .chain(&self.untracked)
            .chain(&self.added)
            .chain(&self.ignored)
        {
            if seen.insert(path.as_str()) {
                paths.push(path.clone());
            }
        }
        paths
    }
}

/// Outcome of asking what changed since the last snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum ChangeReport {
    /// The working tree matches the last snapshot.
    Clean,
    /// Relative paths that differ, deduplicated.
    Changed(Vec<String>),
    /// The status query failed.
    QueryFailed(String),
}

impl ChangeReport {
    pub fn is_clean(&self) -> bool {
        matches!(self, ChangeReport::Clean)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ChangeReport::QueryFailed(_))
    }

    /// Changed paths; empty for a clean tree or a failed query.
    pub fn paths(&self) -> &[String] {
        match self {
            ChangeReport::Changed(paths) => paths.as_slice(),
            _ => &[],
        }
    }

    pub fn into_paths(self) -> Vec<String> {
        match self {
            ChangeReport::Changed(paths) => paths,
            _ => Vec::new(),
        }
    }
}

/// Reads working-tree status and stages changes for one repository.
pub struct ChangeSet<'repo> {
    repo: &'repo Repository,
    include_ignored: bool,
}

impl<'repo> ChangeSet<'repo> {
    pub fn new(repo: &'repo Repository, include_ignored: bool) -> Self {
        Self {
            repo,
            include_ignored,
        }
    }

    /// Query the working-tree status once.
    pub fn status(&self) -> SnapshotResult<FileStatusSet> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_ignored(self.include_ignored)
            .recurse_ignored_dirs(self.include_ignored)
            .include_unmodified(false)
            .exclude_submodules(true);

        let statuses = self.repo.statuses(Some(&mut opts))?;
        let mut set = FileStatusSet::default();
        for entry in statuses.iter() {
            let Some(path) = entry.path() else {
                warn!("Skipping path that is not valid UTF-8");
                continue;
            };
            if self.is_nested_repository(path) {
                set.nested_repositories.push(path.to_string());
                continue;
            }
            set.record(path, entry.status());
        }

        Ok(set)
    }

    /// Report everything that differs from the last snapshot.
    pub fn report(&self) -> ChangeReport {
        let _timing = TimingGuard::status(self.workdir_display());

        let status = self.status();
        if let Ok(set) = &status {
            if !set.nested_repositories.is_empty() {
                info!(paths = ?set.nested_repositories, "Skipping nested repositories");
            }
        }

        match status {
            Ok(set) if set.is_clean() => {
                info!("No file changed since the last snapshot");
                ChangeReport::Clean
            }
            Ok(set) => ChangeReport::Changed(set.changed_paths()),
            Err(e) => {
                error!(error = %e, "Failed to list changed files");
                ChangeReport::QueryFailed(e.to_string())
            }
        }
    }

    /// Add every ignored path to the index, bypassing the ignore rules for
    /// this staging only. The ignore files themselves are left untouched.
    ///
    /// A path that cannot be added is logged and skipped. Returns how many
    /// paths were staged.
    pub fn stage_ignored_paths(&self) -> SnapshotResult<usize> {
        let ignored = self.status()?.ignored;
        if ignored.is_empty() {
            return Ok(0);
        }

        let mut index = self.repo.index()?;
        let mut staged = 0;
        for path in &ignored {
            match index.add_path(Path::new(path)) {
                Ok(()) => staged += 1,
                Err(e) => warn!(path = %path, error = %e, "Failed to stage ignored path"),
            }
        }
        index.write()?;

        debug!(staged, total = ignored.len(), "Staged ignored paths");
        Ok(staged)
    }

    /// Stage all new, modified and deleted paths under the root.
    pub fn stage_all(&self) -> SnapshotResult<()> {
        let mut index = self.repo.index()?;
        index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None)?;
        index.update_all(["*"].iter(), None)?;
        index.write()?;
        Ok(())
    }

    /// Status lists a nested repository as a single directory entry.
    fn is_nested_repository(&self, path: &str) -> bool {
        path.ends_with('/')
            && self
                .repo
                .workdir()
                .is_some_and(|root| root.join(path).join(STORE_DIR).exists())
    }

    fn workdir_display(&self) -> String {
        self.repo
            .workdir()
            .unwrap_or_else(|| self.repo.path())
            .display()
            .to_string()
    }
}

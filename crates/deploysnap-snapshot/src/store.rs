//! Snapshot store lifecycle: discovery, initialization, capture and disposal.

use crate::snapshot::{AUTHOR_EMAIL, AUTHOR_NAME};
use crate::{
    ChangeReport, ChangeSet, SnapshotConfig, SnapshotError, SnapshotInfo, SnapshotResult,
};
use chrono::Local;
use deploysnap_util::TimingGuard;
use git2::{Commit, ErrorCode, Repository, Signature};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn, Dispatch};

/// Name of the directory that marks a store inside a project.
pub const STORE_DIR: &str = ".git";

/// How [`SnapshotStore::try_ensure_initialized`] reached a usable store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitOutcome {
    /// A store already existed and was opened; history is unchanged.
    Opened,
    /// A new store was created with this baseline snapshot.
    Created(SnapshotInfo),
}

/// A git-backed snapshot store for one project directory.
///
/// The store owns at most one open repository handle. It is released by
/// [`SnapshotStore::dispose`] or when the store is dropped.
///
/// Public operations never return errors: each one logs the failure and
/// reduces it to a sentinel (`false`, `None`, [`ChangeReport::QueryFailed`]).
/// The `try_*` variants return the underlying error instead.
///
/// Access to one project path must be serialized by the caller; nothing
/// here guards against two processes snapshotting the same directory.
pub struct SnapshotStore {
    project_path: PathBuf,
    config: SnapshotConfig,
    repo: Option<Repository>,
    dispatch: Option<Dispatch>,
}

impl SnapshotStore {
    /// Create a store for `project_path` without touching the disk.
    pub fn new(project_path: impl Into<PathBuf>, config: SnapshotConfig) -> Self {
        Self {
            project_path: project_path.into(),
            config,
            repo: None,
            dispatch: None,
        }
    }

    /// Create a store and immediately run [`SnapshotStore::ensure_initialized`]
    /// on the project path. Check [`SnapshotStore::is_initialized`] afterwards.
    pub fn open(project_path: impl Into<PathBuf>, config: SnapshotConfig) -> Self {
        let mut store = Self::new(project_path, config);
        store.ensure_initialized(None);
        store
    }

    /// Send this store's log events to `dispatch` instead of the global
    /// default subscriber.
    pub fn with_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = Some(dispatch);
        self
    }

    pub fn project_path(&self) -> &Path {
        &self.project_path
    }

    pub fn config(&self) -> &SnapshotConfig {
        &self.config
    }

    /// True while a usable repository handle is open.
    pub fn is_initialized(&self) -> bool {
        self.repo.is_some()
    }

    /// Find the store governing `path`, walking upward like git does, and
    /// return its git directory.
    pub fn locate(path: &Path) -> SnapshotResult<PathBuf> {
        match Repository::discover(path) {
            Ok(repo) => Ok(repo.path().to_path_buf()),
            Err(e) if e.code() == ErrorCode::NotFound => {
                Err(SnapshotError::not_found(path.display().to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Whether a valid store exists at or above `path`.
    pub fn is_store_valid(&self, path: &Path) -> bool {
        observed(self.dispatch.as_ref(), || match Self::locate(path) {
            Ok(git_dir) => {
                debug!(path = %path.display(), git_dir = %git_dir.display(), "Found snapshot store");
                true
            }
            Err(SnapshotError::NotFound(_)) => {
                debug!(path = %path.display(), "No snapshot store found");
                false
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Snapshot store lookup failed");
                false
            }
        })
    }

    /// Open the store at `path` (default: the project path), creating it with
    /// a baseline snapshot if no store marker exists there.
    ///
    /// Any handle already held is released first. On success `path` becomes
    /// the project path, so the handle and the path always name the same
    /// directory.
    pub fn try_ensure_initialized(&mut self, path: Option<&Path>) -> SnapshotResult<InitOutcome> {
        let path = path.unwrap_or(&self.project_path).to_path_buf();
        let _timing = TimingGuard::init(path.display().to_string());
        self.repo = None;

        let outcome = if path.join(STORE_DIR).exists() {
            let repo = Repository::open(&path)?;
            info!(path = %path.display(), "Snapshot store already exists");
            self.repo = Some(repo);
            InitOutcome::Opened
        } else {
            let repo = Repository::init(&path)?;
            info!(path = %path.display(), "Created snapshot store");

            stage_everything(&repo, self.config.include_ignored);
            let baseline = commit_index(&repo, &self.config.baseline_message)?;
            info!(id = %baseline.short_id, "Committed baseline snapshot");
            self.repo = Some(repo);
            InitOutcome::Created(baseline)
        };

        self.project_path = path;
        Ok(outcome)
    }

    /// Never-failing form of [`SnapshotStore::try_ensure_initialized`].
    pub fn ensure_initialized(&mut self, path: Option<&Path>) -> bool {
        let dispatch = self.dispatch.clone();
        observed(dispatch.as_ref(), || match self.try_ensure_initialized(path) {
            Ok(_) => true,
            Err(e) => {
                error!(
                    path = %path.unwrap_or(&self.project_path).display(),
                    error = %e,
                    "Failed to create snapshot store"
                );
                false
            }
        })
    }

    /// Stage everything, ignored paths included, and commit it with a
    /// timestamp message.
    ///
    /// Staging failures are logged and the commit is still attempted with
    /// whatever was staged. Two captures within the same second get the same
    /// message.
    pub fn try_capture_snapshot(&self) -> SnapshotResult<SnapshotInfo> {
        let repo = self.repo()?;
        let _timing = TimingGuard::capture(self.project_path.display().to_string());

        stage_everything(repo, self.config.include_ignored);
        let message = self.config.capture_message(&Local::now().naive_local())?;
        commit_index(repo, &message)
    }

    /// Never-failing form of [`SnapshotStore::try_capture_snapshot`].
    pub fn capture_snapshot(&self) -> Option<SnapshotInfo> {
        observed(self.dispatch.as_ref(), || {
            info!(path = %self.project_path.display(), "Snapshot capture started");
            match self.try_capture_snapshot() {
                Ok(snapshot) => {
                    info!(id = %snapshot.short_id, message = %snapshot.message, "Snapshot committed");
                    Some(snapshot)
                }
                Err(e) => {
                    warn!(error = %e, "Snapshot commit failed");
                    None
                }
            }
        })
    }

    /// Change detection bound to the open repository.
    pub fn change_set(&self) -> SnapshotResult<ChangeSet<'_>> {
        Ok(ChangeSet::new(self.repo()?, self.config.include_ignored))
    }

    /// What differs from the last snapshot.
    pub fn get_changes(&self) -> ChangeReport {
        observed(self.dispatch.as_ref(), || match self.change_set() {
            Ok(changes) => changes.report(),
            Err(e) => {
                error!(error = %e, "Failed to list changed files");
                ChangeReport::QueryFailed(e.to_string())
            }
        })
    }

    /// Snapshots from newest to oldest, at most `limit` of them.
    pub fn history(&self, limit: usize) -> SnapshotResult<Vec<SnapshotInfo>> {
        let repo = self.repo()?;
        match repo.head() {
            Ok(_) => {}
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => {
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        }

        let mut revwalk = repo.revwalk()?;
        revwalk.push_head()?;

        let mut snapshots = Vec::new();
        for oid in revwalk.take(limit) {
            let commit = repo.find_commit(oid?)?;
            snapshots.push(SnapshotInfo::from_commit(&commit));
        }
        Ok(snapshots)
    }

    /// Release the repository handle. Safe to call repeatedly, and on a store
    /// that never initialized.
    pub fn dispose(&mut self) {
        if self.repo.take().is_some() {
            observed(self.dispatch.as_ref(), || {
                debug!(path = %self.project_path.display(), "Released snapshot store handle");
            });
        }
    }

    fn repo(&self) -> SnapshotResult<&Repository> {
        self.repo.as_ref().ok_or(SnapshotError::NotInitialized)
    }
}

/// Run `f` with `dispatch` as the default subscriber, if one was injected.
fn observed<R>(dispatch: Option<&Dispatch>, f: impl FnOnce() -> R) -> R {
    match dispatch {
        Some(dispatch) => tracing::dispatcher::with_default(dispatch, f),
        None => f(),
    }
}

/// Stage ignored paths first, then everything else. Failures are logged.
fn stage_everything(repo: &Repository, include_ignored: bool) {
    let changes = ChangeSet::new(repo, include_ignored);
    if let Err(e) = changes.stage_ignored_paths() {
        warn!(error = %e, "Failed to stage ignored paths");
    }
    if let Err(e) = changes.stage_all() {
        warn!(error = %e, "Failed to stage changes");
    }
}

/// Commit the current index on top of HEAD.
///
/// An unborn HEAD always gets a commit, even for an empty tree. Otherwise a
/// tree identical to HEAD's is rejected with [`SnapshotError::EmptyCommit`].
fn commit_index(repo: &Repository, message: &str) -> SnapshotResult<SnapshotInfo> {
    let mut index = repo.index()?;
    let tree_id = index.write_tree()?;
    let tree = repo.find_tree(tree_id)?;

    let parent = match repo.head() {
        Ok(head) => Some(head.peel_to_commit()?),
        Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => None,
        Err(e) => return Err(e.into()),
    };

    if parent.as_ref().is_some_and(|p| p.tree_id() == tree_id) {
        return Err(SnapshotError::EmptyCommit);
    }

    let sig = Signature::now(AUTHOR_NAME, AUTHOR_EMAIL)?;
    let parents: Vec<&Commit> = parent.iter().collect();
    let commit_id = repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)?;

    let commit = repo.find_commit(commit_id)?;
    Ok(SnapshotInfo::from_commit(&commit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> SnapshotStore {
        SnapshotStore::new(dir.path(), SnapshotConfig::default())
    }

    #[test]
    fn test_new_store_is_not_initialized() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert!(!store.is_initialized());
        assert!(!dir.path().join(STORE_DIR).exists());
    }

    #[test]
    fn test_operations_on_uninitialized_store_degrade() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        assert!(store.capture_snapshot().is_none());
        assert!(store.get_changes().is_failed());
        assert!(matches!(
            store.try_capture_snapshot(),
            Err(SnapshotError::NotInitialized)
        ));
        assert!(matches!(store.history(10), Err(SnapshotError::NotInitialized)));
    }

    #[test]
    fn test_init_creates_baseline_with_existing_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("index.html"), "<html/>").unwrap();
        let mut store = store_in(&dir);

        let outcome = store.try_ensure_initialized(None).unwrap();
        let InitOutcome::Created(baseline) = outcome else {
            panic!("expected a new store");
        };
        assert_eq!(baseline.message, "first init");
        assert_eq!(baseline.short_id, baseline.id.short());
        assert_eq!(baseline.short_id.len(), 7);
        assert_eq!(baseline.author, AUTHOR_NAME);
        assert_eq!(baseline.email, AUTHOR_EMAIL);
        assert!(store.is_initialized());
        assert!(store.get_changes().is_clean());
    }

    #[test]
    fn test_init_in_empty_directory() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);

        assert!(store.ensure_initialized(None));
        assert_eq!(store.history(10).unwrap().len(), 1);
    }

    #[test]
    fn test_init_with_explicit_path() {
        let dir = TempDir::new().unwrap();
        let site = dir.path().join("site");
        fs::create_dir_all(&site).unwrap();
        let mut store = SnapshotStore::new(&site, SnapshotConfig::default());

        assert!(store.ensure_initialized(Some(&site)));
        assert!(site.join(STORE_DIR).is_dir());
    }

    #[test]
    fn test_init_fails_for_file_path() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("not-a-dir");
        fs::write(&file, "x").unwrap();
        let mut store = SnapshotStore::new(&file, SnapshotConfig::default());

        assert!(!store.ensure_initialized(None));
        assert!(!store.is_initialized());
    }

    #[test]
    fn test_custom_baseline_message() {
        let dir = TempDir::new().unwrap();
        let config = SnapshotConfig {
            baseline_message: "baseline".to_string(),
            ..Default::default()
        };
        let store = SnapshotStore::open(dir.path(), config);

        let history = store.history(10).unwrap();
        assert_eq!(history[0].message, "baseline");
    }

    #[test]
    fn test_capture_without_changes_is_rejected() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        let store = SnapshotStore::open(dir.path(), SnapshotConfig::default());

        assert!(matches!(
            store.try_capture_snapshot(),
            Err(SnapshotError::EmptyCommit)
        ));
        assert!(store.capture_snapshot().is_none());
        assert_eq!(store.history(10).unwrap().len(), 1);
    }

    #[test]
    fn test_capture_message_is_a_timestamp() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::open(dir.path(), SnapshotConfig::default());
        fs::write(dir.path().join("a.txt"), "a").unwrap();

        let snapshot = store.capture_snapshot().unwrap();
        assert_eq!(snapshot.message.len(), 14);
        assert!(snapshot.message.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_capture_records_deletions() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        fs::write(dir.path().join("old.txt"), "old").unwrap();
        let store = SnapshotStore::open(dir.path(), SnapshotConfig::default());

        fs::remove_file(dir.path().join("old.txt")).unwrap();
        assert_eq!(store.get_changes().paths(), ["old.txt".to_string()]);

        store.capture_snapshot().unwrap();
        assert!(store.get_changes().is_clean());
    }

    #[test]
    fn test_dispose_twice_then_reopen() {
        let dir = TempDir::new().unwrap();
        let mut store = SnapshotStore::open(dir.path(), SnapshotConfig::default());

        store.dispose();
        store.dispose();
        assert!(!store.is_initialized());
        assert!(store.get_changes().is_failed());

        assert!(store.ensure_initialized(None));
        assert_eq!(store.history(10).unwrap().len(), 1);
    }

    #[test]
    fn test_dispose_never_initialized() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.dispose();
        assert!(!store.is_initialized());
    }

    #[test]
    fn test_init_elsewhere_moves_project_path() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("first");
        let second = dir.path().join("second");
        fs::create_dir_all(&first).unwrap();
        fs::create_dir_all(&second).unwrap();
        let mut store = SnapshotStore::new(&first, SnapshotConfig::default());

        assert!(store.ensure_initialized(None));
        assert!(store.ensure_initialized(Some(&second)));
        assert_eq!(store.project_path(), second.as_path());
        assert!(second.join(STORE_DIR).is_dir());

        // changes are read from the directory the handle points at
        fs::write(second.join("b.txt"), "b").unwrap();
        fs::write(first.join("a.txt"), "a").unwrap();
        assert_eq!(store.get_changes().paths(), ["b.txt".to_string()]);
    }

    #[test]
    fn test_failed_reinit_releases_previous_handle() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("not-a-dir");
        fs::write(&file, "x").unwrap();
        let mut store = SnapshotStore::open(dir.path(), SnapshotConfig::default());
        assert!(store.is_initialized());

        assert!(!store.ensure_initialized(Some(&file)));
        assert!(!store.is_initialized());
        assert_eq!(store.project_path(), dir.path());
    }

    #[test]
    fn test_history_of_unborn_store_is_empty() {
        let dir = TempDir::new().unwrap();
        Repository::init(dir.path()).unwrap();
        let store = SnapshotStore::open(dir.path(), SnapshotConfig::default());

        assert!(store.is_initialized());
        assert!(store.history(10).unwrap().is_empty());
    }

    #[test]
    fn test_history_with_corrupt_head_is_an_error() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::open(dir.path(), SnapshotConfig::default());
        fs::write(dir.path().join(STORE_DIR).join("HEAD"), "not a reference\n").unwrap();

        assert!(matches!(store.history(10), Err(SnapshotError::Git(_))));
    }

    #[test]
    fn test_locate_walks_upward() {
        let dir = TempDir::new().unwrap();
        let _store = SnapshotStore::open(dir.path(), SnapshotConfig::default());
        let nested = dir.path().join("wwwroot/js");
        fs::create_dir_all(&nested).unwrap();

        let git_dir = SnapshotStore::locate(&nested).unwrap();
        assert!(git_dir.ends_with(STORE_DIR));
    }
}

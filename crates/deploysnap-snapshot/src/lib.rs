//! Git-backed deployment snapshots for deploysnap.
//!
//! Before and after a deployment step, the whole project directory is
//! committed to a local git repository so the changes can be listed and
//! reverted if a rollout fails:
//! - Create the store on first use, with a baseline snapshot
//! - Capture every file, including paths the project's ignore rules exclude
//! - List what changed since the last snapshot
//!
//! # Example
//!
//! ```no_run
//! use deploysnap_snapshot::{ChangeReport, SnapshotConfig, SnapshotStore};
//!
//! let mut store = SnapshotStore::open("/srv/www/shop", SnapshotConfig::default());
//! if !store.is_initialized() {
//!     // already logged; deploy without a snapshot
//!     return;
//! }
//!
//! // ... deploy ...
//!
//! if let ChangeReport::Changed(paths) = store.get_changes() {
//!     println!("{} files changed", paths.len());
//!     store.capture_snapshot();
//! }
//! store.dispose();
//! ```

mod changes;
mod config;
mod error;
mod snapshot;
mod store;

pub use changes::{ChangeReport, ChangeSet, FileStatusSet};
pub use config::{SnapshotConfig, DEFAULT_BASELINE_MESSAGE, DEFAULT_MESSAGE_FORMAT};
pub use error::{SnapshotError, SnapshotResult};
pub use snapshot::{SnapshotId, SnapshotInfo, AUTHOR_EMAIL, AUTHOR_NAME};
pub use store::{InitOutcome, SnapshotStore, STORE_DIR};

//! Subcommand implementations.

use deploysnap_snapshot::{ChangeReport, SnapshotConfig, SnapshotError, SnapshotStore};
use std::path::Path;
use std::process::ExitCode;
use tracing::warn;

/// Exit code of `check` when no valid store exists.
const NO_STORE: u8 = 2;

pub fn check(project: &Path, config: SnapshotConfig) -> ExitCode {
    let store = SnapshotStore::new(project, config);
    if store.is_store_valid(project) {
        println!("valid");
        ExitCode::SUCCESS
    } else {
        println!("missing");
        ExitCode::from(NO_STORE)
    }
}

pub fn init(project: &Path, config: SnapshotConfig) -> ExitCode {
    let mut store = SnapshotStore::new(project, config);
    let ok = store.ensure_initialized(None);
    store.dispose();

    if ok {
        println!("initialized {}", project.display());
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

pub fn capture(project: &Path, config: SnapshotConfig) -> ExitCode {
    let mut store = SnapshotStore::open(project, config);
    if !store.is_initialized() {
        return ExitCode::FAILURE;
    }

    let code = match store.try_capture_snapshot() {
        Ok(snapshot) => {
            println!("{} {}", snapshot.short_id, snapshot.message);
            ExitCode::SUCCESS
        }
        Err(SnapshotError::EmptyCommit) => {
            println!("nothing to capture");
            ExitCode::SUCCESS
        }
        Err(e) => {
            warn!(error = %e, "Snapshot commit failed");
            ExitCode::FAILURE
        }
    };
    store.dispose();
    code
}

pub fn changes(project: &Path, config: SnapshotConfig, json: bool) -> anyhow::Result<ExitCode> {
    let mut store = SnapshotStore::open(project, config);
    let report = store.get_changes();
    store.dispose();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for path in report.paths() {
            println!("{path}");
        }
    }

    Ok(match report {
        ChangeReport::QueryFailed(_) => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    })
}

pub fn history(
    project: &Path,
    config: SnapshotConfig,
    limit: usize,
    json: bool,
) -> anyhow::Result<ExitCode> {
    let mut store = SnapshotStore::open(project, config);
    if !store.is_initialized() {
        return Ok(ExitCode::FAILURE);
    }
    let snapshots = store.history(limit)?;
    store.dispose();

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshots)?);
    } else {
        for snapshot in &snapshots {
            println!(
                "{} {} {}",
                snapshot.short_id,
                snapshot.timestamp.to_rfc3339(),
                snapshot.message
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::info;

use crate::model::{Backup, BackupFile};
use crate::store;
use crate::util::{now_utc_string, sha256_hex, write_json_pretty};

pub fn snapshot_digest(snapshot: &serde_json::Map<String, serde_json::Value>) -> Result<String> {
    let bytes = serde_json::to_vec(snapshot).context("failed to serialize record snapshot")?;
    Ok(sha256_hex(&bytes))
}

/// Snapshots every targeted record and persists the file; returns the path plus the ids that were found.
pub fn backup_records(
    connection: &Connection,
    recipe_ids: &[i64],
    backups_dir: &Path,
    run_id: &str,
    file_stamp: &str,
) -> Result<(PathBuf, Vec<i64>)> {
    let mut backups = Vec::with_capacity(recipe_ids.len());

    for recipe_id in recipe_ids {
        let snapshot = store::read_record_snapshot(connection, *recipe_id)
            .with_context(|| format!("failed to snapshot recipe {recipe_id}"))?;
        let Some(snapshot) = snapshot else {
            continue;
        };

        backups.push(Backup {
            recipe_id: *recipe_id,
            snapshot_sha256: snapshot_digest(&snapshot)?,
            full_field_snapshot: snapshot,
            backup_timestamp: now_utc_string(),
        });
    }

    let backed_up = backups.iter().map(|backup| backup.recipe_id).collect::<Vec<i64>>();
    let path = backups_dir.join(format!("recipe_backup_{file_stamp}.json"));
    let file = BackupFile {
        run_id: run_id.to_string(),
        created_at: now_utc_string(),
        record_count: backups.len(),
        backups,
    };
    write_json_pretty(&path, &file)?;

    info!(path = %path.display(), records = file.record_count, "backup written");
    Ok((path, backed_up))
}

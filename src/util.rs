use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};

pub fn now_utc_string() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn utc_compact_string(ts: DateTime<Utc>) -> String {
    ts.format("%Y%m%dT%H%M%SZ").to_string()
}

pub fn ensure_directory(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("failed to create directory: {}", path.display()))
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

pub fn write_json_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let data = serde_json::to_vec_pretty(value)
        .with_context(|| format!("failed to serialize json: {}", path.display()))?;
    write_bytes(path, &data, true)
}

pub fn write_text(path: &Path, contents: &str) -> Result<()> {
    write_bytes(path, contents.as_bytes(), false)
}

fn write_bytes(path: &Path, data: &[u8], trailing_newline: bool) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_directory(parent)?;
    }

    let mut file = File::create(path)
        .with_context(|| format!("failed to create file: {}", path.display()))?;
    file.write_all(data)
        .with_context(|| format!("failed to write file: {}", path.display()))?;
    if trailing_newline {
        file.write_all(b"\n")
            .with_context(|| format!("failed to finalize file: {}", path.display()))?;
    }

    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_slice(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

/// Loads a predecessor phase artifact; a missing file is a fatal precondition failure.
pub fn read_required_artifact<T: DeserializeOwned>(path: &Path, phase: &str) -> Result<T> {
    if !path.exists() {
        bail!(
            "{phase} artifact missing at {}; run the {phase} stage first",
            path.display()
        );
    }
    read_json(path)
}

pub fn read_optional_artifact<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    read_json(path).map(Some)
}

pub fn round_ratio(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

pub fn percent_of(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    ((count as f64 / total as f64) * 1_000.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_of_handles_empty_total() {
        assert_eq!(percent_of(3, 0), 0.0);
        assert_eq!(percent_of(1, 3), 33.3);
        assert_eq!(percent_of(3, 3), 100.0);
    }

    #[test]
    fn read_required_artifact_fails_when_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("structure_report.json");
        let result: Result<serde_json::Value> = read_required_artifact(&missing, "structure");
        let err = result.expect_err("missing artifact must be fatal");
        assert!(err.to_string().contains("structure artifact missing"));
    }

    #[test]
    fn write_then_read_json_preserves_value() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("value.json");
        write_json_pretty(&path, &serde_json::json!({"total": 4})).expect("write");
        let value: serde_json::Value = read_json(&path).expect("read");
        assert_eq!(value["total"], 4);
    }
}

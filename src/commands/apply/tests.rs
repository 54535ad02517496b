use rusqlite::Connection;

use super::*;
use crate::cli::RunMode;
use crate::model::{BackupFile, DerivedIngredient};
use crate::store::fixtures;
use crate::util::read_json;

fn derived(names: &[&str]) -> Vec<DerivedIngredient> {
    names
        .iter()
        .map(|name| DerivedIngredient {
            ingredient: name.to_string(),
            amount: "1".to_string(),
            unit: "cup".to_string(),
            optional: None,
        })
        .collect()
}

fn result(recipe_id: i64, confidence: f64) -> DerivationResult {
    DerivationResult {
        recipe_id,
        recipe_name: format!("recipe {recipe_id}"),
        original_ingredients: Vec::new(),
        derived_ingredients: derived(&["ground beef", "breadcrumbs", "ketchup"]),
        confidence,
        validation_notes: vec!["inferred from instructions".to_string()],
    }
}

fn report(results: Vec<DerivationResult>) -> DerivationReport {
    DerivationReport {
        run_id: "derivation-test".to_string(),
        generated_at: "2026-01-01T00:00:00Z".to_string(),
        candidates: results.len(),
        derived: results.len(),
        failed: 0,
        high_confidence: 0,
        results,
    }
}

fn options(mode: RunMode, backups_dir: &std::path::Path) -> ApplyOptions {
    ApplyOptions {
        mode,
        min_confidence: 0.90,
        reapply: false,
        backups_dir: backups_dir.to_path_buf(),
    }
}

fn qa_state(connection: &Connection, recipe_id: i64) -> (String, Option<String>) {
    connection
        .query_row(
            "SELECT qa_status, ingredients FROM recipes WHERE id = ?1",
            [recipe_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .expect("qa state")
}

#[test]
fn confident_fix_is_backed_up_then_applied() {
    let dir = tempfile::tempdir().expect("tempdir");
    let connection = fixtures::corpus();
    let id = fixtures::insert_recipe(&connection, "Meatloaf", Some("[]"), Some(r#"["Bake."]"#));

    let log = apply_derivations(
        &connection,
        &report(vec![result(id, 0.95)]),
        &options(RunMode::Apply, dir.path()),
    )
    .expect("apply");

    assert_eq!(log.applied_fixes, 1);
    assert!(log.totals_consistent());
    assert!(log.backup_created);
    let entry = &log.entries[0];
    assert_eq!(entry.status, ApplyStatus::Applied);
    assert_eq!(entry.ingredients_before, 0);
    assert_eq!(entry.ingredients_after, 3);

    let (status, ingredients) = qa_state(&connection, id);
    assert_eq!(status, "fixed");
    assert!(ingredients.expect("ingredients").contains("ground beef"));

    let backup: BackupFile = read_json(std::path::Path::new(
        log.backup_path.as_deref().expect("backup path"),
    ))
    .expect("backup file");
    assert_eq!(backup.record_count, 1);
    let snapshot = &backup.backups[0];
    assert_eq!(snapshot.recipe_id, id);
    assert_eq!(
        snapshot.full_field_snapshot.get("qa_status"),
        Some(&serde_json::Value::from("pending"))
    );
    assert_eq!(
        snapshot.full_field_snapshot.get("ingredients"),
        Some(&serde_json::Value::from("[]"))
    );
    assert_eq!(
        snapshot_digest(&snapshot.full_field_snapshot).expect("digest"),
        snapshot.snapshot_sha256
    );
}

#[test]
fn low_confidence_result_is_skipped_without_mutation() {
    let dir = tempfile::tempdir().expect("tempdir");
    let connection = fixtures::corpus();
    let id = fixtures::insert_recipe(&connection, "Meatloaf", Some("[]"), Some(r#"["Bake."]"#));

    let log = apply_derivations(
        &connection,
        &report(vec![result(id, 0.72)]),
        &options(RunMode::Apply, dir.path()),
    )
    .expect("apply");

    assert_eq!(log.skipped_fixes, 1);
    assert_eq!(log.applied_fixes, 0);
    assert!(!log.backup_created);
    assert_eq!(qa_state(&connection, id).0, "pending");
}

#[test]
fn dry_run_reports_without_backup_or_write() {
    let dir = tempfile::tempdir().expect("tempdir");
    let connection = fixtures::corpus();
    let id = fixtures::insert_recipe(&connection, "Meatloaf", Some("[]"), Some(r#"["Bake."]"#));

    let log = apply_derivations(
        &connection,
        &report(vec![result(id, 0.95), result(id + 1, 0.5)]),
        &options(RunMode::DryRun, dir.path()),
    )
    .expect("dry run");

    assert_eq!(log.mode, "dry-run");
    assert_eq!(log.total_fixes, 2);
    assert_eq!(log.applied_fixes, 1);
    assert_eq!(log.skipped_fixes, 1);
    assert!(log.totals_consistent());
    assert!(!log.backup_created);
    assert!(std::fs::read_dir(dir.path()).expect("dir").next().is_none());
    assert_eq!(qa_state(&connection, id), ("pending".to_string(), Some("[]".to_string())));
}

#[test]
fn already_fixed_records_need_reapply() {
    let dir = tempfile::tempdir().expect("tempdir");
    let connection = fixtures::corpus();
    let id = fixtures::insert_recipe(&connection, "Meatloaf", Some("[]"), Some(r#"["Bake."]"#));
    let derivations = report(vec![result(id, 0.95)]);

    apply_derivations(&connection, &derivations, &options(RunMode::Apply, dir.path())).expect("first");
    let second = apply_derivations(&connection, &derivations, &options(RunMode::Apply, dir.path()))
        .expect("second");
    assert_eq!(second.skipped_fixes, 1);
    assert_eq!(second.entries[0].ingredients_before, 3);
    assert!(!second.backup_created);

    let mut reapply = options(RunMode::Apply, dir.path());
    reapply.reapply = true;
    let third = apply_derivations(&connection, &derivations, &reapply).expect("third");
    assert_eq!(third.applied_fixes, 1);
}

#[test]
fn record_failures_do_not_abort_the_batch() {
    let dir = tempfile::tempdir().expect("tempdir");
    let connection = fixtures::corpus();
    let locked = fixtures::insert_recipe(&connection, "Locked", Some("[]"), Some(r#"["Bake."]"#));
    let open = fixtures::insert_recipe(&connection, "Open", Some("[]"), Some(r#"["Bake."]"#));
    connection
        .execute_batch(&format!(
            "
            CREATE TRIGGER reject_locked BEFORE UPDATE ON recipes
            WHEN OLD.id = {locked}
            BEGIN
              SELECT RAISE(ABORT, 'record is locked');
            END;
            "
        ))
        .expect("trigger");

    let log = apply_derivations(
        &connection,
        &report(vec![result(locked, 0.95), result(999, 0.95), result(open, 0.97)]),
        &options(RunMode::Apply, dir.path()),
    )
    .expect("apply");

    assert_eq!(log.total_fixes, 3);
    assert_eq!(log.errors, 2);
    assert_eq!(log.applied_fixes, 1);
    assert!(log.totals_consistent());
    assert_eq!(qa_state(&connection, open).0, "fixed");
    assert_eq!(qa_state(&connection, locked).0, "pending");

    let locked_entry = log
        .entries
        .iter()
        .find(|entry| entry.recipe_id == locked)
        .expect("locked entry");
    assert!(
        locked_entry
            .error_message
            .as_deref()
            .is_some_and(|message| message.contains("record is locked"))
    );
}

#[test]
fn classify_separates_record_and_store_failures() {
    let constraint = rusqlite::Error::SqliteFailure(
        rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT),
        Some("CHECK constraint failed".to_string()),
    );
    assert!(matches!(
        ApplyFailure::classify(1, constraint),
        ApplyFailure::Record { .. }
    ));

    let io = rusqlite::Error::SqliteFailure(rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_IOERR), None);
    assert!(matches!(
        ApplyFailure::classify(1, io),
        ApplyFailure::Fatal { recipe_id: 1, .. }
    ));
}

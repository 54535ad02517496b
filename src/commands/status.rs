use std::path::Path;

use anyhow::Result;
use rusqlite::Connection;
use tracing::{info, warn};

use crate::artifacts::ArtifactPaths;
use crate::cli::StatusArgs;
use crate::store;
use crate::util::read_json;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorpusCounts {
    pub recipes: i64,
    pub pending: i64,
    pub fixed: i64,
    pub links: i64,
    pub equipment: i64,
    pub equipment_links: i64,
}

pub fn run(args: StatusArgs) -> Result<()> {
    let paths = ArtifactPaths::new(&args.corpus.reports_dir());
    let db_path = args.corpus.db_path();

    info!(cache_root = %args.corpus.cache_root.display(), "status requested");

    for (name, path) in paths.all_named() {
        if !path.exists() {
            warn!(artifact = name, path = %path.display(), "artifact missing");
            continue;
        }
        match artifact_run_id(path) {
            Some(run_id) => info!(artifact = name, run_id = %run_id, "artifact present"),
            None => info!(artifact = name, path = %path.display(), "artifact present"),
        }
    }

    if db_path.exists() {
        let connection = store::open_corpus_read_only(&db_path)?;
        let counts = corpus_counts(&connection)?;
        info!(
            path = %db_path.display(),
            recipes = counts.recipes,
            pending = counts.pending,
            fixed = counts.fixed,
            links = counts.links,
            equipment = counts.equipment,
            equipment_links = counts.equipment_links,
            "corpus status"
        );
    } else {
        warn!(path = %db_path.display(), "corpus database missing");
    }

    Ok(())
}

pub fn corpus_counts(connection: &Connection) -> Result<CorpusCounts> {
    Ok(CorpusCounts {
        recipes: store::count_rows(connection, "SELECT COUNT(*) FROM recipes")?,
        pending: store::count_rows(
            connection,
            "SELECT COUNT(*) FROM recipes WHERE qa_status = 'pending'",
        )?,
        fixed: store::count_rows(
            connection,
            "SELECT COUNT(*) FROM recipes WHERE qa_status = 'fixed'",
        )?,
        links: store::count_rows(connection, "SELECT COUNT(*) FROM recipe_links")?,
        equipment: store::count_rows(connection, "SELECT COUNT(*) FROM equipment")?,
        equipment_links: store::count_rows(connection, "SELECT COUNT(*) FROM recipe_equipment")?,
    })
}

// Markdown and CSV artifacts carry no run id.
fn artifact_run_id(path: &Path) -> Option<String> {
    if path.extension().is_none_or(|ext| ext != "json") {
        return None;
    }
    let value: serde_json::Value = read_json(path).ok()?;
    value.get("run_id")?.as_str().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fixtures;
    use crate::util::write_json_pretty;

    #[test]
    fn counts_reflect_qa_status() {
        let connection = fixtures::corpus();
        let fixed = fixtures::insert_recipe(&connection, "Stew", Some("[]"), None);
        fixtures::insert_recipe(&connection, "Soup", Some("[]"), None);
        connection
            .execute("UPDATE recipes SET qa_status = 'fixed' WHERE id = ?1", [fixed])
            .expect("mark fixed");

        let counts = corpus_counts(&connection).expect("counts");
        assert_eq!(counts.recipes, 2);
        assert_eq!(counts.pending, 1);
        assert_eq!(counts.fixed, 1);
        assert_eq!(counts.equipment, 0);
    }

    #[test]
    fn run_id_is_read_from_json_artifacts_only() {
        let dir = tempfile::tempdir().expect("tempdir");
        let json = dir.path().join("structure_report.json");
        write_json_pretty(&json, &serde_json::json!({ "run_id": "structure-20260101T000000Z" }))
            .expect("write");
        let markdown = dir.path().join("executive_summary.md");
        std::fs::write(&markdown, "# summary\n").expect("write md");

        assert_eq!(
            artifact_run_id(&json).as_deref(),
            Some("structure-20260101T000000Z")
        );
        assert_eq!(artifact_run_id(&markdown), None);
    }
}

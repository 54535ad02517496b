use std::collections::{BTreeMap, HashSet};

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use serde::Serialize;
use tracing::info;

use super::rules::mention_text;
use super::*;
use crate::cli::LinkEquipmentArgs;
use crate::store::{self, BatchOutcome};
use crate::util::now_utc_string;

/// Rows the job inserted, or in a preview run, the rows it would have inserted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LinkSummary {
    pub records_scanned: usize,
    pub records_matched: usize,
    pub new_catalog_entries: usize,
    pub existing_catalog_entries: usize,
    pub new_links: usize,
    pub existing_links: usize,
    pub links_by_equipment: BTreeMap<String, usize>,
}

pub fn run(args: LinkEquipmentArgs) -> Result<()> {
    let mut connection = store::open_corpus(&args.corpus.db_path())?;
    let simulate = args.mode.is_dry_run();

    let outcome = link_equipment(&mut connection, simulate)?;
    let summary = &outcome.summary;
    let verb = if outcome.committed { "created" } else { "would be created" };

    info!(
        mode = args.mode.as_str(),
        records_scanned = summary.records_scanned,
        records_matched = summary.records_matched,
        existing_catalog_entries = summary.existing_catalog_entries,
        existing_links = summary.existing_links,
        "equipment linking complete"
    );
    info!(
        "{} new catalog entries and {} links {verb}",
        summary.new_catalog_entries, summary.new_links
    );
    for (canonical, links) in &summary.links_by_equipment {
        info!(equipment = canonical.as_str(), links, "equipment links {verb}");
    }
    Ok(())
}

/// Matches, upserts and links inside one transaction. With `simulate` every
/// insert is still issued, then discarded by rollback.
pub fn link_equipment(connection: &mut Connection, simulate: bool) -> Result<BatchOutcome<LinkSummary>> {
    let rules = compile_rules(EQUIPMENT_RULES)?;
    store::run_in_transaction(connection, simulate, |tx| link_within(tx, &rules))
}

pub fn link_within(tx: &Transaction<'_>, rules: &[CompiledRule<'_>]) -> Result<LinkSummary> {
    let recipes = store::load_corpus(tx).context("failed to load corpus for equipment linking")?;
    let now = now_utc_string();
    let mut touched = HashSet::new();
    let mut summary = LinkSummary {
        records_scanned: recipes.len(),
        ..LinkSummary::default()
    };

    for recipe in &recipes {
        let text = mention_text(recipe);
        let mut matched = false;

        for compiled in rules.iter().filter(|compiled| compiled.matches(&text)) {
            matched = true;
            let (equipment_id, created) = upsert_catalog_entry(tx, compiled.rule, &now)?;
            if touched.insert(compiled.rule.canonical) {
                if created {
                    summary.new_catalog_entries += 1;
                } else {
                    summary.existing_catalog_entries += 1;
                }
            }

            let inserted = tx
                .execute(
                    "
                    INSERT INTO recipe_equipment(recipe_id, equipment_id, created_at)
                    VALUES(?1, ?2, ?3)
                    ON CONFLICT(recipe_id, equipment_id) DO NOTHING
                    ",
                    params![recipe.id, equipment_id, now],
                )
                .with_context(|| {
                    format!(
                        "failed to link recipe {} to {}",
                        recipe.id, compiled.rule.canonical
                    )
                })?;

            if inserted == 0 {
                summary.existing_links += 1;
            } else {
                summary.new_links += 1;
                *summary
                    .links_by_equipment
                    .entry(compiled.rule.canonical.to_string())
                    .or_insert(0) += 1;
            }
        }

        if matched {
            summary.records_matched += 1;
        }
    }

    Ok(summary)
}

/// Returns the catalog id and whether this call inserted it. Entries inserted
/// earlier in the same transaction are found by the lookup.
fn upsert_catalog_entry(tx: &Transaction<'_>, rule: &EquipmentRule, now: &str) -> Result<(i64, bool)> {
    let existing: Option<i64> = tx
        .query_row(
            "SELECT id FROM equipment WHERE canonical = ?1",
            [rule.canonical],
            |row| row.get(0),
        )
        .optional()?;

    if let Some(id) = existing {
        return Ok((id, false));
    }

    tx.execute(
        "
        INSERT INTO equipment(canonical, display_name, category, metadata, created_at)
        VALUES(?1, ?2, ?3, ?4, ?5)
        ",
        params![
            rule.canonical,
            rule.display_name,
            rule.category,
            rule.metadata_json(),
            now
        ],
    )
    .with_context(|| format!("failed to insert catalog entry {}", rule.canonical))?;
    Ok((tx.last_insert_rowid(), true))
}

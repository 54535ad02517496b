use std::collections::HashMap;

use anyhow::{Context, Result};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params};

use crate::model::{CorpusRecipe, ExtractedRecipe};
use crate::util::now_utc_string;

const RECIPE_COLUMNS: &str = "
    r.id, r.name, r.description, r.ingredients, r.instructions, c.name, r.source_url,
    r.is_public, r.qa_status, r.qa_confidence, r.qa_method, r.qa_notes,
    r.qa_issues_found, r.qa_fixes_applied, r.qa_timestamp
";

fn recipe_from_row(row: &Row<'_>) -> rusqlite::Result<CorpusRecipe> {
    Ok(CorpusRecipe {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        ingredients: row.get(3)?,
        instructions: row.get(4)?,
        chef_name: row.get(5)?,
        source_url: row.get(6)?,
        is_public: row.get::<_, i64>(7)? != 0,
        qa_status: row.get(8)?,
        qa_confidence: row.get(9)?,
        qa_method: row.get(10)?,
        qa_notes: row.get(11)?,
        qa_issues_found: row.get(12)?,
        qa_fixes_applied: row.get(13)?,
        qa_timestamp: row.get(14)?,
    })
}

pub fn load_corpus(connection: &Connection) -> Result<Vec<CorpusRecipe>> {
    let sql = format!(
        "SELECT {RECIPE_COLUMNS} FROM recipes r LEFT JOIN chefs c ON c.id = r.chef_id ORDER BY r.id ASC"
    );
    let mut statement = connection.prepare(&sql)?;
    let mut rows = statement.query([])?;
    let mut out = Vec::new();

    while let Some(row) = rows.next()? {
        out.push(recipe_from_row(row)?);
    }

    Ok(out)
}

pub fn load_recipe(connection: &Connection, recipe_id: i64) -> rusqlite::Result<Option<CorpusRecipe>> {
    let sql = format!(
        "SELECT {RECIPE_COLUMNS} FROM recipes r LEFT JOIN chefs c ON c.id = r.chef_id WHERE r.id = ?1"
    );
    connection
        .query_row(&sql, [recipe_id], recipe_from_row)
        .optional()
}

/// Every column of the recipe row, keyed by column name.
pub fn read_record_snapshot(
    connection: &Connection,
    recipe_id: i64,
) -> rusqlite::Result<Option<serde_json::Map<String, serde_json::Value>>> {
    let mut statement = connection.prepare("SELECT * FROM recipes WHERE id = ?1")?;
    let column_names = statement
        .column_names()
        .into_iter()
        .map(ToOwned::to_owned)
        .collect::<Vec<String>>();

    let mut rows = statement.query([recipe_id])?;
    let Some(row) = rows.next()? else {
        return Ok(None);
    };

    let mut snapshot = serde_json::Map::new();
    for (index, name) in column_names.iter().enumerate() {
        let value = match row.get_ref(index)? {
            ValueRef::Null => serde_json::Value::Null,
            ValueRef::Integer(value) => serde_json::Value::from(value),
            ValueRef::Real(value) => serde_json::Value::from(value),
            ValueRef::Text(bytes) => {
                serde_json::Value::String(String::from_utf8_lossy(bytes).into_owned())
            }
            ValueRef::Blob(bytes) => serde_json::Value::String(format!("<blob {} bytes>", bytes.len())),
        };
        snapshot.insert(name.clone(), value);
    }

    Ok(Some(snapshot))
}

pub fn load_ingredient_relations(connection: &Connection) -> Result<HashMap<i64, Vec<String>>> {
    let mut statement = connection.prepare(
        "
        SELECT ri.recipe_id, i.name
        FROM recipe_ingredients ri
        JOIN ingredients i ON i.id = ri.ingredient_id
        ORDER BY ri.recipe_id ASC, i.name ASC
        ",
    )?;
    let mut rows = statement.query([])?;
    let mut relations = HashMap::<i64, Vec<String>>::new();

    while let Some(row) = rows.next()? {
        let recipe_id: i64 = row.get(0)?;
        let name: String = row.get(1)?;
        relations.entry(recipe_id).or_default().push(name);
    }

    Ok(relations)
}

pub fn ensure_chef(connection: &Connection, name: &str) -> Result<i64> {
    connection
        .execute(
            "INSERT INTO chefs(name) VALUES(?1) ON CONFLICT(name) DO NOTHING",
            [name],
        )
        .with_context(|| format!("failed to upsert chef {name}"))?;
    let id = connection.query_row("SELECT id FROM chefs WHERE name = ?1", [name], |row| {
        row.get(0)
    })?;
    Ok(id)
}

pub fn load_link_index(connection: &Connection) -> Result<Vec<(String, Option<String>, String)>> {
    let mut statement = connection.prepare(
        "
        SELECT l.url, c.name, r.name
        FROM recipe_links l
        JOIN recipes r ON r.id = l.recipe_id
        LEFT JOIN chefs c ON c.id = l.chef_id
        ORDER BY l.id ASC
        ",
    )?;
    let mut rows = statement.query([])?;
    let mut out = Vec::new();

    while let Some(row) = rows.next()? {
        out.push((row.get(0)?, row.get(1)?, row.get(2)?));
    }

    Ok(out)
}

/// Errors caused by one record's values rather than by the store itself.
pub fn is_record_level(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(code, _) => matches!(
            code.code,
            ErrorCode::ConstraintViolation | ErrorCode::TooBig | ErrorCode::TypeMismatch
        ),
        rusqlite::Error::ToSqlConversionFailure(_)
        | rusqlite::Error::InvalidColumnType(..)
        | rusqlite::Error::IntegralValueOutOfRange(..) => true,
        _ => false,
    }
}

pub fn insert_extracted_recipe(
    connection: &mut Connection,
    recipe: &ExtractedRecipe,
    chef_id: i64,
) -> Result<i64> {
    let now = now_utc_string();
    let ingredients_json = serde_json::to_string(&recipe.ingredients)?;
    let instructions_json = serde_json::to_string(&recipe.instructions)?;
    let tags_json = serde_json::to_string(&recipe.tags)?;

    let tx = connection.transaction()?;
    tx.execute(
        "
        INSERT INTO recipes(
          name, description, ingredients, instructions,
          prep_minutes, cook_minutes, total_minutes, servings,
          difficulty, cuisine, tags, image_url, chef_id, source_url,
          qa_status, created_at, updated_at
        )
        VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, 'pending', ?15, ?15)
        ",
        params![
            recipe.title,
            recipe.description,
            ingredients_json,
            instructions_json,
            recipe.prep_minutes,
            recipe.cook_minutes,
            recipe.total_minutes,
            recipe.servings,
            recipe.difficulty,
            recipe.cuisine,
            tags_json,
            recipe.image_url,
            chef_id,
            recipe.url,
            now,
        ],
    )?;
    let recipe_id = tx.last_insert_rowid();

    tx.execute(
        "INSERT INTO recipe_links(recipe_id, chef_id, url, created_at) VALUES(?1, ?2, ?3, ?4)",
        params![recipe_id, chef_id, recipe.url, now],
    )?;
    tx.commit()?;

    Ok(recipe_id)
}

#[derive(Debug, Clone)]
pub struct QaFixUpdate<'a> {
    pub recipe_id: i64,
    pub ingredients_json: &'a str,
    pub confidence: f64,
    pub method: &'a str,
    pub notes: &'a str,
    pub issues_found: &'a str,
    pub fixes_applied: &'a str,
    pub timestamp: &'a str,
}

/// Returns the number of rows touched; zero means the record no longer exists.
pub fn update_qa_fix(connection: &Connection, update: &QaFixUpdate<'_>) -> rusqlite::Result<usize> {
    connection.execute(
        "
        UPDATE recipes SET
          ingredients = ?2,
          qa_status = 'fixed',
          qa_confidence = ?3,
          qa_method = ?4,
          qa_notes = ?5,
          qa_issues_found = ?6,
          qa_fixes_applied = ?7,
          qa_timestamp = ?8,
          updated_at = ?8
        WHERE id = ?1
        ",
        params![
            update.recipe_id,
            update.ingredients_json,
            update.confidence,
            update.method,
            update.notes,
            update.issues_found,
            update.fixes_applied,
            update.timestamp,
        ],
    )
}

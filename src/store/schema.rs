use std::path::Path;

use anyhow::{Context, Result, bail};
use rusqlite::{Connection, OpenFlags};

use crate::util::now_utc_string;

pub const DB_SCHEMA_VERSION: &str = "0.3.0";

pub fn open_corpus(db_path: &Path) -> Result<Connection> {
    let connection = Connection::open_with_flags(
        db_path,
        OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .with_context(|| format!("failed to open corpus database: {}", db_path.display()))?;
    configure_connection(&connection)?;
    ensure_schema(&connection)?;
    Ok(connection)
}

pub fn open_corpus_read_only(db_path: &Path) -> Result<Connection> {
    if !db_path.exists() {
        bail!("corpus database missing: {}", db_path.display());
    }
    Connection::open_with_flags(
        db_path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .with_context(|| format!("failed to open database read-only: {}", db_path.display()))
}

fn configure_connection(connection: &Connection) -> Result<()> {
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .context("failed to set journal_mode=WAL")?;
    connection
        .pragma_update(None, "synchronous", "NORMAL")
        .context("failed to set synchronous=NORMAL")?;
    connection
        .pragma_update(None, "foreign_keys", "ON")
        .context("failed to enable foreign_keys")?;
    Ok(())
}

pub fn ensure_schema(connection: &Connection) -> Result<()> {
    connection.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS metadata (
          key TEXT PRIMARY KEY,
          value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS chefs (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          name TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS recipes (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          name TEXT NOT NULL,
          description TEXT,
          ingredients TEXT,
          instructions TEXT,
          prep_minutes INTEGER,
          cook_minutes INTEGER,
          total_minutes INTEGER,
          servings INTEGER,
          difficulty TEXT,
          cuisine TEXT,
          tags TEXT,
          image_url TEXT,
          chef_id INTEGER,
          source_url TEXT,
          is_public INTEGER NOT NULL DEFAULT 1,
          qa_status TEXT NOT NULL DEFAULT 'pending',
          qa_confidence REAL,
          qa_method TEXT,
          qa_notes TEXT,
          qa_issues_found TEXT,
          qa_fixes_applied TEXT,
          qa_timestamp TEXT,
          created_at TEXT NOT NULL,
          updated_at TEXT NOT NULL,
          CHECK (qa_confidence IS NULL OR (qa_confidence >= 0.0 AND qa_confidence <= 1.0)),
          FOREIGN KEY(chef_id) REFERENCES chefs(id)
        );

        CREATE TABLE IF NOT EXISTS recipe_links (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          recipe_id INTEGER NOT NULL,
          chef_id INTEGER,
          url TEXT NOT NULL UNIQUE,
          created_at TEXT NOT NULL,
          FOREIGN KEY(recipe_id) REFERENCES recipes(id),
          FOREIGN KEY(chef_id) REFERENCES chefs(id)
        );

        CREATE TABLE IF NOT EXISTS ingredients (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          name TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS recipe_ingredients (
          recipe_id INTEGER NOT NULL,
          ingredient_id INTEGER NOT NULL,
          amount TEXT,
          unit TEXT,
          PRIMARY KEY (recipe_id, ingredient_id),
          FOREIGN KEY(recipe_id) REFERENCES recipes(id),
          FOREIGN KEY(ingredient_id) REFERENCES ingredients(id)
        );

        CREATE TABLE IF NOT EXISTS equipment (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          canonical TEXT NOT NULL UNIQUE,
          display_name TEXT NOT NULL,
          category TEXT NOT NULL,
          metadata TEXT,
          created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS recipe_equipment (
          recipe_id INTEGER NOT NULL,
          equipment_id INTEGER NOT NULL,
          created_at TEXT NOT NULL,
          UNIQUE(recipe_id, equipment_id),
          FOREIGN KEY(recipe_id) REFERENCES recipes(id),
          FOREIGN KEY(equipment_id) REFERENCES equipment(id)
        );
        ",
    )?;

    ensure_column_exists(connection, "recipes", "is_public INTEGER NOT NULL DEFAULT 1")?;
    ensure_column_exists(connection, "recipes", "qa_issues_found TEXT")?;
    ensure_column_exists(connection, "recipes", "qa_fixes_applied TEXT")?;

    connection.execute_batch(
        "
        CREATE INDEX IF NOT EXISTS idx_recipes_chef ON recipes(chef_id);
        CREATE INDEX IF NOT EXISTS idx_recipes_qa_status ON recipes(qa_status);
        CREATE INDEX IF NOT EXISTS idx_recipe_links_chef ON recipe_links(chef_id);
        CREATE INDEX IF NOT EXISTS idx_recipe_ingredients_recipe ON recipe_ingredients(recipe_id);
        CREATE INDEX IF NOT EXISTS idx_recipe_equipment_equipment ON recipe_equipment(equipment_id);
        ",
    )?;

    let now = now_utc_string();
    connection.execute(
        "INSERT INTO metadata(key, value) VALUES('db_schema_version', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [DB_SCHEMA_VERSION],
    )?;
    connection.execute(
        "INSERT INTO metadata(key, value) VALUES('db_updated_at', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [now],
    )?;

    Ok(())
}

fn ensure_column_exists(
    connection: &Connection,
    table_name: &str,
    column_definition: &str,
) -> Result<()> {
    let Some(column_name) = column_definition.split_whitespace().next() else {
        bail!("invalid column definition: {column_definition}");
    };

    let pragma_sql = format!("PRAGMA table_info({table_name})");
    let mut statement = connection
        .prepare(&pragma_sql)
        .with_context(|| format!("failed to inspect schema for table {table_name}"))?;

    let mut rows = statement.query([])?;
    while let Some(row) = rows.next()? {
        let existing_name: String = row.get(1)?;
        if existing_name == column_name {
            return Ok(());
        }
    }

    let alter_sql = format!("ALTER TABLE {table_name} ADD COLUMN {column_definition}");
    connection
        .execute(&alter_sql, [])
        .with_context(|| format!("failed to add column {column_name} on {table_name}"))?;

    Ok(())
}

pub fn count_rows(connection: &Connection, sql: &str) -> Result<i64> {
    let count = connection.query_row(sql, [], |row| row.get(0))?;
    Ok(count)
}

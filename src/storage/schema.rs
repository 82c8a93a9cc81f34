//! Database schema definitions and migrations
//!
//! This module contains all SQL schema definitions for the case store.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track import runs (one per crawl persisted or JSON file imported)
CREATE TABLE IF NOT EXISTS import_runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    source TEXT NOT NULL,
    status TEXT NOT NULL,
    inserted INTEGER NOT NULL DEFAULT 0,
    updated INTEGER NOT NULL DEFAULT 0,
    errored INTEGER NOT NULL DEFAULT 0
);

-- One row per case; detail_url is the natural key when present
CREATE TABLE IF NOT EXISTS cases (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    case_id TEXT NOT NULL,
    category TEXT NOT NULL,
    category_type TEXT NOT NULL,
    fiscal_year TEXT NOT NULL,
    fiscal_year_gregorian TEXT,
    date TEXT NOT NULL,
    date_parsed INTEGER NOT NULL DEFAULT 0,
    title TEXT NOT NULL,
    accused_person TEXT NOT NULL,
    office TEXT NOT NULL,
    accusation TEXT NOT NULL,
    amount TEXT NOT NULL,
    amount_value REAL,
    detail_url TEXT,
    download_links TEXT NOT NULL DEFAULT '[]',
    scraped_at TEXT NOT NULL,
    source_url TEXT NOT NULL,
    first_run INTEGER NOT NULL REFERENCES import_runs(id),
    last_run INTEGER NOT NULL REFERENCES import_runs(id)
);

-- NULLs are distinct in a SQLite unique index, so rows without a detail URL always insert
CREATE UNIQUE INDEX IF NOT EXISTS idx_cases_detail_url ON cases(detail_url);
CREATE INDEX IF NOT EXISTS idx_cases_category ON cases(category);
CREATE INDEX IF NOT EXISTS idx_cases_fiscal_year ON cases(fiscal_year);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

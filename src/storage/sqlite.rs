//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the CaseStore trait.

use crate::normalize::normalize_amount;
use crate::record::{CaseRecord, Category, CategoryType};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{CaseStore, StorageError, StorageResult};
use crate::storage::{ImportRunRecord, ImportRunStatus, UpsertCounts};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::path::Path;

const CASE_COLUMNS: &str = "case_id, category, category_type, fiscal_year, fiscal_year_gregorian,
     date, date_parsed, title, accused_person, office, accusation, amount, detail_url,
     download_links, scraped_at, source_url";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = init_database(path)?;
        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

/// Raw column values of a `cases` row, before domain conversion
struct CaseRow {
    case_id: String,
    category: String,
    category_type: String,
    fiscal_year: String,
    fiscal_year_gregorian: Option<String>,
    date: String,
    date_parsed: bool,
    title: String,
    accused_person: String,
    office: String,
    accusation: String,
    amount: String,
    detail_url: Option<String>,
    download_links: String,
    scraped_at: String,
    source_url: String,
}

impl CaseRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            case_id: row.get(0)?,
            category: row.get(1)?,
            category_type: row.get(2)?,
            fiscal_year: row.get(3)?,
            fiscal_year_gregorian: row.get(4)?,
            date: row.get(5)?,
            date_parsed: row.get(6)?,
            title: row.get(7)?,
            accused_person: row.get(8)?,
            office: row.get(9)?,
            accusation: row.get(10)?,
            amount: row.get(11)?,
            detail_url: row.get(12)?,
            download_links: row.get(13)?,
            scraped_at: row.get(14)?,
            source_url: row.get(15)?,
        })
    }

    fn into_record(self) -> StorageResult<CaseRecord> {
        let category =
            Category::from_display_name(&self.category).ok_or(StorageError::InvalidValue {
                column: "category",
                value: self.category.clone(),
            })?;
        let category_type = CategoryType::from_db_string(&self.category_type).ok_or(
            StorageError::InvalidValue {
                column: "category_type",
                value: self.category_type.clone(),
            },
        )?;
        let scraped_at = DateTime::parse_from_rfc3339(&self.scraped_at)
            .map_err(|_| StorageError::InvalidValue {
                column: "scraped_at",
                value: self.scraped_at.clone(),
            })?
            .with_timezone(&Utc);
        let download_links: Vec<String> = serde_json::from_str(&self.download_links)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        Ok(CaseRecord {
            id: self.case_id,
            category,
            category_type,
            fiscal_year: self.fiscal_year,
            fiscal_year_gregorian: self.fiscal_year_gregorian,
            date: self.date,
            date_parsed: self.date_parsed,
            title: self.title,
            accused_person: self.accused_person,
            office: self.office,
            accusation: self.accusation,
            amount: self.amount,
            detail_url: self.detail_url,
            download_links,
            scraped_at,
            source_url: self.source_url,
        })
    }
}

fn read_import_run(row: &Row<'_>) -> rusqlite::Result<ImportRunRecord> {
    Ok(ImportRunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        source: row.get(4)?,
        status: ImportRunStatus::from_db_string(&row.get::<_, String>(5)?)
            .unwrap_or(ImportRunStatus::Failed),
        counts: UpsertCounts {
            inserted: row.get::<_, i64>(6)? as u64,
            updated: row.get::<_, i64>(7)? as u64,
            errored: row.get::<_, i64>(8)? as u64,
        },
    })
}

/// Writes one record; returns true if it updated an existing row
fn upsert_case(tx: &Transaction<'_>, run_id: i64, record: &CaseRecord) -> StorageResult<bool> {
    let download_links = serde_json::to_string(&record.download_links)
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
    let amount_value = normalize_amount(&record.amount);
    let scraped_at = record.scraped_at.to_rfc3339();

    let existing: Option<i64> = match &record.detail_url {
        Some(url) => tx
            .query_row(
                "SELECT id FROM cases WHERE detail_url = ?1",
                params![url],
                |row| row.get(0),
            )
            .optional()?,
        None => None,
    };

    if let Some(id) = existing {
        tx.execute(
            "UPDATE cases SET case_id = ?1, category = ?2, category_type = ?3, fiscal_year = ?4,
             fiscal_year_gregorian = ?5, date = ?6, date_parsed = ?7, title = ?8,
             accused_person = ?9, office = ?10, accusation = ?11, amount = ?12,
             amount_value = ?13, download_links = ?14, scraped_at = ?15, source_url = ?16,
             last_run = ?17
             WHERE id = ?18",
            params![
                record.id,
                record.category.display_name(),
                record.category_type.as_str(),
                record.fiscal_year,
                record.fiscal_year_gregorian,
                record.date,
                record.date_parsed,
                record.title,
                record.accused_person,
                record.office,
                record.accusation,
                record.amount,
                amount_value,
                download_links,
                scraped_at,
                record.source_url,
                run_id,
                id
            ],
        )?;
        return Ok(true);
    }

    tx.execute(
        &format!(
            "INSERT INTO cases ({}, amount_value, first_run, last_run)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?18)",
            CASE_COLUMNS
        ),
        params![
            record.id,
            record.category.display_name(),
            record.category_type.as_str(),
            record.fiscal_year,
            record.fiscal_year_gregorian,
            record.date,
            record.date_parsed,
            record.title,
            record.accused_person,
            record.office,
            record.accusation,
            record.amount,
            record.detail_url,
            download_links,
            scraped_at,
            record.source_url,
            amount_value,
            run_id
        ],
    )?;
    Ok(false)
}

impl CaseStore for SqliteStorage {
    // ===== Import Runs =====

    fn begin_import(&mut self, config_hash: &str, source: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO import_runs (started_at, config_hash, source, status) VALUES (?1, ?2, ?3, ?4)",
            params![now, config_hash, source, ImportRunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn finish_import(
        &mut self,
        run_id: i64,
        status: ImportRunStatus,
        counts: &UpsertCounts,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let changed = self.conn.execute(
            "UPDATE import_runs SET status = ?1, finished_at = ?2, inserted = ?3, updated = ?4,
             errored = ?5 WHERE id = ?6",
            params![
                status.to_db_string(),
                now,
                counts.inserted as i64,
                counts.updated as i64,
                counts.errored as i64,
                run_id
            ],
        )?;
        if changed == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn get_import_run(&self, run_id: i64) -> StorageResult<ImportRunRecord> {
        self.conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, source, status, inserted, updated, errored
                 FROM import_runs WHERE id = ?1",
                params![run_id],
                read_import_run,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_import_run(&self) -> StorageResult<Option<ImportRunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, source, status, inserted, updated, errored
                 FROM import_runs ORDER BY id DESC LIMIT 1",
                [],
                read_import_run,
            )
            .optional()?;
        Ok(run)
    }

    // ===== Cases =====

    fn upsert_cases(&mut self, run_id: i64, records: &[CaseRecord]) -> StorageResult<UpsertCounts> {
        let tx = self.conn.transaction()?;
        let mut counts = UpsertCounts::default();

        for record in records {
            match upsert_case(&tx, run_id, record) {
                Ok(true) => counts.updated += 1,
                Ok(false) => counts.inserted += 1,
                Err(e) => {
                    tracing::warn!("Failed to store case {}: {}", record.id, e);
                    counts.errored += 1;
                }
            }
        }

        tx.commit()?;
        Ok(counts)
    }

    fn get_case_by_detail_url(&self, detail_url: &str) -> StorageResult<Option<CaseRecord>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {} FROM cases WHERE detail_url = ?1", CASE_COLUMNS),
                params![detail_url],
                CaseRow::from_row,
            )
            .optional()?;

        row.map(CaseRow::into_record).transpose()
    }

    fn load_cases(&self) -> StorageResult<Vec<CaseRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM cases ORDER BY id", CASE_COLUMNS))?;

        let rows = stmt
            .query_map([], CaseRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(CaseRow::into_record).collect()
    }

    // ===== Statistics =====

    fn count_cases(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM cases", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_by_category(&self) -> StorageResult<Vec<(String, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT category, COUNT(*) FROM cases GROUP BY category ORDER BY COUNT(*) DESC, category",
        )?;

        let counts = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(counts)
    }

    fn count_by_fiscal_year(&self) -> StorageResult<Vec<(String, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT fiscal_year, COUNT(*) FROM cases GROUP BY fiscal_year ORDER BY fiscal_year",
        )?;

        let counts = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(counts)
    }

    fn count_with_amount(&self) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM cases WHERE TRIM(amount) != ''",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

/// Initializes a database connection with the schema
///
/// # Arguments
///
/// * `path` - Path to the database file
///
/// # Returns
///
/// * `Ok(Connection)` - Database connection
/// * `Err(rusqlite::Error)` - Failed to initialize database
pub fn init_database(path: &Path) -> Result<Connection, rusqlite::Error> {
    let conn = Connection::open(path)?;

    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
    ",
    )?;

    initialize_schema(&conn)?;

    Ok(conn)
}

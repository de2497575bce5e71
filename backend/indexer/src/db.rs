//! Database layer: migrations, queries, and cursor management.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

use crate::errors::Result;
use crate::events::{EventRecord, FundraiseEvent};

const EVENT_COLUMNS: &str = "id, event_id, event_type, account, currency, amount, sequence, \
                             detail, ledger, timestamp, contract_id, tx_hash, created_at";

/// Open the SQLite pool (creating the file if needed) and run migrations.
pub async fn init_pool(database_url: &str) -> Result<SqlitePool> {
    let url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite:{database_url}")
    };
    let options = SqliteConnectOptions::from_str(&url)?.create_if_missing(true);

    // Every connection to `:memory:` opens a separate database.
    let max_connections = if url.contains(":memory:") { 1 } else { 5 };
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database migrations applied successfully");
    Ok(pool)
}

// ─────────────────────────────────────────────────────────
// Cursor helpers
// ─────────────────────────────────────────────────────────

/// Last-seen ledger, or `0` when nothing has been indexed yet.
pub async fn get_last_ledger(pool: &SqlitePool) -> Result<i64> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT last_ledger FROM indexer_cursor WHERE id = 1")
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|(v,)| v).unwrap_or(0))
}

pub async fn save_cursor(
    pool: &SqlitePool,
    last_ledger: i64,
    last_cursor: Option<&str>,
) -> Result<()> {
    sqlx::query("UPDATE indexer_cursor SET last_ledger = ?1, last_cursor = ?2 WHERE id = 1")
        .bind(last_ledger)
        .bind(last_cursor)
        .execute(pool)
        .await?;
    Ok(())
}

/// Pagination cursor to resume mid-ledger.
pub async fn get_cursor_string(pool: &SqlitePool) -> Result<Option<String>> {
    let row: Option<(Option<String>,)> =
        sqlx::query_as("SELECT last_cursor FROM indexer_cursor WHERE id = 1")
            .fetch_optional(pool)
            .await?;
    Ok(row.and_then(|(v,)| v))
}

// ─────────────────────────────────────────────────────────
// Event writes
// ─────────────────────────────────────────────────────────

/// Persist a batch of decoded events in one transaction. Events whose
/// `event_id` is already stored are skipped, so replaying a page is harmless.
///
/// Returns the number of new rows.
pub async fn insert_events(pool: &SqlitePool, events: &[FundraiseEvent]) -> Result<usize> {
    let mut tx = pool.begin().await?;
    let mut count = 0usize;
    for ev in events {
        let rows_affected = sqlx::query(
            r#"
            INSERT OR IGNORE INTO events
                (event_id, event_type, account, currency, amount, sequence, detail,
                 ledger, timestamp, contract_id, tx_hash)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&ev.event_id)
        .bind(&ev.event_type)
        .bind(&ev.account)
        .bind(&ev.currency)
        .bind(&ev.amount)
        .bind(ev.sequence)
        .bind(&ev.detail)
        .bind(ev.ledger)
        .bind(ev.timestamp)
        .bind(&ev.contract_id)
        .bind(&ev.tx_hash)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        count += rows_affected as usize;
    }
    tx.commit().await?;
    Ok(count)
}

// ─────────────────────────────────────────────────────────
// Event reads
// ─────────────────────────────────────────────────────────

/// Optional narrowing of an event listing.
#[derive(Debug, Default, Clone)]
pub struct EventFilter<'a> {
    pub account: Option<&'a str>,
    pub currency: Option<&'a str>,
    pub event_type: Option<&'a str>,
}

/// Events matching `filter`, ordered by ledger then insertion.
pub async fn get_events(pool: &SqlitePool, filter: &EventFilter<'_>) -> Result<Vec<EventRecord>> {
    let sql = format!(
        r#"
        SELECT {EVENT_COLUMNS}
        FROM   events
        WHERE  (?1 IS NULL OR account = ?1)
          AND  (?2 IS NULL OR currency = ?2)
          AND  (?3 IS NULL OR event_type = ?3)
        ORDER  BY ledger ASC, id ASC
        "#
    );
    let rows = sqlx::query_as::<_, EventRecord>(&sql)
        .bind(filter.account)
        .bind(filter.currency)
        .bind(filter.event_type)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

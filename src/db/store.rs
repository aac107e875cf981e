//! Symbol persistence behind a trait so the engine never touches SQL.
//!
//! `PgSymbolStore` is the production implementation. Writes coming from the
//! hot update path are spooled by the engine and executed here one at a
//! time; a failed write is logged by the caller and never interrupts the
//! feed.

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;

use super::schema::{CategoryRecord, HistoryInsert, HistoryRow, SymbolRecord, SymbolUpsert};

/// Errors surfaced by a symbol store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The store cannot serve requests right now.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence operations needed by the feed.
#[async_trait]
pub trait SymbolStore: Send + Sync {
    /// Creates or updates the symbol row. Fields absent from the payload
    /// keep their persisted values.
    async fn upsert_symbol_snapshot(&self, upsert: &SymbolUpsert) -> Result<(), StoreError>;

    /// Appends one price history row.
    async fn insert_history_row(&self, row: &HistoryInsert) -> Result<(), StoreError>;

    /// Looks up a symbol row by ticker.
    async fn find_symbol(&self, symbol: &str) -> Result<Option<SymbolRecord>, StoreError>;

    /// Returns the category with the given name, creating it when missing.
    async fn find_or_create_category(&self, name: &str) -> Result<CategoryRecord, StoreError>;

    /// Most recent history rows for a symbol, newest first.
    async fn recent_history(
        &self,
        symbol: &str,
        limit: i64,
    ) -> Result<Vec<HistoryRow>, StoreError>;
}

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgSymbolStore {
    pool: PgPool,
}

impl PgSymbolStore {
    /// Creates a store over an established pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SymbolStore for PgSymbolStore {
    async fn upsert_symbol_snapshot(&self, upsert: &SymbolUpsert) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO symbols (
                symbol, company_name, exchange, category_id,
                price, change, change_percent, volume,
                high, low, open, previous_close, source, provider
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (symbol) DO UPDATE SET
                company_name = COALESCE(EXCLUDED.company_name, symbols.company_name),
                exchange = COALESCE(EXCLUDED.exchange, symbols.exchange),
                category_id = COALESCE(EXCLUDED.category_id, symbols.category_id),
                price = COALESCE(EXCLUDED.price, symbols.price),
                change = COALESCE(EXCLUDED.change, symbols.change),
                change_percent = COALESCE(EXCLUDED.change_percent, symbols.change_percent),
                volume = COALESCE(EXCLUDED.volume, symbols.volume),
                high = COALESCE(EXCLUDED.high, symbols.high),
                low = COALESCE(EXCLUDED.low, symbols.low),
                open = COALESCE(EXCLUDED.open, symbols.open),
                previous_close = COALESCE(EXCLUDED.previous_close, symbols.previous_close),
                source = COALESCE(EXCLUDED.source, symbols.source),
                provider = COALESCE(EXCLUDED.provider, symbols.provider),
                updated_at = now()
            ",
        )
        .bind(&upsert.symbol)
        .bind(&upsert.company_name)
        .bind(&upsert.exchange)
        .bind(upsert.category_id)
        .bind(upsert.price)
        .bind(upsert.change)
        .bind(upsert.change_percent)
        .bind(upsert.volume)
        .bind(upsert.high)
        .bind(upsert.low)
        .bind(upsert.open)
        .bind(upsert.previous_close)
        .bind(&upsert.source)
        .bind(&upsert.provider)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_history_row(&self, row: &HistoryInsert) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO price_history (symbol, price, volume, source, provider, quote_time)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(&row.symbol)
        .bind(row.price)
        .bind(row.volume)
        .bind(&row.source)
        .bind(&row.provider)
        .bind(row.quote_time)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_symbol(&self, symbol: &str) -> Result<Option<SymbolRecord>, StoreError> {
        let record = sqlx::query_as::<_, SymbolRecord>(
            r"
            SELECT s.id, s.symbol, s.company_name, s.exchange, s.category_id,
                   c.name AS category_name,
                   s.price, s.change, s.change_percent, s.volume,
                   s.high, s.low, s.open, s.previous_close, s.source, s.provider,
                   s.updated_at, s.created_at
            FROM symbols s
            LEFT JOIN categories c ON c.id = s.category_id
            WHERE s.symbol = $1
            ",
        )
        .bind(symbol)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn find_or_create_category(&self, name: &str) -> Result<CategoryRecord, StoreError> {
        sqlx::query("INSERT INTO categories (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
            .bind(name)
            .execute(&self.pool)
            .await?;

        let record = sqlx::query_as::<_, CategoryRecord>(
            "SELECT id, name, created_at FROM categories WHERE name = $1",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(record)
    }

    async fn recent_history(
        &self,
        symbol: &str,
        limit: i64,
    ) -> Result<Vec<HistoryRow>, StoreError> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            r"
            SELECT id, symbol, price, volume, source, provider, quote_time, recorded_at
            FROM price_history
            WHERE symbol = $1
            ORDER BY recorded_at DESC
            LIMIT $2
            ",
        )
        .bind(symbol)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

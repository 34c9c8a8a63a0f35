//! # Batch Ledger Repository
//!
//! The single point of truth for per-batch remaining quantity.
//!
//! ## Ledger Discipline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Batch Ledger Writes                                │
//! │                                                                         │
//! │  remaining_quantity is mutated by EXACTLY two operations:              │
//! │                                                                         │
//! │  deduct(batch, qty)                                                    │
//! │    UPDATE batches                                                      │
//! │    SET remaining_quantity = remaining_quantity - ?qty                  │
//! │    WHERE id = ?batch                                                   │
//! │      AND is_active = 1                                                 │
//! │      AND remaining_quantity >= ?qty   ◄── the guard                    │
//! │                                                                        │
//! │    rows_affected == 0  →  the precondition failed AT MUTATION TIME.    │
//! │    Another sale consumed the stock between planning and applying;      │
//! │    the enclosing transaction must abort.                               │
//! │                                                                        │
//! │  restore(batch, qty)                                                   │
//! │    Unconditional increment. Used only by cancellation, which by        │
//! │    construction restores exactly what a sale item deducted, so no      │
//! │    upper bound check exists.                                           │
//! │                                                                        │
//! │  Both run on a caller-supplied executor so the sale coordinator can    │
//! │  put them inside its own transaction. The ledger emits no audit        │
//! │  events - that's the coordinator's job, once per sale.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{Duration, NaiveDate, Utc};
use sqlx::{Sqlite, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use medipos_core::Batch;

const BATCH_COLUMNS: &str = "id, medicine_id, batch_number, expiry_date, remaining_quantity, \
     purchase_price_cents, selling_price_cents, supplier_id, is_active, \
     created_at, updated_at";

/// Repository for batch ledger operations.
#[derive(Debug, Clone)]
pub struct BatchRepository {
    pool: SqlitePool,
}

impl BatchRepository {
    /// Creates a new BatchRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BatchRepository { pool }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Gets a batch by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Batch>> {
        let batch = sqlx::query_as::<_, Batch>(&format!(
            "SELECT {BATCH_COLUMNS} FROM batches WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(batch)
    }

    /// Lists all batches of a medicine, soonest-expiring first.
    pub async fn list_for_medicine(&self, medicine_id: &str) -> DbResult<Vec<Batch>> {
        let batches = sqlx::query_as::<_, Batch>(&format!(
            "SELECT {BATCH_COLUMNS} FROM batches \
             WHERE medicine_id = ?1 \
             ORDER BY expiry_date, id"
        ))
        .bind(medicine_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(batches)
    }

    /// Lists the FEFO candidates for a sale line: active batches of the
    /// medicine, unexpired on `on`, still holding stock, ordered soonest
    /// expiry first with ties broken by id.
    ///
    /// This is the allocator's input. The order here and the pure
    /// allocator's sort agree by construction.
    pub async fn eligible_for_sale(&self, medicine_id: &str, on: NaiveDate) -> DbResult<Vec<Batch>> {
        let batches = sqlx::query_as::<_, Batch>(&format!(
            "SELECT {BATCH_COLUMNS} FROM batches \
             WHERE medicine_id = ?1 \
               AND is_active = 1 \
               AND expiry_date >= ?2 \
               AND remaining_quantity > 0 \
             ORDER BY expiry_date, id"
        ))
        .bind(medicine_id)
        .bind(on)
        .fetch_all(&self.pool)
        .await?;

        Ok(batches)
    }

    /// Lists active, stocked batches expiring within `days` of `from`
    /// (inclusive), soonest first.
    ///
    /// Read-only projection for near-expiry reporting; recomputed per call.
    pub async fn expiring_within(&self, from: NaiveDate, days: i64) -> DbResult<Vec<Batch>> {
        let until = from + Duration::days(days);

        let batches = sqlx::query_as::<_, Batch>(&format!(
            "SELECT {BATCH_COLUMNS} FROM batches \
             WHERE is_active = 1 \
               AND remaining_quantity > 0 \
               AND expiry_date >= ?1 \
               AND expiry_date <= ?2 \
             ORDER BY expiry_date, id"
        ))
        .bind(from)
        .bind(until)
        .fetch_all(&self.pool)
        .await?;

        Ok(batches)
    }

    // =========================================================================
    // Writes (non-ledger)
    // =========================================================================

    /// Inserts a new batch - the purchase-receiving entry point.
    pub async fn insert(&self, batch: &Batch) -> DbResult<()> {
        debug!(
            medicine_id = %batch.medicine_id,
            batch_number = %batch.batch_number,
            quantity = batch.remaining_quantity,
            "inserting batch"
        );

        sqlx::query(
            r#"
            INSERT INTO batches (
                id, medicine_id, batch_number, expiry_date, remaining_quantity,
                purchase_price_cents, selling_price_cents, supplier_id,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&batch.id)
        .bind(&batch.medicine_id)
        .bind(&batch.batch_number)
        .bind(batch.expiry_date)
        .bind(batch.remaining_quantity)
        .bind(batch.purchase_price_cents)
        .bind(batch.selling_price_cents)
        .bind(&batch.supplier_id)
        .bind(batch.is_active)
        .bind(batch.created_at)
        .bind(batch.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Re-prices a batch.
    ///
    /// Only affects FUTURE sales: committed sale items keep the unit
    /// price snapshotted at their allocation time.
    pub async fn set_selling_price(&self, id: &str, selling_price_cents: i64) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE batches SET selling_price_cents = ?2, updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(selling_price_cents)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Batch", id));
        }

        Ok(())
    }

    /// Deactivates a batch (quarantine / recall). Stock history stays.
    pub async fn deactivate(&self, id: &str) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE batches SET is_active = 0, updated_at = ?2
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Batch", id));
        }

        Ok(())
    }

    // =========================================================================
    // Ledger writes
    // =========================================================================

    /// Deducts `quantity` units from a batch, guarded.
    ///
    /// Returns `Ok(true)` when the deduction applied, `Ok(false)` when the
    /// guard rejected it (batch missing, inactive, or holding less than
    /// `quantity`). A `false` at deduction time means the shelf state
    /// changed since planning; the enclosing transaction must abort.
    ///
    /// Takes an explicit executor so the coordinator can run it inside its
    /// transaction. Runnable on the pool directly for standalone use.
    pub async fn deduct<'e, E>(executor: E, batch_id: &str, quantity: i64) -> DbResult<bool>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        debug_assert!(quantity > 0);

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE batches
            SET remaining_quantity = remaining_quantity - ?2,
                updated_at = ?3
            WHERE id = ?1
              AND is_active = 1
              AND remaining_quantity >= ?2
            "#,
        )
        .bind(batch_id)
        .bind(quantity)
        .bind(now)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Restores `quantity` units to a batch, unconditionally.
    ///
    /// Used only by sale cancellation, which restores exactly what was
    /// deducted at creation - hence no upper bound check.
    pub async fn restore<'e, E>(executor: E, batch_id: &str, quantity: i64) -> DbResult<()>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        debug_assert!(quantity > 0);

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE batches
            SET remaining_quantity = remaining_quantity + ?2,
                updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(batch_id)
        .bind(quantity)
        .bind(now)
        .execute(executor)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Batch", batch_id));
        }

        Ok(())
    }
}

/// Helper to generate a new batch ID.
pub fn generate_batch_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

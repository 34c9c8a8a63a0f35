//! # Medicine Repository
//!
//! Database operations for the medicine catalog.
//!
//! ## Key Operations
//! - CRUD with soft delete
//! - Name/code search
//! - Low-stock projection (read-only, derived over the batch ledger)
//!
//! Stock quantities never live on the medicine row; they are always
//! aggregated from batches on demand.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use medipos_core::Medicine;

/// A medicine whose total remaining stock dropped below its reorder
/// threshold. Read-only projection row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LowStockMedicine {
    pub id: String,
    pub name: String,
    pub code: String,
    pub reorder_threshold: i64,
    /// Sum of remaining quantity across the medicine's active batches.
    pub total_remaining: i64,
}

/// Repository for medicine catalog operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = MedicineRepository::new(pool);
///
/// let results = repo.search("para", 20).await?;
/// let medicine = repo.get_by_code("PARA-500").await?;
/// ```
#[derive(Debug, Clone)]
pub struct MedicineRepository {
    pool: SqlitePool,
}

impl MedicineRepository {
    /// Creates a new MedicineRepository.
    pub fn new(pool: SqlitePool) -> Self {
        MedicineRepository { pool }
    }

    /// Gets a medicine by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Medicine>> {
        let medicine = sqlx::query_as::<_, Medicine>(
            r#"
            SELECT id, name, code, category, reorder_threshold, is_active,
                   created_at, updated_at
            FROM medicines
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(medicine)
    }

    /// Gets a medicine by its business code (e.g., "PARA-500").
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Medicine>> {
        let medicine = sqlx::query_as::<_, Medicine>(
            r#"
            SELECT id, name, code, category, reorder_threshold, is_active,
                   created_at, updated_at
            FROM medicines
            WHERE code = ?1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(medicine)
    }

    /// Searches active medicines by name or code substring.
    ///
    /// Empty query returns active medicines sorted by name.
    pub async fn search(&self, query: &str, limit: u32) -> DbResult<Vec<Medicine>> {
        let query = query.trim();

        debug!(query = %query, limit = %limit, "searching medicines");

        let pattern = format!("%{query}%");

        let medicines = sqlx::query_as::<_, Medicine>(
            r#"
            SELECT id, name, code, category, reorder_threshold, is_active,
                   created_at, updated_at
            FROM medicines
            WHERE is_active = 1
              AND (name LIKE ?1 OR code LIKE ?1)
            ORDER BY name
            LIMIT ?2
            "#,
        )
        .bind(pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = medicines.len(), "search returned medicines");
        Ok(medicines)
    }

    /// Inserts a new medicine.
    ///
    /// ## Errors
    /// `DbError::UniqueViolation` when the code already exists.
    pub async fn insert(&self, medicine: &Medicine) -> DbResult<()> {
        debug!(code = %medicine.code, "inserting medicine");

        sqlx::query(
            r#"
            INSERT INTO medicines (
                id, name, code, category, reorder_threshold, is_active,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&medicine.id)
        .bind(&medicine.name)
        .bind(&medicine.code)
        .bind(&medicine.category)
        .bind(medicine.reorder_threshold)
        .bind(medicine.is_active)
        .bind(medicine.created_at)
        .bind(medicine.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Updates descriptive fields of an existing medicine.
    ///
    /// Identity (`id`) is immutable; the code may be corrected while it
    /// stays unique.
    pub async fn update(&self, medicine: &Medicine) -> DbResult<()> {
        debug!(id = %medicine.id, "updating medicine");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE medicines SET
                name = ?2,
                code = ?3,
                category = ?4,
                reorder_threshold = ?5,
                is_active = ?6,
                updated_at = ?7
            WHERE id = ?1
            "#,
        )
        .bind(&medicine.id)
        .bind(&medicine.name)
        .bind(&medicine.code)
        .bind(&medicine.category)
        .bind(medicine.reorder_threshold)
        .bind(medicine.is_active)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Medicine", &medicine.id));
        }

        Ok(())
    }

    /// Soft-deletes a medicine by setting is_active = false.
    ///
    /// Historical sales and batches still reference it, so it is never
    /// physically deleted.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "soft-deleting medicine");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE medicines SET is_active = 0, updated_at = ?2
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Medicine", id));
        }

        Ok(())
    }

    /// Counts active medicines (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM medicines WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Lists active medicines whose total remaining stock (across active
    /// batches) fell below their reorder threshold.
    ///
    /// A read-only projection over the batch ledger; recomputed per call,
    /// never cached or event-driven.
    pub async fn below_reorder(&self) -> DbResult<Vec<LowStockMedicine>> {
        let rows = sqlx::query_as::<_, LowStockMedicine>(
            r#"
            SELECT m.id, m.name, m.code, m.reorder_threshold,
                   COALESCE((
                       SELECT SUM(b.remaining_quantity)
                       FROM batches b
                       WHERE b.medicine_id = m.id AND b.is_active = 1
                   ), 0) AS total_remaining
            FROM medicines m
            WHERE m.is_active = 1
              AND m.reorder_threshold > 0
              AND COALESCE((
                      SELECT SUM(b.remaining_quantity)
                      FROM batches b
                      WHERE b.medicine_id = m.id AND b.is_active = 1
                  ), 0) < m.reorder_threshold
            ORDER BY m.name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

/// Helper to generate a new medicine ID.
pub fn generate_medicine_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

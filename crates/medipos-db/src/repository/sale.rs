//! # Sale Repository
//!
//! Persistence for sale headers and sale items.
//!
//! Reads run on the pool. Writes take an explicit executor because they
//! only ever happen inside the sale coordinator's transaction - a sale
//! header, its items, and the matching ledger deductions commit together
//! or not at all.

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use medipos_core::{Sale, SaleItem};

const SALE_COLUMNS: &str = "id, invoice_number, payment_method, total_cents, is_cancelled, \
     seller_id, cancelled_by, cancelled_at, created_at";

/// Repository for sale persistence.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Gets a sale header by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sale)
    }

    /// Gets the items of a sale in allocation order (`line_no` ascending).
    pub async fn get_items(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let items = sqlx::query_as::<_, SaleItem>(
            r#"
            SELECT id, sale_id, line_no, batch_id, medicine_id, quantity,
                   unit_price_cents, line_total_cents, created_at
            FROM sale_items
            WHERE sale_id = ?1
            ORDER BY line_no
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Lists sale headers in a created-at window, newest first (for
    /// end-of-day reporting).
    pub async fn list_between(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales \
             WHERE created_at >= ?1 AND created_at < ?2 \
             ORDER BY created_at DESC"
        ))
        .bind(from)
        .bind(until)
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }

    // =========================================================================
    // Transactional writes (coordinator only)
    // =========================================================================

    /// Inserts a sale header.
    ///
    /// Invoice number and total are finalized by [`Self::finalize`] inside
    /// the same transaction, once every line has been applied.
    pub async fn insert_header<'e, E>(executor: E, sale: &Sale) -> DbResult<()>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            r#"
            INSERT INTO sales (
                id, invoice_number, payment_method, total_cents, is_cancelled,
                seller_id, cancelled_by, cancelled_at, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.invoice_number)
        .bind(sale.payment_method)
        .bind(sale.total_cents)
        .bind(sale.is_cancelled)
        .bind(&sale.seller_id)
        .bind(&sale.cancelled_by)
        .bind(sale.cancelled_at)
        .bind(sale.created_at)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Inserts one sale item.
    pub async fn insert_item<'e, E>(executor: E, item: &SaleItem) -> DbResult<()>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            r#"
            INSERT INTO sale_items (
                id, sale_id, line_no, batch_id, medicine_id, quantity,
                unit_price_cents, line_total_cents, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&item.id)
        .bind(&item.sale_id)
        .bind(item.line_no)
        .bind(&item.batch_id)
        .bind(&item.medicine_id)
        .bind(item.quantity)
        .bind(item.unit_price_cents)
        .bind(item.line_total_cents)
        .bind(item.created_at)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Stamps the invoice number and the summed total onto a sale header.
    pub async fn finalize<'e, E>(
        executor: E,
        sale_id: &str,
        invoice_number: &str,
        total_cents: i64,
    ) -> DbResult<()>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            UPDATE sales SET invoice_number = ?2, total_cents = ?3
            WHERE id = ?1
            "#,
        )
        .bind(sale_id)
        .bind(invoice_number)
        .bind(total_cents)
        .execute(executor)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", sale_id));
        }

        Ok(())
    }

    /// Marks a sale cancelled, guarded against double cancellation.
    ///
    /// Returns `Ok(true)` when the flag flipped, `Ok(false)` when the sale
    /// was already cancelled (the caller must roll back its restores).
    pub async fn mark_cancelled<'e, E>(
        executor: E,
        sale_id: &str,
        cancelled_by: &str,
        cancelled_at: DateTime<Utc>,
    ) -> DbResult<bool>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            UPDATE sales
            SET is_cancelled = 1, cancelled_by = ?2, cancelled_at = ?3
            WHERE id = ?1
              AND is_cancelled = 0
            "#,
        )
        .bind(sale_id)
        .bind(cancelled_by)
        .bind(cancelled_at)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

/// Helper to generate a new sale ID.
pub fn generate_sale_id() -> String {
    Uuid::new_v4().to_string()
}

/// Helper to generate a new sale item ID.
pub fn generate_sale_item_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use medipos_core::PaymentMethod;

    fn sale(seller: &str) -> Sale {
        Sale {
            id: generate_sale_id(),
            invoice_number: String::new(),
            payment_method: PaymentMethod::Cash,
            total_cents: 0,
            is_cancelled: false,
            seller_id: seller.to_string(),
            cancelled_by: None,
            cancelled_at: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_header_roundtrip_and_finalize() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.sales();

        let s = sale("seller-1");
        SaleRepository::insert_header(db.pool(), &s).await.unwrap();
        SaleRepository::finalize(db.pool(), &s.id, "INV-ABCD1234", 2500)
            .await
            .unwrap();

        let found = repo.get_by_id(&s.id).await.unwrap().unwrap();
        assert_eq!(found.invoice_number, "INV-ABCD1234");
        assert_eq!(found.total_cents, 2500);
        assert_eq!(found.payment_method, PaymentMethod::Cash);
        assert!(!found.is_cancelled);

        assert!(repo.get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mark_cancelled_guard() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.sales();

        let s = sale("seller-1");
        SaleRepository::insert_header(db.pool(), &s).await.unwrap();

        let now = Utc::now();
        assert!(
            SaleRepository::mark_cancelled(db.pool(), &s.id, "admin-1", now)
                .await
                .unwrap()
        );
        // Second attempt sees the flag already set
        assert!(
            !SaleRepository::mark_cancelled(db.pool(), &s.id, "admin-2", now)
                .await
                .unwrap()
        );

        let found = repo.get_by_id(&s.id).await.unwrap().unwrap();
        assert!(found.is_cancelled);
        assert_eq!(found.cancelled_by.as_deref(), Some("admin-1"));
        assert!(found.cancelled_at.is_some());
    }

    #[tokio::test]
    async fn test_list_between_window_is_inclusive_exclusive() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.sales();

        let t0 = Utc::now();
        let day = chrono::Duration::days(1);

        // One sale exactly on each boundary plus one inside the window
        let mut before = sale("seller-1");
        before.created_at = t0 - day;
        let mut on_from = sale("seller-1");
        on_from.created_at = t0;
        let mut inside = sale("seller-1");
        inside.created_at = t0 + day;
        let mut on_until = sale("seller-1");
        on_until.created_at = t0 + day + day;

        for s in [&before, &on_from, &inside, &on_until] {
            SaleRepository::insert_header(db.pool(), s).await.unwrap();
        }

        // [t0, t0 + 2d): start included, end excluded
        let listed = repo.list_between(t0, t0 + day + day).await.unwrap();
        let ids: Vec<&str> = listed.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec![inside.id.as_str(), on_from.id.as_str()]);
    }
}

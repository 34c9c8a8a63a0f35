//! # Sale Transaction Coordinator
//!
//! Orchestrates the whole sale flow: validation, FEFO planning, the atomic
//! deduct-and-persist transaction, invoice numbering, and post-commit audit.
//!
//! ## Create-Sale Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       create_sale Pipeline                              │
//! │                                                                         │
//! │  1. Validate request          EmptyCart / InvalidQuantity              │
//! │        │                      (nothing touched yet)                     │
//! │        ▼                                                                │
//! │  2. Merge duplicate lines     two lines for one medicine = one line    │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  3. Resolve medicines         UnknownMedicine on miss/inactive         │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  4. Plan (pure FEFO)          InsufficientStock on shortfall           │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  5. BEGIN ──► insert header                                            │
//! │        │      per plan entry:                                          │
//! │        │        guarded deduct ──► 0 rows? ConcurrentStockChange,      │
//! │        │        insert item          ROLLBACK everything               │
//! │        │      finalize (invoice + total)                               │
//! │        ▼                                                                │
//! │     COMMIT                                                              │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  6. audit.notify(...)         post-commit, best-effort                 │
//! │                                                                         │
//! │  Failure at ANY step before COMMIT leaves stock and sales exactly      │
//! │  as they were. The engine never auto-retries.                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::audit::{AuditEvent, AuditSink};
use crate::error::DbError;
use crate::repository::batch::BatchRepository;
use crate::repository::medicine::MedicineRepository;
use crate::repository::sale::{generate_sale_id, generate_sale_item_id, SaleRepository};
use medipos_core::{
    allocate, validation, AllocationPlan, CoreError, PaymentMethod, Sale, SaleItem, SaleLine,
    SaleRecord,
};
use sqlx::SqlitePool;

// =============================================================================
// Error
// =============================================================================

/// Errors surfaced by the sale engine.
///
/// Domain errors (`CoreError`) are expected operational outcomes the caller
/// handles; database errors indicate infrastructure trouble.
#[derive(Debug, Error)]
pub enum SalesError {
    /// A business rule rejected the request.
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// The database failed.
    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<medipos_core::ValidationError> for SalesError {
    fn from(err: medipos_core::ValidationError) -> Self {
        SalesError::Domain(CoreError::Validation(err))
    }
}

/// Result type for sale engine operations.
pub type SalesResult<T> = Result<T, SalesError>;

// =============================================================================
// Sale Service
// =============================================================================

/// The sale transaction coordinator.
///
/// ## Usage
/// ```rust,ignore
/// let (audit, audit_rx) = AuditSink::channel();
/// let sales = db.sale_service(audit);
///
/// let record = sales
///     .create_sale(
///         &[SaleLine::new(&paracetamol_id, 8)],
///         "seller-1",
///         PaymentMethod::Cash,
///     )
///     .await?;
///
/// sales.cancel_sale(&record.sale.id, "admin-1").await?;
/// ```
#[derive(Debug, Clone)]
pub struct SaleService {
    pool: SqlitePool,
    audit: AuditSink,
}

impl SaleService {
    /// Creates a new sale service on the given pool.
    pub fn new(pool: SqlitePool, audit: AuditSink) -> Self {
        SaleService { pool, audit }
    }

    // =========================================================================
    // Create
    // =========================================================================

    /// Creates and commits a sale.
    ///
    /// Validates the request, plans a FEFO allocation per line, then applies
    /// every deduction and persists the sale in one transaction. The guarded
    /// ledger deduct re-checks stock at mutation time; any batch consumed
    /// since planning aborts the whole sale with `ConcurrentStockChange`.
    ///
    /// Lines naming the same medicine twice are merged before planning.
    ///
    /// On success an audit event fires (best-effort) and the committed
    /// record is returned.
    #[instrument(skip(self, lines), fields(line_count = lines.len(), seller = %seller_id))]
    pub async fn create_sale(
        &self,
        lines: &[SaleLine],
        seller_id: &str,
        payment_method: PaymentMethod,
    ) -> SalesResult<SaleRecord> {
        // ----- 1. Validate, before anything is looked up -----
        if lines.is_empty() {
            return Err(CoreError::EmptyCart.into());
        }
        validation::validate_sale_lines(lines.len()).map_err(SalesError::from)?;
        for line in lines {
            if line.quantity <= 0 {
                return Err(CoreError::InvalidQuantity {
                    quantity: line.quantity,
                }
                .into());
            }
            validation::validate_quantity(line.quantity).map_err(SalesError::from)?;
        }

        // ----- 2. Merge duplicate medicine lines -----
        let merged = merge_lines(lines);

        // ----- 3 & 4. Resolve medicines and plan allocations -----
        let today = Utc::now().date_naive();
        let medicines = MedicineRepository::new(self.pool.clone());
        let batches = BatchRepository::new(self.pool.clone());

        let mut plans: Vec<AllocationPlan> = Vec::with_capacity(merged.len());
        for line in &merged {
            let medicine = medicines
                .get_by_id(&line.medicine_id)
                .await?
                .filter(|m| m.is_active)
                .ok_or_else(|| CoreError::UnknownMedicine(line.medicine_id.clone()))?;

            let candidates = batches.eligible_for_sale(&medicine.id, today).await?;
            let plan = allocate(&medicine.id, &candidates, line.quantity, today)?;
            plans.push(plan);
        }

        // ----- 5. Apply atomically -----
        let sale_id = generate_sale_id();
        let now = Utc::now();
        let mut sale = Sale {
            id: sale_id.clone(),
            invoice_number: String::new(),
            payment_method,
            total_cents: 0,
            is_cancelled: false,
            seller_id: seller_id.to_string(),
            cancelled_by: None,
            cancelled_at: None,
            created_at: now,
        };

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        SaleRepository::insert_header(&mut *tx, &sale).await?;

        let mut items: Vec<SaleItem> = Vec::new();
        let mut total_cents: i64 = 0;

        for plan in &plans {
            for entry in &plan.entries {
                let applied =
                    BatchRepository::deduct(&mut *tx, &entry.batch_id, entry.quantity).await?;
                if !applied {
                    // Dropping tx rolls back the header and every prior
                    // deduction/item.
                    warn!(batch_id = %entry.batch_id, "stock changed between planning and deduction");
                    return Err(CoreError::ConcurrentStockChange {
                        batch_id: entry.batch_id.clone(),
                    }
                    .into());
                }

                let line_total = entry.line_total().cents();
                let item = SaleItem {
                    id: generate_sale_item_id(),
                    sale_id: sale_id.clone(),
                    line_no: items.len() as i64,
                    batch_id: entry.batch_id.clone(),
                    medicine_id: plan.medicine_id.clone(),
                    quantity: entry.quantity,
                    unit_price_cents: entry.unit_price_cents,
                    line_total_cents: line_total,
                    created_at: now,
                };
                SaleRepository::insert_item(&mut *tx, &item).await?;
                total_cents += line_total;
                items.push(item);
            }
        }

        let invoice = invoice_number(&sale_id);
        SaleRepository::finalize(&mut *tx, &sale_id, &invoice, total_cents).await?;

        tx.commit().await.map_err(DbError::from)?;

        sale.invoice_number = invoice;
        sale.total_cents = total_cents;

        info!(
            sale_id = %sale.id,
            invoice = %sale.invoice_number,
            total_cents,
            items = items.len(),
            "sale committed"
        );

        // ----- 6. Post-commit audit, best-effort -----
        self.audit
            .notify(AuditEvent::sale_created(seller_id, &sale.id, total_cents));

        Ok(SaleRecord { sale, items })
    }

    // =========================================================================
    // Cancel
    // =========================================================================

    /// Cancels a committed sale and restores its stock.
    ///
    /// Restores to each item's exact source batch the exact quantity that
    /// sale deducted, then flips the one-way cancellation flag - all in one
    /// transaction. Restoration happens even for batches that have since
    /// expired or been deactivated; disposing of restored expired stock is
    /// an inventory concern, not the engine's.
    ///
    /// A second cancellation fails with `AlreadyCancelled` and restores
    /// nothing.
    #[instrument(skip(self))]
    pub async fn cancel_sale(&self, sale_id: &str, actor_id: &str) -> SalesResult<()> {
        let sales = SaleRepository::new(self.pool.clone());

        let sale = sales
            .get_by_id(sale_id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()))?;
        if sale.is_cancelled {
            return Err(CoreError::AlreadyCancelled(sale_id.to_string()).into());
        }

        let items = sales.get_items(sale_id).await?;
        let now = Utc::now();

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        for item in &items {
            BatchRepository::restore(&mut *tx, &item.batch_id, item.quantity).await?;
        }

        // Guarded flip catches a cancellation that raced past the check
        // above; rolling back undoes the restores.
        let flipped = SaleRepository::mark_cancelled(&mut *tx, sale_id, actor_id, now).await?;
        if !flipped {
            return Err(CoreError::AlreadyCancelled(sale_id.to_string()).into());
        }

        tx.commit().await.map_err(DbError::from)?;

        info!(sale_id = %sale_id, actor = %actor_id, "sale cancelled, stock restored");

        self.audit
            .notify(AuditEvent::sale_cancelled(actor_id, sale_id, sale.total_cents));

        Ok(())
    }

    // =========================================================================
    // Read
    // =========================================================================

    /// Fetches a committed sale with its items.
    pub async fn get_sale(&self, sale_id: &str) -> SalesResult<SaleRecord> {
        let sales = SaleRepository::new(self.pool.clone());

        let sale = sales
            .get_by_id(sale_id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()))?;
        let items = sales.get_items(sale_id).await?;

        Ok(SaleRecord { sale, items })
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Collapses lines naming the same medicine into one line with the summed
/// quantity, keeping first-seen order.
fn merge_lines(lines: &[SaleLine]) -> Vec<SaleLine> {
    let mut merged: Vec<SaleLine> = Vec::with_capacity(lines.len());
    for line in lines {
        match merged.iter_mut().find(|l| l.medicine_id == line.medicine_id) {
            Some(existing) => existing.quantity += line.quantity,
            None => merged.push(line.clone()),
        }
    }
    merged
}

/// Derives the human-readable invoice number from the sale id.
fn invoice_number(sale_id: &str) -> String {
    let short: String = sale_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(8)
        .collect();
    format!("INV-{}", short.to_ascii_uppercase())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::batch::generate_batch_id;
    use crate::repository::medicine::generate_medicine_id;
    use chrono::{Duration, NaiveDate};
    use medipos_core::{Batch, Medicine};

    struct Fixture {
        db: Database,
        service: SaleService,
        audit_rx: tokio::sync::mpsc::UnboundedReceiver<AuditEvent>,
    }

    async fn fixture() -> Fixture {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let (audit, audit_rx) = AuditSink::channel();
        let service = db.sale_service(audit);
        Fixture {
            db,
            service,
            audit_rx,
        }
    }

    async fn add_medicine(db: &Database, code: &str) -> String {
        let now = Utc::now();
        let medicine = Medicine {
            id: generate_medicine_id(),
            name: format!("Medicine {code}"),
            code: code.to_string(),
            category: None,
            reorder_threshold: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        db.medicines().insert(&medicine).await.unwrap();
        medicine.id
    }

    async fn add_batch(
        db: &Database,
        medicine_id: &str,
        expiry: NaiveDate,
        qty: i64,
        price_cents: i64,
    ) -> String {
        let now = Utc::now();
        let batch = Batch {
            id: generate_batch_id(),
            medicine_id: medicine_id.to_string(),
            batch_number: format!("LOT-{}", &generate_batch_id()[..8]),
            expiry_date: expiry,
            remaining_quantity: qty,
            purchase_price_cents: price_cents / 2,
            selling_price_cents: price_cents,
            supplier_id: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        db.batches().insert(&batch).await.unwrap();
        batch.id
    }

    async fn remaining(db: &Database, batch_id: &str) -> i64 {
        db.batches()
            .get_by_id(batch_id)
            .await
            .unwrap()
            .unwrap()
            .remaining_quantity
    }

    fn in_days(days: i64) -> NaiveDate {
        Utc::now().date_naive() + Duration::days(days)
    }

    // -------------------------------------------------------------------------
    // Create: happy path
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_create_sale_splits_across_batches_fefo() {
        let mut fx = fixture().await;
        let med = add_medicine(&fx.db, "PARA-500").await;
        // b1 expires sooner and must drain first
        let b1 = add_batch(&fx.db, &med, in_days(10), 5, 100).await;
        let b2 = add_batch(&fx.db, &med, in_days(20), 10, 120).await;

        let record = fx
            .service
            .create_sale(&[SaleLine::new(&med, 8)], "seller-1", PaymentMethod::Cash)
            .await
            .unwrap();

        assert_eq!(record.items.len(), 2);
        assert_eq!(record.items[0].batch_id, b1);
        assert_eq!(record.items[0].quantity, 5);
        assert_eq!(record.items[0].unit_price_cents, 100);
        assert_eq!(record.items[1].batch_id, b2);
        assert_eq!(record.items[1].quantity, 3);
        assert_eq!(record.items[1].unit_price_cents, 120);

        assert_eq!(record.sale.total_cents, 5 * 100 + 3 * 120);
        assert!(record.totals_consistent());
        assert!(record.sale.invoice_number.starts_with("INV-"));
        assert_eq!(record.sale.invoice_number.len(), 4 + 8);

        assert_eq!(remaining(&fx.db, &b1).await, 0);
        assert_eq!(remaining(&fx.db, &b2).await, 7);

        let event = fx.audit_rx.recv().await.unwrap();
        assert_eq!(event.action, crate::audit::AuditAction::Create);
        assert_eq!(event.entity_id, record.sale.id);
        assert_eq!(event.actor_id, "seller-1");
        assert_eq!(event.total_cents, record.sale.total_cents);
    }

    #[tokio::test]
    async fn test_create_sale_never_touches_later_cohorts() {
        let fx = fixture().await;
        let med = add_medicine(&fx.db, "AMOX-250").await;
        let b1 = add_batch(&fx.db, &med, in_days(5), 5, 100).await;
        let b2 = add_batch(&fx.db, &med, in_days(15), 5, 100).await;
        let b3 = add_batch(&fx.db, &med, in_days(25), 5, 100).await;

        fx.service
            .create_sale(&[SaleLine::new(&med, 6)], "seller-1", PaymentMethod::Card)
            .await
            .unwrap();

        assert_eq!(remaining(&fx.db, &b1).await, 0);
        assert_eq!(remaining(&fx.db, &b2).await, 4);
        assert_eq!(remaining(&fx.db, &b3).await, 5);
    }

    #[tokio::test]
    async fn test_duplicate_lines_are_merged() {
        let fx = fixture().await;
        let med = add_medicine(&fx.db, "IBU-400").await;
        let b1 = add_batch(&fx.db, &med, in_days(10), 10, 100).await;

        let record = fx
            .service
            .create_sale(
                &[SaleLine::new(&med, 3), SaleLine::new(&med, 4)],
                "seller-1",
                PaymentMethod::Cash,
            )
            .await
            .unwrap();

        assert_eq!(record.items.len(), 1);
        assert_eq!(record.items[0].quantity, 7);
        assert_eq!(remaining(&fx.db, &b1).await, 3);
    }

    #[tokio::test]
    async fn test_multi_medicine_sale() {
        let fx = fixture().await;
        let med_a = add_medicine(&fx.db, "PARA-500").await;
        let med_b = add_medicine(&fx.db, "CET-10").await;
        add_batch(&fx.db, &med_a, in_days(10), 10, 100).await;
        add_batch(&fx.db, &med_b, in_days(10), 10, 250).await;

        let record = fx
            .service
            .create_sale(
                &[SaleLine::new(&med_a, 2), SaleLine::new(&med_b, 3)],
                "seller-1",
                PaymentMethod::BankTransfer,
            )
            .await
            .unwrap();

        assert_eq!(record.items.len(), 2);
        assert_eq!(record.sale.total_cents, 2 * 100 + 3 * 250);
        assert!(record.totals_consistent());
    }

    // -------------------------------------------------------------------------
    // Create: rejections
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_empty_cart_rejected() {
        let fx = fixture().await;
        let err = fx
            .service
            .create_sale(&[], "seller-1", PaymentMethod::Cash)
            .await
            .unwrap_err();
        assert!(matches!(err, SalesError::Domain(CoreError::EmptyCart)));
    }

    #[tokio::test]
    async fn test_non_positive_quantity_rejected() {
        let fx = fixture().await;
        let med = add_medicine(&fx.db, "PARA-500").await;
        add_batch(&fx.db, &med, in_days(10), 10, 100).await;

        let err = fx
            .service
            .create_sale(&[SaleLine::new(&med, 0)], "seller-1", PaymentMethod::Cash)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SalesError::Domain(CoreError::InvalidQuantity { quantity: 0 })
        ));

        let err = fx
            .service
            .create_sale(&[SaleLine::new(&med, -2)], "seller-1", PaymentMethod::Cash)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SalesError::Domain(CoreError::InvalidQuantity { quantity: -2 })
        ));
    }

    #[tokio::test]
    async fn test_unknown_and_inactive_medicine_rejected() {
        let fx = fixture().await;

        let err = fx
            .service
            .create_sale(
                &[SaleLine::new("no-such-medicine", 1)],
                "seller-1",
                PaymentMethod::Cash,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SalesError::Domain(CoreError::UnknownMedicine(_))
        ));

        let med = add_medicine(&fx.db, "OLD-1").await;
        add_batch(&fx.db, &med, in_days(10), 10, 100).await;
        fx.db.medicines().soft_delete(&med).await.unwrap();

        let err = fx
            .service
            .create_sale(&[SaleLine::new(&med, 1)], "seller-1", PaymentMethod::Cash)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SalesError::Domain(CoreError::UnknownMedicine(_))
        ));
    }

    #[tokio::test]
    async fn test_insufficient_stock_reports_and_mutates_nothing() {
        let mut fx = fixture().await;
        let med = add_medicine(&fx.db, "PARA-500").await;
        let b1 = add_batch(&fx.db, &med, in_days(10), 4, 100).await;
        let b2 = add_batch(&fx.db, &med, in_days(20), 3, 100).await;

        let err = fx
            .service
            .create_sale(&[SaleLine::new(&med, 12)], "seller-1", PaymentMethod::Cash)
            .await
            .unwrap_err();

        match err {
            SalesError::Domain(CoreError::InsufficientStock {
                requested,
                available,
                ..
            }) => {
                assert_eq!(requested, 12);
                assert_eq!(available, 7);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }

        assert_eq!(remaining(&fx.db, &b1).await, 4);
        assert_eq!(remaining(&fx.db, &b2).await, 3);
        // No sale, no audit event
        assert!(fx.audit_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_expired_stock_does_not_count() {
        let fx = fixture().await;
        let med = add_medicine(&fx.db, "EXP-1").await;
        add_batch(&fx.db, &med, in_days(-1), 100, 100).await;
        add_batch(&fx.db, &med, in_days(10), 2, 100).await;

        let err = fx
            .service
            .create_sale(&[SaleLine::new(&med, 3)], "seller-1", PaymentMethod::Cash)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SalesError::Domain(CoreError::InsufficientStock { available: 2, .. })
        ));
    }

    #[tokio::test]
    async fn test_partial_failure_rolls_back_whole_sale() {
        // Two lines; the second can't be covered. The first line's stock
        // must come back untouched.
        let fx = fixture().await;
        let med_a = add_medicine(&fx.db, "A-1").await;
        let med_b = add_medicine(&fx.db, "B-1").await;
        let ba = add_batch(&fx.db, &med_a, in_days(10), 10, 100).await;
        add_batch(&fx.db, &med_b, in_days(10), 1, 100).await;

        let err = fx
            .service
            .create_sale(
                &[SaleLine::new(&med_a, 5), SaleLine::new(&med_b, 5)],
                "seller-1",
                PaymentMethod::Cash,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SalesError::Domain(CoreError::InsufficientStock { .. })
        ));

        assert_eq!(remaining(&fx.db, &ba).await, 10);
    }

    // -------------------------------------------------------------------------
    // Price snapshot
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_committed_items_keep_snapshotted_price() {
        let fx = fixture().await;
        let med = add_medicine(&fx.db, "SNAP-1").await;
        let b1 = add_batch(&fx.db, &med, in_days(10), 10, 100).await;

        let record = fx
            .service
            .create_sale(&[SaleLine::new(&med, 2)], "seller-1", PaymentMethod::Cash)
            .await
            .unwrap();

        // Reprice after commit; history must not move
        fx.db.batches().set_selling_price(&b1, 999).await.unwrap();

        let reloaded = fx.service.get_sale(&record.sale.id).await.unwrap();
        assert_eq!(reloaded.items[0].unit_price_cents, 100);
        assert_eq!(reloaded.sale.total_cents, 200);

        // A new sale picks up the new price
        let fresh = fx
            .service
            .create_sale(&[SaleLine::new(&med, 1)], "seller-1", PaymentMethod::Cash)
            .await
            .unwrap();
        assert_eq!(fresh.items[0].unit_price_cents, 999);
    }

    // -------------------------------------------------------------------------
    // Cancel
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_cancel_restores_exact_quantities() {
        let mut fx = fixture().await;
        let med = add_medicine(&fx.db, "PARA-500").await;
        let b1 = add_batch(&fx.db, &med, in_days(10), 5, 100).await;
        let b2 = add_batch(&fx.db, &med, in_days(20), 10, 120).await;

        let record = fx
            .service
            .create_sale(&[SaleLine::new(&med, 8)], "seller-1", PaymentMethod::Cash)
            .await
            .unwrap();
        assert_eq!(remaining(&fx.db, &b1).await, 0);
        assert_eq!(remaining(&fx.db, &b2).await, 7);
        let _ = fx.audit_rx.recv().await.unwrap();

        fx.service
            .cancel_sale(&record.sale.id, "admin-1")
            .await
            .unwrap();

        // Exactly the deducted quantities, back on the source batches
        assert_eq!(remaining(&fx.db, &b1).await, 5);
        assert_eq!(remaining(&fx.db, &b2).await, 10);

        let cancelled = fx.service.get_sale(&record.sale.id).await.unwrap();
        assert!(cancelled.sale.is_cancelled);
        assert_eq!(cancelled.sale.cancelled_by.as_deref(), Some("admin-1"));
        assert!(cancelled.sale.cancelled_at.is_some());
        // Items and total remain the permanent record
        assert_eq!(cancelled.items.len(), 2);
        assert_eq!(cancelled.sale.total_cents, record.sale.total_cents);

        let event = fx.audit_rx.recv().await.unwrap();
        assert_eq!(event.action, crate::audit::AuditAction::Cancel);
        assert_eq!(event.actor_id, "admin-1");
        assert_eq!(event.entity_id, record.sale.id);
    }

    #[tokio::test]
    async fn test_cancel_restores_to_expired_batch() {
        let fx = fixture().await;
        let med = add_medicine(&fx.db, "EDGE-1").await;
        // Expires today: sellable now, expired by any later audit
        let b1 = add_batch(&fx.db, &med, in_days(0), 5, 100).await;

        let record = fx
            .service
            .create_sale(&[SaleLine::new(&med, 5)], "seller-1", PaymentMethod::Cash)
            .await
            .unwrap();
        assert_eq!(remaining(&fx.db, &b1).await, 0);

        fx.service
            .cancel_sale(&record.sale.id, "admin-1")
            .await
            .unwrap();
        assert_eq!(remaining(&fx.db, &b1).await, 5);
    }

    #[tokio::test]
    async fn test_double_cancel_rejected_without_double_restore() {
        let fx = fixture().await;
        let med = add_medicine(&fx.db, "PARA-500").await;
        let b1 = add_batch(&fx.db, &med, in_days(10), 5, 100).await;

        let record = fx
            .service
            .create_sale(&[SaleLine::new(&med, 3)], "seller-1", PaymentMethod::Cash)
            .await
            .unwrap();

        fx.service
            .cancel_sale(&record.sale.id, "admin-1")
            .await
            .unwrap();
        assert_eq!(remaining(&fx.db, &b1).await, 5);

        let err = fx
            .service
            .cancel_sale(&record.sale.id, "admin-2")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SalesError::Domain(CoreError::AlreadyCancelled(_))
        ));

        // Still exactly 5: no double restore
        assert_eq!(remaining(&fx.db, &b1).await, 5);
    }

    #[tokio::test]
    async fn test_cancel_unknown_sale() {
        let fx = fixture().await;
        let err = fx.service.cancel_sale("missing", "admin-1").await.unwrap_err();
        assert!(matches!(
            err,
            SalesError::Domain(CoreError::SaleNotFound(_))
        ));
    }

    // -------------------------------------------------------------------------
    // Read
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_get_sale_preserves_allocation_order() {
        // Many single-unit batches on an expiry ladder: the sale drains
        // them in FEFO order, and a reload must return the items in that
        // same order, not in id order.
        let fx = fixture().await;
        let med = add_medicine(&fx.db, "ORD-1").await;

        let mut ladder = Vec::new();
        for d in 1..=8 {
            ladder.push(add_batch(&fx.db, &med, in_days(d), 1, 100).await);
        }

        let record = fx
            .service
            .create_sale(&[SaleLine::new(&med, 8)], "seller-1", PaymentMethod::Cash)
            .await
            .unwrap();

        let created: Vec<&str> = record.items.iter().map(|i| i.batch_id.as_str()).collect();
        assert_eq!(
            created,
            ladder.iter().map(String::as_str).collect::<Vec<_>>()
        );

        let reloaded = fx.service.get_sale(&record.sale.id).await.unwrap();
        let loaded: Vec<&str> = reloaded.items.iter().map(|i| i.batch_id.as_str()).collect();
        assert_eq!(loaded, created);
        assert_eq!(
            reloaded.items.iter().map(|i| i.line_no).collect::<Vec<_>>(),
            (0..8).collect::<Vec<i64>>()
        );
    }

    #[tokio::test]
    async fn test_get_sale_not_found() {
        let fx = fixture().await;
        let err = fx.service.get_sale("missing").await.unwrap_err();
        assert!(matches!(
            err,
            SalesError::Domain(CoreError::SaleNotFound(_))
        ));
    }

    // -------------------------------------------------------------------------
    // Concurrency
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_concurrent_sales_never_oversell() {
        // 10 units on the shelf, 20 tasks each buying 1. Exactly 10 succeed;
        // the rest fail cleanly; the shelf ends at 0, never negative.
        let fx = fixture().await;
        let med = add_medicine(&fx.db, "RACE-1").await;
        let b1 = add_batch(&fx.db, &med, in_days(10), 10, 100).await;

        let mut handles = Vec::new();
        for i in 0..20 {
            let service = fx.service.clone();
            let med = med.clone();
            handles.push(tokio::spawn(async move {
                service
                    .create_sale(
                        &[SaleLine::new(&med, 1)],
                        &format!("seller-{i}"),
                        PaymentMethod::Cash,
                    )
                    .await
            }));
        }

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(record) => {
                    assert!(record.totals_consistent());
                    successes += 1;
                }
                Err(SalesError::Domain(
                    CoreError::InsufficientStock { .. } | CoreError::ConcurrentStockChange { .. },
                )) => {}
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!(successes, 10);
        assert_eq!(remaining(&fx.db, &b1).await, 0);
    }

    // -------------------------------------------------------------------------
    // Audit resilience
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_sale_commits_even_when_audit_consumer_gone() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let (audit, rx) = AuditSink::channel();
        drop(rx); // consumer gone before any sale
        let service = db.sale_service(audit);

        let med = add_medicine(&db, "AUD-1").await;
        let b1 = add_batch(&db, &med, in_days(10), 5, 100).await;

        let record = service
            .create_sale(&[SaleLine::new(&med, 2)], "seller-1", PaymentMethod::Cash)
            .await
            .unwrap();

        assert_eq!(remaining(&db, &b1).await, 3);
        assert!(service.get_sale(&record.sale.id).await.is_ok());
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    #[test]
    fn test_merge_lines_keeps_order_and_sums() {
        let merged = merge_lines(&[
            SaleLine::new("m1", 2),
            SaleLine::new("m2", 1),
            SaleLine::new("m1", 3),
        ]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].medicine_id, "m1");
        assert_eq!(merged[0].quantity, 5);
        assert_eq!(merged[1].medicine_id, "m2");
    }

    #[test]
    fn test_invoice_number_shape() {
        let inv = invoice_number("550e8400-e29b-41d4-a716-446655440000");
        assert_eq!(inv, "INV-550E8400");
    }
}

//! # Domain Types
//!
//! Core domain types used throughout MediPOS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Medicine     │   │      Batch      │   │      Sale       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  code (business)│◄──│  medicine_id    │   │  invoice_number │       │
//! │  │  name           │   │  expiry_date    │   │  total_cents    │       │
//! │  │  reorder_thresh │   │  remaining_qty  │   │  is_cancelled   │       │
//! │  └─────────────────┘   │  selling_price  │   └────────┬────────┘       │
//! │                        └────────▲────────┘            │                 │
//! │                                 │                     ▼                 │
//! │                                 │            ┌─────────────────┐       │
//! │                                 └────────────│    SaleItem     │       │
//! │                                              │  batch_id       │       │
//! │                                              │  unit_price     │       │
//! │                                              │  (snapshot)     │       │
//! │                                              └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID: (code, invoice_number, batch_number) - human-readable
//!
//! ## Quantity Discipline
//! `Batch::remaining_quantity` is mutated ONLY by the ledger's deduct and
//! restore operations in medipos-db. Nothing else assigns it.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Medicine
// =============================================================================

/// A medicine in the catalog.
///
/// Identity (`id`, `code`) is immutable; descriptive fields may change.
/// Stock is never carried on the medicine itself - it lives in batches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Medicine {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name shown to the seller and on the invoice.
    pub name: String,

    /// Business code - human-readable unique identifier (e.g., "PARA-500").
    pub code: String,

    /// Category label (e.g., "Analgesic", "Antibiotic").
    pub category: Option<String>,

    /// Reorder threshold: when total remaining stock across batches drops
    /// below this, the medicine shows up in the low-stock projection.
    pub reorder_threshold: i64,

    /// Whether the medicine is active (soft delete).
    pub is_active: bool,

    /// When the medicine was created.
    pub created_at: DateTime<Utc>,

    /// When the medicine was last updated.
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Batch
// =============================================================================

/// A dated, priced lot of a medicine with its own remaining quantity.
///
/// Many batches per medicine. Each batch carries its own purchase and
/// selling price, so two batches of the same medicine can sell at
/// different prices depending on when they were bought.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Batch {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Medicine this batch belongs to.
    pub medicine_id: String,

    /// Supplier-assigned batch number (printed on the packaging).
    pub batch_number: String,

    /// Expiry date. A batch expiring today is still sellable today;
    /// one that expired yesterday never is, regardless of stock.
    pub expiry_date: NaiveDate,

    /// Units still on the shelf. Never negative; mutated only by the
    /// ledger's deduct/restore operations.
    pub remaining_quantity: i64,

    /// What the pharmacy paid per unit, in cents.
    pub purchase_price_cents: i64,

    /// What the pharmacy charges per unit, in cents. Snapshotted onto
    /// sale items at allocation time.
    pub selling_price_cents: i64,

    /// Supplier reference (external metadata, not resolved by the core).
    pub supplier_id: Option<String>,

    /// Whether the batch is active (soft delete / quarantine).
    pub is_active: bool,

    /// When the batch was received.
    pub created_at: DateTime<Utc>,

    /// When the batch was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Batch {
    /// Returns the selling price as a Money type.
    #[inline]
    pub fn selling_price(&self) -> Money {
        Money::from_cents(self.selling_price_cents)
    }

    /// Checks whether the batch may supply a sale on the given date:
    /// active, unexpired, and holding stock.
    pub fn is_sellable(&self, on: NaiveDate) -> bool {
        self.is_active && self.expiry_date >= on && self.remaining_quantity > 0
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// How the customer settled the sale.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash payment.
    Cash,
    /// Card payment on external terminal.
    Card,
    /// Direct bank transfer (institutional customers).
    BankTransfer,
}

// =============================================================================
// Sale
// =============================================================================

/// A committed sale transaction.
///
/// Immutable after commit, with one exception: cancellation flips
/// `is_cancelled` (one-way) and records who did it and when. The total
/// and the line items are the permanent record and never change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Human-readable invoice number, derived from the sale id.
    pub invoice_number: String,

    /// How the sale was paid.
    pub payment_method: PaymentMethod,

    /// Total amount in cents: the sum of every item's line total.
    pub total_cents: i64,

    /// One-way cancellation flag. Default false; once true, forever true.
    pub is_cancelled: bool,

    /// Authenticated seller who made the sale (supplied by the identity
    /// layer - the engine never authenticates).
    pub seller_id: String,

    /// Who cancelled the sale, if anyone.
    pub cancelled_by: Option<String>,

    /// When the sale was cancelled, if ever.
    pub cancelled_at: Option<DateTime<Utc>>,

    /// When the sale was committed.
    pub created_at: DateTime<Utc>,
}

impl Sale {
    /// Returns the total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Sale Item
// =============================================================================

/// A line item in a sale, drawn from a single batch.
///
/// Uses the snapshot pattern: the unit price is copied from the batch's
/// selling price at allocation time and never re-read. Repricing a batch
/// later does not rewrite history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleItem {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Sale this item belongs to.
    pub sale_id: String,

    /// Position within the sale (0-based). Preserves allocation order
    /// across reloads.
    pub line_no: i64,

    /// Batch the units were drawn from.
    pub batch_id: String,

    /// Medicine the batch belongs to (denormalized for reporting).
    pub medicine_id: String,

    /// Units drawn from the batch. Always positive.
    pub quantity: i64,

    /// Unit price in cents at allocation time (frozen).
    pub unit_price_cents: i64,

    /// Line total (unit_price × quantity).
    pub line_total_cents: i64,

    /// When the item was recorded.
    pub created_at: DateTime<Utc>,
}

impl SaleItem {
    /// Returns the unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Returns the line total as Money.
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

// =============================================================================
// Sale Request / Record
// =============================================================================

/// One requested line of a sale: "this medicine, this many units".
///
/// The caller never picks batches - the FEFO allocator does.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleLine {
    /// Medicine to sell.
    pub medicine_id: String,
    /// Units requested. Must be positive.
    pub quantity: i64,
}

impl SaleLine {
    /// Convenience constructor.
    pub fn new(medicine_id: impl Into<String>, quantity: i64) -> Self {
        SaleLine {
            medicine_id: medicine_id.into(),
            quantity,
        }
    }
}

/// A committed sale with its ordered line items - what callers get back
/// from the sale engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleRecord {
    /// The sale header.
    pub sale: Sale,
    /// Line items in allocation order.
    pub items: Vec<SaleItem>,
}

impl SaleRecord {
    /// Checks the header total against the item line totals.
    ///
    /// Holds for every committed sale; exposed for diagnostics and tests.
    pub fn totals_consistent(&self) -> bool {
        let items_total: i64 = self.items.iter().map(|i| i.line_total_cents).sum();
        items_total == self.sale.total_cents
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

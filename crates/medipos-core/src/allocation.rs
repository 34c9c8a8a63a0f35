//! # FEFO Allocation
//!
//! Pure planning logic that decides which batches satisfy one sale line.
//!
//! ## The FEFO Policy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │              First-Expire-First-Out (FEFO) Allocation                   │
//! │                                                                         │
//! │  Request: (medicine M, qty 8)                                          │
//! │                                                                         │
//! │  Eligible batches, soonest expiry first:                               │
//! │  ┌──────┬────────────┬───────────┬─────────┐                           │
//! │  │ B1   │ 2025-01-01 │ qty 5     │ $0.80   │ ◄── drained first        │
//! │  │ B2   │ 2025-02-01 │ qty 10    │ $0.85   │ ◄── tops up with 3       │
//! │  │ B3   │ 2025-03-01 │ qty 50    │ $0.85   │     (untouched)          │
//! │  └──────┴────────────┴───────────┴─────────┘                           │
//! │                                                                         │
//! │  Plan: [(B1, 5, $0.80), (B2, 3, $0.85)]                                │
//! │                                                                         │
//! │  All-or-nothing: if eligible stock sums below the request,             │
//! │  NO plan is produced and InsufficientStock reports                     │
//! │  requested vs available.                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Purity
//! This module never touches the database or the clock. The caller fetches
//! candidate batches and passes in "today"; the allocator only plans.
//! Applying the plan (the actual deductions) is the transaction
//! coordinator's job in medipos-db.

use chrono::NaiveDate;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::Batch;

// =============================================================================
// Allocation Plan
// =============================================================================

/// One entry of an allocation plan: take `quantity` units from `batch_id`
/// at the snapshotted unit price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    /// Batch to draw from.
    pub batch_id: String,
    /// Units to take from this batch.
    pub quantity: i64,
    /// Unit price in cents, frozen from the batch's selling price.
    pub unit_price_cents: i64,
}

impl Allocation {
    /// Line total for this entry.
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.unit_price_cents).multiply_quantity(self.quantity)
    }
}

/// The ordered batch draw-down plan for a single sale line.
#[derive(Debug, Clone)]
pub struct AllocationPlan {
    /// Medicine this plan satisfies.
    pub medicine_id: String,
    /// Draw-down entries, soonest-expiring batch first.
    pub entries: Vec<Allocation>,
}

impl AllocationPlan {
    /// Total units across all entries. Equals the requested quantity
    /// by construction.
    pub fn total_quantity(&self) -> i64 {
        self.entries.iter().map(|e| e.quantity).sum()
    }

    /// Total cost across all entries.
    pub fn total(&self) -> Money {
        self.entries
            .iter()
            .fold(Money::zero(), |acc, e| acc + e.line_total())
    }
}

// =============================================================================
// Allocator
// =============================================================================

/// Plans a FEFO allocation for one sale line.
///
/// ## Algorithm
/// 1. Keep only sellable batches: active, unexpired on `today`, stock > 0.
///    (Callers normally pre-filter via the ledger query; the re-filter here
///    keeps the function total over arbitrary input.)
/// 2. Order ascending by expiry date, ties broken by batch id, so the plan
///    is deterministic for a given shelf state.
/// 3. Greedily take `min(remaining, still_needed)` per batch.
/// 4. A shortfall fails the whole line - no partial plan is ever returned.
///
/// ## Errors
/// - `InvalidQuantity` when `requested <= 0` (caller error, checked before
///   any batch is inspected)
/// - `InsufficientStock { requested, available }` when eligible stock can't
///   cover the line; `available` is 0 when no batch is eligible at all
pub fn allocate(
    medicine_id: &str,
    batches: &[Batch],
    requested: i64,
    today: NaiveDate,
) -> CoreResult<AllocationPlan> {
    if requested <= 0 {
        return Err(CoreError::InvalidQuantity {
            quantity: requested,
        });
    }

    let mut eligible: Vec<&Batch> = batches
        .iter()
        .filter(|b| b.medicine_id == medicine_id && b.is_sellable(today))
        .collect();
    eligible.sort_by(|a, b| {
        a.expiry_date
            .cmp(&b.expiry_date)
            .then_with(|| a.id.cmp(&b.id))
    });

    let available: i64 = eligible.iter().map(|b| b.remaining_quantity).sum();
    if available < requested {
        return Err(CoreError::InsufficientStock {
            medicine: medicine_id.to_string(),
            requested,
            available,
        });
    }

    let mut entries = Vec::new();
    let mut still_needed = requested;
    for batch in eligible {
        if still_needed == 0 {
            break;
        }
        let take = batch.remaining_quantity.min(still_needed);
        entries.push(Allocation {
            batch_id: batch.id.clone(),
            quantity: take,
            unit_price_cents: batch.selling_price_cents,
        });
        still_needed -= take;
    }

    debug_assert_eq!(still_needed, 0);

    Ok(AllocationPlan {
        medicine_id: medicine_id.to_string(),
        entries,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

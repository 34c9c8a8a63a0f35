//! # Error Types
//!
//! Domain-specific error types for medipos-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  medipos-core errors (this file)                                       │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  medipos-db errors (separate crate)                                    │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── SalesError       - CoreError | DbError at the sale-engine seam    │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → SalesError → Caller               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (medicine id, requested vs available)
//! 3. Errors are enum variants, never String
//! 4. Resource-state errors carry enough detail for the caller to adjust
//!    quantities and resubmit

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These are the errors a sale caller can see. Validation errors are caught
/// before any mutation; resource-state errors (`InsufficientStock`,
/// `ConcurrentStockChange`) guarantee that no partial side effect escaped.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The sale request contained no lines.
    #[error("cannot create a sale from an empty cart")]
    EmptyCart,

    /// A line requested a non-positive quantity.
    ///
    /// Rejected before any batch lookup happens.
    #[error("invalid quantity {quantity}: must be positive")]
    InvalidQuantity { quantity: i64 },

    /// Medicine id does not resolve to an active medicine.
    ///
    /// ## When This Occurs
    /// - Medicine id doesn't exist
    /// - Medicine was soft-deleted (is_active = false)
    #[error("unknown medicine: {0}")]
    UnknownMedicine(String),

    /// Eligible batches cannot cover the requested quantity.
    ///
    /// Allocation is all-or-nothing per line: a shortfall fails the whole
    /// line and `available` reports the sum over every eligible batch
    /// (0 when the medicine has no eligible batch at all).
    ///
    /// ## User Workflow
    /// ```text
    /// Request (medicine M, qty 12)
    ///      │
    ///      ▼
    /// Eligible batches hold 7 units total
    ///      │
    ///      ▼
    /// InsufficientStock { medicine: M, requested: 12, available: 7 }
    ///      │
    ///      ▼
    /// Caller adjusts the quantity and resubmits
    /// ```
    #[error("insufficient stock for {medicine}: available {available}, requested {requested}")]
    InsufficientStock {
        medicine: String,
        requested: i64,
        available: i64,
    },

    /// A batch was consumed by another sale between planning and deduction.
    ///
    /// The whole unit of work was rolled back; nothing was deducted.
    /// The engine performs no automatic retry - the caller must resubmit.
    #[error("stock changed concurrently for batch {batch_id}; sale aborted")]
    ConcurrentStockChange { batch_id: String },

    /// Sale not found.
    #[error("sale not found: {0}")]
    SaleNotFound(String),

    /// The sale's cancellation flag was already set.
    ///
    /// Cancellation is idempotent-rejecting: calling it twice is an error,
    /// not a no-op, and stock is never restored twice.
    #[error("sale {0} is already cancelled")]
    AlreadyCancelled(String),

    /// Validation error (wraps ValidationError).
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, invalid code).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

//! # medipos-core: Pure Business Logic for MediPOS
//!
//! This crate is the **heart** of the MediPOS pharmacy engine. It contains
//! all business logic as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       MediPOS Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  Callers (API layer, CLI)                       │   │
//! │  │    create_sale, cancel_sale, get_sale, catalog queries          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    medipos-db                                   │   │
//! │  │    SaleService (coordinator), BatchRepository (ledger),         │   │
//! │  │    MedicineRepository, AuditSink                                │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ medipos-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌────────────┐  ┌───────────┐ │   │
//! │  │   │   types   │  │   money   │  │ allocation │  │ validation│ │   │
//! │  │   │ Medicine  │  │   Money   │  │    FEFO    │  │   rules   │ │   │
//! │  │   │ Batch     │  │  (cents)  │  │  allocator │  │   checks  │ │   │
//! │  │   │ Sale      │  └───────────┘  └────────────┘  └───────────┘ │   │
//! │  │   └───────────┘                                                │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Rules
//! 1. **No I/O**: no database, network, filesystem, or clock access.
//!    Dates are always passed in by the caller.
//! 2. **All money is integer cents** through the [`Money`] newtype.
//! 3. **Allocation is planning only**: the allocator returns a plan;
//!    applying it transactionally is medipos-db's job.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod allocation;
pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports
// =============================================================================

pub use allocation::{allocate, Allocation, AllocationPlan};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Constants
// =============================================================================

/// Maximum number of lines a single sale request may carry.
pub const MAX_SALE_LINES: usize = 100;

/// Maximum quantity for a single sale line.
///
/// A guard against typos ("5000" instead of "5"), not a business rule.
pub const MAX_LINE_QUANTITY: i64 = 10_000;

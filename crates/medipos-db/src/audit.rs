//! # Audit Sink
//!
//! Fire-and-forget notifications about committed sale operations.
//!
//! ## Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Audit Sink Contract                                │
//! │                                                                         │
//! │  SaleService                          Audit consumer (external)        │
//! │       │                                      ▲                          │
//! │       │  commit succeeds                     │                          │
//! │       ▼                                      │                          │
//! │  sink.notify(event) ──► unbounded mpsc ──────┘                          │
//! │       │                                                                 │
//! │       └── send failed? log at WARN and move on.                        │
//! │           The sale is already committed; audit trouble NEVER           │
//! │           fails or rolls back a sale.                                  │
//! │                                                                         │
//! │  Events fire once per sale operation (create/cancel), not per batch.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Storage of the audit trail is the consumer's concern; this module only
//! defines the event shape and the non-blocking delivery channel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::warn;

// =============================================================================
// Audit Event
// =============================================================================

/// What happened to a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// A sale was created and committed.
    Create,
    /// A committed sale was cancelled and its stock restored.
    Cancel,
}

/// A post-commit notification of a sale operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Who performed the operation (seller on create, canceller on cancel).
    pub actor_id: String,
    /// What happened.
    pub action: AuditAction,
    /// Entity type; always "Sale" for events emitted by the sale engine.
    pub entity_type: String,
    /// The sale id.
    pub entity_id: String,
    /// The sale's total amount in cents at commit time.
    pub total_cents: i64,
    /// When the operation committed.
    pub occurred_at: DateTime<Utc>,
}

impl AuditEvent {
    /// Event for a committed sale creation.
    pub fn sale_created(actor_id: &str, sale_id: &str, total_cents: i64) -> Self {
        AuditEvent {
            actor_id: actor_id.to_string(),
            action: AuditAction::Create,
            entity_type: "Sale".to_string(),
            entity_id: sale_id.to_string(),
            total_cents,
            occurred_at: Utc::now(),
        }
    }

    /// Event for a committed sale cancellation.
    pub fn sale_cancelled(actor_id: &str, sale_id: &str, total_cents: i64) -> Self {
        AuditEvent {
            actor_id: actor_id.to_string(),
            action: AuditAction::Cancel,
            entity_type: "Sale".to_string(),
            entity_id: sale_id.to_string(),
            total_cents,
            occurred_at: Utc::now(),
        }
    }
}

// =============================================================================
// Audit Sink
// =============================================================================

/// Best-effort, non-blocking delivery of audit events.
///
/// Cloneable; every clone feeds the same receiver. `notify` never blocks
/// and never fails from the caller's point of view - a dropped receiver
/// is logged and swallowed.
#[derive(Debug, Clone)]
pub struct AuditSink {
    tx: Option<mpsc::UnboundedSender<AuditEvent>>,
}

impl AuditSink {
    /// Creates a sink and the receiver its events arrive on.
    ///
    /// The receiver side is owned by whatever consumes the audit trail
    /// (and by tests asserting on emitted events).
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<AuditEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (AuditSink { tx: Some(tx) }, rx)
    }

    /// Creates a sink that silently drops every event.
    pub fn disabled() -> Self {
        AuditSink { tx: None }
    }

    /// Delivers an event, best-effort.
    ///
    /// A closed channel (consumer gone) is logged at WARN and otherwise
    /// ignored - the committed sale is unaffected.
    pub fn notify(&self, event: AuditEvent) {
        let Some(tx) = &self.tx else {
            return;
        };

        if tx.send(event).is_err() {
            warn!("audit sink receiver dropped; event discarded");
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_delivers_events() {
        let (sink, mut rx) = AuditSink::channel();

        sink.notify(AuditEvent::sale_created("seller-1", "sale-1", 1234));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.action, AuditAction::Create);
        assert_eq!(event.entity_id, "sale-1");
        assert_eq!(event.total_cents, 1234);
        assert_eq!(event.entity_type, "Sale");
    }

    #[tokio::test]
    async fn test_notify_survives_dropped_receiver() {
        let (sink, rx) = AuditSink::channel();
        drop(rx);

        // Must not panic or error - failures here never surface
        sink.notify(AuditEvent::sale_cancelled("admin-1", "sale-1", 1234));
    }

    #[test]
    fn test_disabled_sink_drops_events() {
        let sink = AuditSink::disabled();
        sink.notify(AuditEvent::sale_created("seller-1", "sale-1", 0));
    }
}

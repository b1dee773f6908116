//! Lease delinquency, reminder, dispute, and commission policy components.
//!
//! Each component is a short-lived, stateless evaluator composed over the
//! storage and delivery traits in [`repository`]; the schedulers take their
//! evaluation date explicitly so behavior is deterministic under test.

pub mod commission;
pub mod delinquency;
pub mod dispatch;
pub mod disputes;
pub mod domain;
pub mod ghost;
pub mod memory;
pub mod reminders;
pub mod repository;
pub mod router;

#[cfg(test)]
mod tests;

/// A scan run failed before any lease was processed (the initial query
/// itself). Per-lease failures never surface here; they are counted into the
/// run summary instead.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub use commission::{CommissionBreakdown, CommissionError, CommissionOutcome, CommissionSettlement};
pub use delinquency::{DelinquencyDetail, DelinquencyScanner, DelinquencySummary};
pub use dispatch::{Delivery, DeliveryReport, NotificationDispatcher};
pub use disputes::{DisputeCreated, DisputeError, DisputeIntake, DisputeLifecycle};
pub use domain::{
    AgencyId, AgentId, Caller, CommissionStatus, CommissionTransaction, DelayRecordSource, Dispute,
    DisputeCategory, DisputeId, DisputeMessage, DisputePriority, DisputeStatus, Lease, LeaseId,
    LeaseStatus, Notification, NotificationKind, PaymentDelayRecord, PropertyId, ReminderChannel,
    ReminderKind, ReminderLog, ResolutionType, RiskLevel, SenderRole, Severity, UserId, UserRole,
};
pub use ghost::{GhostDetail, GhostSummary, GhostTenantDetector};
pub use reminders::{ReminderCounts, ReminderScheduler, ReminderSummary};
pub use repository::{
    ActivityEntry, ActivityLog, AuthError, AuthVerifier, CommissionLedger, DelinquencyLedger,
    DeliveryError, DisputeDraft, DisputeStore, DisputeTransition, LeaseStore, LedgerInsert,
    MandateRegistry, MediationRoster, NotificationStore, OwnerSettings, PaymentLedger,
    ReminderLedger, RoleDirectory, SmsGateway, StoreError,
};
pub use router::{commission_router, dispute_router, scan_router, DisputeRoutes};

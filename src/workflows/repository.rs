use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};

use super::domain::{
    AgentId, Caller, CommissionTransaction, Dispute, DisputeCategory, DisputeId, DisputeMessage,
    DisputePriority, DisputeStatus, Lease, LeaseId, Notification, PaymentDelayRecord, PropertyId,
    ReminderLog, ResolutionType, UserId,
};

/// Error enumeration for backing-store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("concurrent update detected")]
    Conflict,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Outbound delivery failure; counted by callers, never fatal for a batch.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("delivery timed out")]
    Timeout,
    #[error("delivery transport failed: {0}")]
    Transport(String),
}

/// Token verification failure; the router maps this to 401.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing or invalid credentials")]
    InvalidToken,
}

/// Lease reads plus the two targeted column updates the scanners perform.
///
/// `mark_legal_action` and `mark_ghost` write disjoint fields so the
/// delinquency scanner and ghost detector can touch the same lease on the
/// same day without a read-modify-write race.
pub trait LeaseStore: Send + Sync {
    fn fetch(&self, id: &LeaseId) -> Result<Option<Lease>, StoreError>;
    fn active(&self) -> Result<Vec<Lease>, StoreError>;
    /// Active leases whose next due date is strictly before `date`.
    fn overdue_as_of(&self, date: NaiveDate) -> Result<Vec<Lease>, StoreError>;
    fn mark_legal_action(&self, id: &LeaseId, at: DateTime<Utc>) -> Result<(), StoreError>;
    fn mark_ghost(&self, id: &LeaseId) -> Result<(), StoreError>;
}

/// Result of an idempotent history insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerInsert {
    Recorded,
    AlreadyRecorded,
}

/// Payment-delay history. `record_once` relies on a uniqueness constraint on
/// (lease, days_late) for scanner rows and reports a duplicate as
/// `AlreadyRecorded` rather than an error; `record` appends unconditionally
/// (ghost-detection rows are distinct by design).
pub trait DelinquencyLedger: Send + Sync {
    fn record_once(&self, record: PaymentDelayRecord) -> Result<LedgerInsert, StoreError>;
    fn record(&self, record: PaymentDelayRecord) -> Result<(), StoreError>;
}

/// Reminder audit trail, also the source of the ghost detector's
/// unopened-reminder count.
pub trait ReminderLedger: Send + Sync {
    fn append(&self, log: ReminderLog) -> Result<(), StoreError>;
    /// Whether any reminder already went out for this lease on `date`.
    fn sent_on(&self, lease: &LeaseId, date: NaiveDate) -> Result<bool, StoreError>;
    fn unopened_count(&self, tenant: &UserId, lease: &LeaseId) -> Result<u32, StoreError>;
}

/// Read-side view of recorded rent payments.
pub trait PaymentLedger: Send + Sync {
    /// Whether a successful payment exists for the lease in the given month.
    fn payment_recorded(&self, lease: &LeaseId, year: i32, month: u32) -> Result<bool, StoreError>;
}

/// In-app notification inbox.
pub trait NotificationStore: Send + Sync {
    fn insert(&self, notification: Notification) -> Result<(), StoreError>;
    fn unread_count_since(&self, user: &UserId, cutoff: DateTime<Utc>)
        -> Result<u32, StoreError>;
}

/// Best-effort SMS/WhatsApp transport. Implementations bound each call and
/// report the outcome as a [`DeliveryError`]; callers treat any failure as
/// non-fatal.
pub trait SmsGateway: Send + Sync {
    fn send(&self, recipient: &UserId, body: &str) -> Result<(), DeliveryError>;
}

/// Payload for creating a dispute; the store assigns the id and case number.
#[derive(Debug, Clone, PartialEq)]
pub struct DisputeDraft {
    pub complainant: UserId,
    pub respondent: UserId,
    pub property: Option<PropertyId>,
    pub contract: Option<LeaseId>,
    pub intervention: Option<String>,
    pub category: DisputeCategory,
    pub subject: String,
    pub description: String,
    pub evidence: Vec<String>,
    pub priority: DisputePriority,
}

/// Field changes applied by a status transition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisputeTransition {
    pub priority: Option<DisputePriority>,
    pub escalated_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolution: Option<String>,
    pub resolution_type: Option<ResolutionType>,
}

/// Dispute persistence. `transition` is a conditional update: the write only
/// lands when the stored status still equals `expected`, otherwise
/// [`StoreError::Conflict`] is returned and the caller must re-fetch.
pub trait DisputeStore: Send + Sync {
    fn create(&self, draft: DisputeDraft) -> Result<Dispute, StoreError>;
    fn fetch(&self, id: &DisputeId) -> Result<Option<Dispute>, StoreError>;
    fn assign_agent(&self, id: &DisputeId, agent: &AgentId) -> Result<(), StoreError>;
    fn transition(
        &self,
        id: &DisputeId,
        expected: DisputeStatus,
        next: DisputeStatus,
        change: DisputeTransition,
    ) -> Result<Dispute, StoreError>;
    fn append_message(&self, message: DisputeMessage) -> Result<(), StoreError>;
}

/// Opaque mediator auto-assignment rule ("assign_dispute_to_agent").
pub trait MediationRoster: Send + Sync {
    fn assign(&self, dispute: &DisputeId) -> Result<Option<AgentId>, StoreError>;
}

/// Role lookups for dispute fan-out.
pub trait RoleDirectory: Send + Sync {
    fn administrators(&self) -> Result<Vec<UserId>, StoreError>;
}

/// Per-owner settings consulted by the legal-escalation rule.
pub trait OwnerSettings: Send + Sync {
    /// Days late at which this owner wants legal action auto-engaged.
    fn auto_engage_threshold_days(&self, owner: &UserId) -> Result<Option<u32>, StoreError>;
}

/// Mandate and agent commission terms; absent values fall back to the
/// platform defaults rather than failing.
pub trait MandateRegistry: Send + Sync {
    fn commission_rate_percent(&self, property: &PropertyId) -> Result<Option<u32>, StoreError>;
    fn agent_split_percent(&self, agent: &AgentId) -> Result<Option<u32>, StoreError>;
}

/// Commission transaction persistence.
pub trait CommissionLedger: Send + Sync {
    fn record(&self, transaction: CommissionTransaction) -> Result<(), StoreError>;
}

/// Append-only platform activity log.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityEntry {
    pub actor: Option<UserId>,
    pub action: String,
    pub details: BTreeMap<String, String>,
    pub at: DateTime<Utc>,
}

pub trait ActivityLog: Send + Sync {
    fn append(&self, entry: ActivityEntry) -> Result<(), StoreError>;
}

/// Opaque bearer-token verifier; session issuance lives in the platform's
/// auth layer, the engine only consumes the resolved identity.
pub trait AuthVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<Caller, AuthError>;
}

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::config::PolicyConfig;

/// Identifier wrapper for lease contracts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeaseId(pub String);

/// Identifier wrapper for platform users (tenants, owners, mediators).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Identifier wrapper for listed properties.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyId(pub String);

/// Identifier wrapper for disputes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DisputeId(pub String);

/// Identifier wrapper for agencies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgencyId(pub String);

/// Identifier wrapper for agency agents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId(pub String);

/// Lifecycle of a lease contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaseStatus {
    Draft,
    Active,
    Terminated,
}

impl LeaseStatus {
    pub const fn label(self) -> &'static str {
        match self {
            LeaseStatus::Draft => "draft",
            LeaseStatus::Active => "active",
            LeaseStatus::Terminated => "terminated",
        }
    }
}

/// A tenancy agreement as stored by the marketplace.
///
/// Per-lease policy fields are optional; effective values fall back to
/// [`PolicyConfig`] through the accessor methods so callers never read a raw
/// `Option` when computing penalties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lease {
    pub id: LeaseId,
    pub tenant: UserId,
    pub owner: UserId,
    pub property: PropertyId,
    /// Monthly rent in FCFA.
    pub monthly_rent: u64,
    /// Next rent payment due date; only advances when a payment is recorded.
    pub next_due_date: NaiveDate,
    /// Day of month rent falls due.
    pub payment_day: Option<u32>,
    /// Penalty accrued per late day, percent of rent.
    pub penalty_rate_percent: Option<u32>,
    /// Ceiling on the accumulated penalty, percent of rent.
    pub penalty_cap_percent: Option<u32>,
    pub grace_period_days: Option<u32>,
    pub legal_action_started: bool,
    pub legal_action_at: Option<DateTime<Utc>>,
    pub ghost_tenant_detected: bool,
    pub status: LeaseStatus,
}

impl Lease {
    pub fn penalty_rate(&self, policy: &PolicyConfig) -> u32 {
        self.penalty_rate_percent
            .unwrap_or(policy.penalty_rate_percent)
    }

    pub fn penalty_cap(&self, policy: &PolicyConfig) -> u32 {
        self.penalty_cap_percent
            .unwrap_or(policy.penalty_cap_percent)
    }

    pub fn grace_period(&self, policy: &PolicyConfig) -> u32 {
        self.grace_period_days.unwrap_or(policy.grace_period_days)
    }

    pub fn payment_day(&self, policy: &PolicyConfig) -> u32 {
        self.payment_day.unwrap_or(policy.default_payment_day)
    }

    /// Whole days elapsed past the due date, zero when not yet due.
    pub fn days_late(&self, today: NaiveDate) -> u32 {
        let elapsed = today.signed_duration_since(self.next_due_date).num_days();
        u32::try_from(elapsed).unwrap_or(0)
    }
}

/// Severity bucket recorded on payment-delay history rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub const fn label(self) -> &'static str {
        match self {
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }

    /// Classification used by the delinquency scanner.
    pub fn from_days_late(days_late: u32) -> Self {
        if days_late >= 15 {
            RiskLevel::Critical
        } else if days_late >= 10 {
            RiskLevel::High
        } else {
            RiskLevel::Medium
        }
    }
}

/// Which component produced a payment-delay history row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelayRecordSource {
    DelinquencyScan,
    GhostDetection,
}

impl DelayRecordSource {
    pub const fn label(self) -> &'static str {
        match self {
            DelayRecordSource::DelinquencyScan => "delinquency_scan",
            DelayRecordSource::GhostDetection => "ghost_detection",
        }
    }
}

/// Immutable history entry for one lateness milestone of a lease.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentDelayRecord {
    pub lease: LeaseId,
    pub tenant: UserId,
    pub property: PropertyId,
    pub days_late: u32,
    /// Rent owed for the delinquent month, FCFA.
    pub amount_due: u64,
    /// Penalty applied for this milestone, FCFA.
    pub penalty_applied: u64,
    pub risk: RiskLevel,
    pub source: DelayRecordSource,
    pub recorded_at: DateTime<Utc>,
}

/// Notification severity, mirrored into the recipient's inbox styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub const fn label(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

/// Engine-side notification categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    PaymentReminder,
    LatePenalty,
    LegalAction,
    GhostTenant,
    Dispute,
    Commission,
}

impl NotificationKind {
    pub const fn label(self) -> &'static str {
        match self {
            NotificationKind::PaymentReminder => "payment_reminder",
            NotificationKind::LatePenalty => "late_penalty",
            NotificationKind::LegalAction => "legal_action",
            NotificationKind::GhostTenant => "ghost_tenant",
            NotificationKind::Dispute => "dispute",
            NotificationKind::Commission => "commission",
        }
    }
}

/// In-app notification row. Append-only from the engine's perspective; the
/// read flag is flipped by the recipient elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient: UserId,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub severity: Severity,
    pub action_link: Option<String>,
    pub metadata: BTreeMap<String, String>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Graduated reminder stages relative to the payment day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderKind {
    Upcoming,
    DueToday,
    Overdue,
}

impl ReminderKind {
    pub const fn label(self) -> &'static str {
        match self {
            ReminderKind::Upcoming => "upcoming",
            ReminderKind::DueToday => "due_today",
            ReminderKind::Overdue => "overdue",
        }
    }
}

/// Delivery channel recorded on the reminder audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderChannel {
    Sms,
    InApp,
}

impl ReminderChannel {
    pub const fn label(self) -> &'static str {
        match self {
            ReminderChannel::Sms => "sms",
            ReminderChannel::InApp => "in_app",
        }
    }
}

/// Audit row for one reminder send. `opened_at` stays `None` until the tenant
/// opens the message; the ghost detector counts those.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderLog {
    pub lease: LeaseId,
    pub tenant: UserId,
    pub kind: ReminderKind,
    pub channel: ReminderChannel,
    pub message: String,
    pub sent_at: DateTime<Utc>,
    pub opened_at: Option<DateTime<Utc>>,
}

/// Dispute lifecycle states with the only lawful transitions being
/// open→escalated, open→resolved, and escalated→resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeStatus {
    Open,
    Escalated,
    Resolved,
}

impl DisputeStatus {
    pub const fn label(self) -> &'static str {
        match self {
            DisputeStatus::Open => "open",
            DisputeStatus::Escalated => "escalated",
            DisputeStatus::Resolved => "resolved",
        }
    }

    /// Transition table; anything not listed here is rejected.
    pub fn can_transition_to(self, next: DisputeStatus) -> bool {
        matches!(
            (self, next),
            (DisputeStatus::Open, DisputeStatus::Escalated)
                | (DisputeStatus::Open, DisputeStatus::Resolved)
                | (DisputeStatus::Escalated, DisputeStatus::Resolved)
        )
    }
}

/// Dispute categories offered to complainants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeCategory {
    Payment,
    Deposit,
    Damages,
    LeaseViolation,
    Maintenance,
    Noise,
    Other,
}

impl DisputeCategory {
    pub const fn label(self) -> &'static str {
        match self {
            DisputeCategory::Payment => "payment",
            DisputeCategory::Deposit => "deposit",
            DisputeCategory::Damages => "damages",
            DisputeCategory::LeaseViolation => "lease_violation",
            DisputeCategory::Maintenance => "maintenance",
            DisputeCategory::Noise => "noise",
            DisputeCategory::Other => "other",
        }
    }

    /// Fixed category→priority table applied at creation.
    pub const fn default_priority(self) -> DisputePriority {
        match self {
            DisputeCategory::Payment
            | DisputeCategory::Deposit
            | DisputeCategory::Damages
            | DisputeCategory::LeaseViolation => DisputePriority::High,
            DisputeCategory::Maintenance | DisputeCategory::Other => DisputePriority::Normal,
            DisputeCategory::Noise => DisputePriority::Low,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputePriority {
    Low,
    Normal,
    High,
    Urgent,
}

impl DisputePriority {
    pub const fn label(self) -> &'static str {
        match self {
            DisputePriority::Low => "low",
            DisputePriority::Normal => "normal",
            DisputePriority::High => "high",
            DisputePriority::Urgent => "urgent",
        }
    }
}

/// How a mediator closed a dispute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionType {
    FavorComplainant,
    FavorRespondent,
    Compromise,
    Withdrawn,
}

impl ResolutionType {
    pub const fn label(self) -> &'static str {
        match self {
            ResolutionType::FavorComplainant => "favor_complainant",
            ResolutionType::FavorRespondent => "favor_respondent",
            ResolutionType::Compromise => "compromise",
            ResolutionType::Withdrawn => "withdrawn",
        }
    }
}

/// A mediation case between two marketplace users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dispute {
    pub id: DisputeId,
    /// Human-readable case number, e.g. `LIT-2026-0042`.
    pub number: String,
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
    pub status: DisputeStatus,
    pub assigned_agent: Option<AgentId>,
    pub resolution: Option<String>,
    pub resolution_type: Option<ResolutionType>,
    pub escalated_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Author role on a dispute message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderRole {
    Complainant,
    Respondent,
    Mediator,
    System,
}

/// Append-only audit entry on a dispute thread. Internal messages are only
/// visible to mediators and administrators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisputeMessage {
    pub dispute: DisputeId,
    pub sender: Option<UserId>,
    pub role: SenderRole,
    pub body: String,
    pub internal: bool,
    pub sent_at: DateTime<Utc>,
}

/// Settlement state of a commission transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommissionStatus {
    Pending,
    Paid,
}

/// Revenue split derived from one lease signature event.
/// Invariant: `agent_share + agency_share == gross_amount`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionTransaction {
    pub agency: AgencyId,
    pub agent: AgentId,
    pub property: PropertyId,
    pub lease: LeaseId,
    pub kind: String,
    pub gross_amount: u64,
    pub agency_share: u64,
    pub agent_share: u64,
    pub status: CommissionStatus,
    pub transaction_date: NaiveDate,
}

/// Platform roles consulted by the dispute permission rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Tenant,
    Owner,
    Agent,
    TrustAgent,
    Administrator,
}

/// Authenticated caller identity resolved from a bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user: UserId,
    pub role: UserRole,
}

//! In-memory reference implementations of the storage and collaborator
//! traits. The demo CLI and the test suites wire the engine against these;
//! production deployments substitute adapters over the platform's managed
//! store.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Datelike, NaiveDate, Utc};

use super::domain::{
    AgentId, Caller, CommissionTransaction, Dispute, DisputeId, DisputeMessage, DisputeStatus,
    Lease, LeaseId, LeaseStatus, Notification, PaymentDelayRecord, PropertyId, ReminderLog, UserId,
};
use super::repository::{
    ActivityEntry, ActivityLog, AuthError, AuthVerifier, CommissionLedger, DelinquencyLedger,
    DeliveryError, DisputeDraft, DisputeStore, DisputeTransition, LeaseStore, LedgerInsert,
    MandateRegistry, MediationRoster, NotificationStore, OwnerSettings, PaymentLedger,
    ReminderLedger, RoleDirectory, SmsGateway, StoreError,
};

#[derive(Default, Clone)]
pub struct MemoryLeaseStore {
    leases: Arc<Mutex<HashMap<LeaseId, Lease>>>,
}

impl MemoryLeaseStore {
    pub fn put(&self, lease: Lease) {
        let mut guard = self.leases.lock().expect("lease mutex poisoned");
        guard.insert(lease.id.clone(), lease);
    }

    pub fn get(&self, id: &LeaseId) -> Option<Lease> {
        let guard = self.leases.lock().expect("lease mutex poisoned");
        guard.get(id).cloned()
    }
}

impl LeaseStore for MemoryLeaseStore {
    fn fetch(&self, id: &LeaseId) -> Result<Option<Lease>, StoreError> {
        let guard = self.leases.lock().expect("lease mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn active(&self) -> Result<Vec<Lease>, StoreError> {
        let guard = self.leases.lock().expect("lease mutex poisoned");
        Ok(guard
            .values()
            .filter(|lease| lease.status == LeaseStatus::Active)
            .cloned()
            .collect())
    }

    fn overdue_as_of(&self, date: NaiveDate) -> Result<Vec<Lease>, StoreError> {
        let guard = self.leases.lock().expect("lease mutex poisoned");
        Ok(guard
            .values()
            .filter(|lease| lease.status == LeaseStatus::Active && lease.next_due_date < date)
            .cloned()
            .collect())
    }

    fn mark_legal_action(&self, id: &LeaseId, at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut guard = self.leases.lock().expect("lease mutex poisoned");
        let lease = guard.get_mut(id).ok_or(StoreError::NotFound)?;
        lease.legal_action_started = true;
        lease.legal_action_at = Some(at);
        Ok(())
    }

    fn mark_ghost(&self, id: &LeaseId) -> Result<(), StoreError> {
        let mut guard = self.leases.lock().expect("lease mutex poisoned");
        let lease = guard.get_mut(id).ok_or(StoreError::NotFound)?;
        lease.ghost_tenant_detected = true;
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct MemoryDelinquencyLedger {
    records: Arc<Mutex<Vec<PaymentDelayRecord>>>,
    scan_keys: Arc<Mutex<HashSet<(String, u32)>>>,
}

impl MemoryDelinquencyLedger {
    pub fn records(&self) -> Vec<PaymentDelayRecord> {
        self.records.lock().expect("ledger mutex poisoned").clone()
    }
}

impl DelinquencyLedger for MemoryDelinquencyLedger {
    fn record_once(&self, record: PaymentDelayRecord) -> Result<LedgerInsert, StoreError> {
        let key = (record.lease.0.clone(), record.days_late);
        let mut keys = self.scan_keys.lock().expect("ledger mutex poisoned");
        if !keys.insert(key) {
            return Ok(LedgerInsert::AlreadyRecorded);
        }
        self.records
            .lock()
            .expect("ledger mutex poisoned")
            .push(record);
        Ok(LedgerInsert::Recorded)
    }

    fn record(&self, record: PaymentDelayRecord) -> Result<(), StoreError> {
        self.records
            .lock()
            .expect("ledger mutex poisoned")
            .push(record);
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct MemoryReminderLedger {
    logs: Arc<Mutex<Vec<ReminderLog>>>,
}

impl MemoryReminderLedger {
    pub fn logs(&self) -> Vec<ReminderLog> {
        self.logs.lock().expect("reminder mutex poisoned").clone()
    }
}

impl ReminderLedger for MemoryReminderLedger {
    fn append(&self, log: ReminderLog) -> Result<(), StoreError> {
        self.logs.lock().expect("reminder mutex poisoned").push(log);
        Ok(())
    }

    fn sent_on(&self, lease: &LeaseId, date: NaiveDate) -> Result<bool, StoreError> {
        let guard = self.logs.lock().expect("reminder mutex poisoned");
        Ok(guard
            .iter()
            .any(|log| &log.lease == lease && log.sent_at.date_naive() == date))
    }

    fn unopened_count(&self, tenant: &UserId, lease: &LeaseId) -> Result<u32, StoreError> {
        let guard = self.logs.lock().expect("reminder mutex poisoned");
        let count = guard
            .iter()
            .filter(|log| &log.tenant == tenant && &log.lease == lease && log.opened_at.is_none())
            .count();
        Ok(count as u32)
    }
}

#[derive(Default, Clone)]
pub struct MemoryPaymentLedger {
    payments: Arc<Mutex<HashSet<(String, i32, u32)>>>,
}

impl MemoryPaymentLedger {
    pub fn record_payment(&self, lease: &LeaseId, date: NaiveDate) {
        self.payments
            .lock()
            .expect("payment mutex poisoned")
            .insert((lease.0.clone(), date.year(), date.month()));
    }
}

impl PaymentLedger for MemoryPaymentLedger {
    fn payment_recorded(&self, lease: &LeaseId, year: i32, month: u32) -> Result<bool, StoreError> {
        let guard = self.payments.lock().expect("payment mutex poisoned");
        Ok(guard.contains(&(lease.0.clone(), year, month)))
    }
}

#[derive(Default, Clone)]
pub struct MemoryNotificationStore {
    notifications: Arc<Mutex<Vec<Notification>>>,
}

impl MemoryNotificationStore {
    pub fn all(&self) -> Vec<Notification> {
        self.notifications
            .lock()
            .expect("notification mutex poisoned")
            .clone()
    }

    pub fn for_recipient(&self, user: &UserId) -> Vec<Notification> {
        self.all()
            .into_iter()
            .filter(|notification| &notification.recipient == user)
            .collect()
    }
}

impl NotificationStore for MemoryNotificationStore {
    fn insert(&self, notification: Notification) -> Result<(), StoreError> {
        self.notifications
            .lock()
            .expect("notification mutex poisoned")
            .push(notification);
        Ok(())
    }

    fn unread_count_since(
        &self,
        user: &UserId,
        cutoff: DateTime<Utc>,
    ) -> Result<u32, StoreError> {
        let guard = self
            .notifications
            .lock()
            .expect("notification mutex poisoned");
        let count = guard
            .iter()
            .filter(|notification| {
                &notification.recipient == user
                    && !notification.read
                    && notification.created_at >= cutoff
            })
            .count();
        Ok(count as u32)
    }
}

/// SMS transport double; flip `failing` to simulate an unreachable provider.
#[derive(Default)]
pub struct MemorySmsGateway {
    sent: Mutex<Vec<(UserId, String)>>,
    failing: AtomicBool,
}

impl MemorySmsGateway {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    pub fn sent(&self) -> Vec<(UserId, String)> {
        self.sent.lock().expect("sms mutex poisoned").clone()
    }
}

impl SmsGateway for MemorySmsGateway {
    fn send(&self, recipient: &UserId, body: &str) -> Result<(), DeliveryError> {
        if self.failing.load(Ordering::Relaxed) {
            return Err(DeliveryError::Transport("provider unreachable".to_string()));
        }
        self.sent
            .lock()
            .expect("sms mutex poisoned")
            .push((recipient.clone(), body.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryDisputeStore {
    disputes: Arc<Mutex<HashMap<DisputeId, Dispute>>>,
    messages: Arc<Mutex<Vec<DisputeMessage>>>,
    sequence: AtomicU64,
}

impl MemoryDisputeStore {
    pub fn messages_for(&self, dispute: &DisputeId) -> Vec<DisputeMessage> {
        self.messages
            .lock()
            .expect("dispute mutex poisoned")
            .iter()
            .filter(|message| &message.dispute == dispute)
            .cloned()
            .collect()
    }
}

impl DisputeStore for MemoryDisputeStore {
    fn create(&self, draft: DisputeDraft) -> Result<Dispute, StoreError> {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let now = Utc::now();
        let dispute = Dispute {
            id: DisputeId(format!("dsp-{sequence:06}")),
            number: format!("LIT-{}-{sequence:04}", now.year()),
            complainant: draft.complainant,
            respondent: draft.respondent,
            property: draft.property,
            contract: draft.contract,
            intervention: draft.intervention,
            category: draft.category,
            subject: draft.subject,
            description: draft.description,
            evidence: draft.evidence,
            priority: draft.priority,
            status: DisputeStatus::Open,
            assigned_agent: None,
            resolution: None,
            resolution_type: None,
            escalated_at: None,
            resolved_at: None,
            created_at: now,
        };
        self.disputes
            .lock()
            .expect("dispute mutex poisoned")
            .insert(dispute.id.clone(), dispute.clone());
        Ok(dispute)
    }

    fn fetch(&self, id: &DisputeId) -> Result<Option<Dispute>, StoreError> {
        let guard = self.disputes.lock().expect("dispute mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn assign_agent(&self, id: &DisputeId, agent: &AgentId) -> Result<(), StoreError> {
        let mut guard = self.disputes.lock().expect("dispute mutex poisoned");
        let dispute = guard.get_mut(id).ok_or(StoreError::NotFound)?;
        dispute.assigned_agent = Some(agent.clone());
        Ok(())
    }

    fn transition(
        &self,
        id: &DisputeId,
        expected: DisputeStatus,
        next: DisputeStatus,
        change: DisputeTransition,
    ) -> Result<Dispute, StoreError> {
        let mut guard = self.disputes.lock().expect("dispute mutex poisoned");
        let dispute = guard.get_mut(id).ok_or(StoreError::NotFound)?;
        // Conditional update: the write only lands when the stored status
        // still matches what the caller read.
        if dispute.status != expected {
            return Err(StoreError::Conflict);
        }
        dispute.status = next;
        if let Some(priority) = change.priority {
            dispute.priority = priority;
        }
        if change.escalated_at.is_some() {
            dispute.escalated_at = change.escalated_at;
        }
        if change.resolved_at.is_some() {
            dispute.resolved_at = change.resolved_at;
        }
        if change.resolution.is_some() {
            dispute.resolution = change.resolution;
        }
        if change.resolution_type.is_some() {
            dispute.resolution_type = change.resolution_type;
        }
        Ok(dispute.clone())
    }

    fn append_message(&self, message: DisputeMessage) -> Result<(), StoreError> {
        self.messages
            .lock()
            .expect("dispute mutex poisoned")
            .push(message);
        Ok(())
    }
}

/// Fixed-answer assignment rule standing in for the platform's
/// `assign_dispute_to_agent` routine.
#[derive(Default, Clone)]
pub struct MemoryMediationRoster {
    agent: Option<AgentId>,
}

impl MemoryMediationRoster {
    pub fn with_agent(agent: AgentId) -> Self {
        Self { agent: Some(agent) }
    }
}

impl MediationRoster for MemoryMediationRoster {
    fn assign(&self, _dispute: &DisputeId) -> Result<Option<AgentId>, StoreError> {
        Ok(self.agent.clone())
    }
}

#[derive(Default, Clone)]
pub struct MemoryRoleDirectory {
    admins: Arc<Mutex<Vec<UserId>>>,
}

impl MemoryRoleDirectory {
    pub fn add_administrator(&self, user: UserId) {
        self.admins
            .lock()
            .expect("directory mutex poisoned")
            .push(user);
    }
}

impl RoleDirectory for MemoryRoleDirectory {
    fn administrators(&self) -> Result<Vec<UserId>, StoreError> {
        Ok(self
            .admins
            .lock()
            .expect("directory mutex poisoned")
            .clone())
    }
}

#[derive(Default, Clone)]
pub struct MemoryOwnerSettings {
    thresholds: Arc<Mutex<HashMap<UserId, u32>>>,
}

impl MemoryOwnerSettings {
    pub fn set_threshold(&self, owner: UserId, days: u32) {
        self.thresholds
            .lock()
            .expect("settings mutex poisoned")
            .insert(owner, days);
    }
}

impl OwnerSettings for MemoryOwnerSettings {
    fn auto_engage_threshold_days(&self, owner: &UserId) -> Result<Option<u32>, StoreError> {
        let guard = self.thresholds.lock().expect("settings mutex poisoned");
        Ok(guard.get(owner).copied())
    }
}

#[derive(Default, Clone)]
pub struct MemoryMandateRegistry {
    rates: Arc<Mutex<HashMap<PropertyId, u32>>>,
    splits: Arc<Mutex<HashMap<AgentId, u32>>>,
}

impl MemoryMandateRegistry {
    pub fn set_commission_rate(&self, property: PropertyId, percent: u32) {
        self.rates
            .lock()
            .expect("mandate mutex poisoned")
            .insert(property, percent);
    }

    pub fn set_agent_split(&self, agent: AgentId, percent: u32) {
        self.splits
            .lock()
            .expect("mandate mutex poisoned")
            .insert(agent, percent);
    }
}

impl MandateRegistry for MemoryMandateRegistry {
    fn commission_rate_percent(&self, property: &PropertyId) -> Result<Option<u32>, StoreError> {
        let guard = self.rates.lock().expect("mandate mutex poisoned");
        Ok(guard.get(property).copied())
    }

    fn agent_split_percent(&self, agent: &AgentId) -> Result<Option<u32>, StoreError> {
        let guard = self.splits.lock().expect("mandate mutex poisoned");
        Ok(guard.get(agent).copied())
    }
}

#[derive(Default, Clone)]
pub struct MemoryCommissionLedger {
    transactions: Arc<Mutex<Vec<CommissionTransaction>>>,
}

impl MemoryCommissionLedger {
    pub fn transactions(&self) -> Vec<CommissionTransaction> {
        self.transactions
            .lock()
            .expect("commission mutex poisoned")
            .clone()
    }
}

impl CommissionLedger for MemoryCommissionLedger {
    fn record(&self, transaction: CommissionTransaction) -> Result<(), StoreError> {
        self.transactions
            .lock()
            .expect("commission mutex poisoned")
            .push(transaction);
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct MemoryActivityLog {
    entries: Arc<Mutex<Vec<ActivityEntry>>>,
}

impl MemoryActivityLog {
    pub fn entries(&self) -> Vec<ActivityEntry> {
        self.entries.lock().expect("activity mutex poisoned").clone()
    }
}

impl ActivityLog for MemoryActivityLog {
    fn append(&self, entry: ActivityEntry) -> Result<(), StoreError> {
        self.entries
            .lock()
            .expect("activity mutex poisoned")
            .push(entry);
        Ok(())
    }
}

/// Token table standing in for the platform's session verification.
#[derive(Default, Clone)]
pub struct StaticAuthVerifier {
    tokens: Arc<Mutex<HashMap<String, Caller>>>,
}

impl StaticAuthVerifier {
    pub fn grant(&self, token: impl Into<String>, caller: Caller) {
        self.tokens
            .lock()
            .expect("auth mutex poisoned")
            .insert(token.into(), caller);
    }
}

impl AuthVerifier for StaticAuthVerifier {
    fn verify(&self, token: &str) -> Result<Caller, AuthError> {
        let guard = self.tokens.lock().expect("auth mutex poisoned");
        guard.get(token).cloned().ok_or(AuthError::InvalidToken)
    }
}

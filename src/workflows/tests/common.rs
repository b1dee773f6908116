use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};

use crate::config::PolicyConfig;
use crate::workflows::dispatch::NotificationDispatcher;
use crate::workflows::domain::{
    AgentId, Caller, Lease, LeaseId, LeaseStatus, Notification, NotificationKind,
    PaymentDelayRecord, PropertyId, ReminderChannel, ReminderKind, ReminderLog, Severity, UserId,
    UserRole,
};
use crate::workflows::memory::{
    MemoryActivityLog, MemoryCommissionLedger, MemoryDelinquencyLedger, MemoryDisputeStore,
    MemoryLeaseStore, MemoryMandateRegistry, MemoryMediationRoster, MemoryNotificationStore,
    MemoryOwnerSettings, MemoryPaymentLedger, MemoryReminderLedger, MemoryRoleDirectory,
    MemorySmsGateway, StaticAuthVerifier,
};
use crate::workflows::repository::{
    DelinquencyLedger, LedgerInsert, NotificationStore, ReminderLedger, StoreError,
};
use crate::workflows::{
    CommissionSettlement, DelinquencyScanner, DisputeLifecycle, GhostTenantDetector,
    ReminderScheduler,
};

pub(super) const TODAY: fn() -> NaiveDate =
    || NaiveDate::from_ymd_opt(2026, 3, 18).expect("valid date");

/// All the in-memory stores one test needs, pre-wired into a dispatcher.
pub(super) struct Harness {
    pub(super) leases: Arc<MemoryLeaseStore>,
    pub(super) delinquency_ledger: Arc<MemoryDelinquencyLedger>,
    pub(super) reminder_ledger: Arc<MemoryReminderLedger>,
    pub(super) payments: Arc<MemoryPaymentLedger>,
    pub(super) notifications: Arc<MemoryNotificationStore>,
    pub(super) sms: Arc<MemorySmsGateway>,
    pub(super) settings: Arc<MemoryOwnerSettings>,
    pub(super) disputes: Arc<MemoryDisputeStore>,
    pub(super) directory: Arc<MemoryRoleDirectory>,
    pub(super) mandates: Arc<MemoryMandateRegistry>,
    pub(super) commissions: Arc<MemoryCommissionLedger>,
    pub(super) activity: Arc<MemoryActivityLog>,
    pub(super) auth: Arc<StaticAuthVerifier>,
    pub(super) policy: PolicyConfig,
}

impl Harness {
    pub(super) fn new() -> Self {
        Self {
            leases: Arc::new(MemoryLeaseStore::default()),
            delinquency_ledger: Arc::new(MemoryDelinquencyLedger::default()),
            reminder_ledger: Arc::new(MemoryReminderLedger::default()),
            payments: Arc::new(MemoryPaymentLedger::default()),
            notifications: Arc::new(MemoryNotificationStore::default()),
            sms: Arc::new(MemorySmsGateway::default()),
            settings: Arc::new(MemoryOwnerSettings::default()),
            disputes: Arc::new(MemoryDisputeStore::default()),
            directory: Arc::new(MemoryRoleDirectory::default()),
            mandates: Arc::new(MemoryMandateRegistry::default()),
            commissions: Arc::new(MemoryCommissionLedger::default()),
            activity: Arc::new(MemoryActivityLog::default()),
            auth: Arc::new(StaticAuthVerifier::default()),
            policy: PolicyConfig::default(),
        }
    }

    pub(super) fn dispatcher(
        &self,
    ) -> Arc<NotificationDispatcher<MemoryNotificationStore, MemorySmsGateway>> {
        Arc::new(NotificationDispatcher::new(
            self.notifications.clone(),
            self.sms.clone(),
        ))
    }

    pub(super) fn delinquency_scanner(
        &self,
    ) -> DelinquencyScanner<
        MemoryLeaseStore,
        MemoryDelinquencyLedger,
        MemoryOwnerSettings,
        MemoryNotificationStore,
        MemorySmsGateway,
    > {
        DelinquencyScanner::new(
            self.leases.clone(),
            self.delinquency_ledger.clone(),
            self.settings.clone(),
            self.dispatcher(),
            self.policy.clone(),
        )
    }

    pub(super) fn ghost_detector(
        &self,
    ) -> GhostTenantDetector<
        MemoryLeaseStore,
        MemoryDelinquencyLedger,
        MemoryReminderLedger,
        MemoryNotificationStore,
        MemorySmsGateway,
    > {
        GhostTenantDetector::new(
            self.leases.clone(),
            self.delinquency_ledger.clone(),
            self.reminder_ledger.clone(),
            self.notifications.clone(),
            self.dispatcher(),
            self.policy.clone(),
        )
    }

    pub(super) fn reminder_scheduler(
        &self,
    ) -> ReminderScheduler<
        MemoryLeaseStore,
        MemoryReminderLedger,
        MemoryPaymentLedger,
        MemoryNotificationStore,
        MemorySmsGateway,
    > {
        ReminderScheduler::new(
            self.leases.clone(),
            self.reminder_ledger.clone(),
            self.payments.clone(),
            self.dispatcher(),
            self.policy.clone(),
        )
    }

    pub(super) fn commission_settlement(
        &self,
    ) -> CommissionSettlement<
        MemoryLeaseStore,
        MemoryMandateRegistry,
        MemoryCommissionLedger,
        MemoryActivityLog,
    > {
        CommissionSettlement::new(
            self.leases.clone(),
            self.mandates.clone(),
            self.commissions.clone(),
            self.activity.clone(),
            self.policy.clone(),
        )
    }

    pub(super) fn dispute_lifecycle(
        &self,
        roster: MemoryMediationRoster,
    ) -> DisputeLifecycle<
        MemoryDisputeStore,
        MemoryMediationRoster,
        MemoryRoleDirectory,
        MemoryNotificationStore,
        MemorySmsGateway,
    > {
        DisputeLifecycle::new(
            self.disputes.clone(),
            Arc::new(roster),
            self.directory.clone(),
            self.dispatcher(),
        )
    }

    /// Seed `count` unread notifications for `tenant`, created now.
    pub(super) fn seed_unread_notifications(&self, tenant: &UserId, count: u32) {
        for _ in 0..count {
            self.notifications
                .insert(Notification {
                    recipient: tenant.clone(),
                    title: "Relance".to_string(),
                    message: "Votre loyer est en attente de paiement.".to_string(),
                    kind: NotificationKind::PaymentReminder,
                    severity: Severity::Warning,
                    action_link: None,
                    metadata: Default::default(),
                    read: false,
                    created_at: Utc::now(),
                })
                .expect("notification insert");
        }
    }

    /// Seed `count` reminder-log rows the tenant never opened.
    pub(super) fn seed_unopened_reminders(&self, lease: &LeaseId, tenant: &UserId, count: u32) {
        for _ in 0..count {
            self.reminder_ledger
                .append(ReminderLog {
                    lease: lease.clone(),
                    tenant: tenant.clone(),
                    kind: ReminderKind::Overdue,
                    channel: ReminderChannel::Sms,
                    message: "Votre loyer n'a pas été réglé.".to_string(),
                    sent_at: Utc::now() - Duration::days(20),
                    opened_at: None,
                })
                .expect("reminder append");
        }
    }
}

pub(super) fn lease_overdue(id: &str, rent: u64, days_overdue: i64, today: NaiveDate) -> Lease {
    Lease {
        id: LeaseId(id.to_string()),
        tenant: UserId(format!("tenant-{id}")),
        owner: UserId(format!("owner-{id}")),
        property: PropertyId(format!("prop-{id}")),
        monthly_rent: rent,
        next_due_date: today - Duration::days(days_overdue),
        payment_day: Some(5),
        penalty_rate_percent: None,
        penalty_cap_percent: None,
        grace_period_days: None,
        legal_action_started: false,
        legal_action_at: None,
        ghost_tenant_detected: false,
        status: LeaseStatus::Active,
    }
}

pub(super) fn caller(user: &str, role: UserRole) -> Caller {
    Caller {
        user: UserId(user.to_string()),
        role,
    }
}

pub(super) fn agent(id: &str) -> AgentId {
    AgentId(id.to_string())
}

pub(super) async fn read_json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json body")
}

/// Ledger double that rejects writes for one lease so per-lease isolation
/// can be observed.
pub(super) struct FailingLedger {
    pub(super) fail_for: LeaseId,
    pub(super) inner: MemoryDelinquencyLedger,
}

impl DelinquencyLedger for FailingLedger {
    fn record_once(&self, record: PaymentDelayRecord) -> Result<LedgerInsert, StoreError> {
        if record.lease == self.fail_for {
            return Err(StoreError::Unavailable("ledger offline".to_string()));
        }
        self.inner.record_once(record)
    }

    fn record(&self, record: PaymentDelayRecord) -> Result<(), StoreError> {
        if record.lease == self.fail_for {
            return Err(StoreError::Unavailable("ledger offline".to_string()));
        }
        self.inner.record(record)
    }
}

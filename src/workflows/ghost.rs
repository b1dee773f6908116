use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::PolicyConfig;

use super::dispatch::{Delivery, NotificationDispatcher};
use super::domain::{
    DelayRecordSource, Lease, LeaseId, NotificationKind, PaymentDelayRecord, RiskLevel, Severity,
    UserId,
};
use super::repository::{
    DelinquencyLedger, LeaseStore, NotificationStore, ReminderLedger, SmsGateway, StoreError,
};
use super::ScanError;

/// One flagged lease in the run summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GhostDetail {
    pub lease_id: LeaseId,
    pub tenant_id: UserId,
    pub days_late: u32,
    pub unread_notifications: u32,
    pub unopened_reminders: u32,
}

/// Result of one ghost-detection pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GhostSummary {
    pub ghost_tenants_detected: u32,
    pub errors: u32,
    pub details: Vec<GhostDetail>,
}

/// Daily job flagging delinquent tenants who have gone silent: enough unread
/// notifications in the recent window, or enough reminders never opened.
pub struct GhostTenantDetector<L, D, R, N, S> {
    leases: Arc<L>,
    ledger: Arc<D>,
    reminders: Arc<R>,
    notifications: Arc<N>,
    dispatcher: Arc<NotificationDispatcher<N, S>>,
    policy: PolicyConfig,
}

impl<L, D, R, N, S> GhostTenantDetector<L, D, R, N, S>
where
    L: LeaseStore,
    D: DelinquencyLedger,
    R: ReminderLedger,
    N: NotificationStore,
    S: SmsGateway,
{
    pub fn new(
        leases: Arc<L>,
        ledger: Arc<D>,
        reminders: Arc<R>,
        notifications: Arc<N>,
        dispatcher: Arc<NotificationDispatcher<N, S>>,
        policy: PolicyConfig,
    ) -> Self {
        Self {
            leases,
            ledger,
            reminders,
            notifications,
            dispatcher,
            policy,
        }
    }

    /// Run one pass as of `today`, scoped to active leases already deep in
    /// arrears and not yet flagged. Per-lease failures are isolated.
    pub fn run(&self, today: NaiveDate) -> Result<GhostSummary, ScanError> {
        let overdue = self.leases.overdue_as_of(today)?;

        let mut summary = GhostSummary {
            ghost_tenants_detected: 0,
            errors: 0,
            details: Vec::new(),
        };

        for lease in overdue {
            if lease.ghost_tenant_detected
                || lease.days_late(today) < self.policy.ghost_scope_days_late
            {
                continue;
            }
            match self.evaluate_lease(&lease, today) {
                Ok(Some(detail)) => {
                    summary.ghost_tenants_detected += 1;
                    summary.details.push(detail);
                }
                Ok(None) => {}
                Err(err) => {
                    summary.errors += 1;
                    error!(lease = %lease.id.0, %err, "ghost detection failed");
                }
            }
        }

        info!(
            detected = summary.ghost_tenants_detected,
            errors = summary.errors,
            %today,
            "ghost-tenant scan complete"
        );
        Ok(summary)
    }

    fn evaluate_lease(
        &self,
        lease: &Lease,
        today: NaiveDate,
    ) -> Result<Option<GhostDetail>, StoreError> {
        // Window anchored on the evaluation date, not the wall clock, so a
        // re-run for a past day inspects the same history.
        let cutoff = (today - Duration::days(i64::from(self.policy.ghost_lookback_days)))
            .and_hms_opt(0, 0, 0)
            .unwrap_or_default()
            .and_utc();
        let unread = self
            .notifications
            .unread_count_since(&lease.tenant, cutoff)?;
        let unopened = self.reminders.unopened_count(&lease.tenant, &lease.id)?;

        let is_ghost = unread >= self.policy.ghost_unread_notifications
            || unopened >= self.policy.ghost_unopened_reminders;
        if !is_ghost {
            return Ok(None);
        }

        let days_late = lease.days_late(today);

        // One-way transition; nothing in this component ever clears it.
        self.leases.mark_ghost(&lease.id)?;

        let owner_note = Delivery::new(
            lease.owner.clone(),
            "Locataire injoignable",
            format!(
                "Votre locataire du bail {} ne réagit plus à nos relances ({} jours de retard de loyer).",
                lease.id.0, days_late
            ),
            NotificationKind::GhostTenant,
            Severity::Error,
        )
        .with_metadata("leaseId", lease.id.0.clone())
        .with_metadata("unreadNotifications", unread.to_string())
        .with_metadata("unopenedReminders", unopened.to_string());

        if let Err(err) = self.dispatcher.deliver(owner_note) {
            warn!(lease = %lease.id.0, %err, "ghost notification failed");
        }

        // Distinct from the delinquency scanner's milestone rows, so no
        // dedup: this is the detection event itself.
        self.ledger.record(PaymentDelayRecord {
            lease: lease.id.clone(),
            tenant: lease.tenant.clone(),
            property: lease.property.clone(),
            days_late,
            amount_due: lease.monthly_rent,
            penalty_applied: 0,
            risk: RiskLevel::Critical,
            source: DelayRecordSource::GhostDetection,
            recorded_at: Utc::now(),
        })?;

        Ok(Some(GhostDetail {
            lease_id: lease.id.clone(),
            tenant_id: lease.tenant.clone(),
            days_late,
            unread_notifications: unread,
            unopened_reminders: unopened,
        }))
    }
}

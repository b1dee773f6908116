use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Utc};
use serde::Serialize;
use tracing::{error, info};

use crate::config::PolicyConfig;

use super::dispatch::{Delivery, NotificationDispatcher};
use super::domain::{
    Lease, NotificationKind, ReminderChannel, ReminderKind, ReminderLog, Severity,
};
use super::repository::{
    LeaseStore, NotificationStore, PaymentLedger, ReminderLedger, SmsGateway, StoreError,
};
use super::ScanError;

/// Counters for one reminder pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderCounts {
    pub upcoming: u32,
    pub due_today: u32,
    pub overdue: u32,
    pub errors: u32,
}

/// Result of one reminder pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReminderSummary {
    pub date: NaiveDate,
    pub results: ReminderCounts,
}

/// Daily job sending graduated rent reminders keyed off the lease's payment
/// day: three days ahead, on the day, and one day past when no payment has
/// been recorded for the month.
pub struct ReminderScheduler<L, R, P, N, S> {
    leases: Arc<L>,
    reminders: Arc<R>,
    payments: Arc<P>,
    dispatcher: Arc<NotificationDispatcher<N, S>>,
    policy: PolicyConfig,
}

impl<L, R, P, N, S> ReminderScheduler<L, R, P, N, S>
where
    L: LeaseStore,
    R: ReminderLedger,
    P: PaymentLedger,
    N: NotificationStore,
    S: SmsGateway,
{
    pub fn new(
        leases: Arc<L>,
        reminders: Arc<R>,
        payments: Arc<P>,
        dispatcher: Arc<NotificationDispatcher<N, S>>,
        policy: PolicyConfig,
    ) -> Self {
        Self {
            leases,
            reminders,
            payments,
            dispatcher,
            policy,
        }
    }

    /// Run one pass for `today`. At most one reminder goes out per lease per
    /// day; the three offset branches are mutually exclusive, and the
    /// reminder ledger guards against same-day re-runs.
    pub fn run(&self, today: NaiveDate) -> Result<ReminderSummary, ScanError> {
        let active = self.leases.active()?;

        let mut counts = ReminderCounts::default();

        for lease in active {
            match self.process_lease(&lease, today) {
                Ok(Some(ReminderOutcome { kind, sms_failed })) => {
                    match kind {
                        ReminderKind::Upcoming => counts.upcoming += 1,
                        ReminderKind::DueToday => counts.due_today += 1,
                        ReminderKind::Overdue => counts.overdue += 1,
                    }
                    if sms_failed {
                        counts.errors += 1;
                    }
                }
                Ok(None) => {}
                Err(err) => {
                    counts.errors += 1;
                    error!(lease = %lease.id.0, %err, "reminder processing failed");
                }
            }
        }

        info!(
            upcoming = counts.upcoming,
            due_today = counts.due_today,
            overdue = counts.overdue,
            errors = counts.errors,
            %today,
            "reminder scan complete"
        );
        Ok(ReminderSummary {
            date: today,
            results: counts,
        })
    }

    fn process_lease(
        &self,
        lease: &Lease,
        today: NaiveDate,
    ) -> Result<Option<ReminderOutcome>, StoreError> {
        if self.reminders.sent_on(&lease.id, today)? {
            return Ok(None);
        }

        let payment_day = i64::from(lease.payment_day(&self.policy));
        let days_until_payment = payment_day - i64::from(today.day());

        let kind = match days_until_payment {
            3 => ReminderKind::Upcoming,
            0 => ReminderKind::DueToday,
            -1 => {
                if self
                    .payments
                    .payment_recorded(&lease.id, today.year(), today.month())?
                {
                    return Ok(None);
                }
                ReminderKind::Overdue
            }
            _ => return Ok(None),
        };

        let message = self.message_for(lease, kind, payment_day);
        let (title, severity) = match kind {
            ReminderKind::Upcoming => ("Échéance de loyer à venir", Severity::Info),
            ReminderKind::DueToday => ("Loyer dû aujourd'hui", Severity::Warning),
            ReminderKind::Overdue => ("Loyer en retard", Severity::Error),
        };

        let report = self.dispatcher.deliver(
            Delivery::new(
                lease.tenant.clone(),
                title,
                message.clone(),
                NotificationKind::PaymentReminder,
                severity,
            )
            .with_metadata("leaseId", lease.id.0.clone())
            .with_metadata("reminderType", kind.label().to_string())
            .via_sms(),
        )?;

        // Audit row keeps the literal body sent; the ghost detector counts
        // the ones the tenant never opens.
        let sent_at = today
            .and_time(Utc::now().time())
            .and_utc();
        self.reminders.append(ReminderLog {
            lease: lease.id.clone(),
            tenant: lease.tenant.clone(),
            kind,
            channel: ReminderChannel::Sms,
            message,
            sent_at,
            opened_at: None,
        })?;

        Ok(Some(ReminderOutcome {
            kind,
            sms_failed: report.sms_failed(),
        }))
    }

    fn message_for(&self, lease: &Lease, kind: ReminderKind, payment_day: i64) -> String {
        match kind {
            ReminderKind::Upcoming => format!(
                "Rappel : votre loyer de {} FCFA est à régler le {} de ce mois.",
                lease.monthly_rent, payment_day
            ),
            ReminderKind::DueToday => format!(
                "Votre loyer de {} FCFA est dû aujourd'hui. Pensez à effectuer votre paiement.",
                lease.monthly_rent
            ),
            ReminderKind::Overdue => format!(
                "Votre loyer de {} FCFA n'a pas été réglé. Régularisez votre situation pour éviter des pénalités.",
                lease.monthly_rent
            ),
        }
    }
}

struct ReminderOutcome {
    kind: ReminderKind,
    sms_failed: bool,
}

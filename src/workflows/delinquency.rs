use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::PolicyConfig;

use super::dispatch::{Delivery, NotificationDispatcher};
use super::domain::{
    DelayRecordSource, Lease, LeaseId, NotificationKind, PaymentDelayRecord, RiskLevel, Severity,
};
use super::repository::{
    DelinquencyLedger, LeaseStore, NotificationStore, OwnerSettings, SmsGateway, StoreError,
};
use super::ScanError;

/// Per-lease outcome accumulated into the run summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DelinquencyDetail {
    pub lease_id: LeaseId,
    pub days_late: u32,
    pub penalty: u64,
    pub legal_action: bool,
}

/// Result of one daily delinquency pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DelinquencySummary {
    pub processed: u32,
    pub errors: u32,
    pub details: Vec<DelinquencyDetail>,
}

/// Daily scanner applying the late-penalty formula and the legal-escalation
/// threshold to every active lease past its due date.
pub struct DelinquencyScanner<L, D, O, N, S> {
    leases: Arc<L>,
    ledger: Arc<D>,
    settings: Arc<O>,
    dispatcher: Arc<NotificationDispatcher<N, S>>,
    policy: PolicyConfig,
}

impl<L, D, O, N, S> DelinquencyScanner<L, D, O, N, S>
where
    L: LeaseStore,
    D: DelinquencyLedger,
    O: OwnerSettings,
    N: NotificationStore,
    S: SmsGateway,
{
    pub fn new(
        leases: Arc<L>,
        ledger: Arc<D>,
        settings: Arc<O>,
        dispatcher: Arc<NotificationDispatcher<N, S>>,
        policy: PolicyConfig,
    ) -> Self {
        Self {
            leases,
            ledger,
            settings,
            dispatcher,
            policy,
        }
    }

    /// Run one pass as of `today`. A failure on one lease is logged and
    /// counted; it never aborts the rest of the batch. Only the initial
    /// lease query can fail the whole run.
    pub fn run(&self, today: NaiveDate) -> Result<DelinquencySummary, ScanError> {
        let overdue = self.leases.overdue_as_of(today)?;

        let mut summary = DelinquencySummary {
            processed: 0,
            errors: 0,
            details: Vec::new(),
        };

        for lease in overdue {
            match self.process_lease(&lease, today) {
                Ok(Some(detail)) => {
                    summary.processed += 1;
                    summary.details.push(detail);
                }
                Ok(None) => {}
                Err(err) => {
                    summary.errors += 1;
                    error!(lease = %lease.id.0, %err, "delinquency processing failed");
                }
            }
        }

        info!(
            processed = summary.processed,
            errors = summary.errors,
            %today,
            "delinquency scan complete"
        );
        Ok(summary)
    }

    fn process_lease(
        &self,
        lease: &Lease,
        today: NaiveDate,
    ) -> Result<Option<DelinquencyDetail>, StoreError> {
        let days_late = lease.days_late(today);
        let grace = lease.grace_period(&self.policy);
        if days_late <= grace {
            return Ok(None);
        }

        let effective_days = days_late - grace;
        let penalty = self.penalty_for(lease, effective_days);

        let legal_action = self.maybe_engage_legal_action(lease, days_late, penalty)?;

        let record = PaymentDelayRecord {
            lease: lease.id.clone(),
            tenant: lease.tenant.clone(),
            property: lease.property.clone(),
            days_late,
            amount_due: lease.monthly_rent,
            penalty_applied: penalty,
            risk: RiskLevel::from_days_late(days_late),
            source: DelayRecordSource::DelinquencyScan,
            recorded_at: Utc::now(),
        };
        // The ledger's uniqueness constraint on (lease, days_late) makes a
        // same-day re-run a no-op rather than a duplicate history row.
        self.ledger.record_once(record)?;

        Ok(Some(DelinquencyDetail {
            lease_id: lease.id.clone(),
            days_late,
            penalty,
            legal_action,
        }))
    }

    fn penalty_for(&self, lease: &Lease, effective_days: u32) -> u64 {
        let rate = u64::from(lease.penalty_rate(&self.policy));
        let cap = u64::from(lease.penalty_cap(&self.policy));
        let raw = lease.monthly_rent * rate * u64::from(effective_days) / 100;
        let ceiling = lease.monthly_rent * cap / 100;
        raw.min(ceiling)
    }

    /// Engage legal action once a lease crosses both the platform gate and
    /// the owner's configured threshold. The flag is one-way; an already
    /// escalated lease is never re-notified.
    fn maybe_engage_legal_action(
        &self,
        lease: &Lease,
        days_late: u32,
        penalty: u64,
    ) -> Result<bool, StoreError> {
        if lease.legal_action_started {
            return Ok(true);
        }
        if days_late < self.policy.legal_review_gate_days {
            return Ok(false);
        }

        let threshold = self
            .settings
            .auto_engage_threshold_days(&lease.owner)?
            .unwrap_or(self.policy.default_auto_engage_days);
        if days_late < threshold {
            return Ok(false);
        }

        self.leases.mark_legal_action(&lease.id, Utc::now())?;

        let owner_note = Delivery::new(
            lease.owner.clone(),
            "Procédure de recouvrement engagée",
            format!(
                "Le loyer du bail {} est impayé depuis {} jours. Une procédure de recouvrement a été engagée automatiquement.",
                lease.id.0, days_late
            ),
            NotificationKind::LegalAction,
            Severity::Error,
        )
        .with_metadata("leaseId", lease.id.0.clone())
        .with_metadata("daysLate", days_late.to_string())
        .with_metadata("penalty", penalty.to_string());

        let tenant_note = Delivery::new(
            lease.tenant.clone(),
            "Mise en demeure",
            format!(
                "Votre loyer est impayé depuis {} jours. Une procédure de recouvrement a été engagée. Régularisez votre situation au plus vite.",
                days_late
            ),
            NotificationKind::LegalAction,
            Severity::Error,
        )
        .with_metadata("leaseId", lease.id.0.clone());

        // Notification failures degrade to a warning so the history row that
        // follows is still written.
        for delivery in [owner_note, tenant_note] {
            let recipient = delivery.recipient.clone();
            if let Err(err) = self.dispatcher.deliver(delivery) {
                warn!(lease = %lease.id.0, recipient = %recipient.0, %err, "legal action notification failed");
            }
        }

        Ok(true)
    }
}

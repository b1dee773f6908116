use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::info;

use crate::config::PolicyConfig;

use super::domain::{
    AgencyId, AgentId, CommissionStatus, CommissionTransaction, LeaseId,
};
use super::repository::{
    ActivityEntry, ActivityLog, CommissionLedger, LeaseStore, MandateRegistry, StoreError,
};

/// Error raised by commission settlement. Only a missing lease fails the
/// operation; absent mandate or split terms fall back to platform defaults.
#[derive(Debug, thiserror::Error)]
pub enum CommissionError {
    #[error("lease not found")]
    LeaseNotFound,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Figures echoed back to the caller alongside the stored transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionBreakdown {
    pub gross_amount: u64,
    pub agent_share: u64,
    pub agency_share: u64,
    pub commission_rate: u32,
    pub agent_split: u32,
}

/// Outcome of one settlement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommissionOutcome {
    pub transaction: CommissionTransaction,
    pub summary: CommissionBreakdown,
}

/// Stateless split calculator invoked once per lease-signature event.
pub struct CommissionSettlement<L, M, C, A> {
    leases: Arc<L>,
    mandates: Arc<M>,
    ledger: Arc<C>,
    activity: Arc<A>,
    policy: PolicyConfig,
}

impl<L, M, C, A> CommissionSettlement<L, M, C, A>
where
    L: LeaseStore,
    M: MandateRegistry,
    C: CommissionLedger,
    A: ActivityLog,
{
    pub fn new(
        leases: Arc<L>,
        mandates: Arc<M>,
        ledger: Arc<C>,
        activity: Arc<A>,
        policy: PolicyConfig,
    ) -> Self {
        Self {
            leases,
            mandates,
            ledger,
            activity,
            policy,
        }
    }

    pub fn settle(
        &self,
        lease_id: &LeaseId,
        agent: &AgentId,
        agency: &AgencyId,
        today: NaiveDate,
    ) -> Result<CommissionOutcome, CommissionError> {
        let lease = self
            .leases
            .fetch(lease_id)?
            .ok_or(CommissionError::LeaseNotFound)?;

        let commission_rate = self
            .mandates
            .commission_rate_percent(&lease.property)?
            .unwrap_or(self.policy.default_commission_rate_percent);
        let agent_split = self
            .mandates
            .agent_split_percent(agent)?
            .unwrap_or(self.policy.default_agent_split_percent);

        let gross_amount = lease.monthly_rent * u64::from(commission_rate) / 100;
        let agent_share = gross_amount * u64::from(agent_split) / 100;
        // Remainder, not an independent percentage: the two shares must sum
        // to the gross amount exactly, whatever the split.
        let agency_share = gross_amount - agent_share;

        let transaction = CommissionTransaction {
            agency: agency.clone(),
            agent: agent.clone(),
            property: lease.property.clone(),
            lease: lease.id.clone(),
            kind: "lease_signature".to_string(),
            gross_amount,
            agency_share,
            agent_share,
            status: CommissionStatus::Pending,
            transaction_date: today,
        };
        self.ledger.record(transaction.clone())?;

        let mut details = BTreeMap::new();
        details.insert("leaseId".to_string(), lease.id.0.clone());
        details.insert("agencyId".to_string(), agency.0.clone());
        details.insert("agentId".to_string(), agent.0.clone());
        details.insert("grossAmount".to_string(), gross_amount.to_string());
        self.activity.append(ActivityEntry {
            actor: None,
            action: "commission_settled".to_string(),
            details,
            at: Utc::now(),
        })?;

        info!(
            lease = %lease.id.0,
            gross = gross_amount,
            agent_share,
            agency_share,
            "commission settled"
        );

        Ok(CommissionOutcome {
            transaction,
            summary: CommissionBreakdown {
                gross_amount,
                agent_share,
                agency_share,
                commission_rate,
                agent_split,
            },
        })
    }
}

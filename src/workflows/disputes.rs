use std::sync::Arc;

use chrono::Utc;
use tracing::warn;

use super::dispatch::{Delivery, NotificationDispatcher};
use super::domain::{
    AgentId, Caller, Dispute, DisputeCategory, DisputeId, DisputeMessage, DisputePriority,
    DisputeStatus, LeaseId, NotificationKind, PropertyId, ResolutionType, SenderRole, Severity,
    UserId, UserRole,
};
use super::repository::{
    DisputeDraft, DisputeStore, DisputeTransition, MediationRoster, NotificationStore,
    RoleDirectory, SmsGateway, StoreError,
};

/// Error raised by dispute operations.
#[derive(Debug, thiserror::Error)]
pub enum DisputeError {
    #[error("invalid dispute request: {0}")]
    InvalidInput(&'static str),
    #[error("caller is not allowed to perform this transition")]
    PermissionDenied,
    #[error("dispute not found")]
    NotFound,
    #[error("dispute status changed concurrently, re-fetch and retry")]
    Conflict,
    #[error("dispute is {} and cannot transition", from.label())]
    InvalidTransition { from: DisputeStatus },
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for DisputeError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound => DisputeError::NotFound,
            StoreError::Conflict => DisputeError::Conflict,
            other => DisputeError::Store(other),
        }
    }
}

/// User-supplied fields for opening a dispute.
#[derive(Debug, Clone, PartialEq)]
pub struct DisputeIntake {
    pub respondent: UserId,
    pub property: Option<PropertyId>,
    pub contract: Option<LeaseId>,
    pub intervention: Option<String>,
    pub category: DisputeCategory,
    pub subject: String,
    pub description: String,
    pub evidence: Vec<String>,
}

/// Result of a successful create.
#[derive(Debug, Clone, PartialEq)]
pub struct DisputeCreated {
    pub dispute: Dispute,
    pub assigned_agent: Option<AgentId>,
}

/// Request-driven state machine for mediation cases:
/// open → escalated → resolved, with resolved terminal. Status writes go
/// through the store's conditional update so concurrent transitions lose
/// with [`DisputeError::Conflict`] instead of overwriting each other.
pub struct DisputeLifecycle<D, M, R, N, S> {
    disputes: Arc<D>,
    roster: Arc<M>,
    directory: Arc<R>,
    dispatcher: Arc<NotificationDispatcher<N, S>>,
}

impl<D, M, R, N, S> DisputeLifecycle<D, M, R, N, S>
where
    D: DisputeStore,
    M: MediationRoster,
    R: RoleDirectory,
    N: NotificationStore,
    S: SmsGateway,
{
    pub fn new(
        disputes: Arc<D>,
        roster: Arc<M>,
        directory: Arc<R>,
        dispatcher: Arc<NotificationDispatcher<N, S>>,
    ) -> Self {
        Self {
            disputes,
            roster,
            directory,
            dispatcher,
        }
    }

    pub fn create(
        &self,
        complainant: UserId,
        intake: DisputeIntake,
    ) -> Result<DisputeCreated, DisputeError> {
        if complainant == intake.respondent {
            return Err(DisputeError::InvalidInput(
                "complainant and respondent must differ",
            ));
        }
        if intake.subject.trim().is_empty() {
            return Err(DisputeError::InvalidInput("subject is required"));
        }
        if intake.description.trim().is_empty() {
            return Err(DisputeError::InvalidInput("description is required"));
        }

        let priority = intake.category.default_priority();
        let mut dispute = self.disputes.create(DisputeDraft {
            complainant: complainant.clone(),
            respondent: intake.respondent.clone(),
            property: intake.property,
            contract: intake.contract,
            intervention: intake.intervention,
            category: intake.category,
            subject: intake.subject,
            description: intake.description,
            evidence: intake.evidence,
            priority,
        })?;

        // Opaque assignment rule; a roster outage degrades to "unassigned"
        // rather than failing the creation.
        let assigned_agent = match self.roster.assign(&dispute.id) {
            Ok(agent) => agent,
            Err(err) => {
                warn!(dispute = %dispute.id.0, %err, "mediator assignment failed");
                None
            }
        };
        if let Some(agent) = &assigned_agent {
            self.disputes.assign_agent(&dispute.id, agent)?;
            dispute.assigned_agent = Some(agent.clone());
        }

        self.disputes.append_message(DisputeMessage {
            dispute: dispute.id.clone(),
            sender: None,
            role: SenderRole::System,
            body: format!(
                "Litige {} ouvert (catégorie : {}). Un médiateur va examiner votre dossier.",
                dispute.number,
                dispute.category.label()
            ),
            internal: false,
            sent_at: Utc::now(),
        })?;

        self.notify_quietly(
            &dispute,
            Delivery::new(
                dispute.respondent.clone(),
                "Un litige vous concerne",
                format!(
                    "Le litige {} a été ouvert à votre encontre : {}.",
                    dispute.number, dispute.subject
                ),
                NotificationKind::Dispute,
                Severity::Warning,
            )
            .with_metadata("disputeId", dispute.id.0.clone()),
        );

        if let Some(agent) = &assigned_agent {
            self.notify_quietly(
                &dispute,
                Delivery::new(
                    UserId(agent.0.clone()),
                    "Nouveau litige à traiter",
                    format!(
                        "Le litige {} ({}) vous a été attribué.",
                        dispute.number,
                        dispute.priority.label()
                    ),
                    NotificationKind::Dispute,
                    Severity::Info,
                )
                .with_metadata("disputeId", dispute.id.0.clone()),
            );
        }

        Ok(DisputeCreated {
            dispute,
            assigned_agent,
        })
    }

    pub fn escalate(
        &self,
        id: &DisputeId,
        reason: &str,
        caller: &Caller,
    ) -> Result<Dispute, DisputeError> {
        let dispute = self.fetch_for_transition(id, caller)?;
        if !dispute.status.can_transition_to(DisputeStatus::Escalated) {
            return Err(DisputeError::InvalidTransition {
                from: dispute.status,
            });
        }

        let now = Utc::now();
        let updated = self.disputes.transition(
            id,
            dispute.status,
            DisputeStatus::Escalated,
            DisputeTransition {
                priority: Some(DisputePriority::Urgent),
                escalated_at: Some(now),
                ..DisputeTransition::default()
            },
        )?;

        self.disputes.append_message(DisputeMessage {
            dispute: id.clone(),
            sender: Some(caller.user.clone()),
            role: SenderRole::Mediator,
            body: format!("Escalade demandée : {reason}"),
            internal: true,
            sent_at: now,
        })?;
        self.disputes.append_message(DisputeMessage {
            dispute: id.clone(),
            sender: None,
            role: SenderRole::System,
            body: format!(
                "Le litige {} a été escaladé et sera traité en priorité urgente.",
                updated.number
            ),
            internal: false,
            sent_at: now,
        })?;

        match self.directory.administrators() {
            Ok(admins) => {
                for admin in admins {
                    self.notify_quietly(
                        &updated,
                        Delivery::new(
                            admin,
                            "Litige escaladé",
                            format!(
                                "Le litige {} requiert une intervention administrateur.",
                                updated.number
                            ),
                            NotificationKind::Dispute,
                            Severity::Warning,
                        )
                        .with_metadata("disputeId", updated.id.0.clone()),
                    );
                }
            }
            Err(err) => {
                warn!(dispute = %updated.id.0, %err, "administrator fan-out failed");
            }
        }

        Ok(updated)
    }

    pub fn resolve(
        &self,
        id: &DisputeId,
        resolution: &str,
        resolution_type: ResolutionType,
        caller: &Caller,
    ) -> Result<Dispute, DisputeError> {
        if resolution.trim().is_empty() {
            return Err(DisputeError::InvalidInput("resolution is required"));
        }

        let dispute = self.fetch_for_transition(id, caller)?;
        if !dispute.status.can_transition_to(DisputeStatus::Resolved) {
            return Err(DisputeError::InvalidTransition {
                from: dispute.status,
            });
        }

        let now = Utc::now();
        let updated = self.disputes.transition(
            id,
            dispute.status,
            DisputeStatus::Resolved,
            DisputeTransition {
                resolved_at: Some(now),
                resolution: Some(resolution.to_string()),
                resolution_type: Some(resolution_type),
                ..DisputeTransition::default()
            },
        )?;

        self.disputes.append_message(DisputeMessage {
            dispute: id.clone(),
            sender: None,
            role: SenderRole::System,
            body: resolution_summary(&updated, resolution_type, resolution),
            internal: false,
            sent_at: now,
        })?;

        for party in [&updated.complainant, &updated.respondent] {
            self.notify_quietly(
                &updated,
                Delivery::new(
                    party.clone(),
                    "Litige résolu",
                    format!("Le litige {} a été clôturé.", updated.number),
                    NotificationKind::Dispute,
                    Severity::Info,
                )
                .with_metadata("disputeId", updated.id.0.clone())
                .with_metadata("resolutionType", resolution_type.label().to_string()),
            );
        }

        Ok(updated)
    }

    /// Escalate/resolve share one permission rule: platform administrators,
    /// trust agents, and the mediator currently assigned to the case.
    fn fetch_for_transition(
        &self,
        id: &DisputeId,
        caller: &Caller,
    ) -> Result<Dispute, DisputeError> {
        let dispute = self.disputes.fetch(id)?.ok_or(DisputeError::NotFound)?;

        let permitted = match caller.role {
            UserRole::Administrator | UserRole::TrustAgent => true,
            UserRole::Agent => dispute
                .assigned_agent
                .as_ref()
                .is_some_and(|agent| agent.0 == caller.user.0),
            UserRole::Tenant | UserRole::Owner => false,
        };
        if !permitted {
            return Err(DisputeError::PermissionDenied);
        }

        Ok(dispute)
    }

    /// Secondary notifications never fail the primary operation.
    fn notify_quietly(&self, dispute: &Dispute, delivery: Delivery) {
        let recipient = delivery.recipient.clone();
        if let Err(err) = self.dispatcher.deliver(delivery) {
            warn!(
                dispute = %dispute.id.0,
                recipient = %recipient.0,
                %err,
                "dispute notification failed"
            );
        }
    }
}

fn resolution_summary(dispute: &Dispute, kind: ResolutionType, resolution: &str) -> String {
    let verdict = match kind {
        ResolutionType::FavorComplainant => {
            format!("Le litige {} a été tranché en faveur du plaignant", dispute.number)
        }
        ResolutionType::FavorRespondent => format!(
            "Le litige {} a été tranché en faveur du mis en cause",
            dispute.number
        ),
        ResolutionType::Compromise => format!(
            "Le litige {} a été clos par un compromis entre les parties",
            dispute.number
        ),
        ResolutionType::Withdrawn => {
            format!("Le litige {} a été retiré par le plaignant", dispute.number)
        }
    };
    format!("{verdict}. Décision : {resolution}")
}

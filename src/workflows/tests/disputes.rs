use std::sync::Arc;

use super::common::{agent, caller, Harness};
use crate::workflows::domain::{
    AgentId, DisputeCategory, DisputeId, DisputePriority, DisputeStatus, NotificationKind,
    ResolutionType, SenderRole, UserId, UserRole,
};
use crate::workflows::memory::MemoryMediationRoster;
use crate::workflows::repository::{DisputeStore, DisputeTransition, MediationRoster, StoreError};
use crate::workflows::{DisputeError, DisputeIntake, DisputeLifecycle};

fn intake(respondent: &str, category: DisputeCategory) -> DisputeIntake {
    DisputeIntake {
        respondent: UserId(respondent.to_string()),
        property: None,
        contract: None,
        intervention: None,
        category,
        subject: "Loyer impayé".to_string(),
        description: "Le locataire ne paie plus son loyer depuis deux mois.".to_string(),
        evidence: Vec::new(),
    }
}

#[test]
fn create_opens_the_case_and_assigns_a_mediator() {
    let harness = Harness::new();
    let lifecycle = harness.dispute_lifecycle(MemoryMediationRoster::with_agent(agent("agt-1")));

    let created = lifecycle
        .create(
            UserId("owner-1".to_string()),
            intake("tenant-1", DisputeCategory::Payment),
        )
        .expect("create succeeds");

    let dispute = &created.dispute;
    assert_eq!(dispute.status, DisputeStatus::Open);
    assert_eq!(dispute.priority, DisputePriority::High);
    assert!(dispute.number.starts_with("LIT-"));
    assert_eq!(created.assigned_agent, Some(agent("agt-1")));
    assert_eq!(dispute.assigned_agent, Some(agent("agt-1")));

    let messages = harness.disputes.messages_for(&dispute.id);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, SenderRole::System);
    assert!(!messages[0].internal);
    assert!(messages[0].body.contains(&dispute.number));

    let respondent_notes = harness
        .notifications
        .for_recipient(&UserId("tenant-1".to_string()));
    assert_eq!(respondent_notes.len(), 1);
    assert_eq!(respondent_notes[0].kind, NotificationKind::Dispute);

    let agent_notes = harness
        .notifications
        .for_recipient(&UserId("agt-1".to_string()));
    assert_eq!(agent_notes.len(), 1);
    assert!(agent_notes[0].message.contains("attribué"));
}

#[test]
fn category_drives_the_initial_priority() {
    let harness = Harness::new();
    let lifecycle = harness.dispute_lifecycle(MemoryMediationRoster::default());

    let cases = [
        (DisputeCategory::Deposit, DisputePriority::High),
        (DisputeCategory::Damages, DisputePriority::High),
        (DisputeCategory::LeaseViolation, DisputePriority::High),
        (DisputeCategory::Maintenance, DisputePriority::Normal),
        (DisputeCategory::Other, DisputePriority::Normal),
        (DisputeCategory::Noise, DisputePriority::Low),
    ];
    for (category, expected) in cases {
        let created = lifecycle
            .create(UserId("owner-1".to_string()), intake("tenant-1", category))
            .expect("create succeeds");
        assert_eq!(created.dispute.priority, expected, "{}", category.label());
    }
}

#[test]
fn create_rejects_self_disputes_and_blank_subjects() {
    let harness = Harness::new();
    let lifecycle = harness.dispute_lifecycle(MemoryMediationRoster::default());

    let err = lifecycle
        .create(
            UserId("owner-1".to_string()),
            intake("owner-1", DisputeCategory::Payment),
        )
        .expect_err("self dispute rejected");
    assert!(matches!(err, DisputeError::InvalidInput(_)));

    let mut blank = intake("tenant-1", DisputeCategory::Payment);
    blank.subject = "   ".to_string();
    let err = lifecycle
        .create(UserId("owner-1".to_string()), blank)
        .expect_err("blank subject rejected");
    assert!(matches!(err, DisputeError::InvalidInput(_)));

    let mut empty = intake("tenant-1", DisputeCategory::Payment);
    empty.description = String::new();
    let err = lifecycle
        .create(UserId("owner-1".to_string()), empty)
        .expect_err("empty description rejected");
    assert!(matches!(err, DisputeError::InvalidInput(_)));
}

struct OfflineRoster;

impl MediationRoster for OfflineRoster {
    fn assign(&self, _dispute: &DisputeId) -> Result<Option<AgentId>, StoreError> {
        Err(StoreError::Unavailable("roster offline".to_string()))
    }
}

#[test]
fn roster_outage_degrades_to_an_unassigned_case() {
    let harness = Harness::new();
    let lifecycle = DisputeLifecycle::new(
        harness.disputes.clone(),
        Arc::new(OfflineRoster),
        harness.directory.clone(),
        harness.dispatcher(),
    );

    let created = lifecycle
        .create(
            UserId("owner-1".to_string()),
            intake("tenant-1", DisputeCategory::Payment),
        )
        .expect("create still succeeds");

    assert_eq!(created.assigned_agent, None);
    assert_eq!(created.dispute.status, DisputeStatus::Open);
}

#[test]
fn escalation_raises_priority_and_alerts_administrators() {
    let harness = Harness::new();
    harness
        .directory
        .add_administrator(UserId("admin-1".to_string()));
    let lifecycle = harness.dispute_lifecycle(MemoryMediationRoster::with_agent(agent("agt-1")));
    let created = lifecycle
        .create(
            UserId("owner-1".to_string()),
            intake("tenant-1", DisputeCategory::Payment),
        )
        .expect("create succeeds");

    let updated = lifecycle
        .escalate(
            &created.dispute.id,
            "Aucune réponse du mis en cause",
            &caller("agt-1", UserRole::Agent),
        )
        .expect("escalate succeeds");

    assert_eq!(updated.status, DisputeStatus::Escalated);
    assert_eq!(updated.priority, DisputePriority::Urgent);
    assert!(updated.escalated_at.is_some());

    let messages = harness.disputes.messages_for(&updated.id);
    assert_eq!(messages.len(), 3);
    let internal: Vec<_> = messages.iter().filter(|m| m.internal).collect();
    assert_eq!(internal.len(), 1);
    assert_eq!(internal[0].role, SenderRole::Mediator);
    assert!(internal[0].body.contains("Aucune réponse"));

    let admin_notes = harness
        .notifications
        .for_recipient(&UserId("admin-1".to_string()));
    assert_eq!(admin_notes.len(), 1);
    assert!(admin_notes[0].message.contains(&updated.number));
}

#[test]
fn only_mediation_roles_or_the_assigned_agent_may_transition() {
    let harness = Harness::new();
    let lifecycle = harness.dispute_lifecycle(MemoryMediationRoster::with_agent(agent("agt-1")));
    let created = lifecycle
        .create(
            UserId("owner-1".to_string()),
            intake("tenant-1", DisputeCategory::Payment),
        )
        .expect("create succeeds");
    let id = &created.dispute.id;

    for denied in [
        caller("tenant-1", UserRole::Tenant),
        caller("owner-1", UserRole::Owner),
        caller("agt-2", UserRole::Agent),
    ] {
        let err = lifecycle
            .escalate(id, "motif", &denied)
            .expect_err("transition denied");
        assert!(matches!(err, DisputeError::PermissionDenied));
    }

    // Trust agents pass without being assigned.
    lifecycle
        .escalate(id, "motif", &caller("trust-1", UserRole::TrustAgent))
        .expect("trust agent may escalate");
}

#[test]
fn unknown_dispute_is_reported_as_missing() {
    let harness = Harness::new();
    let lifecycle = harness.dispute_lifecycle(MemoryMediationRoster::default());

    let err = lifecycle
        .escalate(
            &DisputeId("dsp-missing".to_string()),
            "motif",
            &caller("admin-1", UserRole::Administrator),
        )
        .expect_err("escalate fails");
    assert!(matches!(err, DisputeError::NotFound));
}

#[test]
fn resolution_closes_the_case_and_notifies_both_parties() {
    let harness = Harness::new();
    let lifecycle = harness.dispute_lifecycle(MemoryMediationRoster::default());
    let created = lifecycle
        .create(
            UserId("owner-1".to_string()),
            intake("tenant-1", DisputeCategory::Deposit),
        )
        .expect("create succeeds");

    let updated = lifecycle
        .resolve(
            &created.dispute.id,
            "Restitution partielle de la caution",
            ResolutionType::Compromise,
            &caller("admin-1", UserRole::Administrator),
        )
        .expect("resolve succeeds");

    assert_eq!(updated.status, DisputeStatus::Resolved);
    assert!(updated.resolved_at.is_some());
    assert_eq!(
        updated.resolution.as_deref(),
        Some("Restitution partielle de la caution")
    );
    assert_eq!(updated.resolution_type, Some(ResolutionType::Compromise));

    let messages = harness.disputes.messages_for(&updated.id);
    let closing = messages.last().expect("closing message");
    assert!(closing.body.contains("compromis"));

    for party in ["owner-1", "tenant-1"] {
        let notes = harness
            .notifications
            .for_recipient(&UserId(party.to_string()));
        assert!(
            notes.iter().any(|n| n.title == "Litige résolu"),
            "{party} should be notified"
        );
    }
}

#[test]
fn resolution_requires_a_written_decision() {
    let harness = Harness::new();
    let lifecycle = harness.dispute_lifecycle(MemoryMediationRoster::default());
    let created = lifecycle
        .create(
            UserId("owner-1".to_string()),
            intake("tenant-1", DisputeCategory::Payment),
        )
        .expect("create succeeds");

    let err = lifecycle
        .resolve(
            &created.dispute.id,
            "  ",
            ResolutionType::Withdrawn,
            &caller("admin-1", UserRole::Administrator),
        )
        .expect_err("blank resolution rejected");
    assert!(matches!(err, DisputeError::InvalidInput(_)));
}

#[test]
fn resolved_is_terminal() {
    let harness = Harness::new();
    let lifecycle = harness.dispute_lifecycle(MemoryMediationRoster::default());
    let admin = caller("admin-1", UserRole::Administrator);
    let created = lifecycle
        .create(
            UserId("owner-1".to_string()),
            intake("tenant-1", DisputeCategory::Payment),
        )
        .expect("create succeeds");
    let id = &created.dispute.id;

    lifecycle
        .resolve(id, "Classé sans suite", ResolutionType::Withdrawn, &admin)
        .expect("resolve succeeds");

    let err = lifecycle
        .escalate(id, "motif", &admin)
        .expect_err("escalating a closed case fails");
    assert!(matches!(
        err,
        DisputeError::InvalidTransition {
            from: DisputeStatus::Resolved
        }
    ));

    let err = lifecycle
        .resolve(id, "encore", ResolutionType::Compromise, &admin)
        .expect_err("resolving twice fails");
    assert!(matches!(err, DisputeError::InvalidTransition { .. }));
}

#[test]
fn escalated_cases_can_still_be_resolved() {
    let harness = Harness::new();
    let lifecycle = harness.dispute_lifecycle(MemoryMediationRoster::default());
    let admin = caller("admin-1", UserRole::Administrator);
    let created = lifecycle
        .create(
            UserId("owner-1".to_string()),
            intake("tenant-1", DisputeCategory::Payment),
        )
        .expect("create succeeds");
    let id = &created.dispute.id;

    lifecycle.escalate(id, "motif", &admin).expect("escalates");
    let updated = lifecycle
        .resolve(id, "Décision rendue", ResolutionType::FavorComplainant, &admin)
        .expect("resolve succeeds");

    assert_eq!(updated.status, DisputeStatus::Resolved);
    // Escalation's priority bump survives the close.
    assert_eq!(updated.priority, DisputePriority::Urgent);
}

#[test]
fn stale_status_loses_the_conditional_update() {
    let harness = Harness::new();
    let lifecycle = harness.dispute_lifecycle(MemoryMediationRoster::default());
    let admin = caller("admin-1", UserRole::Administrator);
    let created = lifecycle
        .create(
            UserId("owner-1".to_string()),
            intake("tenant-1", DisputeCategory::Payment),
        )
        .expect("create succeeds");
    let id = &created.dispute.id;

    lifecycle.escalate(id, "motif", &admin).expect("escalates");

    // A writer still holding the open snapshot must not clobber the
    // escalation.
    let err = harness
        .disputes
        .transition(
            id,
            DisputeStatus::Open,
            DisputeStatus::Resolved,
            DisputeTransition::default(),
        )
        .expect_err("stale write rejected");
    assert!(matches!(err, StoreError::Conflict));
}

use std::sync::Arc;

use super::common::Harness;
use crate::workflows::dispatch::{Delivery, NotificationDispatcher};
use crate::workflows::domain::{NotificationKind, Severity, UserId};
use crate::workflows::repository::{NotificationStore, StoreError};

fn delivery(recipient: &str) -> Delivery {
    Delivery::new(
        UserId(recipient.to_string()),
        "Titre",
        "Corps du message",
        NotificationKind::PaymentReminder,
        Severity::Info,
    )
}

#[test]
fn in_app_only_delivery_never_touches_the_sms_gateway() {
    let harness = Harness::new();

    let report = harness
        .dispatcher()
        .deliver(delivery("user-1"))
        .expect("delivery succeeds");

    assert!(!report.sms_attempted);
    assert!(!report.sms_failed());
    assert_eq!(harness.notifications.all().len(), 1);
    assert!(harness.sms.sent().is_empty());
}

#[test]
fn sms_mirror_carries_the_notification_body() {
    let harness = Harness::new();

    let report = harness
        .dispatcher()
        .deliver(delivery("user-1").via_sms())
        .expect("delivery succeeds");

    assert!(report.sms_attempted);
    assert!(report.sms_delivered);
    let sent = harness.sms.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, UserId("user-1".to_string()));
    assert_eq!(sent[0].1, "Corps du message");
}

#[test]
fn sms_outage_degrades_the_report_but_keeps_the_notification() {
    let harness = Harness::new();
    harness.sms.set_failing(true);

    let report = harness
        .dispatcher()
        .deliver(delivery("user-1").via_sms())
        .expect("delivery still succeeds");

    assert!(report.sms_failed());
    assert_eq!(harness.notifications.all().len(), 1);
}

#[test]
fn builder_fields_land_on_the_stored_notification() {
    let harness = Harness::new();

    harness
        .dispatcher()
        .deliver(
            delivery("user-1")
                .with_link("/contrats/bail-1")
                .with_metadata("leaseId", "bail-1"),
        )
        .expect("delivery succeeds");

    let note = &harness.notifications.all()[0];
    assert_eq!(note.action_link.as_deref(), Some("/contrats/bail-1"));
    assert_eq!(note.metadata.get("leaseId").map(String::as_str), Some("bail-1"));
    assert!(!note.read);
}

struct RejectingStore;

impl NotificationStore for RejectingStore {
    fn insert(&self, _notification: crate::workflows::domain::Notification) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("notifications offline".to_string()))
    }

    fn unread_count_since(
        &self,
        _user: &UserId,
        _cutoff: chrono::DateTime<chrono::Utc>,
    ) -> Result<u32, StoreError> {
        Ok(0)
    }
}

#[test]
fn notification_insert_failure_propagates() {
    let harness = Harness::new();
    let dispatcher = NotificationDispatcher::new(Arc::new(RejectingStore), harness.sms.clone());

    let err = dispatcher
        .deliver(delivery("user-1").via_sms())
        .expect_err("delivery fails");

    assert!(matches!(err, StoreError::Unavailable(_)));
    // The authoritative insert gates the SMS leg.
    assert!(harness.sms.sent().is_empty());
}

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::warn;

use super::domain::{Notification, NotificationKind, Severity, UserId};
use super::repository::{NotificationStore, SmsGateway, StoreError};

/// One outbound message: an in-app notification, optionally mirrored to SMS.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub recipient: UserId,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub severity: Severity,
    pub action_link: Option<String>,
    pub metadata: BTreeMap<String, String>,
    pub sms: bool,
}

impl Delivery {
    pub fn new(
        recipient: UserId,
        title: impl Into<String>,
        message: impl Into<String>,
        kind: NotificationKind,
        severity: Severity,
    ) -> Self {
        Self {
            recipient,
            title: title.into(),
            message: message.into(),
            kind,
            severity,
            action_link: None,
            metadata: BTreeMap::new(),
            sms: false,
        }
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.action_link = Some(link.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn via_sms(mut self) -> Self {
        self.sms = true;
        self
    }
}

/// Outcome of one delivery; an SMS failure is reported here, not raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub sms_attempted: bool,
    pub sms_delivered: bool,
}

impl DeliveryReport {
    pub fn sms_failed(&self) -> bool {
        self.sms_attempted && !self.sms_delivered
    }
}

/// Every component funnels its notification fan-out through this one type so
/// failure isolation for the outbound leg is written once. The notification
/// insert is authoritative and its failure propagates; the SMS leg is best
/// effort and only degrades the report.
pub struct NotificationDispatcher<N, S> {
    notifications: Arc<N>,
    sms: Arc<S>,
}

impl<N, S> NotificationDispatcher<N, S>
where
    N: NotificationStore,
    S: SmsGateway,
{
    pub fn new(notifications: Arc<N>, sms: Arc<S>) -> Self {
        Self { notifications, sms }
    }

    pub fn deliver(&self, delivery: Delivery) -> Result<DeliveryReport, StoreError> {
        let Delivery {
            recipient,
            title,
            message,
            kind,
            severity,
            action_link,
            metadata,
            sms,
        } = delivery;

        self.notifications.insert(Notification {
            recipient: recipient.clone(),
            title,
            message: message.clone(),
            kind,
            severity,
            action_link,
            metadata,
            read: false,
            created_at: Utc::now(),
        })?;

        let mut report = DeliveryReport {
            sms_attempted: sms,
            sms_delivered: false,
        };

        if sms {
            match self.sms.send(&recipient, &message) {
                Ok(()) => report.sms_delivered = true,
                Err(err) => {
                    warn!(recipient = %recipient.0, %err, "sms delivery failed");
                }
            }
        }

        Ok(report)
    }
}

//! Policy engine behind the Mon Toit rental marketplace: late-payment
//! penalties and legal escalation, ghost-tenant detection, graduated payment
//! reminders, dispute mediation lifecycle, and agency commission settlement.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;

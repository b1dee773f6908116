use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use chrono::Local;
use serde::Deserialize;
use serde_json::json;

use super::commission::{CommissionError, CommissionSettlement};
use super::delinquency::DelinquencyScanner;
use super::disputes::{DisputeError, DisputeIntake, DisputeLifecycle};
use super::domain::{
    AgencyId, AgentId, Caller, DisputeCategory, DisputeId, LeaseId, PropertyId, ResolutionType,
    UserId,
};
use super::ghost::GhostTenantDetector;
use super::reminders::ReminderScheduler;
use super::repository::{
    ActivityLog, AuthVerifier, CommissionLedger, DelinquencyLedger, DisputeStore, LeaseStore,
    MandateRegistry, MediationRoster, NotificationStore, OwnerSettings, PaymentLedger,
    ReminderLedger, RoleDirectory, SmsGateway,
};

/// Empty response for the transport-level preflight probe every endpoint
/// accepts ahead of the real call.
async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

fn scan_failure(err: impl std::fmt::Display) -> Response {
    let payload = json!({ "success": false, "error": err.to_string() });
    (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
}

fn bad_request(message: impl std::fmt::Display) -> Response {
    let payload = json!({ "success": false, "error": message.to_string() });
    (StatusCode::BAD_REQUEST, Json(payload)).into_response()
}

/// Routes for the three scheduled scanners.
pub fn scan_router<L, D, O, RL, P, N, S>(
    delinquency: Arc<DelinquencyScanner<L, D, O, N, S>>,
    ghost: Arc<GhostTenantDetector<L, D, RL, N, S>>,
    reminders: Arc<ReminderScheduler<L, RL, P, N, S>>,
) -> Router
where
    L: LeaseStore + 'static,
    D: DelinquencyLedger + 'static,
    O: OwnerSettings + 'static,
    RL: ReminderLedger + 'static,
    P: PaymentLedger + 'static,
    N: NotificationStore + 'static,
    S: SmsGateway + 'static,
{
    Router::new()
        .route(
            "/api/v1/scans/delinquency",
            post(delinquency_handler::<L, D, O, N, S>).options(preflight),
        )
        .with_state(delinquency)
        .merge(
            Router::new()
                .route(
                    "/api/v1/scans/ghost-tenants",
                    post(ghost_handler::<L, D, RL, N, S>).options(preflight),
                )
                .with_state(ghost),
        )
        .merge(
            Router::new()
                .route(
                    "/api/v1/scans/reminders",
                    post(reminder_handler::<L, RL, P, N, S>).options(preflight),
                )
                .with_state(reminders),
        )
}

pub(crate) async fn delinquency_handler<L, D, O, N, S>(
    State(scanner): State<Arc<DelinquencyScanner<L, D, O, N, S>>>,
) -> Response
where
    L: LeaseStore + 'static,
    D: DelinquencyLedger + 'static,
    O: OwnerSettings + 'static,
    N: NotificationStore + 'static,
    S: SmsGateway + 'static,
{
    let today = Local::now().date_naive();
    match scanner.run(today) {
        Ok(summary) => {
            let payload = json!({
                "success": true,
                "processed": summary.processed,
                "errors": summary.errors,
                "details": summary.details,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => scan_failure(err),
    }
}

pub(crate) async fn ghost_handler<L, D, RL, N, S>(
    State(detector): State<Arc<GhostTenantDetector<L, D, RL, N, S>>>,
) -> Response
where
    L: LeaseStore + 'static,
    D: DelinquencyLedger + 'static,
    RL: ReminderLedger + 'static,
    N: NotificationStore + 'static,
    S: SmsGateway + 'static,
{
    let today = Local::now().date_naive();
    match detector.run(today) {
        Ok(summary) => {
            let payload = json!({
                "success": true,
                "ghostTenantsDetected": summary.ghost_tenants_detected,
                "errors": summary.errors,
                "details": summary.details,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => scan_failure(err),
    }
}

pub(crate) async fn reminder_handler<L, RL, P, N, S>(
    State(scheduler): State<Arc<ReminderScheduler<L, RL, P, N, S>>>,
) -> Response
where
    L: LeaseStore + 'static,
    RL: ReminderLedger + 'static,
    P: PaymentLedger + 'static,
    N: NotificationStore + 'static,
    S: SmsGateway + 'static,
{
    let today = Local::now().date_naive();
    match scheduler.run(today) {
        Ok(summary) => {
            let payload = json!({
                "success": true,
                "date": summary.date,
                "results": summary.results,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => scan_failure(err),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SettleCommissionRequest {
    pub(crate) lease_id: String,
    pub(crate) agent_id: String,
    pub(crate) agency_id: String,
}

/// Route for the lease-signature settlement event.
pub fn commission_router<L, M, C, A>(service: Arc<CommissionSettlement<L, M, C, A>>) -> Router
where
    L: LeaseStore + 'static,
    M: MandateRegistry + 'static,
    C: CommissionLedger + 'static,
    A: ActivityLog + 'static,
{
    Router::new()
        .route(
            "/api/v1/commissions/settle",
            post(settle_handler::<L, M, C, A>).options(preflight),
        )
        .with_state(service)
}

pub(crate) async fn settle_handler<L, M, C, A>(
    State(service): State<Arc<CommissionSettlement<L, M, C, A>>>,
    body: Result<Json<SettleCommissionRequest>, JsonRejection>,
) -> Response
where
    L: LeaseStore + 'static,
    M: MandateRegistry + 'static,
    C: CommissionLedger + 'static,
    A: ActivityLog + 'static,
{
    let Json(request) = match body {
        Ok(json) => json,
        Err(rejection) => return bad_request(rejection.body_text()),
    };

    let today = Local::now().date_naive();
    match service.settle(
        &LeaseId(request.lease_id),
        &AgentId(request.agent_id),
        &AgencyId(request.agency_id),
        today,
    ) {
        Ok(outcome) => {
            let payload = json!({
                "success": true,
                "transaction": outcome.transaction,
                "summary": outcome.summary,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(CommissionError::LeaseNotFound) => {
            let payload = json!({ "success": false, "error": "lease not found" });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
        Err(err) => scan_failure(err),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateDisputeRequest {
    pub(crate) respondent_id: String,
    #[serde(default)]
    pub(crate) property_id: Option<String>,
    #[serde(default)]
    pub(crate) contract_id: Option<String>,
    #[serde(default)]
    pub(crate) intervention_id: Option<String>,
    pub(crate) category: DisputeCategory,
    pub(crate) subject: String,
    pub(crate) description: String,
    #[serde(default)]
    pub(crate) evidence: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EscalateDisputeRequest {
    pub(crate) dispute_id: String,
    pub(crate) reason: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ResolveDisputeRequest {
    pub(crate) dispute_id: String,
    pub(crate) resolution: String,
    pub(crate) resolution_type: ResolutionType,
}

/// State shared by the authenticated dispute routes.
pub struct DisputeRoutes<D, M, R, N, S, V> {
    pub lifecycle: Arc<DisputeLifecycle<D, M, R, N, S>>,
    pub auth: Arc<V>,
}

impl<D, M, R, N, S, V> Clone for DisputeRoutes<D, M, R, N, S, V> {
    fn clone(&self) -> Self {
        Self {
            lifecycle: self.lifecycle.clone(),
            auth: self.auth.clone(),
        }
    }
}

/// Routes for the user-driven dispute lifecycle.
pub fn dispute_router<D, M, R, N, S, V>(state: DisputeRoutes<D, M, R, N, S, V>) -> Router
where
    D: DisputeStore + 'static,
    M: MediationRoster + 'static,
    R: RoleDirectory + 'static,
    N: NotificationStore + 'static,
    S: SmsGateway + 'static,
    V: AuthVerifier + 'static,
{
    Router::new()
        .route(
            "/api/v1/disputes",
            post(create_dispute_handler::<D, M, R, N, S, V>).options(preflight),
        )
        .route(
            "/api/v1/disputes/escalate",
            post(escalate_dispute_handler::<D, M, R, N, S, V>).options(preflight),
        )
        .route(
            "/api/v1/disputes/resolve",
            post(resolve_dispute_handler::<D, M, R, N, S, V>).options(preflight),
        )
        .with_state(state)
}

fn authenticate<V: AuthVerifier>(auth: &V, headers: &HeaderMap) -> Result<Caller, Response> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    match token {
        Some(token) => auth.verify(token).map_err(|err| {
            let payload = json!({ "success": false, "error": err.to_string() });
            (StatusCode::UNAUTHORIZED, Json(payload)).into_response()
        }),
        None => {
            let payload = json!({ "success": false, "error": "missing bearer token" });
            Err((StatusCode::UNAUTHORIZED, Json(payload)).into_response())
        }
    }
}

fn dispute_failure(err: DisputeError) -> Response {
    let status = match err {
        DisputeError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        DisputeError::PermissionDenied => StatusCode::FORBIDDEN,
        DisputeError::NotFound => StatusCode::NOT_FOUND,
        DisputeError::Conflict | DisputeError::InvalidTransition { .. } => StatusCode::CONFLICT,
        DisputeError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({ "success": false, "error": err.to_string() });
    (status, Json(payload)).into_response()
}

pub(crate) async fn create_dispute_handler<D, M, R, N, S, V>(
    State(state): State<DisputeRoutes<D, M, R, N, S, V>>,
    headers: HeaderMap,
    body: Result<Json<CreateDisputeRequest>, JsonRejection>,
) -> Response
where
    D: DisputeStore + 'static,
    M: MediationRoster + 'static,
    R: RoleDirectory + 'static,
    N: NotificationStore + 'static,
    S: SmsGateway + 'static,
    V: AuthVerifier + 'static,
{
    let caller = match authenticate(state.auth.as_ref(), &headers) {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    let Json(request) = match body {
        Ok(json) => json,
        Err(rejection) => return bad_request(rejection.body_text()),
    };

    let intake = DisputeIntake {
        respondent: UserId(request.respondent_id),
        property: request.property_id.map(PropertyId),
        contract: request.contract_id.map(LeaseId),
        intervention: request.intervention_id,
        category: request.category,
        subject: request.subject,
        description: request.description,
        evidence: request.evidence,
    };

    match state.lifecycle.create(caller.user, intake) {
        Ok(created) => {
            let payload = json!({
                "success": true,
                "dispute": created.dispute,
                "assignedAgentId": created.assigned_agent,
            });
            (StatusCode::CREATED, Json(payload)).into_response()
        }
        Err(err) => dispute_failure(err),
    }
}

pub(crate) async fn escalate_dispute_handler<D, M, R, N, S, V>(
    State(state): State<DisputeRoutes<D, M, R, N, S, V>>,
    headers: HeaderMap,
    body: Result<Json<EscalateDisputeRequest>, JsonRejection>,
) -> Response
where
    D: DisputeStore + 'static,
    M: MediationRoster + 'static,
    R: RoleDirectory + 'static,
    N: NotificationStore + 'static,
    S: SmsGateway + 'static,
    V: AuthVerifier + 'static,
{
    let caller = match authenticate(state.auth.as_ref(), &headers) {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    let Json(request) = match body {
        Ok(json) => json,
        Err(rejection) => return bad_request(rejection.body_text()),
    };
    if request.reason.trim().is_empty() {
        return bad_request("reason is required");
    }

    match state
        .lifecycle
        .escalate(&DisputeId(request.dispute_id), &request.reason, &caller)
    {
        Ok(dispute) => {
            let payload = json!({ "success": true, "dispute": dispute });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => dispute_failure(err),
    }
}

pub(crate) async fn resolve_dispute_handler<D, M, R, N, S, V>(
    State(state): State<DisputeRoutes<D, M, R, N, S, V>>,
    headers: HeaderMap,
    body: Result<Json<ResolveDisputeRequest>, JsonRejection>,
) -> Response
where
    D: DisputeStore + 'static,
    M: MediationRoster + 'static,
    R: RoleDirectory + 'static,
    N: NotificationStore + 'static,
    S: SmsGateway + 'static,
    V: AuthVerifier + 'static,
{
    let caller = match authenticate(state.auth.as_ref(), &headers) {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    let Json(request) = match body {
        Ok(json) => json,
        Err(rejection) => return bad_request(rejection.body_text()),
    };

    match state.lifecycle.resolve(
        &DisputeId(request.dispute_id),
        &request.resolution,
        request.resolution_type,
        &caller,
    ) {
        Ok(dispute) => {
            let payload = json!({ "success": true, "dispute": dispute });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => dispute_failure(err),
    }
}

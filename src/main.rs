use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use chrono::{Duration, Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusHandle;
use mon_toit_engine::config::AppConfig;
use mon_toit_engine::error::AppError;
use mon_toit_engine::telemetry;
use mon_toit_engine::workflows::memory::{
    MemoryActivityLog, MemoryCommissionLedger, MemoryDelinquencyLedger, MemoryDisputeStore,
    MemoryLeaseStore, MemoryMandateRegistry, MemoryMediationRoster, MemoryNotificationStore,
    MemoryOwnerSettings, MemoryPaymentLedger, MemoryReminderLedger, MemoryRoleDirectory,
    MemorySmsGateway, StaticAuthVerifier,
};
use mon_toit_engine::workflows::{
    commission_router, dispute_router, scan_router, AgentId, Caller, CommissionSettlement,
    DelinquencyScanner, DelinquencySummary, DisputeLifecycle, DisputeRoutes, GhostSummary,
    GhostTenantDetector, Lease, LeaseId, LeaseStatus, NotificationDispatcher, PropertyId,
    ReminderScheduler, ReminderSummary, UserId, UserRole,
};
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
struct AppState {
    readiness: Arc<AtomicBool>,
    metrics: PrometheusHandle,
}

#[derive(Parser, Debug)]
#[command(
    name = "Mon Toit Delinquency Engine",
    about = "Run the Mon Toit lease delinquency and dispute engine",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Run one scanner pass against the demo portfolio and print a summary
    Scan {
        #[command(subcommand)]
        command: ScanCommand,
    },
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Subcommand, Debug)]
enum ScanCommand {
    /// Apply late-payment penalties and legal escalation
    Delinquency(ScanArgs),
    /// Flag unresponsive delinquent tenants
    Ghost(ScanArgs),
    /// Send graduated rent reminders
    Reminders(ScanArgs),
}

#[derive(Args, Debug, Default)]
struct ScanArgs {
    /// Evaluation date (YYYY-MM-DD, defaults to today)
    #[arg(long, value_parser = parse_date)]
    today: Option<NaiveDate>,
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::Scan { command } => run_scan(command),
    }
}

type Dispatcher = NotificationDispatcher<MemoryNotificationStore, MemorySmsGateway>;
type Delinquency = DelinquencyScanner<
    MemoryLeaseStore,
    MemoryDelinquencyLedger,
    MemoryOwnerSettings,
    MemoryNotificationStore,
    MemorySmsGateway,
>;
type Ghost = GhostTenantDetector<
    MemoryLeaseStore,
    MemoryDelinquencyLedger,
    MemoryReminderLedger,
    MemoryNotificationStore,
    MemorySmsGateway,
>;
type Reminders = ReminderScheduler<
    MemoryLeaseStore,
    MemoryReminderLedger,
    MemoryPaymentLedger,
    MemoryNotificationStore,
    MemorySmsGateway,
>;
type Commission = CommissionSettlement<
    MemoryLeaseStore,
    MemoryMandateRegistry,
    MemoryCommissionLedger,
    MemoryActivityLog,
>;
type Disputes = DisputeLifecycle<
    MemoryDisputeStore,
    MemoryMediationRoster,
    MemoryRoleDirectory,
    MemoryNotificationStore,
    MemorySmsGateway,
>;

/// Engine wired against the in-memory reference stores, seeded with a demo
/// portfolio. Production deployments substitute adapters over the managed
/// database and messaging providers.
struct Engine {
    delinquency: Arc<Delinquency>,
    ghost: Arc<Ghost>,
    reminders: Arc<Reminders>,
    commission: Arc<Commission>,
    disputes: DisputeRoutes<
        MemoryDisputeStore,
        MemoryMediationRoster,
        MemoryRoleDirectory,
        MemoryNotificationStore,
        MemorySmsGateway,
        StaticAuthVerifier,
    >,
}

fn build_engine(today: NaiveDate) -> Engine {
    let config = mon_toit_engine::config::PolicyConfig::default();

    let leases = Arc::new(MemoryLeaseStore::default());
    let delinquency_ledger = Arc::new(MemoryDelinquencyLedger::default());
    let reminder_ledger = Arc::new(MemoryReminderLedger::default());
    let payments = Arc::new(MemoryPaymentLedger::default());
    let notifications = Arc::new(MemoryNotificationStore::default());
    let sms = Arc::new(MemorySmsGateway::default());
    let settings = Arc::new(MemoryOwnerSettings::default());
    let dispute_store = Arc::new(MemoryDisputeStore::default());
    let roster = Arc::new(MemoryMediationRoster::with_agent(AgentId(
        "agent-mediator-1".to_string(),
    )));
    let directory = Arc::new(MemoryRoleDirectory::default());
    let mandates = Arc::new(MemoryMandateRegistry::default());
    let commissions = Arc::new(MemoryCommissionLedger::default());
    let activity = Arc::new(MemoryActivityLog::default());
    let auth = Arc::new(StaticAuthVerifier::default());

    directory.add_administrator(UserId("admin-1".to_string()));
    auth.grant(
        "demo-admin",
        Caller {
            user: UserId("admin-1".to_string()),
            role: UserRole::Administrator,
        },
    );
    auth.grant(
        "demo-tenant",
        Caller {
            user: UserId("tenant-kouassi".to_string()),
            role: UserRole::Tenant,
        },
    );

    seed_demo_portfolio(&leases, today);

    let dispatcher = Arc::new(Dispatcher::new(notifications.clone(), sms.clone()));

    Engine {
        delinquency: Arc::new(DelinquencyScanner::new(
            leases.clone(),
            delinquency_ledger.clone(),
            settings,
            dispatcher.clone(),
            config.clone(),
        )),
        ghost: Arc::new(GhostTenantDetector::new(
            leases.clone(),
            delinquency_ledger,
            reminder_ledger.clone(),
            notifications.clone(),
            dispatcher.clone(),
            config.clone(),
        )),
        reminders: Arc::new(ReminderScheduler::new(
            leases.clone(),
            reminder_ledger,
            payments,
            dispatcher.clone(),
            config.clone(),
        )),
        commission: Arc::new(CommissionSettlement::new(
            leases,
            mandates,
            commissions,
            activity,
            config,
        )),
        disputes: DisputeRoutes {
            lifecycle: Arc::new(DisputeLifecycle::new(
                dispute_store,
                roster,
                directory,
                dispatcher,
            )),
            auth,
        },
    }
}

fn seed_demo_portfolio(leases: &MemoryLeaseStore, today: NaiveDate) {
    let demo = [
        ("bail-cocody-12", "tenant-kouassi", "owner-yao", 200_000u64, 10i64),
        ("bail-plateau-03", "tenant-brou", "owner-yao", 350_000, 16),
        ("bail-yopougon-27", "tenant-aka", "owner-diabate", 150_000, 0),
    ];

    for (id, tenant, owner, rent, days_overdue) in demo {
        leases.put(Lease {
            id: LeaseId(id.to_string()),
            tenant: UserId(tenant.to_string()),
            owner: UserId(owner.to_string()),
            property: PropertyId(format!("prop-{id}")),
            monthly_rent: rent,
            next_due_date: today - Duration::days(days_overdue),
            payment_day: Some(5),
            penalty_rate_percent: None,
            penalty_cap_percent: None,
            grace_period_days: None,
            legal_action_started: false,
            legal_action_at: None,
            ghost_tenant_detected: false,
            status: LeaseStatus::Active,
        });
    }
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness_flag.clone(),
        metrics: prometheus_handle,
    };

    let engine = build_engine(Local::now().date_naive());

    let app = Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
        .merge(scan_router(
            engine.delinquency,
            engine.ghost,
            engine.reminders,
        ))
        .merge(commission_router(engine.commission))
        .merge(dispute_router(engine.disputes))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "delinquency engine ready");

    axum::serve(listener, app).await?;
    Ok(())
}

fn run_scan(command: ScanCommand) -> Result<(), AppError> {
    let (args, label) = match &command {
        ScanCommand::Delinquency(args) => (args, "delinquency"),
        ScanCommand::Ghost(args) => (args, "ghost-tenant"),
        ScanCommand::Reminders(args) => (args, "reminder"),
    };
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());
    let engine = build_engine(today);

    println!("Mon Toit {label} scan (demo portfolio), evaluated {today}");

    match command {
        ScanCommand::Delinquency(_) => {
            let summary = engine.delinquency.run(today).map_err(AppError::from)?;
            render_delinquency(&summary);
        }
        ScanCommand::Ghost(_) => {
            let summary = engine.ghost.run(today).map_err(AppError::from)?;
            render_ghost(&summary);
        }
        ScanCommand::Reminders(_) => {
            let summary = engine.reminders.run(today).map_err(AppError::from)?;
            render_reminders(&summary);
        }
    }

    Ok(())
}

fn render_delinquency(summary: &DelinquencySummary) {
    println!(
        "Processed {} delinquent leases ({} errors)",
        summary.processed, summary.errors
    );
    for detail in &summary.details {
        println!(
            "- {} | {} days late | penalty {} FCFA | legal action: {}",
            detail.lease_id.0,
            detail.days_late,
            detail.penalty,
            if detail.legal_action { "yes" } else { "no" }
        );
    }
}

fn render_ghost(summary: &GhostSummary) {
    println!(
        "Flagged {} ghost tenants ({} errors)",
        summary.ghost_tenants_detected, summary.errors
    );
    for detail in &summary.details {
        println!(
            "- {} | tenant {} | {} days late | {} unread / {} unopened",
            detail.lease_id.0,
            detail.tenant_id.0,
            detail.days_late,
            detail.unread_notifications,
            detail.unopened_reminders
        );
    }
}

fn render_reminders(summary: &ReminderSummary) {
    println!(
        "Reminders for {}: {} upcoming, {} due today, {} overdue ({} errors)",
        summary.date,
        summary.results.upcoming,
        summary.results.due_today,
        summary.results.overdue,
        summary.results.errors
    );
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub policy: PolicyConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            policy: PolicyConfig::default(),
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Business thresholds for the delinquency, ghost-tenant, reminder, and
/// commission policies.
///
/// The historical defaults were hardcoded per handler; they live here so a
/// deployment (or a test) can override one threshold without touching the
/// others. All monetary rates are whole percents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyConfig {
    /// Days of lateness tolerated before any penalty accrues.
    pub grace_period_days: u32,
    /// Penalty accrued per late day past the grace period, percent of rent.
    pub penalty_rate_percent: u32,
    /// Ceiling on the accumulated penalty, percent of rent.
    pub penalty_cap_percent: u32,
    /// Lateness at which legal escalation is even considered.
    pub legal_review_gate_days: u32,
    /// Fallback auto-engage threshold when the owner has no setting.
    pub default_auto_engage_days: u32,
    /// Lateness at which a lease enters the ghost-detection scope.
    pub ghost_scope_days_late: u32,
    /// Unread notifications (7-day window) that classify a tenant as ghost.
    pub ghost_unread_notifications: u32,
    /// Unopened reminders (all time) that classify a tenant as ghost.
    pub ghost_unopened_reminders: u32,
    /// Days of notification history inspected by the ghost detector.
    pub ghost_lookback_days: u32,
    /// Day of month rent falls due when the lease does not specify one.
    pub default_payment_day: u32,
    /// Mandate commission rate fallback, percent of rent.
    pub default_commission_rate_percent: u32,
    /// Agent share of the gross commission fallback, percent.
    pub default_agent_split_percent: u32,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            grace_period_days: 4,
            penalty_rate_percent: 5,
            penalty_cap_percent: 50,
            legal_review_gate_days: 15,
            default_auto_engage_days: 15,
            ghost_scope_days_late: 10,
            ghost_unread_notifications: 8,
            ghost_unopened_reminders: 3,
            ghost_lookback_days: 7,
            default_payment_day: 5,
            default_commission_rate_percent: 10,
            default_agent_split_percent: 50,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        env::remove_var("APP_ENV");
        env::remove_var("APP_HOST");
        env::remove_var("APP_PORT");
        env::remove_var("APP_LOG_LEVEL");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
    }

    #[test]
    fn policy_defaults_match_platform_rules() {
        let policy = PolicyConfig::default();
        assert_eq!(policy.grace_period_days, 4);
        assert_eq!(policy.penalty_rate_percent, 5);
        assert_eq!(policy.penalty_cap_percent, 50);
        assert_eq!(policy.legal_review_gate_days, 15);
        assert_eq!(policy.ghost_unread_notifications, 8);
        assert_eq!(policy.ghost_unopened_reminders, 3);
        assert_eq!(policy.default_payment_day, 5);
    }
}

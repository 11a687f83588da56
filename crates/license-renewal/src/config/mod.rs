use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Distinguishes runtime behavior for different stages of the application.
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
    pub storage: StorageConfig,
    pub simulation: SimulationConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let data_dir = env::var("RENEWAL_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));

        let payment_delay = delay_from_env("RENEWAL_PAYMENT_DELAY_MS", 1500)?;
        let verification_delay = delay_from_env("RENEWAL_VERIFICATION_DELAY_MS", 2000)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            storage: StorageConfig { data_dir },
            simulation: SimulationConfig {
                payment_delay,
                verification_delay,
            },
            telemetry: TelemetryConfig { log_level },
        })
    }
}

fn delay_from_env(var: &'static str, default_ms: u64) -> Result<Duration, ConfigError> {
    match env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|source| ConfigError::InvalidDelay { var, source }),
        Err(_) => Ok(Duration::from_millis(default_ms)),
    }
}

/// Where workflow records are kept on disk.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

/// Fixed delays used by the simulated payment and verification collaborators.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub payment_delay: Duration,
    pub verification_delay: Duration,
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidDelay {
        var: &'static str,
        source: std::num::ParseIntError,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidDelay { var, .. } => {
                write!(f, "{var} must be a whole number of milliseconds")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidDelay { source, .. } => Some(source),
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
        env::remove_var("APP_LOG_LEVEL");
        env::remove_var("RENEWAL_DATA_DIR");
        env::remove_var("RENEWAL_PAYMENT_DELAY_MS");
        env::remove_var("RENEWAL_VERIFICATION_DELAY_MS");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.storage.data_dir, PathBuf::from("./data"));
        assert_eq!(config.simulation.payment_delay, Duration::from_millis(1500));
        assert_eq!(
            config.simulation.verification_delay,
            Duration::from_millis(2000)
        );
        assert_eq!(config.telemetry.log_level, "info");
    }

    #[test]
    fn reads_overrides_from_env() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_ENV", "CI");
        env::set_var("RENEWAL_DATA_DIR", "/tmp/renewals");
        env::set_var("RENEWAL_PAYMENT_DELAY_MS", " 0 ");
        let config = AppConfig::load().expect("config loads");
        reset_env();

        assert_eq!(config.environment, AppEnvironment::Test);
        assert_eq!(config.storage.data_dir, PathBuf::from("/tmp/renewals"));
        assert_eq!(config.simulation.payment_delay, Duration::ZERO);
    }

    #[test]
    fn rejects_non_numeric_delays() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("RENEWAL_VERIFICATION_DELAY_MS", "soon");
        let result = AppConfig::load();
        reset_env();

        match result {
            Err(ConfigError::InvalidDelay { var, .. }) => {
                assert_eq!(var, "RENEWAL_VERIFICATION_DELAY_MS")
            }
            other => panic!("expected invalid delay, got {other:?}"),
        }
    }
}

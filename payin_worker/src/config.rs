use std::{env, time::Duration};

use chrono::Duration as StaleDuration;
use log::*;
use payin_common::{
    helpers::{parse_boolean_flag, parse_or_default},
    Secret,
};

const DEFAULT_DISCOVERY_INTERVAL: Duration = Duration::from_secs(60);
const DEFAULT_RECOVERY_INTERVAL: Duration = Duration::from_secs(300);
const DEFAULT_STALE_AFTER: StaleDuration = StaleDuration::hours(1);
const DEFAULT_POOL_CAPACITY: usize = 16;
const DEFAULT_PAGE_SIZE: usize = 100;
const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(30);
const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);
// The default points at a local provider mock; production deployments always set PAYIN_PROVIDER_BASE_URL.
const DEFAULT_PROVIDER_BASE_URL: &str = "http://localhost:12111";

#[derive(Clone, Debug)]
pub struct WorkerConfig {
    pub database_url: String,
    /// How often the discovery pass scans for due intents.
    pub discovery_interval: Duration,
    /// How often the recovery pass scans for stuck intents.
    pub recovery_interval: Duration,
    /// The age past which an untouched `Capturing` intent is presumed orphaned and re-armed.
    pub stale_after: StaleDuration,
    /// How many capture jobs may run concurrently against the provider.
    pub pool_capacity: usize,
    /// How many due intents a single store query may return.
    pub page_size: usize,
    /// How long shutdown waits for in-flight captures before giving up on them.
    pub shutdown_grace: Duration,
    /// Staleness recovery can be disabled on instances that only run discovery.
    pub recovery_enabled: bool,
    pub provider: ProviderConfig,
}

#[derive(Clone, Debug)]
pub struct ProviderConfig {
    pub base_url: String,
    pub secret_key: Secret<String>,
    /// Client-side timeout on provider calls. Exceeding it classifies the call as ambiguous, never as failed.
    pub timeout: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_PROVIDER_BASE_URL.to_string(),
            secret_key: Secret::default(),
            timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            database_url: String::default(),
            discovery_interval: DEFAULT_DISCOVERY_INTERVAL,
            recovery_interval: DEFAULT_RECOVERY_INTERVAL,
            stale_after: DEFAULT_STALE_AFTER,
            pool_capacity: DEFAULT_POOL_CAPACITY,
            page_size: DEFAULT_PAGE_SIZE,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
            recovery_enabled: true,
            provider: ProviderConfig::default(),
        }
    }
}

impl WorkerConfig {
    pub fn from_env_or_default() -> Self {
        let database_url = payin_engine::sqlite::db_url();
        let discovery_interval = duration_from_env("PAYIN_DISCOVERY_INTERVAL_SECS", DEFAULT_DISCOVERY_INTERVAL);
        let recovery_interval = duration_from_env("PAYIN_RECOVERY_INTERVAL_SECS", DEFAULT_RECOVERY_INTERVAL);
        let stale_after_secs =
            parse_or_default(env::var("PAYIN_STALE_AFTER_SECS").ok(), DEFAULT_STALE_AFTER.num_seconds());
        let pool_capacity = parse_or_default(env::var("PAYIN_JOB_POOL_CAPACITY").ok(), DEFAULT_POOL_CAPACITY);
        let page_size = parse_or_default(env::var("PAYIN_DISCOVERY_PAGE_SIZE").ok(), DEFAULT_PAGE_SIZE);
        let shutdown_grace = duration_from_env("PAYIN_SHUTDOWN_GRACE_SECS", DEFAULT_SHUTDOWN_GRACE);
        let recovery_enabled = parse_boolean_flag(env::var("PAYIN_RECOVERY_ENABLED").ok(), true);
        if !recovery_enabled {
            warn!("🪛️ Staleness recovery is DISABLED on this instance. Make sure another instance runs it.");
        }
        let provider = ProviderConfig::from_env_or_default();
        Self {
            database_url,
            discovery_interval,
            recovery_interval,
            stale_after: StaleDuration::seconds(stale_after_secs),
            pool_capacity: pool_capacity.max(1),
            page_size: page_size.max(1),
            shutdown_grace,
            recovery_enabled,
            provider,
        }
    }
}

impl ProviderConfig {
    pub fn from_env_or_default() -> Self {
        let base_url = env::var("PAYIN_PROVIDER_BASE_URL").unwrap_or_else(|_| {
            warn!("🪛️ PAYIN_PROVIDER_BASE_URL is not set. Using the default, {DEFAULT_PROVIDER_BASE_URL}.");
            DEFAULT_PROVIDER_BASE_URL.to_string()
        });
        let secret_key = match env::var("PAYIN_PROVIDER_SECRET_KEY") {
            Ok(key) => Secret::new(key),
            Err(_) => {
                warn!("🪛️ PAYIN_PROVIDER_SECRET_KEY is not set. Provider calls will be unauthenticated.");
                Secret::default()
            },
        };
        let timeout = duration_from_env("PAYIN_PROVIDER_TIMEOUT_SECS", DEFAULT_PROVIDER_TIMEOUT);
        Self { base_url, secret_key, timeout }
    }
}

fn duration_from_env(name: &str, default: Duration) -> Duration {
    match env::var(name) {
        Ok(value) => match value.trim().parse::<u64>() {
            Ok(secs) => Duration::from_secs(secs),
            Err(e) => {
                error!("🪛️ {value} is not a valid value for {name}. {e} Using the default, {default:?}, instead.");
                default
            },
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    // One test mutates the process environment, so everything env-related lives in it.
    #[test]
    fn worker_config_reads_the_environment_with_fallbacks() {
        env::remove_var("PAYIN_DISCOVERY_INTERVAL_SECS");
        env::remove_var("PAYIN_RECOVERY_ENABLED");
        env::set_var("PAYIN_DATABASE_URL", "sqlite://data/test_config.db");
        env::set_var("PAYIN_JOB_POOL_CAPACITY", "4");
        env::set_var("PAYIN_STALE_AFTER_SECS", "900");
        env::set_var("PAYIN_PROVIDER_TIMEOUT_SECS", "not-a-number");

        let config = WorkerConfig::from_env_or_default();
        assert_eq!(config.database_url, "sqlite://data/test_config.db");
        assert_eq!(config.discovery_interval, DEFAULT_DISCOVERY_INTERVAL);
        assert_eq!(config.pool_capacity, 4);
        assert_eq!(config.stale_after, StaleDuration::minutes(15));
        assert!(config.recovery_enabled);
        assert_eq!(config.provider.timeout, DEFAULT_PROVIDER_TIMEOUT);

        env::set_var("PAYIN_RECOVERY_ENABLED", "off");
        let config = WorkerConfig::from_env_or_default();
        assert!(!config.recovery_enabled);

        for name in [
            "PAYIN_DATABASE_URL",
            "PAYIN_JOB_POOL_CAPACITY",
            "PAYIN_STALE_AFTER_SECS",
            "PAYIN_PROVIDER_TIMEOUT_SECS",
            "PAYIN_RECOVERY_ENABLED",
        ] {
            env::remove_var(name);
        }
    }
}

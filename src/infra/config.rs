use std::{net::SocketAddr, time::Duration};

use axum::http::HeaderValue;
use env_helpers::get_env_default;
use secrecy::SecretString;

use super::InfraError;

pub struct AppConfig {
    pub database_url: SecretString,
    pub bind_addr: SocketAddr,
    pub cors_origin: HeaderValue,
    /// Shared TTL store. In-process store when unset.
    pub redis_url: Option<SecretString>,
    pub sync_interval: Duration,
    /// Tax applied to platform fees, within [0, 1].
    pub fee_tax_rate: f64,
    pub rate_limit_window_secs: u64,
    pub rate_limit_per_ip: u64,
    pub metrics_cache_ttl: Duration,
    pub kv_max_entries: usize,
    pub kv_sweep_interval: Duration,
    /// Whether to trust X-Forwarded-For headers. Set to true when behind a reverse proxy.
    /// SECURITY: Only enable this when the API is not directly exposed to the internet.
    pub trust_proxy: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, InfraError> {
        let database_url = std::env::var("DATABASE_URL")
            .map(|url| SecretString::new(url.into()))
            .map_err(|_| InfraError::ConfigMissing {
                var: "DATABASE_URL",
            })?;

        let bind_addr: SocketAddr =
            get_env_default("BIND_ADDR", SocketAddr::from(([127, 0, 0, 1], 3001)));
        let cors_origin: HeaderValue =
            get_env_default("CORS_ORIGIN", String::from("http://localhost:3000"))
                .parse()
                .map_err(|_| InfraError::ConfigInvalid { var: "CORS_ORIGIN" })?;

        let redis_url = std::env::var("REDIS_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .map(|url| SecretString::new(url.into()));

        let sync_interval_secs: u64 = get_env_default("SYNC_INTERVAL_SECS", 43_200);
        let fee_tax_rate: f64 = get_env_default("FEE_TAX_RATE", 0.0);
        if !fee_tax_rate.is_finite() {
            return Err(InfraError::ConfigInvalid {
                var: "FEE_TAX_RATE",
            });
        }

        let rate_limit_window_secs: u64 = get_env_default("RATE_LIMIT_WINDOW_SECS", 60);
        let rate_limit_per_ip: u64 = get_env_default("RATE_LIMIT_PER_IP", 120);
        let metrics_cache_ttl_secs: u64 = get_env_default("METRICS_CACHE_TTL_SECS", 300);
        let kv_max_entries: usize = get_env_default("KV_MAX_ENTRIES", 10_000);
        let kv_sweep_interval_secs: u64 = get_env_default("KV_SWEEP_INTERVAL_SECS", 60);
        // Default to false for security - must explicitly enable when behind a trusted proxy
        let trust_proxy: bool = get_env_default("TRUST_PROXY", false);

        Ok(Self {
            database_url,
            bind_addr,
            cors_origin,
            redis_url,
            sync_interval: sync_interval(sync_interval_secs)?,
            fee_tax_rate: fee_tax_rate.clamp(0.0, 1.0),
            rate_limit_window_secs: rate_limit_window_secs.max(1),
            rate_limit_per_ip,
            metrics_cache_ttl: Duration::from_secs(metrics_cache_ttl_secs.max(1)),
            kv_max_entries: kv_max_entries.max(1),
            kv_sweep_interval: Duration::from_secs(kv_sweep_interval_secs.max(1)),
            trust_proxy,
        })
    }
}

fn sync_interval(secs: u64) -> Result<Duration, InfraError> {
    if secs == 0 {
        return Err(InfraError::ConfigInvalid {
            var: "SYNC_INTERVAL_SECS",
        });
    }
    Ok(Duration::from_secs(secs))
}

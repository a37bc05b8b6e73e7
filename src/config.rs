use std::{env, net::IpAddr};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub access_token_ttl_minutes: i64,
    pub refresh_token_ttl_days: i64,
    pub banned_ips: Vec<IpAddr>,
    pub rate_limit_per_minute: u32,
    pub cache_ttl_secs: u64,
    pub cache_max_entries: u64,
    pub payment: PaymentConfig,
}

#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub gateway_url: String,
    pub secret_key: Option<String>,
    pub callback_url: Option<String>,
    pub currency: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET is not set"))?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env_parse("APP_PORT", 3000);
        let banned_ips = parse_ip_list(&env::var("BANNED_IPS").unwrap_or_default());

        let payment = PaymentConfig {
            gateway_url: env::var("PAYMENT_GATEWAY_URL")
                .unwrap_or_else(|_| "https://api.chapa.co/v1".to_string()),
            secret_key: env::var("PAYMENT_SECRET_KEY").ok().filter(|s| !s.is_empty()),
            callback_url: env::var("PAYMENT_CALLBACK_URL").ok().filter(|s| !s.is_empty()),
            currency: env::var("PAYMENT_CURRENCY").unwrap_or_else(|_| "ETB".to_string()),
        };

        Ok(Self {
            database_url,
            host,
            port,
            jwt_secret,
            access_token_ttl_minutes: env_parse("ACCESS_TOKEN_TTL_MINUTES", 60),
            refresh_token_ttl_days: env_parse("REFRESH_TOKEN_TTL_DAYS", 7),
            banned_ips,
            rate_limit_per_minute: env_parse::<u32>("RATE_LIMIT_PER_MINUTE", 60).max(1),
            cache_ttl_secs: env_parse("CACHE_TTL_SECS", 300),
            cache_max_entries: env_parse("CACHE_MAX_ENTRIES", 1000),
            payment,
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

/// Parses a comma separated list of addresses, skipping blanks and garbage.
pub fn parse_ip_list(raw: &str) -> Vec<IpAddr> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match s.parse::<IpAddr>() {
            Ok(ip) => Some(ip),
            Err(_) => {
                tracing::warn!(value = %s, "ignoring invalid entry in BANNED_IPS");
                None
            }
        })
        .collect()
}

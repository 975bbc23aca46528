use common::Money;

/// Loaded once at startup from the environment (via `dotenvy`) and passed
/// down as an `Arc<Config>` collaborator — never re-read per request, and
/// never a process-wide mutable singleton (§9: "global singletons →
/// passed collaborators").
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub http_host: String,
    pub http_port: u16,
    pub min_transaction_amount: Money,
    pub max_transaction_amount: Money,
    pub idempotency_timeout_seconds: i64,
    pub webhook_secret: Vec<u8>,
    pub webhook_max_retries: i32,
    pub webhook_retry_base_seconds: i64,
    pub webhook_retention_days: i64,
    pub db_statement_timeout_seconds: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: require_env("DATABASE_URL")?,
            http_host: env_or("HOST", "127.0.0.1"),
            http_port: env_or("PORT", "3000").parse()?,
            min_transaction_amount: Money::parse(&env_or("MIN_TRANSACTION_AMOUNT", "0.01"))
                .map_err(|e| anyhow::anyhow!("invalid MIN_TRANSACTION_AMOUNT: {e}"))?,
            max_transaction_amount: Money::parse(&env_or("MAX_TRANSACTION_AMOUNT", "1000000.00"))
                .map_err(|e| anyhow::anyhow!("invalid MAX_TRANSACTION_AMOUNT: {e}"))?,
            idempotency_timeout_seconds: env_or("TRANSACTION_IDEMPOTENCY_TIMEOUT", "86400").parse()?,
            webhook_secret: require_env("PAYMENT_GATEWAY_WEBHOOK_SECRET")?.into_bytes(),
            webhook_max_retries: env_or("WEBHOOK_MAX_RETRIES", "3").parse()?,
            webhook_retry_base_seconds: env_or("WEBHOOK_RETRY_BASE_SECONDS", "60").parse()?,
            webhook_retention_days: env_or("WEBHOOK_RETENTION_DAYS", "90").parse()?,
            db_statement_timeout_seconds: env_or("DB_STATEMENT_TIMEOUT_SECONDS", "5").parse()?,
        })
    }
}

fn require_env(key: &str) -> anyhow::Result<String> {
    std::env::var(key).map_err(|_| anyhow::anyhow!("missing required environment variable {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

// config.rs
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: Option<String>,
    pub reliability_queue_prefix: String,
    pub reminder_queue_prefix: String,
    pub queue_max_attempts: u32,
    pub queue_retry_base_ms: u64,
    pub reliability_dedup: bool,
}

impl Config {
    pub fn init() -> Config {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let redis_url = std::env::var("REDIS_URL").ok();

        let reliability_queue_prefix = std::env::var("RELIABILITY_QUEUE_PREFIX")
            .unwrap_or_else(|_| "tasks:reliability".to_string());
        let reminder_queue_prefix = std::env::var("REMINDER_QUEUE_PREFIX")
            .unwrap_or_else(|_| "tasks:reminder".to_string());

        let queue_max_attempts = std::env::var("QUEUE_MAX_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(3);
        let queue_retry_base_ms = std::env::var("QUEUE_RETRY_BASE_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(30_000);

        // Redelivered attendance events double-count unless this is on
        let reliability_dedup = std::env::var("RELIABILITY_DEDUP")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        Config {
            database_url,
            redis_url,
            reliability_queue_prefix,
            reminder_queue_prefix,
            queue_max_attempts,
            queue_retry_base_ms,
            reliability_dedup,
        }
    }
}

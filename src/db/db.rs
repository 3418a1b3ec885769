// db/db.rs
use redis::aio::ConnectionManager;
use sqlx::{Pool, Postgres};
use std::sync::Arc;

/// Postgres pool plus the optional Redis connection shared with the task
/// queues. The core keeps working without Redis; enqueues become no-ops and
/// the consumers idle.
#[derive(Clone)]
pub struct DBClient {
    pub pool: Pool<Postgres>,
    pub redis_client: Option<Arc<ConnectionManager>>,
}

impl std::fmt::Debug for DBClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DBClient")
            .field("pool", &"Pool<Postgres>")
            .field("redis_client", &self.redis_client.is_some())
            .finish()
    }
}

impl DBClient {
    pub fn new(pool: Pool<Postgres>) -> Self {
        DBClient {
            pool,
            redis_client: None,
        }
    }

    /// Attach a Redis connection manager for the queue broker. Connection
    /// failures degrade to a broker-less client instead of erroring out.
    pub async fn with_redis(pool: Pool<Postgres>, redis_url: &str) -> Result<Self, String> {
        let client = match redis::Client::open(redis_url) {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!("⚠️ Failed to create Redis client: {}. Continuing without broker.", e);
                return Ok(DBClient::new(pool));
            }
        };

        match ConnectionManager::new(client).await {
            Ok(conn) => {
                tracing::info!("✅ Redis connection established successfully");
                Ok(DBClient {
                    pool,
                    redis_client: Some(Arc::new(conn)),
                })
            }
            Err(e) => {
                tracing::warn!("⚠️ Failed to connect to Redis: {}. Continuing without broker.", e);
                Ok(DBClient::new(pool))
            }
        }
    }

    pub fn is_redis_available(&self) -> bool {
        self.redis_client.is_some()
    }

    /// Broker status for startup logging
    pub fn broker_status(&self) -> &str {
        if self.redis_client.is_some() {
            "connected"
        } else {
            "not configured"
        }
    }
}

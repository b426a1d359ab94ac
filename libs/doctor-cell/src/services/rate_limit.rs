use deadpool_redis::{Config, Pool, Runtime};
use redis::AsyncCommands;
use tracing::{debug, info, warn};

use shared_config::AppConfig;

const RATE_LIMIT: i64 = 10;
const RATE_WINDOW_SECONDS: i64 = 60;

/// Fixed-window request counter for the public matching endpoint, shared
/// across instances through Redis. When no Redis URL is configured the
/// limiter is disabled and every request passes.
pub struct RateLimitService {
    pool: Option<Pool>,
}

impl RateLimitService {
    pub fn new(config: &AppConfig) -> Self {
        let pool = match &config.redis_url {
            Some(url) => match Config::from_url(url.clone()).create_pool(Some(Runtime::Tokio1)) {
                Ok(pool) => {
                    info!("Rate limiter backed by Redis");
                    Some(pool)
                }
                Err(e) => {
                    warn!("Failed to create Redis pool, rate limiting disabled: {}", e);
                    None
                }
            },
            None => {
                debug!("REDIS_URL not set, rate limiting disabled");
                None
            }
        };

        Self { pool }
    }

    /// Returns true while the caller is within the window allowance. Counter
    /// errors fail open: a broken Redis must not take the matcher down.
    pub async fn check(&self, client_key: &str) -> bool {
        let Some(pool) = &self.pool else {
            return true;
        };

        let mut conn = match pool.get().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("Rate limit connection error, allowing request: {}", e);
                return true;
            }
        };

        let key = format!("match_rate:{}", client_key);

        let count: i64 = match conn.incr(&key, 1).await {
            Ok(count) => count,
            Err(e) => {
                warn!("Rate limit counter error, allowing request: {}", e);
                return true;
            }
        };

        if count == 1 {
            let _: Result<(), _> = conn.expire(&key, RATE_WINDOW_SECONDS).await;
        }

        if count > RATE_LIMIT {
            debug!("Rate limit exceeded for {}", client_key);
            return false;
        }

        true
    }
}

//! Redis connection setup shared by the roster and ledger stores.

use redis::aio::ConnectionManager;
use redis::RedisError;
use tracing::info;

/// Open a managed connection to `redis_url`.
///
/// The manager reconnects on its own after the initial connection; only
/// this first connect can fail outright.
///
/// # Errors
///
/// Returns the client error if the URL is invalid or the server is
/// unreachable.
pub async fn connect(redis_url: &str) -> Result<ConnectionManager, RedisError> {
    let client = redis::Client::open(redis_url)?;
    let conn = ConnectionManager::new(client).await?;
    info!("Connected to Redis");
    Ok(conn)
}

//! Valkey/Redis backed watermark store.

use std::future::Future;
use std::pin::Pin;

use redis::aio::MultiplexedConnection;
use redis::{RedisError, Script};
use tracing::info;

use crate::error::{CheckpointError, Result};
use crate::store::WatermarkStore;

/// Server-side compare-and-swap.
///
/// Values are canonical decimal `i64` strings written only by this script.
/// They are compared digit-wise rather than through `tonumber`, which
/// would round nanosecond epochs to doubles.
const CHECK_AND_SWAP_SCRIPT: &str = r#"
local function less(a, b)
    local neg_a = string.sub(a, 1, 1) == "-"
    local neg_b = string.sub(b, 1, 1) == "-"
    if neg_a ~= neg_b then
        return neg_a
    end
    if neg_a then
        a, b = string.sub(b, 2), string.sub(a, 2)
    end
    if #a ~= #b then
        return #a < #b
    end
    return a < b
end

local current = redis.call("GET", KEYS[1])
if current == false or less(current, ARGV[1]) then
    redis.call("SET", KEYS[1], ARGV[1])
    return 1
end

return 0
"#;

/// [`WatermarkStore`] on a Valkey or Redis server.
///
/// The swap runs as a Lua script, so the server serializes it against
/// every other client.
#[derive(Clone)]
pub struct ValkeyStore {
    connection: MultiplexedConnection,
    script: Script,
}

impl ValkeyStore {
    /// Connects to the server at `url` (`redis://host:port/db`).
    ///
    /// # Errors
    ///
    /// Returns error if the URL is invalid or the server is unreachable.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| CheckpointError::Unavailable(format!("invalid store URL {url}: {e}")))?;
        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(map_error)?;

        info!(url = %url, "connected to checkpoint store");

        Ok(Self {
            connection,
            script: Script::new(CHECK_AND_SWAP_SCRIPT),
        })
    }
}

fn map_error(e: RedisError) -> CheckpointError {
    if e.is_io_error() || e.is_connection_refusal() || e.is_connection_dropped() || e.is_timeout() {
        CheckpointError::Unavailable(e.to_string())
    } else {
        CheckpointError::Store(e.to_string())
    }
}

impl WatermarkStore for ValkeyStore {
    fn get<'a>(
        &'a self,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<i64>>> + Send + 'a>> {
        Box::pin(async move {
            let mut connection = self.connection.clone();
            let watermark: Option<i64> = redis::cmd("GET")
                .arg(key)
                .query_async(&mut connection)
                .await
                .map_err(map_error)?;
            Ok(watermark)
        })
    }

    fn compare_and_swap<'a>(
        &'a self,
        key: &'a str,
        candidate: i64,
    ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + 'a>> {
        Box::pin(async move {
            let mut connection = self.connection.clone();
            let admitted: i64 = self
                .script
                .key(key)
                .arg(candidate.to_string())
                .invoke_async(&mut connection)
                .await
                .map_err(map_error)?;
            Ok(admitted == 1)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Integration Tests (require Valkey)
    // =========================================================================

    async fn connect() -> ValkeyStore {
        let url = std::env::var("AFFOGATO_VALKEY_URL")
            .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
        ValkeyStore::connect(&url).await.expect("connect")
    }

    async fn fresh_key(store: &ValkeyStore, name: &str) -> String {
        let key = format!("affogato:test:{}:{name}", std::process::id());
        let mut connection = store.connection.clone();
        let _: i64 = redis::cmd("DEL")
            .arg(&key)
            .query_async(&mut connection)
            .await
            .expect("del");
        key
    }

    #[tokio::test]
    #[ignore = "requires Valkey"]
    async fn test_absent_key_reads_none_and_admits() {
        let store = connect().await;
        let key = fresh_key(&store, "absent").await;

        assert_eq!(store.get(&key).await.expect("get"), None);
        assert!(store.compare_and_swap(&key, 42).await.expect("swap"));
        assert_eq!(store.get(&key).await.expect("get"), Some(42));
    }

    #[tokio::test]
    #[ignore = "requires Valkey"]
    async fn test_swap_compares_numerically() {
        let store = connect().await;
        let key = fresh_key(&store, "numeric").await;

        assert!(store.compare_and_swap(&key, 999).await.expect("swap"));
        // "1000" sorts before "999" as text
        assert!(store.compare_and_swap(&key, 1000).await.expect("swap"));
        assert!(!store.compare_and_swap(&key, 99).await.expect("swap"));
        assert_eq!(store.get(&key).await.expect("get"), Some(1000));
    }

    #[tokio::test]
    #[ignore = "requires Valkey"]
    async fn test_equal_value_is_rejected() {
        let store = connect().await;
        let key = fresh_key(&store, "equal").await;

        assert!(store.compare_and_swap(&key, 7).await.expect("swap"));
        assert!(!store.compare_and_swap(&key, 7).await.expect("swap"));
    }

    #[tokio::test]
    #[ignore = "requires Valkey"]
    async fn test_negative_values_order_correctly() {
        let store = connect().await;
        let key = fresh_key(&store, "negative").await;

        assert!(store.compare_and_swap(&key, -100).await.expect("swap"));
        assert!(store.compare_and_swap(&key, -20).await.expect("swap"));
        assert!(!store.compare_and_swap(&key, -30).await.expect("swap"));
        assert!(store.compare_and_swap(&key, 5).await.expect("swap"));
        assert!(!store.compare_and_swap(&key, -1).await.expect("swap"));
        assert_eq!(store.get(&key).await.expect("get"), Some(5));
    }

    #[tokio::test]
    #[ignore = "requires Valkey"]
    async fn test_nanosecond_epochs_keep_full_precision() {
        let store = connect().await;
        let key = fresh_key(&store, "precision").await;

        // Adjacent values that collapse to the same double
        let base = 1_735_671_868_664_000_001_i64;
        assert!(store.compare_and_swap(&key, base).await.expect("swap"));
        assert!(store.compare_and_swap(&key, base + 1).await.expect("swap"));
        assert!(!store.compare_and_swap(&key, base).await.expect("swap"));
        assert_eq!(store.get(&key).await.expect("get"), Some(base + 1));
    }
}

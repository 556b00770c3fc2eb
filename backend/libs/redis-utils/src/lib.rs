use anyhow::{anyhow, Context, Result};
use redis::aio::ConnectionManager;
use redis::{Client, ConnectionAddr, ConnectionInfo, IntoConnectionInfo};
use tokio::time::{timeout, Duration};
use tracing::{debug, info};

/// Default time allowed for the initial connection handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Redis connection handle shared by the ranking stores.
///
/// `ConnectionManager` multiplexes a single connection and reconnects on its
/// own, so cloning the manager is the intended way to hand it to tasks.
#[derive(Clone)]
pub struct RedisPool {
    manager: ConnectionManager,
    address: String,
}

impl RedisPool {
    /// Connect with [`DEFAULT_CONNECT_TIMEOUT`].
    pub async fn connect(redis_url: &str) -> Result<Self> {
        Self::connect_with_timeout(redis_url, DEFAULT_CONNECT_TIMEOUT).await
    }

    /// Connect and verify the server answers `PING` before returning.
    pub async fn connect_with_timeout(redis_url: &str, connect_timeout: Duration) -> Result<Self> {
        let info: ConnectionInfo = redis_url
            .into_connection_info()
            .context("failed to parse REDIS_URL connection string")?;
        let address = describe_addr(&info);

        let client = Client::open(info).context("failed to construct Redis client")?;
        let manager = timeout(connect_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| {
                anyhow!(
                    "timed out after {:?} connecting to Redis at {}",
                    connect_timeout,
                    address
                )
            })?
            .context("failed to initialize Redis connection manager")?;

        let pool = Self { manager, address };
        pool.ping().await?;
        info!(address = %pool.address, "Redis connection established");
        Ok(pool)
    }

    pub fn manager(&self) -> ConnectionManager {
        self.manager.clone()
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Round-trip a `PING`; used at startup and by readiness checks.
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.manager.clone();
        let reply: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .with_context(|| format!("Redis at {} did not answer PING", self.address))?;
        debug!(address = %self.address, reply = %reply, "Redis ping");
        Ok(())
    }
}

/// Human readable `host:port/db` label, never includes credentials.
fn describe_addr(info: &ConnectionInfo) -> String {
    let host = match &info.addr {
        ConnectionAddr::Tcp(host, port) => format!("{}:{}", host, port),
        ConnectionAddr::TcpTls { host, port, .. } => format!("{}:{} (tls)", host, port),
        ConnectionAddr::Unix(path) => path.display().to_string(),
        #[allow(unreachable_patterns)]
        _ => "unknown".to_string(),
    };
    format!("{}/{}", host, info.redis.db)
}

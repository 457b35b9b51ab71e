//! Bounded connection pool.
//!
//! Idle connections are queued in a [`RingBuffer`] and handed out head first.
//! Every physical connection gets a keep-alive task when it is opened, and
//! every lease gets a one-shot leak timer. A connection that is not returned
//! within the leak window poisons the pool: the leak is logged once at error
//! level and every later [`ConnectionPool::get_connection`] fails with
//! [`MapperError::ConnectionLeaked`].
//!
//! # Locking
//!
//! The idle buffer and the slot map live behind one `tokio::sync::Mutex`.
//! Foreground calls and background tasks take the same lock, and it is held
//! across the short driver calls that must be serialized with bookkeeping
//! (lazy connect, keep-alive ping).
//!
//! # Usage
//!
//! ```ignore
//! let mut conn = pool.get_connection().await?;
//! let rows = conn.connection_mut()?.query("SELECT 1", &[]).await;
//! // Explicit release (preferred) or rely on Drop
//! conn.release().await;
//! ```

use crate::config::PoolConfig;
use crate::db::driver::{Connection, ConnectionParams, Driver};
use crate::db::ring_buffer::RingBuffer;
use crate::error::{MapperError, MapperResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub type ConnectionId = String;

fn generate_connection_id() -> ConnectionId {
    format!("conn_{}", Uuid::new_v4().simple())
}

/// Lease state of one physical connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Idle,
    Leased,
}

/// Metadata about one pooled connection (no handle exposed).
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionInfo {
    pub connection_id: ConnectionId,
    pub state: ConnectionState,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leased_at: Option<DateTime<Utc>>,
}

/// Point-in-time pool counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolStatus {
    pub pool_size: usize,
    pub live: usize,
    pub idle: usize,
    pub leased: usize,
    /// Leases that outlived the leak window.
    pub leaks_detected: usize,
}

/// The first leak seen by the pool.
#[derive(Debug, Clone)]
pub struct LeakReport {
    pub connection_id: ConnectionId,
    pub detected_at: DateTime<Utc>,
}

struct ConnectionSlot {
    /// `None` while leased.
    connection: Option<Box<dyn Connection>>,
    created_at: DateTime<Utc>,
    leased_at: Option<DateTime<Utc>>,
    lease_seq: u64,
    keep_alive: JoinHandle<()>,
    leak_timer: Option<JoinHandle<()>>,
}

impl ConnectionSlot {
    fn state(&self) -> ConnectionState {
        if self.connection.is_some() {
            ConnectionState::Idle
        } else {
            ConnectionState::Leased
        }
    }
}

impl Drop for ConnectionSlot {
    fn drop(&mut self) {
        self.keep_alive.abort();
        if let Some(timer) = self.leak_timer.take() {
            timer.abort();
        }
    }
}

struct PoolState {
    idle: RingBuffer<ConnectionId>,
    slots: HashMap<ConnectionId, ConnectionSlot>,
    next_lease: u64,
    leaks_detected: usize,
    leaked: Option<LeakReport>,
}

struct PoolShared {
    driver: Arc<dyn Driver>,
    params: ConnectionParams,
    pool_size: usize,
    keep_alive: Duration,
    leak_timeout: Duration,
    state: Mutex<PoolState>,
}

impl PoolShared {
    /// Open one physical connection and register it as idle-but-unqueued.
    /// The caller decides whether it goes on the idle buffer.
    async fn open_connection(self: &Arc<Self>, state: &mut PoolState) -> MapperResult<ConnectionId> {
        let connection = self.driver.connect(&self.params).await?;
        let connection_id = generate_connection_id();
        let keep_alive = spawn_keep_alive(Arc::downgrade(self), connection_id.clone(), self.keep_alive);
        state.slots.insert(
            connection_id.clone(),
            ConnectionSlot {
                connection: Some(connection),
                created_at: Utc::now(),
                leased_at: None,
                lease_seq: 0,
                keep_alive,
                leak_timer: None,
            },
        );
        debug!(connection_id = %connection_id, live = state.slots.len(), "Opened pooled connection");
        Ok(connection_id)
    }

    /// Put a leased connection back. Returns false when the lease is unknown
    /// to this pool or the idle buffer refuses it.
    async fn return_connection(
        &self,
        connection_id: &str,
        lease_seq: u64,
        connection: Box<dyn Connection>,
    ) -> bool {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let Some(slot) = state.slots.get_mut(connection_id) else {
            debug!(connection_id = %connection_id, "Released connection is not tracked by this pool");
            return false;
        };
        if slot.connection.is_some() || slot.lease_seq != lease_seq {
            warn!(connection_id = %connection_id, "Connection released without an active lease");
            return false;
        }
        if let Some(timer) = slot.leak_timer.take() {
            timer.abort();
        }
        slot.leased_at = None;

        if connection.is_closed() {
            state.slots.remove(connection_id);
            info!(connection_id = %connection_id, "Dropped closed connection on release");
            return true;
        }

        slot.connection = Some(connection);
        if state.idle.offer(connection_id.to_string()).is_err() {
            state.slots.remove(connection_id);
            warn!(connection_id = %connection_id, "Idle buffer full, closing released connection");
            return false;
        }
        debug!(connection_id = %connection_id, idle = state.idle.len(), "Connection released");
        true
    }

    /// Keep-alive probe for one connection. Returns false once the connection
    /// is gone and the probe should stop.
    async fn probe(&self, connection_id: &str) -> bool {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let Some(slot) = state.slots.get_mut(connection_id) else {
            return false;
        };
        let Some(connection) = slot.connection.as_mut() else {
            debug!(connection_id = %connection_id, "Connection leased, skipping keep-alive");
            return true;
        };

        if connection.is_closed() {
            state.slots.remove(connection_id);
            state.idle.retain(|id| id != connection_id);
            info!(
                connection_id = %connection_id,
                live = state.slots.len(),
                "Removed closed connection from pool"
            );
            return false;
        }

        if let Err(e) = connection.ping().await {
            warn!(connection_id = %connection_id, error = %e, "Keep-alive probe failed");
        }
        true
    }

    async fn report_leak(&self, connection_id: &str, lease_seq: u64) {
        let mut state = self.state.lock().await;
        let still_leased = match state.slots.get_mut(connection_id) {
            Some(slot) if slot.connection.is_none() && slot.lease_seq == lease_seq => {
                slot.leak_timer = None;
                true
            }
            _ => false,
        };
        if !still_leased {
            return;
        }

        state.leaks_detected += 1;
        error!(
            connection_id = %connection_id,
            window_ms = self.leak_timeout.as_millis() as u64,
            "Connection leaked: not returned within the leak window"
        );
        if state.leaked.is_none() {
            state.leaked = Some(LeakReport {
                connection_id: connection_id.to_string(),
                detected_at: Utc::now(),
            });
        }
    }
}

fn spawn_keep_alive(pool: Weak<PoolShared>, connection_id: ConnectionId, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            let Some(pool) = pool.upgrade() else {
                break;
            };
            if !pool.probe(&connection_id).await {
                break;
            }
        }
    })
}

fn spawn_leak_timer(
    pool: Weak<PoolShared>,
    connection_id: ConnectionId,
    lease_seq: u64,
    window: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(window).await;
        if let Some(pool) = pool.upgrade() {
            pool.report_leak(&connection_id, lease_seq).await;
        }
    })
}

/// A bounded pool of physical connections. Cheap to clone.
#[derive(Clone)]
pub struct ConnectionPool {
    shared: Arc<PoolShared>,
}

impl ConnectionPool {
    /// Validate `config` and eagerly open `pool_size` connections.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn open(
        driver: Arc<dyn Driver>,
        params: ConnectionParams,
        config: &PoolConfig,
    ) -> MapperResult<Self> {
        config
            .validate()
            .map_err(|msg| MapperError::configuration(format!("Invalid pool config: {}", msg)))?;

        let pool_size = config.pool_size_or_default();
        let shared = Arc::new(PoolShared {
            driver,
            params,
            pool_size,
            keep_alive: config.keep_alive_or_default(),
            leak_timeout: config.leak_timeout_or_default(),
            state: Mutex::new(PoolState {
                idle: RingBuffer::new(pool_size),
                slots: HashMap::with_capacity(pool_size),
                next_lease: 0,
                leaks_detected: 0,
                leaked: None,
            }),
        });

        {
            let mut state = shared.state.lock().await;
            for _ in 0..pool_size {
                let connection_id = shared.open_connection(&mut state).await?;
                state
                    .idle
                    .add(connection_id)
                    .map_err(|e| MapperError::internal(format!("Pool init overflow: {}", e)))?;
            }
        }

        info!(
            pool_size = pool_size,
            keep_alive_ms = shared.keep_alive.as_millis() as u64,
            leak_timeout_ms = shared.leak_timeout.as_millis() as u64,
            "Connection pool initialized"
        );
        Ok(Self { shared })
    }

    /// Lease a connection.
    ///
    /// Opens a new physical connection when no idle one is queued and fewer
    /// than `pool_size` are live. Fails with `PoolExhausted` otherwise.
    pub async fn get_connection(&self) -> MapperResult<PooledConnection> {
        let mut guard = self.shared.state.lock().await;
        let state = &mut *guard;

        if let Some(report) = &state.leaked {
            return Err(MapperError::ConnectionLeaked {
                connection_id: report.connection_id.clone(),
                window_ms: self.shared.leak_timeout.as_millis() as u64,
            });
        }

        if state.idle.is_empty() && state.slots.len() < self.shared.pool_size {
            let connection_id = self.shared.open_connection(state).await?;
            if let Err(id) = state.idle.offer(connection_id) {
                state.slots.remove(&id);
                return Err(MapperError::internal("Idle buffer full while growing pool"));
            }
        }

        let Some(connection_id) = state.idle.poll() else {
            return Err(MapperError::PoolExhausted {
                pool_size: self.shared.pool_size,
            });
        };

        state.next_lease += 1;
        let lease_seq = state.next_lease;
        let slot = state.slots.get_mut(&connection_id).ok_or_else(|| {
            MapperError::internal(format!("Idle connection {} has no slot", connection_id))
        })?;
        let connection = slot.connection.take().ok_or_else(|| {
            MapperError::internal(format!("Idle connection {} is already leased", connection_id))
        })?;

        slot.lease_seq = lease_seq;
        slot.leased_at = Some(Utc::now());
        slot.leak_timer = Some(spawn_leak_timer(
            Arc::downgrade(&self.shared),
            connection_id.clone(),
            lease_seq,
            self.shared.leak_timeout,
        ));

        debug!(connection_id = %connection_id, idle = state.idle.len(), "Connection leased");
        Ok(PooledConnection {
            connection_id,
            lease_seq,
            connection: Some(connection),
            pool: Arc::clone(&self.shared),
        })
    }

    /// Return a leased connection. Returns false when `conn` was leased from
    /// another pool or the idle buffer is already full.
    pub async fn release_connection(&self, conn: PooledConnection) -> bool {
        if !Arc::ptr_eq(&conn.pool, &self.shared) {
            warn!(
                connection_id = %conn.connection_id,
                "Connection was not leased from this pool"
            );
            return false;
        }
        conn.release().await
    }

    pub fn pool_size(&self) -> usize {
        self.shared.pool_size
    }

    pub async fn status(&self) -> PoolStatus {
        let state = self.shared.state.lock().await;
        let idle = state.idle.len();
        PoolStatus {
            pool_size: self.shared.pool_size,
            live: state.slots.len(),
            idle,
            leased: state.slots.len().saturating_sub(idle),
            leaks_detected: state.leaks_detected,
        }
    }

    /// The first detected leak, if any.
    pub async fn leak_report(&self) -> Option<LeakReport> {
        self.shared.state.lock().await.leaked.clone()
    }

    /// Metadata for every live connection, oldest first.
    pub async fn connections(&self) -> Vec<ConnectionInfo> {
        let state = self.shared.state.lock().await;
        let mut connections: Vec<ConnectionInfo> = state
            .slots
            .iter()
            .map(|(id, slot)| ConnectionInfo {
                connection_id: id.clone(),
                state: slot.state(),
                created_at: slot.created_at,
                leased_at: slot.leased_at,
            })
            .collect();
        connections.sort_by_key(|info| info.created_at);
        connections
    }
}

impl std::fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("pool_size", &self.shared.pool_size)
            .field("keep_alive", &self.shared.keep_alive)
            .field("leak_timeout", &self.shared.leak_timeout)
            .finish_non_exhaustive()
    }
}

/// A leased connection.
///
/// Release it with [`PooledConnection::release`]. If it is dropped instead,
/// `Drop` spawns a task that returns it to the pool and logs a warning. If no
/// tokio runtime is available at that point the connection stays leased and
/// the leak timer eventually reports it.
pub struct PooledConnection {
    connection_id: ConnectionId,
    lease_seq: u64,
    connection: Option<Box<dyn Connection>>,
    pool: Arc<PoolShared>,
}

impl PooledConnection {
    pub fn id(&self) -> &str {
        &self.connection_id
    }

    /// The physical connection.
    pub fn connection_mut(&mut self) -> MapperResult<&mut Box<dyn Connection>> {
        self.connection
            .as_mut()
            .ok_or_else(|| MapperError::internal("Pooled connection already released"))
    }

    /// Return the connection to its pool (preferred over relying on Drop).
    pub async fn release(mut self) -> bool {
        let Some(connection) = self.connection.take() else {
            return false;
        };
        self.pool
            .return_connection(&self.connection_id, self.lease_seq, connection)
            .await
    }
}

impl std::fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection")
            .field("connection_id", &self.connection_id)
            .field("lease_seq", &self.lease_seq)
            .field("released", &self.connection.is_none())
            .finish_non_exhaustive()
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        let Some(connection) = self.connection.take() else {
            return;
        };

        let pool = Arc::clone(&self.pool);
        let connection_id = self.connection_id.clone();
        let lease_seq = self.lease_seq;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    pool.return_connection(&connection_id, lease_seq, connection)
                        .await;
                    warn!(
                        connection_id = %connection_id,
                        "Connection released via Drop - consider using explicit release()"
                    );
                });
            }
            Err(_) => {
                warn!(
                    connection_id = %connection_id,
                    "Connection dropped outside a tokio runtime and stays leased"
                );
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{ExecuteResult, Row, Value};
    use futures_util::future::BoxFuture;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// In-memory driver recording opened connections and pings.
    #[derive(Default)]
    pub(crate) struct MockDriver {
        pub opened: AtomicUsize,
        pub pings: Arc<AtomicUsize>,
        /// When set, every ping fails without closing the connection.
        pub failing_pings: Arc<AtomicBool>,
        pub closed_flags: parking_lot::Mutex<Vec<Arc<AtomicBool>>>,
    }

    struct MockConnection {
        closed: Arc<AtomicBool>,
        pings: Arc<AtomicUsize>,
        failing_pings: Arc<AtomicBool>,
    }

    impl Driver for MockDriver {
        fn connect<'a>(
            &'a self,
            _params: &'a ConnectionParams,
        ) -> BoxFuture<'a, MapperResult<Box<dyn Connection>>> {
            Box::pin(async move {
                self.opened.fetch_add(1, Ordering::SeqCst);
                let closed = Arc::new(AtomicBool::new(false));
                self.closed_flags.lock().push(Arc::clone(&closed));
                Ok(Box::new(MockConnection {
                    closed,
                    pings: Arc::clone(&self.pings),
                    failing_pings: Arc::clone(&self.failing_pings),
                }) as Box<dyn Connection>)
            })
        }
    }

    impl Connection for MockConnection {
        fn query<'a>(
            &'a mut self,
            _sql: &'a str,
            _params: &'a [Value],
        ) -> BoxFuture<'a, MapperResult<Vec<Row>>> {
            Box::pin(async { Ok(vec![Row::new().with_column("one", Value::Int(1))]) })
        }

        fn execute<'a>(
            &'a mut self,
            _sql: &'a str,
            _params: &'a [Value],
            _return_keys: bool,
        ) -> BoxFuture<'a, MapperResult<ExecuteResult>> {
            Box::pin(async {
                Ok(ExecuteResult {
                    rows_affected: 1,
                    generated_keys: None,
                })
            })
        }

        fn ping(&mut self) -> BoxFuture<'_, MapperResult<()>> {
            self.pings.fetch_add(1, Ordering::SeqCst);
            let failing = self.failing_pings.load(Ordering::SeqCst);
            Box::pin(async move {
                if failing {
                    Err(MapperError::connection("ping timed out", "Check the database server"))
                } else {
                    Ok(())
                }
            })
        }

        fn is_closed(&self) -> bool {
            self.closed.load(Ordering::SeqCst)
        }
    }

    async fn open_pool(driver: &Arc<MockDriver>, config: PoolConfig) -> ConnectionPool {
        ConnectionPool::open(
            Arc::clone(driver) as Arc<dyn Driver>,
            ConnectionParams::new("mock://"),
            &config,
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_open_eagerly_fills_pool() {
        let driver = Arc::new(MockDriver::default());
        let pool = open_pool(&driver, PoolConfig::default().with_pool_size(3)).await;

        assert_eq!(driver.opened.load(Ordering::SeqCst), 3);
        let status = pool.status().await;
        assert_eq!(status.live, 3);
        assert_eq!(status.idle, 3);
        assert_eq!(status.leased, 0);
    }

    #[tokio::test]
    async fn test_zero_pool_size_rejected() {
        let driver = Arc::new(MockDriver::default());
        let result = ConnectionPool::open(
            driver as Arc<dyn Driver>,
            ConnectionParams::new("mock://"),
            &PoolConfig::default().with_pool_size(0),
        )
        .await;
        assert!(matches!(result, Err(MapperError::Configuration { .. })));
    }

    #[tokio::test]
    async fn test_exhaustion_and_release() {
        let driver = Arc::new(MockDriver::default());
        let pool = open_pool(&driver, PoolConfig::default().with_pool_size(2)).await;

        let first = pool.get_connection().await.unwrap();
        let second = pool.get_connection().await.unwrap();
        assert_ne!(first.id(), second.id());
        assert!(matches!(
            pool.get_connection().await,
            Err(MapperError::PoolExhausted { pool_size: 2 })
        ));

        let first_id = first.id().to_string();
        assert!(pool.release_connection(first).await);
        let again = pool.get_connection().await.unwrap();
        assert_eq!(again.id(), first_id);

        assert!(again.release().await);
        assert!(second.release().await);
        assert_eq!(pool.status().await.idle, 2);
        // no connection beyond pool_size was ever opened
        assert_eq!(driver.opened.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_leased_connections_are_distinct() {
        let driver = Arc::new(MockDriver::default());
        let pool = open_pool(&driver, PoolConfig::default().with_pool_size(5)).await;

        let mut leased = Vec::new();
        for _ in 0..5 {
            leased.push(pool.get_connection().await.unwrap());
        }
        let ids: HashSet<&str> = leased.iter().map(|conn| conn.id()).collect();
        assert_eq!(ids.len(), 5);
        assert_eq!(pool.status().await.leased, 5);

        for conn in leased {
            assert!(conn.release().await);
        }
    }

    #[tokio::test]
    async fn test_release_to_foreign_pool_is_refused() {
        let driver = Arc::new(MockDriver::default());
        let pool_a = open_pool(&driver, PoolConfig::default().with_pool_size(1)).await;
        let pool_b = open_pool(&driver, PoolConfig::default().with_pool_size(1)).await;

        let conn = pool_a.get_connection().await.unwrap();
        assert!(!pool_b.release_connection(conn).await);
        assert_eq!(pool_b.status().await.idle, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_connection_returns_to_pool() {
        let driver = Arc::new(MockDriver::default());
        let pool = open_pool(&driver, PoolConfig::default().with_pool_size(1)).await;

        let conn = pool.get_connection().await.unwrap();
        drop(conn);
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(pool.status().await.idle, 1);
        assert!(pool.get_connection().await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_leak_detected_exactly_once() {
        let driver = Arc::new(MockDriver::default());
        let config = PoolConfig::default()
            .with_pool_size(2)
            .with_leak_timeout(Duration::from_secs(10));
        let pool = open_pool(&driver, config).await;

        let conn = pool.get_connection().await.unwrap();
        let leaked_id = conn.id().to_string();
        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(pool.status().await.leaks_detected, 1);

        tokio::time::sleep(Duration::from_secs(100)).await;
        assert_eq!(pool.status().await.leaks_detected, 1);
        assert_eq!(pool.leak_report().await.unwrap().connection_id, leaked_id);

        match pool.get_connection().await {
            Err(MapperError::ConnectionLeaked {
                connection_id,
                window_ms,
            }) => {
                assert_eq!(connection_id, leaked_id);
                assert_eq!(window_ms, 10_000);
            }
            other => panic!("expected ConnectionLeaked, got {:?}", other),
        }
        drop(conn);
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_cancels_leak_timer() {
        let driver = Arc::new(MockDriver::default());
        let config = PoolConfig::default()
            .with_pool_size(1)
            .with_leak_timeout(Duration::from_secs(10));
        let pool = open_pool(&driver, config).await;

        let conn = pool.get_connection().await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(conn.release().await);
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert_eq!(pool.status().await.leaks_detected, 0);
        assert!(pool.get_connection().await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_keep_alive_pings_only_idle_connections() {
        let driver = Arc::new(MockDriver::default());
        let config = PoolConfig::default()
            .with_pool_size(2)
            .with_keep_alive(Duration::from_secs(60));
        let pool = open_pool(&driver, config).await;

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(driver.pings.load(Ordering::SeqCst), 2);

        let conn = pool.get_connection().await.unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(driver.pings.load(Ordering::SeqCst), 3);
        assert!(conn.release().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_keep_alive_is_retried() {
        let driver = Arc::new(MockDriver::default());
        driver.failing_pings.store(true, Ordering::SeqCst);
        let config = PoolConfig::default()
            .with_pool_size(1)
            .with_keep_alive(Duration::from_secs(60));
        let pool = open_pool(&driver, config).await;

        for round in 1..=3 {
            tokio::time::sleep(Duration::from_secs(60)).await;
            tokio::time::sleep(Duration::from_millis(1)).await;
            assert_eq!(driver.pings.load(Ordering::SeqCst), round);
        }

        let status = pool.status().await;
        assert_eq!(status.live, 1);
        assert_eq!(status.idle, 1);

        let conn = pool.get_connection().await.unwrap();
        assert_eq!(driver.opened.load(Ordering::SeqCst), 1);
        assert!(conn.release().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keep_alive_removes_closed_connection() {
        let driver = Arc::new(MockDriver::default());
        let config = PoolConfig::default()
            .with_pool_size(2)
            .with_keep_alive(Duration::from_secs(60));
        let pool = open_pool(&driver, config).await;

        driver.closed_flags.lock()[0].store(true, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(61)).await;

        let status = pool.status().await;
        assert_eq!(status.live, 1);
        assert_eq!(status.idle, 1);

        // the missing connection is replaced lazily
        let first = pool.get_connection().await.unwrap();
        let second = pool.get_connection().await.unwrap();
        assert_eq!(driver.opened.load(Ordering::SeqCst), 3);
        assert!(first.release().await);
        assert!(second.release().await);
    }

    #[tokio::test]
    async fn test_connections_metadata() {
        let driver = Arc::new(MockDriver::default());
        let pool = open_pool(&driver, PoolConfig::default().with_pool_size(2)).await;

        let conn = pool.get_connection().await.unwrap();
        let infos = pool.connections().await;
        assert_eq!(infos.len(), 2);
        let leased = infos
            .iter()
            .find(|info| info.connection_id == conn.id())
            .unwrap();
        assert_eq!(leased.state, ConnectionState::Leased);
        assert!(leased.leased_at.is_some());
        assert!(infos.iter().all(|info| info.connection_id.starts_with("conn_")));
        assert!(conn.release().await);
    }
}

//! Per-instance connection pool on top of the redis client.
//!
//! # Responsibilities
//! - Bound the number of connections open to one backend
//! - Reuse idle connections and reap the ones idle for too long
//! - Enforce dial, pool and command deadlines
//! - Keep a dedicated connection for health probes so probing never
//!   competes with command traffic for a pool slot

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{Cmd, Pipeline, Value};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time;
use url::Url;

use crate::client::CommandExecutor;
use crate::config::validation::{parse_tcp_addr, ValidationError};
use crate::config::{ClientOptions, ConfigError, InstanceOptions, Network};
use crate::error::{Error, Result};
use crate::pool::PoolStats;

struct IdleConn {
    conn: MultiplexedConnection,
    idle_since: Instant,
}

/// A connection taken out of the pool, holding one pool slot.
///
/// Counted in `total_conns` until it is either parked back on the idle list
/// or dropped, including when the command future is cancelled mid-flight.
struct Checkout<'a> {
    pool: &'a ConnPool,
    conn: MultiplexedConnection,
    parked: bool,
    _slot: OwnedSemaphorePermit,
}

impl Drop for Checkout<'_> {
    fn drop(&mut self) {
        if !self.parked {
            self.pool.total_conns.fetch_sub(1, Ordering::Relaxed);
        }
    }
}

/// Connection pool for a single backend.
pub struct ConnPool {
    addr: String,
    client: redis::Client,
    options: ClientOptions,

    idle: Mutex<Vec<IdleConn>>,
    slots: Arc<Semaphore>,
    probe_conn: tokio::sync::Mutex<Option<MultiplexedConnection>>,
    closed: AtomicBool,

    requests: AtomicU64,
    hits: AtomicU64,
    timeouts: AtomicU64,
    total_conns: AtomicU64,
}

impl std::fmt::Debug for ConnPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnPool")
            .field("addr", &self.addr)
            .field("stats", &self.stats())
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish()
    }
}

impl ConnPool {
    /// Create a pool for one instance. No connection is opened until first use.
    ///
    /// When idle reaping is configured the reaper task is spawned here, and
    /// [`Error::NoRuntime`] is returned outside of a Tokio runtime.
    pub fn new(options: &InstanceOptions) -> Result<Arc<Self>> {
        let url = connection_url(&options.addr, &options.client)?;
        let client = redis::Client::open(url.as_str())?;

        let pool = Arc::new(Self {
            addr: options.addr.clone(),
            client,
            options: options.client.clone(),
            idle: Mutex::new(Vec::with_capacity(options.client.pool_size)),
            slots: Arc::new(Semaphore::new(options.client.pool_size)),
            probe_conn: tokio::sync::Mutex::new(None),
            closed: AtomicBool::new(false),
            requests: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
            total_conns: AtomicU64::new(0),
        });

        if let (Some(idle_timeout), Some(every)) = (
            options.client.idle_timeout(),
            options.client.idle_check_frequency(),
        ) {
            let runtime = Handle::try_current().map_err(|_| Error::NoRuntime)?;
            runtime.spawn(reap_idle(Arc::downgrade(&pool), idle_timeout, every));
        }

        Ok(pool)
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            requests: self.requests.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            total_conns: self.total_conns.load(Ordering::Relaxed),
            free_conns: self.idle_conns().len() as u64,
        }
    }

    fn idle_conns(&self) -> MutexGuard<'_, Vec<IdleConn>> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_stale(&self, entry: &IdleConn) -> bool {
        self.options
            .idle_timeout()
            .is_some_and(|limit| entry.idle_since.elapsed() >= limit)
    }

    async fn checkout(&self) -> Result<Checkout<'_>> {
        if self.is_closed() {
            return Err(Error::Closed);
        }
        self.requests.fetch_add(1, Ordering::Relaxed);

        let slot = match time::timeout(
            self.options.pool_timeout(),
            self.slots.clone().acquire_owned(),
        )
        .await
        {
            Ok(Ok(slot)) => slot,
            // The semaphore is only closed by `close()`.
            Ok(Err(_)) => return Err(Error::Closed),
            Err(_) => {
                self.timeouts.fetch_add(1, Ordering::Relaxed);
                return Err(Error::PoolTimeout);
            }
        };

        if let Some(conn) = self.pop_idle() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(self.checked_out(conn, slot));
        }

        let conn = self.dial().await?;
        self.total_conns.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(addr = %self.addr, "opened new connection");
        Ok(self.checked_out(conn, slot))
    }

    fn checked_out(
        &self,
        conn: MultiplexedConnection,
        slot: OwnedSemaphorePermit,
    ) -> Checkout<'_> {
        Checkout {
            pool: self,
            conn,
            parked: false,
            _slot: slot,
        }
    }

    fn pop_idle(&self) -> Option<MultiplexedConnection> {
        let mut idle = self.idle_conns();
        while let Some(entry) = idle.pop() {
            if self.is_stale(&entry) {
                self.total_conns.fetch_sub(1, Ordering::Relaxed);
                continue;
            }
            return Some(entry.conn);
        }
        None
    }

    async fn dial(&self) -> Result<MultiplexedConnection> {
        match time::timeout(
            self.options.dial_timeout(),
            self.client.get_multiplexed_async_connection(),
        )
        .await
        {
            Ok(conn) => Ok(conn?),
            Err(_) => Err(Error::DialTimeout(self.addr.clone())),
        }
    }

    /// Return a connection to the idle list, or drop it.
    fn release(&self, mut checkout: Checkout<'_>, reusable: bool) {
        let mut idle = self.idle_conns();
        if reusable && !self.is_closed() {
            idle.push(IdleConn {
                conn: checkout.conn.clone(),
                idle_since: Instant::now(),
            });
            checkout.parked = true;
        }
    }

    async fn with_conn<T, F, Fut>(&self, f: F) -> Result<T>
    where
        F: FnOnce(MultiplexedConnection) -> Fut,
        Fut: Future<Output = redis::RedisResult<T>>,
    {
        let checkout = self.checkout().await?;
        let outcome = time::timeout(self.options.command_timeout(), f(checkout.conn.clone())).await;

        match outcome {
            Ok(Ok(value)) => {
                self.release(checkout, true);
                Ok(value)
            }
            Ok(Err(e)) => {
                // Error replies leave the connection usable, transport errors don't.
                let broken = e.is_io_error() || e.is_connection_dropped();
                self.release(checkout, !broken);
                Err(e.into())
            }
            Err(_) => {
                self.release(checkout, false);
                Err(Error::Timeout)
            }
        }
    }

    /// Drop idle connections past the idle timeout. Returns how many were dropped.
    fn reap_stale(&self) -> usize {
        let mut idle = self.idle_conns();
        let before = idle.len();
        idle.retain(|entry| !self.is_stale(entry));
        let reaped = before - idle.len();
        self.total_conns.fetch_sub(reaped as u64, Ordering::Relaxed);
        reaped
    }
}

#[async_trait]
impl CommandExecutor for ConnPool {
    async fn execute(&self, cmd: &Cmd) -> Result<Value> {
        let value: Value = self
            .with_conn(|mut conn| async move { cmd.query_async(&mut conn).await })
            .await?;
        match value {
            Value::Nil => Err(Error::Nil),
            value => Ok(value),
        }
    }

    async fn execute_pipeline(&self, pipe: &Pipeline) -> Result<Vec<Value>> {
        self.with_conn(|mut conn| async move { pipe.query_async(&mut conn).await })
            .await
    }

    async fn probe(&self) -> Result<()> {
        let mut slot = self.probe_conn.lock().await;
        if self.is_closed() {
            slot.take();
            return Err(Error::Closed);
        }

        let mut conn = match slot.take() {
            Some(conn) => conn,
            None => self.dial().await?,
        };

        let ping = redis::cmd("PING");
        let outcome: std::result::Result<redis::RedisResult<String>, time::error::Elapsed> =
            time::timeout(self.options.read_timeout(), ping.query_async(&mut conn)).await;

        match outcome {
            // `close` may have run while the probe was in flight.
            Ok(Ok(_)) if self.is_closed() => Err(Error::Closed),
            Ok(Ok(_)) => {
                *slot = Some(conn);
                Ok(())
            }
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(Error::Timeout),
        }
    }

    fn pool_stats(&self) -> PoolStats {
        self.stats()
    }

    fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(Error::Closed);
        }
        self.slots.close();

        let drained = {
            let mut idle = self.idle_conns();
            let drained = idle.len();
            idle.clear();
            drained
        };
        self.total_conns.fetch_sub(drained as u64, Ordering::Relaxed);

        if let Ok(mut probe) = self.probe_conn.try_lock() {
            probe.take();
        }

        tracing::debug!(addr = %self.addr, drained, "connection pool closed");
        Ok(())
    }
}

async fn reap_idle(pool: Weak<ConnPool>, idle_timeout: Duration, every: Duration) {
    let mut ticker = time::interval(every);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let Some(pool) = pool.upgrade() else {
            break;
        };
        if pool.is_closed() {
            break;
        }
        let reaped = pool.reap_stale();
        if reaped > 0 {
            tracing::debug!(
                addr = %pool.addr,
                reaped,
                idle_timeout_ms = idle_timeout.as_millis() as u64,
                "reaped idle connections"
            );
        }
    }
}

/// Build the redis connection URL for one instance.
pub fn connection_url(addr: &str, options: &ClientOptions) -> Result<Url> {
    let invalid = |reason: &'static str| {
        Error::Config(ConfigError::Validation(vec![ValidationError::InvalidAddress {
            addr: addr.to_string(),
            reason,
        }]))
    };

    match options.network {
        Network::Tcp => {
            parse_tcp_addr(addr).map_err(|e| Error::Config(ConfigError::Validation(vec![e])))?;
            let scheme = if options.tls.is_some() { "rediss" } else { "redis" };
            let mut url = Url::parse(&format!("{scheme}://{addr}/{}", options.db))
                .map_err(|_| invalid("not a valid host"))?;
            if let Some(password) = &options.password {
                url.set_password(Some(password))
                    .map_err(|_| invalid("cannot carry a password"))?;
            }
            if options.tls.as_ref().is_some_and(|tls| tls.insecure) {
                url.set_fragment(Some("insecure"));
            }
            Ok(url)
        }
        Network::Unix => {
            let path = addr.trim();
            if path.is_empty() {
                return Err(invalid("empty socket path"));
            }
            let mut url = Url::parse(&format!("redis+unix://{path}"))
                .map_err(|_| invalid("not a valid socket path"))?;
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("db", &options.db.to_string());
                if let Some(password) = &options.password {
                    query.append_pair("pass", password);
                }
            }
            Ok(url)
        }
    }
}

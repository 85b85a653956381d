//! Connection pool for typed RPC backends.
//!
//! # Responsibilities
//! - Keep at most one live multiplexed connection per backend
//! - Dial lazily on first use and again after a connection breaks
//! - Collapse concurrent dials for the same backend into one
//! - Bound every dial (lock wait included) by the dial timeout
//!
//! # Design Decisions
//! - The live connection sits in an `ArcSwapOption`; the fast path is a
//!   lock-free load
//! - Dials are serialized per backend with an async mutex, so callers that
//!   race a dial wait for it instead of dialing again
//! - A failed dial leaves the slot empty and retryable; the next caller dials
//!   again
//! - Connections are handed out as RAII handles tracking in-flight calls

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::error::GatewayError;
use crate::observability::metrics;
use crate::upstream::registry::{BackendDescriptor, BackendKind, BackendRegistry};

/// A dial attempt failed.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct DialError(pub String);

/// Opens connections to backends.
#[async_trait]
pub trait Dialer: Send + Sync + 'static {
    /// Cheaply clonable handle to a multiplexed connection.
    type Channel: Clone + Send + Sync + 'static;

    async fn dial(&self, backend: &BackendDescriptor) -> Result<Self::Channel, DialError>;
}

/// Connection lifecycle state.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle = 0,
    Active = 1,
    Broken = 2,
}

/// One live connection.
pub struct Connection<C> {
    backend: BackendKind,
    channel: C,
    in_flight: AtomicUsize,
    broken: AtomicU8,
}

impl<C> Connection<C> {
    fn new(backend: BackendKind, channel: C) -> Self {
        Self {
            backend,
            channel,
            in_flight: AtomicUsize::new(0),
            broken: AtomicU8::new(0),
        }
    }

    pub fn state(&self) -> ConnectionState {
        if self.broken.load(Ordering::Acquire) != 0 {
            ConnectionState::Broken
        } else if self.in_flight.load(Ordering::Relaxed) > 0 {
            ConnectionState::Active
        } else {
            ConnectionState::Idle
        }
    }

    fn is_usable(&self) -> bool {
        self.broken.load(Ordering::Acquire) == 0
    }
}

impl<C> fmt::Debug for Connection<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("backend", &self.backend)
            .field("state", &self.state())
            .field("in_flight", &self.in_flight.load(Ordering::Relaxed))
            .finish()
    }
}

/// A RAII guard over a pooled connection; tracks the in-flight call count.
#[derive(Debug)]
pub struct ConnectionHandle<C> {
    conn: Arc<Connection<C>>,
}

impl<C: Clone> ConnectionHandle<C> {
    fn new(conn: Arc<Connection<C>>) -> Self {
        conn.in_flight.fetch_add(1, Ordering::Relaxed);
        Self { conn }
    }

    /// A clone of the underlying channel.
    pub fn channel(&self) -> C {
        self.conn.channel.clone()
    }

    pub fn backend(&self) -> BackendKind {
        self.conn.backend
    }
}

impl<C> Drop for ConnectionHandle<C> {
    fn drop(&mut self) {
        self.conn.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}

struct Slot<C> {
    descriptor: BackendDescriptor,
    current: ArcSwapOption<Connection<C>>,
    dial_lock: Mutex<()>,
    dials: AtomicU64,
    last_dial_failed: AtomicU8,
}

impl<C> Slot<C> {
    fn new(descriptor: BackendDescriptor) -> Self {
        Self {
            descriptor,
            current: ArcSwapOption::empty(),
            dial_lock: Mutex::new(()),
            dials: AtomicU64::new(0),
            last_dial_failed: AtomicU8::new(0),
        }
    }

    fn usable(&self) -> Option<Arc<Connection<C>>> {
        self.current.load_full().filter(|c| c.is_usable())
    }

    fn mark_current_broken(&self) {
        if let Some(conn) = self.current.load_full() {
            conn.broken.store(1, Ordering::Release);
        }
    }
}

/// Per-backend connection pool.
pub struct ConnectionPool<D: Dialer> {
    dialer: D,
    dial_timeout: Duration,
    slots: HashMap<BackendKind, Slot<D::Channel>>,
}

impl<D: Dialer> ConnectionPool<D> {
    /// Create a pool with one (empty) slot per registered backend.
    pub fn new(registry: &BackendRegistry, dialer: D, dial_timeout: Duration) -> Self {
        let slots = registry
            .services()
            .map(|(kind, descriptor)| (kind, Slot::new(descriptor.clone())))
            .collect();
        Self {
            dialer,
            dial_timeout,
            slots,
        }
    }

    /// Return a live connection to `backend`, dialing if needed.
    pub async fn get_connection(
        &self,
        backend: BackendKind,
    ) -> Result<ConnectionHandle<D::Channel>, GatewayError> {
        let slot = self
            .slots
            .get(&backend)
            .ok_or_else(|| GatewayError::BackendUnavailable {
                backend: backend.to_string(),
                reason: "backend not registered".into(),
            })?;

        if let Some(conn) = slot.usable() {
            return Ok(ConnectionHandle::new(conn));
        }

        match tokio::time::timeout(self.dial_timeout, self.redial(backend, slot)).await {
            Ok(result) => result,
            Err(_) => {
                slot.last_dial_failed.store(1, Ordering::Relaxed);
                tracing::warn!(
                    backend = %backend,
                    timeout_ms = self.dial_timeout.as_millis() as u64,
                    "Dial timed out"
                );
                metrics::record_dial(backend.as_str(), false);
                Err(GatewayError::BackendUnavailable {
                    backend: backend.to_string(),
                    reason: format!("dial timed out after {}ms", self.dial_timeout.as_millis()),
                })
            }
        }
    }

    async fn redial(
        &self,
        backend: BackendKind,
        slot: &Slot<D::Channel>,
    ) -> Result<ConnectionHandle<D::Channel>, GatewayError> {
        let _guard = slot.dial_lock.lock().await;

        // Another caller may have finished a dial while we waited.
        if let Some(conn) = slot.usable() {
            return Ok(ConnectionHandle::new(conn));
        }

        slot.dials.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(backend = %backend, address = %slot.descriptor.address, "Dialing backend");

        match self.dialer.dial(&slot.descriptor).await {
            Ok(channel) => {
                let conn = Arc::new(Connection::new(backend, channel));
                slot.current.store(Some(conn.clone()));
                slot.last_dial_failed.store(0, Ordering::Relaxed);
                metrics::record_dial(backend.as_str(), true);
                tracing::info!(backend = %backend, "Backend connection established");
                Ok(ConnectionHandle::new(conn))
            }
            Err(e) => {
                slot.mark_current_broken();
                slot.last_dial_failed.store(1, Ordering::Relaxed);
                metrics::record_dial(backend.as_str(), false);
                tracing::warn!(backend = %backend, error = %e, "Dial failed");
                Err(GatewayError::BackendUnavailable {
                    backend: backend.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Mark the connection behind `handle` broken; the next caller redials.
    pub fn mark_broken(&self, handle: &ConnectionHandle<D::Channel>) {
        let previous = handle.conn.broken.swap(1, Ordering::AcqRel);
        if previous == 0 {
            tracing::warn!(backend = %handle.backend(), "Backend connection marked broken");
        }
    }

    /// State of the current connection, `None` if never dialed.
    pub fn state(&self, backend: BackendKind) -> Option<ConnectionState> {
        let slot = self.slots.get(&backend)?;
        match slot.current.load_full() {
            Some(conn) if conn.is_usable() => Some(conn.state()),
            Some(_) => Some(ConnectionState::Broken),
            None if slot.last_dial_failed.load(Ordering::Relaxed) != 0 => Some(ConnectionState::Broken),
            None => None,
        }
    }

    /// Number of dials performed for `backend`.
    pub fn dial_count(&self, backend: BackendKind) -> u64 {
        self.slots
            .get(&backend)
            .map(|s| s.dials.load(Ordering::Relaxed))
            .unwrap_or(0)
    }
}

impl<D: Dialer> fmt::Debug for ConnectionPool<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("backends", &self.slots.len())
            .field("dial_timeout", &self.dial_timeout)
            .finish()
    }
}

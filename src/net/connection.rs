//! Session identity and admission tracking.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Enforce the concurrent session limit
//! - Track live sessions so shutdown can drain them

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::observability::metrics;

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Bounded admission and live-session accounting.
///
/// Cloning yields another handle to the same counters.
#[derive(Debug, Clone)]
pub struct SessionTracker {
    permits: Arc<Semaphore>,
    active_count: Arc<AtomicU64>,
    max_sessions: usize,
}

impl SessionTracker {
    /// Create a tracker admitting at most `max_sessions` concurrent sessions.
    pub fn new(max_sessions: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_sessions)),
            active_count: Arc::new(AtomicU64::new(0)),
            max_sessions,
        }
    }

    /// Admit a new session if a slot is free. The slot is held until the
    /// returned guard is dropped.
    pub fn try_admit(&self) -> Option<SessionGuard> {
        let permit = Arc::clone(&self.permits).try_acquire_owned().ok()?;
        let active = self.active_count.fetch_add(1, Ordering::SeqCst) + 1;
        metrics::set_active_sessions(active);
        Some(SessionGuard {
            _permit: permit,
            active_count: Arc::clone(&self.active_count),
            id: ConnectionId::new(),
        })
    }

    /// Get current live session count.
    pub fn active_count(&self) -> u64 {
        self.active_count.load(Ordering::SeqCst)
    }

    /// Configured maximum concurrent sessions.
    pub fn max_sessions(&self) -> usize {
        self.max_sessions
    }

    /// Wait until every session has ended or `grace` elapses.
    /// Returns `true` when all sessions drained in time.
    pub async fn drain(&self, grace: Duration) -> bool {
        let wait = async {
            while self.active_count.load(Ordering::SeqCst) > 0 {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        };
        tokio::time::timeout(grace, wait).await.is_ok()
    }
}

/// Guard that tracks a session's lifetime.
/// Releases the admission slot and decrements the live count when dropped.
#[derive(Debug)]
pub struct SessionGuard {
    _permit: OwnedSemaphorePermit,
    active_count: Arc<AtomicU64>,
    id: ConnectionId,
}

impl SessionGuard {
    /// Get this session's ID.
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let active = self.active_count.fetch_sub(1, Ordering::SeqCst) - 1;
        metrics::set_active_sessions(active);
        tracing::trace!(connection_id = %self.id, "Session slot released");
    }
}

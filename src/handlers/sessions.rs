use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{info, warn};

pub type SessionId = u64;

#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub user_agent: Option<String>,
    pub opened_at: Instant,
}

/// Live tracking sessions, capped at a fixed number of concurrent ones.
pub struct SessionRegistry {
    sessions: DashMap<SessionId, SessionInfo>,
    permits: Arc<Semaphore>,
    next_id: AtomicU64,
}

impl SessionRegistry {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            permits: Arc::new(Semaphore::new(max_sessions)),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers a new session, or returns `None` when the limit is reached.
    pub fn try_open(self: &Arc<Self>, user_agent: Option<String>) -> Option<SessionGuard> {
        let permit = match self.permits.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                warn!("Session limit reached ({} active)", self.len());
                return None;
            }
        };

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.sessions.insert(id, SessionInfo { user_agent, opened_at: Instant::now() });
        info!("Opened session {} ({} active)", id, self.len());

        Some(SessionGuard {
            id,
            registry: self.clone(),
            _permit: permit,
        })
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn get(&self, id: SessionId) -> Option<SessionInfo> {
        self.sessions.get(&id).map(|entry| entry.value().clone())
    }
}

/// Keeps a session registered; dropping it frees the slot.
pub struct SessionGuard {
    id: SessionId,
    registry: Arc<SessionRegistry>,
    _permit: OwnedSemaphorePermit,
}

impl SessionGuard {
    pub fn id(&self) -> SessionId {
        self.id
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if let Some((id, info)) = self.registry.sessions.remove(&self.id) {
            info!("Closed session {} after {:?}", id, info.opened_at.elapsed());
        }
    }
}

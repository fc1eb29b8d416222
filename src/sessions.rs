//! MCP session registry.
//!
//! A session is created by `initialize` and identified by a UUID v4 returned in
//! the `Mcp-Session-Id` response header. Sessions carry no state beyond an
//! "initialized" flag and timestamps; they exist for correlation only and are
//! swept once idle for longer than the configured timeout.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Per-session bookkeeping.
#[derive(Debug, Clone)]
pub struct Session {
    pub initialized: bool,
    pub created_at: Instant,
    pub last_seen: Instant,
}

/// Cheaply cloneable handle to the shared session map.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<HashMap<String, Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an initialized session and return its id.
    pub async fn create(&self) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Instant::now();
        self.sessions.lock().await.insert(
            id.clone(),
            Session {
                initialized: true,
                created_at: now,
                last_seen: now,
            },
        );
        debug!("Session {id} created");
        id
    }

    /// Refresh `last_seen` for a known session. Returns false for unknown ids.
    pub async fn touch(&self, id: &str) -> bool {
        match self.sessions.lock().await.get_mut(id) {
            Some(session) => {
                session.last_seen = Instant::now();
                true
            }
            None => false,
        }
    }

    pub async fn get(&self, id: &str) -> Option<Session> {
        self.sessions.lock().await.get(id).cloned()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Drop sessions idle for longer than `max_idle`. Returns the evicted ids.
    pub async fn sweep(&self, max_idle: Duration) -> Vec<String> {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().await;
        let expired: Vec<String> = sessions
            .iter()
            .filter(|(_, s)| now.duration_since(s.last_seen) > max_idle)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &expired {
            sessions.remove(id);
        }
        expired
    }
}

//! # Application State
//!
//! Shared state handed to every handler.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  AppState (Clone, cheap)                                                │
//! │   ├── catalog:     Arc<dyn CatalogLookup>                               │
//! │   ├── submission:  Arc<dyn OrderSubmission>                             │
//! │   ├── records:     Arc<dyn RecordStore>                                 │
//! │   └── sessions:    SessionStore                                         │
//! │                     RwLock<HashMap<Uuid, Session>>                      │
//! │                     Session { Arc<Mutex<DraftOrder>>, last_seen }       │
//! │                                                                         │
//! │  THREAD SAFETY:                                                        │
//! │  • The map lock is held only to look a session up                      │
//! │  • Each draft has its own async Mutex; every mutation of one draft,    │
//! │    including a submission in flight, takes it exclusively             │
//! │  • Different sessions never block each other                           │
//! │                                                                         │
//! │  EVICTION:                                                             │
//! │  • A sweep drops sessions idle for longer than the TTL                 │
//! │  • Opening past the cap drops the least recently used session          │
//! │  • A draft with a command in flight is never dropped by the sweep      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use sto_core::{CatalogLookup, DraftOrder, OrderSubmission, RecordStore, DEFAULT_SEARCH_LIMIT};

use crate::error::ApiError;

/// Sessions kept open at most, unless configured otherwise.
pub const DEFAULT_MAX_SESSIONS: usize = 1000;

/// Idle time after which a session is dropped, unless configured otherwise.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(4 * 60 * 60);

/// How often the idle sweep runs.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// One session's draft, locked for the whole of each command.
pub type SharedDraft = Arc<Mutex<DraftOrder>>;

struct Session {
    draft: SharedDraft,
    last_seen: Instant,
}

/// Open sessions by id.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, Session>>>,
    max_sessions: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        SessionStore::with_capacity(DEFAULT_MAX_SESSIONS)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding at most `max_sessions` sessions (at least one).
    pub fn with_capacity(max_sessions: usize) -> Self {
        SessionStore {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            max_sessions: max_sessions.max(1),
        }
    }

    /// Opens a session with an empty draft.
    ///
    /// At capacity, the session used least recently makes room.
    pub async fn open(&self) -> (Uuid, SharedDraft) {
        let id = Uuid::new_v4();
        let draft = Arc::new(Mutex::new(DraftOrder::new()));
        let mut sessions = self.sessions.write().await;

        while sessions.len() >= self.max_sessions {
            let Some(oldest) = sessions
                .iter()
                .min_by_key(|(_, session)| session.last_seen)
                .map(|(key, _)| *key)
            else {
                break;
            };
            sessions.remove(&oldest);
            info!(session = %oldest, max = self.max_sessions, "Session evicted, store full");
        }

        sessions.insert(
            id,
            Session {
                draft: draft.clone(),
                last_seen: Instant::now(),
            },
        );
        info!(session = %id, open = sessions.len(), "Session opened");
        (id, draft)
    }

    /// The draft of session `id`. Counts as activity on the session.
    ///
    /// Malformed ids are reported like unknown ones.
    pub async fn get(&self, id: &str) -> Result<SharedDraft, ApiError> {
        let key = parse_id(id)?;
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&key)
            .ok_or_else(|| ApiError::not_found("Session", id))?;
        session.last_seen = Instant::now();
        Ok(session.draft.clone())
    }

    /// Removes session `id` and returns its draft.
    pub async fn close(&self, id: &str) -> Result<SharedDraft, ApiError> {
        let key = parse_id(id)?;
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .remove(&key)
            .ok_or_else(|| ApiError::not_found("Session", id))?;
        info!(session = %key, open = sessions.len(), "Session closed");
        Ok(session.draft)
    }

    /// Drops sessions idle for `ttl` or longer as of `now`. Returns how many
    /// were dropped.
    pub async fn evict_idle(&self, now: Instant, ttl: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();

        sessions.retain(|id, session| {
            if now.saturating_duration_since(session.last_seen) < ttl {
                return true;
            }
            // Locked means a command is running on it right now
            match session.draft.try_lock() {
                Ok(draft) => {
                    let age = Utc::now().signed_duration_since(draft.started_at());
                    info!(session = %id, age_minutes = age.num_minutes(), "Idle session evicted");
                    false
                }
                Err(_) => true,
            }
        });

        let evicted = before - sessions.len();
        if evicted > 0 {
            debug!(evicted, open = sessions.len(), "Idle sweep");
        }
        evicted
    }

    /// Runs [`SessionStore::evict_idle`] every [`SWEEP_INTERVAL`] until the
    /// runtime shuts down.
    pub fn spawn_sweeper(&self, ttl: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SWEEP_INTERVAL.min(ttl));
            loop {
                ticker.tick().await;
                store.evict_idle(Instant::now(), ttl).await;
            }
        })
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

fn parse_id(id: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(id.trim()).map_err(|_| ApiError::not_found("Session", id))
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn CatalogLookup>,
    pub submission: Arc<dyn OrderSubmission>,
    pub records: Arc<dyn RecordStore>,
    pub sessions: SessionStore,
    /// Result cap when a search does not ask for one
    pub search_limit: usize,
}

impl AppState {
    pub fn new(
        catalog: Arc<dyn CatalogLookup>,
        submission: Arc<dyn OrderSubmission>,
        records: Arc<dyn RecordStore>,
    ) -> Self {
        AppState {
            catalog,
            submission,
            records,
            sessions: SessionStore::new(),
            search_limit: DEFAULT_SEARCH_LIMIT,
        }
    }

    pub fn with_search_limit(mut self, limit: usize) -> Self {
        self.search_limit = limit;
        self
    }

    pub fn with_sessions(mut self, sessions: SessionStore) -> Self {
        self.sessions = sessions;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[tokio::test]
    async fn test_open_get_close() {
        let store = SessionStore::new();
        let (id, _) = store.open().await;

        assert!(store.get(&id.to_string()).await.is_ok());
        assert_eq!(store.len().await, 1);

        store.close(&id.to_string()).await.unwrap();
        assert_eq!(store.len().await, 0);
        let err = store.get(&id.to_string()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let store = SessionStore::new();
        let (a, _) = store.open().await;
        let (b, _) = store.open().await;

        store
            .get(&a.to_string())
            .await
            .unwrap()
            .lock()
            .await
            .begin("client-a".into());

        let other = store.get(&b.to_string()).await.unwrap();
        assert!(other.lock().await.client().is_none());
    }

    #[tokio::test]
    async fn test_malformed_id_is_not_found() {
        let store = SessionStore::new();
        let err = store.get("not-a-uuid").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
        assert!(store.close("").await.is_err());
    }

    #[tokio::test]
    async fn test_idle_sessions_are_evicted() {
        let store = SessionStore::new();
        let (stale, _) = store.open().await;
        let ttl = Duration::from_secs(60);

        assert_eq!(store.evict_idle(Instant::now(), ttl).await, 0);
        assert_eq!(store.evict_idle(Instant::now() + ttl, ttl).await, 1);

        let err = store.get(&stale.to_string()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_activity_keeps_session_alive() {
        let store = SessionStore::new();
        let (id, _) = store.open().await;
        let ttl = Duration::from_secs(60);

        tokio::time::sleep(Duration::from_millis(20)).await;
        let touched = Instant::now();
        store.get(&id.to_string()).await.unwrap();

        // Idle for ttl measured from the open, but not from the last use
        let now = touched + ttl - Duration::from_millis(10);
        assert_eq!(store.evict_idle(now, ttl).await, 0);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_busy_draft_survives_sweep() {
        let store = SessionStore::new();
        let (id, draft) = store.open().await;
        let ttl = Duration::from_secs(60);

        let guard = draft.lock().await;
        assert_eq!(store.evict_idle(Instant::now() + ttl, ttl).await, 0);
        drop(guard);

        assert!(store.get(&id.to_string()).await.is_ok());
    }

    #[tokio::test]
    async fn test_capacity_evicts_least_recently_used() {
        let store = SessionStore::with_capacity(2);
        let (a, _) = store.open().await;
        let (b, _) = store.open().await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        store.get(&a.to_string()).await.unwrap();

        let (c, _) = store.open().await;

        assert_eq!(store.len().await, 2);
        assert!(store.get(&a.to_string()).await.is_ok());
        assert!(store.get(&b.to_string()).await.is_err());
        assert!(store.get(&c.to_string()).await.is_ok());
    }

    #[tokio::test]
    async fn test_many_abandoned_sessions_stay_bounded() {
        let store = SessionStore::with_capacity(100);
        for _ in 0..1_000 {
            store.open().await;
        }
        assert_eq!(store.len().await, 100);

        let ttl = Duration::from_secs(1);
        assert_eq!(store.evict_idle(Instant::now() + ttl, ttl).await, 100);
    }
}

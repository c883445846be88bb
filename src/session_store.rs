//! Server-side session storage in the application's sled database.
//!
//! The browser only holds an encrypted cookie with a random session key;
//! the state itself lives in the `sessions` tree, so purging a session on
//! logout invalidates every copy of the cookie.

use actix_session::storage::{LoadError, SaveError, SessionKey, SessionStore, UpdateError};
use actix_web::cookie::time::{Duration, OffsetDateTime};
use actix_web::rt::task::JoinHandle;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::convert::TryInto;

const SESSIONS: &[u8] = b"sessions";
const SESSION_KEY_LEN: usize = 64;

#[derive(Serialize, Deserialize)]
struct StoredSession {
    state: HashMap<String, String>,
    /// Unix timestamp in seconds.
    expires_at: i64,
}

#[derive(Clone)]
pub struct SledSessionStore {
    sessions: sled::Tree,
}

fn now() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

fn expiry(ttl: &Duration) -> i64 {
    now().saturating_add(ttl.whole_seconds())
}

fn generate_session_key() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_KEY_LEN)
        .map(char::from)
        .collect()
}

impl SledSessionStore {
    pub fn open(db: &sled::Db) -> sled::Result<Self> {
        Ok(SledSessionStore {
            sessions: db.open_tree(SESSIONS)?,
        })
    }

    /// Removes every expired session. Returns how many were dropped.
    pub fn purge_expired(&self) -> sled::Result<usize> {
        let now = now();
        let mut purged = 0;
        for entry in self.sessions.iter() {
            let (key, raw) = entry?;
            let expired = bincode::deserialize::<StoredSession>(&raw)
                .map(|stored| stored.expires_at <= now)
                .unwrap_or(true);
            if expired {
                self.sessions.remove(key)?;
                purged += 1;
            }
        }
        Ok(purged)
    }

    /// Sweeps expired sessions every `period` for as long as the runtime
    /// lives. Sessions that are never presented again (an abandoned OAuth
    /// start, a closed browser) are otherwise only dropped on restart.
    pub fn spawn_purge_task(&self, period: std::time::Duration) -> JoinHandle<()> {
        let store = self.clone();
        actix_web::rt::spawn(async move {
            let mut ticks = actix_web::rt::time::interval(period);
            loop {
                ticks.tick().await;
                match store.purge_expired() {
                    Ok(0) => {}
                    Ok(purged) => log::debug!("purged {} expired sessions", purged),
                    Err(err) => log::warn!("could not purge expired sessions: {}", err),
                }
            }
        })
    }

    fn write(
        &self,
        key: &str,
        state: HashMap<String, String>,
        ttl: &Duration,
    ) -> Result<(), SaveError> {
        let stored = StoredSession {
            state,
            expires_at: expiry(ttl),
        };
        let raw = bincode::serialize(&stored)
            .map_err(anyhow::Error::new)
            .map_err(SaveError::Serialization)?;
        self.sessions
            .insert(key.as_bytes(), raw)
            .map_err(anyhow::Error::new)
            .map_err(SaveError::Other)?;
        Ok(())
    }
}

impl SessionStore for SledSessionStore {
    async fn load(
        &self,
        session_key: &SessionKey,
    ) -> Result<Option<HashMap<String, String>>, LoadError> {
        let key = session_key.as_ref();
        let raw = match self
            .sessions
            .get(key.as_bytes())
            .map_err(anyhow::Error::new)
            .map_err(LoadError::Other)?
        {
            Some(raw) => raw,
            None => return Ok(None),
        };
        let stored: StoredSession = bincode::deserialize(&raw)
            .map_err(anyhow::Error::new)
            .map_err(LoadError::Deserialization)?;
        if stored.expires_at <= now() {
            log::debug!("dropping expired session");
            self.sessions
                .remove(key.as_bytes())
                .map_err(anyhow::Error::new)
                .map_err(LoadError::Other)?;
            return Ok(None);
        }
        Ok(Some(stored.state))
    }

    async fn save(
        &self,
        session_state: HashMap<String, String>,
        ttl: &Duration,
    ) -> Result<SessionKey, SaveError> {
        let key = generate_session_key();
        self.write(&key, session_state, ttl)?;
        key.try_into().map_err(Into::into).map_err(SaveError::Other)
    }

    async fn update(
        &self,
        session_key: SessionKey,
        session_state: HashMap<String, String>,
        ttl: &Duration,
    ) -> Result<SessionKey, UpdateError> {
        let exists = self
            .sessions
            .contains_key(session_key.as_ref().as_bytes())
            .map_err(anyhow::Error::new)
            .map_err(UpdateError::Other)?;
        if !exists {
            // The session was purged (logout or expiry) while the client
            // still held the cookie: hand out a fresh key instead.
            return self
                .save(session_state, ttl)
                .await
                .map_err(|err| match err {
                    SaveError::Serialization(err) => UpdateError::Serialization(err),
                    SaveError::Other(err) => UpdateError::Other(err),
                });
        }
        self.write(session_key.as_ref(), session_state, ttl)
            .map_err(|err| match err {
                SaveError::Serialization(err) => UpdateError::Serialization(err),
                SaveError::Other(err) => UpdateError::Other(err),
            })?;
        Ok(session_key)
    }

    async fn update_ttl(&self, session_key: &SessionKey, ttl: &Duration) -> anyhow::Result<()> {
        let key = session_key.as_ref().as_bytes();
        if let Some(raw) = self.sessions.get(key)? {
            let mut stored: StoredSession = bincode::deserialize(&raw)?;
            stored.expires_at = expiry(ttl);
            self.sessions.insert(key, bincode::serialize(&stored)?)?;
        }
        Ok(())
    }

    async fn delete(&self, session_key: &SessionKey) -> anyhow::Result<()> {
        self.sessions.remove(session_key.as_ref().as_bytes())?;
        Ok(())
    }
}

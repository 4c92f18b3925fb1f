//! Per-session inactivity tracking.
//!
//! Every authenticated request touches its session. A session idle for longer
//! than the timeout is timed out: it stays rejected until the token it was
//! seen with expires, or until sign-in or refresh starts a new window.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
enum Entry {
    Active { last_seen: Instant, expires_at: i64 },
    /// Kept until `expires_at` (unix seconds); `revoked` once the caller was told to sign out
    TimedOut { expires_at: i64, revoked: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Touch {
    Active,
    /// First rejection after timing out. The caller should revoke the session.
    TimedOut,
    /// Timed out and already revoked
    Revoked,
}

#[cfg(test)]
impl Touch {
    pub fn is_active(self) -> bool {
        self == Touch::Active
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Sweep {
    pub timed_out: usize,
    pub purged: usize,
}

pub struct SessionActivity {
    timeout: Duration,
    sessions: Mutex<HashMap<String, Entry>>,
}

impl SessionActivity {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Record activity for a session whose token expires at `expires_at`
    pub fn touch(&self, key: &str, expires_at: i64) -> Touch {
        self.touch_at(key, expires_at, Instant::now())
    }

    pub fn touch_at(&self, key: &str, expires_at: i64, now: Instant) -> Touch {
        let mut map = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        let Some(entry) = map.get_mut(key) else {
            map.insert(
                key.to_string(),
                Entry::Active {
                    last_seen: now,
                    expires_at,
                },
            );
            return Touch::Active;
        };

        match *entry {
            Entry::Active {
                last_seen,
                expires_at: seen,
            } => {
                let expires_at = seen.max(expires_at);
                if now.saturating_duration_since(last_seen) > self.timeout {
                    *entry = Entry::TimedOut {
                        expires_at,
                        revoked: true,
                    };
                    Touch::TimedOut
                } else {
                    *entry = Entry::Active {
                        last_seen: now,
                        expires_at,
                    };
                    Touch::Active
                }
            }
            Entry::TimedOut {
                expires_at: seen,
                revoked,
            } => {
                // A token refreshed elsewhere for the same session is still timed out
                *entry = Entry::TimedOut {
                    expires_at: seen.max(expires_at),
                    revoked: true,
                };
                if revoked {
                    Touch::Revoked
                } else {
                    Touch::TimedOut
                }
            }
        }
    }

    /// Start a fresh activity window, e.g. after sign-in or refresh
    pub fn start(&self, key: &str, expires_at: i64) {
        let mut map = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        map.insert(
            key.to_string(),
            Entry::Active {
                last_seen: Instant::now(),
                expires_at,
            },
        );
    }

    pub fn forget(&self, key: &str) {
        let mut map = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        map.remove(key);
    }

    /// Time out idle sessions and purge timed-out ones whose token has expired
    pub fn cleanup(&self) -> Sweep {
        self.cleanup_at(Instant::now(), Utc::now().timestamp())
    }

    pub fn cleanup_at(&self, now: Instant, unix_now: i64) -> Sweep {
        let mut sweep = Sweep::default();
        let mut map = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        map.retain(|_, entry| match *entry {
            Entry::Active {
                last_seen,
                expires_at,
            } => {
                if now.saturating_duration_since(last_seen) > self.timeout {
                    *entry = Entry::TimedOut {
                        expires_at,
                        revoked: false,
                    };
                    sweep.timed_out += 1;
                }
                true
            }
            Entry::TimedOut { expires_at, .. } => {
                let keep = expires_at > unix_now;
                if !keep {
                    sweep.purged += 1;
                }
                keep
            }
        });
        sweep
    }

    #[cfg(test)]
    pub fn tracked(&self) -> usize {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

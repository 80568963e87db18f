//! Single-use, time-bounded challenge issuance keyed by (user, ceremony).

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::CHALLENGE_LEN;
use crate::store::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CeremonyType {
    Registration,
    Authentication,
}

#[derive(Debug, Clone)]
pub struct Challenge {
    pub bytes: [u8; CHALLENGE_LEN],
    pub user: UserId,
    pub ceremony: CeremonyType,
    pub issued_at: Instant,
    pub ttl: Duration,
}

impl Challenge {
    pub fn is_expired(&self) -> bool {
        self.issued_at.elapsed() > self.ttl
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ChallengeError {
    #[error("no pending challenge")]
    NotFound,
    #[error("challenge expired")]
    Expired,
    #[error("registry unavailable: {0}")]
    Unavailable(String),
}

/// Capability interface over pending-challenge state. At most one live
/// challenge exists per (user, ceremony) key; issuing again invalidates
/// the previous one, and `consume` removes the entry no matter how the
/// ceremony then turns out.
#[async_trait]
pub trait ChallengeRegistry: Send + Sync {
    async fn issue(
        &self,
        user: UserId,
        ceremony: CeremonyType,
        ttl: Duration,
    ) -> Result<Challenge, ChallengeError>;

    /// Atomically remove and return the pending challenge. Of two
    /// concurrent consumers exactly one gets the challenge; the other
    /// observes `NotFound`. An expired entry is removed and reported as
    /// `Expired`.
    async fn consume(
        &self,
        user: UserId,
        ceremony: CeremonyType,
    ) -> Result<Challenge, ChallengeError>;

    /// Drop every expired entry; returns how many were removed. Lazy
    /// eviction in `consume` already keeps the registry correct, this
    /// exists for embedders that run a periodic cleanup task.
    async fn sweep_expired(&self) -> usize;
}

/// Mutex-guarded map implementation; the default registry.
#[derive(Default)]
pub struct InMemoryChallengeRegistry {
    pending: Mutex<HashMap<(UserId, CeremonyType), Challenge>>,
}

impl InMemoryChallengeRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChallengeRegistry for InMemoryChallengeRegistry {
    async fn issue(
        &self,
        user: UserId,
        ceremony: CeremonyType,
        ttl: Duration,
    ) -> Result<Challenge, ChallengeError> {
        let challenge = Challenge {
            bytes: rand::thread_rng().r#gen(),
            user,
            ceremony,
            issued_at: Instant::now(),
            ttl,
        };
        self.pending
            .lock()
            .unwrap()
            .insert((user, ceremony), challenge.clone());
        Ok(challenge)
    }

    async fn consume(
        &self,
        user: UserId,
        ceremony: CeremonyType,
    ) -> Result<Challenge, ChallengeError> {
        let challenge = self
            .pending
            .lock()
            .unwrap()
            .remove(&(user, ceremony))
            .ok_or(ChallengeError::NotFound)?;
        if challenge.is_expired() {
            return Err(ChallengeError::Expired);
        }
        Ok(challenge)
    }

    async fn sweep_expired(&self) -> usize {
        let mut pending = self.pending.lock().unwrap();
        let before = pending.len();
        pending.retain(|_, c| !c.is_expired());
        before - pending.len()
    }
}

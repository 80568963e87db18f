use std::time::Duration;

use sha2::{Digest, Sha256};

/// Challenge entropy in bytes. 16 is the protocol floor; we issue 32.
pub const CHALLENGE_LEN: usize = 32;
/// Random user identifier length in bytes.
pub const USER_ID_LEN: usize = 16;
/// Default lifetime of an issued challenge.
pub const DEFAULT_CHALLENGE_TTL: Duration = Duration::from_secs(90);

/// Process-wide relying-party configuration. Built once at startup,
/// read-only afterwards.
#[derive(Debug, Clone)]
pub struct RpConfig {
    /// RP identifier, a registrable domain (e.g. `"rp.example"`).
    pub rp_id: String,
    /// Human-readable RP name shown by authenticators.
    pub rp_name: String,
    /// Origins (scheme+host+port) a response may claim, compared exactly.
    pub origins: Vec<String>,
    /// When true, the UV flag bit is mandatory, not just user presence.
    pub require_user_verification: bool,
    /// Lifetime of issued challenges.
    pub challenge_ttl: Duration,
}

impl RpConfig {
    pub fn new(
        rp_id: impl Into<String>,
        rp_name: impl Into<String>,
        origin: impl Into<String>,
    ) -> Self {
        Self {
            rp_id: rp_id.into(),
            rp_name: rp_name.into(),
            origins: vec![origin.into()],
            require_user_verification: false,
            challenge_ttl: DEFAULT_CHALLENGE_TTL,
        }
    }

    /// Add a further allowed origin (e.g. a second deployment host).
    pub fn allow_origin(mut self, origin: impl Into<String>) -> Self {
        self.origins.push(origin.into());
        self
    }

    pub fn require_user_verification(mut self, required: bool) -> Self {
        self.require_user_verification = required;
        self
    }

    pub fn challenge_ttl(mut self, ttl: Duration) -> Self {
        self.challenge_ttl = ttl;
        self
    }

    /// SHA-256 of the RP ID, as embedded in authenticator data.
    pub fn rp_id_hash(&self) -> [u8; 32] {
        Sha256::digest(self.rp_id.as_bytes()).into()
    }
}

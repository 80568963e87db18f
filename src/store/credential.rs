use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::USER_ID_LEN;
use crate::verify::CoseAlgorithm;

/// Opaque stable user identifier: random bytes allocated at first
/// registration, never reused for a different user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId([u8; USER_ID_LEN]);

impl UserId {
    pub fn generate() -> Self {
        Self(rand::thread_rng().r#gen())
    }

    pub fn from_bytes(bytes: [u8; USER_ID_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    /// Login handle; unique across users.
    pub name: String,
    pub display_name: String,
}

/// Transport hint reported by the client at registration. Informational
/// only; echoed back in `allowCredentials`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Usb,
    Nfc,
    Ble,
    Internal,
    Hybrid,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialRecord {
    /// Globally unique lookup key; two users must never share one.
    pub credential_id: Vec<u8>,
    pub user_id: UserId,
    /// COSE_Key CBOR bytes, opaque here; the verifier decodes them.
    pub public_key: Vec<u8>,
    /// Bound at registration; assertions verify with this and nothing else.
    pub algorithm: CoseAlgorithm,
    /// Monotonically non-decreasing; 0 until a counting authenticator
    /// reports otherwise.
    pub sign_count: u32,
    pub transports: Vec<Transport>,
    /// Unix timestamp, seconds.
    pub created_at: u64,
}

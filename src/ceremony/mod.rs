pub(crate) mod authentication;
pub(crate) mod registration;
pub mod types;

pub use authentication::AuthenticationOutcome;
pub use registration::RegistrationOutcome;
pub use types::{
    AssertionPayload, AttestationPayload, AuthenticationOptions, AuthenticationResponse,
    CredentialDescriptor, PubKeyCredParam, RegistrationOptions, RegistrationResponse,
};

use std::sync::Arc;

use crate::challenge::{Challenge, ChallengeError, ChallengeRegistry, CeremonyType};
use crate::config::RpConfig;
use crate::error::CeremonyError;
use crate::store::{CredentialRecord, CredentialStore, StoreError};
use crate::verify::{CoseAlgorithm, VerifyError};

/// Orchestrates registration and authentication ceremonies. Stateless
/// between calls; every Begin/Finish is one logical transaction over the
/// injected store and registry, and no lock is held across an await.
pub struct CeremonyEngine {
    config: RpConfig,
    store: Arc<dyn CredentialStore>,
    challenges: Arc<dyn ChallengeRegistry>,
}

impl CeremonyEngine {
    pub fn new(
        config: RpConfig,
        store: Arc<dyn CredentialStore>,
        challenges: Arc<dyn ChallengeRegistry>,
    ) -> Self {
        Self {
            config,
            store,
            challenges,
        }
    }

    pub fn config(&self) -> &RpConfig {
        &self.config
    }

    pub(crate) fn store(&self) -> &dyn CredentialStore {
        self.store.as_ref()
    }

    /// Algorithms offered in `pubKeyCredParams`, strongest-preferred.
    pub(crate) fn supported_algorithms() -> Vec<PubKeyCredParam> {
        [CoseAlgorithm::Es256, CoseAlgorithm::Eddsa]
            .into_iter()
            .map(|alg| PubKeyCredParam {
                ty: "public-key".into(),
                alg: alg.id(),
            })
            .collect()
    }

    pub(crate) fn user_verification_policy(&self) -> String {
        if self.config.require_user_verification {
            "required".into()
        } else {
            "preferred".into()
        }
    }

    pub(crate) fn timeout_ms(&self) -> u64 {
        self.config.challenge_ttl.as_millis() as u64
    }

    pub(crate) fn descriptors(credentials: &[CredentialRecord]) -> Vec<CredentialDescriptor> {
        credentials
            .iter()
            .map(|c| CredentialDescriptor {
                ty: "public-key".into(),
                id: c.credential_id.clone(),
                transports: c.transports.clone(),
            })
            .collect()
    }

    pub(crate) async fn issue_challenge(
        &self,
        user: crate::store::UserId,
        ceremony: CeremonyType,
    ) -> Result<Challenge, CeremonyError> {
        self.challenges
            .issue(user, ceremony, self.config.challenge_ttl)
            .await
            .map_err(registry_unavailable)
    }

    /// Consume the pending challenge. Missing, already consumed and
    /// expired all look the same to the caller: the ceremony is over.
    pub(crate) async fn consume_challenge(
        &self,
        user: crate::store::UserId,
        ceremony: CeremonyType,
    ) -> Result<Challenge, CeremonyError> {
        match self.challenges.consume(user, ceremony).await {
            Ok(challenge) => Ok(challenge),
            Err(ChallengeError::NotFound | ChallengeError::Expired) => {
                Err(CeremonyError::CeremonyExpired)
            }
            Err(ChallengeError::Unavailable(msg)) => Err(CeremonyError::StoreUnavailable(msg)),
        }
    }
}

pub(crate) fn map_verify_error(err: VerifyError) -> CeremonyError {
    match err {
        VerifyError::Malformed(detail) => CeremonyError::MalformedResponse(detail),
        VerifyError::Invalid | VerifyError::UnsupportedAlgorithm => {
            CeremonyError::VerificationFailed
        }
    }
}

/// For store calls whose domain errors are handled at the call site;
/// anything left is infrastructure trouble.
pub(crate) fn store_unavailable(err: StoreError) -> CeremonyError {
    match err {
        StoreError::Unavailable(msg) => CeremonyError::StoreUnavailable(msg),
        other => CeremonyError::StoreUnavailable(other.to_string()),
    }
}

fn registry_unavailable(err: ChallengeError) -> CeremonyError {
    match err {
        ChallengeError::Unavailable(msg) => CeremonyError::StoreUnavailable(msg),
        other => CeremonyError::StoreUnavailable(other.to_string()),
    }
}

pub(crate) fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

pub(crate) fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

use super::types::{AuthenticationOptions, AuthenticationResponse};
use super::{hex, map_verify_error, store_unavailable, CeremonyEngine};
use crate::challenge::CeremonyType;
use crate::error::CeremonyError;
use crate::store::{StoreError, UserId};
use crate::verify::{self, CosePublicKey};

/// Result of a completed authentication ceremony.
#[derive(Debug, Clone)]
pub struct AuthenticationOutcome {
    pub user_id: UserId,
    pub credential_id: Vec<u8>,
    /// The counter value now on record for the credential.
    pub sign_count: u32,
}

impl CeremonyEngine {
    /// Start an authentication ceremony. An unknown user is
    /// `UserNotFound`, a known user without credentials `UserNotEligible`;
    /// whether to mask either from the network is the embedder's call.
    pub async fn begin_authentication(
        &self,
        name: &str,
    ) -> Result<AuthenticationOptions, CeremonyError> {
        let user = self
            .store()
            .find_user_by_name(name)
            .await
            .map_err(store_unavailable)?
            .ok_or(CeremonyError::UserNotFound)?;

        let credentials = self
            .store()
            .list_credentials(user.id)
            .await
            .map_err(store_unavailable)?;
        if credentials.is_empty() {
            return Err(CeremonyError::UserNotEligible);
        }

        let challenge = self
            .issue_challenge(user.id, CeremonyType::Authentication)
            .await?;
        tracing::debug!(user = %user.id, "authentication challenge issued");

        Ok(AuthenticationOptions {
            challenge: challenge.bytes.to_vec(),
            rp_id: self.config().rp_id.clone(),
            timeout: self.timeout_ms(),
            user_verification: self.user_verification_policy(),
            allow_credentials: Self::descriptors(&credentials),
        })
    }

    /// Complete an authentication ceremony: verify the assertion with the
    /// key registered for the response's credential, then advance the
    /// sign counter.
    pub async fn finish_authentication(
        &self,
        name: &str,
        response: &AuthenticationResponse,
    ) -> Result<AuthenticationOutcome, CeremonyError> {
        // 1. Resolve user and pending challenge
        let user = self
            .store()
            .find_user_by_name(name)
            .await
            .map_err(store_unavailable)?
            .ok_or(CeremonyError::UserNotFound)?;
        let challenge = self
            .consume_challenge(user.id, CeremonyType::Authentication)
            .await?;

        // 2. The response names the credential; it must exist and belong
        //    to the user this ceremony was begun for. A credential of a
        //    different user is rejected, not logged in as its owner.
        let credential = self
            .store()
            .find_credential(&response.raw_id)
            .await
            .map_err(store_unavailable)?
            .ok_or(CeremonyError::UnknownCredential)?;
        if credential.user_id != user.id {
            return Err(CeremonyError::CredentialUserMismatch);
        }

        // 3. Verify with the stored key and the algorithm bound at
        //    registration
        let key = CosePublicKey::decode(&credential.public_key).map_err(|_| {
            CeremonyError::StoreUnavailable("stored public key is unreadable".into())
        })?;
        if key.algorithm() != credential.algorithm {
            return Err(CeremonyError::StoreUnavailable(
                "stored algorithm binding is inconsistent".into(),
            ));
        }
        let new_count = verify::verify_assertion(
            &response.response.client_data_json,
            &response.response.authenticator_data,
            &response.response.signature,
            &challenge.bytes,
            &key,
            self.config(),
        )
        .map_err(map_verify_error)?;

        // 4. Anti-replay: the counter must strictly advance. Counter-less
        //    authenticators report 0 forever; only then is the check
        //    skipped, never the signature.
        let stored = credential.sign_count;
        if stored != 0 || new_count != 0 {
            if new_count <= stored {
                tracing::warn!(
                    user = %user.id,
                    credential = hex(&credential.credential_id),
                    stored,
                    reported = new_count,
                    "sign counter did not advance"
                );
                return Err(CeremonyError::PossibleCloneDetected);
            }
            match self
                .store()
                .update_sign_count(&credential.credential_id, new_count)
                .await
            {
                Ok(()) => {}
                // A concurrent assertion won the compare-and-set; same
                // signal as a non-advancing counter.
                Err(StoreError::StaleCounter) => {
                    return Err(CeremonyError::PossibleCloneDetected)
                }
                Err(StoreError::NotFound) => return Err(CeremonyError::UnknownCredential),
                Err(e) => return Err(store_unavailable(e)),
            }
        }

        tracing::info!(
            user = %user.id,
            credential = hex(&credential.credential_id),
            count = new_count,
            "authentication verified"
        );
        Ok(AuthenticationOutcome {
            user_id: user.id,
            credential_id: credential.credential_id,
            sign_count: new_count,
        })
    }
}

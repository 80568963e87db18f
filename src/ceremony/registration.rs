use super::types::{AuthenticatorSelection, RegistrationOptions, RegistrationResponse, RpEntity, UserEntity};
use super::{hex, map_verify_error, store_unavailable, unix_now, CeremonyEngine};
use crate::challenge::CeremonyType;
use crate::error::CeremonyError;
use crate::store::{CredentialRecord, StoreError, UserId, UserRecord};
use crate::verify;

/// Result of a completed registration ceremony.
#[derive(Debug, Clone)]
pub struct RegistrationOutcome {
    pub user_id: UserId,
    pub credential_id: Vec<u8>,
}

impl CeremonyEngine {
    /// Start a registration ceremony: find or create the user, issue a
    /// fresh challenge, and return the creation options. Registering a
    /// further credential for an existing user is allowed; their current
    /// credentials populate `excludeCredentials` so the authenticator can
    /// refuse to re-register itself.
    pub async fn begin_registration(
        &self,
        name: &str,
        display_name: &str,
    ) -> Result<RegistrationOptions, CeremonyError> {
        let user = self.find_or_create_user(name, display_name).await?;
        let existing = self
            .store()
            .list_credentials(user.id)
            .await
            .map_err(store_unavailable)?;

        let challenge = self
            .issue_challenge(user.id, CeremonyType::Registration)
            .await?;
        tracing::debug!(user = %user.id, "registration challenge issued");

        Ok(RegistrationOptions {
            challenge: challenge.bytes.to_vec(),
            rp: RpEntity {
                id: self.config().rp_id.clone(),
                name: self.config().rp_name.clone(),
            },
            user: UserEntity {
                id: user.id.as_bytes().to_vec(),
                name: user.name,
                display_name: user.display_name,
            },
            pub_key_cred_params: Self::supported_algorithms(),
            timeout: self.timeout_ms(),
            attestation: "none".into(),
            authenticator_selection: AuthenticatorSelection {
                user_verification: self.user_verification_policy(),
            },
            exclude_credentials: Self::descriptors(&existing),
        })
    }

    /// Complete a registration ceremony. The challenge is consumed before
    /// anything else, so a failed attempt burns it either way.
    pub async fn finish_registration(
        &self,
        name: &str,
        response: &RegistrationResponse,
    ) -> Result<RegistrationOutcome, CeremonyError> {
        // 1. Resolve the user the ceremony was begun for
        let user = self
            .store()
            .find_user_by_name(name)
            .await
            .map_err(store_unavailable)?
            .ok_or(CeremonyError::UserNotFound)?;

        // 2. Consume the pending challenge
        let challenge = self
            .consume_challenge(user.id, CeremonyType::Registration)
            .await?;

        // 3. Parse and verify the attestation response
        let verified = verify::verify_registration(
            &response.response.client_data_json,
            &response.response.attestation_object,
            &challenge.bytes,
            self.config(),
        )
        .map_err(map_verify_error)?;

        if verified.credential_id != response.raw_id {
            return Err(CeremonyError::MalformedResponse(
                "rawId does not match attested credential id".into(),
            ));
        }

        // 4. Bind the credential to the user
        let record = CredentialRecord {
            credential_id: verified.credential_id.clone(),
            user_id: user.id,
            public_key: verified.public_key,
            algorithm: verified.algorithm,
            sign_count: verified.sign_count,
            transports: response.response.transports.clone(),
            created_at: unix_now(),
        };
        match self.store().add_credential(record).await {
            Ok(()) => {}
            Err(StoreError::Conflict) => return Err(CeremonyError::CredentialAlreadyRegistered),
            Err(e) => return Err(store_unavailable(e)),
        }

        tracing::info!(
            user = %user.id,
            credential = hex(&verified.credential_id),
            "credential registered"
        );
        Ok(RegistrationOutcome {
            user_id: user.id,
            credential_id: verified.credential_id,
        })
    }

    async fn find_or_create_user(
        &self,
        name: &str,
        display_name: &str,
    ) -> Result<UserRecord, CeremonyError> {
        if let Some(user) = self
            .store()
            .find_user_by_name(name)
            .await
            .map_err(store_unavailable)?
        {
            return Ok(user);
        }
        match self.store().create_user(name, display_name).await {
            Ok(user) => Ok(user),
            // Lost a race against a concurrent first registration for the
            // same name, or the id allocator collided: re-resolve once.
            Err(StoreError::Conflict) => self
                .store()
                .find_user_by_name(name)
                .await
                .map_err(store_unavailable)?
                .ok_or_else(|| {
                    CeremonyError::StoreUnavailable("user allocation kept colliding".into())
                }),
            Err(e) => Err(store_unavailable(e)),
        }
    }
}

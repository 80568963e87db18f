//! Wire-facing request/response shapes, matching the standard WebAuthn
//! JSON encoding: camelCase fields, binary values as base64url without
//! padding.

use serde::{Deserialize, Serialize};

use crate::store::Transport;

/// serde adapter for base64url-no-pad byte fields.
pub(crate) mod b64url {
    use base64::prelude::*;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64_URL_SAFE_NO_PAD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        BASE64_URL_SAFE_NO_PAD
            .decode(s.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RpEntity {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEntity {
    #[serde(with = "b64url")]
    pub id: Vec<u8>,
    pub name: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PubKeyCredParam {
    #[serde(rename = "type")]
    pub ty: String,
    pub alg: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorSelection {
    pub user_verification: String,
}

/// Entry of `excludeCredentials` / `allowCredentials`.
#[derive(Debug, Clone, Serialize)]
pub struct CredentialDescriptor {
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(with = "b64url")]
    pub id: Vec<u8>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub transports: Vec<Transport>,
}

/// Creation options returned by `begin_registration`, ready for the glue
/// layer to relay to `navigator.credentials.create()`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationOptions {
    #[serde(with = "b64url")]
    pub challenge: Vec<u8>,
    pub rp: RpEntity,
    pub user: UserEntity,
    pub pub_key_cred_params: Vec<PubKeyCredParam>,
    /// Milliseconds; mirrors the challenge TTL.
    pub timeout: u64,
    pub attestation: String,
    pub authenticator_selection: AuthenticatorSelection,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exclude_credentials: Vec<CredentialDescriptor>,
}

/// Request options returned by `begin_authentication`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationOptions {
    #[serde(with = "b64url")]
    pub challenge: Vec<u8>,
    pub rp_id: String,
    pub timeout: u64,
    pub user_verification: String,
    pub allow_credentials: Vec<CredentialDescriptor>,
}

/// The credential the client created; `navigator.credentials.create()`
/// output as relayed by the glue layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResponse {
    #[serde(with = "b64url")]
    pub raw_id: Vec<u8>,
    pub response: AttestationPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationPayload {
    #[serde(rename = "clientDataJSON", with = "b64url")]
    pub client_data_json: Vec<u8>,
    #[serde(with = "b64url")]
    pub attestation_object: Vec<u8>,
    #[serde(default)]
    pub transports: Vec<Transport>,
}

/// The signed assertion; `navigator.credentials.get()` output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationResponse {
    #[serde(with = "b64url")]
    pub raw_id: Vec<u8>,
    pub response: AssertionPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertionPayload {
    #[serde(rename = "clientDataJSON", with = "b64url")]
    pub client_data_json: Vec<u8>,
    #[serde(with = "b64url")]
    pub authenticator_data: Vec<u8>,
    #[serde(with = "b64url")]
    pub signature: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_handle: Option<String>,
}

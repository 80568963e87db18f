//! Pure verification over bytes and stored keys: no store, no clock, no
//! I/O. The signed payload is always recomputed here from the parsed
//! response; a client-supplied "signed bytes" field does not exist in this
//! API on purpose.

pub(crate) mod attestation;
pub(crate) mod authenticator_data;
pub(crate) mod client_data;
mod cose;

pub use cose::{CoseAlgorithm, CosePublicKey};

use ciborium::value::Value;
use sha2::{Digest, Sha256};

use crate::config::RpConfig;
use attestation::AttestationStatement;
use authenticator_data::AuthenticatorData;

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    /// The response does not parse into the expected structure.
    #[error("malformed: {0}")]
    Malformed(String),
    /// Challenge, origin, RP ID, flag or signature check failed. One
    /// variant for all of them; an attacker learns nothing about which.
    #[error("verification failed")]
    Invalid,
    /// COSE algorithm this crate does not verify.
    #[error("unsupported algorithm")]
    UnsupportedAlgorithm,
}

/// What a verified attestation yields: everything the engine needs to
/// mint a credential record.
#[derive(Debug)]
pub(crate) struct RegistrationVerification {
    pub credential_id: Vec<u8>,
    pub public_key: Vec<u8>,
    pub algorithm: CoseAlgorithm,
    pub sign_count: u32,
}

/// Verify a registration (attestation) response against the issued
/// challenge and RP policy, in "self-attestation or none" mode.
pub(crate) fn verify_registration(
    client_data_json: &[u8],
    attestation_object: &[u8],
    challenge: &[u8],
    config: &RpConfig,
) -> Result<RegistrationVerification, VerifyError> {
    client_data::check_client_data(
        client_data_json,
        client_data::TYPE_CREATE,
        challenge,
        &config.origins,
    )?;

    let att = attestation::parse_attestation_object(attestation_object)?;
    let auth = AuthenticatorData::parse(&att.auth_data)?;
    check_binding(&auth, config)?;

    let attested = auth
        .attested_credential
        .as_ref()
        .ok_or_else(|| VerifyError::Malformed("missing attested credential data".into()))?;

    // Decoding validates the key and fixes the algorithm the credential
    // will verify with from here on.
    let key = CosePublicKey::decode(&attested.public_key)?;

    match att.statement {
        AttestationStatement::None => {}
        AttestationStatement::Packed { alg, sig } => {
            if alg != key.algorithm().id() {
                return Err(VerifyError::Invalid);
            }
            key.verify(&signed_payload(&att.auth_data, client_data_json), &sig)?;
        }
    }

    Ok(RegistrationVerification {
        credential_id: attested.credential_id.clone(),
        public_key: attested.public_key.clone(),
        algorithm: key.algorithm(),
        sign_count: auth.sign_count,
    })
}

/// Verify an authentication (assertion) response with the stored key.
/// Returns the sign counter the authenticator reported.
pub(crate) fn verify_assertion(
    client_data_json: &[u8],
    authenticator_data: &[u8],
    signature: &[u8],
    challenge: &[u8],
    key: &CosePublicKey,
    config: &RpConfig,
) -> Result<u32, VerifyError> {
    client_data::check_client_data(
        client_data_json,
        client_data::TYPE_GET,
        challenge,
        &config.origins,
    )?;

    let auth = AuthenticatorData::parse(authenticator_data)?;
    check_binding(&auth, config)?;

    key.verify(
        &signed_payload(authenticator_data, client_data_json),
        signature,
    )?;

    Ok(auth.sign_count)
}

/// RP-ID binding and presence/verification flags. All failures are
/// `Invalid`, same as a bad signature.
fn check_binding(auth: &AuthenticatorData, config: &RpConfig) -> Result<(), VerifyError> {
    if auth.rp_id_hash != config.rp_id_hash() {
        return Err(VerifyError::Invalid);
    }
    if !auth.user_present() {
        return Err(VerifyError::Invalid);
    }
    if config.require_user_verification && !auth.user_verified() {
        return Err(VerifyError::Invalid);
    }
    Ok(())
}

/// The exact byte string the authenticator signed:
/// `authenticatorData || SHA-256(clientDataJSON)`.
fn signed_payload(auth_data: &[u8], client_data_json: &[u8]) -> Vec<u8> {
    let mut signed = Vec::with_capacity(auth_data.len() + 32);
    signed.extend_from_slice(auth_data);
    signed.extend_from_slice(&Sha256::digest(client_data_json));
    signed
}

// CBOR map helpers shared by the attestation and COSE decoders.

pub(crate) fn parse_cbor_map(data: &[u8]) -> Result<Vec<(Value, Value)>, VerifyError> {
    let value: Value = ciborium::from_reader(data)
        .map_err(|e| VerifyError::Malformed(format!("cbor: {e}")))?;
    match value {
        Value::Map(map) => Ok(map),
        _ => Err(VerifyError::Malformed("expected CBOR map".into())),
    }
}

pub(crate) fn cbor_get_int<'a>(map: &'a [(Value, Value)], key: i64) -> Option<&'a Value> {
    let target = Value::Integer(key.into());
    map.iter().find(|(k, _)| k == &target).map(|(_, v)| v)
}

pub(crate) fn cbor_get_text<'a>(map: &'a [(Value, Value)], key: &str) -> Option<&'a Value> {
    map.iter()
        .find(|(k, _)| matches!(k, Value::Text(s) if s == key))
        .map(|(_, v)| v)
}

pub(crate) fn cbor_bytes(v: &Value) -> Option<&[u8]> {
    match v {
        Value::Bytes(b) => Some(b),
        _ => None,
    }
}

pub(crate) fn cbor_text(v: &Value) -> Option<&str> {
    match v {
        Value::Text(s) => Some(s),
        _ => None,
    }
}

pub(crate) fn cbor_map(v: &Value) -> Option<&[(Value, Value)]> {
    match v {
        Value::Map(m) => Some(m),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::authenticator_data::{FLAG_UP, FLAG_UV};
    use super::*;

    fn auth_data(rp_id_hash: [u8; 32], flags: u8) -> AuthenticatorData {
        AuthenticatorData {
            rp_id_hash,
            flags,
            sign_count: 0,
            attested_credential: None,
        }
    }

    fn config() -> RpConfig {
        RpConfig::new("rp.example", "Example", "https://rp.example")
    }

    #[test]
    fn test_check_binding_accepts_matching_rp_and_presence() {
        let cfg = config();
        check_binding(&auth_data(cfg.rp_id_hash(), FLAG_UP), &cfg).unwrap();
    }

    #[test]
    fn test_check_binding_rejects_foreign_rp_id_hash() {
        let cfg = config();
        let err = check_binding(&auth_data([0u8; 32], FLAG_UP), &cfg).unwrap_err();
        assert!(matches!(err, VerifyError::Invalid));
    }

    #[test]
    fn test_check_binding_rejects_missing_user_presence() {
        let cfg = config();
        let err = check_binding(&auth_data(cfg.rp_id_hash(), 0), &cfg).unwrap_err();
        assert!(matches!(err, VerifyError::Invalid));
    }

    #[test]
    fn test_check_binding_enforces_uv_policy() {
        let cfg = config().require_user_verification(true);
        let err = check_binding(&auth_data(cfg.rp_id_hash(), FLAG_UP), &cfg).unwrap_err();
        assert!(matches!(err, VerifyError::Invalid));
        check_binding(&auth_data(cfg.rp_id_hash(), FLAG_UP | FLAG_UV), &cfg).unwrap();
    }

    #[test]
    fn test_signed_payload_layout() {
        let auth = [0x01u8; 37];
        let cdj = b"{}";
        let signed = signed_payload(&auth, cdj);
        assert_eq!(signed.len(), 37 + 32);
        assert_eq!(&signed[..37], &auth);
        let digest: [u8; 32] = Sha256::digest(cdj).into();
        assert_eq!(&signed[37..], &digest);
    }
}

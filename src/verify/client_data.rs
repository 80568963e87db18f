use base64::prelude::*;
use serde::Deserialize;

use super::VerifyError;

pub(crate) const TYPE_CREATE: &str = "webauthn.create";
pub(crate) const TYPE_GET: &str = "webauthn.get";

/// The JSON structure the client signs over, binding challenge, origin and
/// ceremony type. Unknown fields (crossOrigin, tokenBinding, ...) are
/// ignored.
#[derive(Debug, Deserialize)]
struct CollectedClientData {
    #[serde(rename = "type")]
    ceremony_type: String,
    challenge: String,
    origin: String,
}

/// Validate the client data against what this RP issued and expects.
///
/// Everything past the JSON parse collapses into `Invalid`: which of
/// type/challenge/origin failed is deliberately not disclosed.
pub(crate) fn check_client_data(
    raw: &[u8],
    expected_type: &str,
    expected_challenge: &[u8],
    origins: &[String],
) -> Result<(), VerifyError> {
    let client_data: CollectedClientData = serde_json::from_slice(raw)
        .map_err(|_| VerifyError::Malformed("client data is not valid JSON".into()))?;

    if client_data.ceremony_type != expected_type {
        return Err(VerifyError::Invalid);
    }

    // Byte-exact match against the issued challenge.
    let challenge = BASE64_URL_SAFE_NO_PAD
        .decode(client_data.challenge.as_bytes())
        .map_err(|_| VerifyError::Invalid)?;
    if challenge != expected_challenge {
        return Err(VerifyError::Invalid);
    }

    if !origins.iter().any(|o| o == &client_data.origin) {
        return Err(VerifyError::Invalid);
    }

    Ok(())
}

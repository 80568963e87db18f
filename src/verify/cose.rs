use ciborium::value::Value;
use p256::ecdsa::signature::Verifier;
use serde::{Deserialize, Serialize};

use super::{cbor_bytes, cbor_get_int, parse_cbor_map, VerifyError};

// COSE_Key map labels and the values we accept.
const KTY: i64 = 1;
const ALG: i64 = 3;
const CRV: i64 = -1;
const X: i64 = -2;
const Y: i64 = -3;
const KTY_OKP: i64 = 1;
const KTY_EC2: i64 = 2;
const CRV_P256: i64 = 1;
const CRV_ED25519: i64 = 6;

/// Signature algorithm bound to a credential at registration. Assertions
/// verify with the registered algorithm and nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoseAlgorithm {
    /// ECDSA over P-256 with SHA-256, COSE id -7. DER signatures.
    Es256,
    /// Ed25519, COSE id -8. Raw 64-byte signatures.
    Eddsa,
}

impl CoseAlgorithm {
    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            -7 => Some(Self::Es256),
            -8 => Some(Self::Eddsa),
            _ => None,
        }
    }

    pub fn id(self) -> i64 {
        match self {
            Self::Es256 => -7,
            Self::Eddsa => -8,
        }
    }
}

#[derive(Debug)]
enum KeyMaterial {
    P256(p256::ecdsa::VerifyingKey),
    Ed25519(ed25519_dalek::VerifyingKey),
}

/// A decoded COSE_Key. Decoding validates the kty/crv/alg triple, so a
/// stored key that decodes is usable for exactly one algorithm.
#[derive(Debug)]
pub struct CosePublicKey {
    algorithm: CoseAlgorithm,
    key: KeyMaterial,
}

impl CosePublicKey {
    /// Decode a COSE_Key CBOR map (kty/alg/crv/x[/y]).
    pub fn decode(raw: &[u8]) -> Result<Self, VerifyError> {
        let map = parse_cbor_map(raw)?;

        let kty = int_field(&map, KTY, "kty")?;
        let alg = int_field(&map, ALG, "alg")?;
        let algorithm =
            CoseAlgorithm::from_id(alg).ok_or(VerifyError::UnsupportedAlgorithm)?;

        match algorithm {
            CoseAlgorithm::Es256 => {
                if kty != KTY_EC2 || int_field(&map, CRV, "crv")? != CRV_P256 {
                    return Err(VerifyError::Malformed(
                        "COSE algorithm does not match key type".into(),
                    ));
                }
                let x = coord_field(&map, X, "x")?;
                let y = coord_field(&map, Y, "y")?;
                // SEC1 uncompressed point: 0x04 || x || y
                let mut sec1 = [0u8; 65];
                sec1[0] = 0x04;
                sec1[1..33].copy_from_slice(&x);
                sec1[33..].copy_from_slice(&y);
                let key = p256::ecdsa::VerifyingKey::from_sec1_bytes(&sec1)
                    .map_err(|_| VerifyError::Malformed("not a valid P-256 point".into()))?;
                Ok(Self {
                    algorithm,
                    key: KeyMaterial::P256(key),
                })
            }
            CoseAlgorithm::Eddsa => {
                if kty != KTY_OKP || int_field(&map, CRV, "crv")? != CRV_ED25519 {
                    return Err(VerifyError::Malformed(
                        "COSE algorithm does not match key type".into(),
                    ));
                }
                let x = coord_field(&map, X, "x")?;
                let key = ed25519_dalek::VerifyingKey::from_bytes(&x)
                    .map_err(|_| VerifyError::Malformed("not a valid Ed25519 point".into()))?;
                Ok(Self {
                    algorithm,
                    key: KeyMaterial::Ed25519(key),
                })
            }
        }
    }

    pub fn algorithm(&self) -> CoseAlgorithm {
        self.algorithm
    }

    /// Verify `signature` over `message`. Any parse or verification
    /// failure is `Invalid`; which step failed is not disclosed.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<(), VerifyError> {
        match &self.key {
            KeyMaterial::P256(key) => {
                let sig = p256::ecdsa::Signature::from_der(signature)
                    .map_err(|_| VerifyError::Invalid)?;
                key.verify(message, &sig).map_err(|_| VerifyError::Invalid)
            }
            KeyMaterial::Ed25519(key) => {
                let raw: [u8; 64] =
                    signature.try_into().map_err(|_| VerifyError::Invalid)?;
                let sig = ed25519_dalek::Signature::from_bytes(&raw);
                key.verify_strict(message, &sig)
                    .map_err(|_| VerifyError::Invalid)
            }
        }
    }
}

fn int_field(map: &[(Value, Value)], label: i64, name: &str) -> Result<i64, VerifyError> {
    match cbor_get_int(map, label) {
        Some(Value::Integer(i)) => i64::try_from(i128::from(*i))
            .map_err(|_| VerifyError::Malformed(format!("COSE {name} out of range"))),
        _ => Err(VerifyError::Malformed(format!("COSE {name} missing"))),
    }
}

fn coord_field(map: &[(Value, Value)], label: i64, name: &str) -> Result<[u8; 32], VerifyError> {
    let bytes = cbor_get_int(map, label)
        .and_then(cbor_bytes)
        .ok_or_else(|| VerifyError::Malformed(format!("COSE {name} missing")))?;
    bytes
        .try_into()
        .map_err(|_| VerifyError::Malformed(format!("COSE {name} must be 32 bytes")))
}

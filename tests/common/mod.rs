//! Software authenticator for driving full ceremonies in tests: real
//! keypairs, real signatures, byte layouts as a device would produce them.

#![allow(dead_code)]

use std::sync::Arc;

use base64::prelude::*;
use ciborium::value::Value;
use sha2::{Digest, Sha256};

use relykey::ceremony::types::{
    AssertionPayload, AttestationPayload, AuthenticationResponse, RegistrationResponse,
};
use relykey::{
    CeremonyEngine, InMemoryChallengeRegistry, MemoryCredentialStore, RpConfig,
};

pub const FLAG_UP: u8 = 0x01;
pub const FLAG_UV: u8 = 0x04;
pub const FLAG_AT: u8 = 0x40;

pub const RP_ID: &str = "rp.example";
pub const ORIGIN: &str = "https://rp.example";

/// Opt-in engine logs for a test run: `RUST_LOG=debug cargo test`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Engine wired to in-memory backends, with handles kept for inspection.
pub fn test_engine(config: RpConfig) -> (CeremonyEngine, Arc<MemoryCredentialStore>) {
    let store = Arc::new(MemoryCredentialStore::new());
    let registry = Arc::new(InMemoryChallengeRegistry::new());
    (
        CeremonyEngine::new(config, store.clone(), registry),
        store,
    )
}

pub fn default_config() -> RpConfig {
    RpConfig::new(RP_ID, "Example RP", ORIGIN)
}

enum KeyPair {
    P256(p256::ecdsa::SigningKey),
    Ed25519(ed25519_dalek::SigningKey),
}

pub struct SoftAuthenticator {
    key: KeyPair,
    pub credential_id: Vec<u8>,
    rp_id_hash: [u8; 32],
}

impl SoftAuthenticator {
    pub fn new_p256(rp_id: &str) -> Self {
        Self {
            key: KeyPair::P256(p256::ecdsa::SigningKey::random(&mut rand::rngs::OsRng)),
            credential_id: rand::random::<[u8; 32]>().to_vec(),
            rp_id_hash: Sha256::digest(rp_id.as_bytes()).into(),
        }
    }

    pub fn new_ed25519(rp_id: &str) -> Self {
        Self {
            key: KeyPair::Ed25519(ed25519_dalek::SigningKey::from_bytes(&rand::random())),
            credential_id: rand::random::<[u8; 32]>().to_vec(),
            rp_id_hash: Sha256::digest(rp_id.as_bytes()).into(),
        }
    }

    fn cose_key(&self) -> Vec<u8> {
        let map = match &self.key {
            KeyPair::P256(sk) => {
                let point = sk.verifying_key().to_encoded_point(false);
                Value::Map(vec![
                    (Value::Integer(1i64.into()), Value::Integer(2i64.into())),
                    (Value::Integer(3i64.into()), Value::Integer((-7i64).into())),
                    (Value::Integer((-1i64).into()), Value::Integer(1i64.into())),
                    (
                        Value::Integer((-2i64).into()),
                        Value::Bytes(point.x().unwrap().to_vec()),
                    ),
                    (
                        Value::Integer((-3i64).into()),
                        Value::Bytes(point.y().unwrap().to_vec()),
                    ),
                ])
            }
            KeyPair::Ed25519(sk) => Value::Map(vec![
                (Value::Integer(1i64.into()), Value::Integer(1i64.into())),
                (Value::Integer(3i64.into()), Value::Integer((-8i64).into())),
                (Value::Integer((-1i64).into()), Value::Integer(6i64.into())),
                (
                    Value::Integer((-2i64).into()),
                    Value::Bytes(sk.verifying_key().to_bytes().to_vec()),
                ),
            ]),
        };
        let mut buf = Vec::new();
        ciborium::into_writer(&map, &mut buf).unwrap();
        buf
    }

    fn alg_id(&self) -> i64 {
        match self.key {
            KeyPair::P256(_) => -7,
            KeyPair::Ed25519(_) => -8,
        }
    }

    fn sign(&self, message: &[u8]) -> Vec<u8> {
        match &self.key {
            KeyPair::P256(sk) => {
                use p256::ecdsa::signature::Signer;
                let sig: p256::ecdsa::Signature = sk.sign(message);
                sig.to_der().as_bytes().to_vec()
            }
            KeyPair::Ed25519(sk) => {
                use ed25519_dalek::Signer;
                sk.sign(message).to_bytes().to_vec()
            }
        }
    }

    pub fn client_data(ceremony_type: &str, challenge: &[u8], origin: &str) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "type": ceremony_type,
            "challenge": BASE64_URL_SAFE_NO_PAD.encode(challenge),
            "origin": origin,
        }))
        .unwrap()
    }

    fn attestation_auth_data(&self, flags: u8, sign_count: u32) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&self.rp_id_hash);
        data.push(flags);
        data.extend_from_slice(&sign_count.to_be_bytes());
        data.extend_from_slice(&[0u8; 16]); // aaguid
        data.extend_from_slice(&(self.credential_id.len() as u16).to_be_bytes());
        data.extend_from_slice(&self.credential_id);
        data.extend_from_slice(&self.cose_key());
        data
    }

    /// Packed self-attestation response for the issued challenge.
    pub fn attest(&self, challenge: &[u8], origin: &str) -> RegistrationResponse {
        self.attest_with_flags(challenge, origin, FLAG_UP | FLAG_UV | FLAG_AT)
    }

    pub fn attest_with_flags(
        &self,
        challenge: &[u8],
        origin: &str,
        flags: u8,
    ) -> RegistrationResponse {
        let client_data_json = Self::client_data("webauthn.create", challenge, origin);
        let auth_data = self.attestation_auth_data(flags, 0);

        let mut signed = auth_data.clone();
        signed.extend_from_slice(&Sha256::digest(&client_data_json));
        let sig = self.sign(&signed);

        let att_stmt = Value::Map(vec![
            (
                Value::Text("alg".into()),
                Value::Integer(self.alg_id().into()),
            ),
            (Value::Text("sig".into()), Value::Bytes(sig)),
        ]);
        self.registration_response(client_data_json, auth_data, "packed", att_stmt)
    }

    /// Attestation with `fmt: "none"`; carries no signature to check.
    pub fn attest_none(&self, challenge: &[u8], origin: &str) -> RegistrationResponse {
        let client_data_json = Self::client_data("webauthn.create", challenge, origin);
        let auth_data = self.attestation_auth_data(FLAG_UP | FLAG_UV | FLAG_AT, 0);
        self.registration_response(client_data_json, auth_data, "none", Value::Map(vec![]))
    }

    fn registration_response(
        &self,
        client_data_json: Vec<u8>,
        auth_data: Vec<u8>,
        fmt: &str,
        att_stmt: Value,
    ) -> RegistrationResponse {
        let object = Value::Map(vec![
            (Value::Text("fmt".into()), Value::Text(fmt.into())),
            (Value::Text("attStmt".into()), att_stmt),
            (Value::Text("authData".into()), Value::Bytes(auth_data)),
        ]);
        let mut attestation_object = Vec::new();
        ciborium::into_writer(&object, &mut attestation_object).unwrap();

        RegistrationResponse {
            raw_id: self.credential_id.clone(),
            response: AttestationPayload {
                client_data_json,
                attestation_object,
                transports: vec![],
            },
        }
    }

    /// Signed assertion for the issued challenge, reporting `sign_count`.
    pub fn assert(&self, challenge: &[u8], origin: &str, sign_count: u32) -> AuthenticationResponse {
        self.assert_with_flags(challenge, origin, sign_count, FLAG_UP | FLAG_UV)
    }

    pub fn assert_with_flags(
        &self,
        challenge: &[u8],
        origin: &str,
        sign_count: u32,
        flags: u8,
    ) -> AuthenticationResponse {
        let client_data_json = Self::client_data("webauthn.get", challenge, origin);

        let mut authenticator_data = Vec::new();
        authenticator_data.extend_from_slice(&self.rp_id_hash);
        authenticator_data.push(flags);
        authenticator_data.extend_from_slice(&sign_count.to_be_bytes());

        let mut signed = authenticator_data.clone();
        signed.extend_from_slice(&Sha256::digest(&client_data_json));
        let signature = self.sign(&signed);

        AuthenticationResponse {
            raw_id: self.credential_id.clone(),
            response: AssertionPayload {
                client_data_json,
                authenticator_data,
                signature,
                user_handle: None,
            },
        }
    }
}

//! Relying-party core for WebAuthn-style passwordless authentication:
//! challenge lifecycle, attestation/assertion verification, credential
//! binding and sign-counter anti-replay. HTTP routing, sessions and
//! storage durability live in the embedding application; this crate is
//! called with parsed requests and hands back results to relay.

pub mod ceremony;
pub mod challenge;
pub mod config;
pub mod error;
pub mod store;
pub mod verify;

pub use ceremony::{
    AuthenticationOptions, AuthenticationOutcome, AuthenticationResponse, CeremonyEngine,
    RegistrationOptions, RegistrationOutcome, RegistrationResponse,
};
pub use challenge::{CeremonyType, ChallengeRegistry, InMemoryChallengeRegistry};
pub use config::RpConfig;
pub use error::CeremonyError;
pub use store::{CredentialRecord, CredentialStore, MemoryCredentialStore, UserId, UserRecord};
pub use verify::CoseAlgorithm;

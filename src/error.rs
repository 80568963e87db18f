/// Terminal outcome of a failed ceremony step. There are no internal
/// retries; the caller must begin a new ceremony after any of these.
///
/// Messages never carry challenge bytes, keys, or signatures. Every kind
/// except `StoreUnavailable` is safe to render to the end user.
#[derive(Debug, thiserror::Error)]
pub enum CeremonyError {
    #[error("unknown user")]
    UserNotFound,
    #[error("user has no registered credentials")]
    UserNotEligible,
    #[error("no pending ceremony, or the challenge expired")]
    CeremonyExpired,
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("response verification failed")]
    VerificationFailed,
    #[error("credential is already registered")]
    CredentialAlreadyRegistered,
    #[error("unknown credential")]
    UnknownCredential,
    #[error("credential belongs to a different user")]
    CredentialUserMismatch,
    #[error("sign counter did not advance; possible cloned credential")]
    PossibleCloneDetected,
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

pub type Result<T, E = CeremonyError> = std::result::Result<T, E>;

pub mod credential;
pub mod memory;

pub use credential::{CredentialRecord, Transport, UserId, UserRecord};
pub use memory::MemoryCredentialStore;

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The record (user name or credential id) already exists.
    #[error("already exists")]
    Conflict,
    /// `update_sign_count` lost to a concurrent update or went backwards.
    #[error("sign counter is stale")]
    StaleCounter,
    #[error("not found")]
    NotFound,
    /// Infrastructure failure in the backing implementation.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Capability interface over credential persistence. Implementations must
/// be safe for concurrent use from many simultaneous ceremonies; in
/// particular `add_credential` enforces *global* credential-id uniqueness
/// and `update_sign_count` is an atomic compare-and-set.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_user_by_name(&self, name: &str) -> Result<Option<UserRecord>, StoreError>;

    async fn find_user(&self, id: UserId) -> Result<Option<UserRecord>, StoreError>;

    /// Allocate a fresh random identifier and create the user. Fails with
    /// `Conflict` if the name is taken or the allocator collides; callers
    /// handle the latter by retrying.
    async fn create_user(
        &self,
        name: &str,
        display_name: &str,
    ) -> Result<UserRecord, StoreError>;

    /// All credentials bound to `user`, in registration order. An empty
    /// list means the user cannot authenticate.
    async fn list_credentials(&self, user: UserId) -> Result<Vec<CredentialRecord>, StoreError>;

    /// `Conflict` if the credential id exists for *any* user.
    async fn add_credential(&self, record: CredentialRecord) -> Result<(), StoreError>;

    async fn find_credential(
        &self,
        credential_id: &[u8],
    ) -> Result<Option<CredentialRecord>, StoreError>;

    /// The only mutation path for an existing credential. Succeeds iff
    /// `new_count > stored`, else `StaleCounter`; of two racing updates
    /// exactly one wins.
    async fn update_sign_count(
        &self,
        credential_id: &[u8],
        new_count: u32,
    ) -> Result<(), StoreError>;
}

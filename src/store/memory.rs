use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{CredentialRecord, CredentialStore, StoreError, UserId, UserRecord};

/// In-memory reference implementation. All state sits behind one mutex;
/// every trait method is a single lock acquisition, which is what makes
/// `add_credential` and `update_sign_count` atomic under concurrent
/// ceremonies.
#[derive(Default)]
pub struct MemoryCredentialStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    users_by_id: HashMap<UserId, UserRecord>,
    users_by_name: HashMap<String, UserId>,
    creds_by_id: HashMap<Vec<u8>, CredentialRecord>,
    /// Credential ids per user, in registration order.
    creds_by_user: HashMap<UserId, Vec<Vec<u8>>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_count(&self) -> usize {
        self.inner.lock().unwrap().users_by_id.len()
    }

    pub fn credential_count(&self) -> usize {
        self.inner.lock().unwrap().creds_by_id.len()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_user_by_name(&self, name: &str) -> Result<Option<UserRecord>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .users_by_name
            .get(name)
            .and_then(|id| inner.users_by_id.get(id))
            .cloned())
    }

    async fn find_user(&self, id: UserId) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.inner.lock().unwrap().users_by_id.get(&id).cloned())
    }

    async fn create_user(
        &self,
        name: &str,
        display_name: &str,
    ) -> Result<UserRecord, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.users_by_name.contains_key(name) {
            return Err(StoreError::Conflict);
        }
        let id = UserId::generate();
        if inner.users_by_id.contains_key(&id) {
            return Err(StoreError::Conflict);
        }
        let record = UserRecord {
            id,
            name: name.to_string(),
            display_name: display_name.to_string(),
        };
        inner.users_by_name.insert(name.to_string(), id);
        inner.users_by_id.insert(id, record.clone());
        Ok(record)
    }

    async fn list_credentials(&self, user: UserId) -> Result<Vec<CredentialRecord>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let ids = match inner.creds_by_user.get(&user) {
            Some(ids) => ids,
            None => return Ok(Vec::new()),
        };
        Ok(ids
            .iter()
            .filter_map(|id| inner.creds_by_id.get(id))
            .cloned()
            .collect())
    }

    async fn add_credential(&self, record: CredentialRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.creds_by_id.contains_key(&record.credential_id) {
            return Err(StoreError::Conflict);
        }
        inner
            .creds_by_user
            .entry(record.user_id)
            .or_default()
            .push(record.credential_id.clone());
        inner
            .creds_by_id
            .insert(record.credential_id.clone(), record);
        Ok(())
    }

    async fn find_credential(
        &self,
        credential_id: &[u8],
    ) -> Result<Option<CredentialRecord>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .creds_by_id
            .get(credential_id)
            .cloned())
    }

    async fn update_sign_count(
        &self,
        credential_id: &[u8],
        new_count: u32,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let record = inner
            .creds_by_id
            .get_mut(credential_id)
            .ok_or(StoreError::NotFound)?;
        if new_count <= record.sign_count {
            return Err(StoreError::StaleCounter);
        }
        record.sign_count = new_count;
        Ok(())
    }
}

/// In-memory store implementation.
///
/// Backs single-process deployments and the test suites. Every trait method
/// takes the one mutex for the duration of the mutation, which gives the
/// same claim-at-most-once guarantee the Postgres conditional updates give.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::error::AuthError;
use crate::store::{
    IdentityRecord, IdentityStore, PasswordResetRecord, RefreshSessionRecord, ResetStore,
    SessionStore,
};

#[derive(Default)]
struct State {
    identities: HashMap<Uuid, IdentityRecord>,
    sessions: HashMap<Uuid, RefreshSessionRecord>,
    resets: HashMap<Uuid, PasswordResetRecord>,
}

#[derive(Default)]
pub struct InMemoryAuthStore {
    state: Mutex<State>,
}

impl InMemoryAuthStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an identity. The identity-management side of the platform owns
    /// creation in production; tests and single-process setups use this.
    pub fn add_identity(&self, record: IdentityRecord) {
        let mut state = self.state.lock().unwrap();
        state.identities.insert(record.id, record);
    }

    pub fn session_count(&self) -> usize {
        self.state.lock().unwrap().sessions.len()
    }

    pub fn reset_count(&self) -> usize {
        self.state.lock().unwrap().resets.len()
    }
}

#[async_trait]
impl IdentityStore for InMemoryAuthStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<IdentityRecord>, AuthError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .identities
            .values()
            .find(|i| i.email == email)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<IdentityRecord>, AuthError> {
        let state = self.state.lock().unwrap();
        Ok(state.identities.get(&id).cloned())
    }

    async fn update_credential(
        &self,
        email: &str,
        credential_hash: &str,
    ) -> Result<u64, AuthError> {
        let mut state = self.state.lock().unwrap();
        match state.identities.values_mut().find(|i| i.email == email) {
            Some(identity) => {
                identity.credential_hash = credential_hash.to_string();
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), AuthError> {
        let mut state = self.state.lock().unwrap();
        if let Some(identity) = state.identities.get_mut(&id) {
            identity.last_login_at = Some(at);
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for InMemoryAuthStore {
    async fn insert_session(&self, record: RefreshSessionRecord) -> Result<(), AuthError> {
        let mut state = self.state.lock().unwrap();
        state.sessions.insert(record.id, record);
        Ok(())
    }

    async fn claim_session(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<RefreshSessionRecord>, AuthError> {
        let mut state = self.state.lock().unwrap();
        let claimed = state
            .sessions
            .values_mut()
            .find(|s| s.token_hash == token_hash && s.revoked_at.is_none() && s.expires_at > now);

        match claimed {
            Some(session) => {
                session.revoked_at = Some(now);
                Ok(Some(session.clone()))
            }
            None => Ok(None),
        }
    }

    async fn revoke_session(&self, session_id: Uuid, at: DateTime<Utc>) -> Result<(), AuthError> {
        let mut state = self.state.lock().unwrap();
        if let Some(session) = state.sessions.get_mut(&session_id) {
            if session.revoked_at.is_none() {
                session.revoked_at = Some(at);
            }
        }
        Ok(())
    }

    async fn revoke_sessions_for(
        &self,
        subject_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<u64, AuthError> {
        let mut state = self.state.lock().unwrap();
        let mut revoked = 0;
        for session in state.sessions.values_mut() {
            if session.subject_id == subject_id && session.revoked_at.is_none() {
                session.revoked_at = Some(at);
                revoked += 1;
            }
        }
        Ok(revoked)
    }

    async fn delete_expired_sessions(&self, cutoff: DateTime<Utc>) -> Result<u64, AuthError> {
        let mut state = self.state.lock().unwrap();
        let before = state.sessions.len();
        state.sessions.retain(|_, s| s.expires_at > cutoff);
        Ok((before - state.sessions.len()) as u64)
    }
}

#[async_trait]
impl ResetStore for InMemoryAuthStore {
    async fn insert_reset(&self, record: PasswordResetRecord) -> Result<(), AuthError> {
        let mut state = self.state.lock().unwrap();
        state.resets.insert(record.id, record);
        Ok(())
    }

    async fn find_reset_by_token(
        &self,
        token: &str,
    ) -> Result<Option<PasswordResetRecord>, AuthError> {
        let state = self.state.lock().unwrap();
        Ok(state.resets.values().find(|r| r.token == token).cloned())
    }

    async fn delete_reset(&self, id: Uuid) -> Result<u64, AuthError> {
        let mut state = self.state.lock().unwrap();
        Ok(state.resets.remove(&id).map_or(0, |_| 1))
    }

    async fn delete_resets_for_email(&self, email: &str) -> Result<u64, AuthError> {
        let mut state = self.state.lock().unwrap();
        let before = state.resets.len();
        state.resets.retain(|_, r| r.email != email);
        Ok((before - state.resets.len()) as u64)
    }

    async fn delete_expired_resets(&self, cutoff: DateTime<Utc>) -> Result<u64, AuthError> {
        let mut state = self.state.lock().unwrap();
        let before = state.resets.len();
        state.resets.retain(|_, r| r.created_at > cutoff);
        Ok((before - state.resets.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{AccountStatus, Role};
    use chrono::Duration;

    fn session(token_hash: &str, expires_in: i64) -> RefreshSessionRecord {
        let now = Utc::now();
        RefreshSessionRecord {
            id: Uuid::new_v4(),
            subject_id: Uuid::new_v4(),
            token_hash: token_hash.to_string(),
            issued_at: now,
            expires_at: now + Duration::seconds(expires_in),
            revoked_at: None,
        }
    }

    #[tokio::test]
    async fn claim_succeeds_at_most_once() {
        let store = InMemoryAuthStore::new();
        store.insert_session(session("h1", 60)).await.unwrap();

        let now = Utc::now();
        let first = store.claim_session("h1", now).await.unwrap();
        let second = store.claim_session("h1", now).await.unwrap();

        assert!(first.is_some());
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn expired_session_cannot_be_claimed() {
        let store = InMemoryAuthStore::new();
        store.insert_session(session("h2", -1)).await.unwrap();

        let claimed = store.claim_session("h2", Utc::now()).await.unwrap();
        assert!(claimed.is_none());
    }

    #[tokio::test]
    async fn sweep_removes_only_expired() {
        let store = InMemoryAuthStore::new();
        store.insert_session(session("live", 3600)).await.unwrap();
        store.insert_session(session("dead", -3600)).await.unwrap();

        let removed = store.delete_expired_sessions(Utc::now()).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.session_count(), 1);
    }

    #[tokio::test]
    async fn update_credential_reports_missing_identity() {
        let store = InMemoryAuthStore::new();
        let affected = store.update_credential("ghost@example.com", "x").await.unwrap();
        assert_eq!(affected, 0);

        store.add_identity(IdentityRecord {
            id: Uuid::new_v4(),
            email: "real@example.com".to_string(),
            credential_hash: "old".to_string(),
            role: Role::Employee,
            status: AccountStatus::Active,
            last_login_at: None,
        });
        let affected = store.update_credential("real@example.com", "new").await.unwrap();
        assert_eq!(affected, 1);
    }
}

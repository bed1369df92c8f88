/// Persistence ports for the authentication core.
///
/// The embedding application supplies implementations of these collaborator
/// traits; the crate ships a Postgres-backed store and an in-memory store
/// (single-process deployments and tests). All operations the rotation and
/// reset flows rely on for correctness are expressed as single conditional
/// mutations so implementations stay atomic per record.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use uuid::Uuid;

use crate::error::AuthError;

pub mod memory;
pub mod postgres;

/// Role carried by an identity and embedded in access tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Hr,
    Manager,
    Employee,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Hr => "hr",
            Role::Manager => "manager",
            Role::Employee => "employee",
        }
    }

    /// Unknown role strings fail closed to `None`.
    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "admin" => Some(Role::Admin),
            "hr" => Some(Role::Hr),
            "manager" => Some(Role::Manager),
            "employee" => Some(Role::Employee),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountStatus {
    Active,
    Inactive,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Inactive => "inactive",
        }
    }

    pub fn parse(s: &str) -> Option<AccountStatus> {
        match s {
            "active" => Some(AccountStatus::Active),
            "inactive" => Some(AccountStatus::Inactive),
            _ => None,
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A principal capable of authenticating. Owned by the identity-management
/// side of the platform; this crate only reads it, stamps `last_login_at`,
/// and replaces the credential hash on password reset.
#[derive(Debug, Clone)]
pub struct IdentityRecord {
    pub id: Uuid,
    pub email: String,
    pub credential_hash: String,
    pub role: Role,
    pub status: AccountStatus,
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Durable record of one refresh session. Only the digest of the secret is
/// ever stored.
#[derive(Debug, Clone)]
pub struct RefreshSessionRecord {
    pub id: Uuid,
    pub subject_id: Uuid,
    pub token_hash: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

/// Pending password-reset request, keyed for lookup by token and by email.
/// Deleted on successful redemption.
#[derive(Debug, Clone)]
pub struct PasswordResetRecord {
    pub id: Uuid,
    pub email: String,
    pub token: String,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<IdentityRecord>, AuthError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<IdentityRecord>, AuthError>;

    /// Replaces the stored credential hash. Returns the number of rows
    /// affected; zero means the identity vanished between lookup and update.
    async fn update_credential(
        &self,
        email: &str,
        credential_hash: &str,
    ) -> Result<u64, AuthError>;

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), AuthError>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert_session(&self, record: RefreshSessionRecord) -> Result<(), AuthError>;

    /// Atomically revokes the live (unrevoked, unexpired) session matching
    /// `token_hash` and returns it. Of two concurrent claims on the same
    /// hash, exactly one succeeds; the loser sees `None`.
    async fn claim_session(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<RefreshSessionRecord>, AuthError>;

    /// Marks the session revoked. Idempotent.
    async fn revoke_session(&self, session_id: Uuid, at: DateTime<Utc>) -> Result<(), AuthError>;

    /// Revokes every live session of one subject. Returns the count revoked.
    async fn revoke_sessions_for(
        &self,
        subject_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<u64, AuthError>;

    /// Deletes sessions whose `expires_at` has passed. Returns the count.
    async fn delete_expired_sessions(&self, cutoff: DateTime<Utc>) -> Result<u64, AuthError>;
}

#[async_trait]
pub trait ResetStore: Send + Sync {
    async fn insert_reset(&self, record: PasswordResetRecord) -> Result<(), AuthError>;

    async fn find_reset_by_token(
        &self,
        token: &str,
    ) -> Result<Option<PasswordResetRecord>, AuthError>;

    /// Deletes one reset request. Returns the number of rows removed.
    async fn delete_reset(&self, id: Uuid) -> Result<u64, AuthError>;

    /// Deletes every pending request for an email so a fresh request
    /// supersedes older links.
    async fn delete_resets_for_email(&self, email: &str) -> Result<u64, AuthError>;

    async fn delete_expired_resets(&self, cutoff: DateTime<Utc>) -> Result<u64, AuthError>;
}

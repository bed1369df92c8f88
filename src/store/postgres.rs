/// Postgres store implementation.
///
/// Expected schema:
///
/// ```sql
/// CREATE TABLE identities (
///     id UUID PRIMARY KEY,
///     email TEXT NOT NULL UNIQUE,
///     credential_hash TEXT NOT NULL,
///     role TEXT NOT NULL,
///     status TEXT NOT NULL,
///     last_login_at TIMESTAMPTZ
/// );
/// CREATE TABLE refresh_sessions (
///     id UUID PRIMARY KEY,
///     subject_id UUID NOT NULL,
///     token_hash TEXT NOT NULL UNIQUE,
///     issued_at TIMESTAMPTZ NOT NULL,
///     expires_at TIMESTAMPTZ NOT NULL,
///     revoked_at TIMESTAMPTZ
/// );
/// CREATE TABLE password_reset_requests (
///     id UUID PRIMARY KEY,
///     email TEXT NOT NULL,
///     token TEXT NOT NULL UNIQUE,
///     created_at TIMESTAMPTZ NOT NULL
/// );
/// ```
///
/// Rotation correctness hinges on `claim_session` being one conditional
/// UPDATE: two concurrent refreshes presenting the same secret race on the
/// row, and the row predicate lets only one of them through.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AuthError;
use crate::store::{
    AccountStatus, IdentityRecord, IdentityStore, PasswordResetRecord, RefreshSessionRecord,
    ResetStore, Role, SessionStore,
};

#[derive(Clone)]
pub struct PgAuthStore {
    pool: PgPool,
}

impl PgAuthStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

type IdentityRow = (
    Uuid,
    String,
    String,
    String,
    String,
    Option<DateTime<Utc>>,
);

fn identity_from_row(row: IdentityRow) -> Result<IdentityRecord, AuthError> {
    let (id, email, credential_hash, role, status, last_login_at) = row;
    let role = Role::parse(&role)
        .ok_or_else(|| AuthError::Internal(format!("unknown role '{}' for identity {}", role, id)))?;
    let status = AccountStatus::parse(&status).ok_or_else(|| {
        AuthError::Internal(format!("unknown status '{}' for identity {}", status, id))
    })?;
    Ok(IdentityRecord {
        id,
        email,
        credential_hash,
        role,
        status,
        last_login_at,
    })
}

#[async_trait]
impl IdentityStore for PgAuthStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<IdentityRecord>, AuthError> {
        let row = sqlx::query_as::<_, IdentityRow>(
            r#"
            SELECT id, email, credential_hash, role, status, last_login_at
            FROM identities
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(identity_from_row).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<IdentityRecord>, AuthError> {
        let row = sqlx::query_as::<_, IdentityRow>(
            r#"
            SELECT id, email, credential_hash, role, status, last_login_at
            FROM identities
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(identity_from_row).transpose()
    }

    async fn update_credential(
        &self,
        email: &str,
        credential_hash: &str,
    ) -> Result<u64, AuthError> {
        let result = sqlx::query(
            r#"
            UPDATE identities
            SET credential_hash = $2
            WHERE email = $1
            "#,
        )
        .bind(email)
        .bind(credential_hash)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), AuthError> {
        sqlx::query(
            r#"
            UPDATE identities
            SET last_login_at = $2
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

type SessionRow = (
    Uuid,
    Uuid,
    String,
    DateTime<Utc>,
    DateTime<Utc>,
    Option<DateTime<Utc>>,
);

fn session_from_row(row: SessionRow) -> RefreshSessionRecord {
    let (id, subject_id, token_hash, issued_at, expires_at, revoked_at) = row;
    RefreshSessionRecord {
        id,
        subject_id,
        token_hash,
        issued_at,
        expires_at,
        revoked_at,
    }
}

#[async_trait]
impl SessionStore for PgAuthStore {
    async fn insert_session(&self, record: RefreshSessionRecord) -> Result<(), AuthError> {
        sqlx::query(
            r#"
            INSERT INTO refresh_sessions (id, subject_id, token_hash, issued_at, expires_at, revoked_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(record.id)
        .bind(record.subject_id)
        .bind(&record.token_hash)
        .bind(record.issued_at)
        .bind(record.expires_at)
        .bind(record.revoked_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn claim_session(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<RefreshSessionRecord>, AuthError> {
        // Single compare-and-swap on the stored hash: the WHERE predicate
        // admits only a live session, so a concurrent claim on the same
        // row finds revoked_at already set and matches nothing.
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            UPDATE refresh_sessions
            SET revoked_at = $2
            WHERE token_hash = $1 AND revoked_at IS NULL AND expires_at > $2
            RETURNING id, subject_id, token_hash, issued_at, expires_at, revoked_at
            "#,
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(session_from_row))
    }

    async fn revoke_session(&self, session_id: Uuid, at: DateTime<Utc>) -> Result<(), AuthError> {
        sqlx::query(
            r#"
            UPDATE refresh_sessions
            SET revoked_at = $2
            WHERE id = $1 AND revoked_at IS NULL
            "#,
        )
        .bind(session_id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn revoke_sessions_for(
        &self,
        subject_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<u64, AuthError> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_sessions
            SET revoked_at = $2
            WHERE subject_id = $1 AND revoked_at IS NULL
            "#,
        )
        .bind(subject_id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn delete_expired_sessions(&self, cutoff: DateTime<Utc>) -> Result<u64, AuthError> {
        let result = sqlx::query(
            r#"
            DELETE FROM refresh_sessions
            WHERE expires_at <= $1
            "#,
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl ResetStore for PgAuthStore {
    async fn insert_reset(&self, record: PasswordResetRecord) -> Result<(), AuthError> {
        sqlx::query(
            r#"
            INSERT INTO password_reset_requests (id, email, token, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(record.id)
        .bind(&record.email)
        .bind(&record.token)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_reset_by_token(
        &self,
        token: &str,
    ) -> Result<Option<PasswordResetRecord>, AuthError> {
        let row = sqlx::query_as::<_, (Uuid, String, String, DateTime<Utc>)>(
            r#"
            SELECT id, email, token, created_at
            FROM password_reset_requests
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, email, token, created_at)| PasswordResetRecord {
            id,
            email,
            token,
            created_at,
        }))
    }

    async fn delete_reset(&self, id: Uuid) -> Result<u64, AuthError> {
        let result = sqlx::query(
            r#"
            DELETE FROM password_reset_requests
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn delete_resets_for_email(&self, email: &str) -> Result<u64, AuthError> {
        let result = sqlx::query(
            r#"
            DELETE FROM password_reset_requests
            WHERE email = $1
            "#,
        )
        .bind(email)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn delete_expired_resets(&self, cutoff: DateTime<Utc>) -> Result<u64, AuthError> {
        let result = sqlx::query(
            r#"
            DELETE FROM password_reset_requests
            WHERE created_at <= $1
            "#,
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

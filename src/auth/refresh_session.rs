/// Refresh Session Management
///
/// Handles secure refresh-secret generation, storage, rotation, and
/// revocation. Refresh secrets are:
/// - Cryptographically secure random 64-character strings
/// - Stored only as their SHA-256 digest (never plaintext)
/// - Single-use: every refresh atomically revokes the presented session
///   and issues a replacement (rotation-on-use)
/// - Independently revocable per device, with a periodic sweep for
///   expired rows

use chrono::{Duration, Utc};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::token_digest::digest;
use crate::error::AuthError;
use crate::store::{RefreshSessionRecord, SessionStore};

const SECRET_LEN: usize = 64;

/// Generate a new cryptographically secure refresh secret.
///
/// The raw secret is what the client stores (e.g. in an HTTP-only cookie);
/// the server keeps only the digest.
pub fn generate_session_secret() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SECRET_LEN)
        .map(char::from)
        .collect()
}

/// Result of a successful rotation: the superseded session is already
/// revoked and this is its replacement.
#[derive(Debug)]
pub struct RotatedSession {
    pub subject_id: Uuid,
    pub session_id: Uuid,
    pub secret: String,
}

pub struct SessionManager<S> {
    store: Arc<S>,
    lifetime: Duration,
}

// Manual impl: `S` itself need not be Clone behind the Arc.
impl<S> Clone for SessionManager<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            lifetime: self.lifetime,
        }
    }
}

impl<S: SessionStore> SessionManager<S> {
    pub fn new(store: Arc<S>, lifetime_seconds: i64) -> Self {
        Self {
            store,
            lifetime: Duration::seconds(lifetime_seconds),
        }
    }

    /// Creates a refresh session for a subject and returns the raw secret
    /// plus the session id. The raw secret leaves this function only as the
    /// return value; the store sees the digest alone.
    pub async fn create(&self, subject_id: Uuid) -> Result<(String, Uuid), AuthError> {
        let secret = generate_session_secret();
        let session_id = Uuid::new_v4();
        let now = Utc::now();

        self.store
            .insert_session(RefreshSessionRecord {
                id: session_id,
                subject_id,
                token_hash: digest(&secret),
                issued_at: now,
                expires_at: now + self.lifetime,
                revoked_at: None,
            })
            .await?;

        Ok((secret, session_id))
    }

    /// Rotation-on-use: atomically claims (revokes) the live session whose
    /// hash matches the presented secret, then issues its replacement. A
    /// presented secret that matches no live session — already rotated,
    /// revoked, expired, or simply wrong — is a possible replay/theft
    /// signal and fails with the uniform authentication error.
    pub async fn rotate(&self, presented_secret: &str) -> Result<RotatedSession, AuthError> {
        let now = Utc::now();

        let claimed = self
            .store
            .claim_session(&digest(presented_secret), now)
            .await?;

        let claimed = match claimed {
            Some(session) => session,
            None => {
                tracing::warn!(
                    target: "security",
                    "refresh secret matched no live session, possible replay"
                );
                return Err(AuthError::Unauthenticated);
            }
        };

        let (secret, session_id) = self.create(claimed.subject_id).await?;

        Ok(RotatedSession {
            subject_id: claimed.subject_id,
            session_id,
            secret,
        })
    }

    /// Marks a session revoked. Idempotent.
    pub async fn revoke(&self, session_id: Uuid) -> Result<(), AuthError> {
        self.store.revoke_session(session_id, Utc::now()).await
    }

    /// Logout path: revokes whichever live session the presented secret
    /// belongs to. Revoking an already-dead secret is a no-op.
    pub async fn revoke_presented(&self, presented_secret: &str) -> Result<(), AuthError> {
        let now = Utc::now();
        if let Some(session) = self
            .store
            .claim_session(&digest(presented_secret), now)
            .await?
        {
            tracing::info!(
                target: "security",
                subject_id = %session.subject_id,
                session_id = %session.id,
                "refresh session revoked on logout"
            );
        }
        Ok(())
    }

    /// Logout-all-devices: revokes every live session of one subject.
    pub async fn revoke_all_for(&self, subject_id: Uuid) -> Result<u64, AuthError> {
        let revoked = self
            .store
            .revoke_sessions_for(subject_id, Utc::now())
            .await?;
        tracing::info!(
            target: "security",
            subject_id = %subject_id,
            revoked = revoked,
            "all refresh sessions revoked for subject"
        );
        Ok(revoked)
    }

    /// Deletes sessions whose expiry has passed. Returns the count removed.
    pub async fn sweep_expired(&self) -> Result<u64, AuthError> {
        self.store.delete_expired_sessions(Utc::now()).await
    }
}

/// Spawns the periodic cleanup sweep on its own task, independent of
/// request traffic.
pub fn spawn_sweeper<S>(
    manager: SessionManager<S>,
    every: std::time::Duration,
) -> tokio::task::JoinHandle<()>
where
    S: SessionStore + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            match manager.sweep_expired().await {
                Ok(0) => {}
                Ok(removed) => {
                    tracing::info!(removed = removed, "expired refresh sessions swept");
                }
                Err(e) => {
                    tracing::error!(error = %e, "refresh session sweep failed");
                }
            }
        }
    })
}

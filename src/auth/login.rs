/// Login, refresh, and logout orchestration.
///
/// Control flow on login: lockout check → identity lookup → account-status
/// check → bcrypt verification on the blocking pool → attempt-counter
/// update → access token + refresh session. The lockout check runs before
/// any credential work, so a locked account answers identically whether or
/// not the password would have matched.

use actix_web::cookie::{Cookie, SameSite};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::jwt::issue_access_token;
use crate::auth::password::verify_password_blocking;
use crate::auth::refresh_session::SessionManager;
use crate::configuration::SecuritySettings;
use crate::error::AuthError;
use crate::security::LoginGuard;
use crate::store::{AccountStatus, IdentityStore, SessionStore};
use crate::validators::is_valid_email;

pub const REFRESH_COOKIE_NAME: &str = "hrgate_refresh";

/// Tokens handed to the client after a successful login or refresh.
#[derive(Debug, serde::Serialize)]
pub struct IssuedTokens {
    pub access_token: String,
    /// Opaque refresh secret, to be stored client-side (see
    /// [`refresh_cookie`]). The server keeps only its digest.
    pub refresh_secret: String,
    #[serde(skip)]
    pub session_id: Uuid,
    pub token_type: String,
    pub expires_in: i64,
}

pub struct Authenticator<I, S> {
    identities: Arc<I>,
    sessions: SessionManager<S>,
    guard: LoginGuard,
    settings: SecuritySettings,
}

impl<I, S> Authenticator<I, S>
where
    I: IdentityStore,
    S: SessionStore,
{
    pub fn new(identities: Arc<I>, session_store: Arc<S>, settings: SecuritySettings) -> Self {
        Self {
            identities,
            sessions: SessionManager::new(session_store, settings.refresh_token_expiry),
            guard: LoginGuard::from_settings(&settings),
            settings,
        }
    }

    pub fn sessions(&self) -> &SessionManager<S> {
        &self.sessions
    }

    /// Authenticates with email and password.
    ///
    /// # Security Notes
    /// - "Unknown email", "wrong password", and "locked out" are
    ///   indistinguishable to the caller
    /// - Failed attempts count against the presented identity key either way
    /// - Tokens are only issued for active accounts
    pub async fn login(&self, email: &str, password: &str) -> Result<IssuedTokens, AuthError> {
        let email = is_valid_email(email).map_err(|_| AuthError::Unauthenticated)?;

        if self.guard.is_locked(&email) {
            tracing::warn!(
                target: "security",
                identity_key = %email,
                "login rejected: account locked out"
            );
            return Err(AuthError::Unauthenticated);
        }

        let identity = match self.identities.find_by_email(&email).await? {
            Some(identity) => identity,
            None => {
                self.guard.record_failure(&email);
                tracing::warn!(
                    target: "security",
                    identity_key = %email,
                    "login failed: unknown identity"
                );
                return Err(AuthError::Unauthenticated);
            }
        };

        if identity.status != AccountStatus::Active {
            tracing::warn!(
                target: "security",
                identity_id = %identity.id,
                "login rejected: account inactive"
            );
            return Err(AuthError::AccountInactive);
        }

        let password_valid =
            verify_password_blocking(password.to_string(), identity.credential_hash.clone())
                .await?;
        if !password_valid {
            self.guard.record_failure(&email);
            tracing::warn!(
                target: "security",
                identity_id = %identity.id,
                "login failed: credential mismatch"
            );
            return Err(AuthError::Unauthenticated);
        }

        self.guard.record_success(&email);
        self.identities
            .record_login(identity.id, Utc::now())
            .await?;

        let access_token = issue_access_token(identity.id, identity.role, &self.settings)?;
        let (refresh_secret, session_id) = self.sessions.create(identity.id).await?;

        tracing::info!(
            target: "security",
            identity_id = %identity.id,
            session_id = %session_id,
            "login succeeded"
        );

        Ok(IssuedTokens {
            access_token,
            refresh_secret,
            session_id,
            token_type: "Bearer".to_string(),
            expires_in: self.settings.access_token_expiry,
        })
    }

    /// Exchanges a refresh secret for a new access token and a rotated
    /// refresh secret. The presented secret is dead afterwards.
    pub async fn refresh(&self, presented_secret: &str) -> Result<IssuedTokens, AuthError> {
        let rotated = self.sessions.rotate(presented_secret).await?;

        let identity = match self.identities.find_by_id(rotated.subject_id).await? {
            Some(identity) if identity.status == AccountStatus::Active => identity,
            _ => {
                // Subject vanished or was deactivated since login: the
                // rotation already revoked the old session, drop the
                // replacement as well.
                self.sessions.revoke(rotated.session_id).await?;
                tracing::warn!(
                    target: "security",
                    subject_id = %rotated.subject_id,
                    "refresh rejected: subject missing or inactive"
                );
                return Err(AuthError::Unauthenticated);
            }
        };

        let access_token = issue_access_token(identity.id, identity.role, &self.settings)?;

        tracing::info!(
            target: "security",
            identity_id = %identity.id,
            session_id = %rotated.session_id,
            "refresh session rotated"
        );

        Ok(IssuedTokens {
            access_token,
            refresh_secret: rotated.secret,
            session_id: rotated.session_id,
            token_type: "Bearer".to_string(),
            expires_in: self.settings.access_token_expiry,
        })
    }

    /// Revokes the session the presented secret belongs to. Idempotent.
    pub async fn logout(&self, presented_secret: &str) -> Result<(), AuthError> {
        self.sessions.revoke_presented(presented_secret).await
    }

    /// Revokes every session of one subject across devices.
    pub async fn logout_all(&self, subject_id: Uuid) -> Result<u64, AuthError> {
        self.sessions.revoke_all_for(subject_id).await
    }

    /// Builds the client-side carrier for a refresh secret: HTTP-only,
    /// `path=/`, `SameSite=Strict`, `Secure` per environment.
    pub fn refresh_cookie<'a>(&self, refresh_secret: &'a str) -> Cookie<'a> {
        Cookie::build(REFRESH_COOKIE_NAME, refresh_secret)
            .path("/")
            .http_only(true)
            .secure(self.settings.secure_cookies)
            .same_site(SameSite::Strict)
            .finish()
    }
}

/// Password-Reset Workflow
///
/// Lifecycle of a reset token: issued on request, validated as a read-only
/// probe, redeemed exactly once, expired after a fixed window. The raw
/// token is persisted for lookup; the emailed link carries the encrypted
/// form so the database copy and the transported copy are never the same
/// string.
///
/// Anti-enumeration: `request_reset` answers identically whether or not the
/// address belongs to a registered identity, and every unusable-link flavor
/// (absent, expired, tampered, email mismatch) surfaces as the one generic
/// `InvalidResetLink`.

use chrono::{Duration, Utc};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::cipher::TokenCipher;
use crate::auth::password::hash_password_blocking;
use crate::configuration::SecuritySettings;
use crate::email_client::ResetLinkMailer;
use crate::error::AuthError;
use crate::store::{AccountStatus, IdentityStore, PasswordResetRecord, ResetStore};
use crate::validators::is_valid_email;

const RESET_TOKEN_LEN: usize = 48;

pub fn generate_reset_token() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RESET_TOKEN_LEN)
        .map(char::from)
        .collect()
}

pub struct PasswordResetService<I, R, M> {
    identities: Arc<I>,
    resets: Arc<R>,
    mailer: Arc<M>,
    cipher: TokenCipher,
    validity: Duration,
    bcrypt_cost: u32,
    link_base_url: String,
}

impl<I, R, M> PasswordResetService<I, R, M>
where
    I: IdentityStore,
    R: ResetStore,
    M: ResetLinkMailer,
{
    pub fn new(
        identities: Arc<I>,
        resets: Arc<R>,
        mailer: Arc<M>,
        settings: &SecuritySettings,
    ) -> Result<Self, AuthError> {
        Ok(Self {
            identities,
            resets,
            mailer,
            cipher: TokenCipher::from_base64_key(&settings.cipher_key)?,
            validity: Duration::seconds(settings.reset_token_expiry),
            bcrypt_cost: settings.bcrypt_cost,
            link_base_url: settings.reset_link_base_url.clone(),
        })
    }

    /// Issues a reset token and emails the encrypted link.
    ///
    /// Returns a generic success for unknown or malformed addresses so the
    /// caller cannot probe which emails are registered. A fresh request
    /// supersedes any pending one for the same address.
    pub async fn request_reset(&self, email: &str) -> Result<(), AuthError> {
        let email = match is_valid_email(email) {
            Ok(e) => e,
            Err(_) => {
                tracing::info!(target: "security", "reset requested for malformed address");
                return Ok(());
            }
        };

        let identity = match self.identities.find_by_email(&email).await? {
            Some(i) => i,
            None => {
                tracing::info!(target: "security", "reset requested for unknown address");
                return Ok(());
            }
        };

        let token = generate_reset_token();
        self.resets.delete_resets_for_email(&email).await?;
        self.resets
            .insert_reset(PasswordResetRecord {
                id: Uuid::new_v4(),
                email: email.clone(),
                token: token.clone(),
                created_at: Utc::now(),
            })
            .await?;

        let link = format!("{}?token={}", self.link_base_url, self.cipher.encrypt(&token)?);
        self.mailer.send_reset_link(&email, &link).await?;

        tracing::info!(
            target: "security",
            identity_id = %identity.id,
            "password reset link issued"
        );
        Ok(())
    }

    /// Read-only probe: decrypts the transported token, looks up the
    /// pending request, and returns the bound email. Safe to call
    /// repeatedly (e.g. for UI pre-fill); mutates nothing.
    pub async fn validate_link(&self, encrypted_token: &str) -> Result<String, AuthError> {
        let token = self.cipher.decrypt(encrypted_token).map_err(|e| {
            tracing::warn!(target: "security", reason = %e, "reset link failed decryption");
            AuthError::from(e)
        })?;

        let record = self
            .resets
            .find_reset_by_token(&token)
            .await?
            .ok_or(AuthError::InvalidResetLink)?;

        if self.is_expired(&record) {
            return Err(AuthError::InvalidResetLink);
        }

        Ok(record.email)
    }

    /// Redeems a reset token: replaces the credential and deletes the
    /// request. Every failing step is terminal; no partial reset is
    /// observable. The deletion comes strictly last and only after a
    /// successful single-row update, so a crash in between leaves the
    /// token usable rather than silently gone.
    pub async fn complete_reset(
        &self,
        email: &str,
        raw_token: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let record = self
            .resets
            .find_reset_by_token(raw_token)
            .await?
            .ok_or(AuthError::InvalidResetLink)?;

        if self.is_expired(&record) {
            tracing::info!(target: "security", "expired reset token presented");
            return Err(AuthError::InvalidResetLink);
        }

        if record.email != email {
            // A token issued for one address redeemed against another.
            tracing::error!(
                target: "security",
                reset_id = %record.id,
                "reset token redeemed against a different email"
            );
            return Err(AuthError::InvalidResetLink);
        }

        let identity = self
            .identities
            .find_by_email(email)
            .await?
            .ok_or(AuthError::InvalidResetLink)?;

        if identity.status != AccountStatus::Active {
            tracing::warn!(
                target: "security",
                identity_id = %identity.id,
                "reset attempted for inactive account"
            );
            return Err(AuthError::AccountInactive);
        }

        let credential_hash =
            hash_password_blocking(new_password.to_string(), self.bcrypt_cost).await?;

        let updated = self
            .identities
            .update_credential(email, &credential_hash)
            .await?;
        if updated == 0 {
            // The request stays on file so the attempt can be retried.
            return Err(AuthError::UpdateConflict);
        }

        self.resets.delete_reset(record.id).await?;

        tracing::info!(
            target: "security",
            identity_id = %identity.id,
            "password reset completed"
        );
        Ok(())
    }

    /// Deletes reset requests older than the validity window.
    pub async fn sweep_expired(&self) -> Result<u64, AuthError> {
        self.resets
            .delete_expired_resets(Utc::now() - self.validity)
            .await
    }

    fn is_expired(&self, record: &PasswordResetRecord) -> bool {
        Utc::now() - record.created_at > self.validity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_reset_token() {
        let token = generate_reset_token();

        assert_eq!(token.len(), 48);
        assert!(token.chars().all(|c| c.is_alphanumeric()));
        assert_ne!(token, generate_reset_token());
    }
}

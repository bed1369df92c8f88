/// Access Token Issuance and Verification
///
/// Stateless signed credentials: minted at login and refresh, verified on
/// every protected call, never stored. Revocation is short expiry plus
/// refresh-session revocation; there is no token blacklist.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::auth::claims::Claims;
use crate::configuration::SecuritySettings;
use crate::error::AuthError;
use crate::store::Role;

/// Mint a signed access token for an authenticated subject.
///
/// # Errors
/// Returns `Internal` if signing fails; the caller must abort the login.
pub fn issue_access_token(
    subject_id: Uuid,
    role: Role,
    settings: &SecuritySettings,
) -> Result<String, AuthError> {
    let claims = Claims::new(
        subject_id,
        role,
        settings.access_token_expiry,
        settings.issuer.clone(),
    );

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(settings.jwt_secret.as_bytes()),
    )
    .map_err(|e| AuthError::Internal(format!("Token generation failed: {}", e)))
}

/// Verify a presented access token and extract its claims.
///
/// Signature, expiry, and issuer are all checked. Every failure collapses
/// into the uniform `Unauthenticated` — the caller learns nothing about
/// which check failed; the reason goes to the security log only.
pub fn verify_access_token(token: &str, settings: &SecuritySettings) -> Result<Claims, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[&settings.issuer]);

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(settings.jwt_secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::warn!(target: "security", reason = %e, "access token rejected");
        AuthError::Unauthenticated
    })
}

/// Access-token claims
///
/// Payload of the stateless access credential: subject identity, role, and
/// the standard JWT time claims (RFC 7519). Never persisted; invalidated
/// only by expiry or a signing-key rotation.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AuthError;
use crate::store::Role;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (identity id as UUID string)
    pub sub: String,
    /// Role the subject held at issue time
    pub role: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Issuer
    pub iss: String,
}

impl Claims {
    pub fn new(subject_id: Uuid, role: Role, expiry_seconds: i64, issuer: String) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: subject_id.to_string(),
            role: role.as_str().to_string(),
            exp: now + expiry_seconds,
            iat: now,
            iss: issuer,
        }
    }

    /// Extract the subject id from verified claims.
    pub fn subject_id(&self) -> Result<Uuid, AuthError> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| AuthError::Internal("Invalid subject id in token".to_string()))
    }

    /// Extract the role. An unknown role string fails closed.
    pub fn parsed_role(&self) -> Result<Role, AuthError> {
        Role::parse(&self.role).ok_or(AuthError::Unauthenticated)
    }

    pub fn is_expired(&self) -> bool {
        let now = chrono::Utc::now().timestamp();
        self.exp < now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_creation() {
        let subject_id = Uuid::new_v4();
        let claims = Claims::new(subject_id, Role::Hr, 3600, "hrgate".to_string());

        assert_eq!(claims.sub, subject_id.to_string());
        assert_eq!(claims.role, "hr");
        assert_eq!(claims.iss, "hrgate");
        assert!(!claims.is_expired());
    }

    #[test]
    fn test_subject_id_extraction() {
        let subject_id = Uuid::new_v4();
        let claims = Claims::new(subject_id, Role::Employee, 3600, "hrgate".to_string());

        assert_eq!(claims.subject_id().unwrap(), subject_id);
        assert_eq!(claims.parsed_role().unwrap(), Role::Employee);
    }

    #[test]
    fn test_invalid_subject_id() {
        let mut claims = Claims::new(Uuid::new_v4(), Role::Admin, 3600, "hrgate".to_string());
        claims.sub = "not-a-uuid".to_string();

        assert!(claims.subject_id().is_err());
    }

    #[test]
    fn test_unknown_role_fails_closed() {
        let mut claims = Claims::new(Uuid::new_v4(), Role::Admin, 3600, "hrgate".to_string());
        claims.role = "root".to_string();

        assert!(matches!(
            claims.parsed_role(),
            Err(AuthError::Unauthenticated)
        ));
    }

    #[test]
    fn test_expired_claims() {
        let claims = Claims::new(Uuid::new_v4(), Role::Admin, -10, "hrgate".to_string());
        assert!(claims.is_expired());
    }
}

/// Authentication module
///
/// Credential hashing, token digests, the reset-link cipher, access-token
/// issuance/verification, refresh-session rotation, the password-reset
/// workflow, and the login flow that ties them together.

mod cipher;
mod claims;
mod jwt;
mod login;
mod password;
mod password_reset;
mod refresh_session;
mod token_digest;

pub use cipher::{CipherError, TokenCipher};
pub use claims::Claims;
pub use jwt::{issue_access_token, verify_access_token};
pub use login::{Authenticator, IssuedTokens, REFRESH_COOKIE_NAME};
pub use password::{
    hash_password, hash_password_blocking, verify_password, verify_password_blocking,
};
pub use password_reset::{generate_reset_token, PasswordResetService};
pub use refresh_session::{
    generate_session_secret, spawn_sweeper, RotatedSession, SessionManager,
};
pub use token_digest::digest;

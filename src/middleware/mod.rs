/// Request-interception layer: identity resolution on every protected call
/// plus the capability table business operations check against.

mod auth_gate;
mod capability;

pub use auth_gate::{AuthContext, AuthGate};
pub use capability::{role_allows, Capability};

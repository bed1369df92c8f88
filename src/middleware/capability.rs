/// Declarative capability checks.
///
/// The gate resolves WHO is calling; each business operation declares WHAT
/// it requires by asking the resolved context for a capability. The
/// role-to-capability mapping lives in this one table instead of being
/// re-derived inside every handler.

use crate::error::AuthError;
use crate::middleware::auth_gate::AuthContext;
use crate::store::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Create, update, or deactivate employee records.
    ManageEmployees,
    /// Approve or reject leave requests.
    ApproveLeave,
    /// Edit timesheets on behalf of others.
    ManageTimesheets,
    /// Read cross-employee reports.
    ViewReports,
}

pub fn role_allows(role: Role, capability: Capability) -> bool {
    match (role, capability) {
        (Role::Admin, _) => true,
        (Role::Hr, _) => true,
        (Role::Manager, Capability::ApproveLeave | Capability::ViewReports) => true,
        (Role::Manager, _) => false,
        // Employees act only on their own records, which handlers scope by
        // subject id rather than by capability.
        (Role::Employee, _) => false,
    }
}

impl AuthContext {
    /// Fails with `Forbidden` when the caller's role lacks the capability.
    pub fn require(&self, capability: Capability) -> Result<(), AuthError> {
        if role_allows(self.role, capability) {
            Ok(())
        } else {
            tracing::warn!(
                target: "security",
                subject_id = %self.subject_id,
                role = %self.role,
                capability = ?capability,
                "capability denied"
            );
            Err(AuthError::Forbidden)
        }
    }
}

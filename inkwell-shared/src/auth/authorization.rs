/// Role checks for dashboard routes
///
/// Roles are hierarchical (admin > editor > moderator), so a route names the
/// lowest role it accepts:
///
/// | Area | Minimum role |
/// |---|---|
/// | comment moderation | moderator |
/// | posts, categories, site content, activity | editor |
/// | users, newsletter subscribers | admin |
///
/// # Example
///
/// ```
/// use inkwell_shared::auth::authorization::require_role;
/// use inkwell_shared::auth::context::AuthContext;
/// use inkwell_shared::models::user::UserRole;
/// use uuid::Uuid;
///
/// let editor = AuthContext {
///     user_id: Uuid::new_v4(),
///     name: "Ed".to_string(),
///     email: "ed@example.com".to_string(),
///     role: UserRole::Editor,
/// };
///
/// assert!(require_role(&editor, UserRole::Moderator).is_ok());
/// assert!(require_role(&editor, UserRole::Admin).is_err());
/// ```

use uuid::Uuid;

use super::context::AuthContext;
use crate::models::user::UserRole;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    #[error("Insufficient permissions: requires {}, has {}", .required.as_str(), .actual.as_str())]
    InsufficientRole {
        required: UserRole,
        actual: UserRole,
    },

    /// Admins may not remove or demote themselves
    #[error("Cannot change your own account this way")]
    SelfModification,
}

/// Fails unless `auth` holds `required` or a higher role
pub fn require_role(auth: &AuthContext, required: UserRole) -> Result<(), AuthzError> {
    if !auth.role.has_permission(&required) {
        return Err(AuthzError::InsufficientRole {
            required,
            actual: auth.role,
        });
    }

    Ok(())
}

pub fn require_moderator(auth: &AuthContext) -> Result<(), AuthzError> {
    require_role(auth, UserRole::Moderator)
}

pub fn require_editor(auth: &AuthContext) -> Result<(), AuthzError> {
    require_role(auth, UserRole::Editor)
}

pub fn require_admin(auth: &AuthContext) -> Result<(), AuthzError> {
    require_role(auth, UserRole::Admin)
}

/// Guards admin actions that target a user account
pub fn require_other_user(auth: &AuthContext, target: Uuid) -> Result<(), AuthzError> {
    if auth.user_id == target {
        return Err(AuthzError::SelfModification);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(role: UserRole) -> AuthContext {
        AuthContext {
            user_id: Uuid::new_v4(),
            name: "Test".to_string(),
            email: "test@example.com".to_string(),
            role,
        }
    }

    #[test]
    fn test_moderator_access() {
        let moderator = ctx(UserRole::Moderator);
        assert!(require_moderator(&moderator).is_ok());
        assert!(require_editor(&moderator).is_err());
        assert!(require_admin(&moderator).is_err());
    }

    #[test]
    fn test_admin_passes_everything() {
        let admin = ctx(UserRole::Admin);
        assert!(require_moderator(&admin).is_ok());
        assert!(require_editor(&admin).is_ok());
        assert!(require_admin(&admin).is_ok());
    }

    #[test]
    fn test_require_other_user() {
        let admin = ctx(UserRole::Admin);
        assert_eq!(
            require_other_user(&admin, admin.user_id),
            Err(AuthzError::SelfModification)
        );
        assert!(require_other_user(&admin, Uuid::new_v4()).is_ok());
    }

    #[test]
    fn test_authz_error_display() {
        let err = require_admin(&ctx(UserRole::Editor)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Insufficient permissions: requires admin, has editor"
        );
    }
}

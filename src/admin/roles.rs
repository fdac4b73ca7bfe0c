//! Platform roles and the authorization checks built on them

text_enum! {
    /// Role levels, ordered from least to most privileged
    #[derive(PartialOrd, Ord)]
    pub enum Role: "role" {
        /// Regular account, can only submit reports
        User => "user",
        /// Can review reports and apply moderation actions
        Moderator => "moderator",
        /// Full access, can change roles and delete accounts
        Admin => "admin",
    }
}

impl Role {
    /// Check if this role can perform actions requiring another role
    pub fn can_act_as(&self, required: Role) -> bool {
        self >= &required
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::User
    }
}

/// Require a minimum role on an authenticated caller.
/// Usage: require_admin_role!(auth, Role::Admin);
#[macro_export]
macro_rules! require_admin_role {
    ($auth:expr, $required:expr) => {
        if !$auth.role.can_act_as($required) {
            tracing::warn!(
                "User {} with role {} denied action requiring {}",
                $auth.user_id,
                $auth.role,
                $required
            );
            return Err($crate::error::AppError::Authorization(format!(
                "Requires {} role or higher",
                $required.as_str()
            )));
        }
    };
}

//! Role name constants.

/// Administrators see and manage every user's resources.
pub const ROLE_ADMIN: &str = "admin";

/// Regular users see only their own resources.
pub const ROLE_USER: &str = "user";

//! Admin roles.

use serde::{Deserialize, Serialize};

/// Error returned when a string is not a known [`AdminRole`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid admin role: {0} (expected `admin` or `superadmin`)")]
pub struct ParseAdminRoleError(pub String);

/// Role held by an admin record.
///
/// The role is informational: capability checks read the permission flags,
/// never the role. The bootstrap admin and self-healed records are
/// `superadmin`; admins promoted by another admin are `admin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "admin_role", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum AdminRole {
    /// Admin promoted by another admin.
    #[default]
    Admin,
    /// Bootstrap admin or operator-promoted admin.
    SuperAdmin,
}

impl AdminRole {
    /// Returns the wire representation of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::SuperAdmin => "superadmin",
        }
    }
}

impl std::fmt::Display for AdminRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AdminRole {
    type Err = ParseAdminRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "superadmin" => Ok(Self::SuperAdmin),
            _ => Err(ParseAdminRoleError(s.to_owned())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_serde() {
        for role in [AdminRole::Admin, AdminRole::SuperAdmin] {
            let json = serde_json::to_string(&role).unwrap();
            assert_eq!(json, format!("\"{role}\""));
            assert_eq!(role.to_string().parse::<AdminRole>().unwrap(), role);
        }
    }

    #[test]
    fn test_from_str_rejects_unknown() {
        assert!("super_admin".parse::<AdminRole>().is_err());
        assert!("viewer".parse::<AdminRole>().is_err());
    }
}

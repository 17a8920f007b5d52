//! Admin record domain type.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use gadget_pulse_core::{AdminRole, Email, Permission, Permissions, Uid};

/// Display name used when the identity provider has none for a new admin.
pub const DEFAULT_ADMIN_DISPLAY_NAME: &str = "Admin User";

/// A privileged account (domain type).
///
/// At most one record exists per uid and per email. The record alone decides
/// authorization; the `isAdmin` flag on the matching account mirrors it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminRecord {
    /// Opaque record ID.
    pub id: Uuid,
    /// Identity-provider uid of the admin.
    pub uid: Uid,
    /// Admin's email address.
    pub email: Email,
    /// Admin's display name.
    pub display_name: String,
    /// Informational role.
    pub role: AdminRole,
    /// Uid of the admin who granted access, or the admin's own uid.
    pub added_by: Uid,
    /// Capability flags.
    pub permissions: Permissions,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// Last successful admin check.
    pub last_login: Option<DateTime<Utc>>,
}

impl AdminRecord {
    /// A self-granted superadmin record with every capability.
    ///
    /// Used by the bootstrap path, the self-healing fallback and operator
    /// promotion.
    #[must_use]
    pub fn self_granted(uid: Uid, email: Email, display_name: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            added_by: uid.clone(),
            uid,
            email,
            display_name,
            role: AdminRole::SuperAdmin,
            permissions: Permissions::all(),
            created_at: now,
            last_login: None,
        }
    }

    /// A record granted by another admin.
    #[must_use]
    pub fn granted(
        uid: Uid,
        email: Email,
        display_name: String,
        role: AdminRole,
        permissions: Permissions,
        added_by: Uid,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            uid,
            email,
            display_name,
            role,
            added_by,
            permissions,
            created_at: now,
            last_login: None,
        }
    }

    /// Returns whether this admin holds the capability.
    #[must_use]
    pub const fn can(&self, permission: Permission) -> bool {
        self.permissions.allows(permission)
    }
}

//! Capability flags carried by admin records.
//!
//! Every capability is a named boolean. A caller holds a capability only if
//! its admin record has the flag set; callers without a record hold none.
//! Partial input from clients is represented by [`PermissionOverrides`] and
//! applied with [`Permissions::merged`], which names every field explicitly.

use serde::{Deserialize, Serialize};

/// A single gated capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Permission {
    /// Create catalog products.
    CreateProducts,
    /// Edit catalog products.
    EditProducts,
    /// Delete catalog products.
    DeleteProducts,
    /// List and create admins.
    ManageAdmins,
    /// Read and edit other users' accounts.
    ManageUsers,
}

impl Permission {
    /// Every capability, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::CreateProducts,
        Self::EditProducts,
        Self::DeleteProducts,
        Self::ManageAdmins,
        Self::ManageUsers,
    ];

    /// Returns the wire name of the capability.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreateProducts => "createProducts",
            Self::EditProducts => "editProducts",
            Self::DeleteProducts => "deleteProducts",
            Self::ManageAdmins => "manageAdmins",
            Self::ManageUsers => "manageUsers",
        }
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The full set of capability flags on an admin record.
///
/// `Default` yields the component defaults used when a creator supplies no
/// value: every capability except `manageAdmins`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::struct_excessive_bools)]
pub struct Permissions {
    pub create_products: bool,
    pub edit_products: bool,
    pub delete_products: bool,
    pub manage_admins: bool,
    pub manage_users: bool,
}

impl Default for Permissions {
    fn default() -> Self {
        Self {
            create_products: true,
            edit_products: true,
            delete_products: true,
            manage_admins: false,
            manage_users: true,
        }
    }
}

impl Permissions {
    /// Every capability granted. Used for bootstrap and self-healed records.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            create_products: true,
            edit_products: true,
            delete_products: true,
            manage_admins: true,
            manage_users: true,
        }
    }

    /// No capability granted.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            create_products: false,
            edit_products: false,
            delete_products: false,
            manage_admins: false,
            manage_users: false,
        }
    }

    /// Returns whether the given capability is granted.
    #[must_use]
    pub const fn allows(&self, permission: Permission) -> bool {
        match permission {
            Permission::CreateProducts => self.create_products,
            Permission::EditProducts => self.edit_products,
            Permission::DeleteProducts => self.delete_products,
            Permission::ManageAdmins => self.manage_admins,
            Permission::ManageUsers => self.manage_users,
        }
    }

    /// Returns a copy with the overrides applied; unset overrides keep `self`.
    #[must_use]
    pub const fn merged(self, overrides: &PermissionOverrides) -> Self {
        Self {
            create_products: pick(overrides.create_products, self.create_products),
            edit_products: pick(overrides.edit_products, self.edit_products),
            delete_products: pick(overrides.delete_products, self.delete_products),
            manage_admins: pick(overrides.manage_admins, self.manage_admins),
            manage_users: pick(overrides.manage_users, self.manage_users),
        }
    }

    /// Returns the granted capabilities, in declaration order.
    #[must_use]
    pub fn granted(&self) -> Vec<Permission> {
        Permission::ALL
            .into_iter()
            .filter(|p| self.allows(*p))
            .collect()
    }
}

const fn pick(value: Option<bool>, fallback: bool) -> bool {
    match value {
        Some(v) => v,
        None => fallback,
    }
}

/// Partial permission input supplied by an admin creating another admin.
///
/// Unknown keys are rejected so a typo cannot silently fall back to a default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PermissionOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_products: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edit_products: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete_products: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manage_admins: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manage_users: Option<bool>,
}

// SPDX-FileCopyrightText: 2026 Perks Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Minimum-role table for bot actions.

use perks_core::{PerksError, Role, StaffUser};
use strum::Display;

use crate::resolver::Identity;
use crate::roles::{can_manage, role_level};

/// Something a user may attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Permission {
    /// A client looking at their own card and balance.
    ViewOwnAccount,
    SearchClients,
    ViewClient,
    CreateClient,
    EarnPoints,
    SpendPoints,
    AddNote,
    AdjustPoints,
    GrantBonus,
    EditClient,
    DeactivateClient,
    ManageStaff,
    ChangeRole,
    EditSettings,
}

impl Permission {
    /// Lowest role allowed to perform this action.
    pub fn min_role(self) -> Role {
        match self {
            Permission::ViewOwnAccount => Role::Client,
            Permission::SearchClients
            | Permission::ViewClient
            | Permission::CreateClient
            | Permission::EarnPoints
            | Permission::SpendPoints
            | Permission::AddNote => Role::Barista,
            Permission::AdjustPoints
            | Permission::GrantBonus
            | Permission::EditClient
            | Permission::DeactivateClient
            | Permission::ManageStaff => Role::Manager,
            Permission::ChangeRole | Permission::EditSettings => Role::Admin,
        }
    }
}

/// Check `identity` against the minimum role for `permission`.
///
/// Unknown users hold no role at all. Client-level permissions are not
/// granted to staff: a staff account does not have a loyalty card.
pub fn authorize(identity: &Identity, permission: Permission) -> Result<(), PerksError> {
    let min = permission.min_role();
    let allowed = match identity {
        Identity::Staff(user) => {
            user.is_active && min.is_staff() && role_level(user.role) >= role_level(min)
        }
        Identity::Client(client) => client.is_active && min == Role::Client,
        Identity::Unknown => false,
    };
    if allowed {
        Ok(())
    } else {
        Err(PerksError::AccessDenied(format!("{permission} requires {min}")))
    }
}

/// Staff-on-staff action: the permission check plus a strictly higher role.
pub fn authorize_manage(
    actor: &StaffUser,
    target: &StaffUser,
    permission: Permission,
) -> Result<(), PerksError> {
    authorize(&Identity::Staff(actor.clone()), permission)?;
    if actor.id == target.id || !can_manage(actor.role, target.role) {
        return Err(PerksError::NotManageable {
            actor: actor.role,
            target: target.role,
        });
    }
    Ok(())
}

/// Role changes are admin-only, and the new role must stay below the actor's.
pub fn authorize_role_change(
    actor: &StaffUser,
    target: &StaffUser,
    new_role: Role,
) -> Result<(), PerksError> {
    authorize_manage(actor, target, Permission::ChangeRole)?;
    if !new_role.is_staff() || !can_manage(actor.role, new_role) {
        return Err(PerksError::NotManageable {
            actor: actor.role,
            target: new_role,
        });
    }
    Ok(())
}

// SPDX-FileCopyrightText: 2026 Perks Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Role hierarchy comparisons.

use perks_core::{Role, StaffUser};

/// Position of `role` in the hierarchy: client=0, barista=1, manager=2, admin=3.
pub fn role_level(role: Role) -> u8 {
    role.level()
}

/// Whether the user holds one of `allowed`. Inactive accounts hold nothing.
pub fn has_role(user: &StaffUser, allowed: &[Role]) -> bool {
    user.is_active && allowed.contains(&user.role)
}

/// An actor may manage only strictly lower roles.
pub fn can_manage(actor: Role, target: Role) -> bool {
    role_level(actor) > role_level(target)
}

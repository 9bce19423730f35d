// SPDX-FileCopyrightText: 2026 Perks Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runtime-adjustable integer settings.

use async_trait::async_trait;

use crate::error::PerksError;
use crate::types::SettingKey;

/// Persistence for [`SettingKey`] overrides.
///
/// Absent keys fall back to configured defaults at the call site.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Returns the stored override for `key`, if any.
    async fn get_setting(&self, key: SettingKey) -> Result<Option<i64>, PerksError>;

    /// Stores an override for `key`, attributed to the staff member `updated_by`.
    async fn set_setting(
        &self,
        key: SettingKey,
        value: i64,
        updated_by: i64,
    ) -> Result<(), PerksError>;
}

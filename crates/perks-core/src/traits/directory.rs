// SPDX-FileCopyrightText: 2026 Perks Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client and staff directories.
//!
//! Directories own identity and profile data. They never write a client's
//! balance: that column belongs to the point ledger.

use async_trait::async_trait;

use crate::error::PerksError;
use crate::types::{Client, ClientFieldValue, NewClient, NewStaff, Role, StaffUser};

/// Lookup, search, and profile maintenance for loyalty clients.
#[async_trait]
pub trait ClientDirectory: Send + Sync {
    /// Fetches a client by internal id, active or not.
    async fn get_client(&self, id: i64) -> Result<Option<Client>, PerksError>;

    async fn find_client_by_card(&self, card_number: &str) -> Result<Option<Client>, PerksError>;

    /// Looks up by normalized phone number.
    async fn find_client_by_phone(&self, phone: &str) -> Result<Option<Client>, PerksError>;

    async fn find_client_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Client>, PerksError>;

    /// Free-form search over card number, phone digits, and name.
    ///
    /// Only active clients are returned.
    async fn search_clients(&self, query: &str, limit: usize) -> Result<Vec<Client>, PerksError>;

    /// Registers a client and issues the next card number.
    ///
    /// Fails with [`PerksError::Duplicate`] if the phone or external id is taken.
    async fn create_client(&self, client: &NewClient) -> Result<Client, PerksError>;

    /// Replaces one profile attribute.
    async fn update_client_field(
        &self,
        id: i64,
        value: &ClientFieldValue,
    ) -> Result<Client, PerksError>;

    /// Appends a line to the client's free-text notes.
    async fn append_client_note(&self, id: i64, note: &str) -> Result<Client, PerksError>;

    /// Soft-deletes or restores a client.
    async fn set_client_active(&self, id: i64, active: bool) -> Result<Client, PerksError>;
}

/// Lookup and maintenance of operator accounts.
#[async_trait]
pub trait StaffDirectory: Send + Sync {
    async fn get_staff(&self, id: i64) -> Result<Option<StaffUser>, PerksError>;

    /// Fetches by transport identifier, active or not.
    async fn find_staff_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<StaffUser>, PerksError>;

    /// Creates an account. Fails with [`PerksError::Duplicate`] if the
    /// external id already belongs to a staff member or a client.
    async fn create_staff(&self, staff: &NewStaff) -> Result<StaffUser, PerksError>;

    async fn rename_staff(&self, id: i64, name: &str) -> Result<StaffUser, PerksError>;

    async fn set_staff_role(&self, id: i64, role: Role) -> Result<StaffUser, PerksError>;

    async fn set_staff_active(&self, id: i64, active: bool) -> Result<StaffUser, PerksError>;

    /// All active staff, highest role first, then lowest id.
    async fn list_active_staff(&self) -> Result<Vec<StaffUser>, PerksError>;
}

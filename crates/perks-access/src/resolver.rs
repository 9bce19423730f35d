// SPDX-FileCopyrightText: 2026 Perks Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resolve an external contact id to a staff account or client.

use std::sync::Arc;

use perks_core::{Client, ClientDirectory, Role, StaffDirectory, StaffUser};
use tracing::{error, warn};

/// Who is on the other end of a conversation.
#[derive(Debug, Clone, PartialEq)]
pub enum Identity {
    Staff(StaffUser),
    Client(Client),
    Unknown,
}

impl Identity {
    /// Effective role. Unknown users have none.
    pub fn role(&self) -> Option<Role> {
        match self {
            Identity::Staff(user) => Some(user.role),
            Identity::Client(_) => Some(Role::Client),
            Identity::Unknown => None,
        }
    }

    pub fn as_staff(&self) -> Option<&StaffUser> {
        match self {
            Identity::Staff(user) => Some(user),
            _ => None,
        }
    }
}

/// Looks up roles through the directories. Fails closed.
#[derive(Clone)]
pub struct AccessResolver {
    staff: Arc<dyn StaffDirectory>,
    clients: Arc<dyn ClientDirectory>,
}

impl AccessResolver {
    pub fn new(staff: Arc<dyn StaffDirectory>, clients: Arc<dyn ClientDirectory>) -> Self {
        Self { staff, clients }
    }

    /// The active staff account for `external_id`, if any.
    ///
    /// Inactive accounts and lookup failures both resolve to `None`.
    pub async fn resolve(&self, external_id: &str) -> Option<StaffUser> {
        match self.staff.find_staff_by_external_id(external_id).await {
            Ok(Some(user)) if user.is_active => Some(user),
            Ok(Some(user)) => {
                warn!(staff_id = user.id, "inactive staff account denied");
                None
            }
            Ok(None) => None,
            Err(e) => {
                error!(error = %e, "staff lookup failed, denying access");
                None
            }
        }
    }

    /// Classify `external_id`. Staff wins if both a staff account and a
    /// client share the id.
    pub async fn identify(&self, external_id: &str) -> Identity {
        if let Some(user) = self.resolve(external_id).await {
            return Identity::Staff(user);
        }
        match self.clients.find_client_by_external_id(external_id).await {
            Ok(Some(client)) if client.is_active => Identity::Client(client),
            Ok(_) => Identity::Unknown,
            Err(e) => {
                error!(error = %e, "client lookup failed");
                Identity::Unknown
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use perks_core::{NewClient, NewStaff, PerksError};
    use perks_storage::{Database, SqliteDirectory};
    use tracing_test::traced_test;

    async fn resolver() -> (AccessResolver, SqliteDirectory) {
        let db = Database::open_in_memory().await.unwrap();
        let dir = SqliteDirectory::new(db);
        let resolver = AccessResolver::new(Arc::new(dir.clone()), Arc::new(dir.clone()));
        (resolver, dir)
    }

    #[tokio::test]
    async fn active_staff_resolve() {
        let (resolver, dir) = resolver().await;
        dir.create_staff(&NewStaff {
            external_id: "tg-1".into(),
            name: "Bea".into(),
            role: Role::Barista,
        })
        .await
        .unwrap();
        let user = resolver.resolve("tg-1").await.unwrap();
        assert_eq!(user.role, Role::Barista);
        assert!(resolver.resolve("tg-2").await.is_none());
    }

    #[tokio::test]
    async fn inactive_staff_resolve_to_none() {
        let (resolver, dir) = resolver().await;
        let user = dir
            .create_staff(&NewStaff {
                external_id: "tg-1".into(),
                name: "Bea".into(),
                role: Role::Admin,
            })
            .await
            .unwrap();
        dir.set_staff_active(user.id, false).await.unwrap();
        assert!(resolver.resolve("tg-1").await.is_none());
        assert_eq!(resolver.identify("tg-1").await, Identity::Unknown);
    }

    #[tokio::test]
    async fn identify_finds_clients() {
        let (resolver, dir) = resolver().await;
        dir.create_client(&NewClient {
            external_id: Some("tg-5".into()),
            name: "Ann".into(),
            ..NewClient::default()
        })
        .await
        .unwrap();
        let ident = resolver.identify("tg-5").await;
        assert_eq!(ident.role(), Some(Role::Client));
        assert!(ident.as_staff().is_none());
        assert_eq!(resolver.identify("nobody").await.role(), None);
    }

    struct BrokenStaff;

    #[async_trait]
    impl StaffDirectory for BrokenStaff {
        async fn get_staff(&self, _id: i64) -> Result<Option<StaffUser>, PerksError> {
            Err(PerksError::Internal("down".into()))
        }
        async fn find_staff_by_external_id(
            &self,
            _external_id: &str,
        ) -> Result<Option<StaffUser>, PerksError> {
            Err(PerksError::Internal("down".into()))
        }
        async fn create_staff(&self, _staff: &NewStaff) -> Result<StaffUser, PerksError> {
            Err(PerksError::Internal("down".into()))
        }
        async fn rename_staff(&self, _id: i64, _name: &str) -> Result<StaffUser, PerksError> {
            Err(PerksError::Internal("down".into()))
        }
        async fn set_staff_role(&self, _id: i64, _role: Role) -> Result<StaffUser, PerksError> {
            Err(PerksError::Internal("down".into()))
        }
        async fn set_staff_active(&self, _id: i64, _active: bool) -> Result<StaffUser, PerksError> {
            Err(PerksError::Internal("down".into()))
        }
        async fn list_active_staff(&self) -> Result<Vec<StaffUser>, PerksError> {
            Err(PerksError::Internal("down".into()))
        }
    }

    #[tokio::test]
    #[traced_test]
    async fn storage_failure_fails_closed() {
        let (_, dir) = resolver().await;
        let resolver = AccessResolver::new(Arc::new(BrokenStaff), Arc::new(dir));
        assert!(resolver.resolve("tg-1").await.is_none());
        assert!(logs_contain("denying access"));
    }
}

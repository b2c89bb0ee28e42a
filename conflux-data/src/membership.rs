//! The `access_control_membership` table: the expanded closure of
//! group→member relations observed from a source's directory sync.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DataError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MemberType {
    User,
    Group,
}

impl std::fmt::Display for MemberType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemberType::User => write!(f, "user"),
            MemberType::Group => write!(f, "group"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MembershipKey {
    pub organization_id: Uuid,
    pub source_connection_id: Uuid,
    pub group_id: String,
    pub member_id: String,
    pub member_type: MemberType,
}

#[derive(Debug, Clone)]
pub struct MembershipRow {
    pub key: MembershipKey,
    pub group_name: Option<String>,
    pub source_name: String,
    pub created_at: DateTime<Utc>,
}

#[async_trait::async_trait]
pub trait MembershipRepository: Send + Sync {
    async fn upsert(&self, row: MembershipRow) -> Result<(), DataError>;

    /// List all `(member_id, member_type)` pairs currently on record for
    /// `group_id`, to diff against a directory sync ADD set during
    /// reconciliation.
    async fn list_by_group(
        &self,
        organization_id: Uuid,
        source_connection_id: Uuid,
        group_id: &str,
    ) -> Result<Vec<MembershipRow>, DataError>;

    /// Delete one membership row by its full composite key. Returns whether
    /// a row was actually removed.
    async fn delete_by_key(&self, key: &MembershipKey) -> Result<bool, DataError>;

    /// Delete every membership for a group (used when a directory reports
    /// the group itself was removed). Returns the number of rows removed.
    async fn delete_by_group(
        &self,
        organization_id: Uuid,
        source_connection_id: Uuid,
        group_id: &str,
    ) -> Result<u64, DataError>;
}

#[derive(Default, Clone)]
pub struct InMemoryMembershipRepository {
    rows: std::sync::Arc<dashmap::DashMap<MembershipKey, MembershipRow>>,
}

impl InMemoryMembershipRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl MembershipRepository for InMemoryMembershipRepository {
    async fn upsert(&self, row: MembershipRow) -> Result<(), DataError> {
        self.rows.insert(row.key.clone(), row);
        Ok(())
    }

    async fn list_by_group(
        &self,
        organization_id: Uuid,
        source_connection_id: Uuid,
        group_id: &str,
    ) -> Result<Vec<MembershipRow>, DataError> {
        Ok(self
            .rows
            .iter()
            .filter(|entry| {
                let k = entry.key();
                k.organization_id == organization_id
                    && k.source_connection_id == source_connection_id
                    && k.group_id == group_id
            })
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn delete_by_key(&self, key: &MembershipKey) -> Result<bool, DataError> {
        Ok(self.rows.remove(key).is_some())
    }

    async fn delete_by_group(
        &self,
        organization_id: Uuid,
        source_connection_id: Uuid,
        group_id: &str,
    ) -> Result<u64, DataError> {
        let stale: Vec<MembershipKey> = self
            .rows
            .iter()
            .filter(|entry| {
                let k = entry.key();
                k.organization_id == organization_id
                    && k.source_connection_id == source_connection_id
                    && k.group_id == group_id
            })
            .map(|entry| entry.key().clone())
            .collect();
        for key in &stale {
            self.rows.remove(key);
        }
        Ok(stale.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(group_id: &str, member_id: &str) -> MembershipKey {
        MembershipKey {
            organization_id: Uuid::nil(),
            source_connection_id: Uuid::nil(),
            group_id: group_id.to_string(),
            member_id: member_id.to_string(),
            member_type: MemberType::User,
        }
    }

    fn row(group_id: &str, member_id: &str) -> MembershipRow {
        MembershipRow {
            key: key(group_id, member_id),
            group_name: Some(group_id.to_string()),
            source_name: "test_source".into(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn delete_by_group_removes_all_members() {
        let repo = InMemoryMembershipRepository::new();
        repo.upsert(row("group-a", "alice")).await.unwrap();
        repo.upsert(row("group-a", "bob")).await.unwrap();
        repo.upsert(row("group-b", "carol")).await.unwrap();

        let removed = repo.delete_by_group(Uuid::nil(), Uuid::nil(), "group-a").await.unwrap();
        assert_eq!(removed, 2);
        assert!(repo.list_by_group(Uuid::nil(), Uuid::nil(), "group-a").await.unwrap().is_empty());
        assert_eq!(repo.list_by_group(Uuid::nil(), Uuid::nil(), "group-b").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_by_key_is_idempotent() {
        let repo = InMemoryMembershipRepository::new();
        repo.upsert(row("group-a", "alice")).await.unwrap();
        assert!(repo.delete_by_key(&key("group-a", "alice")).await.unwrap());
        assert!(!repo.delete_by_key(&key("group-a", "alice")).await.unwrap());
    }
}

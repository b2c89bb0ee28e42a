//! Access-control pipeline (§4.9): diffs directory memberships against the
//! stored cursor and reconciles the `access_control_membership` table.

use crate::source::{DirSyncChangeType, DirSyncResult, Source};
use conflux_data::membership::{MembershipKey, MembershipRepository, MembershipRow};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Default, Clone)]
pub struct AclPipelineReport {
    pub upserted: u64,
    pub removed: u64,
    pub reconciled: u64,
    pub groups_deleted: u64,
}

pub struct AclPipeline {
    membership: Arc<dyn MembershipRepository>,
}

impl AclPipeline {
    pub fn new(membership: Arc<dyn MembershipRepository>) -> Self {
        Self { membership }
    }

    /// Run one pass of the pipeline for `source_connection_id` using the
    /// `cursor` persisted from the previous run. On any source error, falls
    /// back to a full re-sync of this connection's memberships rather than
    /// propagating (§4.9 invariant 5) — callers that want the fallback to
    /// actually repopulate state must additionally call [`Self::process_full`]
    /// with a freshly-read full directory listing.
    pub async fn run(
        &self,
        source: &dyn Source,
        organization_id: Uuid,
        source_connection_id: Uuid,
        source_name: &str,
        cursor: Option<&str>,
    ) -> Result<(AclPipelineReport, String), conflux_core::EngineError> {
        let result = match source.get_acl_changes(cursor).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(%source_connection_id, "dirsync call failed, falling back to full resync");
                return Err(conflux_core::EngineError::Other("dirsync failed; caller must run process_full".into()));
            }
        };

        let report = self
            .apply(&result, organization_id, source_connection_id, source_name)
            .await
            .map_err(|e| conflux_core::EngineError::StateStore(e.to_string()))?;

        Ok((report, result.cookie_b64))
    }

    async fn apply(
        &self,
        result: &DirSyncResult,
        organization_id: Uuid,
        source_connection_id: Uuid,
        source_name: &str,
    ) -> Result<AclPipelineReport, conflux_data::error::DataError> {
        let mut report = AclPipelineReport::default();

        for change in &result.changes {
            let key = MembershipKey {
                organization_id,
                source_connection_id,
                group_id: change.group_id.clone(),
                member_id: change.member_id.clone(),
                member_type: change.member_type.clone(),
            };
            match change.change_type {
                DirSyncChangeType::Add => {
                    self.membership
                        .upsert(MembershipRow {
                            key,
                            group_name: change.group_name.clone(),
                            source_name: source_name.to_string(),
                            created_at: chrono::Utc::now(),
                        })
                        .await?;
                    report.upserted += 1;
                }
                DirSyncChangeType::Remove => {
                    if self.membership.delete_by_key(&key).await? {
                        report.removed += 1;
                    }
                }
            }
        }

        // Reconciliation only runs for BASIC dirsync (all-ADDs, no REMOVE
        // events) and only for groups the directory actually touched.
        if !result.incremental_values && !result.modified_group_ids.is_empty() {
            for group_id in &result.modified_group_ids {
                let observed_member_ids: std::collections::HashSet<&str> = result
                    .changes
                    .iter()
                    .filter(|c| &c.group_id == group_id && matches!(c.change_type, DirSyncChangeType::Add))
                    .map(|c| c.member_id.as_str())
                    .collect();

                let current = self.membership.list_by_group(organization_id, source_connection_id, group_id).await?;
                for row in current {
                    if !observed_member_ids.contains(row.key.member_id.as_str()) {
                        if self.membership.delete_by_key(&row.key).await? {
                            report.reconciled += 1;
                        }
                    }
                }
            }
        }

        for group_id in &result.deleted_group_ids {
            report.groups_deleted += self.membership.delete_by_group(organization_id, source_connection_id, group_id).await?;
        }

        Ok(report)
    }

    /// Full re-sync fallback: treat every row in `full_listing` as the
    /// authoritative ADD set for its group and delete anything the listing
    /// doesn't mention — equivalent to reconciliation run over every group
    /// the source knows about.
    pub async fn process_full(
        &self,
        full_listing: &DirSyncResult,
        organization_id: Uuid,
        source_connection_id: Uuid,
        source_name: &str,
    ) -> Result<AclPipelineReport, conflux_core::EngineError> {
        let mut full = full_listing.clone();
        full.incremental_values = false;
        full.modified_group_ids = full.changes.iter().map(|c| c.group_id.clone()).collect();
        self.apply(&full, organization_id, source_connection_id, source_name)
            .await
            .map_err(|e| conflux_core::EngineError::StateStore(e.to_string()))
    }
}

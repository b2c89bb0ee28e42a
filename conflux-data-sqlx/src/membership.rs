use sqlx::{PgPool, Row};
use uuid::Uuid;

use conflux_data::{DataError, MemberType, MembershipKey, MembershipRepository, MembershipRow};

use crate::error::SqlxErrorExt;

#[derive(Clone)]
pub struct PgMembershipRepository {
    pool: PgPool,
}

impl PgMembershipRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn member_type_str(t: &MemberType) -> &'static str {
    match t {
        MemberType::User => "user",
        MemberType::Group => "group",
    }
}

fn parse_member_type(s: &str) -> MemberType {
    match s {
        "group" => MemberType::Group,
        _ => MemberType::User,
    }
}

fn row_from_record(row: sqlx::postgres::PgRow) -> Result<MembershipRow, DataError> {
    let member_type: String = row.try_get("member_type").map_err(SqlxErrorExt::into_data_error)?;
    Ok(MembershipRow {
        key: MembershipKey {
            organization_id: row.try_get("organization_id").map_err(SqlxErrorExt::into_data_error)?,
            source_connection_id: row.try_get("source_connection_id").map_err(SqlxErrorExt::into_data_error)?,
            group_id: row.try_get("group_id").map_err(SqlxErrorExt::into_data_error)?,
            member_id: row.try_get("member_id").map_err(SqlxErrorExt::into_data_error)?,
            member_type: parse_member_type(&member_type),
        },
        group_name: row.try_get("group_name").map_err(SqlxErrorExt::into_data_error)?,
        source_name: row.try_get("source_name").map_err(SqlxErrorExt::into_data_error)?,
        created_at: row.try_get("created_at").map_err(SqlxErrorExt::into_data_error)?,
    })
}

#[async_trait::async_trait]
impl MembershipRepository for PgMembershipRepository {
    async fn upsert(&self, row: MembershipRow) -> Result<(), DataError> {
        sqlx::query(
            "INSERT INTO access_control_membership \
               (organization_id, source_connection_id, group_id, member_id, member_type, group_name, source_name, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (organization_id, source_connection_id, group_id, member_id, member_type) \
             DO UPDATE SET group_name = EXCLUDED.group_name, source_name = EXCLUDED.source_name",
        )
        .bind(row.key.organization_id)
        .bind(row.key.source_connection_id)
        .bind(row.key.group_id)
        .bind(row.key.member_id)
        .bind(member_type_str(&row.key.member_type))
        .bind(row.group_name)
        .bind(row.source_name)
        .bind(row.created_at)
        .execute(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_data_error)?;
        Ok(())
    }

    async fn list_by_group(
        &self,
        organization_id: Uuid,
        source_connection_id: Uuid,
        group_id: &str,
    ) -> Result<Vec<MembershipRow>, DataError> {
        let rows = sqlx::query(
            "SELECT organization_id, source_connection_id, group_id, member_id, member_type, group_name, source_name, created_at \
             FROM access_control_membership \
             WHERE organization_id = $1 AND source_connection_id = $2 AND group_id = $3",
        )
        .bind(organization_id)
        .bind(source_connection_id)
        .bind(group_id)
        .fetch_all(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_data_error)?;

        rows.into_iter().map(row_from_record).collect()
    }

    async fn delete_by_key(&self, key: &MembershipKey) -> Result<bool, DataError> {
        let result = sqlx::query(
            "DELETE FROM access_control_membership \
             WHERE organization_id = $1 AND source_connection_id = $2 AND group_id = $3 \
               AND member_id = $4 AND member_type = $5",
        )
        .bind(key.organization_id)
        .bind(key.source_connection_id)
        .bind(&key.group_id)
        .bind(&key.member_id)
        .bind(member_type_str(&key.member_type))
        .execute(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_data_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_group(
        &self,
        organization_id: Uuid,
        source_connection_id: Uuid,
        group_id: &str,
    ) -> Result<u64, DataError> {
        let result = sqlx::query(
            "DELETE FROM access_control_membership \
             WHERE organization_id = $1 AND source_connection_id = $2 AND group_id = $3",
        )
        .bind(organization_id)
        .bind(source_connection_id)
        .bind(group_id)
        .execute(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_data_error)?;
        Ok(result.rows_affected())
    }
}

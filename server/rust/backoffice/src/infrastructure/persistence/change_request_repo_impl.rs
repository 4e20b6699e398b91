use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entity::change_request::{ChangeDetail, ChangeRequest};
use crate::domain::entity::row::Row;
use crate::domain::repository::ChangeRequestRepository;
use crate::domain::value_object::ChangeStatus;

pub struct ChangeRequestPostgresRepository {
    pool: PgPool,
}

impl ChangeRequestPostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 申請行に明細を結合してドメインエンティティへ変換する。
    async fn attach_details(&self, rows: Vec<ChangeRequestRow>) -> anyhow::Result<Vec<ChangeRequest>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let detail_rows = sqlx::query_as::<_, ChangeDetailRow>(
            r#"SELECT id, request_id, table_id, original_row_id, proposed_changes, status, applied
               FROM backoffice.change_details
               WHERE request_id = ANY($1)
               ORDER BY request_id, position"#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut details: HashMap<Uuid, Vec<ChangeDetail>> = HashMap::new();
        for row in detail_rows {
            let detail = ChangeDetail::try_from(row)?;
            details.entry(detail.request_id).or_default().push(detail);
        }

        rows.into_iter()
            .map(|row| {
                let request_details = details.remove(&row.id).unwrap_or_default();
                row.into_entity(request_details)
            })
            .collect()
    }
}

#[async_trait]
impl ChangeRequestRepository for ChangeRequestPostgresRepository {
    async fn find_by_id(&self, id: &Uuid) -> anyhow::Result<Option<ChangeRequest>> {
        let row = sqlx::query_as::<_, ChangeRequestRow>(
            "SELECT * FROM backoffice.change_requests WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.attach_details(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn find_pending_by_creator(&self, created_by: &str) -> anyhow::Result<Option<ChangeRequest>> {
        let row = sqlx::query_as::<_, ChangeRequestRow>(
            "SELECT * FROM backoffice.change_requests WHERE created_by = $1 AND status = 'PENDING' ORDER BY created_at ASC LIMIT 1",
        )
        .bind(created_by)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.attach_details(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn find_by_status(&self, status: ChangeStatus) -> anyhow::Result<Vec<ChangeRequest>> {
        let rows = sqlx::query_as::<_, ChangeRequestRow>(
            "SELECT * FROM backoffice.change_requests WHERE status = $1 ORDER BY created_at ASC",
        )
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;
        self.attach_details(rows).await
    }

    async fn find_by_creator(&self, created_by: &str) -> anyhow::Result<Vec<ChangeRequest>> {
        let rows = sqlx::query_as::<_, ChangeRequestRow>(
            "SELECT * FROM backoffice.change_requests WHERE created_by = $1 ORDER BY created_at ASC",
        )
        .bind(created_by)
        .fetch_all(&self.pool)
        .await?;
        self.attach_details(rows).await
    }

    async fn save(&self, request: &ChangeRequest) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;

        let table_ids: Vec<String> = request.table_schema_ids.iter().cloned().collect();
        sqlx::query(
            r#"INSERT INTO backoffice.change_requests
               (id, created_by, created_at, status, table_schema_ids, reviewed_at, reviewed_by, deployment_version_id)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
               ON CONFLICT (id) DO UPDATE SET
                 status = EXCLUDED.status,
                 table_schema_ids = EXCLUDED.table_schema_ids,
                 reviewed_at = EXCLUDED.reviewed_at,
                 reviewed_by = EXCLUDED.reviewed_by,
                 deployment_version_id = EXCLUDED.deployment_version_id"#,
        )
        .bind(request.id)
        .bind(&request.created_by)
        .bind(request.created_at)
        .bind(request.status.as_str())
        .bind(&table_ids)
        .bind(request.reviewed_at)
        .bind(&request.reviewed_by)
        .bind(&request.deployment_version_id)
        .execute(&mut *tx)
        .await?;

        for (position, detail) in request.details.iter().enumerate() {
            sqlx::query(
                r#"INSERT INTO backoffice.change_details
                   (id, request_id, position, table_id, original_row_id, proposed_changes, status, applied)
                   VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                   ON CONFLICT (id) DO UPDATE SET
                     proposed_changes = EXCLUDED.proposed_changes,
                     status = EXCLUDED.status,
                     applied = EXCLUDED.applied"#,
            )
            .bind(detail.id)
            .bind(detail.request_id)
            .bind(i32::try_from(position)?)
            .bind(&detail.table_id)
            .bind(&detail.original_row_id)
            .bind(serde_json::Value::Object(detail.proposed_changes.clone()))
            .bind(detail.status.as_str())
            .bind(detail.applied)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct ChangeRequestRow {
    id: Uuid,
    created_by: String,
    created_at: DateTime<Utc>,
    status: String,
    table_schema_ids: Vec<String>,
    reviewed_at: Option<DateTime<Utc>>,
    reviewed_by: Option<String>,
    deployment_version_id: Option<String>,
}

impl ChangeRequestRow {
    fn into_entity(self, details: Vec<ChangeDetail>) -> anyhow::Result<ChangeRequest> {
        Ok(ChangeRequest {
            id: self.id,
            created_by: self.created_by,
            created_at: self.created_at,
            status: parse_status(&self.status)?,
            table_schema_ids: self.table_schema_ids.into_iter().collect(),
            reviewed_at: self.reviewed_at,
            reviewed_by: self.reviewed_by,
            deployment_version_id: self.deployment_version_id,
            details,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ChangeDetailRow {
    id: Uuid,
    request_id: Uuid,
    table_id: String,
    original_row_id: String,
    proposed_changes: serde_json::Value,
    status: String,
    applied: bool,
}

impl TryFrom<ChangeDetailRow> for ChangeDetail {
    type Error = anyhow::Error;

    fn try_from(row: ChangeDetailRow) -> anyhow::Result<Self> {
        let proposed_changes: Row = match row.proposed_changes {
            serde_json::Value::Object(map) => map,
            other => anyhow::bail!("proposed_changes must be an object, got {}", other),
        };
        Ok(Self {
            id: row.id,
            request_id: row.request_id,
            table_id: row.table_id,
            original_row_id: row.original_row_id,
            proposed_changes,
            status: parse_status(&row.status)?,
            applied: row.applied,
        })
    }
}

fn parse_status(s: &str) -> anyhow::Result<ChangeStatus> {
    ChangeStatus::parse(s).ok_or_else(|| anyhow::anyhow!("unknown change status: {}", s))
}

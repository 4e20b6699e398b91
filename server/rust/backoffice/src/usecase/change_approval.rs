use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use super::edit_table::{EditContext, EditTableError, EditTableUseCase};
use crate::domain::entity::change_request::ChangeRequest;
use crate::domain::entity::row::Row;
use crate::domain::entity::table_event::TableEvent;
use crate::domain::repository::ChangeRequestRepository;
use crate::domain::service::FieldViolation;
use crate::domain::value_object::ChangeStatus;
use crate::infrastructure::event_bus::TableEventBus;

/// ChangeApprovalError は変更申請ワークフローに関するエラーを表す。
#[derive(Debug, thiserror::Error)]
pub enum ChangeApprovalError {
    #[error("change request not found: {0}")]
    NotFound(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("invalid field values")]
    InvalidFields(Vec<FieldViolation>),

    #[error("invalid status for {action}: {status}")]
    InvalidStatus { action: String, status: String },

    #[error("failed to apply change detail {detail_id}: {message}")]
    ApplyFailed { detail_id: Uuid, message: String },

    #[error("internal error: {0}")]
    Internal(String),
}

/// SubmitChangeInput は変更提案のリクエストを表す。
#[derive(Debug, Clone)]
pub struct SubmitChangeInput {
    pub actor: String,
    pub table_id: String,
    pub row_id: String,
    pub proposed_changes: Row,
}

/// ApplyOutcome は承認済み申請の反映結果を表す。
#[derive(Debug, Clone)]
pub struct ApplyOutcome {
    pub request: ChangeRequest,
    pub applied: usize,
    pub skipped: usize,
}

/// ChangeApprovalUseCase は変更申請の提出・承認・却下・反映を扱う。
/// 承認は状態遷移のみで、実テーブルへの反映は apply_approved で明示的に行う。
pub struct ChangeApprovalUseCase {
    change_repo: Arc<dyn ChangeRequestRepository>,
    edit: Arc<EditTableUseCase>,
    event_bus: Arc<TableEventBus>,
    // 読み出しから保存までの一連の更新を直列化する
    write_lock: Mutex<()>,
}

impl ChangeApprovalUseCase {
    pub fn new(
        change_repo: Arc<dyn ChangeRequestRepository>,
        edit: Arc<EditTableUseCase>,
        event_bus: Arc<TableEventBus>,
    ) -> Self {
        Self {
            change_repo,
            edit,
            event_bus,
            write_lock: Mutex::new(()),
        }
    }

    fn internal(e: anyhow::Error) -> ChangeApprovalError {
        ChangeApprovalError::Internal(e.to_string())
    }

    fn notify(&self, request: &ChangeRequest) {
        self.event_bus.publish(TableEvent::ChangeRequestUpdated {
            request_id: request.id,
            status: request.status,
        });
    }

    async fn load(&self, request_id: &Uuid) -> Result<ChangeRequest, ChangeApprovalError> {
        self.change_repo
            .find_by_id(request_id)
            .await
            .map_err(Self::internal)?
            .ok_or_else(|| ChangeApprovalError::NotFound(request_id.to_string()))
    }

    /// 変更提案を申請者の PENDING 申請に追加する。PENDING 申請がなければ新規作成する。
    /// 実テーブルは変更しない。
    pub async fn submit_change(&self, input: SubmitChangeInput) -> Result<ChangeRequest, ChangeApprovalError> {
        if input.actor.is_empty() {
            return Err(ChangeApprovalError::Validation("actor is required".to_string()));
        }
        if input.table_id.is_empty() {
            return Err(ChangeApprovalError::Validation("table_id is required".to_string()));
        }
        if input.row_id.is_empty() {
            return Err(ChangeApprovalError::Validation("row_id is required".to_string()));
        }
        if input.proposed_changes.is_empty() {
            return Err(ChangeApprovalError::Validation(
                "proposed_changes must not be empty".to_string(),
            ));
        }

        self.edit
            .validate_changes(&input.table_id, &input.proposed_changes)
            .await
            .map_err(|e| match e {
                EditTableError::Validation(violations) => ChangeApprovalError::InvalidFields(violations),
                EditTableError::TableNotFound(table) => {
                    ChangeApprovalError::Validation(format!("table not found: {}", table))
                }
                other => ChangeApprovalError::Internal(other.to_string()),
            })?;

        let _guard = self.write_lock.lock().await;
        let mut request = match self
            .change_repo
            .find_pending_by_creator(&input.actor)
            .await
            .map_err(Self::internal)?
        {
            Some(existing) => existing,
            None => ChangeRequest::new(&input.actor),
        };
        request.add_detail(&input.table_id, &input.row_id, input.proposed_changes);
        self.change_repo.save(&request).await.map_err(Self::internal)?;

        info!(
            request_id = %request.id,
            actor = %input.actor,
            table_id = %input.table_id,
            details = request.details.len(),
            "change submitted"
        );
        self.notify(&request);
        Ok(request)
    }

    /// PENDING → APPROVED。既に判定済みの申請はそのまま返す。
    pub async fn approve(&self, request_id: &Uuid, reviewer: &str) -> Result<ChangeRequest, ChangeApprovalError> {
        self.decide(request_id, reviewer, ChangeStatus::Approved).await
    }

    /// PENDING → REJECTED。既に判定済みの申請はそのまま返す。
    pub async fn reject(&self, request_id: &Uuid, reviewer: &str) -> Result<ChangeRequest, ChangeApprovalError> {
        self.decide(request_id, reviewer, ChangeStatus::Rejected).await
    }

    async fn decide(
        &self,
        request_id: &Uuid,
        reviewer: &str,
        status: ChangeStatus,
    ) -> Result<ChangeRequest, ChangeApprovalError> {
        if reviewer.is_empty() {
            return Err(ChangeApprovalError::Validation("reviewer is required".to_string()));
        }

        let _guard = self.write_lock.lock().await;
        let mut request = self.load(request_id).await?;
        let changed = match status {
            ChangeStatus::Approved => request.approve(reviewer),
            ChangeStatus::Rejected => request.reject(reviewer),
            ChangeStatus::Pending => false,
        };
        if !changed {
            info!(request_id = %request_id, status = %request.status, "change request already decided");
            return Ok(request);
        }

        self.change_repo.save(&request).await.map_err(Self::internal)?;
        info!(request_id = %request_id, reviewer = %reviewer, status = %request.status, "change request decided");
        self.notify(&request);
        Ok(request)
    }

    /// レビュー待ちの申請を作成日時の古い順に返す。
    pub async fn get_pending_requests_for_reviewer(&self) -> Result<Vec<ChangeRequest>, ChangeApprovalError> {
        let mut requests = self
            .change_repo
            .find_by_status(ChangeStatus::Pending)
            .await
            .map_err(Self::internal)?;
        requests.sort_by_key(|r| r.created_at);
        Ok(requests)
    }

    pub async fn get_request(&self, request_id: &Uuid) -> Result<ChangeRequest, ChangeApprovalError> {
        self.load(request_id).await
    }

    /// 承認済み申請の未反映明細を編集経路（スナップショット + 更新）で実テーブルに反映する。
    /// 途中で失敗した場合は反映済みの明細までを記録してエラーを返す。
    pub async fn apply_approved(&self, request_id: &Uuid, actor: &str) -> Result<ApplyOutcome, ChangeApprovalError> {
        let _guard = self.write_lock.lock().await;
        let mut request = self.load(request_id).await?;
        if request.status != ChangeStatus::Approved {
            return Err(ChangeApprovalError::InvalidStatus {
                action: "apply".to_string(),
                status: request.status.to_string(),
            });
        }

        let ctx = EditContext::new(actor).with_description(format!("apply change request {}", request.id));
        let mut applied = 0;
        let mut skipped = 0;
        let mut failure = None;
        for detail in &mut request.details {
            if detail.applied {
                skipped += 1;
                continue;
            }
            match self
                .edit
                .update_row(&detail.table_id, &detail.original_row_id, &detail.proposed_changes, &ctx)
                .await
            {
                Ok(_) => {
                    detail.applied = true;
                    applied += 1;
                }
                Err(e) => {
                    failure = Some(ChangeApprovalError::ApplyFailed {
                        detail_id: detail.id,
                        message: e.to_string(),
                    });
                    break;
                }
            }
        }

        if applied > 0 {
            self.change_repo.save(&request).await.map_err(Self::internal)?;
            self.notify(&request);
        }
        if let Some(err) = failure {
            return Err(err);
        }

        info!(request_id = %request_id, applied, skipped, "approved change request applied");
        Ok(ApplyOutcome {
            request,
            applied,
            skipped,
        })
    }

    /// 承認済み申請にデプロイバージョンを記録する。
    pub async fn record_deployment(
        &self,
        request_id: &Uuid,
        deployment_version_id: &str,
        actor: &str,
    ) -> Result<ChangeRequest, ChangeApprovalError> {
        if deployment_version_id.is_empty() {
            return Err(ChangeApprovalError::Validation(
                "deployment_version_id is required".to_string(),
            ));
        }

        let _guard = self.write_lock.lock().await;
        let mut request = self.load(request_id).await?;
        if request.status != ChangeStatus::Approved {
            return Err(ChangeApprovalError::InvalidStatus {
                action: "record deployment".to_string(),
                status: request.status.to_string(),
            });
        }
        request.deployment_version_id = Some(deployment_version_id.to_string());
        self.change_repo.save(&request).await.map_err(Self::internal)?;
        info!(
            request_id = %request_id,
            deployment_version_id = %deployment_version_id,
            recorded_by = %actor,
            "deployment recorded"
        );
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::domain::entity::column_definition::ColumnDefinition;
    use crate::domain::entity::table_schema::TableSchema;
    use crate::domain::repository::change_request_repository::MockChangeRequestRepository;
    use crate::domain::repository::RowStore;
    use crate::domain::value_object::{DataType, StorageBackend};
    use crate::infrastructure::persistence::in_memory_change_request_repo::InMemoryChangeRequestRepository;
    use crate::infrastructure::persistence::local_row_store::LocalRowStore;
    use crate::infrastructure::persistence::memory_kv_store::InMemoryKeyValueStore;
    use crate::infrastructure::persistence::table_version_repo_impl::TableVersionKvRepository;
    use crate::usecase::schema_registry::SchemaRegistry;
    use crate::usecase::table_store::TableStore;
    use crate::usecase::version_tracking::VersionTrackingUseCase;
    use serde_json::json;

    fn as_row(v: serde_json::Value) -> Row {
        v.as_object().cloned().unwrap()
    }

    struct Fixture {
        store: Arc<TableStore>,
        versions: Arc<VersionTrackingUseCase>,
        edit: Arc<EditTableUseCase>,
        bus: Arc<TableEventBus>,
    }

    async fn fixture() -> Fixture {
        let kv = Arc::new(InMemoryKeyValueStore::new());
        let local: Arc<dyn RowStore> = Arc::new(LocalRowStore::new(kv.clone()));
        let bus = Arc::new(TableEventBus::default());
        let store = Arc::new(TableStore::new(
            HashMap::new(),
            StorageBackend::Local,
            None,
            local,
            bus.clone(),
        ));
        let mut declared = HashMap::new();
        declared.insert(
            "rate_sheets".to_string(),
            TableSchema::new(
                "rate_sheets",
                "Rate Sheets",
                vec![
                    ColumnDefinition::primary_key("id"),
                    ColumnDefinition::new("amount", "Amount", DataType::Number),
                ],
            ),
        );
        let registry = Arc::new(SchemaRegistry::new(store.clone(), declared, 100));
        let versions = Arc::new(VersionTrackingUseCase::new(
            Arc::new(TableVersionKvRepository::new(kv)),
            0,
        ));
        let edit = Arc::new(EditTableUseCase::new(registry, store.clone(), versions.clone()));
        store
            .replace_all(
                "rate_sheets",
                &[
                    as_row(json!({"id": "A1", "amount": 150})),
                    as_row(json!({"id": "A2", "amount": 200})),
                ],
            )
            .await
            .unwrap();
        Fixture {
            store,
            versions,
            edit,
            bus,
        }
    }

    fn submit(actor: &str, row_id: &str, amount: i64) -> SubmitChangeInput {
        SubmitChangeInput {
            actor: actor.to_string(),
            table_id: "rate_sheets".to_string(),
            row_id: row_id.to_string(),
            proposed_changes: as_row(json!({"amount": amount})),
        }
    }

    #[tokio::test]
    async fn test_submit_approve_apply_scenario() {
        let f = fixture().await;
        let uc = ChangeApprovalUseCase::new(
            Arc::new(InMemoryChangeRequestRepository::new()),
            f.edit.clone(),
            f.bus.clone(),
        );

        let request = uc.submit_change(submit("submitter", "A1", 500)).await.unwrap();
        assert_eq!(request.status, ChangeStatus::Pending);
        assert_eq!(request.details.len(), 1);
        // 提出時点では実テーブルは変わらない
        let rows = f.store.fetch("rate_sheets").await.unwrap();
        assert_eq!(rows[0]["amount"], json!(150));

        let approved = uc.approve(&request.id, "reviewer").await.unwrap();
        assert_eq!(approved.status, ChangeStatus::Approved);
        assert_eq!(approved.details[0].status, ChangeStatus::Approved);
        assert_eq!(approved.reviewed_by.as_deref(), Some("reviewer"));

        let outcome = uc.apply_approved(&request.id, "reviewer").await.unwrap();
        assert_eq!(outcome.applied, 1);
        assert!(outcome.request.details[0].applied);

        let rows = f.store.fetch("rate_sheets").await.unwrap();
        let a1 = rows.iter().find(|r| r["id"] == json!("A1")).unwrap();
        assert_eq!(a1["amount"], json!(500));

        // 反映前の状態がバージョンとして残る
        let versions = f.versions.list_versions("rate_sheets").await.unwrap();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].data[0]["amount"], json!(150));

        // 再実行しても二重に反映しない
        let again = uc.apply_approved(&request.id, "reviewer").await.unwrap();
        assert_eq!(again.applied, 0);
        assert_eq!(again.skipped, 1);
        assert_eq!(f.versions.list_versions("rate_sheets").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_submissions_accumulate_in_open_request() {
        let f = fixture().await;
        let uc = ChangeApprovalUseCase::new(
            Arc::new(InMemoryChangeRequestRepository::new()),
            f.edit.clone(),
            f.bus.clone(),
        );

        let first = uc.submit_change(submit("submitter", "A1", 500)).await.unwrap();
        let second = uc.submit_change(submit("submitter", "A2", 600)).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.details.len(), 2);

        let other = uc.submit_change(submit("someone-else", "A1", 700)).await.unwrap();
        assert_ne!(other.id, first.id);

        // 判定後の提出は新しい申請になる
        uc.reject(&first.id, "reviewer").await.unwrap();
        let third = uc.submit_change(submit("submitter", "A1", 800)).await.unwrap();
        assert_ne!(third.id, first.id);
    }

    #[tokio::test]
    async fn test_decisions_are_terminal() {
        let f = fixture().await;
        let uc = ChangeApprovalUseCase::new(
            Arc::new(InMemoryChangeRequestRepository::new()),
            f.edit.clone(),
            f.bus.clone(),
        );
        let request = uc.submit_change(submit("submitter", "A1", 500)).await.unwrap();

        let rejected = uc.reject(&request.id, "reviewer").await.unwrap();
        let mut rx = f.bus.subscribe();
        let approved = uc.approve(&request.id, "other-reviewer").await.unwrap();
        assert_eq!(approved.status, ChangeStatus::Rejected);
        assert_eq!(approved.reviewed_at, rejected.reviewed_at);
        assert_eq!(approved.reviewed_by.as_deref(), Some("reviewer"));
        // 二度目の判定では通知も発生しない
        assert!(rx.try_recv().is_err());

        let result = uc.apply_approved(&request.id, "reviewer").await;
        assert!(matches!(result, Err(ChangeApprovalError::InvalidStatus { .. })));
    }

    #[tokio::test]
    async fn test_submit_validates_against_schema() {
        let f = fixture().await;
        let uc = ChangeApprovalUseCase::new(
            Arc::new(InMemoryChangeRequestRepository::new()),
            f.edit.clone(),
            f.bus.clone(),
        );

        let mut input = submit("submitter", "A1", 500);
        input.proposed_changes = as_row(json!({"amount": "lots"}));
        assert!(matches!(
            uc.submit_change(input).await,
            Err(ChangeApprovalError::InvalidFields(_))
        ));

        let mut input = submit("submitter", "A1", 500);
        input.proposed_changes = Row::new();
        assert!(matches!(
            uc.submit_change(input).await,
            Err(ChangeApprovalError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_apply_failure_keeps_progress() {
        let f = fixture().await;
        let uc = ChangeApprovalUseCase::new(
            Arc::new(InMemoryChangeRequestRepository::new()),
            f.edit.clone(),
            f.bus.clone(),
        );
        uc.submit_change(submit("submitter", "A1", 500)).await.unwrap();
        let request = uc.submit_change(submit("submitter", "GONE", 600)).await.unwrap();
        uc.approve(&request.id, "reviewer").await.unwrap();

        let result = uc.apply_approved(&request.id, "reviewer").await;
        assert!(matches!(result, Err(ChangeApprovalError::ApplyFailed { .. })));

        let stored = uc.get_request(&request.id).await.unwrap();
        assert!(stored.details[0].applied);
        assert!(!stored.details[1].applied);
    }

    #[tokio::test]
    async fn test_pending_requests_oldest_first() {
        let f = fixture().await;
        let uc = ChangeApprovalUseCase::new(
            Arc::new(InMemoryChangeRequestRepository::new()),
            f.edit.clone(),
            f.bus.clone(),
        );
        let first = uc.submit_change(submit("alice", "A1", 1)).await.unwrap();
        let second = uc.submit_change(submit("bob", "A2", 2)).await.unwrap();

        let pending = uc.get_pending_requests_for_reviewer().await.unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].id, first.id);
        assert_eq!(pending[1].id, second.id);
    }

    #[tokio::test]
    async fn test_record_deployment_requires_approval() {
        let f = fixture().await;
        let uc = ChangeApprovalUseCase::new(
            Arc::new(InMemoryChangeRequestRepository::new()),
            f.edit.clone(),
            f.bus.clone(),
        );
        let request = uc.submit_change(submit("submitter", "A1", 500)).await.unwrap();
        assert!(matches!(
            uc.record_deployment(&request.id, "deploy-7", "release@example.com").await,
            Err(ChangeApprovalError::InvalidStatus { .. })
        ));

        uc.approve(&request.id, "reviewer").await.unwrap();
        let recorded = uc.record_deployment(&request.id, "deploy-7", "release@example.com").await.unwrap();
        assert_eq!(recorded.deployment_version_id.as_deref(), Some("deploy-7"));
    }

    #[tokio::test]
    async fn test_unknown_request_is_not_found() {
        let f = fixture().await;
        let mut mock = MockChangeRequestRepository::new();
        mock.expect_find_by_id().returning(|_| Ok(None));
        mock.expect_save().never();
        let uc = ChangeApprovalUseCase::new(Arc::new(mock), f.edit.clone(), f.bus.clone());

        let result = uc.approve(&Uuid::new_v4(), "reviewer").await;
        assert!(matches!(result, Err(ChangeApprovalError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_repository_error_is_internal() {
        let f = fixture().await;
        let mut mock = MockChangeRequestRepository::new();
        mock.expect_find_pending_by_creator()
            .returning(|_| Err(anyhow::anyhow!("connection refused")));
        let uc = ChangeApprovalUseCase::new(Arc::new(mock), f.edit.clone(), f.bus.clone());

        let result = uc.submit_change(submit("submitter", "A1", 500)).await;
        assert!(matches!(result, Err(ChangeApprovalError::Internal(_))));
    }
}

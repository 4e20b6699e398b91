use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::entity::change_request::ChangeRequest;
use crate::domain::repository::ChangeRequestRepository;
use crate::domain::value_object::ChangeStatus;

/// InMemoryChangeRequestRepository はデータベース未設定時に使うプロセス内リポジトリ。
/// 挿入順を作成順として保持する。
#[derive(Default)]
pub struct InMemoryChangeRequestRepository {
    requests: RwLock<Vec<ChangeRequest>>,
}

impl InMemoryChangeRequestRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChangeRequestRepository for InMemoryChangeRequestRepository {
    async fn find_by_id(&self, id: &Uuid) -> anyhow::Result<Option<ChangeRequest>> {
        let requests = self.requests.read().await;
        Ok(requests.iter().find(|r| r.id == *id).cloned())
    }

    async fn find_pending_by_creator(&self, created_by: &str) -> anyhow::Result<Option<ChangeRequest>> {
        let requests = self.requests.read().await;
        Ok(requests
            .iter()
            .find(|r| r.created_by == created_by && r.is_pending())
            .cloned())
    }

    async fn find_by_status(&self, status: ChangeStatus) -> anyhow::Result<Vec<ChangeRequest>> {
        let requests = self.requests.read().await;
        Ok(requests.iter().filter(|r| r.status == status).cloned().collect())
    }

    async fn find_by_creator(&self, created_by: &str) -> anyhow::Result<Vec<ChangeRequest>> {
        let requests = self.requests.read().await;
        Ok(requests
            .iter()
            .filter(|r| r.created_by == created_by)
            .cloned()
            .collect())
    }

    async fn save(&self, request: &ChangeRequest) -> anyhow::Result<()> {
        let mut requests = self.requests.write().await;
        match requests.iter_mut().find(|r| r.id == request.id) {
            Some(existing) => *existing = request.clone(),
            None => requests.push(request.clone()),
        }
        Ok(())
    }
}

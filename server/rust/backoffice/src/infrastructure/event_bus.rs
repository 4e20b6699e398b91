use tokio::sync::broadcast;

use crate::domain::entity::table_event::TableEvent;

/// TableEventBus はテーブル変更通知を配信する broadcast チャネル。
/// コンポーネント間の通知は必ずこのバスをコンストラクタ経由で受け取って行う。
pub struct TableEventBus {
    sender: broadcast::Sender<TableEvent>,
}

impl TableEventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// 変更通知を受け取る Receiver を購読する。
    pub fn subscribe(&self) -> broadcast::Receiver<TableEvent> {
        self.sender.subscribe()
    }

    /// イベントをすべての購読者に送信する。
    /// 受信者がいない場合のエラーはベストエフォートとして無視する。
    pub fn publish(&self, event: TableEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for TableEventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::table_event::TableOperation;

    #[tokio::test]
    async fn test_publish_to_multiple_subscribers() {
        let bus = TableEventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        let event = TableEvent::TableChanged {
            table_id: "applications".to_string(),
            operation: TableOperation::Insert,
        };
        bus.publish(event.clone());

        assert_eq!(rx1.recv().await.unwrap(), event);
        assert_eq!(rx2.recv().await.unwrap(), event);
    }

    #[test]
    fn test_publish_without_subscribers_is_ignored() {
        let bus = TableEventBus::new(4);
        bus.publish(TableEvent::StorageChanged {
            key: "table:documents".to_string(),
        });
    }
}

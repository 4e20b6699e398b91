pub mod change_approval;
pub mod edit_table;
pub mod list_rows;
pub mod notifications;
pub mod schema_registry;
pub mod table_store;
pub mod table_view;
pub mod version_tracking;
pub mod watch_table;

pub use change_approval::ChangeApprovalUseCase;
pub use edit_table::EditTableUseCase;
pub use list_rows::ListRowsUseCase;
pub use notifications::NotificationsUseCase;
pub use schema_registry::SchemaRegistry;
pub use table_store::TableStore;
pub use table_view::TableViewRegistry;
pub use version_tracking::VersionTrackingUseCase;
pub use watch_table::WatchTableUseCase;

pub mod change_request_repository;
pub mod key_value_store;
pub mod row_store;
pub mod table_version_repository;

pub use change_request_repository::ChangeRequestRepository;
pub use key_value_store::KeyValueStore;
pub use row_store::RowStore;
pub use table_version_repository::TableVersionRepository;

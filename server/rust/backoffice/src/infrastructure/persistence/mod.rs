pub mod change_request_repo_impl;
pub mod file_kv_store;
pub mod in_memory_change_request_repo;
pub mod local_row_store;
pub mod memory_kv_store;
pub mod remote_row_store;
pub mod table_version_repo_impl;

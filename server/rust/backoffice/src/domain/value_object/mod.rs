pub mod change_status;
pub mod data_type;
pub mod input_mode;
pub mod operator;
pub mod storage_backend;

pub use change_status::ChangeStatus;
pub use data_type::DataType;
pub use input_mode::InputMode;
pub use operator::{FilterOperator, FilterType};
pub use storage_backend::StorageBackend;

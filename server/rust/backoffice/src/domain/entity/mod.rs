pub mod change_request;
pub mod column_definition;
pub mod notification;
pub mod row;
pub mod sort_key;
pub mod table_binding;
pub mod table_event;
pub mod table_filter;
pub mod table_schema;
pub mod table_version;

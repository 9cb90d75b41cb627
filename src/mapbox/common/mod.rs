pub mod async_executor;
pub mod map_error;
pub mod types;

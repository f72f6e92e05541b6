pub mod config;
pub mod error;
pub mod model;
pub mod notify;
pub mod reminder_api;
pub mod routine;
pub mod schedule;
pub mod storage;
pub mod task_api;

// 模組定義
pub mod config;
pub mod domain_types;
pub mod monitor;
pub mod query;
pub mod storage;
pub mod utils;

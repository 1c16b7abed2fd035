//! Redis存儲模組
//!
//! 提供Redis連接池管理，以及建立在排序集合之上的分區鍵值儲存。

pub mod pool;
pub mod store;

pub use pool::{ConnectionPool, RedisPool, RedisPoolError};
pub use store::RedisStore;

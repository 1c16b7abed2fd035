use async_trait::async_trait;
use deadpool::managed::QueueMode;
use deadpool_redis::{
    redis::{cmd, RedisError},
    Config, Connection, CreatePoolError, Pool, PoolConfig, PoolError, Runtime, Timeouts,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::config::types::RedisConfig;
use crate::storage::store::StoreError;

/// Redis連接池錯誤
#[derive(Error, Debug)]
pub enum RedisPoolError {
    /// 連接池初始化錯誤
    #[error("Redis連接池初始化錯誤: {0}")]
    PoolInitError(String),

    /// 無法獲取連接
    #[error("無法從連接池獲取連接: {0}")]
    GetConnectionError(String),

    /// Redis原生錯誤
    #[error("Redis原生錯誤: {0}")]
    NativeRedisError(#[from] RedisError),
}

impl From<PoolError> for RedisPoolError {
    fn from(error: PoolError) -> Self {
        RedisPoolError::GetConnectionError(error.to_string())
    }
}

impl From<CreatePoolError> for RedisPoolError {
    fn from(error: CreatePoolError) -> Self {
        RedisPoolError::PoolInitError(error.to_string())
    }
}

impl From<RedisPoolError> for StoreError {
    fn from(error: RedisPoolError) -> Self {
        match error {
            RedisPoolError::NativeRedisError(e) => StoreError::Backend(e.to_string()),
            other => StoreError::Pool(other.to_string()),
        }
    }
}

/// Redis連接池接口
#[async_trait]
pub trait RedisPool: Send + Sync + 'static {
    /// 獲取連接
    async fn get_conn(&self) -> Result<Connection, RedisPoolError>;

    /// 檢查連接池健康狀態
    async fn check_health(&self) -> bool;

    /// 獲取連接池大小
    fn pool_size(&self) -> u32;
}

/// Redis連接池實現
pub struct ConnectionPool {
    pool: Pool,
    config: RedisConfig,
}

impl ConnectionPool {
    /// 創建新的Redis連接池；連接在首次取用時才建立
    pub fn new(config: RedisConfig) -> Result<Self, RedisPoolError> {
        let mut cfg = Config::from_url(&config.url);

        let timeout = Duration::from_secs(config.connection_timeout_secs);
        cfg.pool = Some(PoolConfig {
            max_size: config.pool_size as usize,
            timeouts: Timeouts {
                wait: Some(timeout),
                create: Some(timeout),
                recycle: Some(Duration::from_secs(60)),
            },
            queue_mode: QueueMode::Fifo,
        });

        let pool = cfg.create_pool(Some(Runtime::Tokio1))?;

        info!("Redis連接池初始化完成，大小: {}", config.pool_size);

        Ok(Self { pool, config })
    }

    /// 鍵名前綴
    pub fn key_prefix(&self) -> &str {
        &self.config.key_prefix
    }
}

#[async_trait]
impl RedisPool for ConnectionPool {
    async fn get_conn(&self) -> Result<Connection, RedisPoolError> {
        match self.pool.get().await {
            Ok(conn) => {
                debug!("從Redis連接池獲取連接成功");
                Ok(conn)
            }
            Err(e) => {
                error!("無法從Redis連接池獲取連接: {}", e);
                Err(e.into())
            }
        }
    }

    async fn check_health(&self) -> bool {
        let mut conn = match self.pool.get().await {
            Ok(conn) => conn,
            Err(e) => {
                error!("Redis健康檢查無法獲取連接: {}", e);
                return false;
            }
        };

        let result: Result<String, RedisError> = cmd("PING").query_async(&mut conn).await;
        match result {
            Ok(pong) => pong == "PONG",
            Err(e) => {
                error!("Redis健康檢查錯誤: {}", e);
                false
            }
        }
    }

    fn pool_size(&self) -> u32 {
        self.config.pool_size
    }
}

/// Arc<ConnectionPool> 也實現 RedisPool trait，便於共享連接池
#[async_trait]
impl RedisPool for Arc<ConnectionPool> {
    async fn get_conn(&self) -> Result<Connection, RedisPoolError> {
        (**self).get_conn().await
    }

    async fn check_health(&self) -> bool {
        (**self).check_health().await
    }

    fn pool_size(&self) -> u32 {
        (**self).pool_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_created_lazily() {
        // 建立連接池不需要可用的 Redis
        let pool = ConnectionPool::new(RedisConfig {
            url: "redis://127.0.0.1:1".to_string(),
            pool_size: 2,
            connection_timeout_secs: 1,
            key_prefix: "catalog-test".to_string(),
        })
        .unwrap();
        assert_eq!(pool.pool_size(), 2);
        assert_eq!(pool.key_prefix(), "catalog-test");
    }

    #[test]
    fn test_error_maps_to_store_error() {
        let err: StoreError = RedisPoolError::GetConnectionError("timeout".to_string()).into();
        assert!(matches!(err, StoreError::Pool(_)));
    }

    #[tokio::test]
    async fn test_health_check_against_unreachable_server() {
        let pool = ConnectionPool::new(RedisConfig {
            url: "redis://127.0.0.1:1".to_string(),
            pool_size: 1,
            connection_timeout_secs: 1,
            key_prefix: "catalog-test".to_string(),
        })
        .unwrap();
        assert!(!pool.check_health().await);
    }
}

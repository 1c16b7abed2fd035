//! 種子資料載入
//!
//! 每行一個 JSON 物件 `{"table": "...", "item": {...}}`；空行與 `//` 開頭的行略過。

use async_trait::async_trait;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::storage::memory::MemoryStore;
use crate::storage::redis::{RedisPool, RedisStore};
use crate::storage::store::{Item, StoreError};

/// 種子資料錯誤
#[derive(Error, Debug)]
pub enum SeedError {
    #[error("檔案讀取錯誤: {0}")]
    IoError(#[from] std::io::Error),

    #[error("第 {line} 行解析錯誤: {message}")]
    ParseError { line: usize, message: String },

    #[error("第 {line} 行寫入失敗: {source}")]
    WriteError { line: usize, source: StoreError },
}

/// 種子檔中的一筆記錄
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SeedRecord {
    pub table: String,
    pub item: Item,
}

/// 可寫入項目的儲存
#[async_trait]
pub trait ItemWriter: Send + Sync {
    async fn write_item(&self, table: &str, item: Item) -> Result<(), StoreError>;
}

#[async_trait]
impl ItemWriter for MemoryStore {
    async fn write_item(&self, table: &str, item: Item) -> Result<(), StoreError> {
        self.put_item(table, item)
    }
}

#[async_trait]
impl<P: RedisPool> ItemWriter for RedisStore<P> {
    async fn write_item(&self, table: &str, item: Item) -> Result<(), StoreError> {
        self.put_item(table, item).await
    }
}

/// 解析種子資料，回傳 (行號, 記錄)
pub fn parse_seed<R: BufRead>(reader: R) -> Result<Vec<(usize, SeedRecord)>, SeedError> {
    let mut records = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("//") {
            continue;
        }
        let record: SeedRecord = serde_json::from_str(trimmed).map_err(|e| SeedError::ParseError {
            line: index + 1,
            message: e.to_string(),
        })?;
        records.push((index + 1, record));
    }
    Ok(records)
}

/// 將種子資料逐筆寫入儲存，回傳寫入筆數
pub async fn load_seed<W: ItemWriter + ?Sized, R: BufRead>(writer: &W, reader: R) -> Result<usize, SeedError> {
    let records = parse_seed(reader)?;
    let total = records.len();
    for (line, record) in records {
        writer
            .write_item(&record.table, record.item)
            .await
            .map_err(|source| SeedError::WriteError { line, source })?;
    }
    Ok(total)
}

/// 從檔案載入種子資料
pub async fn load_seed_file<W: ItemWriter + ?Sized>(writer: &W, path: &Path) -> Result<usize, SeedError> {
    let file = File::open(path)?;
    let count = load_seed(writer, BufReader::new(file)).await?;
    info!("從 {} 載入 {} 筆種子資料", path.display(), count);
    Ok(count)
}

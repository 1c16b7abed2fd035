//! 行程內鍵值儲存
//!
//! 以與遠端儲存相同的語意實作 [`KeyValueStore`]：稀疏索引、評估筆數上限、
//! 過濾後置與續查鍵。用於測試、本機執行與種子資料載入。

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::storage::store::{
    attribute_text, IndexPosition, Item, KeyValueStore, QueryInput, QueryOutput, StoreError,
    TableSchema,
};

struct TableState {
    schema: TableSchema,
    items: BTreeMap<(String, String), Item>,
}

/// 記憶體儲存實現
pub struct MemoryStore {
    tables: RwLock<HashMap<String, TableState>>,
}

impl MemoryStore {
    /// 依資料表定義建立空的儲存
    pub fn new(schemas: Vec<TableSchema>) -> Self {
        let tables = schemas
            .into_iter()
            .map(|schema| {
                (
                    schema.name.clone(),
                    TableState {
                        schema,
                        items: BTreeMap::new(),
                    },
                )
            })
            .collect();
        Self {
            tables: RwLock::new(tables),
        }
    }

    /// 寫入或覆蓋一筆項目
    pub fn put_item(&self, table: &str, item: Item) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        let state = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;
        let key = state.schema.primary_key_of(&item)?;
        state.items.insert(key, item);
        Ok(())
    }

    /// 資料表中的項目數
    pub fn len(&self, table: &str) -> usize {
        self.tables.read().get(table).map_or(0, |state| state.items.len())
    }

    /// 資料表是否為空或不存在
    pub fn is_empty(&self, table: &str) -> bool {
        self.len(table) == 0
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn query(&self, input: QueryInput) -> Result<QueryOutput, StoreError> {
        let tables = self.tables.read();
        let state = tables
            .get(&input.table)
            .ok_or_else(|| StoreError::TableNotFound(input.table.clone()))?;
        let schema = &state.schema;
        let keys = schema.key_schema(input.index.as_deref())?;

        // 稀疏索引：缺少索引分區鍵的項目不在索引中
        let mut candidates: Vec<(IndexPosition, &Item)> = state
            .items
            .values()
            .filter(|item| {
                attribute_text(item.get(&keys.partition_key)).as_deref()
                    == Some(input.partition_value.as_str())
            })
            .filter_map(|item| schema.position_of(keys, item).ok().map(|pos| (pos, item)))
            .filter(|(pos, _)| input.sort.as_ref().map_or(true, |cond| cond.matches(&pos.range)))
            .collect();

        candidates.sort_by(|a, b| a.0.cmp(&b.0));
        if !input.scan_forward {
            candidates.reverse();
        }

        if let Some(start) = &input.exclusive_start_key {
            let start_pos = schema.position_of(keys, start)?;
            candidates.retain(|(pos, _)| {
                if input.scan_forward {
                    *pos > start_pos
                } else {
                    *pos < start_pos
                }
            });
        }

        let limit = input.limit.unwrap_or(usize::MAX);
        let has_more = candidates.len() > limit;
        let page: Vec<&Item> = candidates.iter().take(limit).map(|(_, item)| *item).collect();

        let last_evaluated_key = if has_more {
            page.last().map(|item| schema.last_key_of(keys, item))
        } else {
            None
        };

        let scanned_count = page.len();
        let items: Vec<Item> = page
            .into_iter()
            .filter(|item| input.filter.as_ref().map_or(true, |f| f.matches(item)))
            .cloned()
            .collect();

        debug!(
            "記憶體查詢 {}/{:?} 分區 {}: 評估 {} 筆，符合 {} 筆",
            input.table,
            input.index,
            input.partition_value,
            scanned_count,
            items.len()
        );

        Ok(QueryOutput {
            items,
            scanned_count,
            last_evaluated_key,
        })
    }
}

//! 分區鍵值儲存介面
//!
//! 儲存層只提供主鍵與次級索引上的範圍查詢：分區鍵必須相等，排序鍵可選條件，
//! 過濾條件在讀出一頁之後才套用，`limit` 限制的是「評估」的筆數而非符合的筆數。
//! 因此一頁零筆結果不代表後面沒有符合的資料，呼叫端須依 `last_evaluated_key` 繼續翻頁。

use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use thiserror::Error;

/// 儲存項目：屬性名稱到值的映射
pub type Item = serde_json::Map<String, Value>;

/// 儲存層錯誤
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// 呼叫超時
    #[error("儲存呼叫超時 ({operation}, {timeout_ms}ms)")]
    Timeout { operation: String, timeout_ms: u64 },

    /// 資料表不存在
    #[error("資料表不存在: {0}")]
    TableNotFound(String),

    /// 索引不存在
    #[error("索引不存在: {table}.{index}")]
    IndexNotFound { table: String, index: String },

    /// 鍵值缺失或格式不正確
    #[error("無效的鍵: {0}")]
    InvalidKey(String),

    /// 後端錯誤（網路、限流等）
    #[error("儲存後端錯誤: {0}")]
    Backend(String),

    /// 序列化錯誤
    #[error("儲存序列化錯誤: {0}")]
    Serialization(String),

    /// 連接池錯誤
    #[error("儲存連接池錯誤: {0}")]
    Pool(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(error: serde_json::Error) -> Self {
        StoreError::Serialization(error.to_string())
    }
}

/// 主鍵或索引的鍵結構
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySchema {
    pub partition_key: String,
    pub sort_key: Option<String>,
}

impl KeySchema {
    pub fn new(partition_key: impl Into<String>, sort_key: Option<&str>) -> Self {
        Self {
            partition_key: partition_key.into(),
            sort_key: sort_key.map(str::to_string),
        }
    }
}

/// 次級索引定義
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSchema {
    pub name: String,
    pub keys: KeySchema,
}

/// 資料表定義
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub name: String,
    pub primary: KeySchema,
    pub indexes: Vec<IndexSchema>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>, partition_key: &str, sort_key: Option<&str>) -> Self {
        Self {
            name: name.into(),
            primary: KeySchema::new(partition_key, sort_key),
            indexes: Vec::new(),
        }
    }

    pub fn with_index(mut self, name: impl Into<String>, partition_key: &str, sort_key: Option<&str>) -> Self {
        self.indexes.push(IndexSchema {
            name: name.into(),
            keys: KeySchema::new(partition_key, sort_key),
        });
        self
    }

    /// 取得查詢所用的鍵結構；`None` 表示主鍵
    pub fn key_schema(&self, index: Option<&str>) -> Result<&KeySchema, StoreError> {
        match index {
            None => Ok(&self.primary),
            Some(name) => self
                .indexes
                .iter()
                .find(|idx| idx.name == name)
                .map(|idx| &idx.keys)
                .ok_or_else(|| StoreError::IndexNotFound {
                    table: self.name.clone(),
                    index: name.to_string(),
                }),
        }
    }

    /// 項目的主鍵值 (分區鍵, 排序鍵)
    pub fn primary_key_of(&self, item: &Item) -> Result<(String, String), StoreError> {
        let pk = attribute_text(item.get(&self.primary.partition_key))
            .ok_or_else(|| StoreError::InvalidKey(format!("缺少 {}", self.primary.partition_key)))?;
        let sk = match &self.primary.sort_key {
            Some(attr) => attribute_text(item.get(attr))
                .ok_or_else(|| StoreError::InvalidKey(format!("缺少 {attr}")))?,
            None => String::new(),
        };
        Ok((pk, sk))
    }

    /// 依索引排序鍵排列時的位置鍵 (排序鍵值, 主分區鍵, 主排序鍵)
    pub fn position_of(&self, keys: &KeySchema, item: &Item) -> Result<IndexPosition, StoreError> {
        let (pk, sk) = self.primary_key_of(item)?;
        let range = keys
            .sort_key
            .as_ref()
            .and_then(|attr| attribute_text(item.get(attr)))
            .unwrap_or_default();
        Ok(IndexPosition { range, pk, sk })
    }

    /// 由最後評估的項目建立續查鍵：主鍵加上索引鍵
    pub fn last_key_of(&self, keys: &KeySchema, item: &Item) -> Item {
        let mut key = Item::new();
        let attrs = [
            Some(&self.primary.partition_key),
            self.primary.sort_key.as_ref(),
            Some(&keys.partition_key),
            keys.sort_key.as_ref(),
        ];
        for attr in attrs.into_iter().flatten() {
            if let Some(value) = item.get(attr) {
                key.insert(attr.clone(), value.clone());
            }
        }
        key
    }
}

/// 項目在索引中的排序位置
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct IndexPosition {
    pub range: String,
    pub pk: String,
    pub sk: String,
}

/// 排序鍵條件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortCondition {
    Between { low: String, high: String },
    BeginsWith(String),
    LessOrEqual(String),
    GreaterOrEqual(String),
}

impl SortCondition {
    pub fn matches(&self, value: &str) -> bool {
        match self {
            SortCondition::Between { low, high } => {
                value.cmp(low.as_str()) != Ordering::Less && value.cmp(high.as_str()) != Ordering::Greater
            }
            SortCondition::BeginsWith(prefix) => value.starts_with(prefix.as_str()),
            SortCondition::LessOrEqual(high) => value <= high.as_str(),
            SortCondition::GreaterOrEqual(low) => value >= low.as_str(),
        }
    }
}

/// 讀出一頁之後才套用的過濾條件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// 屬性等於指定值
    Equals { attribute: String, value: String },
    /// 屬性屬於任一指定值
    In { attribute: String, values: Vec<String> },
    /// 任一屬性包含任一子字串
    Contains {
        attributes: Vec<String>,
        needles: Vec<String>,
    },
    /// 全部條件成立
    And(Vec<Filter>),
}

impl Filter {
    pub fn matches(&self, item: &Item) -> bool {
        match self {
            Filter::Equals { attribute, value } => {
                attribute_text(item.get(attribute)).is_some_and(|v| &v == value)
            }
            Filter::In { attribute, values } => {
                attribute_text(item.get(attribute)).is_some_and(|v| values.contains(&v))
            }
            Filter::Contains { attributes, needles } => attributes.iter().any(|attr| {
                attribute_text(item.get(attr))
                    .is_some_and(|v| needles.iter().any(|needle| v.contains(needle.as_str())))
            }),
            Filter::And(filters) => filters.iter().all(|f| f.matches(item)),
        }
    }

    /// 合併多個可選條件；全部為空時回傳 `None`
    pub fn all(filters: Vec<Filter>) -> Option<Filter> {
        match filters.len() {
            0 => None,
            1 => filters.into_iter().next(),
            _ => Some(Filter::And(filters)),
        }
    }
}

/// 將屬性值轉為比較用文字
pub fn attribute_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// 範圍查詢請求
#[derive(Debug, Clone, PartialEq)]
pub struct QueryInput {
    pub table: String,
    pub index: Option<String>,
    pub partition_value: String,
    pub sort: Option<SortCondition>,
    pub filter: Option<Filter>,
    pub scan_forward: bool,
    pub limit: Option<usize>,
    pub exclusive_start_key: Option<Item>,
}

impl QueryInput {
    pub fn new(table: impl Into<String>, partition_value: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            index: None,
            partition_value: partition_value.into(),
            sort: None,
            filter: None,
            scan_forward: true,
            limit: None,
            exclusive_start_key: None,
        }
    }

    pub fn on_index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    pub fn with_sort(mut self, condition: SortCondition) -> Self {
        self.sort = Some(condition);
        self
    }

    pub fn with_filter(mut self, filter: Option<Filter>) -> Self {
        self.filter = filter;
        self
    }

    pub fn descending(mut self) -> Self {
        self.scan_forward = false;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn starting_after(mut self, key: Option<Item>) -> Self {
        self.exclusive_start_key = key;
        self
    }
}

/// 範圍查詢結果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOutput {
    /// 通過過濾條件的項目，依索引順序
    pub items: Vec<Item>,
    /// 本頁評估的項目數（過濾前）
    pub scanned_count: usize,
    /// 尚有後續資料時的續查鍵
    pub last_evaluated_key: Option<Item>,
}

/// 分區鍵值儲存
///
/// 實作必須可在多個並行查詢之間共享。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// 在主鍵或次級索引上執行一次分頁範圍查詢
    async fn query(&self, input: QueryInput) -> Result<QueryOutput, StoreError>;
}

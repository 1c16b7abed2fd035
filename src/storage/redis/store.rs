//! 以 Redis 實作的分區鍵值儲存
//!
//! 每筆項目以 JSON 字串存於 `{prefix}:{table}:item:{pk}\x1f{sk}`；
//! 主鍵與每個次級索引的每個分區各是一個排序集合
//! `{prefix}:{table}:idx:{index}:{partition}`，成員為 `{range}\x1f{pk}\x1f{sk}`、
//! 分數一律為 0，靠字典序範圍查詢（ZRANGEBYLEX）取得排序鍵順序。

use async_trait::async_trait;
use deadpool_redis::redis::{self, AsyncCommands};
use std::collections::HashMap;
use tracing::{debug, info};

use super::pool::RedisPool;
use crate::storage::store::{
    attribute_text, Item, KeySchema, KeyValueStore, QueryInput, QueryOutput, SortCondition,
    StoreError, TableSchema,
};

/// 成員欄位分隔字元
const FIELD_SEPARATOR: char = '\x1f';
/// 緊接在分隔字元之後的位元組，作為「排序鍵等於某值」的開上界
const AFTER_SEPARATOR: u8 = 0x20;
/// UTF-8 不會出現的位元組，作為前綴查詢的上界
const MAX_BYTE: u8 = 0xff;
const PRIMARY_INDEX: &str = "primary";

/// 字典序範圍邊界
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LexBound {
    Unbounded,
    Inclusive(Vec<u8>),
    Exclusive(Vec<u8>),
}

impl LexBound {
    fn to_arg(&self, lower: bool) -> Vec<u8> {
        match self {
            LexBound::Unbounded => if lower { b"-".to_vec() } else { b"+".to_vec() },
            LexBound::Inclusive(v) => [b"[".as_slice(), v.as_slice()].concat(),
            LexBound::Exclusive(v) => [b"(".as_slice(), v.as_slice()].concat(),
        }
    }
}

/// 排序鍵條件對應的字典序範圍 (下界, 上界)
pub(crate) fn lex_range(sort: Option<&SortCondition>) -> (LexBound, LexBound) {
    fn upper_exclusive(value: &str) -> LexBound {
        let mut bytes = value.as_bytes().to_vec();
        bytes.push(AFTER_SEPARATOR);
        LexBound::Exclusive(bytes)
    }

    match sort {
        None => (LexBound::Unbounded, LexBound::Unbounded),
        Some(SortCondition::Between { low, high }) => {
            (LexBound::Inclusive(low.as_bytes().to_vec()), upper_exclusive(high))
        }
        Some(SortCondition::BeginsWith(prefix)) => {
            let mut upper = prefix.as_bytes().to_vec();
            upper.push(MAX_BYTE);
            (LexBound::Inclusive(prefix.as_bytes().to_vec()), LexBound::Exclusive(upper))
        }
        Some(SortCondition::LessOrEqual(high)) => (LexBound::Unbounded, upper_exclusive(high)),
        Some(SortCondition::GreaterOrEqual(low)) => {
            (LexBound::Inclusive(low.as_bytes().to_vec()), LexBound::Unbounded)
        }
    }
}

/// 索引成員字串
pub(crate) fn encode_member(range: &str, pk: &str, sk: &str) -> String {
    format!("{range}{FIELD_SEPARATOR}{pk}{FIELD_SEPARATOR}{sk}")
}

/// 解析索引成員為 (排序鍵, 分區鍵, 排序鍵)
pub(crate) fn decode_member(member: &str) -> Option<(String, String, String)> {
    let mut parts = member.rsplitn(3, FIELD_SEPARATOR);
    let sk = parts.next()?;
    let pk = parts.next()?;
    let range = parts.next()?;
    Some((range.to_string(), pk.to_string(), sk.to_string()))
}

fn backend(error: redis::RedisError) -> StoreError {
    StoreError::Backend(error.to_string())
}

/// Redis 鍵值儲存
pub struct RedisStore<P: RedisPool> {
    pool: P,
    prefix: String,
    schemas: HashMap<String, TableSchema>,
}

impl<P: RedisPool> RedisStore<P> {
    /// 建立 Redis 儲存
    pub fn new(pool: P, prefix: impl Into<String>, schemas: Vec<TableSchema>) -> Self {
        let schemas = schemas.into_iter().map(|s| (s.name.clone(), s)).collect();
        Self {
            pool,
            prefix: prefix.into(),
            schemas,
        }
    }

    fn schema(&self, table: &str) -> Result<&TableSchema, StoreError> {
        self.schemas
            .get(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))
    }

    fn item_key(&self, table: &str, pk: &str, sk: &str) -> String {
        format!("{}:{}:item:{}{}{}", self.prefix, table, pk, FIELD_SEPARATOR, sk)
    }

    fn index_key(&self, table: &str, index: Option<&str>, partition: &str) -> String {
        format!(
            "{}:{}:idx:{}:{}",
            self.prefix,
            table,
            index.unwrap_or(PRIMARY_INDEX),
            partition
        )
    }

    /// 項目所屬的所有 (索引鍵, 成員)；缺少索引分區鍵的索引不包含此項目
    fn memberships(&self, schema: &TableSchema, item: &Item) -> Result<Vec<(String, String)>, StoreError> {
        let (pk, sk) = schema.primary_key_of(item)?;
        let entries = std::iter::once((None, &schema.primary))
            .chain(schema.indexes.iter().map(|idx| (Some(idx.name.as_str()), &idx.keys)));

        let mut memberships = Vec::new();
        for (index, keys) in entries {
            if let Some(partition) = attribute_text(item.get(&keys.partition_key)) {
                let range = sort_value(keys, item);
                memberships.push((
                    self.index_key(&schema.name, index, &partition),
                    encode_member(&range, &pk, &sk),
                ));
            }
        }
        Ok(memberships)
    }

    /// 寫入或覆蓋一筆項目，並維護其索引成員
    pub async fn put_item(&self, table: &str, item: Item) -> Result<(), StoreError> {
        let schema = self.schema(table)?;
        let (pk, sk) = schema.primary_key_of(&item)?;
        let item_key = self.item_key(table, &pk, &sk);
        let memberships = self.memberships(schema, &item)?;
        let body = serde_json::to_string(&item)?;

        let mut conn = self.pool.get_conn().await?;

        // 覆蓋時先移除舊項目的索引成員，避免索引鍵變更後殘留
        let previous: Option<String> = conn.get(&item_key).await.map_err(backend)?;
        let stale = match previous {
            Some(raw) => {
                let old: Item = serde_json::from_str(&raw)?;
                self.memberships(schema, &old)?
            }
            None => Vec::new(),
        };

        let mut pipe = redis::pipe();
        pipe.atomic();
        for (key, member) in &stale {
            pipe.zrem(key, member).ignore();
        }
        pipe.set(&item_key, body).ignore();
        for (key, member) in &memberships {
            pipe.zadd(key, member, 0).ignore();
        }
        let _: () = pipe.query_async(&mut conn).await.map_err(backend)?;

        debug!("Redis寫入 {} 項目 {}/{}，索引成員 {} 個", table, pk, sk, memberships.len());
        Ok(())
    }

    /// 檢查後端是否可用
    pub async fn check_health(&self) -> bool {
        let healthy = self.pool.check_health().await;
        info!("Redis儲存健康檢查: {}", if healthy { "正常" } else { "異常" });
        healthy
    }
}

fn sort_value(keys: &KeySchema, item: &Item) -> String {
    keys.sort_key
        .as_ref()
        .and_then(|attr| attribute_text(item.get(attr)))
        .unwrap_or_default()
}

#[async_trait]
impl<P: RedisPool> KeyValueStore for RedisStore<P> {
    async fn query(&self, input: QueryInput) -> Result<QueryOutput, StoreError> {
        let schema = self.schema(&input.table)?;
        let keys = schema.key_schema(input.index.as_deref())?;
        let zset = self.index_key(&schema.name, input.index.as_deref(), &input.partition_value);

        let (mut lower, mut upper) = lex_range(input.sort.as_ref());
        if let Some(start) = &input.exclusive_start_key {
            let pos = schema.position_of(keys, start)?;
            let member = encode_member(&pos.range, &pos.pk, &pos.sk).into_bytes();
            if input.scan_forward {
                lower = LexBound::Exclusive(member);
            } else {
                upper = LexBound::Exclusive(member);
            }
        }

        let mut cmd = redis::cmd(if input.scan_forward { "ZRANGEBYLEX" } else { "ZREVRANGEBYLEX" });
        cmd.arg(&zset);
        if input.scan_forward {
            cmd.arg(lower.to_arg(true)).arg(upper.to_arg(false));
        } else {
            cmd.arg(upper.to_arg(false)).arg(lower.to_arg(true));
        }
        if let Some(limit) = input.limit {
            // 多取一筆以判斷是否還有後續
            cmd.arg("LIMIT").arg(0).arg(limit + 1);
        }

        let mut conn = self.pool.get_conn().await?;
        let mut members: Vec<String> = cmd.query_async(&mut conn).await.map_err(backend)?;

        let limit = input.limit.unwrap_or(usize::MAX);
        let has_more = members.len() > limit;
        members.truncate(limit);

        let item_keys: Vec<String> = members
            .iter()
            .filter_map(|m| decode_member(m))
            .map(|(_, pk, sk)| self.item_key(&schema.name, &pk, &sk))
            .collect();

        let bodies: Vec<Option<String>> = if item_keys.is_empty() {
            Vec::new()
        } else {
            redis::cmd("MGET")
                .arg(&item_keys)
                .query_async(&mut conn)
                .await
                .map_err(backend)?
        };

        let mut page = Vec::with_capacity(bodies.len());
        for body in bodies.into_iter().flatten() {
            page.push(serde_json::from_str::<Item>(&body)?);
        }

        let last_evaluated_key = if has_more {
            page.last().map(|item| schema.last_key_of(keys, item))
        } else {
            None
        };

        let scanned_count = page.len();
        let items: Vec<Item> = page
            .into_iter()
            .filter(|item| input.filter.as_ref().map_or(true, |f| f.matches(item)))
            .collect();

        debug!(
            "Redis查詢 {} 分區 {}: 評估 {} 筆，符合 {} 筆",
            zset,
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

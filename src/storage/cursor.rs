//! 分頁游標編解碼
//!
//! 游標是儲存層續查鍵的 JSON 序列化再以 base64 編碼，對呼叫端不透明。

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::storage::store::Item;

/// 游標解碼錯誤
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CursorError {
    #[error("游標不是合法的 base64: {0}")]
    Encoding(String),

    #[error("游標內容不是合法的鍵物件: {0}")]
    Payload(String),
}

/// 不透明的續查游標
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    /// 編碼儲存層續查鍵
    pub fn encode(key: &Item) -> Self {
        // Map 序列化不會失敗
        let json = serde_json::to_vec(key).unwrap_or_default();
        Self(BASE64.encode(json))
    }

    /// 解碼為儲存層續查鍵
    pub fn decode(&self) -> Result<Item, CursorError> {
        let bytes = BASE64
            .decode(self.0.trim())
            .map_err(|e| CursorError::Encoding(e.to_string()))?;
        serde_json::from_slice::<Item>(&bytes).map_err(|e| CursorError::Payload(e.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Cursor {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Cursor {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_round_trip_preserves_key() {
        let key = json!({
            "pk": "INSTRUMENT#SH600036",
            "sk": "PROFILE",
            "marketStatus": "CN#ACTIVE",
            "entityScope": "CATALOG#SH600036"
        })
        .as_object()
        .cloned()
        .unwrap();

        let cursor = Cursor::encode(&key);
        assert_eq!(cursor.decode().unwrap(), key);
        assert_eq!(Cursor::encode(&cursor.decode().unwrap()), cursor);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(Cursor::from("%%%").decode(), Err(CursorError::Encoding(_))));

        let not_object = Cursor::from(BASE64.encode(b"[1,2]"));
        assert!(matches!(not_object.decode(), Err(CursorError::Payload(_))));
    }
}

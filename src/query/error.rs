use thiserror::Error;

use crate::storage::cursor::CursorError;
use crate::storage::store::StoreError;

/// 查詢錯誤
///
/// 編排器只會回傳驗證類錯誤；儲存錯誤在各階段內被吸收。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// 呼叫參數不合法
    #[error("參數錯誤: {0}")]
    Validation(String),

    /// 游標無法解碼
    #[error("無效的游標: {0}")]
    InvalidCursor(#[from] CursorError),

    /// 儲存層錯誤
    #[error("儲存錯誤: {0}")]
    Store(#[from] StoreError),
}

impl QueryError {
    pub fn validation(message: impl Into<String>) -> Self {
        QueryError::Validation(message.into())
    }

    /// 是否為呼叫端造成的錯誤
    pub fn is_client_error(&self) -> bool {
        matches!(self, QueryError::Validation(_) | QueryError::InvalidCursor(_))
    }
}

pub type QueryResult<T> = Result<T, QueryError>;

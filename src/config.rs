/// 配置管理模組
///
/// 本模組負責加載、驗證和管理系統配置。
/// 內建預設值之上疊加環境配置文件與 `CATALOG__` 環境變數。
pub mod loader;
pub mod manager;
pub mod types;
pub mod validation;

// 重新導出常用組件
pub use loader::{ConfigExt, ConfigLoader, Environment};
pub use manager::init_config;
pub use types::*;
pub use validation::{validate_config, ValidationError, ValidationUtils, Validator};

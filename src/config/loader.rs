use config::{Config, ConfigError, Environment as ConfigEnvironment, File};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

use crate::config::types::ApplicationConfig;

/// 選擇環境的環境變數
pub const ENV_VAR: &str = "CATALOG_ENV";
/// 配置目錄的環境變數
pub const CONFIG_DIR_VAR: &str = "CONFIG_DIR";
/// 覆寫配置的環境變數前綴，例如 `CATALOG__QUERY__FAN_OUT=4`
pub const ENV_PREFIX: &str = "CATALOG";

/// 環境類型枚舉
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// 從環境變數取得當前環境設定
    pub fn from_env() -> Self {
        match env::var(ENV_VAR)
            .unwrap_or_else(|_| "development".into())
            .to_lowercase()
            .as_str()
        {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }

    /// 轉換為配置文件名
    pub fn as_filename(&self) -> &'static str {
        match self {
            Environment::Development => "development.toml",
            Environment::Production => "production.toml",
        }
    }
}

/// 配置加載器
///
/// 來源優先順序由低到高：內建預設值、環境配置文件（可不存在）、`CATALOG__` 環境變數。
pub struct ConfigLoader;

impl ConfigLoader {
    /// 配置目錄，預設為工作目錄下的 `config`
    pub fn config_dir() -> PathBuf {
        PathBuf::from(env::var(CONFIG_DIR_VAR).unwrap_or_else(|_| "config".into()))
    }

    /// 從指定目錄載入指定環境的配置
    pub fn load_from(dir: &Path, env: Environment) -> Result<Config, ConfigError> {
        let config_path = dir.join(env.as_filename());

        Config::builder()
            .add_source(Config::try_from(&ApplicationConfig::default())?)
            .add_source(File::from(config_path).required(false))
            .add_source(
                ConfigEnvironment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("query.search_partitions"),
            )
            .build()
    }

    /// 載入指定環境的配置
    pub fn load(env: Environment) -> Result<Config, ConfigError> {
        Self::load_from(&Self::config_dir(), env)
    }

    /// 載入當前環境的配置
    pub fn load_current() -> Result<Config, ConfigError> {
        Self::load(Environment::from_env())
    }
}

/// 配置獲取輔助特性
pub trait ConfigExt {
    /// 從配置中獲取並反序列化指定部分
    fn get_section<'a, T: Deserialize<'a>>(&'a self, section: &str) -> Result<T, ConfigError>;
}

impl ConfigExt for Config {
    fn get_section<'a, T: Deserialize<'a>>(&'a self, section: &str) -> Result<T, ConfigError> {
        self.get(section)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::QueryConfig;
    use serial_test::serial;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    #[serial]
    fn test_environment_from_env() {
        env::remove_var(ENV_VAR);
        assert_eq!(Environment::from_env(), Environment::Development);

        env::set_var(ENV_VAR, "PRODUCTION");
        assert_eq!(Environment::from_env(), Environment::Production);

        env::set_var(ENV_VAR, "staging");
        assert_eq!(Environment::from_env(), Environment::Development);

        env::remove_var(ENV_VAR);
    }

    #[test]
    #[serial]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let config = ConfigLoader::load_from(dir.path(), Environment::Production).unwrap();
        let query: QueryConfig = config.get_section("query").unwrap();
        assert_eq!(query.search_limit, 20);
        assert_eq!(query.search_partitions, vec!["CN", "GLOBAL", "INDEX", "FUND"]);
    }

    #[test]
    #[serial]
    fn test_file_and_env_layers() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("development.toml"),
            "[query]\nfan_out = 4\ndefault_days = 30\n",
        )
        .unwrap();
        env::set_var("CATALOG__QUERY__DEFAULT_DAYS", "60");

        let config = ConfigLoader::load_from(dir.path(), Environment::Development).unwrap();
        let query: QueryConfig = config.get_section("query").unwrap();
        env::remove_var("CATALOG__QUERY__DEFAULT_DAYS");

        assert_eq!(query.fan_out, 4);
        assert_eq!(query.default_days, 60);
        assert_eq!(query.list_default_limit, 20);
    }
}

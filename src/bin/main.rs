use anyhow::{anyhow, Result};
use catalog_query::config::{self, LogConfig, RedisConfig, StoreConfig};
use catalog_query::domain_types::catalog::AssetType;
use catalog_query::domain_types::timeseries::AssetClass;
use catalog_query::query::engine::table_schemas;
use catalog_query::query::{parse_symbols, CatalogQueryEngine, ListRequest, TimeseriesRequest};
use catalog_query::storage::redis::ConnectionPool;
use catalog_query::storage::{load_seed_file, Cursor, KeyValueStore, MemoryStore, RedisStore};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// 商品目錄與價格序列查詢工具
#[derive(Parser, Debug)]
#[command(name = "catalog-query", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 依代碼或名稱搜尋目錄
    Search {
        #[arg(long = "q")]
        query: String,
        #[arg(long)]
        market: Option<String>,
    },
    /// 列出市場內的商品並附帶最新報價
    List {
        #[arg(long)]
        market: String,
        #[arg(long)]
        asset_type: Option<AssetType>,
        #[arg(long)]
        q: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        cursor: Option<String>,
    },
    /// 多代碼報價快照，代碼以 `|` 分隔
    Snapshot {
        #[arg(long)]
        symbols: String,
    },
    /// 價格序列區間
    Timeseries {
        #[arg(long)]
        code: String,
        #[arg(long)]
        asset: Option<AssetClass>,
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
        #[arg(long)]
        days: Option<u32>,
    },
    /// 單一代碼查找
    Company {
        #[arg(long)]
        code: String,
    },
    /// 將 NDJSON 種子檔寫入目前的儲存後端
    Load {
        #[arg(long)]
        file: PathBuf,
    },
}

/// 已建立的儲存後端
enum Backend {
    Memory(Arc<MemoryStore>),
    Redis(Arc<RedisStore<ConnectionPool>>),
}

impl Backend {
    fn store(&self) -> Arc<dyn KeyValueStore> {
        match self {
            Backend::Memory(store) => store.clone() as Arc<dyn KeyValueStore>,
            Backend::Redis(store) => store.clone() as Arc<dyn KeyValueStore>,
        }
    }

    async fn load(&self, path: &Path) -> Result<usize> {
        let count = match self {
            Backend::Memory(store) => load_seed_file(store.as_ref(), path).await?,
            Backend::Redis(store) => load_seed_file(store.as_ref(), path).await?,
        };
        Ok(count)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 初始化配置
    let app_config = config::init_config()?;

    // 初始化日誌系統
    init_logging(&app_config.log)?;

    let backend = open_backend(&app_config.store, &app_config.redis).await?;

    if let Command::Load { file } = &cli.command {
        let count = backend.load(file).await?;
        return print_json(&json!({ "loaded": count }));
    }

    let engine = CatalogQueryEngine::new(backend.store(), &app_config.store, &app_config.query);

    match cli.command {
        Command::Search { query, market } => {
            print_json(&engine.search(&query, market.as_deref()).await?)
        }
        Command::List {
            market,
            asset_type,
            q,
            limit,
            cursor,
        } => {
            let request = ListRequest {
                market,
                asset_type,
                q,
                limit,
                cursor: cursor.map(Cursor::from),
            };
            print_json(&engine.list(request).await?)
        }
        Command::Snapshot { symbols } => {
            print_json(&engine.snapshot(&parse_symbols(&symbols)).await?)
        }
        Command::Timeseries {
            code,
            asset,
            from,
            to,
            days,
        } => {
            let request = TimeseriesRequest {
                code,
                asset,
                from,
                to,
                days,
            };
            print_json(&engine.timeseries(request).await?)
        }
        Command::Company { code } => match engine.company(&code).await {
            Some(record) => print_json(&json!({ "found": true, "item": record })),
            None => print_json(&json!({ "found": false })),
        },
        Command::Load { .. } => Ok(()),
    }
}

/// 依配置建立儲存後端；記憶體後端會載入種子檔
async fn open_backend(store_config: &StoreConfig, redis_config: &RedisConfig) -> Result<Backend> {
    let schemas = table_schemas(store_config);
    match store_config.backend.as_str() {
        "memory" => {
            let store = Arc::new(MemoryStore::new(schemas));
            if let Some(seed) = &store_config.seed_file {
                load_seed_file(store.as_ref(), Path::new(seed)).await?;
            } else {
                warn!("記憶體後端未設定種子檔，所有查詢將回傳空結果");
            }
            Ok(Backend::Memory(store))
        }
        "redis" => {
            let pool = ConnectionPool::new(redis_config.clone())?;
            let prefix = pool.key_prefix().to_string();
            let store = RedisStore::new(pool, prefix, schemas);
            if !store.check_health().await {
                warn!("Redis 目前無法連線，查詢將在儲存呼叫時失敗");
            }
            info!("使用 Redis 儲存後端: {}", redis_config.url);
            Ok(Backend::Redis(Arc::new(store)))
        }
        other => Err(anyhow!("不支援的儲存後端: {}", other)),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// 初始化日誌系統，輸出到 stderr 以免干擾查詢結果
fn init_logging(log_config: &LogConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_config.level));

    let result = match log_config.format.as_str() {
        "json" => tracing::subscriber::set_global_default(
            FmtSubscriber::builder()
                .json()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .finish(),
        ),
        _ => tracing::subscriber::set_global_default(
            FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .finish(),
        ),
    };
    result.map_err(|e| anyhow!("設置日誌系統失敗: {}", e))?;

    info!("日誌系統初始化完成");
    Ok(())
}

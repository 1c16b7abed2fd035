// utils.rs - 公共工具模組

pub mod time_utils;

pub use time_utils::{days_in_window, format_date, parse_date, resolve_window, today_utc};

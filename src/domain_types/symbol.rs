//! 代碼解析器
//!
//! 將使用者輸入的原始查詢字串分類為「代碼型」或「名稱型」，並產生標準代碼候選。
//! 純函數、無 I/O，可直接單元測試。

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// 上海證券交易所代碼前綴
pub const SHANGHAI_PREFIX: &str = "SH";
/// 深圳證券交易所代碼前綴
pub const SHENZHEN_PREFIX: &str = "SZ";

/// 裸代碼至少需要的數字位數
const MIN_CODE_DIGITS: usize = 3;

// 已帶交易所前綴的代碼，例如 SH600988、HK00700
static PREFIXED_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{1,4}[0-9]{3,}$").expect("合法的正則表達式"));

/// 代碼候選集合
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolCandidateSet {
    /// 去除空白並轉為大寫後的查詢字串
    pub normalized: String,
    /// 依優先順序排列、已去重的標準代碼候選
    pub symbol_candidates: Vec<String>,
    /// 至少產生一個候選時為 true
    pub is_symbol_like: bool,
}

/// 正規化查詢字串：去除前後空白並轉為大寫
pub fn normalize(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// 分析原始查詢字串
pub fn analyze(raw: &str) -> SymbolCandidateSet {
    let normalized = normalize(raw);
    let mut candidates: Vec<String> = Vec::new();
    let mut push = |candidate: String| {
        if !candidate.is_empty() && !candidates.contains(&candidate) {
            candidates.push(candidate);
        }
    };

    // 1. "交易所:代碼" 或 "交易所#代碼" 簡寫
    if let Some(joined) = join_delimited(&normalized) {
        push(joined);
    }

    // 2. 已帶交易所前綴
    let cleaned: String = normalized
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ':' || *c == '#')
        .collect();
    if PREFIXED_CODE.is_match(&cleaned) {
        push(cleaned);
    }

    // 3. 裸數字代碼與交易所推斷
    let digits: String = normalized.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() >= MIN_CODE_DIGITS {
        push(digits.clone());
        if let Some(prefix) = exchange_prefix_for(&digits) {
            push(format!("{prefix}{digits}"));
        }
    }

    let is_symbol_like = !candidates.is_empty();
    SymbolCandidateSet {
        normalized,
        symbol_candidates: candidates,
        is_symbol_like,
    }
}

/// 依首位數字推斷 A 股交易所前綴
pub fn exchange_prefix_for(digits: &str) -> Option<&'static str> {
    match digits.chars().next()? {
        '6' => Some(SHANGHAI_PREFIX),
        '0' | '3' => Some(SHENZHEN_PREFIX),
        _ => None,
    }
}

fn join_delimited(normalized: &str) -> Option<String> {
    let delimiters = normalized.chars().filter(|c| *c == ':' || *c == '#').count();
    if delimiters != 1 {
        return None;
    }

    let (left, right) = normalized.split_once(|c| c == ':' || c == '#')?;
    let (left, right) = (left.trim(), right.trim());
    if left.is_empty() || right.is_empty() {
        return None;
    }
    Some(format!("{left}{right}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[test]
    fn test_bare_shanghai_code() {
        let result = analyze("600988");
        assert!(result.is_symbol_like);
        assert_eq!(result.symbol_candidates, vec!["600988", "SH600988"]);
    }

    #[test]
    fn test_prefixed_lowercase_code() {
        let result = analyze("sh600988");
        assert!(result.is_symbol_like);
        assert_eq!(result.normalized, "SH600988");
        assert!(result.symbol_candidates.contains(&"SH600988".to_string()));
        assert_eq!(result.symbol_candidates[0], "SH600988");
    }

    #[test]
    fn test_pure_name_query() {
        let result = analyze("中信证券");
        assert!(!result.is_symbol_like);
        assert!(result.symbol_candidates.is_empty());
    }

    #[rstest]
    #[case("sz:000001", "SZ000001")]
    #[case(" SH#600030 ", "SH600030")]
    #[case("hk:700", "HK700")]
    fn test_delimited_shorthand_is_first_candidate(#[case] raw: &str, #[case] expected: &str) {
        let result = analyze(raw);
        assert_eq!(result.symbol_candidates[0], expected);
    }

    #[rstest]
    #[case("SH:600:1", vec!["6001", "SH6001"])]
    #[case(":600988", vec!["600988", "SH600988"])]
    #[case("SH#", vec![])]
    fn test_malformed_delimiters_skip_join(#[case] raw: &str, #[case] expected: Vec<&str>) {
        let result = analyze(raw);
        assert_eq!(result.symbol_candidates, expected);
        assert_eq!(result.is_symbol_like, !expected.is_empty());
    }

    #[rstest]
    #[case("000001", Some("SZ000001"))]
    #[case("300750", Some("SZ300750"))]
    #[case("601318", Some("SH601318"))]
    #[case("830799", None)]
    #[case("12", None)]
    fn test_exchange_inference(#[case] raw: &str, #[case] prefixed: Option<&str>) {
        let result = analyze(raw);
        match prefixed {
            Some(expected) => assert!(result.symbol_candidates.contains(&expected.to_string())),
            None => assert!(result
                .symbol_candidates
                .iter()
                .all(|c| !c.starts_with(SHANGHAI_PREFIX) && !c.starts_with(SHENZHEN_PREFIX))),
        }
    }

    #[test]
    fn test_mixed_name_with_code() {
        let result = analyze("招商银行 600036");
        assert!(result.is_symbol_like);
        assert_eq!(result.symbol_candidates, vec!["600036", "SH600036"]);
    }

    proptest! {
        #[test]
        fn prop_normalization_is_fixed_point(raw in "[ a-zA-Z0-9:#]{0,16}") {
            let first = analyze(&raw);
            let second = analyze(&first.normalized);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_leading_digit_selects_exchange(lead in 0u8..10, rest in "[0-9]{2,8}") {
            let code = format!("{lead}{rest}");
            let result = analyze(&code);
            let has_sh = result.symbol_candidates.contains(&format!("SH{code}"));
            let has_sz = result.symbol_candidates.contains(&format!("SZ{code}"));
            match lead {
                6 => prop_assert!(has_sh && !has_sz),
                0 | 3 => prop_assert!(has_sz && !has_sh),
                _ => prop_assert!(!has_sh && !has_sz),
            }
        }
    }
}

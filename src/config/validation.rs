use thiserror::Error;

/// 配置驗證錯誤
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("缺少必要配置項: {0}")]
    MissingField(String),

    #[error("無效的配置值: {0}")]
    InvalidValue(String),

    #[error("配置範圍錯誤: {field} 的值 {value} 不在範圍 {min}..={max} 內")]
    RangeError {
        field: String,
        value: String,
        min: String,
        max: String,
    },

    #[error("依賴錯誤: {dependent} 需要 {dependency}")]
    DependencyError { dependent: String, dependency: String },
}

/// 配置驗證器trait
pub trait Validator {
    /// 驗證配置
    fn validate(&self) -> Result<(), ValidationError>;
}

/// 驗證配置區段
pub fn validate_config<T: Validator>(config: &T) -> Result<(), ValidationError> {
    config.validate()
}

/// 驗證工具函數
pub struct ValidationUtils;

impl ValidationUtils {
    /// 值必須落在閉區間內
    pub fn in_range<T>(value: T, min: T, max: T, field_name: &str) -> Result<(), ValidationError>
    where
        T: PartialOrd + ToString,
    {
        if value < min || value > max {
            return Err(ValidationError::RangeError {
                field: field_name.to_string(),
                value: value.to_string(),
                min: min.to_string(),
                max: max.to_string(),
            });
        }
        Ok(())
    }

    /// 值必須是候選值之一
    pub fn one_of<T>(value: &T, options: &[T], field_name: &str) -> Result<(), ValidationError>
    where
        T: PartialEq + ToString,
    {
        if options.contains(value) {
            return Ok(());
        }
        let allowed: Vec<String> = options.iter().map(ToString::to_string).collect();
        Err(ValidationError::InvalidValue(format!(
            "{} 的值 {} 不是有效選項: {}",
            field_name,
            value.to_string(),
            allowed.join(", ")
        )))
    }

    /// 字串欄位不可為空白
    pub fn not_empty(value: &str, field_name: &str) -> Result<(), ValidationError> {
        if value.trim().is_empty() {
            return Err(ValidationError::MissingField(field_name.to_string()));
        }
        Ok(())
    }

    /// 設定了 `dependent` 時 `dependency` 必須成立
    pub fn check_dependency(
        has_dependent: bool,
        has_dependency: bool,
        dependent_name: &str,
        dependency_name: &str,
    ) -> Result<(), ValidationError> {
        if has_dependent && !has_dependency {
            return Err(ValidationError::DependencyError {
                dependent: dependent_name.to_string(),
                dependency: dependency_name.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_in_range_is_inclusive() {
        assert!(ValidationUtils::in_range(1, 1, 50, "query.search_limit").is_ok());
        assert!(ValidationUtils::in_range(50, 1, 50, "query.search_limit").is_ok());

        let err = ValidationUtils::in_range(51, 1, 50, "query.search_limit").unwrap_err();
        assert_eq!(
            err,
            ValidationError::RangeError {
                field: "query.search_limit".to_string(),
                value: "51".to_string(),
                min: "1".to_string(),
                max: "50".to_string(),
            }
        );
    }

    #[test]
    fn test_one_of_lists_options() {
        assert!(ValidationUtils::one_of(&"json", &["pretty", "json"], "log.format").is_ok());

        let err = ValidationUtils::one_of(&"xml", &["pretty", "json"], "log.format").unwrap_err();
        assert_matches!(err, ValidationError::InvalidValue(msg) if msg.contains("pretty, json"));
    }

    #[test]
    fn test_not_empty() {
        assert!(ValidationUtils::not_empty("catalog", "store.catalog.table").is_ok());
        assert!(ValidationUtils::not_empty("   ", "store.catalog.table").is_err());
    }

    #[test]
    fn test_check_dependency() {
        assert!(ValidationUtils::check_dependency(false, false, "a", "b").is_ok());
        assert!(ValidationUtils::check_dependency(true, true, "a", "b").is_ok());
        assert_matches!(
            ValidationUtils::check_dependency(true, false, "a", "b"),
            Err(ValidationError::DependencyError { .. })
        );
    }
}

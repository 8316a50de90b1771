use crate::utils::error::{EtlError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "config.json";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_SCHEME: &str = "http";
pub const DEFAULT_MODEL: &str = "THUDM/GLM-4-9B-0414";

/// 配置檔中的模型服務預設值，每個欄位都可省略
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub scheme: Option<String>,
    pub model: Option<String>,
}

impl FileConfig {
    /// 從檔案載入配置，`.toml` 以 TOML 解析，其餘以 JSON 解析
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| EtlError::ConfigError {
            message: format!("cannot read config file {}: {}", path.display(), e),
        })?;

        let is_toml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        if is_toml {
            Self::from_toml_str(&content)
        } else {
            Self::from_json_str(&content)
        }
    }

    /// 工作目錄下有 `config.json` 就載入，沒有就全部使用內建預設值
    pub fn load_default() -> Result<Self> {
        let path = Path::new(DEFAULT_CONFIG_FILE);
        if path.exists() {
            tracing::debug!("Loading defaults from {}", DEFAULT_CONFIG_FILE);
            Self::from_file(path)
        } else {
            tracing::debug!("{} not found, using built-in defaults", DEFAULT_CONFIG_FILE);
            Ok(Self::default())
        }
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let processed_content = substitute_env_vars(content)?;

        serde_json::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "json_parsing".to_string(),
            message: format!("JSON parsing error: {}", e),
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    pub fn host_or_default(&self) -> &str {
        self.host.as_deref().unwrap_or(DEFAULT_HOST)
    }

    pub fn port_or_default(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    pub fn scheme_or_default(&self) -> &str {
        self.scheme.as_deref().unwrap_or(DEFAULT_SCHEME)
    }

    pub fn model_or_default(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }
}

/// 替換環境變數 (例如 ${MODEL_HOST})，找不到的變數保持原樣
fn substitute_env_vars(content: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| EtlError::ConfigError {
        message: format!("invalid substitution pattern: {}", e),
    })?;

    let result = re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
    });

    Ok(result.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partial_json_config_keeps_defaults() {
        let config = FileConfig::from_json_str(r#"{"host": "10.0.0.2", "port": 9000}"#).unwrap();

        assert_eq!(config.host_or_default(), "10.0.0.2");
        assert_eq!(config.port_or_default(), 9000);
        assert_eq!(config.scheme_or_default(), "http");
        assert_eq!(config.model_or_default(), DEFAULT_MODEL);
    }

    #[test]
    fn test_invalid_json_is_validation_error() {
        let err = FileConfig::from_json_str("{host: }").unwrap_err();
        assert!(matches!(err, EtlError::ConfigValidationError { .. }));
    }

    #[test]
    fn test_env_substitution() {
        std::env::set_var("REVIEW_ETL_TEST_MODEL", "glm-test");
        let config = FileConfig::from_json_str(r#"{"model": "${REVIEW_ETL_TEST_MODEL}"}"#).unwrap();
        assert_eq!(config.model.as_deref(), Some("glm-test"));

        let untouched =
            FileConfig::from_json_str(r#"{"model": "${REVIEW_ETL_SURELY_UNSET_VAR}"}"#).unwrap();
        assert_eq!(untouched.model.as_deref(), Some("${REVIEW_ETL_SURELY_UNSET_VAR}"));
    }

    #[test]
    fn test_from_file_dispatches_on_extension() {
        let temp_dir = TempDir::new().unwrap();

        let toml_path = temp_dir.path().join("service.toml");
        std::fs::write(&toml_path, "scheme = \"https\"\nport = 443\n").unwrap();
        let from_toml = FileConfig::from_file(&toml_path).unwrap();
        assert_eq!(from_toml.scheme.as_deref(), Some("https"));
        assert_eq!(from_toml.port, Some(443));

        let json_path = temp_dir.path().join("config.json");
        std::fs::write(&json_path, r#"{"scheme": "https"}"#).unwrap();
        let from_json = FileConfig::from_file(&json_path).unwrap();
        assert_eq!(from_json.scheme.as_deref(), Some("https"));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = FileConfig::from_file("/nonexistent/review-etl/config.json").unwrap_err();
        assert!(matches!(err, EtlError::ConfigError { .. }));
    }
}

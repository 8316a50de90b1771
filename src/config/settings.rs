use crate::config::file_config::{DEFAULT_HOST, DEFAULT_MODEL, DEFAULT_PORT, DEFAULT_SCHEME};
use crate::core::ConfigProvider;
use crate::domain::model::{ClassifyMode, RequestFormat, RetryPolicy};
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_file_extension, validate_non_empty_string, validate_path, validate_positive_number,
    validate_range, validate_url, Validate,
};
use std::fmt;
use std::time::Duration;

pub const INPUT_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods", "csv"];
pub const OUTPUT_EXTENSIONS: &[&str] = &["xlsx", "csv"];
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 60;

/// 命令列與配置檔合併後的最終設定
#[derive(Clone)]
pub struct Settings {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub input_file: String,
    pub output_file: String,
    pub review_column: usize,
    pub sheet: Option<String>,
    pub mode: ClassifyMode,
    pub request_format: RequestFormat,
    pub retry: RetryPolicy,
    pub request_timeout: Duration,
    pub batch_size: Option<usize>,
    pub checkpoint_file: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: format!("{}://{}:{}", DEFAULT_SCHEME, DEFAULT_HOST, DEFAULT_PORT),
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            input_file: "input.xlsx".to_string(),
            output_file: "output.xlsx".to_string(),
            review_column: 0,
            sheet: None,
            mode: ClassifyMode::Full,
            request_format: RequestFormat::Json,
            retry: RetryPolicy::default(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
            batch_size: None,
            checkpoint_file: None,
        }
    }
}

// 金鑰不進日誌
impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("input_file", &self.input_file)
            .field("output_file", &self.output_file)
            .field("review_column", &self.review_column)
            .field("sheet", &self.sheet)
            .field("mode", &self.mode)
            .field("request_format", &self.request_format)
            .field("retry", &self.retry)
            .field("request_timeout", &self.request_timeout)
            .field("batch_size", &self.batch_size)
            .field("checkpoint_file", &self.checkpoint_file)
            .finish()
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        validate_url("base_url", &self.base_url)?;
        validate_non_empty_string("key", &self.api_key)?;
        validate_non_empty_string("model", &self.model)?;

        validate_path("input", &self.input_file)?;
        validate_file_extension("input", &self.input_file, INPUT_EXTENSIONS)?;
        validate_path("output", &self.output_file)?;
        validate_file_extension("output", &self.output_file, OUTPUT_EXTENSIONS)?;

        validate_positive_number("max_attempts", self.retry.max_attempts as usize, 1)?;
        validate_range("timeout", self.request_timeout.as_secs(), 1, 3600)?;

        if let Some(batch_size) = self.batch_size {
            validate_positive_number("batch_size", batch_size, 1)?;
        }
        if let Some(checkpoint) = &self.checkpoint_file {
            validate_path("checkpoint", checkpoint)?;
        }

        Ok(())
    }
}

impl ConfigProvider for Settings {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn api_key(&self) -> &str {
        &self.api_key
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn input_file(&self) -> &str {
        &self.input_file
    }

    fn output_file(&self) -> &str {
        &self.output_file
    }

    fn review_column(&self) -> usize {
        self.review_column
    }

    fn sheet(&self) -> Option<&str> {
        self.sheet.as_deref()
    }

    fn mode(&self) -> ClassifyMode {
        self.mode
    }

    fn request_format(&self) -> RequestFormat {
        self.request_format
    }

    fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    fn batch_size(&self) -> Option<usize> {
        self.batch_size
    }

    fn checkpoint_file(&self) -> Option<&str> {
        self.checkpoint_file.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::EtlError;

    fn valid_settings() -> Settings {
        Settings {
            api_key: "sk-test".to_string(),
            ..Settings::default()
        }
    }

    #[test]
    fn test_defaults_are_valid_once_key_is_set() {
        assert!(valid_settings().validate().is_ok());
        assert!(Settings::default().validate().is_err());
    }

    #[test]
    fn test_rejects_zero_attempts_and_bad_output() {
        let mut settings = valid_settings();
        settings.retry.max_attempts = 0;
        assert!(settings.validate().is_err());

        let settings = Settings {
            output_file: "result.txt".to_string(),
            ..valid_settings()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_batch_size() {
        let settings = Settings {
            mode: ClassifyMode::Batch,
            batch_size: Some(0),
            ..valid_settings()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_timeout_bounds() {
        for secs in [1, 3600] {
            let settings = Settings {
                request_timeout: Duration::from_secs(secs),
                ..valid_settings()
            };
            assert!(settings.validate().is_ok(), "{secs}s should be accepted");
        }
        for secs in [0, 3601] {
            let settings = Settings {
                request_timeout: Duration::from_secs(secs),
                ..valid_settings()
            };
            assert!(matches!(
                settings.validate(),
                Err(EtlError::InvalidConfigValueError { ref field, .. }) if field == "timeout"
            ));
        }
    }

    #[test]
    fn test_debug_redacts_key() {
        let rendered = format!("{:?}", valid_settings());
        assert!(!rendered.contains("sk-test"));
        assert!(rendered.contains("<redacted>"));
    }
}

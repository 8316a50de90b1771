use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Model service rejected the API key (HTTP 401)")]
    Unauthorized,

    #[error("Model service returned HTTP {status}: {message}")]
    ModelServiceError { status: u16, message: String },

    #[error("Invalid model response: {message}")]
    InvalidResponse { message: String },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Spreadsheet read error: {0}")]
    SpreadsheetReadError(#[from] calamine::Error),

    #[error("Spreadsheet write error: {0}")]
    SpreadsheetWriteError(#[from] rust_xlsxwriter::XlsxError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("No reviews found in {path}")]
    EmptyInput { path: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Authentication,
    Model,
    Configuration,
    Data,
    Storage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn invalid_response(message: impl Into<String>) -> Self {
        EtlError::InvalidResponse {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::ApiError(_) => ErrorCategory::Network,
            EtlError::Unauthorized => ErrorCategory::Authentication,
            EtlError::ModelServiceError { .. } | EtlError::InvalidResponse { .. } => {
                ErrorCategory::Model
            }
            EtlError::ConfigError { .. }
            | EtlError::MissingConfigError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::ConfigValidationError { .. } => ErrorCategory::Configuration,
            EtlError::CsvError(_)
            | EtlError::SpreadsheetReadError(_)
            | EtlError::SerializationError(_)
            | EtlError::ProcessingError { .. }
            | EtlError::EmptyInput { .. } => ErrorCategory::Data,
            EtlError::SpreadsheetWriteError(_) | EtlError::IoError(_) => ErrorCategory::Storage,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            EtlError::EmptyInput { .. } => ErrorSeverity::Low,
            EtlError::InvalidResponse { .. } => ErrorSeverity::Medium,
            EtlError::Unauthorized
            | EtlError::ConfigError { .. }
            | EtlError::MissingConfigError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::ConfigValidationError { .. } => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    /// 只有模型回覆內容不合格時才值得以相同問題重試
    pub fn is_retriable(&self) -> bool {
        matches!(self, EtlError::InvalidResponse { .. })
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            EtlError::Unauthorized => "密钥错误。请检查你输入的密钥是否正确。".to_string(),
            EtlError::ModelServiceError { status, .. } => {
                format!("HTTP服务异常（状态码 {}）", status)
            }
            EtlError::ApiError(e) => format!("HTTP请求异常: {}", e),
            EtlError::InvalidResponse { message } => format!("AI返回结果无效: {}", message),
            EtlError::EmptyInput { path } => format!("输入文件 {} 中没有评论", path),
            EtlError::SpreadsheetReadError(e) => format!("无法读取输入表格: {}", e),
            EtlError::SpreadsheetWriteError(e) => format!("无法写入结果表格: {}", e),
            other => format!("发生错误：{}", other),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Authentication => "请检查 --key 参数",
            ErrorCategory::Network => {
                "请检查你输入的协议、主机名、端口号是否正确，或检查你的网络连接"
            }
            ErrorCategory::Model => "请检查你输入的模型名是否正确",
            ErrorCategory::Configuration => "请检查命令行参数与配置文件",
            ErrorCategory::Data => "请检查输入文件的格式与列号",
            ErrorCategory::Storage => "请检查输出路径是否可写",
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;

pub mod cli;
pub mod file_config;
pub mod settings;

#[cfg(feature = "cli")]
use crate::adapters::spreadsheet::column_index;
#[cfg(feature = "cli")]
use crate::domain::model::{ClassifyMode, RequestFormat, RetryPolicy};
#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use crate::utils::logger::LogFormat;
#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use file_config::FileConfig;
#[cfg(feature = "cli")]
use settings::Settings;
#[cfg(feature = "cli")]
use std::time::Duration;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "review-etl", version)]
#[command(about = "Classify product reviews from a spreadsheet with a remote language model")]
pub struct CliConfig {
    #[arg(short = 'k', long, help = "API key sent as a bearer token")]
    pub key: String,

    #[arg(short = 'm', long, help = "Model name (default from config file)")]
    pub model: Option<String>,

    #[arg(long)]
    pub host: Option<String>,

    #[arg(long)]
    pub port: Option<u16>,

    #[arg(long)]
    pub scheme: Option<String>,

    #[arg(short = 'c', long, help = "Config file (JSON or TOML), defaults to ./config.json when present")]
    pub config: Option<String>,

    #[arg(short = 'i', long, default_value = "input.xlsx")]
    pub input: String,

    #[arg(short = 'o', long, default_value = "output.xlsx")]
    pub output: String,

    #[arg(long, default_value = "A", help = "Column letter holding the reviews")]
    pub column: String,

    #[arg(long, help = "Worksheet name (first sheet when omitted)")]
    pub sheet: Option<String>,

    #[arg(long, default_value = "full", help = "full, label or batch")]
    pub mode: ClassifyMode,

    #[arg(long, default_value = "json", help = "Request body format: json or text")]
    pub body: RequestFormat,

    #[arg(long, help = "Reviews per request in batch mode (all rows when omitted)")]
    pub batch_size: Option<usize>,

    #[arg(long, default_value = "5")]
    pub max_attempts: u32,

    #[arg(long, default_value = "500")]
    pub retry_delay_ms: u64,

    #[arg(long, default_value = "60", help = "Request timeout in seconds")]
    pub timeout: u64,

    #[arg(long, help = "Append every finished row to this JSONL file")]
    pub checkpoint: Option<String>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log process stats after each phase")]
    pub monitor: bool,

    #[arg(long, default_value = "text", help = "Log format: text or json")]
    pub log_format: LogFormat,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// 合併命令列參數與配置檔，命令列優先
    pub fn resolve(&self) -> Result<Settings> {
        let file = match &self.config {
            Some(path) => FileConfig::from_file(path)?,
            None => FileConfig::load_default()?,
        };
        self.resolve_with(&file)
    }

    pub fn resolve_with(&self, file: &FileConfig) -> Result<Settings> {
        let scheme = self.scheme.as_deref().unwrap_or(file.scheme_or_default());
        let host = self.host.as_deref().unwrap_or(file.host_or_default());
        let port = self.port.unwrap_or(file.port_or_default());
        let model = self.model.as_deref().unwrap_or(file.model_or_default());

        Ok(Settings {
            base_url: format!("{}://{}:{}", scheme, host, port),
            api_key: self.key.clone(),
            model: model.to_string(),
            input_file: self.input.clone(),
            output_file: self.output.clone(),
            review_column: column_index(&self.column)?,
            sheet: self.sheet.clone(),
            mode: self.mode,
            request_format: self.body,
            retry: RetryPolicy {
                max_attempts: self.max_attempts,
                initial_delay: Duration::from_millis(self.retry_delay_ms),
                ..RetryPolicy::default()
            },
            request_timeout: Duration::from_secs(self.timeout),
            batch_size: self.batch_size,
            checkpoint_file: self.checkpoint.clone(),
        })
    }
}

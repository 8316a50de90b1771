use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// 輸入表格中的一則商品評論
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRow {
    /// 從 1 開始的資料列序號（不含標題列）
    pub index: usize,
    pub text: String,
}

impl ReviewRow {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }

    /// 送進提示詞前去掉換行
    pub fn prompt_text(&self) -> String {
        self.text.replace(['\r', '\n'], "")
    }

    /// 只有空字串才跳過，僅含空格的評論照常送出
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sentiment {
    #[serde(rename = "正面")]
    Positive,
    #[serde(rename = "负面")]
    Negative,
    #[serde(rename = "中性")]
    Neutral,
}

impl Sentiment {
    pub const ALL: [Sentiment; 3] = [Sentiment::Positive, Sentiment::Negative, Sentiment::Neutral];

    pub fn label(&self) -> &'static str {
        match self {
            Sentiment::Positive => "正面",
            Sentiment::Negative => "负面",
            Sentiment::Neutral => "中性",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.label() == label)
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub sentiment: Sentiment,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl Classification {
    pub fn label_only(sentiment: Sentiment) -> Self {
        Self {
            sentiment,
            tags: Vec::new(),
            score: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RowStatus {
    Succeeded,
    Failed { reason: String },
}

impl RowStatus {
    /// 寫入結果表格「处理状态」欄的文字
    pub fn label(&self) -> &'static str {
        match self {
            RowStatus::Succeeded => "成功",
            RowStatus::Failed { .. } => "失败",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RowStatus::Succeeded)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedRow {
    pub index: usize,
    pub text: String,
    #[serde(flatten)]
    pub status: RowStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<Classification>,
    pub total_tokens: u64,
    pub attempts: u32,
}

impl ClassifiedRow {
    pub fn succeeded(row: ReviewRow, classification: Classification, total_tokens: u64, attempts: u32) -> Self {
        Self {
            index: row.index,
            text: row.text,
            status: RowStatus::Succeeded,
            classification: Some(classification),
            total_tokens,
            attempts,
        }
    }

    pub fn failed(row: ReviewRow, reason: impl Into<String>, total_tokens: u64, attempts: u32) -> Self {
        Self {
            index: row.index,
            text: row.text,
            status: RowStatus::Failed {
                reason: reason.into(),
            },
            classification: None,
            total_tokens,
            attempts,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassificationReport {
    pub rows: Vec<ClassifiedRow>,
}

impl ClassificationReport {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            rows: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, row: ClassifiedRow) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.rows.iter().filter(|r| r.status.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.len() - self.succeeded()
    }

    pub fn total_tokens(&self) -> u64 {
        self.rows.iter().map(|r| r.total_tokens).sum()
    }
}

/// 分類模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifyMode {
    /// 每則評論一次請求，回覆需符合 sentiment/tags/score 結構
    #[default]
    Full,
    /// 每則評論一次請求，回覆只有情感類別字串
    Label,
    /// 多則評論合成一次請求，回覆為 JSON 陣列
    Batch,
}

impl FromStr for ClassifyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "full" => Ok(ClassifyMode::Full),
            "label" => Ok(ClassifyMode::Label),
            "batch" => Ok(ClassifyMode::Batch),
            other => Err(format!("unknown mode '{}' (expected full, label or batch)", other)),
        }
    }
}

/// 請求主體格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestFormat {
    #[default]
    Json,
    Text,
}

impl FromStr for RequestFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(RequestFormat::Json),
            "text" => Ok(RequestFormat::Text),
            other => Err(format!("unknown body format '{}' (expected json or text)", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub backoff_factor: f64,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// 不等待直接重試，測試用
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            ..Self::default()
        }
    }

    /// 第 `attempt` 次（從 1 起算）失敗後的等待時間
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32) as i32;
        let millis = self.initial_delay.as_millis() as f64 * self.backoff_factor.powi(exponent);
        Duration::from_millis(millis.min(self.max_delay.as_millis() as f64) as u64)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(500),
            backoff_factor: 1.75,
            max_delay: Duration::from_millis(5000),
        }
    }
}

use crate::core::ConfigProvider;
use crate::domain::model::RequestFormat;
use crate::utils::error::{EtlError, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    question: &'a str,
    model: &'a str,
}

/// 模型服務 `/chat` 端點的客戶端，每次呼叫只發一次請求
#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    format: RequestFormat,
}

impl ChatClient {
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        model: impl Into<String>,
        format: RequestFormat,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat", base_url.trim_end_matches('/')),
            api_key: api_key.into(),
            model: model.into(),
            format,
        })
    }

    pub fn from_config<C: ConfigProvider>(config: &C) -> Result<Self> {
        Self::new(
            config.base_url(),
            config.api_key(),
            config.model(),
            config.request_format(),
            config.request_timeout(),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// 送出問題並回傳原始回應內容
    ///
    /// 401 回傳 [`EtlError::Unauthorized`]，其他非 2xx 回傳
    /// [`EtlError::ModelServiceError`]，連線失敗或逾時回傳 [`EtlError::ApiError`]。
    /// 這一層不重試。
    pub async fn chat_once(&self, question: &str) -> Result<String> {
        let request = self.client.post(&self.endpoint).bearer_auth(&self.api_key);

        let request = match self.format {
            RequestFormat::Json => request.json(&ChatRequest {
                question,
                model: &self.model,
            }),
            // 最簡單的變體只送純文字問題，模型由服務端決定
            RequestFormat::Text => request
                .header(CONTENT_TYPE, "text/plain; charset=utf-8")
                .body(question.to_string()),
        };

        tracing::debug!("POST {} ({} chars)", self.endpoint, question.chars().count());
        let response = request.send().await?;
        let status = response.status();
        tracing::debug!("Model service response status: {}", status);

        if status == StatusCode::UNAUTHORIZED {
            return Err(EtlError::Unauthorized);
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(EtlError::ModelServiceError {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.text().await?)
    }
}

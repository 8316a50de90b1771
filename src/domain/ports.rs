use crate::domain::model::{
    ClassificationReport, ClassifyMode, RequestFormat, RetryPolicy, ReviewRow,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn append_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    /// `{scheme}://{host}:{port}`，不含 `/chat`
    fn base_url(&self) -> &str;
    fn api_key(&self) -> &str;
    fn model(&self) -> &str;
    fn input_file(&self) -> &str;
    fn output_file(&self) -> &str;
    /// 從 0 起算的評論欄位
    fn review_column(&self) -> usize;
    fn sheet(&self) -> Option<&str>;
    fn mode(&self) -> ClassifyMode;
    fn request_format(&self) -> RequestFormat;
    fn retry_policy(&self) -> RetryPolicy;
    fn request_timeout(&self) -> Duration;
    fn batch_size(&self) -> Option<usize>;
    fn checkpoint_file(&self) -> Option<&str>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<ReviewRow>>;
    async fn transform(&self, rows: Vec<ReviewRow>) -> Result<ClassificationReport>;
    async fn load(&self, report: &ClassificationReport) -> Result<String>;
}

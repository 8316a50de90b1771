use crate::core::Pipeline;
use crate::utils::error::{EtlError, Result};
use crate::utils::monitor::RunMonitor;

/// 一次執行的摘要
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub output_path: String,
    pub rows: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub total_tokens: u64,
}

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    input_label: String,
    monitor: RunMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            input_label: "input".to_string(),
            monitor: RunMonitor::new(monitor_enabled),
        }
    }

    /// 輸入為空時錯誤訊息中顯示的名稱
    pub fn with_input_label(mut self, label: impl Into<String>) -> Self {
        self.input_label = label.into();
        self
    }

    pub async fn run(&self) -> Result<RunSummary> {
        tracing::info!("Starting review classification...");

        // Extract
        self.monitor.start_phase();
        let rows = self.pipeline.extract().await?;
        tracing::info!("📥 Extracted {} reviews", rows.len());
        self.monitor.log_phase("Extract", rows.len());

        if rows.is_empty() {
            return Err(EtlError::EmptyInput {
                path: self.input_label.clone(),
            });
        }
        let input_rows = rows.len();

        // Transform
        self.monitor.start_phase();
        let report = self.pipeline.transform(rows).await?;
        self.monitor.log_phase("Transform", report.len());

        // 輸出列數必須與輸入一致
        if report.len() != input_rows {
            return Err(EtlError::ProcessingError {
                message: format!(
                    "classified {} rows but read {} reviews",
                    report.len(),
                    input_rows
                ),
            });
        }

        tracing::info!(
            "🧮 Classified {} reviews: {} succeeded, {} failed, {} tokens",
            report.len(),
            report.succeeded(),
            report.failed(),
            report.total_tokens()
        );

        // Load
        self.monitor.start_phase();
        let output_path = self.pipeline.load(&report).await?;
        tracing::info!("📁 Output saved to: {}", output_path);
        self.monitor.log_phase("Load", report.len());
        self.monitor.log_final_stats();

        Ok(RunSummary {
            output_path,
            rows: report.len(),
            succeeded: report.succeeded(),
            failed: report.failed(),
            total_tokens: report.total_tokens(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ClassificationReport, ClassifiedRow, ReviewRow};
    use crate::domain::model::{Classification, Sentiment};
    use std::sync::atomic::{AtomicBool, Ordering};

    struct StubPipeline {
        rows: Vec<ReviewRow>,
        drop_last: bool,
        loaded: AtomicBool,
    }

    impl StubPipeline {
        fn new(rows: Vec<ReviewRow>) -> Self {
            Self {
                rows,
                drop_last: false,
                loaded: AtomicBool::new(false),
            }
        }
    }

    #[async_trait::async_trait]
    impl Pipeline for StubPipeline {
        async fn extract(&self) -> Result<Vec<ReviewRow>> {
            Ok(self.rows.clone())
        }

        async fn transform(&self, rows: Vec<ReviewRow>) -> Result<ClassificationReport> {
            let mut report = ClassificationReport::default();
            let keep = if self.drop_last { rows.len() - 1 } else { rows.len() };
            for row in rows.into_iter().take(keep) {
                report.push(ClassifiedRow::succeeded(
                    row,
                    Classification::label_only(Sentiment::Neutral),
                    4,
                    1,
                ));
            }
            Ok(report)
        }

        async fn load(&self, _report: &ClassificationReport) -> Result<String> {
            self.loaded.store(true, Ordering::SeqCst);
            Ok("output.xlsx".to_string())
        }
    }

    #[tokio::test]
    async fn test_run_returns_summary() {
        let engine = EtlEngine::new(StubPipeline::new(vec![
            ReviewRow::new(1, "一般"),
            ReviewRow::new(2, "还行"),
        ]));

        let summary = engine.run().await.unwrap();
        assert_eq!(
            summary,
            RunSummary {
                output_path: "output.xlsx".to_string(),
                rows: 2,
                succeeded: 2,
                failed: 0,
                total_tokens: 8,
            }
        );
    }

    #[tokio::test]
    async fn test_empty_input_is_reported_without_loading() {
        let engine = EtlEngine::new(StubPipeline::new(vec![])).with_input_label("reviews.xlsx");

        let err = engine.run().await.unwrap_err();
        assert!(matches!(err, EtlError::EmptyInput { ref path } if path == "reviews.xlsx"));
        assert!(!engine.pipeline.loaded.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_row_count_mismatch_is_rejected() {
        let mut pipeline = StubPipeline::new(vec![ReviewRow::new(1, "好"), ReviewRow::new(2, "差")]);
        pipeline.drop_last = true;
        let engine = EtlEngine::new(pipeline);

        let err = engine.run().await.unwrap_err();
        assert!(matches!(err, EtlError::ProcessingError { .. }));
        assert!(!engine.pipeline.loaded.load(Ordering::SeqCst));
    }
}

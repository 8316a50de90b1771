use crate::adapters::http::ChatClient;
use crate::adapters::spreadsheet::{read_reviews, write_report, SheetFormat};
use crate::core::checkpoint::Checkpoint;
use crate::core::prompt::{batch_prompt, label_prompt, scored_prompt};
use crate::core::response::{parse_envelope, validate_batch, validate_single};
use crate::core::retry::{retry_until_valid, Attempt};
use crate::core::{
    ClassificationReport, ClassifiedRow, ClassifyMode, ConfigProvider, Pipeline, ReviewRow,
    Storage,
};
use crate::utils::error::{EtlError, Result};

const EMPTY_REVIEW: &str = "empty review";

/// 讀取評論、逐列呼叫模型分類、輸出結果表格
pub struct ReviewPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    client: ChatClient,
}

impl<S: Storage, C: ConfigProvider> ReviewPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Result<Self> {
        let client = ChatClient::from_config(&config)?;
        Ok(Self {
            storage,
            config,
            client,
        })
    }

    fn question_for(&self, row: &ReviewRow) -> String {
        match self.config.mode() {
            ClassifyMode::Label => label_prompt(&row.prompt_text()),
            ClassifyMode::Full | ClassifyMode::Batch => scored_prompt(&row.prompt_text()),
        }
    }

    /// 單列：同一個問題重送直到回覆合格或次數用完
    async fn classify_row(&self, row: ReviewRow) -> Result<ClassifiedRow> {
        if row.is_empty() {
            tracing::warn!("⚠️ Review {} is empty, skipping", row.index);
            return Ok(ClassifiedRow::failed(row, EMPTY_REVIEW, 0, 0));
        }

        let question = self.question_for(&row);
        let mode = self.config.mode();
        let label = format!("Review {}", row.index);
        let client = &self.client;
        let question = question.as_str();

        let retried = retry_until_valid(&self.config.retry_policy(), &label, move |_| async move {
            let raw = client.chat_once(question).await?;
            let attempt = match parse_envelope(&raw) {
                Ok(envelope) => Attempt::new(
                    envelope.total_tokens,
                    validate_single(mode, &envelope.content),
                ),
                Err(e) => Attempt::new(0, Err(e)),
            };
            Ok::<_, EtlError>(attempt)
        })
        .await?;

        let classified = match retried.value {
            Ok(classification) => {
                tracing::info!(
                    "✅ Review {} classified as {} ({} tokens, {} attempt(s))",
                    row.index,
                    classification.sentiment,
                    retried.tokens,
                    retried.attempts
                );
                ClassifiedRow::succeeded(row, classification, retried.tokens, retried.attempts)
            }
            Err(reason) => {
                ClassifiedRow::failed(row, reason, retried.tokens, retried.attempts)
            }
        };
        Ok(classified)
    }

    /// 批次：整組評論作為一個 JSON 陣列送出，整組一起重試
    async fn classify_chunk(&self, rows: Vec<ReviewRow>) -> Result<Vec<ClassifiedRow>> {
        let texts: Vec<String> = rows
            .iter()
            .filter(|row| !row.is_empty())
            .map(ReviewRow::prompt_text)
            .collect();

        if texts.is_empty() {
            return Ok(rows
                .into_iter()
                .map(|row| ClassifiedRow::failed(row, EMPTY_REVIEW, 0, 0))
                .collect());
        }

        let first = rows.first().map_or(0, |r| r.index);
        let last = rows.last().map_or(0, |r| r.index);
        let label = format!("Reviews {}-{}", first, last);
        let question = batch_prompt(&texts)?;
        let expected = texts.len();
        let client = &self.client;
        let question = question.as_str();

        let retried = retry_until_valid(&self.config.retry_policy(), &label, move |_| async move {
            let raw = client.chat_once(question).await?;
            let attempt = match parse_envelope(&raw) {
                Ok(envelope) => Attempt::new(
                    envelope.total_tokens,
                    validate_batch(&envelope.content, expected),
                ),
                Err(e) => Attempt::new(0, Err(e)),
            };
            Ok::<_, EtlError>(attempt)
        })
        .await?;

        let mut token_shares = split_tokens(retried.tokens, expected).into_iter();
        let mut classified = Vec::with_capacity(rows.len());

        match retried.value {
            Ok(classifications) => {
                tracing::info!(
                    "✅ {} classified ({} tokens, {} attempt(s))",
                    label,
                    retried.tokens,
                    retried.attempts
                );
                let mut classifications = classifications.into_iter();
                for row in rows {
                    if row.is_empty() {
                        classified.push(ClassifiedRow::failed(row, EMPTY_REVIEW, 0, 0));
                        continue;
                    }
                    let tokens = token_shares.next().unwrap_or(0);
                    match classifications.next() {
                        Some(c) => classified.push(ClassifiedRow::succeeded(
                            row,
                            c,
                            tokens,
                            retried.attempts,
                        )),
                        None => classified.push(ClassifiedRow::failed(
                            row,
                            "missing classification",
                            tokens,
                            retried.attempts,
                        )),
                    }
                }
            }
            Err(reason) => {
                for row in rows {
                    if row.is_empty() {
                        classified.push(ClassifiedRow::failed(row, EMPTY_REVIEW, 0, 0));
                        continue;
                    }
                    let tokens = token_shares.next().unwrap_or(0);
                    classified.push(ClassifiedRow::failed(
                        row,
                        reason.clone(),
                        tokens,
                        retried.attempts,
                    ));
                }
            }
        }

        Ok(classified)
    }
}

/// 將批次的 token 平均分給各列，餘數分給前面的列
pub(crate) fn split_tokens(total: u64, parts: usize) -> Vec<u64> {
    if parts == 0 {
        return Vec::new();
    }
    let parts_u64 = parts as u64;
    let base = total / parts_u64;
    let remainder = (total % parts_u64) as usize;
    (0..parts)
        .map(|i| base + u64::from(i < remainder))
        .collect()
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for ReviewPipeline<S, C> {
    async fn extract(&self) -> Result<Vec<ReviewRow>> {
        let input = self.config.input_file();
        tracing::debug!("Reading reviews from {}", input);

        let data = self.storage.read_file(input).await?;
        let rows = read_reviews(
            &data,
            SheetFormat::from_path(input),
            self.config.review_column(),
            self.config.sheet(),
        )?;

        tracing::debug!("Read {} review rows from {}", rows.len(), input);
        Ok(rows)
    }

    async fn transform(&self, rows: Vec<ReviewRow>) -> Result<ClassificationReport> {
        let mut report = ClassificationReport::with_capacity(rows.len());
        let checkpoint = Checkpoint::new(&self.storage, self.config.checkpoint_file());
        checkpoint.reset().await?;

        tracing::info!(
            "🚀 Classifying {} reviews via {} (model: {}, mode: {:?})",
            rows.len(),
            self.client.endpoint(),
            self.config.model(),
            self.config.mode()
        );

        match self.config.mode() {
            ClassifyMode::Batch => {
                let chunk_size = self.config.batch_size().unwrap_or(rows.len()).max(1);
                let mut remaining = rows.into_iter().peekable();
                while remaining.peek().is_some() {
                    let chunk: Vec<ReviewRow> = remaining.by_ref().take(chunk_size).collect();
                    for row in self.classify_chunk(chunk).await? {
                        checkpoint.record(&row).await?;
                        report.push(row);
                    }
                }
            }
            ClassifyMode::Full | ClassifyMode::Label => {
                for row in rows {
                    let classified = self.classify_row(row).await?;
                    checkpoint.record(&classified).await?;
                    report.push(classified);
                }
            }
        }

        Ok(report)
    }

    async fn load(&self, report: &ClassificationReport) -> Result<String> {
        let output = self.config.output_file();
        let data = write_report(report, SheetFormat::from_path(output))?;

        tracing::debug!("Writing {} rows ({} bytes) to {}", report.len(), data.len(), output);
        self.storage.write_file(output, &data).await?;

        Ok(output.to_string())
    }
}

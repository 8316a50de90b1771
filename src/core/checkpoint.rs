use crate::core::Storage;
use crate::domain::model::ClassifiedRow;
use crate::utils::error::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct CheckpointEntry<'a> {
    #[serde(flatten)]
    row: &'a ClassifiedRow,
    recorded_at: DateTime<Utc>,
}

/// 每處理完一列就追加一行 JSON，程序中途終止時已完成的結果仍保留
pub struct Checkpoint<'a, S: Storage> {
    storage: &'a S,
    path: Option<&'a str>,
}

impl<'a, S: Storage> Checkpoint<'a, S> {
    pub fn new(storage: &'a S, path: Option<&'a str>) -> Self {
        Self { storage, path }
    }

    /// 清空上一次執行留下的內容
    pub async fn reset(&self) -> Result<()> {
        if let Some(path) = self.path {
            tracing::debug!("Checkpoint file: {}", path);
            self.storage.write_file(path, b"").await?;
        }
        Ok(())
    }

    pub async fn record(&self, row: &ClassifiedRow) -> Result<()> {
        let Some(path) = self.path else {
            return Ok(());
        };

        let entry = CheckpointEntry {
            row,
            recorded_at: Utc::now(),
        };
        let mut line = serde_json::to_vec(&entry)?;
        line.push(b'\n');
        self.storage.append_file(path, &line).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::cli::LocalStorage;
    use crate::domain::model::{Classification, ReviewRow, Sentiment};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_records_one_json_line_per_row() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path().to_str().unwrap().to_string());
        std::fs::write(temp_dir.path().join("progress.jsonl"), "stale\n").unwrap();

        let checkpoint = Checkpoint::new(&storage, Some("progress.jsonl"));
        checkpoint.reset().await.unwrap();
        checkpoint
            .record(&ClassifiedRow::succeeded(
                ReviewRow::new(1, "好用"),
                Classification::label_only(Sentiment::Positive),
                12,
                1,
            ))
            .await
            .unwrap();
        checkpoint
            .record(&ClassifiedRow::failed(ReviewRow::new(2, "？"), "not json", 8, 5))
            .await
            .unwrap();

        let content = std::fs::read_to_string(temp_dir.path().join("progress.jsonl")).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["status"], "succeeded");
        assert_eq!(lines[0]["classification"]["sentiment"], "正面");
        assert_eq!(lines[1]["status"], "failed");
        assert_eq!(lines[1]["reason"], "not json");
        assert_eq!(lines[1]["attempts"], 5);
        assert!(lines[1]["recorded_at"].is_string());
    }

    #[tokio::test]
    async fn test_disabled_checkpoint_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path().to_str().unwrap().to_string());

        let checkpoint = Checkpoint::new(&storage, None);
        checkpoint.reset().await.unwrap();
        checkpoint
            .record(&ClassifiedRow::failed(ReviewRow::new(1, ""), "empty review", 0, 0))
            .await
            .unwrap();

        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    }
}

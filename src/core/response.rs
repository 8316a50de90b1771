//! Parsing and schema validation of model replies.
//!
//! The service wraps the model's answer in an envelope
//! `{"content": "...", "total_tokens": 42}`. The answer itself is checked
//! against the schema of the active [`ClassifyMode`].

use crate::domain::model::{Classification, ClassifyMode, Sentiment};
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::validate_range;
use serde::Deserialize;

pub const MIN_SCORE: f64 = 1.0;
pub const MAX_SCORE: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatEnvelope {
    pub content: String,
    #[serde(default)]
    pub total_tokens: u64,
}

/// `full` 與 `batch` 模式的回覆結構，多餘欄位視為不合格
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScoredReply {
    sentiment: Sentiment,
    tags: Vec<String>,
    score: f64,
}

impl ScoredReply {
    /// 回傳不合格原因，由呼叫端附上原始內容
    fn check(self) -> std::result::Result<Classification, String> {
        if self.tags.is_empty() {
            return Err("tags must contain at least one item".to_string());
        }
        if self.tags.iter().any(String::is_empty) {
            return Err("tags must not contain empty strings".to_string());
        }
        validate_range("score", self.score, MIN_SCORE, MAX_SCORE).map_err(|e| e.to_string())?;

        Ok(Classification {
            sentiment: self.sentiment,
            tags: self.tags,
            score: Some(self.score),
        })
    }
}

fn rejected(reason: impl std::fmt::Display, content: &str) -> EtlError {
    EtlError::invalid_response(format!("{} (content: {})", reason, content))
}

/// 解析服務回應的外層，無法解析時視為可重試的無效回覆
pub fn parse_envelope(raw: &str) -> Result<ChatEnvelope> {
    let mut envelope: ChatEnvelope = serde_json::from_str(raw)
        .map_err(|e| rejected(format!("malformed response envelope: {}", e), raw))?;
    envelope.content = normalize_content(&envelope.content);
    Ok(envelope)
}

pub fn normalize_content(content: &str) -> String {
    content.replace(['\r', '\n'], "")
}

pub fn validate_scored(content: &str) -> Result<Classification> {
    let reply: ScoredReply = serde_json::from_str(content).map_err(|e| rejected(e, content))?;
    reply.check().map_err(|reason| rejected(reason, content))
}

pub fn validate_label(content: &str) -> Result<Classification> {
    Sentiment::from_label(content)
        .map(Classification::label_only)
        .ok_or_else(|| {
            EtlError::invalid_response(format!(
                "expected one of 正面/负面/中性, got '{}'",
                content
            ))
        })
}

/// 批次回覆必須是與送出評論數量相同的陣列
pub fn validate_batch(content: &str, expected: usize) -> Result<Vec<Classification>> {
    let replies: Vec<ScoredReply> =
        serde_json::from_str(content).map_err(|e| rejected(e, content))?;

    if replies.len() != expected {
        return Err(rejected(
            format!("expected {} classifications, got {}", expected, replies.len()),
            content,
        ));
    }

    replies
        .into_iter()
        .enumerate()
        .map(|(i, reply)| {
            reply
                .check()
                .map_err(|reason| rejected(format!("item {}: {}", i + 1, reason), content))
        })
        .collect()
}

/// 依單則模式驗證內容；批次模式請用 [`validate_batch`]
pub fn validate_single(mode: ClassifyMode, content: &str) -> Result<Classification> {
    match mode {
        ClassifyMode::Label => validate_label(content),
        ClassifyMode::Full | ClassifyMode::Batch => validate_scored(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_envelope_strips_newlines() {
        let raw = r#"{"content":"{\"sentiment\":\"正面\",\n\"tags\":[\"手机\"],\n\"score\":9}","total_tokens":42}"#;
        let envelope = parse_envelope(raw).unwrap();

        assert_eq!(envelope.total_tokens, 42);
        assert!(!envelope.content.contains('\n'));
        assert!(validate_scored(&envelope.content).is_ok());
    }

    #[test]
    fn test_parse_envelope_rejects_non_json() {
        let err = parse_envelope("<html>bad gateway</html>").unwrap_err();
        assert!(err.is_retriable());
    }

    #[test]
    fn test_valid_scored_reply() {
        let c = validate_scored(r#"{"sentiment":"正面","tags":["手机","拍照"],"score":9}"#).unwrap();
        assert_eq!(c.sentiment, Sentiment::Positive);
        assert_eq!(c.tags, vec!["手机", "拍照"]);
        assert_eq!(c.score, Some(9.0));
    }

    #[test]
    fn test_score_bounds_are_inclusive() {
        assert!(validate_scored(r#"{"sentiment":"中性","tags":["a"],"score":1}"#).is_ok());
        assert!(validate_scored(r#"{"sentiment":"中性","tags":["a"],"score":10}"#).is_ok());
        assert!(validate_scored(r#"{"sentiment":"中性","tags":["a"],"score":6.5}"#).is_ok());
        assert!(validate_scored(r#"{"sentiment":"中性","tags":["a"],"score":0.5}"#).is_err());
        assert!(validate_scored(r#"{"sentiment":"中性","tags":["a"],"score":11}"#).is_err());
    }

    #[test]
    fn test_schema_violations_are_rejected() {
        let cases = [
            // 不在列舉內
            r#"{"sentiment":"positive","tags":["a"],"score":5}"#,
            // 空標籤
            r#"{"sentiment":"正面","tags":[],"score":5}"#,
            r#"{"sentiment":"正面","tags":[""],"score":5}"#,
            // 多餘欄位
            r#"{"sentiment":"正面","tags":["a"],"score":5,"reason":"x"}"#,
            // 缺欄位
            r#"{"sentiment":"正面","tags":["a"]}"#,
            // 型別錯誤
            r#"{"sentiment":"正面","tags":["a"],"score":"5"}"#,
            r#"{"sentiment":"正面","tags":[1],"score":5}"#,
            "good",
            "```json{\"sentiment\":\"正面\",\"tags\":[\"a\"],\"score\":5}```",
        ];

        for content in cases {
            let err = validate_scored(content).unwrap_err();
            assert!(err.is_retriable(), "expected retriable error for {content}");
        }
    }

    #[test]
    fn test_label_must_match_exactly() {
        assert_eq!(validate_label("负面").unwrap().sentiment, Sentiment::Negative);
        assert!(validate_label(" 负面").is_err());
        assert!(validate_label("negative").is_err());
        assert!(validate_label("").is_err());
    }

    #[test]
    fn test_batch_length_must_match() {
        let content = r#"[{"sentiment":"正面","tags":["a"],"score":8},{"sentiment":"负面","tags":["b"],"score":2}]"#;
        assert_eq!(validate_batch(content, 2).unwrap().len(), 2);
        assert!(validate_batch(content, 3).is_err());
        assert!(validate_batch(r#"{"sentiment":"正面"}"#, 1).is_err());
    }

    #[test]
    fn test_batch_item_failure_names_item() {
        let content = r#"[{"sentiment":"正面","tags":["a"],"score":8},{"sentiment":"负面","tags":[],"score":2}]"#;
        let err = validate_batch(content, 2).unwrap_err();
        assert!(err.to_string().contains("item 2"));
    }

    #[test]
    fn test_rejection_message_carries_model_content() {
        let empty_tags = r#"{"sentiment":"正面","tags":[],"score":5}"#;
        let err = validate_scored(empty_tags).unwrap_err();
        assert!(err.to_string().contains("at least one item"));
        assert!(err.to_string().contains(empty_tags));

        let out_of_range = r#"{"sentiment":"正面","tags":["a"],"score":11}"#;
        let err = validate_scored(out_of_range).unwrap_err();
        assert!(err.to_string().contains(out_of_range));

        let short_batch = r#"[{"sentiment":"正面","tags":["a"],"score":8}]"#;
        let err = validate_batch(short_batch, 2).unwrap_err();
        assert!(err.to_string().contains(short_batch));
    }

    #[test]
    fn test_validate_single_dispatches_on_mode() {
        assert!(validate_single(ClassifyMode::Label, "中性").is_ok());
        assert!(validate_single(ClassifyMode::Full, "中性").is_err());
    }
}

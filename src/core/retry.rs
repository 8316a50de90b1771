use crate::domain::model::RetryPolicy;
use crate::utils::error::Result;
use std::future::Future;

/// 單次嘗試的結果：消耗的 token 與驗證結果
#[derive(Debug)]
pub struct Attempt<T> {
    pub tokens: u64,
    pub outcome: Result<T>,
}

impl<T> Attempt<T> {
    pub fn new(tokens: u64, outcome: Result<T>) -> Self {
        Self { tokens, outcome }
    }
}

/// 重試結束後的結果，`tokens` 為所有嘗試的總和
#[derive(Debug)]
pub struct Retried<T> {
    pub value: std::result::Result<T, String>,
    pub attempts: u32,
    pub tokens: u64,
}

/// 以相同的請求重試直到回覆合格或次數用完
///
/// `attempt` 回傳 `Err` 表示致命錯誤（例如 401），會立即往上傳遞；
/// `Attempt::outcome` 中可重試的錯誤才會觸發下一次嘗試。
pub async fn retry_until_valid<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut attempt: F,
) -> Result<Retried<T>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Attempt<T>>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut tokens = 0u64;
    let mut last_error = String::new();

    for n in 1..=max_attempts {
        let result = attempt(n).await?;
        tokens += result.tokens;

        match result.outcome {
            Ok(value) => {
                return Ok(Retried {
                    value: Ok(value),
                    attempts: n,
                    tokens,
                })
            }
            Err(e) if e.is_retriable() => {
                last_error = e.to_string();
                if n < max_attempts {
                    let delay = policy.delay_after(n);
                    tracing::warn!(
                        "⚠️ {} attempt {}/{} rejected: {}; retrying in {:?}",
                        label,
                        n,
                        max_attempts,
                        e,
                        delay
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                } else {
                    tracing::warn!(
                        "⚠️ {} attempt {}/{} rejected: {}",
                        label,
                        n,
                        max_attempts,
                        e
                    );
                }
            }
            Err(e) => return Err(e),
        }
    }

    tracing::error!("❌ {} gave up after {} attempts", label, max_attempts);
    Ok(Retried {
        value: Err(last_error),
        attempts: max_attempts,
        tokens,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::EtlError;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_accepts_first_valid_attempt() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let retried = retry_until_valid(&RetryPolicy::immediate(5), "row 1", move |_| async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Attempt::new(42, Ok("正面")))
        })
        .await
        .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(retried.value, Ok("正面"));
        assert_eq!(retried.attempts, 1);
        assert_eq!(retried.tokens, 42);
    }

    #[tokio::test]
    async fn test_retries_until_valid_and_sums_tokens() {
        let retried = retry_until_valid(&RetryPolicy::immediate(5), "row 1", |n| async move {
            if n < 3 {
                Ok(Attempt::new(10, Err(EtlError::invalid_response("good"))))
            } else {
                Ok(Attempt::new(12, Ok(n)))
            }
        })
        .await
        .unwrap();

        assert_eq!(retried.value, Ok(3));
        assert_eq!(retried.attempts, 3);
        assert_eq!(retried.tokens, 32);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let retried: Retried<()> =
            retry_until_valid(&RetryPolicy::immediate(4), "row 7", move |_| async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Attempt::new(5, Err(EtlError::invalid_response("not json"))))
            })
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(retried.attempts, 4);
        assert_eq!(retried.tokens, 20);
        assert!(retried.value.unwrap_err().contains("not json"));
    }

    #[tokio::test]
    async fn test_fatal_error_stops_immediately() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<Retried<()>> =
            retry_until_valid(&RetryPolicy::immediate(5), "row 1", move |_| async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(EtlError::Unauthorized)
            })
            .await;

        assert!(matches!(result, Err(EtlError::Unauthorized)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_non_retriable_outcome_is_propagated() {
        let result: Result<Retried<()>> =
            retry_until_valid(&RetryPolicy::immediate(5), "row 1", |_| async {
                Ok(Attempt::new(
                    0,
                    Err(EtlError::ProcessingError {
                        message: "broken".to_string(),
                    }),
                ))
            })
            .await;

        assert!(matches!(result, Err(EtlError::ProcessingError { .. })));
    }
}

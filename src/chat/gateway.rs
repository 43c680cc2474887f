//! Model gateway: one provider call per attempt, with a bounded retry on
//! shape-invalid output. Provider transport failures are not retried here.

use std::future::Future;

use super::parser::{parse_reply, ParsedReply};
use crate::llm::{GenerateText, LlmError};

/// Total attempts per request, counting the first call.
pub const MAX_ATTEMPTS: u32 = 2;

/// How long a derived title may get before the raw text is truncated.
const TITLE_FALLBACK_CHARS: usize = 80;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("model response failed validation after {MAX_ATTEMPTS} attempts")]
    InvalidResponse,
    #[error(transparent)]
    Unavailable(#[from] LlmError),
}

/// Attempt outcome for [`with_retries`]: retryable failures consume an
/// attempt, fatal ones end the loop immediately.
pub enum AttemptError<E> {
    Retryable(E),
    Fatal(E),
}

/// Retry combinator. Calls `attempt` with the 1-based attempt number until
/// it succeeds, fails fatally, or the attempt budget is spent.
pub async fn with_retries<T, E, F, Fut>(max_attempts: u32, mut attempt: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, AttemptError<E>>>,
{
    let mut current = 1;
    loop {
        match attempt(current).await {
            Ok(value) => return Ok(value),
            Err(AttemptError::Fatal(err)) => return Err(err),
            Err(AttemptError::Retryable(err)) if current >= max_attempts => return Err(err),
            Err(AttemptError::Retryable(_)) => current += 1,
        }
    }
}

/// Runs the full call-and-validate chain: prompt in, parsed reply out.
pub async fn generate_reply(
    model: &dyn GenerateText,
    prompt: &str,
) -> Result<ParsedReply, GatewayError> {
    with_retries(MAX_ATTEMPTS, |attempt| async move {
        let raw = model
            .generate_text(prompt)
            .await
            .map_err(|err| AttemptError::Fatal(GatewayError::Unavailable(err)))?;
        match parse_reply(&raw) {
            Ok(reply) => Ok(reply),
            Err(err) => {
                tracing::warn!(attempt, error = %err, "model response failed validation");
                Err(AttemptError::Retryable(GatewayError::InvalidResponse))
            }
        }
    })
    .await
}

/// Derives a short title for a conversation or document. A title-model
/// failure never fails the caller: the text itself is truncated instead.
pub async fn generate_title(model: &dyn GenerateText, text: &str) -> String {
    match model.generate_text(&super::prompt::title_prompt(text)).await {
        Ok(title) if !title.trim().is_empty() => title.trim().trim_matches('"').to_string(),
        Ok(_) => truncated_title(text),
        Err(err) => {
            tracing::warn!(error = %err, "title generation failed, falling back to raw text");
            truncated_title(text)
        }
    }
}

fn truncated_title(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= TITLE_FALLBACK_CHARS {
        trimmed.to_string()
    } else {
        trimmed.chars().take(TITLE_FALLBACK_CHARS).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::parser::ReplyMode;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Hands out canned responses in order and records how often it was called.
    struct Scripted {
        replies: Mutex<VecDeque<Result<String, LlmError>>>,
        calls: Mutex<u32>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<String, LlmError>>) -> Self {
            Scripted {
                replies: Mutex::new(replies.into()),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl GenerateText for Scripted {
        async fn generate_text(&self, _prompt: &str) -> Result<String, LlmError> {
            *self.calls.lock().unwrap() += 1;
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(String::new()))
        }
    }

    fn unavailable() -> LlmError {
        LlmError::Api {
            status: 503,
            message: "overloaded".to_string(),
        }
    }

    #[tokio::test]
    async fn first_valid_response_needs_no_retry() {
        let model = Scripted::new(vec![Ok(r#"{"content": "answer"}"#.to_string())]);
        let reply = generate_reply(&model, "prompt").await.unwrap();
        assert_eq!(reply.mode, ReplyMode::Message);
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn one_retry_after_invalid_output() {
        let model = Scripted::new(vec![
            Ok("garbage".to_string()),
            Ok(r#"{"content": "second try"}"#.to_string()),
        ]);
        let reply = generate_reply(&model, "prompt").await.unwrap();
        assert_eq!(reply.body, "second try");
        assert_eq!(model.calls(), 2);
    }

    #[tokio::test]
    async fn retry_budget_is_exactly_two_attempts() {
        let model = Scripted::new(vec![
            Ok("garbage".to_string()),
            Ok("still garbage".to_string()),
            Ok(r#"{"content": "never reached"}"#.to_string()),
        ]);
        let err = generate_reply(&model, "prompt").await.unwrap_err();
        assert!(matches!(err, GatewayError::InvalidResponse));
        assert_eq!(model.calls(), 2);
    }

    #[tokio::test]
    async fn provider_failure_is_not_retried() {
        let model = Scripted::new(vec![Err(unavailable())]);
        let err = generate_reply(&model, "prompt").await.unwrap_err();
        assert!(matches!(err, GatewayError::Unavailable(_)));
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn title_falls_back_to_truncated_text() {
        let model = Scripted::new(vec![Err(unavailable())]);
        let title = generate_title(&model, "  draft an NDA for a vendor  ").await;
        assert_eq!(title, "draft an NDA for a vendor");
    }
}

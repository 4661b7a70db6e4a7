//! AI message generation engine.
//!
//! Given a staged-diff summary, produces one conventional-commit subject line
//! via the configured provider. Every failure mode (missing credential,
//! non-2xx response, timeout, malformed body, empty normalized message)
//! degrades to `GeneratedMessage { message: None, .. }` with a warning;
//! nothing in here is fatal to the pipeline.

pub mod anthropic;
pub mod normalize;
pub mod openai;

pub use normalize::format_typed_message;

use crate::config::{AiConfig, ProviderApi, ProviderConfig};
use crate::git::CommitSummary;
use crate::{log_debug, log_warn};
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

/// Provider whose primary models are frequently unavailable; 4xx
/// unknown-model failures from it are retried once against
/// [`FALLBACK_MODEL`].
pub const FALLBACK_VENDOR: &str = "zai";
/// Documented always-available fallback model for [`FALLBACK_VENDOR`].
pub const FALLBACK_MODEL: &str = "glm-4-flash";

const SYSTEM_INSTRUCTION: &str = "You are a commit message generator. Respond with exactly one \
Conventional Commit subject line in the form `type(scope): subject` (scope optional) describing \
the staged changes. No body, no explanations, no code fences, no quotes.";

const ERROR_BODY_LIMIT: usize = 300;

/// Token usage reported by a provider; additive across commit units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    pub fn accumulate(&mut self, other: Self) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
    }

    pub fn is_zero(&self) -> bool {
        self.total_tokens == 0 && self.prompt_tokens == 0 && self.completion_tokens == 0
    }
}

/// Raw text plus usage extracted from one provider response.
#[derive(Debug, Clone)]
pub struct ProviderReply {
    pub text: String,
    pub usage: Option<TokenUsage>,
}

/// Outcome of one generation attempt. `message` is absent on any failure;
/// the warning explains what went wrong.
#[derive(Debug, Clone, Default)]
pub struct GeneratedMessage {
    pub message: Option<String>,
    pub usage: Option<TokenUsage>,
    pub warning: Option<String>,
}

impl GeneratedMessage {
    fn warn(warning: impl Into<String>) -> Self {
        Self {
            message: None,
            usage: None,
            warning: Some(warning.into()),
        }
    }
}

static MODEL_ERROR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(unknown|invalid|unsupported)[ _]model|model[ _]not[ _](found|supported)|model .*does not exist")
        .expect("static regex must compile")
});

/// Whether a failure response should trigger the one-shot model-fallback
/// retry. Kept as a standalone predicate so the body-sniffing heuristic can
/// be unit-tested and swapped without touching the request plumbing.
pub fn is_retryable_model_error(status: u16, body: &str) -> bool {
    (400..500).contains(&status) && MODEL_ERROR_RE.is_match(body)
}

#[derive(Debug)]
enum CallError {
    Http { status: u16, body: String },
    Transport(String),
    Timeout(u64),
}

impl CallError {
    fn describe(&self) -> String {
        match self {
            Self::Http { status, body } => format!("provider returned HTTP {status}: {body}"),
            Self::Transport(e) => format!("request failed: {e}"),
            Self::Timeout(ms) => format!("AI request timed out after {ms}ms"),
        }
    }
}

/// Generates a commit subject from the staged-diff summary.
pub async fn generate(
    ai: &AiConfig,
    summary: &CommitSummary,
    max_length: usize,
) -> GeneratedMessage {
    if !ai.enabled {
        return GeneratedMessage::warn("AI message generation is disabled");
    }

    let (provider_name, model) = ai.effective_provider_and_model();
    if model.is_empty() {
        return GeneratedMessage::warn("no AI model configured");
    }
    let Some(provider) = ai.providers.get(&provider_name) else {
        return GeneratedMessage::warn(format!(
            "AI provider '{provider_name}' has no configuration entry"
        ));
    };
    let Some(api_key) = provider.resolve_api_key() else {
        return GeneratedMessage::warn(provider.missing_key_hint(&provider_name));
    };

    log_debug!(
        "Generating commit message via {} ({})",
        provider_name,
        model
    );

    let client = reqwest::Client::new();
    let prompt = build_user_prompt(summary);

    let reply = match call_provider(&client, provider, &api_key, &model, &prompt, ai.timeout_ms)
        .await
    {
        Ok(reply) => reply,
        Err(first) => {
            let retryable = matches!(
                &first,
                CallError::Http { status, body }
                    if provider_name == FALLBACK_VENDOR && is_retryable_model_error(*status, body)
            );
            if !retryable {
                return GeneratedMessage::warn(first.describe());
            }

            log_warn!(
                "Model '{}' rejected by {}, retrying with fallback '{}'",
                model,
                provider_name,
                FALLBACK_MODEL
            );
            match call_provider(
                &client,
                provider,
                &api_key,
                FALLBACK_MODEL,
                &prompt,
                ai.timeout_ms,
            )
            .await
            {
                Ok(reply) => reply,
                Err(second) => {
                    return GeneratedMessage::warn(format!(
                        "model '{model}' failed ({}); fallback '{FALLBACK_MODEL}' failed ({})",
                        first.describe(),
                        second.describe()
                    ));
                }
            }
        }
    };

    let message = format_typed_message(&reply.text, max_length);
    if message.is_empty() {
        return GeneratedMessage {
            message: None,
            usage: reply.usage,
            warning: Some("model returned no usable message".to_string()),
        };
    }

    GeneratedMessage {
        message: Some(message),
        usage: reply.usage,
        warning: None,
    }
}

fn build_user_prompt(summary: &CommitSummary) -> String {
    format!(
        "Write a commit message for these staged changes.\n\n\
         Changed files (status\tpath):\n{}\n\
         Diff stat: {}\n\n\
         Patch:\n{}",
        summary.name_status, summary.diff_stat, summary.patch
    )
}

async fn call_provider(
    client: &reqwest::Client,
    provider: &ProviderConfig,
    api_key: &str,
    model: &str,
    prompt: &str,
    timeout_ms: u64,
) -> Result<ProviderReply, CallError> {
    let request = match provider.api {
        ProviderApi::OpenaiCompletions => {
            openai::build_request(client, provider, api_key, model, SYSTEM_INSTRUCTION, prompt)
        }
        ProviderApi::AnthropicMessages => {
            anthropic::build_request(client, provider, api_key, model, SYSTEM_INSTRUCTION, prompt)
        }
    };

    // One timeout per call, covering both the request and the body read;
    // expiry cancels only this call.
    let exchange = async {
        let response = request
            .send()
            .await
            .map_err(|e| CallError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| CallError::Transport(e.to_string()))?;
        Ok::<_, CallError>((status, body))
    };

    let (status, body) = tokio::time::timeout(Duration::from_millis(timeout_ms), exchange)
        .await
        .map_err(|_| CallError::Timeout(timeout_ms))??;

    if !(200..300).contains(&status) {
        return Err(CallError::Http {
            status,
            body: truncate_body(&body),
        });
    }

    let reply = match provider.api {
        ProviderApi::OpenaiCompletions => openai::extract_reply(&body),
        ProviderApi::AnthropicMessages => anthropic::extract_reply(&body),
    };
    reply.map_err(|e| CallError::Transport(e.to_string()))
}

fn truncate_body(body: &str) -> String {
    if body.chars().count() <= ERROR_BODY_LIMIT {
        body.to_string()
    } else {
        let truncated: String = body.chars().take(ERROR_BODY_LIMIT).collect();
        format!("{truncated}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_predicate_requires_4xx() {
        assert!(is_retryable_model_error(400, "unknown model: glm-9"));
        assert!(is_retryable_model_error(404, "Model not found"));
        assert!(is_retryable_model_error(422, "Invalid model name"));
        assert!(!is_retryable_model_error(500, "unknown model"));
        assert!(!is_retryable_model_error(401, "invalid api key"));
    }

    #[test]
    fn test_token_usage_accumulate() {
        let mut total = TokenUsage::default();
        assert!(total.is_zero());
        total.accumulate(TokenUsage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        });
        total.accumulate(TokenUsage {
            prompt_tokens: 1,
            completion_tokens: 2,
            total_tokens: 3,
        });
        assert_eq!(total.total_tokens, 18);
        assert_eq!(total.prompt_tokens, 11);
    }

    #[test]
    fn test_truncate_body() {
        assert_eq!(truncate_body("short"), "short");
        let long = "e".repeat(ERROR_BODY_LIMIT + 50);
        let out = truncate_body(&long);
        assert!(out.ends_with('…'));
        assert_eq!(out.chars().count(), ERROR_BODY_LIMIT + 1);
    }
}

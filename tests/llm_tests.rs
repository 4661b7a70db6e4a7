use git_otto::config::{AiConfig, ProviderApi, ProviderConfig};
use git_otto::git::CommitSummary;
use git_otto::llm::{self, FALLBACK_MODEL, FALLBACK_VENDOR};
use serde_json::json;
use std::collections::HashMap;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider_config(api: ProviderApi, base_url: &str) -> ProviderConfig {
    ProviderConfig {
        api,
        base_url: base_url.to_string(),
        api_key: Some("test-key".to_string()),
        api_key_env: None,
        headers: HashMap::new(),
    }
}

fn ai_config(provider: &str, config: ProviderConfig, model: &str) -> AiConfig {
    let mut providers = HashMap::new();
    providers.insert(provider.to_string(), config);
    AiConfig {
        enabled: true,
        timeout_ms: 5_000,
        model: model.to_string(),
        default_provider: provider.to_string(),
        providers,
    }
}

fn summary() -> CommitSummary {
    CommitSummary {
        name_status: "M\tsrc/lib.rs\n".to_string(),
        diff_stat: "1 file changed, 2 insertions(+), 1 deletion(-)".to_string(),
        patch: "diff --git a/src/lib.rs b/src/lib.rs\n".to_string(),
    }
}

#[tokio::test]
async fn openai_completions_happy_path() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": "feat: add parser" } }],
            "usage": { "prompt_tokens": 120, "completion_tokens": 8, "total_tokens": 128 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let ai = ai_config(
        "openai",
        provider_config(ProviderApi::OpenaiCompletions, &server.uri()),
        "gpt-test",
    );
    let generated = llm::generate(&ai, &summary(), 72).await;

    assert_eq!(generated.message.as_deref(), Some("feat: add parser"));
    assert!(generated.warning.is_none());
    let usage = generated.usage.expect("usage should be reported");
    assert_eq!(usage.total_tokens, 128);
}

#[tokio::test]
async fn anthropic_messages_happy_path() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .and(header("x-api-key", "test-key"))
        .and(header("anthropic-version", "2023-06-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{ "type": "text", "text": "fix: guard nil remote" }],
            "usage": { "input_tokens": 90, "output_tokens": 10 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let ai = ai_config(
        "anthropic",
        provider_config(ProviderApi::AnthropicMessages, &server.uri()),
        "claude-test",
    );
    let generated = llm::generate(&ai, &summary(), 72).await;

    assert_eq!(generated.message.as_deref(), Some("fix: guard nil remote"));
    let usage = generated.usage.expect("usage should be reported");
    assert_eq!(usage.total_tokens, 100);
}

#[tokio::test]
async fn disabled_config_short_circuits() {
    let mut ai = ai_config(
        "openai",
        provider_config(ProviderApi::OpenaiCompletions, "http://127.0.0.1:1"),
        "gpt-test",
    );
    ai.enabled = false;

    let generated = llm::generate(&ai, &summary(), 72).await;
    assert!(generated.message.is_none());
    assert!(generated.warning.expect("warning").contains("disabled"));
}

#[tokio::test]
async fn unknown_provider_short_circuits() {
    let ai = ai_config(
        "openai",
        provider_config(ProviderApi::OpenaiCompletions, "http://127.0.0.1:1"),
        "mystery/gpt-test",
    );

    let generated = llm::generate(&ai, &summary(), 72).await;
    assert!(generated.message.is_none());
    assert!(generated.warning.expect("warning").contains("mystery"));
}

#[tokio::test]
async fn missing_credential_names_env_var() {
    let mut config = provider_config(ProviderApi::OpenaiCompletions, "http://127.0.0.1:1");
    config.api_key = None;
    config.api_key_env = Some("GIT_OTTO_LLM_TEST_KEY".to_string());
    let ai = ai_config("openai", config, "gpt-test");

    let generated = llm::generate(&ai, &summary(), 72).await;
    assert!(generated.message.is_none());
    assert!(
        generated
            .warning
            .expect("warning")
            .contains("GIT_OTTO_LLM_TEST_KEY")
    );
}

#[tokio::test]
async fn non_2xx_degrades_to_warning() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .expect(1)
        .mount(&server)
        .await;

    let ai = ai_config(
        "openai",
        provider_config(ProviderApi::OpenaiCompletions, &server.uri()),
        "gpt-test",
    );
    let generated = llm::generate(&ai, &summary(), 72).await;

    assert!(generated.message.is_none());
    let warning = generated.warning.expect("warning");
    assert!(warning.contains("500"));
    assert!(warning.contains("upstream exploded"));
}

#[tokio::test]
async fn model_fallback_retries_once_for_vendor() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("glm-primary"))
        .respond_with(
            ResponseTemplate::new(404).set_body_string(r#"{"error": "unknown model glm-primary"}"#),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains(FALLBACK_MODEL))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "content": "chore: tidy config" } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let ai = ai_config(
        FALLBACK_VENDOR,
        provider_config(ProviderApi::OpenaiCompletions, &server.uri()),
        &format!("{FALLBACK_VENDOR}/glm-primary"),
    );
    let generated = llm::generate(&ai, &summary(), 72).await;

    assert_eq!(generated.message.as_deref(), Some("chore: tidy config"));
    assert!(generated.warning.is_none());
}

#[tokio::test]
async fn model_fallback_combines_both_failures() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("glm-primary"))
        .respond_with(
            ResponseTemplate::new(404).set_body_string("unknown model glm-primary"),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains(FALLBACK_MODEL))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .expect(1)
        .mount(&server)
        .await;

    let ai = ai_config(
        FALLBACK_VENDOR,
        provider_config(ProviderApi::OpenaiCompletions, &server.uri()),
        &format!("{FALLBACK_VENDOR}/glm-primary"),
    );
    let generated = llm::generate(&ai, &summary(), 72).await;

    assert!(generated.message.is_none());
    let warning = generated.warning.expect("warning");
    assert!(warning.contains("unknown model glm-primary"));
    assert!(warning.contains("rate limited"));
}

#[tokio::test]
async fn no_retry_for_other_providers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(404).set_body_string("unknown model gpt-test"))
        .expect(1)
        .mount(&server)
        .await;

    let ai = ai_config(
        "openai",
        provider_config(ProviderApi::OpenaiCompletions, &server.uri()),
        "gpt-test",
    );
    let generated = llm::generate(&ai, &summary(), 72).await;

    assert!(generated.message.is_none());
    assert!(generated.warning.is_some());
}

#[tokio::test]
async fn timeout_surfaces_the_bound() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(std::time::Duration::from_millis(500))
                .set_body_json(json!({
                    "choices": [{ "message": { "content": "feat: too late" } }]
                })),
        )
        .mount(&server)
        .await;

    let mut ai = ai_config(
        "openai",
        provider_config(ProviderApi::OpenaiCompletions, &server.uri()),
        "gpt-test",
    );
    ai.timeout_ms = 50;
    let generated = llm::generate(&ai, &summary(), 72).await;

    assert!(generated.message.is_none());
    assert!(generated.warning.expect("warning").contains("50ms"));
}

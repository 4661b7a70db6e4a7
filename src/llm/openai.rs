//! Request framing for `openai-completions` style providers.

use crate::config::ProviderConfig;
use crate::llm::{ProviderReply, TokenUsage};
use anyhow::{Context, Result, anyhow};
use serde_json::{Value, json};

/// Builds the `POST {base_url}/chat/completions` request.
pub fn build_request(
    client: &reqwest::Client,
    provider: &ProviderConfig,
    api_key: &str,
    model: &str,
    system: &str,
    prompt: &str,
) -> reqwest::RequestBuilder {
    let url = format!("{}/chat/completions", provider.base_url.trim_end_matches('/'));
    let body = json!({
        "model": model,
        "messages": [
            { "role": "system", "content": system },
            { "role": "user", "content": prompt },
        ],
    });

    let mut request = client
        .post(url)
        .bearer_auth(api_key)
        .header("content-type", "application/json");
    for (name, value) in &provider.headers {
        request = request.header(name, value);
    }
    request.json(&body)
}

/// Extracts the first choice's text and token usage from a response body.
pub fn extract_reply(body: &str) -> Result<ProviderReply> {
    let value: Value = serde_json::from_str(body).context("Malformed completions response")?;

    let text = value["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| anyhow!("Completions response has no message content"))?
        .to_string();

    let usage = value.get("usage").map(|usage| TokenUsage {
        prompt_tokens: usage["prompt_tokens"].as_u64().unwrap_or(0),
        completion_tokens: usage["completion_tokens"].as_u64().unwrap_or(0),
        total_tokens: usage["total_tokens"].as_u64().unwrap_or(0),
    });

    Ok(ProviderReply { text, usage })
}

//! Request framing for `anthropic-messages` style providers.

use crate::config::ProviderConfig;
use crate::llm::{ProviderReply, TokenUsage};
use anyhow::{Context, Result, anyhow};
use serde_json::{Value, json};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_RESPONSE_TOKENS: u32 = 512;

/// Builds the `POST {base_url}/messages` request.
pub fn build_request(
    client: &reqwest::Client,
    provider: &ProviderConfig,
    api_key: &str,
    model: &str,
    system: &str,
    prompt: &str,
) -> reqwest::RequestBuilder {
    let url = format!("{}/messages", provider.base_url.trim_end_matches('/'));
    let body = json!({
        "model": model,
        "max_tokens": MAX_RESPONSE_TOKENS,
        "system": system,
        "messages": [
            { "role": "user", "content": prompt },
        ],
    });

    let mut request = client
        .post(url)
        .header("x-api-key", api_key)
        .header("anthropic-version", ANTHROPIC_VERSION)
        .header("content-type", "application/json");
    for (name, value) in &provider.headers {
        request = request.header(name, value);
    }
    request.json(&body)
}

/// Extracts the first text block and derives usage as input + output tokens.
pub fn extract_reply(body: &str) -> Result<ProviderReply> {
    let value: Value = serde_json::from_str(body).context("Malformed messages response")?;

    let text = value["content"]
        .as_array()
        .and_then(|blocks| {
            blocks
                .iter()
                .find(|block| block["type"] == "text")
                .and_then(|block| block["text"].as_str())
        })
        .ok_or_else(|| anyhow!("Messages response has no text block"))?
        .to_string();

    let usage = value.get("usage").map(|usage| {
        let input = usage["input_tokens"].as_u64().unwrap_or(0);
        let output = usage["output_tokens"].as_u64().unwrap_or(0);
        TokenUsage {
            prompt_tokens: input,
            completion_tokens: output,
            total_tokens: input + output,
        }
    });

    Ok(ProviderReply { text, usage })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_reply() {
        let body = r#"{
            "content": [{ "type": "text", "text": "fix: guard nil remote" }],
            "usage": { "input_tokens": 90, "output_tokens": 10 }
        }"#;
        let reply = extract_reply(body).expect("reply should parse");
        assert_eq!(reply.text, "fix: guard nil remote");
        let usage = reply.usage.expect("usage should be present");
        assert_eq!(usage.prompt_tokens, 90);
        assert_eq!(usage.completion_tokens, 10);
        assert_eq!(usage.total_tokens, 100);
    }

    #[test]
    fn test_extract_reply_skips_non_text_blocks() {
        let body = r#"{
            "content": [
                { "type": "thinking", "thinking": "..." },
                { "type": "text", "text": "docs: expand readme" }
            ]
        }"#;
        let reply = extract_reply(body).expect("reply should parse");
        assert_eq!(reply.text, "docs: expand readme");
        assert!(reply.usage.is_none());
    }
}

//! The generation backend seam.
//!
//! Flows only see `StructuredBackend`: hand it a prompt and the required
//! output shape, get back JSON or an error. `LlmBackend` is the real one,
//! speaking to a chat-completion provider over HTTP.

use crate::config::FlowConfig;
use crate::debate::Prompt;
use crate::error::{Error, Result};
use crate::provider::{
    ChatMessage, CompletionRequest, FinishReason, LlmProvider, Provider, ResponseFormat,
};
use crate::schema::OutputSchema;
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

#[async_trait]
pub trait StructuredBackend: Send + Sync {
    /// One generation call. Returns the model's JSON reply, unvalidated.
    async fn invoke(&self, prompt: &Prompt, schema: &OutputSchema) -> Result<Value>;
}

/// Backend that talks to an LLM provider
pub struct LlmBackend {
    provider: Provider,
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<usize>,
}

impl LlmBackend {
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            model: None,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn from_config(config: &FlowConfig) -> Result<Self> {
        let provider = Provider::from_config(config.provider.clone())?;
        Ok(Self {
            provider,
            model: config.provider.default_model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    pub fn provider(&self) -> &Provider {
        &self.provider
    }

    fn build_request(&self, prompt: &Prompt, schema: &OutputSchema) -> CompletionRequest {
        let system = format!("{}\n\n{}", prompt.system, schema.to_instructions());
        let mut request = CompletionRequest::new(vec![
            ChatMessage::system(system),
            ChatMessage::user(prompt.user.clone()),
        ]);

        if let Some(model) = &self.model {
            request = request.with_model(model.clone());
        }
        if let Some(t) = self.temperature {
            request = request.with_temperature(t);
        }
        if let Some(max) = self.max_tokens {
            request = request.with_max_tokens(max);
        }
        if self.provider.supports_json_schema() {
            request = request.with_response_format(ResponseFormat::JsonSchema {
                name: schema.name.to_string(),
                schema: schema.to_json_schema(),
            });
        }
        request
    }
}

#[async_trait]
impl StructuredBackend for LlmBackend {
    async fn invoke(&self, prompt: &Prompt, schema: &OutputSchema) -> Result<Value> {
        let request = self.build_request(prompt, schema);
        let provider = self.provider.name().to_string();

        let response = self
            .provider
            .complete(request)
            .await
            .map_err(|e| e.into_error(&provider).with_operation("backend::invoke"))?;

        debug!(
            provider = %provider,
            model = %response.model,
            prompt_tokens = response.usage.prompt_tokens,
            completion_tokens = response.usage.completion_tokens,
            "completion received"
        );
        if response.finish_reason == FinishReason::Length {
            warn!(provider = %provider, "model reply was cut off at the token limit");
        }

        let content = response.content.ok_or_else(|| {
            Error::backend_failed("model returned no content")
                .with_operation("backend::invoke")
                .with_context("provider", provider.clone())
        })?;

        extract_json(&content)
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}

/// Pull the JSON object out of a model reply.
///
/// Accepts bare JSON, JSON inside a Markdown fence, or an object surrounded
/// by stray prose.
pub fn extract_json(content: &str) -> Result<Value> {
    let trimmed = content.trim();

    // Bare JSON may itself contain fences inside string values
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }

    let fenced = if trimmed.contains("```json") {
        trimmed
            .split("```json")
            .nth(1)
            .and_then(|s| s.split("```").next())
    } else if trimmed.starts_with("```") {
        trimmed.split("```").nth(1)
    } else {
        None
    };
    let candidate = fenced.map(str::trim).unwrap_or(trimmed);

    if let Ok(value) = serde_json::from_str::<Value>(candidate) {
        return Ok(value);
    }

    // Fall back to the outermost braces
    if let (Some(start), Some(end)) = (candidate.find('{'), candidate.rfind('}')) {
        if start < end {
            if let Ok(value) = serde_json::from_str::<Value>(&candidate[start..=end]) {
                return Ok(value);
            }
        }
    }

    Err(Error::parse_failed("model reply is not valid JSON")
        .with_operation("backend::extract_json")
        .with_context("reply", truncate(trimmed, 200)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderConfig;
    use crate::debate::DebateClaimFlow;
    use crate::error::ErrorKind;
    use crate::test_support::serve_once;
    use serde_json::json;

    fn prompt() -> Prompt {
        Prompt {
            system: "system text".into(),
            user: "user text".into(),
        }
    }

    #[test]
    fn test_extract_plain_json() {
        let value = extract_json(r#" {"advocateText": "a", "skepticText": "b"} "#).unwrap();
        assert_eq!(value["advocateText"], "a");
    }

    #[test]
    fn test_extract_fenced_json() {
        let reply = "Here you go:\n```json\n{\"advocateText\": \"a\"}\n```\nEnjoy.";
        assert_eq!(extract_json(reply).unwrap(), json!({ "advocateText": "a" }));

        let reply = "```\n{\"skepticText\": \"b\"}\n```";
        assert_eq!(extract_json(reply).unwrap(), json!({ "skepticText": "b" }));
    }

    #[test]
    fn test_extract_bare_json_with_fences_in_text() {
        let reply = r#"{"advocateText": "Wrap configs in ```json fences``` for clarity.", "skepticText": "Fences add noise."}"#;
        let value = extract_json(reply).unwrap();
        assert_eq!(value["advocateText"], "Wrap configs in ```json fences``` for clarity.");
        assert_eq!(value["skepticText"], "Fences add noise.");

        let reply = r#"{"advocateText": "```\nfn main() {}\n```", "skepticText": "b"}"#;
        assert_eq!(extract_json(reply).unwrap()["skepticText"], "b");
    }

    #[test]
    fn test_extract_object_inside_prose() {
        let reply = "Sure! {\"advocateText\": \"a\", \"skepticText\": \"b\"} Hope that helps.";
        assert_eq!(extract_json(reply).unwrap()["skepticText"], "b");
    }

    #[test]
    fn test_extract_rejects_prose() {
        let err = extract_json("I cannot help with that.").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseFailed);
        assert!(err.is_retryable());
        assert_eq!(err.context_value("reply"), Some("I cannot help with that."));
    }

    #[test]
    fn test_request_includes_schema() {
        let config = FlowConfig::new(ProviderConfig::openai("sk-test").with_model("gpt-4o-mini"))
            .with_temperature(0.4);
        let backend = LlmBackend::from_config(&config).unwrap();
        let schema = DebateClaimFlow::<LlmBackend>::output_schema();

        let request = backend.build_request(&prompt(), &schema);
        assert_eq!(request.model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(request.temperature, Some(0.4));
        assert!(request.messages[0].content.starts_with("system text"));
        assert!(request.messages[0].content.contains("\"advocateText\""));
        assert_eq!(request.messages[1].content, "user text");
        assert!(matches!(
            request.response_format,
            Some(ResponseFormat::JsonSchema { ref name, .. }) if name == "debate_claim"
        ));
    }

    #[test]
    fn test_anthropic_request_has_no_response_format() {
        let config = FlowConfig::new(ProviderConfig::anthropic("sk-ant"));
        let backend = LlmBackend::from_config(&config).unwrap();
        let request = backend.build_request(&prompt(), &DebateClaimFlow::<LlmBackend>::output_schema());
        assert!(request.response_format.is_none());
    }

    #[tokio::test]
    async fn test_invoke_end_to_end() {
        let body = json!({
            "id": "chatcmpl-9",
            "model": "local-model",
            "choices": [{
                "message": {"role": "assistant", "content": "```json\n{\"advocateText\":\"a\",\"skepticText\":\"b\"}\n```"},
                "finish_reason": "stop"
            }]
        })
        .to_string();
        let (base_url, _request) = serve_once(200, &body).await;

        let config = FlowConfig::new(ProviderConfig::local(base_url, "local-model"));
        let backend = LlmBackend::from_config(&config).unwrap();
        let schema = DebateClaimFlow::<LlmBackend>::output_schema();

        let value = backend.invoke(&prompt(), &schema).await.unwrap();
        assert_eq!(value, json!({ "advocateText": "a", "skepticText": "b" }));
    }

    #[tokio::test]
    async fn test_invoke_maps_server_errors() {
        let (base_url, _request) = serve_once(503, "overloaded").await;
        let config = FlowConfig::new(ProviderConfig::local(base_url, "m"));
        let backend = LlmBackend::from_config(&config).unwrap();

        let err = backend
            .invoke(&prompt(), &DebateClaimFlow::<LlmBackend>::output_schema())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BackendFailed);
        assert_eq!(err.operation(), "backend::invoke");
        assert_eq!(err.context_value("status"), Some("503"));
    }
}

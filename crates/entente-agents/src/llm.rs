//! HTTP backends for the LLM decision-maker.
//!
//! [`LlmBackend`] is a closed enum over the two supported providers, so
//! [`LlmBackend::complete`] stays a plain `async fn`. Both providers are
//! reached through `reqwest` and share one endpoint shape.
//!
//! Every request carries a [`ResponseSchema`]. OpenAI-compatible servers
//! get it as a `json_schema` response format. Anthropic gets it as the
//! input schema of one forced tool. The reply is always handed back as a
//! JSON string for [`crate::parse`].

use serde_json::{Value, json};

use crate::config::{BackendType, LlmBackendConfig, LlmConfig};
use crate::error::AgentError;
use crate::prompt::RenderedPrompt;
use crate::schema::ResponseSchema;

/// Sampling parameters shared by every request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sampling {
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum tokens per completion.
    pub max_tokens: u32,
}

/// Where a backend sends requests and how it samples.
struct Endpoint {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    sampling: Sampling,
}

impl Endpoint {
    fn new(config: &LlmBackendConfig, sampling: Sampling) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            sampling,
        }
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}/{path}", self.api_url))
            .header("Content-Type", "application/json")
    }
}

/// Send a request and decode its JSON body. Non-2xx statuses become
/// [`AgentError::Backend`] with the provider's error text attached.
async fn send(request: reqwest::RequestBuilder, provider: &str) -> Result<Value, AgentError> {
    let response = request
        .send()
        .await
        .map_err(|e| AgentError::Backend(format!("{provider} request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let detail = response
            .text()
            .await
            .unwrap_or_else(|e| format!("<body unreadable: {e}>"));
        return Err(AgentError::Backend(format!(
            "{provider} returned {status}: {detail}"
        )));
    }

    response
        .json()
        .await
        .map_err(|e| AgentError::Backend(format!("{provider} sent invalid JSON: {e}")))
}

// ---------------------------------------------------------------------------
// Backend dispatch
// ---------------------------------------------------------------------------

/// A configured LLM provider.
pub enum LlmBackend {
    /// Any server speaking the chat-completions protocol.
    OpenAi(OpenAiBackend),
    /// The Anthropic Messages API.
    Anthropic(AnthropicBackend),
}

impl LlmBackend {
    /// Ask the provider for a reply shaped by `schema`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Backend`] on transport failures, error
    /// statuses, refusals, or replies without usable content.
    pub async fn complete(
        &self,
        prompt: &RenderedPrompt,
        schema: &ResponseSchema,
    ) -> Result<String, AgentError> {
        match self {
            Self::OpenAi(backend) => backend.complete(prompt, schema).await,
            Self::Anthropic(backend) => backend.complete(prompt, schema).await,
        }
    }

    /// Provider label used in log fields.
    pub const fn name(&self) -> &str {
        match self {
            Self::OpenAi(_) => "openai-compatible",
            Self::Anthropic(_) => "anthropic",
        }
    }

    /// The model requests are sent to.
    pub fn model(&self) -> &str {
        match self {
            Self::OpenAi(backend) => &backend.endpoint.model,
            Self::Anthropic(backend) => &backend.endpoint.model,
        }
    }
}

/// Build the backend selected by `config`.
pub fn create_backend(config: &LlmConfig) -> LlmBackend {
    let sampling = Sampling {
        temperature: config.temperature,
        max_tokens: config.max_tokens,
    };
    let endpoint = Endpoint::new(&config.backend, sampling);
    match config.backend.backend_type {
        BackendType::OpenAi => LlmBackend::OpenAi(OpenAiBackend { endpoint }),
        BackendType::Anthropic => LlmBackend::Anthropic(AnthropicBackend { endpoint }),
    }
}

// ---------------------------------------------------------------------------
// Chat completions
// ---------------------------------------------------------------------------

/// Chat-completions backend: `POST {api_url}/chat/completions` with a
/// bearer token. Covers OpenAI, DeepSeek, and Ollama.
pub struct OpenAiBackend {
    endpoint: Endpoint,
}

impl OpenAiBackend {
    fn body(&self, prompt: &RenderedPrompt, schema: &ResponseSchema) -> Value {
        let Endpoint {
            model, sampling, ..
        } = &self.endpoint;
        json!({
            "model": model,
            "messages": [
                {"role": "system", "content": prompt.system},
                {"role": "user", "content": prompt.user}
            ],
            "temperature": sampling.temperature,
            "max_tokens": sampling.max_tokens,
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": schema.name,
                    "description": schema.description,
                    "schema": schema.schema,
                    "strict": schema.strict
                }
            }
        })
    }

    async fn complete(
        &self,
        prompt: &RenderedPrompt,
        schema: &ResponseSchema,
    ) -> Result<String, AgentError> {
        let request = self
            .endpoint
            .post("chat/completions")
            .bearer_auth(&self.endpoint.api_key)
            .json(&self.body(prompt, schema));
        let reply = send(request, "OpenAI").await?;
        extract_openai_content(&reply)
    }
}

/// The assistant message text of the first choice. A populated `refusal`
/// field is an error.
fn extract_openai_content(reply: &Value) -> Result<String, AgentError> {
    let message = reply.pointer("/choices/0/message");

    if let Some(refusal) = message
        .and_then(|m| m.get("refusal"))
        .and_then(Value::as_str)
    {
        return Err(AgentError::Backend(format!("OpenAI refused: {refusal}")));
    }

    message
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| AgentError::Backend("OpenAI reply has no message content".to_owned()))
}

// ---------------------------------------------------------------------------
// Anthropic messages
// ---------------------------------------------------------------------------

/// Anthropic backend: `POST {api_url}/messages` with an `x-api-key`
/// header. The system prompt is a top-level field and the schema is the
/// input of a tool the model is forced to call.
pub struct AnthropicBackend {
    endpoint: Endpoint,
}

impl AnthropicBackend {
    const API_VERSION: &'static str = "2023-06-01";

    fn body(&self, prompt: &RenderedPrompt, schema: &ResponseSchema) -> Value {
        let Endpoint {
            model, sampling, ..
        } = &self.endpoint;
        json!({
            "model": model,
            "max_tokens": sampling.max_tokens,
            "temperature": sampling.temperature,
            "system": prompt.system,
            "messages": [{"role": "user", "content": prompt.user}],
            "tools": [{
                "name": schema.name,
                "description": schema.description,
                "input_schema": schema.schema
            }],
            "tool_choice": {"type": "tool", "name": schema.name}
        })
    }

    async fn complete(
        &self,
        prompt: &RenderedPrompt,
        schema: &ResponseSchema,
    ) -> Result<String, AgentError> {
        let request = self
            .endpoint
            .post("messages")
            .header("x-api-key", &self.endpoint.api_key)
            .header("anthropic-version", Self::API_VERSION)
            .json(&self.body(prompt, schema));
        let reply = send(request, "Anthropic").await?;
        extract_anthropic_content(&reply)
    }
}

/// The input of the first `tool_use` block, serialised back to JSON, or
/// failing that the first text block.
fn extract_anthropic_content(reply: &Value) -> Result<String, AgentError> {
    let blocks = reply
        .get("content")
        .and_then(Value::as_array)
        .ok_or_else(|| AgentError::Backend("Anthropic reply has no content array".to_owned()))?;

    let tool_input = blocks
        .iter()
        .find(|b| b.get("type").and_then(Value::as_str) == Some("tool_use"))
        .and_then(|b| b.get("input"));
    if let Some(input) = tool_input {
        return Ok(serde_json::to_string(input)?);
    }

    blocks
        .iter()
        .find_map(|b| b.get("text").and_then(Value::as_str))
        .map(str::to_owned)
        .ok_or_else(|| {
            AgentError::Backend("Anthropic reply has neither a tool call nor text".to_owned())
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use entente_types::Power;

    use super::*;
    use crate::schema::press_schema;

    fn config(backend_type: BackendType) -> LlmConfig {
        LlmConfig {
            backend: LlmBackendConfig {
                backend_type,
                api_url: "http://localhost:9".to_owned(),
                api_key: "test".to_owned(),
                model: "test-model".to_owned(),
            },
            temperature: 0.5,
            max_tokens: 300,
            templates_dir: None,
        }
    }

    fn prompt() -> RenderedPrompt {
        RenderedPrompt {
            system: "You are FRANCE.".to_owned(),
            user: "Say something.".to_owned(),
        }
    }

    #[test]
    fn extract_openai_content_valid() {
        let json = serde_json::json!({
            "choices": [{
                "message": {"content": "{\"orders\": [\"A PAR - BUR\"]}"}
            }]
        });
        assert!(extract_openai_content(&json).unwrap().contains("A PAR - BUR"));
    }

    #[test]
    fn extract_openai_content_missing_or_refused() {
        let json = serde_json::json!({"error": "rate_limit"});
        assert!(extract_openai_content(&json).is_err());

        let json = serde_json::json!({
            "choices": [{"message": {"content": null, "refusal": "no"}}]
        });
        let err = extract_openai_content(&json).unwrap_err();
        assert!(err.to_string().contains("refused"));
    }

    #[test]
    fn extract_anthropic_prefers_tool_input() {
        let json = serde_json::json!({
            "content": [
                {"type": "text", "text": "Thinking..."},
                {"type": "tool_use", "name": "valid_orders", "input": {"orders": ["A PAR H"]}}
            ]
        });
        let text = extract_anthropic_content(&json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value, serde_json::json!({"orders": ["A PAR H"]}));
    }

    #[test]
    fn extract_anthropic_falls_back_to_text() {
        let json = serde_json::json!({"content": [{"type": "text", "text": "[\"A PAR H\"]"}]});
        assert_eq!(extract_anthropic_content(&json).unwrap(), "[\"A PAR H\"]");
        assert!(extract_anthropic_content(&serde_json::json!({"content": []})).is_err());
    }

    #[test]
    fn request_bodies_carry_the_schema() {
        let schema = press_schema(Power::France);

        let LlmBackend::OpenAi(openai) = create_backend(&config(BackendType::OpenAi)) else {
            panic!("expected the OpenAI backend");
        };
        let body = openai.body(&prompt(), &schema);
        assert_eq!(
            body.pointer("/response_format/json_schema/name"),
            Some(&serde_json::json!("press_message"))
        );
        assert_eq!(
            body.pointer("/response_format/json_schema/strict"),
            Some(&serde_json::json!(true))
        );
        assert_eq!(body.get("max_tokens"), Some(&serde_json::json!(300)));

        let LlmBackend::Anthropic(anthropic) = create_backend(&config(BackendType::Anthropic))
        else {
            panic!("expected the Anthropic backend");
        };
        let body = anthropic.body(&prompt(), &schema);
        assert_eq!(
            body.pointer("/tool_choice/name"),
            Some(&serde_json::json!("press_message"))
        );
        assert_eq!(body.pointer("/tools/0/input_schema"), Some(&schema.schema));
        assert_eq!(body.get("system"), Some(&serde_json::json!("You are FRANCE.")));
    }

    #[test]
    fn create_backend_dispatches_correctly() {
        let backend = create_backend(&config(BackendType::OpenAi));
        assert_eq!(backend.name(), "openai-compatible");
        assert_eq!(backend.model(), "test-model");
        assert_eq!(create_backend(&config(BackendType::Anthropic)).name(), "anthropic");
    }
}

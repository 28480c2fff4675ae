//! OpenAI-compatible chat client for fix generation
//!
//! The orchestrator depends only on the `generate_fix` input/output
//! contract, never on model internals. Any endpoint speaking the
//! `/chat/completions` shape works (hosted APIs, local servers).

use crate::{LlmConfig, LlmError, LlmResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const SYSTEM_PROMPT: &str = "You are a code-repair assistant. You are given one diagnostic \
from a static-analysis tool and the current content of the affected file. Reply with the \
complete corrected file in a single fenced code block, followed by a one-paragraph \
explanation of the change.";

/// Everything the fix service needs to know about one error.
#[derive(Debug, Clone, Serialize)]
pub struct FixRequest {
    pub module_name: String,
    pub current_code: String,
    pub error_type: String,
    pub error_message: String,
    /// Synthetic traceback locating the diagnostic
    pub traceback: String,
    pub source_file: String,
    /// Optional structural context (symbol usages, dependencies)
    pub structural_context: Option<String>,
}

/// A proposed fix as returned by the model.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FixResponse {
    pub fixed_code: String,
    pub explanation: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// Fix-generation client over an OpenAI-compatible endpoint.
pub struct LlmFixClient {
    config: LlmConfig,
    client: Client,
}

impl LlmFixClient {
    pub fn new(config: LlmConfig) -> LlmResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self { config, client })
    }

    /// Ask the model for a corrected version of the file.
    pub async fn generate_fix(&self, request: &FixRequest) -> LlmResult<FixResponse> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        let body = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: Self::build_prompt(request),
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let mut http_request = self.client.post(&url).json(&body);
        if let Some(key) = self.config.resolved_api_key() {
            http_request = http_request.bearer_auth(key);
        }

        let response = http_request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let detail = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(LlmError::Inference(format!(
                "fix service error ({status}): {detail}"
            )));
        }

        let chat: ChatResponse = response.json().await?;
        let content = chat
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| LlmError::Inference("empty completion from fix service".to_string()))?;

        let fixed_code = Self::extract_code_block(content).ok_or_else(|| {
            LlmError::Inference("completion contained no code block".to_string())
        })?;
        let explanation = Self::extract_explanation(content);

        Ok(FixResponse {
            fixed_code,
            explanation,
        })
    }

    fn build_prompt(request: &FixRequest) -> String {
        let mut prompt = format!(
            "Diagnostic in module `{}` ({}):\n\n{}\n\nTraceback:\n{}\n",
            request.module_name, request.source_file, request.error_message, request.traceback,
        );
        if let Some(context) = &request.structural_context {
            prompt.push_str("\nStructural context:\n");
            prompt.push_str(context);
            prompt.push('\n');
        }
        prompt.push_str("\nCurrent file content:\n```python\n");
        prompt.push_str(&request.current_code);
        prompt.push_str("\n```\n");
        prompt
    }

    /// The first fenced code block in the completion, language tag ignored.
    fn extract_code_block(text: &str) -> Option<String> {
        let start = text.find("```")?;
        let after_fence = &text[start + 3..];
        // Skip the language tag line if present
        let body_start = after_fence.find('\n')? + 1;
        let body = &after_fence[body_start..];
        let end = body.find("```")?;
        let code = body[..end].trim_end().to_string();
        if code.is_empty() {
            None
        } else {
            Some(code)
        }
    }

    /// Prose after the closing fence, if any.
    fn extract_explanation(text: &str) -> Option<String> {
        let start = text.find("```")?;
        let after_fence = &text[start + 3..];
        let body_start = after_fence.find('\n')? + 1;
        let body = &after_fence[body_start..];
        let end = body.find("```")?;
        let trailing = body[end + 3..].trim();
        if trailing.is_empty() {
            None
        } else {
            Some(trailing.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> FixRequest {
        FixRequest {
            module_name: "app".to_string(),
            current_code: "def f():\n    return x\n".to_string(),
            error_type: "F821".to_string(),
            error_message: "undefined name 'x'".to_string(),
            traceback: "F821: undefined name 'x' at app.py:2".to_string(),
            source_file: "app.py".to_string(),
            structural_context: None,
        }
    }

    fn config(base_url: String) -> LlmConfig {
        LlmConfig {
            base_url,
            api_key: Some("test-key".to_string()),
            ..LlmConfig::default()
        }
    }

    #[test]
    fn test_extract_code_block() {
        let text = "Here is the fix:\n```python\ndef f():\n    return 1\n```\nExplanation: x was undefined.";
        assert_eq!(
            LlmFixClient::extract_code_block(text).unwrap(),
            "def f():\n    return 1"
        );
        assert_eq!(
            LlmFixClient::extract_explanation(text).unwrap(),
            "Explanation: x was undefined."
        );
    }

    #[test]
    fn test_extract_code_block_absent() {
        assert!(LlmFixClient::extract_code_block("no fence here").is_none());
    }

    #[tokio::test]
    async fn test_generate_fix_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "message": {
                        "role": "assistant",
                        "content": "```python\ndef f():\n    x = 1\n    return x\n```\nDefined x before use."
                    }
                }]
            })))
            .mount(&server)
            .await;

        let client = LlmFixClient::new(config(server.uri())).unwrap();
        let response = client.generate_fix(&request()).await.unwrap();
        assert!(response.fixed_code.contains("x = 1"));
        assert_eq!(
            response.explanation.as_deref(),
            Some("Defined x before use.")
        );
    }

    #[tokio::test]
    async fn test_generate_fix_service_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let client = LlmFixClient::new(config(server.uri())).unwrap();
        let error = client.generate_fix(&request()).await.unwrap_err();
        assert!(matches!(error, LlmError::Inference(_)));
        assert!(error.to_string().contains("429"));
    }

    #[tokio::test]
    async fn test_generate_fix_without_code_block_is_inference_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "cannot fix"}}]
            })))
            .mount(&server)
            .await;

        let client = LlmFixClient::new(config(server.uri())).unwrap();
        assert!(client.generate_fix(&request()).await.is_err());
    }
}

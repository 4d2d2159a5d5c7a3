//! Mock LLM providers for integration testing
//!
//! Provides wiremock-based mock servers that simulate the OpenAI, Anthropic,
//! and Gemini APIs at the wire level.

use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Mock OpenAI API server
pub struct MockOpenAI {
    /// The underlying wiremock server.
    pub server: MockServer,
}

impl MockOpenAI {
    /// Create a new mock OpenAI server
    pub async fn new() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        self.server.uri()
    }

    /// Setup a successful chat completion response
    pub async fn mock_chat_completion(&self, model: &str, response_content: &str) {
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(openai_chat_response(model, response_content))
                    .append_header("Content-Type", "application/json"),
            )
            .mount(&self.server)
            .await;
    }

    /// Setup a chat completion that only matches a specific model, so tests
    /// can assert which model the gateway resolved.
    pub async fn mock_chat_completion_for_model(&self, model: &str, response_content: &str) {
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(json!({ "model": model })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(openai_chat_response(model, response_content)),
            )
            .mount(&self.server)
            .await;
    }

    /// Setup a server error response
    pub async fn mock_server_error(&self) {
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_json(openai_error_response("server_error", "Internal server error")),
            )
            .mount(&self.server)
            .await;
    }

    /// Setup a models list response (also serves the health check)
    pub async fn mock_models_list(&self) {
        Mock::given(method("GET"))
            .and(path("/v1/models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(openai_models_response()))
            .mount(&self.server)
            .await;
    }

    /// Serve the models list only `n` times, then fall through to later
    /// mounts. Used to fail health checks after an initial success.
    pub async fn mock_models_list_up_to(&self, n: u64) {
        Mock::given(method("GET"))
            .and(path("/v1/models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(openai_models_response()))
            .up_to_n_times(n)
            .mount(&self.server)
            .await;
    }

    /// Setup an authentication error on the models endpoint (fails health
    /// checks).
    pub async fn mock_models_auth_error(&self) {
        Mock::given(method("GET"))
            .and(path("/v1/models"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(openai_error_response(
                    "invalid_api_key",
                    "Incorrect API key provided",
                )),
            )
            .mount(&self.server)
            .await;
    }

    /// Setup a streaming response
    pub async fn mock_streaming_response(&self, model: &str, chunks: Vec<&str>) {
        let mut body = String::new();
        for chunk in &chunks {
            body.push_str(&format!(
                "data: {}\n\n",
                serde_json::to_string(&openai_streaming_chunk(model, chunk, false)).unwrap()
            ));
        }
        body.push_str(&format!(
            "data: {}\n\n",
            serde_json::to_string(&openai_streaming_chunk(model, "", true)).unwrap()
        ));
        body.push_str("data: [DONE]\n\n");

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(json!({"stream": true})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(body)
                    .append_header("Content-Type", "text/event-stream"),
            )
            .mount(&self.server)
            .await;
    }
}

/// Mock Anthropic API server
pub struct MockAnthropic {
    /// The underlying wiremock server.
    pub server: MockServer,
}

impl MockAnthropic {
    /// Create a new mock Anthropic server
    pub async fn new() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        self.server.uri()
    }

    /// Setup a successful message response
    pub async fn mock_messages(&self, model: &str, response_content: &str) {
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(anthropic_message_response(model, response_content)),
            )
            .mount(&self.server)
            .await;
    }

    /// Setup a server error response on the messages endpoint
    pub async fn mock_server_error(&self) {
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_json(anthropic_error_response("api_error", "Internal error")),
            )
            .mount(&self.server)
            .await;
    }

    /// Setup a models list response (also serves the health check)
    pub async fn mock_models_list(&self) {
        Mock::given(method("GET"))
            .and(path("/v1/models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(anthropic_models_response()))
            .mount(&self.server)
            .await;
    }

    /// Setup an authentication error on the models endpoint (fails health
    /// checks).
    pub async fn mock_models_auth_error(&self) {
        Mock::given(method("GET"))
            .and(path("/v1/models"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(anthropic_error_response(
                    "authentication_error",
                    "invalid x-api-key",
                )),
            )
            .mount(&self.server)
            .await;
    }

    /// Setup a streaming response
    pub async fn mock_streaming_response(&self, model: &str, chunks: Vec<&str>) {
        let mut body = String::new();

        body.push_str(&format!(
            "event: message_start\ndata: {}\n\n",
            serde_json::to_string(&json!({
                "type": "message_start",
                "message": {
                    "id": "msg_test123",
                    "type": "message",
                    "role": "assistant",
                    "model": model,
                    "content": []
                }
            }))
            .unwrap()
        ));

        for chunk in chunks {
            body.push_str(&format!(
                "event: content_block_delta\ndata: {}\n\n",
                serde_json::to_string(&json!({
                    "type": "content_block_delta",
                    "index": 0,
                    "delta": {
                        "type": "text_delta",
                        "text": chunk
                    }
                }))
                .unwrap()
            ));
        }

        body.push_str(&format!(
            "event: message_delta\ndata: {}\n\n",
            serde_json::to_string(&json!({
                "type": "message_delta",
                "delta": { "stop_reason": "end_turn", "stop_sequence": null },
                "usage": { "output_tokens": 12 }
            }))
            .unwrap()
        ));

        body.push_str(&format!(
            "event: message_stop\ndata: {}\n\n",
            serde_json::to_string(&json!({ "type": "message_stop" })).unwrap()
        ));

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(body_partial_json(json!({"stream": true})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(body)
                    .append_header("Content-Type", "text/event-stream"),
            )
            .mount(&self.server)
            .await;
    }
}

/// Mock Gemini API server
pub struct MockGemini {
    /// The underlying wiremock server.
    pub server: MockServer,
}

impl MockGemini {
    /// Create a new mock Gemini server
    pub async fn new() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        self.server.uri()
    }

    /// Setup a successful generateContent response
    pub async fn mock_generate_content(&self, response_content: &str) {
        Mock::given(method("POST"))
            .and(path_regex(r"^/v1beta/models/[^/]+:generateContent$"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(gemini_generate_response(response_content)),
            )
            .mount(&self.server)
            .await;
    }

    /// Setup a server error response on generateContent
    pub async fn mock_server_error(&self) {
        Mock::given(method("POST"))
            .and(path_regex(r"^/v1beta/models/[^/]+:generateContent$"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_json(gemini_error_response(500, "Internal error", "INTERNAL")),
            )
            .mount(&self.server)
            .await;
    }

    /// Setup a models list response (also serves the health check)
    pub async fn mock_models_list(&self) {
        Mock::given(method("GET"))
            .and(path("/v1beta/models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(gemini_models_response()))
            .mount(&self.server)
            .await;
    }

    /// Setup an authentication error on the models endpoint (fails health
    /// checks).
    pub async fn mock_models_auth_error(&self) {
        Mock::given(method("GET"))
            .and(path("/v1beta/models"))
            .respond_with(ResponseTemplate::new(403).set_body_json(gemini_error_response(
                403,
                "API key not valid",
                "PERMISSION_DENIED",
            )))
            .mount(&self.server)
            .await;
    }

    /// Setup a streaming response
    pub async fn mock_streaming_response(&self, chunks: Vec<&str>) {
        let mut body = String::new();
        let last = chunks.len().saturating_sub(1);
        for (i, chunk) in chunks.iter().enumerate() {
            let finish = if i == last { Some("STOP") } else { None };
            body.push_str(&format!(
                "data: {}\n\n",
                serde_json::to_string(&gemini_streaming_chunk(chunk, finish)).unwrap()
            ));
        }

        Mock::given(method("POST"))
            .and(path_regex(r"^/v1beta/models/[^/]+:streamGenerateContent$"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(body)
                    .append_header("Content-Type", "text/event-stream"),
            )
            .mount(&self.server)
            .await;
    }
}

// Helper functions for creating response payloads

fn openai_chat_response(model: &str, content: &str) -> Value {
    json!({
        "id": format!("chatcmpl-{}", uuid::Uuid::new_v4()),
        "object": "chat.completion",
        "created": chrono::Utc::now().timestamp(),
        "model": model,
        "choices": [
            {
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": content
                },
                "finish_reason": "stop"
            }
        ],
        "usage": {
            "prompt_tokens": 10,
            "completion_tokens": content.split_whitespace().count(),
            "total_tokens": 10 + content.split_whitespace().count()
        }
    })
}

fn openai_streaming_chunk(model: &str, content: &str, is_final: bool) -> Value {
    if is_final {
        json!({
            "id": "chatcmpl-test",
            "object": "chat.completion.chunk",
            "created": chrono::Utc::now().timestamp(),
            "model": model,
            "choices": [
                {
                    "index": 0,
                    "delta": {},
                    "finish_reason": "stop"
                }
            ]
        })
    } else {
        json!({
            "id": "chatcmpl-test",
            "object": "chat.completion.chunk",
            "created": chrono::Utc::now().timestamp(),
            "model": model,
            "choices": [
                {
                    "index": 0,
                    "delta": {
                        "content": content
                    },
                    "finish_reason": null
                }
            ]
        })
    }
}

fn openai_error_response(error_type: &str, message: &str) -> Value {
    json!({
        "error": {
            "type": error_type,
            "message": message,
            "param": null,
            "code": error_type
        }
    })
}

fn openai_models_response() -> Value {
    json!({
        "object": "list",
        "data": [
            {
                "id": "gpt-4o",
                "object": "model",
                "created": 1698959748,
                "owned_by": "openai"
            },
            {
                "id": "gpt-4o-mini",
                "object": "model",
                "created": 1698959748,
                "owned_by": "openai"
            }
        ]
    })
}

fn anthropic_message_response(model: &str, content: &str) -> Value {
    json!({
        "id": format!("msg_{}", uuid::Uuid::new_v4()),
        "type": "message",
        "role": "assistant",
        "content": [
            {
                "type": "text",
                "text": content
            }
        ],
        "model": model,
        "stop_reason": "end_turn",
        "stop_sequence": null,
        "usage": {
            "input_tokens": 10,
            "output_tokens": content.split_whitespace().count()
        }
    })
}

fn anthropic_error_response(error_type: &str, message: &str) -> Value {
    json!({
        "type": "error",
        "error": {
            "type": error_type,
            "message": message
        }
    })
}

fn anthropic_models_response() -> Value {
    json!({
        "data": [
            {
                "id": "claude-3-5-sonnet-latest",
                "display_name": "Claude 3.5 Sonnet",
                "type": "model"
            },
            {
                "id": "claude-3-5-haiku-latest",
                "display_name": "Claude 3.5 Haiku",
                "type": "model"
            }
        ],
        "has_more": false
    })
}

fn gemini_generate_response(content: &str) -> Value {
    json!({
        "candidates": [
            {
                "content": {
                    "role": "model",
                    "parts": [
                        { "text": content }
                    ]
                },
                "finishReason": "STOP",
                "index": 0
            }
        ],
        "usageMetadata": {
            "promptTokenCount": 10,
            "candidatesTokenCount": content.split_whitespace().count(),
            "totalTokenCount": 10 + content.split_whitespace().count()
        }
    })
}

fn gemini_streaming_chunk(content: &str, finish_reason: Option<&str>) -> Value {
    let mut candidate = json!({
        "content": {
            "role": "model",
            "parts": [
                { "text": content }
            ]
        },
        "index": 0
    });
    if let Some(reason) = finish_reason {
        candidate["finishReason"] = json!(reason);
    }
    json!({ "candidates": [candidate] })
}

fn gemini_error_response(code: u16, message: &str, status: &str) -> Value {
    json!({
        "error": {
            "code": code,
            "message": message,
            "status": status
        }
    })
}

fn gemini_models_response() -> Value {
    json!({
        "models": [
            {
                "name": "models/gemini-1.5-flash",
                "displayName": "Gemini 1.5 Flash"
            },
            {
                "name": "models/gemini-1.5-pro",
                "displayName": "Gemini 1.5 Pro"
            }
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_openai_chat() {
        let mock = MockOpenAI::new().await;
        mock.mock_chat_completion("gpt-4o", "Hello!").await;

        let client = reqwest_client();
        let response = client
            .post(format!("{}/v1/chat/completions", mock.url()))
            .json(&json!({
                "model": "gpt-4o",
                "messages": [{"role": "user", "content": "Hi"}]
            }))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["choices"][0]["message"]["content"], "Hello!");
    }

    #[tokio::test]
    async fn test_mock_anthropic_messages() {
        let mock = MockAnthropic::new().await;
        mock.mock_messages("claude-3-5-sonnet-latest", "Hi there!")
            .await;

        let client = reqwest_client();
        let response = client
            .post(format!("{}/v1/messages", mock.url()))
            .header("x-api-key", "test-key")
            .header("anthropic-version", "2023-06-01")
            .json(&json!({
                "model": "claude-3-5-sonnet-latest",
                "max_tokens": 1024,
                "messages": [{"role": "user", "content": "Hello"}]
            }))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["content"][0]["text"], "Hi there!");
    }

    #[tokio::test]
    async fn test_mock_gemini_generate() {
        let mock = MockGemini::new().await;
        mock.mock_generate_content("Howdy!").await;

        let client = reqwest_client();
        let response = client
            .post(format!(
                "{}/v1beta/models/gemini-1.5-flash:generateContent?key=test",
                mock.url()
            ))
            .json(&json!({
                "contents": [{"role": "user", "parts": [{"text": "Hello"}]}]
            }))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["candidates"][0]["content"]["parts"][0]["text"], "Howdy!");
    }

    fn reqwest_client() -> reqwest::Client {
        reqwest::Client::new()
    }
}

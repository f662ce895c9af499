use crate::config::LlmConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, trace};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Errors raised by the completion API call
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("completion request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("completion API returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed completion response: {0}")]
    MalformedBody(String),
}

/// A single-turn text completion backend
pub trait CompletionProvider {
    async fn complete(&self, prompt: &str) -> Result<String, ApiError>;
}

impl<P: CompletionProvider> CompletionProvider for &P {
    async fn complete(&self, prompt: &str) -> Result<String, ApiError> {
        (**self).complete(prompt).await
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
}

/// Anthropic Messages API provider
pub struct AnthropicProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicProvider {
    /// Create a provider with an explicit request timeout
    pub fn new(api_key: &str, config: &LlmConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(ApiError::Client)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }
}

impl CompletionProvider for AnthropicProvider {
    async fn complete(&self, prompt: &str) -> Result<String, ApiError> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };
        debug!(
            "Sending completion request: model={}, prompt_chars={}",
            self.model,
            prompt.chars().count()
        );

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(ApiError::Transport)?;

        let status = response.status();
        let body = response.text().await.map_err(ApiError::Transport)?;
        trace!("Completion response ({}): {}", status, body);

        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: MessagesResponse =
            serde_json::from_str(&body).map_err(|e| ApiError::MalformedBody(e.to_string()))?;
        parsed
            .content
            .into_iter()
            .find(|block| block.block_type == "text")
            .and_then(|block| block.text)
            .ok_or_else(|| ApiError::MalformedBody("no text content block".into()))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{Value, json};
    use std::sync::{Arc, Mutex};

    /// Requests received by a fake completion server
    pub type Received = Arc<Mutex<Vec<(HeaderMap, Value)>>>;

    /// Serve `reply_text` as the text block of every Messages API call
    pub async fn serve_text(reply_text: &str) -> (String, Received) {
        let received: Received = Arc::default();
        let log = received.clone();
        let reply = reply_text.to_string();
        let app = Router::new().route(
            "/v1/messages",
            post(move |headers: HeaderMap, Json(body): Json<Value>| {
                let log = log.clone();
                let reply = reply.clone();
                async move {
                    log.lock().unwrap().push((headers, body));
                    Json(json!({
                        "id": "msg_test",
                        "type": "message",
                        "role": "assistant",
                        "content": [{ "type": "text", "text": reply }],
                    }))
                }
            }),
        );
        (spawn(app).await, received)
    }

    /// Serve a fixed status and body for every call
    pub async fn serve_status(status: StatusCode, body: &'static str) -> String {
        let app = Router::new().route("/v1/messages", post(move || async move { (status, body) }));
        spawn(app).await
    }

    /// Serve a JSON body for every call
    pub async fn serve_json(body: Value) -> String {
        let app = Router::new().route(
            "/v1/messages",
            post(move || {
                let body = body.clone();
                async move { Json(body) }
            }),
        );
        spawn(app).await
    }

    /// Base URL on which nothing is listening
    pub async fn dead_url() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}", addr)
    }

    async fn spawn(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use serde_json::json;

    fn config(base_url: &str) -> LlmConfig {
        LlmConfig {
            base_url: base_url.to_string(),
            timeout_secs: 5,
            ..LlmConfig::default()
        }
    }

    #[tokio::test]
    async fn test_complete_returns_text_block() {
        let (url, received) = testing::serve_text("{\"violations\":[]}").await;
        let provider = AnthropicProvider::new("secret", &config(&url)).unwrap();

        let text = provider.complete("check this").await.unwrap();
        assert_eq!(text, "{\"violations\":[]}");

        let received = received.lock().unwrap();
        assert_eq!(received.len(), 1);
        let (headers, body) = &received[0];
        assert_eq!(headers["x-api-key"], "secret");
        assert_eq!(headers["anthropic-version"], ANTHROPIC_VERSION);
        assert_eq!(body["model"], LlmConfig::default().model);
        assert_eq!(body["max_tokens"], 4096);
        assert_eq!(
            body["messages"],
            json!([{ "role": "user", "content": "check this" }])
        );
    }

    #[tokio::test]
    async fn test_trailing_slash_in_base_url() {
        let (url, _) = testing::serve_text("ok").await;
        let provider = AnthropicProvider::new("k", &config(&format!("{}/", url))).unwrap();
        assert_eq!(provider.complete("x").await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn test_non_success_status() {
        let url = testing::serve_status(StatusCode::TOO_MANY_REQUESTS, "slow down").await;
        let provider = AnthropicProvider::new("k", &config(&url)).unwrap();

        match provider.complete("x").await {
            Err(ApiError::Status { status, body }) => {
                assert_eq!(status, 429);
                assert_eq!(body, "slow down");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_text_block() {
        let url = testing::serve_json(json!({ "content": [] })).await;
        let provider = AnthropicProvider::new("k", &config(&url)).unwrap();
        assert!(matches!(
            provider.complete("x").await,
            Err(ApiError::MalformedBody(_))
        ));
    }

    #[tokio::test]
    async fn test_body_without_content() {
        let url = testing::serve_json(json!({ "error": "nope" })).await;
        let provider = AnthropicProvider::new("k", &config(&url)).unwrap();
        assert!(matches!(
            provider.complete("x").await,
            Err(ApiError::MalformedBody(_))
        ));
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let url = testing::dead_url().await;
        let provider = AnthropicProvider::new("k", &config(&url)).unwrap();
        assert!(matches!(
            provider.complete("x").await,
            Err(ApiError::Transport(_))
        ));
    }
}

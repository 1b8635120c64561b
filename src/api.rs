//! Generative AI text client.
//!
//! [`GenAiClient`] is the seam the summarizer talks to; [`OpenAiCompatClient`]
//! implements it against any OpenAI-compatible `chat/completions` endpoint.
//! Gemini is reached through its OpenAI compatibility layer.
//!
//! No retries: a failed call fails the run.

use crate::error::ClientError;
use crate::utils::millis;
use clap::ValueEnum;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};

/// Sends a prompt and returns the generated text.
pub trait GenAiClient: Send + Sync {
    fn send(&self, prompt: &str) -> impl Future<Output = Result<String, ClientError>> + Send;
}

/// Which hosted API to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ApiKind {
    #[default]
    Gemini,
    Openai,
}

impl ApiKind {
    pub fn default_base_url(self) -> &'static str {
        match self {
            ApiKind::Gemini => "https://generativelanguage.googleapis.com/v1beta/openai",
            ApiKind::Openai => "https://api.openai.com/v1",
        }
    }

    pub fn default_api_key_env(self) -> &'static str {
        match self {
            ApiKind::Gemini => "GEMINI_API_KEY",
            ApiKind::Openai => "OPENAI_API_KEY",
        }
    }
}

impl fmt::Display for ApiKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiKind::Gemini => f.write_str("gemini"),
            ApiKind::Openai => f.write_str("openai"),
        }
    }
}

/// Client for OpenAI-compatible chat completion APIs.
#[derive(Clone)]
pub struct OpenAiCompatClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    timeout_secs: u64,
}

impl fmt::Debug for OpenAiCompatClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiCompatClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl OpenAiCompatClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Http(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            timeout_secs: timeout.as_secs(),
        })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl GenAiClient for OpenAiCompatClient {
    #[instrument(level = "info", skip_all, fields(model = %self.model, prompt_len = prompt.len()))]
    async fn send(&self, prompt: &str) -> Result<String, ClientError> {
        let t0 = Instant::now();
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ClientError::Timeout(self.timeout_secs)
                } else {
                    ClientError::Http(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let status_code = status.as_u16();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            warn!(
                status_code,
                elapsed_ms = millis(t0.elapsed()),
                %message,
                "API call failed"
            );
            return Err(ClientError::Api {
                status_code,
                message,
            });
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Http(format!("failed to parse LLM response: {e}")))?;
        let text = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(ClientError::EmptyReply)?;

        info!(
            elapsed_ms = millis(t0.elapsed()),
            reply_len = text.len(),
            "API call succeeded"
        );
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> OpenAiCompatClient {
        OpenAiCompatClient::new(&server.uri(), "test-key", "test-model", Duration::from_secs(5))
            .unwrap()
    }

    #[tokio::test]
    async fn test_send_returns_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({"model": "test-model"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "mock summary"}}]
            })))
            .mount(&server)
            .await;

        let reply = client(&server).send("hello").await.unwrap();
        assert_eq!(reply, "mock summary");
    }

    #[tokio::test]
    async fn test_api_error_message_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"message": "bad model"}
            })))
            .mount(&server)
            .await;

        let err = client(&server).send("hello").await.unwrap_err();
        match err {
            ClientError::Api {
                status_code,
                message,
            } => {
                assert_eq!(status_code, 400);
                assert_eq!(message, "bad model");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_reply_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let err = client(&server).send("hello").await.unwrap_err();
        assert!(matches!(err, ClientError::EmptyReply));
    }

    #[test]
    fn test_api_kind_defaults() {
        assert_eq!(ApiKind::default(), ApiKind::Gemini);
        assert_eq!(ApiKind::Gemini.default_api_key_env(), "GEMINI_API_KEY");
        assert!(ApiKind::Openai.default_base_url().ends_with("/v1"));
        assert_eq!(ApiKind::Openai.to_string(), "openai");
    }
}

//! HTTP reasoning backends: OpenAI-compatible chat completions and Gemini.

use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use super::{Reasoner, ReasoningError};
use crate::config::{Provider, ReasoningConfig};

const HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";
const GEMINI_DEFAULT_MODEL: &str = "gemini-2.0-flash";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Backend {
    OpenAi,
    Gemini,
}

#[derive(Debug)]
pub struct HttpReasoner {
    client: Client,
    backend: Backend,
    base_url: String,
    model: String,
    api_key: String,
}

impl HttpReasoner {
    /// Resolve the provider and credentials from `config` and the environment.
    pub fn from_config(config: &ReasoningConfig) -> Result<Self, ReasoningError> {
        let google_key = non_empty_env("GOOGLE_API_KEY");
        let openai_key = non_empty_env("OPENAI_API_KEY");
        let (backend, api_key) = resolve_backend(config.provider, google_key, openai_key)?;

        let (default_base, default_model) = match backend {
            Backend::OpenAi => (OPENAI_BASE_URL, OPENAI_DEFAULT_MODEL),
            Backend::Gemini => (GEMINI_BASE_URL, GEMINI_DEFAULT_MODEL),
        };

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("lore/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ReasoningError::Fatal(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            backend,
            base_url: config
                .endpoint
                .clone()
                .unwrap_or_else(|| default_base.to_string())
                .trim_end_matches('/')
                .to_string(),
            model: config
                .model
                .clone()
                .unwrap_or_else(|| default_model.to_string()),
            api_key,
        })
    }

    /// `provider/model`, for progress output.
    pub fn describe(&self) -> String {
        let provider = match self.backend {
            Backend::OpenAi => "openai",
            Backend::Gemini => "gemini",
        };
        format!("{provider}/{}", self.model)
    }

    fn complete_openai(&self, prompt: &str) -> Result<String, ReasoningError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
        });
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(classify_transport)?;
        let parsed: ChatResponse = read_json(response)?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| ReasoningError::Transient("empty completion".to_string()))
    }

    fn complete_gemini(&self, prompt: &str) -> Result<String, ReasoningError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": { "temperature": 0.7, "topP": 0.95, "topK": 40 },
        });
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .map_err(classify_transport)?;
        let parsed: GeminiResponse = read_json(response)?;
        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(ReasoningError::Transient("empty completion".to_string()));
        }
        Ok(text)
    }
}

impl Reasoner for HttpReasoner {
    fn complete(&self, prompt: &str) -> Result<String, ReasoningError> {
        debug!(model = %self.model, prompt_chars = prompt.len(), "reasoning call");
        match self.backend {
            Backend::OpenAi => self.complete_openai(prompt),
            Backend::Gemini => self.complete_gemini(prompt),
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn resolve_backend(
    provider: Provider,
    google_key: Option<String>,
    openai_key: Option<String>,
) -> Result<(Backend, String), ReasoningError> {
    let missing = |var: &str| {
        ReasoningError::Fatal(format!("{var} is not set; export it to use this provider"))
    };
    match provider {
        Provider::Gemini => google_key
            .map(|k| (Backend::Gemini, k))
            .ok_or_else(|| missing("GOOGLE_API_KEY")),
        Provider::OpenAi => openai_key
            .map(|k| (Backend::OpenAi, k))
            .ok_or_else(|| missing("OPENAI_API_KEY")),
        Provider::Auto => google_key
            .map(|k| (Backend::Gemini, k))
            .or_else(|| openai_key.map(|k| (Backend::OpenAi, k)))
            .ok_or_else(|| {
                ReasoningError::Fatal(
                    "no API key found; set GOOGLE_API_KEY or OPENAI_API_KEY".to_string(),
                )
            }),
    }
}

fn classify_transport(err: reqwest::Error) -> ReasoningError {
    if err.is_timeout() || err.is_connect() || err.is_request() {
        ReasoningError::Transient(err.to_string())
    } else {
        ReasoningError::Fatal(err.to_string())
    }
}

fn classify_status(status: u16, body: &str) -> ReasoningError {
    let detail = format!("HTTP {status}: {}", crate::utils::truncate(body.trim(), 300));
    if status == 408 || status == 429 || status >= 500 {
        ReasoningError::Transient(detail)
    } else {
        ReasoningError::Fatal(detail)
    }
}

fn read_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::blocking::Response,
) -> Result<T, ReasoningError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(classify_status(status.as_u16(), &body));
    }
    response
        .json::<T>()
        .map_err(|e| ReasoningError::Fatal(format!("unexpected response body: {e}")))
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

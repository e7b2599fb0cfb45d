use std::fmt;
use std::path::PathBuf;

use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};

use crate::config::ServiceConfig;
use crate::prompting;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Everything the generation service is given for one attempt. Prior state
/// is absent on the first generation of an artifact.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub current_input: String,
    pub prompt: String,
    pub previous_input: Option<String>,
    pub previous_output: Option<String>,
    pub output_path: PathBuf,
}

#[derive(Debug)]
pub enum GenerateError {
    /// The service declined to produce content for policy reasons.
    Refused(String),
    /// Transport failure, non-success status, or a malformed response.
    Request(String),
}

impl fmt::Display for GenerateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerateError::Refused(reason) => write!(f, "refused: {}", reason),
            GenerateError::Request(reason) => write!(f, "service request failed: {}", reason),
        }
    }
}

impl std::error::Error for GenerateError {}

/// The generation capability the transaction depends on. Injectable so tests
/// can run the full transaction without a live service.
pub trait Generator {
    fn generate(&self, req: &GenerateRequest) -> Result<String, GenerateError>;
}

/// OpenAI-compatible chat-completions client over blocking reqwest.
pub struct OpenAiGenerator {
    service: ServiceConfig,
}

impl OpenAiGenerator {
    pub fn new(service: ServiceConfig) -> Self {
        Self { service }
    }

    fn endpoint(&self) -> String {
        let base = self
            .service
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/');

        format!("{}/chat/completions", base)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f64>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize, Default)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

impl Generator for OpenAiGenerator {
    fn generate(&self, req: &GenerateRequest) -> Result<String, GenerateError> {
        let message = prompting::render_message(req);

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("redraft"));

        if let Some(key) = &self.service.api_key {
            let auth_value = format!("Bearer {}", key);
            let value = HeaderValue::from_str(&auth_value)
                .map_err(|e| GenerateError::Request(format!("invalid API key header: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| GenerateError::Request(format!("failed to build HTTP client: {}", e)))?;

        let body = ChatRequest {
            model: self.service.model.as_deref().unwrap_or(DEFAULT_MODEL),
            messages: vec![ChatMessage {
                role: "user",
                content: &message,
            }],
            seed: self.service.seed,
            temperature: self.service.temperature,
            top_p: self.service.top_p,
        };

        let resp = client
            .post(self.endpoint())
            .json(&body)
            .send()
            .map_err(|e| GenerateError::Request(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().unwrap_or_default();
            return Err(GenerateError::Request(format!(
                "service returned {}: {}",
                status, text
            )));
        }

        let parsed: ChatResponse = resp
            .json()
            .map_err(|e| GenerateError::Request(format!("malformed service response: {}", e)))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| GenerateError::Request("service returned no choices".to_string()))?;

        match choice.message.refusal {
            Some(refusal) if !refusal.is_empty() => Err(GenerateError::Refused(refusal)),
            _ => Ok(choice.message.content.unwrap_or_default()),
        }
    }
}

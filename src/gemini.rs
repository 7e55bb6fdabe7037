//! Model invocation against the Generative Language API
//!
//! [`ModelClient`] is the seam between the retry orchestrator and the
//! network: one call in, raw text out. No retry logic lives here and errors
//! are surfaced unchanged; classification and repair belong to the caller.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::DresscastError;
use crate::config::GeminiConfig;

/// Timeout for a single generation call
const MODEL_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Sampling parameters for one generation call
#[derive(Debug, Clone)]
pub struct GenerationParams {
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

/// How a single call is allowed to generate.
///
/// Search grounding and schema-constrained output are mutually exclusive
/// modes in the underlying API, so the type admits exactly one of them.
#[derive(Debug, Clone)]
pub enum GenerationMode {
    /// Let the model consult Google Search for live facts
    Grounded { params: GenerationParams },
    /// Constrain the output to a JSON response schema
    Structured { params: GenerationParams, schema: Value },
}

impl GenerationMode {
    /// Grounded, low-temperature mode for weather retrieval
    #[must_use]
    pub fn grounded_weather() -> Self {
        GenerationMode::Grounded {
            params: GenerationParams {
                temperature: 0.2,
                top_p: 0.8,
                top_k: 20,
                max_output_tokens: 2048,
            },
        }
    }

    /// Schema-constrained mode for suggestion generation
    #[must_use]
    pub fn structured_suggestions() -> Self {
        GenerationMode::Structured {
            params: GenerationParams {
                temperature: 0.7,
                top_p: 0.95,
                top_k: 40,
                max_output_tokens: 4096,
            },
            schema: suggestions_response_schema(),
        }
    }

    fn params(&self) -> &GenerationParams {
        match self {
            GenerationMode::Grounded { params } | GenerationMode::Structured { params, .. } => {
                params
            }
        }
    }
}

/// A single-call generative model client
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Perform exactly one generation call and return the raw output text,
    /// which may still contain prose or markdown around the JSON payload.
    async fn generate(&self, prompt: &str, mode: &GenerationMode)
    -> Result<String, DresscastError>;
}

/// [`ModelClient`] implementation over the Generative Language REST API
pub struct GeminiClient {
    client: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(MODEL_CALL_TIMEOUT)
            .user_agent(concat!("dresscast/", env!("CARGO_PKG_VERSION")))
            .build()
            .with_context(|| "Failed to create HTTP client")?;

        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

/// Build the generateContent request body for a prompt and mode.
#[must_use]
pub fn request_body(prompt: &str, mode: &GenerationMode) -> Value {
    let params = mode.params();
    let mut generation_config = json!({
        "temperature": params.temperature,
        "topP": params.top_p,
        "topK": params.top_k,
        "maxOutputTokens": params.max_output_tokens,
    });

    let mut body = json!({
        "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
    });

    match mode {
        GenerationMode::Grounded { .. } => {
            body["tools"] = json!([{ "google_search": {} }]);
        }
        GenerationMode::Structured { schema, .. } => {
            generation_config["responseMimeType"] = json!("application/json");
            generation_config["responseSchema"] = schema.clone();
        }
    }

    body["generationConfig"] = generation_config;
    body
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate's parts
    fn first_text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.is_empty() { None } else { Some(text) }
    }
}

#[async_trait]
impl ModelClient for GeminiClient {
    async fn generate(
        &self,
        prompt: &str,
        mode: &GenerationMode,
    ) -> Result<String, DresscastError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| DresscastError::config("Gemini API key is not configured"))?;

        debug!(model = %self.config.model, grounded = matches!(mode, GenerationMode::Grounded { .. }), "calling model");

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&request_body(prompt, mode))
            .send()
            .await
            .map_err(|e| DresscastError::model(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(200).collect();
            return Err(DresscastError::model(format!(
                "model service returned {status}: {snippet}"
            )));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| DresscastError::model(format!("unreadable model response: {e}")))?;

        parsed
            .first_text()
            .map(|t| t.trim().to_string())
            .ok_or_else(|| DresscastError::model("model returned no candidate text"))
    }
}

/// Response schema hint for the suggestions array, mirroring the wire shape
/// of [`crate::models::SuggestionEntry`].
#[must_use]
pub fn suggestions_response_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "member": { "type": "STRING" },
                "outfit": { "type": "ARRAY", "items": { "type": "STRING" } },
                "notes": { "type": "STRING" }
            },
            "required": ["member", "outfit", "notes"]
        }
    })
}

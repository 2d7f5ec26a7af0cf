//! Wire format and HTTP client for the Gemini `generateContent` endpoints.
//! The same request shape serves both the vision endpoint (text + inline
//! image) and the text-only endpoint (text alone).

use crate::config::ServiceConfig;
use crate::error::AnalysisError;
use crate::normalize::NormalizedImage;
use serde::{Deserialize, Serialize};
use tracing::*;

const VISION_PROMPT: &str = "
    Analyze this palm image for palmistry features. Please provide:
    1. Hand shape and size analysis
    2. Major palm lines (heart line, head line, life line, fate line)
    3. Mount analysis (Venus, Jupiter, Saturn, Apollo, Mercury, Mars, Moon)
    4. Finger analysis (length, shape, flexibility)
    5. General palmistry insights and personality traits
    6. Career and relationship predictions based on palm features
    7. Health indicators visible in the palm

    Please provide detailed, professional palmistry analysis in a structured format.
    ";

const FALLBACK_PROMPT: &str = "
    The palm image for this reading could not be examined. Instead, provide a
    general palmistry reading that explains:
    1. How hand shape and size are interpreted
    2. The meaning of the major palm lines (heart line, head line, life line, fate line)
    3. The mounts of the palm (Venus, Jupiter, Saturn, Apollo, Mercury, Mars, Moon)
    4. What finger length, shape and flexibility are said to reveal
    5. Common personality, career and relationship themes in palmistry
    6. Health indicators traditionally associated with the palm

    Make clear that this is a general reading, not one based on the user's own palm.
    ";

/// Which prompt to send. Only the vision prompt carries an image.
#[derive(Debug, Clone, Copy)]
pub enum Template<'a> {
    Vision(&'a NormalizedImage),
    Fallback,
}

/// Generation parameters. Fixed for every request.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f64,
    pub top_k: u32,
    pub top_p: f64,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        GenerationConfig {
            temperature: 0.7,
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 2048,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InlineData {
    pub mime_type: &'static str,
    pub data: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Clone, Serialize)]
pub struct Content {
    pub parts: Vec<Part>,
}

/// A request body for either endpoint
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

impl AnalysisRequest {
    pub fn build(template: Template<'_>) -> Self {
        let parts = match template {
            Template::Vision(image) => vec![
                Part::Text {
                    text: VISION_PROMPT.into(),
                },
                Part::InlineData {
                    inline_data: InlineData {
                        mime_type: NormalizedImage::MIME_TYPE,
                        data: image.to_base64(),
                    },
                },
            ],
            Template::Fallback => vec![Part::Text {
                text: FALLBACK_PROMPT.into(),
            }],
        };

        AnalysisRequest {
            contents: vec![Content { parts }],
            generation_config: GenerationConfig::default(),
        }
    }

    pub fn has_image(&self) -> bool {
        self.contents
            .iter()
            .flat_map(|c| &c.parts)
            .any(|p| matches!(p, Part::InlineData { .. }))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Option<Vec<Candidate>>,
    #[serde(default)]
    pub error: Option<ErrorDetail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Option<Vec<ResponsePart>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponsePart {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub code: Option<u16>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl GenerateResponse {
    /// `candidates[0].content.parts[0].text`, if every step is present
    pub fn first_text(&self) -> Option<&str> {
        self.candidates
            .as_ref()?
            .first()?
            .content
            .as_ref()?
            .parts
            .as_ref()?
            .first()?
            .text
            .as_deref()
    }

    pub fn has_candidates(&self) -> bool {
        self.candidates.as_ref().is_some_and(|c| !c.is_empty())
    }
}

/// How a call to the backend failed
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamFailure {
    /// The backend says the requested model does not exist
    ModelNotFound(String),

    /// Timeouts, transport errors, other error bodies, unparseable bodies
    Other(String),
}

impl UpstreamFailure {
    const MODEL_NOT_FOUND: &'static str = "not found";

    /// Tag an upstream error message, recognising the missing-model signature
    pub fn classify(message: String) -> Self {
        if message.to_lowercase().contains(Self::MODEL_NOT_FOUND) {
            UpstreamFailure::ModelNotFound(message)
        } else {
            UpstreamFailure::Other(message)
        }
    }

    pub fn message(&self) -> &str {
        match self {
            UpstreamFailure::ModelNotFound(m) | UpstreamFailure::Other(m) => m,
        }
    }
}

impl From<reqwest::Error> for UpstreamFailure {
    fn from(err: reqwest::Error) -> Self {
        // the url carries the api key
        let err = err.without_url();
        if err.is_timeout() {
            UpstreamFailure::Other(format!("request timed out: {err}"))
        } else {
            UpstreamFailure::Other(err.to_string())
        }
    }
}

/// The generation endpoints
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Endpoint {
    Vision,
    Text,
}

/// A client for both generation endpoints
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    config: ServiceConfig,
}

impl GeminiClient {
    pub fn new(config: ServiceConfig) -> Result<Self, AnalysisError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| AnalysisError::Configuration(e.to_string()))?;
        Ok(GeminiClient { client, config })
    }

    pub fn api_key(&self) -> Option<&str> {
        self.config.api_key()
    }

    fn url(&self, endpoint: Endpoint) -> &str {
        match endpoint {
            Endpoint::Vision => self.config.vision_url(),
            Endpoint::Text => self.config.text_url(),
        }
    }

    /// POST `request` to `endpoint`, authenticated with `key`
    pub async fn generate(
        &self,
        endpoint: Endpoint,
        key: &str,
        request: &AnalysisRequest,
    ) -> Result<GenerateResponse, UpstreamFailure> {
        debug!(
            "sending generation request to {endpoint:?} endpoint (image: {})",
            request.has_image()
        );

        let response = self
            .client
            .post(self.url(endpoint))
            .query(&[("key", key)])
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let parsed: Option<GenerateResponse> = serde_json::from_str(&body).ok();

        if let Some(message) = parsed
            .as_ref()
            .and_then(|r| r.error.as_ref())
            .and_then(|e| e.message.clone())
        {
            warn!("{endpoint:?} endpoint returned an error ({status}): {message}");
            return Err(UpstreamFailure::classify(message));
        }

        if !status.is_success() {
            warn!("{endpoint:?} endpoint returned {status}");
            return Err(UpstreamFailure::Other(format!(
                "Request failed with status code {}",
                status.as_u16()
            )));
        }

        parsed.ok_or_else(|| UpstreamFailure::Other("malformed response from backend".into()))
    }
}

//! The analyzer drives a palm reading through the generation backend. It
//! asks the vision model first and, only when that model is reported
//! missing, falls back once to a generic text-only reading.

use crate::config::ServiceConfig;
use crate::error::AnalysisError;
use crate::gemini::{
    AnalysisRequest, Endpoint, GeminiClient, GenerateResponse, Template, UpstreamFailure,
};
use crate::normalize::NormalizedImage;
use tracing::*;

/// Narrative text used when a successful response carries none
pub const PLACEHOLDER_TEXT: &str = "Analysis completed";

/// Which attempt produced the reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Source {
    Vision,
    Fallback,
}

/// A finished reading
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub text: String,
    pub source: Source,
}

enum State {
    VisionAttempt,
    FallbackAttempt,
    Success(GenerateResponse, Source),
    Failed(UpstreamFailure),
}

#[derive(Debug, Clone)]
pub struct Analyzer {
    client: GeminiClient,
}

impl Analyzer {
    pub fn new(config: ServiceConfig) -> Result<Self, AnalysisError> {
        Ok(Analyzer {
            client: GeminiClient::new(config)?,
        })
    }

    /// Whether an API key is available
    pub fn is_configured(&self) -> bool {
        self.client.api_key().is_some()
    }

    /// Run the vision attempt and, if needed, the single fallback attempt
    pub async fn analyze(&self, image: &NormalizedImage) -> Result<Analysis, AnalysisError> {
        let key = self
            .client
            .api_key()
            .ok_or_else(AnalysisError::missing_api_key)?;

        let mut state = State::VisionAttempt;
        loop {
            state = match state {
                State::VisionAttempt => {
                    let request = AnalysisRequest::build(Template::Vision(image));
                    match self.attempt(Endpoint::Vision, key, &request).await {
                        Ok(response) => State::Success(response, Source::Vision),
                        Err(UpstreamFailure::ModelNotFound(message)) => {
                            warn!("vision model unavailable ({message}), falling back to text");
                            State::FallbackAttempt
                        }
                        Err(failure) => State::Failed(failure),
                    }
                }
                State::FallbackAttempt => {
                    let request = AnalysisRequest::build(Template::Fallback);
                    match self.attempt(Endpoint::Text, key, &request).await {
                        Ok(response) => State::Success(response, Source::Fallback),
                        Err(failure) => State::Failed(failure),
                    }
                }
                State::Success(response, source) => {
                    let text = response.first_text().unwrap_or(PLACEHOLDER_TEXT).to_string();
                    info!("analysis finished via {source:?} ({} chars)", text.len());
                    return Ok(Analysis { text, source });
                }
                State::Failed(failure) => {
                    error!("analysis failed: {}", failure.message());
                    return Err(AnalysisError::Upstream(failure.message().to_string()));
                }
            }
        }
    }

    /// One call to one endpoint. A response without candidates is a failure.
    async fn attempt(
        &self,
        endpoint: Endpoint,
        key: &str,
        request: &AnalysisRequest,
    ) -> Result<GenerateResponse, UpstreamFailure> {
        let response = self.client.generate(endpoint, key, request).await?;
        if !response.has_candidates() {
            return Err(UpstreamFailure::Other("No candidates in response".into()));
        }
        Ok(response)
    }
}

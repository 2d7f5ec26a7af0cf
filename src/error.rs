use thiserror::Error;

/// Everything that can go wrong while serving an analysis request
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The caller sent something we cannot use
    #[error("{0}")]
    Validation(String),

    #[error("File too large. Maximum size is 10MB.")]
    PayloadTooLarge,

    /// The operator has not configured the service
    #[error("{0}")]
    Configuration(String),

    #[error("Image processing failed: {0}")]
    ImageProcessing(String),

    /// The generation backend failed, or failed twice when a fallback ran
    #[error("Palmistry analysis failed: {0}")]
    Upstream(String),
}

impl AnalysisError {
    pub fn missing_api_key() -> Self {
        AnalysisError::Configuration("Gemini API key not configured".into())
    }
}

impl From<image::ImageError> for AnalysisError {
    fn from(err: image::ImageError) -> Self {
        AnalysisError::ImageProcessing(err.to_string())
    }
}

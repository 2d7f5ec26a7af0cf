use chrono::{SecondsFormat, Utc};
use serde::Serialize;

/// The analysis envelope. `success` always agrees with the status code.
#[derive(Debug, Serialize)]
pub struct AnalysisResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: String,
}

impl AnalysisResult {
    pub fn success(analysis: String) -> Self {
        AnalysisResult {
            success: true,
            analysis: Some(analysis),
            error: None,
            timestamp: now(),
        }
    }

    pub fn failure(error: String) -> Self {
        AnalysisResult {
            success: false,
            analysis: None,
            error: Some(error),
            timestamp: now(),
        }
    }
}

/// ISO-8601 in UTC with millisecond precision, e.g. `2024-01-01T12:00:00.000Z`
fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
}

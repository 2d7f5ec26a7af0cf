//! The user-facing JSON web server. Every failure below this layer is an
//! `AnalysisError`; `WebError` turns it into exactly one JSON body and one
//! status code.

use crate::error::AnalysisError;
use actix_multipart::MultipartError;
use actix_web::error::BlockingError;
use actix_web::http::header::ContentType;
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse};
use protocol::AnalysisResult;

pub mod protocol;
pub mod routes;
pub mod upload;

#[derive(Debug)]
pub struct WebError {
    err: AnalysisError,
}

impl std::fmt::Display for WebError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.err)
    }
}

impl actix_web::error::ResponseError for WebError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .json(AnalysisResult::failure(self.to_string()))
    }

    fn status_code(&self) -> StatusCode {
        match self.err {
            AnalysisError::Validation(_) | AnalysisError::PayloadTooLarge => StatusCode::BAD_REQUEST,
            AnalysisError::Configuration(_)
            | AnalysisError::ImageProcessing(_)
            | AnalysisError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AnalysisError> for WebError {
    fn from(err: AnalysisError) -> WebError {
        WebError { err }
    }
}

impl From<MultipartError> for WebError {
    fn from(err: MultipartError) -> Self {
        WebError {
            err: AnalysisError::Validation(format!("Malformed upload: {err}")),
        }
    }
}

impl From<BlockingError> for WebError {
    fn from(err: BlockingError) -> Self {
        WebError {
            err: AnalysisError::ImageProcessing(err.to_string()),
        }
    }
}

/// Register every route. Unmatched paths are left to the app's default
/// service (`routes::not_found`).
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(routes::health).service(routes::analyze_palm);
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use actix_web::ResponseError;

    async fn body_of(err: AnalysisError) -> (StatusCode, serde_json::Value) {
        let response = WebError::from(err).error_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body()).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[actix_web::test]
    async fn test_status_table() {
        let cases = [
            (AnalysisError::Validation("No image file provided".into()), 400),
            (AnalysisError::PayloadTooLarge, 400),
            (AnalysisError::missing_api_key(), 500),
            (AnalysisError::ImageProcessing("bad".into()), 500),
            (AnalysisError::Upstream("boom".into()), 500),
        ];
        for (err, expected) in cases {
            let message = err.to_string();
            let (status, body) = body_of(err).await;
            assert_eq!(status.as_u16(), expected);
            assert_eq!(body["success"], false);
            assert_eq!(body["error"], message);
            assert!(body.get("analysis").is_none());
        }
    }
}

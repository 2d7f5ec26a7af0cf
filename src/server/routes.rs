//! HTTP routes. `analyze_palm` runs the whole pipeline: upload validation,
//! normalization, analysis, and the response envelope.

use super::protocol::{AnalysisResult, ErrorResponse, HealthResponse};
use super::upload::read_upload;
use super::WebError;
use crate::analysis::Analyzer;
use crate::error::AnalysisError;
use crate::normalize::normalize;
use actix_multipart::Multipart;
use actix_web::{get, post, web, HttpResponse, Responder};
use tracing::*;

type Result<T> = std::result::Result<T, WebError>;

#[get("/health")]
pub async fn health() -> impl Responder {
    web::Json(HealthResponse {
        status: "OK",
        message: "Palmistry API is running",
    })
}

#[post("/api/analyze-palm")]
pub async fn analyze_palm(
    payload: Multipart,
    analyzer: web::Data<Analyzer>,
) -> Result<impl Responder> {
    let upload = read_upload(payload).await?;
    info!(
        "received {} upload of {} bytes",
        upload.media_type,
        upload.bytes.len()
    );

    if !analyzer.is_configured() {
        error!("rejecting analysis: no API key configured");
        return Err(AnalysisError::missing_api_key().into());
    }

    // Decoding and encoding are CPU bound
    let image = web::block(move || normalize(&upload.bytes)).await??;
    debug!("normalized upload to {image:?}");

    let analysis = analyzer.analyze(&image).await?;

    info!("finished serving analysis request ({:?})", analysis.source);

    Ok(web::Json(AnalysisResult::success(analysis.text)))
}

/// Fallback for every unmatched route
pub async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(ErrorResponse {
        error: "Route not found",
    })
}

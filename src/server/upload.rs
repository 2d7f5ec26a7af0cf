//! Reads the palm image out of a multipart request. The declared media type
//! is checked before any of the file is read, and the size limit is enforced
//! across every field of the body while streaming.

use super::WebError;
use crate::config::{MAX_UPLOAD_BYTES, UPLOAD_FIELD};
use crate::error::AnalysisError;
use actix_multipart::{Field, Multipart};
use tokio_stream::StreamExt;
use tracing::*;

type Result<T> = std::result::Result<T, WebError>;

/// An uploaded image, held in memory for the duration of one request
pub struct UploadedImage {
    pub bytes: Vec<u8>,
    pub media_type: String,
}

impl std::fmt::Debug for UploadedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "UploadedImage {{ bytes: <{} bytes>, media_type: {:?} }}",
            self.bytes.len(),
            self.media_type
        )
    }
}

/// Pull exactly one `palmImage` file out of `payload`
pub async fn read_upload(mut payload: Multipart) -> Result<UploadedImage> {
    let mut upload = None;
    let mut remaining = MAX_UPLOAD_BYTES;

    while let Some(field) = payload.next().await {
        let mut field = field?;
        let disposition = field.content_disposition();
        let name = disposition.get_name().unwrap_or_default().to_string();
        let is_file = disposition.get_filename().is_some();

        if name != UPLOAD_FIELD {
            if is_file {
                return Err(AnalysisError::Validation(format!("Unexpected field: {name}")).into());
            }
            // plain form fields are ignored, but still count towards the limit
            read_limited(&mut field, &mut remaining).await?;
            continue;
        }

        if upload.is_some() {
            return Err(AnalysisError::Validation(format!(
                "Only one {UPLOAD_FIELD} file is allowed"
            ))
            .into());
        }

        let media_type = field
            .content_type()
            .map(|mime| mime.essence_str().to_string())
            .unwrap_or_default();
        if !media_type.starts_with("image/") {
            debug!("rejected upload with media type {media_type:?}");
            return Err(AnalysisError::Validation("Only image files are allowed!".into()).into());
        }

        let bytes = read_limited(&mut field, &mut remaining).await?;
        upload = Some(UploadedImage { bytes, media_type });
    }

    let upload =
        upload.ok_or_else(|| AnalysisError::Validation("No image file provided".into()))?;
    debug!("received {upload:?}");
    Ok(upload)
}

/// Buffer a field, failing as soon as the body grows past the bytes
/// `remaining` in it
async fn read_limited(field: &mut Field, remaining: &mut usize) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk?;
        if chunk.len() > *remaining {
            warn!("upload exceeds {MAX_UPLOAD_BYTES} bytes");
            return Err(AnalysisError::PayloadTooLarge.into());
        }
        *remaining -= chunk.len();
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

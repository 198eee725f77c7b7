use axum::extract::{FromRequest, Multipart, Request};
use bytes::{Bytes, BytesMut};

use crate::error::AppError;
use crate::state::AppState;

/// One part of a multipart form.
#[derive(Debug, Clone)]
pub struct UploadedPart {
    pub field: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl UploadedPart {
    pub fn is_file(&self) -> bool {
        self.file_name.is_some()
    }
}

/// Extractor that buffers a multipart form.
/// Each part is capped at `library.max_upload_bytes`; a larger part rejects
/// the whole request with 400 before anything is processed.
pub struct Uploads(pub Vec<UploadedPart>);

impl FromRequest<AppState> for Uploads {
    type Rejection = AppError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let limit = state.config.library.max_upload_bytes;
        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        let mut parts = Vec::new();
        while let Some(mut field) = multipart.next_field().await.map_err(bad_multipart)? {
            let name = field.name().unwrap_or_default().to_string();
            let file_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);

            let mut data = BytesMut::new();
            while let Some(chunk) = field.chunk().await.map_err(bad_multipart)? {
                if data.len() + chunk.len() > limit {
                    let label = file_name.as_deref().unwrap_or(&name);
                    return Err(AppError::BadRequest(format!(
                        "'{}' exceeds the upload limit of {} bytes",
                        label, limit
                    )));
                }
                data.extend_from_slice(&chunk);
            }

            parts.push(UploadedPart {
                field: name,
                file_name,
                content_type,
                data: data.freeze(),
            });
        }

        Ok(Uploads(parts))
    }
}

fn bad_multipart(err: axum::extract::multipart::MultipartError) -> AppError {
    AppError::BadRequest(format!("Invalid upload: {}", err.body_text()))
}

impl Uploads {
    /// Value of a non-file field, trimmed. Blank values count as absent.
    pub fn text(&self, field: &str) -> Option<String> {
        self.0
            .iter()
            .find(|p| p.field == field && !p.is_file())
            .map(|p| String::from_utf8_lossy(&p.data).trim().to_string())
            .filter(|v| !v.is_empty())
    }

    pub fn files(&self) -> impl Iterator<Item = &UploadedPart> {
        self.0.iter().filter(|p| p.is_file())
    }

    pub fn file(&self, field: &str) -> Option<&UploadedPart> {
        self.files().find(|p| p.field == field)
    }
}

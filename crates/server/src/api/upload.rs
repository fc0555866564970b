use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, instrument};

use ephemera_core::{Pin, ViewLimit};
use ephemera_lifecycle::ShareOptions;

use super::AppState;
use crate::error::ServerError;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    /// Share link for the uploaded image.
    pub url: String,
    pub message: String,
    pub details: UploadDetails,
}

#[derive(Debug, Serialize)]
pub struct UploadDetails {
    /// Requested views; `-1` means unlimited.
    pub max_views: i64,
    pub pin_protected: bool,
    pub download_prevented: bool,
}

/// The raw fields of the upload form.
#[derive(Debug, Default)]
struct UploadForm {
    filename: Option<String>,
    photo: Option<Bytes>,
    max_views: Option<String>,
    pin: Option<String>,
    prevent_download: Option<String>,
}

fn multipart_error(err: &MultipartError) -> ServerError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ServerError::PayloadTooLarge(err.body_text())
    } else {
        ServerError::BadRequest(err.body_text())
    }
}

async fn read_form(multipart: &mut Multipart) -> Result<UploadForm, ServerError> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(&e))?
    {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        match name.as_str() {
            "photo" => {
                form.filename = field.file_name().map(str::to_owned);
                form.photo = Some(field.bytes().await.map_err(|e| multipart_error(&e))?);
            }
            "max_views" | "pin" | "prevent_download" => {
                let text = field.text().await.map_err(|e| multipart_error(&e))?;
                match name.as_str() {
                    "max_views" => form.max_views = Some(text),
                    "pin" => form.pin = Some(text),
                    _ => form.prevent_download = Some(text),
                }
            }
            other => debug!(field = other, "ignoring unknown upload field"),
        }
    }
    Ok(form)
}

fn parse_view_limit(raw: Option<&str>) -> Result<ViewLimit, ServerError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(ViewLimit::default());
    };
    raw.parse::<i64>()
        .ok()
        .and_then(|n| ViewLimit::from_raw(n).ok())
        .ok_or_else(|| {
            ServerError::BadRequest("max_views must be a positive number or -1 for unlimited".into())
        })
}

fn parse_pin(raw: Option<&str>) -> Result<Option<Pin>, ServerError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(pin) => Pin::parse(pin)
            .map(Some)
            .map_err(|_| ServerError::BadRequest("PIN must be exactly 4 digits".into())),
    }
}

fn parse_flag(raw: Option<&str>) -> bool {
    matches!(raw.map(str::trim), Some("true" | "on" | "1"))
}

/// Describe what the share link allows, for the upload confirmation.
pub fn share_message(limit: ViewLimit, pin_protected: bool, ttl_hours: u32) -> String {
    let mut message = match limit {
        ViewLimit::Unlimited => {
            format!("This link will work unlimited times for {ttl_hours} hours.")
        }
        ViewLimit::Limited(1) => "This link will work only once.".to_owned(),
        ViewLimit::Limited(n) => format!("This link will work {n} times."),
    };
    if pin_protected {
        message.push_str(" PIN protection enabled.");
    }
    message
}

/// `POST /upload` (multipart: `photo`, `max_views`, `pin`, `prevent_download`)
#[instrument(skip_all)]
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ServerError> {
    let form = read_form(&mut multipart).await?;

    let Some(photo) = form.photo else {
        return Err(ServerError::BadRequest("No photo provided".into()));
    };
    let filename = form.filename.unwrap_or_default();
    if filename.is_empty() {
        return Err(ServerError::BadRequest("No file selected".into()));
    }
    let Some(content_type) = state.upload.content_type_for(&filename) else {
        return Err(ServerError::BadRequest(format!(
            "Invalid file type. Allowed: {}",
            state.upload.allowed_extensions.join(", ")
        )));
    };
    if photo.is_empty() {
        return Err(ServerError::BadRequest("Uploaded file is empty".into()));
    }
    if photo.len() > state.upload.max_bytes {
        return Err(ServerError::PayloadTooLarge(format!(
            "File too large. Max {}",
            state.upload.max_size_label()
        )));
    }

    let view_limit = parse_view_limit(form.max_views.as_deref())?;
    let pin = parse_pin(form.pin.as_deref())?;
    let prevent_download = parse_flag(form.prevent_download.as_deref());
    let pin_protected = pin.is_some();

    let record = state
        .coordinator
        .upload(
            photo,
            content_type,
            ShareOptions {
                view_limit,
                pin,
                prevent_download,
            },
        )
        .await?;

    Ok(Json(UploadResponse {
        success: true,
        url: format!("{}/view/{}", state.external_url, record.token),
        message: format!(
            "Photo uploaded! {}",
            share_message(view_limit, pin_protected, state.ttl_hours)
        ),
        details: UploadDetails {
            max_views: view_limit.as_raw(),
            pin_protected,
            download_prevented: prevent_download,
        },
    }))
}

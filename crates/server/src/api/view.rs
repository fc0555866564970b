use axum::Json;
use axum::extract::{Path, State};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize, Serializer};

use ephemera_core::{GrantSummary, Token};

use super::AppState;
use crate::error::ServerError;

#[derive(Debug, Default, Deserialize)]
pub struct ViewRequest {
    #[serde(default)]
    pub pin: Option<String>,
}

/// Views left after a view: a count, or `"unlimited"` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemainingViews {
    Count(u32),
    Unlimited,
}

impl From<Option<u32>> for RemainingViews {
    fn from(remaining: Option<u32>) -> Self {
        remaining.map_or(Self::Unlimited, Self::Count)
    }
}

impl Serialize for RemainingViews {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Count(n) => serializer.serialize_u32(*n),
            Self::Unlimited => serializer.serialize_str("unlimited"),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ViewResponse {
    pub success: bool,
    /// The image as a `data:` URL.
    pub image: String,
    pub views_remaining: RemainingViews,
    pub prevent_download: bool,
}

/// `GET /api/grants/{token}`: describe a grant without spending a view.
pub async fn describe(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<GrantSummary>, ServerError> {
    let summary = state.coordinator.describe(&Token::new(token)).await?;
    Ok(Json(summary))
}

/// `POST /api/view/{token}` with an optional `{"pin": "1234"}` body.
pub async fn view(
    State(state): State<AppState>,
    Path(token): Path<String>,
    body: Option<Json<ViewRequest>>,
) -> Result<Json<ViewResponse>, ServerError> {
    let request = body.map(|Json(req)| req).unwrap_or_default();
    let view = state
        .coordinator
        .view(&Token::new(token), request.pin.as_deref())
        .await?;

    let image = format!(
        "data:{};base64,{}",
        view.content_type,
        STANDARD.encode(&view.data)
    );
    Ok(Json(ViewResponse {
        success: true,
        image,
        views_remaining: view.views_remaining.into(),
        prevent_download: view.prevent_download,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_views_wire_format() {
        assert_eq!(
            serde_json::to_value(RemainingViews::from(Some(2))).unwrap(),
            serde_json::json!(2)
        );
        assert_eq!(
            serde_json::to_value(RemainingViews::from(None)).unwrap(),
            serde_json::json!("unlimited")
        );
    }
}

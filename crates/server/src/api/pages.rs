use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use minijinja::{Environment, Value, context};

use ephemera_core::Token;
use ephemera_lifecycle::LifecycleError;

use super::AppState;
use crate::error::ServerError;

/// HTML templates compiled into the binary.
#[derive(Debug)]
pub struct Templates {
    env: Environment<'static>,
}

impl Templates {
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.add_template("upload.html", include_str!("../../templates/upload.html"))?;
        env.add_template("view.html", include_str!("../../templates/view.html"))?;
        Ok(Self { env })
    }

    pub fn render(&self, name: &str, ctx: Value) -> Result<String, minijinja::Error> {
        self.env.get_template(name)?.render(ctx)
    }
}

/// `GET /`: the upload form.
pub async fn index(State(state): State<AppState>) -> Result<Html<String>, ServerError> {
    let body = state.templates.render(
        "upload.html",
        context! {
            max_size => state.upload.max_size_label(),
            allowed_extensions => state.upload.allowed_extensions.join(", "),
        },
    )?;
    Ok(Html(body))
}

/// `GET /view/{token}`: the viewer page. Does not spend a view.
pub async fn view_page(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Response, ServerError> {
    let token = Token::new(token);
    let (status, error) = match state.coordinator.describe(&token).await {
        Ok(summary) => {
            let views_remaining = summary
                .views_remaining
                .map_or_else(|| "unlimited".to_owned(), |n| n.to_string());
            let body = state.templates.render(
                "view.html",
                context! {
                    token => summary.token.as_str(),
                    pin_required => summary.pin_required,
                    prevent_download => summary.prevent_download,
                    views_remaining => views_remaining,
                    expires_at => summary.expires_at.to_rfc3339(),
                },
            )?;
            return Ok(Html(body).into_response());
        }
        Err(LifecycleError::NotFound) => (StatusCode::NOT_FOUND, "Photo not found or link expired"),
        Err(LifecycleError::Expired) => (StatusCode::GONE, "Link has expired"),
        Err(LifecycleError::Exhausted) => (StatusCode::GONE, "Maximum views reached"),
        Err(other) => return Err(other.into()),
    };

    let body = state
        .templates
        .render("view.html", context! { error => error })?;
    Ok((status, Html(body)).into_response())
}

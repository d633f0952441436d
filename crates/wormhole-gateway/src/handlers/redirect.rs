use super::parse_code;
use crate::error::Result;
use crate::extract::ClickContext;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::warn;

pub async fn redirect_handler(
    Path(short_code): Path<String>,
    State(state): State<AppState>,
    ClickContext(meta): ClickContext,
) -> Result<Response> {
    let code = parse_code(short_code)?;
    let url = state.redirector.resolve(&code, meta).await?;

    // 301 rather than axum's 308 helper
    match HeaderValue::from_bytes(url.as_bytes()) {
        Ok(location) => {
            Ok((StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location)]).into_response())
        }
        Err(err) => {
            warn!(code = %code, error = %err, "stored url is not a valid header value");
            Ok(StatusCode::INTERNAL_SERVER_ERROR.into_response())
        }
    }
}

use super::parse_code;
use crate::error::Result;
use crate::model::StatsResponse;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::Json;
use wormhole_analytics::{DEFAULT_RECENT_CLICKS, DEFAULT_TOP_REFERRERS};

pub async fn stats_handler(
    Path(short_code): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<StatsResponse>> {
    let code = parse_code(short_code)?;
    let stats = state
        .recorder
        .stats_for(&code, DEFAULT_TOP_REFERRERS, DEFAULT_RECENT_CLICKS)
        .await?;
    Ok(Json(stats.into()))
}

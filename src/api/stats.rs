use axum::{extract::State, routing::get, Json, Router};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::schemas::stats::StatsOverviewResponse;
use crate::services::session_summary::stats_totals;

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/overview", get(stats_overview))
}

async fn stats_overview(
    user: CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<StatsOverviewResponse>, ApiError> {
    let rows = state.backend().stats_overview(&user.token).await?;
    let totals = stats_totals(&rows);
    Ok(Json(StatsOverviewResponse { rows, totals }))
}

use axum::{Json, extract::State};
use redsky_model::InstanceInfo;

use crate::infra::{app_state::AppState, errors::AppResult};

/// Public metadata document. Served bare, without the API envelope, since
/// peers crawl it directly.
pub async fn instance_info(State(state): State<AppState>) -> AppResult<Json<InstanceInfo>> {
    let info = state.instance.describe().await?;
    Ok(Json(info))
}

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
};
use redsky_core::api::{ApiResponse, DirectoryQuery, RegisterInstanceRequest};
use redsky_core::federation::RefreshSummary;
use redsky_model::{InstanceId, KnownInstance};

use crate::infra::{
    app_state::AppState,
    errors::{ApiJson, ApiPath, ApiQuery, AppResult},
    identity::Actor,
};

pub async fn list_instances(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<DirectoryQuery>,
) -> AppResult<Json<ApiResponse<Vec<KnownInstance>>>> {
    let instances = state.directory.list(query.reachable_only).await?;
    Ok(Json(ApiResponse::success(instances)))
}

/// Probes the URL before storing it; an unreachable peer is rejected.
pub async fn register_instance(
    State(state): State<AppState>,
    Extension(_actor): Extension<Actor>,
    ApiJson(request): ApiJson<RegisterInstanceRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<KnownInstance>>)> {
    let instance = state.directory.register(&request.url).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(instance))))
}

pub async fn refresh_directory(
    State(state): State<AppState>,
    Extension(_actor): Extension<Actor>,
) -> AppResult<Json<ApiResponse<RefreshSummary>>> {
    let summary = state.directory.refresh().await?;
    Ok(Json(ApiResponse::success(summary)))
}

pub async fn remove_instance(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiPath(instance_id): ApiPath<InstanceId>,
) -> AppResult<StatusCode> {
    state.directory.remove(actor.id(), instance_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

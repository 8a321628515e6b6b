use axum::{
    Extension, Json,
    extract::State,
};
use redsky_core::api::{ApiResponse, CastVoteRequest, ToggleModeRequest};
use redsky_core::crisis::VoteOutcome;
use redsky_model::{CommunityId, CrisisStatus};

use crate::infra::{
    app_state::AppState,
    errors::{ApiJson, ApiPath, AppResult},
    identity::Actor,
};

pub async fn get_status(
    State(state): State<AppState>,
    ApiPath(community_id): ApiPath<CommunityId>,
) -> AppResult<Json<ApiResponse<CrisisStatus>>> {
    let status = state.crisis.status(community_id).await?;
    Ok(Json(ApiResponse::success(status)))
}

pub async fn toggle_mode(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiPath(community_id): ApiPath<CommunityId>,
    ApiJson(request): ApiJson<ToggleModeRequest>,
) -> AppResult<Json<ApiResponse<CrisisStatus>>> {
    let status = state
        .crisis
        .toggle(actor.id(), community_id, request.mode)
        .await?;
    Ok(Json(ApiResponse::success(status)))
}

pub async fn cast_vote(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiPath(community_id): ApiPath<CommunityId>,
    ApiJson(request): ApiJson<CastVoteRequest>,
) -> AppResult<Json<ApiResponse<VoteOutcome>>> {
    let outcome = state
        .crisis
        .vote(actor.id(), community_id, request.vote_type)
        .await?;

    let response = match outcome.transitioned_to {
        Some(mode) => ApiResponse::success(outcome).with_message(format!(
            "Threshold reached, community is now in {mode} mode"
        )),
        None => ApiResponse::success(outcome),
    };
    Ok(Json(response))
}

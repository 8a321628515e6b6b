use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
};
use redsky_core::api::{
    ApiResponse, CreateCommentRequest, CreateTicketRequest, TicketListQuery, UpdateTicketRequest,
};
use redsky_core::tickets::{ScoredTicket, TicketPage};
use redsky_model::{CommunityId, TicketComment, TicketId};

use crate::infra::{
    app_state::AppState,
    errors::{ApiJson, ApiPath, ApiQuery, AppResult},
    identity::Actor,
};

pub async fn create_ticket(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiPath(community_id): ApiPath<CommunityId>,
    ApiJson(request): ApiJson<CreateTicketRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<ScoredTicket>>)> {
    let ticket = state.tickets.create(actor.id(), community_id, request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(ticket))))
}

pub async fn list_tickets(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiPath(community_id): ApiPath<CommunityId>,
    ApiQuery(query): ApiQuery<TicketListQuery>,
) -> AppResult<Json<ApiResponse<TicketPage>>> {
    let page = state.tickets.list(actor.id(), community_id, query).await?;
    Ok(Json(ApiResponse::success(page)))
}

pub async fn triage_queue(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiPath(community_id): ApiPath<CommunityId>,
) -> AppResult<Json<ApiResponse<Vec<ScoredTicket>>>> {
    let queue = state.tickets.triage(actor.id(), community_id).await?;
    Ok(Json(ApiResponse::success(queue)))
}

pub async fn get_ticket(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiPath((community_id, ticket_id)): ApiPath<(CommunityId, TicketId)>,
) -> AppResult<Json<ApiResponse<ScoredTicket>>> {
    let ticket = state.tickets.get(actor.id(), community_id, ticket_id).await?;
    Ok(Json(ApiResponse::success(ticket)))
}

pub async fn update_ticket(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiPath((community_id, ticket_id)): ApiPath<(CommunityId, TicketId)>,
    ApiJson(request): ApiJson<UpdateTicketRequest>,
) -> AppResult<Json<ApiResponse<ScoredTicket>>> {
    let ticket = state
        .tickets
        .update(actor.id(), community_id, ticket_id, request)
        .await?;
    Ok(Json(ApiResponse::success(ticket)))
}

pub async fn add_comment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiPath((community_id, ticket_id)): ApiPath<(CommunityId, TicketId)>,
    ApiJson(request): ApiJson<CreateCommentRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<TicketComment>>)> {
    let comment = state
        .tickets
        .add_comment(actor.id(), community_id, ticket_id, &request.body)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(comment))))
}

pub async fn list_comments(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiPath((community_id, ticket_id)): ApiPath<(CommunityId, TicketId)>,
) -> AppResult<Json<ApiResponse<Vec<TicketComment>>>> {
    let comments = state
        .tickets
        .comments(actor.id(), community_id, ticket_id)
        .await?;
    Ok(Json(ApiResponse::success(comments)))
}

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
};
use redsky_core::api::{AlertListQuery, ApiResponse, SendAlertRequest};
use redsky_core::federation::{AlertPayload, BroadcastReport};
use redsky_model::{AlertId, RedSkyAlert};

use crate::infra::{
    app_state::AppState,
    errors::{ApiJson, ApiPath, ApiQuery, AppResult},
    identity::Actor,
};

pub async fn list_alerts(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<AlertListQuery>,
) -> AppResult<Json<ApiResponse<Vec<RedSkyAlert>>>> {
    let alerts = state.relay.list(query.active_only).await?;
    Ok(Json(ApiResponse::success(alerts)))
}

pub async fn send_alert(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiJson(request): ApiJson<SendAlertRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<BroadcastReport>>)> {
    let report = state.relay.send(actor.id(), request).await?;
    let message = format!(
        "Alert delivered to {} of {} peers",
        report.succeeded, report.total
    );
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(report).with_message(message)),
    ))
}

/// Inbound push from a peer instance. Unauthenticated; trust is decided by
/// the relay's verifier.
pub async fn receive_alert(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<AlertPayload>,
) -> AppResult<(StatusCode, Json<ApiResponse<RedSkyAlert>>)> {
    let alert = state.relay.receive(payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(alert))))
}

pub async fn dismiss_alert(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiPath(alert_id): ApiPath<AlertId>,
) -> AppResult<Json<ApiResponse<RedSkyAlert>>> {
    let alert = state.relay.dismiss(actor.id(), alert_id).await?;
    Ok(Json(ApiResponse::success(alert)))
}

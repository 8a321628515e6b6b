use axum::{
    extract::Request,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use redsky_model::MemberId;

use super::errors::AppError;

/// Header carrying the authenticated member id from the upstream auth layer.
pub const ACTOR_HEADER: &str = "x-actor-id";

/// Member on whose behalf the request runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor(pub MemberId);

impl Actor {
    pub fn id(&self) -> MemberId {
        self.0
    }
}

pub fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, AppError> {
    let raw = headers
        .get(ACTOR_HEADER)
        .ok_or_else(|| AppError::unauthorized("Missing x-actor-id header"))?
        .to_str()
        .map_err(|_| AppError::unauthorized("Invalid x-actor-id header"))?;

    raw.trim()
        .parse::<MemberId>()
        .map(Actor)
        .map_err(|_| AppError::unauthorized("Invalid x-actor-id header"))
}

pub async fn identity_middleware(mut request: Request, next: Next) -> Result<Response, AppError> {
    let actor = actor_from_headers(request.headers())?;
    request.extensions_mut().insert(actor);
    Ok(next.run(request).await)
}

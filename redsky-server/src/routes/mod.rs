pub mod v1;

use crate::AppState;
use axum::Router;
use redsky_core::api::routes::v1::ROOT;

/// Create the main API router with all versions
pub fn create_api_router(state: AppState) -> Router<AppState> {
    Router::new().nest(ROOT, v1::create_v1_router(state))
}

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::http::server::AppState;
use crate::http::RequestIdExt;

pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    if token == Some(state.admin_api_key.as_ref()) {
        return Ok(next.run(request).await);
    }

    tracing::warn!(
        request_id = %request.request_id(),
        path = %request.uri().path(),
        "Rejected admin request"
    );
    Err(StatusCode::UNAUTHORIZED)
}

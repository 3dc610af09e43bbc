use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use http::header::AUTHORIZATION;
use http::StatusCode;
use tracing::{debug, warn};

use crate::jwt::{extract_bearer_token, JwtValidator, ValidationResult};

/// Gate a route on a valid bearer token.
///
/// On success the `JwtPayload` is inserted into request extensions. Every
/// failure, including an unreachable JWKS endpoint, becomes a bare 401; the
/// specific reason is only logged.
pub async fn require_jwt(
    State(validator): State<Arc<JwtValidator>>,
    mut request: Request,
    next: Next,
) -> Response {
    let header = request.headers().get(AUTHORIZATION).and_then(|value| value.to_str().ok());
    let token = match extract_bearer_token(header) {
        Ok(token) => token.to_owned(),
        Err(e) => {
            debug!(path = %request.uri().path(), "{}", e);
            return unauthorized();
        }
    };

    match validator.validate(&token).await {
        Ok(ValidationResult::Valid { payload }) => {
            request.extensions_mut().insert(payload);
            next.run(request).await
        }
        Ok(ValidationResult::Invalid { reason }) => {
            debug!(path = %request.uri().path(), reason = %reason, "JWT validation failed");
            unauthorized()
        }
        Err(e) => {
            warn!(path = %request.uri().path(), error = %e, "JWT validation error");
            unauthorized()
        }
    }
}

fn unauthorized() -> Response {
    StatusCode::UNAUTHORIZED.into_response()
}

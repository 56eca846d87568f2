//! services/api/src/web/middleware.rs
//!
//! Caller identification for the assistant routes.

use axum::{extract::Request, http::StatusCode, middleware::Next, response::Response};
use chefcito_core::CurrentUser;
use tracing::warn;
use uuid::Uuid;

/// Header carrying the id of an already-authenticated user.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Middleware that resolves the caller into a `CurrentUser` request extension.
///
/// A missing header means an anonymous caller. A header that is not a UUID is
/// rejected with 400 Bad Request.
pub async fn resolve_user(mut req: Request, next: Next) -> Result<Response, (StatusCode, String)> {
    let user = match req.headers().get(USER_ID_HEADER) {
        None => CurrentUser::Anonymous,
        Some(value) => {
            let user_id = value
                .to_str()
                .ok()
                .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
                .ok_or_else(|| {
                    warn!("rejected request with a malformed {} header", USER_ID_HEADER);
                    (
                        StatusCode::BAD_REQUEST,
                        "Invalid x-user-id format".to_string(),
                    )
                })?;
            CurrentUser::Authenticated { user_id }
        }
    };

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

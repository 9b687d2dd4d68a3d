use axum::{response::{Response, IntoResponse}};
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use crate::auth::jwt::verify_token;
use crate::error::AppError;
use crate::models::user::Role;
use crate::state::AppState;

#[derive(Clone, Debug)]
pub struct AuthContext {
    pub user_id: i64,
    pub role: Role,
    pub username: String,
}

impl AuthContext {
    /// 403 unless the caller holds one of `roles`.
    pub fn require_role(&self, roles: &[Role]) -> Result<(), AppError> {
        if roles.contains(&self.role) {
            return Ok(());
        }
        Err(AppError::forbidden(format!(
            "Role {} is not allowed to perform this action",
            self.role.as_str()
        )))
    }

    pub fn require_manager(&self) -> Result<(), AppError> {
        self.require_role(&[Role::Admin, Role::Manager])
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        self.require_role(&[Role::Admin])
    }
}

pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let auth_header = match req.headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok()) {
        Some(h) => h,
        None => return AppError::unauthorized("Missing Authorization header").into_response(),
    };

    // Expect "Bearer <token>"
    let token = match auth_header.strip_prefix("Bearer ") {
        Some(t) => t,
        None => return AppError::unauthorized("Invalid Authorization format").into_response(),
    };

    let claims = match verify_token(token, &state.config.jwt_secret) {
        Ok(c) => c,
        Err(e) => {
            tracing::debug!(error = %e, "Rejected bearer token");
            return e.into_response();
        }
    };

    req.extensions_mut().insert(AuthContext {
        user_id: claims.sub,
        role: claims.role,
        username: claims.username,
    });

    next.run(req).await
}

//! Authentication extractors for Axum

use async_trait::async_trait;
use axum::{
    extract::{Extension, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use super::models::{Claims, User};
use crate::common::{safe_email_log, ApiError, AppState};

/// Authenticated user extractor
///
/// Validates the bearer JWT, then loads (or provisions) the local user row.
#[derive(Debug, Clone)]
pub struct AuthedUser {
    pub id: String,
    pub email: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Extension(state_lock): Extension<Arc<RwLock<AppState>>> =
            Extension::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::InternalServer("missing app state".to_string()))?;

        let app_state = state_lock.read().await.clone();

        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        authenticate(&app_state, header).await
    }
}

/// Decode and validate an HS256 token, accepting either `Bearer <jwt>` or a bare token
pub fn decode_token(raw: &str, secret: &str) -> Result<Claims, ApiError> {
    let bare_token = raw.strip_prefix("Bearer ").unwrap_or(raw).trim();

    decode::<Claims>(
        bare_token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .map_err(|e| {
        warn!(error = %e, "JWT token validation failed");
        ApiError::Unauthorized("invalid token".into())
    })
}

pub async fn authenticate(
    app_state: &AppState,
    authorization: Option<&str>,
) -> Result<AuthedUser, ApiError> {
    // DEV MODE: Bypass authentication completely
    if app_state.dev_mode.is_enabled() {
        let dev_user = app_state.dev_mode.create_dev_user();
        ensure_user(app_state, &dev_user).await?;

        debug!(
            user_id = %dev_user.id,
            email = %safe_email_log(&dev_user.email),
            "DEV MODE: Authentication bypassed"
        );

        return Ok(AuthedUser {
            id: dev_user.id,
            email: dev_user.email,
        });
    }

    let token = match authorization {
        Some(t) => t,
        None => {
            warn!("Authentication failed: missing Authorization header");
            return Err(ApiError::Unauthorized("missing auth".into()));
        }
    };

    let claims = decode_token(token, &app_state.config.jwt_secret)?;

    let user: Option<User> = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(&claims.sub)
        .fetch_optional(&app_state.db)
        .await
        .map_err(|e| {
            error!(
                error = %e,
                user_id = %claims.sub,
                "Database error during user lookup in authentication"
            );
            ApiError::DatabaseError(e)
        })?;

    let user = match (user, claims.email) {
        (Some(u), _) => u,
        (None, Some(email)) => {
            let provisioned = User {
                id: claims.sub.clone(),
                email,
                name: claims.name,
                created_at: None,
            };
            ensure_user(app_state, &provisioned).await?;
            info!(
                user_id = %provisioned.id,
                email = %safe_email_log(&provisioned.email),
                "Provisioned local user from identity token"
            );
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
                .bind(&provisioned.id)
                .fetch_optional(&app_state.db)
                .await?
                .ok_or_else(|| {
                    // Email already mirrored under a different subject
                    warn!(
                        user_id = %provisioned.id,
                        "User provisioning conflicted with existing email"
                    );
                    ApiError::Unauthorized("user not found".into())
                })?
        }
        (None, None) => {
            warn!(user_id = %claims.sub, "Authentication failed: user not found in database");
            return Err(ApiError::Unauthorized("user not found".into()));
        }
    };

    debug!(
        user_id = %user.id,
        email = %safe_email_log(&user.email),
        "User authentication successful via extractor"
    );

    Ok(AuthedUser {
        id: user.id,
        email: user.email,
    })
}

async fn ensure_user(app_state: &AppState, user: &User) -> Result<(), ApiError> {
    sqlx::query("INSERT OR IGNORE INTO users (id, email, name) VALUES (?, ?, ?)")
        .bind(&user.id)
        .bind(&user.email)
        .bind(user.name.as_deref())
        .execute(&app_state.db)
        .await?;
    Ok(())
}

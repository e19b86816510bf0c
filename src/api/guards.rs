use async_trait::async_trait;
use axum::extract::{FromRequestParts, State};
use axum::http::{header, request::Parts};

use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::schemas::backend::Profile;
use crate::schemas::types::UserRole;

/// The caller as the backend sees them, plus the token to act on their behalf.
#[derive(Debug, Clone)]
pub(crate) struct CurrentUser {
    pub(crate) profile: Profile,
    pub(crate) token: String,
}

pub(crate) struct CurrentTeacher(pub(crate) CurrentUser);
pub(crate) struct CurrentStudent(pub(crate) CurrentUser);

fn bearer_token(parts: &Parts) -> Result<String, ApiError> {
    let auth_header = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(ApiError::Unauthorized("Invalid authentication credentials"))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(ApiError::Unauthorized("Invalid authentication credentials"))?;

    Ok(token.to_string())
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let State(app_state) = State::<AppState>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to access application state"))?;

        let token = bearer_token(parts)?;
        let profile = app_state.backend().profile(&token).await?;

        Ok(CurrentUser { profile, token })
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentTeacher {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;

        match user.profile.role {
            UserRole::Teacher | UserRole::Admin => Ok(CurrentTeacher(user)),
            UserRole::Student => Err(ApiError::Forbidden("Teacher access required")),
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentStudent {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;

        match user.profile.role {
            UserRole::Student => Ok(CurrentStudent(user)),
            UserRole::Teacher | UserRole::Admin => {
                Err(ApiError::Forbidden("Student access required"))
            }
        }
    }
}

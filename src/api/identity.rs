//! Caller identity
//!
//! Authentication happens upstream; the proxy forwards the provider's token
//! identifier in `x-pixel-user` along with the display name and email. The
//! user record is created on first sight.

use axum::{extract::FromRequestParts, http::request::Parts};
use pixel_canvas::{Identity, User};

use super::error::ApiError;
use super::AppState;

pub const USER_HEADER: &str = "x-pixel-user";
pub const NAME_HEADER: &str = "x-pixel-name";
pub const EMAIL_HEADER: &str = "x-pixel-email";

/// Identity carried by request headers, if any
pub fn identity_from_parts(parts: &Parts) -> Option<Identity> {
    let header = |name: &str| {
        parts
            .headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    };

    let token = header(USER_HEADER)?;
    Some(Identity {
        name: header(NAME_HEADER).unwrap_or_else(|| token.clone()),
        email: header(EMAIL_HEADER).unwrap_or_default(),
        image_url: None,
        token,
    })
}

/// Axum extractor resolving the calling user.
///
/// Rejects with 401 when no identity header is present.
pub struct CurrentUser(pub User);

#[async_trait::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        let identity = identity_from_parts(parts).ok_or_else(|| {
            ApiError::unauthorized(format!("Authentication required. Provide the {USER_HEADER} header."))
        })?;

        let user = state.store.get_or_create_user(&identity).await?;
        Ok(CurrentUser(user))
    }
}

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use tracing::warn;

use crate::{errors::AppError, models::Claims, AppState};

/// Caller identified by a valid bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub claims: Claims,
}

impl AuthUser {
    pub fn email(&self) -> &str {
        &self.claims.sub
    }
}

/// Caller whose token grants paid access, or whose account has been paid since the token was issued.
#[derive(Debug, Clone)]
pub struct PaidUser(pub AuthUser);

pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthorized("missing authorization".to_string()))?;

    let value = header.to_str().map_err(|_| {
        warn!("Invalid authorization header format");
        AppError::Unauthorized("invalid authorization header".to_string())
    })?;

    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .unwrap_or(value)
        .trim();

    if token.is_empty() {
        return Err(AppError::Unauthorized("missing authorization".to_string()));
    }
    Ok(token)
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;
        let claims = state.tokens.verify(token)?;
        Ok(AuthUser { claims })
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for PaidUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.claims.paid {
            return Ok(PaidUser(user));
        }

        match state.users.find(user.email()).await {
            Some(record) if record.paid => Ok(PaidUser(user)),
            _ => Err(AppError::PaymentRequired),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_prefix_is_optional() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers).unwrap(), "abc.def");

        headers.insert(AUTHORIZATION, HeaderValue::from_static("abc.def"));
        assert_eq!(bearer_token(&headers).unwrap(), "abc.def");

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert!(bearer_token(&headers).is_err());

        assert!(bearer_token(&HeaderMap::new()).is_err());
    }
}

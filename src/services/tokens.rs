use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use crate::models::{Claims, PublicUser};

/// Login sessions last a month; paid access tokens are "lifetime".
const SESSION_TTL_DAYS: i64 = 30;
const ACCESS_TTL_DAYS: i64 = 365 * 20;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("could not sign token: {0}")]
    Signing(jsonwebtoken::errors::Error),

    #[error("invalid token: {0}")]
    Invalid(jsonwebtoken::errors::Error),
}

#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenIssuer {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Token handed out on login/registration; carries the user's current paid flag.
    pub fn issue_session(&self, user: &PublicUser) -> Result<String, TokenError> {
        self.sign(
            &user.email,
            user.name.clone(),
            user.paid,
            None,
            Duration::days(SESSION_TTL_DAYS),
        )
    }

    /// Long-lived token granted once a payment is confirmed.
    pub fn issue_access(
        &self,
        email: &str,
        name: Option<String>,
        provider: &str,
    ) -> Result<String, TokenError> {
        self.sign(
            email,
            name,
            true,
            Some(provider.to_string()),
            Duration::days(ACCESS_TTL_DAYS),
        )
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(TokenError::Invalid)
    }

    fn sign(
        &self,
        email: &str,
        name: Option<String>,
        paid: bool,
        provider: Option<String>,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            sub: email.trim().to_lowercase(),
            name,
            paid,
            provider,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding).map_err(TokenError::Signing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(paid: bool) -> PublicUser {
        PublicUser {
            email: "Ana@Example.com".to_string(),
            name: Some("Ana".to_string()),
            paid,
        }
    }

    #[test]
    fn session_token_round_trips_claims() {
        let issuer = TokenIssuer::new("test-secret");
        let token = issuer.issue_session(&user(false)).unwrap();
        let claims = issuer.verify(&token).unwrap();
        assert_eq!(claims.sub, "ana@example.com");
        assert_eq!(claims.name.as_deref(), Some("Ana"));
        assert!(!claims.paid);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn access_token_is_paid_and_long_lived() {
        let issuer = TokenIssuer::new("test-secret");
        let token = issuer.issue_access("bia@example.com", None, "mercadopago").unwrap();
        let claims = issuer.verify(&token).unwrap();
        assert!(claims.paid);
        assert_eq!(claims.provider.as_deref(), Some("mercadopago"));
        assert!(claims.exp - claims.iat > 60 * 60 * 24 * 365 * 19);
    }

    #[test]
    fn tokens_from_another_secret_are_rejected() {
        let token = TokenIssuer::new("one").issue_session(&user(true)).unwrap();
        assert!(matches!(
            TokenIssuer::new("two").verify(&token),
            Err(TokenError::Invalid(_))
        ));
        assert!(TokenIssuer::new("one").verify("garbage").is_err());
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

// A user as persisted in the JSON user file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub password_hash: String,
    #[serde(default)]
    pub paid: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicUser {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub paid: bool,
}

impl From<&UserRecord> for PublicUser {
    fn from(record: &UserRecord) -> Self {
        Self {
            email: record.email.clone(),
            name: record.name.clone(),
            paid: record.paid,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(
        length(min = 1, message = "Informe o e-mail."),
        email(message = "E-mail inválido.")
    )]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 6, message = "A senha deve ter pelo menos 6 caracteres."))]
    pub password: String,
    #[serde(default)]
    #[validate(length(max = 80, message = "Nome muito longo."))]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(
        length(min = 1, message = "Por favor, informe o e-mail."),
        email(message = "E-mail inválido.")
    )]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Por favor, informe a senha."))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    #[validate(
        length(min = 1, message = "Informe o e-mail."),
        email(message = "E-mail inválido.")
    )]
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: PublicUser,
}

/// Bearer token payload shared by session and paid-access tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Lowercased email of the holder.
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub paid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

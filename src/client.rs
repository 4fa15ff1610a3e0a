use std::collections::BTreeMap;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::models::{
    AuthResponse, ConfirmPaymentQuery, ConfirmPaymentResponse, CreatePreferenceRequest,
    ForgotPasswordRequest, GenerationRequest, GenerationResult, LoginRequest, PreferenceResponse,
    PublicUser, RegisterRequest,
};

pub const DEFAULT_API_BASE: &str = "http://localhost:4000";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid server URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("could not reach the server: {0}")]
    Request(#[from] reqwest::Error),

    #[error("{message} (HTTP {status})")]
    Api {
        status: u16,
        message: String,
        fields: BTreeMap<String, Vec<String>>,
    },
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    fields: BTreeMap<String, Vec<String>>,
}

/// Thin typed wrapper over the backend's JSON API.
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
}

impl ApiClient {
    pub fn new(base: &str) -> Result<Self, ClientError> {
        let base = if base.ends_with('/') {
            base.to_string()
        } else {
            format!("{}/", base)
        };
        Ok(Self {
            http: reqwest::Client::new(),
            base: Url::parse(&base)?,
        })
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ClientError> {
        self.post("api/auth/register", request, None).await
    }

    pub async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ClientError> {
        self.post("api/auth/login", request, None).await
    }

    pub async fn forgot_password(&self, request: &ForgotPasswordRequest) -> Result<(), ClientError> {
        let _: serde_json::Value = self.post("api/auth/forgot", request, None).await?;
        Ok(())
    }

    pub async fn me(&self, token: &str) -> Result<PublicUser, ClientError> {
        self.get("api/me", &[], Some(token)).await
    }

    pub async fn generate(
        &self,
        token: &str,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, ClientError> {
        self.post("api/generate", request, Some(token)).await
    }

    pub async fn create_preference(&self, email: &str) -> Result<PreferenceResponse, ClientError> {
        let request = CreatePreferenceRequest {
            email: email.to_string(),
        };
        self.post("api/create_preference", &request, None).await
    }

    pub async fn confirm_payment(
        &self,
        query: &ConfirmPaymentQuery,
    ) -> Result<ConfirmPaymentResponse, ClientError> {
        let pairs: Vec<(&str, &str)> = [
            ("collection_id", query.collection_id.as_deref()),
            ("payment_id", query.payment_id.as_deref()),
            ("preference_id", query.preference_id.as_deref()),
            ("merchant_order_id", query.merchant_order_id.as_deref()),
            ("external_reference", query.external_reference.as_deref()),
        ]
        .into_iter()
        .filter_map(|(k, v)| v.map(|v| (k, v)))
        .collect();
        self.get("api/confirm_payment", &pairs, None).await
    }

    pub async fn simulate_payment(&self, token: &str) -> Result<ConfirmPaymentResponse, ClientError> {
        self.post("api/payments/simulate", &serde_json::json!({}), Some(token))
            .await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        token: Option<&str>,
    ) -> Result<T, ClientError> {
        let mut request = self.http.post(self.base.join(path)?).json(body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        read(request.send().await?).await
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        token: Option<&str>,
    ) -> Result<T, ClientError> {
        let mut url = self.base.join(path)?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        let mut request = self.http.get(url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        read(request.send().await?).await
    }
}

async fn read<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let text = response.text().await.unwrap_or_default();
    let (message, fields) = match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => (body.error, body.fields),
        Err(_) if text.is_empty() => (status.to_string(), BTreeMap::new()),
        Err(_) => (text, BTreeMap::new()),
    };
    Err(ClientError::Api {
        status: status.as_u16(),
        message,
        fields,
    })
}

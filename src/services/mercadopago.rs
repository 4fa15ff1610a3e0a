use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::models::{
    MpBackUrls, MpMerchantOrder, MpMerchantOrderSearch, MpPayer, MpPayment, MpPreference,
    MpPreferenceItem, MpPreferenceRequest, PreferenceResponse,
};

pub const DEFAULT_MP_API_BASE: &str = "https://api.mercadopago.com";

const PRODUCT_ID: &str = "lotostats_pro";
const PRODUCT_TITLE: &str = "LotoStats - Acesso Vitalício";
const PRODUCT_PRICE_BRL: f64 = 9.90;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Mercado Pago access token is not configured")]
    NotConfigured,

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("provider returned status {0}")]
    Status(reqwest::StatusCode),
}

#[derive(Clone)]
pub struct MercadoPagoClient {
    http: reqwest::Client,
    access_token: Option<String>,
    api_base: Url,
    frontend_url: String,
}

impl MercadoPagoClient {
    pub fn new(
        http: reqwest::Client,
        access_token: Option<String>,
        api_base: &str,
        frontend_url: &str,
    ) -> Result<Self, PaymentError> {
        Ok(Self {
            http,
            access_token: access_token.filter(|t| !t.trim().is_empty()),
            api_base: Url::parse(api_base)?,
            frontend_url: frontend_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.access_token.is_some()
    }

    /// Checkout Pro preference for the lifetime-access product, paid by `email`.
    pub fn preference_for(&self, email: &str) -> MpPreferenceRequest {
        MpPreferenceRequest {
            items: vec![MpPreferenceItem {
                id: PRODUCT_ID.to_string(),
                title: PRODUCT_TITLE.to_string(),
                quantity: 1,
                currency_id: "BRL".to_string(),
                unit_price: PRODUCT_PRICE_BRL,
            }],
            payer: MpPayer {
                email: email.to_string(),
            },
            external_reference: email.to_string(),
            back_urls: MpBackUrls {
                success: format!("{}/payment-success", self.frontend_url),
                failure: format!("{}/payment-failed", self.frontend_url),
                pending: format!("{}/payment-pending", self.frontend_url),
            },
            auto_return: "approved".to_string(),
        }
    }

    pub async fn create_preference(&self, email: &str) -> Result<PreferenceResponse, PaymentError> {
        let token = self.token()?;
        let url = self.api_base.join("checkout/preferences")?;

        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(&self.preference_for(email))
            .send()
            .await?;
        let preference: MpPreference = read_json(response).await?;

        info!("Created Mercado Pago preference {}", preference.id);
        Ok(PreferenceResponse {
            init_point: preference.init_point,
            preference_id: preference.id,
        })
    }

    pub async fn find_payment(&self, payment_id: &str) -> Result<MpPayment, PaymentError> {
        let url = self
            .api_base
            .join(&format!("v1/payments/{}", encode_segment(payment_id)))?;
        self.get(url).await
    }

    pub async fn search_orders_by_preference(
        &self,
        preference_id: &str,
    ) -> Result<Vec<MpMerchantOrder>, PaymentError> {
        let mut url = self.api_base.join("merchant_orders/search")?;
        url.query_pairs_mut().append_pair("preference_id", preference_id);
        let search: MpMerchantOrderSearch = self.get(url).await?;
        Ok(search.results)
    }

    pub async fn find_merchant_order(&self, order_id: &str) -> Result<MpMerchantOrder, PaymentError> {
        let url = self
            .api_base
            .join(&format!("merchant_orders/{}", encode_segment(order_id)))?;
        self.get(url).await
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, PaymentError> {
        let token = self.token()?;
        let response = self.http.get(url).bearer_auth(token).send().await?;
        read_json(response).await
    }

    fn token(&self) -> Result<&str, PaymentError> {
        self.access_token.as_deref().ok_or(PaymentError::NotConfigured)
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, PaymentError> {
    if !response.status().is_success() {
        let status = response.status();
        let detail = response.text().await.unwrap_or_default();
        error!("Mercado Pago returned status {}: {}", status, detail);
        return Err(PaymentError::Status(status));
    }
    Ok(response.json().await?)
}

fn encode_segment(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.trim().as_bytes()).collect()
}

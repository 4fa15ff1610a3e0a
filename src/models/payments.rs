use serde::{Deserialize, Serialize};
use validator::Validate;

use super::common::deserialize_id_string;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreatePreferenceRequest {
    #[serde(default)]
    #[validate(
        length(min = 1, message = "email is required"),
        email(message = "email is invalid")
    )]
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferenceResponse {
    #[serde(alias = "initPoint")]
    pub init_point: String,
    #[serde(alias = "preferenceId")]
    pub preference_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfirmPaymentQuery {
    pub collection_id: Option<String>,
    pub payment_id: Option<String>,
    pub preference_id: Option<String>,
    pub merchant_order_id: Option<String>,
    pub external_reference: Option<String>,
}

impl ConfirmPaymentQuery {
    /// Payment id from either redirect parameter name, ignoring blanks.
    pub fn payment(&self) -> Option<&str> {
        non_blank(self.collection_id.as_deref()).or_else(|| non_blank(self.payment_id.as_deref()))
    }

    pub fn preference(&self) -> Option<&str> {
        non_blank(self.preference_id.as_deref())
    }

    pub fn merchant_order(&self) -> Option<&str> {
        non_blank(self.merchant_order_id.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty() && *v != "null")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmPaymentResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ConfirmPaymentResponse {
    pub fn approved(token: String) -> Self {
        Self {
            success: true,
            token: Some(token),
            status: Some(PAYMENT_APPROVED.to_string()),
            message: None,
        }
    }

    pub fn pending(status: Option<String>, message: Option<String>) -> Self {
        Self {
            success: false,
            token: None,
            status,
            message,
        }
    }
}

pub const PAYMENT_APPROVED: &str = "approved";

// Mercado Pago wire types

#[derive(Debug, Serialize)]
pub struct MpPreferenceItem {
    pub id: String,
    pub title: String,
    pub quantity: u32,
    pub currency_id: String,
    pub unit_price: f64,
}

#[derive(Debug, Serialize)]
pub struct MpPayer {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct MpBackUrls {
    pub success: String,
    pub failure: String,
    pub pending: String,
}

#[derive(Debug, Serialize)]
pub struct MpPreferenceRequest {
    pub items: Vec<MpPreferenceItem>,
    pub payer: MpPayer,
    pub external_reference: String,
    pub back_urls: MpBackUrls,
    pub auto_return: String,
}

#[derive(Debug, Deserialize)]
pub struct MpPreference {
    pub id: String,
    pub init_point: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct MpPaymentPayer {
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MpPayment {
    #[serde(deserialize_with = "deserialize_id_string")]
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub payer: Option<MpPaymentPayer>,
    #[serde(default)]
    pub external_reference: Option<String>,
}

impl MpPayment {
    pub fn is_approved(&self) -> bool {
        self.status == PAYMENT_APPROVED
    }

    pub fn payer_email(&self) -> Option<&str> {
        self.payer
            .as_ref()
            .and_then(|p| non_blank(p.email.as_deref()))
            .or_else(|| non_blank(self.external_reference.as_deref()))
    }
}

#[derive(Debug, Deserialize)]
pub struct MpOrderPayment {
    #[serde(deserialize_with = "deserialize_id_string")]
    pub id: String,
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct MpMerchantOrder {
    #[serde(deserialize_with = "deserialize_id_string")]
    pub id: String,
    #[serde(default)]
    pub external_reference: Option<String>,
    #[serde(default)]
    pub payer: Option<MpPaymentPayer>,
    #[serde(default)]
    pub payments: Vec<MpOrderPayment>,
}

impl MpMerchantOrder {
    pub fn approved_payment(&self) -> Option<&MpOrderPayment> {
        self.payments.iter().find(|p| p.status == PAYMENT_APPROVED)
    }

    pub fn payer_email(&self) -> Option<&str> {
        non_blank(self.external_reference.as_deref())
            .or_else(|| self.payer.as_ref().and_then(|p| non_blank(p.email.as_deref())))
    }

    /// Status of the most recent payment, if any, for "not yet approved" replies.
    pub fn last_status(&self) -> Option<&str> {
        self.payments.last().map(|p| p.status.as_str())
    }
}

#[derive(Debug, Deserialize)]
pub struct MpMerchantOrderSearch {
    #[serde(default, alias = "elements")]
    pub results: Vec<MpMerchantOrder>,
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::http::{Auth, ClientError, HttpClient};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerchantAccount {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub merchant_city: Option<String>,
    #[serde(default)]
    pub primary_settlement_currency: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DataPage<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Webhook {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWebhookRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
    pub active: bool,
    pub communication_format: String,
    /// Holds the connector id so uninstall can find the webhook again.
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HmacKey {
    hmac_key: String,
}

/// A created webhook together with the HMAC key Adyen generated for it.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedWebhook {
    pub webhook: Webhook,
    pub hmac_key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationAmount {
    pub currency: String,
    /// Already in minor units.
    pub value: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hmac_signature: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequestItem {
    #[serde(default)]
    pub additional_data: AdditionalData,
    pub amount: NotificationAmount,
    pub event_code: String,
    pub event_date: DateTime<Utc>,
    pub merchant_account_code: String,
    #[serde(default)]
    pub merchant_reference: String,
    #[serde(default)]
    pub original_reference: String,
    #[serde(default)]
    pub payment_method: String,
    pub psp_reference: String,
    /// `"true"` or `"false"`, as Adyen sends it.
    pub success: String,
}

impl NotificationRequestItem {
    pub fn succeeded(&self) -> bool {
        self.success == "true"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationItem {
    #[serde(rename = "NotificationRequestItem")]
    pub item: NotificationRequestItem,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(default)]
    pub live: String,
    #[serde(default)]
    pub notification_items: Vec<NotificationItem>,
}

#[async_trait]
pub trait Client: Send + Sync {
    /// Zero-based `page` of the company's merchant accounts.
    async fn get_merchant_accounts(&self, page: usize, page_size: usize) -> Result<Vec<MerchantAccount>, ClientError>;

    async fn create_webhook(&self, req: &CreateWebhookRequest) -> Result<CreatedWebhook, ClientError>;

    async fn list_webhooks(&self) -> Result<Vec<Webhook>, ClientError>;

    async fn delete_webhook(&self, webhook_id: &str) -> Result<(), ClientError>;
}

pub struct HttpAdyenClient {
    http: HttpClient,
    company_id: String,
}

impl HttpAdyenClient {
    pub fn new(api_key: &str, company_id: &str, endpoint: &str) -> Result<Self, ClientError> {
        Ok(Self {
            http: HttpClient::new(
                endpoint,
                Auth::Header {
                    name: "X-API-Key",
                    value: api_key.to_string(),
                },
            )?,
            company_id: company_id.to_string(),
        })
    }
}

#[async_trait]
impl Client for HttpAdyenClient {
    async fn get_merchant_accounts(&self, page: usize, page_size: usize) -> Result<Vec<MerchantAccount>, ClientError> {
        let resp: DataPage<MerchantAccount> = self
            .http
            .get(
                &format!("companies/{}/merchants", self.company_id),
                &[
                    ("pageNumber", (page + 1).to_string()),
                    ("pageSize", page_size.to_string()),
                ],
            )
            .await?;
        Ok(resp.data)
    }

    async fn create_webhook(&self, req: &CreateWebhookRequest) -> Result<CreatedWebhook, ClientError> {
        let webhook: Webhook = self
            .http
            .post(&format!("companies/{}/webhooks", self.company_id), req)
            .await?;
        let key: HmacKey = self
            .http
            .post(
                &format!("companies/{}/webhooks/{}/generateHmac", self.company_id, webhook.id),
                &serde_json::json!({}),
            )
            .await?;
        Ok(CreatedWebhook {
            webhook,
            hmac_key: key.hmac_key,
        })
    }

    async fn list_webhooks(&self) -> Result<Vec<Webhook>, ClientError> {
        let resp: DataPage<Webhook> = self
            .http
            .get(&format!("companies/{}/webhooks", self.company_id), &[])
            .await?;
        Ok(resp.data)
    }

    async fn delete_webhook(&self, webhook_id: &str) -> Result<(), ClientError> {
        self.http
            .delete(&format!("companies/{}/webhooks/{webhook_id}", self.company_id))
            .await
    }
}

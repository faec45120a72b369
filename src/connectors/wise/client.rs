use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::http::{Auth, ClientError, HttpClient};
use crate::models::decimal_text;

/// Transfer timestamps use `2006-01-02 15:04:05` in UTC.
pub fn parse_transfer_time(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").map(|t| t.and_utc())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Amount {
    #[serde(deserialize_with = "decimal_text")]
    pub value: String,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    pub id: u64,
    pub currency: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub name: Option<String>,
    pub amount: Amount,
    pub creation_time: DateTime<Utc>,
    pub modification_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientName {
    #[serde(default)]
    pub full_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientAccount {
    pub id: u64,
    pub profile: u64,
    pub currency: String,
    pub name: RecipientName,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientAccountsPage {
    #[serde(default)]
    pub content: Vec<RecipientAccount>,
    #[serde(default)]
    pub seek_position_for_next: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    pub id: u64,
    #[serde(default)]
    pub reference: String,
    pub status: String,
    #[serde(default)]
    pub source_account: Option<u64>,
    pub target_account: u64,
    pub source_currency: String,
    #[serde(deserialize_with = "decimal_text")]
    pub source_value: String,
    pub target_currency: String,
    #[serde(deserialize_with = "decimal_text")]
    pub target_value: String,
    pub created: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub source_currency: String,
    pub target_currency: String,
    pub source_amount: serde_json::Number,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferDetails {
    pub reference: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub target_account: u64,
    pub quote_uuid: String,
    pub customer_transaction_id: String,
    pub details: TransferDetails,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyInfo {
    pub code: String,
    #[serde(default = "supports_decimals_default")]
    pub supports_decimals: bool,
}

fn supports_decimals_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    pub version: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionRequest {
    pub name: String,
    pub trigger_on: String,
    pub delivery: Delivery,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub name: String,
    pub trigger_on: String,
    pub delivery: Delivery,
}

#[async_trait]
pub trait Client: Send + Sync {
    async fn get_profiles(&self) -> Result<Vec<Profile>, ClientError>;

    async fn get_balances(&self, profile_id: u64) -> Result<Vec<Balance>, ClientError>;

    async fn get_balance(&self, profile_id: u64, balance_id: u64) -> Result<Balance, ClientError>;

    async fn get_recipient_accounts(
        &self,
        profile_id: u64,
        page_size: usize,
        seek_position: u64,
    ) -> Result<RecipientAccountsPage, ClientError>;

    /// Transfers of a profile, oldest first.
    async fn get_transfers(&self, profile_id: u64, offset: usize, limit: usize) -> Result<Vec<Transfer>, ClientError>;

    async fn get_transfer(&self, transfer_id: u64) -> Result<Transfer, ClientError>;

    async fn create_quote(&self, profile_id: u64, req: &QuoteRequest) -> Result<Quote, ClientError>;

    async fn create_transfer(&self, req: &TransferRequest) -> Result<Transfer, ClientError>;

    async fn get_currencies(&self) -> Result<Vec<CurrencyInfo>, ClientError>;

    async fn create_subscription(
        &self,
        profile_id: u64,
        req: &SubscriptionRequest,
    ) -> Result<Subscription, ClientError>;

    async fn list_subscriptions(&self, profile_id: u64) -> Result<Vec<Subscription>, ClientError>;

    async fn delete_subscription(&self, profile_id: u64, subscription_id: &str) -> Result<(), ClientError>;
}

pub struct HttpWiseClient {
    http: HttpClient,
}

impl HttpWiseClient {
    pub fn new(api_key: &str, endpoint: &str) -> Result<Self, ClientError> {
        Ok(Self {
            http: HttpClient::new(endpoint, Auth::Bearer(api_key.to_string()))?,
        })
    }
}

#[async_trait]
impl Client for HttpWiseClient {
    async fn get_profiles(&self) -> Result<Vec<Profile>, ClientError> {
        self.http.get("v2/profiles", &[]).await
    }

    async fn get_balances(&self, profile_id: u64) -> Result<Vec<Balance>, ClientError> {
        self.http
            .get(
                &format!("v4/profiles/{profile_id}/balances"),
                &[("types", "STANDARD".to_string())],
            )
            .await
    }

    async fn get_balance(&self, profile_id: u64, balance_id: u64) -> Result<Balance, ClientError> {
        self.http
            .get(&format!("v4/profiles/{profile_id}/balances/{balance_id}"), &[])
            .await
    }

    async fn get_recipient_accounts(
        &self,
        profile_id: u64,
        page_size: usize,
        seek_position: u64,
    ) -> Result<RecipientAccountsPage, ClientError> {
        let mut query = vec![
            ("profile", profile_id.to_string()),
            ("size", page_size.to_string()),
            ("sort", "id,asc".to_string()),
        ];
        if seek_position > 0 {
            query.push(("seekPosition", seek_position.to_string()));
        }
        self.http.get("v2/accounts", &query).await
    }

    async fn get_transfers(&self, profile_id: u64, offset: usize, limit: usize) -> Result<Vec<Transfer>, ClientError> {
        self.http
            .get(
                "v1/transfers",
                &[
                    ("profile", profile_id.to_string()),
                    ("offset", offset.to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await
    }

    async fn get_transfer(&self, transfer_id: u64) -> Result<Transfer, ClientError> {
        self.http.get(&format!("v1/transfers/{transfer_id}"), &[]).await
    }

    async fn create_quote(&self, profile_id: u64, req: &QuoteRequest) -> Result<Quote, ClientError> {
        self.http
            .post(&format!("v3/profiles/{profile_id}/quotes"), req)
            .await
    }

    async fn create_transfer(&self, req: &TransferRequest) -> Result<Transfer, ClientError> {
        self.http.post("v1/transfers", req).await
    }

    async fn get_currencies(&self) -> Result<Vec<CurrencyInfo>, ClientError> {
        self.http.get("v1/currencies", &[]).await
    }

    async fn create_subscription(
        &self,
        profile_id: u64,
        req: &SubscriptionRequest,
    ) -> Result<Subscription, ClientError> {
        self.http
            .post(&format!("v3/profiles/{profile_id}/subscriptions"), req)
            .await
    }

    async fn list_subscriptions(&self, profile_id: u64) -> Result<Vec<Subscription>, ClientError> {
        self.http
            .get(&format!("v3/profiles/{profile_id}/subscriptions"), &[])
            .await
    }

    async fn delete_subscription(&self, profile_id: u64, subscription_id: &str) -> Result<(), ClientError> {
        self.http
            .delete(&format!("v3/profiles/{profile_id}/subscriptions/{subscription_id}"))
            .await
    }
}

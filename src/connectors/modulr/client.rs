use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use crate::http::{Auth, ClientError, HttpClient};
use crate::models::decimal_text;

/// Timestamp layout used throughout the Modulr API, e.g.
/// `2024-01-05T10:20:30.123+0000`.
const MODULR_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f%z";

pub fn parse_time(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::<FixedOffset>::parse_from_str(value, MODULR_TIME_FORMAT).map(|t| t.with_timezone(&Utc))
}

pub fn format_time(value: &DateTime<Utc>) -> String {
    value.format("%Y-%m-%dT%H:%M:%S%z").to_string()
}

#[derive(Debug, Deserialize)]
struct PageResponse<T> {
    #[serde(default = "Vec::new")]
    content: Vec<T>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub status: String,
    pub currency: String,
    #[serde(deserialize_with = "decimal_text")]
    pub balance: String,
    #[serde(default)]
    pub customer_id: String,
    pub created_date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Beneficiary {
    pub id: String,
    pub name: String,
    pub created: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionAccount {
    pub id: String,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub source_id: String,
    #[serde(default)]
    pub description: String,
    pub posted_date: String,
    pub transaction_date: String,
    pub credit: bool,
    #[serde(deserialize_with = "decimal_text")]
    pub amount: String,
    pub account: TransactionAccount,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Destination {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

pub const DESTINATION_ACCOUNT: &str = "ACCOUNT";
pub const DESTINATION_BENEFICIARY: &str = "BENEFICIARY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetails {
    pub source_account_id: String,
    pub destination: Destination,
    pub currency: String,
    #[serde(deserialize_with = "decimal_text")]
    pub amount: String,
}

/// A transfer or payout as returned by `/payments`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub id: String,
    pub status: String,
    pub created_date: String,
    #[serde(default)]
    pub external_reference: String,
    #[serde(default)]
    pub message: String,
    pub details: PaymentDetails,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub source_account_id: String,
    pub destination: Destination,
    pub currency: String,
    pub amount: serde_json::Number,
    pub reference: String,
    pub external_reference: String,
}

#[async_trait]
pub trait Client: Send + Sync {
    /// Accounts sorted by creation date, oldest first.
    async fn get_accounts(&self, page: usize, page_size: usize) -> Result<Vec<Account>, ClientError>;

    async fn get_account(&self, account_id: &str) -> Result<Account, ClientError>;

    /// Beneficiaries sorted by creation date, oldest first.
    async fn get_beneficiaries(&self, page: usize, page_size: usize) -> Result<Vec<Beneficiary>, ClientError>;

    /// Transactions of one account posted at or after `from`, oldest first.
    async fn get_transactions(
        &self,
        account_id: &str,
        page: usize,
        page_size: usize,
        from: Option<DateTime<Utc>>,
    ) -> Result<Vec<Transaction>, ClientError>;

    async fn initiate_payment(&self, req: &PaymentRequest) -> Result<PaymentResponse, ClientError>;

    async fn get_payment(&self, payment_id: &str) -> Result<PaymentResponse, ClientError>;
}

pub struct HttpModulrClient {
    http: HttpClient,
}

impl HttpModulrClient {
    pub fn new(api_key: &str, api_secret: &str, endpoint: &str) -> Result<Self, ClientError> {
        let http = HttpClient::new(
            endpoint,
            Auth::HmacSignature {
                key_id: api_key.to_string(),
                secret: api_secret.to_string(),
            },
        )?;
        Ok(Self { http })
    }

    fn paging(page: usize, page_size: usize, sort_field: &str) -> Vec<(&'static str, String)> {
        vec![
            ("page", page.to_string()),
            ("size", page_size.to_string()),
            ("sortField", sort_field.to_string()),
            ("sortOrder", "asc".to_string()),
        ]
    }
}

#[async_trait]
impl Client for HttpModulrClient {
    async fn get_accounts(&self, page: usize, page_size: usize) -> Result<Vec<Account>, ClientError> {
        let query = Self::paging(page, page_size, "createdDate");
        let resp: PageResponse<Account> = self.http.get("accounts", &query).await?;
        Ok(resp.content)
    }

    async fn get_account(&self, account_id: &str) -> Result<Account, ClientError> {
        self.http.get(&format!("accounts/{account_id}"), &[]).await
    }

    async fn get_beneficiaries(&self, page: usize, page_size: usize) -> Result<Vec<Beneficiary>, ClientError> {
        let query = Self::paging(page, page_size, "created");
        let resp: PageResponse<Beneficiary> = self.http.get("beneficiaries", &query).await?;
        Ok(resp.content)
    }

    async fn get_transactions(
        &self,
        account_id: &str,
        page: usize,
        page_size: usize,
        from: Option<DateTime<Utc>>,
    ) -> Result<Vec<Transaction>, ClientError> {
        let mut query = vec![("page", page.to_string()), ("size", page_size.to_string())];
        if let Some(from) = from {
            query.push(("fromTransactionDate", format_time(&from)));
        }
        let resp: PageResponse<Transaction> = self
            .http
            .get(&format!("accounts/{account_id}/transactions"), &query)
            .await?;
        Ok(resp.content)
    }

    async fn initiate_payment(&self, req: &PaymentRequest) -> Result<PaymentResponse, ClientError> {
        self.http.post("payments", req).await
    }

    async fn get_payment(&self, payment_id: &str) -> Result<PaymentResponse, ClientError> {
        let resp: PageResponse<PaymentResponse> =
            self.http.get("payments", &[("id", payment_id.to_string())]).await?;
        resp.content
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::NotFound(format!("payment {payment_id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_modulr_time() {
        let t = parse_time("2024-01-05T10:20:30.123+0000").unwrap();
        assert_eq!(t.to_rfc3339(), "2024-01-05T10:20:30.123+00:00");
        let t = parse_time("2024-01-05T12:00:00+0200").unwrap();
        assert_eq!(t.to_rfc3339(), "2024-01-05T10:00:00+00:00");
        assert!(parse_time("2024-01-05").is_err());
    }

    #[test]
    fn test_amounts_keep_decimal_text() {
        let account: Account = serde_json::from_value(serde_json::json!({
            "id": "A1",
            "name": "main",
            "currency": "GBP",
            "balance": 1050.25,
            "createdDate": "2024-01-05T10:20:30.000+0000"
        }))
        .unwrap();
        assert_eq!(account.balance, "1050.25");

        let account: Account = serde_json::from_value(serde_json::json!({
            "id": "A1",
            "name": "main",
            "currency": "GBP",
            "balance": "7.10",
            "createdDate": "2024-01-05T10:20:30.000+0000"
        }))
        .unwrap();
        assert_eq!(account.balance, "7.10");
    }

    #[test]
    fn test_high_precision_amounts_are_not_rounded() {
        let account: Account = serde_json::from_str(
            r#"{"id":"A1","name":"main","currency":"GBP","balance":12345678901234567.89,"createdDate":"2024-01-05T10:20:30.000+0000"}"#,
        )
        .unwrap();
        assert_eq!(account.balance, "12345678901234567.89");
        assert_eq!(
            crate::currency::amount_from_decimal_str(&account.balance, 2).unwrap().to_string(),
            "1234567890123456789"
        );
    }
}

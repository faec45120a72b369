//! File-backed dummypay "API".
//!
//! Each entity type lives in one JSON array file inside the configured
//! directory. A missing file reads as an empty list.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::http::ClientError;

pub const ACCOUNTS_FILE: &str = "accounts.json";
pub const EXTERNAL_ACCOUNTS_FILE: &str = "external_accounts.json";
pub const BALANCES_FILE: &str = "balances.json";
pub const PAYMENTS_FILE: &str = "payments.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub name: String,
    pub currency: String,
    pub opening_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub account_id: String,
    pub amount_in_minors: i64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: String,
    pub amount_in_minors: i64,
    pub currency: String,
    #[serde(default)]
    pub source_account_id: Option<String>,
    #[serde(default)]
    pub destination_account_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Offset page plus the offset to resume from, `None` once exhausted.
pub type OffsetPage<T> = (Vec<T>, Option<usize>);

#[async_trait]
pub trait Client: Send + Sync {
    async fn fetch_accounts(&self, start: usize, page_size: usize) -> Result<OffsetPage<Account>, ClientError>;

    async fn fetch_external_accounts(
        &self,
        start: usize,
        page_size: usize,
    ) -> Result<OffsetPage<Account>, ClientError>;

    async fn fetch_balance(&self, account_id: &str) -> Result<Option<Balance>, ClientError>;

    /// Payments created at or after `from`, in file order.
    async fn fetch_payments(
        &self,
        from: Option<DateTime<Utc>>,
        page: usize,
        page_size: usize,
    ) -> Result<Vec<Payment>, ClientError>;

    /// Record a payment and move funds between the tracked balances it touches.
    async fn create_payment(&self, payment: Payment) -> Result<Payment, ClientError>;
}

pub struct FileClient {
    directory: PathBuf,
}

impl FileClient {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    async fn read<T: DeserializeOwned>(&self, file: &str) -> Result<Vec<T>, ClientError> {
        match tokio::fs::read(self.directory.join(file)).await {
            Ok(bytes) if bytes.is_empty() => Ok(Vec::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write<T: Serialize>(&self, file: &str, items: &[T]) -> Result<(), ClientError> {
        let bytes = serde_json::to_vec_pretty(items)?;
        tokio::fs::write(self.directory.join(file), bytes).await?;
        Ok(())
    }

    async fn offset_page(
        &self,
        file: &str,
        start: usize,
        page_size: usize,
    ) -> Result<OffsetPage<Account>, ClientError> {
        let accounts: Vec<Account> = self.read(file).await?;
        let page: Vec<Account> = accounts.iter().skip(start).take(page_size).cloned().collect();
        let end = start + page.len();
        let next = (end < accounts.len()).then_some(end);
        Ok((page, next))
    }
}

#[async_trait]
impl Client for FileClient {
    async fn fetch_accounts(&self, start: usize, page_size: usize) -> Result<OffsetPage<Account>, ClientError> {
        self.offset_page(ACCOUNTS_FILE, start, page_size).await
    }

    async fn fetch_external_accounts(
        &self,
        start: usize,
        page_size: usize,
    ) -> Result<OffsetPage<Account>, ClientError> {
        self.offset_page(EXTERNAL_ACCOUNTS_FILE, start, page_size).await
    }

    async fn fetch_balance(&self, account_id: &str) -> Result<Option<Balance>, ClientError> {
        let balances: Vec<Balance> = self.read(BALANCES_FILE).await?;
        Ok(balances.into_iter().find(|b| b.account_id == account_id))
    }

    async fn fetch_payments(
        &self,
        from: Option<DateTime<Utc>>,
        page: usize,
        page_size: usize,
    ) -> Result<Vec<Payment>, ClientError> {
        let payments: Vec<Payment> = self.read(PAYMENTS_FILE).await?;
        Ok(payments
            .into_iter()
            .filter(|p| from.map_or(true, |from| p.created_at >= from))
            .skip(page * page_size)
            .take(page_size)
            .collect())
    }

    async fn create_payment(&self, payment: Payment) -> Result<Payment, ClientError> {
        let mut balances: Vec<Balance> = self.read(BALANCES_FILE).await?;
        let mut adjust = |account_id: &str, delta: i64| -> Result<(), ClientError> {
            match balances.iter_mut().find(|b| b.account_id == account_id) {
                Some(balance) => {
                    let updated = balance.amount_in_minors + delta;
                    if updated < 0 {
                        return Err(ClientError::Status {
                            status: 422,
                            body: format!("insufficient funds on {account_id}"),
                        });
                    }
                    balance.amount_in_minors = updated;
                }
                // Credits to accounts without a tracked balance (external
                // accounts) are not recorded.
                None if delta >= 0 => {}
                None => return Err(ClientError::NotFound(format!("balance for {account_id}"))),
            }
            Ok(())
        };

        if let Some(source) = &payment.source_account_id {
            adjust(source, -payment.amount_in_minors)?;
        }
        if let Some(destination) = &payment.destination_account_id {
            adjust(destination, payment.amount_in_minors)?;
        }

        let mut payments: Vec<Payment> = self.read(PAYMENTS_FILE).await?;
        if payments.iter().any(|p| p.id == payment.id) {
            return Err(ClientError::Status {
                status: 409,
                body: format!("payment {} already exists", payment.id),
            });
        }
        payments.push(payment.clone());

        self.write(BALANCES_FILE, &balances).await?;
        self.write(PAYMENTS_FILE, &payments).await?;
        Ok(payment)
    }
}

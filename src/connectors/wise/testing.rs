//! In-memory Wise client for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use super::client::*;
use crate::http::ClientError;

#[derive(Default)]
pub struct FakeClient {
    pub profiles: Vec<Profile>,
    pub balances: HashMap<u64, Vec<Balance>>,
    pub recipients: Vec<RecipientAccount>,
    pub transfers: Mutex<Vec<Transfer>>,
    pub currencies: Vec<CurrencyInfo>,
    pub quotes: Mutex<HashMap<String, QuoteRequest>>,
    pub subscriptions: Mutex<Vec<(u64, Subscription)>>,
    pub currency_calls: AtomicUsize,
    pub fail_next: AtomicBool,
}

impl FakeClient {
    fn check(&self) -> Result<(), ClientError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(ClientError::Status {
                status: 500,
                body: "boom".into(),
            });
        }
        Ok(())
    }
}

pub fn time(minutes: i64) -> DateTime<Utc> {
    let start: DateTime<Utc> = "2024-01-01T00:00:00Z".parse().unwrap_or_default();
    start + Duration::minutes(minutes)
}

pub fn profile(id: u64) -> Profile {
    Profile {
        id,
        kind: "business".into(),
    }
}

pub fn balance(id: u64, currency: &str, value: &str) -> Balance {
    Balance {
        id,
        currency: currency.into(),
        kind: "STANDARD".into(),
        name: None,
        amount: Amount {
            value: value.into(),
            currency: currency.into(),
        },
        creation_time: time(id as i64),
        modification_time: time(id as i64),
    }
}

pub fn recipient(id: u64, profile: u64) -> RecipientAccount {
    RecipientAccount {
        id,
        profile,
        currency: "EUR".into(),
        name: RecipientName {
            full_name: format!("recipient {id}"),
        },
    }
}

pub fn transfer(id: u64, currency: &str, status: &str) -> Transfer {
    Transfer {
        id,
        reference: format!("ref-{id}"),
        status: status.into(),
        source_account: Some(100),
        target_account: 200,
        source_currency: currency.into(),
        source_value: "25.5".into(),
        target_currency: currency.into(),
        target_value: "25.5".into(),
        created: time(id as i64).format("%Y-%m-%d %H:%M:%S").to_string(),
    }
}

pub fn currencies() -> Vec<CurrencyInfo> {
    ["EUR", "GBP", "USD"]
        .into_iter()
        .map(|code| CurrencyInfo {
            code: code.into(),
            supports_decimals: true,
        })
        .chain(std::iter::once(CurrencyInfo {
            code: "HUF".into(),
            supports_decimals: false,
        }))
        .collect()
}

#[async_trait]
impl Client for FakeClient {
    async fn get_profiles(&self) -> Result<Vec<Profile>, ClientError> {
        self.check()?;
        Ok(self.profiles.clone())
    }

    async fn get_balances(&self, profile_id: u64) -> Result<Vec<Balance>, ClientError> {
        self.check()?;
        Ok(self.balances.get(&profile_id).cloned().unwrap_or_default())
    }

    async fn get_balance(&self, profile_id: u64, balance_id: u64) -> Result<Balance, ClientError> {
        self.check()?;
        self.balances
            .get(&profile_id)
            .and_then(|bs| bs.iter().find(|b| b.id == balance_id))
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("balance {balance_id}")))
    }

    async fn get_recipient_accounts(
        &self,
        profile_id: u64,
        page_size: usize,
        seek_position: u64,
    ) -> Result<RecipientAccountsPage, ClientError> {
        self.check()?;
        let content: Vec<RecipientAccount> = self
            .recipients
            .iter()
            .filter(|r| r.profile == profile_id && r.id > seek_position)
            .take(page_size)
            .cloned()
            .collect();
        let seek_position_for_next = content.last().map(|r| r.id);
        Ok(RecipientAccountsPage {
            content,
            seek_position_for_next,
        })
    }

    async fn get_transfers(&self, _profile_id: u64, offset: usize, limit: usize) -> Result<Vec<Transfer>, ClientError> {
        self.check()?;
        let transfers = self.transfers.lock().unwrap_or_else(|e| e.into_inner());
        Ok(transfers.iter().skip(offset).take(limit).cloned().collect())
    }

    async fn get_transfer(&self, transfer_id: u64) -> Result<Transfer, ClientError> {
        self.check()?;
        let transfers = self.transfers.lock().unwrap_or_else(|e| e.into_inner());
        transfers
            .iter()
            .find(|t| t.id == transfer_id)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("transfer {transfer_id}")))
    }

    async fn create_quote(&self, _profile_id: u64, req: &QuoteRequest) -> Result<Quote, ClientError> {
        self.check()?;
        let mut quotes = self.quotes.lock().unwrap_or_else(|e| e.into_inner());
        let id = format!("quote-{}", quotes.len() + 1);
        quotes.insert(id.clone(), req.clone());
        Ok(Quote { id })
    }

    async fn create_transfer(&self, req: &TransferRequest) -> Result<Transfer, ClientError> {
        self.check()?;
        let quote = {
            let quotes = self.quotes.lock().unwrap_or_else(|e| e.into_inner());
            quotes
                .get(&req.quote_uuid)
                .cloned()
                .ok_or_else(|| ClientError::NotFound(req.quote_uuid.clone()))?
        };
        let mut transfers = self.transfers.lock().unwrap_or_else(|e| e.into_inner());
        let transfer = Transfer {
            id: 1000 + transfers.len() as u64,
            reference: req.details.reference.clone(),
            status: "incoming_payment_waiting".into(),
            source_account: None,
            target_account: req.target_account,
            source_currency: quote.source_currency.clone(),
            source_value: quote.source_amount.to_string(),
            target_currency: quote.target_currency.clone(),
            target_value: quote.source_amount.to_string(),
            created: time(0).format("%Y-%m-%d %H:%M:%S").to_string(),
        };
        transfers.push(transfer.clone());
        Ok(transfer)
    }

    async fn get_currencies(&self) -> Result<Vec<CurrencyInfo>, ClientError> {
        self.currency_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.currencies.clone())
    }

    async fn create_subscription(
        &self,
        profile_id: u64,
        req: &SubscriptionRequest,
    ) -> Result<Subscription, ClientError> {
        self.check()?;
        let mut subscriptions = self.subscriptions.lock().unwrap_or_else(|e| e.into_inner());
        let subscription = Subscription {
            id: format!("sub-{}", subscriptions.len() + 1),
            name: req.name.clone(),
            trigger_on: req.trigger_on.clone(),
            delivery: req.delivery.clone(),
        };
        subscriptions.push((profile_id, subscription.clone()));
        Ok(subscription)
    }

    async fn list_subscriptions(&self, profile_id: u64) -> Result<Vec<Subscription>, ClientError> {
        self.check()?;
        let subscriptions = self.subscriptions.lock().unwrap_or_else(|e| e.into_inner());
        Ok(subscriptions
            .iter()
            .filter(|(p, _)| *p == profile_id)
            .map(|(_, s)| s.clone())
            .collect())
    }

    async fn delete_subscription(&self, profile_id: u64, subscription_id: &str) -> Result<(), ClientError> {
        self.check()?;
        let mut subscriptions = self.subscriptions.lock().unwrap_or_else(|e| e.into_inner());
        subscriptions.retain(|(p, s)| !(*p == profile_id && s.id == subscription_id));
        Ok(())
    }
}

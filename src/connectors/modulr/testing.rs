//! In-memory Modulr client for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use super::client::*;
use crate::http::ClientError;

#[derive(Default)]
pub struct FakeClient {
    pub accounts: Vec<Account>,
    pub beneficiaries: Vec<Beneficiary>,
    pub transactions: HashMap<String, Vec<Transaction>>,
    pub payments: Mutex<HashMap<String, PaymentResponse>>,
    /// Fail the next list call once.
    pub fail_next: AtomicBool,
    pub calls: AtomicUsize,
}

impl FakeClient {
    fn tick(&self) -> Result<(), ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(ClientError::Status {
                status: 503,
                body: "unavailable".into(),
            });
        }
        Ok(())
    }
}

fn page_of<T: Clone>(items: &[T], page: usize, page_size: usize) -> Vec<T> {
    items.iter().skip(page * page_size).take(page_size).cloned().collect()
}

pub fn time(minutes: i64) -> DateTime<Utc> {
    let start: DateTime<Utc> = "2024-01-01T00:00:00Z".parse().unwrap_or_default();
    start + Duration::minutes(minutes)
}

pub fn modulr_time(minutes: i64) -> String {
    time(minutes).format("%Y-%m-%dT%H:%M:%S%.3f%z").to_string()
}

pub fn account(i: i64, currency: &str) -> Account {
    Account {
        id: format!("A{i:03}"),
        name: format!("account {i}"),
        status: "ACTIVE".into(),
        currency: currency.into(),
        balance: "100.50".into(),
        customer_id: "C1".into(),
        created_date: modulr_time(i),
    }
}

pub fn beneficiary(i: i64, minutes: i64) -> Beneficiary {
    Beneficiary {
        id: format!("B{i:03}"),
        name: format!("beneficiary {i}"),
        created: modulr_time(minutes),
    }
}

pub fn transaction(i: i64, kind: &str, credit: bool, currency: &str) -> Transaction {
    Transaction {
        id: format!("T{i:03}"),
        kind: kind.into(),
        source_id: format!("S{i:03}"),
        description: String::new(),
        posted_date: modulr_time(i),
        transaction_date: modulr_time(i),
        credit,
        amount: "12.34".into(),
        account: TransactionAccount {
            id: "A000".into(),
            currency: currency.into(),
        },
    }
}

pub fn payment_response(id: &str, status: &str) -> PaymentResponse {
    PaymentResponse {
        id: id.into(),
        status: status.into(),
        created_date: modulr_time(0),
        external_reference: String::new(),
        message: String::new(),
        details: PaymentDetails {
            source_account_id: "A000".into(),
            destination: Destination {
                kind: DESTINATION_ACCOUNT.into(),
                id: "A001".into(),
            },
            currency: "GBP".into(),
            amount: "12.34".into(),
        },
    }
}

#[async_trait]
impl Client for FakeClient {
    async fn get_accounts(&self, page: usize, page_size: usize) -> Result<Vec<Account>, ClientError> {
        self.tick()?;
        Ok(page_of(&self.accounts, page, page_size))
    }

    async fn get_account(&self, account_id: &str) -> Result<Account, ClientError> {
        self.tick()?;
        self.accounts
            .iter()
            .find(|a| a.id == account_id)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(account_id.to_string()))
    }

    async fn get_beneficiaries(&self, page: usize, page_size: usize) -> Result<Vec<Beneficiary>, ClientError> {
        self.tick()?;
        Ok(page_of(&self.beneficiaries, page, page_size))
    }

    async fn get_transactions(
        &self,
        account_id: &str,
        page: usize,
        page_size: usize,
        from: Option<DateTime<Utc>>,
    ) -> Result<Vec<Transaction>, ClientError> {
        self.tick()?;
        let all: Vec<Transaction> = self
            .transactions
            .get(account_id)
            .map(|txs| {
                txs.iter()
                    .filter(|t| {
                        from.map_or(true, |from| {
                            parse_time(&t.transaction_date).map_or(false, |d| d >= from)
                        })
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(page_of(&all, page, page_size))
    }

    async fn initiate_payment(&self, req: &PaymentRequest) -> Result<PaymentResponse, ClientError> {
        self.tick()?;
        let mut payments = self.payments.lock().unwrap_or_else(|e| e.into_inner());
        let id = format!("P{:03}", payments.len());
        let mut resp = payment_response(&id, "SUBMITTED");
        resp.details = PaymentDetails {
            source_account_id: req.source_account_id.clone(),
            destination: req.destination.clone(),
            currency: req.currency.clone(),
            amount: req.amount.to_string(),
        };
        resp.external_reference = req.external_reference.clone();
        payments.insert(id, resp.clone());
        Ok(resp)
    }

    async fn get_payment(&self, payment_id: &str) -> Result<PaymentResponse, ClientError> {
        self.tick()?;
        let payments = self.payments.lock().unwrap_or_else(|e| e.into_inner());
        payments
            .get(payment_id)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(payment_id.to_string()))
    }
}

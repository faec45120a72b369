//! Random fixture data for a dummypay directory.

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use rand::seq::SliceRandom;
use rand::Rng;

use super::client::{
    Account, Balance, Payment, ACCOUNTS_FILE, BALANCES_FILE, EXTERNAL_ACCOUNTS_FILE, PAYMENTS_FILE,
};
use crate::http::ClientError;

const CURRENCIES: &[&str] = &["EUR", "USD", "GBP", "JPY"];
const PAYMENT_TYPES: &[&str] = &["PAYIN", "PAYOUT", "TRANSFER"];
const STATUSES: &[&str] = &["SUCCEEDED", "PENDING", "FAILED"];

/// Write `count` accounts, external accounts and payments, plus one balance
/// per account, into `dir`. Existing fixture files are overwritten.
///
/// Payments are spaced one minute apart so every creation time is unique.
pub async fn seed<R: Rng>(dir: &Path, count: usize, rng: &mut R) -> Result<(), ClientError> {
    tokio::fs::create_dir_all(dir).await?;

    let start: DateTime<Utc> = Utc::now() - Duration::days(30);

    let accounts: Vec<Account> = (0..count)
        .map(|i| Account {
            id: format!("acc-{i:04}"),
            name: format!("Account {i}"),
            currency: pick(CURRENCIES, rng).to_string(),
            opening_date: start + Duration::hours(i as i64),
        })
        .collect();

    let external_accounts: Vec<Account> = (0..count)
        .map(|i| Account {
            id: format!("ext-{i:04}"),
            name: format!("Beneficiary {i}"),
            currency: pick(CURRENCIES, rng).to_string(),
            opening_date: start + Duration::hours(i as i64),
        })
        .collect();

    let balances: Vec<Balance> = accounts
        .iter()
        .map(|a| Balance {
            account_id: a.id.clone(),
            amount_in_minors: rng.gen_range(0..1_000_000),
            currency: a.currency.clone(),
        })
        .collect();

    let payments: Vec<Payment> = (0..count)
        .map(|i| {
            let account = accounts.choose(rng);
            Payment {
                id: format!("pay-{i:04}"),
                parent_id: None,
                kind: pick(PAYMENT_TYPES, rng).to_string(),
                status: pick(STATUSES, rng).to_string(),
                amount_in_minors: rng.gen_range(100..100_000),
                currency: account.map_or("EUR".to_string(), |a| a.currency.clone()),
                source_account_id: None,
                destination_account_id: account.map(|a| a.id.clone()),
                created_at: start + Duration::minutes(i as i64),
            }
        })
        .collect();

    write(dir, ACCOUNTS_FILE, &accounts).await?;
    write(dir, EXTERNAL_ACCOUNTS_FILE, &external_accounts).await?;
    write(dir, BALANCES_FILE, &balances).await?;
    write(dir, PAYMENTS_FILE, &payments).await?;
    Ok(())
}

fn pick<'a, R: Rng>(values: &[&'a str], rng: &mut R) -> &'a str {
    values[rng.gen_range(0..values.len())]
}

async fn write<T: serde::Serialize>(dir: &Path, file: &str, items: &[T]) -> Result<(), ClientError> {
    tokio::fs::write(dir.join(file), serde_json::to_vec_pretty(items)?).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::client::{Client, FileClient};
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[tokio::test]
    async fn test_seed_is_readable() {
        let dir = tempfile::tempdir().unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        seed(dir.path(), 12, &mut rng).await.unwrap();

        let client = FileClient::new(dir.path());
        let (accounts, next) = client.fetch_accounts(0, 100).await.unwrap();
        assert_eq!(accounts.len(), 12);
        assert_eq!(next, None);
        assert!(client.fetch_balance("acc-0003").await.unwrap().is_some());
        assert_eq!(client.fetch_payments(None, 0, 100).await.unwrap().len(), 12);
    }
}

use chrono::{DateTime, Utc};
use num_traits::Signed;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::accounts::created_at;
use super::client::{Client, PaymentResponse, Transaction, DESTINATION_BENEFICIARY};
use super::SUPPORTED_CURRENCIES;
use crate::connector::{FetchNextPaymentsResponse, FetchNextRequest, FetchNextResponse};
use crate::currency;
use crate::error::PluginError;
use crate::models::{Metadata, PaymentScheme, PaymentStatus, PaymentType, PspAccount, PspPayment};
use crate::pagination::{
    decode_from_payload, decode_state, encode_state, should_fetch_more, to_raw, validate_page_size,
};

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct PaymentsState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transaction_time: Option<DateTime<Utc>>,
}

pub(super) async fn fetch_next(
    client: &dyn Client,
    req: FetchNextRequest,
) -> Result<FetchNextPaymentsResponse, PluginError> {
    validate_page_size(req.page_size)?;
    let state: PaymentsState = decode_state(req.state())?;
    let from: PspAccount = decode_from_payload(req.from_payload())?;

    let mut items: Vec<PspPayment> = Vec::with_capacity(req.page_size);
    let mut watermark = state.last_transaction_time;
    let mut has_more;
    let mut page = 0;

    loop {
        let batch = client
            .get_transactions(&from.reference, page, req.page_size, state.last_transaction_time)
            .await
            .map_err(|e| PluginError::client("failed to get transactions", e))?;

        let mut unconsumed = false;
        for transaction in &batch {
            let transaction_time = created_at(&transaction.transaction_date, "transaction")?;
            if state.last_transaction_time.is_some_and(|last| transaction_time <= last) {
                continue;
            }
            if items.len() >= req.page_size {
                unconsumed = true;
                break;
            }

            // Dropped records still move the watermark so they are not refetched.
            watermark = Some(transaction_time);
            if let Some(payment) = transaction_to_payment(client, transaction, &from).await? {
                items.push(payment);
            }
        }

        let (need_more, more) = should_fetch_more(&items, &batch, req.page_size);
        has_more = more || unconsumed;
        if !need_more {
            break;
        }
        page += 1;
    }

    Ok(FetchNextResponse {
        items,
        new_state: encode_state(&PaymentsState {
            last_transaction_time: watermark,
        })?,
        has_more,
    })
}

pub(super) fn transaction_type(kind: &str) -> PaymentType {
    match kind {
        "PI_REV" | "PO_REV" | "ADHOC" => PaymentType::Other,
        "INT_INTERC" => PaymentType::Transfer,
        k if k.starts_with("PI_") => PaymentType::Payin,
        k if k.starts_with("PO_") => PaymentType::Payout,
        _ => PaymentType::Other,
    }
}

async fn transaction_to_payment(
    client: &dyn Client,
    transaction: &Transaction,
    from: &PspAccount,
) -> Result<Option<PspPayment>, PluginError> {
    let payment_type = transaction_type(&transaction.kind);

    if payment_type == PaymentType::Transfer {
        // Internal transfers show up on both accounts. Only the credit side
        // is reported, with the full transfer fetched once.
        if !transaction.credit {
            return Ok(None);
        }
        let transfer = client
            .get_payment(&transaction.source_id)
            .await
            .map_err(|e| PluginError::client("failed to get transfer", e))?;
        return payment_response_to_payment(&transfer);
    }

    let Some(precision) = currency::precision(SUPPORTED_CURRENCIES, &transaction.account.currency) else {
        debug!(
            reference = %transaction.source_id,
            currency = %transaction.account.currency,
            "skipping transaction with unsupported currency"
        );
        return Ok(None);
    };

    let amount = currency::amount_from_decimal_str(&transaction.amount, precision)?.abs();
    let mut payment = PspPayment {
        parent_reference: String::new(),
        // The source id is stable across both legs, the transaction id is not.
        reference: transaction.source_id.clone(),
        created_at: created_at(&transaction.posted_date, "transaction")?,
        payment_type,
        amount,
        asset: currency::format_asset(&transaction.account.currency, precision),
        scheme: PaymentScheme::Other,
        status: PaymentStatus::Succeeded,
        source_account_reference: None,
        destination_account_reference: None,
        metadata: Metadata::new(),
        raw: to_raw(transaction)?,
    };

    let is_destination = match payment_type {
        PaymentType::Payin => true,
        PaymentType::Payout => false,
        _ => transaction.credit,
    };
    if is_destination {
        payment.destination_account_reference = Some(from.reference.clone());
    } else {
        payment.source_account_reference = Some(from.reference.clone());
    }

    Ok(Some(payment))
}

pub(super) enum Progress {
    Pending,
    Processed,
    Failed,
}

pub(super) fn progress(status: &str) -> Progress {
    match status {
        "SUBMITTED" | "PENDING_FOR_DATE" | "PENDING_FOR_FUNDS" | "VALIDATED" | "SCREENING_REQ" => {
            Progress::Pending
        }
        "EXT_PROC" | "PROCESSED" | "RECONCILED" => Progress::Processed,
        _ => Progress::Failed,
    }
}

/// Translate a transfer or payout. `None` when its currency is unsupported.
pub(super) fn payment_response_to_payment(resp: &PaymentResponse) -> Result<Option<PspPayment>, PluginError> {
    let details = &resp.details;
    let Some(precision) = currency::precision(SUPPORTED_CURRENCIES, &details.currency) else {
        debug!(reference = %resp.id, currency = %details.currency, "skipping payment with unsupported currency");
        return Ok(None);
    };

    let payment_type = if details.destination.kind == DESTINATION_BENEFICIARY {
        PaymentType::Payout
    } else {
        PaymentType::Transfer
    };
    let status = match progress(&resp.status) {
        Progress::Pending => PaymentStatus::Pending,
        Progress::Processed => PaymentStatus::Succeeded,
        Progress::Failed => PaymentStatus::Failed,
    };

    Ok(Some(PspPayment {
        parent_reference: String::new(),
        reference: resp.id.clone(),
        created_at: created_at(&resp.created_date, "payment")?,
        payment_type,
        amount: currency::amount_from_decimal_str(&details.amount, precision)?,
        asset: currency::format_asset(&details.currency, precision),
        scheme: PaymentScheme::Other,
        status,
        source_account_reference: Some(details.source_account_id.clone()),
        destination_account_reference: Some(details.destination.id.clone()),
        metadata: Metadata::new(),
        raw: to_raw(resp)?,
    }))
}

#[cfg(test)]
mod tests {
    use super::super::testing::{account, payment_response, time, transaction, FakeClient};
    use super::*;
    use crate::error::ErrorKind;
    use num_bigint::BigInt;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::Ordering;

    fn parent() -> Vec<u8> {
        let account = account(0, "GBP");
        serde_json::to_vec(&PspAccount {
            reference: account.id.clone(),
            created_at: time(0),
            name: None,
            default_asset: Some("GBP/2".into()),
            metadata: Metadata::new(),
            raw: serde_json::to_value(&account).unwrap(),
        })
        .unwrap()
    }

    fn client_with(transactions: Vec<Transaction>) -> FakeClient {
        FakeClient {
            transactions: HashMap::from([("A000".to_string(), transactions)]),
            ..Default::default()
        }
    }

    async fn call(client: &FakeClient, state: Option<Vec<u8>>, page_size: usize) -> FetchNextPaymentsResponse {
        fetch_next(
            client,
            FetchNextRequest {
                state,
                page_size,
                from_payload: Some(parent()),
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_fifty_transactions_in_pages_of_forty() {
        let client = client_with((1..=50).map(|i| transaction(i, "PI_FAST", true, "GBP")).collect());

        let first = call(&client, None, 40).await;
        assert_eq!(first.items.len(), 40);
        assert!(first.has_more);
        let state: PaymentsState = serde_json::from_slice(&first.new_state).unwrap();
        assert_eq!(state.last_transaction_time, Some(time(40)));

        let second = call(&client, Some(first.new_state), 40).await;
        assert_eq!(second.items.len(), 10);
        assert!(!second.has_more);

        let refs: Vec<String> = first
            .items
            .iter()
            .chain(&second.items)
            .map(|p| p.reference.clone())
            .collect();
        let expected: Vec<String> = (1..=50).map(|i| format!("S{i:03}")).collect();
        assert_eq!(refs, expected);
    }

    #[tokio::test]
    async fn test_unsupported_currency_mid_page() {
        let client = client_with(vec![
            transaction(1, "PI_FAST", true, "GBP"),
            transaction(2, "PI_FAST", true, "CHF"),
            transaction(3, "PO_FAST", false, "EUR"),
        ]);

        let resp = call(&client, None, 10).await;
        let refs: Vec<&str> = resp.items.iter().map(|p| p.reference.as_str()).collect();
        assert_eq!(refs, vec!["S001", "S003"]);
        assert_eq!(resp.items[0].destination_account_reference.as_deref(), Some("A000"));
        assert_eq!(resp.items[1].source_account_reference.as_deref(), Some("A000"));
        assert_eq!(resp.items[0].amount, BigInt::from(1234));

        let only_dropped = client_with(vec![transaction(1, "PI_FAST", true, "CHF")]);
        let resp = call(&only_dropped, None, 10).await;
        assert!(resp.items.is_empty());
        let state: PaymentsState = serde_json::from_slice(&resp.new_state).unwrap();
        assert_eq!(state.last_transaction_time, Some(time(1)));
    }

    #[tokio::test]
    async fn test_transfers_reported_on_credit_side_only() {
        let client = client_with(vec![
            transaction(1, "INT_INTERC", false, "GBP"),
            transaction(2, "INT_INTERC", true, "GBP"),
        ]);
        client
            .payments
            .lock()
            .unwrap()
            .insert("S002".into(), payment_response("S002", "PROCESSED"));

        let resp = call(&client, None, 10).await;
        assert_eq!(resp.items.len(), 1);
        assert_eq!(resp.items[0].reference, "S002");
        assert_eq!(resp.items[0].payment_type, PaymentType::Transfer);
        assert_eq!(resp.items[0].status, PaymentStatus::Succeeded);
    }

    #[tokio::test]
    async fn test_no_duplicates_with_retries() {
        let client = client_with((1..=17).map(|i| transaction(i, "PO_FAST", false, "EUR")).collect());

        let mut seen = HashSet::new();
        let mut state: Option<Vec<u8>> = None;
        for round in 0..20 {
            if round % 3 == 1 {
                client.fail_next.store(true, Ordering::SeqCst);
                let failed = fetch_next(
                    &client,
                    FetchNextRequest {
                        state: state.clone(),
                        page_size: 4,
                        from_payload: Some(parent()),
                    },
                )
                .await;
                assert!(failed.is_err());
            }
            let resp = call(&client, state.clone(), 4).await;
            assert!(resp.items.len() <= 4);
            for p in &resp.items {
                assert!(seen.insert(p.reference.clone()), "duplicate {}", p.reference);
            }
            state = Some(resp.new_state);
            if !resp.has_more {
                break;
            }
        }
        assert_eq!(seen.len(), 17);
    }

    #[tokio::test]
    async fn test_requires_parent_account() {
        let client = client_with(Vec::new());
        let err = fetch_next(
            &client,
            FetchNextRequest {
                page_size: 5,
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(err.is(ErrorKind::MissingFromPayload));
    }

    #[test]
    fn test_transaction_types() {
        assert_eq!(transaction_type("PI_FAST"), PaymentType::Payin);
        assert_eq!(transaction_type("PO_SEPA"), PaymentType::Payout);
        assert_eq!(transaction_type("PI_REV"), PaymentType::Other);
        assert_eq!(transaction_type("INT_INTERC"), PaymentType::Transfer);
        assert_eq!(transaction_type("FEE"), PaymentType::Other);
    }
}

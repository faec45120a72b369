use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::client::{parse_transfer_time, Client, Transfer};
use super::{asset, profile_from_payload};
use crate::connector::{FetchNextPaymentsResponse, FetchNextRequest, FetchNextResponse};
use crate::currency;
use crate::error::PluginError;
use crate::models::{Metadata, PaymentScheme, PaymentStatus, PaymentType, PspPayment};
use crate::pagination::{decode_state, encode_state, should_fetch_more, to_raw, validate_page_size};

/// Number of transfers of the profile consumed so far.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct PaymentsState {
    #[serde(default)]
    pub offset: usize,
}

pub(super) async fn fetch_next(
    client: &dyn Client,
    decimals: &HashMap<String, u32>,
    req: FetchNextRequest,
) -> Result<FetchNextPaymentsResponse, PluginError> {
    validate_page_size(req.page_size)?;
    let state: PaymentsState = decode_state(req.state())?;
    let profile = profile_from_payload(req.from_payload())?;

    let mut items: Vec<PspPayment> = Vec::with_capacity(req.page_size);
    let mut offset = state.offset;
    let mut has_more;

    loop {
        let batch = client
            .get_transfers(profile.id, offset, req.page_size)
            .await
            .map_err(|e| PluginError::client("failed to get transfers", e))?;

        let mut unconsumed = false;
        for transfer in &batch {
            if items.len() >= req.page_size {
                unconsumed = true;
                break;
            }
            offset += 1;
            match to_payment(transfer, decimals)? {
                Some(p) => items.push(p),
                None => debug!(
                    reference = transfer.id,
                    currency = %transfer.target_currency,
                    "skipping transfer with unsupported currency"
                ),
            }
        }

        let (need_more, more) = should_fetch_more(&items, &batch, req.page_size);
        has_more = more || unconsumed;
        if !need_more {
            break;
        }
    }

    Ok(FetchNextResponse {
        items,
        new_state: encode_state(&PaymentsState { offset })?,
        has_more,
    })
}

/// `None` when Wise reports a currency missing from its own currency list.
pub(super) fn to_payment(transfer: &Transfer, decimals: &HashMap<String, u32>) -> Result<Option<PspPayment>, PluginError> {
    let Some((asset, precision)) = asset(decimals, &transfer.target_currency) else {
        return Ok(None);
    };
    let created_at = parse_transfer_time(&transfer.created).map_err(|e| {
        PluginError::translation("transfer", format!("bad timestamp {:?}: {e}", transfer.created))
    })?;

    let payment_type = if transfer.source_account.is_some() {
        PaymentType::Transfer
    } else {
        PaymentType::Payout
    };

    Ok(Some(PspPayment {
        parent_reference: String::new(),
        reference: transfer.id.to_string(),
        created_at,
        payment_type,
        amount: currency::amount_from_decimal_str(&transfer.target_value, precision)?,
        asset,
        scheme: PaymentScheme::Other,
        status: transfer_status(&transfer.status),
        source_account_reference: transfer.source_account.map(|id| id.to_string()),
        destination_account_reference: Some(transfer.target_account.to_string()),
        metadata: Metadata::new(),
        raw: to_raw(transfer)?,
    }))
}

pub(super) fn transfer_status(status: &str) -> PaymentStatus {
    match status {
        "incoming_payment_waiting"
        | "incoming_payment_initiated"
        | "processing"
        | "funds_converted"
        | "waiting_recipient_input_to_proceed" => PaymentStatus::Pending,
        "outgoing_payment_sent" => PaymentStatus::Succeeded,
        "cancelled" => PaymentStatus::Cancelled,
        "bounced_back" | "funds_refunded" | "charged_back" => PaymentStatus::Failed,
        _ => PaymentStatus::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{profile, transfer, FakeClient};
    use super::*;
    use crate::models::PspOther;
    use num_bigint::BigInt;
    use std::collections::HashSet;
    use std::sync::Mutex;

    fn decimals() -> HashMap<String, u32> {
        HashMap::from([("EUR".to_string(), 2), ("GBP".to_string(), 2)])
    }

    fn req(state: Option<Vec<u8>>, page_size: usize) -> FetchNextRequest {
        let payload = serde_json::to_vec(&PspOther {
            id: "1".into(),
            other: serde_json::to_value(profile(1)).unwrap(),
        })
        .unwrap();
        FetchNextRequest {
            state,
            page_size,
            from_payload: Some(payload),
        }
    }

    #[tokio::test]
    async fn test_offset_advances_per_consumed_record() {
        let client = FakeClient {
            transfers: Mutex::new((1..=12).map(|id| transfer(id, "EUR", "outgoing_payment_sent")).collect()),
            ..Default::default()
        };

        let mut seen = HashSet::new();
        let mut state = None;
        let mut calls = 0;
        loop {
            calls += 1;
            let resp = fetch_next(&client, &decimals(), req(state.take(), 5)).await.unwrap();
            assert!(resp.items.len() <= 5);
            for p in &resp.items {
                assert!(seen.insert(p.reference.clone()));
            }
            state = Some(resp.new_state);
            if !resp.has_more {
                break;
            }
            assert!(calls < 10, "did not terminate");
        }
        assert_eq!(seen.len(), 12);
    }

    #[tokio::test]
    async fn test_unsupported_currency_is_consumed() {
        let client = FakeClient {
            transfers: Mutex::new(vec![
                transfer(1, "EUR", "processing"),
                transfer(2, "XOF", "processing"),
                transfer(3, "GBP", "processing"),
            ]),
            ..Default::default()
        };
        let resp = fetch_next(&client, &decimals(), req(None, 10)).await.unwrap();
        let refs: Vec<&str> = resp.items.iter().map(|p| p.reference.as_str()).collect();
        assert_eq!(refs, vec!["1", "3"]);
        let state: PaymentsState = serde_json::from_slice(&resp.new_state).unwrap();
        assert_eq!(state.offset, 3);
        assert!(!resp.has_more);
    }

    #[test]
    fn test_transfer_translation() {
        let mut t = transfer(7, "EUR", "outgoing_payment_sent");
        let p = to_payment(&t, &decimals()).unwrap().unwrap();
        assert_eq!(p.amount, BigInt::from(2550));
        assert_eq!(p.asset, "EUR/2");
        assert_eq!(p.payment_type, PaymentType::Transfer);
        assert_eq!(p.status, PaymentStatus::Succeeded);
        assert_eq!(p.source_account_reference.as_deref(), Some("100"));
        assert!(p.validate().is_ok());

        t.source_account = None;
        t.status = "bounced_back".into();
        let p = to_payment(&t, &decimals()).unwrap().unwrap();
        assert_eq!(p.payment_type, PaymentType::Payout);
        assert_eq!(p.status, PaymentStatus::Failed);

        t.created = "yesterday".into();
        assert!(to_payment(&t, &decimals()).is_err());
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(transfer_status("incoming_payment_waiting"), PaymentStatus::Pending);
        assert_eq!(transfer_status("cancelled"), PaymentStatus::Cancelled);
        assert_eq!(transfer_status("charged_back"), PaymentStatus::Failed);
        assert_eq!(transfer_status("something_new"), PaymentStatus::Other);
    }
}

use chrono::{DateTime, Utc};
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::client::{Client, Payment};
use super::SUPPORTED_CURRENCIES;
use crate::connector::{FetchNextPaymentsResponse, FetchNextRequest, FetchNextResponse};
use crate::currency;
use crate::error::PluginError;
use crate::models::{Metadata, PaymentScheme, PaymentStatus, PaymentType, PspPayment};
use crate::pagination::{decode_state, encode_state, should_fetch_more, to_raw, validate_page_size};

/// Creation time of the last payment handed out.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct PaymentsState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_created_at: Option<DateTime<Utc>>,
}

pub(super) async fn fetch_next(
    client: &dyn Client,
    req: FetchNextRequest,
) -> Result<FetchNextPaymentsResponse, PluginError> {
    validate_page_size(req.page_size)?;
    let state: PaymentsState = decode_state(req.state())?;

    let mut items: Vec<PspPayment> = Vec::with_capacity(req.page_size);
    let mut watermark = state.last_created_at;
    let mut has_more;
    let mut page = 0;

    loop {
        let batch = client
            .fetch_payments(state.last_created_at, page, req.page_size)
            .await
            .map_err(|e| PluginError::client("failed to fetch payments", e))?;

        let mut unconsumed = false;
        for payment in &batch {
            if state.last_created_at.is_some_and(|last| payment.created_at <= last) {
                continue;
            }
            if items.len() >= req.page_size {
                unconsumed = true;
                break;
            }

            watermark = Some(payment.created_at);
            match to_payment(payment)? {
                Some(p) => items.push(p),
                None => debug!(
                    reference = %payment.id,
                    currency = %payment.currency,
                    "skipping payment with unsupported currency"
                ),
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
            last_created_at: watermark,
        })?,
        has_more,
    })
}

/// `None` when the payment's currency cannot be represented.
pub(super) fn to_payment(payment: &Payment) -> Result<Option<PspPayment>, PluginError> {
    let Some(asset) = currency::asset_from_table(SUPPORTED_CURRENCIES, &payment.currency) else {
        return Ok(None);
    };

    Ok(Some(PspPayment {
        parent_reference: payment.parent_id.clone().unwrap_or_default(),
        reference: payment.id.clone(),
        created_at: payment.created_at,
        payment_type: payment_type(&payment.kind),
        amount: BigInt::from(payment.amount_in_minors),
        asset,
        scheme: PaymentScheme::Other,
        status: payment_status(&payment.status),
        source_account_reference: payment.source_account_id.clone(),
        destination_account_reference: payment.destination_account_id.clone(),
        metadata: Metadata::new(),
        raw: to_raw(payment)?,
    }))
}

fn payment_type(kind: &str) -> PaymentType {
    match kind.to_ascii_uppercase().as_str() {
        "PAYIN" => PaymentType::Payin,
        "PAYOUT" => PaymentType::Payout,
        "TRANSFER" => PaymentType::Transfer,
        _ => PaymentType::Other,
    }
}

fn payment_status(status: &str) -> PaymentStatus {
    serde_json::from_value(serde_json::Value::String(status.to_ascii_uppercase()))
        .unwrap_or(PaymentStatus::Other)
}

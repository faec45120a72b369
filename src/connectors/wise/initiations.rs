use std::collections::HashMap;

use super::accounts::profile_id_of;
use super::client::{Client, QuoteRequest, TransferDetails, TransferRequest};
use super::payments::to_payment;
use crate::currency;
use crate::error::{ErrorKind, PluginError};
use crate::models::{PaymentType, PspPayment, PspPaymentInitiation};

/// Resolve the initiation asset against the Wise currency list.
fn currency_and_precision(decimals: &HashMap<String, u32>, asset: &str) -> Result<(String, u32), PluginError> {
    let (code, asset_precision) = currency::parse_asset(asset)?;
    match decimals.get(&code) {
        Some(&p) if p == asset_precision => Ok((code, p)),
        Some(&p) => Err(PluginError::invalid_request(format!(
            "asset {asset} does not match {code} precision {p}"
        ))),
        None => Err(PluginError::wrap(
            PluginError::wrap(format!("currency {code}"), ErrorKind::CurrencyNotSupported),
            ErrorKind::InvalidRequest,
        )),
    }
}

/// Quote the amount on the source profile, then book the transfer against it.
pub(super) async fn create(
    client: &dyn Client,
    decimals: &HashMap<String, u32>,
    pi: &PspPaymentInitiation,
    kind: PaymentType,
) -> Result<PspPayment, PluginError> {
    let (code, precision) = currency_and_precision(decimals, &pi.asset)?;
    let source = pi.source()?;
    let destination = pi.destination()?;
    let profile_id = profile_id_of(source)?;
    let target_account: u64 = destination.reference.parse().map_err(|_| {
        PluginError::invalid_request(format!("destination {:?} is not a wise id", destination.reference))
    })?;

    let decimal = currency::amount_to_decimal_str(&pi.amount, precision);
    let source_amount = decimal
        .parse::<serde_json::Number>()
        .map_err(|e| PluginError::invalid_request(format!("amount {decimal}: {e}")))?;

    let quote = client
        .create_quote(
            profile_id,
            &QuoteRequest {
                source_currency: code.clone(),
                target_currency: code,
                source_amount,
            },
        )
        .await
        .map_err(|e| PluginError::client("failed to create quote", e))?;

    let transfer = client
        .create_transfer(&TransferRequest {
            target_account,
            quote_uuid: quote.id,
            customer_transaction_id: pi.reference.clone(),
            details: TransferDetails {
                reference: pi.description.clone(),
            },
        })
        .await
        .map_err(|e| PluginError::client("failed to create transfer", e))?;

    let mut payment = to_payment(&transfer, decimals)?.ok_or_else(|| {
        PluginError::translation("transfer", format!("currency {} not supported", transfer.target_currency))
    })?;
    payment.payment_type = kind;
    payment.source_account_reference = Some(source.reference.clone());
    Ok(payment)
}

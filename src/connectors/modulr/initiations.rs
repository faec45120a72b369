use super::client::{Client, Destination, PaymentRequest, DESTINATION_ACCOUNT, DESTINATION_BENEFICIARY};
use super::payments::{payment_response_to_payment, progress, Progress};
use super::SUPPORTED_CURRENCIES;
use crate::currency;
use crate::error::PluginError;
use crate::models::{PspPayment, PspPaymentInitiation};

/// Outcome of creating or polling a transfer or payout.
pub(super) enum Outcome {
    Done(PspPayment),
    Pending(String),
    Failed(String),
}

/// Modulr only accepts short alphanumeric references.
fn reference_for(description: &str) -> String {
    let acceptable = description.len() <= 18
        && description
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == ' ');
    if acceptable {
        description.to_string()
    } else {
        String::new()
    }
}

fn build_request(pi: &PspPaymentInitiation, destination_kind: &str) -> Result<PaymentRequest, PluginError> {
    let (code, precision) = currency::currency_and_precision(SUPPORTED_CURRENCIES, &pi.asset)?;
    let source = pi.source()?;
    let destination = pi.destination()?;

    let decimal = currency::amount_to_decimal_str(&pi.amount, precision);
    let amount = decimal
        .parse::<serde_json::Number>()
        .map_err(|e| PluginError::invalid_request(format!("amount {decimal}: {e}")))?;

    let reference = reference_for(&pi.description);
    Ok(PaymentRequest {
        source_account_id: source.reference.clone(),
        destination: Destination {
            kind: destination_kind.to_string(),
            id: destination.reference.clone(),
        },
        currency: code,
        amount,
        external_reference: reference.clone(),
        reference,
    })
}

fn classify(resp: &super::client::PaymentResponse) -> Result<Outcome, PluginError> {
    Ok(match progress(&resp.status) {
        Progress::Pending => Outcome::Pending(resp.id.clone()),
        Progress::Failed if resp.message.is_empty() => Outcome::Failed(format!("payment {}", resp.status)),
        Progress::Failed => Outcome::Failed(resp.message.clone()),
        Progress::Processed => match payment_response_to_payment(resp)? {
            Some(payment) => Outcome::Done(payment),
            None => Outcome::Failed(format!("currency {} not supported", resp.details.currency)),
        },
    })
}

pub(super) async fn create_transfer(client: &dyn Client, pi: &PspPaymentInitiation) -> Result<Outcome, PluginError> {
    let request = build_request(pi, DESTINATION_ACCOUNT)?;
    let resp = client
        .initiate_payment(&request)
        .await
        .map_err(|e| PluginError::client("failed to initiate transfer", e))?;
    classify(&resp)
}

pub(super) async fn create_payout(client: &dyn Client, pi: &PspPaymentInitiation) -> Result<Outcome, PluginError> {
    let request = build_request(pi, DESTINATION_BENEFICIARY)?;
    let resp = client
        .initiate_payment(&request)
        .await
        .map_err(|e| PluginError::client("failed to initiate payout", e))?;
    classify(&resp)
}

pub(super) async fn poll(client: &dyn Client, id: &str) -> Result<Outcome, PluginError> {
    let resp = client
        .get_payment(id)
        .await
        .map_err(|e| PluginError::client("failed to get payment", e))?;
    classify(&resp)
}

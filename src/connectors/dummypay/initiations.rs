use num_traits::ToPrimitive;

use super::client::{Client, Payment};
use super::payments::to_payment;
use super::SUPPORTED_CURRENCIES;
use crate::connector::{CreateBankAccountRequest, CreateBankAccountResponse};
use crate::currency;
use crate::error::PluginError;
use crate::models::{PspAccount, PspPayment, PspPaymentInitiation, PspPaymentInitiationReversal};
use crate::pagination::to_raw;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Kind {
    Transfer,
    Payout,
}

impl Kind {
    fn as_str(self) -> &'static str {
        match self {
            Kind::Transfer => "TRANSFER",
            Kind::Payout => "PAYOUT",
        }
    }
}

pub(super) fn create_bank_account(
    req: CreateBankAccountRequest,
) -> Result<CreateBankAccountResponse, PluginError> {
    let bank_account = req.bank_account;
    Ok(CreateBankAccountResponse {
        related_account: PspAccount {
            reference: format!("dummypay-{}", bank_account.id),
            created_at: bank_account.created_at,
            name: Some(bank_account.name.clone()),
            default_asset: None,
            metadata: bank_account.metadata.clone(),
            raw: to_raw(&bank_account)?,
        },
    })
}

fn minor_units(amount: &num_bigint::BigInt) -> Result<i64, PluginError> {
    amount
        .to_i64()
        .filter(|a| *a > 0)
        .ok_or_else(|| PluginError::invalid_request(format!("amount {amount} out of range")))
}

fn translate(record: &Payment) -> Result<PspPayment, PluginError> {
    to_payment(record)?.ok_or_else(|| {
        PluginError::invalid_request(format!("currency {} not supported", record.currency))
    })
}

pub(super) async fn create_payment(
    client: &dyn Client,
    pi: &PspPaymentInitiation,
    kind: Kind,
) -> Result<PspPayment, PluginError> {
    let (code, _) = currency::currency_and_precision(SUPPORTED_CURRENCIES, &pi.asset)?;
    let source = pi.source()?;
    let destination = pi.destination()?;

    let record = Payment {
        id: pi.reference.clone(),
        parent_id: None,
        kind: kind.as_str().to_string(),
        status: "SUCCEEDED".to_string(),
        amount_in_minors: minor_units(&pi.amount)?,
        currency: code,
        source_account_id: Some(source.reference.clone()),
        destination_account_id: Some(destination.reference.clone()),
        created_at: pi.created_at,
    };

    let created = client
        .create_payment(record)
        .await
        .map_err(|e| PluginError::client(format!("failed to create {}", kind.as_str().to_lowercase()), e))?;
    translate(&created)
}

/// Books the reversal as a refunded child of the original payment, moving
/// the reversed amount back to the original source.
pub(super) async fn reverse_payment(
    client: &dyn Client,
    reversal: &PspPaymentInitiationReversal,
    kind: Kind,
) -> Result<PspPayment, PluginError> {
    let (code, _) = currency::currency_and_precision(SUPPORTED_CURRENCIES, &reversal.asset)?;
    let original = &reversal.related_payment_initiation;
    let source = original.source()?;
    let destination = original.destination()?;

    let record = Payment {
        id: reversal.reference.clone(),
        parent_id: Some(original.reference.clone()),
        kind: kind.as_str().to_string(),
        status: "REFUNDED".to_string(),
        amount_in_minors: minor_units(&reversal.amount)?,
        currency: code,
        source_account_id: match kind {
            Kind::Transfer => Some(destination.reference.clone()),
            Kind::Payout => None,
        },
        destination_account_id: Some(source.reference.clone()),
        created_at: reversal.created_at,
    };

    let created = client
        .create_payment(record)
        .await
        .map_err(|e| PluginError::client(format!("failed to reverse {}", kind.as_str().to_lowercase()), e))?;
    translate(&created)
}

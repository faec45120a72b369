use std::fmt;

use chrono::{DateTime, Utc};
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

use super::{serde_amount, validation_error, Metadata};
use crate::currency;
use crate::error::PluginError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentType {
    #[default]
    Unknown,
    Payin,
    Payout,
    Transfer,
    Other,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Unknown,
    Pending,
    Succeeded,
    Cancelled,
    Failed,
    Expired,
    Refunded,
    RefundedFailure,
    RefundReversed,
    Dispute,
    DisputeWon,
    DisputeLost,
    AmountAdjustment,
    Authorisation,
    Capture,
    CaptureFailed,
    Other,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentScheme {
    #[default]
    Unknown,
    CardVisa,
    CardMastercard,
    CardAmex,
    CardDiners,
    CardDiscover,
    CardJcb,
    CardUnionPay,
    CardAlipay,
    CardCup,
    SepaDebit,
    SepaCredit,
    Sepa,
    GooglePay,
    ApplePay,
    Doku,
    DragonPay,
    Maestro,
    MolPay,
    A2a,
    AchDebit,
    Ach,
    Rtp,
    Other,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        f.write_str(&s)
    }
}

/// A payment, transfer or payout as seen by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PspPayment {
    /// Reference of the original payment for refunds, disputes and
    /// adjustments. Empty for first-class payments.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub parent_reference: String,
    pub reference: String,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "type")]
    pub payment_type: PaymentType,
    /// Minor units of `asset`.
    #[serde(with = "serde_amount")]
    pub amount: BigInt,
    /// `CODE/precision`, e.g. `USD/2`.
    pub asset: String,
    #[serde(default)]
    pub scheme: PaymentScheme,
    pub status: PaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_account_reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_account_reference: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
    pub raw: serde_json::Value,
}

impl PspPayment {
    pub fn has_parent(&self) -> bool {
        !self.parent_reference.is_empty()
    }

    pub fn validate(&self) -> Result<(), PluginError> {
        if self.reference.is_empty() {
            return Err(validation_error("missing payment reference"));
        }
        if self.created_at.timestamp() == 0 {
            return Err(validation_error("missing payment createdAt"));
        }
        if self.payment_type == PaymentType::Unknown {
            return Err(validation_error("missing payment type"));
        }
        if !currency::is_valid_asset(&self.asset) {
            return Err(validation_error("invalid payment asset"));
        }
        if self.raw.is_null() {
            return Err(validation_error("missing payment raw"));
        }
        Ok(())
    }
}

use chrono::{DateTime, Utc};
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

use super::{serde_amount, Metadata, PspAccount};
use crate::error::PluginError;

/// A transfer or payout requested by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PspPaymentInitiation {
    /// Caller-side reference, used as the idempotency key upstream.
    pub reference: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub source_account: Option<PspAccount>,
    #[serde(default)]
    pub destination_account: Option<PspAccount>,
    #[serde(with = "serde_amount")]
    pub amount: BigInt,
    pub asset: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl PspPaymentInitiation {
    pub fn source(&self) -> Result<&PspAccount, PluginError> {
        self.source_account
            .as_ref()
            .ok_or_else(|| PluginError::invalid_request("missing source account"))
    }

    pub fn destination(&self) -> Result<&PspAccount, PluginError> {
        self.destination_account
            .as_ref()
            .ok_or_else(|| PluginError::invalid_request("missing destination account"))
    }
}

/// A request to reverse (refund) an earlier initiation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PspPaymentInitiationReversal {
    pub reference: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub description: String,
    pub related_payment_initiation: PspPaymentInitiation,
    #[serde(with = "serde_amount")]
    pub amount: BigInt,
    pub asset: String,
    #[serde(default)]
    pub metadata: Metadata,
}

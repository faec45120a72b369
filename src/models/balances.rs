use chrono::{DateTime, Utc};
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

use super::{serde_amount, validation_error};
use crate::currency;
use crate::error::PluginError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PspBalance {
    pub account_reference: String,
    pub created_at: DateTime<Utc>,
    /// Minor units of `asset`.
    #[serde(with = "serde_amount")]
    pub amount: BigInt,
    pub asset: String,
}

impl PspBalance {
    pub fn validate(&self) -> Result<(), PluginError> {
        if self.account_reference.is_empty() {
            return Err(validation_error("missing balance account reference"));
        }
        if self.created_at.timestamp() == 0 {
            return Err(validation_error("missing balance createdAt"));
        }
        if !currency::is_valid_asset(&self.asset) {
            return Err(validation_error("invalid balance asset"));
        }
        Ok(())
    }
}

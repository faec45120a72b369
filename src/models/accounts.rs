use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{validation_error, Metadata};
use crate::currency;
use crate::error::PluginError;

/// An account as reported by a provider (internal or external).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PspAccount {
    /// Provider reference, unique within a connector instance.
    pub reference: String,
    /// Vendor creation date, or the fetch time when the vendor has none.
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Default asset in `CODE/precision` form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_asset: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
    /// Verbatim vendor payload.
    pub raw: serde_json::Value,
}

impl PspAccount {
    pub fn validate(&self) -> Result<(), PluginError> {
        if self.reference.is_empty() {
            return Err(validation_error("missing account reference"));
        }
        if self.created_at.timestamp() == 0 {
            return Err(validation_error("missing account createdAt"));
        }
        if self.raw.is_null() {
            return Err(validation_error("missing account raw"));
        }
        if let Some(asset) = &self.default_asset {
            if !currency::is_valid_asset(asset) {
                return Err(validation_error("invalid default asset"));
            }
        }
        Ok(())
    }
}

/// Bank account details submitted by a caller for creation at the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankAccount {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub name: String,
    #[serde(default)]
    pub account_number: Option<String>,
    #[serde(default)]
    pub iban: Option<String>,
    #[serde(default)]
    pub swift_bic_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

//! Canonical, vendor-agnostic domain model produced by every connector.

mod accounts;
mod amount;
mod balances;
mod capability;
mod initiations;
mod payments;
mod webhooks;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, PluginError};

pub use accounts::{BankAccount, PspAccount};
pub use amount::{decimal_text, serde_amount};
pub use balances::PspBalance;
pub use capability::Capability;
pub use initiations::{PspPaymentInitiation, PspPaymentInitiationReversal};
pub use payments::{PaymentScheme, PaymentStatus, PaymentType, PspPayment};
pub use webhooks::{BasicAuth, PspWebhook, PspWebhookConfig, WebhookResponse};

/// Free-form string metadata attached to canonical entities.
pub type Metadata = BTreeMap<String, String>;

/// Connector-specific entity that has no canonical counterpart
/// (wise profiles, for instance). Child tasks receive `other` as their
/// `from_payload`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PspOther {
    pub id: String,
    pub other: serde_json::Value,
}

impl PspOther {
    pub fn validate(&self) -> Result<(), PluginError> {
        if self.id.is_empty() {
            return Err(validation_error("missing other id"));
        }
        if self.other.is_null() {
            return Err(validation_error("missing other payload"));
        }
        Ok(())
    }
}

pub(crate) fn validation_error(msg: &str) -> PluginError {
    PluginError::wrap(msg.to_string(), ErrorKind::Validation)
}

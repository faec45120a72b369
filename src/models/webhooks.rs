use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Metadata, PspAccount, PspBalance, PspPayment};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

/// An inbound webhook delivery as received by the HTTP layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PspWebhook {
    #[serde(default)]
    pub basic_auth: Option<BasicAuth>,
    #[serde(default)]
    pub query_values: BTreeMap<String, Vec<String>>,
    /// Header names are stored as received; lookups go through [`PspWebhook::header`].
    #[serde(default)]
    pub headers: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub body: Vec<u8>,
}

impl PspWebhook {
    /// First value of a header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .and_then(|(_, values)| values.first())
            .map(String::as_str)
    }
}

/// A webhook subscription registered at the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PspWebhookConfig {
    pub name: String,
    pub url_path: String,
    #[serde(default)]
    pub metadata: Metadata,
}

/// One canonical entity extracted from a webhook delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WebhookResponse {
    Account(PspAccount),
    ExternalAccount(PspAccount),
    Balance(PspBalance),
    Payment(PspPayment),
}

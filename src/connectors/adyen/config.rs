use serde::Deserialize;
use validator::Validate;

use crate::connector::config::{invalid_config, unmarshal_and_validate};
use crate::connector::PollingPeriod;
use crate::error::PluginError;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[validate(length(min = 1))]
    pub api_key: String,
    #[serde(rename = "companyID")]
    #[validate(length(min = 1))]
    pub company_id: String,
    /// Set for live accounts; the test environment is used otherwise.
    #[serde(default)]
    pub live_endpoint_prefix: Option<String>,
    #[serde(default)]
    pub webhook_username: Option<String>,
    #[serde(default)]
    pub webhook_password: Option<String>,
    #[serde(default)]
    pub polling_period: String,
}

impl Config {
    pub fn from_json(raw: &[u8]) -> Result<Self, PluginError> {
        let config: Self = unmarshal_and_validate(raw)?;
        if config.webhook_username.as_deref().is_some_and(|u| u.contains(':')) {
            return Err(invalid_config("webhookUsername cannot contain ':'"));
        }
        config.polling()?;
        Ok(config)
    }

    pub fn polling(&self) -> Result<PollingPeriod, PluginError> {
        PollingPeriod::with_defaults(&self.polling_period)
    }

    /// Management API base URL.
    pub fn endpoint(&self) -> String {
        match self.live_endpoint_prefix.as_deref().filter(|p| !p.is_empty()) {
            Some(_) => "https://management-live.adyen.com/v3".to_string(),
            None => "https://management-test.adyen.com/v3".to_string(),
        }
    }

    /// Webhook basic-auth credentials, when both halves are set.
    pub fn webhook_credentials(&self) -> Option<(String, String)> {
        match (&self.webhook_username, &self.webhook_password) {
            (Some(u), Some(p)) if !u.is_empty() => Some((u.clone(), p.clone())),
            _ => None,
        }
    }
}

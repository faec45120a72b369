use serde::Deserialize;
use validator::Validate;

use crate::connector::config::unmarshal_and_validate;
use crate::connector::PollingPeriod;
use crate::error::PluginError;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[validate(length(min = 1))]
    pub api_key: String,
    /// Signs every request, see [`crate::http::Auth::HmacSignature`].
    #[validate(length(min = 1))]
    pub api_secret: String,
    #[validate(url)]
    pub endpoint: String,
    #[serde(default)]
    pub polling_period: String,
}

impl Config {
    pub fn from_json(raw: &[u8]) -> Result<Self, PluginError> {
        let config: Self = unmarshal_and_validate(raw)?;
        config.polling()?;
        Ok(config)
    }

    pub fn polling(&self) -> Result<PollingPeriod, PluginError> {
        PollingPeriod::with_defaults(&self.polling_period)
    }
}

use std::time::Duration;

use serde::Deserialize;
use validator::Validate;

use crate::connector::config::unmarshal_and_validate;
use crate::connector::PollingPeriod;
use crate::error::PluginError;

/// Files change locally, so dummypay polls far more often than real vendors.
pub const DEFAULT_FILE_POLLING_PERIOD: Duration = Duration::from_secs(10);
pub const MINIMUM_FILE_POLLING_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Directory holding the JSON fixture files.
    #[validate(length(min = 1))]
    pub directory: String,
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
        PollingPeriod::new(
            &self.polling_period,
            DEFAULT_FILE_POLLING_PERIOD,
            MINIMUM_FILE_POLLING_PERIOD,
        )
    }
}

use serde::Deserialize;
use validator::Validate;

use crate::connector::config::unmarshal_and_validate;
use crate::connector::PollingPeriod;
use crate::crypto::{self, RsaSha256Verifier};
use crate::error::{ErrorKind, PluginError};

pub const DEFAULT_ENDPOINT: &str = "https://api.wise.com";

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[validate(length(min = 1))]
    pub api_key: String,
    /// PEM public key Wise signs webhook deliveries with.
    #[validate(length(min = 1))]
    pub webhook_public_key: String,
    #[serde(default)]
    #[validate(url)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub polling_period: String,
}

impl Config {
    pub fn from_json(raw: &[u8]) -> Result<Self, PluginError> {
        let config: Self = unmarshal_and_validate(raw)?;
        config.polling()?;
        config.webhook_verifier()?;
        Ok(config)
    }

    pub fn webhook_verifier(&self) -> Result<RsaSha256Verifier, PluginError> {
        crypto::rsa_verifier_from_pem(&self.webhook_public_key).map_err(|e| {
            PluginError::wrap(format!("failed to decode webhook public key: {e}"), ErrorKind::InvalidConfig)
        })
    }

    pub fn polling(&self) -> Result<PollingPeriod, PluginError> {
        PollingPeriod::with_defaults(&self.polling_period)
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::testing::rsa_public_pem;

    fn raw(extra: &str) -> Vec<u8> {
        let key = serde_json::to_string(&rsa_public_pem()).unwrap();
        format!(r#"{{"apiKey":"k","webhookPublicKey":{key}{extra}}}"#).into_bytes()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_json(&raw("")).unwrap();
        assert_eq!(config.endpoint(), DEFAULT_ENDPOINT);
        assert!(config.webhook_verifier().is_ok());
    }

    #[test]
    fn test_requires_public_key() {
        let err = Config::from_json(br#"{"apiKey":"k"}"#).unwrap_err();
        assert!(err.is(ErrorKind::InvalidConfig));
    }

    #[test]
    fn test_malformed_public_key() {
        let err = Config::from_json(br#"{"apiKey":"dummy","webhookPublicKey":"badKey"}"#).unwrap_err();
        assert!(err.is(ErrorKind::InvalidConfig));
        assert!(err.to_string().contains("public key"));
    }

    #[test]
    fn test_polling_period_below_minimum_is_clamped() {
        let config = Config::from_json(&raw(r#","pollingPeriod":"1m""#)).unwrap();
        assert_eq!(config.polling().unwrap().duration().as_secs(), 20 * 60);
    }
}

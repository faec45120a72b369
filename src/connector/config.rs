use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::{ErrorKind, PluginError};

/// Decode a connector config payload and run its field validations.
///
/// Both decode and validation failures surface as `InvalidConfig`, with the
/// offending field named in the message.
pub fn unmarshal_and_validate<C: DeserializeOwned + Validate>(raw: &[u8]) -> Result<C, PluginError> {
    let config: C =
        serde_json::from_slice(raw).map_err(|e| PluginError::wrap(e, ErrorKind::InvalidConfig))?;
    config
        .validate()
        .map_err(|e| PluginError::wrap(e, ErrorKind::InvalidConfig))?;
    Ok(config)
}

/// Config-level error for rules the derive cannot express.
pub fn invalid_config(msg: impl Into<String>) -> PluginError {
    PluginError::wrap(msg.into(), ErrorKind::InvalidConfig)
}

use std::fmt;
use std::time::Duration;

use crate::error::{ErrorKind, PluginError};

pub const DEFAULT_POLLING_PERIOD: Duration = Duration::from_secs(30 * 60);
pub const MINIMUM_POLLING_PERIOD: Duration = Duration::from_secs(20 * 60);

/// Interval at which the orchestrator re-runs periodic tasks.
///
/// An empty value yields the larger of `default` and `minimum`. A valid
/// value below `minimum` is clamped up to it. Unparseable values fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PollingPeriod(Duration);

impl PollingPeriod {
    pub fn new(raw: &str, default: Duration, minimum: Duration) -> Result<Self, PluginError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(Self(default.max(minimum)));
        }

        let parsed = humantime::parse_duration(raw).map_err(|reason| {
            PluginError::wrap(
                format!("invalid polling period {raw:?}: {reason}"),
                ErrorKind::InvalidConfig,
            )
        })?;

        Ok(Self(parsed.max(minimum)))
    }

    pub fn with_defaults(raw: &str) -> Result<Self, PluginError> {
        Self::new(raw, DEFAULT_POLLING_PERIOD, MINIMUM_POLLING_PERIOD)
    }

    pub fn duration(&self) -> Duration {
        self.0
    }
}

impl Default for PollingPeriod {
    fn default() -> Self {
        Self(DEFAULT_POLLING_PERIOD.max(MINIMUM_POLLING_PERIOD))
    }
}

impl fmt::Display for PollingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", humantime::format_duration(self.0))
    }
}

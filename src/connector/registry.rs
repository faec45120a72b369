use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use super::{InstrumentedPlugin, Plugin, PluginType};
use crate::error::{ErrorKind, PluginError};
use crate::models::Capability;

/// Builds an uninstalled plugin instance with the given name.
pub type PluginConstructor = fn(name: &str) -> Arc<dyn Plugin>;

/// Checks a raw config payload without installing anything.
pub type ConfigValidator = fn(raw: &[u8]) -> Result<(), PluginError>;

/// Everything the registry knows about one provider.
#[derive(Clone)]
pub struct Registration {
    pub provider: &'static str,
    pub plugin_type: PluginType,
    pub capabilities: &'static [Capability],
    pub default_page_size: usize,
    pub create: PluginConstructor,
    pub validate_config: ConfigValidator,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("provider", &self.provider)
            .field("plugin_type", &self.plugin_type)
            .field("capabilities", &self.capabilities)
            .field("default_page_size", &self.default_page_size)
            .finish()
    }
}

/// Provider name to registration map.
///
/// Populated once at startup through explicit [`Registry::register`] calls,
/// read-only afterwards.
#[derive(Debug, Default)]
pub struct Registry {
    registrations: BTreeMap<String, Registration>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a provider. Names are case-insensitive and must be unique.
    pub fn register(&mut self, registration: Registration) -> Result<(), PluginError> {
        let key = registration.provider.to_lowercase();
        if self.registrations.contains_key(&key) {
            return Err(PluginError::wrap(
                format!("provider {key}"),
                ErrorKind::PluginAlreadyRegistered,
            ));
        }
        debug!(provider = %key, "registered provider");
        self.registrations.insert(key, registration);
        Ok(())
    }

    pub fn get(&self, provider: &str) -> Result<&Registration, PluginError> {
        self.registrations
            .get(&provider.to_lowercase())
            .ok_or_else(|| PluginError::wrap(format!("provider {provider}"), ErrorKind::PluginNotFound))
    }

    pub fn providers(&self) -> impl Iterator<Item = &str> {
        self.registrations.keys().map(String::as_str)
    }

    pub fn capabilities(&self, provider: &str) -> Result<&'static [Capability], PluginError> {
        Ok(self.get(provider)?.capabilities)
    }

    pub fn default_page_size(&self, provider: &str) -> Result<usize, PluginError> {
        Ok(self.get(provider)?.default_page_size)
    }

    pub fn validate_config(&self, provider: &str, raw: &[u8]) -> Result<(), PluginError> {
        (self.get(provider)?.validate_config)(raw)
    }

    /// Construct an uninstalled, instrumented plugin for `provider`.
    pub fn build(&self, provider: &str, name: &str) -> Result<Arc<dyn Plugin>, PluginError> {
        let registration = self.get(provider)?;
        let plugin = (registration.create)(name);
        Ok(Arc::new(InstrumentedPlugin::new(registration.provider, plugin)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Noop(String);

    #[async_trait]
    impl Plugin for Noop {
        fn name(&self) -> &str {
            &self.0
        }
    }

    fn registration(provider: &'static str) -> Registration {
        Registration {
            provider,
            plugin_type: PluginType::Psp,
            capabilities: &[Capability::FetchAccounts],
            default_page_size: 25,
            create: |name| Arc::new(Noop(name.to_string())),
            validate_config: |raw| {
                if raw.is_empty() {
                    Err(PluginError::wrap("empty config", ErrorKind::InvalidConfig))
                } else {
                    Ok(())
                }
            },
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = Registry::new();
        registry.register(registration("noop")).unwrap();

        assert_eq!(registry.providers().collect::<Vec<_>>(), vec!["noop"]);
        assert_eq!(registry.default_page_size("NOOP").unwrap(), 25);
        assert_eq!(
            registry.capabilities("noop").unwrap(),
            &[Capability::FetchAccounts]
        );
        assert!(registry.validate_config("noop", b"{}").is_ok());
        assert!(registry
            .validate_config("noop", b"")
            .unwrap_err()
            .is(ErrorKind::InvalidConfig));

        let plugin = registry.build("noop", "my-noop").unwrap();
        assert_eq!(plugin.name(), "my-noop");
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut registry = Registry::new();
        registry.register(registration("noop")).unwrap();
        let err = registry.register(registration("Noop")).unwrap_err();
        assert!(err.is(ErrorKind::PluginAlreadyRegistered));
    }

    #[test]
    fn test_unknown_provider() {
        let registry = Registry::new();
        let err = registry.build("ghost", "x").err().unwrap();
        assert!(err.is(ErrorKind::PluginNotFound));
        assert_eq!(err.to_string(), "provider ghost: plugin not found");
    }
}

//! Built-in connectors.

pub mod adyen;
pub mod dummypay;
pub mod modulr;
pub mod wise;

use crate::connector::Registry;
use crate::error::PluginError;

/// Register every built-in connector. Call once at startup.
pub fn register_builtin(registry: &mut Registry) -> Result<(), PluginError> {
    registry.register(dummypay::registration())?;
    registry.register(modulr::registration())?;
    registry.register(wise::registration())?;
    registry.register(adyen::registration())?;
    Ok(())
}

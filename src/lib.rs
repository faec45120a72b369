//! PSP connector framework.
//!
//! Each connector adapts one payment provider's API to the canonical model
//! in [`models`] through the [`connector::Plugin`] contract. Fetch operations
//! resume from an opaque JSON state blob so an external scheduler can sync
//! incrementally; see [`pagination`] for the shared protocol.
//!
//! ```no_run
//! use psp_connectors::connector::{FetchNextRequest, InstallRequest, Plugin, Registry};
//! use psp_connectors::connectors::register_builtin;
//!
//! # async fn run() -> Result<(), psp_connectors::PluginError> {
//! let mut registry = Registry::new();
//! register_builtin(&mut registry)?;
//!
//! let plugin = registry.build("dummypay", "local")?;
//! plugin
//!     .install(InstallRequest {
//!         connector_id: "local".into(),
//!         config: br#"{"directory":"/tmp/dummypay"}"#.to_vec(),
//!     })
//!     .await?;
//!
//! let page = plugin
//!     .fetch_next_accounts(FetchNextRequest {
//!         page_size: 50,
//!         ..Default::default()
//!     })
//!     .await?;
//! println!("{} accounts, more: {}", page.items.len(), page.has_more);
//! # Ok(())
//! # }
//! ```

pub mod connector;
pub mod connectors;
pub mod crypto;
pub mod currency;
pub mod error;
pub mod http;
pub mod models;
pub mod pagination;

pub use connector::{Plugin, PluginType, Registry};
pub use error::{ErrorKind, PluginError};

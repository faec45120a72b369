//! Adyen connector: merchant accounts are polled, payments arrive through
//! standard notifications only.

mod accounts;
pub mod client;
pub mod config;
#[cfg(test)]
mod testing;
mod webhooks;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use self::client::{Client, HttpAdyenClient};
use self::config::Config;
use crate::connector::registry::Registration;
use crate::connector::*;
use crate::currency::{CurrencyTable, ISO4217};
use crate::error::{ErrorKind, PluginError};
use crate::models::Capability;

pub const PROVIDER: &str = "adyen";
pub const DEFAULT_PAGE_SIZE: usize = 100;

pub const CAPABILITIES: &[Capability] = &[
    Capability::FetchAccounts,
    Capability::CreateWebhooks,
    Capability::TranslateWebhooks,
];

pub(crate) const SUPPORTED_CURRENCIES: &CurrencyTable = ISO4217;

pub fn registration() -> Registration {
    Registration {
        provider: PROVIDER,
        plugin_type: PluginType::Psp,
        capabilities: CAPABILITIES,
        default_page_size: DEFAULT_PAGE_SIZE,
        create: |name| Arc::new(Adyen::new(name)),
        validate_config: |raw| Config::from_json(raw).map(|_| ()),
    }
}

pub fn workflow() -> ConnectorTasksTree {
    vec![
        ConnectorTaskTree::new(TaskType::FetchAccounts, "fetch_accounts").periodically(),
        ConnectorTaskTree::new(TaskType::CreateWebhooks, "create_webhooks"),
    ]
}

pub struct Installation {
    pub client: Arc<dyn Client>,
    /// Basic-auth credentials Adyen sends with every notification.
    pub webhook_credentials: Option<(String, String)>,
}

pub struct Adyen {
    name: String,
    installed: Installed<Installation>,
}

impl Adyen {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            installed: Installed::new(),
        }
    }

    pub fn with_client(name: &str, client: Arc<dyn Client>, webhook_credentials: Option<(String, String)>) -> Self {
        let plugin = Self::new(name);
        plugin.installed.set(Arc::new(Installation {
            client,
            webhook_credentials,
        }));
        plugin
    }
}

#[async_trait]
impl Plugin for Adyen {
    fn name(&self) -> &str {
        &self.name
    }

    async fn install(&self, req: InstallRequest) -> Result<InstallResponse, PluginError> {
        let config = Config::from_json(&req.config)?;
        let endpoint = config.endpoint();
        let client = HttpAdyenClient::new(&config.api_key, &config.company_id, &endpoint)
            .map_err(|e| PluginError::wrap(e, ErrorKind::InvalidConfig))?;
        self.installed.set(Arc::new(Installation {
            client: Arc::new(client),
            webhook_credentials: config.webhook_credentials(),
        }));
        info!(company = %config.company_id, endpoint = %endpoint, "adyen client ready");

        Ok(InstallResponse {
            capabilities: CAPABILITIES.to_vec(),
            workflow: workflow(),
            polling_period: config.polling()?,
        })
    }

    async fn uninstall(&self, req: UninstallRequest) -> Result<UninstallResponse, PluginError> {
        let installed = self.installed.get()?;
        webhooks::delete(installed.client.as_ref(), &req.connector_id).await?;
        Ok(UninstallResponse {})
    }

    async fn fetch_next_accounts(
        &self,
        req: FetchNextRequest,
    ) -> Result<FetchNextAccountsResponse, PluginError> {
        accounts::fetch_next(self.installed.get()?.client.as_ref(), req).await
    }

    async fn create_webhooks(
        &self,
        req: CreateWebhooksRequest,
    ) -> Result<CreateWebhooksResponse, PluginError> {
        let installed = self.installed.get()?;
        webhooks::create(installed.client.as_ref(), installed.webhook_credentials.as_ref(), &req).await
    }

    async fn verify_webhook(
        &self,
        req: VerifyWebhookRequest,
    ) -> Result<VerifyWebhookResponse, PluginError> {
        let installed = self.installed.get()?;
        webhooks::verify(installed.webhook_credentials.as_ref(), &req)
    }

    async fn translate_webhook(
        &self,
        req: TranslateWebhookRequest,
    ) -> Result<TranslateWebhookResponse, PluginError> {
        self.installed.get()?;
        webhooks::translate(&req)
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{merchant, FakeClient};
    use super::*;

    #[tokio::test]
    async fn test_install_and_reinstall() {
        let plugin = Adyen::new("adyen-test");
        let config = br#"{"apiKey":"k","companyID":"acme","webhookUsername":"u","webhookPassword":"p"}"#;
        for _ in 0..2 {
            let resp = plugin
                .install(InstallRequest {
                    connector_id: "c1".into(),
                    config: config.to_vec(),
                })
                .await
                .unwrap();
            assert_eq!(resp.workflow, workflow());
        }
        assert!(plugin.installed.is_installed());
    }

    #[tokio::test]
    async fn test_operations_need_install() {
        let plugin = Adyen::new("adyen-test");
        let err = plugin
            .fetch_next_accounts(FetchNextRequest {
                page_size: 10,
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::NotYetInstalled));
    }

    #[tokio::test]
    async fn test_unsupported_operations() {
        let plugin = Adyen::with_client("adyen-test", Arc::new(FakeClient::default()), None);
        let err = plugin
            .fetch_next_payments(FetchNextRequest::default())
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::NotImplemented));
    }

    #[tokio::test]
    async fn test_fetch_accounts_through_plugin() {
        let fake = Arc::new(FakeClient {
            merchants: (0..3).map(merchant).collect(),
            ..Default::default()
        });
        let plugin = Adyen::with_client("adyen-test", fake, None);
        let resp = plugin
            .fetch_next_accounts(FetchNextRequest {
                page_size: 10,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(resp.items.len(), 3);
        assert!(!resp.has_more);
    }
}

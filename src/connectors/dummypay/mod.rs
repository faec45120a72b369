//! File-backed reference connector.
//!
//! Reads and writes JSON fixture files in a local directory, so the whole
//! fetch and initiation surface can be driven without network access.

mod accounts;
pub mod client;
pub mod config;
mod external_accounts;
pub mod fixtures;
mod initiations;
mod payments;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use self::client::{Client, FileClient};
use self::config::Config;
use crate::connector::registry::Registration;
use crate::connector::*;
use crate::currency::{CurrencyTable, ISO4217};
use crate::error::PluginError;
use crate::models::Capability;

pub const PROVIDER: &str = "dummypay";
pub const DEFAULT_PAGE_SIZE: usize = 25;

pub const CAPABILITIES: &[Capability] = &[
    Capability::FetchAccounts,
    Capability::FetchBalances,
    Capability::FetchExternalAccounts,
    Capability::FetchPayments,
    Capability::CreateBankAccount,
    Capability::CreateTransfer,
    Capability::CreatePayout,
];

pub(crate) const SUPPORTED_CURRENCIES: &CurrencyTable = ISO4217;

pub fn registration() -> Registration {
    Registration {
        provider: PROVIDER,
        plugin_type: PluginType::Psp,
        capabilities: CAPABILITIES,
        default_page_size: DEFAULT_PAGE_SIZE,
        create: |name| Arc::new(Dummypay::new(name)),
        validate_config: |raw| Config::from_json(raw).map(|_| ()),
    }
}

pub fn workflow() -> ConnectorTasksTree {
    vec![
        ConnectorTaskTree::new(TaskType::FetchAccounts, "fetch_accounts")
            .periodically()
            .then(ConnectorTaskTree::new(TaskType::FetchBalances, "fetch_balances").periodically()),
        ConnectorTaskTree::new(TaskType::FetchExternalAccounts, "fetch_external_accounts")
            .periodically(),
        ConnectorTaskTree::new(TaskType::FetchPayments, "fetch_payments").periodically(),
    ]
}

pub struct Dummypay {
    name: String,
    client: Installed<dyn Client>,
}

impl Dummypay {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            client: Installed::new(),
        }
    }

    /// An already-installed instance around a custom client.
    pub fn with_client(name: &str, client: Arc<dyn Client>) -> Self {
        let plugin = Self::new(name);
        plugin.client.set(client);
        plugin
    }
}

#[async_trait]
impl Plugin for Dummypay {
    fn name(&self) -> &str {
        &self.name
    }

    async fn install(&self, req: InstallRequest) -> Result<InstallResponse, PluginError> {
        let config = Config::from_json(&req.config)?;
        info!(directory = %config.directory, "using fixture directory");
        self.client.set(Arc::new(FileClient::new(&config.directory)));

        Ok(InstallResponse {
            capabilities: CAPABILITIES.to_vec(),
            workflow: workflow(),
            polling_period: config.polling()?,
        })
    }

    async fn uninstall(&self, _req: UninstallRequest) -> Result<UninstallResponse, PluginError> {
        Ok(UninstallResponse {})
    }

    async fn fetch_next_accounts(
        &self,
        req: FetchNextRequest,
    ) -> Result<FetchNextAccountsResponse, PluginError> {
        accounts::fetch_next(self.client.get()?.as_ref(), req).await
    }

    async fn fetch_next_balances(
        &self,
        req: FetchNextRequest,
    ) -> Result<FetchNextBalancesResponse, PluginError> {
        accounts::fetch_balances(self.client.get()?.as_ref(), req).await
    }

    async fn fetch_next_external_accounts(
        &self,
        req: FetchNextRequest,
    ) -> Result<FetchNextExternalAccountsResponse, PluginError> {
        external_accounts::fetch_next(self.client.get()?.as_ref(), req).await
    }

    async fn fetch_next_payments(
        &self,
        req: FetchNextRequest,
    ) -> Result<FetchNextPaymentsResponse, PluginError> {
        payments::fetch_next(self.client.get()?.as_ref(), req).await
    }

    async fn create_bank_account(
        &self,
        req: CreateBankAccountRequest,
    ) -> Result<CreateBankAccountResponse, PluginError> {
        self.client.get()?;
        initiations::create_bank_account(req)
    }

    async fn create_transfer(
        &self,
        req: CreateTransferRequest,
    ) -> Result<CreateTransferResponse, PluginError> {
        let payment = initiations::create_payment(
            self.client.get()?.as_ref(),
            &req.payment_initiation,
            initiations::Kind::Transfer,
        )
        .await?;
        Ok(CreateTransferResponse {
            payment: Some(payment),
            polling_transfer_id: None,
        })
    }

    async fn reverse_transfer(
        &self,
        req: ReverseTransferRequest,
    ) -> Result<ReverseTransferResponse, PluginError> {
        let payment = initiations::reverse_payment(
            self.client.get()?.as_ref(),
            &req.payment_initiation_reversal,
            initiations::Kind::Transfer,
        )
        .await?;
        Ok(ReverseTransferResponse { payment })
    }

    async fn create_payout(
        &self,
        req: CreatePayoutRequest,
    ) -> Result<CreatePayoutResponse, PluginError> {
        let payment = initiations::create_payment(
            self.client.get()?.as_ref(),
            &req.payment_initiation,
            initiations::Kind::Payout,
        )
        .await?;
        Ok(CreatePayoutResponse {
            payment: Some(payment),
            polling_payout_id: None,
        })
    }

    async fn reverse_payout(
        &self,
        req: ReversePayoutRequest,
    ) -> Result<ReversePayoutResponse, PluginError> {
        let payment = initiations::reverse_payment(
            self.client.get()?.as_ref(),
            &req.payment_initiation_reversal,
            initiations::Kind::Payout,
        )
        .await?;
        Ok(ReversePayoutResponse { payment })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[tokio::test]
    async fn test_operations_before_install() {
        let plugin = Dummypay::new("local");
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
    async fn test_install_returns_workflow() {
        let dir = tempfile::tempdir().unwrap();
        let plugin = Dummypay::new("local");
        let config = serde_json::json!({ "directory": dir.path() });
        let resp = plugin
            .install(InstallRequest {
                connector_id: "local".into(),
                config: serde_json::to_vec(&config).unwrap(),
            })
            .await
            .unwrap();

        assert_eq!(resp.capabilities, CAPABILITIES);
        assert_eq!(resp.workflow.len(), 3);
        assert_eq!(resp.workflow[0].next_tasks[0].task_type, TaskType::FetchBalances);
        assert!(plugin.client.is_installed());
    }

    #[tokio::test]
    async fn test_install_rejects_bad_config() {
        let plugin = Dummypay::new("local");
        let err = plugin
            .install(InstallRequest {
                connector_id: "local".into(),
                config: b"{}".to_vec(),
            })
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::InvalidConfig));
        assert!(!plugin.client.is_installed());
    }

    #[tokio::test]
    async fn test_webhooks_not_implemented() {
        let dir = tempfile::tempdir().unwrap();
        let plugin = Dummypay::with_client("local", Arc::new(FileClient::new(dir.path())));
        let err = plugin
            .create_webhooks(CreateWebhooksRequest::default())
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::NotImplemented));
    }
}

//! Modulr connector: accounts, beneficiaries, per-account transactions, and
//! transfers/payouts that settle asynchronously.

mod accounts;
pub mod client;
pub mod config;
mod external_accounts;
mod initiations;
mod payments;
#[cfg(test)]
mod testing;

use std::sync::Arc;

use async_trait::async_trait;

use self::client::{Client, HttpModulrClient};
use self::config::Config;
use self::initiations::Outcome;
use crate::connector::registry::Registration;
use crate::connector::*;
use crate::currency::CurrencyTable;
use crate::error::{ErrorKind, PluginError};
use crate::models::Capability;

pub const PROVIDER: &str = "modulr";
pub const DEFAULT_PAGE_SIZE: usize = 100;

pub const CAPABILITIES: &[Capability] = &[
    Capability::FetchAccounts,
    Capability::FetchBalances,
    Capability::FetchExternalAccounts,
    Capability::FetchPayments,
    Capability::CreateTransfer,
    Capability::CreatePayout,
];

pub(crate) const SUPPORTED_CURRENCIES: &CurrencyTable = &[("EUR", 2), ("GBP", 2)];

pub fn registration() -> Registration {
    Registration {
        provider: PROVIDER,
        plugin_type: PluginType::Psp,
        capabilities: CAPABILITIES,
        default_page_size: DEFAULT_PAGE_SIZE,
        create: |name| Arc::new(Modulr::new(name)),
        validate_config: |raw| Config::from_json(raw).map(|_| ()),
    }
}

pub fn workflow() -> ConnectorTasksTree {
    vec![
        ConnectorTaskTree::new(TaskType::FetchAccounts, "fetch_accounts")
            .periodically()
            .then(ConnectorTaskTree::new(TaskType::FetchBalances, "fetch_balances").periodically())
            .then(ConnectorTaskTree::new(TaskType::FetchPayments, "fetch_payments").periodically()),
        ConnectorTaskTree::new(TaskType::FetchExternalAccounts, "fetch_beneficiaries").periodically(),
    ]
}

pub struct Modulr {
    name: String,
    client: Installed<dyn Client>,
}

impl Modulr {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            client: Installed::new(),
        }
    }

    pub fn with_client(name: &str, client: Arc<dyn Client>) -> Self {
        let plugin = Self::new(name);
        plugin.client.set(client);
        plugin
    }
}

#[async_trait]
impl Plugin for Modulr {
    fn name(&self) -> &str {
        &self.name
    }

    async fn install(&self, req: InstallRequest) -> Result<InstallResponse, PluginError> {
        let config = Config::from_json(&req.config)?;
        let client = HttpModulrClient::new(&config.api_key, &config.api_secret, &config.endpoint)
            .map_err(|e| PluginError::wrap(e, ErrorKind::InvalidConfig))?;
        self.client.set(Arc::new(client));

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

    async fn create_transfer(
        &self,
        req: CreateTransferRequest,
    ) -> Result<CreateTransferResponse, PluginError> {
        let outcome =
            initiations::create_transfer(self.client.get()?.as_ref(), &req.payment_initiation).await?;
        match outcome {
            Outcome::Done(payment) => Ok(CreateTransferResponse {
                payment: Some(payment),
                polling_transfer_id: None,
            }),
            Outcome::Pending(id) => Ok(CreateTransferResponse {
                payment: None,
                polling_transfer_id: Some(id),
            }),
            Outcome::Failed(reason) => Err(PluginError::invalid_request(format!("transfer failed: {reason}"))),
        }
    }

    async fn poll_transfer_status(
        &self,
        req: PollTransferStatusRequest,
    ) -> Result<PollTransferStatusResponse, PluginError> {
        Ok(match initiations::poll(self.client.get()?.as_ref(), &req.transfer_id).await? {
            Outcome::Done(payment) => PollTransferStatusResponse {
                payment: Some(payment),
                error: None,
            },
            Outcome::Pending(_) => PollTransferStatusResponse::default(),
            Outcome::Failed(reason) => PollTransferStatusResponse {
                payment: None,
                error: Some(reason),
            },
        })
    }

    async fn create_payout(
        &self,
        req: CreatePayoutRequest,
    ) -> Result<CreatePayoutResponse, PluginError> {
        let outcome =
            initiations::create_payout(self.client.get()?.as_ref(), &req.payment_initiation).await?;
        match outcome {
            Outcome::Done(payment) => Ok(CreatePayoutResponse {
                payment: Some(payment),
                polling_payout_id: None,
            }),
            Outcome::Pending(id) => Ok(CreatePayoutResponse {
                payment: None,
                polling_payout_id: Some(id),
            }),
            Outcome::Failed(reason) => Err(PluginError::invalid_request(format!("payout failed: {reason}"))),
        }
    }

    async fn poll_payout_status(
        &self,
        req: PollPayoutStatusRequest,
    ) -> Result<PollPayoutStatusResponse, PluginError> {
        Ok(match initiations::poll(self.client.get()?.as_ref(), &req.payout_id).await? {
            Outcome::Done(payment) => PollPayoutStatusResponse {
                payment: Some(payment),
                error: None,
            },
            Outcome::Pending(_) => PollPayoutStatusResponse::default(),
            Outcome::Failed(reason) => PollPayoutStatusResponse {
                payment: None,
                error: Some(reason),
            },
        })
    }
}

//! Plugin contract shared by every connector.
//!
//! A connector implements [`Plugin`], overriding only the operations it
//! supports; every other operation falls back to the trait default, which
//! returns `NotImplemented`. Operations that need a vendor client return
//! `NotYetInstalled` until [`Plugin::install`] has built one.

pub mod config;
pub mod polling;
pub mod registry;
pub mod requests;
pub mod workflow;
pub mod wrapper;

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::PluginError;

pub use polling::PollingPeriod;
pub use registry::{Registration, Registry};
pub use requests::*;
pub use workflow::{ConnectorTaskTree, ConnectorTasksTree, TaskType};
pub use wrapper::InstrumentedPlugin;

/// Which family of integration a connector belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PluginType {
    Psp,
    OpenBanking,
    Both,
}

/// The operation set every connector exposes.
///
/// Dropping a returned future cancels the operation, including any in-flight
/// vendor request.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Instance name used in logs.
    fn name(&self) -> &str;

    async fn install(&self, _req: InstallRequest) -> Result<InstallResponse, PluginError> {
        Err(PluginError::not_implemented())
    }

    async fn uninstall(&self, _req: UninstallRequest) -> Result<UninstallResponse, PluginError> {
        Err(PluginError::not_implemented())
    }

    async fn fetch_next_accounts(
        &self,
        _req: FetchNextRequest,
    ) -> Result<FetchNextAccountsResponse, PluginError> {
        Err(PluginError::not_implemented())
    }

    async fn fetch_next_balances(
        &self,
        _req: FetchNextRequest,
    ) -> Result<FetchNextBalancesResponse, PluginError> {
        Err(PluginError::not_implemented())
    }

    async fn fetch_next_external_accounts(
        &self,
        _req: FetchNextRequest,
    ) -> Result<FetchNextExternalAccountsResponse, PluginError> {
        Err(PluginError::not_implemented())
    }

    async fn fetch_next_payments(
        &self,
        _req: FetchNextRequest,
    ) -> Result<FetchNextPaymentsResponse, PluginError> {
        Err(PluginError::not_implemented())
    }

    async fn fetch_next_others(
        &self,
        _req: FetchNextOthersRequest,
    ) -> Result<FetchNextOthersResponse, PluginError> {
        Err(PluginError::not_implemented())
    }

    async fn create_bank_account(
        &self,
        _req: CreateBankAccountRequest,
    ) -> Result<CreateBankAccountResponse, PluginError> {
        Err(PluginError::not_implemented())
    }

    async fn create_transfer(
        &self,
        _req: CreateTransferRequest,
    ) -> Result<CreateTransferResponse, PluginError> {
        Err(PluginError::not_implemented())
    }

    async fn reverse_transfer(
        &self,
        _req: ReverseTransferRequest,
    ) -> Result<ReverseTransferResponse, PluginError> {
        Err(PluginError::not_implemented())
    }

    async fn poll_transfer_status(
        &self,
        _req: PollTransferStatusRequest,
    ) -> Result<PollTransferStatusResponse, PluginError> {
        Err(PluginError::not_implemented())
    }

    async fn create_payout(
        &self,
        _req: CreatePayoutRequest,
    ) -> Result<CreatePayoutResponse, PluginError> {
        Err(PluginError::not_implemented())
    }

    async fn reverse_payout(
        &self,
        _req: ReversePayoutRequest,
    ) -> Result<ReversePayoutResponse, PluginError> {
        Err(PluginError::not_implemented())
    }

    async fn poll_payout_status(
        &self,
        _req: PollPayoutStatusRequest,
    ) -> Result<PollPayoutStatusResponse, PluginError> {
        Err(PluginError::not_implemented())
    }

    async fn create_webhooks(
        &self,
        _req: CreateWebhooksRequest,
    ) -> Result<CreateWebhooksResponse, PluginError> {
        Err(PluginError::not_implemented())
    }

    async fn verify_webhook(
        &self,
        _req: VerifyWebhookRequest,
    ) -> Result<VerifyWebhookResponse, PluginError> {
        Err(PluginError::not_implemented())
    }

    async fn translate_webhook(
        &self,
        _req: TranslateWebhookRequest,
    ) -> Result<TranslateWebhookResponse, PluginError> {
        Err(PluginError::not_implemented())
    }
}

/// Holds the vendor client once `install` has built it.
///
/// Reinstalling replaces the client. Readers clone the `Arc` and release
/// the lock before doing any I/O.
pub struct Installed<C: ?Sized> {
    client: RwLock<Option<Arc<C>>>,
}

impl<C: ?Sized> Installed<C> {
    pub fn new() -> Self {
        Self {
            client: RwLock::new(None),
        }
    }

    pub fn set(&self, client: Arc<C>) {
        let mut guard = self.client.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some(client);
    }

    /// The installed client, or `NotYetInstalled`.
    pub fn get(&self) -> Result<Arc<C>, PluginError> {
        let guard = self.client.read().unwrap_or_else(|e| e.into_inner());
        guard.as_ref().cloned().ok_or_else(PluginError::not_yet_installed)
    }

    pub fn is_installed(&self) -> bool {
        self.get().is_ok()
    }
}

impl<C: ?Sized> Default for Installed<C> {
    fn default() -> Self {
        Self::new()
    }
}

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, info_span, Instrument};

use super::*;
use crate::error::PluginError;
use crate::models::PspPayment;

/// Wraps a plugin with a tracing span and start/finish logs per operation.
///
/// Canonical entities coming out of a plugin are validated here, so a
/// connector bug surfaces as a `Validation` error instead of bad data.
pub struct InstrumentedPlugin {
    provider: &'static str,
    inner: Arc<dyn Plugin>,
}

impl InstrumentedPlugin {
    pub fn new(provider: &'static str, inner: Arc<dyn Plugin>) -> Self {
        Self { provider, inner }
    }

    async fn observe<T, Fut>(
        &self,
        operation: &'static str,
        starting: &'static str,
        done: &'static str,
        fut: Fut,
    ) -> Result<T, PluginError>
    where
        Fut: Future<Output = Result<T, PluginError>> + Send,
    {
        let span = info_span!(
            "plugin",
            provider = self.provider,
            name = self.inner.name(),
            operation
        );

        async move {
            info!("{starting}...");
            match fut.await {
                Ok(resp) => {
                    info!("{done}");
                    Ok(resp)
                }
                Err(err) => {
                    error!(error = %err, "{operation} failed");
                    Err(err)
                }
            }
        }
        .instrument(span)
        .await
    }
}

fn validate_all<T>(
    items: &[T],
    validate: impl Fn(&T) -> Result<(), PluginError>,
) -> Result<(), PluginError> {
    items.iter().try_for_each(validate)
}

fn validate_optional(payment: Option<&PspPayment>) -> Result<(), PluginError> {
    payment.map_or(Ok(()), PspPayment::validate)
}

#[async_trait]
impl Plugin for InstrumentedPlugin {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn install(&self, req: InstallRequest) -> Result<InstallResponse, PluginError> {
        self.observe("install", "installing", "installed!", self.inner.install(req))
            .await
    }

    async fn uninstall(&self, req: UninstallRequest) -> Result<UninstallResponse, PluginError> {
        self.observe(
            "uninstall",
            "uninstalling",
            "uninstalled!",
            self.inner.uninstall(req),
        )
        .await
    }

    async fn fetch_next_accounts(
        &self,
        req: FetchNextRequest,
    ) -> Result<FetchNextAccountsResponse, PluginError> {
        self.observe(
            "fetch_next_accounts",
            "fetching next accounts",
            "fetched next accounts succeeded!",
            async {
                let resp = self.inner.fetch_next_accounts(req).await?;
                validate_all(&resp.items, |a| a.validate())?;
                Ok(resp)
            },
        )
        .await
    }

    async fn fetch_next_balances(
        &self,
        req: FetchNextRequest,
    ) -> Result<FetchNextBalancesResponse, PluginError> {
        self.observe(
            "fetch_next_balances",
            "fetching next balances",
            "fetched next balances succeeded!",
            async {
                let resp = self.inner.fetch_next_balances(req).await?;
                validate_all(&resp.items, |b| b.validate())?;
                Ok(resp)
            },
        )
        .await
    }

    async fn fetch_next_external_accounts(
        &self,
        req: FetchNextRequest,
    ) -> Result<FetchNextExternalAccountsResponse, PluginError> {
        self.observe(
            "fetch_next_external_accounts",
            "fetching next external accounts",
            "fetched next external accounts succeeded!",
            async {
                let resp = self.inner.fetch_next_external_accounts(req).await?;
                validate_all(&resp.items, |a| a.validate())?;
                Ok(resp)
            },
        )
        .await
    }

    async fn fetch_next_payments(
        &self,
        req: FetchNextRequest,
    ) -> Result<FetchNextPaymentsResponse, PluginError> {
        self.observe(
            "fetch_next_payments",
            "fetching next payments",
            "fetched next payments succeeded!",
            async {
                let resp = self.inner.fetch_next_payments(req).await?;
                validate_all(&resp.items, |p| p.validate())?;
                Ok(resp)
            },
        )
        .await
    }

    async fn fetch_next_others(
        &self,
        req: FetchNextOthersRequest,
    ) -> Result<FetchNextOthersResponse, PluginError> {
        self.observe(
            "fetch_next_others",
            "fetching next others",
            "fetched next others succeeded!",
            async {
                let resp = self.inner.fetch_next_others(req).await?;
                validate_all(&resp.items, |o| o.validate())?;
                Ok(resp)
            },
        )
        .await
    }

    async fn create_bank_account(
        &self,
        req: CreateBankAccountRequest,
    ) -> Result<CreateBankAccountResponse, PluginError> {
        self.observe(
            "create_bank_account",
            "creating bank account",
            "created bank account!",
            async {
                let resp = self.inner.create_bank_account(req).await?;
                resp.related_account.validate()?;
                Ok(resp)
            },
        )
        .await
    }

    async fn create_transfer(
        &self,
        req: CreateTransferRequest,
    ) -> Result<CreateTransferResponse, PluginError> {
        self.observe(
            "create_transfer",
            "creating transfer",
            "created transfer!",
            async {
                let resp = self.inner.create_transfer(req).await?;
                validate_optional(resp.payment.as_ref())?;
                Ok(resp)
            },
        )
        .await
    }

    async fn reverse_transfer(
        &self,
        req: ReverseTransferRequest,
    ) -> Result<ReverseTransferResponse, PluginError> {
        self.observe(
            "reverse_transfer",
            "reversing transfer",
            "reversed transfer!",
            async {
                let resp = self.inner.reverse_transfer(req).await?;
                resp.payment.validate()?;
                Ok(resp)
            },
        )
        .await
    }

    async fn poll_transfer_status(
        &self,
        req: PollTransferStatusRequest,
    ) -> Result<PollTransferStatusResponse, PluginError> {
        self.observe(
            "poll_transfer_status",
            "polling transfer status",
            "polled transfer status!",
            async {
                let resp = self.inner.poll_transfer_status(req).await?;
                validate_optional(resp.payment.as_ref())?;
                Ok(resp)
            },
        )
        .await
    }

    async fn create_payout(
        &self,
        req: CreatePayoutRequest,
    ) -> Result<CreatePayoutResponse, PluginError> {
        self.observe(
            "create_payout",
            "creating payout",
            "created payout!",
            async {
                let resp = self.inner.create_payout(req).await?;
                validate_optional(resp.payment.as_ref())?;
                Ok(resp)
            },
        )
        .await
    }

    async fn reverse_payout(
        &self,
        req: ReversePayoutRequest,
    ) -> Result<ReversePayoutResponse, PluginError> {
        self.observe(
            "reverse_payout",
            "reversing payout",
            "reversed payout!",
            async {
                let resp = self.inner.reverse_payout(req).await?;
                resp.payment.validate()?;
                Ok(resp)
            },
        )
        .await
    }

    async fn poll_payout_status(
        &self,
        req: PollPayoutStatusRequest,
    ) -> Result<PollPayoutStatusResponse, PluginError> {
        self.observe(
            "poll_payout_status",
            "polling payout status",
            "polled payout status!",
            async {
                let resp = self.inner.poll_payout_status(req).await?;
                validate_optional(resp.payment.as_ref())?;
                Ok(resp)
            },
        )
        .await
    }

    async fn create_webhooks(
        &self,
        req: CreateWebhooksRequest,
    ) -> Result<CreateWebhooksResponse, PluginError> {
        self.observe(
            "create_webhooks",
            "creating webhooks",
            "created webhooks!",
            self.inner.create_webhooks(req),
        )
        .await
    }

    async fn verify_webhook(
        &self,
        req: VerifyWebhookRequest,
    ) -> Result<VerifyWebhookResponse, PluginError> {
        self.observe(
            "verify_webhook",
            "verifying webhook",
            "verified webhook!",
            self.inner.verify_webhook(req),
        )
        .await
    }

    async fn translate_webhook(
        &self,
        req: TranslateWebhookRequest,
    ) -> Result<TranslateWebhookResponse, PluginError> {
        self.observe(
            "translate_webhook",
            "translating webhook",
            "translated webhook!",
            self.inner.translate_webhook(req),
        )
        .await
    }
}

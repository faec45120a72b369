//! Wise connector.
//!
//! Everything hangs off profiles: the profiles task runs first and each
//! profile becomes the `from_payload` of the balance, recipient, transfer and
//! webhook tasks below it.

mod accounts;
pub mod client;
pub mod config;
mod initiations;
mod payments;
mod profiles;
mod recipients;
#[cfg(test)]
mod testing;
mod webhooks;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use self::client::{Client, HttpWiseClient, Profile};
use self::config::Config;
use crate::connector::registry::Registration;
use crate::connector::*;
use crate::crypto::RsaSha256Verifier;
use crate::currency::{self, DecimalsCache, ISO4217};
use crate::error::{ErrorKind, PluginError};
use crate::models::{Capability, PaymentType, PspOther};
use crate::pagination::decode_from_payload;

pub const PROVIDER: &str = "wise";
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Name of the `fetch_next_others` entity holding profiles.
pub const FETCH_PROFILES: &str = "fetch_profiles";

/// Account metadata key carrying the owning profile.
pub const PROFILE_ID_METADATA: &str = "com.wise.spec/profile_id";

const CURRENCIES_TTL: Duration = Duration::from_secs(24 * 60 * 60);

pub const CAPABILITIES: &[Capability] = &[
    Capability::FetchAccounts,
    Capability::FetchBalances,
    Capability::FetchExternalAccounts,
    Capability::FetchPayments,
    Capability::FetchOthers,
    Capability::CreateWebhooks,
    Capability::TranslateWebhooks,
    Capability::CreateTransfer,
    Capability::CreatePayout,
];

pub fn registration() -> Registration {
    Registration {
        provider: PROVIDER,
        plugin_type: PluginType::Psp,
        capabilities: CAPABILITIES,
        default_page_size: DEFAULT_PAGE_SIZE,
        create: |name| Arc::new(Wise::new(name)),
        validate_config: |raw| Config::from_json(raw).map(|_| ()),
    }
}

pub fn workflow() -> ConnectorTasksTree {
    vec![ConnectorTaskTree::new(TaskType::FetchOthers, FETCH_PROFILES)
        .periodically()
        .then(
            ConnectorTaskTree::new(TaskType::FetchAccounts, "fetch_accounts")
                .periodically()
                .then(ConnectorTaskTree::new(TaskType::FetchBalances, "fetch_balances").periodically()),
        )
        .then(ConnectorTaskTree::new(TaskType::FetchExternalAccounts, "fetch_recipients").periodically())
        .then(ConnectorTaskTree::new(TaskType::FetchPayments, "fetch_payments").periodically())
        .then(ConnectorTaskTree::new(TaskType::CreateWebhooks, "create_webhooks"))]
}

/// What install produces: the vendor client and the webhook key.
pub struct Installation {
    pub client: Arc<dyn Client>,
    pub webhook_verifier: RsaSha256Verifier,
}

pub struct Wise {
    name: String,
    installed: Installed<Installation>,
    currencies: DecimalsCache,
}

impl Wise {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            installed: Installed::new(),
            currencies: DecimalsCache::new(CURRENCIES_TTL),
        }
    }

    pub fn with_client(name: &str, client: Arc<dyn Client>, webhook_verifier: RsaSha256Verifier) -> Self {
        let plugin = Self::new(name);
        plugin.installed.set(Arc::new(Installation {
            client,
            webhook_verifier,
        }));
        plugin
    }

    fn client(&self) -> Result<Arc<dyn Client>, PluginError> {
        Ok(Arc::clone(&self.installed.get()?.client))
    }

    /// Currency code to decimals, refreshed from Wise at most once a day.
    async fn decimals(&self, client: &dyn Client) -> Result<Arc<HashMap<String, u32>>, PluginError> {
        self.currencies
            .get_or_refresh(move || async move {
                let currencies = client
                    .get_currencies()
                    .await
                    .map_err(|e| PluginError::client("failed to get currencies", e))?;
                Ok(currencies
                    .into_iter()
                    .map(|c| {
                        let decimals = if c.supports_decimals {
                            currency::precision(ISO4217, &c.code).unwrap_or(2)
                        } else {
                            0
                        };
                        (c.code, decimals)
                    })
                    .collect())
            })
            .await
    }
}

/// The profile a child task was spawned from.
pub(crate) fn profile_from_payload(payload: Option<&[u8]>) -> Result<Profile, PluginError> {
    let other: PspOther = decode_from_payload(payload)?;
    serde_json::from_value(other.other).map_err(|source| PluginError::Decode {
        what: "profile",
        source,
    })
}

pub(crate) fn asset(decimals: &HashMap<String, u32>, code: &str) -> Option<(String, u32)> {
    decimals
        .get(&code.to_ascii_uppercase())
        .map(|&p| (currency::format_asset(code, p), p))
}

#[async_trait]
impl Plugin for Wise {
    fn name(&self) -> &str {
        &self.name
    }

    async fn install(&self, req: InstallRequest) -> Result<InstallResponse, PluginError> {
        let config = Config::from_json(&req.config)?;
        let client = HttpWiseClient::new(&config.api_key, config.endpoint())
            .map_err(|e| PluginError::wrap(e, ErrorKind::InvalidConfig))?;
        self.installed.set(Arc::new(Installation {
            client: Arc::new(client),
            webhook_verifier: config.webhook_verifier()?,
        }));

        Ok(InstallResponse {
            capabilities: CAPABILITIES.to_vec(),
            workflow: workflow(),
            polling_period: config.polling()?,
        })
    }

    async fn uninstall(&self, req: UninstallRequest) -> Result<UninstallResponse, PluginError> {
        webhooks::delete_subscriptions(self.client()?.as_ref(), &req.connector_id).await?;
        Ok(UninstallResponse {})
    }

    async fn fetch_next_others(
        &self,
        req: FetchNextOthersRequest,
    ) -> Result<FetchNextOthersResponse, PluginError> {
        let client = self.client()?;
        match req.name.as_str() {
            FETCH_PROFILES => profiles::fetch_next(client.as_ref(), req).await,
            other => Err(PluginError::invalid_request(format!("unknown others name {other:?}"))),
        }
    }

    async fn fetch_next_accounts(
        &self,
        req: FetchNextRequest,
    ) -> Result<FetchNextAccountsResponse, PluginError> {
        let client = self.client()?;
        let decimals = self.decimals(client.as_ref()).await?;
        accounts::fetch_next(client.as_ref(), &decimals, req).await
    }

    async fn fetch_next_balances(
        &self,
        req: FetchNextRequest,
    ) -> Result<FetchNextBalancesResponse, PluginError> {
        let client = self.client()?;
        let decimals = self.decimals(client.as_ref()).await?;
        accounts::fetch_balances(client.as_ref(), &decimals, req).await
    }

    async fn fetch_next_external_accounts(
        &self,
        req: FetchNextRequest,
    ) -> Result<FetchNextExternalAccountsResponse, PluginError> {
        let client = self.client()?;
        let decimals = self.decimals(client.as_ref()).await?;
        recipients::fetch_next(client.as_ref(), &decimals, req).await
    }

    async fn fetch_next_payments(
        &self,
        req: FetchNextRequest,
    ) -> Result<FetchNextPaymentsResponse, PluginError> {
        let client = self.client()?;
        let decimals = self.decimals(client.as_ref()).await?;
        payments::fetch_next(client.as_ref(), &decimals, req).await
    }

    async fn create_transfer(
        &self,
        req: CreateTransferRequest,
    ) -> Result<CreateTransferResponse, PluginError> {
        let client = self.client()?;
        let decimals = self.decimals(client.as_ref()).await?;
        let payment =
            initiations::create(client.as_ref(), &decimals, &req.payment_initiation, PaymentType::Transfer).await?;
        Ok(CreateTransferResponse {
            payment: Some(payment),
            polling_transfer_id: None,
        })
    }

    async fn create_payout(
        &self,
        req: CreatePayoutRequest,
    ) -> Result<CreatePayoutResponse, PluginError> {
        let client = self.client()?;
        let decimals = self.decimals(client.as_ref()).await?;
        let payment =
            initiations::create(client.as_ref(), &decimals, &req.payment_initiation, PaymentType::Payout).await?;
        Ok(CreatePayoutResponse {
            payment: Some(payment),
            polling_payout_id: None,
        })
    }

    async fn create_webhooks(
        &self,
        req: CreateWebhooksRequest,
    ) -> Result<CreateWebhooksResponse, PluginError> {
        webhooks::create(self.client()?.as_ref(), req).await
    }

    async fn verify_webhook(
        &self,
        req: VerifyWebhookRequest,
    ) -> Result<VerifyWebhookResponse, PluginError> {
        let installed = self.installed.get()?;
        webhooks::verify(&installed.webhook_verifier, &req)
    }

    async fn translate_webhook(
        &self,
        req: TranslateWebhookRequest,
    ) -> Result<TranslateWebhookResponse, PluginError> {
        let client = self.client()?;
        let decimals = self.decimals(client.as_ref()).await?;
        webhooks::translate(client.as_ref(), &decimals, &req).await
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{currencies, profile, FakeClient};
    use super::*;
    use crate::crypto::testing::{rsa_public_pem, rsa_sign_base64};
    use crate::crypto::rsa_verifier_from_pem;
    use crate::models::PspWebhook;
    use std::sync::atomic::Ordering;

    fn plugin(fake: Arc<FakeClient>) -> Wise {
        let verifier = rsa_verifier_from_pem(&rsa_public_pem()).unwrap();
        Wise::with_client("wise-test", fake, verifier)
    }

    fn install_request(config: serde_json::Value) -> InstallRequest {
        InstallRequest {
            connector_id: "wise-test".into(),
            config: serde_json::to_vec(&config).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_install_reports_validation_errors() {
        let err = Wise::new("wise-test")
            .install(install_request(serde_json::json!({})))
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::InvalidConfig));
    }

    #[tokio::test]
    async fn test_install_rejects_malformed_pem_key() {
        let wise = Wise::new("wise-test");
        let err = wise
            .install(install_request(serde_json::json!({"apiKey": "dummy", "webhookPublicKey": "badKey"})))
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::InvalidConfig));
        assert!(err.to_string().contains("public key"));
        assert!(wise.installed.get().is_err());
    }

    #[tokio::test]
    async fn test_install_with_public_key() {
        let wise = Wise::new("wise-test");
        let resp = wise
            .install(install_request(serde_json::json!({"apiKey": "key", "webhookPublicKey": rsa_public_pem()})))
            .await
            .unwrap();
        assert_eq!(resp.workflow[0].name, FETCH_PROFILES);

        let body = b"body content".to_vec();
        let signature = rsa_sign_base64(&body);
        let webhook = |signature: &str| PspWebhook {
            headers: [
                ("X-Delivery-Id".to_string(), vec!["delivery-1".to_string()]),
                ("X-Signature-Sha256".to_string(), vec![signature.to_string()]),
            ]
            .into_iter()
            .collect(),
            body: body.clone(),
            ..Default::default()
        };

        let ok = wise
            .verify_webhook(VerifyWebhookRequest {
                webhook: webhook(&signature),
                config: None,
            })
            .await
            .unwrap();
        assert_eq!(ok.webhook_idempotency_key.as_deref(), Some("delivery-1"));

        let err = wise
            .verify_webhook(VerifyWebhookRequest {
                webhook: webhook(&rsa_sign_base64(b"other body")),
                config: None,
            })
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::WebhookVerification));
    }

    #[tokio::test]
    async fn test_unknown_others_name() {
        let wise = plugin(Arc::new(FakeClient::default()));
        let err = wise
            .fetch_next_others(FetchNextOthersRequest {
                name: "fetch_cards".into(),
                page_size: 10,
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::InvalidRequest));
    }

    #[tokio::test]
    async fn test_currencies_loaded_once() {
        let fake = Arc::new(FakeClient {
            profiles: vec![profile(1)],
            currencies: currencies(),
            ..Default::default()
        });
        let wise = plugin(fake.clone());

        let first = wise.decimals(fake.as_ref()).await.unwrap();
        let second = wise.decimals(fake.as_ref()).await.unwrap();
        assert_eq!(first.get("EUR"), Some(&2));
        assert_eq!(second.get("HUF"), Some(&0));
        assert_eq!(fake.currency_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_not_installed() {
        let wise = Wise::new("wise-test");
        let err = wise
            .verify_webhook(VerifyWebhookRequest {
                webhook: Default::default(),
                config: None,
            })
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::NotYetInstalled));
    }

    #[test]
    fn test_workflow_shape() {
        let tree = workflow();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].task_type, TaskType::FetchOthers);
        assert_eq!(tree[0].next_tasks.len(), 4);
        assert_eq!(tree[0].task_count(), 6);
    }
}

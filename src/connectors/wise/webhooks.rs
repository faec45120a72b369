//! Wise webhook subscriptions, signature checks and event translation.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info};

use super::accounts::to_balance;
use super::client::{Amount, Balance, Client, Delivery, SubscriptionRequest};
use super::payments::to_payment;
use super::profile_from_payload;
use crate::connector::{
    CreateWebhooksRequest, CreateWebhooksResponse, TranslateWebhookRequest, TranslateWebhookResponse,
    VerifyWebhookRequest, VerifyWebhookResponse,
};
use crate::crypto::{self, RsaSha256Verifier};
use crate::error::{ErrorKind, PluginError};
use crate::models::{Metadata, PspOther, PspWebhook, PspWebhookConfig, WebhookResponse};
use crate::pagination::to_raw;

pub const HEADER_TEST_NOTIFICATION: &str = "X-Test-Notification";
pub const HEADER_DELIVERY_ID: &str = "X-Delivery-Id";
pub const HEADER_SIGNATURE: &str = "X-Signature-Sha256";

pub const TRANSFER_STATE_CHANGED: &str = "transfer_state_changed";
pub const BALANCE_UPDATE: &str = "balance_update";

struct SupportedWebhook {
    name: &'static str,
    trigger_on: &'static str,
    url_path: &'static str,
    version: &'static str,
}

const SUPPORTED_WEBHOOKS: &[SupportedWebhook] = &[
    SupportedWebhook {
        name: TRANSFER_STATE_CHANGED,
        trigger_on: "transfers#state-change",
        url_path: "/transferstatechanged",
        version: "2.0.0",
    },
    SupportedWebhook {
        name: BALANCE_UPDATE,
        trigger_on: "balances#update",
        url_path: "/balanceupdate",
        version: "2.2.0",
    },
];

fn verification_error(msg: impl Into<String>) -> PluginError {
    PluginError::wrap(msg.into(), ErrorKind::WebhookVerification)
}

fn is_test_notification(webhook: &PspWebhook) -> bool {
    webhook.header(HEADER_TEST_NOTIFICATION) == Some("true")
}

/// Subscribe the profile from `from_payload` to every supported event.
///
/// `webhook_base_url` is expected to be unique per connector instance so
/// that uninstall can recognise its own subscriptions.
pub(super) async fn create(client: &dyn Client, req: CreateWebhooksRequest) -> Result<CreateWebhooksResponse, PluginError> {
    let profile = profile_from_payload(req.from_payload.as_deref())?;
    let base = req.webhook_base_url.trim_end_matches('/');

    let mut resp = CreateWebhooksResponse::default();
    for webhook in SUPPORTED_WEBHOOKS {
        let subscription = client
            .create_subscription(
                profile.id,
                &SubscriptionRequest {
                    name: format!("{}-{}", webhook.name, req.connector_id),
                    trigger_on: webhook.trigger_on.to_string(),
                    delivery: Delivery {
                        version: webhook.version.to_string(),
                        url: format!("{base}{}", webhook.url_path),
                    },
                },
            )
            .await
            .map_err(|e| PluginError::client("failed to create subscription", e))?;

        resp.configs.push(PspWebhookConfig {
            name: webhook.name.to_string(),
            url_path: webhook.url_path.to_string(),
            metadata: Metadata::new(),
        });
        resp.others.push(PspOther {
            id: subscription.id.clone(),
            other: to_raw(&subscription)?,
        });
    }

    info!(profile = profile.id, count = resp.configs.len(), "created wise subscriptions");
    Ok(resp)
}

/// Delete the subscriptions pointing at this connector across all profiles.
pub(super) async fn delete_subscriptions(client: &dyn Client, connector_id: &str) -> Result<(), PluginError> {
    let profiles = client
        .get_profiles()
        .await
        .map_err(|e| PluginError::client("failed to get profiles", e))?;

    for profile in profiles {
        let subscriptions = client
            .list_subscriptions(profile.id)
            .await
            .map_err(|e| PluginError::client("failed to list subscriptions", e))?;
        for subscription in subscriptions.iter().filter(|s| s.delivery.url.contains(connector_id)) {
            client
                .delete_subscription(profile.id, &subscription.id)
                .await
                .map_err(|e| PluginError::client("failed to delete subscription", e))?;
            debug!(profile = profile.id, subscription = %subscription.id, "deleted wise subscription");
        }
    }
    Ok(())
}

/// Wise signs the raw body with its private key (RSA PKCS#1 v1.5, SHA-256).
pub(super) fn verify(key: &RsaSha256Verifier, req: &VerifyWebhookRequest) -> Result<VerifyWebhookResponse, PluginError> {
    let webhook = &req.webhook;
    if is_test_notification(webhook) {
        return Ok(VerifyWebhookResponse::default());
    }

    let delivery_id = webhook
        .header(HEADER_DELIVERY_ID)
        .ok_or_else(|| verification_error("missing X-Delivery-Id header"))?;
    let signature = webhook
        .header(HEADER_SIGNATURE)
        .ok_or_else(|| verification_error("missing X-Signature-Sha256 header"))?;

    if !crypto::verify_rsa_base64(key, &webhook.body, signature) {
        return Err(verification_error("invalid signature"));
    }

    Ok(VerifyWebhookResponse {
        webhook_idempotency_key: Some(delivery_id.to_string()),
    })
}

#[derive(Debug, Deserialize)]
struct Resource {
    id: u64,
    #[serde(default)]
    profile_id: u64,
}

#[derive(Debug, Deserialize)]
struct Event<D> {
    data: D,
}

#[derive(Debug, Deserialize)]
struct TransferStateChange {
    resource: Resource,
}

#[derive(Debug, Deserialize)]
struct BalanceUpdate {
    resource: Resource,
    balance_id: u64,
    currency: String,
    #[serde(deserialize_with = "crate::models::decimal_text")]
    post_transaction_balance_amount: String,
    occurred_at: DateTime<Utc>,
}

fn decode_event<D: for<'de> Deserialize<'de>>(body: &[u8]) -> Result<D, PluginError> {
    serde_json::from_slice::<Event<D>>(body)
        .map(|e| e.data)
        .map_err(|source| PluginError::Decode {
            what: "webhook body",
            source,
        })
}

pub(super) async fn translate(
    client: &dyn Client,
    decimals: &HashMap<String, u32>,
    req: &TranslateWebhookRequest,
) -> Result<TranslateWebhookResponse, PluginError> {
    if is_test_notification(&req.webhook) {
        return Ok(TranslateWebhookResponse::default());
    }

    let response = match req.name.as_str() {
        TRANSFER_STATE_CHANGED => {
            let change: TransferStateChange = decode_event(&req.webhook.body)?;
            let transfer = client
                .get_transfer(change.resource.id)
                .await
                .map_err(|e| PluginError::client("failed to get transfer", e))?;
            to_payment(&transfer, decimals)?.map(WebhookResponse::Payment)
        }
        BALANCE_UPDATE => {
            let update: BalanceUpdate = decode_event(&req.webhook.body)?;
            debug!(profile = update.resource.profile_id, balance = update.balance_id, "wise balance update");
            let balance = Balance {
                id: update.balance_id,
                currency: update.currency.clone(),
                kind: "STANDARD".into(),
                name: None,
                amount: Amount {
                    value: update.post_transaction_balance_amount,
                    currency: update.currency,
                },
                creation_time: update.occurred_at,
                modification_time: update.occurred_at,
            };
            to_balance(&balance, decimals)?.map(WebhookResponse::Balance)
        }
        other => return Err(PluginError::invalid_request(format!("unknown webhook name {other:?}"))),
    };

    Ok(TranslateWebhookResponse {
        responses: response.into_iter().collect(),
    })
}

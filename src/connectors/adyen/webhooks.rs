//! Adyen standard notifications: registration, HMAC verification and
//! translation of notification items into payments.

use tracing::{debug, info};
use url::Url;

use super::client::{Client, CreateWebhookRequest, Notification, NotificationRequestItem};
use super::SUPPORTED_CURRENCIES;
use crate::connector::{
    CreateWebhooksRequest, CreateWebhooksResponse, TranslateWebhookRequest, TranslateWebhookResponse,
    VerifyWebhookRequest, VerifyWebhookResponse,
};
use crate::crypto;
use crate::currency;
use crate::error::{ErrorKind, PluginError};
use crate::models::{
    Metadata, PaymentScheme, PaymentStatus, PaymentType, PspPayment, PspWebhookConfig, WebhookResponse,
};
use crate::pagination::to_raw;

pub const STANDARD_WEBHOOK: &str = "standard";
const STANDARD_URL_PATH: &str = "/standard";

/// Webhook config metadata key holding the hex HMAC key.
pub const HMAC_KEY_METADATA: &str = "hmac_key";

fn verification_error(msg: &str) -> PluginError {
    PluginError::wrap(msg.to_string(), ErrorKind::WebhookVerification)
}

pub(super) async fn create(
    client: &dyn Client,
    credentials: Option<&(String, String)>,
    req: &CreateWebhooksRequest,
) -> Result<CreateWebhooksResponse, PluginError> {
    if req.webhook_base_url.is_empty() {
        return Err(PluginError::invalid_request("webhook base url is not set"));
    }
    let base = Url::parse(&format!("{}/", req.webhook_base_url.trim_end_matches('/')))
        .map_err(|e| PluginError::invalid_request(format!("webhook base url: {e}")))?;
    let url = base
        .join(STANDARD_URL_PATH.trim_start_matches('/'))
        .map_err(|e| PluginError::invalid_request(format!("webhook url: {e}")))?;

    let created = client
        .create_webhook(&CreateWebhookRequest {
            kind: "standard".into(),
            url: url.to_string(),
            active: true,
            communication_format: "json".into(),
            description: req.connector_id.clone(),
            username: credentials.map(|(u, _)| u.clone()),
            password: credentials.map(|(_, p)| p.clone()),
        })
        .await
        .map_err(|e| PluginError::client("failed to create webhook", e))?;

    info!(webhook = %created.webhook.id, url = %url, "created adyen webhook");
    Ok(CreateWebhooksResponse {
        configs: vec![PspWebhookConfig {
            name: STANDARD_WEBHOOK.into(),
            url_path: STANDARD_URL_PATH.into(),
            metadata: Metadata::from([(HMAC_KEY_METADATA.to_string(), created.hmac_key)]),
        }],
        others: Vec::new(),
    })
}

pub(super) async fn delete(client: &dyn Client, connector_id: &str) -> Result<(), PluginError> {
    let webhooks = client
        .list_webhooks()
        .await
        .map_err(|e| PluginError::client("failed to list webhooks", e))?;
    for webhook in webhooks.iter().filter(|w| w.description == connector_id) {
        client
            .delete_webhook(&webhook.id)
            .await
            .map_err(|e| PluginError::client("failed to delete webhook", e))?;
        debug!(webhook = %webhook.id, "deleted adyen webhook");
    }
    Ok(())
}

fn decode_notification(body: &[u8]) -> Result<Notification, PluginError> {
    serde_json::from_slice(body).map_err(|source| PluginError::Decode {
        what: "notification",
        source,
    })
}

/// The string Adyen signs for each notification item.
fn signing_string(item: &NotificationRequestItem) -> String {
    [
        item.psp_reference.as_str(),
        item.original_reference.as_str(),
        item.merchant_account_code.as_str(),
        item.merchant_reference.as_str(),
        &item.amount.value.to_string(),
        item.amount.currency.as_str(),
        item.event_code.as_str(),
        item.success.as_str(),
    ]
    .join(":")
}

pub(super) fn verify(
    credentials: Option<&(String, String)>,
    req: &VerifyWebhookRequest,
) -> Result<VerifyWebhookResponse, PluginError> {
    if let Some((username, password)) = credentials {
        let valid = req.webhook.basic_auth.as_ref().is_some_and(|auth| {
            let user = crypto::constant_time_eq(auth.username.as_bytes(), username.as_bytes());
            let pass = crypto::constant_time_eq(auth.password.as_bytes(), password.as_bytes());
            user & pass
        });
        if !valid {
            return Err(verification_error("invalid basic auth"));
        }
    }

    let key_hex = req
        .config
        .as_ref()
        .and_then(|c| c.metadata.get(HMAC_KEY_METADATA))
        .ok_or_else(|| verification_error("missing HMAC key"))?;
    let key = hex::decode(key_hex).map_err(|_| verification_error("HMAC key is not hex"))?;

    let notification = decode_notification(&req.webhook.body)?;
    for entry in &notification.notification_items {
        let item = &entry.item;
        let signature = item
            .additional_data
            .hmac_signature
            .as_deref()
            .ok_or_else(|| verification_error("missing HMAC signature"))?;
        if !crypto::verify_base64(&key, signing_string(item).as_bytes(), signature) {
            return Err(verification_error("invalid HMAC"));
        }
    }

    Ok(VerifyWebhookResponse {
        webhook_idempotency_key: Some(crypto::sha256_base64(&req.webhook.body)),
    })
}

fn parse_scheme(method: &str) -> PaymentScheme {
    const PREFIXES: &[(&str, PaymentScheme)] = &[
        ("visa", PaymentScheme::CardVisa),
        ("electron", PaymentScheme::CardVisa),
        ("amex", PaymentScheme::CardAmex),
        ("alipay", PaymentScheme::CardAlipay),
        ("cup", PaymentScheme::CardCup),
        ("discover", PaymentScheme::CardDiscover),
        ("doku", PaymentScheme::Doku),
        ("dragonpay", PaymentScheme::DragonPay),
        ("jcb", PaymentScheme::CardJcb),
        ("maestro", PaymentScheme::Maestro),
        ("mc", PaymentScheme::CardMastercard),
        ("molpay", PaymentScheme::MolPay),
        ("diners", PaymentScheme::CardDiners),
    ];
    PREFIXES
        .iter()
        .find(|(prefix, _)| method.starts_with(prefix))
        .map_or(PaymentScheme::Other, |(_, scheme)| *scheme)
}

/// How one event code translates.
struct Translation {
    payment_type: PaymentType,
    status: PaymentStatus,
    has_parent: bool,
    parse_scheme: bool,
}

fn translation_for(item: &NotificationRequestItem) -> Option<Translation> {
    let ok = item.succeeded();
    let (payment_type, status, has_parent, parse_scheme) = match item.event_code.as_str() {
        "AUTHORISATION" => (
            PaymentType::Payin,
            if ok { PaymentStatus::Authorisation } else { PaymentStatus::Failed },
            false,
            true,
        ),
        "AUTHORISATION_ADJUSTMENT" => (PaymentType::Payin, PaymentStatus::AmountAdjustment, true, false),
        "CANCELLATION" => (PaymentType::Payin, PaymentStatus::Cancelled, true, true),
        "PAYOUT_THIRDPARTY" => (
            PaymentType::Payout,
            if ok { PaymentStatus::Succeeded } else { PaymentStatus::Failed },
            false,
            false,
        ),
        // The remaining codes only matter when the operation went through.
        _ if !ok => return None,
        "CAPTURE" => (PaymentType::Payin, PaymentStatus::Capture, true, false),
        "CAPTURE_FAILED" => (PaymentType::Payin, PaymentStatus::CaptureFailed, true, false),
        "REFUND" | "REFUND_WITH_DATA" => (PaymentType::Payin, PaymentStatus::Refunded, true, false),
        "REFUND_FAILED" => (PaymentType::Payin, PaymentStatus::RefundedFailure, true, false),
        "REFUNDED_REVERSED" => (PaymentType::Payin, PaymentStatus::RefundReversed, true, false),
        "PAYOUT_DECLINE" => (PaymentType::Payout, PaymentStatus::Failed, true, false),
        "PAYOUT_EXPIRE" => (PaymentType::Payout, PaymentStatus::Expired, true, false),
        _ => return None,
    };
    Some(Translation {
        payment_type,
        status,
        has_parent,
        parse_scheme,
    })
}

fn to_payment(item: &NotificationRequestItem) -> Result<Option<PspPayment>, PluginError> {
    let Some(t) = translation_for(item) else {
        debug!(event_code = %item.event_code, reference = %item.psp_reference, "ignoring adyen notification");
        return Ok(None);
    };
    let Some(asset) = currency::asset_from_table(SUPPORTED_CURRENCIES, &item.amount.currency) else {
        debug!(currency = %item.amount.currency, "skipping notification with unsupported currency");
        return Ok(None);
    };

    let merchant = Some(item.merchant_account_code.clone());
    let (source, destination) = match t.payment_type {
        PaymentType::Payout => (merchant, None),
        _ => (None, merchant),
    };

    Ok(Some(PspPayment {
        parent_reference: if t.has_parent {
            item.original_reference.clone()
        } else {
            String::new()
        },
        reference: item.psp_reference.clone(),
        created_at: item.event_date,
        payment_type: t.payment_type,
        amount: item.amount.value.into(),
        asset,
        scheme: if t.parse_scheme {
            parse_scheme(&item.payment_method)
        } else {
            PaymentScheme::Other
        },
        status: t.status,
        source_account_reference: source,
        destination_account_reference: destination,
        metadata: Metadata::new(),
        raw: to_raw(item)?,
    }))
}

pub(super) fn translate(req: &TranslateWebhookRequest) -> Result<TranslateWebhookResponse, PluginError> {
    if req.name != STANDARD_WEBHOOK {
        return Err(PluginError::invalid_request(format!("unknown webhook name {:?}", req.name)));
    }

    let notification = decode_notification(&req.webhook.body)?;
    let mut responses = Vec::with_capacity(notification.notification_items.len());
    for entry in &notification.notification_items {
        if let Some(payment) = to_payment(&entry.item)? {
            responses.push(WebhookResponse::Payment(payment));
        }
    }
    Ok(TranslateWebhookResponse { responses })
}

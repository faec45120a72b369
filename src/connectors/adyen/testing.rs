//! In-memory Adyen client for unit tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::client::*;
use crate::http::ClientError;

#[derive(Default)]
pub struct FakeClient {
    pub merchants: Vec<MerchantAccount>,
    pub webhooks: Mutex<Vec<Webhook>>,
    pub created: Mutex<Vec<CreateWebhookRequest>>,
    pub fail_next: AtomicBool,
}

impl FakeClient {
    fn check(&self) -> Result<(), ClientError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(ClientError::Status {
                status: 500,
                body: "boom".into(),
            });
        }
        Ok(())
    }
}

pub fn merchant(id: usize) -> MerchantAccount {
    MerchantAccount {
        id: format!("Merchant{id:03}"),
        name: format!("merchant {id}"),
        status: "Active".into(),
        merchant_city: None,
        primary_settlement_currency: Some("EUR".into()),
    }
}

pub const HMAC_KEY: &str = "44782DEF547AAA06C910C43932B1EB0C71FC68D9D0C057550C48EC2ACF6BA056";

#[async_trait]
impl Client for FakeClient {
    async fn get_merchant_accounts(&self, page: usize, page_size: usize) -> Result<Vec<MerchantAccount>, ClientError> {
        self.check()?;
        Ok(self
            .merchants
            .iter()
            .skip(page * page_size)
            .take(page_size)
            .cloned()
            .collect())
    }

    async fn create_webhook(&self, req: &CreateWebhookRequest) -> Result<CreatedWebhook, ClientError> {
        self.check()?;
        let mut webhooks = self.webhooks.lock().unwrap_or_else(|e| e.into_inner());
        let webhook = Webhook {
            id: format!("WBHK{}", webhooks.len() + 1),
            url: req.url.clone(),
            description: req.description.clone(),
        };
        webhooks.push(webhook.clone());
        self.created
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(req.clone());
        Ok(CreatedWebhook {
            webhook,
            hmac_key: HMAC_KEY.into(),
        })
    }

    async fn list_webhooks(&self) -> Result<Vec<Webhook>, ClientError> {
        self.check()?;
        Ok(self.webhooks.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    async fn delete_webhook(&self, webhook_id: &str) -> Result<(), ClientError> {
        self.check()?;
        self.webhooks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|w| w.id != webhook_id);
        Ok(())
    }
}

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::client::{Client, MerchantAccount};
use super::SUPPORTED_CURRENCIES;
use crate::connector::{FetchNextAccountsResponse, FetchNextRequest, FetchNextResponse};
use crate::currency;
use crate::error::PluginError;
use crate::models::{Metadata, PspAccount};
use crate::pagination::{decode_state, encode_state, should_fetch_more, to_raw, validate_page_size};

/// Page being read and the last merchant account handed out from it.
///
/// Once the listing is exhausted the state goes back to its zero value, so
/// the next cycle walks the whole listing again.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AccountsState {
    #[serde(default)]
    pub last_page: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_id: Option<String>,
}

pub(super) async fn fetch_next(
    client: &dyn Client,
    req: FetchNextRequest,
) -> Result<FetchNextAccountsResponse, PluginError> {
    validate_page_size(req.page_size)?;
    let state: AccountsState = decode_state(req.state())?;

    let mut items: Vec<PspAccount> = Vec::with_capacity(req.page_size);
    let mut page = state.last_page;
    let mut last_id = state.last_id.clone();
    let mut resuming = state.last_id.as_deref();
    let mut has_more;

    loop {
        let batch = client
            .get_merchant_accounts(page, req.page_size)
            .await
            .map_err(|e| PluginError::client("failed to get merchant accounts", e))?;

        // Only the page we stopped on can hold accounts already handed out.
        let start = resuming
            .take()
            .and_then(|id| batch.iter().position(|m| m.id == id))
            .map_or(0, |i| i + 1);

        let mut unconsumed = false;
        for merchant in &batch[start..] {
            if items.len() >= req.page_size {
                unconsumed = true;
                break;
            }
            last_id = Some(merchant.id.clone());
            items.push(to_account(merchant)?);
        }

        let (need_more, more) = should_fetch_more(&items, &batch, req.page_size);
        has_more = more || unconsumed;
        if !need_more {
            break;
        }
        page += 1;
    }

    let new_state = if has_more {
        AccountsState {
            last_page: page,
            last_id,
        }
    } else {
        AccountsState::default()
    };

    Ok(FetchNextResponse {
        items,
        new_state: encode_state(&new_state)?,
        has_more,
    })
}

fn to_account(merchant: &MerchantAccount) -> Result<PspAccount, PluginError> {
    let mut metadata = Metadata::new();
    if !merchant.status.is_empty() {
        metadata.insert("com.adyen.spec/status".into(), merchant.status.clone());
    }
    if let Some(city) = &merchant.merchant_city {
        metadata.insert("com.adyen.spec/merchant_city".into(), city.clone());
    }

    Ok(PspAccount {
        reference: merchant.id.clone(),
        created_at: Utc::now(),
        name: (!merchant.name.is_empty()).then(|| merchant.name.clone()),
        default_asset: merchant
            .primary_settlement_currency
            .as_deref()
            .and_then(|c| currency::asset_from_table(SUPPORTED_CURRENCIES, c)),
        metadata,
        raw: to_raw(merchant)?,
    })
}

#[cfg(test)]
mod tests {
    use super::super::testing::{merchant, FakeClient};
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::Ordering;

    fn req(state: Option<Vec<u8>>, page_size: usize) -> FetchNextRequest {
        FetchNextRequest {
            state,
            page_size,
            from_payload: None,
        }
    }

    #[tokio::test]
    async fn test_walk_then_reset() {
        let client = FakeClient {
            merchants: (0..25).map(merchant).collect(),
            ..Default::default()
        };

        let mut seen = HashSet::new();
        let mut state = None;
        let mut calls = 0;
        loop {
            calls += 1;
            let resp = fetch_next(&client, req(state.take(), 10)).await.unwrap();
            for a in &resp.items {
                assert!(seen.insert(a.reference.clone()));
            }
            state = Some(resp.new_state);
            if !resp.has_more {
                break;
            }
            assert!(calls < 10, "did not terminate");
        }
        assert_eq!(seen.len(), 25);

        let exhausted: AccountsState = serde_json::from_slice(state.as_deref().unwrap()).unwrap();
        assert_eq!(exhausted, AccountsState::default());

        let again = fetch_next(&client, req(state, 10)).await.unwrap();
        assert_eq!(again.items[0].reference, "Merchant000");
    }

    #[tokio::test]
    async fn test_full_last_page_is_not_repeated() {
        let client = FakeClient {
            merchants: (0..20).map(merchant).collect(),
            ..Default::default()
        };
        let first = fetch_next(&client, req(None, 10)).await.unwrap();
        let second = fetch_next(&client, req(Some(first.new_state), 10)).await.unwrap();
        assert_eq!(second.items[0].reference, "Merchant010");
        assert!(second.has_more);

        let third = fetch_next(&client, req(Some(second.new_state), 10)).await.unwrap();
        assert!(third.items.is_empty());
        assert!(!third.has_more);
    }

    #[tokio::test]
    async fn test_retry_after_failure() {
        let client = FakeClient {
            merchants: (0..5).map(merchant).collect(),
            ..Default::default()
        };
        let first = fetch_next(&client, req(None, 3)).await.unwrap();
        client.fail_next.store(true, Ordering::SeqCst);
        assert!(fetch_next(&client, req(Some(first.new_state.clone()), 3)).await.is_err());

        let retried = fetch_next(&client, req(Some(first.new_state), 3)).await.unwrap();
        let refs: Vec<&str> = retried.items.iter().map(|a| a.reference.as_str()).collect();
        assert_eq!(refs, vec!["Merchant003", "Merchant004"]);
        assert_eq!(retried.items[0].default_asset.as_deref(), Some("EUR/2"));
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::client::{parse_time, Account, Client};
use super::SUPPORTED_CURRENCIES;
use crate::connector::{FetchNextAccountsResponse, FetchNextBalancesResponse, FetchNextRequest, FetchNextResponse};
use crate::currency;
use crate::error::PluginError;
use crate::models::{Metadata, PspAccount, PspBalance};
use crate::pagination::{
    decode_from_payload, decode_state, encode_state, should_fetch_more, to_raw, validate_page_size,
};

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AccountsState {
    #[serde(default)]
    pub last_page: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_creation_date: Option<DateTime<Utc>>,
}

pub(super) fn created_at(value: &str, what: &str) -> Result<DateTime<Utc>, PluginError> {
    parse_time(value).map_err(|e| PluginError::translation(what, format!("bad timestamp {value:?}: {e}")))
}

pub(super) async fn fetch_next(
    client: &dyn Client,
    req: FetchNextRequest,
) -> Result<FetchNextAccountsResponse, PluginError> {
    validate_page_size(req.page_size)?;
    let state: AccountsState = decode_state(req.state())?;

    let mut items: Vec<PspAccount> = Vec::with_capacity(req.page_size);
    let mut watermark = state.last_creation_date;
    let mut page = state.last_page;
    let mut has_more;

    loop {
        let batch = client
            .get_accounts(page, req.page_size)
            .await
            .map_err(|e| PluginError::client("failed to get accounts", e))?;

        let mut unconsumed = false;
        for account in &batch {
            let created = created_at(&account.created_date, "account")?;
            if state.last_creation_date.is_some_and(|last| created <= last) {
                continue;
            }
            if items.len() >= req.page_size {
                unconsumed = true;
                break;
            }
            watermark = Some(created);
            items.push(to_account(account, created)?);
        }

        let (need_more, more) = should_fetch_more(&items, &batch, req.page_size);
        has_more = more || unconsumed;
        if !need_more {
            break;
        }
        page += 1;
    }

    Ok(FetchNextResponse {
        items,
        new_state: encode_state(&AccountsState {
            last_page: page,
            last_creation_date: watermark,
        })?,
        has_more,
    })
}

fn to_account(account: &Account, created: DateTime<Utc>) -> Result<PspAccount, PluginError> {
    let mut metadata = Metadata::new();
    if !account.customer_id.is_empty() {
        metadata.insert("com.modulr.spec/customer_id".into(), account.customer_id.clone());
    }
    if !account.status.is_empty() {
        metadata.insert("com.modulr.spec/status".into(), account.status.clone());
    }

    Ok(PspAccount {
        reference: account.id.clone(),
        created_at: created,
        name: Some(account.name.clone()),
        default_asset: currency::asset_from_table(SUPPORTED_CURRENCIES, &account.currency),
        metadata,
        raw: to_raw(account)?,
    })
}

pub(super) async fn fetch_balances(
    client: &dyn Client,
    req: FetchNextRequest,
) -> Result<FetchNextBalancesResponse, PluginError> {
    let from: PspAccount = decode_from_payload(req.from_payload())?;

    let account = client
        .get_account(&from.reference)
        .await
        .map_err(|e| PluginError::client("failed to get account", e))?;

    let mut items = Vec::new();
    match currency::precision(SUPPORTED_CURRENCIES, &account.currency) {
        Some(precision) => items.push(PspBalance {
            account_reference: account.id.clone(),
            created_at: Utc::now(),
            amount: currency::amount_from_decimal_str(&account.balance, precision)?,
            asset: currency::format_asset(&account.currency, precision),
        }),
        None => debug!(currency = %account.currency, "skipping balance with unsupported currency"),
    }

    Ok(FetchNextResponse {
        items,
        new_state: Vec::new(),
        has_more: false,
    })
}

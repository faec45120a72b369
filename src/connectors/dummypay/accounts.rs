use chrono::Utc;
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::client::{Account, Client};
use super::SUPPORTED_CURRENCIES;
use crate::connector::{FetchNextAccountsResponse, FetchNextBalancesResponse, FetchNextRequest, FetchNextResponse};
use crate::currency;
use crate::error::PluginError;
use crate::models::{Metadata, PspAccount, PspBalance};
use crate::pagination::{decode_from_payload, decode_state, encode_state, to_raw, validate_page_size};

/// Offset of the next unread record in the accounts file.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct OffsetState {
    #[serde(default)]
    pub next_token: usize,
}

pub(super) async fn fetch_next(
    client: &dyn Client,
    req: FetchNextRequest,
) -> Result<FetchNextAccountsResponse, PluginError> {
    validate_page_size(req.page_size)?;
    let state: OffsetState = decode_state(req.state())?;

    let (page, next) = client
        .fetch_accounts(state.next_token, req.page_size)
        .await
        .map_err(|e| PluginError::client("failed to fetch accounts", e))?;

    let consumed = page.len();
    let items = page.iter().map(to_account).collect::<Result<Vec<_>, _>>()?;

    Ok(FetchNextResponse {
        items,
        new_state: encode_state(&OffsetState {
            next_token: next.unwrap_or(state.next_token + consumed),
        })?,
        has_more: next.is_some(),
    })
}

pub(super) fn to_account(account: &Account) -> Result<PspAccount, PluginError> {
    Ok(PspAccount {
        reference: account.id.clone(),
        created_at: account.opening_date,
        name: Some(account.name.clone()),
        default_asset: currency::asset_from_table(SUPPORTED_CURRENCIES, &account.currency),
        metadata: Metadata::new(),
        raw: to_raw(account)?,
    })
}

/// Balances are per account and carry no state: one call returns them all.
pub(super) async fn fetch_balances(
    client: &dyn Client,
    req: FetchNextRequest,
) -> Result<FetchNextBalancesResponse, PluginError> {
    let account: PspAccount = decode_from_payload(req.from_payload())?;

    let balance = client
        .fetch_balance(&account.reference)
        .await
        .map_err(|e| PluginError::client("failed to fetch balance", e))?;

    let items = match balance {
        None => Vec::new(),
        Some(balance) => match currency::asset_from_table(SUPPORTED_CURRENCIES, &balance.currency) {
            Some(asset) => vec![PspBalance {
                account_reference: balance.account_id,
                created_at: Utc::now(),
                amount: BigInt::from(balance.amount_in_minors),
                asset,
            }],
            None => {
                debug!(currency = %balance.currency, "skipping balance with unsupported currency");
                Vec::new()
            }
        },
    };

    Ok(FetchNextResponse {
        items,
        new_state: Vec::new(),
        has_more: false,
    })
}

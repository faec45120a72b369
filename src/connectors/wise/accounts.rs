use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::client::{Balance, Client};
use super::{asset, profile_from_payload, PROFILE_ID_METADATA};
use crate::connector::{FetchNextAccountsResponse, FetchNextBalancesResponse, FetchNextRequest, FetchNextResponse};
use crate::currency;
use crate::error::PluginError;
use crate::models::{Metadata, PspAccount, PspBalance};
use crate::pagination::{decode_from_payload, decode_state, encode_state, to_raw, validate_page_size};

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AccountsState {
    #[serde(default)]
    pub last_account_id: u64,
}

/// Balances of the parent profile, reported as accounts.
pub(super) async fn fetch_next(
    client: &dyn Client,
    decimals: &HashMap<String, u32>,
    req: FetchNextRequest,
) -> Result<FetchNextAccountsResponse, PluginError> {
    validate_page_size(req.page_size)?;
    let state: AccountsState = decode_state(req.state())?;
    let profile = profile_from_payload(req.from_payload())?;

    let mut balances = client
        .get_balances(profile.id)
        .await
        .map_err(|e| PluginError::client("failed to get balances", e))?;
    balances.retain(|b| b.id > state.last_account_id);
    balances.sort_by_key(|b| b.id);

    let has_more = balances.len() > req.page_size;
    balances.truncate(req.page_size);

    let last_account_id = balances.last().map_or(state.last_account_id, |b| b.id);
    let items = balances
        .iter()
        .map(|b| to_account(b, profile.id, decimals))
        .collect::<Result<Vec<_>, PluginError>>()?;

    Ok(FetchNextResponse {
        items,
        new_state: encode_state(&AccountsState { last_account_id })?,
        has_more,
    })
}

fn to_account(balance: &Balance, profile_id: u64, decimals: &HashMap<String, u32>) -> Result<PspAccount, PluginError> {
    let mut metadata = Metadata::new();
    metadata.insert(PROFILE_ID_METADATA.into(), profile_id.to_string());

    Ok(PspAccount {
        reference: balance.id.to_string(),
        created_at: balance.creation_time,
        name: Some(
            balance
                .name
                .clone()
                .unwrap_or_else(|| format!("{} {}", balance.currency, balance.kind.to_lowercase())),
        ),
        default_asset: asset(decimals, &balance.currency).map(|(asset, _)| asset),
        metadata,
        raw: to_raw(balance)?,
    })
}

pub(super) fn profile_id_of(account: &PspAccount) -> Result<u64, PluginError> {
    account
        .metadata
        .get(PROFILE_ID_METADATA)
        .ok_or_else(|| {
            PluginError::invalid_request(format!("account {} has no profile id metadata", account.reference))
        })?
        .parse()
        .map_err(|_| {
            PluginError::invalid_request(format!("account {} has a non-numeric profile id", account.reference))
        })
}

pub(super) fn balance_id_of(account: &PspAccount) -> Result<u64, PluginError> {
    account
        .reference
        .parse()
        .map_err(|_| PluginError::invalid_request(format!("account reference {:?} is not a wise id", account.reference)))
}

pub(super) fn to_balance(balance: &Balance, decimals: &HashMap<String, u32>) -> Result<Option<PspBalance>, PluginError> {
    let Some((asset, precision)) = asset(decimals, &balance.amount.currency) else {
        debug!(currency = %balance.amount.currency, "skipping balance with unsupported currency");
        return Ok(None);
    };
    Ok(Some(PspBalance {
        account_reference: balance.id.to_string(),
        created_at: balance.modification_time,
        amount: currency::amount_from_decimal_str(&balance.amount.value, precision)?,
        asset,
    }))
}

pub(super) async fn fetch_balances(
    client: &dyn Client,
    decimals: &HashMap<String, u32>,
    req: FetchNextRequest,
) -> Result<FetchNextBalancesResponse, PluginError> {
    let from: PspAccount = decode_from_payload(req.from_payload())?;
    let profile_id = profile_id_of(&from)?;

    let balance = client
        .get_balance(profile_id, balance_id_of(&from)?)
        .await
        .map_err(|e| PluginError::client("failed to get balance", e))?;

    let items = to_balance(&balance, decimals)?
        .map(|mut b| {
            // A balance snapshot is taken now, whatever the vendor says.
            b.created_at = Utc::now();
            b
        })
        .into_iter()
        .collect();

    Ok(FetchNextResponse {
        items,
        new_state: Vec::new(),
        has_more: false,
    })
}

use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::client::{Client, RecipientAccount};
use super::{asset, profile_from_payload, PROFILE_ID_METADATA};
use crate::connector::{FetchNextExternalAccountsResponse, FetchNextRequest, FetchNextResponse};
use crate::error::PluginError;
use crate::models::{Metadata, PspAccount};
use crate::pagination::{decode_state, encode_state, should_fetch_more, to_raw, validate_page_size};

/// Wise's own seek cursor: the position to resume the listing from.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RecipientsState {
    #[serde(default)]
    pub last_seek_position: u64,
}

pub(super) async fn fetch_next(
    client: &dyn Client,
    decimals: &HashMap<String, u32>,
    req: FetchNextRequest,
) -> Result<FetchNextExternalAccountsResponse, PluginError> {
    validate_page_size(req.page_size)?;
    let state: RecipientsState = decode_state(req.state())?;
    let profile = profile_from_payload(req.from_payload())?;

    let mut items: Vec<PspAccount> = Vec::with_capacity(req.page_size);
    let mut seek = state.last_seek_position;
    let mut has_more;

    loop {
        let remaining = req.page_size - items.len();
        let page = client
            .get_recipient_accounts(profile.id, remaining, seek)
            .await
            .map_err(|e| PluginError::client("failed to get recipient accounts", e))?;

        for recipient in &page.content {
            items.push(to_account(recipient, decimals)?);
        }
        if let Some(next) = page.seek_position_for_next {
            seek = next;
        }

        let (need_more, more) = should_fetch_more(&items, &page.content, remaining);
        has_more = more && page.seek_position_for_next.is_some();
        if !need_more || !has_more {
            break;
        }
    }

    Ok(FetchNextResponse {
        items,
        new_state: encode_state(&RecipientsState {
            last_seek_position: seek,
        })?,
        has_more,
    })
}

fn to_account(recipient: &RecipientAccount, decimals: &HashMap<String, u32>) -> Result<PspAccount, PluginError> {
    let mut metadata = Metadata::new();
    metadata.insert(PROFILE_ID_METADATA.into(), recipient.profile.to_string());

    Ok(PspAccount {
        reference: recipient.id.to_string(),
        created_at: Utc::now(),
        name: Some(recipient.name.full_name.clone()),
        default_asset: asset(decimals, &recipient.currency).map(|(asset, _)| asset),
        metadata,
        raw: to_raw(recipient)?,
    })
}

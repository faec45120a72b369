use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::accounts::created_at;
use super::client::{Beneficiary, Client};
use crate::connector::{FetchNextExternalAccountsResponse, FetchNextRequest, FetchNextResponse};
use crate::error::PluginError;
use crate::models::{Metadata, PspAccount};
use crate::pagination::{decode_state, encode_state, should_fetch_more, to_raw, validate_page_size};

/// Beneficiaries often share a creation second, so the watermark pairs the
/// timestamp with the id to order ties.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct BeneficiariesState {
    #[serde(default)]
    pub last_page: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_id: String,
}

impl BeneficiariesState {
    fn already_seen(&self, created: DateTime<Utc>, id: &str) -> bool {
        match self.last_created_at {
            None => false,
            Some(last) => (created, id) <= (last, self.last_id.as_str()),
        }
    }
}

pub(super) async fn fetch_next(
    client: &dyn Client,
    req: FetchNextRequest,
) -> Result<FetchNextExternalAccountsResponse, PluginError> {
    validate_page_size(req.page_size)?;
    let state: BeneficiariesState = decode_state(req.state())?;

    let mut items: Vec<PspAccount> = Vec::with_capacity(req.page_size);
    let mut new_state = state.clone();
    let mut has_more;

    loop {
        let batch = client
            .get_beneficiaries(new_state.last_page, req.page_size)
            .await
            .map_err(|e| PluginError::client("failed to get beneficiaries", e))?;

        let mut unconsumed = false;
        for beneficiary in &batch {
            let created = created_at(&beneficiary.created, "beneficiary")?;
            if state.already_seen(created, &beneficiary.id) {
                continue;
            }
            if items.len() >= req.page_size {
                unconsumed = true;
                break;
            }
            new_state.last_created_at = Some(created);
            new_state.last_id = beneficiary.id.clone();
            items.push(to_external_account(beneficiary, created)?);
        }

        let (need_more, more) = should_fetch_more(&items, &batch, req.page_size);
        has_more = more || unconsumed;
        if !need_more {
            break;
        }
        new_state.last_page += 1;
    }

    Ok(FetchNextResponse {
        items,
        new_state: encode_state(&new_state)?,
        has_more,
    })
}

fn to_external_account(beneficiary: &Beneficiary, created: DateTime<Utc>) -> Result<PspAccount, PluginError> {
    Ok(PspAccount {
        reference: beneficiary.id.clone(),
        created_at: created,
        name: Some(beneficiary.name.clone()),
        default_asset: None,
        metadata: Metadata::new(),
        raw: to_raw(beneficiary)?,
    })
}

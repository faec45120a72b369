use serde::{Deserialize, Serialize};

use super::client::Client;
use crate::connector::{FetchNextOthersRequest, FetchNextOthersResponse, FetchNextResponse};
use crate::error::PluginError;
use crate::models::PspOther;
use crate::pagination::{decode_state, encode_state, to_raw, validate_page_size};

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ProfilesState {
    #[serde(default)]
    pub last_profile_id: u64,
}

/// Wise returns every profile in one response, so the page is cut locally.
pub(super) async fn fetch_next(
    client: &dyn Client,
    req: FetchNextOthersRequest,
) -> Result<FetchNextOthersResponse, PluginError> {
    validate_page_size(req.page_size)?;
    let state: ProfilesState = decode_state(req.state.as_deref())?;

    let mut profiles = client
        .get_profiles()
        .await
        .map_err(|e| PluginError::client("failed to get profiles", e))?;
    profiles.retain(|p| p.id > state.last_profile_id);
    profiles.sort_by_key(|p| p.id);

    let has_more = profiles.len() > req.page_size;
    profiles.truncate(req.page_size);

    let last_profile_id = profiles.last().map_or(state.last_profile_id, |p| p.id);
    let items = profiles
        .iter()
        .map(|p| {
            Ok(PspOther {
                id: p.id.to_string(),
                other: to_raw(p)?,
            })
        })
        .collect::<Result<Vec<_>, PluginError>>()?;

    Ok(FetchNextResponse {
        items,
        new_state: encode_state(&ProfilesState { last_profile_id })?,
        has_more,
    })
}

#[cfg(test)]
mod tests {
    use super::super::testing::{profile, FakeClient};
    use super::*;

    fn req(state: Option<Vec<u8>>, page_size: usize) -> FetchNextOthersRequest {
        FetchNextOthersRequest {
            name: super::super::FETCH_PROFILES.into(),
            state,
            page_size,
            from_payload: None,
        }
    }

    #[tokio::test]
    async fn test_profiles_paged_by_last_id() {
        let client = FakeClient {
            profiles: vec![profile(3), profile(1), profile(2)],
            ..Default::default()
        };

        let first = fetch_next(&client, req(None, 2)).await.unwrap();
        let ids: Vec<&str> = first.items.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert!(first.has_more);

        let second = fetch_next(&client, req(Some(first.new_state), 2)).await.unwrap();
        assert_eq!(second.items.len(), 1);
        assert_eq!(second.items[0].other["id"], 3);
        assert!(!second.has_more);

        let third = fetch_next(&client, req(Some(second.new_state.clone()), 2)).await.unwrap();
        assert!(third.items.is_empty());
        assert_eq!(third.new_state, second.new_state);
    }

    #[tokio::test]
    async fn test_exact_page_has_no_more() {
        let client = FakeClient {
            profiles: vec![profile(1), profile(2)],
            ..Default::default()
        };
        let resp = fetch_next(&client, req(None, 2)).await.unwrap();
        assert_eq!(resp.items.len(), 2);
        assert!(!resp.has_more);
    }
}

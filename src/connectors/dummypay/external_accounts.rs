use super::accounts::{to_account, OffsetState};
use super::client::Client;
use crate::connector::{FetchNextExternalAccountsResponse, FetchNextRequest, FetchNextResponse};
use crate::error::PluginError;
use crate::pagination::{decode_state, encode_state, validate_page_size};

pub(super) async fn fetch_next(
    client: &dyn Client,
    req: FetchNextRequest,
) -> Result<FetchNextExternalAccountsResponse, PluginError> {
    validate_page_size(req.page_size)?;
    let state: OffsetState = decode_state(req.state())?;

    let (page, next) = client
        .fetch_external_accounts(state.next_token, req.page_size)
        .await
        .map_err(|e| PluginError::client("failed to fetch external accounts", e))?;

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

#[cfg(test)]
mod tests {
    use super::super::client::{Account, FileClient, EXTERNAL_ACCOUNTS_FILE};
    use super::*;
    use crate::error::ErrorKind;

    #[tokio::test]
    async fn test_resumes_after_last_offset() {
        let dir = tempfile::tempdir().unwrap();
        let accounts: Vec<Account> = (0..3)
            .map(|i| Account {
                id: format!("ext-{i}"),
                name: format!("beneficiary {i}"),
                currency: "USD".into(),
                opening_date: "2024-03-01T10:00:00Z".parse().unwrap(),
            })
            .collect();
        tokio::fs::write(
            dir.path().join(EXTERNAL_ACCOUNTS_FILE),
            serde_json::to_vec(&accounts).unwrap(),
        )
        .await
        .unwrap();
        let client = FileClient::new(dir.path());

        let first = fetch_next(
            &client,
            FetchNextRequest {
                page_size: 2,
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(first.items.len(), 2);
        assert!(first.has_more);

        let second = fetch_next(
            &client,
            FetchNextRequest {
                state: Some(first.new_state),
                page_size: 2,
                from_payload: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(second.items.len(), 1);
        assert_eq!(second.items[0].reference, "ext-2");
        assert_eq!(second.items[0].default_asset.as_deref(), Some("USD/2"));
        assert!(!second.has_more);

        // Re-polling from the final state returns nothing new.
        let third = fetch_next(
            &client,
            FetchNextRequest {
                state: Some(second.new_state),
                page_size: 2,
                from_payload: None,
            },
        )
        .await
        .unwrap();
        assert!(third.items.is_empty());
    }

    #[tokio::test]
    async fn test_zero_page_size() {
        let dir = tempfile::tempdir().unwrap();
        let client = FileClient::new(dir.path());
        let err = fetch_next(&client, FetchNextRequest::default()).await.unwrap_err();
        assert!(err.is(ErrorKind::InvalidRequest));
    }
}

//! Incremental pagination protocol shared by every `fetch_next_*` operation.
//!
//! A fetch decodes the caller's opaque state, pulls vendor pages until the
//! requested quota is filled or the vendor runs dry, truncates to the page
//! size, derives the new watermark from the last kept item and hands back the
//! re-encoded state. Nothing is persisted on error, so a failed call can be
//! retried with the same state.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{ErrorKind, PluginError};

/// Decide whether to pull another vendor page.
///
/// Returns `(need_more, has_more)`:
/// - a short last page means the vendor is exhausted: `(false, false)`;
/// - a filled quota means stop and report more: `(false, true)`;
/// - otherwise keep pulling: `(true, true)`.
pub fn should_fetch_more<T, V>(accumulated: &[T], last_page: &[V], page_size: usize) -> (bool, bool) {
    if last_page.len() < page_size {
        return (false, false);
    }
    if accumulated.len() >= page_size {
        return (false, true);
    }
    (true, true)
}

/// Reject page sizes the loop cannot make progress with.
pub fn validate_page_size(page_size: usize) -> Result<(), PluginError> {
    if page_size == 0 {
        return Err(PluginError::invalid_request("page size must be positive"));
    }
    Ok(())
}

/// Decode a state blob. Absent or empty state is the zero-value state.
pub fn decode_state<S: DeserializeOwned + Default>(state: Option<&[u8]>) -> Result<S, PluginError> {
    match state {
        None => Ok(S::default()),
        Some(raw) if raw.is_empty() => Ok(S::default()),
        Some(raw) => serde_json::from_slice(raw).map_err(|source| PluginError::Decode {
            what: "state",
            source,
        }),
    }
}

pub fn encode_state<S: Serialize>(state: &S) -> Result<Vec<u8>, PluginError> {
    serde_json::to_vec(state).map_err(|source| PluginError::Encode {
        what: "state",
        source,
    })
}

/// Decode the parent item a child task was spawned from.
pub fn decode_from_payload<T: DeserializeOwned>(payload: Option<&[u8]>) -> Result<T, PluginError> {
    let raw = match payload {
        Some(raw) if !raw.is_empty() => raw,
        _ => return Err(ErrorKind::MissingFromPayload.into()),
    };
    serde_json::from_slice(raw).map_err(|source| PluginError::Decode {
        what: "from payload",
        source,
    })
}

/// Serialize a vendor record into the `raw` field of a canonical entity.
pub fn to_raw<T: Serialize>(record: &T) -> Result<serde_json::Value, PluginError> {
    serde_json::to_value(record).map_err(|source| PluginError::Encode {
        what: "raw payload",
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct State {
        last_id: u64,
    }

    #[test]
    fn test_should_fetch_more_short_page_is_exhausted() {
        assert_eq!(should_fetch_more(&[0; 5], &[0; 5], 10), (false, false));
    }

    #[test]
    fn test_should_fetch_more_quota_reached() {
        assert_eq!(should_fetch_more(&[0; 10], &[0; 10], 10), (false, true));
        assert_eq!(should_fetch_more(&[0; 12], &[0; 10], 10), (false, true));
    }

    #[test]
    fn test_should_fetch_more_full_page_of_duplicates() {
        assert_eq!(should_fetch_more(&[0; 3], &[0; 10], 10), (true, true));
    }

    #[test]
    fn test_should_fetch_more_short_page_wins_over_quota() {
        assert_eq!(should_fetch_more(&[0; 10], &[0; 4], 10), (false, false));
    }

    #[test]
    fn test_state_codec() {
        assert_eq!(decode_state::<State>(None).unwrap(), State::default());
        assert_eq!(decode_state::<State>(Some(b"")).unwrap(), State::default());

        let raw = encode_state(&State { last_id: 7 }).unwrap();
        assert_eq!(decode_state::<State>(Some(&raw)).unwrap(), State { last_id: 7 });

        let err = decode_state::<State>(Some(b"{not json")).unwrap_err();
        assert!(err.to_string().starts_with("failed to decode state"));
    }

    #[test]
    fn test_from_payload_required() {
        let err = decode_from_payload::<State>(None).unwrap_err();
        assert!(err.is(ErrorKind::MissingFromPayload));
        let err = decode_from_payload::<State>(Some(b"")).unwrap_err();
        assert!(err.is(ErrorKind::MissingFromPayload));
        let parent: State = decode_from_payload(Some(br#"{"last_id":3}"#)).unwrap();
        assert_eq!(parent.last_id, 3);
    }

    #[test]
    fn test_zero_page_size_rejected() {
        assert!(validate_page_size(0).unwrap_err().is(ErrorKind::InvalidRequest));
        assert!(validate_page_size(1).is_ok());
    }
}

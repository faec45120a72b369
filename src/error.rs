//! Plugin error types.
//!
//! Every plugin operation returns [`PluginError`]. Callers match on the stable
//! [`ErrorKind`] sentinel with [`PluginError::is`], while the message keeps the
//! full human-readable cause chain.

use std::error::Error as StdError;

use thiserror::Error;

use crate::http::ClientError;

/// Boxed error used as the cause of wrapped errors.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Stable error categories callers can match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ErrorKind {
    #[error("not yet installed")]
    NotYetInstalled,

    #[error("not implemented")]
    NotImplemented,

    #[error("invalid config")]
    InvalidConfig,

    #[error("invalid request")]
    InvalidRequest,

    #[error("missing from payload in request")]
    MissingFromPayload,

    #[error("currency not supported")]
    CurrencyNotSupported,

    #[error("webhook verification error")]
    WebhookVerification,

    #[error("validation error")]
    Validation,

    #[error("plugin not found")]
    PluginNotFound,

    #[error("plugin already registered")]
    PluginAlreadyRegistered,
}

/// Error returned by plugin operations.
#[derive(Debug, Error)]
pub enum PluginError {
    /// A bare sentinel with no further context.
    #[error(transparent)]
    Kind(#[from] ErrorKind),

    /// A cause tagged with a sentinel, displayed as `"{cause}: {kind}"`.
    #[error("{cause}: {kind}")]
    Wrapped {
        kind: ErrorKind,
        #[source]
        cause: BoxError,
    },

    /// Vendor client failure with the operation that triggered it.
    #[error("{context}: {source}")]
    Client {
        context: String,
        #[source]
        source: ClientError,
    },

    /// A state blob or payload could not be decoded.
    #[error("failed to decode {what}: {source}")]
    Decode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// A state blob or raw payload could not be encoded.
    #[error("failed to encode {what}: {source}")]
    Encode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// A vendor record could not be mapped onto the canonical model.
    #[error("failed to translate {what}: {reason}")]
    Translation { what: String, reason: String },
}

impl PluginError {
    /// Tag `cause` with the sentinel `kind`.
    pub fn wrap(cause: impl Into<BoxError>, kind: ErrorKind) -> Self {
        Self::Wrapped {
            kind,
            cause: cause.into(),
        }
    }

    pub fn not_implemented() -> Self {
        Self::Kind(ErrorKind::NotImplemented)
    }

    pub fn not_yet_installed() -> Self {
        Self::Kind(ErrorKind::NotYetInstalled)
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::wrap(msg.into(), ErrorKind::InvalidRequest)
    }

    pub fn client(context: impl Into<String>, source: ClientError) -> Self {
        Self::Client {
            context: context.into(),
            source,
        }
    }

    pub fn translation(what: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Translation {
            what: what.into(),
            reason: reason.into(),
        }
    }

    /// The sentinel attached directly to this error, if any.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Kind(kind) | Self::Wrapped { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Whether `kind` appears anywhere in this error's cause chain.
    pub fn is(&self, kind: ErrorKind) -> bool {
        let mut current: Option<&(dyn StdError + 'static)> = Some(self);
        while let Some(err) = current {
            if let Some(plugin_err) = err.downcast_ref::<PluginError>() {
                if plugin_err.kind() == Some(kind) {
                    return true;
                }
            }
            if err.downcast_ref::<ErrorKind>() == Some(&kind) {
                return true;
            }
            current = err.source();
        }
        false
    }

    /// The innermost error of the cause chain.
    pub fn root_cause(&self) -> &(dyn StdError + 'static) {
        let mut current: &(dyn StdError + 'static) = self;
        while let Some(next) = current.source() {
            current = next;
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapped_message_and_kind() {
        let err = PluginError::wrap("missing apiKey", ErrorKind::InvalidConfig);
        assert_eq!(err.to_string(), "missing apiKey: invalid config");
        assert_eq!(err.kind(), Some(ErrorKind::InvalidConfig));
        assert!(err.is(ErrorKind::InvalidConfig));
        assert!(!err.is(ErrorKind::InvalidRequest));
    }

    #[test]
    fn test_is_walks_nested_wrapping() {
        let inner = PluginError::wrap("unknown currency XYZ", ErrorKind::CurrencyNotSupported);
        let outer = PluginError::wrap(inner, ErrorKind::InvalidRequest);
        assert!(outer.is(ErrorKind::InvalidRequest));
        assert!(outer.is(ErrorKind::CurrencyNotSupported));
        assert_eq!(outer.root_cause().to_string(), "unknown currency XYZ");
    }

    #[test]
    fn test_sentinel_display() {
        assert_eq!(PluginError::not_yet_installed().to_string(), "not yet installed");
        assert_eq!(
            PluginError::from(ErrorKind::MissingFromPayload).to_string(),
            "missing from payload in request"
        );
    }

    #[test]
    fn test_client_error_context() {
        let err = PluginError::client(
            "failed to get accounts",
            ClientError::Status {
                status: 500,
                body: "boom".into(),
            },
        );
        assert_eq!(err.to_string(), "failed to get accounts: unexpected status 500: boom");
        assert_eq!(err.kind(), None);
    }
}

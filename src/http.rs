//! Thin JSON-over-HTTP helper shared by the vendor clients.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::crypto;

/// Per-request timeout applied to every vendor client.
pub const DEFAULT_CLIENT_TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT: &str = concat!("psp-connectors/", env!("CARGO_PKG_VERSION"));

/// Errors raised by vendor clients.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to build client: {0}")]
    Init(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not found: {0}")]
    NotFound(String),
}

/// How requests authenticate against the vendor.
#[derive(Debug, Clone)]
pub enum Auth {
    None,
    Bearer(String),
    Header { name: &'static str, value: String },
    /// Keyed HMAC-SHA256 over a fresh `Date` and nonce on every request.
    HmacSignature { key_id: String, secret: String },
}

pub const NONCE_HEADER: &str = "x-mod-nonce";

/// The `Date`, nonce and `Authorization` headers of a signed request.
///
/// The signed string is `date: <Date>\nx-mod-nonce: <nonce>`, and the base64
/// signature is form-urlencoded inside the `Authorization` value.
pub fn signature_headers(
    key_id: &str,
    secret: &str,
    date: DateTime<Utc>,
    nonce: &str,
) -> [(&'static str, String); 3] {
    let date = date.format("%a, %d %b %Y %H:%M:%S GMT").to_string();
    let signed = format!("date: {date}\n{NONCE_HEADER}: {nonce}");
    let signature = crypto::sign_base64(secret.as_bytes(), signed.as_bytes());
    let signature: String = url::form_urlencoded::byte_serialize(signature.as_bytes()).collect();

    [
        ("Date", date),
        (NONCE_HEADER, nonce.to_string()),
        (
            "Authorization",
            format!(
                r#"Signature keyId="{key_id}",algorithm="hmac-sha256",headers="date {NONCE_HEADER}",signature="{signature}""#
            ),
        ),
    ]
}

fn nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

/// A reqwest client bound to one vendor base URL.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
    base_url: String,
    auth: Auth,
}

impl HttpClient {
    pub fn new(base_url: impl Into<String>, auth: Auth) -> Result<Self, ClientError> {
        let inner = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(DEFAULT_CLIENT_TIMEOUT)
            .build()
            .map_err(|e| ClientError::Init(e.to_string()))?;

        Ok(Self {
            inner,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            Auth::None => request,
            Auth::Bearer(token) => request.bearer_auth(token),
            Auth::Header { name, value } => request.header(*name, value),
            Auth::HmacSignature { key_id, secret } => signature_headers(key_id, secret, Utc::now(), &nonce())
                .into_iter()
                .fold(request, |request, (name, value)| request.header(name, value)),
        }
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ClientError> {
        let request = self.authorize(self.inner.get(self.url(path)).query(query));
        self.send(request).await
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let request = self.authorize(self.inner.post(self.url(path)).json(body));
        self.send(request).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), ClientError> {
        let request = self.authorize(self.inner.delete(self.url(path)));
        let response = request.send().await?;
        check_status(response).await.map(|_| ())
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = request.send().await?;
        let body = check_status(response).await?;
        Ok(serde_json::from_str(&body)?)
    }
}

async fn check_status(response: reqwest::Response) -> Result<String, ClientError> {
    let status = response.status();
    let body = response.text().await?;
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(ClientError::NotFound(body));
    }
    if !status.is_success() {
        return Err(ClientError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}

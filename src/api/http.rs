//! HTTP helpers for the application's own service endpoints.
//!
//! Two calls exist: `POST /session` with no body and `POST /verify` with a
//! token. Both return whatever typed payload the caller asks for.

use std::error::Error as StdError;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::utils::url::construct_api_url;

/// Errors from the session/verify HTTP surface.
#[derive(Debug)]
pub enum ApiError {
    /// The request could not be sent or returned a non-success status.
    Request {
        url: String,
        source: reqwest::Error,
    },

    /// The response body could not be decoded into the requested type.
    Decode {
        url: String,
        source: reqwest::Error,
    },
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Request { url, source } => {
                write!(f, "request to {} failed: {}", url, source)
            }
            ApiError::Decode { url, source } => {
                write!(f, "failed to decode response from {}: {}", url, source)
            }
        }
    }
}

impl StdError for ApiError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ApiError::Request { source, .. } => Some(source),
            ApiError::Decode { source, .. } => Some(source),
        }
    }
}

#[derive(Serialize)]
struct VerifyRequest<'a> {
    token: &'a str,
}

/// Client for the application service backing the chat UI.
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Use an existing `reqwest::Client` (shared connection pool).
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// `POST /session`, no body.
    pub async fn fetch_session<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        self.post("session", None::<&()>).await
    }

    /// `POST /verify` with `{ "token": ... }`.
    pub async fn fetch_verify<T: DeserializeOwned>(&self, token: &str) -> Result<T, ApiError> {
        self.post("verify", Some(&VerifyRequest { token })).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        endpoint: &str,
        body: Option<&B>,
    ) -> Result<T, ApiError> {
        let url = construct_api_url(&self.base_url, endpoint);
        let mut request = self.client.post(&url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|source| ApiError::Request {
                url: url.clone(),
                source,
            })?;

        response
            .json::<T>()
            .await
            .map_err(|source| ApiError::Decode { url, source })
    }
}

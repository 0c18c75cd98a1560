//! Map HTTP responses from the store API onto the authorization store error kinds.
use anyhow::Result;
use reqwest::Response;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use authsync_fga::errors::StoreUnavailable;
use authsync_fga::errors::Unauthorized;

/// The store rejected the request as invalid.
#[derive(Debug, thiserror::Error)]
#[error("the store rejected the request as invalid: {response}")]
pub struct BadRequest {
    pub response: String,
}

/// Invalid API response received.
#[derive(Debug, thiserror::Error)]
#[error("invalid API response received: {response}")]
pub struct InvalidResponse {
    pub response: String,
}

/// The requested resource was not found in the store.
#[derive(Debug, thiserror::Error)]
#[error("the requested resource was not found in the store")]
pub struct ResourceNotFound;

/// Unexpected HTTP status code returned by the store.
#[derive(Debug, thiserror::Error)]
#[error("unexpected HTTP status code {code} returned by the store: {response}")]
pub struct UnexpectedStatus {
    pub code: u16,
    pub response: String,
}

/// Decode the body of an HTTP response and classify errors in the process.
///
/// - 400 responses are returned as [`BadRequest`] for callers to attach a specific kind.
/// - 401 and 403 responses are [`Unauthorized`].
/// - 404 responses are returned as [`ResourceNotFound`].
/// - 5xx responses (and 429) are [`StoreUnavailable`].
pub async fn inspect<T>(response: Response) -> Result<T>
where
    T: DeserializeOwned,
{
    let code = response.status();
    let text = response.text().await.map_err(transport)?;

    match code {
        StatusCode::BAD_REQUEST => anyhow::bail!(BadRequest { response: text }),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => anyhow::bail!(Unauthorized),
        StatusCode::NOT_FOUND => anyhow::bail!(ResourceNotFound),
        StatusCode::TOO_MANY_REQUESTS => anyhow::bail!(StoreUnavailable),
        code if code.is_server_error() => {
            let error = UnexpectedStatus {
                code: code.as_u16(),
                response: text,
            };
            return Err(anyhow::anyhow!(error).context(StoreUnavailable));
        }
        code if !code.is_success() => anyhow::bail!(UnexpectedStatus {
            code: code.as_u16(),
            response: text,
        }),
        _ => (),
    }

    // Empty bodies decode as an empty object for responses that carry no data.
    let body = if text.is_empty() { "{}" } else { text.as_str() };
    serde_json::from_str::<T>(body).map_err(|error| {
        let decode = InvalidResponse { response: text };
        anyhow::anyhow!(error).context(decode)
    })
}

/// Classify errors sending requests or receiving responses as the store being unavailable.
pub fn transport(error: reqwest::Error) -> anyhow::Error {
    anyhow::anyhow!(error).context(StoreUnavailable)
}

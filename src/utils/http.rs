//! Shared HTTP client
//!
//! One lazily-built async client with connection pooling and sane
//! timeouts; every provider call in the crate goes through it. Request
//! timeouts bound a single round trip only; end-to-end deadlines are
//! the caller's.

use crate::error::{OmnisigError, OmnisigResult};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::sync::OnceLock;
use std::time::Duration;

static CLIENT: OnceLock<Client> = OnceLock::new();

/// Get the shared HTTP client
pub fn client() -> &'static Client {
    CLIENT.get_or_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(5)
            .tcp_keepalive(Duration::from_secs(60))
            .tcp_nodelay(true)
            .user_agent(concat!("omnisig/", env!("CARGO_PKG_VERSION")))
            .build()
            // Only fails when TLS backend initialization is broken at
            // the system level; nothing in the crate can run without it
            .expect("HTTP client initialization failed")
    })
}

/// GET a JSON document
pub async fn get_json<T: DeserializeOwned>(url: &str) -> OmnisigResult<T> {
    let response = client().get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(
            OmnisigError::provider_unreachable(format!("GET {} returned {}", url, status))
                .with_details(body),
        );
    }
    response
        .json::<T>()
        .await
        .map_err(|e| OmnisigError::protocol_invariant("Unexpected response shape").with_details(e.to_string()))
}

/// GET a plain-text document
pub async fn get_text(url: &str) -> OmnisigResult<String> {
    let response = client().get(url).send().await?;
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    if !status.is_success() {
        return Err(
            OmnisigError::provider_unreachable(format!("GET {} returned {}", url, status))
                .with_details(body),
        );
    }
    Ok(body)
}

/// POST a JSON body, expect a JSON reply
pub async fn post_json<B: serde::Serialize, T: DeserializeOwned>(
    url: &str,
    body: &B,
) -> OmnisigResult<T> {
    let response = client().post(url).json(body).send().await?;
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(
            OmnisigError::provider_unreachable(format!("POST {} returned {}", url, status))
                .with_details(text),
        );
    }
    response
        .json::<T>()
        .await
        .map_err(|e| OmnisigError::protocol_invariant("Unexpected response shape").with_details(e.to_string()))
}

/// POST a raw text body (Bitcoin providers take hex this way)
pub async fn post_text(url: &str, body: String) -> OmnisigResult<(reqwest::StatusCode, String)> {
    let response = client()
        .post(url)
        .header("Content-Type", "text/plain")
        .body(body)
        .send()
        .await?;
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    Ok((status, text))
}

/// POST a JSON body, expect a plain-text reply
pub async fn post_json_text<B: serde::Serialize>(url: &str, body: &B) -> OmnisigResult<String> {
    let response = client().post(url).json(body).send().await?;
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    if !status.is_success() {
        return Err(
            OmnisigError::provider_unreachable(format!("POST {} returned {}", url, status))
                .with_details(text),
        );
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_is_shared() {
        let a = client() as *const Client;
        let b = client() as *const Client;
        assert_eq!(a, b);
    }

    #[test]
    fn test_request_builder_works() {
        assert!(client().get("https://example.com").build().is_ok());
    }
}

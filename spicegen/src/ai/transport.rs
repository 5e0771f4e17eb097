use std::time::Duration;

use reqwest::{RequestBuilder, Response};
use tokio::time::sleep;

use crate::ai::provider::BackendError;

pub(crate) const MAX_RETRIES: u32 = 3;
pub(crate) const INITIAL_RETRY_DELAY_MS: u64 = 1000;
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Build a client with the request timeout applied.
pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Send a request, retrying connection failures and HTTP 429 with
/// exponential backoff. Returns the first successful response.
///
/// This is the backend's own transport policy. Callers above the backend
/// never see these retries.
pub(crate) async fn send_with_retry<F>(build: F) -> Result<Response, BackendError>
where
    F: Fn() -> RequestBuilder,
{
    let mut retry_count = 0;
    let mut delay_ms = INITIAL_RETRY_DELAY_MS;

    loop {
        match build().send().await {
            Ok(resp) => {
                let status = resp.status();

                if status.is_success() {
                    return Ok(resp);
                } else if status.as_u16() == 429 {
                    let retry_after = resp
                        .headers()
                        .get("retry-after")
                        .and_then(|h| h.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(delay_ms / 1000);

                    if retry_count < MAX_RETRIES {
                        retry_count += 1;
                        tracing::warn!(
                            "Rate limited. Retrying after {} seconds (attempt {}/{})",
                            retry_after,
                            retry_count,
                            MAX_RETRIES
                        );
                        sleep(Duration::from_secs(retry_after)).await;
                        delay_ms *= 2;
                        continue;
                    }
                    return Err(BackendError::RateLimited { retry_after });
                } else {
                    let error_text = resp
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown error".to_string());

                    return Err(BackendError::ApiError {
                        status: status.as_u16(),
                        message: error_text,
                    });
                }
            }
            Err(e) => {
                if retry_count < MAX_RETRIES && (e.is_connect() || e.is_timeout()) {
                    retry_count += 1;
                    tracing::warn!(
                        "Request failed: {}. Retrying in {}ms (attempt {}/{})",
                        e,
                        delay_ms,
                        retry_count,
                        MAX_RETRIES
                    );
                    sleep(Duration::from_millis(delay_ms)).await;
                    delay_ms *= 2;
                    continue;
                }
                return Err(BackendError::RequestFailed(e));
            }
        }
    }
}

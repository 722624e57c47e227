use crate::prelude::*;
use crate::Result;
use async_trait::async_trait;
use reqwest_middleware::RequestBuilder;
use reqwest_retry::policies::ExponentialBackoff;
use reqwest_retry::RetryTransientMiddleware;
use std::time::{Duration, Instant};
use task_local_extensions::Extensions;

pub type Client = reqwest_middleware::ClientWithMiddleware;

/// Timeout for a single HTTP request attempt. Retries get their own timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub(crate) fn default_retry_policy() -> ExponentialBackoff {
    // Retry with exponentially increasing intervals between attempts.
    ExponentialBackoff::builder()
        .backoff_exponent(2)
        .retry_bounds(Duration::from_millis(100), Duration::from_secs(2))
        .build_with_total_retry_duration(Duration::from_secs(10))
}

pub(crate) fn create_client() -> Result<Client> {
    let client = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .fatal_ctx(|| "Failed to build the HTTP client")?;

    let client = reqwest_middleware::ClientBuilder::new(client)
        .with(OutermostObservingMiddleware)
        .with(RetryTransientMiddleware::new_with_policy(
            default_retry_policy(),
        ))
        .with(InnermostObservingMiddleware)
        .with_init(|request_builder: RequestBuilder| {
            request_builder.header(
                "User-Agent",
                concat!("vi-tg/", env!("CARGO_PKG_VERSION")),
            )
        })
        .build();

    Ok(client)
}

struct OutermostObservingMiddleware;

#[async_trait]
impl reqwest_middleware::Middleware for OutermostObservingMiddleware {
    async fn handle(
        &self,
        request: reqwest::Request,
        extensions: &mut Extensions,
        next: reqwest_middleware::Next<'_>,
    ) -> reqwest_middleware::Result<reqwest::Response> {
        let span = info_span!(
            "request",
            method = %request.method(),
            host = request.url().host_str().unwrap_or("{unknown}"),
        );
        measure_request(
            "vitg_http_request_effective_duration_seconds",
            request,
            extensions,
            next,
        )
        .instrument(span)
        .await
    }
}

struct InnermostObservingMiddleware;

#[async_trait]
impl reqwest_middleware::Middleware for InnermostObservingMiddleware {
    async fn handle(
        &self,
        request: reqwest::Request,
        extensions: &mut Extensions,
        next: reqwest_middleware::Next<'_>,
    ) -> reqwest_middleware::Result<reqwest::Response> {
        let start = Instant::now();
        let result = measure_request(
            "vitg_http_request_duration_seconds",
            request,
            extensions,
            next,
        )
        .await;

        let duration = tracing_duration(start.elapsed());

        let response = match &result {
            Ok(response) => response,
            Err(err) => {
                error!(duration, err = tracing_err(err), "Network request failed");
                return result;
            }
        };

        let status = response.status();

        let Err(err) = response.error_for_status_ref() else {
            debug!(duration, %status, "Network request succeeded");
            return result;
        };

        warn!(
            err = tracing_err(&err),
            duration,
            %status,
            "Network request failed (error status)"
        );

        result
    }
}

async fn measure_request(
    histogram: &'static str,
    request: reqwest::Request,
    extensions: &mut Extensions,
    next: reqwest_middleware::Next<'_>,
) -> reqwest_middleware::Result<reqwest::Response> {
    let method = request.method().to_string();
    let host = request.url().host_str().unwrap_or("{unknown}").to_owned();

    let start = Instant::now();
    let result = next.run(request, extensions).await;
    let elapsed = start.elapsed();

    let status = match &result {
        Ok(response) => response.status().as_u16().to_string(),
        Err(_) => "{fatal}".to_owned(),
    };

    metrics::histogram!(
        histogram,
        elapsed,
        "method" => method,
        "host" => host,
        "status" => status
    );

    result
}

/// Errors at the layer of the HTTP API
#[derive(Debug, thiserror::Error)]
pub(crate) enum HttpClientError {
    #[error("HTTP request failed")]
    Request { source: reqwest_middleware::Error },

    #[error("Failed to read HTTP response")]
    ReadPayload { source: reqwest::Error },
}

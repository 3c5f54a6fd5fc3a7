use std::time::Duration;
use async_trait::async_trait;
use log::{error, warn};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::StatusCode;
pub use reqwest::Method;
use serde_json::Value;
use tokio::time::sleep;
use error::{ApiError, Error, Result};
use crate::constants::{API_URL, USER_AGENT};

/// Options attached to one outbound request.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub body: Option<Value>,
    pub query: Vec<(String, String)>,
    /// Audit-log reason forwarded as a header.
    pub reason: Option<String>,
}

impl RequestOptions {
    pub fn with_body(body: Value) -> Self {
        Self { body: Some(body), ..Self::default() }
    }

    pub fn with_reason(mut self, reason: Option<String>) -> Self {
        self.reason = reason;
        self
    }
}

/// The outbound request capability the engine depends on.
///
/// Retry, backoff and rate limiting are this collaborator's concern; the
/// engine only consumes the resolved payload or propagates the rejection
/// unchanged.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(&self, method: Method, route: &str, options: RequestOptions) -> Result<Value>;
}

#[derive(Clone)]
pub struct RestConfiguration {
    pub retry_limit: u64,
    pub connect_timeout: Duration,
}

impl Default for RestConfiguration {
    fn default() -> Self {
        Self {
            retry_limit: 5,
            connect_timeout: Duration::from_secs(5),
        }
    }
}

/// Default `Transport` over the platform REST API.
pub struct Rest {
    configuration: RestConfiguration,
    rest: reqwest::Client,
    base_url: String,
}

impl Rest {
    pub fn new(token: &str, configuration: RestConfiguration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(header::USER_AGENT, HeaderValue::from_static(USER_AGENT));
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bot {token}"))
                .map_err(|err| Error::Api(ApiError::RequestError(err.to_string())))?
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        let rest = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(configuration.connect_timeout)
            .build()
            .map_err(|err| Error::Api(ApiError::RequestError(err.to_string())))?;

        Ok(Self { configuration, rest, base_url: API_URL.to_string() })
    }

    fn build_request(&self, method: &Method, route: &str, options: &RequestOptions) -> reqwest::RequestBuilder {
        let mut request = self.rest.request(method.clone(), format!("{}{}", self.base_url, route));

        if !options.query.is_empty() {
            request = request.query(&options.query);
        }
        if let Some(body) = &options.body {
            request = request.json(body);
        }
        if let Some(reason) = &options.reason {
            if let Ok(value) = HeaderValue::from_str(reason) {
                request = request.header("X-Audit-Log-Reason", value);
            }
        }

        request
    }
}

#[async_trait]
impl Transport for Rest {
    async fn request(&self, method: Method, route: &str, options: RequestOptions) -> Result<Value> {
        let mut retries = 0;

        while retries < self.configuration.retry_limit {
            let res = match self.build_request(&method, route, &options).send().await {
                Ok(res) => res,
                Err(err) => return Err(Error::Api(ApiError::RequestError(err.to_string())))
            };

            let status = res.status();

            if status.is_success() {
                if status == StatusCode::NO_CONTENT {
                    return Ok(Value::Null);
                }

                let bytes = match res.bytes().await {
                    Ok(bytes) => bytes,
                    Err(err) => return Err(Error::Api(ApiError::NoResponse(err.to_string())))
                };

                let deserializer = &mut serde_json::Deserializer::from_slice(&bytes);
                match serde_path_to_error::deserialize::<_, Value>(deserializer) {
                    Ok(json) => return Ok(json),
                    Err(err) => {
                        error!(target: "Rest", "Failed to parse response in a successful request at {}: {}", err.path(), err);
                        retries += 1;
                    }
                }
            } else if status.is_server_error() {
                retries += 1;
            } else if status == StatusCode::TOO_MANY_REQUESTS {
                let message: Value = match res.json().await {
                    Ok(json) => json,
                    Err(err) => return Err(Error::Api(ApiError::RequestStatus(err.to_string())))
                };

                let retry_after = message.get("retry_after")
                    .and_then(Value::as_f64)
                    .unwrap_or(1.0);

                warn!(target: "Rest", "Rate limited on {route}, retrying in {retry_after}s");
                sleep(Duration::from_secs_f64(retry_after)).await;
                retries += 1;
            } else {
                return Err(Error::Api(ApiError::RequestStatus(format!("{method} {route}: {status}"))));
            }
        }

        Err(Error::Api(ApiError::TooManyRetry))
    }
}

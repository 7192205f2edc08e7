// Resilient HTTP layer for the booking APIs. The upstream answers 404 when
// it dislikes a security token (it looks like per-token rate limiting, not
// a real "not found"), and tokens are cheap, so the mitigation is: burn the
// token, take a fresh one, repeat the whole request. After the attempt
// budget is spent the last response is returned as-is and the caller deals
// with whatever body it carries.

use std::time::Duration;

use log::debug;
use reqwest::blocking::{Client, Response};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ApiError;
use crate::token::TokenPool;

/// Header carrying the single-use token on every request.
pub const SECURITY_HEADER: &str = "SecurityNumber";

/// How many times one logical call may be attempted before we give up and
/// hand back whatever the upstream last said.
pub const MAX_ATTEMPTS: usize = 20;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Run `attempt` up to `max_attempts` times, stopping early as soon as
/// `is_retryable` says the result is good enough. The last result is
/// returned even if it is still retryable; hard errors short-circuit.
pub fn with_retry<T, E>(
    max_attempts: usize,
    is_retryable: impl Fn(&T) -> bool,
    mut attempt: impl FnMut(usize) -> Result<T, E>,
) -> Result<T, E> {
    let mut outcome = attempt(1)?;
    for n in 2..=max_attempts {
        if !is_retryable(&outcome) {
            break;
        }
        outcome = attempt(n)?;
    }
    Ok(outcome)
}

/// Everything needed to (re)build one request. Retried attempts rebuild the
/// request from this value so each attempt can carry a fresh token.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(&'static str, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(url: impl Into<String>) -> Self {
        ApiRequest {
            method: Method::GET,
            url: url.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, body: Value) -> Self {
        ApiRequest {
            method: Method::POST,
            url: url.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn query(mut self, key: &'static str, value: impl ToString) -> Self {
        self.query.push((key, value.to_string()));
        self
    }
}

/// Blocking client that attaches one fresh token per attempt and retries
/// transient rejects. Owns the token pool; the pool is injected so tests
/// can script the issuer.
pub struct ResilientClient {
    http: Client,
    tokens: TokenPool,
    max_attempts: usize,
}

impl ResilientClient {
    pub fn new(http: Client, tokens: TokenPool) -> Self {
        ResilientClient {
            http,
            tokens,
            max_attempts: MAX_ATTEMPTS,
        }
    }

    /// Build a blocking client with the timeout every request should carry.
    pub fn default_http() -> Result<Client, reqwest::Error> {
        Client::builder().timeout(REQUEST_TIMEOUT).build()
    }

    #[cfg(test)]
    pub(crate) fn tokens(&self) -> &TokenPool {
        &self.tokens
    }

    /// Issue one logical call. Every attempt consumes a token; an HTTP 404
    /// burns the attempt and the loop goes again with the next token. Once
    /// the budget is exhausted the last response is returned unmodified.
    pub fn send(&mut self, request: &ApiRequest) -> Result<Response, ApiError> {
        let max_attempts = self.max_attempts;
        let ResilientClient { http, tokens, .. } = self;

        with_retry(
            max_attempts,
            |response: &Response| response.status() == StatusCode::NOT_FOUND,
            |attempt| {
                let token = tokens.acquire()?;
                let mut builder = http
                    .request(request.method.clone(), &request.url)
                    .header(SECURITY_HEADER, token);
                if !request.query.is_empty() {
                    builder = builder.query(&request.query);
                }
                if let Some(body) = &request.body {
                    builder = builder.json(body);
                }

                let response = builder.send().map_err(ApiError::from_transport)?;
                if response.status() == StatusCode::NOT_FOUND {
                    debug!(
                        "{} {}: transient reject on attempt {}",
                        request.method, request.url, attempt
                    );
                }
                Ok(response)
            },
        )
    }

    /// `send` plus JSON decoding of the final body. A body that does not
    /// parse as `T` (including upstream error bodies that survived the
    /// retry budget) surfaces as `MalformedResponse`.
    pub fn send_json<T: DeserializeOwned>(&mut self, request: &ApiRequest) -> Result<T, ApiError> {
        let response = self.send(request)?;
        let text = response.text().map_err(ApiError::from_transport)?;
        serde_json::from_str(&text)
            .map_err(|e| ApiError::MalformedResponse(format!("{e}: {text}")))
    }
}

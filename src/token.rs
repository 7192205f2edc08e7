// Security-token pool. The booking API expects a fresh `SecurityNumber`
// header on every request; tokens are handed out by a separate issuer in
// bulk and are single-use. The pool keeps a FIFO queue and refills it
// synchronously the moment it runs dry.

use std::collections::VecDeque;

use log::debug;
use reqwest::blocking::Client;

use crate::error::ApiError;

/// An opaque single-use credential for the booking API.
pub type Token = String;

/// Anything that can hand out a batch of fresh tokens. The HTTP issuer is
/// the real implementation; tests inject a scripted fake.
pub trait TokenSource {
    fn issue(&self, count: usize) -> Result<Vec<Token>, ApiError>;
}

/// Token issuer backed by the `GET /api/numbers?count=N` endpoint.
pub struct HttpTokenSource {
    client: Client,
    endpoint: String,
}

impl HttpTokenSource {
    pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
        HttpTokenSource {
            client,
            endpoint: endpoint.into(),
        }
    }
}

impl TokenSource for HttpTokenSource {
    fn issue(&self, count: usize) -> Result<Vec<Token>, ApiError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("count", count.to_string())])
            .send()
            .map_err(|e| ApiError::TokenSourceUnavailable(e.to_string()))?;

        response
            .json::<Vec<Token>>()
            .map_err(|e| ApiError::TokenSourceUnavailable(e.to_string()))
    }
}

/// FIFO pool of single-use tokens. `acquire` pops the front; when the queue
/// is empty it blocks on a bulk fetch from the source first. No token is
/// ever handed out twice. Single-threaded use is assumed; wrap the pool in
/// a mutex before sharing it across threads so pop-or-refill stays atomic.
pub struct TokenPool {
    source: Box<dyn TokenSource>,
    queue: VecDeque<Token>,
    batch: usize,
}

impl TokenPool {
    pub fn new(source: Box<dyn TokenSource>, batch: usize) -> Self {
        TokenPool {
            source,
            queue: VecDeque::new(),
            batch,
        }
    }

    /// Pop the next token, refilling from the issuer if the queue is empty.
    /// Issuer failures propagate as `TokenSourceUnavailable`; retrying is
    /// the caller's business, not the pool's.
    pub fn acquire(&mut self) -> Result<Token, ApiError> {
        if self.queue.is_empty() {
            debug!("token pool empty, fetching a batch of {}", self.batch);
            let fresh = self.source.issue(self.batch)?;
            if fresh.is_empty() {
                return Err(ApiError::TokenSourceUnavailable(
                    "issuer returned an empty batch".into(),
                ));
            }
            self.queue = fresh.into();
        }

        // Non-empty by construction at this point.
        self.queue.pop_front().ok_or_else(|| {
            ApiError::TokenSourceUnavailable("token queue drained unexpectedly".into())
        })
    }

    /// Number of tokens currently sitting in the queue.
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

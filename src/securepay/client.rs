use async_trait::async_trait;
use failsafe::futures::CircuitBreaker as FuturesCircuitBreaker;
use failsafe::{backoff, failure_policy, Config, Error as FailsafeError, StateMachine};
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::xml::{Element, XmlError};
use crate::domain::{Environment, GatewayProfile, TxnType};
use crate::utils::sanitize::Redacted;

pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
const CONTENT_TYPE_XML: &str = "text/xml";
/// Characters of an unparseable reply that reach the debug log.
const RAW_LOG_LIMIT: usize = 512;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("Could not serialize request: {0}")]
    Encoding(#[from] XmlError),
    #[error("Circuit breaker open: {0}")]
    CircuitBreakerOpen(String),
    #[error("Transport failure: {0}")]
    Other(String),
}

/// Raw gateway reply. `document` is `None` when the body is not well-formed.
#[derive(Debug, Clone)]
pub struct GatewayResponse {
    pub raw: String,
    pub document: Option<Element>,
}

impl GatewayResponse {
    /// Parses `raw`, keeping the text even when parsing fails.
    pub fn from_raw(raw: String) -> Self {
        let document = match Element::parse(&raw) {
            Ok(document) => Some(document),
            Err(e) => {
                debug!("Gateway response is not well-formed XML: {}", e);
                None
            }
        };
        Self { raw, document }
    }
}

/// Sends one document to the gateway. Implementations must not retry.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, endpoint: &str, document: &Element) -> Result<GatewayResponse, TransportError>;
}

/// API path for a transaction type.
pub fn api_path(txn_type: TxnType) -> &'static str {
    if txn_type.is_direct_entry() {
        "directentry"
    } else {
        "payment"
    }
}

pub fn base_url(environment: Environment) -> String {
    format!("https://{}.securepay.com.au", environment.host())
}

/// Full URL for `txn_type` on the profile's host.
pub fn endpoint(profile: &GatewayProfile, txn_type: TxnType) -> String {
    endpoint_for_path(profile, api_path(txn_type))
}

pub fn endpoint_for_path(profile: &GatewayProfile, path: &str) -> String {
    let base = profile
        .base_url
        .clone()
        .unwrap_or_else(|| base_url(profile.environment));
    format!("{}/xmlapi/{}", base.trim_end_matches('/'), path)
}

/// HTTPS transport for the SecurePay XML API
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    circuit_breaker: StateMachine<failure_policy::ConsecutiveFailures<backoff::EqualJittered>, ()>,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        Self::with_circuit_breaker(timeout, 3, 60)
    }

    /// Creates a transport with custom circuit breaker configuration
    pub fn with_circuit_breaker(
        timeout: Duration,
        failure_threshold: u32,
        reset_timeout_secs: u64,
    ) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(timeout).build()?;

        let backoff = backoff::equal_jittered(
            Duration::from_secs(reset_timeout_secs),
            Duration::from_secs(reset_timeout_secs * 2),
        );
        let policy = failure_policy::consecutive_failures(failure_threshold, backoff);
        let circuit_breaker = Config::new().failure_policy(policy).build();

        Ok(HttpTransport {
            client,
            circuit_breaker,
        })
    }

    /// Returns the current state of the circuit breaker
    pub fn circuit_state(&self) -> String {
        if self.circuit_breaker.is_call_permitted() {
            "closed".to_string()
        } else {
            "open".to_string()
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, endpoint: &str, document: &Element) -> Result<GatewayResponse, TransportError> {
        let body = document.to_xml()?;
        debug!(endpoint = %endpoint, request = %Redacted(document), "Sending payment request");

        let client = self.client.clone();
        let url = endpoint.to_string();

        let result = self
            .circuit_breaker
            .call(async move {
                let response = client
                    .post(&url)
                    .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE_XML)
                    .body(body)
                    .send()
                    .await?;
                response.text().await
            })
            .await;

        let raw = match result {
            Ok(raw) => raw,
            Err(FailsafeError::Rejected) => {
                return Err(TransportError::CircuitBreakerOpen(
                    "SecurePay circuit breaker is open".to_string(),
                ))
            }
            Err(FailsafeError::Inner(e)) => return Err(TransportError::RequestError(e)),
        };

        let response = GatewayResponse::from_raw(raw);
        match &response.document {
            Some(document) => debug!(response = %Redacted(document), "Got payment response"),
            // Nothing to redact without a parsed tree, so only a prefix is logged.
            None => debug!(
                response = %log_excerpt(&response.raw),
                length = response.raw.len(),
                "Got bad response from SecurePay"
            ),
        }
        Ok(response)
    }
}

fn log_excerpt(raw: &str) -> String {
    match raw.char_indices().nth(RAW_LOG_LIMIT) {
        Some((cut, _)) => format!("{}...", &raw[..cut]),
        None => raw.to_string(),
    }
}

//! Delivery of aggregated readings to the remote HTTP endpoint.
//!
//! This module owns the retry/backoff state machine: it builds the wire
//! payload, recovers connectivity through the `NetworkLink`, and issues
//! upload attempts until the endpoint acknowledges or the attempt budget
//! is exhausted. Reconnect attempts and send attempts share one budget, so
//! a flapping link cannot retry forever; worst case per channel is
//! `max_attempts * retry_delay`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::channel::RemoteSensorId;
use crate::link::NetworkLink;

/// Round to 2 decimal places.
///
/// Applied once, where a value crosses a serialization boundary; repeated
/// application is idempotent.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// JSON body POSTed to the delivery endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadPayload {
    /// Backend sensor id
    pub id_sensor: u32,

    /// Measurement time, ms since epoch; 0 when no synchronized clock was
    /// available at flush time
    pub value_date: u64,

    /// Aggregated temperature, rounded to 2 decimals
    pub value: f64,

    /// Shared project passphrase
    pub passphrase: String,
}

impl UploadPayload {
    pub fn new(
        remote_id: RemoteSensorId,
        value_date: u64,
        value: f64,
        passphrase: &str,
    ) -> Self {
        Self {
            id_sensor: remote_id.0,
            value_date,
            value: round2(value),
            passphrase: passphrase.to_string(),
        }
    }
}

/// Errors that can occur during a single upload attempt.
#[derive(Debug)]
pub enum UploadError {
    /// The endpoint answered with something other than the success status
    Status { code: StatusCode, body: String },

    /// The request never produced a response
    Transport(String),

    /// The HTTP client could not be built
    Config(String),
}

impl std::fmt::Display for UploadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadError::Status { code, body } => {
                write!(f, "endpoint returned {}: {}", code, body)
            }
            UploadError::Transport(msg) => write!(f, "transport failure: {}", msg),
            UploadError::Config(msg) => write!(f, "uploader configuration error: {}", msg),
        }
    }
}

impl std::error::Error for UploadError {}

/// Capability trait for the delivery transport.
#[async_trait]
pub trait Uploader: Send {
    /// Issue one upload attempt.
    ///
    /// `Ok(())` means the endpoint acknowledged with the canonical success
    /// status; anything else is one failed attempt.
    async fn upload(&self, payload: &UploadPayload) -> Result<(), UploadError>;
}

/// HTTP transport for the delivery endpoint.
///
/// The client is reused across attempts for connection pooling. Success is
/// exactly HTTP 201 Created; every other status is a failed attempt.
pub struct HttpUploader {
    client: Client,
    endpoint: String,
}

impl HttpUploader {
    /// Build the uploader for the given endpoint.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::Config` if the HTTP client cannot be built.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, UploadError> {
        let client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| UploadError::Config(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// The configured endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Uploader for HttpUploader {
    async fn upload(&self, payload: &UploadPayload) -> Result<(), UploadError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(payload)
            .send()
            .await
            .map_err(|e| UploadError::Transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::CREATED {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(UploadError::Status { code: status, body })
    }
}

/// Terminal-outcome signals surfaced to the operator.
///
/// The physical indication (LED patterns on embedded builds) belongs to
/// the implementation; the agent only emits the events. The failure signal
/// is distinct from the success signal.
pub trait StatusIndicator: Send {
    fn delivery_succeeded(&self);
    fn delivery_failed(&self);
}

/// Indicator that reports outcomes through the log.
pub struct LogIndicator;

impl StatusIndicator for LogIndicator {
    fn delivery_succeeded(&self) {
        info!("delivery acknowledged by endpoint");
    }

    fn delivery_failed(&self) {
        error!("delivery abandoned after exhausting retries");
    }
}

/// Terminal states of one delivery.
///
/// `attempts` counts consumed attempts, whether they ended in a send or in
/// a failed reconnect. The skip states are not failures; they produce no
/// network activity at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered { attempts: u32 },
    ExhaustedRetries { attempts: u32 },
    SkippedNoRemoteId,
    SkippedNoEndpoint,
}

/// Drives the bounded retry loop for one channel's aggregate per flush
/// cycle.
///
/// Stateless across deliveries: payload and attempt counter live only for
/// the duration of one `deliver` call.
pub struct DeliveryAgent {
    uploader: Option<Box<dyn Uploader>>,
    indicator: Box<dyn StatusIndicator>,
    passphrase: String,
    max_attempts: u32,
    retry_delay: Duration,
}

impl DeliveryAgent {
    pub fn new(
        uploader: Option<Box<dyn Uploader>>,
        indicator: Box<dyn StatusIndicator>,
        passphrase: impl Into<String>,
        max_attempts: u32,
        retry_delay: Duration,
    ) -> Self {
        Self {
            uploader,
            indicator,
            passphrase: passphrase.into(),
            max_attempts,
            retry_delay,
        }
    }

    /// Deliver one aggregate value, retrying across link and transport
    /// failures until a terminal state is reached.
    ///
    /// Preconditions short-circuit before any network activity: a channel
    /// without a remote id, or a service without an endpoint, is skipped.
    /// Otherwise each iteration either recovers the link (a failed
    /// recovery consumes one attempt without sending) or issues an upload;
    /// every non-successful attempt is followed by the fixed retry delay.
    pub async fn deliver(
        &self,
        remote_id: Option<RemoteSensorId>,
        value: f64,
        value_date: u64,
        link: &mut dyn NetworkLink,
    ) -> DeliveryOutcome {
        let Some(remote_id) = remote_id else {
            debug!("no remote sensor id configured, keeping aggregate local");
            return DeliveryOutcome::SkippedNoRemoteId;
        };

        let Some(uploader) = self.uploader.as_deref() else {
            debug!(%remote_id, "no delivery endpoint configured, keeping aggregate local");
            return DeliveryOutcome::SkippedNoEndpoint;
        };

        let payload = UploadPayload::new(remote_id, value_date, value, &self.passphrase);
        let mut attempts = 0;

        while attempts < self.max_attempts {
            if !link.is_connected() {
                if let Err(e) = link.reconnect().await {
                    warn!(%remote_id, error = %e, "link recovery failed");
                }
                if !link.is_connected() {
                    attempts += 1;
                    warn!(
                        %remote_id,
                        attempt = attempts,
                        max_attempts = self.max_attempts,
                        "link down, no upload attempted"
                    );
                    sleep(self.retry_delay).await;
                    continue;
                }
                info!(%remote_id, "link re-established");
            }

            match uploader.upload(&payload).await {
                Ok(()) => {
                    attempts += 1;
                    info!(
                        %remote_id,
                        attempts,
                        value = payload.value,
                        "aggregate delivered"
                    );
                    self.indicator.delivery_succeeded();
                    return DeliveryOutcome::Delivered { attempts };
                }
                Err(e) => {
                    attempts += 1;
                    warn!(
                        %remote_id,
                        attempt = attempts,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "upload attempt failed"
                    );
                    sleep(self.retry_delay).await;
                }
            }
        }

        error!(%remote_id, attempts, "retry budget exhausted, delivery abandoned");
        self.indicator.delivery_failed();
        DeliveryOutcome::ExhaustedRetries { attempts }
    }
}

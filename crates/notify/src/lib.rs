//! Push-notification transport for new orders.
//!
//! One best-effort attempt per order, no retry: persistence success is
//! never allowed to depend on delivery success. When credentials are
//! missing the transport degrades to a noop and reports the fact as a
//! typed failure instead of aborting the caller.

use async_trait::async_trait;
use thiserror::Error;

pub mod pushover;

pub use pushover::PushoverNotifier;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("notification credentials are not configured")]
    NotConfigured,
    #[error("notification request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("notification rejected by service: {0}")]
    Rejected(String),
}

/// Acknowledgement of a delivered notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ack {
    pub detail: String,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str) -> Result<Ack, DeliveryError>;

    /// True when this transport discards messages (degraded mode).
    fn is_noop(&self) -> bool {
        false
    }
}

/// Transport used when Pushover credentials are absent at bootstrap.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, _message: &str) -> Result<Ack, DeliveryError> {
        Err(DeliveryError::NotConfigured)
    }

    fn is_noop(&self) -> bool {
        true
    }
}

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, warn};

use scoopy_core::config::PushoverConfig;

use crate::{Ack, DeliveryError, Notifier};

const PUSHOVER_MESSAGES_URL: &str = "https://api.pushover.net/1/messages.json";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

pub struct PushoverNotifier {
    client: reqwest::Client,
    user_key: SecretString,
    app_token: SecretString,
    endpoint: String,
}

impl PushoverNotifier {
    /// Returns `None` when either credential is missing; callers fall
    /// back to [`crate::NoopNotifier`].
    pub fn from_config(config: &PushoverConfig) -> Option<Self> {
        if !config.is_configured() {
            return None;
        }
        let user_key = config.user_key.clone()?;
        let app_token = config.app_token.clone()?;
        Some(Self::new(user_key, app_token, PUSHOVER_MESSAGES_URL.to_string()))
    }

    pub fn new(user_key: SecretString, app_token: SecretString, endpoint: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();
        Self { client, user_key, app_token, endpoint }
    }
}

#[async_trait]
impl Notifier for PushoverNotifier {
    async fn notify(&self, message: &str) -> Result<Ack, DeliveryError> {
        let params = [
            ("token", self.app_token.expose_secret()),
            ("user", self.user_key.expose_secret()),
            ("message", message),
        ];

        let response = self.client.post(&self.endpoint).form(&params).send().await?;

        if response.status().is_success() {
            info!(event_name = "notify.pushover.sent", "pushover notification delivered");
            return Ok(Ack { detail: "pushover notification delivered".to_string() });
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        warn!(
            event_name = "notify.pushover.rejected",
            status = %status,
            "pushover rejected notification"
        );
        Err(DeliveryError::Rejected(format!("{status}: {body}")))
    }
}

#[cfg(test)]
mod tests {
    use scoopy_core::config::PushoverConfig;

    use super::PushoverNotifier;

    #[test]
    fn from_config_requires_both_credentials() {
        let missing = PushoverConfig { user_key: None, app_token: None };
        assert!(PushoverNotifier::from_config(&missing).is_none());

        let half = PushoverConfig {
            user_key: Some("uk-test".to_string().into()),
            app_token: None,
        };
        assert!(PushoverNotifier::from_config(&half).is_none());

        let full = PushoverConfig {
            user_key: Some("uk-test".to_string().into()),
            app_token: Some("az-test".to_string().into()),
        };
        assert!(PushoverNotifier::from_config(&full).is_some());
    }
}

//! Deployment triggering.
//!
//! The orchestrator depends on the [`DeploymentTrigger`] capability rather
//! than an inline network call, so deployments can be stubbed in tests. The
//! production implementation posts a signed JSON payload to the hosting
//! platform's webhook.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{debug, info, warn};

use crate::config::DeployConfig;
use crate::errors::DeployError;

type HmacSha256 = Hmac<Sha256>;

// ---------------------------------------------------------------------------
// Capability
// ---------------------------------------------------------------------------

/// Result of a successful deployment trigger.
#[derive(Debug, Clone)]
pub struct DeploymentOutcome {
    /// Public URL where the deployed template is reachable, when the
    /// platform reports one.
    pub url: Option<String>,
}

/// External deployment capability.
#[async_trait]
pub trait DeploymentTrigger: Send + Sync {
    /// Ask the hosting platform to deploy the template at `version`.
    ///
    /// A timeout is a [`DeployError::TriggerFailed`], not an indeterminate
    /// state; the merge's outcome is already finalized before this is called.
    async fn trigger(&self, template_id: &str, version: &str)
        -> Result<DeploymentOutcome, DeployError>;
}

// ---------------------------------------------------------------------------
// Webhook implementation
// ---------------------------------------------------------------------------

/// Posts deployment requests to a configured webhook, signing the body with
/// HMAC-SHA256 when a shared secret is configured.
pub struct WebhookDeployer {
    webhook_url: String,
    secret: Option<String>,
    http: reqwest::Client,
}

impl WebhookDeployer {
    /// Build a deployer from config. Returns `NotConfigured` when no webhook
    /// URL is set.
    pub fn from_config(config: &DeployConfig) -> Result<Self, DeployError> {
        let webhook_url = config
            .webhook_url
            .clone()
            .ok_or(DeployError::NotConfigured)?;
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;
        info!(webhook_url = %webhook_url, "initializing webhook deployer");
        Ok(Self {
            webhook_url,
            secret: config.secret.clone(),
            http,
        })
    }

    fn sign(&self, body: &str) -> Option<String> {
        let secret = self.secret.as_deref()?;
        let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
            Ok(mac) => mac,
            // HMAC accepts keys of any length; this arm is unreachable but
            // must not panic in request handling.
            Err(_) => return None,
        };
        mac.update(body.as_bytes());
        Some(hex::encode(mac.finalize().into_bytes()))
    }
}

#[async_trait]
impl DeploymentTrigger for WebhookDeployer {
    async fn trigger(
        &self,
        template_id: &str,
        version: &str,
    ) -> Result<DeploymentOutcome, DeployError> {
        let payload = serde_json::json!({
            "template_id": template_id,
            "version": version,
        });
        let body = payload.to_string();
        debug!(template_id, version, "triggering deployment webhook");

        let mut request = self
            .http
            .post(&self.webhook_url)
            .header("content-type", "application/json")
            .body(body.clone());
        if let Some(signature) = self.sign(&body) {
            request = request.header("x-templup-signature", format!("sha256={signature}"));
        }

        let resp = request.send().await.map_err(|e| {
            warn!(template_id, error = %e, "deployment webhook call failed");
            DeployError::TriggerFailed {
                template_id: template_id.to_string(),
                detail: e.to_string(),
            }
        })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            warn!(template_id, status = %status, body = %body, "deployment webhook returned error");
            return Err(DeployError::TriggerFailed {
                template_id: template_id.to_string(),
                detail: format!("HTTP {status}: {body}"),
            });
        }

        let url = resp
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|v| v.get("url").and_then(|u| u.as_str()).map(str::to_string));

        info!(template_id, version, url = url.as_deref().unwrap_or("-"), "deployment triggered");
        Ok(DeploymentOutcome { url })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deploy_config(url: Option<&str>, secret: Option<&str>) -> DeployConfig {
        DeployConfig {
            webhook_url: url.map(str::to_string),
            secret: secret.map(str::to_string),
            timeout_secs: 5,
            ..DeployConfig::default()
        }
    }

    #[test]
    fn test_not_configured() {
        let result = WebhookDeployer::from_config(&deploy_config(None, None));
        assert!(matches!(result, Err(DeployError::NotConfigured)));
    }

    #[test]
    fn test_signature_is_deterministic_hex() {
        let deployer =
            WebhookDeployer::from_config(&deploy_config(Some("https://deploy.example/hook"), Some("s3cret")))
                .unwrap();
        let a = deployer.sign("{\"template_id\":\"tpl-1\"}").unwrap();
        let b = deployer.sign("{\"template_id\":\"tpl-1\"}").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_no_secret_no_signature() {
        let deployer =
            WebhookDeployer::from_config(&deploy_config(Some("https://deploy.example/hook"), None))
                .unwrap();
        assert!(deployer.sign("body").is_none());
    }
}

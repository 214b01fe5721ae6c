//! Connectivity probe against the CRM health endpoint

use std::time::Duration;

use async_trait::async_trait;
use carebridge_core::ConnectivityProbe;
use carebridge_domain::{CareBridgeError, RemoteConfig, Result};
use reqwest::Client;
use tracing::debug;
use url::Url;

use super::{build_client, parse_base_url};

/// Reports online when `GET {base}{health_path}` answers with a 2xx status
#[derive(Debug, Clone)]
pub struct HttpConnectivityProbe {
    client: Client,
    url: Url,
}

impl HttpConnectivityProbe {
    /// # Errors
    /// Returns [`CareBridgeError::Config`] for an invalid URL or health path.
    pub fn new(base_url: &str, health_path: &str, timeout: Duration) -> Result<Self> {
        let base = parse_base_url(base_url)?;
        let url = base.join(health_path.trim_start_matches('/')).map_err(|err| {
            CareBridgeError::Config(format!("invalid remote.health_path '{health_path}': {err}"))
        })?;
        Ok(Self { client: build_client(timeout)?, url })
    }

    /// # Errors
    /// Returns [`CareBridgeError::Config`] when `remote.base_url` is unset.
    pub fn from_config(config: &RemoteConfig) -> Result<Self> {
        let base_url = config.base_url.as_deref().ok_or_else(|| {
            CareBridgeError::Config("remote.base_url is required for connectivity probing".into())
        })?;
        Self::new(base_url, &config.health_path, config.request_timeout())
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl ConnectivityProbe for HttpConnectivityProbe {
    async fn check(&self) -> bool {
        match self.client.get(self.url.clone()).send().await {
            Ok(response) => {
                let online = response.status().is_success();
                debug!(url = %self.url, status = %response.status(), online, "connectivity probe");
                online
            }
            Err(err) => {
                debug!(url = %self.url, error = %err, "connectivity probe failed");
                false
            }
        }
    }
}

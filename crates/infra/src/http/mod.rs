//! HTTP adapters for the remote CRM API
//!
//! - [`HttpExecutionSink`] replays pending actions as `POST
//!   {base}/actions/{type}` requests
//! - [`HttpConnectivityProbe`] checks `GET {base}{health_path}`
//!
//! Both send a single request per call. Retrying is the reconciler's job, so
//! a failed request is reported straight back as an `ExecutionError`.

pub mod executor;
pub mod probe;

use std::time::Duration;

use carebridge_domain::{CareBridgeError, Result};
use reqwest::Client;
use url::Url;

use crate::errors::InfraError;

pub use executor::HttpExecutionSink;
pub use probe::HttpConnectivityProbe;

const USER_AGENT: &str = concat!("carebridge-offline/", env!("CARGO_PKG_VERSION"));

fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .no_proxy()
        .build()
        .map_err(|err| InfraError::from(err).into())
}

/// Parse a base URL and make sure relative joins append to its path
fn parse_base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw)
        .map_err(|err| CareBridgeError::Config(format!("invalid remote.base_url '{raw}': {err}")))?;
    if url.cannot_be_a_base() {
        return Err(CareBridgeError::Config(format!("remote.base_url '{raw}' cannot be a base")));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

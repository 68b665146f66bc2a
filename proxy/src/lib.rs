pub mod api_key;
pub mod config;
pub mod errors;
pub mod metrics_defs;
mod proxy_service;
mod response;
pub mod sheets_client;
#[cfg(test)]
mod testutils;
pub mod validation;

use api_key::{API_KEY_ENV_VAR, ApiKey};
pub use errors::ProxyError;
pub use proxy_service::ProxyService;
use sheets_client::SheetsClient;
use shared::admin_service::AdminService;
use shared::http::run_http_service;
use std::sync::Arc;

/// Serves the proxy and admin listeners until either of them fails.
pub async fn run(config: config::Config) -> Result<(), ProxyError> {
    config.validate()?;

    let api_key = ApiKey::from_env();
    if api_key.is_none() {
        tracing::warn!(
            "{API_KEY_ENV_VAR} is not set; values requests will fail until it is provided"
        );
    }

    let client = SheetsClient::new(config.upstream.base_url.clone())?;
    let proxy_service = ProxyService::new(Arc::new(client), api_key);

    let is_ready = proxy_service.is_ready();
    let admin_service = AdminService::<_, ProxyError>::new(move || is_ready);

    let proxy_task = run_http_service(
        &config.listener.host,
        config.listener.port,
        proxy_service,
    );
    let admin_task = run_http_service(
        &config.admin_listener.host,
        config.admin_listener.port,
        admin_service,
    );

    tokio::try_join!(proxy_task, admin_task)?;
    Ok(())
}

pub mod schema;

pub use schema::{
    ChatConfig, CompressConfig, Config, ConvertConfig, GatewayConfig, QrConfig, ShortenerConfig,
};

/// Build an HTTP client for an upstream service with the given timeouts.
///
/// Falls back to a default client if the builder fails, so a bad TLS setup
/// surfaces as a request error instead of a startup panic.
pub fn build_upstream_client(
    service: &str,
    timeout_secs: u64,
    connect_timeout_secs: u64,
) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .connect_timeout(std::time::Duration::from_secs(connect_timeout_secs))
        .user_agent(concat!("toolbox/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|error| {
            tracing::warn!(service, "Failed to build upstream client, using defaults: {error}");
            reqwest::Client::new()
        })
}

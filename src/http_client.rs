use reqwest::{Client, ClientBuilder};
use std::time::Duration;

use crate::config::Config;
use crate::error::ConfigError;

/// Build the single client shared by every probe of a run.
///
/// The pool is sized to the admission window so each in-flight probe can keep
/// its connection warm for the next candidate against the same host.
pub fn create_probe_client(cfg: &Config) -> Result<Client, ConfigError> {
    let timeout = cfg.timeout();
    let client = ClientBuilder::new()
        // Connection pooling - reuse connections aggressively
        .pool_max_idle_per_host(cfg.concurrency)
        .pool_idle_timeout(Some(Duration::from_secs(90)))
        .tcp_keepalive(Some(Duration::from_secs(60)))
        .tcp_nodelay(true)

        // Timeouts cover connect + full response
        .timeout(timeout)
        .connect_timeout(timeout)

        .gzip(true)
        .brotli(true)

        .use_rustls_tls()
        .danger_accept_invalid_certs(cfg.insecure)

        // Report the status the target actually sent; 3xx is a signal on its own
        .redirect(reqwest::redirect::Policy::none())

        .user_agent(cfg.user_agent.as_str())
        .build()?;
    Ok(client)
}

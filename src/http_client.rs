//! Download of the remote results table.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use log::debug;
use once_cell::sync::OnceCell;
use reqwest::blocking::Client;

/// The full results table is a few megabytes.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);
const AGENT: &str = concat!("dmaic_football/", env!("CARGO_PKG_VERSION"));

static RESULTS_CLIENT: OnceCell<Client> = OnceCell::new();

fn results_client() -> Result<&'static Client> {
    RESULTS_CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .user_agent(AGENT)
            .build()
            .context("build results download client")
    })
}

/// Downloads a CSV document. Non-2xx responses and empty bodies are errors.
pub fn download_csv(url: &str) -> Result<String> {
    let resp = results_client()?
        .get(url)
        .send()
        .with_context(|| format!("download {url}"))?
        .error_for_status()
        .with_context(|| format!("download {url}"))?;
    let body = resp
        .text()
        .with_context(|| format!("read body of {url}"))?;
    if body.trim().is_empty() {
        return Err(anyhow!("{url} returned an empty document"));
    }
    debug!("downloaded {} bytes from {url}", body.len());
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreachable_host_is_an_error() {
        let err = download_csv("http://127.0.0.1:9/results.csv").unwrap_err();
        assert!(format!("{err:#}").contains("127.0.0.1:9"));
    }
}

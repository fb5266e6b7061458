//! # sizelapse-sdk
//!
//! Client for the sizelapse history API.
//!
//! ## Example
//!
//! ```no_run
//! use sizelapse_sdk::HistoryClient;
//!
//! let client = HistoryClient::new("http://localhost:3000");
//!
//! let history = client.fetch_history().unwrap();
//! println!("{} commits", history.len());
//! ```

use anyhow::{Context, Result};
use sizelapse_core::{FilterConfig, HistoryList, HistoryResponse};

#[derive(Clone)]
pub struct HistoryClient {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HistoryClient {
    /// Create a new client
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the sizelapse server (e.g., "http://localhost:3000")
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::blocking::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the full commit history.
    ///
    /// An error reported by the server is returned verbatim.
    pub fn fetch_history(&self) -> Result<HistoryList> {
        let response = self
            .client
            .get(format!("{}/api/history", self.base_url))
            .send()?;
        let status = response.status();
        let body = response.text()?;

        parse_history_body(status.as_u16(), &body)
    }

    /// Fetch the history, folding every failure into the data contract.
    pub fn fetch_response(&self) -> HistoryResponse {
        match self.fetch_history() {
            Ok(history) => HistoryResponse::History(history),
            Err(e) => HistoryResponse::Failure {
                error: format!("{:#}", e),
            },
        }
    }

    /// Fetch the settled SVG for a 1-based commit number
    pub fn fetch_frame_svg(&self, commit_number: usize, filters: &FilterConfig) -> Result<String> {
        let response = self
            .client
            .get(format!(
                "{}/api/commits/{}/frame.svg",
                self.base_url, commit_number
            ))
            .query(&[
                ("hide_json", filters.hide_json),
                ("hide_images", filters.hide_images),
            ])
            .send()?
            .error_for_status()?;

        Ok(response.text()?)
    }

    /// Check server health
    pub fn health_check(&self) -> Result<bool> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()?;

        Ok(response.status().is_success())
    }
}

fn parse_history_body(status: u16, body: &str) -> Result<HistoryList> {
    let response: HistoryResponse = serde_json::from_str(body)
        .with_context(|| format!("Server returned a non-JSON response (HTTP {})", status))?;

    Ok(response.into_result()?)
}

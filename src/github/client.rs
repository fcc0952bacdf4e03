use anyhow::{Context, Result};
use reqwest::header::{ACCEPT, LINK, USER_AGENT};
use reqwest::Client;

use super::types::RawReleasesResponse;
use crate::config::types::GithubConfig;

pub struct GitHubClient {
    client: Client,
    api_url: String,
    user_agent: String,
}

impl GitHubClient {
    pub fn new(config: &GithubConfig) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            user_agent: config.user_agent.clone(),
        })
    }

    pub fn releases_url(&self, owner: &str, name: &str) -> String {
        format!("{}/repos/{}/{}/releases", self.api_url, owner, name)
    }

    /// Fetches one page of releases without interpreting the body.
    ///
    /// Non-success statuses are reported through `status_ok`; only transport
    /// failures surface as errors.
    pub async fn fetch_releases(
        &self,
        owner: &str,
        name: &str,
        per_page: u32,
        page: u32,
    ) -> Result<RawReleasesResponse> {
        let url = self.releases_url(owner, name);
        let response = self
            .client
            .get(&url)
            .query(&[("per_page", per_page), ("page", page)])
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, "application/vnd.github+json")
            .send()
            .await
            .with_context(|| format!("GET {url} failed"))?;

        let status = response.status();
        let link_header = response
            .headers()
            .get(LINK)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .text()
            .await
            .with_context(|| format!("Failed reading body of {url}"))?;

        if !status.is_success() {
            tracing::warn!("GET {} returned {}", url, status);
        }

        Ok(RawReleasesResponse {
            status_ok: status.is_success(),
            body,
            link_header,
        })
    }
}

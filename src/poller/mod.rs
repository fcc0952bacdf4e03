pub mod identity;
pub mod projector;
pub mod requests;
pub mod table;

use anyhow::{bail, Result};
use serde::Serialize;

use crate::config::types::PollingConfig;
use crate::github::{GitHubClient, RawReleasesResponse};
use projector::{Outcome, ReleasesProjector};
use requests::{RequestIssuer, RequestQueue};
use table::InMemoryTableStore;

pub use table::ReleaseRow;

/// Totals for one poll cycle.
#[derive(Debug, Default, Serialize)]
pub struct PollSummary {
    pub pages: usize,
    pub rows_written: usize,
    pub skipped: usize,
    pub failed_pages: usize,
    /// Requests dropped because the page limit was reached
    pub abandoned: usize,
}

/// Drives releases fetches serially, feeding each response through the projector.
pub struct ReleasesPoller {
    client: GitHubClient,
    projector: ReleasesProjector,
    store: InMemoryTableStore,
    queue: RequestQueue,
    max_pages: usize,
}

impl ReleasesPoller {
    pub fn new(client: GitHubClient, projector: ReleasesProjector, config: &PollingConfig) -> Self {
        Self {
            client,
            projector,
            store: InMemoryTableStore::new(),
            queue: RequestQueue::new(),
            max_pages: config.max_pages,
        }
    }

    pub fn store(&self) -> &InMemoryTableStore {
        &self.store
    }

    pub fn table_id(&self) -> &str {
        &self.projector.table_id
    }

    pub async fn poll(&mut self, repos: &[String]) -> Result<PollSummary> {
        let repos = repos
            .iter()
            .map(|r| parse_repo(r))
            .collect::<Result<Vec<_>>>()?;
        for (owner, name) in repos {
            self.queue
                .issue_releases_request(owner, name, self.projector.per_page, 1);
        }

        let mut summary = PollSummary::default();
        while let Some(request) = self.queue.pop() {
            if summary.pages >= self.max_pages {
                summary.abandoned = self.queue.len() + 1;
                tracing::warn!(
                    "Page limit of {} reached, dropping {} pending requests",
                    self.max_pages,
                    summary.abandoned
                );
                self.queue.clear();
                break;
            }
            summary.pages += 1;

            tracing::info!(
                "Fetching releases of {}/{} (page {})",
                request.owner,
                request.name,
                request.page
            );
            let response = match self
                .client
                .fetch_releases(&request.owner, &request.name, request.per_page, request.page)
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!("{:#}", e);
                    RawReleasesResponse::failed()
                }
            };

            match self
                .projector
                .handle_releases_response(&response, &mut self.store, &mut self.queue)
            {
                Outcome::Projected {
                    identity,
                    rows_written,
                    skipped,
                    ..
                } => {
                    tracing::info!(
                        "{}: {} rows written, {} entries skipped",
                        identity,
                        rows_written,
                        skipped.len()
                    );
                    summary.rows_written += rows_written;
                    summary.skipped += skipped.len();
                }
                Outcome::Empty => {}
                Outcome::UpstreamFailure | Outcome::Failed(_) => summary.failed_pages += 1,
            }
        }

        Ok(summary)
    }
}

/// Splits an `owner/name` repository spec.
pub fn parse_repo(repo: &str) -> Result<(&str, &str)> {
    match repo.trim().split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
            Ok((owner, name))
        }
        _ => bail!("Invalid repository '{}', expected owner/name", repo),
    }
}

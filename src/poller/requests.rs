use std::collections::VecDeque;

use serde::Serialize;

/// GitHub's maximum page size for the releases endpoint.
pub const DEFAULT_PER_PAGE: u32 = 100;

/// A pending fetch of one releases page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleasesRequest {
    pub owner: String,
    pub name: String,
    pub per_page: u32,
    pub page: u32,
}

/// Schedules releases fetches. Issuing never waits for the fetch.
pub trait RequestIssuer {
    fn issue_releases_request(&mut self, owner: &str, name: &str, per_page: u32, page: u32);
}

#[derive(Debug, Default)]
pub struct RequestQueue {
    pending: VecDeque<ReleasesRequest>,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pop(&mut self) -> Option<ReleasesRequest> {
        self.pending.pop_front()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

impl RequestIssuer for RequestQueue {
    fn issue_releases_request(&mut self, owner: &str, name: &str, per_page: u32, page: u32) {
        self.pending.push_back(ReleasesRequest {
            owner: owner.to_string(),
            name: name.to_string(),
            per_page,
            page,
        });
    }
}

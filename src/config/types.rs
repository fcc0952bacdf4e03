use serde::{Deserialize, Serialize};

use crate::poller::requests::DEFAULT_PER_PAGE;
use crate::poller::table::REPOSITORY_RELEASES_TABLE;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub github: GithubConfig,
    pub polling: PollingConfig,
    pub table: TableConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    pub api_url: String,
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub per_page: u32,
    /// Upper bound on pages fetched in one poll cycle
    pub max_pages: usize,
    pub repos: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    pub id: String,
}

impl Default for GithubConfig {
    fn default() -> Self {
        GithubConfig {
            api_url: "https://api.github.com".to_string(),
            user_agent: "release-poller".to_string(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        PollingConfig {
            per_page: DEFAULT_PER_PAGE,
            max_pages: 50,
            repos: vec![],
        }
    }
}

impl Default for TableConfig {
    fn default() -> Self {
        TableConfig {
            id: REPOSITORY_RELEASES_TABLE.to_string(),
        }
    }
}

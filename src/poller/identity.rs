use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// Owner and name of the repository a releases page belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryIdentity {
    pub owner: String,
    pub name: String,
}

impl RepositoryIdentity {
    /// Recovers the identity from a release resource URL.
    ///
    /// An unrecognised URL yields empty owner and name rather than an error.
    pub fn from_release_url(url: &str) -> Self {
        static RE_RELEASE: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"https://api\.github\.com/repos/([^/]+)/([^/]+)/releases/(\d+)").unwrap()
        });
        let Some(groups) = RE_RELEASE.captures(url) else {
            return Self::default();
        };
        Self {
            owner: groups.get(1).map_or("", |m| m.as_str()).to_string(),
            name: groups.get(2).map_or("", |m| m.as_str()).to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.owner.is_empty() && self.name.is_empty()
    }

    pub fn repository_key(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl fmt::Display for RepositoryIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

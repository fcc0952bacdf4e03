use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// One element of the `GET /repos/{owner}/{repo}/releases` array.
///
/// GitHub occasionally returns partial objects, so nothing here is mandatory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReleaseEntry {
    pub url: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: u64,
    pub tag_name: Option<String>,
    pub target_commitish: Option<String>,
    pub name: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub draft: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub prerelease: bool,
    pub body: Option<String>,
    pub author: Option<ReleaseAuthor>,
    pub created_at: Option<DateTime<Utc>>,
    pub published_at: Option<DateTime<Utc>>,
}

/// Treats an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReleaseAuthor {
    pub login: Option<String>,
}

/// What the transport hands over for one releases page.
#[derive(Debug, Clone, Default)]
pub struct RawReleasesResponse {
    pub status_ok: bool,
    pub body: String,
    pub link_header: Option<String>,
}

impl RawReleasesResponse {
    pub fn ok(body: impl Into<String>, link_header: Option<String>) -> Self {
        Self {
            status_ok: true,
            body: body.into(),
            link_header,
        }
    }

    pub fn failed() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn deserializes_github_release_fields() {
        let body = r#"{
            "url": "https://api.github.com/repos/acme/widgets/releases/42",
            "id": 42,
            "tag_name": "v1.0",
            "target_commitish": "main",
            "name": "First",
            "draft": false,
            "prerelease": true,
            "body": "notes",
            "author": { "login": "octocat", "id": 1 },
            "created_at": "2024-01-02T03:04:05Z",
            "published_at": null,
            "assets": []
        }"#;
        let entry: ReleaseEntry = serde_json::from_str(body).unwrap();

        assert_eq!(entry.id, 42);
        assert_eq!(entry.tag_name.as_deref(), Some("v1.0"));
        assert_eq!(entry.author.and_then(|a| a.login).as_deref(), Some("octocat"));
        assert!(entry.prerelease);
        assert_eq!(
            entry.created_at.map(|d| d.to_rfc3339()).as_deref(),
            Some("2024-01-02T03:04:05+00:00")
        );
        assert!(entry.published_at.is_none());
    }

    #[test]
    fn tolerates_missing_fields() {
        let entry: ReleaseEntry = serde_json::from_str("{}").unwrap();
        assert!(entry.url.is_none());
        assert_eq!(entry.id, 0);
        assert!(!entry.draft);
    }

    #[test]
    fn tolerates_null_scalars() {
        let entry: ReleaseEntry =
            serde_json::from_str(r#"{"id": null, "draft": null, "prerelease": null}"#).unwrap();
        assert_eq!(entry.id, 0);
        assert!(!entry.draft);
        assert!(!entry.prerelease);
    }
}

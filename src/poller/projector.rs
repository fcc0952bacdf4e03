use serde::Serialize;

use super::identity::RepositoryIdentity;
use super::requests::{ReleasesRequest, RequestIssuer};
use super::table::{ReleaseRow, TableStore};
use crate::error::ProjectionError;
use crate::github::{LinkHeader, RawReleasesResponse, ReleaseEntry};

/// Result of handling one releases response.
#[derive(Debug)]
pub enum Outcome {
    /// The upstream call failed; nothing was looked at
    UpstreamFailure,
    /// The repository has no (more) releases
    Empty,
    /// The body could not be parsed
    Failed(ProjectionError),
    Projected {
        identity: RepositoryIdentity,
        rows_written: usize,
        skipped: Vec<SkipReason>,
        continuation: Option<ReleasesRequest>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    NullEntry,
    MissingUrl,
}

/// Projects releases pages into the releases table and schedules the next page.
#[derive(Debug, Clone)]
pub struct ReleasesProjector {
    pub table_id: String,
    pub per_page: u32,
}

impl ReleasesProjector {
    pub fn new(table_id: impl Into<String>, per_page: u32) -> Self {
        Self {
            table_id: table_id.into(),
            per_page,
        }
    }

    pub fn handle_releases_response(
        &self,
        response: &RawReleasesResponse,
        store: &mut impl TableStore,
        requests: &mut impl RequestIssuer,
    ) -> Outcome {
        if !response.status_ok {
            return Outcome::UpstreamFailure;
        }

        let releases = match parse_releases(&response.body) {
            Ok(releases) => releases,
            Err(err) => {
                tracing::error!("Failed to parse releases response: {:#}", err);
                return Outcome::Failed(err);
            }
        };

        if releases.is_empty() {
            return Outcome::Empty;
        }

        // Every entry of a page belongs to the same repository, so the first one decides.
        let identity = releases[0]
            .as_ref()
            .and_then(|r| r.url.as_deref())
            .map(RepositoryIdentity::from_release_url)
            .unwrap_or_default();
        if identity.is_empty() {
            tracing::warn!("Could not determine repository of releases page");
        }

        let mut rows = Vec::with_capacity(releases.len());
        let mut skipped = Vec::new();
        for release in releases {
            let Some(release) = release else {
                tracing::info!("Release was null");
                skipped.push(SkipReason::NullEntry);
                continue;
            };
            if release.url.is_none() {
                tracing::info!("Release url null");
                skipped.push(SkipReason::MissingUrl);
                continue;
            }
            rows.push(ReleaseRow::from_entry(&identity, release));
        }

        let rows_written = rows.len();
        if rows_written > 0 {
            store.replace_rows(&self.table_id, rows);
        }

        tracing::debug!("Release repo: {}", identity);

        let continuation = response
            .link_header
            .as_deref()
            .filter(|value| !value.is_empty())
            .and_then(|value| self.continue_pagination(&identity, value, requests));

        Outcome::Projected {
            identity,
            rows_written,
            skipped,
            continuation,
        }
    }

    fn continue_pagination(
        &self,
        identity: &RepositoryIdentity,
        link_header: &str,
        requests: &mut impl RequestIssuer,
    ) -> Option<ReleasesRequest> {
        let link = LinkHeader::parse(link_header);
        tracing::debug!("Current page: {}", link.current_page());
        tracing::debug!("Has next page: {}", link.has_next());
        if let Some(last) = link.last_page() {
            tracing::trace!("Last page: {}", last);
        }

        let page = link.next_page()?;
        requests.issue_releases_request(&identity.owner, &identity.name, self.per_page, page);
        Some(ReleasesRequest {
            owner: identity.owner.clone(),
            name: identity.name.clone(),
            per_page: self.per_page,
            page,
        })
    }
}

fn parse_releases(body: &str) -> Result<Vec<Option<ReleaseEntry>>, ProjectionError> {
    let releases: Option<Vec<Option<ReleaseEntry>>> = serde_json::from_str(body)?;
    releases.ok_or(ProjectionError::NullResponse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poller::requests::RequestQueue;
    use crate::poller::table::{InMemoryTableStore, NOT_AVAILABLE};
    use pretty_assertions::assert_eq;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    const TABLE: &str = "repository_releases";
    const NEXT_PAGE_2: &str = r#"<https://api.github.com/repositories/1/releases?per_page=100&page=2>; rel="next", <https://api.github.com/repositories/1/releases?per_page=100&page=3>; rel="last""#;

    fn release(id: u64, tag: Option<&str>) -> String {
        let tag = tag.map_or("null".to_string(), |t| format!("\"{t}\""));
        format!(
            r#"{{"url":"https://api.github.com/repos/acme/widgets/releases/{id}","id":{id},"tag_name":{tag},"target_commitish":"main","name":"Release {id}","draft":false,"prerelease":false,"body":null,"author":{{"login":"octocat"}},"created_at":"2024-03-01T10:00:00Z","published_at":"2024-03-01T11:00:00Z"}}"#
        )
    }

    fn handle(body: &str, link: Option<&str>) -> (Outcome, InMemoryTableStore, RequestQueue) {
        let mut store = InMemoryTableStore::new();
        let mut queue = RequestQueue::new();
        let outcome = ReleasesProjector::new(TABLE, 100).handle_releases_response(
            &RawReleasesResponse::ok(body, link.map(str::to_string)),
            &mut store,
            &mut queue,
        );
        (outcome, store, queue)
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        /// Lines logged at `level` ("ERROR", "INFO", ...).
        fn lines_at(&self, level: &str) -> Vec<String> {
            let buf = self.0.lock().unwrap();
            String::from_utf8_lossy(&buf)
                .lines()
                .filter(|line| line.split_whitespace().next() == Some(level))
                .map(str::to_string)
                .collect()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn handle_logged(
        body: &str,
        link: Option<&str>,
    ) -> (Outcome, InMemoryTableStore, RequestQueue, CapturedLogs) {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .without_time()
            .with_target(false)
            .with_max_level(tracing::Level::TRACE)
            .finish();
        let (outcome, store, queue) =
            tracing::subscriber::with_default(subscriber, || handle(body, link));
        (outcome, store, queue, logs)
    }

    #[test]
    fn projects_rows_with_composite_keys() {
        let body = format!("[{}]", release(42, Some("v1.0")));
        let (outcome, store, queue) = handle(&body, None);

        let Outcome::Projected {
            identity,
            rows_written,
            continuation,
            ..
        } = outcome
        else {
            panic!("expected projected rows");
        };
        assert_eq!(identity.repository_key(), "acme/widgets");
        assert_eq!(rows_written, 1);
        assert!(continuation.is_none());
        assert!(queue.is_empty());

        let rows = store.rows(TABLE);
        assert_eq!(rows.len(), 1);
        let row = rows[0];
        assert_eq!(row.row_key, "acme/widgets/releases/42");
        assert_eq!(row.tag_reference, "acme/widgets/commits/v1.0");
        assert_eq!(row.repository_key, "acme/widgets");
        assert_eq!(row.author, "octocat");
        assert_eq!(row.target_commitish.as_deref(), Some("main"));
    }

    #[test]
    fn missing_tag_uses_sentinel() {
        let body = format!("[{}]", release(1, None));
        let (_, store, _) = handle(&body, None);

        let row = store.rows(TABLE)[0];
        assert_eq!(row.tag_name, NOT_AVAILABLE);
        assert_eq!(row.tag_reference, NOT_AVAILABLE);
    }

    #[test]
    fn skips_null_entries_and_entries_without_url() {
        let body = format!(
            r#"[{}, null, {{"id": 5, "url": null}}, {}]"#,
            release(1, Some("v1")),
            release(2, Some("v2"))
        );
        let (outcome, store, _) = handle(&body, None);

        let Outcome::Projected {
            rows_written,
            skipped,
            ..
        } = outcome
        else {
            panic!("expected projected rows");
        };
        assert_eq!(rows_written, 2);
        assert_eq!(skipped, vec![SkipReason::NullEntry, SkipReason::MissingUrl]);
        assert_eq!(store.len(TABLE), 2);
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn empty_array_writes_nothing() {
        let (outcome, store, queue) = handle("[]", Some(NEXT_PAGE_2));

        assert!(matches!(outcome, Outcome::Empty));
        assert_eq!(store.write_count(), 0);
        assert!(queue.is_empty());
    }

    #[test]
    fn malformed_body_fails_without_side_effects() {
        for body in ["{not json", r#"{"message":"Not Found"}"#, "42"] {
            let (outcome, store, queue) = handle(body, Some(NEXT_PAGE_2));

            assert!(
                matches!(outcome, Outcome::Failed(ProjectionError::Parse(_))),
                "{body}: {outcome:?}"
            );
            assert_eq!(store.write_count(), 0);
            assert!(queue.is_empty());
        }
    }

    #[test]
    fn null_scalars_do_not_drop_the_page() {
        let body = r#"[{"url":"https://api.github.com/repos/acme/widgets/releases/1","id":1,"draft":null,"prerelease":null}, {"url":"https://api.github.com/repos/acme/widgets/releases/2","id":null,"draft":false}]"#;
        let (outcome, store, _) = handle(body, None);

        let Outcome::Projected { rows_written, .. } = outcome else {
            panic!("expected projected rows");
        };
        assert_eq!(rows_written, 2);
        let keys: Vec<&str> = store.rows(TABLE).into_iter().map(|r| r.row_key.as_str()).collect();
        assert_eq!(keys, vec!["acme/widgets/releases/0", "acme/widgets/releases/1"]);
    }

    #[test]
    fn parse_failure_logs_one_error() {
        let (outcome, store, queue, logs) = handle_logged("{not json", Some(NEXT_PAGE_2));

        assert!(matches!(outcome, Outcome::Failed(_)));
        assert_eq!(logs.lines_at("ERROR").len(), 1);
        assert_eq!(store.write_count(), 0);
        assert!(queue.is_empty());
    }

    #[test]
    fn empty_array_logs_no_error() {
        let (outcome, _, _, logs) = handle_logged("[]", None);

        assert!(matches!(outcome, Outcome::Empty));
        assert!(logs.lines_at("ERROR").is_empty());
    }

    #[test]
    fn skipped_entries_log_at_info() {
        let body = format!(r#"[{}, null, {{"id": 5, "url": null}}]"#, release(1, Some("v1")));
        let (_, store, _, logs) = handle_logged(&body, None);

        let info = logs.lines_at("INFO");
        assert_eq!(info.len(), 2);
        assert!(info[0].contains("Release was null"));
        assert!(info[1].contains("Release url null"));
        assert!(logs.lines_at("ERROR").is_empty());
        assert_eq!(store.len(TABLE), 1);
    }

    #[test]
    fn null_body_fails() {
        let (outcome, store, _) = handle("null", None);
        assert!(matches!(outcome, Outcome::Failed(ProjectionError::NullResponse)));
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn upstream_failure_is_a_no_op() {
        let mut store = InMemoryTableStore::new();
        let mut queue = RequestQueue::new();
        let response = RawReleasesResponse {
            status_ok: false,
            body: format!("[{}]", release(1, None)),
            link_header: Some(NEXT_PAGE_2.to_string()),
        };
        let outcome =
            ReleasesProjector::new(TABLE, 100).handle_releases_response(&response, &mut store, &mut queue);

        assert!(matches!(outcome, Outcome::UpstreamFailure));
        assert_eq!(store.write_count(), 0);
        assert!(queue.is_empty());
    }

    #[test]
    fn next_link_issues_one_continuation() {
        let body = format!("[{}]", release(1, Some("v1")));
        let mut store = InMemoryTableStore::new();
        let mut queue = RequestQueue::new();
        let outcome = ReleasesProjector::new(TABLE, 30).handle_releases_response(
            &RawReleasesResponse::ok(body, Some(NEXT_PAGE_2.to_string())),
            &mut store,
            &mut queue,
        );

        let expected = ReleasesRequest {
            owner: "acme".to_string(),
            name: "widgets".to_string(),
            per_page: 30,
            page: 2,
        };
        let Outcome::Projected { continuation, .. } = outcome else {
            panic!("expected projected rows");
        };
        assert_eq!(continuation, Some(expected.clone()));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.pop(), Some(expected));
    }

    #[test]
    fn empty_or_last_page_link_stops_pagination() {
        let body = format!("[{}]", release(1, Some("v1")));
        let last = r#"<https://api.github.com/repositories/1/releases?page=2>; rel="prev""#;
        for link in [None, Some(""), Some(last)] {
            let (_, _, queue) = handle(&body, link);
            assert!(queue.is_empty(), "{link:?}");
        }
    }

    #[test]
    fn identity_comes_from_first_entry_only() {
        let body = format!(r#"[null, {}]"#, release(9, Some("v9")));
        let (outcome, store, _) = handle(&body, None);

        let Outcome::Projected { identity, .. } = outcome else {
            panic!("expected projected rows");
        };
        assert!(identity.is_empty());
        let row = store.rows(TABLE)[0];
        assert_eq!(row.row_key, "//releases/9");
        assert_eq!(row.repository_key, "/");
    }

    #[test]
    fn replaying_a_page_is_idempotent() {
        let body = format!("[{}, {}]", release(1, Some("v1")), release(2, Some("v2")));
        let projector = ReleasesProjector::new(TABLE, 100);
        let response = RawReleasesResponse::ok(body, None);
        let mut store = InMemoryTableStore::new();
        let mut queue = RequestQueue::new();

        projector.handle_releases_response(&response, &mut store, &mut queue);
        let first: Vec<ReleaseRow> = store.rows(TABLE).into_iter().cloned().collect();
        projector.handle_releases_response(&response, &mut store, &mut queue);
        let second: Vec<ReleaseRow> = store.rows(TABLE).into_iter().cloned().collect();

        assert_eq!(first, second);
        assert_eq!(second.len(), 2);
    }
}

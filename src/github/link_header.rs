use std::collections::HashMap;

/// Pagination relations parsed out of a GitHub `Link` header.
///
/// `<https://api.github.com/repositories/1/releases?per_page=100&page=2>; rel="next", <...&page=5>; rel="last"`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkHeader {
    pages: HashMap<String, u32>,
}

impl LinkHeader {
    pub fn parse(value: &str) -> Self {
        let mut pages = HashMap::new();

        for link in value.split(',') {
            let mut parts = link.split(';');
            let Some(target) = parts.next() else {
                continue;
            };
            let target = target.trim();
            let Some(url) = target.strip_prefix('<').and_then(|t| t.strip_suffix('>')) else {
                continue;
            };
            let Some(page) = page_param(url) else {
                continue;
            };

            for param in parts {
                let Some((key, rel)) = param.split_once('=') else {
                    continue;
                };
                if key.trim() != "rel" {
                    continue;
                }
                // rel may hold several space separated relation types
                for rel in rel.trim().trim_matches('"').split_whitespace() {
                    pages.insert(rel.to_lowercase(), page);
                }
            }
        }

        Self { pages }
    }

    pub fn next_page(&self) -> Option<u32> {
        self.pages.get("next").copied()
    }

    pub fn prev_page(&self) -> Option<u32> {
        self.pages.get("prev").copied()
    }

    pub fn last_page(&self) -> Option<u32> {
        self.pages.get("last").copied()
    }

    pub fn has_next(&self) -> bool {
        self.next_page().is_some()
    }

    /// GitHub never links the current page, so derive it from its neighbours.
    pub fn current_page(&self) -> u32 {
        if let Some(next) = self.next_page() {
            next.saturating_sub(1).max(1)
        } else if let Some(prev) = self.prev_page() {
            prev.saturating_add(1)
        } else {
            1
        }
    }
}

fn page_param(url: &str) -> Option<u32> {
    let (_, query) = url.split_once('?')?;
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "page")
        .and_then(|(_, value)| value.parse().ok())
}

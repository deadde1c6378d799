//! Category Walker: lazy, cursor-paginated enumeration of category members.

use crate::api::{self, WikiApi};
use crate::config::CATEGORY_PAGE_LIMIT;
use crate::error::ApiError;
use rustc_hash::FxHashSet;
use serde::Deserialize;
use std::collections::VecDeque;
use tracing::{debug, info, warn};

/// Namespaces whose pages are never content, matched as `Prefix:` at the
/// start of a title.
const NON_CONTENT_NAMESPACES: &[&str] = &[
    "file",
    "image",
    "category",
    "template",
    "module",
    "user",
    "help",
    "special",
    "mediawiki",
    "project",
    "talk",
    "update",
    "transcript",
    "exchange",
    "calculator",
    "map",
];

const DISAMBIGUATION_MARKERS: &[&str] = &["(disambiguation)", "(redirect)"];

#[derive(Deserialize)]
struct MembersResponse {
    query: MembersQuery,
    #[serde(rename = "continue")]
    continuation: Option<Continuation>,
}

#[derive(Deserialize)]
struct MembersQuery {
    #[serde(default)]
    categorymembers: Vec<Member>,
}

#[derive(Deserialize)]
struct Member {
    title: String,
    #[serde(default)]
    ns: i64,
}

#[derive(Deserialize)]
struct Continuation {
    cmcontinue: Option<String>,
}

/// Pagination state of one walk.
#[derive(Debug)]
pub struct CategoryCursor {
    pub category: String,
    pub token: Option<String>,
    pub yielded: FxHashSet<String>,
    pub requests: u64,
}

impl CategoryCursor {
    fn new(category: &str) -> Self {
        Self {
            category: category.to_string(),
            token: None,
            yielded: FxHashSet::default(),
            requests: 0,
        }
    }
}

/// True for titles in a non-content namespace or carrying a
/// disambiguation/redirect marker.
pub fn is_excluded_title(title: &str) -> bool {
    let lower = title.to_lowercase();
    if let Some((prefix, _)) = lower.split_once(':') {
        let prefix = prefix.trim();
        let base = prefix.strip_suffix(" talk").unwrap_or(prefix);
        if NON_CONTENT_NAMESPACES.contains(&base) {
            return true;
        }
    }
    let lower = lower.trim_end();
    DISAMBIGUATION_MARKERS.iter().any(|m| lower.ends_with(m))
}

/// Yields each content title of a category once. After a failed request the
/// walker yields that error once and then ends; everything yielded before it
/// stays valid but the walk is incomplete.
pub struct CategoryWalker<'a, A: WikiApi + ?Sized> {
    api: &'a A,
    cursor: CategoryCursor,
    sentinels: FxHashSet<String>,
    buffer: VecDeque<String>,
    started: bool,
    finished: bool,
}

impl<'a, A: WikiApi + ?Sized> CategoryWalker<'a, A> {
    pub fn new(api: &'a A, category: &str) -> Self {
        Self {
            api,
            cursor: CategoryCursor::new(category),
            sentinels: FxHashSet::default(),
            buffer: VecDeque::new(),
            started: false,
            finished: false,
        }
    }

    /// Titles to skip outright, such as the category's own umbrella page.
    pub fn with_sentinels<S: AsRef<str>>(mut self, sentinels: &[S]) -> Self {
        self.sentinels = sentinels.iter().map(|s| s.as_ref().to_string()).collect();
        self
    }

    pub fn cursor(&self) -> &CategoryCursor {
        &self.cursor
    }

    fn fetch_batch(&mut self) -> Result<(), ApiError> {
        let mut params = vec![
            ("action", "query".to_string()),
            ("list", "categorymembers".to_string()),
            ("cmtitle", self.cursor.category.clone()),
            ("cmlimit", CATEGORY_PAGE_LIMIT.to_string()),
        ];
        if let Some(token) = &self.cursor.token {
            params.push(("cmcontinue", token.clone()));
        }

        self.cursor.requests += 1;
        let value = api::request(self.api, &params)?;
        let parsed: MembersResponse = serde_json::from_value(value).map_err(|e| {
            ApiError::Malformed(format!(
                "categorymembers response for '{}': {}",
                self.cursor.category, e
            ))
        })?;

        let fetched = parsed.query.categorymembers.len();
        for member in parsed.query.categorymembers {
            if member.ns != 0 || is_excluded_title(&member.title) {
                debug!(title = %member.title, "Skipping non-content title");
                continue;
            }
            if self.sentinels.contains(&member.title) {
                debug!(title = %member.title, "Skipping sentinel title");
                continue;
            }
            if self.cursor.yielded.insert(member.title.clone()) {
                self.buffer.push_back(member.title);
            }
        }

        self.cursor.token = parsed.continuation.and_then(|c| c.cmcontinue);
        debug!(
            category = %self.cursor.category,
            fetched,
            more = self.cursor.token.is_some(),
            "Fetched category batch"
        );
        Ok(())
    }
}

impl<A: WikiApi + ?Sized> Iterator for CategoryWalker<'_, A> {
    type Item = Result<String, ApiError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(title) = self.buffer.pop_front() {
                return Some(Ok(title));
            }
            if self.finished {
                return None;
            }
            if self.started && self.cursor.token.is_none() {
                self.finished = true;
                info!(
                    category = %self.cursor.category,
                    titles = self.cursor.yielded.len(),
                    requests = self.cursor.requests,
                    "Category walk complete"
                );
                return None;
            }
            self.started = true;
            if let Err(e) = self.fetch_batch() {
                self.finished = true;
                warn!(
                    category = %self.cursor.category,
                    titles = self.cursor.yielded.len(),
                    error = %e,
                    "Category walk ended early"
                );
                return Some(Err(e));
            }
        }
    }
}

/// A fully drained walk. `error` set means `titles` is a partial listing.
#[derive(Debug)]
pub struct WalkOutcome {
    pub titles: Vec<String>,
    pub error: Option<ApiError>,
}

impl WalkOutcome {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

pub fn walk<A: WikiApi + ?Sized>(api: &A, category: &str, sentinels: &[&str]) -> WalkOutcome {
    let mut titles = Vec::new();
    let mut error = None;
    for item in CategoryWalker::new(api, category).with_sentinels(sentinels) {
        match item {
            Ok(title) => titles.push(title),
            Err(e) => error = Some(e),
        }
    }
    WalkOutcome { titles, error }
}

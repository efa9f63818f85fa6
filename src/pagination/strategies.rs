//! Pagination strategy implementations
//!
//! Each strategy handles a specific pagination pattern.

use super::types::{
    check_stop_condition, Continuation, CursorSource, CursorTarget, NextPage, PaginationState,
    Paginator, StopCondition, StopResult,
};
use crate::types::{lookup_string, JsonValue};
use reqwest::header::HeaderMap;

// ============================================================================
// Cursor Pagination
// ============================================================================

/// Cursor-based pagination (e.g., Stripe, Slack)
///
/// Reads an opaque token from the page and injects it into the next request.
/// A missing or empty token ends pagination.
#[derive(Debug, Clone)]
pub struct CursorPaginator {
    /// Where the token is read
    pub source: CursorSource,
    /// Where the token is injected
    pub target: CursorTarget,
    /// Stop condition
    pub stop_condition: StopCondition,
}

impl CursorPaginator {
    /// Create a new cursor paginator
    pub fn new(source: CursorSource, target: CursorTarget, stop_condition: StopCondition) -> Self {
        Self {
            source,
            target,
            stop_condition,
        }
    }

    fn read_token(&self, body: &JsonValue, headers: &HeaderMap) -> Option<String> {
        let token = match &self.source {
            CursorSource::Body { path } => lookup_string(body, path),
            CursorSource::Header { name } => headers
                .get(name.as_str())
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        };
        token.filter(|t| !t.is_empty())
    }

    fn inject(&self, token: String) -> Continuation {
        match &self.target {
            CursorTarget::Query { param } => Continuation::new().query(param, token),
            CursorTarget::Header { name } => Continuation::new().header(name, token),
            CursorTarget::BodyField { path } => Continuation::new().body_field(path, token),
        }
    }
}

impl Paginator for CursorPaginator {
    fn initial(&self, _state: &mut PaginationState) -> Continuation {
        Continuation::new()
    }

    fn process_response(
        &self,
        body: &JsonValue,
        headers: &HeaderMap,
        records_count: usize,
        state: &mut PaginationState,
    ) -> NextPage {
        if check_stop_condition(&self.stop_condition, body, records_count, state)
            == StopResult::Stop
        {
            state.mark_done();
            return NextPage::Done;
        }

        match self.read_token(body, headers) {
            Some(token) => {
                state.set_cursor(token.clone());
                NextPage::Continue(self.inject(token))
            }
            None => {
                state.mark_done();
                NextPage::Done
            }
        }
    }
}

// ============================================================================
// Offset Pagination
// ============================================================================

/// Offset-based pagination (e.g., SQL-style pagination)
///
/// Uses offset and limit parameters to paginate.
/// Common patterns:
/// - `?offset=100&limit=50`
/// - `?skip=100&take=50`
#[derive(Debug, Clone)]
pub struct OffsetPaginator {
    /// Query parameter name for offset
    pub offset_param: String,
    /// Query parameter name for limit
    pub limit_param: String,
    /// Number of records per page
    pub limit_value: u32,
    /// Stop condition
    pub stop_condition: StopCondition,
}

impl OffsetPaginator {
    /// Create a new offset paginator
    pub fn new(
        offset_param: impl Into<String>,
        limit_param: impl Into<String>,
        limit_value: u32,
        stop_condition: StopCondition,
    ) -> Self {
        Self {
            offset_param: offset_param.into(),
            limit_param: limit_param.into(),
            limit_value,
            stop_condition,
        }
    }

    fn params(&self, state: &PaginationState) -> Continuation {
        Continuation::new()
            .query(&self.offset_param, state.offset.to_string())
            .query(&self.limit_param, self.limit_value.to_string())
    }
}

impl Paginator for OffsetPaginator {
    fn initial(&self, state: &mut PaginationState) -> Continuation {
        self.params(state)
    }

    fn process_response(
        &self,
        body: &JsonValue,
        _headers: &HeaderMap,
        records_count: usize,
        state: &mut PaginationState,
    ) -> NextPage {
        if check_stop_condition(&self.stop_condition, body, records_count, state)
            == StopResult::Stop
        {
            state.mark_done();
            return NextPage::Done;
        }

        // A short page is the last one
        if records_count < self.limit_value as usize {
            state.mark_done();
            return NextPage::Done;
        }

        state.add_offset(u64::from(self.limit_value));
        NextPage::Continue(self.params(state))
    }
}

// ============================================================================
// Page Number Pagination
// ============================================================================

/// Page number pagination (e.g., traditional web pagination)
///
/// Uses page number parameter to paginate.
/// Common patterns:
/// - `?page=2`
/// - `?page=2&per_page=50`
#[derive(Debug, Clone)]
pub struct PageNumberPaginator {
    /// Query parameter name for page number
    pub page_param: String,
    /// First page number (usually 0 or 1)
    pub start_page: u32,
    /// Optional page size parameter name
    pub page_size_param: Option<String>,
    /// Page size value
    pub page_size: Option<u32>,
    /// Stop condition
    pub stop_condition: StopCondition,
}

impl PageNumberPaginator {
    /// Create a new page number paginator
    pub fn new(page_param: impl Into<String>, start_page: u32) -> Self {
        Self {
            page_param: page_param.into(),
            start_page,
            page_size_param: None,
            page_size: None,
            stop_condition: StopCondition::EmptyPage,
        }
    }

    /// Set page size parameter
    #[must_use]
    pub fn with_page_size(mut self, param: impl Into<String>, size: u32) -> Self {
        self.page_size_param = Some(param.into());
        self.page_size = Some(size);
        self
    }

    /// Set stop condition
    #[must_use]
    pub fn with_stop_condition(mut self, condition: StopCondition) -> Self {
        self.stop_condition = condition;
        self
    }

    fn params(&self, state: &PaginationState) -> Continuation {
        let mut params = Continuation::new().query(&self.page_param, state.page.to_string());
        if let (Some(param), Some(size)) = (&self.page_size_param, self.page_size) {
            params = params.query(param, size.to_string());
        }
        params
    }
}

impl Paginator for PageNumberPaginator {
    fn initial(&self, state: &mut PaginationState) -> Continuation {
        state.page = self.start_page;
        self.params(state)
    }

    fn process_response(
        &self,
        body: &JsonValue,
        _headers: &HeaderMap,
        records_count: usize,
        state: &mut PaginationState,
    ) -> NextPage {
        if check_stop_condition(&self.stop_condition, body, records_count, state)
            == StopResult::Stop
        {
            state.mark_done();
            return NextPage::Done;
        }

        if let Some(size) = self.page_size {
            if records_count < size as usize {
                state.mark_done();
                return NextPage::Done;
            }
        }

        state.next_page();
        NextPage::Continue(self.params(state))
    }
}

// ============================================================================
// Link Header Pagination
// ============================================================================

/// Link header pagination (RFC 5988)
///
/// Extracts next page URL from the Link header.
/// Common in GitHub, GitLab APIs.
/// Format: `Link: <https://api.github.com/...?page=2>; rel="next", ...`
#[derive(Debug, Clone)]
pub struct LinkHeaderPaginator {
    /// Rel value to follow (default: "next")
    pub rel: String,
}

impl Default for LinkHeaderPaginator {
    fn default() -> Self {
        Self {
            rel: "next".to_string(),
        }
    }
}

impl LinkHeaderPaginator {
    /// Create a new link header paginator
    pub fn new(rel: impl Into<String>) -> Self {
        Self { rel: rel.into() }
    }
}

impl Paginator for LinkHeaderPaginator {
    fn initial(&self, _state: &mut PaginationState) -> Continuation {
        Continuation::new()
    }

    fn process_response(
        &self,
        _body: &JsonValue,
        headers: &HeaderMap,
        _records_count: usize,
        state: &mut PaginationState,
    ) -> NextPage {
        let next = headers
            .get_all("link")
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(|header| parse_link_header(header, &self.rel));

        match next {
            Some(url) => {
                state.next_page();
                NextPage::with_url(url)
            }
            None => {
                state.mark_done();
                NextPage::Done
            }
        }
    }
}

/// Parse a Link header and extract the URL for the given rel
pub(crate) fn parse_link_header(header: &str, target_rel: &str) -> Option<String> {
    // Link header format: <url>; rel="next", <url>; rel="prev"
    for part in header.split(',') {
        let part = part.trim();
        let mut url = None;
        let mut rel = None;

        for segment in part.split(';') {
            let segment = segment.trim();
            if segment.starts_with('<') && segment.ends_with('>') {
                url = Some(&segment[1..segment.len() - 1]);
            } else if let Some(stripped) = segment.strip_prefix("rel=") {
                rel = Some(stripped.trim_matches('"').trim_matches('\''));
            }
        }

        if let (Some(u), Some(r)) = (url, rel) {
            if r.split_whitespace().any(|r| r == target_rel) {
                return Some(u.to_string());
            }
        }
    }

    None
}

// ============================================================================
// Next URL Pagination
// ============================================================================

/// Next URL pagination (URL in response body)
///
/// Extracts next page URL from a field in the response body.
/// Common patterns:
/// - `{ "next": "https://api.example.com/items?page=2" }`
/// - `{ "pagination": { "next_url": "..." } }`
#[derive(Debug, Clone)]
pub struct NextUrlPaginator {
    /// Dotted path to the next URL
    pub path: String,
}

impl NextUrlPaginator {
    /// Create a new next URL paginator
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl Paginator for NextUrlPaginator {
    fn initial(&self, _state: &mut PaginationState) -> Continuation {
        Continuation::new()
    }

    fn process_response(
        &self,
        body: &JsonValue,
        _headers: &HeaderMap,
        _records_count: usize,
        state: &mut PaginationState,
    ) -> NextPage {
        match lookup_string(body, &self.path).filter(|url| !url.is_empty()) {
            Some(url) => {
                state.next_page();
                NextPage::with_url(url)
            }
            None => {
                state.mark_done();
                NextPage::Done
            }
        }
    }
}

// ============================================================================
// No Pagination
// ============================================================================

/// No pagination - single request
#[derive(Debug, Clone, Default)]
pub struct NoPaginator;

impl Paginator for NoPaginator {
    fn initial(&self, _state: &mut PaginationState) -> Continuation {
        Continuation::new()
    }

    fn process_response(
        &self,
        _body: &JsonValue,
        _headers: &HeaderMap,
        _records_count: usize,
        state: &mut PaginationState,
    ) -> NextPage {
        state.mark_done();
        NextPage::Done
    }
}

//! Pagination types and traits
//!
//! Defines the continuation model shared by all strategies and the
//! serializable configuration that selects one.

use super::strategies::{
    CursorPaginator, LinkHeaderPaginator, NextUrlPaginator, NoPaginator, OffsetPaginator,
    PageNumberPaginator,
};
use crate::types::{lookup_path, lookup_string, JsonValue};
use indexmap::IndexMap;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};

/// Request changes that select the next page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Continuation {
    /// Query parameters to add/replace
    pub query: IndexMap<String, String>,
    /// Headers to add/replace
    pub headers: IndexMap<String, String>,
    /// JSON body fields (dotted paths) to add/replace
    pub body_fields: IndexMap<String, JsonValue>,
    /// Replacement URL (next_url and link header pagination)
    pub url: Option<String>,
}

impl Continuation {
    /// An empty continuation (no request changes)
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a query parameter
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set a body field
    #[must_use]
    pub fn body_field(mut self, path: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.body_fields.insert(path.into(), value.into());
        self
    }

    /// Replace the URL
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// True when nothing would change on the request
    pub fn is_empty(&self) -> bool {
        self.query.is_empty()
            && self.headers.is_empty()
            && self.body_fields.is_empty()
            && self.url.is_none()
    }
}

/// Result of the next page computation
#[derive(Debug, Clone, PartialEq)]
pub enum NextPage {
    /// More pages available
    Continue(Continuation),
    /// No more pages
    Done,
}

impl NextPage {
    /// Create a continuation with a single query parameter
    pub fn with_param(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Continue(Continuation::new().query(key, value))
    }

    /// Create a continuation with a new URL
    pub fn with_url(url: impl Into<String>) -> Self {
        Self::Continue(Continuation::new().url(url))
    }

    /// Check if this is a done result
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Check if this is a continue result
    pub fn is_continue(&self) -> bool {
        matches!(self, Self::Continue(_))
    }
}

/// Where a cursor token is read from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "from", rename_all = "snake_case")]
pub enum CursorSource {
    /// Dotted path in the response body
    Body { path: String },
    /// Response header
    Header { name: String },
}

/// Where a cursor token is injected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "to", rename_all = "snake_case")]
pub enum CursorTarget {
    /// Query parameter
    Query { param: String },
    /// Request header
    Header { name: String },
    /// Dotted path in the JSON request body
    BodyField { path: String },
}

/// Configuration for pagination behavior
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaginationConfig {
    /// No pagination
    #[default]
    None,

    /// Cursor-based pagination (e.g., Stripe, Slack)
    Cursor {
        /// Where the next token is read
        source: CursorSource,
        /// Where the token is injected
        target: CursorTarget,
        /// Stop condition checked before reading the token
        #[serde(default = "StopCondition::never")]
        stop: StopCondition,
    },

    /// Offset-based pagination
    Offset {
        /// Query parameter name for offset
        offset_param: String,
        /// Query parameter name for limit
        limit_param: String,
        /// Number of records per page
        limit: u32,
        /// Stop condition
        #[serde(default)]
        stop: StopCondition,
    },

    /// Page number pagination
    PageNumber {
        /// Query parameter name for page number
        page_param: String,
        /// First page number (usually 0 or 1)
        #[serde(default = "default_start_page")]
        start_page: u32,
        /// Optional page size parameter name
        #[serde(default)]
        page_size_param: Option<String>,
        /// Page size value
        #[serde(default)]
        page_size: Option<u32>,
        /// Stop condition
        #[serde(default)]
        stop: StopCondition,
    },

    /// Link header pagination (RFC 5988)
    LinkHeader {
        /// Rel value to follow
        #[serde(default = "default_rel")]
        rel: String,
    },

    /// Next URL in response body
    NextUrl {
        /// Dotted path to the next URL
        path: String,
    },
}

fn default_start_page() -> u32 {
    1
}

fn default_rel() -> String {
    "next".to_string()
}

impl PaginationConfig {
    /// Cursor read from a body path and sent as a query parameter
    pub fn cursor(param: impl Into<String>, path: impl Into<String>) -> Self {
        Self::Cursor {
            source: CursorSource::Body { path: path.into() },
            target: CursorTarget::Query {
                param: param.into(),
            },
            stop: StopCondition::Never,
        }
    }

    /// Create offset pagination config
    pub fn offset(
        offset_param: impl Into<String>,
        limit_param: impl Into<String>,
        limit: u32,
        stop: StopCondition,
    ) -> Self {
        Self::Offset {
            offset_param: offset_param.into(),
            limit_param: limit_param.into(),
            limit,
            stop,
        }
    }

    /// Create page number pagination config
    pub fn page_number(page_param: impl Into<String>, start_page: u32) -> Self {
        Self::PageNumber {
            page_param: page_param.into(),
            start_page,
            page_size_param: None,
            page_size: None,
            stop: StopCondition::EmptyPage,
        }
    }

    /// Create link header pagination config
    pub fn link_header(rel: impl Into<String>) -> Self {
        Self::LinkHeader { rel: rel.into() }
    }

    /// Create next URL pagination config
    pub fn next_url(path: impl Into<String>) -> Self {
        Self::NextUrl { path: path.into() }
    }

    /// Build the strategy for this configuration
    pub fn paginator(&self) -> Box<dyn Paginator> {
        match self {
            Self::None => Box::new(NoPaginator),
            Self::Cursor {
                source,
                target,
                stop,
            } => Box::new(CursorPaginator::new(
                source.clone(),
                target.clone(),
                stop.clone(),
            )),
            Self::Offset {
                offset_param,
                limit_param,
                limit,
                stop,
            } => Box::new(OffsetPaginator::new(
                offset_param,
                limit_param,
                *limit,
                stop.clone(),
            )),
            Self::PageNumber {
                page_param,
                start_page,
                page_size_param,
                page_size,
                stop,
            } => {
                let mut paginator = PageNumberPaginator::new(page_param, *start_page)
                    .with_stop_condition(stop.clone());
                if let (Some(param), Some(size)) = (page_size_param, page_size) {
                    paginator = paginator.with_page_size(param, *size);
                }
                Box::new(paginator)
            }
            Self::LinkHeader { rel } => Box::new(LinkHeaderPaginator::new(rel)),
            Self::NextUrl { path } => Box::new(NextUrlPaginator::new(path)),
        }
    }
}

/// Stop conditions for pagination
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StopCondition {
    /// Stop when page is empty (no records)
    #[default]
    EmptyPage,

    /// Stop when a field has a specific value
    Field {
        /// Dotted path to the field
        path: String,
        /// Expected value to stop
        value: JsonValue,
    },

    /// Stop when the number of fetched records reaches a total
    TotalCount {
        /// Dotted path to total count field
        path: String,
    },

    /// Stop when the number of fetched pages reaches a total
    TotalPages {
        /// Dotted path to total pages field
        path: String,
    },

    /// Never stop early; pagination ends when no continuation is found
    Never,
}

impl StopCondition {
    /// Create a field-based stop condition
    pub fn field(path: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        Self::Field {
            path: path.into(),
            value: value.into(),
        }
    }

    /// Create a total count stop condition
    pub fn total_count(path: impl Into<String>) -> Self {
        Self::TotalCount { path: path.into() }
    }

    /// Create a total pages stop condition
    pub fn total_pages(path: impl Into<String>) -> Self {
        Self::TotalPages { path: path.into() }
    }

    fn never() -> Self {
        Self::Never
    }
}

/// Result of checking a stop condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopResult {
    /// Continue pagination
    Continue,
    /// Stop pagination
    Stop,
}

impl StopResult {
    /// Check if we should continue
    pub fn should_continue(&self) -> bool {
        matches!(self, Self::Continue)
    }

    /// Check if we should stop
    pub fn should_stop(&self) -> bool {
        matches!(self, Self::Stop)
    }
}

/// Per-request pagination state. Never shared between logical requests.
#[derive(Debug, Clone, Default)]
pub struct PaginationState {
    /// Current page number (for page-based pagination)
    pub page: u32,
    /// Current offset (for offset-based pagination)
    pub offset: u64,
    /// Last cursor value
    pub cursor: Option<String>,
    /// Pages processed so far
    pub pages: usize,
    /// Total records fetched so far
    pub total_fetched: u64,
    /// Is pagination complete?
    pub done: bool,
}

impl PaginationState {
    /// Create a new pagination state
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark pagination as complete
    pub fn mark_done(&mut self) {
        self.done = true;
    }

    /// Increment page number
    pub fn next_page(&mut self) {
        self.page += 1;
    }

    /// Add offset
    pub fn add_offset(&mut self, amount: u64) {
        self.offset += amount;
    }

    /// Set cursor
    pub fn set_cursor(&mut self, cursor: String) {
        self.cursor = Some(cursor);
    }

    /// Record one processed page
    pub fn add_page(&mut self, records: usize) {
        self.pages += 1;
        self.total_fetched += records as u64;
    }
}

/// Core trait for pagination strategies
pub trait Paginator: Send + Sync {
    /// Request changes for the first page; may seed the state
    fn initial(&self, state: &mut PaginationState) -> Continuation;

    /// Process a page and determine if there's a next one
    fn process_response(
        &self,
        body: &JsonValue,
        headers: &HeaderMap,
        records_count: usize,
        state: &mut PaginationState,
    ) -> NextPage;
}

/// Check a stop condition against a page. `state` already includes the page.
pub fn check_stop_condition(
    condition: &StopCondition,
    body: &JsonValue,
    records_count: usize,
    state: &PaginationState,
) -> StopResult {
    let stop = match condition {
        StopCondition::EmptyPage => records_count == 0,
        StopCondition::Field { path, value } => lookup_path(body, path) == Some(value),
        StopCondition::TotalCount { path } => lookup_string(body, path)
            .and_then(|s| s.parse::<u64>().ok())
            .is_some_and(|total| state.total_fetched >= total),
        StopCondition::TotalPages { path } => lookup_string(body, path)
            .and_then(|s| s.parse::<usize>().ok())
            .is_some_and(|total| state.pages >= total),
        StopCondition::Never => false,
    };
    if stop {
        StopResult::Stop
    } else {
        StopResult::Continue
    }
}

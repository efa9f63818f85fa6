//! Pagination transport decorator
//!
//! Wraps any [`Transport`] and turns one logical request into as many
//! physical requests as the provider needs, returning one merged response.

use super::types::{Continuation, NextPage, PaginationConfig, PaginationState};
use crate::error::{Error, Result};
use crate::http::{HttpRequest, HttpResponse, Transport};
use crate::types::{lookup_path, JsonObject, JsonValue};
use async_trait::async_trait;
use reqwest::header::CONTENT_LENGTH;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

/// Default ceiling on chained pages per logical request
pub const DEFAULT_MAX_PAGES: usize = 1000;

/// Records of one logical request
#[derive(Debug, Clone, Default)]
pub struct FetchedRecords {
    /// All records in page order
    pub records: Vec<JsonValue>,
    /// Physical pages fetched
    pub pages: usize,
}

/// Accumulated pages before the response is assembled
struct Collected {
    first_body: JsonValue,
    last: HttpResponse,
    records: Vec<JsonValue>,
    pages: usize,
}

/// Makes multi-page responses look like a single page
#[derive(Debug, Clone)]
pub struct PaginatingTransport<T> {
    inner: T,
    pagination: PaginationConfig,
    records_path: String,
    max_pages: usize,
}

impl<T: Transport> PaginatingTransport<T> {
    /// Wrap a transport. The record array is the response body itself until
    /// [`with_records_path`](Self::with_records_path) says otherwise.
    pub fn new(inner: T, pagination: PaginationConfig) -> Self {
        Self {
            inner,
            pagination,
            records_path: String::new(),
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    /// Dotted path to the record array (same in every page)
    #[must_use]
    pub fn with_records_path(mut self, path: impl Into<String>) -> Self {
        self.records_path = path.into();
        self
    }

    /// Cap the number of chained pages
    #[must_use]
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    /// The wrapped transport
    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Pagination strategy configuration
    pub fn pagination(&self) -> &PaginationConfig {
        &self.pagination
    }

    /// Record array path
    pub fn records_path(&self) -> &str {
        &self.records_path
    }

    /// Send a logical request that aborts when `cancel` fires
    pub async fn send_with_cancel(
        &self,
        request: HttpRequest,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse> {
        let collected = self.collect(request, cancel).await?;
        self.assemble(collected)
    }

    /// Fetch every record of a logical request
    pub async fn fetch_records(&self, request: HttpRequest) -> Result<Vec<JsonValue>> {
        let fetched = self
            .fetch_records_with_cancel(request, &CancellationToken::new())
            .await?;
        Ok(fetched.records)
    }

    /// Fetch every record of a logical request, with page count
    pub async fn fetch_records_with_cancel(
        &self,
        request: HttpRequest,
        cancel: &CancellationToken,
    ) -> Result<FetchedRecords> {
        let collected = self.collect(request, cancel).await?;
        Ok(FetchedRecords {
            records: collected.records,
            pages: collected.pages,
        })
    }

    async fn collect(&self, request: HttpRequest, cancel: &CancellationToken) -> Result<Collected> {
        let paginator = self.pagination.paginator();
        let mut state = PaginationState::new();
        let mut request = apply_continuation(request, paginator.initial(&mut state))?;

        let mut first_body = None;
        let mut records = Vec::new();

        loop {
            if cancel.is_cancelled() {
                return Err(Error::PaginationCancelled { pages: state.pages });
            }

            let response = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    return Err(Error::PaginationCancelled { pages: state.pages });
                }
                response = self.inner.send(request.clone()) => response?,
            };
            let response = response.error_for_status()?;

            let body = response.json()?;
            let page = extract_records(&body, &self.records_path)?;
            let count = page.len();
            records.extend(page);
            state.add_page(count);

            debug!(
                url = %request.url,
                page = state.pages,
                records = count,
                "fetched page"
            );

            let next = paginator.process_response(&body, &response.headers, count, &mut state);
            if first_body.is_none() {
                first_body = Some(body);
            }

            match next {
                NextPage::Done => {
                    return Ok(Collected {
                        first_body: first_body.unwrap_or(JsonValue::Null),
                        last: response,
                        records,
                        pages: state.pages,
                    });
                }
                NextPage::Continue(continuation) => {
                    if state.pages >= self.max_pages {
                        return Err(Error::PaginationOverflow {
                            max_pages: self.max_pages,
                        });
                    }
                    request = apply_continuation(request, continuation)?;
                }
            }
        }
    }

    /// First page body with the record array replaced, last page metadata
    fn assemble(&self, collected: Collected) -> Result<HttpResponse> {
        let Collected {
            first_body,
            last,
            records,
            pages,
        } = collected;

        let body = if self.records_path.is_empty() {
            JsonValue::Array(records)
        } else {
            let mut body = first_body;
            set_path(&mut body, &self.records_path, JsonValue::Array(records))?;
            body
        };

        let mut headers = last.headers;
        headers.remove(CONTENT_LENGTH);

        debug!(pages, "merged paginated response");
        Ok(HttpResponse::new(last.status, headers, serde_json::to_vec(&body)?))
    }
}

#[async_trait]
impl<T: Transport> Transport for PaginatingTransport<T> {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.send_with_cancel(request, &CancellationToken::new()).await
    }
}

/// Read the record array of one page. A missing array is an empty page.
pub(crate) fn extract_records(body: &JsonValue, path: &str) -> Result<Vec<JsonValue>> {
    match lookup_path(body, path) {
        None | Some(JsonValue::Null) => Ok(Vec::new()),
        Some(JsonValue::Array(items)) => Ok(items.clone()),
        Some(other) => Err(Error::extraction(
            path,
            format!("expected an array, found {}", json_kind(other)),
        )),
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

/// Inject a continuation, keeping every other property of the request
fn apply_continuation(mut request: HttpRequest, continuation: Continuation) -> Result<HttpRequest> {
    if let Some(next_url) = continuation.url {
        let resolved = resolve_url(&request.url, &next_url);
        // The next URL carries its own query string; drop params it overrides
        if let Ok(parsed) = Url::parse(&resolved) {
            for (key, _) in parsed.query_pairs() {
                request.config.query.shift_remove(key.as_ref());
            }
        }
        request.url = resolved;
    }

    request.config.query.extend(continuation.query);
    request.config.headers.extend(continuation.headers);

    if !continuation.body_fields.is_empty() {
        let mut body = request
            .config
            .body
            .take()
            .unwrap_or_else(|| JsonValue::Object(JsonObject::new()));
        for (path, value) in continuation.body_fields {
            set_path(&mut body, &path, value)?;
        }
        request.config.body = Some(body);
    }

    Ok(request)
}

/// Resolve a possibly-relative next URL against the current one
fn resolve_url(current: &str, next: &str) -> String {
    if Url::parse(next).is_ok() {
        return next.to_string();
    }
    match Url::parse(current).and_then(|base| base.join(next)) {
        Ok(url) => url.to_string(),
        Err(_) => next.to_string(),
    }
}

/// Set a value at a dotted path, creating intermediate objects
pub(crate) fn set_path(target: &mut JsonValue, path: &str, value: JsonValue) -> Result<()> {
    let path = path.strip_prefix('$').unwrap_or(path);
    let path = path.strip_prefix('.').unwrap_or(path);
    if path.is_empty() {
        *target = value;
        return Ok(());
    }

    let mut current = target;
    let mut parts = path.split('.').peekable();
    while let Some(part) = parts.next() {
        if current.is_null() {
            *current = JsonValue::Object(JsonObject::new());
        }
        let JsonValue::Object(map) = current else {
            return Err(Error::extraction(path, format!("'{part}' is not inside an object")));
        };
        if parts.peek().is_none() {
            map.insert(part.to_string(), value);
            return Ok(());
        }
        current = map
            .entry(part.to_string())
            .or_insert_with(|| JsonValue::Object(JsonObject::new()));
    }
    Ok(())
}

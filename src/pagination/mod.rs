//! Pagination module
//!
//! Supports: Cursor (body or header token, injected as query, header or body
//! field), Offset, Page Number, Link Header, Next URL
//!
//! # Overview
//!
//! [`PaginationConfig`] selects one strategy from a closed set. Each strategy
//! reads the continuation from a page and tells [`PaginatingTransport`] how to
//! change the next request. The transport follows continuations until none is
//! left and returns one merged response, so callers never see pages.
//!
//! Every logical request owns its own [`PaginationState`] and accumulator; a
//! single transport can serve many concurrent logical requests.

mod strategies;
mod transport;
mod types;

pub use strategies::{
    CursorPaginator, LinkHeaderPaginator, NextUrlPaginator, NoPaginator, OffsetPaginator,
    PageNumberPaginator,
};
pub use transport::{FetchedRecords, PaginatingTransport, DEFAULT_MAX_PAGES};
pub use types::{
    check_stop_condition, Continuation, CursorSource, CursorTarget, NextPage, PaginationConfig,
    PaginationState, Paginator, StopCondition, StopResult,
};

#[cfg(test)]
mod tests;

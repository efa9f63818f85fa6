//! Row materialization module
//!
//! Turns raw API records into relational rows for a finalized table tree.
//!
//! # Overview
//!
//! - [`coerce`] - convert one raw value to its column's stored form
//! - [`materialize`] - produce [`TableRows`] for a root table and its children
//!
//! Every row carries `_cq_id`; child rows also carry `_cq_parent_id` (the
//! parent row's key) and, for array children, `_cq_ordinal`.

mod coerce;
mod materialize;

pub use coerce::coerce;
pub(crate) use coerce::to_timestamp;
pub use materialize::{materialize, Row, TableRows};

//! Key synthesis module
//!
//! Derives the deterministic `_cq_id` identity for every materialized row.
//!
//! # Overview
//!
//! A row's key is a SHA-256 digest (truncated to 16 bytes) over an
//! unambiguous, type-tagged encoding of its natural-key values followed by
//! its parent's key. Equal inputs always produce equal keys; missing values
//! encode as a dedicated sentinel so they never collide with empty strings.

mod cqid;

pub use cqid::{find_key_collisions, synthesize, CqId, KeyCollision};

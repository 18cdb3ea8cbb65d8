//! In-memory indexes the dashboard builds over application records.
//!
//! Each structure owns only its own index. Records are handed in by the
//! caller, which keeps the authoritative list fetched from the store. None of
//! the structures are synchronized; keep each instance with a single owner.

pub mod audit_trail;
pub mod date_index;
pub mod keyed_lookup;
pub mod name_index;
pub mod recent_cache;
pub mod status_graph;
pub mod urgency_queue;

pub use audit_trail::{AuditTrail, HistoryEntry};
pub use date_index::DateOrderedIndex;
pub use keyed_lookup::KeyedLookup;
pub use name_index::NameSearchIndex;
pub use recent_cache::RecentViewCache;
pub use status_graph::{StatusFlowGraph, Transition};
pub use urgency_queue::UrgencyQueue;

/// Records that can be deduplicated by a stable string key.
pub trait Keyed {
    fn key(&self) -> &str;
}

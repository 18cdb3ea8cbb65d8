use chrono::{DateTime, Utc};
use serde::Serialize;

/// A snapshot captured by [`AuditTrail::add_to_history`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry<T> {
    pub snapshot: T,
    pub captured_at: DateTime<Utc>,
}

/// Append-only, doubly linked history of record snapshots.
#[derive(Debug, Clone)]
pub struct AuditTrail<T> {
    nodes: Vec<Link<T>>,
    head: Option<usize>,
    tail: Option<usize>,
}

#[derive(Debug, Clone)]
struct Link<T> {
    entry: HistoryEntry<T>,
    prev: Option<usize>,
    next: Option<usize>,
}

impl<T: Clone> AuditTrail<T> {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            head: None,
            tail: None,
        }
    }

    /// Append a copy of `record`, stamped with the current time.
    pub fn add_to_history(&mut self, record: &T) {
        self.add_to_history_at(record, Utc::now());
    }

    pub fn add_to_history_at(&mut self, record: &T, captured_at: DateTime<Utc>) {
        let index = self.nodes.len();
        self.nodes.push(Link {
            entry: HistoryEntry {
                snapshot: record.clone(),
                captured_at,
            },
            prev: self.tail,
            next: None,
        });

        match self.tail {
            Some(tail) => self.nodes[tail].next = Some(index),
            None => self.head = Some(index),
        }
        self.tail = Some(index);
    }

    /// Entries in the order they were captured.
    pub fn history(&self) -> Vec<&HistoryEntry<T>> {
        let mut entries = Vec::with_capacity(self.nodes.len());
        let mut cursor = self.head;
        while let Some(index) = cursor {
            let link = &self.nodes[index];
            entries.push(&link.entry);
            cursor = link.next;
        }
        entries
    }

    /// Entries newest first.
    pub fn history_rev(&self) -> Vec<&HistoryEntry<T>> {
        let mut entries = Vec::with_capacity(self.nodes.len());
        let mut cursor = self.tail;
        while let Some(index) = cursor {
            let link = &self.nodes[index];
            entries.push(&link.entry);
            cursor = link.prev;
        }
        entries
    }

    pub fn earliest(&self) -> Option<&HistoryEntry<T>> {
        self.head.map(|index| &self.nodes[index].entry)
    }

    pub fn latest(&self) -> Option<&HistoryEntry<T>> {
        self.tail.map(|index| &self.nodes[index].entry)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl<T: Clone> Default for AuditTrail<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 1, 10, 0, 0)
            .single()
            .expect("valid timestamp")
            + Duration::minutes(minutes)
    }

    #[test]
    fn history_preserves_insertion_order_with_timestamps() {
        let mut trail = AuditTrail::new();
        trail.add_to_history_at(&"stage1".to_string(), at(0));
        trail.add_to_history_at(&"stage2".to_string(), at(5));
        trail.add_to_history_at(&"stage3".to_string(), at(9));

        let history = trail.history();
        let snapshots: Vec<_> = history.iter().map(|entry| entry.snapshot.as_str()).collect();
        assert_eq!(snapshots, vec!["stage1", "stage2", "stage3"]);
        assert_eq!(history[1].captured_at, at(5));
        assert_eq!(trail.latest().map(|entry| entry.captured_at), Some(at(9)));
        assert_eq!(
            trail.earliest().map(|entry| entry.snapshot.as_str()),
            Some("stage1")
        );
    }

    #[test]
    fn snapshots_are_independent_copies() {
        let mut record = vec!["under_review"];
        let mut trail = AuditTrail::new();
        trail.add_to_history_at(&record, at(0));

        record.push("accepted");
        trail.add_to_history_at(&record, at(1));

        let history = trail.history();
        assert_eq!(history[0].snapshot, vec!["under_review"]);
        assert_eq!(history[1].snapshot, vec!["under_review", "accepted"]);
    }

    #[test]
    fn reverse_walk_follows_prev_links() {
        let mut trail = AuditTrail::new();
        for minute in 0..4 {
            trail.add_to_history_at(&minute, at(minute));
        }

        let newest_first: Vec<_> = trail.history_rev().iter().map(|entry| entry.snapshot).collect();
        assert_eq!(newest_first, vec![3, 2, 1, 0]);
        assert_eq!(trail.len(), 4);
    }

    #[test]
    fn add_to_history_stamps_the_current_time() {
        let before = Utc::now();
        let mut trail = AuditTrail::new();
        trail.add_to_history(&42);

        let entry = trail.latest().expect("entry recorded");
        assert!(entry.captured_at >= before);
        assert_eq!(entry.snapshot, 42);
    }
}

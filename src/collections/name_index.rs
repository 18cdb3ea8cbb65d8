//! Prefix search over applicant names and e-mail addresses.
//!
//! Every whitespace-separated word of an indexed text is inserted from the
//! root of the trie, so a query matches the start of any word: "sm" finds
//! "Jane Smith" as well as "Smita Rao". Each node on a word's path remembers
//! the records that produced it, which turns a lookup into a single walk.

use std::collections::{BTreeSet, HashMap};

use super::Keyed;

/// Trie keyed on lowercase characters, accumulating records along each path.
#[derive(Debug, Clone)]
pub struct NameSearchIndex<T> {
    nodes: Vec<Node>,
    records: Vec<T>,
    slots: HashMap<String, usize>,
}

#[derive(Debug, Clone, Default)]
struct Node {
    children: HashMap<char, usize>,
    // record slots; BTreeSet keeps first-indexed records first
    matches: BTreeSet<usize>,
}

const ROOT: usize = 0;

impl<T: Keyed> NameSearchIndex<T> {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::default()],
            records: Vec::new(),
            slots: HashMap::new(),
        }
    }

    /// Index `record` under every word of `text`.
    ///
    /// Records are deduplicated by key; indexing the same key again refreshes
    /// the stored record and adds any new words.
    pub fn insert(&mut self, text: &str, record: T) {
        let slot = match self.slots.get(record.key()) {
            Some(&slot) => {
                self.records[slot] = record;
                slot
            }
            None => {
                let slot = self.records.len();
                self.slots.insert(record.key().to_owned(), slot);
                self.records.push(record);
                slot
            }
        };

        for word in text.split_whitespace() {
            let mut current = ROOT;
            for ch in word.chars().flat_map(char::to_lowercase) {
                current = self.child_or_insert(current, ch);
                self.nodes[current].matches.insert(slot);
            }
        }
    }

    /// Records with a word starting with `prefix` (case-insensitive).
    ///
    /// Leading and trailing whitespace is ignored; an empty prefix matches nothing.
    pub fn search(&self, prefix: &str) -> Vec<&T> {
        let prefix = prefix.trim();
        if prefix.is_empty() {
            return Vec::new();
        }

        let mut current = ROOT;
        for ch in prefix.chars().flat_map(char::to_lowercase) {
            match self.nodes[current].children.get(&ch) {
                Some(&next) => current = next,
                None => return Vec::new(),
            }
        }

        self.nodes[current]
            .matches
            .iter()
            .map(|&slot| &self.records[slot])
            .collect()
    }

    /// Like [`search`](Self::search), capped at `limit` matches.
    pub fn search_limited(&self, prefix: &str, limit: usize) -> Vec<&T> {
        let mut matches = self.search(prefix);
        matches.truncate(limit);
        matches
    }

    /// Number of distinct records indexed.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.nodes.push(Node::default());
        self.records.clear();
        self.slots.clear();
    }

    fn child_or_insert(&mut self, parent: usize, ch: char) -> usize {
        if let Some(&child) = self.nodes[parent].children.get(&ch) {
            return child;
        }

        let child = self.nodes.len();
        self.nodes.push(Node::default());
        self.nodes[parent].children.insert(ch, child);
        child
    }
}

impl<T: Keyed> Default for NameSearchIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}

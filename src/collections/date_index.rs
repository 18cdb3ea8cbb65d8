use chrono::{DateTime, Utc};

/// Unbalanced binary search tree ordering records by applied date.
///
/// Records strictly earlier than a node go left; equal or later dates go
/// right, so ties come back out in insertion order. Nodes live in an arena and
/// link by index, which keeps insertion and traversal iterative even when the
/// input arrives already sorted and the tree degenerates into a list.
#[derive(Debug, Clone)]
pub struct DateOrderedIndex<T> {
    nodes: Vec<Node<T>>,
    root: Option<usize>,
}

#[derive(Debug, Clone)]
struct Node<T> {
    applied: DateTime<Utc>,
    record: T,
    left: Option<usize>,
    right: Option<usize>,
}

impl<T> DateOrderedIndex<T> {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            root: None,
        }
    }

    /// Build an index from records, using `applied` to extract each record's date.
    pub fn from_records<I, F>(records: I, applied: F) -> Self
    where
        I: IntoIterator<Item = T>,
        F: Fn(&T) -> DateTime<Utc>,
    {
        let mut index = Self::new();
        for record in records {
            let date = applied(&record);
            index.insert(date, record);
        }
        index
    }

    pub fn insert(&mut self, applied: DateTime<Utc>, record: T) {
        let slot = self.nodes.len();
        self.nodes.push(Node {
            applied,
            record,
            left: None,
            right: None,
        });

        let Some(mut current) = self.root else {
            self.root = Some(slot);
            return;
        };

        loop {
            let node = &mut self.nodes[current];
            let next = if applied < node.applied {
                &mut node.left
            } else {
                &mut node.right
            };

            match *next {
                Some(child) => current = child,
                None => {
                    *next = Some(slot);
                    return;
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// In-order traversal: earliest applied date first.
    pub fn in_order(&self) -> Vec<&T> {
        self.in_order_entries()
            .into_iter()
            .map(|(_, record)| record)
            .collect()
    }

    /// In-order traversal yielding the date alongside each record.
    pub fn in_order_entries(&self) -> Vec<(DateTime<Utc>, &T)> {
        let mut ordered = Vec::with_capacity(self.nodes.len());
        let mut stack = Vec::new();
        let mut cursor = self.root;

        while cursor.is_some() || !stack.is_empty() {
            while let Some(index) = cursor {
                stack.push(index);
                cursor = self.nodes[index].left;
            }

            if let Some(index) = stack.pop() {
                let node = &self.nodes[index];
                ordered.push((node.applied, &node.record));
                cursor = node.right;
            }
        }

        ordered
    }
}

impl<T> Default for DateOrderedIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}

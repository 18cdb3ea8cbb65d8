use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A timestamped move between two status labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub from: String,
    pub to: String,
    pub at: DateTime<Utc>,
}

/// Directed graph of status labels whose edges record when a transition happened.
#[derive(Debug, Clone, Default)]
pub struct StatusFlowGraph {
    labels: Vec<String>,
    index: HashMap<String, usize>,
    // adjacency[node] = (target node, timestamp) in insertion order
    adjacency: Vec<Vec<(usize, DateTime<Utc>)>>,
}

impl StatusFlowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a transition, creating either endpoint if it is new.
    pub fn add_edge(&mut self, from: &str, to: &str, at: DateTime<Utc>) {
        let from = self.node_or_insert(from);
        let to = self.node_or_insert(to);
        self.adjacency[from].push((to, at));
    }

    /// Register a status with no transitions yet, e.g. where a record starts.
    pub fn add_status(&mut self, status: &str) {
        self.node_or_insert(status);
    }

    pub fn contains(&self, status: &str) -> bool {
        self.index.contains_key(status)
    }

    pub fn node_count(&self) -> usize {
        self.labels.len()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.iter().map(Vec::len).sum()
    }

    /// Every transition reachable from `start`, each once, oldest first.
    pub fn status_history(&self, start: &str) -> Vec<Transition> {
        let Some(&start) = self.index.get(start) else {
            return Vec::new();
        };

        let mut visited = vec![false; self.labels.len()];
        let mut pending = vec![start];
        let mut history = Vec::new();
        visited[start] = true;

        while let Some(node) = pending.pop() {
            for &(target, at) in &self.adjacency[node] {
                history.push(self.transition(node, target, at));
                if !visited[target] {
                    visited[target] = true;
                    pending.push(target);
                }
            }
        }

        history.sort_by_key(|transition| transition.at);
        history
    }

    /// Depth-first reconstruction that records an edge only when it leads to
    /// an unvisited status.
    ///
    /// Parallel edges and edges back into visited statuses are dropped, so
    /// the result is neither complete nor chronological.
    pub fn dfs_history(&self, start: &str) -> Vec<Transition> {
        let Some(&start) = self.index.get(start) else {
            return Vec::new();
        };

        let mut visited = vec![false; self.labels.len()];
        let mut history = Vec::new();
        // (node, next edge to inspect) mirrors the recursive call stack
        let mut stack = vec![(start, 0usize)];
        visited[start] = true;

        while let Some(frame) = stack.last_mut() {
            let (node, cursor) = *frame;
            let Some(&(target, at)) = self.adjacency[node].get(cursor) else {
                stack.pop();
                continue;
            };
            frame.1 += 1;

            if !visited[target] {
                visited[target] = true;
                history.push(self.transition(node, target, at));
                stack.push((target, 0));
            }
        }

        history
    }

    fn node_or_insert(&mut self, label: &str) -> usize {
        if let Some(&node) = self.index.get(label) {
            return node;
        }

        let node = self.labels.len();
        self.labels.push(label.to_owned());
        self.index.insert(label.to_owned(), node);
        self.adjacency.push(Vec::new());
        node
    }

    fn transition(&self, from: usize, to: usize, at: DateTime<Utc>) -> Transition {
        Transition {
            from: self.labels[from].clone(),
            to: self.labels[to].clone(),
            at,
        }
    }
}

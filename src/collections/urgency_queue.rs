/// Array-backed binary max-heap of `(item, priority)` pairs.
///
/// Equal priorities come out in no particular order. Callers that want the
/// oldest application first enqueue with the negated applied timestamp.
#[derive(Debug, Clone)]
pub struct UrgencyQueue<T, P = i64> {
    heap: Vec<(T, P)>,
}

impl<T, P: Ord> UrgencyQueue<T, P> {
    pub fn new() -> Self {
        Self { heap: Vec::new() }
    }

    pub fn enqueue(&mut self, item: T, priority: P) {
        self.heap.push((item, priority));
        self.sift_up(self.heap.len() - 1);
    }

    /// Remove and return the highest-priority item.
    pub fn dequeue(&mut self) -> Option<T> {
        self.dequeue_with_priority().map(|(item, _)| item)
    }

    pub fn dequeue_with_priority(&mut self) -> Option<(T, P)> {
        if self.heap.is_empty() {
            return None;
        }

        let top = self.heap.swap_remove(0);
        if !self.heap.is_empty() {
            self.sift_down(0);
        }
        Some(top)
    }

    pub fn peek(&self) -> Option<(&T, &P)> {
        self.heap.first().map(|(item, priority)| (item, priority))
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Every item in priority order, leaving the queue as it was.
    ///
    /// Drains into a scratch queue and refills this one, so it costs
    /// `O(n log n)`.
    pub fn ordered(&mut self) -> Vec<T>
    where
        T: Clone,
        P: Clone,
    {
        let mut scratch = Self::new();
        let mut ordered = Vec::with_capacity(self.heap.len());

        while let Some((item, priority)) = self.dequeue_with_priority() {
            ordered.push(item.clone());
            scratch.enqueue(item, priority);
        }

        while let Some((item, priority)) = scratch.dequeue_with_priority() {
            self.enqueue(item, priority);
        }

        ordered
    }

    fn sift_up(&mut self, mut index: usize) {
        while index > 0 {
            let parent = (index - 1) / 2;
            if self.heap[index].1 <= self.heap[parent].1 {
                break;
            }
            self.heap.swap(index, parent);
            index = parent;
        }
    }

    fn sift_down(&mut self, mut index: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * index + 1;
            let right = left + 1;
            let mut largest = index;

            if left < len && self.heap[left].1 > self.heap[largest].1 {
                largest = left;
            }
            if right < len && self.heap[right].1 > self.heap[largest].1 {
                largest = right;
            }
            if largest == index {
                break;
            }

            self.heap.swap(index, largest);
            index = largest;
        }
    }
}

impl<T, P: Ord> Default for UrgencyQueue<T, P> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dequeue_returns_the_maximum_priority() {
        let mut queue = UrgencyQueue::new();
        queue.enqueue("low", 1);
        queue.enqueue("high", 10);
        queue.enqueue("mid", 5);

        assert_eq!(queue.peek(), Some((&"high", &10)));
        assert_eq!(queue.dequeue(), Some("high"));
        assert_eq!(queue.dequeue(), Some("mid"));
        assert_eq!(queue.dequeue(), Some("low"));
        assert_eq!(queue.dequeue(), None);
    }

    #[test]
    fn draining_yields_non_increasing_priorities() {
        let mut queue = UrgencyQueue::new();
        let priorities = [17i64, -4, 99, 3, 3, 42, 0, -50, 8, 99, 12];
        for (index, priority) in priorities.iter().enumerate() {
            queue.enqueue(index, *priority);
        }

        let mut drained = Vec::new();
        while let Some((_, priority)) = queue.dequeue_with_priority() {
            drained.push(priority);
        }

        assert_eq!(drained.len(), priorities.len());
        assert!(drained.windows(2).all(|pair| pair[0] >= pair[1]));
    }

    #[test]
    fn ordered_view_leaves_the_queue_intact() {
        let mut queue = UrgencyQueue::new();
        queue.enqueue("b", 2);
        queue.enqueue("c", 3);
        queue.enqueue("a", 1);

        assert_eq!(queue.ordered(), vec!["c", "b", "a"]);
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.dequeue(), Some("c"));
    }

    #[test]
    fn negated_timestamps_surface_the_oldest_first() {
        let mut queue = UrgencyQueue::new();
        queue.enqueue("newest", -1_700_000_300i64);
        queue.enqueue("oldest", -1_700_000_100i64);
        queue.enqueue("middle", -1_700_000_200i64);

        assert_eq!(queue.ordered(), vec!["oldest", "middle", "newest"]);
    }

    #[test]
    fn empty_queue_signals_nothing() {
        let mut queue: UrgencyQueue<&str> = UrgencyQueue::default();
        assert!(queue.is_empty());
        assert!(queue.peek().is_none());
        assert!(queue.ordered().is_empty());
    }
}

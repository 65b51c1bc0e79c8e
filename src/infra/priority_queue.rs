use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use std::hash::Hash;

struct Entry<T> {
    priority: i64,
    seq: u64,
    item: T,
}

impl<T> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap on priority, FIFO among equal priorities
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

/// Min-priority queue with membership test.
///
/// Membership uses the item's own `Eq`/`Hash`, so search nodes that wrap
/// physically identical states count as the same member.
pub struct PriorityQueue<T> {
    heap: BinaryHeap<Entry<T>>,
    members: HashSet<T>,
    next_seq: u64,
}

impl<T: Clone + Eq + Hash> PriorityQueue<T> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            members: HashSet::new(),
            next_seq: 0,
        }
    }

    pub fn push(&mut self, priority: i64, item: T) {
        self.members.insert(item.clone());
        self.heap.push(Entry {
            priority,
            seq: self.next_seq,
            item,
        });
        self.next_seq += 1;
    }

    pub fn pop(&mut self) -> Option<T> {
        let entry = self.heap.pop()?;
        self.members.remove(&entry.item);
        Some(entry.item)
    }

    pub fn contains(&self, item: &T) -> bool {
        self.members.contains(item)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

impl<T: Clone + Eq + Hash> Default for PriorityQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pops_lowest_priority_first() {
        let mut queue = PriorityQueue::new();
        queue.push(5, "five");
        queue.push(1, "one");
        queue.push(3, "three");

        assert_eq!(queue.pop(), Some("one"));
        assert_eq!(queue.pop(), Some("three"));
        assert_eq!(queue.pop(), Some("five"));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_equal_priorities_are_fifo() {
        let mut queue = PriorityQueue::new();
        queue.push(2, 'a');
        queue.push(2, 'b');
        queue.push(2, 'c');

        let order: Vec<char> = std::iter::from_fn(|| queue.pop()).collect();
        assert_eq!(order, vec!['a', 'b', 'c'], "ties should keep insertion order");
    }

    #[test]
    fn test_contains_tracks_membership() {
        let mut queue = PriorityQueue::new();
        queue.push(0, 7);
        assert!(queue.contains(&7));
        assert_eq!(queue.len(), 1);
        queue.pop();
        assert!(!queue.contains(&7), "popped items are no longer members");
    }
}

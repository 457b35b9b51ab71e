//! Fixed-capacity FIFO ring buffer.
//!
//! The connection pool keeps its idle list in a [`RingBuffer`]. Capacity is
//! fixed at construction and never grows; `head` and `tail` advance modulo the
//! capacity and an explicit `len` tells "empty" apart from "full" (both have
//! `head == tail`).
//!
//! Iteration borrows the buffer, so the borrow checker rules out mutating it
//! while an iterator is alive.

use crate::error::{MapperError, MapperResult};

pub struct RingBuffer<T> {
    slots: Box<[Option<T>]>,
    head: usize,
    tail: usize,
    len: usize,
}

impl<T> RingBuffer<T> {
    /// Create an empty buffer holding at most `capacity` elements.
    ///
    /// A zero capacity is rounded up to one so that index arithmetic stays
    /// well defined.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            head: 0,
            tail: 0,
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Enqueue at the tail, failing when the buffer is full.
    pub fn add(&mut self, value: T) -> MapperResult<()> {
        self.offer(value).map_err(|_| MapperError::CapacityExceeded {
            capacity: self.capacity(),
        })
    }

    /// Enqueue at the tail. A full buffer hands the value back.
    pub fn offer(&mut self, value: T) -> Result<(), T> {
        if self.is_full() {
            return Err(value);
        }
        self.slots[self.tail] = Some(value);
        self.tail = (self.tail + 1) % self.capacity();
        self.len += 1;
        Ok(())
    }

    /// Dequeue from the head, or `None` when empty.
    pub fn poll(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let value = self.slots[self.head].take();
        self.head = (self.head + 1) % self.capacity();
        self.len -= 1;
        value
    }

    /// Dequeue from the head, failing when empty.
    pub fn remove(&mut self) -> MapperResult<T> {
        self.poll().ok_or(MapperError::EmptyQueue)
    }

    pub fn peek(&self) -> Option<&T> {
        if self.is_empty() {
            return None;
        }
        self.slots[self.head].as_ref()
    }

    /// Inspect the head, failing when empty.
    pub fn element(&self) -> MapperResult<&T> {
        self.peek().ok_or(MapperError::EmptyQueue)
    }

    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
        self.head = 0;
        self.tail = 0;
        self.len = 0;
    }

    /// Keep only the elements matching `keep`, preserving their order.
    ///
    /// Unlike every other operation this walks the whole buffer (O(capacity)).
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&T) -> bool,
    {
        let mut kept = Vec::with_capacity(self.len);
        while let Some(value) = self.poll() {
            if keep(&value) {
                kept.push(value);
            }
        }
        self.head = 0;
        self.tail = 0;
        for value in kept {
            // Never fails: we re-add at most as many elements as we removed.
            let _ = self.offer(value);
        }
    }

    /// Iterate from head to tail in enqueue order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            buffer: self,
            index: self.head,
            remaining: self.len,
        }
    }
}

impl<T: PartialEq> RingBuffer<T> {
    pub fn contains(&self, value: &T) -> bool {
        self.iter().any(|v| v == value)
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for RingBuffer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Borrowing iterator over a [`RingBuffer`], head to tail.
pub struct Iter<'a, T> {
    buffer: &'a RingBuffer<T>,
    index: usize,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let item = self.buffer.slots[self.index].as_ref();
        self.index = (self.index + 1) % self.buffer.capacity();
        self.remaining -= 1;
        item
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T> IntoIterator for &'a RingBuffer<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Draining iterator, consumes the buffer head to tail.
pub struct IntoIter<T>(RingBuffer<T>);

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.0.poll()
    }
}

impl<T> IntoIterator for RingBuffer<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use std::collections::VecDeque;

    #[test]
    fn test_fifo_order() {
        let mut buffer = RingBuffer::new(3);
        buffer.add(1).unwrap();
        buffer.add(2).unwrap();
        buffer.add(3).unwrap();
        assert_eq!(buffer.poll(), Some(1));
        assert_eq!(buffer.poll(), Some(2));
        assert_eq!(buffer.poll(), Some(3));
        assert_eq!(buffer.poll(), None);
    }

    #[test]
    fn test_add_beyond_capacity_fails() {
        let mut buffer = RingBuffer::new(2);
        buffer.add("a").unwrap();
        buffer.add("b").unwrap();
        assert!(matches!(
            buffer.add("c"),
            Err(MapperError::CapacityExceeded { capacity: 2 })
        ));
        assert_eq!(buffer.offer("c"), Err("c"));
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_remove_and_element_on_empty() {
        let mut buffer: RingBuffer<u8> = RingBuffer::new(1);
        assert!(matches!(buffer.remove(), Err(MapperError::EmptyQueue)));
        assert!(matches!(buffer.element(), Err(MapperError::EmptyQueue)));
        assert_eq!(buffer.peek(), None);
    }

    #[test]
    fn test_wraparound_iteration() {
        let mut buffer = RingBuffer::new(6);
        for i in 0..6 {
            buffer.add(i).unwrap();
        }
        for _ in 0..4 {
            buffer.remove().unwrap();
        }
        buffer.add(7).unwrap();
        buffer.add(8).unwrap();

        let items: Vec<_> = buffer.iter().copied().collect();
        assert_eq!(items, vec![4, 5, 7, 8]);
        assert_eq!(buffer.peek(), Some(&4));
        assert!(buffer.contains(&7));
        assert!(!buffer.contains(&0));
    }

    #[test]
    fn test_full_buffer_iterates_every_element() {
        let mut buffer = RingBuffer::new(3);
        buffer.add('x').unwrap();
        buffer.poll();
        for c in ['a', 'b', 'c'] {
            buffer.add(c).unwrap();
        }
        assert!(buffer.is_full());
        assert_eq!(buffer.iter().count(), 3);
        let drained: Vec<_> = buffer.into_iter().collect();
        assert_eq!(drained, vec!['a', 'b', 'c']);
    }

    #[test]
    fn test_retain_keeps_order() {
        let mut buffer = RingBuffer::new(5);
        for i in 0..5 {
            buffer.add(i).unwrap();
        }
        buffer.poll();
        buffer.add(5).unwrap();
        buffer.retain(|v| v % 2 == 1);
        assert_eq!(buffer.iter().copied().collect::<Vec<_>>(), vec![1, 3, 5]);
        buffer.add(9).unwrap();
        assert_eq!(buffer.len(), 4);
    }

    #[test]
    fn test_clear() {
        let mut buffer = RingBuffer::new(2);
        buffer.add(1).unwrap();
        buffer.clear();
        assert!(buffer.is_empty());
        buffer.add(2).unwrap();
        assert_eq!(buffer.poll(), Some(2));
    }

    #[test]
    fn test_random_sequences_match_vecdeque() {
        let mut rng = rand::thread_rng();
        for _ in 0..50 {
            let capacity = rng.gen_range(1..16);
            let mut buffer = RingBuffer::new(capacity);
            let mut model = VecDeque::new();
            let mut enqueued = 0usize;
            let mut dequeued = 0usize;

            for _ in 0..200 {
                if rng.gen_bool(0.55) {
                    let value: u32 = rng.r#gen();
                    let accepted = buffer.offer(value).is_ok();
                    assert_eq!(accepted, model.len() < capacity);
                    if accepted {
                        model.push_back(value);
                        enqueued += 1;
                    }
                } else {
                    let polled = buffer.poll();
                    assert_eq!(polled, model.pop_front());
                    if polled.is_some() {
                        dequeued += 1;
                    }
                }
                assert_eq!(buffer.len(), enqueued - dequeued);
                assert!(buffer.len() <= capacity);
            }
            assert!(buffer.iter().eq(model.iter()));
        }
    }
}

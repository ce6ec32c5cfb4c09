use alloc::vec::Vec;

use crate::error::Error;
use crate::transaction::Transaction;

/// Cyclic, append-only transaction schedule.
///
/// Insertion order is dispatch order. Entries are never removed; the cursor
/// walks forward and wraps back to the first entry.
#[derive(Debug)]
pub struct TransactionQueue<'a> {
    entries: Vec<Transaction<'a>>,
    /// Next entry to dispatch. May equal `entries.len()` until the next
    /// dispatch attempt wraps it.
    cursor: usize,
}

impl<'a> TransactionQueue<'a> {
    pub const fn new() -> Self {
        Self { entries: Vec::new(), cursor: 0 }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { entries: Vec::with_capacity(capacity), cursor: 0 }
    }

    /// Append a transaction and return its stable index.
    pub fn push(&mut self, transaction: Transaction<'a>) -> usize {
        self.entries.push(transaction);
        self.entries.len() - 1
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Raw cursor position, possibly equal to [`len`](Self::len).
    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn get(&self, index: usize) -> Option<&Transaction<'a>> {
        self.entries.get(index)
    }

    /// Return the start count at `index` and reset it to zero.
    pub fn poll_and_clear(&mut self, index: usize) -> Result<u32, Error> {
        self.entries
            .get_mut(index)
            .map(Transaction::take_start_count)
            .ok_or(Error::InvalidIndex(index))
    }

    /// Wrap the cursor to the first entry once it has run past the end.
    pub(crate) fn normalize_cursor(&mut self) {
        if self.cursor >= self.entries.len() {
            self.cursor = 0;
        }
    }

    /// Entry under the cursor, wrapping the cursor first.
    ///
    /// Returns `None` only when the queue is empty.
    pub(crate) fn next(&mut self) -> Option<(usize, &mut Transaction<'a>)> {
        self.normalize_cursor();
        let index = self.cursor;
        self.entries.get_mut(index).map(|t| (index, t))
    }

    /// Move past the entry just dispatched. Wrapping is deferred to the
    /// next [`next`](Self::next) call.
    pub(crate) fn advance(&mut self) {
        self.cursor += 1;
    }
}

impl Default for TransactionQueue<'_> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_follow_insertion_order() {
        static DATA: [u8; 2] = [0xAA, 0x55];
        let mut queue = TransactionQueue::new();

        for expected in 0..4 {
            let tx = Transaction::master_transmit(0x50, &DATA).unwrap();
            assert_eq!(queue.push(tx), expected);
        }
        assert_eq!(queue.len(), 4);
    }

    #[test]
    fn cursor_wraps_lazily() {
        static DATA: [u8; 1] = [0];
        let mut queue = TransactionQueue::new();
        for _ in 0..3 {
            queue.push(Transaction::master_transmit(0x10, &DATA).unwrap());
        }

        queue.cursor = 2;
        queue.advance();
        assert_eq!(queue.cursor(), 3);

        let (index, _) = queue.next().unwrap();
        assert_eq!(index, 0);
        assert_eq!(queue.cursor(), 0);
    }

    #[test]
    fn next_on_empty_queue() {
        let mut queue = TransactionQueue::new();
        assert!(queue.next().is_none());
        assert_eq!(queue.cursor(), 0);
    }

    #[test]
    fn poll_and_clear_out_of_range() {
        let mut queue = TransactionQueue::new();
        assert_eq!(queue.poll_and_clear(0), Err(Error::InvalidIndex(0)));
    }
}

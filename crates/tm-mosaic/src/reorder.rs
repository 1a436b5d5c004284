use std::collections::BTreeMap;

/// Tampon de réordonnancement indexé par numéro de séquence d'entrée.
///
/// Items pushed out of order are held until every earlier sequence number has been released.
///
/// # Example
/// ```
/// use tm_mosaic::reorder::ReorderBuffer;
/// let mut buf = ReorderBuffer::new();
/// buf.push(1, "b");
/// assert_eq!(buf.pop_ready(), None);
/// buf.push(0, "a");
/// assert_eq!(buf.pop_ready(), Some("a"));
/// assert_eq!(buf.pop_ready(), Some("b"));
/// ```
#[derive(Debug)]
pub struct ReorderBuffer<T> {
    next: u64,
    pending: BTreeMap<u64, T>,
}

impl<T> ReorderBuffer<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next: 0,
            pending: BTreeMap::new(),
        }
    }

    /// Hold `item` until `seq` is next in line.
    pub fn push(&mut self, seq: u64, item: T) {
        debug_assert!(seq >= self.next, "sequence {seq} already released");
        let previous = self.pending.insert(seq, item);
        debug_assert!(previous.is_none(), "duplicate sequence {seq}");
    }

    /// Release the next item in sequence order, if it has arrived.
    pub fn pop_ready(&mut self) -> Option<T> {
        let item = self.pending.remove(&self.next)?;
        self.next += 1;
        Some(item)
    }

    /// Sequence number expected next.
    #[must_use]
    pub fn next_seq(&self) -> u64 {
        self.next
    }

    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl<T> Default for ReorderBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

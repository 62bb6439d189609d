//! Decoder input arena.
//!
//! A contiguous byte buffer with two indices:
//!
//! - `cursor`: the next unread byte.
//! - `checkpoint`: the end of the last fully consumed top-level value.
//!
//! `checkpoint <= cursor <= data.len()` always holds.  A failed parse rewinds
//! the cursor to the checkpoint; a successful one commits the cursor into the
//! checkpoint.  Bytes before the checkpoint are dead and are dropped by
//! [`Buffer::compact`], which only runs when more input is about to arrive.

use tracing::debug;

use crate::errors::{Error, Result};

#[derive(Debug)]
pub(crate) struct Buffer {
    data: Vec<u8>,
    cursor: usize,
    checkpoint: usize,
    /// Bytes dropped by compaction so far; keeps stream offsets absolute.
    discarded: u64,
    max_size: usize,
}

impl Buffer {
    pub(crate) fn new(max_size: usize) -> Self {
        Self {
            data: Vec::new(),
            cursor: 0,
            checkpoint: 0,
            discarded: 0,
            max_size,
        }
    }

    pub(crate) fn max_size(&self) -> usize {
        self.max_size
    }

    /// Bytes buffered past the checkpoint (consumed or not by the value in
    /// progress).
    pub(crate) fn pending(&self) -> usize {
        self.data.len() - self.checkpoint
    }

    /// Bytes past the cursor.
    pub(crate) fn available(&self) -> usize {
        self.data.len() - self.cursor
    }

    /// Room left before the buffer hits `max_size`.
    pub(crate) fn headroom(&self) -> usize {
        self.max_size.saturating_sub(self.pending())
    }

    /// Append input, refusing anything that would push the unconsumed size
    /// over `max_size`.
    pub(crate) fn extend(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.len() > self.headroom() {
            return Err(Error::limit(format!(
                "buffer full: {} pending + {} new exceeds max_buffer_size {}",
                self.pending(),
                bytes.len(),
                self.max_size
            )));
        }
        self.compact();
        self.data.extend_from_slice(bytes);
        Ok(())
    }

    /// Borrow the spare tail of the arena for a reader to fill, growing it by
    /// `n` zeroed bytes.  Pair with [`Buffer::commit_fill`].
    pub(crate) fn fill_slot(&mut self, n: usize) -> &mut [u8] {
        let start = self.data.len();
        self.data.resize(start + n, 0);
        &mut self.data[start..]
    }

    /// Keep `filled` bytes of the last `fill_slot` and drop the rest.
    pub(crate) fn commit_fill(&mut self, requested: usize, filled: usize) {
        let end = self.data.len() - requested + filled;
        self.data.truncate(end);
    }

    /// Consume `n` bytes, or `None` if fewer are buffered.
    pub(crate) fn take(&mut self, n: usize) -> Option<&[u8]> {
        if self.available() < n {
            return None;
        }
        let start = self.cursor;
        self.cursor += n;
        Some(&self.data[start..self.cursor])
    }

    /// Discard `n` bytes, or `false` if fewer are buffered.
    pub(crate) fn advance(&mut self, n: usize) -> bool {
        if self.available() < n {
            return false;
        }
        self.cursor += n;
        true
    }

    /// Abandon the value in progress.
    pub(crate) fn rewind(&mut self) {
        self.cursor = self.checkpoint;
    }

    /// Mark everything up to the cursor as consumed.
    pub(crate) fn commit(&mut self) {
        self.checkpoint = self.cursor;
    }

    /// Drop bytes before the checkpoint.
    pub(crate) fn compact(&mut self) {
        if self.checkpoint == 0 {
            return;
        }
        debug!(dropped = self.checkpoint, kept = self.pending(), "compacting decode buffer");
        self.data.drain(..self.checkpoint);
        self.cursor -= self.checkpoint;
        self.discarded += self.checkpoint as u64;
        self.checkpoint = 0;
    }

    /// Absolute stream offset of the checkpoint.
    pub(crate) fn consumed_offset(&self) -> u64 {
        self.discarded + self.checkpoint as u64
    }

    /// Unread bytes past the cursor.
    pub(crate) fn unread(&self) -> &[u8] {
        &self.data[self.cursor..]
    }
}

//! Chunked oid iterator for sequence sources
//!
//! Reference: ncbi-blast/c++/src/algo/blast/core/blast_seqsrc.c
//!   (BlastSeqSrcIteratorNewEx, BlastSeqSrcIteratorNext)
//!
//! The iterator buffers up to `chunk_sz` oids. When the buffer is used up the
//! owning source refills it through `SeqSrcBackend::get_next_chunk`. Each
//! worker holds its own iterator; the source itself is shared.

use super::blast_seqsrc::Oid;

/// Chunk size used when zero is requested
pub const SEQSRC_DEFAULT_CHUNK_SIZE: usize = 1024;

/// Position value meaning "buffer empty, refill before use"
const UNSET_POSITION: usize = usize::MAX;

#[derive(Debug, Clone)]
pub struct SeqSrcIterator {
    oid_list: Vec<Oid>,
    chunk_sz: usize,
    current_pos: usize,
    /// First oid not yet handed to the buffer
    next_oid: Oid,
    range_start: Oid,
    /// Exclusive upper bound; `None` runs to the end of the collection
    range_end: Option<Oid>,
    refills: usize,
}

impl SeqSrcIterator {
    pub fn new(chunk_sz: usize) -> Self {
        Self::with_range(chunk_sz, 0, None)
    }

    /// Iterator restricted to oids in `[start, end)`
    pub fn with_range(chunk_sz: usize, start: Oid, end: Option<Oid>) -> Self {
        let chunk_sz = if chunk_sz == 0 {
            SEQSRC_DEFAULT_CHUNK_SIZE
        } else {
            chunk_sz
        };
        Self {
            oid_list: Vec::with_capacity(chunk_sz),
            chunk_sz,
            current_pos: UNSET_POSITION,
            next_oid: start,
            range_start: start,
            range_end: end,
            refills: 0,
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_sz
    }

    /// Number of buffer refills so far
    pub fn refills(&self) -> usize {
        self.refills
    }

    /// Oids loaded by the most recent refill
    pub fn buffered(&self) -> usize {
        self.oid_list.len()
    }

    /// Restart from the beginning of the range
    pub fn reset(&mut self) {
        self.oid_list.clear();
        self.current_pos = UNSET_POSITION;
        self.next_oid = self.range_start;
        self.refills = 0;
    }

    /// Pop the next buffered oid without touching the source
    pub(crate) fn take_buffered(&mut self) -> Option<Oid> {
        if self.current_pos == UNSET_POSITION {
            return None;
        }
        let oid = self.oid_list.get(self.current_pos).copied()?;
        self.current_pos += 1;
        Some(oid)
    }

    /// Load the next contiguous slice of `[range_start, min(range_end, num_seqs))`.
    /// Returns `false` once nothing is left.
    pub fn fill_from_range(&mut self, num_seqs: Oid) -> bool {
        let end = self.range_end.map_or(num_seqs, |e| e.min(num_seqs));
        self.oid_list.clear();
        if self.next_oid >= end {
            self.current_pos = UNSET_POSITION;
            return false;
        }
        let stop = end.min(self.next_oid.saturating_add(self.chunk_sz as Oid));
        self.oid_list.extend(self.next_oid..stop);
        self.next_oid = stop;
        self.current_pos = 0;
        self.refills += 1;
        true
    }
}

//! Sequence source abstraction
//!
//! Reference: ncbi-blast/c++/src/algo/blast/core/blast_seqsrc.c
//!
//! `BlastSeqSrc` decouples the engine from concrete sequence storage. NCBI
//! keeps a table of function pointers next to a `void*` data handle; here the
//! table is the `SeqSrcBackend` trait and the handle owns a boxed backend, so
//! a source without a destructor or accessor cannot be constructed.
//!
//! ```c
//! struct BlastSeqSrc {
//!     BlastSeqSrcConstructor NewFnPtr;
//!     BlastSeqSrcDestructor  DeleteFnPtr;
//!     BlastSeqSrcCopier      CopyFnPtr;
//!     GetInt4FnPtr  GetNumSeqs;
//!     GetInt4FnPtr  GetMaxSeqLen;
//!     GetInt4FnPtr  GetAvgSeqLen;
//!     GetInt8FnPtr  GetTotLen;
//!     GetStrFnPtr   GetName;
//!     GetBoolFnPtr  GetIsProt;
//!     GetSeqBlkFnPtr GetSequence;
//!     GetInt4FnPtr  GetSeqLen;
//!     ReleaseSeqBlkFnPtr ReleaseSequence;
//!     AdvanceIteratorFnPtr IterNext;
//!     void* DataStructure;
//!     char* InitErrorStr;
//! };
//! ```

use std::sync::Arc;

use thiserror::Error;

use super::blast_seqsrc_iterator::SeqSrcIterator;

/// Ordinal id of a sequence within its collection
pub type Oid = u32;

/// Errors raised by sequence sources
#[derive(Debug, Error)]
pub enum SeqSrcError {
    /// `SeqSrcNewInfo` carried no constructor
    #[error("sequence source constructor not supplied")]
    MissingConstructor,

    /// The backend constructor failed
    #[error("sequence source initialization failed: {0}")]
    Init(String),

    #[error("oid {oid} out of range (collection holds {num_seqs} sequences)")]
    InvalidOid { oid: Oid, num_seqs: usize },

    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Whether copies of a source share backing storage or own a duplicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopySemantics {
    /// Copies view the same immutable storage
    Shared,
    /// Copies own an independent duplicate of the storage
    Deep,
}

/// Bytes of a retrieved sequence
#[derive(Debug, Clone)]
enum SeqData {
    Shared(Arc<[u8]>),
    Owned(Vec<u8>),
}

/// A sequence handed out by `get_sequence`; give it back with
/// `release_sequence`.
///
/// Protein data is NCBISTDAA, nucleotide data is BLASTNA. No sentinels.
#[derive(Debug, Clone)]
pub struct SeqBlk {
    oid: Oid,
    data: SeqData,
}

impl SeqBlk {
    /// Sequence borrowing storage owned by the backend
    pub fn shared(oid: Oid, data: Arc<[u8]>) -> Self {
        Self {
            oid,
            data: SeqData::Shared(data),
        }
    }

    /// Sequence whose bytes were produced for this retrieval
    pub fn owned(oid: Oid, data: Vec<u8>) -> Self {
        Self {
            oid,
            data: SeqData::Owned(data),
        }
    }

    pub fn oid(&self) -> Oid {
        self.oid
    }

    pub fn sequence(&self) -> &[u8] {
        match &self.data {
            SeqData::Shared(d) => d,
            SeqData::Owned(d) => d,
        }
    }

    pub fn length(&self) -> usize {
        self.sequence().len()
    }

    /// True when the bytes are owned by the backing store
    pub fn is_shared(&self) -> bool {
        matches!(self.data, SeqData::Shared(_))
    }
}

/// Status code returned when a gi list cannot grow
pub const GI_LIST_OUT_OF_MEMORY: i32 = -2;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GiListError {
    #[error("gi list allocation failed")]
    OutOfMemory,
}

impl GiListError {
    pub fn code(&self) -> i32 {
        match self {
            GiListError::OutOfMemory => GI_LIST_OUT_OF_MEMORY,
        }
    }
}

/// Growable list of GenBank identifiers attached to a sequence
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GiList {
    data: Vec<i64>,
}

impl GiList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one gi; allocation failure is reported, not fatal
    pub fn append(&mut self, gi: i64) -> Result<(), GiListError> {
        self.data
            .try_reserve(1)
            .map_err(|_| GiListError::OutOfMemory)?;
        self.data.push(gi);
        Ok(())
    }

    pub fn as_slice(&self) -> &[i64] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }
}

/// Backend interface of a sequence source
///
/// Implementations must be safe for concurrent reads from distinct iterator
/// states; the dispatch layer adds no locking.
pub trait SeqSrcBackend: Send + Sync {
    fn num_seqs(&self) -> usize;

    fn max_seq_len(&self) -> usize;

    /// Integer mean length; 0 for an empty collection
    fn avg_seq_len(&self) -> usize {
        match self.num_seqs() {
            0 => 0,
            n => (self.tot_len() / n as u64) as usize,
        }
    }

    fn tot_len(&self) -> u64;

    fn name(&self) -> &str;

    fn is_prot(&self) -> bool;

    fn get_sequence(&self, oid: Oid) -> Result<SeqBlk, SeqSrcError>;

    fn get_seq_len(&self, oid: Oid) -> Result<usize, SeqSrcError>;

    /// Return a retrieved sequence to the backend
    fn release_sequence(&self, seq: SeqBlk) {
        drop(seq);
    }

    /// Gis of a sequence; sources without gi information leave `out` empty
    fn get_gis(&self, _oid: Oid, _out: &mut GiList) -> Result<(), GiListError> {
        Ok(())
    }

    /// Refill `itr` with the next chunk of oids. Returns `false` when the
    /// collection (or the iterator's range) is exhausted.
    ///
    /// The default slices the contiguous range `0..num_seqs`.
    fn get_next_chunk(&self, itr: &mut SeqSrcIterator) -> bool {
        itr.fill_from_range(self.num_seqs() as Oid)
    }

    /// Duplicate the backend for another owner
    fn copy(&self) -> Box<dyn SeqSrcBackend>;

    fn copy_semantics(&self) -> CopySemantics;

    /// Non-fatal problem noticed while constructing the backend
    fn init_error(&self) -> Option<String> {
        None
    }
}

/// Backend constructor taking an opaque construction argument
pub type SeqSrcConstructor<A> = fn(A) -> Result<Box<dyn SeqSrcBackend>, SeqSrcError>;

/// Construction info for `BlastSeqSrc::new`
///
/// NCBI reference: blast_seqsrc.h
/// ```c
/// typedef struct BlastSeqSrcNewInfo {
///     BlastSeqSrcConstructor constructor;
///     void* ctor_argument;
/// } BlastSeqSrcNewInfo;
/// ```
pub struct SeqSrcNewInfo<A> {
    pub constructor: Option<SeqSrcConstructor<A>>,
    pub ctor_argument: A,
}

impl<A> SeqSrcNewInfo<A> {
    pub fn new(constructor: SeqSrcConstructor<A>, ctor_argument: A) -> Self {
        Self {
            constructor: Some(constructor),
            ctor_argument,
        }
    }
}

/// Handle over a sequence collection
///
/// Dropping the handle releases the backend.
pub struct BlastSeqSrc {
    backend: Box<dyn SeqSrcBackend>,
    init_error: Option<String>,
}

impl std::fmt::Debug for BlastSeqSrc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlastSeqSrc")
            .field("name", &self.backend.name())
            .field("num_seqs", &self.backend.num_seqs())
            .field("init_error", &self.init_error)
            .finish()
    }
}

impl BlastSeqSrc {
    /// Invoke the supplied constructor on its argument
    pub fn new<A>(info: SeqSrcNewInfo<A>) -> Result<Self, SeqSrcError> {
        let constructor = info.constructor.ok_or(SeqSrcError::MissingConstructor)?;
        let backend = constructor(info.ctor_argument)?;
        Ok(Self::from_backend(backend))
    }

    /// Wrap an already constructed backend
    pub fn from_backend(backend: Box<dyn SeqSrcBackend>) -> Self {
        let init_error = backend.init_error();
        if let Some(msg) = &init_error {
            log::warn!("Sequence source {}: {}", backend.name(), msg);
        }
        log::debug!(
            "Created sequence source {} ({} sequences, {} residues)",
            backend.name(),
            backend.num_seqs(),
            backend.tot_len()
        );
        Self {
            backend,
            init_error,
        }
    }

    /// Copy for another owner; storage is shared or duplicated as the
    /// backend's `copy_semantics` states
    pub fn copy(&self) -> Self {
        Self {
            backend: self.backend.copy(),
            init_error: self.init_error.clone(),
        }
    }

    pub fn copy_semantics(&self) -> CopySemantics {
        self.backend.copy_semantics()
    }

    /// Duplicate of the initialization error, if one was recorded
    pub fn init_error(&self) -> Option<String> {
        self.init_error.clone()
    }

    pub fn num_seqs(&self) -> usize {
        self.backend.num_seqs()
    }

    pub fn max_seq_len(&self) -> usize {
        self.backend.max_seq_len()
    }

    pub fn avg_seq_len(&self) -> usize {
        self.backend.avg_seq_len()
    }

    pub fn tot_len(&self) -> u64 {
        self.backend.tot_len()
    }

    pub fn name(&self) -> &str {
        self.backend.name()
    }

    pub fn is_prot(&self) -> bool {
        self.backend.is_prot()
    }

    pub fn get_sequence(&self, oid: Oid) -> Result<SeqBlk, SeqSrcError> {
        self.backend.get_sequence(oid)
    }

    pub fn get_seq_len(&self, oid: Oid) -> Result<usize, SeqSrcError> {
        self.backend.get_seq_len(oid)
    }

    pub fn release_sequence(&self, seq: SeqBlk) {
        self.backend.release_sequence(seq);
    }

    pub fn get_gis(&self, oid: Oid) -> Result<GiList, GiListError> {
        let mut list = GiList::new();
        self.backend.get_gis(oid, &mut list)?;
        Ok(list)
    }

    /// Iterator over the whole collection
    pub fn iterator(&self, chunk_sz: usize) -> SeqSrcIterator {
        SeqSrcIterator::new(chunk_sz)
    }

    /// Next oid for `itr`, refilling its buffer from the backend when
    /// exhausted; `None` marks the end of the collection
    pub fn iterator_next(&self, itr: &mut SeqSrcIterator) -> Option<Oid> {
        if let Some(oid) = itr.take_buffered() {
            return Some(oid);
        }
        if !self.backend.get_next_chunk(itr) {
            return None;
        }
        log::trace!(
            "{}: refill {} loaded {} oids",
            self.backend.name(),
            itr.refills(),
            itr.buffered()
        );
        itr.take_buffered()
    }
}

impl Clone for BlastSeqSrc {
    fn clone(&self) -> Self {
        self.copy()
    }
}

//! In-memory sequence source
//!
//! Reference: ncbi-blast/c++/src/algo/blast/api/seqsrc_multiseq.cpp
//!   - MultiSeqBlastSeqSrcInit / s_MultiSeqSrcNew
//!   - s_MultiSeqSrcCopy (copies share the underlying sequence vector)
//!
//! Sequences are encoded once at construction and held behind `Arc`, so a
//! copy handed to another worker reads the same buffers.

use std::sync::Arc;

use crate::core::blast_seqsrc::{
    BlastSeqSrc, CopySemantics, Oid, SeqBlk, SeqSrcBackend, SeqSrcError, SeqSrcNewInfo,
};
use crate::utils::matrix::{encode_nucleotide, encode_protein};

/// Construction argument for `MultiSeqSrc`
#[derive(Debug, Clone)]
pub struct MultiSeqSrcArgs {
    pub name: String,
    /// ASCII residues, one entry per sequence
    pub sequences: Vec<Vec<u8>>,
    pub is_prot: bool,
}

/// Collection-wide data shared between copies
#[derive(Debug)]
struct MultiSeqData {
    name: String,
    seqs: Vec<Arc<[u8]>>,
    is_prot: bool,
    max_len: usize,
    tot_len: u64,
}

/// Sequence source over a vector of in-memory sequences
#[derive(Debug, Clone)]
pub struct MultiSeqSrc {
    data: Arc<MultiSeqData>,
}

impl MultiSeqSrc {
    pub fn new(args: MultiSeqSrcArgs) -> Self {
        let seqs: Vec<Arc<[u8]>> = args
            .sequences
            .iter()
            .map(|s| {
                let encoded = if args.is_prot {
                    encode_protein(s)
                } else {
                    encode_nucleotide(s)
                };
                Arc::from(encoded)
            })
            .collect();
        let max_len = seqs.iter().map(|s| s.len()).max().unwrap_or(0);
        let tot_len = seqs.iter().map(|s| s.len() as u64).sum();
        Self {
            data: Arc::new(MultiSeqData {
                name: args.name,
                seqs,
                is_prot: args.is_prot,
                max_len,
                tot_len,
            }),
        }
    }

    fn entry(&self, oid: Oid) -> Result<&Arc<[u8]>, SeqSrcError> {
        self.data
            .seqs
            .get(oid as usize)
            .ok_or(SeqSrcError::InvalidOid {
                oid,
                num_seqs: self.data.seqs.len(),
            })
    }
}

impl SeqSrcBackend for MultiSeqSrc {
    fn num_seqs(&self) -> usize {
        self.data.seqs.len()
    }

    fn max_seq_len(&self) -> usize {
        self.data.max_len
    }

    fn tot_len(&self) -> u64 {
        self.data.tot_len
    }

    fn name(&self) -> &str {
        &self.data.name
    }

    fn is_prot(&self) -> bool {
        self.data.is_prot
    }

    fn get_sequence(&self, oid: Oid) -> Result<SeqBlk, SeqSrcError> {
        self.entry(oid).map(|seq| SeqBlk::shared(oid, Arc::clone(seq)))
    }

    fn get_seq_len(&self, oid: Oid) -> Result<usize, SeqSrcError> {
        self.entry(oid).map(|seq| seq.len())
    }

    fn copy(&self) -> Box<dyn SeqSrcBackend> {
        Box::new(self.clone())
    }

    fn copy_semantics(&self) -> CopySemantics {
        CopySemantics::Shared
    }

    fn init_error(&self) -> Option<String> {
        if self.data.seqs.is_empty() {
            Some("Sequence vector is empty".to_string())
        } else {
            None
        }
    }
}

fn multiseq_src_new(args: MultiSeqSrcArgs) -> Result<Box<dyn SeqSrcBackend>, SeqSrcError> {
    Ok(Box::new(MultiSeqSrc::new(args)))
}

/// Create a sequence source over in-memory ASCII sequences
pub fn multiseq_src_init(args: MultiSeqSrcArgs) -> Result<BlastSeqSrc, SeqSrcError> {
    BlastSeqSrc::new(SeqSrcNewInfo::new(multiseq_src_new, args))
}

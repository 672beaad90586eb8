//! FASTA file sequence source
//!
//! Flat-file counterpart of the database-backed source in
//! ncbi-blast/c++/src/algo/blast/api/seqsrc_seqdb.cpp. The whole file is read
//! through `bio::io::fasta` at construction. Every retrieval hands out a fresh
//! buffer and `copy` duplicates the collection, so copies never share state.

use std::io::Read;
use std::path::PathBuf;

use bio::io::fasta;

use crate::core::blast_seqsrc::{
    BlastSeqSrc, CopySemantics, GiList, GiListError, Oid, SeqBlk, SeqSrcBackend, SeqSrcError,
    SeqSrcNewInfo,
};
use crate::utils::matrix::{encode_nucleotide, encode_protein};

/// Construction argument for `FastaSeqSrc`
#[derive(Debug, Clone)]
pub struct FastaSeqSrcArgs {
    pub path: PathBuf,
    /// Molecule type; guessed from the residues when `None`
    pub is_prot: Option<bool>,
}

#[derive(Debug, Clone)]
struct FastaEntry {
    id: String,
    seq: Vec<u8>,
    gis: Vec<i64>,
}

/// Sequence source over the records of a FASTA file
#[derive(Debug, Clone)]
pub struct FastaSeqSrc {
    name: String,
    entries: Vec<FastaEntry>,
    is_prot: bool,
    max_len: usize,
    tot_len: u64,
}

/// Gis carried by an NCBI-style identifier (`gi|123|ref|...`)
pub fn parse_gis(id: &str) -> Vec<i64> {
    let fields: Vec<&str> = id.split('|').collect();
    fields
        .windows(2)
        .filter(|w| w[0] == "gi")
        .filter_map(|w| w[1].parse::<i64>().ok())
        .collect()
}

/// True when any residue falls outside the nucleotide alphabet
fn looks_like_protein(records: &[fasta::Record]) -> bool {
    records.iter().any(|r| {
        r.seq()
            .iter()
            .any(|b| !b"ACGTUNacgtun-".contains(b))
    })
}

impl FastaSeqSrc {
    pub fn from_file(args: &FastaSeqSrcArgs) -> Result<Self, SeqSrcError> {
        let file = std::fs::File::open(&args.path).map_err(|source| SeqSrcError::Io {
            path: args.path.display().to_string(),
            source,
        })?;
        Self::from_reader(&args.path.display().to_string(), file, args.is_prot)
    }

    /// Load every record from `reader`. A record that cannot be read ends
    /// construction with `SeqSrcError::Io` naming the record, since the
    /// FASTA reader cannot resume after it.
    pub fn from_reader<R: Read>(
        name: &str,
        reader: R,
        is_prot: Option<bool>,
    ) -> Result<Self, SeqSrcError> {
        let mut records = Vec::new();
        for (n, record) in fasta::Reader::new(reader).records().enumerate() {
            let record = record.map_err(|e| SeqSrcError::Io {
                path: name.to_string(),
                source: std::io::Error::new(e.kind(), format!("record {}: {}", n + 1, e)),
            })?;
            records.push(record);
        }

        let is_prot = is_prot.unwrap_or_else(|| looks_like_protein(&records));
        let entries: Vec<FastaEntry> = records
            .iter()
            .map(|r| FastaEntry {
                id: r.id().to_string(),
                seq: if is_prot {
                    encode_protein(r.seq())
                } else {
                    encode_nucleotide(r.seq())
                },
                gis: parse_gis(r.id()),
            })
            .collect();

        let max_len = entries.iter().map(|e| e.seq.len()).max().unwrap_or(0);
        let tot_len = entries.iter().map(|e| e.seq.len() as u64).sum();
        Ok(Self {
            name: name.to_string(),
            entries,
            is_prot,
            max_len,
            tot_len,
        })
    }

    /// Identifier of a record
    pub fn id(&self, oid: Oid) -> Option<&str> {
        self.entries.get(oid as usize).map(|e| e.id.as_str())
    }

    fn entry(&self, oid: Oid) -> Result<&FastaEntry, SeqSrcError> {
        self.entries
            .get(oid as usize)
            .ok_or(SeqSrcError::InvalidOid {
                oid,
                num_seqs: self.entries.len(),
            })
    }
}

impl SeqSrcBackend for FastaSeqSrc {
    fn num_seqs(&self) -> usize {
        self.entries.len()
    }

    fn max_seq_len(&self) -> usize {
        self.max_len
    }

    fn tot_len(&self) -> u64 {
        self.tot_len
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_prot(&self) -> bool {
        self.is_prot
    }

    fn get_sequence(&self, oid: Oid) -> Result<SeqBlk, SeqSrcError> {
        self.entry(oid).map(|e| SeqBlk::owned(oid, e.seq.clone()))
    }

    fn get_seq_len(&self, oid: Oid) -> Result<usize, SeqSrcError> {
        self.entry(oid).map(|e| e.seq.len())
    }

    fn get_gis(&self, oid: Oid, out: &mut GiList) -> Result<(), GiListError> {
        if let Some(entry) = self.entries.get(oid as usize) {
            for &gi in &entry.gis {
                out.append(gi)?;
            }
        }
        Ok(())
    }

    fn copy(&self) -> Box<dyn SeqSrcBackend> {
        Box::new(self.clone())
    }

    fn copy_semantics(&self) -> CopySemantics {
        CopySemantics::Deep
    }

    fn init_error(&self) -> Option<String> {
        self.entries
            .is_empty()
            .then(|| "No sequences found".to_string())
    }
}

fn fasta_src_new(args: FastaSeqSrcArgs) -> Result<Box<dyn SeqSrcBackend>, SeqSrcError> {
    Ok(Box::new(FastaSeqSrc::from_file(&args)?))
}

/// Create a sequence source over a FASTA file
pub fn fasta_src_init(args: FastaSeqSrcArgs) -> Result<BlastSeqSrc, SeqSrcError> {
    BlastSeqSrc::new(SeqSrcNewInfo::new(fasta_src_new, args))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DB: &str = ">gi|101|ref|XP_1| first\nMKVLAAGIVG\n>plain\nACDEFGHIKLMNPQ\nRSTVWY\n";

    #[test]
    fn test_parse_gis() {
        assert_eq!(parse_gis("gi|101|ref|XP_1|"), vec![101]);
        assert!(parse_gis("sp|P12345|NAME").is_empty());
    }

    #[test]
    fn test_reader_loads_records() {
        let src = FastaSeqSrc::from_reader("db", DB.as_bytes(), None).unwrap();
        assert!(src.is_prot());
        assert_eq!(src.num_seqs(), 2);
        assert_eq!(src.get_seq_len(1).unwrap(), 20);
        assert_eq!(src.tot_len(), 30);
        assert_eq!(src.id(0), Some("gi|101|ref|XP_1|"));
        assert!(src.init_error().is_none());
    }

    #[test]
    fn test_deep_copy_and_gis() {
        let src = BlastSeqSrc::from_backend(Box::new(
            FastaSeqSrc::from_reader("db", DB.as_bytes(), Some(true)).unwrap(),
        ));
        let copy = src.copy();
        assert_eq!(copy.copy_semantics(), CopySemantics::Deep);
        let a = src.get_sequence(0).unwrap();
        let b = copy.get_sequence(0).unwrap();
        assert!(!a.is_shared());
        assert_eq!(a.sequence(), b.sequence());
        assert_eq!(src.get_gis(0).unwrap().as_slice(), &[101]);
        assert!(src.get_gis(1).unwrap().is_empty());
    }

    #[test]
    fn test_unreadable_record_fails_construction() {
        let text: &[u8] = b">a\nMKVL\n>b\nMK\xffV\n>c\nMKVLAA\n>d\nACDE\n";
        match FastaSeqSrc::from_reader("db", text, Some(true)) {
            Err(SeqSrcError::Io { path, source }) => {
                assert_eq!(path, "db");
                assert!(source.to_string().starts_with("record 2"));
            }
            other => panic!("expected a read error, got {:?}", other.map(|s| s.num_seqs())),
        }
    }

    #[test]
    fn test_missing_file() {
        let err = fasta_src_init(FastaSeqSrcArgs {
            path: PathBuf::from("/nonexistent/db.fa"),
            is_prot: None,
        })
        .unwrap_err();
        assert!(matches!(err, SeqSrcError::Io { .. }));
    }
}

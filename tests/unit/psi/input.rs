//! Unit tests for api/psi_pssm_input.rs and api/msa_pssm_input.rs

use psiblast_core::api::blast_psi::{PssmEngine, PssmInputData};
use psiblast_core::api::msa_pssm_input::MsaInputData;
use psiblast_core::api::psi_pssm_input::{EditOp, Hsp, PsiBlastInputData, SubjectHits};
use psiblast_core::api::seqsrc_multiseq::{multiseq_src_init, MultiSeqSrcArgs};
use psiblast_core::config::PsiBlastOptions;
use psiblast_core::core::blast_seqsrc::{
    BlastSeqSrc, CopySemantics, Oid, SeqBlk, SeqSrcBackend, SeqSrcError,
};
use psiblast_core::utils::matrix::encode_protein;
use psiblast_core::BlastError;
use super::super::helpers::{make_homolog, make_msa_fasta, QUERY};

fn full_length_hit(oid: u32, evalue: f64) -> SubjectHits {
    SubjectHits {
        oid,
        hsps: vec![Hsp {
            evalue,
            query_start: 0,
            subject_start: 0,
            ops: vec![EditOp::Match(QUERY.len())],
        }],
    }
}

#[test]
fn test_search_results_to_pssm() {
    let src = multiseq_src_init(MultiSeqSrcArgs {
        name: "hits".to_string(),
        sequences: (1..=5).map(|k| make_homolog(QUERY, k)).collect(),
        is_prot: true,
    })
    .unwrap();
    let hits = (0..5).map(|oid| full_length_hit(oid, 1e-20)).collect();
    let mut input =
        PsiBlastInputData::new(encode_protein(QUERY), hits, &src, PsiBlastOptions::default());

    let result = PssmEngine::new(&mut input).unwrap().run().unwrap();
    assert_eq!(result.pssm.num_columns, QUERY.len());
    assert_eq!(input.data().unwrap().num_seqs(), 5);
    // The source stays usable after the computation
    assert_eq!(src.num_seqs(), 5);
}

#[test]
fn test_inclusion_threshold_filters_subjects() {
    let src = multiseq_src_init(MultiSeqSrcArgs {
        name: "hits".to_string(),
        sequences: (1..=3).map(|k| make_homolog(QUERY, k)).collect(),
        is_prot: true,
    })
    .unwrap();
    let hits = vec![
        full_length_hit(0, 1e-30),
        full_length_hit(1, 0.5),
        full_length_hit(2, 1e-4),
    ];
    let mut input =
        PsiBlastInputData::new(encode_protein(QUERY), hits, &src, PsiBlastOptions::default());
    input.process().unwrap();
    assert_eq!(input.data().unwrap().num_seqs(), 2);
}

#[test]
fn test_msa_input_uses_first_row_as_query() {
    let mut input =
        MsaInputData::from_fasta(make_msa_fasta(3).as_bytes(), PsiBlastOptions::default()).unwrap();
    assert_eq!(input.query_length(), QUERY.len());
    assert_eq!(input.ids()[0], "query");
    input.process().unwrap();
    let msa = input.data().unwrap();
    assert_eq!(msa.num_seqs(), 3);
    // Last homolog starts with three unaligned columns
    assert!(!msa.cells[3][0].is_aligned);
    assert!(msa.cells[3][3].is_aligned);
}

/// Protein source that hands out ASCII letters instead of NCBISTDAA codes
struct AsciiSrc {
    seqs: Vec<Vec<u8>>,
}

impl SeqSrcBackend for AsciiSrc {
    fn num_seqs(&self) -> usize {
        self.seqs.len()
    }
    fn max_seq_len(&self) -> usize {
        self.seqs.iter().map(Vec::len).max().unwrap_or(0)
    }
    fn tot_len(&self) -> u64 {
        self.seqs.iter().map(|s| s.len() as u64).sum()
    }
    fn name(&self) -> &str {
        "ascii"
    }
    fn is_prot(&self) -> bool {
        true
    }
    fn get_sequence(&self, oid: Oid) -> Result<SeqBlk, SeqSrcError> {
        let seq = self.seqs.get(oid as usize).ok_or(SeqSrcError::InvalidOid {
            oid,
            num_seqs: self.seqs.len(),
        })?;
        Ok(SeqBlk::owned(oid, seq.clone()))
    }
    fn get_seq_len(&self, oid: Oid) -> Result<usize, SeqSrcError> {
        Ok(self.get_sequence(oid)?.length())
    }
    fn copy(&self) -> Box<dyn SeqSrcBackend> {
        Box::new(AsciiSrc {
            seqs: self.seqs.clone(),
        })
    }
    fn copy_semantics(&self) -> CopySemantics {
        CopySemantics::Deep
    }
}

#[test]
fn test_unencoded_subject_residues_are_an_error() {
    let src = BlastSeqSrc::from_backend(Box::new(AsciiSrc {
        seqs: vec![make_homolog(QUERY, 1)],
    }));
    let hits = vec![full_length_hit(0, 1e-20)];
    let mut input =
        PsiBlastInputData::new(encode_protein(QUERY), hits, &src, PsiBlastOptions::default());

    let err = PssmEngine::new(&mut input).unwrap().run().unwrap_err();
    assert!(matches!(err, BlastError::Internal(ref msg) if msg.ends_with("-1")));
}

//! Unit tests for core/blast_setup.rs

use psiblast_core::config::{ProgramType, ScoringMatrixName};
use psiblast_core::core::blast_setup::{guard_protein_query, ScoreBlockBuilder};
use psiblast_core::error::BlastError;
use psiblast_core::utils::matrix::{encode_protein, PROTEIN_SENTINEL};
use super::super::helpers::{assert_approx_eq, make_protein_sequence};

#[test]
fn test_zero_length_query_rejected() {
    let err = ScoreBlockBuilder::new(ProgramType::PsiBlast)
        .build(&[])
        .unwrap_err();
    assert!(matches!(err, BlastError::BadParameter(_)));
    assert!(matches!(guard_protein_query(&[]), Err(BlastError::BadParameter(_))));
}

#[test]
fn test_guarded_query_invariant() {
    for len in [1usize, 2, 17, 250] {
        let query = encode_protein(&make_protein_sequence(len));
        let (guarded, _) = ScoreBlockBuilder::new(ProgramType::PsiBlast)
            .build(&query)
            .unwrap();
        let buf = guarded.guarded();
        assert_eq!(buf.len(), len + 2);
        assert_eq!(buf[0], PROTEIN_SENTINEL);
        assert_eq!(buf[len + 1], PROTEIN_SENTINEL);
        assert_eq!(&buf[1..=len], query.as_slice());
        assert_eq!(guarded.length(), len);
    }
}

#[test]
fn test_score_block_carries_ideal_and_gapped_params() {
    let query = encode_protein(b"MKVLAAGIVGLLAAHSTWDEKRNPQCFY");
    let (_, sbp) = ScoreBlockBuilder::new(ProgramType::Blastp)
        .build(&query)
        .unwrap();
    let ideal = sbp.kbp_ideal.expect("ideal block attached");
    assert_approx_eq(ideal.lambda, 0.3176, 0.005);
    assert_eq!(sbp.num_contexts(), 1);
    assert!(sbp.kbp_std[0].is_some());

    let gapped = sbp.kbp_gap_std[0].expect("gapped block for 11/1");
    assert_approx_eq(gapped.lambda, 0.267, 1e-9);
    assert_approx_eq(gapped.k, 0.041, 1e-9);
    assert_eq!(sbp.matrix.name(), ScoringMatrixName::Blosum62);
    assert_eq!((sbp.gap_open, sbp.gap_extend), (11, 1));
}

#[test]
fn test_missing_matrix_file_is_an_error() {
    let query = encode_protein(b"MKVL");
    let err = ScoreBlockBuilder::new(ProgramType::PsiBlast)
        .matrix(ScoringMatrixName::Pam70)
        .matrix_path(Some("/nonexistent/matrices/PAM70".into()))
        .build(&query)
        .unwrap_err();
    assert!(matches!(err, BlastError::Matrix(_)));
}

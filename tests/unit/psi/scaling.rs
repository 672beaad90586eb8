//! Unit tests for core/blast_posit.rs (impala scaling)

use std::sync::Arc;

use psiblast_core::core::blast_posit::{
    impala_scaling, pssm_score_profile, CompactSearchItems, PosSearchItems, ScalingError,
    SCALING_FAILURE_STATUS,
};
use psiblast_core::core::blast_stat::ScoreBlk;
use psiblast_core::stats::{
    compute_karlin_params_ideal, compute_lambda_nr, compute_std_aa_composition,
    BLAST_KARLIN_LAMBDA0_DEFAULT,
};
use psiblast_core::utils::freq_ratios::FreqRatios;
use psiblast_core::utils::matrix::{
    encode_protein, is_true_residue, ScoreMatrix, BLASTAA_SIZE, TRUE_CHAR_POSITIONS,
};
use super::super::helpers::assert_rel_close;

/// Frequency ratios whose scores at `lambda` reproduce `scores`, scaled by `shrink`
fn ratios_for(scores: &[i32; BLASTAA_SIZE], lambda: f64, shrink: f64) -> Vec<f64> {
    (0..BLASTAA_SIZE)
        .map(|r| {
            if is_true_residue(r) {
                (shrink * lambda * scores[r] as f64).exp()
            } else {
                0.0
            }
        })
        .collect()
}

fn score_blk(matrix: &ScoreMatrix) -> ScoreBlk {
    let mut sbp = ScoreBlk::new(matrix.clone(), 1, compute_std_aa_composition());
    sbp.kbp_ideal = compute_karlin_params_ideal(matrix).ok();
    sbp
}

#[test]
fn test_single_column_reproduces_matrix_row() {
    let matrix = ScoreMatrix::blosum62();
    let probs = compute_std_aa_composition();
    let query = encode_protein(b"A");
    let row = *matrix.row(query[0]);

    // Lambda of the A row alone against the background
    let sfp = pssm_score_profile(&[row], &query, &probs);
    let lambda_col = compute_lambda_nr(&sfp, BLAST_KARLIN_LAMBDA0_DEFAULT).unwrap();

    let compact = CompactSearchItems {
        query: &query,
        alphabet_size: BLASTAA_SIZE,
        matrix: &matrix,
        gapped_calculation: false,
        lambda: lambda_col,
        lambda_ideal: lambda_col,
        k_ideal: 0.134,
        standard_prob: &probs,
    };
    let fr = Arc::new(FreqRatios::for_matrix(&matrix));
    let mut pos = PosSearchItems::new(1, fr, vec![ratios_for(&row, lambda_col, 1.0)]);
    let mut sbp = score_blk(&matrix);

    let outcome = impala_scaling(&mut pos, &compact, 1.0, true, &mut sbp).unwrap();
    for &r in TRUE_CHAR_POSITIONS.iter() {
        let diff = (pos.pos_matrix[0][r] - row[r]).abs();
        assert!(diff <= 1, "row {} scored {} vs {}", r, pos.pos_matrix[0][r], row[r]);
    }
    assert_rel_close(outcome.params.lambda, lambda_col, 1e-3);
    assert!(sbp.kbp_psi[0].is_some());
}

#[test]
fn test_standard_ratios_at_ideal_lambda_reproduce_blosum62() {
    let matrix = ScoreMatrix::blosum62();
    let sbp = score_blk(&matrix);
    let fr = Arc::new(FreqRatios::for_matrix(&matrix));

    for &residue in b"AWLC" {
        let query = encode_protein(&[residue]);
        let compact = CompactSearchItems::new(&query, &sbp, false).unwrap();
        assert_rel_close(compact.lambda_ideal, 0.3176, 0.01);

        let column = fr.row(query[0] as usize).to_vec();
        let mut pos = PosSearchItems::new(1, Arc::clone(&fr), vec![column]);
        let mut out = sbp.clone();
        impala_scaling(&mut pos, &compact, 1.0, true, &mut out).unwrap();

        let expected = matrix.row(query[0]);
        for &r in TRUE_CHAR_POSITIONS.iter() {
            let diff = (pos.pos_matrix[0][r] - expected[r]).abs();
            assert!(
                diff <= 1,
                "{} row {} scored {} vs {}",
                residue as char,
                r,
                pos.pos_matrix[0][r],
                expected[r]
            );
        }
    }
}

#[test]
fn test_binary_search_reaches_target_lambda() {
    let matrix = ScoreMatrix::blosum62();
    let probs = compute_std_aa_composition();
    let query: Vec<u8> = TRUE_CHAR_POSITIONS.iter().map(|&r| r as u8).collect();
    let rows: Vec<[i32; BLASTAA_SIZE]> = query.iter().map(|&q| *matrix.row(q)).collect();
    let target = compute_lambda_nr(
        &pssm_score_profile(&rows, &query, &probs),
        BLAST_KARLIN_LAMBDA0_DEFAULT,
    )
    .unwrap();

    // Ratios built so that unscaled scores come out 20% too small
    let pos_freqs = rows.iter().map(|row| ratios_for(row, target, 0.8)).collect();
    let compact = CompactSearchItems {
        query: &query,
        alphabet_size: BLASTAA_SIZE,
        matrix: &matrix,
        gapped_calculation: false,
        lambda: target,
        lambda_ideal: target,
        k_ideal: 0.134,
        standard_prob: &probs,
    };
    let fr = Arc::new(FreqRatios::for_matrix(&matrix));
    let mut pos = PosSearchItems::new(query.len(), fr, pos_freqs);
    let mut sbp = score_blk(&matrix);

    let outcome = impala_scaling(&mut pos, &compact, 1.0, true, &mut sbp).unwrap();
    assert!(outcome.factor > 1.0, "factor {}", outcome.factor);
    assert!(outcome.evaluations > 1);
    assert_rel_close(outcome.target_lambda, target, 1e-12);
    assert_rel_close(outcome.params.lambda, target, 0.05);
    assert_eq!(sbp.kbp_psi[0].map(|k| k.lambda), Some(outcome.params.lambda));
}

#[test]
fn test_wrong_row_count_reports_failure() {
    let matrix = ScoreMatrix::blosum62();
    let sbp = score_blk(&matrix);
    let query = encode_protein(b"AC");
    let compact = CompactSearchItems::new(&query, &sbp, false).unwrap();
    let fr = Arc::new(FreqRatios::for_matrix(&matrix));
    let mut pos = PosSearchItems::new(2, fr, vec![vec![1.0; 20]; 2]);
    let mut out = sbp.clone();

    let err = impala_scaling(&mut pos, &compact, 1.0, true, &mut out).unwrap_err();
    assert!(matches!(err, ScalingError::InconsistentInput(_)));
    assert_eq!(err.status_code(), SCALING_FAILURE_STATUS);
    assert!(out.kbp_psi[0].is_none());
}

#[test]
fn test_nonpositive_scaling_factor_rejected() {
    let matrix = ScoreMatrix::blosum62();
    let sbp = score_blk(&matrix);
    let query = encode_protein(b"A");
    let compact = CompactSearchItems::new(&query, &sbp, false).unwrap();
    let fr = Arc::new(FreqRatios::for_matrix(&matrix));
    let mut pos = PosSearchItems::new(1, fr, vec![vec![1.0; BLASTAA_SIZE]]);
    let mut out = sbp.clone();
    let err = impala_scaling(&mut pos, &compact, 0.0, true, &mut out).unwrap_err();
    assert_eq!(err.status_code(), 1);
}

#[test]
fn test_direct_mode_scales_by_lambda_ratio() {
    let matrix = ScoreMatrix::blosum62();
    let probs = compute_std_aa_composition();
    let query: Vec<u8> = TRUE_CHAR_POSITIONS.iter().map(|&r| r as u8).collect();
    let ideal = compute_karlin_params_ideal(&matrix).unwrap();
    let pos_freqs = query
        .iter()
        .map(|&q| ratios_for(matrix.row(q), ideal.lambda, 1.0))
        .collect();
    let compact = CompactSearchItems {
        query: &query,
        alphabet_size: BLASTAA_SIZE,
        matrix: &matrix,
        gapped_calculation: false,
        lambda: ideal.lambda,
        lambda_ideal: ideal.lambda,
        k_ideal: ideal.k,
        standard_prob: &probs,
    };
    let fr = Arc::new(FreqRatios::for_matrix(&matrix));
    let mut pos = PosSearchItems::new(query.len(), fr, pos_freqs);
    let mut sbp = score_blk(&matrix);

    let outcome = impala_scaling(&mut pos, &compact, 1.0, false, &mut sbp).unwrap();
    assert_eq!(outcome.evaluations, 1);
    assert!(outcome.factor > 0.0);
}

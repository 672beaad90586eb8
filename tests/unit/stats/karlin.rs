//! Unit tests for stats/karlin_calc.rs and stats/tables.rs

use psiblast_core::config::ScoringMatrixName;
use psiblast_core::stats::{
    compute_aa_composition, compute_karlin_params_ideal, compute_karlin_params_ungapped,
    compute_std_aa_composition, lookup_protein_params, lookup_protein_params_ungapped,
    supported_gap_costs, ScoreFreqProfile,
};
use psiblast_core::utils::matrix::{encode_protein, ncbistdaa, ScoreMatrix};
use super::super::helpers::{assert_approx_eq, assert_rel_close};

#[test]
fn test_std_composition_sums_to_one() {
    let probs = compute_std_aa_composition();
    assert_approx_eq(probs.iter().sum::<f64>(), 1.0, 1e-6);
    assert_eq!(probs[ncbistdaa::GAP as usize], 0.0);
    assert_eq!(probs[ncbistdaa::X as usize], 0.0);
}

#[test]
fn test_query_composition_ignores_x() {
    let comp = compute_aa_composition(&encode_protein(b"AAXC"));
    assert_approx_eq(comp[ncbistdaa::A as usize], 2.0 / 3.0, 1e-12);
    assert_approx_eq(comp[ncbistdaa::C as usize], 1.0 / 3.0, 1e-12);
}

#[test]
fn test_ideal_params_match_table() {
    let computed = compute_karlin_params_ideal(&ScoreMatrix::blosum62()).unwrap();
    let table = lookup_protein_params_ungapped(ScoringMatrixName::Blosum62);
    assert_rel_close(computed.lambda, table.lambda, 0.02);
    assert_rel_close(computed.k, table.k, 0.1);
    assert_rel_close(computed.h, table.h, 0.05);
}

#[test]
fn test_query_specific_params() {
    let matrix = ScoreMatrix::blosum62();
    let comp = compute_aa_composition(&encode_protein(b"MKVLAAGIVGLLAAHSTWDEKRNPQCFY"));
    let sfp = ScoreFreqProfile::from_compositions(&matrix, &comp, &compute_std_aa_composition());
    assert!(sfp.score_avg() < 0.0);
    let kbp = compute_karlin_params_ungapped(&sfp).unwrap();
    assert!(kbp.is_valid());
    assert!(kbp.lambda > 0.2 && kbp.lambda < 0.45);
}

#[test]
fn test_gapped_lookup() {
    assert!(lookup_protein_params(ScoringMatrixName::Blosum62, 11, 1).is_some());
    assert!(lookup_protein_params(ScoringMatrixName::Blosum62, 3, 3).is_none());
    assert!(supported_gap_costs(ScoringMatrixName::Blosum62).contains(&(11, 1)));
}

//! Test utilities and helpers for unit tests
//!
//! - Sequence generators
//! - Fixture sequence sources and alignments
//! - Approximate-equality assertions

use psiblast_core::api::seqsrc_multiseq::{multiseq_src_init, MultiSeqSrcArgs};
use psiblast_core::core::blast_seqsrc::BlastSeqSrc;

pub const AMINO_ACIDS: &[u8; 20] = b"ACDEFGHIKLMNPQRSTVWY";

/// Generate a simple protein sequence for testing
pub fn make_protein_sequence(length: usize) -> Vec<u8> {
    (0..length)
        .map(|i| AMINO_ACIDS[i % AMINO_ACIDS.len()])
        .collect()
}

/// Copy of `query` with every third position (offset by `k`) substituted
pub fn make_homolog(query: &[u8], k: usize) -> Vec<u8> {
    query
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            if (i + k) % 3 == 0 {
                let sub = AMINO_ACIDS[(i * 7 + k * 3) % AMINO_ACIDS.len()];
                if sub == c {
                    AMINO_ACIDS[(i * 7 + k * 3 + 1) % AMINO_ACIDS.len()]
                } else {
                    sub
                }
            } else {
                c
            }
        })
        .collect()
}

/// In-memory protein source with sequences of the given lengths
pub fn make_multiseq_src(lengths: &[usize]) -> BlastSeqSrc {
    let sequences = lengths.iter().map(|&n| make_protein_sequence(n)).collect();
    multiseq_src_init(MultiSeqSrcArgs {
        name: "fixture".to_string(),
        sequences,
        is_prot: true,
    })
    .unwrap()
}

pub const QUERY: &[u8] = b"MKVLAAGIVGLLAAHSTWDEKRNPQCFY";

/// Gapped FASTA alignment: the query plus `n` homologs, the last one
/// with unaligned leading columns
pub fn make_msa_fasta(n: usize) -> String {
    let mut text = format!(">query\n{}\n", String::from_utf8_lossy(QUERY));
    for k in 1..=n {
        let mut row = make_homolog(QUERY, k);
        if k == n {
            for c in row.iter_mut().take(3) {
                *c = b'-';
            }
        }
        text.push_str(&format!(">hom{}\n{}\n", k, String::from_utf8_lossy(&row)));
    }
    text
}

/// Assert that two floating point values are approximately equal
pub fn assert_approx_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() < epsilon,
        "Values not approximately equal: {} vs {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}

/// Assert a relative difference below `tolerance`
pub fn assert_rel_close(actual: f64, expected: f64, tolerance: f64) {
    let relative_diff = (actual - expected).abs() / expected.abs().max(1e-10);
    assert!(
        relative_diff < tolerance,
        "Values not close: {} vs {} (relative diff: {})",
        actual,
        expected,
        relative_diff
    );
}

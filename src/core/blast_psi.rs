//! Core PSSM computation from a query-anchored multiple alignment
//!
//! Reference: ncbi-blast/c++/src/algo/blast/core/blast_psi.c
//!   PSICreatePssmWithDiagnostics
//!
//! Pipeline:
//! 1. Validate the alignment (no gaps in the query row)
//! 2. Purge rows near-identical to the query and duplicate rows
//! 3. Aligned block of every column
//! 4. Position-based sequence weights and weighted residue frequencies
//! 5. Frequency ratios with pseudocounts
//! 6. Integer scores through `impala_scaling`

use std::sync::Arc;

use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::config::PsiBlastOptions;
use crate::core::blast_posit::{impala_scaling, CompactSearchItems, PosSearchItems, ScalingError};
use crate::core::blast_stat::ScoreBlk;
use crate::utils::freq_ratios::FreqRatios;
use crate::utils::matrix::{is_true_residue, ncbistdaa, BLASTAA_SIZE, TRUE_CHAR_POSITIONS};

/// Pseudocount used when the options leave it at 0
pub const PSEUDO_COUNT_DEFAULT: i32 = 9;

/// Tolerance on the per-column sum of sequence weights
const SEQ_WEIGHT_TOLERANCE: f64 = 1.0e-3;

/// Failures of the core computation, each with a stable numeric code
#[derive(Debug, Error)]
pub enum PsiError {
    #[error("bad parameter: {0}")]
    BadParameter(String),

    #[error("sequence weights do not sum to 1 at column {0}")]
    BadSeqWeights(usize),

    #[error("missing frequency ratios for {0}")]
    NoFreqRatios(String),

    #[error("average PSSM score is not negative")]
    PositiveAvgScore,

    #[error("no aligned sequences left after purging")]
    NoAlignedSeqs,

    #[error("gap in query at position {0}")]
    GapInQuery(usize),

    #[error("scaling failed: {0}")]
    Scaling(ScalingError),
}

impl PsiError {
    pub fn code(&self) -> i32 {
        match self {
            PsiError::BadParameter(_) => -1,
            PsiError::BadSeqWeights(_) => -3,
            PsiError::NoFreqRatios(_) => -4,
            PsiError::PositiveAvgScore => -5,
            PsiError::NoAlignedSeqs => -6,
            PsiError::GapInQuery(_) => -7,
            PsiError::Scaling(_) => -255,
        }
    }
}

impl From<ScalingError> for PsiError {
    fn from(err: ScalingError) -> Self {
        match err {
            ScalingError::MissingFreqRatios(name) => PsiError::NoFreqRatios(name),
            ScalingError::PositiveExpectedScore(_) => PsiError::PositiveAvgScore,
            other => PsiError::Scaling(other),
        }
    }
}

/// One cell of the multiple alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MsaCell {
    /// NCBISTDAA residue; `GAP` for a deletion inside an aligned region
    pub letter: u8,
    /// False outside the aligned region of the row
    pub is_aligned: bool,
}

impl MsaCell {
    pub const UNALIGNED: MsaCell = MsaCell {
        letter: ncbistdaa::GAP,
        is_aligned: false,
    };

    pub fn aligned(letter: u8) -> Self {
        Self {
            letter,
            is_aligned: true,
        }
    }
}

/// Query-anchored multiple alignment; row 0 is the query
#[derive(Debug, Clone)]
pub struct PsiMsa {
    pub query: Vec<u8>,
    pub cells: Vec<Vec<MsaCell>>,
    pub use_sequence: Vec<bool>,
}

impl PsiMsa {
    /// Alignment holding the query and `num_seqs` empty subject rows
    pub fn new(query: &[u8], num_seqs: usize) -> Self {
        let query_row: Vec<MsaCell> = query.iter().map(|&r| MsaCell::aligned(r)).collect();
        let mut cells = Vec::with_capacity(num_seqs + 1);
        cells.push(query_row);
        cells.extend((0..num_seqs).map(|_| vec![MsaCell::UNALIGNED; query.len()]));
        Self {
            query: query.to_vec(),
            cells,
            use_sequence: vec![true; num_seqs + 1],
        }
    }

    pub fn query_length(&self) -> usize {
        self.query.len()
    }

    /// Number of subject rows (query excluded)
    pub fn num_seqs(&self) -> usize {
        self.cells.len() - 1
    }

    /// Subject rows still in use
    pub fn num_used_seqs(&self) -> usize {
        self.use_sequence.iter().skip(1).filter(|&&u| u).count()
    }

    /// Set an aligned cell of a subject row (1-based rows; 0 is the query)
    pub fn set_aligned(&mut self, row: usize, column: usize, letter: u8) {
        if let Some(cell) = self.cells.get_mut(row).and_then(|r| r.get_mut(column)) {
            *cell = MsaCell::aligned(letter);
        }
    }
}

/// Which diagnostics the computation should return
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiagnosticsRequest {
    pub information_content: bool,
    pub residue_frequencies: bool,
    pub weighted_residue_frequencies: bool,
    pub frequency_ratios: bool,
    pub gapless_column_weights: bool,
}

impl DiagnosticsRequest {
    pub fn frequency_ratios_only() -> Self {
        Self {
            frequency_ratios: true,
            ..Self::default()
        }
    }

    pub fn any(&self) -> bool {
        self.information_content
            || self.residue_frequencies
            || self.weighted_residue_frequencies
            || self.frequency_ratios
            || self.gapless_column_weights
    }
}

/// Requested diagnostics; only requested fields are populated
#[derive(Debug, Clone, Default)]
pub struct PsiDiagnostics {
    pub alphabet_size: usize,
    pub query_length: usize,
    pub information_content: Option<Vec<f64>>,
    pub residue_freqs: Option<Vec<[u32; BLASTAA_SIZE]>>,
    pub weighted_residue_freqs: Option<Vec<[f64; BLASTAA_SIZE]>>,
    pub frequency_ratios: Option<Vec<[f64; BLASTAA_SIZE]>>,
    pub gapless_column_weights: Option<Vec<f64>>,
}

/// Integer PSSM with its statistical parameters
#[derive(Debug, Clone)]
pub struct PsiMatrix {
    pub ncols: usize,
    pub nrows: usize,
    /// `pssm[column][residue]`
    pub pssm: Vec<[i32; BLASTAA_SIZE]>,
    pub lambda: f64,
    pub kappa: f64,
    pub h: f64,
}

fn validate_msa(msa: &PsiMsa) -> Result<(), PsiError> {
    if msa.query_length() == 0 {
        return Err(PsiError::BadParameter("empty query".to_string()));
    }
    if msa.use_sequence.len() != msa.cells.len() {
        return Err(PsiError::BadParameter("use flags do not match rows".to_string()));
    }
    if let Some(row) = msa.cells.iter().position(|r| r.len() != msa.query_length()) {
        return Err(PsiError::BadParameter(format!(
            "alignment row {} has the wrong length",
            row
        )));
    }
    if let Some(pos) = msa.query.iter().position(|&r| r == ncbistdaa::GAP) {
        return Err(PsiError::GapInQuery(pos));
    }
    if let Some(pos) = msa.query.iter().position(|&r| r as usize >= BLASTAA_SIZE) {
        return Err(PsiError::BadParameter(format!(
            "invalid residue in query at position {}",
            pos
        )));
    }
    for (row, cells) in msa.cells.iter().enumerate().skip(1) {
        if let Some(col) = cells
            .iter()
            .position(|c| c.is_aligned && c.letter as usize >= BLASTAA_SIZE)
        {
            return Err(PsiError::BadParameter(format!(
                "invalid residue {} in alignment row {} at position {}",
                cells[col].letter, row, col
            )));
        }
    }
    Ok(())
}

/// Drop rows near-identical to the query and exact duplicates of an
/// earlier row
pub fn purge_matching_rows(msa: &mut PsiMsa, near_identical: f64) {
    let mut seen: FxHashSet<Vec<MsaCell>> = FxHashSet::default();
    for row in 1..msa.cells.len() {
        if !msa.use_sequence[row] {
            continue;
        }
        let mut aligned = 0usize;
        let mut identical = 0usize;
        for (cell, &q) in msa.cells[row].iter().zip(msa.query.iter()) {
            if cell.is_aligned && cell.letter != ncbistdaa::GAP {
                aligned += 1;
                if cell.letter == q {
                    identical += 1;
                }
            }
        }
        let identity = if aligned == 0 {
            1.0
        } else {
            identical as f64 / aligned as f64
        };
        if aligned == 0 || identity >= near_identical {
            log::trace!("purging row {} (identity {:.3})", row, identity);
            msa.use_sequence[row] = false;
        } else if !seen.insert(msa.cells[row].clone()) {
            log::trace!("purging duplicate row {}", row);
            msa.use_sequence[row] = false;
        }
    }
}

/// Rows taking part in column `c`
fn participating_rows(msa: &PsiMsa, c: usize) -> Vec<usize> {
    (0..msa.cells.len())
        .filter(|&row| msa.use_sequence[row] && msa.cells[row][c].is_aligned)
        .collect()
}

/// Columns `[left, right]` where every participating row stays aligned
fn aligned_block(msa: &PsiMsa, rows: &[usize], c: usize) -> (usize, usize) {
    let mut left = 0;
    let mut right = msa.query_length() - 1;
    for &row in rows {
        let cells = &msa.cells[row];
        let mut l = c;
        while l > left && cells[l - 1].is_aligned {
            l -= 1;
        }
        let mut r = c;
        while r < right && cells[r + 1].is_aligned {
            r += 1;
        }
        left = left.max(l);
        right = right.min(r);
    }
    (left, right)
}

/// Henikoff position-based weights of `rows` over a block.
/// Returns the weights and the mean number of distinct residues per column.
fn position_based_weights(msa: &PsiMsa, rows: &[usize], block: (usize, usize)) -> (Vec<f64>, f64) {
    let mut weights = vec![0.0; rows.len()];
    let mut distinct_total = 0.0;
    let ncols = block.1 - block.0 + 1;
    for k in block.0..=block.1 {
        let mut counts = [0u32; BLASTAA_SIZE];
        for &row in rows {
            counts[msa.cells[row][k].letter as usize] += 1;
        }
        let distinct = counts.iter().filter(|&&n| n > 0).count();
        distinct_total += distinct as f64;
        for (w, &row) in weights.iter_mut().zip(rows.iter()) {
            let n = counts[msa.cells[row][k].letter as usize];
            *w += 1.0 / (distinct as f64 * n as f64);
        }
    }
    let sum: f64 = weights.iter().sum();
    if sum > 0.0 {
        for w in weights.iter_mut() {
            *w /= sum;
        }
    }
    (weights, distinct_total / ncols as f64)
}

/// Per-column intermediate results
struct ColumnStats {
    residue_counts: Vec<[u32; BLASTAA_SIZE]>,
    weighted_freqs: Vec<[f64; BLASTAA_SIZE]>,
    gapless_weights: Vec<f64>,
    /// Mean distinct residues minus one; 0 means no information
    alpha: Vec<f64>,
}

fn compute_column_stats(msa: &PsiMsa) -> Result<ColumnStats, PsiError> {
    let len = msa.query_length();
    let mut stats = ColumnStats {
        residue_counts: vec![[0; BLASTAA_SIZE]; len],
        weighted_freqs: vec![[0.0; BLASTAA_SIZE]; len],
        gapless_weights: vec![0.0; len],
        alpha: vec![0.0; len],
    };

    for c in 0..len {
        let rows = participating_rows(msa, c);
        for &row in &rows {
            let letter = msa.cells[row][c].letter;
            if letter != ncbistdaa::GAP {
                stats.residue_counts[c][letter as usize] += 1;
            }
        }
        if rows.len() < 2 {
            continue;
        }

        let block = aligned_block(msa, &rows, c);
        let (weights, mean_distinct) = position_based_weights(msa, &rows, block);
        let total: f64 = weights.iter().sum();
        if !((total - 1.0).abs() <= SEQ_WEIGHT_TOLERANCE) {
            return Err(PsiError::BadSeqWeights(c));
        }

        let mut residue_weight = 0.0;
        for (&w, &row) in weights.iter().zip(rows.iter()) {
            let letter = msa.cells[row][c].letter as usize;
            if is_true_residue(letter) {
                stats.weighted_freqs[c][letter] += w;
                residue_weight += w;
            }
        }
        stats.gapless_weights[c] = residue_weight;
        if residue_weight > 0.0 {
            for f in stats.weighted_freqs[c].iter_mut() {
                *f /= residue_weight;
            }
            stats.alpha[c] = (mean_distinct - 1.0).max(0.0);
        }
    }
    Ok(stats)
}

/// Frequency ratios q/p per column with pseudocounts; columns without
/// information take the standard ratios of the query residue
fn compute_freq_ratios(
    msa: &PsiMsa,
    stats: &ColumnStats,
    std_fr: &FreqRatios,
    std_probs: &[f64; BLASTAA_SIZE],
    pseudo_count: i32,
) -> Vec<[f64; BLASTAA_SIZE]> {
    let beta = if pseudo_count == 0 {
        PSEUDO_COUNT_DEFAULT as f64
    } else {
        pseudo_count as f64
    };

    let mut ratios = vec![[0.0; BLASTAA_SIZE]; msa.query_length()];
    for (c, out) in ratios.iter_mut().enumerate() {
        let alpha = stats.alpha[c];
        let freqs = &stats.weighted_freqs[c];
        if alpha <= 0.0 {
            *out = *std_fr.row(msa.query[c] as usize);
            continue;
        }
        for &i in TRUE_CHAR_POSITIONS.iter() {
            let pseudo: f64 = TRUE_CHAR_POSITIONS
                .iter()
                .map(|&j| freqs[j] * std_fr.ratio(i, j))
                .sum();
            out[i] = (alpha * freqs[i] / std_probs[i] + beta * pseudo) / (alpha + beta);
        }
    }
    ratios
}

/// Information content (bits) of each column's target distribution
fn information_content(ratios: &[[f64; BLASTAA_SIZE]], std_probs: &[f64; BLASTAA_SIZE]) -> Vec<f64> {
    ratios
        .iter()
        .map(|col| {
            TRUE_CHAR_POSITIONS
                .iter()
                .filter(|&&r| col[r] > 0.0)
                .map(|&r| std_probs[r] * col[r] * col[r].log2())
                .sum()
        })
        .collect()
}

/// Build the PSSM for `msa`. On success `sbp.kbp_psi` and
/// `sbp.kbp_gap_psi` describe the returned matrix.
pub fn compute_pssm_with_diagnostics(
    msa: &mut PsiMsa,
    options: &PsiBlastOptions,
    sbp: &mut ScoreBlk,
    request: &DiagnosticsRequest,
) -> Result<(PsiMatrix, Option<PsiDiagnostics>), PsiError> {
    options.validate().map_err(PsiError::BadParameter)?;
    validate_msa(msa)?;
    if sbp.kbp_ideal.is_none() {
        return Err(PsiError::BadParameter(
            "score block lacks ideal Karlin-Altschul parameters".to_string(),
        ));
    }

    purge_matching_rows(msa, options.near_identical);
    if msa.num_used_seqs() == 0 {
        return Err(PsiError::NoAlignedSeqs);
    }
    log::debug!(
        "PSSM from {} of {} aligned sequences over {} columns",
        msa.num_used_seqs(),
        msa.num_seqs(),
        msa.query_length()
    );

    let std_fr = Arc::new(FreqRatios::for_matrix(&sbp.matrix));
    let stats = compute_column_stats(msa)?;
    let ratios = compute_freq_ratios(msa, &stats, &std_fr, &sbp.std_probs, options.pseudo_count);

    let snapshot = sbp.clone();
    let gapped = snapshot.kbp_gap_std.first().copied().flatten().is_some();
    let compact = CompactSearchItems::new(&msa.query, &snapshot, gapped)?;
    let mut pos = PosSearchItems::new(
        msa.query_length(),
        Arc::clone(&std_fr),
        ratios.iter().map(|r| r.to_vec()).collect(),
    );
    impala_scaling(&mut pos, &compact, options.impala_scaling_factor, true, sbp)?;

    let kbp = sbp
        .kbp_gap_psi
        .first()
        .copied()
        .flatten()
        .or_else(|| sbp.kbp_psi.first().copied().flatten())
        .ok_or_else(|| PsiError::BadParameter("no PSSM Karlin block".to_string()))?;

    let matrix = PsiMatrix {
        ncols: msa.query_length(),
        nrows: BLASTAA_SIZE,
        pssm: pos.pos_matrix,
        lambda: kbp.lambda,
        kappa: kbp.k,
        h: kbp.h,
    };

    let diagnostics = request.any().then(|| PsiDiagnostics {
        alphabet_size: BLASTAA_SIZE,
        query_length: msa.query_length(),
        information_content: request
            .information_content
            .then(|| information_content(&ratios, &sbp.std_probs)),
        residue_freqs: request
            .residue_frequencies
            .then(|| stats.residue_counts.clone()),
        weighted_residue_freqs: request
            .weighted_residue_frequencies
            .then(|| stats.weighted_freqs.clone()),
        frequency_ratios: request.frequency_ratios.then(|| ratios.clone()),
        gapless_column_weights: request
            .gapless_column_weights
            .then(|| stats.gapless_weights.clone()),
    });

    Ok((matrix, diagnostics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::matrix::encode_protein;

    fn msa_with_rows(query: &[u8], rows: &[&[u8]]) -> PsiMsa {
        let q = encode_protein(query);
        let mut msa = PsiMsa::new(&q, rows.len());
        for (i, row) in rows.iter().enumerate() {
            for (c, &ch) in row.iter().enumerate() {
                if ch != b'.' {
                    msa.set_aligned(i + 1, c, encode_protein(&[ch])[0]);
                }
            }
        }
        msa
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(PsiError::BadParameter(String::new()).code(), -1);
        assert_eq!(PsiError::PositiveAvgScore.code(), -5);
        assert_eq!(PsiError::GapInQuery(0).code(), -7);
        let mapped: PsiError = ScalingError::MissingFreqRatios("PAM30".into()).into();
        assert_eq!(mapped.code(), -4);
    }

    #[test]
    fn test_gap_in_query_rejected() {
        let mut msa = PsiMsa::new(&[1, 0, 3], 0);
        assert!(matches!(validate_msa(&msa), Err(PsiError::GapInQuery(1))));
        msa.query[1] = 2;
        assert!(validate_msa(&msa).is_ok());
    }

    #[test]
    fn test_out_of_range_subject_residue_rejected() {
        let mut msa = msa_with_rows(b"MKVL", &[b"MRVL"]);
        assert!(validate_msa(&msa).is_ok());
        // Raw ASCII instead of NCBISTDAA
        msa.set_aligned(1, 2, b'V');
        assert!(matches!(validate_msa(&msa), Err(PsiError::BadParameter(_))));
    }

    #[test]
    fn test_purge_identical_and_duplicates() {
        let mut msa = msa_with_rows(
            b"MKVLAAGIVG",
            &[b"MKVLAAGIVG", b"MRVLSAGLVG", b"MRVLSAGLVG", b".........."],
        );
        purge_matching_rows(&mut msa, 0.94);
        assert_eq!(msa.use_sequence, vec![true, false, true, false, false]);
        assert_eq!(msa.num_used_seqs(), 1);
    }

    #[test]
    fn test_aligned_block_is_intersection() {
        let msa = msa_with_rows(b"MKVLAAGIVG", &[b"..VLSAGL..", b"MRVLS....."]);
        let rows = participating_rows(&msa, 3);
        assert_eq!(rows, vec![0, 1, 2]);
        assert_eq!(aligned_block(&msa, &rows, 3), (2, 4));
    }

    #[test]
    fn test_position_based_weights_sum_to_one() {
        let msa = msa_with_rows(b"MKVL", &[b"MRVL", b"MRIL"]);
        let rows = vec![0, 1, 2];
        let (weights, mean_distinct) = position_based_weights(&msa, &rows, (0, 3));
        let total: f64 = weights.iter().sum();
        assert!((total - 1.0).abs() < 1e-12);
        // Row 1 shares its residues with both other rows
        assert!(weights[1] < weights[0]);
        assert!((weights[0] - weights[2]).abs() < 1e-12);
        assert!((mean_distinct - 1.5).abs() < 1e-12);
    }
}

//! Position-specific matrix scaling (IMPALA scaling)
//!
//! Reference: ncbi-blast/c++/src/algo/blast/core/blast_posit.h
//!   Kappa_posSearchItems, Kappa_compactSearchItems, Kappa_impalaScaling
//!
//! Frequency ratios are turned into integer scores whose ungapped Lambda,
//! computed against the background residue probabilities, matches
//! `lambda_ideal / scaling_factor`. Scores are first computed at
//! `PSI_SCALE_FACTOR` resolution (the private matrix) and then rescaled by a
//! multiplicative factor found by bracketing plus bisection.

use std::sync::Arc;

use thiserror::Error;

use crate::core::blast_stat::ScoreBlk;
use crate::stats::{
    compute_karlin_params_ungapped, compute_lambda_nr, KarlinParams, ScoreFreqProfile,
    BLAST_KARLIN_LAMBDA0_DEFAULT, BLAST_SCORE_MIN,
};
use crate::utils::freq_ratios::FreqRatios;
use crate::utils::matrix::{is_true_residue, ncbistdaa, ScoreMatrix, BLASTAA_SIZE};

/// Resolution of the private (pre-scaling) matrix
pub const PSI_SCALE_FACTOR: f64 = 200.0;

/// Largest absolute score a final PSSM cell may hold
pub const SCORE_MATRIX_SCORE_RANGE: i32 = 10000;

/// Status reported for every scaling failure
pub const SCALING_FAILURE_STATUS: i32 = 1;

/// Relative Lambda error accepted without searching
const SCALING_TOLERANCE: f64 = 1.0e-4;

/// Initial bracket step around factor 1.0
const SCALING_PERCENT: f64 = 0.05;

/// Bisection steps once a bracket is found
const SCALING_NUM_ITERATIONS: usize = 10;

/// Bracket growth steps before giving up
const MAX_BRACKET_STEPS: usize = 20;

/// Scaling failures; all report status 1
#[derive(Debug, Error)]
pub enum ScalingError {
    #[error("inconsistent scaling input: {0}")]
    InconsistentInput(String),

    #[error("missing frequency ratios for {0}")]
    MissingFreqRatios(String),

    #[error("ideal Karlin-Altschul parameters have not been computed")]
    MissingIdeal,

    #[error("score {score} at column {column}, row {row} exceeds the score range")]
    ScoreOutOfRange { column: usize, row: usize, score: i64 },

    #[error("expected PSSM score {0} is not negative")]
    PositiveExpectedScore(f64),

    #[error("could not bracket target lambda {target}")]
    NoBracket { target: f64 },

    #[error("Karlin-Altschul calculation failed: {0}")]
    Karlin(String),
}

impl ScalingError {
    pub fn status_code(&self) -> i32 {
        SCALING_FAILURE_STATUS
    }
}

/// PSSM under construction
///
/// NCBI reference: blast_posit.h
/// ```c
/// typedef struct Kappa_posSearchItems {
///     int**               posMatrix;
///     int**               posPrivateMatrix;
///     double**            posFreqs;
///     SFreqRatios*        stdFreqRatios;
///     unsigned int        queryLength;
/// } Kappa_posSearchItems;
/// ```
#[derive(Debug, Clone)]
pub struct PosSearchItems {
    /// Final scores, one row of `BLASTAA_SIZE` per query position
    pub pos_matrix: Vec<[i32; BLASTAA_SIZE]>,
    /// Scores at `PSI_SCALE_FACTOR` resolution
    pub pos_private_matrix: Vec<[i32; BLASTAA_SIZE]>,
    /// Frequency ratios per query position
    pub pos_freqs: Vec<Vec<f64>>,
    /// Ratios of the underlying matrix, shared across computations
    pub std_freq_ratios: Arc<FreqRatios>,
    pub query_length: usize,
}

impl PosSearchItems {
    pub fn new(
        query_length: usize,
        std_freq_ratios: Arc<FreqRatios>,
        pos_freqs: Vec<Vec<f64>>,
    ) -> Self {
        Self {
            pos_matrix: vec![[0; BLASTAA_SIZE]; query_length],
            pos_private_matrix: vec![[0; BLASTAA_SIZE]; query_length],
            pos_freqs,
            std_freq_ratios,
            query_length,
        }
    }
}

/// Query-level data the scaling reads
///
/// NCBI reference: blast_posit.h Kappa_compactSearchItems
#[derive(Debug, Clone)]
pub struct CompactSearchItems<'a> {
    pub query: &'a [u8],
    pub alphabet_size: usize,
    pub matrix: &'a ScoreMatrix,
    pub gapped_calculation: bool,
    /// Observed ungapped Lambda of the query
    pub lambda: f64,
    pub lambda_ideal: f64,
    pub k_ideal: f64,
    pub standard_prob: &'a [f64; BLASTAA_SIZE],
}

impl<'a> CompactSearchItems<'a> {
    /// Collect the query-level values from a score block; the ideal block
    /// must already be attached
    pub fn new(
        query: &'a [u8],
        sbp: &'a ScoreBlk,
        gapped_calculation: bool,
    ) -> Result<Self, ScalingError> {
        let ideal = sbp.kbp_ideal.ok_or(ScalingError::MissingIdeal)?;
        let lambda = sbp
            .kbp_std
            .first()
            .copied()
            .flatten()
            .map_or(ideal.lambda, |k| k.lambda);
        Ok(Self {
            query,
            alphabet_size: BLASTAA_SIZE,
            matrix: &sbp.matrix,
            gapped_calculation,
            lambda,
            lambda_ideal: ideal.lambda,
            k_ideal: ideal.k,
            standard_prob: &sbp.std_probs,
        })
    }
}

/// Result of a successful scaling
#[derive(Debug, Clone, Copy)]
pub struct ScalingOutcome {
    /// Multiplier applied to the private matrix
    pub factor: f64,
    pub target_lambda: f64,
    /// Ungapped parameters of the final matrix
    pub params: KarlinParams,
    /// Number of Lambda evaluations
    pub evaluations: usize,
}

fn validate(
    pos: &PosSearchItems,
    compact: &CompactSearchItems<'_>,
    scaling_factor: f64,
) -> Result<(), ScalingError> {
    if scaling_factor.is_nan() || scaling_factor <= 0.0 {
        return Err(ScalingError::InconsistentInput(format!(
            "scaling factor must be positive, got {}",
            scaling_factor
        )));
    }
    if compact.alphabet_size != BLASTAA_SIZE {
        return Err(ScalingError::InconsistentInput(format!(
            "alphabet size {} (expected {})",
            compact.alphabet_size, BLASTAA_SIZE
        )));
    }
    if pos.query_length == 0 || compact.query.len() != pos.query_length {
        return Err(ScalingError::InconsistentInput(format!(
            "query length {} does not match PSSM length {}",
            compact.query.len(),
            pos.query_length
        )));
    }
    if pos.pos_freqs.len() != pos.query_length {
        return Err(ScalingError::InconsistentInput(format!(
            "{} frequency-ratio columns for a query of length {}",
            pos.pos_freqs.len(),
            pos.query_length
        )));
    }
    if let Some((c, row)) = pos
        .pos_freqs
        .iter()
        .enumerate()
        .find(|(_, row)| row.len() != compact.alphabet_size)
    {
        return Err(ScalingError::InconsistentInput(format!(
            "frequency-ratio column {} has {} rows (expected {})",
            c,
            row.len(),
            compact.alphabet_size
        )));
    }
    if pos.std_freq_ratios.matrix_name() != compact.matrix.name() {
        return Err(ScalingError::MissingFreqRatios(compact.matrix.name().to_string()));
    }
    Ok(())
}

/// Fill the private matrix from the frequency ratios.
/// Columns without any ratio on the true residues take the underlying
/// matrix scores, as do ambiguity and stop rows.
fn fill_private_matrix(
    pos: &mut PosSearchItems,
    compact: &CompactSearchItems<'_>,
    scaling_factor: f64,
) {
    let scaled_lambda = compact.lambda_ideal / scaling_factor;
    pos.pos_private_matrix.resize(pos.query_length, [0; BLASTAA_SIZE]);
    pos.pos_matrix.resize(pos.query_length, [0; BLASTAA_SIZE]);

    for (c, row) in pos.pos_private_matrix.iter_mut().enumerate() {
        let query_res = compact.query[c];
        let ratios = &pos.pos_freqs[c];
        let has_ratios = ratios
            .iter()
            .enumerate()
            .any(|(r, &v)| is_true_residue(r) && v > 0.0);
        for (r, cell) in row.iter_mut().enumerate() {
            *cell = if r == ncbistdaa::GAP as usize {
                BLAST_SCORE_MIN
            } else if has_ratios && is_true_residue(r) {
                if ratios[r] > 0.0 {
                    (PSI_SCALE_FACTOR * ratios[r].ln() / scaled_lambda).round() as i32
                } else {
                    BLAST_SCORE_MIN
                }
            } else {
                let score = compact.matrix.score(query_res, r as u8) as f64;
                (score * scaling_factor * PSI_SCALE_FACTOR).round() as i32
            };
        }
    }
}

/// Rescale the private matrix by `factor` into `out`
fn scale_matrix(
    private: &[[i32; BLASTAA_SIZE]],
    factor: f64,
    out: &mut [[i32; BLASTAA_SIZE]],
) -> Result<(), ScalingError> {
    for (c, (src, dst)) in private.iter().zip(out.iter_mut()).enumerate() {
        for (r, (&p, d)) in src.iter().zip(dst.iter_mut()).enumerate() {
            if p == BLAST_SCORE_MIN {
                *d = BLAST_SCORE_MIN;
                continue;
            }
            let v = (factor * p as f64 / PSI_SCALE_FACTOR).round() as i64;
            if v.abs() > SCORE_MATRIX_SCORE_RANGE as i64 {
                return Err(ScalingError::ScoreOutOfRange {
                    column: c,
                    row: r,
                    score: v,
                });
            }
            *d = v as i32;
        }
    }
    Ok(())
}

/// Score distribution of a PSSM against the background probabilities.
/// Columns whose query residue is X do not contribute.
pub fn pssm_score_profile(
    matrix: &[[i32; BLASTAA_SIZE]],
    query: &[u8],
    standard_prob: &[f64; BLASTAA_SIZE],
) -> ScoreFreqProfile {
    let observations: Vec<(i32, f64)> = matrix
        .iter()
        .zip(query.iter())
        .filter(|(_, &q)| q != ncbistdaa::X)
        .flat_map(|(row, _)| {
            row.iter()
                .enumerate()
                .filter(|&(r, &s)| is_true_residue(r) && s != BLAST_SCORE_MIN)
                .map(|(r, &s)| (s, standard_prob[r]))
        })
        .collect();

    let lo = observations.iter().map(|o| o.0).min().unwrap_or(-1).min(-1);
    let hi = observations.iter().map(|o| o.0).max().unwrap_or(1).max(1);
    ScoreFreqProfile::from_weighted_scores(lo, hi, observations)
}

struct Evaluator<'p, 'c> {
    pos: &'p mut PosSearchItems,
    compact: &'p CompactSearchItems<'c>,
    evaluations: usize,
}

impl Evaluator<'_, '_> {
    /// Scale into `pos_matrix` and return its ungapped Lambda
    fn lambda_at(&mut self, factor: f64) -> Result<f64, ScalingError> {
        scale_matrix(&self.pos.pos_private_matrix, factor, &mut self.pos.pos_matrix)?;
        let sfp = pssm_score_profile(
            &self.pos.pos_matrix,
            self.compact.query,
            self.compact.standard_prob,
        );
        self.evaluations += 1;
        if sfp.score_avg() >= 0.0 {
            return Err(ScalingError::PositiveExpectedScore(sfp.score_avg()));
        }
        let lambda =
            compute_lambda_nr(&sfp, BLAST_KARLIN_LAMBDA0_DEFAULT).map_err(ScalingError::Karlin)?;
        log::trace!("scaling factor {:.6}: lambda {:.6}", factor, lambda);
        Ok(lambda)
    }
}

/// Find the factor whose Lambda is closest to `target`
fn search_factor(eval: &mut Evaluator<'_, '_>, target: f64) -> Result<f64, ScalingError> {
    let lambda = eval.lambda_at(1.0)?;
    if (lambda - target).abs() <= SCALING_TOLERANCE * target {
        return Ok(1.0);
    }

    // Larger factors give larger scores and a smaller Lambda
    let (mut low, mut high);
    if lambda > target {
        low = 1.0;
        high = 1.0 + SCALING_PERCENT;
        let mut steps = 0;
        while eval.lambda_at(high)? > target {
            low = high;
            high += high - 1.0;
            steps += 1;
            if steps > MAX_BRACKET_STEPS {
                return Err(ScalingError::NoBracket { target });
            }
        }
    } else {
        high = 1.0;
        low = 1.0 - SCALING_PERCENT;
        while eval.lambda_at(low)? < target {
            high = low;
            low -= 1.0 - low;
            if low <= 0.0 {
                return Err(ScalingError::NoBracket { target });
            }
        }
    }
    log::debug!("scaling bracket [{:.4}, {:.4}] for lambda {:.5}", low, high, target);

    for _ in 0..SCALING_NUM_ITERATIONS {
        let mid = (low + high) / 2.0;
        if eval.lambda_at(mid)? > target {
            low = mid;
        } else {
            high = mid;
        }
    }
    Ok((low + high) / 2.0)
}

/// Scale the position-specific matrix so that its Lambda matches
/// `lambda_ideal / scaling_factor`.
///
/// On success `pos.pos_matrix` holds the final scores, `sbp.kbp_psi[0]` the
/// matrix's ungapped parameters and `sbp.kbp_gap_psi[0]` the gapped
/// parameters adjusted for `scaling_factor`.
pub fn impala_scaling(
    pos: &mut PosSearchItems,
    compact: &CompactSearchItems<'_>,
    scaling_factor: f64,
    do_binary_search: bool,
    sbp: &mut ScoreBlk,
) -> Result<ScalingOutcome, ScalingError> {
    validate(pos, compact, scaling_factor)?;

    fill_private_matrix(pos, compact, scaling_factor);
    let target = compact.lambda_ideal / scaling_factor;

    let mut eval = Evaluator {
        pos: &mut *pos,
        compact,
        evaluations: 0,
    };
    let factor = if do_binary_search {
        search_factor(&mut eval, target)?
    } else {
        // Lambda scales inversely with the scores
        let lambda = eval.lambda_at(1.0)?;
        lambda / target
    };
    let evaluations = eval.evaluations;

    scale_matrix(&pos.pos_private_matrix, factor, &mut pos.pos_matrix)?;
    let sfp = pssm_score_profile(&pos.pos_matrix, compact.query, compact.standard_prob);
    let params = compute_karlin_params_ungapped(&sfp).map_err(ScalingError::Karlin)?;
    log::debug!(
        "impala scaling: factor={:.5} lambda={:.5} target={:.5} ({} evaluations)",
        factor,
        params.lambda,
        target,
        evaluations
    );

    if let Some(slot) = sbp.kbp_psi.first_mut() {
        *slot = Some(params);
    }
    if compact.gapped_calculation {
        let gap_std = sbp.kbp_gap_std.first().copied().flatten();
        if let (Some(slot), Some(gap)) = (sbp.kbp_gap_psi.first_mut(), gap_std) {
            *slot = Some(KarlinParams {
                lambda: gap.lambda / scaling_factor,
                ..gap
            });
        }
    }

    Ok(ScalingOutcome {
        factor,
        target_lambda: target,
        params,
        evaluations,
    })
}

//! Karlin-Altschul parameter calculation from score distributions
//!
//! Reference: ncbi-blast/c++/src/algo/blast/core/blast_stat.c
//!   - Blast_ResFreqStdComp: standard background composition
//!   - BlastScoreFreqCalc: score frequency profile of a matrix
//!   - Blast_KarlinBlkUngappedCalc: Lambda, K, H
//!   - Blast_KarlinBlkIdealCalc: parameters for the standard composition
//!
//! The same profile type serves position-specific matrices, where score
//! probabilities come from PSSM columns rather than from two compositions.

use crate::stats::KarlinParams;
use crate::utils::matrix::{aa_char_to_ncbistdaa, ncbistdaa, ScoreMatrix, BLASTAA_SIZE};

// NCBI reference: ncbi-blast/c++/include/algo/blast/core/blast_stat.h:121-122
pub const BLAST_SCORE_MIN: i32 = i16::MIN as i32;
pub const BLAST_SCORE_MAX: i32 = i16::MAX as i32;

// NCBI reference: ncbi-blast/c++/src/algo/blast/core/blast_stat.c:56-72
const BLAST_SCORE_RANGE_MAX: i32 = BLAST_SCORE_MAX - BLAST_SCORE_MIN;
const BLAST_KARLIN_K_SUMLIMIT_DEFAULT: f64 = 0.0001;
const BLAST_KARLIN_LAMBDA_ACCURACY_DEFAULT: f64 = 1.0e-5;
const BLAST_KARLIN_LAMBDA_ITER_DEFAULT: i32 = 17;
pub const BLAST_KARLIN_LAMBDA0_DEFAULT: f64 = 0.5;
const BLAST_KARLIN_K_ITER_MAX: i32 = 100;

/// Robinson & Robinson background frequencies (per thousand)
/// Reference: ncbi-blast/c++/src/algo/blast/core/blast_stat.c STD_AMINO_ACID_FREQS
const ROBINSON_FREQS: [(u8, f64); 20] = [
    (b'A', 78.05),
    (b'C', 19.25),
    (b'D', 53.64),
    (b'E', 62.95),
    (b'F', 38.56),
    (b'G', 73.77),
    (b'H', 21.99),
    (b'I', 51.42),
    (b'K', 57.44),
    (b'L', 90.19),
    (b'M', 22.43),
    (b'N', 44.87),
    (b'P', 52.03),
    (b'Q', 42.64),
    (b'R', 51.29),
    (b'S', 71.20),
    (b'T', 58.41),
    (b'V', 64.41),
    (b'W', 13.30),
    (b'Y', 32.16),
];

/// Compute amino acid composition of unguarded NCBISTDAA residues
/// Reference: NCBI Blast_ResFreqString (blast_stat.c:2078-2091)
pub fn compute_aa_composition(residues: &[u8]) -> [f64; BLASTAA_SIZE] {
    let mut comp: [u64; BLASTAA_SIZE] = [0; BLASTAA_SIZE];
    for &residue in residues {
        if (residue as usize) < BLASTAA_SIZE {
            comp[residue as usize] += 1;
        }
    }

    // Ambiguous residues are zeroed (BLAST_ScoreSetAmbigRes sets only X for BLASTAA)
    comp[ncbistdaa::X as usize] = 0;
    comp[ncbistdaa::GAP as usize] = 0;

    let sum: u64 = comp.iter().sum();
    let mut freq = [0.0; BLASTAA_SIZE];
    if sum > 0 {
        for (f, &c) in freq.iter_mut().zip(comp.iter()) {
            *f = c as f64 / sum as f64;
        }
    }
    freq
}

/// Standard amino acid composition indexed by NCBISTDAA.
/// Ambiguity codes, stop and gap get zero probability.
pub fn compute_std_aa_composition() -> [f64; BLASTAA_SIZE] {
    let mut freq = [0.0; BLASTAA_SIZE];
    for &(letter, per_mille) in ROBINSON_FREQS.iter() {
        freq[aa_char_to_ncbistdaa(letter) as usize] = per_mille;
    }

    let sum: f64 = freq.iter().sum();
    for f in freq.iter_mut() {
        *f /= sum;
    }
    freq
}

/// Score frequency profile
/// Stores probability distribution of alignment scores
#[derive(Debug, Clone)]
pub struct ScoreFreqProfile {
    /// Score probabilities indexed by `score - score_min`
    sprob: Vec<f64>,
    /// Minimum score with non-zero probability
    obs_min: i32,
    /// Maximum score with non-zero probability
    obs_max: i32,
    /// Average score (must be negative for valid Karlin params)
    score_avg: f64,
    /// Lowest representable score
    score_min: i32,
}

impl ScoreFreqProfile {
    pub fn new(score_min: i32, score_max: i32) -> Self {
        let range = (score_max - score_min + 1).max(1) as usize;
        Self {
            sprob: vec![0.0; range],
            obs_min: 0,
            obs_max: 0,
            score_avg: 0.0,
            score_min,
        }
    }

    /// Profile of a substitution matrix scored between two compositions
    /// Reference: NCBI BlastScoreFreqCalc (blast_stat.c:2151-2205)
    pub fn from_compositions(
        matrix: &ScoreMatrix,
        comp1: &[f64; BLASTAA_SIZE],
        comp2: &[f64; BLASTAA_SIZE],
    ) -> Self {
        let mut sfp = Self::new(matrix.loscore(), matrix.hiscore());
        for i in 0..BLASTAA_SIZE {
            if comp1[i] == 0.0 {
                continue;
            }
            for j in 0..BLASTAA_SIZE {
                let score = matrix.score(i as u8, j as u8);
                if score >= matrix.loscore() {
                    sfp.add_prob(score, comp1[i] * comp2[j]);
                }
            }
        }
        sfp.normalize();
        sfp
    }

    /// Profile built from arbitrary (score, weight) observations.
    /// Observations outside `[score_min, score_max]` are ignored.
    pub fn from_weighted_scores<I>(score_min: i32, score_max: i32, observations: I) -> Self
    where
        I: IntoIterator<Item = (i32, f64)>,
    {
        let mut sfp = Self::new(score_min, score_max);
        for (score, weight) in observations {
            sfp.add_prob(score, weight);
        }
        sfp.normalize();
        sfp
    }

    pub fn get_prob(&self, score: i32) -> f64 {
        if score < self.score_min {
            return 0.0;
        }
        self.sprob
            .get((score - self.score_min) as usize)
            .copied()
            .unwrap_or(0.0)
    }

    fn add_prob(&mut self, score: i32, prob: f64) {
        if score < self.score_min {
            return;
        }
        if let Some(slot) = self.sprob.get_mut((score - self.score_min) as usize) {
            *slot += prob;
        }
    }

    /// Find observed min/max, rescale to a distribution and compute the mean
    /// Reference: ncbi-blast/c++/src/algo/blast/core/blast_stat.c:2183-2205
    fn normalize(&mut self) {
        let mut score_sum = 0.0;
        let mut obs_min = BLAST_SCORE_MIN;
        let mut obs_max = BLAST_SCORE_MIN;
        for (idx, &prob) in self.sprob.iter().enumerate() {
            if prob > 0.0 {
                let score = self.score_min + idx as i32;
                score_sum += prob;
                obs_max = score;
                if obs_min == BLAST_SCORE_MIN {
                    obs_min = score;
                }
            }
        }
        self.obs_min = obs_min;
        self.obs_max = obs_max;

        let mut score_avg = 0.0;
        if score_sum > 0.0001 {
            for (idx, prob) in self.sprob.iter_mut().enumerate() {
                *prob /= score_sum;
                score_avg += (self.score_min + idx as i32) as f64 * *prob;
            }
        }
        self.score_avg = score_avg;
    }

    pub fn obs_min(&self) -> i32 {
        self.obs_min
    }

    pub fn obs_max(&self) -> i32 {
        self.obs_max
    }

    pub fn score_avg(&self) -> f64 {
        self.score_avg
    }

    pub fn sprob(&self) -> &[f64] {
        &self.sprob
    }
}

/// NCBI reference: ncbi-blast/c++/src/algo/blast/core/ncbi_math.c:405-418
fn blast_gcd(mut a: i32, mut b: i32) -> i32 {
    b = b.abs();
    if b > a {
        std::mem::swap(&mut a, &mut b);
    }
    while b != 0 {
        let c = a % b;
        a = b;
        b = c;
    }
    a
}

/// NCBI reference: ncbi-blast/c++/src/algo/blast/core/blast_stat.c:2099-2109
fn blast_score_chk(lo: i32, hi: i32) -> Result<(), String> {
    if lo >= 0 || hi <= 0 || lo < BLAST_SCORE_MIN || hi > BLAST_SCORE_MAX {
        return Err(format!("Invalid score range [{}, {}]", lo, hi));
    }
    if hi - lo > BLAST_SCORE_RANGE_MAX {
        return Err("Score range exceeds BLAST_SCORE_RANGE_MAX".to_string());
    }
    Ok(())
}

/// NCBI reference: ncbi-blast/c++/src/algo/blast/core/ncbi_math.c:33-55
fn blast_expm1(x: f64) -> f64 {
    let absx = x.abs();
    if absx > 0.33 {
        return x.exp() - 1.0;
    }
    if absx < 1.0e-16 {
        return x;
    }
    x * (1.0
        + x * (1.0 / 2.0
            + x * (1.0 / 6.0
                + x * (1.0 / 24.0
                    + x * (1.0 / 120.0
                        + x * (1.0 / 720.0
                            + x * (1.0 / 5040.0
                                + x * (1.0 / 40320.0
                                    + x * (1.0 / 362880.0
                                        + x * (1.0 / 3628800.0
                                            + x * (1.0 / 39916800.0
                                                + x * (1.0 / 479001600.0
                                                    + x / 6227020800.0))))))))))))
}

/// NCBI reference: ncbi-blast/c++/src/algo/blast/core/ncbi_math.c:444-470
fn blast_powi(mut x: f64, mut n: i32) -> f64 {
    if n == 0 {
        return 1.0;
    }
    if x == 0.0 {
        return if n < 0 { f64::INFINITY } else { 0.0 };
    }
    if n < 0 {
        x = 1.0 / x;
        n = -n;
    }
    let mut y = 1.0;
    while n > 0 {
        if (n & 1) != 0 {
            y *= x;
        }
        n /= 2;
        x *= x;
    }
    y
}

/// Greatest common divisor of all scores with non-zero probability
fn score_gcd(sfp: &ScoreFreqProfile) -> i32 {
    let low = sfp.obs_min();
    let mut d = -low;
    for i in 1..=(sfp.obs_max() - low) {
        if d <= 1 {
            break;
        }
        if sfp.get_prob(low + i) != 0.0 {
            d = blast_gcd(d, i);
        }
    }
    d
}

/// NCBI reference: ncbi-blast/c++/src/algo/blast/core/blast_stat.c:2491-2563
#[allow(clippy::too_many_arguments)]
fn nlm_karlin_lambda_nr(
    sfp: &ScoreFreqProfile,
    d: i32,
    low: i32,
    high: i32,
    lambda0: f64,
    tolx: f64,
    itmax: i32,
    max_newton: i32,
) -> Result<f64, String> {
    if d <= 0 {
        return Err("GCD must be positive".to_string());
    }

    let x0 = (-lambda0).exp();
    let mut x = if x0 > 0.0 && x0 < 1.0 { x0 } else { 0.5 };
    let mut a = 0.0;
    let mut b = 1.0;
    let mut f = 4.0;
    let mut is_newton = false;

    for k in 0..itmax {
        let fold = f;
        let was_newton = is_newton;
        is_newton = false;

        // Horner's rule for the polynomial and its derivative
        let mut g = 0.0;
        f = sfp.get_prob(low);
        let mut i = low + d;
        while i < 0 {
            g = x * g + f;
            f = f * x + sfp.get_prob(i);
            i += d;
        }
        g = x * g + f;
        f = f * x + sfp.get_prob(0) - 1.0;
        i = d;
        while i <= high {
            g = x * g + f;
            f = f * x + sfp.get_prob(i);
            i += d;
        }

        if f > 0.0 {
            a = x;
        } else if f < 0.0 {
            b = x;
        } else {
            break;
        }
        if b - a < 2.0 * a * (1.0 - b) * tolx {
            x = (a + b) / 2.0;
            break;
        }

        if k >= max_newton || (was_newton && f.abs() > 0.9 * fold.abs()) || g >= 0.0 {
            x = (a + b) / 2.0;
        } else {
            let p = -f / g;
            let y = x + p;
            if y <= a || y >= b {
                x = (a + b) / 2.0;
            } else {
                is_newton = true;
                x = y;
                if p.abs() < tolx * x * (1.0 - x) {
                    break;
                }
            }
        }
    }

    Ok(-x.ln() / d as f64)
}

/// Compute Lambda by Newton-Raphson with bisection safeguard
/// Reference: NCBI Blast_KarlinLambdaNR (blast_stat.c:2567-2598)
pub fn compute_lambda_nr(sfp: &ScoreFreqProfile, initial_guess: f64) -> Result<f64, String> {
    let low = sfp.obs_min();
    let high = sfp.obs_max();

    if sfp.score_avg() >= 0.0 {
        return Err("Expected score must be negative".to_string());
    }
    blast_score_chk(low, high)?;

    nlm_karlin_lambda_nr(
        sfp,
        score_gcd(sfp),
        low,
        high,
        initial_guess,
        BLAST_KARLIN_LAMBDA_ACCURACY_DEFAULT,
        20,
        20 + BLAST_KARLIN_LAMBDA_ITER_DEFAULT,
    )
}

/// Compute H from Lambda
/// Reference: NCBI BlastKarlinLtoH (blast_stat.c:2607-2633)
fn compute_h_from_lambda(sfp: &ScoreFreqProfile, lambda: f64) -> Result<f64, String> {
    if lambda < 0.0 {
        return Err("Lambda must be non-negative".to_string());
    }

    let low = sfp.obs_min();
    let high = sfp.obs_max();
    blast_score_chk(low, high)?;

    let etonlam = (-lambda).exp();
    let mut sum = (low as f64) * sfp.get_prob(low);
    for score in (low + 1)..=high {
        sum = (score as f64) * sfp.get_prob(score) + etonlam * sum;
    }

    let scale = blast_powi(etonlam, high);
    let h = if scale > 0.0 {
        lambda * sum / scale
    } else {
        // Underflow: use log form
        lambda * (lambda * high as f64 + sum.ln()).exp()
    };
    Ok(h)
}

/// Compute K from Lambda and H
/// Reference: NCBI BlastKarlinLHtoK (blast_stat.c:2247-2418)
fn compute_k_from_lambda_h(sfp: &ScoreFreqProfile, lambda: f64, h: f64) -> Result<f64, String> {
    if lambda <= 0.0 || h <= 0.0 {
        return Err("Lambda and H must be positive".to_string());
    }
    if sfp.score_avg() >= 0.0 {
        return Err("Expected score must be negative".to_string());
    }

    let mut low = sfp.obs_min();
    let mut high = sfp.obs_max();
    blast_score_chk(low, high)?;

    let divisor = score_gcd(sfp);
    let prob_array_start_low: Vec<f64> = (0..=(high - low))
        .step_by(divisor as usize)
        .map(|i| sfp.get_prob(low + i))
        .collect();

    high /= divisor;
    low /= divisor;
    let lambda = lambda * divisor as f64;
    let range = high - low;

    let mut first_term_closed_form = h / lambda;
    let exp_minus_lambda = (-lambda).exp();

    if low == -1 && high == 1 {
        let low_prob = sfp.get_prob(low * divisor);
        let high_prob = sfp.get_prob(high * divisor);
        let diff = low_prob - high_prob;
        return Ok(diff * diff / low_prob);
    }

    if low == -1 || high == 1 {
        if high != 1 {
            let score_avg = sfp.score_avg() / divisor as f64;
            first_term_closed_form = (score_avg * score_avg) / first_term_closed_form;
        }
        return Ok(first_term_closed_form * (1.0 - exp_minus_lambda));
    }

    let array_len = (BLAST_KARLIN_K_ITER_MAX as usize) * (range as usize) + 1;
    let mut alignment_score_probabilities = vec![0.0; array_len];
    let mut outer_sum = 0.0;
    let mut low_alignment_score = 0;
    let mut high_alignment_score = 0;
    let mut inner_sum = 1.0;
    alignment_score_probabilities[0] = 1.0;

    let mut iter_counter = 0;
    while iter_counter < BLAST_KARLIN_K_ITER_MAX && inner_sum > BLAST_KARLIN_K_SUMLIMIT_DEFAULT {
        let mut first = range;
        let mut last = range;
        low_alignment_score += low;
        high_alignment_score += high;

        let mut ptr_p_idx = (high_alignment_score - low_alignment_score) as isize;
        while ptr_p_idx >= 0 {
            let mut ptr1_idx = ptr_p_idx - first as isize;
            let ptr1e_idx = ptr_p_idx - last as isize;
            let mut ptr2_idx = first as isize;

            inner_sum = 0.0;
            while ptr1_idx >= ptr1e_idx {
                inner_sum += alignment_score_probabilities[ptr1_idx as usize]
                    * prob_array_start_low[ptr2_idx as usize];
                ptr1_idx -= 1;
                ptr2_idx += 1;
            }
            if first > 0 {
                first -= 1;
            }
            if ptr_p_idx <= range as isize {
                last -= 1;
            }
            alignment_score_probabilities[ptr_p_idx as usize] = inner_sum;
            ptr_p_idx -= 1;
        }

        let mut ptr_p_idx = 0usize;
        inner_sum = alignment_score_probabilities[ptr_p_idx];
        let mut i = low_alignment_score + 1;
        while i < 0 {
            ptr_p_idx += 1;
            inner_sum = alignment_score_probabilities[ptr_p_idx] + inner_sum * exp_minus_lambda;
            i += 1;
        }
        inner_sum *= exp_minus_lambda;

        while i <= high_alignment_score {
            ptr_p_idx += 1;
            inner_sum += alignment_score_probabilities[ptr_p_idx];
            i += 1;
        }

        iter_counter += 1;
        inner_sum /= iter_counter as f64;
        outer_sum += inner_sum;
    }

    let k = -(-2.0 * outer_sum).exp() / (first_term_closed_form * blast_expm1(-lambda));
    if k <= 0.0 {
        return Err("Computed K is non-positive".to_string());
    }
    Ok(k)
}

/// Compute Karlin-Altschul parameters from a score frequency profile
/// Reference: NCBI Blast_KarlinBlkUngappedCalc (blast_stat.c:2699-2734)
///
/// Alpha and beta only exist for tabulated parameters and are left at 0.
pub fn compute_karlin_params_ungapped(sfp: &ScoreFreqProfile) -> Result<KarlinParams, String> {
    let lambda = compute_lambda_nr(sfp, BLAST_KARLIN_LAMBDA0_DEFAULT)?;
    let h = compute_h_from_lambda(sfp, lambda)?;
    let k = compute_k_from_lambda_h(sfp, lambda, h)?;
    Ok(KarlinParams {
        lambda,
        k,
        h,
        alpha: 0.0,
        beta: 0.0,
    })
}

/// Parameters of a matrix for standard composition against itself
/// Reference: NCBI Blast_KarlinBlkIdealCalc (blast_stat.c)
pub fn compute_karlin_params_ideal(matrix: &ScoreMatrix) -> Result<KarlinParams, String> {
    let std = compute_std_aa_composition();
    let sfp = ScoreFreqProfile::from_compositions(matrix, &std, &std);
    compute_karlin_params_ungapped(&sfp)
}

/// Apply check_ideal logic: use ideal params if computed Lambda >= ideal Lambda
/// Reference: NCBI blast_stat.c:2796-2797
pub fn apply_check_ideal(computed: KarlinParams, ideal: KarlinParams) -> KarlinParams {
    if computed.lambda >= ideal.lambda {
        ideal
    } else {
        computed
    }
}

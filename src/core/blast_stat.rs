//! Score block: substitution matrix plus Karlin-Altschul parameter blocks
//!
//! Reference: ncbi-blast/c++/src/algo/blast/core/blast_stat.c (BlastScoreBlk)
//!
//! ```c
//! typedef struct BlastScoreBlk {
//!     Boolean     protein_alphabet;
//!     SBlastScoreMatrix* matrix;
//!     Int4 loscore, hiscore;
//!     double scale_factor;
//!     Blast_KarlinBlk** kbp_std, **kbp_psi, **kbp_gap_std, **kbp_gap_psi;
//!     Blast_KarlinBlk*  kbp_ideal;
//!     ...
//! } BlastScoreBlk;
//! ```

use crate::stats::{apply_check_ideal, KarlinParams};
use crate::utils::matrix::{ScoreMatrix, BLASTAA_SIZE};

/// Scoring context of one query
#[derive(Debug, Clone)]
pub struct ScoreBlk {
    pub protein_alphabet: bool,
    pub matrix: ScoreMatrix,
    pub scale_factor: f64,
    pub gap_open: i32,
    pub gap_extend: i32,
    /// Ungapped parameters per context (query composition vs. background)
    pub kbp_std: Vec<Option<KarlinParams>>,
    /// Ungapped parameters of the position-specific matrix
    pub kbp_psi: Vec<Option<KarlinParams>>,
    pub kbp_gap_std: Vec<Option<KarlinParams>>,
    pub kbp_gap_psi: Vec<Option<KarlinParams>>,
    /// Parameters for standard composition; required before scaling
    pub kbp_ideal: Option<KarlinParams>,
    /// Background (Robinson) residue probabilities
    pub std_probs: [f64; BLASTAA_SIZE],
    /// Observed residue composition per context
    pub query_comp: Vec<[f64; BLASTAA_SIZE]>,
}

impl ScoreBlk {
    /// Empty block for `num_contexts` contexts
    pub fn new(matrix: ScoreMatrix, num_contexts: usize, std_probs: [f64; BLASTAA_SIZE]) -> Self {
        Self {
            protein_alphabet: true,
            matrix,
            scale_factor: 1.0,
            gap_open: 0,
            gap_extend: 0,
            kbp_std: vec![None; num_contexts],
            kbp_psi: vec![None; num_contexts],
            kbp_gap_std: vec![None; num_contexts],
            kbp_gap_psi: vec![None; num_contexts],
            kbp_ideal: None,
            std_probs,
            query_comp: vec![[0.0; BLASTAA_SIZE]; num_contexts],
        }
    }

    pub fn num_contexts(&self) -> usize {
        self.kbp_std.len()
    }

    pub fn loscore(&self) -> i32 {
        self.matrix.loscore()
    }

    pub fn hiscore(&self) -> i32 {
        self.matrix.hiscore()
    }

    /// Replace computed ungapped parameters with the ideal ones when the
    /// computed Lambda is not smaller
    pub fn check_ideal(&self, computed: KarlinParams) -> KarlinParams {
        match self.kbp_ideal {
            Some(ideal) => apply_check_ideal(computed, ideal),
            None => computed,
        }
    }
}

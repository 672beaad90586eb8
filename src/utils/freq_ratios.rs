//! Joint-to-background frequency ratios of a substitution matrix
//!
//! A matrix score s in 1/b bit units corresponds to the ratio
//! q(i,j) / (p(i) p(j)) = 2^(s/b). Only the 20 real amino acids carry
//! ratios; every other cell is zero.

use crate::config::ScoringMatrixName;
use crate::utils::matrix::{is_true_residue, ScoreMatrix, BLASTAA_SIZE};

#[derive(Debug, Clone)]
pub struct FreqRatios {
    matrix: ScoringMatrixName,
    data: [[f64; BLASTAA_SIZE]; BLASTAA_SIZE],
}

impl FreqRatios {
    pub fn for_matrix(matrix: &ScoreMatrix) -> Self {
        let name = matrix.name();
        let bit_scale = name.bit_scale_factor();
        let mut data = [[0.0; BLASTAA_SIZE]; BLASTAA_SIZE];
        for (i, row) in data.iter_mut().enumerate() {
            if !is_true_residue(i) {
                continue;
            }
            for (j, cell) in row.iter_mut().enumerate() {
                if is_true_residue(j) {
                    let score = matrix.score(i as u8, j as u8) as f64;
                    *cell = 2f64.powf(score / bit_scale);
                }
            }
        }
        Self { matrix: name, data }
    }

    pub fn matrix_name(&self) -> ScoringMatrixName {
        self.matrix
    }

    #[inline]
    pub fn ratio(&self, i: usize, j: usize) -> f64 {
        self.data[i][j]
    }

    pub fn row(&self, i: usize) -> &[f64; BLASTAA_SIZE] {
        &self.data[i]
    }
}

//! Precomputed Karlin-Altschul parameters for the protein matrices
//!
//! Each table holds the ungapped entry first (gap costs `i32::MAX`) followed
//! by the supported gapped (open, extend) combinations.

use crate::config::ScoringMatrixName;

/// Karlin-Altschul statistical parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KarlinParams {
    /// Lambda parameter for bit score calculation
    pub lambda: f64,
    /// K parameter for E-value calculation
    pub k: f64,
    /// H parameter (relative entropy)
    pub h: f64,
    /// Alpha parameter for length correction mean
    pub alpha: f64,
    /// Beta parameter for length correction
    pub beta: f64,
}

impl KarlinParams {
    /// Parameters are usable only when Lambda, K and H are all positive
    pub fn is_valid(&self) -> bool {
        self.lambda > 0.0 && self.k > 0.0 && self.h > 0.0
    }
}

/// Entry in the statistical parameter table
/// Format: (gap_open, gap_extend, lambda, k, h, alpha, beta)
#[derive(Debug, Clone, Copy)]
struct ParamEntry {
    gap_open: i32,
    gap_extend: i32,
    lambda: f64,
    k: f64,
    h: f64,
    alpha: f64,
    beta: f64,
}

impl ParamEntry {
    const fn new(
        gap_open: i32,
        gap_extend: i32,
        lambda: f64,
        k: f64,
        h: f64,
        alpha: f64,
        beta: f64,
    ) -> Self {
        Self {
            gap_open,
            gap_extend,
            lambda,
            k,
            h,
            alpha,
            beta,
        }
    }

    fn to_karlin_params(self) -> KarlinParams {
        KarlinParams {
            lambda: self.lambda,
            k: self.k,
            h: self.h,
            alpha: self.alpha,
            beta: self.beta,
        }
    }

    fn is_ungapped(&self) -> bool {
        self.gap_open == i32::MAX && self.gap_extend == i32::MAX
    }
}

/// BLOSUM45 parameters
const BLOSUM45: &[ParamEntry] = &[
    ParamEntry::new(i32::MAX, i32::MAX, 0.2291, 0.0924, 0.2514, 0.9113, -5.7),
    ParamEntry::new(13, 3, 0.207, 0.049, 0.14, 1.5, -22.0),
    ParamEntry::new(12, 3, 0.199, 0.039, 0.11, 1.8, -34.0),
    ParamEntry::new(11, 3, 0.190, 0.031, 0.095, 2.0, -38.0),
    ParamEntry::new(10, 3, 0.179, 0.023, 0.075, 2.4, -51.0),
    ParamEntry::new(16, 2, 0.210, 0.051, 0.14, 1.5, -24.0),
    ParamEntry::new(15, 2, 0.203, 0.041, 0.12, 1.7, -31.0),
    ParamEntry::new(14, 2, 0.195, 0.032, 0.10, 1.9, -36.0),
    ParamEntry::new(13, 2, 0.185, 0.024, 0.084, 2.2, -45.0),
    ParamEntry::new(12, 2, 0.171, 0.016, 0.061, 2.8, -65.0),
    ParamEntry::new(19, 1, 0.205, 0.040, 0.11, 1.9, -43.0),
    ParamEntry::new(18, 1, 0.198, 0.032, 0.10, 2.0, -43.0),
    ParamEntry::new(17, 1, 0.189, 0.024, 0.079, 2.4, -57.0),
    ParamEntry::new(16, 1, 0.176, 0.016, 0.063, 2.8, -67.0),
];

/// BLOSUM50 parameters
const BLOSUM50: &[ParamEntry] = &[
    ParamEntry::new(i32::MAX, i32::MAX, 0.2318, 0.112, 0.3362, 0.6895, -4.0),
    ParamEntry::new(13, 3, 0.212, 0.063, 0.19, 1.1, -16.0),
    ParamEntry::new(12, 3, 0.206, 0.055, 0.17, 1.2, -18.0),
    ParamEntry::new(11, 3, 0.197, 0.042, 0.14, 1.4, -25.0),
    ParamEntry::new(10, 3, 0.186, 0.031, 0.11, 1.7, -34.0),
    ParamEntry::new(9, 3, 0.172, 0.022, 0.082, 2.1, -48.0),
    ParamEntry::new(16, 2, 0.215, 0.066, 0.20, 1.05, -15.0),
    ParamEntry::new(15, 2, 0.210, 0.058, 0.17, 1.2, -20.0),
    ParamEntry::new(14, 2, 0.202, 0.045, 0.14, 1.4, -27.0),
    ParamEntry::new(13, 2, 0.193, 0.035, 0.12, 1.6, -32.0),
    ParamEntry::new(12, 2, 0.181, 0.025, 0.095, 1.9, -41.0),
    ParamEntry::new(19, 1, 0.212, 0.057, 0.18, 1.2, -21.0),
    ParamEntry::new(18, 1, 0.207, 0.050, 0.15, 1.4, -28.0),
    ParamEntry::new(17, 1, 0.198, 0.037, 0.12, 1.6, -33.0),
    ParamEntry::new(16, 1, 0.186, 0.025, 0.10, 1.9, -42.0),
    ParamEntry::new(15, 1, 0.171, 0.015, 0.063, 2.7, -76.0),
];

/// BLOSUM62 parameters (default for protein)
const BLOSUM62: &[ParamEntry] = &[
    ParamEntry::new(i32::MAX, i32::MAX, 0.3176, 0.134, 0.4012, 0.7916, -3.2),
    ParamEntry::new(11, 2, 0.297, 0.082, 0.27, 1.1, -10.0),
    ParamEntry::new(10, 2, 0.291, 0.075, 0.23, 1.3, -15.0),
    ParamEntry::new(9, 2, 0.279, 0.058, 0.19, 1.5, -19.0),
    ParamEntry::new(8, 2, 0.264, 0.045, 0.15, 1.8, -26.0),
    ParamEntry::new(7, 2, 0.239, 0.027, 0.10, 2.5, -46.0),
    ParamEntry::new(6, 2, 0.201, 0.012, 0.061, 3.3, -58.0),
    ParamEntry::new(13, 1, 0.292, 0.071, 0.23, 1.2, -11.0),
    ParamEntry::new(12, 1, 0.283, 0.059, 0.19, 1.5, -19.0),
    ParamEntry::new(11, 1, 0.267, 0.041, 0.14, 1.9, -30.0),
    ParamEntry::new(10, 1, 0.243, 0.024, 0.10, 2.5, -44.0),
    ParamEntry::new(9, 1, 0.206, 0.010, 0.052, 4.0, -87.0),
];

/// BLOSUM80 parameters
const BLOSUM80: &[ParamEntry] = &[
    ParamEntry::new(i32::MAX, i32::MAX, 0.3430, 0.177, 0.6568, 0.5222, -1.6),
    ParamEntry::new(25, 2, 0.342, 0.17, 0.66, 0.52, -1.6),
    ParamEntry::new(13, 2, 0.336, 0.15, 0.57, 0.59, -3.0),
    ParamEntry::new(9, 2, 0.319, 0.11, 0.42, 0.76, -6.0),
    ParamEntry::new(8, 2, 0.308, 0.090, 0.35, 0.89, -9.0),
    ParamEntry::new(7, 2, 0.293, 0.070, 0.27, 1.1, -14.0),
    ParamEntry::new(6, 2, 0.268, 0.045, 0.19, 1.4, -19.0),
    ParamEntry::new(11, 1, 0.314, 0.095, 0.35, 0.90, -9.0),
    ParamEntry::new(10, 1, 0.299, 0.071, 0.27, 1.1, -14.0),
    ParamEntry::new(9, 1, 0.279, 0.048, 0.20, 1.4, -19.0),
];

/// BLOSUM90 parameters
const BLOSUM90: &[ParamEntry] = &[
    ParamEntry::new(i32::MAX, i32::MAX, 0.3346, 0.190, 0.7547, 0.4434, -1.4),
    ParamEntry::new(9, 2, 0.310, 0.12, 0.46, 0.67, -6.0),
    ParamEntry::new(8, 2, 0.300, 0.099, 0.39, 0.76, -7.0),
    ParamEntry::new(7, 2, 0.283, 0.072, 0.30, 0.93, -11.0),
    ParamEntry::new(6, 2, 0.259, 0.048, 0.22, 1.2, -16.0),
    ParamEntry::new(11, 1, 0.302, 0.093, 0.39, 0.78, -8.0),
    ParamEntry::new(10, 1, 0.290, 0.075, 0.28, 1.04, -15.0),
    ParamEntry::new(9, 1, 0.265, 0.044, 0.20, 1.3, -19.0),
];

/// PAM30 parameters
const PAM30: &[ParamEntry] = &[
    ParamEntry::new(i32::MAX, i32::MAX, 0.3400, 0.283, 1.754, 0.1938, -0.3),
    ParamEntry::new(7, 2, 0.305, 0.15, 0.87, 0.35, -3.0),
    ParamEntry::new(6, 2, 0.287, 0.11, 0.68, 0.42, -4.0),
    ParamEntry::new(5, 2, 0.264, 0.079, 0.45, 0.59, -7.0),
    ParamEntry::new(10, 1, 0.309, 0.15, 0.88, 0.34, -3.0),
    ParamEntry::new(9, 1, 0.294, 0.11, 0.61, 0.48, -6.0),
    ParamEntry::new(8, 1, 0.270, 0.072, 0.40, 0.68, -10.0),
];

/// PAM70 parameters
const PAM70: &[ParamEntry] = &[
    ParamEntry::new(i32::MAX, i32::MAX, 0.3345, 0.229, 1.029, 0.3250, -0.9),
    ParamEntry::new(8, 2, 0.301, 0.12, 0.54, 0.56, -5.0),
    ParamEntry::new(7, 2, 0.286, 0.093, 0.43, 0.67, -7.0),
    ParamEntry::new(6, 2, 0.264, 0.064, 0.29, 0.90, -12.0),
    ParamEntry::new(11, 1, 0.305, 0.12, 0.52, 0.59, -6.0),
    ParamEntry::new(10, 1, 0.291, 0.091, 0.41, 0.71, -9.0),
    ParamEntry::new(9, 1, 0.270, 0.060, 0.28, 0.97, -14.0),
];

/// PAM250 parameters
const PAM250: &[ParamEntry] = &[
    ParamEntry::new(i32::MAX, i32::MAX, 0.2252, 0.0868, 0.2223, 0.98, -5.0),
    ParamEntry::new(15, 3, 0.205, 0.049, 0.13, 1.6, -23.0),
    ParamEntry::new(14, 3, 0.200, 0.043, 0.12, 1.7, -26.0),
    ParamEntry::new(13, 3, 0.194, 0.036, 0.10, 1.9, -31.0),
    ParamEntry::new(12, 3, 0.186, 0.029, 0.085, 2.2, -41.0),
    ParamEntry::new(11, 3, 0.174, 0.020, 0.070, 2.5, -48.0),
    ParamEntry::new(17, 2, 0.204, 0.047, 0.12, 1.7, -28.0),
    ParamEntry::new(16, 2, 0.198, 0.038, 0.11, 1.8, -29.0),
    ParamEntry::new(15, 2, 0.191, 0.031, 0.087, 2.2, -44.0),
    ParamEntry::new(14, 2, 0.182, 0.024, 0.073, 2.5, -53.0),
    ParamEntry::new(13, 2, 0.171, 0.017, 0.059, 2.9, -64.0),
    ParamEntry::new(21, 1, 0.205, 0.045, 0.11, 1.8, -34.0),
    ParamEntry::new(20, 1, 0.199, 0.037, 0.10, 1.9, -35.0),
    ParamEntry::new(19, 1, 0.192, 0.029, 0.083, 2.3, -52.0),
    ParamEntry::new(18, 1, 0.183, 0.021, 0.070, 2.6, -60.0),
    ParamEntry::new(17, 1, 0.171, 0.014, 0.052, 3.3, -86.0),
];


fn table_for(matrix: ScoringMatrixName) -> &'static [ParamEntry] {
    match matrix {
        ScoringMatrixName::Blosum45 => BLOSUM45,
        ScoringMatrixName::Blosum50 => BLOSUM50,
        ScoringMatrixName::Blosum62 => BLOSUM62,
        ScoringMatrixName::Blosum80 => BLOSUM80,
        ScoringMatrixName::Blosum90 => BLOSUM90,
        ScoringMatrixName::Pam30 => PAM30,
        ScoringMatrixName::Pam70 => PAM70,
        ScoringMatrixName::Pam250 => PAM250,
    }
}

/// Gapped parameters for an exact (open, extend) match, `None` when the
/// combination is not supported for the matrix
pub fn lookup_protein_params(
    matrix: ScoringMatrixName,
    gap_open: i32,
    gap_extend: i32,
) -> Option<KarlinParams> {
    table_for(matrix)
        .iter()
        .find(|e| e.gap_open == gap_open && e.gap_extend == gap_extend)
        .map(|e| e.to_karlin_params())
}

/// Ungapped (ideal composition) parameters of a matrix
pub fn lookup_protein_params_ungapped(matrix: ScoringMatrixName) -> KarlinParams {
    let table = table_for(matrix);
    table
        .iter()
        .find(|e| e.is_ungapped())
        .unwrap_or(&table[0])
        .to_karlin_params()
}

/// Gap cost combinations supported for a matrix, for error messages
pub fn supported_gap_costs(matrix: ScoringMatrixName) -> Vec<(i32, i32)> {
    table_for(matrix)
        .iter()
        .filter(|e| !e.is_ungapped())
        .map(|e| (e.gap_open, e.gap_extend))
        .collect()
}

//! Scoring and PSI-BLAST option structures

use std::path::PathBuf;

/// BLAST program type; only protein programs can build a PSSM
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgramType {
    #[default]
    Blastp,
    PsiBlast,
    Blastn,
}

impl ProgramType {
    pub fn is_protein(self) -> bool {
        matches!(self, ProgramType::Blastp | ProgramType::PsiBlast)
    }
}

impl std::str::FromStr for ProgramType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "blastp" => Ok(ProgramType::Blastp),
            "psiblast" | "psi-blast" => Ok(ProgramType::PsiBlast),
            "blastn" => Ok(ProgramType::Blastn),
            _ => Err(format!(
                "Unknown program: {}. Use 'blastp', 'psiblast' or 'blastn'",
                s
            )),
        }
    }
}

/// Supported scoring matrices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScoringMatrixName {
    Blosum45,
    Blosum50,
    #[default]
    Blosum62,
    Blosum80,
    Blosum90,
    Pam30,
    Pam70,
    Pam250,
}

impl ScoringMatrixName {
    /// Upper-case name as used in matrix files and scoremat parameters
    pub fn as_str(self) -> &'static str {
        match self {
            ScoringMatrixName::Blosum45 => "BLOSUM45",
            ScoringMatrixName::Blosum50 => "BLOSUM50",
            ScoringMatrixName::Blosum62 => "BLOSUM62",
            ScoringMatrixName::Blosum80 => "BLOSUM80",
            ScoringMatrixName::Blosum90 => "BLOSUM90",
            ScoringMatrixName::Pam30 => "PAM30",
            ScoringMatrixName::Pam70 => "PAM70",
            ScoringMatrixName::Pam250 => "PAM250",
        }
    }

    /// Bit-scale of the published integer scores (BLOSUM62 is in half bits)
    pub fn bit_scale_factor(self) -> f64 {
        match self {
            ScoringMatrixName::Blosum45 | ScoringMatrixName::Blosum50 => 3.0,
            ScoringMatrixName::Pam250 => 3.0,
            _ => 2.0,
        }
    }
}

impl std::fmt::Display for ScoringMatrixName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ScoringMatrixName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "BLOSUM45" => Ok(ScoringMatrixName::Blosum45),
            "BLOSUM50" => Ok(ScoringMatrixName::Blosum50),
            "BLOSUM62" => Ok(ScoringMatrixName::Blosum62),
            "BLOSUM80" => Ok(ScoringMatrixName::Blosum80),
            "BLOSUM90" => Ok(ScoringMatrixName::Blosum90),
            "PAM30" => Ok(ScoringMatrixName::Pam30),
            "PAM70" => Ok(ScoringMatrixName::Pam70),
            "PAM250" => Ok(ScoringMatrixName::Pam250),
            _ => Err(format!("Unknown scoring matrix: {}", s)),
        }
    }
}

/// Scoring options used to build a score block
#[derive(Debug, Clone)]
pub struct ScoringOptions {
    pub program: ProgramType,
    pub matrix: ScoringMatrixName,
    /// Directory or file holding the matrix; resolved lazily when `None`
    pub matrix_path: Option<PathBuf>,
    pub gap_open: i32,
    pub gap_extend: i32,
    pub gapped_calculation: bool,
}

impl Default for ScoringOptions {
    fn default() -> Self {
        Self {
            program: ProgramType::Blastp,
            matrix: ScoringMatrixName::Blosum62,
            matrix_path: None,
            gap_open: 11,
            gap_extend: 1,
            gapped_calculation: true,
        }
    }
}

impl ScoringOptions {
    pub fn new(program: ProgramType) -> Self {
        Self {
            program,
            ..Self::default()
        }
    }
}

/// Options controlling PSSM construction
#[derive(Debug, Clone, Copy)]
pub struct PsiBlastOptions {
    /// Pseudocount constant; 0 selects the default
    pub pseudo_count: i32,
    /// Maximum e-value for an alignment to be included in the PSSM
    pub inclusion_ethresh: f64,
    /// Use only the best HSP per subject sequence
    pub use_best_alignment: bool,
    /// Subject rows at or above this identity to the query are purged
    pub near_identical: f64,
    /// Scale applied to the final PSSM (1.0 for unscaled scores)
    pub impala_scaling_factor: f64,
}

impl Default for PsiBlastOptions {
    fn default() -> Self {
        Self {
            pseudo_count: 0,
            inclusion_ethresh: 0.002,
            use_best_alignment: true,
            near_identical: 0.94,
            impala_scaling_factor: 1.0,
        }
    }
}

impl PsiBlastOptions {
    /// Validate option ranges before computation
    pub fn validate(&self) -> Result<(), String> {
        if self.pseudo_count < 0 {
            return Err(format!("Pseudo count must be non-negative: {}", self.pseudo_count));
        }
        if self.inclusion_ethresh < 0.0 {
            return Err(format!(
                "Inclusion threshold must be non-negative: {}",
                self.inclusion_ethresh
            ));
        }
        if !(self.near_identical > 0.0 && self.near_identical <= 1.0) {
            return Err(format!(
                "Near-identical threshold must be in (0, 1]: {}",
                self.near_identical
            ));
        }
        if self.impala_scaling_factor <= 0.0 {
            return Err(format!(
                "Scaling factor must be positive: {}",
                self.impala_scaling_factor
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_name_parse() {
        assert_eq!("blosum62".parse::<ScoringMatrixName>().unwrap(), ScoringMatrixName::Blosum62);
        assert_eq!("PAM30".parse::<ScoringMatrixName>().unwrap(), ScoringMatrixName::Pam30);
        assert!("BLOSUM63".parse::<ScoringMatrixName>().is_err());
    }

    #[test]
    fn test_program_is_protein() {
        assert!(ProgramType::Blastp.is_protein());
        assert!(ProgramType::PsiBlast.is_protein());
        assert!(!ProgramType::Blastn.is_protein());
    }

    #[test]
    fn test_psi_options_validate() {
        assert!(PsiBlastOptions::default().validate().is_ok());
        let bad = PsiBlastOptions {
            impala_scaling_factor: 0.0,
            ..PsiBlastOptions::default()
        };
        assert!(bad.validate().is_err());
    }
}

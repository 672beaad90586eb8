//! Error types shared by the engine layers
//!
//! `BlastError` is what the public entry points (`SeqSrc` construction,
//! score-block setup, `PssmEngine::run`) return. Lower layers carry their own
//! enums (`SeqSrcError`, `ScalingError`, `PsiError`, `MatrixError`) and are
//! wrapped here.

use thiserror::Error;

use crate::core::blast_posit::ScalingError;
use crate::core::blast_psi::PsiError;
use crate::core::blast_seqsrc::SeqSrcError;
use crate::utils::matrix::MatrixError;

/// Top-level error for the BLAST/PSSM engine
#[derive(Debug, Error)]
pub enum BlastError {
    /// Caller supplied an invalid value (zero-length query, bad option)
    #[error("bad parameter: {0}")]
    BadParameter(String),

    /// An allocation could not be satisfied
    #[error("out of memory: {0}")]
    OutOfMemory(String),

    /// Internal engine failure; the message is the engine's own diagnostic
    #[error("{0}")]
    Internal(String),

    /// The requested combination cannot be represented
    #[error("not supported: {0}")]
    NotSupported(String),

    #[error(transparent)]
    SeqSrc(#[from] SeqSrcError),

    #[error(transparent)]
    Matrix(#[from] MatrixError),

    #[error("scaling failed: {0}")]
    Scaling(#[from] ScalingError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BlastError {
    /// Wrap a core PSSM status into the engine-level error
    pub fn from_psi_status(err: &PsiError) -> Self {
        BlastError::Internal(format!("Error code in PSSM engine: {}", err.code()))
    }
}

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, BlastError>;

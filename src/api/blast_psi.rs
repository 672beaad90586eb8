//! PSSM engine
//!
//! Reference: ncbi-blast/c++/src/algo/blast/api/blast_psi_cxx.cpp (CPssmEngine)
//!
//! The engine is a one-shot pipeline:
//!
//! ```text
//! Constructed -> ScoreBlockReady -> AlignmentProcessed -> PssmComputed -> Packaged -> Done
//! ```
//!
//! The score block is built as soon as the engine is created; `run` consumes
//! the engine and either returns the packaged PSSM or the first error.

use std::path::PathBuf;

use crate::api::scoremat::{
    FormatRpsDbParameters, Pssm, PssmFinalData, PssmIntermediateData, PssmParameters,
    PssmWithParameters,
};
use crate::config::{ProgramType, PsiBlastOptions, ScoringMatrixName};
use crate::core::blast_psi::{
    compute_pssm_with_diagnostics, DiagnosticsRequest, PsiDiagnostics, PsiMatrix, PsiMsa,
};
use crate::core::blast_setup::{ScoreBlockBuilder, SequenceBlk};
use crate::core::blast_stat::ScoreBlk;
use crate::error::{BlastError, Result};

/// Source of the alignment a PSSM is built from
///
/// NCBI reference: psi_pssm_input.hpp IPssmInputData
pub trait PssmInputData {
    /// Query in NCBISTDAA, without sentinels
    fn query(&self) -> &[u8];

    fn query_length(&self) -> usize {
        self.query().len()
    }

    /// Turn the raw input into a query-anchored multiple alignment.
    /// Called once by the engine before `data`.
    fn process(&mut self) -> Result<()>;

    /// Alignment produced by `process`
    fn data(&mut self) -> Option<&mut PsiMsa>;

    fn options(&self) -> &PsiBlastOptions;

    fn matrix_name(&self) -> ScoringMatrixName {
        ScoringMatrixName::Blosum62
    }

    /// Gap open and extend costs used for the gapped statistics
    fn gap_costs(&self) -> (i32, i32) {
        (11, 1)
    }
}

/// Pipeline stage reached by a `PssmEngine`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EngineState {
    Constructed,
    ScoreBlockReady,
    AlignmentProcessed,
    PssmComputed,
    Packaged,
    Done,
}

/// Builds a PSSM from a `PssmInputData` strategy
pub struct PssmEngine<'a> {
    input: &'a mut dyn PssmInputData,
    guarded_query: SequenceBlk,
    sbp: ScoreBlk,
    diagnostics: DiagnosticsRequest,
    state: EngineState,
}

impl<'a> PssmEngine<'a> {
    /// Create the engine and its score block with the default matrix search
    pub fn new(input: &'a mut dyn PssmInputData) -> Result<Self> {
        Self::with_matrix_path(input, None)
    }

    /// As `new`, loading the substitution matrix from `matrix_path`
    pub fn with_matrix_path(
        input: &'a mut dyn PssmInputData,
        matrix_path: Option<PathBuf>,
    ) -> Result<Self> {
        let mut state = EngineState::Constructed;
        if input.query_length() == 0 {
            return Err(BlastError::BadParameter(
                "Query length provided by PssmInput interface is 0".to_string(),
            ));
        }

        let (gap_open, gap_extend) = input.gap_costs();
        let builder = ScoreBlockBuilder::new(ProgramType::PsiBlast)
            .matrix(input.matrix_name())
            .matrix_path(matrix_path)
            .gap_costs(gap_open, gap_extend);
        let (guarded_query, sbp) = builder.build(input.query())?;
        log::debug!("{:?} -> {:?}", state, EngineState::ScoreBlockReady);
        state = EngineState::ScoreBlockReady;

        Ok(Self {
            input,
            guarded_query,
            sbp,
            diagnostics: DiagnosticsRequest::frequency_ratios_only(),
            state,
        })
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn score_block(&self) -> &ScoreBlk {
        &self.sbp
    }

    pub fn guarded_query(&self) -> &SequenceBlk {
        &self.guarded_query
    }

    /// Replace the default request (frequency ratios only)
    pub fn set_diagnostics(&mut self, request: DiagnosticsRequest) {
        self.diagnostics = request;
    }

    fn advance(&mut self, next: EngineState) {
        debug_assert!(next > self.state);
        log::debug!("{:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Process the alignment, compute the PSSM and package it
    pub fn run(mut self) -> Result<PssmWithParameters> {
        self.input.process()?;
        self.advance(EngineState::AlignmentProcessed);

        let options = self.input.options().clone();
        let request = self.diagnostics;
        let msa = self.input.data().ok_or_else(|| {
            BlastError::BadParameter("PssmInput interface returned no alignment data".to_string())
        })?;
        let (matrix, diagnostics) =
            compute_pssm_with_diagnostics(msa, &options, &mut self.sbp, &request)
                .map_err(|e| {
                    log::error!("PSSM computation failed: {}", e);
                    BlastError::from_psi_status(&e)
                })?;
        self.advance(EngineState::PssmComputed);

        let packaged = package_pssm(
            &matrix,
            diagnostics.as_ref(),
            self.guarded_query.sequence(),
            &options,
            self.sbp.matrix.name(),
        )?;
        self.advance(EngineState::Packaged);

        log::info!(
            "PSSM built: {} columns, lambda={:.4} K={:.4} H={:.4}",
            packaged.pssm.num_columns,
            packaged.pssm.final_data.lambda,
            packaged.pssm.final_data.kappa,
            packaged.pssm.final_data.h
        );
        self.advance(EngineState::Done);
        Ok(packaged)
    }
}

/// Flatten `values[column][row]` column by column
fn flatten<T: Copy, const N: usize>(values: &[[T; N]], nrows: usize) -> Vec<T> {
    values
        .iter()
        .flat_map(|col| col.iter().take(nrows).copied())
        .collect()
}

/// Convert the raw PSSM and diagnostics into the external representation
///
/// NCBI reference: CPssmEngine::x_PSIMatrix2Asn1
pub fn package_pssm(
    matrix: &PsiMatrix,
    diagnostics: Option<&PsiDiagnostics>,
    query: &[u8],
    options: &PsiBlastOptions,
    matrix_name: ScoringMatrixName,
) -> Result<PssmWithParameters> {
    let nrows = matrix.nrows;
    let scores = flatten(&matrix.pssm[..matrix.ncols.min(matrix.pssm.len())], nrows);
    if scores.len() != matrix.ncols * nrows {
        return Err(BlastError::Internal(format!(
            "PSSM holds {} scores, expected {}",
            scores.len(),
            matrix.ncols * nrows
        )));
    }

    let mut intermediate = PssmIntermediateData::default();
    if let Some(diag) = diagnostics {
        if diag.information_content.is_some() {
            return Err(BlastError::NotSupported(
                "Information content cannot be stored in Score-matrix-parameters".to_string(),
            ));
        }
        if diag.gapless_column_weights.is_some() {
            return Err(BlastError::NotSupported(
                "Gapless column weights cannot be stored in Score-matrix-parameters".to_string(),
            ));
        }
        if let Some(counts) = &diag.residue_freqs {
            intermediate.res_freqs_per_pos = flatten(counts, nrows)
                .into_iter()
                .map(|n| i32::try_from(n).unwrap_or(i32::MAX))
                .collect();
        }
        if let Some(freqs) = &diag.weighted_residue_freqs {
            intermediate.weighted_res_freqs_per_pos = flatten(freqs, nrows);
        }
        if let Some(ratios) = &diag.frequency_ratios {
            intermediate.freq_ratios = flatten(ratios, nrows);
        }
    }

    Ok(PssmWithParameters {
        pssm: Pssm {
            is_protein: true,
            num_rows: nrows,
            num_columns: matrix.ncols,
            by_row: false,
            query: query.to_vec(),
            final_data: PssmFinalData {
                lambda: matrix.lambda,
                kappa: matrix.kappa,
                h: matrix.h,
                scores,
            },
            intermediate_data: (!intermediate.is_empty()).then_some(intermediate),
        },
        params: PssmParameters {
            pseudocount: options.pseudo_count,
            rpsdb_params: FormatRpsDbParameters {
                matrix_name: matrix_name.as_str().to_uppercase(),
            },
        },
    })
}

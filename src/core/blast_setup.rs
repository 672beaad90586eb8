//! Query guarding and score block setup
//!
//! Reference: ncbi-blast/c++/src/algo/blast/core/blast_setup.c
//!   - BlastSetup_ScoreBlkInit / Blast_ScoreBlkKbpUngappedCalc
//!   - Blast_ScoreBlkKbpGappedCalc
//! and CPssmEngine::x_InitializeScoreBlock (blast_psi_cxx.cpp), which guards
//! the query and attaches the ideal Karlin block afterwards.

use std::path::PathBuf;

use crate::config::{ProgramType, ScoringMatrixName, ScoringOptions};
use crate::core::blast_query_info::QueryInfo;
use crate::core::blast_stat::ScoreBlk;
use crate::error::{BlastError, Result};
use crate::stats::{
    compute_aa_composition, compute_karlin_params_ideal, compute_karlin_params_ungapped,
    compute_std_aa_composition, lookup_protein_params, supported_gap_costs, ScoreFreqProfile,
};
use crate::utils::matrix::{ScoreMatrix, PROTEIN_SENTINEL};

/// Sentinel-guarded query buffer
///
/// NCBI reference: blast_def.h BLAST_SequenceBlk. The buffer holds
/// `length + 2` bytes with a sentinel at both ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceBlk {
    guarded: Vec<u8>,
    length: usize,
}

impl SequenceBlk {
    /// Take ownership of an already guarded buffer
    pub fn from_guarded(guarded: Vec<u8>, sentinel: u8) -> Result<Self> {
        let ok = guarded.len() >= 2
            && guarded.first() == Some(&sentinel)
            && guarded.last() == Some(&sentinel);
        if !ok {
            return Err(BlastError::BadParameter(
                "Sequence buffer is not sentinel guarded".to_string(),
            ));
        }
        let length = guarded.len() - 2;
        Ok(Self { guarded, length })
    }

    /// Whole buffer including both sentinels
    pub fn guarded(&self) -> &[u8] {
        &self.guarded
    }

    /// Residues without sentinels
    pub fn sequence(&self) -> &[u8] {
        &self.guarded[1..=self.length]
    }

    pub fn length(&self) -> usize {
        self.length
    }
}

/// Copy a protein query into a new buffer with a sentinel at each end
pub fn guard_protein_query(query: &[u8]) -> Result<SequenceBlk> {
    if query.is_empty() {
        return Err(BlastError::BadParameter("Query length is 0".to_string()));
    }
    let mut guarded = Vec::new();
    guarded
        .try_reserve_exact(query.len() + 2)
        .map_err(|_| BlastError::OutOfMemory("Query with sentinels".to_string()))?;
    guarded.push(PROTEIN_SENTINEL);
    guarded.extend_from_slice(query);
    guarded.push(PROTEIN_SENTINEL);
    Ok(SequenceBlk {
        guarded,
        length: query.len(),
    })
}

/// Build the score block for a guarded query.
///
/// Errors are the engine's diagnostic text.
pub fn setup_score_block(
    matrix: ScoreMatrix,
    query: &SequenceBlk,
    query_info: &QueryInfo,
    options: &ScoringOptions,
    scale_factor: f64,
) -> std::result::Result<ScoreBlk, String> {
    if !options.program.is_protein() {
        return Err("Score block setup supports protein programs only".to_string());
    }

    let mut sbp = ScoreBlk::new(
        matrix,
        query_info.num_contexts(),
        compute_std_aa_composition(),
    );
    sbp.scale_factor = scale_factor;
    sbp.gap_open = options.gap_open;
    sbp.gap_extend = options.gap_extend;

    let ideal = compute_karlin_params_ideal(&sbp.matrix)?;

    let mut valid_contexts = 0;
    for (idx, ctx) in query_info.contexts.iter().enumerate() {
        let start = ctx.query_offset as usize + 1;
        let end = start + ctx.query_length as usize;
        let Some(residues) = query.guarded().get(start..end) else {
            return Err(format!("Context {} lies outside the query buffer", idx));
        };
        let comp = compute_aa_composition(residues);
        let sfp = ScoreFreqProfile::from_compositions(&sbp.matrix, &comp, &sbp.std_probs);
        sbp.query_comp[idx] = comp;
        match compute_karlin_params_ungapped(&sfp) {
            Ok(kbp) => {
                let kbp = crate::stats::apply_check_ideal(kbp, ideal);
                log::debug!(
                    "Context {}: ungapped lambda={:.4} K={:.4} H={:.4}",
                    idx,
                    kbp.lambda,
                    kbp.k,
                    kbp.h
                );
                sbp.kbp_std[idx] = Some(kbp);
                valid_contexts += 1;
            }
            Err(msg) => log::warn!("Context {}: {}", idx, msg),
        }
    }
    if valid_contexts == 0 {
        return Err("Could not calculate ungapped Karlin-Altschul parameters due to an \
                    invalid query sequence or its translation. Please verify the query \
                    sequence(s) and/or filtering options"
            .to_string());
    }

    if options.gapped_calculation {
        let name = sbp.matrix.name();
        let gapped = lookup_protein_params(name, options.gap_open, options.gap_extend)
            .ok_or_else(|| {
                let supported: Vec<String> = supported_gap_costs(name)
                    .iter()
                    .map(|(o, e)| format!("{}/{}", o, e))
                    .collect();
                format!(
                    "Gap existence and extension values of {} and {} not supported for {}; \
                     supported values are: {}",
                    options.gap_open,
                    options.gap_extend,
                    name,
                    supported.join(", ")
                )
            })?;
        for (slot, std) in sbp.kbp_gap_std.iter_mut().zip(sbp.kbp_std.iter()) {
            if std.is_some() {
                *slot = Some(gapped);
            }
        }
    }

    sbp.kbp_psi = sbp.kbp_std.clone();
    sbp.kbp_gap_psi = sbp.kbp_gap_std.clone();
    Ok(sbp)
}

/// Builds the scoring context for a single protein query
#[derive(Debug, Clone)]
pub struct ScoreBlockBuilder {
    options: ScoringOptions,
    scale_factor: f64,
}

impl ScoreBlockBuilder {
    pub fn new(program: ProgramType) -> Self {
        Self {
            options: ScoringOptions::new(program),
            scale_factor: 1.0,
        }
    }

    pub fn matrix(mut self, matrix: ScoringMatrixName) -> Self {
        self.options.matrix = matrix;
        self
    }

    pub fn matrix_path(mut self, path: Option<PathBuf>) -> Self {
        self.options.matrix_path = path;
        self
    }

    pub fn gap_costs(mut self, gap_open: i32, gap_extend: i32) -> Self {
        self.options.gap_open = gap_open;
        self.options.gap_extend = gap_extend;
        self
    }

    pub fn scale_factor(mut self, scale_factor: f64) -> Self {
        self.scale_factor = scale_factor;
        self
    }

    pub fn options(&self) -> &ScoringOptions {
        &self.options
    }

    /// Guard the query, build its score block and attach the ideal
    /// Karlin block. Returns the guarded query alongside the block.
    pub fn build(&self, query: &[u8]) -> Result<(SequenceBlk, ScoreBlk)> {
        if query.is_empty() {
            return Err(BlastError::BadParameter("Query length is 0".to_string()));
        }
        if !self.options.program.is_protein() {
            return Err(BlastError::BadParameter(format!(
                "Score block requires a protein program, got {:?}",
                self.options.program
            )));
        }

        let guarded = guard_protein_query(query)?;
        let matrix = ScoreMatrix::load(self.options.matrix, self.options.matrix_path.as_deref())?;
        let query_info = QueryInfo::new_single_protein(guarded.length());

        let mut sbp = setup_score_block(
            matrix,
            &guarded,
            &query_info,
            &self.options,
            self.scale_factor,
        )
        .map_err(BlastError::Internal)?;

        let ideal = compute_karlin_params_ideal(&sbp.matrix).map_err(BlastError::Internal)?;
        sbp.kbp_ideal = Some(ideal);
        Ok((guarded, sbp))
    }
}

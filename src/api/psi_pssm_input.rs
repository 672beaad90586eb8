//! PSSM input from pairwise search results
//!
//! Reference: ncbi-blast/c++/src/algo/blast/api/psi_pssm_input.cpp
//!   (CPsiBlastInputData)
//!
//! Each subject with at least one HSP under the inclusion threshold becomes
//! one alignment row. Subject residues are fetched through a `BlastSeqSrc`,
//! once per subject, and released as soon as the row is filled.

use rustc_hash::FxHashMap;

use crate::api::blast_psi::PssmInputData;
use crate::config::{PsiBlastOptions, ScoringMatrixName};
use crate::core::blast_psi::PsiMsa;
use crate::core::blast_seqsrc::{BlastSeqSrc, Oid};
use crate::error::{BlastError, Result};
use crate::utils::matrix::ncbistdaa;

/// One run of an alignment's edit script
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOp {
    /// Aligned residue pairs
    Match(usize),
    /// Subject residues facing a gap in the query
    QueryGap(usize),
    /// Query residues facing a gap in the subject
    SubjectGap(usize),
}

/// A local alignment between the query and one subject
#[derive(Debug, Clone, PartialEq)]
pub struct Hsp {
    pub evalue: f64,
    pub query_start: usize,
    pub subject_start: usize,
    pub ops: Vec<EditOp>,
}

/// All HSPs found against one subject
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectHits {
    pub oid: Oid,
    pub hsps: Vec<Hsp>,
}

pub struct PsiBlastInputData<'a> {
    query: Vec<u8>,
    hits: Vec<SubjectHits>,
    seq_src: &'a BlastSeqSrc,
    options: PsiBlastOptions,
    matrix: ScoringMatrixName,
    gap_costs: (i32, i32),
    msa: Option<PsiMsa>,
}

impl<'a> PsiBlastInputData<'a> {
    /// `query` is NCBISTDAA without sentinels
    pub fn new(
        query: Vec<u8>,
        hits: Vec<SubjectHits>,
        seq_src: &'a BlastSeqSrc,
        options: PsiBlastOptions,
    ) -> Self {
        Self {
            query,
            hits,
            seq_src,
            options,
            matrix: ScoringMatrixName::Blosum62,
            gap_costs: (11, 1),
            msa: None,
        }
    }

    pub fn with_matrix(mut self, matrix: ScoringMatrixName, gap_open: i32, gap_extend: i32) -> Self {
        self.matrix = matrix;
        self.gap_costs = (gap_open, gap_extend);
        self
    }

    /// HSPs that pass the inclusion threshold, grouped per subject in order
    /// of first appearance
    fn qualifying_hits(&self) -> Vec<(Oid, Vec<&Hsp>)> {
        let mut order: Vec<(Oid, Vec<&Hsp>)> = Vec::new();
        let mut index: FxHashMap<Oid, usize> = FxHashMap::default();
        for subject in &self.hits {
            for hsp in subject
                .hsps
                .iter()
                .filter(|h| h.evalue < self.options.inclusion_ethresh)
            {
                let slot = *index.entry(subject.oid).or_insert_with(|| {
                    order.push((subject.oid, Vec::new()));
                    order.len() - 1
                });
                order[slot].1.push(hsp);
            }
        }
        if self.options.use_best_alignment {
            for (_, hsps) in order.iter_mut() {
                if let Some(best) = hsps
                    .iter()
                    .copied()
                    .min_by(|a, b| a.evalue.total_cmp(&b.evalue))
                {
                    *hsps = vec![best];
                }
            }
        }
        order
    }
}

/// Write one HSP into row `row` of `msa`. Cells already aligned by an
/// earlier HSP of the same subject are left alone.
fn fill_row(msa: &mut PsiMsa, row: usize, subject: &[u8], hsp: &Hsp) -> Result<()> {
    let query_len = msa.query_length();
    let out_of_bounds = || {
        BlastError::BadParameter(format!(
            "HSP at query {} / subject {} runs past the sequence ends",
            hsp.query_start, hsp.subject_start
        ))
    };

    let mut q = hsp.query_start;
    let mut s = hsp.subject_start;
    for op in &hsp.ops {
        match *op {
            EditOp::Match(n) => {
                if q + n > query_len || s + n > subject.len() {
                    return Err(out_of_bounds());
                }
                for k in 0..n {
                    if !msa.cells[row][q + k].is_aligned {
                        msa.set_aligned(row, q + k, subject[s + k]);
                    }
                }
                q += n;
                s += n;
            }
            EditOp::SubjectGap(n) => {
                if q + n > query_len {
                    return Err(out_of_bounds());
                }
                for k in 0..n {
                    if !msa.cells[row][q + k].is_aligned {
                        msa.set_aligned(row, q + k, ncbistdaa::GAP);
                    }
                }
                q += n;
            }
            EditOp::QueryGap(n) => {
                if s + n > subject.len() {
                    return Err(out_of_bounds());
                }
                s += n;
            }
        }
    }
    Ok(())
}

impl PssmInputData for PsiBlastInputData<'_> {
    fn query(&self) -> &[u8] {
        &self.query
    }

    fn process(&mut self) -> Result<()> {
        if !self.seq_src.is_prot() {
            return Err(BlastError::BadParameter(format!(
                "Sequence source {} does not hold protein sequences",
                self.seq_src.name()
            )));
        }
        let selected = self.qualifying_hits();
        log::debug!(
            "{} of {} subjects pass inclusion threshold {}",
            selected.len(),
            self.hits.len(),
            self.options.inclusion_ethresh
        );

        let mut msa = PsiMsa::new(&self.query, selected.len());
        for (i, (oid, hsps)) in selected.iter().enumerate() {
            let seq = self.seq_src.get_sequence(*oid)?;
            let filled = hsps
                .iter()
                .try_for_each(|hsp| fill_row(&mut msa, i + 1, seq.sequence(), hsp));
            self.seq_src.release_sequence(seq);
            filled?;
        }
        self.msa = Some(msa);
        Ok(())
    }

    fn data(&mut self) -> Option<&mut PsiMsa> {
        self.msa.as_mut()
    }

    fn options(&self) -> &PsiBlastOptions {
        &self.options
    }

    fn matrix_name(&self) -> ScoringMatrixName {
        self.matrix
    }

    fn gap_costs(&self) -> (i32, i32) {
        self.gap_costs
    }
}

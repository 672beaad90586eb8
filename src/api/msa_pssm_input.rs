//! PSSM input from a precomputed multiple alignment
//!
//! Reference: ncbi-blast/c++/src/algo/blast/api/msa_pssm_input.cpp
//!   (CPsiBlastInputClustalW)
//!
//! The alignment is read as gapped FASTA. The first record is the query;
//! columns where the query has a gap are dropped. In every other row the
//! span between its first and last residue is aligned (inner gaps become
//! aligned gaps) and the flanks are unaligned.

use std::io::Read;

use bio::io::fasta;

use crate::api::blast_psi::PssmInputData;
use crate::config::{PsiBlastOptions, ScoringMatrixName};
use crate::core::blast_psi::PsiMsa;
use crate::error::{BlastError, Result};
use crate::utils::matrix::{aa_char_to_ncbistdaa, ncbistdaa};

fn is_gap(c: u8) -> bool {
    c == b'-' || c == b'.'
}

#[derive(Debug, Clone)]
pub struct MsaInputData {
    /// Gapped rows, query first
    rows: Vec<Vec<u8>>,
    ids: Vec<String>,
    query: Vec<u8>,
    options: PsiBlastOptions,
    matrix: ScoringMatrixName,
    msa: Option<PsiMsa>,
}

impl MsaInputData {
    /// `rows` are ASCII with `-` for gaps; the first row is the query
    pub fn new(ids: Vec<String>, rows: Vec<Vec<u8>>, options: PsiBlastOptions) -> Result<Self> {
        let Some(width) = rows.first().map(Vec::len) else {
            return Err(BlastError::BadParameter(
                "Multiple alignment has no sequences".to_string(),
            ));
        };
        if let Some(bad) = rows.iter().position(|r| r.len() != width) {
            return Err(BlastError::BadParameter(format!(
                "Alignment row {} has length {}, expected {}",
                bad + 1,
                rows[bad].len(),
                width
            )));
        }
        let query = rows[0]
            .iter()
            .filter(|&&c| !is_gap(c))
            .map(|&c| aa_char_to_ncbistdaa(c))
            .collect();
        Ok(Self {
            rows,
            ids,
            query,
            options,
            matrix: ScoringMatrixName::Blosum62,
            msa: None,
        })
    }

    /// Read a gapped FASTA alignment
    pub fn from_fasta<R: Read>(reader: R, options: PsiBlastOptions) -> Result<Self> {
        let mut ids = Vec::new();
        let mut rows = Vec::new();
        for record in fasta::Reader::new(reader).records() {
            let record = record?;
            ids.push(record.id().to_string());
            rows.push(record.seq().to_vec());
        }
        Self::new(ids, rows, options)
    }

    pub fn with_matrix(mut self, matrix: ScoringMatrixName) -> Self {
        self.matrix = matrix;
        self
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }
}

impl PssmInputData for MsaInputData {
    fn query(&self) -> &[u8] {
        &self.query
    }

    fn process(&mut self) -> Result<()> {
        let kept: Vec<usize> = self.rows[0]
            .iter()
            .enumerate()
            .filter(|(_, c)| !is_gap(**c))
            .map(|(i, _)| i)
            .collect();

        let mut msa = PsiMsa::new(&self.query, self.rows.len() - 1);
        for (row_idx, row) in self.rows.iter().enumerate().skip(1) {
            let first = kept.iter().position(|&col| !is_gap(row[col]));
            let last = kept.iter().rposition(|&col| !is_gap(row[col]));
            let (Some(first), Some(last)) = (first, last) else {
                continue;
            };
            for (c, &col) in kept.iter().enumerate().take(last + 1).skip(first) {
                let letter = if is_gap(row[col]) {
                    ncbistdaa::GAP
                } else {
                    aa_char_to_ncbistdaa(row[col])
                };
                msa.set_aligned(row_idx, c, letter);
            }
        }
        log::debug!(
            "Alignment of {} rows, {} of {} columns kept",
            self.rows.len(),
            kept.len(),
            self.rows[0].len()
        );
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
}

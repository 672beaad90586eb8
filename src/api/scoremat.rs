//! Packaged PSSM ("Score-matrix-parameters")
//!
//! Reference: ncbi-blast/c++/include/objects/scoremat/PssmWithParameters.hpp
//!
//! ```text
//! PssmWithParameters ::= SEQUENCE {
//!     pssm    Pssm,
//!     params  FormatRpsDbParameters / PssmParameters OPTIONAL
//! }
//! Pssm ::= SEQUENCE {
//!     isProtein BOOLEAN, numRows INTEGER, numColumns INTEGER, byRow BOOLEAN,
//!     intermediateData PssmIntermediateData OPTIONAL,
//!     finalData PssmFinalData OPTIONAL
//! }
//! ```
//!
//! Flattened arrays are stored column by column: entry `(c, r)` lives at
//! `c * num_rows + r`.

use std::io::Write;

use crate::utils::matrix::{NCBISTDAA_TO_AMINOACID, TRUE_CHAR_POSITIONS};

#[derive(Debug, Clone, PartialEq)]
pub struct PssmFinalData {
    pub lambda: f64,
    pub kappa: f64,
    pub h: f64,
    pub scores: Vec<i32>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PssmIntermediateData {
    pub res_freqs_per_pos: Vec<i32>,
    pub weighted_res_freqs_per_pos: Vec<f64>,
    pub freq_ratios: Vec<f64>,
}

impl PssmIntermediateData {
    pub fn is_empty(&self) -> bool {
        self.res_freqs_per_pos.is_empty()
            && self.weighted_res_freqs_per_pos.is_empty()
            && self.freq_ratios.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pssm {
    pub is_protein: bool,
    pub num_rows: usize,
    pub num_columns: usize,
    /// Always false: data is stored column by column
    pub by_row: bool,
    pub query: Vec<u8>,
    pub final_data: PssmFinalData,
    pub intermediate_data: Option<PssmIntermediateData>,
}

impl Pssm {
    /// Score at column `c`, row `r`
    pub fn score(&self, c: usize, r: usize) -> Option<i32> {
        if c >= self.num_columns || r >= self.num_rows {
            return None;
        }
        self.final_data.scores.get(c * self.num_rows + r).copied()
    }

    pub fn freq_ratio(&self, c: usize, r: usize) -> Option<f64> {
        if c >= self.num_columns || r >= self.num_rows {
            return None;
        }
        self.intermediate_data
            .as_ref()
            .and_then(|d| d.freq_ratios.get(c * self.num_rows + r).copied())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatRpsDbParameters {
    /// Upper-case matrix name
    pub matrix_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PssmParameters {
    pub pseudocount: i32,
    pub rpsdb_params: FormatRpsDbParameters,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PssmWithParameters {
    pub pssm: Pssm,
    pub params: PssmParameters,
}

impl PssmWithParameters {
    /// ASCII dump: header with the 20 residues, one line per column with
    /// its scores (and frequency ratios when present), then the statistics
    pub fn write_ascii<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        let pssm = &self.pssm;
        let have_ratios = pssm
            .intermediate_data
            .as_ref()
            .is_some_and(|d| !d.freq_ratios.is_empty());

        writeln!(
            out,
            "# PSSM {} columns, matrix {}, pseudocount {}",
            pssm.num_columns, self.params.rpsdb_params.matrix_name, self.params.pseudocount
        )?;
        write!(out, "{:>10}", "")?;
        for &r in TRUE_CHAR_POSITIONS.iter() {
            write!(out, "{:>4}", NCBISTDAA_TO_AMINOACID[r] as char)?;
        }
        if have_ratios {
            for &r in TRUE_CHAR_POSITIONS.iter() {
                write!(out, "{:>6}", NCBISTDAA_TO_AMINOACID[r] as char)?;
            }
        }
        writeln!(out)?;

        for c in 0..pssm.num_columns {
            let residue = pssm
                .query
                .get(c)
                .and_then(|&q| NCBISTDAA_TO_AMINOACID.get(q as usize))
                .copied()
                .unwrap_or(b'X');
            write!(out, "{:>6} {} ", c + 1, residue as char)?;
            for &r in TRUE_CHAR_POSITIONS.iter() {
                write!(out, "{:>4}", pssm.score(c, r).unwrap_or_default())?;
            }
            if have_ratios {
                for &r in TRUE_CHAR_POSITIONS.iter() {
                    write!(out, "{:>6.2}", pssm.freq_ratio(c, r).unwrap_or_default())?;
                }
            }
            writeln!(out)?;
        }

        writeln!(out)?;
        writeln!(out, "{:>16}{:>10}{:>10}", "", "K", "Lambda")?;
        writeln!(
            out,
            "PSI Gapped{:>16.4}{:>10.4}",
            pssm.final_data.kappa, pssm.final_data.lambda
        )?;
        writeln!(out, "H = {:.4}", pssm.final_data.h)?;
        Ok(())
    }
}

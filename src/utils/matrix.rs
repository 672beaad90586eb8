//! Protein encoding and substitution matrices
//!
//! Two encodings are involved:
//! 1. NCBISTDAA (28 characters) - sequence encoding used by every engine layer
//! 2. BLOSUM62 packed order (25 characters) - row order of the built-in table
//!
//! `ScoreMatrix` expands either the built-in table or an NCBI-format text
//! matrix file into a full 28x28 matrix indexed by NCBISTDAA codes.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::ScoringMatrixName;

/// Size of the NCBISTDAA alphabet
pub const BLASTAA_SIZE: usize = 28;

/// Size of BLOSUM62 matrix (25x25)
pub const BLOSUM62_SIZE: usize = 25;

/// Number of real amino acids (excludes B, X, Z, U, O, J, '*' and gap)
pub const PRO_TRUE_ALPHABET_SIZE: usize = 20;

/// Default score for unknown/sentinel residues
pub const DEFSCORE: i32 = -4;

/// Sentinel byte guarding protein sequences (NCBISTDAA gap code)
pub const PROTEIN_SENTINEL: u8 = 0;

/// Sentinel byte guarding BLASTNA nucleotide sequences
pub const NUCLEOTIDE_SENTINEL: u8 = 15;

/// NCBISTDAA encoding (0-27)
///   '-','A','B','C','D','E','F','G','H','I','K','L','M',
///   'N','P','Q','R','S','T','V','W','X','Y','Z','U','*','O','J'
pub mod ncbistdaa {
    pub const GAP: u8 = 0;   // '-'
    pub const A: u8 = 1;
    pub const B: u8 = 2;     // Asn or Asp
    pub const C: u8 = 3;
    pub const D: u8 = 4;
    pub const E: u8 = 5;
    pub const F: u8 = 6;
    pub const G: u8 = 7;
    pub const H: u8 = 8;
    pub const I: u8 = 9;
    pub const K: u8 = 10;
    pub const L: u8 = 11;
    pub const M: u8 = 12;
    pub const N: u8 = 13;
    pub const P: u8 = 14;
    pub const Q: u8 = 15;
    pub const R: u8 = 16;
    pub const S: u8 = 17;
    pub const T: u8 = 18;
    pub const V: u8 = 19;
    pub const W: u8 = 20;
    pub const X: u8 = 21;    // Unknown
    pub const Y: u8 = 22;
    pub const Z: u8 = 23;    // Glu or Gln
    pub const U: u8 = 24;    // Selenocysteine
    pub const STOP: u8 = 25; // '*'
    pub const O: u8 = 26;    // Pyrrolysine
    pub const J: u8 = 27;    // Leu or Ile
}

/// NCBISTDAA codes of the 20 real amino acids
pub const TRUE_CHAR_POSITIONS: [usize; PRO_TRUE_ALPHABET_SIZE] = [
    1, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 22,
];

/// NCBISTDAA code -> printable letter
pub const NCBISTDAA_TO_AMINOACID: [u8; BLASTAA_SIZE] = *b"-ABCDEFGHIKLMNPQRSTVWXYZU*OJ";

/// Whether an NCBISTDAA code is one of the 20 real amino acids
#[inline]
pub fn is_true_residue(code: usize) -> bool {
    TRUE_CHAR_POSITIONS.contains(&code)
}

/// Convert NCBISTDAA index (0-27) to BLOSUM62 matrix index (0-24)
/// Invalid/gap characters map to X (23)
#[inline(always)]
pub fn ncbistdaa_to_blosum62(ncbi: u8) -> u8 {
    const TABLE: [u8; 28] = [
        23, // 0: '-' (gap) -> X
        0,  // 1: A -> 0
        20, // 2: B -> 20
        4,  // 3: C -> 4
        3,  // 4: D -> 3
        6,  // 5: E -> 6
        13, // 6: F -> 13
        7,  // 7: G -> 7
        8,  // 8: H -> 8
        9,  // 9: I -> 9
        11, // 10: K -> 11
        10, // 11: L -> 10
        12, // 12: M -> 12
        2,  // 13: N -> 2
        14, // 14: P -> 14
        5,  // 15: Q -> 5
        1,  // 16: R -> 1
        15, // 17: S -> 15
        16, // 18: T -> 16
        19, // 19: V -> 19
        17, // 20: W -> 17
        23, // 21: X -> 23
        18, // 22: Y -> 18
        22, // 23: Z -> 22
        23, // 24: U (selenocysteine) -> X
        24, // 25: '*' (stop) -> 24
        23, // 26: O (pyrrolysine) -> X
        21, // 27: J -> 21
    ];
    if ncbi < 28 {
        TABLE[ncbi as usize]
    } else {
        23
    }
}

/// Convert ASCII amino acid character to NCBISTDAA index (0-27)
/// Lower case is accepted; anything unrecognised maps to X.
#[inline(always)]
pub fn aa_char_to_ncbistdaa(aa: u8) -> u8 {
    const TABLE: [u8; 128] = [
        21, 21, 21, 21, 21, 21, 21, 21, 21, 21, 21, 21, 21, 21, 21, 21,
        21, 21, 21, 21, 21, 21, 21, 21, 21, 21, 21, 21, 21, 21, 21, 21,
        21, 21, 21, 21, 21, 21, 21, 21, 21, 21, 25, 21, 21,  0, 21, 21, // '*' = 25, '-' = 0
        21, 21, 21, 21, 21, 21, 21, 21, 21, 21, 21, 21, 21, 21, 21, 21,
        21,  1,  2,  3,  4,  5,  6,  7,  8,  9, 27, 10, 11, 12, 13, 26,
        // A   B   C   D   E   F   G   H   I   J   K   L   M   N   O
        14, 15, 16, 17, 18, 24, 19, 20, 21, 22, 23, 21, 21, 21, 21, 21,
        // P   Q   R   S   T   U   V   W   X   Y   Z
        21,  1,  2,  3,  4,  5,  6,  7,  8,  9, 27, 10, 11, 12, 13, 26,
        14, 15, 16, 17, 18, 24, 19, 20, 21, 22, 23, 21, 21, 21, 21, 21,
    ];
    if aa < 128 {
        TABLE[aa as usize]
    } else {
        ncbistdaa::X
    }
}

/// Encode an ASCII protein sequence into NCBISTDAA
pub fn encode_protein(seq: &[u8]) -> Vec<u8> {
    seq.iter().map(|&c| aa_char_to_ncbistdaa(c)).collect()
}

/// Decode NCBISTDAA codes back to ASCII letters
pub fn decode_protein(seq: &[u8]) -> String {
    seq.iter()
        .map(|&c| {
            NCBISTDAA_TO_AMINOACID
                .get(c as usize)
                .copied()
                .unwrap_or(b'X') as char
        })
        .collect()
}

/// ASCII nucleotide -> BLASTNA code (A=0, C=1, G=2, T=3, ambiguity 4-14, gap 15)
const IUPACNA_TO_BLASTNA: [u8; 128] = [
    15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15,
    15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15,
    15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15,
    15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15,
    15,  0, 10,  1, 11, 15, 15,  2, 12, 15, 15,  7, 15,  6, 14, 15,
    15, 15,  4,  9,  3,  3, 13,  8, 15,  5, 15, 15, 15, 15, 15, 15,
    15,  0, 10,  1, 11, 15, 15,  2, 12, 15, 15,  7, 15,  6, 14, 15,
    15, 15,  4,  9,  3,  3, 13,  8, 15,  5, 15, 15, 15, 15, 15, 15,
];

/// Encode an ASCII nucleotide sequence into BLASTNA
pub fn encode_nucleotide(seq: &[u8]) -> Vec<u8> {
    seq.iter()
        .map(|&c| {
            if c < 128 {
                IUPACNA_TO_BLASTNA[c as usize]
            } else {
                NUCLEOTIDE_SENTINEL
            }
        })
        .collect()
}

/// BLOSUM62 matrix in NCBI packed order: ARNDCQEGHILKMFPSTWYVBJZX*
pub static BLOSUM62: [i8; BLOSUM62_SIZE * BLOSUM62_SIZE] = [
    //       A,  R,  N,  D,  C,  Q,  E,  G,  H,  I,  L,  K,  M,  F,  P,  S,  T,  W,  Y,  V,  B,  J,  Z,  X,  *
    /*A*/    4, -1, -2, -2,  0, -1, -1,  0, -2, -1, -1, -1, -1, -2, -1,  1,  0, -3, -2,  0, -2, -1, -1, -1, -4,
    /*R*/   -1,  5,  0, -2, -3,  1,  0, -2,  0, -3, -2,  2, -1, -3, -2, -1, -1, -3, -2, -3, -1, -2,  0, -1, -4,
    /*N*/   -2,  0,  6,  1, -3,  0,  0,  0,  1, -3, -3,  0, -2, -3, -2,  1,  0, -4, -2, -3,  4, -3,  0, -1, -4,
    /*D*/   -2, -2,  1,  6, -3,  0,  2, -1, -1, -3, -4, -1, -3, -3, -1,  0, -1, -4, -3, -3,  4, -3,  1, -1, -4,
    /*C*/    0, -3, -3, -3,  9, -3, -4, -3, -3, -1, -1, -3, -1, -2, -3, -1, -1, -2, -2, -1, -3, -1, -3, -1, -4,
    /*Q*/   -1,  1,  0,  0, -3,  5,  2, -2,  0, -3, -2,  1,  0, -3, -1,  0, -1, -2, -1, -2,  0, -2,  4, -1, -4,
    /*E*/   -1,  0,  0,  2, -4,  2,  5, -2,  0, -3, -3,  1, -2, -3, -1,  0, -1, -3, -2, -2,  1, -3,  4, -1, -4,
    /*G*/    0, -2,  0, -1, -3, -2, -2,  6, -2, -4, -4, -2, -3, -3, -2,  0, -2, -2, -3, -3, -1, -4, -2, -1, -4,
    /*H*/   -2,  0,  1, -1, -3,  0,  0, -2,  8, -3, -3, -1, -2, -1, -2, -1, -2, -2,  2, -3,  0, -3,  0, -1, -4,
    /*I*/   -1, -3, -3, -3, -1, -3, -3, -4, -3,  4,  2, -3,  1,  0, -3, -2, -1, -3, -1,  3, -3,  3, -3, -1, -4,
    /*L*/   -1, -2, -3, -4, -1, -2, -3, -4, -3,  2,  4, -2,  2,  0, -3, -2, -1, -2, -1,  1, -4,  3, -3, -1, -4,
    /*K*/   -1,  2,  0, -1, -3,  1,  1, -2, -1, -3, -2,  5, -1, -3, -1,  0, -1, -3, -2, -2,  0, -3,  1, -1, -4,
    /*M*/   -1, -1, -2, -3, -1,  0, -2, -3, -2,  1,  2, -1,  5,  0, -2, -1, -1, -1, -1,  1, -3,  2, -1, -1, -4,
    /*F*/   -2, -3, -3, -3, -2, -3, -3, -3, -1,  0,  0, -3,  0,  6, -4, -2, -2,  1,  3, -1, -3,  0, -3, -1, -4,
    /*P*/   -1, -2, -2, -1, -3, -1, -1, -2, -2, -3, -3, -1, -2, -4,  7, -1, -1, -4, -3, -2, -2, -3, -1, -1, -4,
    /*S*/    1, -1,  1,  0, -1,  0,  0,  0, -1, -2, -2,  0, -1, -2, -1,  4,  1, -3, -2, -2,  0, -2,  0, -1, -4,
    /*T*/    0, -1,  0, -1, -1, -1, -1, -2, -2, -1, -1, -1, -1, -2, -1,  1,  5, -2, -2,  0, -1, -1, -1, -1, -4,
    /*W*/   -3, -3, -4, -4, -2, -2, -3, -2, -2, -3, -2, -3, -1,  1, -4, -3, -2, 11,  2, -3, -4, -2, -2, -1, -4,
    /*Y*/   -2, -2, -2, -3, -2, -1, -2, -3,  2, -1, -1, -2, -1,  3, -3, -2, -2,  2,  7, -1, -3, -1, -2, -1, -4,
    /*V*/    0, -3, -3, -3, -1, -2, -2, -3, -3,  3,  1, -2,  1, -1, -2, -2,  0, -3, -1,  4, -3,  2, -2, -1, -4,
    /*B*/   -2, -1,  4,  4, -3,  0,  1, -1,  0, -3, -4,  0, -3, -3, -2,  0, -1, -4, -3, -3,  4, -3,  0, -1, -4,
    /*J*/   -1, -2, -3, -3, -1, -2, -3, -4, -3,  3,  3, -3,  2,  0, -3, -2, -1, -2, -1,  2, -3,  3, -3, -1, -4,
    /*Z*/   -1,  0,  0,  1, -3,  4,  4, -2,  0, -3, -3,  1, -1, -3, -1,  0, -1, -2, -2, -2,  0, -3,  4, -1, -4,
    /*X*/   -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -4,
    /***/   -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4,  1,
];

/// Get BLOSUM62 score for two amino acids in NCBISTDAA encoding.
/// Index 0 (gap/sentinel) returns `DEFSCORE`.
#[inline(always)]
pub fn blosum62_score(aa1_ncbi: u8, aa2_ncbi: u8) -> i32 {
    if aa1_ncbi == 0 || aa2_ncbi == 0 {
        return DEFSCORE;
    }
    let b1 = ncbistdaa_to_blosum62(aa1_ncbi) as usize;
    let b2 = ncbistdaa_to_blosum62(aa2_ncbi) as usize;
    BLOSUM62[b1 * BLOSUM62_SIZE + b2] as i32
}

/// Errors raised while resolving or parsing a scoring matrix
#[derive(Debug, Error)]
pub enum MatrixError {
    #[error("Matrix {0} not found; set BLASTMAT to a directory containing it")]
    NotFound(String),

    #[error("Cannot read matrix file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed matrix file {path}, line {line}: {reason}")]
    Parse {
        path: PathBuf,
        line: usize,
        reason: String,
    },
}

/// Full substitution matrix indexed by NCBISTDAA codes
#[derive(Debug, Clone)]
pub struct ScoreMatrix {
    name: ScoringMatrixName,
    data: [[i32; BLASTAA_SIZE]; BLASTAA_SIZE],
    loscore: i32,
    hiscore: i32,
}

impl ScoreMatrix {
    /// Built-in BLOSUM62 expanded to 28x28
    pub fn blosum62() -> Self {
        let mut data = [[0i32; BLASTAA_SIZE]; BLASTAA_SIZE];
        for (i, row) in data.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = blosum62_score(i as u8, j as u8);
            }
        }
        Self::from_parts(ScoringMatrixName::Blosum62, data)
    }

    fn from_parts(name: ScoringMatrixName, data: [[i32; BLASTAA_SIZE]; BLASTAA_SIZE]) -> Self {
        let mut loscore = i32::MAX;
        let mut hiscore = i32::MIN;
        for row in data.iter().skip(1) {
            for &s in row.iter().skip(1) {
                loscore = loscore.min(s);
                hiscore = hiscore.max(s);
            }
        }
        Self {
            name,
            data,
            loscore,
            hiscore,
        }
    }

    /// Resolve and load a matrix.
    ///
    /// An explicit `path` (file or directory) wins; otherwise `BLASTMAT` and
    /// `./data` are searched. BLOSUM62 falls back to the built-in table.
    pub fn load(name: ScoringMatrixName, path: Option<&Path>) -> Result<Self, MatrixError> {
        let resolved = match path {
            Some(p) if p.is_dir() => Some(p.join(name.as_str())).filter(|f| f.is_file()),
            Some(p) => Some(p.to_path_buf()),
            None => find_matrix_path(name.as_str()),
        };

        match resolved {
            Some(file) => {
                log::debug!("Loading matrix {} from {}", name, file.display());
                Self::from_file(name, &file)
            }
            None if name == ScoringMatrixName::Blosum62 => Ok(Self::blosum62()),
            None => Err(MatrixError::NotFound(name.as_str().to_string())),
        }
    }

    /// Parse an NCBI-format text matrix
    pub fn from_file(name: ScoringMatrixName, path: &Path) -> Result<Self, MatrixError> {
        let text = fs::read_to_string(path).map_err(|source| MatrixError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(name, &text).map_err(|(line, reason)| MatrixError::Parse {
            path: path.to_path_buf(),
            line,
            reason,
        })
    }

    /// Parse matrix text; errors carry the 1-based line number
    pub fn parse(name: ScoringMatrixName, text: &str) -> Result<Self, (usize, String)> {
        let mut columns: Option<Vec<u8>> = None;
        let mut seen = [[false; BLASTAA_SIZE]; BLASTAA_SIZE];
        let mut data = [[0i32; BLASTAA_SIZE]; BLASTAA_SIZE];

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut fields = line.split_whitespace();
            let Some(cols) = columns.as_ref() else {
                let header: Vec<u8> = line
                    .split_whitespace()
                    .map(|tok| tok.as_bytes()[0])
                    .map(aa_char_to_ncbistdaa)
                    .collect();
                columns = Some(header);
                continue;
            };
            let row_letter = fields
                .next()
                .map(|tok| aa_char_to_ncbistdaa(tok.as_bytes()[0]))
                .ok_or_else(|| (line_no, "empty row".to_string()))?;
            let scores: Vec<i32> = fields
                .map(|tok| tok.parse::<i32>())
                .collect::<Result<_, _>>()
                .map_err(|e| (line_no, format!("bad score: {}", e)))?;
            if scores.len() != cols.len() {
                return Err((
                    line_no,
                    format!("expected {} scores, found {}", cols.len(), scores.len()),
                ));
            }
            for (&col, &score) in cols.iter().zip(scores.iter()) {
                data[row_letter as usize][col as usize] = score;
                seen[row_letter as usize][col as usize] = true;
            }
        }

        if columns.is_none() {
            return Err((0, "no header line".to_string()));
        }

        // Letters missing from the file behave like X; the gap row gets the
        // lowest score in the matrix.
        let x = ncbistdaa::X as usize;
        let mut lowest = i32::MAX;
        for i in 1..BLASTAA_SIZE {
            for j in 1..BLASTAA_SIZE {
                if seen[i][j] {
                    lowest = lowest.min(data[i][j]);
                }
            }
        }
        let row_present: Vec<bool> = seen.iter().map(|r| r.iter().any(|&s| s)).collect();
        let col_present: Vec<bool> = (0..BLASTAA_SIZE)
            .map(|j| seen.iter().any(|r| r[j]))
            .collect();
        for i in 1..BLASTAA_SIZE {
            for j in 1..BLASTAA_SIZE {
                if !seen[i][j] {
                    let ii = if row_present[i] { i } else { x };
                    let jj = if col_present[j] { j } else { x };
                    data[i][j] = if seen[ii][jj] { data[ii][jj] } else { lowest };
                }
            }
        }
        for k in 0..BLASTAA_SIZE {
            data[0][k] = lowest;
            data[k][0] = lowest;
        }

        Ok(Self::from_parts(name, data))
    }

    pub fn name(&self) -> ScoringMatrixName {
        self.name
    }

    #[inline(always)]
    pub fn score(&self, a: u8, b: u8) -> i32 {
        self.data[a as usize][b as usize]
    }

    /// Row of scores for one NCBISTDAA residue
    pub fn row(&self, a: u8) -> &[i32; BLASTAA_SIZE] {
        &self.data[a as usize]
    }

    pub fn loscore(&self) -> i32 {
        self.loscore
    }

    pub fn hiscore(&self) -> i32 {
        self.hiscore
    }
}

/// Locate a matrix file by name in `BLASTMAT` (and its `aa/` subdirectory)
/// or in `./data`
pub fn find_matrix_path(name: &str) -> Option<PathBuf> {
    let mut dirs: Vec<PathBuf> = Vec::new();
    if let Ok(blastmat) = std::env::var("BLASTMAT") {
        let base = PathBuf::from(blastmat);
        dirs.push(base.join("aa"));
        dirs.push(base);
    }
    dirs.push(PathBuf::from("data"));

    dirs.into_iter()
        .flat_map(|d| [d.join(name), d.join(name.to_lowercase())])
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ncbistdaa_encoding() {
        assert_eq!(aa_char_to_ncbistdaa(b'A'), 1);
        assert_eq!(aa_char_to_ncbistdaa(b'a'), 1);
        assert_eq!(aa_char_to_ncbistdaa(b'*'), 25);
        assert_eq!(aa_char_to_ncbistdaa(b'-'), 0);
        assert_eq!(aa_char_to_ncbistdaa(b'X'), 21);
        assert_eq!(aa_char_to_ncbistdaa(b'J'), 27);
        assert_eq!(decode_protein(&encode_protein(b"MKV*")), "MKV*");
    }

    #[test]
    fn test_blosum62_scores() {
        assert_eq!(blosum62_score(ncbistdaa::A, ncbistdaa::A), 4);
        assert_eq!(blosum62_score(ncbistdaa::W, ncbistdaa::W), 11);
        assert_eq!(blosum62_score(ncbistdaa::STOP, ncbistdaa::STOP), 1);
        assert_eq!(blosum62_score(0, ncbistdaa::A), DEFSCORE);
    }

    #[test]
    fn test_true_char_positions_are_true_residues() {
        for &r in TRUE_CHAR_POSITIONS.iter() {
            let letter = NCBISTDAA_TO_AMINOACID[r];
            assert!(b"ACDEFGHIKLMNPQRSTVWY".contains(&letter));
        }
        assert!(!is_true_residue(ncbistdaa::X as usize));
        assert!(!is_true_residue(ncbistdaa::GAP as usize));
    }

    #[test]
    fn test_score_matrix_builtin() {
        let m = ScoreMatrix::blosum62();
        assert_eq!(m.score(ncbistdaa::C, ncbistdaa::C), 9);
        assert_eq!(m.score(ncbistdaa::U, ncbistdaa::A), m.score(ncbistdaa::X, ncbistdaa::A));
        assert_eq!(m.loscore(), -4);
        assert_eq!(m.hiscore(), 11);
    }

    #[test]
    fn test_parse_text_matrix() {
        let text = "# toy\n   A  R  X\nA  4 -1 -1\nR -1  5 -1\nX -1 -1 -1\n";
        let m = ScoreMatrix::parse(ScoringMatrixName::Blosum62, text).unwrap();
        assert_eq!(m.score(ncbistdaa::A, ncbistdaa::A), 4);
        assert_eq!(m.score(ncbistdaa::R, ncbistdaa::A), -1);
        // W is absent: behaves like X
        assert_eq!(m.score(ncbistdaa::W, ncbistdaa::A), -1);
        assert_eq!(m.score(ncbistdaa::GAP, ncbistdaa::A), -1);
    }

    #[test]
    fn test_parse_rejects_short_row() {
        let text = "   A  R\nA  4\n";
        let err = ScoreMatrix::parse(ScoringMatrixName::Blosum62, text).unwrap_err();
        assert_eq!(err.0, 2);
    }
}

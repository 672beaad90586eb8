//! Unit tests for api/blast_psi.rs (PssmEngine)

use psiblast_core::api::blast_psi::{PssmEngine, PssmInputData};
use psiblast_core::api::msa_pssm_input::MsaInputData;
use psiblast_core::config::PsiBlastOptions;
use psiblast_core::core::blast_psi::{DiagnosticsRequest, PsiMsa};
use psiblast_core::error::{BlastError, Result};
use psiblast_core::utils::matrix::{BLASTAA_SIZE, TRUE_CHAR_POSITIONS};
use super::super::helpers::{make_msa_fasta, QUERY};

fn msa_input(n: usize) -> MsaInputData {
    MsaInputData::from_fasta(make_msa_fasta(n).as_bytes(), PsiBlastOptions::default()).unwrap()
}

/// Input whose query is empty
struct EmptyQuery {
    options: PsiBlastOptions,
}

impl PssmInputData for EmptyQuery {
    fn query(&self) -> &[u8] {
        &[]
    }

    fn process(&mut self) -> Result<()> {
        Ok(())
    }

    fn data(&mut self) -> Option<&mut PsiMsa> {
        None
    }

    fn options(&self) -> &PsiBlastOptions {
        &self.options
    }
}

#[test]
fn test_empty_query_rejected_at_construction() {
    let mut input = EmptyQuery {
        options: PsiBlastOptions::default(),
    };
    match PssmEngine::new(&mut input) {
        Err(BlastError::BadParameter(msg)) => {
            assert_eq!(msg, "Query length provided by PssmInput interface is 0")
        }
        Err(other) => panic!("unexpected error {other:?}"),
        Ok(_) => panic!("engine accepted an empty query"),
    }
}

#[test]
fn test_packaged_dimensions() {
    let mut input = msa_input(6);
    let engine = PssmEngine::new(&mut input).unwrap();
    let result = engine.run().unwrap();
    let pssm = &result.pssm;

    assert!(pssm.is_protein);
    assert!(!pssm.by_row);
    assert_eq!(pssm.num_rows, BLASTAA_SIZE);
    assert_eq!(pssm.num_columns, QUERY.len());
    assert_eq!(pssm.final_data.scores.len(), pssm.num_rows * pssm.num_columns);

    let inter = pssm.intermediate_data.as_ref().expect("frequency ratios by default");
    assert_eq!(inter.freq_ratios.len(), pssm.final_data.scores.len());
    assert!(inter.res_freqs_per_pos.is_empty());

    assert!(pssm.final_data.lambda > 0.0);
    assert!(pssm.final_data.kappa > 0.0);
    assert_eq!(result.params.rpsdb_params.matrix_name, "BLOSUM62");
    assert_eq!(result.params.pseudocount, 0);
}

#[test]
fn test_query_residues_score_well() {
    let mut input = msa_input(6);
    let result = PssmEngine::new(&mut input).unwrap().run().unwrap();
    let query = input.query().to_vec();
    let mut positive = 0;
    for (c, &q) in query.iter().enumerate() {
        let own = result.pssm.score(c, q as usize).unwrap();
        let best = TRUE_CHAR_POSITIONS
            .iter()
            .map(|&r| result.pssm.score(c, r).unwrap())
            .max()
            .unwrap();
        if own > 0 {
            positive += 1;
        }
        assert!(own >= best - 8, "column {}: own {} best {}", c, own, best);
    }
    assert!(positive * 2 > query.len());
}

#[test]
fn test_residue_frequencies_are_packaged() {
    let mut input = msa_input(4);
    let mut engine = PssmEngine::new(&mut input).unwrap();
    engine.set_diagnostics(DiagnosticsRequest {
        residue_frequencies: true,
        weighted_residue_frequencies: true,
        frequency_ratios: true,
        ..DiagnosticsRequest::default()
    });
    let result = engine.run().unwrap();
    let n = result.pssm.final_data.scores.len();
    let inter = result.pssm.intermediate_data.unwrap();
    assert_eq!(inter.res_freqs_per_pos.len(), n);
    assert_eq!(inter.weighted_res_freqs_per_pos.len(), n);
    assert_eq!(inter.freq_ratios.len(), n);
    // Column 0: query plus the homologs aligned there
    let col0: i32 = inter.res_freqs_per_pos[..BLASTAA_SIZE].iter().sum();
    assert!(col0 >= 2);
}

#[test]
fn test_information_content_not_supported() {
    let mut input = msa_input(4);
    let mut engine = PssmEngine::new(&mut input).unwrap();
    engine.set_diagnostics(DiagnosticsRequest {
        information_content: true,
        ..DiagnosticsRequest::default()
    });
    match engine.run() {
        Err(BlastError::NotSupported(msg)) => assert!(msg.contains("Information content")),
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn test_gapless_column_weights_not_supported() {
    let mut input = msa_input(4);
    let mut engine = PssmEngine::new(&mut input).unwrap();
    engine.set_diagnostics(DiagnosticsRequest {
        frequency_ratios: true,
        gapless_column_weights: true,
        ..DiagnosticsRequest::default()
    });
    assert!(matches!(engine.run(), Err(BlastError::NotSupported(_))));
}

#[test]
fn test_core_failure_wraps_numeric_code() {
    // A lone copy of the query is purged, leaving nothing to build from
    let fasta = format!(
        ">q\n{}\n>copy\n{}\n",
        String::from_utf8_lossy(QUERY),
        String::from_utf8_lossy(QUERY)
    );
    let mut input = MsaInputData::from_fasta(fasta.as_bytes(), PsiBlastOptions::default()).unwrap();
    match PssmEngine::new(&mut input).unwrap().run() {
        Err(BlastError::Internal(msg)) => assert_eq!(msg, "Error code in PSSM engine: -6"),
        other => panic!("unexpected result {other:?}"),
    }
}

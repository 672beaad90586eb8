//! Main execution logic for PSSM construction

use std::fs::File;
use std::io::{self, BufWriter, Write};

use anyhow::{Context, Result};

use crate::api::blast_psi::{PssmEngine, PssmInputData};
use crate::api::msa_pssm_input::MsaInputData;
use crate::config::PsiBlastOptions;
use crate::core::blast_psi::DiagnosticsRequest;

use super::args::PssmArgs;

pub fn run(args: PssmArgs) -> Result<()> {
    let options = PsiBlastOptions {
        pseudo_count: args.pseudocount,
        near_identical: args.near_identical,
        impala_scaling_factor: args.scaling_factor,
        ..PsiBlastOptions::default()
    };
    options
        .validate()
        .map_err(anyhow::Error::msg)
        .context("Invalid PSSM options")?;

    let file = File::open(&args.msa)
        .with_context(|| format!("Failed to open alignment {}", args.msa.display()))?;
    let mut input = MsaInputData::from_fasta(file, options)
        .with_context(|| format!("Failed to read alignment {}", args.msa.display()))?
        .with_matrix(args.matrix);
    log::info!(
        "Read alignment of {} sequences, query length {}",
        input.ids().len(),
        input.query().len()
    );

    let mut engine = PssmEngine::with_matrix_path(&mut input, args.matrix_path.clone())
        .context("Failed to set up the PSSM engine")?;
    if !args.freq_ratios {
        engine.set_diagnostics(DiagnosticsRequest::default());
    }
    let pssm = engine.run().context("PSSM computation failed")?;

    match &args.out {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let mut out = BufWriter::new(file);
            pssm.write_ascii(&mut out)?;
            out.flush()?;
            log::info!("Wrote PSSM to {}", path.display());
        }
        None => {
            let stdout = io::stdout();
            let mut out = BufWriter::new(stdout.lock());
            pssm.write_ascii(&mut out)?;
            out.flush()?;
        }
    }
    Ok(())
}

//! Main execution logic for the collection scan

use std::fs::File;
use std::io::{self, BufWriter, Write};

use anyhow::{Context, Result};

use crate::api::seqsrc_fasta::{fasta_src_init, FastaSeqSrcArgs};
use crate::api::seqsrc_scan::{scan_composition, ScanOptions, ScanSummary};
use crate::core::blast_seqsrc::BlastSeqSrc;
use crate::utils::matrix::{NCBISTDAA_TO_AMINOACID, TRUE_CHAR_POSITIONS};

use super::args::SeqSrcArgs;

const BLASTNA_TO_IUPAC: &[u8; 16] = b"ACGTRYMKWSBDHVN-";

fn write_report<W: Write>(out: &mut W, src: &BlastSeqSrc, summary: &ScanSummary) -> io::Result<()> {
    writeln!(out, "Name\t{}", src.name())?;
    writeln!(out, "Molecule\t{}", if src.is_prot() { "protein" } else { "nucleotide" })?;
    writeln!(out, "Sequences\t{}", src.num_seqs())?;
    writeln!(out, "Total length\t{}", src.tot_len())?;
    writeln!(out, "Max length\t{}", src.max_seq_len())?;
    writeln!(out, "Average length\t{}", src.avg_seq_len())?;

    let freqs = summary.frequencies();
    writeln!(out, "Composition")?;
    if src.is_prot() {
        for &r in TRUE_CHAR_POSITIONS.iter() {
            writeln!(out, "{}\t{}\t{:.4}", NCBISTDAA_TO_AMINOACID[r] as char, summary.counts[r], freqs[r])?;
        }
    } else {
        for (r, &letter) in BLASTNA_TO_IUPAC.iter().enumerate() {
            if summary.counts[r] > 0 {
                writeln!(out, "{}\t{}\t{:.4}", letter as char, summary.counts[r], freqs[r])?;
            }
        }
    }

    writeln!(out, "Workers")?;
    for (i, w) in summary.workers.iter().enumerate() {
        writeln!(
            out,
            "{}\toids {}..{}\t{} sequences\t{} residues\t{} refills",
            i, w.first_oid, w.end_oid, w.sequences, w.residues, w.refills
        )?;
    }
    Ok(())
}

pub fn run(args: SeqSrcArgs) -> Result<()> {
    let num_threads = if args.num_threads == 0 {
        num_cpus::get()
    } else {
        args.num_threads
    };

    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()
        .context("Failed to build thread pool")?;

    let src = fasta_src_init(FastaSeqSrcArgs {
        path: args.input.clone(),
        is_prot: args.nucleotide.then_some(false),
    })
    .with_context(|| format!("Failed to open sequence source {}", args.input.display()))?;
    if let Some(msg) = src.init_error() {
        log::warn!("{}", msg);
    }

    let options = ScanOptions {
        chunk_size: args.chunk_size,
        num_workers: num_threads,
        show_progress: !args.quiet,
    };
    let summary = scan_composition(&src, &options).context("Collection scan failed")?;
    log::info!(
        "Scanned {} sequences ({} residues) with {} workers",
        summary.num_seqs,
        summary.tot_len,
        summary.workers.len()
    );

    match &args.out {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let mut out = BufWriter::new(file);
            write_report(&mut out, &src, &summary)?;
            out.flush()?;
        }
        None => {
            let stdout = io::stdout();
            let mut out = BufWriter::new(stdout.lock());
            write_report(&mut out, &src, &summary)?;
            out.flush()?;
        }
    }
    Ok(())
}

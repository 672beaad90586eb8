//! Unit tests for the parallel collection scan

use psiblast_core::api::seqsrc_fasta::FastaSeqSrc;
use psiblast_core::api::seqsrc_scan::{scan_composition, ScanOptions};
use psiblast_core::core::blast_seqsrc::BlastSeqSrc;
use psiblast_core::utils::matrix::ncbistdaa;
use super::super::helpers::{assert_approx_eq, make_multiseq_src};

#[test]
fn test_scan_counts_every_residue() {
    let src = make_multiseq_src(&[10, 20, 30]);
    let options = ScanOptions {
        chunk_size: 2,
        num_workers: 2,
        show_progress: false,
    };
    let summary = scan_composition(&src, &options).unwrap();
    assert_eq!(summary.num_seqs, 3);
    assert_eq!(summary.tot_len, 60);
    assert_eq!(summary.workers.len(), 2);
    assert_eq!(summary.counts.iter().sum::<u64>(), 60);
    // make_protein_sequence cycles ACDE..., so A opens every sequence
    assert_eq!(summary.counts[ncbistdaa::A as usize], 1 + 1 + 2);
    let total: f64 = summary.frequencies().iter().sum();
    assert_approx_eq(total, 1.0, 1e-12);
}

#[test]
fn test_scan_matches_serial_result() {
    let src = make_multiseq_src(&[7, 3, 11, 5, 9, 2, 13]);
    let serial = scan_composition(&src, &ScanOptions::default()).unwrap();
    let parallel = scan_composition(
        &src,
        &ScanOptions {
            chunk_size: 1,
            num_workers: 4,
            show_progress: false,
        },
    )
    .unwrap();
    assert_eq!(serial.counts, parallel.counts);
    assert_eq!(serial.tot_len, parallel.tot_len);
    let covered: usize = parallel.workers.iter().map(|w| w.sequences).sum();
    assert_eq!(covered, 7);
}

#[test]
fn test_scan_fasta_source() {
    let fasta = ">gi|7|x\nMKVL\n>b\nWWW\n";
    let src = BlastSeqSrc::from_backend(Box::new(
        FastaSeqSrc::from_reader("inline", fasta.as_bytes(), None).unwrap(),
    ));
    let summary = scan_composition(&src, &ScanOptions::default()).unwrap();
    assert_eq!(summary.tot_len, 7);
    assert_eq!(summary.counts[ncbistdaa::W as usize], 3);
    assert_eq!(src.get_gis(0).unwrap().as_slice(), &[7]);
}

//! Unit tests for api/seqsrc_multiseq.rs and the BlastSeqSrc handle

use psiblast_core::core::blast_seqsrc::{
    BlastSeqSrc, CopySemantics, SeqSrcError, SeqSrcNewInfo,
};
use psiblast_core::api::seqsrc_multiseq::MultiSeqSrcArgs;
use super::super::helpers::make_multiseq_src;

#[test]
fn test_collection_statistics() {
    let src = make_multiseq_src(&[10, 20, 30]);
    assert_eq!(src.num_seqs(), 3);
    assert_eq!(src.max_seq_len(), 30);
    assert_eq!(src.tot_len(), 60);
    assert_eq!(src.avg_seq_len(), 20);
    assert!(src.is_prot());
    assert_eq!(src.name(), "fixture");
    assert!(src.init_error().is_none());
}

#[test]
fn test_sequence_lengths_per_oid() {
    let src = make_multiseq_src(&[10, 20, 30]);
    for (oid, expected) in [(0u32, 10usize), (1, 20), (2, 30)] {
        assert_eq!(src.get_seq_len(oid).unwrap(), expected);
        assert_eq!(src.get_sequence(oid).unwrap().length(), expected);
    }
}

#[test]
fn test_read_after_release_is_identical() {
    let src = make_multiseq_src(&[10, 20, 30]);
    let first = src.get_sequence(2).unwrap();
    let bytes = first.sequence().to_vec();
    src.release_sequence(first);
    let again = src.get_sequence(2).unwrap();
    assert_eq!(again.sequence(), bytes.as_slice());
    assert_eq!(again.oid(), 2);
}

#[test]
fn test_copy_is_independent_owner() {
    let src = make_multiseq_src(&[5, 6]);
    let copy = src.copy();
    drop(src);
    assert_eq!(copy.num_seqs(), 2);
    assert_eq!(copy.copy_semantics(), CopySemantics::Shared);
    assert_eq!(copy.get_seq_len(1).unwrap(), 6);
}

#[test]
fn test_missing_constructor() {
    let info: SeqSrcNewInfo<MultiSeqSrcArgs> = SeqSrcNewInfo {
        constructor: None,
        ctor_argument: MultiSeqSrcArgs {
            name: "x".to_string(),
            sequences: Vec::new(),
            is_prot: true,
        },
    };
    let err = BlastSeqSrc::new(info).unwrap_err();
    assert!(matches!(err, SeqSrcError::MissingConstructor));
}

#[test]
fn test_sources_without_gis_return_empty_list() {
    let src = make_multiseq_src(&[5]);
    assert!(src.get_gis(0).unwrap().is_empty());
}

//! Unit tests for chunked oid iteration

use psiblast_core::core::blast_seqsrc::Oid;
use psiblast_core::core::blast_seqsrc_iterator::{SeqSrcIterator, SEQSRC_DEFAULT_CHUNK_SIZE};
use super::super::helpers::make_multiseq_src;

fn drain(src: &psiblast_core::core::blast_seqsrc::BlastSeqSrc, itr: &mut SeqSrcIterator) -> Vec<Oid> {
    let mut oids = Vec::new();
    while let Some(oid) = src.iterator_next(itr) {
        oids.push(oid);
    }
    oids
}

#[test]
fn test_three_sequences_chunk_two() {
    let src = make_multiseq_src(&[10, 20, 30]);
    let mut itr = src.iterator(2);
    assert_eq!(src.iterator_next(&mut itr), Some(0));
    assert_eq!(itr.buffered(), 2);
    assert_eq!(src.iterator_next(&mut itr), Some(1));
    assert_eq!(src.iterator_next(&mut itr), Some(2));
    assert_eq!(itr.buffered(), 1);
    assert_eq!(src.iterator_next(&mut itr), None);
    assert_eq!(itr.refills(), 2);
    // The end marker is sticky
    assert_eq!(src.iterator_next(&mut itr), None);
}

#[test]
fn test_exhaustion_for_every_chunk_size() {
    let src = make_multiseq_src(&[3; 17]);
    for chunk in [0, 1, 2, 5, 16, 17, 18, 1000] {
        let mut itr = src.iterator(chunk);
        let oids = drain(&src, &mut itr);
        assert_eq!(oids.len(), 17, "chunk size {}", chunk);
    }
}

#[test]
fn test_zero_chunk_selects_default() {
    let src = make_multiseq_src(&[1]);
    assert_eq!(src.iterator(0).chunk_size(), SEQSRC_DEFAULT_CHUNK_SIZE);
}

#[test]
fn test_fresh_iterators_see_same_oids() {
    let src = make_multiseq_src(&[4; 9]);
    let mut a = src.iterator(4);
    let mut b = src.iterator(3);
    let mut oa = drain(&src, &mut a);
    let mut ob = drain(&src, &mut b);
    oa.sort_unstable();
    ob.sort_unstable();
    assert_eq!(oa, ob);
    assert_eq!(oa, (0..9).collect::<Vec<Oid>>());
}

#[test]
fn test_bounded_iterator() {
    let src = make_multiseq_src(&[4; 9]);
    let mut itr = SeqSrcIterator::with_range(2, 3, Some(7));
    assert_eq!(drain(&src, &mut itr), vec![3, 4, 5, 6]);
    itr.reset();
    assert_eq!(drain(&src, &mut itr), vec![3, 4, 5, 6]);
}

#[test]
fn test_empty_collection() {
    let src = make_multiseq_src(&[]);
    let mut itr = src.iterator(4);
    assert_eq!(src.iterator_next(&mut itr), None);
    assert_eq!(itr.refills(), 0);
}

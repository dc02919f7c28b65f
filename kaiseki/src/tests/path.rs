use crate::analysis::*;
use crate::dictionary::EntryPtr;
use crate::errors::KaisekiError;

fn cand(score: f32, boundary: u32, right: u32, prev: (u32, u32, u32)) -> BeamCandidate {
    BeamCandidate::new(
        score,
        ConnectionPtr {
            boundary,
            right,
            previous: Some(BeamRef::new(prev.0, prev.1, prev.2)),
        },
    )
}

fn eos_boundary(beam: Vec<BeamCandidate>) -> BoundaryStarts {
    let mut starts = BoundaryStarts::new();
    starts.push(EntryPtr::Eos, beam);
    starts
}

fn empty_lattice() -> Lattice {
    let mut lattice = Lattice::new();
    lattice.add_boundary(eos_boundary(vec![cand(0.0, 2, 0, (1, 0, 0))]));
    lattice
}

/// BOS -> {X, W} -> Y -> EOS, where X and W tie as predecessors of Y.
fn two_step_lattice() -> Lattice {
    let mut lattice = Lattice::new();

    let mut b2 = BoundaryStarts::new();
    b2.push(EntryPtr::Dic(0), vec![cand(1.0, 2, 0, (1, 0, 0))]);
    b2.push(EntryPtr::Dic(2), vec![cand(1.0, 2, 1, (1, 0, 0))]);
    lattice.add_boundary(b2);

    let mut b3 = BoundaryStarts::new();
    b3.push(
        EntryPtr::Dic(1),
        vec![
            cand(2.0, 3, 0, (2, 0, 0)),
            cand(2.0, 3, 0, (2, 1, 0)),
            cand(1.5, 3, 0, (2, 1, 0)),
        ],
    );
    lattice.add_boundary(b3);

    lattice.add_boundary(eos_boundary(vec![cand(3.0, 4, 0, (3, 0, 0))]));
    lattice
}

fn assert_offsets_consistent(path: &AnalysisPath) {
    let offsets = path.offsets();
    if path.is_empty() {
        assert!(offsets.is_empty());
        return;
    }
    assert_eq!(0, offsets[0]);
    assert!(offsets.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(path.total_nodes(), *offsets.last().unwrap() as usize);
}

#[test]
fn test_empty_input() {
    let lattice = empty_lattice();
    let mut path = AnalysisPath::new();
    path.fill_in(&lattice).unwrap();
    assert!(path.is_empty());
    assert!(path.offsets().is_empty());
    assert_eq!(0, path.num_groups());
}

#[test]
fn test_missing_eos_boundary() {
    let lattice = Lattice::new();
    let mut path = AnalysisPath::new();
    assert!(path.fill_in(&lattice).unwrap_err().is_invalid_state());
}

#[test]
fn test_last_boundary_without_nodes() {
    let mut lattice = Lattice::new();
    lattice.add_boundary(BoundaryStarts::new());
    lattice.add_boundary(BoundaryStarts::new());
    let mut path = AnalysisPath::new();
    let err = path.fill_in(&lattice).unwrap_err();
    assert!(matches!(&err, KaisekiError::InvalidState(e) if e.msg().contains("exactly one node")));
}

#[test]
fn test_last_boundary_with_two_nodes() {
    let mut lattice = Lattice::new();
    lattice.add_boundary(BoundaryStarts::new());
    let mut last = eos_boundary(vec![cand(1.0, 3, 0, (2, 0, 0))]);
    last.push(EntryPtr::Eos, vec![cand(1.0, 3, 1, (2, 0, 0))]);
    lattice.add_boundary(last);
    let mut path = AnalysisPath::new();
    assert!(path.fill_in(&lattice).unwrap_err().is_invalid_state());
}

#[test]
fn test_last_node_not_eos() {
    let mut lattice = Lattice::new();
    lattice.add_boundary(BoundaryStarts::new());
    let mut last = BoundaryStarts::new();
    last.push(EntryPtr::Dic(3), vec![cand(1.0, 3, 0, (2, 0, 0))]);
    lattice.add_boundary(last);
    let mut path = AnalysisPath::new();
    let err = path.fill_in(&lattice).unwrap_err();
    assert!(matches!(&err, KaisekiError::InvalidState(e) if e.msg().contains("not EOS")));
}

#[test]
fn test_tie_group_at_eos() {
    let mut lattice = Lattice::new();
    let mut b2 = BoundaryStarts::new();
    for right in 0..3 {
        b2.push(EntryPtr::Dic(right), vec![cand(1.0, 2, right, (1, 0, 0))]);
    }
    lattice.add_boundary(b2);
    lattice.add_boundary(eos_boundary(vec![
        cand(5.0, 3, 0, (2, 0, 0)),
        cand(5.0, 3, 0, (2, 1, 0)),
        cand(3.0, 3, 0, (2, 2, 0)),
    ]));

    let mut path = AnalysisPath::new();
    path.fill_in(&lattice).unwrap();
    assert_eq!(&[EntryPtr::Dic(0), EntryPtr::Dic(1)], path.elems());
    assert_eq!(&[0, 2], path.offsets());
    assert_eq!(1, path.num_groups());
    assert_offsets_consistent(&path);
}

#[test]
fn test_two_steps_with_tie() {
    let lattice = two_step_lattice();
    let mut path = AnalysisPath::new();
    path.fill_in(&lattice).unwrap();

    assert_eq!(
        &[EntryPtr::Dic(1), EntryPtr::Dic(0), EntryPtr::Dic(2)],
        path.elems()
    );
    assert_eq!(&[0, 1, 3], path.offsets());
    let groups: Vec<_> = path.groups().collect();
    assert_eq!(
        vec![&[EntryPtr::Dic(1)][..], &[EntryPtr::Dic(0), EntryPtr::Dic(2)][..]],
        groups
    );
    assert_offsets_consistent(&path);
}

#[test]
fn test_group_cursor() {
    let lattice = two_step_lattice();
    let mut path = AnalysisPath::new();
    path.fill_in(&lattice).unwrap();

    assert_eq!(None, path.current_group());
    assert!(path.next_group());
    assert_eq!(Some(&[EntryPtr::Dic(1)][..]), path.current_group());
    assert!(path.next_group());
    assert_eq!(
        Some(&[EntryPtr::Dic(0), EntryPtr::Dic(2)][..]),
        path.current_group()
    );
    assert!(!path.next_group());

    assert!(path.move_to_group(0));
    assert_eq!(path.group(0), path.current_group());
    assert!(!path.move_to_group(2));
    assert_eq!(path.group(0), path.current_group());
    assert_eq!(None, path.group(2));
}

#[test]
fn test_path_is_reused() {
    let mut path = AnalysisPath::new();
    path.fill_in(&two_step_lattice()).unwrap();
    assert!(path.next_group());
    assert_eq!(3, path.total_nodes());

    path.fill_in(&empty_lattice()).unwrap();
    assert!(path.is_empty());
    assert_eq!(None, path.current_group());
}

#[test]
fn test_missing_predecessor_clears_output() {
    let mut path = AnalysisPath::new();
    path.fill_in(&two_step_lattice()).unwrap();

    let mut lattice = Lattice::new();
    lattice.add_boundary(BoundaryStarts::new());
    let broken = BeamCandidate::new(
        1.0,
        ConnectionPtr {
            boundary: 3,
            right: 0,
            previous: None,
        },
    );
    lattice.add_boundary(eos_boundary(vec![broken]));

    assert!(path.fill_in(&lattice).unwrap_err().is_invalid_state());
    assert!(path.is_empty());
    assert!(path.offsets().is_empty());
}

#[test]
fn test_dangling_back_pointer() {
    let mut lattice = Lattice::new();
    lattice.add_boundary(BoundaryStarts::new());
    lattice.add_boundary(eos_boundary(vec![cand(1.0, 3, 0, (2, 5, 0))]));
    let mut path = AnalysisPath::new();
    assert!(path.fill_in(&lattice).unwrap_err().is_invalid_state());
    assert!(path.is_empty());
}

#[test]
fn test_back_pointer_must_decrease() {
    let mut lattice = Lattice::new();
    lattice.add_boundary(BoundaryStarts::new());
    lattice.add_boundary(eos_boundary(vec![cand(1.0, 3, 0, (3, 0, 0))]));
    let mut path = AnalysisPath::new();
    assert!(path.fill_in(&lattice).unwrap_err().is_invalid_state());
}

#[cfg(debug_assertions)]
#[test]
#[should_panic(expected = "beam is not sorted")]
fn test_unsorted_beam() {
    let mut lattice = Lattice::new();
    let mut b2 = BoundaryStarts::new();
    b2.push(EntryPtr::Dic(0), vec![cand(1.0, 2, 0, (1, 0, 0))]);
    lattice.add_boundary(b2);
    lattice.add_boundary(eos_boundary(vec![
        cand(1.0, 3, 0, (2, 0, 0)),
        cand(2.0, 3, 0, (2, 0, 0)),
    ]));
    let mut path = AnalysisPath::new();
    let _ = path.fill_in(&lattice);
}

#[test]
fn test_fill_top1() {
    let lattice = two_step_lattice();
    let mut path = AnalysisPath::new();

    let unbound = AnalysisResult::new();
    assert!(unbound.fill_top1(&mut path).unwrap_err().is_invalid_state());

    let mut result = AnalysisResult::new();
    result.reset(&lattice);
    result.fill_top1(&mut path).unwrap();
    assert_eq!(2, path.num_groups());
}

#[test]
fn test_lattice_reset_between_sentences() {
    let mut lattice = two_step_lattice();
    lattice.reset();
    lattice.add_boundary(eos_boundary(vec![cand(0.0, 2, 0, (1, 0, 0))]));

    let mut path = AnalysisPath::new();
    path.fill_in(&lattice).unwrap();
    assert!(path.is_empty());
}

//! ラティス(格子)構造の実装モジュール。
//!
//! ラティスは境界(boundary)の列で、各境界はその位置から始まるノードを持ちます。
//! 各ノードはスコアの降順に並んだビーム(候補の列)を持ち、
//! 候補はひとつ前の候補への後方参照を持ちます。
//!
//! 後方参照は生ポインタではなく `(境界, ノード, ビーム位置)` の添字で表し、
//! ラティスが所有する配列に対して解決します。
//!
//! 境界0と1は文頭(BOS)の番兵、最後の境界は文末(EOS)です。
//! 空でない入力では境界2が最初の文字位置になります。
use crate::dictionary::EntryPtr;
use crate::utils::FromU32;

/// BOSの番兵として予約されている境界の数。
pub const NUM_BOS_BOUNDARIES: usize = 2;

/// ビーム内の候補を指す添字。
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct BeamRef {
    /// 境界の番号。
    pub boundary: u32,
    /// 境界内のノード(開始ノード)の番号。
    pub right: u32,
    /// ノードのビーム内の位置。
    pub beam: u32,
}

impl BeamRef {
    /// 新しい添字を作成します。
    #[inline(always)]
    pub const fn new(boundary: u32, right: u32, beam: u32) -> Self {
        Self {
            boundary,
            right,
            beam,
        }
    }
}

/// 候補の位置と、ひとつ前の候補への後方参照。
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ConnectionPtr {
    /// この候補が属する境界の番号。
    pub boundary: u32,
    /// この候補が属するノードの番号。
    pub right: u32,
    /// ひとつ前の候補。BOSでは`None`。
    pub previous: Option<BeamRef>,
}

/// ビーム内の1候補。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeamCandidate {
    /// BOSからこの候補までの総スコア。
    pub total_score: f32,
    /// この候補の位置と後方参照。
    pub ptr: ConnectionPtr,
}

impl BeamCandidate {
    /// 新しい候補を作成します。
    #[inline(always)]
    pub const fn new(total_score: f32, ptr: ConnectionPtr) -> Self {
        Self { total_score, ptr }
    }
}

/// 1つの境界から始まるノードの集合。
#[derive(Debug, Clone, Default)]
pub struct BoundaryStarts {
    entry_ptrs: Vec<EntryPtr>,
    beams: Vec<Vec<BeamCandidate>>,
}

impl BoundaryStarts {
    /// 空の集合を作成します。
    pub fn new() -> Self {
        Self::default()
    }

    /// ノードを追加し、その番号を返します。
    ///
    /// ビームはスコアの降順に並んでいる必要があります。
    /// 並び順は経路の復元時にデバッグビルドでのみ検査されます。
    pub fn push(&mut self, entry_ptr: EntryPtr, beam: Vec<BeamCandidate>) -> u32 {
        // Nodes per boundary are bounded by the dictionary size, which fits in u32.
        debug_assert!(u32::try_from(self.entry_ptrs.len()).is_ok());
        let idx = self.entry_ptrs.len() as u32;
        self.entry_ptrs.push(entry_ptr);
        self.beams.push(beam);
        idx
    }

    /// ノードの数を返します。
    #[inline(always)]
    pub fn num_starts(&self) -> usize {
        self.entry_ptrs.len()
    }

    /// ノードのエントリ識別子を返します。
    #[inline(always)]
    pub fn entry_ptr(&self, right: u32) -> Option<EntryPtr> {
        self.entry_ptrs.get(usize::from_u32(right)).copied()
    }

    /// ノードのビームを返します。
    #[inline(always)]
    pub fn beam(&self, right: u32) -> Option<&[BeamCandidate]> {
        self.beams.get(usize::from_u32(right)).map(Vec::as_slice)
    }

    /// すべてのノードのエントリ識別子を返します。
    #[inline(always)]
    pub fn entry_ptrs(&self) -> &[EntryPtr] {
        &self.entry_ptrs
    }

    fn clear(&mut self) {
        self.entry_ptrs.clear();
        self.beams.clear();
    }
}

/// ラティスの境界。
#[derive(Debug, Clone, Default)]
pub struct Boundary {
    starts: BoundaryStarts,
}

impl Boundary {
    /// この境界から始まるノードの集合を返します。
    #[inline(always)]
    pub const fn starts(&self) -> &BoundaryStarts {
        &self.starts
    }
}

/// ラティス構造体。
///
/// 境界の追加は上流の解析器が行います。このクレートは構築済みのラティスを
/// 読み出すだけです。
#[derive(Debug, Clone)]
pub struct Lattice {
    boundaries: Vec<Boundary>,
    len: usize,
}

impl Default for Lattice {
    fn default() -> Self {
        Self::new()
    }
}

impl Lattice {
    /// BOSの境界だけを持つラティスを作成します。
    pub fn new() -> Self {
        let mut lattice = Self {
            boundaries: vec![],
            len: 0,
        };
        lattice.insert_bos();
        lattice
    }

    /// ラティスをリセットし、新しい文の処理を準備します。
    ///
    /// 確保済みの領域は再利用されます。
    pub fn reset(&mut self) {
        for b in &mut self.boundaries {
            b.starts.clear();
        }
        self.len = 0;
        self.insert_bos();
    }

    fn insert_bos(&mut self) {
        for i in 0..NUM_BOS_BOUNDARIES {
            let mut starts = BoundaryStarts::new();
            let ptr = ConnectionPtr {
                boundary: i as u32,
                right: 0,
                previous: None,
            };
            starts.push(EntryPtr::Bos, vec![BeamCandidate::new(0.0, ptr)]);
            self.add_boundary(starts);
        }
    }

    /// 境界を末尾に追加し、その番号を返します。
    pub fn add_boundary(&mut self, starts: BoundaryStarts) -> u32 {
        let idx = self.len;
        if idx < self.boundaries.len() {
            self.boundaries[idx].starts = starts;
        } else {
            self.boundaries.push(Boundary { starts });
        }
        self.len += 1;
        // One boundary per input char plus BOS and EOS, which stays within u32.
        debug_assert!(u32::try_from(idx).is_ok());
        idx as u32
    }

    /// 作成済みの境界の数を返します。
    #[inline(always)]
    pub const fn num_boundaries(&self) -> usize {
        self.len
    }

    /// 境界を取得します。
    #[inline(always)]
    pub fn boundary(&self, idx: u32) -> Option<&Boundary> {
        self.boundaries[..self.len].get(usize::from_u32(idx))
    }

    /// 添字が指す候補を取得します。
    #[inline]
    pub fn candidate(&self, r: BeamRef) -> Option<&BeamCandidate> {
        self.boundary(r.boundary)?
            .starts
            .beam(r.right)?
            .get(usize::from_u32(r.beam))
    }

    /// 添字が指す候補が属するノードのエントリ識別子を取得します。
    #[inline]
    pub fn entry_ptr_at(&self, r: BeamRef) -> Option<EntryPtr> {
        self.boundary(r.boundary)?.starts.entry_ptr(r.right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_has_bos_boundaries() {
        let lattice = Lattice::new();
        assert_eq!(2, lattice.num_boundaries());
        for i in 0..2 {
            let starts = lattice.boundary(i).unwrap().starts();
            assert_eq!(1, starts.num_starts());
            assert_eq!(Some(EntryPtr::Bos), starts.entry_ptr(0));
        }
        assert!(lattice.boundary(2).is_none());
    }

    #[test]
    fn test_push_returns_indices() {
        let mut starts = BoundaryStarts::new();
        assert_eq!(0, starts.push(EntryPtr::Dic(4), vec![]));
        assert_eq!(1, starts.push(EntryPtr::Dic(5), vec![]));

        let mut lattice = Lattice::new();
        assert_eq!(2, lattice.add_boundary(starts));
        lattice.reset();
        assert_eq!(2, lattice.add_boundary(BoundaryStarts::new()));
    }

    #[test]
    fn test_reset_hides_old_boundaries() {
        let mut lattice = Lattice::new();
        lattice.add_boundary(BoundaryStarts::new());
        lattice.add_boundary(BoundaryStarts::new());
        assert_eq!(4, lattice.num_boundaries());

        lattice.reset();
        assert_eq!(2, lattice.num_boundaries());
        assert!(lattice.boundary(3).is_none());
    }

    #[test]
    fn test_resolve_beam_ref() {
        let mut lattice = Lattice::new();
        let mut starts = BoundaryStarts::new();
        let ptr = ConnectionPtr {
            boundary: 2,
            right: 0,
            previous: Some(BeamRef::new(1, 0, 0)),
        };
        starts.push(
            EntryPtr::Dic(7),
            vec![BeamCandidate::new(2.0, ptr), BeamCandidate::new(1.0, ptr)],
        );
        lattice.add_boundary(starts);

        let r = BeamRef::new(2, 0, 1);
        assert_eq!(Some(1.0), lattice.candidate(r).map(|c| c.total_score));
        assert_eq!(Some(EntryPtr::Dic(7)), lattice.entry_ptr_at(r));
        assert_eq!(Some(EntryPtr::Bos), lattice.entry_ptr_at(BeamRef::new(1, 0, 0)));
        assert_eq!(None, lattice.candidate(BeamRef::new(2, 0, 2)));
        assert_eq!(None, lattice.candidate(BeamRef::new(2, 1, 0)));
    }
}

//! 最良経路の復元モジュール。
//!
//! スコア付け済みのラティスをEOSから後方にたどり、最良経路を復元します。
//! 各ステップで最上位とスコアが等しい候補をすべて記録するため、
//! 結果は「同点グループ」の列になります。どの候補を採用するかは
//! 呼び出し側に委ねられます。
use crate::analysis::lattice::{BeamRef, ConnectionPtr, Lattice};
use crate::dictionary::EntryPtr;
use crate::errors::{KaisekiError, Result};
use crate::utils::FromU32;

/// EOSを含む末尾の境界だけを持つ、空入力のラティスの境界数。
const EMPTY_INPUT_BOUNDARIES: usize = 3;

/// 後方探索を打ち切る境界番号。これ以下はBOSです。
const LAST_BOS_BOUNDARY: u32 = 2;

/// 復元された経路。
///
/// `elems`は末尾から先頭に向かって並び、`offsets`は各ステップの
/// 同点グループの区切りを累積で保持します。バッファは問い合わせごとに
/// 再利用されるため、同じインスタンスを複数のスレッドから同時に埋めることは
/// できません(`&mut self`で保証されます)。
#[derive(Debug, Default, Clone)]
pub struct AnalysisPath {
    elems: Vec<EntryPtr>,
    offsets: Vec<u32>,
    current_group: Option<usize>,
}

impl AnalysisPath {
    /// 空の経路を作成します。
    pub fn new() -> Self {
        Self::default()
    }

    /// ラティスから最良経路を復元します。
    ///
    /// # エラー
    ///
    /// 末尾の境界が1ノードでない場合、そのノードがEOSでない場合、
    /// または後方参照の鎖が壊れている場合に[`KaisekiError::InvalidState`]を返します。
    /// エラー時には経路は空になります。
    pub fn fill_in(&mut self, lattice: &Lattice) -> Result<()> {
        let result = self.fill_in_impl(lattice);
        if let Err(e) = &result {
            log::warn!("[kaiseki] failed to reconstruct the best path: {e}");
            self.clear();
        }
        result
    }

    fn fill_in_impl(&mut self, lattice: &Lattice) -> Result<()> {
        let bnds = lattice.num_boundaries();
        self.clear();
        self.elems.reserve(bnds * 2);
        self.offsets.reserve(bnds);
        if bnds == EMPTY_INPUT_BOUNDARIES {
            // empty string
            return Ok(());
        }
        if bnds < EMPTY_INPUT_BOUNDARIES {
            return Err(KaisekiError::invalid_state(
                "lattice has no EOS boundary",
                format!("{bnds} boundaries"),
            ));
        }

        let last_idx = u32::try_from(bnds - 1)?;
        let last_starts = lattice
            .boundary(last_idx)
            .ok_or_else(|| malformed("last boundary is missing", last_idx))?
            .starts();

        if last_starts.num_starts() != 1 {
            return Err(KaisekiError::invalid_state(
                "last boundary must have exactly one node",
                format!("{} nodes", last_starts.num_starts()),
            ));
        }

        if last_starts.entry_ptr(0) != Some(EntryPtr::Eos) {
            return Err(KaisekiError::invalid_state(
                "last node was not EOS",
                format!("{:?}", last_starts.entry_ptr(0)),
            ));
        }

        let mut top_ptr: ConnectionPtr = last_starts
            .beam(0)
            .and_then(|beam| beam.first())
            .ok_or_else(|| malformed("EOS has an empty beam", last_idx))?
            .ptr;

        // 0 and 1 are BOS
        self.offsets.push(0);
        while top_ptr.boundary > LAST_BOS_BOUNDARY {
            let beam = lattice
                .boundary(top_ptr.boundary)
                .and_then(|b| b.starts().beam(top_ptr.right))
                .ok_or_else(|| malformed("connection points outside the lattice", top_ptr.boundary))?;

            let Some((top_item, rest)) = beam.split_first() else {
                return Err(malformed("empty beam on the path", top_ptr.boundary));
            };
            let top_prev = predecessor(&top_item.ptr)?;
            self.elems.push(entry_ptr_at(lattice, top_prev)?);

            // Every candidate tied with the top one joins the group.
            for next_item in rest {
                debug_assert!(
                    next_item.total_score <= top_item.total_score,
                    "beam is not sorted by score at boundary {}",
                    top_ptr.boundary,
                );
                if next_item.total_score < top_item.total_score {
                    break;
                }
                let prev = predecessor(&next_item.ptr)?;
                self.elems.push(entry_ptr_at(lattice, prev)?);
            }
            self.offsets.push(u32::try_from(self.elems.len())?);

            let next_ptr = lattice
                .candidate(top_prev)
                .ok_or_else(|| malformed("dangling back pointer", top_prev.boundary))?
                .ptr;
            if next_ptr.boundary >= top_ptr.boundary {
                return Err(KaisekiError::invalid_state(
                    "back pointers must strictly decrease the boundary",
                    format!("{} -> {}", top_ptr.boundary, next_ptr.boundary),
                ));
            }
            top_ptr = next_ptr;
        }

        self.current_group = None;
        log::trace!(
            "[kaiseki] reconstructed {} groups with {} nodes",
            self.num_groups(),
            self.elems.len()
        );
        Ok(())
    }

    fn clear(&mut self) {
        self.elems.clear();
        self.offsets.clear();
        self.current_group = None;
    }

    /// 記録されたエントリを末尾から先頭の順に返します。
    #[inline(always)]
    pub fn elems(&self) -> &[EntryPtr] {
        &self.elems
    }

    /// 同点グループの累積区切りを返します。
    ///
    /// 空でない経路では先頭に0があり、以降はステップごとに1つずつ並びます。
    #[inline(always)]
    pub fn offsets(&self) -> &[u32] {
        &self.offsets
    }

    /// 記録されたエントリの総数を返します。
    #[inline(always)]
    pub fn total_nodes(&self) -> usize {
        self.elems.len()
    }

    /// 経路が空であれば`true`を返します。
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }

    /// 同点グループの数(後方探索のステップ数)を返します。
    #[inline(always)]
    pub fn num_groups(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    /// `i`番目(末尾から数えて)の同点グループを返します。
    pub fn group(&self, i: usize) -> Option<&[EntryPtr]> {
        let start = usize::from_u32(*self.offsets.get(i)?);
        let end = usize::from_u32(*self.offsets.get(i + 1)?);
        self.elems.get(start..end)
    }

    /// 同点グループを末尾から順に返すイテレータを作成します。
    pub fn groups(&self) -> impl Iterator<Item = &[EntryPtr]> + '_ {
        self.offsets
            .windows(2)
            .map(|w| &self.elems[usize::from_u32(w[0])..usize::from_u32(w[1])])
    }

    /// カーソルを次の同点グループに進めます。
    ///
    /// 次のグループが存在しない場合は`false`を返します。
    pub fn next_group(&mut self) -> bool {
        let next = self.current_group.map_or(0, |c| c + 1);
        if next < self.num_groups() {
            self.current_group = Some(next);
            true
        } else {
            false
        }
    }

    /// カーソルを指定した同点グループに移動します。
    ///
    /// 範囲外であれば`false`を返し、カーソルは変更しません。
    pub fn move_to_group(&mut self, i: usize) -> bool {
        if i < self.num_groups() {
            self.current_group = Some(i);
            true
        } else {
            false
        }
    }

    /// カーソルが指す同点グループを返します。
    ///
    /// まだグループが選ばれていない場合は`None`を返します。
    pub fn current_group(&self) -> Option<&[EntryPtr]> {
        self.group(self.current_group?)
    }
}

/// ラティスへの参照を保持し、経路の復元を仲介します。
#[derive(Debug, Default, Clone, Copy)]
pub struct AnalysisResult<'a> {
    lattice: Option<&'a Lattice>,
}

impl<'a> AnalysisResult<'a> {
    /// ラティスに結び付けられていない状態で作成します。
    pub const fn new() -> Self {
        Self { lattice: None }
    }

    /// ラティスに結び付けます。検証は行いません。
    pub fn reset(&mut self, lattice: &'a Lattice) {
        self.lattice = Some(lattice);
    }

    /// 最良経路を`path`に復元します。
    ///
    /// # エラー
    ///
    /// ラティスに結び付けられていない場合や、[`AnalysisPath::fill_in`]が
    /// 失敗した場合にエラーを返します。
    pub fn fill_top1(&self, path: &mut AnalysisPath) -> Result<()> {
        let lattice = self.lattice.ok_or_else(|| {
            KaisekiError::invalid_state("analysis result is not bound", "call reset() first")
        })?;
        path.fill_in(lattice)
    }
}

#[inline]
fn predecessor(ptr: &ConnectionPtr) -> Result<BeamRef> {
    ptr.previous
        .ok_or_else(|| malformed("candidate has no predecessor", ptr.boundary))
}

#[inline]
fn entry_ptr_at(lattice: &Lattice, r: BeamRef) -> Result<EntryPtr> {
    lattice
        .entry_ptr_at(r)
        .ok_or_else(|| malformed("dangling back pointer", r.boundary))
}

fn malformed(msg: &str, boundary: u32) -> KaisekiError {
    KaisekiError::invalid_state(msg, format!("boundary {boundary}"))
}

//! 合成ノード
//!
//! 辞書に存在しない区間(未知語)や別名エントリのために解析中に作られるノードを
//! 保持します。合成ノードは通常の辞書ストレージを経由せず、
//! 自身のエントリ行と、未知語処理が事前に計算した値を持ちます。

use crate::dictionary::{EntryPtr, FieldPtr};
use crate::errors::{KaisekiError, Result};
use crate::utils::FromU32;

/// 未知語ノードが保持する事前計算値の数。
pub const NUM_PROVIDED_VALUES: usize = 4;

/// 合成ノードの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtraNodeKind {
    /// 未知語ノード。未知語処理が計算した値を持ちます。
    Unknown {
        /// 素性として提供される値
        provided: [i32; NUM_PROVIDED_VALUES],
    },
    /// 別名ノード。既存エントリの読み替えで、提供値は持ちません。
    Alias,
}

/// 合成ノード
#[derive(Debug, Clone)]
pub struct ExtraNode {
    kind: ExtraNodeKind,
    entry: Box<[i32]>,
}

impl ExtraNode {
    /// ノードの種類を返します。
    #[inline(always)]
    pub const fn kind(&self) -> ExtraNodeKind {
        self.kind
    }

    /// ノードのエントリ行を返します。
    #[inline(always)]
    pub fn entry(&self) -> &[i32] {
        &self.entry
    }
}

/// 合成ノードと、合成ノード用の文字列を保持する領域
///
/// 1文の解析ごとに[`Self::reset`]で再利用されます。
#[derive(Debug, Default)]
pub struct ExtraNodesContext {
    nodes: Vec<ExtraNode>,
    strings: Vec<String>,
}

impl ExtraNodesContext {
    /// 空の領域を作成します。
    pub fn new() -> Self {
        Self::default()
    }

    /// すべてのノードと文字列を破棄します。
    pub fn reset(&mut self) {
        self.nodes.clear();
        self.strings.clear();
    }

    fn push(&mut self, kind: ExtraNodeKind, entry: Vec<i32>) -> Result<EntryPtr> {
        let idx = u32::try_from(self.nodes.len())?;
        self.nodes.push(ExtraNode {
            kind,
            entry: entry.into_boxed_slice(),
        });
        Ok(EntryPtr::Extra(idx))
    }

    /// 未知語ノードを作成します。
    pub fn make_unknown(
        &mut self,
        entry: Vec<i32>,
        provided: [i32; NUM_PROVIDED_VALUES],
    ) -> Result<EntryPtr> {
        self.push(ExtraNodeKind::Unknown { provided }, entry)
    }

    /// 別名ノードを作成します。
    pub fn make_alias(&mut self, entry: Vec<i32>) -> Result<EntryPtr> {
        self.push(ExtraNodeKind::Alias, entry)
    }

    /// 合成ノード用の文字列を登録し、エントリ行に格納できる参照を返します。
    pub fn intern_string<S>(&mut self, s: S) -> Result<FieldPtr>
    where
        S: Into<String>,
    {
        let idx = u32::try_from(self.strings.len())?;
        if idx > i32::MAX as u32 {
            return Err(KaisekiError::invalid_state(
                "too many extra strings",
                idx.to_string(),
            ));
        }
        self.strings.push(s.into());
        Ok(FieldPtr::Extra(idx))
    }

    /// 合成ノードを取得します。合成ノード以外の識別子には`None`を返します。
    #[inline]
    pub fn node(&self, ptr: EntryPtr) -> Option<&ExtraNode> {
        let idx = ptr.extra_index()?;
        self.nodes.get(usize::from_u32(idx))
    }

    /// 合成ノード用の文字列を取得します。
    #[inline]
    pub fn string(&self, idx: u32) -> Option<&str> {
        self.strings.get(usize::from_u32(idx)).map(String::as_str)
    }

    /// 合成ノード用の文字列の文字数を返します。
    ///
    /// 文字列は列ごとに分けず1つのプールに置かれるため、列番号は使いません。
    /// 存在しない番号には0を返します。
    #[inline]
    pub fn length_of(&self, _field: u32, idx: u32) -> i32 {
        self.string(idx).map_or(0, |s| s.chars().count() as i32)
    }

    /// 保持しているノードの数を返します。
    #[inline(always)]
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }
}

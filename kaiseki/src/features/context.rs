//! 素性計算のための辞書アクセス層
//!
//! [`PrimitiveFeatureContext`]は辞書の列と合成ノードへの読み取り専用の参照をまとめ、
//! 基本素性が必要とする型付きのアクセスを提供します。
//! 構成エラーは`check_*`/`set_length_field`で初期化時に検出し、
//! 解析中に呼ばれる関数は失敗しません。

use crate::analysis::extra_nodes::{ExtraNodeKind, ExtraNodesContext, NUM_PROVIDED_VALUES};
use crate::dictionary::storage::IntListTraversal;
use crate::dictionary::{ColumnType, DicField, EntryPtr, FieldPtr, FieldsHolder};
use crate::errors::{KaisekiError, Result};
use crate::utils::FromU32;

/// 長さの計算にどのストレージを使うか
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthFieldSource {
    /// 文字列ストレージ(文字数)
    Strings,
    /// 位置リストストレージ(要素数)
    Positions,
}

/// 辞書の位置リストを累積復元しながら走査するイテレータ
///
/// 有限で、巻き戻せません。
#[derive(Debug, Clone)]
pub struct DicListTraversal<'a> {
    trav: IntListTraversal<'a>,
}

impl DicListTraversal<'_> {
    /// まだ読み出していない要素の数を返します。
    #[inline(always)]
    pub const fn remaining(&self) -> u32 {
        self.trav.remaining()
    }
}

impl Iterator for DicListTraversal<'_> {
    type Item = i32;

    #[inline(always)]
    fn next(&mut self) -> Option<i32> {
        self.trav.next()
    }

    #[inline(always)]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.trav.size_hint()
    }
}

/// 基本素性が参照する辞書と合成ノードへのアクセス
#[derive(Debug, Clone, Copy)]
pub struct PrimitiveFeatureContext<'a> {
    extra: &'a ExtraNodesContext,
    fields: &'a FieldsHolder,
}

impl<'a> PrimitiveFeatureContext<'a> {
    /// 新しいコンテキストを作成します。
    pub const fn new(extra: &'a ExtraNodesContext, fields: &'a FieldsHolder) -> Self {
        Self { extra, fields }
    }

    /// 列を取得します。存在しない場合はエラーを返します。
    pub fn field(&self, field: u32) -> Result<&'a DicField> {
        self.fields.get(field).ok_or_else(|| {
            KaisekiError::invalid_argument(
                "field",
                format!(
                    "field {} does not exist, dictionary has {} fields",
                    field,
                    self.fields.len()
                ),
            )
        })
    }

    /// 列の位置リストを走査するイテレータを返します。
    ///
    /// 合成ノード側の値や存在しない列に対しては空の走査を返します。
    #[inline]
    pub fn traversal(&self, field: u32, ptr: FieldPtr) -> DicListTraversal<'a> {
        let trav = match (ptr, self.fields.get(field)) {
            (FieldPtr::Dic(p), Some(fld)) => fld.positions.list_at(p as i32),
            _ => IntListTraversal::empty(),
        };
        DicListTraversal { trav }
    }

    /// 未知語ノードが提供する値を返します。
    ///
    /// 通常のエントリ、存在しないノード、未知語以外の合成ノードには0を返します。
    #[inline]
    pub fn provided_feature(&self, entry_ptr: EntryPtr, index: u32) -> i32 {
        match self.extra.node(entry_ptr).map(|n| n.kind()) {
            Some(ExtraNodeKind::Unknown { provided }) => provided
                .get(usize::from_u32(index))
                .copied()
                .unwrap_or(0),
            _ => 0,
        }
    }

    /// 列の型が許可された型のいずれかであることを検査します。
    ///
    /// # エラー
    ///
    /// 列が存在しない場合は[`KaisekiError::InvalidArgument`]、
    /// 型が許可されていない場合は[`KaisekiError::InvalidState`]を返します。
    pub fn check_field_type(&self, field: u32, allowed: &[ColumnType]) -> Result<()> {
        let fld = self.field(field)?;
        if allowed.contains(&fld.column_type) {
            return Ok(());
        }
        let allowed: Vec<_> = allowed.iter().map(ToString::to_string).collect();
        Err(KaisekiError::invalid_state(
            format!("field {} typed {} is not allowed here", fld.name, fld.column_type),
            format!("allowed types: [{}]", allowed.join(", ")),
        ))
    }

    /// 提供値の番号が範囲内であることを検査します。
    pub fn check_provided_feature(&self, index: u32) -> Result<()> {
        if usize::from_u32(index) < NUM_PROVIDED_VALUES {
            Ok(())
        } else {
            Err(KaisekiError::invalid_argument(
                "index",
                format!(
                    "provided feature index {index} must be less than {NUM_PROVIDED_VALUES}"
                ),
            ))
        }
    }

    /// 列の値の要素数を返します。
    ///
    /// 合成ノード側の値は合成ノードの文字列から、それ以外は`source`が示す
    /// ストレージから求めます。
    #[inline]
    pub fn length_of(&self, field: u32, ptr: FieldPtr, source: LengthFieldSource) -> i32 {
        match ptr {
            FieldPtr::Extra(idx) => self.extra.length_of(field, idx),
            FieldPtr::Dic(p) => {
                let Some(fld) = self.fields.get(field) else {
                    return 0;
                };
                match source {
                    LengthFieldSource::Positions => fld.positions.length_of(p as i32),
                    LengthFieldSource::Strings => fld.strings.length_of(p as i32),
                }
            }
        }
    }

    /// 列の型から長さの計算に使うストレージを決めます。
    ///
    /// # エラー
    ///
    /// 列が`String`でも`StringList`でもない場合に[`KaisekiError::InvalidState`]を返します。
    pub fn set_length_field(&self, field: u32) -> Result<LengthFieldSource> {
        let fld = self.field(field)?;
        match fld.column_type {
            ColumnType::StringList => Ok(LengthFieldSource::Positions),
            ColumnType::String => Ok(LengthFieldSource::Strings),
            other => Err(KaisekiError::invalid_state(
                format!("field {} typed {}", fld.name, other),
                "can not be used for length calculation",
            )),
        }
    }
}

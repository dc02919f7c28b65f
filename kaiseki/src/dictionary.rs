//! 辞書の列データモジュール。
//!
//! 素性計算が読み出す辞書の列(フィールド)と、エントリ行の表を提供します。
//! 各列は型タグを持ち、文字列ストレージまたは位置リストストレージのどちらかで
//! 値を保持します。
//!
//! - [`FieldsHolder`]: 列の集合。番号または名前で引けます
//! - [`EntryTable`]: エントリごとの`i32`行
//! - [`FieldsBuilder`]: 行データやCSVから列を構築するビルダー
pub mod builder;
pub(crate) mod entry_ptr;
pub mod storage;

use std::fmt;

use hashbrown::HashMap;

use crate::dictionary::storage::{IntListStorage, StringStorage};
use crate::utils::FromU32;

pub use crate::dictionary::builder::FieldsBuilder;
pub use crate::dictionary::entry_ptr::{EntryPtr, FieldPtr};

/// 辞書の列の格納形式
#[derive(Clone, Copy, Eq, PartialEq, Debug, Hash)]
pub enum ColumnType {
    /// 単一の文字列。行には文字列ストレージのオフセットが入ります。
    String,
    /// 文字列のリスト。行には位置リストストレージのオフセットが入り、
    /// リストの各要素は文字列ストレージのオフセットです。
    StringList,
    /// 整数。行には値そのものが入ります。
    Int,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::StringList => "string_list",
            Self::Int => "int",
        };
        f.write_str(name)
    }
}

/// 辞書の1列
#[derive(Debug, Clone)]
pub struct DicField {
    pub(crate) index: u32,
    pub(crate) name: String,
    pub(crate) column_type: ColumnType,
    pub(crate) strings: StringStorage,
    pub(crate) positions: IntListStorage,
}

impl DicField {
    /// 列番号を返します。
    #[inline(always)]
    pub const fn index(&self) -> u32 {
        self.index
    }

    /// 列名を返します。
    #[inline(always)]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 列の型を返します。
    #[inline(always)]
    pub const fn column_type(&self) -> ColumnType {
        self.column_type
    }

    /// 文字列ストレージを返します。
    #[inline(always)]
    pub const fn strings(&self) -> &StringStorage {
        &self.strings
    }

    /// 位置リストストレージを返します。
    #[inline(always)]
    pub const fn positions(&self) -> &IntListStorage {
        &self.positions
    }
}

/// 辞書の列の集合
#[derive(Debug, Clone, Default)]
pub struct FieldsHolder {
    fields: Vec<DicField>,
    by_name: HashMap<String, usize>,
}

impl FieldsHolder {
    pub(crate) fn new(fields: Vec<DicField>) -> Self {
        let by_name = fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.name.clone(), i))
            .collect();
        Self { fields, by_name }
    }

    /// 列番号から列を取得します。
    #[inline(always)]
    pub fn get(&self, index: u32) -> Option<&DicField> {
        self.fields.get(usize::from_u32(index))
    }

    /// 列名から列を取得します。
    pub fn by_name(&self, name: &str) -> Option<&DicField> {
        self.by_name.get(name).map(|&i| &self.fields[i])
    }

    /// 列数を返します。
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// 列を持たない場合に`true`を返します。
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// 列のイテレータを返します。
    pub fn iter(&self) -> impl Iterator<Item = &DicField> {
        self.fields.iter()
    }
}

/// エントリ行の表
///
/// すべての行は同じ列数を持ち、平坦な配列として保持されます。
#[derive(Debug, Clone, Default)]
pub struct EntryTable {
    data: Vec<i32>,
    num_fields: usize,
}

impl EntryTable {
    pub(crate) const fn new(data: Vec<i32>, num_fields: usize) -> Self {
        Self { data, num_fields }
    }

    /// 行番号から行を取得します。
    #[inline]
    pub fn row(&self, idx: u32) -> Option<&[i32]> {
        let start = usize::from_u32(idx).checked_mul(self.num_fields)?;
        self.data.get(start..start + self.num_fields)
    }

    /// 辞書エントリの行を取得します。合成ノードや番兵には`None`を返します。
    #[inline]
    pub fn entry(&self, ptr: EntryPtr) -> Option<&[i32]> {
        match ptr {
            EntryPtr::Dic(idx) => self.row(idx),
            _ => None,
        }
    }

    /// 行数を返します。
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len().checked_div(self.num_fields).unwrap_or(0)
    }

    /// 行を持たない場合に`true`を返します。
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 1行あたりの列数を返します。
    #[inline(always)]
    pub const fn num_fields(&self) -> usize {
        self.num_fields
    }
}

/// 列の集合とエントリ表の組
#[derive(Debug, Clone, Default)]
pub struct DictionaryFields {
    pub(crate) fields: FieldsHolder,
    pub(crate) entries: EntryTable,
}

impl DictionaryFields {
    /// 列の集合を返します。
    #[inline(always)]
    pub const fn fields(&self) -> &FieldsHolder {
        &self.fields
    }

    /// エントリ表を返します。
    #[inline(always)]
    pub const fn entries(&self) -> &EntryTable {
        &self.entries
    }
}

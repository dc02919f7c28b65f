//! 辞書の列を構築するビルダー
//!
//! 行単位で渡されたセルを列ごとのストレージに格納し、
//! エントリ表を作ります。同じ文字列・同じリストは1度だけ格納されます。

use std::io::Read;

use hashbrown::HashMap;

use crate::dictionary::storage::{IntListStorageBuilder, StringStorageBuilder};
use crate::dictionary::{
    ColumnType, DicField, DictionaryFields, EntryPtr, EntryTable, FieldsHolder,
};
use crate::errors::{KaisekiError, Result};
use crate::utils::{self, FromU32};

/// 文字列リストのセル内の区切り文字
pub const LIST_SEPARATOR: char = ' ';

struct ColumnBuilder {
    name: String,
    column_type: ColumnType,
    strings: StringStorageBuilder,
    positions: IntListStorageBuilder,
    interned_strings: HashMap<String, i32>,
    interned_lists: HashMap<Vec<i32>, i32>,
}

impl ColumnBuilder {
    fn new(name: String, column_type: ColumnType) -> Self {
        Self {
            name,
            column_type,
            strings: StringStorageBuilder::new(),
            positions: IntListStorageBuilder::new(),
            interned_strings: HashMap::new(),
            interned_lists: HashMap::new(),
        }
    }

    fn intern_string(&mut self, s: &str) -> Result<i32> {
        if let Some(&ptr) = self.interned_strings.get(s) {
            return Ok(ptr);
        }
        let ptr = self.strings.push(s)?;
        self.interned_strings.insert(s.to_string(), ptr);
        Ok(ptr)
    }

    fn intern_list(&mut self, cell: &str) -> Result<i32> {
        let mut values = vec![];
        for item in cell.split(LIST_SEPARATOR).filter(|s| !s.is_empty()) {
            values.push(self.intern_string(item)?);
        }
        if let Some(&ptr) = self.interned_lists.get(&values) {
            return Ok(ptr);
        }
        let ptr = self.positions.push(&values)?;
        self.interned_lists.insert(values, ptr);
        Ok(ptr)
    }

    fn encode(&mut self, cell: &str) -> Result<i32> {
        match self.column_type {
            ColumnType::String => self.intern_string(cell),
            ColumnType::StringList => self.intern_list(cell),
            ColumnType::Int => Ok(cell.trim().parse::<i32>()?),
        }
    }

    fn build(self, index: u32) -> DicField {
        DicField {
            index,
            name: self.name,
            column_type: self.column_type,
            strings: self.strings.build(),
            positions: self.positions.build(),
        }
    }
}

/// 辞書の列とエントリ表を構築するビルダー
///
/// # 例
///
/// ```
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use kaiseki::dictionary::{ColumnType, FieldsBuilder};
///
/// let mut builder = FieldsBuilder::new();
/// builder.add_column("surface", ColumnType::String)?;
/// builder.add_column("pos", ColumnType::String)?;
/// builder.add_column("features", ColumnType::StringList)?;
/// builder.push_row(&["京都", "名詞", "地名 代表表記"])?;
///
/// let dic = builder.build();
/// assert_eq!(dic.fields().len(), 3);
/// assert_eq!(dic.entries().len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct FieldsBuilder {
    columns: Vec<ColumnBuilder>,
    rows: Vec<i32>,
}

impl FieldsBuilder {
    /// 新しいビルダーを作成します。
    pub fn new() -> Self {
        Self::default()
    }

    /// 列を追加し、その列番号を返します。
    ///
    /// # エラー
    ///
    /// 行を追加した後に呼び出した場合や、同名の列が既にある場合にエラーを返します。
    pub fn add_column<S>(&mut self, name: S, column_type: ColumnType) -> Result<u32>
    where
        S: Into<String>,
    {
        if !self.rows.is_empty() {
            return Err(KaisekiError::invalid_state(
                "columns must be declared before rows",
                format!("{} rows already pushed", self.num_rows()),
            ));
        }
        let name = name.into();
        if self.columns.iter().any(|c| c.name == name) {
            return Err(KaisekiError::invalid_argument(
                "name",
                format!("duplicated column: {name}"),
            ));
        }
        let index = u32::try_from(self.columns.len())?;
        self.columns.push(ColumnBuilder::new(name, column_type));
        Ok(index)
    }

    /// 1行分のセルを追加し、そのエントリの識別子を返します。
    ///
    /// `StringList`列のセルは空白区切りのリストとして解釈されます。
    ///
    /// # エラー
    ///
    /// セル数が列数と一致しない場合や、`Int`列のセルが整数でない場合にエラーを返します。
    pub fn push_row<S>(&mut self, cells: &[S]) -> Result<EntryPtr>
    where
        S: AsRef<str>,
    {
        if cells.len() != self.columns.len() {
            return Err(KaisekiError::invalid_format(
                "row",
                format!(
                    "expected {} cells, but got {}",
                    self.columns.len(),
                    cells.len()
                ),
            ));
        }
        let idx = u32::try_from(self.num_rows())?;
        let mut row = Vec::with_capacity(cells.len());
        for (column, cell) in self.columns.iter_mut().zip(cells) {
            row.push(column.encode(cell.as_ref())?);
        }
        self.rows.extend_from_slice(&row);
        Ok(EntryPtr::Dic(idx))
    }

    /// CSV形式の行をすべて読み込みます。空行は無視されます。
    ///
    /// # エラー
    ///
    /// 読み込みに失敗した場合や、行が[`Self::push_row`]の条件を満たさない場合に
    /// エラーを返します。
    pub fn read_csv<R>(&mut self, mut rdr: R) -> Result<usize>
    where
        R: Read,
    {
        let mut buf = String::new();
        rdr.read_to_string(&mut buf)?;
        let mut num_rows = 0;
        for line in buf.lines().filter(|l| !l.trim().is_empty()) {
            let cells = utils::parse_csv_row(line)?;
            self.push_row(&cells)?;
            num_rows += 1;
        }
        log::debug!("[kaiseki] read {num_rows} dictionary rows from csv");
        Ok(num_rows)
    }

    /// 文字列を指定列のストレージに登録し、そのオフセットを返します。
    ///
    /// `MatchDic`などの素性の定数集合を文字列から解決するために使います。
    pub fn intern(&mut self, field: u32, s: &str) -> Result<i32> {
        let column = self
            .columns
            .get_mut(usize::from_u32(field))
            .ok_or_else(|| {
                KaisekiError::invalid_argument("field", format!("no such field: {field}"))
            })?;
        column.intern_string(s)
    }

    /// 追加済みの行数を返します。
    pub fn num_rows(&self) -> usize {
        self.rows.len().checked_div(self.columns.len()).unwrap_or(0)
    }

    /// 列の集合とエントリ表を構築します。
    pub fn build(self) -> DictionaryFields {
        let num_fields = self.columns.len();
        let fields: Vec<_> = self
            .columns
            .into_iter()
            .zip(0u32..)
            .map(|(c, i)| c.build(i))
            .collect();
        log::debug!(
            "[kaiseki] built {} dictionary fields with {} entries",
            num_fields,
            self.rows.len().checked_div(num_fields).unwrap_or(0)
        );
        DictionaryFields {
            fields: FieldsHolder::new(fields),
            entries: EntryTable::new(self.rows, num_fields),
        }
    }
}

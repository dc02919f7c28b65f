//! ユーティリティ関数と型変換トレイトを提供するモジュール
//!
//! - `FromU32`: u32からの型変換トレイト
//! - CSV行の解析と引用符処理
//! - テスト用のマクロ

use csv_core::ReadFieldResult;

use crate::errors::Result;

/// u32から他の型への変換を提供するトレイト
///
/// 標準ライブラリのFromトレイトとは異なり、プラットフォーム固有の仮定を
/// 置くことができます。
pub trait FromU32 {
    /// u32値から実装型を生成する
    fn from_u32(src: u32) -> Self;
}

#[cfg(any(target_pointer_width = "32", target_pointer_width = "64"))]
impl FromU32 for usize {
    #[inline(always)]
    fn from_u32(src: u32) -> Self {
        // Since the pointer width is guaranteed to be 32 or 64,
        // the following process always succeeds.
        unsafe { Self::try_from(src).unwrap_unchecked() }
    }
}

/// CSV形式の行を解析してフィールドのベクターに分割する
///
/// ダブルクォートで囲まれたフィールドや、フィールド内のカンマも正しく処理します。
///
/// # 例
///
/// ```
/// # use kaiseki::utils::parse_csv_row;
/// let fields = parse_csv_row("名詞,トスカーナ").unwrap();
/// assert_eq!(fields, vec!["名詞", "トスカーナ"]);
///
/// let fields_with_quote = parse_csv_row("名詞,\"1,2-ジクロロエタン\"").unwrap();
/// assert_eq!(fields_with_quote, vec!["名詞", "1,2-ジクロロエタン"]);
/// ```
///
/// # エラー
///
/// フィールドが有効なUTF-8でない場合にエラーを返します。
pub fn parse_csv_row(row: &str) -> Result<Vec<String>> {
    let mut cells = vec![];
    let mut rdr = csv_core::Reader::new();
    let mut bytes = row.as_bytes();
    let mut output = [0; 4096];
    let mut cell = vec![];
    loop {
        let (result, nin, nout) = rdr.read_field(bytes, &mut output);
        cell.extend_from_slice(&output[..nout]);
        bytes = &bytes[nin..];
        let end = match result {
            // the same field continues in the next read
            ReadFieldResult::OutputFull => continue,
            ReadFieldResult::InputEmpty => true,
            ReadFieldResult::Field { record_end } => record_end,
            ReadFieldResult::End => true,
        };
        cells.push(std::str::from_utf8(&cell)?.to_string());
        cell.clear();
        if end {
            break;
        }
    }
    Ok(cells)
}

#[cfg(test)]
/// HashMapリテラルを簡潔に記述するためのマクロ
///
/// ```ignore
/// let map = hashmap! {
///     "key1" => "value1",
///     "key2" => "value2",
/// };
/// ```
macro_rules! hashmap {
    ( $($k:expr => $v:expr,)* ) => {
        {
            #[allow(unused_mut)]
            let mut h = hashbrown::HashMap::new();
            $(
                h.insert($k, $v);
            )*
            h
        }
    };
    ( $($k:expr => $v:expr),* ) => {
        hashmap![$( $k => $v, )*]
    };
}

#[cfg(test)]
pub(crate) use hashmap;

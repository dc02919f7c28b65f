//! エントリ識別子
//!
//! 辞書エントリの出現、合成ノード、文頭・文末の番兵を一意に識別する型と、
//! エントリ行の各列が指す先を表す型を提供します。

use std::fmt;

/// 辞書エントリの出現、または番兵を識別する値
#[derive(Clone, Copy, Eq, PartialEq, Debug, Hash)]
pub enum EntryPtr {
    /// 文頭(BOS)の番兵
    Bos,
    /// 文末(EOS)の番兵
    Eos,
    /// 辞書エントリ(エントリ表の行番号)
    Dic(u32),
    /// 未知語処理などで合成されたノード(合成ノード領域の番号)
    Extra(u32),
}

impl EntryPtr {
    /// 番兵(BOS/EOS)であれば`true`を返します。
    #[inline(always)]
    pub const fn is_special(self) -> bool {
        matches!(self, Self::Bos | Self::Eos)
    }

    /// 合成ノードの番号を返します。
    #[inline(always)]
    pub const fn extra_index(self) -> Option<u32> {
        match self {
            Self::Extra(idx) => Some(idx),
            _ => None,
        }
    }
}

impl fmt::Display for EntryPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bos => write!(f, "BOS"),
            Self::Eos => write!(f, "EOS"),
            Self::Dic(idx) => write!(f, "dic#{idx}"),
            Self::Extra(idx) => write!(f, "extra#{idx}"),
        }
    }
}

/// エントリ行の1列の値が指す先
///
/// エントリ行そのものは`i32`の配列として保持され、負の値が合成ノード側の
/// 文字列を指すという表現になっています。素性計算の入り口でこの型に変換し、
/// 以降は符号による暗黙の分岐を行いません。
#[derive(Clone, Copy, Eq, PartialEq, Debug, Hash)]
pub enum FieldPtr {
    /// 辞書ストレージ内のオフセット
    Dic(u32),
    /// 合成ノード用文字列プール内の番号
    Extra(u32),
}

impl FieldPtr {
    /// エントリ行の生の値から変換します。
    #[inline(always)]
    pub const fn from_raw(raw: i32) -> Self {
        if raw >= 0 {
            Self::Dic(raw as u32)
        } else {
            // -1 => 0, -2 => 1, ...
            Self::Extra((-(raw + 1)) as u32)
        }
    }

    /// エントリ行に格納する生の値に変換します。
    ///
    /// # パニック
    ///
    /// 値が`i32`で表現できない場合、デバッグビルドでパニックします。
    #[inline(always)]
    pub const fn to_raw(self) -> i32 {
        match self {
            Self::Dic(ptr) => {
                debug_assert!(ptr <= i32::MAX as u32);
                ptr as i32
            }
            Self::Extra(idx) => {
                debug_assert!(idx <= i32::MAX as u32);
                -(idx as i32) - 1
            }
        }
    }
}

//! 辞書列のストレージ
//!
//! 文字列ストレージと位置リストストレージを提供します。
//! どちらもバイトオフセットで要素を指し、先頭(オフセット0)には
//! 空文字列・空リストが必ず置かれます。
//!
//! レイアウト:
//!
//! ```text
//! strings:   [len: varint][utf-8 bytes] [len: varint][utf-8 bytes] ...
//! positions: [count: varint][delta: zigzag varint] * count ...
//! ```

use crate::errors::{KaisekiError, Result};
use crate::utils::FromU32;

const MAX_VARINT_LEN: usize = 5;

#[inline]
fn write_varint(mut value: u32, buf: &mut Vec<u8>) {
    while value >= 0x80 {
        buf.push((value as u8) | 0x80);
        value >>= 7;
    }
    buf.push(value as u8);
}

/// バイト列の先頭からvarintを読み出し、値と消費バイト数を返します。
#[inline]
fn read_varint(data: &[u8]) -> Option<(u32, usize)> {
    let mut result = 0u32;
    for (i, &b) in data.iter().take(MAX_VARINT_LEN).enumerate() {
        result |= u32::from(b & 0x7f) << (7 * i);
        if b & 0x80 == 0 {
            return Some((result, i + 1));
        }
    }
    None
}

#[inline(always)]
const fn zigzag_encode(v: i32) -> u32 {
    ((v << 1) ^ (v >> 31)) as u32
}

#[inline(always)]
const fn zigzag_decode(v: u32) -> i32 {
    ((v >> 1) as i32) ^ -((v & 1) as i32)
}

#[inline(always)]
fn tail(data: &[u8], ptr: i32) -> &[u8] {
    usize::try_from(ptr)
        .ok()
        .and_then(|p| data.get(p..))
        .unwrap_or(&[])
}

/// 長さ付きUTF-8文字列を連結して保持するストレージ
#[derive(Debug, Clone)]
pub struct StringStorage {
    data: Vec<u8>,
}

impl Default for StringStorage {
    fn default() -> Self {
        // Offset 0 always holds the empty string.
        Self { data: vec![0] }
    }
}

impl StringStorage {
    /// 指定オフセットの文字列を取得します。
    ///
    /// オフセットが文字列の先頭を指していない場合は`None`を返します。
    pub fn get(&self, ptr: i32) -> Option<&str> {
        let bytes = tail(&self.data, ptr);
        let (len, consumed) = read_varint(bytes)?;
        let body = bytes.get(consumed..consumed + usize::from_u32(len))?;
        std::str::from_utf8(body).ok()
    }

    /// 指定オフセットの文字列の文字数を返します。
    ///
    /// UTF-8の検証は構築時に済んでいるため、継続バイト以外を数えるだけです。
    #[inline]
    pub fn length_of(&self, ptr: i32) -> i32 {
        let bytes = tail(&self.data, ptr);
        let Some((len, consumed)) = read_varint(bytes) else {
            return 0;
        };
        let end = (consumed + usize::from_u32(len)).min(bytes.len());
        let chars = bytes[consumed..end]
            .iter()
            .filter(|&&b| (b & 0xc0) != 0x80)
            .count();
        chars as i32
    }

    /// 文字列のオフセットを線形探索で求めます。
    ///
    /// 素性仕様のコンパイル時に定数集合を解決するためのもので、
    /// 解析中に呼び出すものではありません。
    pub fn position_of(&self, needle: &str) -> Option<i32> {
        let mut pos = 0;
        while pos < self.data.len() {
            let (len, consumed) = read_varint(&self.data[pos..])?;
            let start = pos + consumed;
            let end = start + usize::from_u32(len);
            if self.data.get(start..end)? == needle.as_bytes() {
                return i32::try_from(pos).ok();
            }
            pos = end;
        }
        None
    }

    /// 保持しているバイト数を返します。
    #[inline(always)]
    pub fn num_bytes(&self) -> usize {
        self.data.len()
    }
}

/// [`StringStorage`]を構築するビルダー
#[derive(Default)]
pub struct StringStorageBuilder {
    storage: StringStorage,
}

impl StringStorageBuilder {
    /// 新しいビルダーを作成します。
    pub fn new() -> Self {
        Self::default()
    }

    /// 文字列を追加し、そのオフセットを返します。
    ///
    /// 空文字列は常にオフセット0を返します。
    pub fn push(&mut self, s: &str) -> Result<i32> {
        if s.is_empty() {
            return Ok(0);
        }
        let offset = i32::try_from(self.storage.data.len())?;
        write_varint(s.len().try_into()?, &mut self.storage.data);
        self.storage.data.extend_from_slice(s.as_bytes());
        Ok(offset)
    }

    /// ストレージを構築します。
    pub fn build(self) -> StringStorage {
        self.storage
    }
}

/// 差分符号化された整数リストを連結して保持するストレージ
#[derive(Debug, Clone)]
pub struct IntListStorage {
    data: Vec<u8>,
}

impl Default for IntListStorage {
    fn default() -> Self {
        // Offset 0 always holds the empty list.
        Self { data: vec![0] }
    }
}

impl IntListStorage {
    /// 指定オフセットのリストの要素数を返します。
    #[inline]
    pub fn length_of(&self, ptr: i32) -> i32 {
        read_varint(tail(&self.data, ptr))
            .map(|(count, _)| count as i32)
            .unwrap_or(0)
    }

    /// 指定オフセットのリストを走査するイテレータを返します。
    ///
    /// 返されるイテレータは差分を累積しながら値を復元します。
    /// 一度消費したら巻き戻せないため、再走査には新しいイテレータを要求してください。
    #[inline]
    pub fn list_at(&self, ptr: i32) -> IntListTraversal<'_> {
        let bytes = tail(&self.data, ptr);
        match read_varint(bytes) {
            Some((count, consumed)) => IntListTraversal {
                data: &bytes[consumed..],
                remaining: count,
                previous: 0,
            },
            None => IntListTraversal::empty(),
        }
    }

    /// 保持しているバイト数を返します。
    #[inline(always)]
    pub fn num_bytes(&self) -> usize {
        self.data.len()
    }
}

/// [`IntListStorage`]上のリストを先頭から順に復元するイテレータ
#[derive(Debug, Clone)]
pub struct IntListTraversal<'a> {
    data: &'a [u8],
    remaining: u32,
    previous: i32,
}

impl IntListTraversal<'_> {
    /// 要素を持たない走査を返します。
    #[inline(always)]
    pub const fn empty() -> Self {
        Self {
            data: &[],
            remaining: 0,
            previous: 0,
        }
    }

    /// 残りの要素数を返します。
    #[inline(always)]
    pub const fn remaining(&self) -> u32 {
        self.remaining
    }
}

impl Iterator for IntListTraversal<'_> {
    type Item = i32;

    #[inline]
    fn next(&mut self) -> Option<i32> {
        if self.remaining == 0 {
            return None;
        }
        let Some((raw, consumed)) = read_varint(self.data) else {
            // Truncated storage; end the traversal instead of reading garbage.
            self.remaining = 0;
            return None;
        };
        self.data = &self.data[consumed..];
        self.remaining -= 1;
        self.previous = self.previous.wrapping_add(zigzag_decode(raw));
        Some(self.previous)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(usize::from_u32(self.remaining)))
    }
}

/// [`IntListStorage`]を構築するビルダー
#[derive(Default)]
pub struct IntListStorageBuilder {
    storage: IntListStorage,
}

impl IntListStorageBuilder {
    /// 新しいビルダーを作成します。
    pub fn new() -> Self {
        Self::default()
    }

    /// 整数リストを追加し、そのオフセットを返します。
    ///
    /// 空リストは常にオフセット0を返します。
    pub fn push(&mut self, values: &[i32]) -> Result<i32> {
        if values.is_empty() {
            return Ok(0);
        }
        let offset = i32::try_from(self.storage.data.len())?;
        let count = u32::try_from(values.len())
            .map_err(|_| KaisekiError::invalid_argument("values", "list is too long"))?;
        write_varint(count, &mut self.storage.data);
        let mut previous = 0i32;
        for &v in values {
            write_varint(zigzag_encode(v.wrapping_sub(previous)), &mut self.storage.data);
            previous = v;
        }
        Ok(offset)
    }

    /// ストレージを構築します。
    pub fn build(self) -> IntListStorage {
        self.storage
    }
}

//! 素性仕様
//!
//! 基本素性(primitive feature)の定義と、その順序付きの集合を提供します。
//! 素性仕様はモデルの一部としてrkyvで保存・復元できます。

use std::io::{Read, Write};

use hashbrown::HashSet;
use rkyv::rancor::Error;
use rkyv::util::AlignedVec;
use rkyv::{Archive, Deserialize, Serialize};

use crate::errors::{KaisekiError, Result};
use crate::utils::FromU32;

/// 素性仕様ファイルを識別するマジックバイト。
///
/// バージョン番号は保存形式のバージョンで、クレートのバージョンとは独立です。
pub const SPEC_MAGIC: &[u8] = b"KaisekiFeatureSpec 0.1\n";

const RKYV_ALIGNMENT: usize = 16;

/// 基本素性の種類。
#[derive(Clone, Copy, Eq, PartialEq, Debug, Hash, Archive, Serialize, Deserialize)]
#[rkyv(compare(PartialEq), derive(Debug, Eq, PartialEq, Clone, Copy))]
#[repr(u8)]
pub enum PrimitiveFeatureKind {
    /// 列の値をそのまま出力します。
    Copy,
    /// 合成ノードが提供する値を出力します。
    Provided,
    /// 列の要素数(文字数またはリスト長)を出力します。
    Length,
    /// 列の値が定数集合に含まれれば1を出力します。
    MatchDic,
    /// リスト列のいずれかの要素が定数集合に含まれれば1を出力します。
    MatchAnyDic,
}

/// 基本素性の定義
#[derive(Clone, Debug, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub struct PrimitiveFeature {
    /// 素性の名前
    pub name: String,
    /// 出力先のスロット番号
    pub index: u32,
    /// 素性の種類
    pub kind: PrimitiveFeatureKind,
    /// 参照する列番号、または提供値の番号
    pub references: Vec<u32>,
    /// `MatchDic`/`MatchAnyDic`の定数集合
    pub match_data: Vec<i32>,
}

impl PrimitiveFeature {
    fn with_reference<S>(name: S, index: u32, kind: PrimitiveFeatureKind, reference: u32) -> Self
    where
        S: Into<String>,
    {
        Self {
            name: name.into(),
            index,
            kind,
            references: vec![reference],
            match_data: vec![],
        }
    }

    /// `Copy`素性を作成します。
    pub fn copy<S: Into<String>>(name: S, index: u32, field: u32) -> Self {
        Self::with_reference(name, index, PrimitiveFeatureKind::Copy, field)
    }

    /// `Provided`素性を作成します。
    pub fn provided<S: Into<String>>(name: S, index: u32, provided: u32) -> Self {
        Self::with_reference(name, index, PrimitiveFeatureKind::Provided, provided)
    }

    /// `Length`素性を作成します。
    pub fn length<S: Into<String>>(name: S, index: u32, field: u32) -> Self {
        Self::with_reference(name, index, PrimitiveFeatureKind::Length, field)
    }

    /// `MatchDic`素性を作成します。
    pub fn match_dic<S: Into<String>>(name: S, index: u32, field: u32, match_data: Vec<i32>) -> Self {
        Self {
            match_data,
            ..Self::with_reference(name, index, PrimitiveFeatureKind::MatchDic, field)
        }
    }

    /// `MatchAnyDic`素性を作成します。
    pub fn match_any_dic<S: Into<String>>(
        name: S,
        index: u32,
        field: u32,
        match_data: Vec<i32>,
    ) -> Self {
        Self {
            match_data,
            ..Self::with_reference(name, index, PrimitiveFeatureKind::MatchAnyDic, field)
        }
    }
}

/// 検証済みの基本素性の順序付き集合
///
/// 構築後は変更できません。各素性の出力スロットは互いに重ならず、
/// すべて`0..len()`に収まります。
#[derive(Clone, Debug, Default, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub struct FeatureSpec {
    features: Vec<PrimitiveFeature>,
}

impl FeatureSpec {
    /// 素性の列を検証して新しいインスタンスを作成します。
    ///
    /// # エラー
    ///
    /// 出力スロットが範囲外または重複している場合や、名前が重複している場合に
    /// [`KaisekiError::InvalidArgument`]を返します。
    pub fn new(features: Vec<PrimitiveFeature>) -> Result<Self> {
        Self::validate(&features)?;
        Ok(Self { features })
    }

    fn validate(features: &[PrimitiveFeature]) -> Result<()> {
        let mut slots = vec![false; features.len()];
        let mut names = HashSet::with_capacity(features.len());
        for f in features {
            let slot = slots.get_mut(usize::from_u32(f.index)).ok_or_else(|| {
                KaisekiError::invalid_argument(
                    "features",
                    format!(
                        "feature {} writes to slot {}, but only {} slots exist",
                        f.name,
                        f.index,
                        features.len()
                    ),
                )
            })?;
            if std::mem::replace(slot, true) {
                return Err(KaisekiError::invalid_argument(
                    "features",
                    format!("slot {} is written by more than one feature", f.index),
                ));
            }
            if !names.insert(f.name.as_str()) {
                return Err(KaisekiError::invalid_argument(
                    "features",
                    format!("duplicated feature name: {}", f.name),
                ));
            }
        }
        Ok(())
    }

    /// 素性の列を返します。
    #[inline(always)]
    pub fn features(&self) -> &[PrimitiveFeature] {
        &self.features
    }

    /// 素性の数(特徴ベクトルの幅)を返します。
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// 素性を持たない場合に`true`を返します。
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// 素性仕様を書き出します。
    ///
    /// # エラー
    ///
    /// 書き込みやシリアライズに失敗した場合にエラーを返します。
    pub fn write<W>(&self, mut wtr: W) -> Result<()>
    where
        W: Write,
    {
        wtr.write_all(SPEC_MAGIC)?;
        let bytes = rkyv::to_bytes::<Error>(self)?;
        wtr.write_all(&bytes)?;
        Ok(())
    }

    /// [`Self::write`]で書き出された素性仕様を読み込みます。
    ///
    /// # エラー
    ///
    /// マジックバイトが一致しない場合は[`KaisekiError::InvalidArgument`]、
    /// データが壊れている場合は[`KaisekiError::InvalidState`]を返します。
    /// 読み込んだ素性は[`Self::new`]と同じ検証を受けます。
    pub fn read<R>(mut rdr: R) -> Result<Self>
    where
        R: Read,
    {
        let mut magic = [0; SPEC_MAGIC.len()];
        rdr.read_exact(&mut magic)?;
        if magic != SPEC_MAGIC {
            return Err(KaisekiError::invalid_argument(
                "rdr",
                "The magic number of the input feature spec mismatches.",
            ));
        }

        let mut buffer = Vec::new();
        rdr.read_to_end(&mut buffer)?;
        let mut aligned_bytes = AlignedVec::<RKYV_ALIGNMENT>::with_capacity(buffer.len());
        aligned_bytes.extend_from_slice(&buffer);

        let spec = rkyv::from_bytes::<Self, Error>(&aligned_bytes).map_err(|e| {
            KaisekiError::invalid_state(
                "rkyv validation failed. The feature spec may be corrupted.",
                e.to_string(),
            )
        })?;
        log::debug!("[kaiseki] loaded feature spec with {} features", spec.len());
        Self::new(spec.features)
    }
}

//! 基本素性の集合
//!
//! 素性の定義をまとめて初期化し、エントリ1件分の特徴ベクトルを一度に書き込みます。

use crate::dictionary::EntryPtr;
use crate::errors::{KaisekiError, Result};
use crate::features::context::PrimitiveFeatureContext;
use crate::features::primitive::PrimitiveFeatureImpl;
use crate::features::spec::{FeatureSpec, PrimitiveFeature};
use crate::utils::FromU32;

/// 初期化済みの基本素性の集合
///
/// 初期化後は変更されないため、複数のスレッドから同時に[`Self::apply`]を
/// 呼び出せます。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrimitiveFeaturesHolder {
    features: Vec<PrimitiveFeatureImpl>,
}

impl PrimitiveFeaturesHolder {
    /// 素性の定義から実装を初期化します。
    ///
    /// 定義は順に初期化され、最初に失敗した時点で中断します。
    ///
    /// # 引数
    ///
    ///  - `ctx`: 辞書と合成ノードへのアクセス
    ///  - `specs`: 素性の定義。出力スロットは`0..specs.len()`に収まる必要があります。
    ///
    /// # エラー
    ///
    /// 出力スロットが範囲外の場合や、いずれかの素性の初期化に失敗した場合に
    /// エラーを返します。
    pub fn initialize(ctx: &PrimitiveFeatureContext<'_>, specs: &[PrimitiveFeature]) -> Result<Self> {
        let mut features = Vec::with_capacity(specs.len());
        for f in specs {
            if usize::from_u32(f.index) >= specs.len() {
                log::warn!("[kaiseki] feature {} writes outside the feature vector", f.name);
                return Err(KaisekiError::invalid_argument(
                    "specs",
                    format!(
                        "feature {} writes to slot {}, but only {} slots exist",
                        f.name,
                        f.index,
                        specs.len()
                    ),
                ));
            }
            match PrimitiveFeatureImpl::initialize(ctx, f) {
                Ok(imp) => features.push(imp),
                Err(e) => {
                    log::warn!("[kaiseki] failed to initialize feature {}: {e}", f.name);
                    return Err(e);
                }
            }
        }
        log::debug!("[kaiseki] initialized {} primitive features", features.len());
        Ok(Self { features })
    }

    /// 検証済みの素性仕様から初期化します。
    pub fn from_spec(ctx: &PrimitiveFeatureContext<'_>, spec: &FeatureSpec) -> Result<Self> {
        Self::initialize(ctx, spec.features())
    }

    /// すべての素性を定義順に適用し、`features`の各スロットに書き込みます。
    ///
    /// `features`の長さは[`Self::num_features`]以上である必要があります。
    #[inline]
    pub fn apply(
        &self,
        ctx: &PrimitiveFeatureContext<'_>,
        entry_ptr: EntryPtr,
        entry: &[i32],
        features: &mut [u64],
    ) {
        debug_assert!(features.len() >= self.features.len());
        for f in &self.features {
            f.apply(ctx, entry_ptr, entry, features);
        }
    }

    /// 素性の数を返します。
    #[inline(always)]
    pub fn num_features(&self) -> usize {
        self.features.len()
    }

    /// 初期化済みの実装を返します。
    pub fn features(&self) -> &[PrimitiveFeatureImpl] {
        &self.features
    }
}

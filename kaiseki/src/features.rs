//! 基本素性の計算
//!
//! 辞書エントリ1件につき、[`FeatureSpec`]が定める固定幅の整数ベクトルを計算します。
//! 初期化時に仕様を検証して[`PrimitiveFeaturesHolder`]を作り、解析中は
//! [`PrimitiveFeaturesHolder::apply`]だけを呼び出します。
pub mod context;
pub mod holder;
pub mod primitive;
pub mod spec;

pub use crate::features::context::{DicListTraversal, LengthFieldSource, PrimitiveFeatureContext};
pub use crate::features::holder::PrimitiveFeaturesHolder;
pub use crate::features::primitive::{
    CopyPrimFeature, LengthPrimFeature, MatchAnyDicPrimFeature, MatchDicPrimFeature,
    PrimitiveFeatureImpl, ProvidedPrimFeature,
};
pub use crate::features::spec::{FeatureSpec, PrimitiveFeature, PrimitiveFeatureKind, SPEC_MAGIC};

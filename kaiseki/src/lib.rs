//! # Kaiseki
//!
//! Kaisekiは、ラティスに基づく形態素解析器の復号・素性計算コアです。
//!
//! ## 概要
//!
//! 上流の解析器が構築したラティス(境界ごとにスコア付きのビームを持つ格子)から
//! 最良経路を復元し、経路上の辞書エントリごとに、スコアモデルが使う
//! 固定幅の整数素性ベクトルを計算します。
//!
//! ## 主な機能
//!
//! - **同点を考慮した最良経路の復元**: 最上位とスコアが等しい候補をすべて
//!   同点グループとして記録します
//! - **基本素性の計算**: 列の値のコピー、文字数・要素数、定数集合との照合など
//! - **素性仕様の保存**: rkyvを使用した素性仕様の書き出しと読み込み
//! - **辞書列の構築**: 行またはCSVからの列指向ストレージの構築
//!
//! ## 使用例
//!
//! ```
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use kaiseki::analysis::{
//!     AnalysisPath, AnalysisResult, BeamCandidate, BeamRef, BoundaryStarts, ConnectionPtr,
//!     ExtraNodesContext, Lattice,
//! };
//! use kaiseki::dictionary::{ColumnType, EntryPtr, FieldsBuilder};
//! use kaiseki::features::{FeatureSpec, PrimitiveFeature, PrimitiveFeatureContext, PrimitiveFeaturesHolder};
//!
//! let mut builder = FieldsBuilder::new();
//! builder.add_column("surface", ColumnType::String)?;
//! builder.add_column("cost", ColumnType::Int)?;
//! let kyoto = builder.push_row(&["京都", "5"])?;
//! let dic = builder.build();
//!
//! // BOS(0, 1) -> 京都(2) -> EOS(3)
//! let mut lattice = Lattice::new();
//! let mut starts = BoundaryStarts::new();
//! let ptr = ConnectionPtr { boundary: 2, right: 0, previous: Some(BeamRef::new(1, 0, 0)) };
//! starts.push(kyoto, vec![BeamCandidate::new(1.0, ptr)]);
//! lattice.add_boundary(starts);
//! let mut starts = BoundaryStarts::new();
//! let ptr = ConnectionPtr { boundary: 3, right: 0, previous: Some(BeamRef::new(2, 0, 0)) };
//! starts.push(EntryPtr::Eos, vec![BeamCandidate::new(1.0, ptr)]);
//! lattice.add_boundary(starts);
//!
//! let mut result = AnalysisResult::new();
//! result.reset(&lattice);
//! let mut path = AnalysisPath::new();
//! result.fill_top1(&mut path)?;
//! assert_eq!(path.elems(), &[kyoto]);
//! assert_eq!(path.offsets(), &[0, 1]);
//!
//! let spec = FeatureSpec::new(vec![
//!     PrimitiveFeature::length("surface_len", 0, 0),
//!     PrimitiveFeature::copy("cost", 1, 1),
//! ])?;
//! let extra = ExtraNodesContext::new();
//! let ctx = PrimitiveFeatureContext::new(&extra, dic.fields());
//! let holder = PrimitiveFeaturesHolder::from_spec(&ctx, &spec)?;
//!
//! let mut features = vec![0; holder.num_features()];
//! let row = dic.entries().entry(kyoto).ok_or("missing entry")?;
//! holder.apply(&ctx, kyoto, row, &mut features);
//! assert_eq!(features, [2, 5]);
//! # Ok(())
//! # }
//! ```

#[cfg(not(any(target_pointer_width = "32", target_pointer_width = "64")))]
compile_error!("`target_pointer_width` must be 32 or 64");

/// ラティスと最良経路の復元
pub mod analysis;

/// 辞書の列とエントリ表
pub mod dictionary;

/// エラー型の定義
pub mod errors;

/// 基本素性の仕様と実装
pub mod features;

/// 内部ユーティリティ関数
pub mod utils;


// Re-exports
pub use analysis::{AnalysisPath, AnalysisResult, Lattice};
pub use features::{FeatureSpec, PrimitiveFeaturesHolder};

/// このライブラリのバージョン番号
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

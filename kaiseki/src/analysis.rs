//! ラティスの読み出しと最良経路の復元。
//!
//! - [`Lattice`]: 上流の解析器が構築する境界とビームの列
//! - [`ExtraNodesContext`]: 未知語などの合成ノード
//! - [`AnalysisPath`]: 同点グループ付きの最良経路
pub mod extra_nodes;
pub mod lattice;
pub mod path;

pub use crate::analysis::extra_nodes::{ExtraNode, ExtraNodeKind, ExtraNodesContext, NUM_PROVIDED_VALUES};
pub use crate::analysis::lattice::{
    BeamCandidate, BeamRef, Boundary, BoundaryStarts, ConnectionPtr, Lattice,
};
pub use crate::analysis::path::{AnalysisPath, AnalysisResult};

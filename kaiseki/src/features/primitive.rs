//! 基本素性の実装
//!
//! 5種類の基本素性はそれぞれ、初期化時に仕様を検証して添字を解決し、
//! 解析中は1つの出力スロットに値を書き込むだけの純粋な関数として働きます。
//! `apply`はアロケーションを行わず、失敗もしません。

use crate::dictionary::{ColumnType, EntryPtr, FieldPtr};
use crate::errors::{KaisekiError, Result};
use crate::features::context::{LengthFieldSource, PrimitiveFeatureContext};
use crate::features::spec::{PrimitiveFeature, PrimitiveFeatureKind};
use crate::utils::FromU32;

fn single_reference(f: &PrimitiveFeature) -> Result<u32> {
    match f.references.as_slice() {
        [r] => Ok(*r),
        refs => Err(KaisekiError::invalid_argument(
            "references",
            format!(
                "{:?} feature {} must have exactly one reference, but got {}",
                f.kind,
                f.name,
                refs.len()
            ),
        )),
    }
}

fn match_set(f: &PrimitiveFeature) -> Result<Box<[i32]>> {
    if f.match_data.is_empty() {
        return Err(KaisekiError::invalid_argument(
            "match_data",
            format!("{:?} feature {} has no values to match", f.kind, f.name),
        ));
    }
    let mut data = f.match_data.clone();
    data.sort_unstable();
    data.dedup();
    Ok(data.into_boxed_slice())
}

#[inline(always)]
fn slot(features: &mut [u64], idx: u32) -> &mut u64 {
    &mut features[usize::from_u32(idx)]
}

#[inline(always)]
fn column(entry: &[i32], idx: u32) -> i32 {
    entry[usize::from_u32(idx)]
}

/// 列の値をそのまま出力する素性
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyPrimFeature {
    field: u32,
    feature: u32,
}

impl CopyPrimFeature {
    /// 仕様から初期化します。
    pub fn initialize(ctx: &PrimitiveFeatureContext<'_>, f: &PrimitiveFeature) -> Result<Self> {
        let field = single_reference(f)?;
        ctx.field(field)?;
        Ok(Self {
            field,
            feature: f.index,
        })
    }

    #[inline(always)]
    pub fn apply(
        &self,
        _ctx: &PrimitiveFeatureContext<'_>,
        _entry_ptr: EntryPtr,
        entry: &[i32],
        features: &mut [u64],
    ) {
        // sign-extended
        *slot(features, self.feature) = column(entry, self.field) as u64;
    }
}

/// 合成ノードが提供する値を出力する素性
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvidedPrimFeature {
    provided: u32,
    feature: u32,
}

impl ProvidedPrimFeature {
    /// 仕様から初期化します。
    pub fn initialize(ctx: &PrimitiveFeatureContext<'_>, f: &PrimitiveFeature) -> Result<Self> {
        let provided = single_reference(f)?;
        ctx.check_provided_feature(provided)?;
        Ok(Self {
            provided,
            feature: f.index,
        })
    }

    #[inline(always)]
    pub fn apply(
        &self,
        ctx: &PrimitiveFeatureContext<'_>,
        entry_ptr: EntryPtr,
        _entry: &[i32],
        features: &mut [u64],
    ) {
        *slot(features, self.feature) = ctx.provided_feature(entry_ptr, self.provided) as u64;
    }
}

/// 列の要素数を出力する素性
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthPrimFeature {
    field: u32,
    feature: u32,
    source: LengthFieldSource,
}

impl LengthPrimFeature {
    /// 仕様から初期化します。
    ///
    /// 列が`String`でも`StringList`でもなければ失敗します。
    pub fn initialize(ctx: &PrimitiveFeatureContext<'_>, f: &PrimitiveFeature) -> Result<Self> {
        let field = single_reference(f)?;
        let source = ctx.set_length_field(field)?;
        Ok(Self {
            field,
            feature: f.index,
            source,
        })
    }

    #[inline(always)]
    pub fn apply(
        &self,
        ctx: &PrimitiveFeatureContext<'_>,
        _entry_ptr: EntryPtr,
        entry: &[i32],
        features: &mut [u64],
    ) {
        let ptr = FieldPtr::from_raw(column(entry, self.field));
        let length = ctx.length_of(self.field, ptr, self.source);
        debug_assert!(length >= 0);
        *slot(features, self.feature) = length as u64;
    }
}

/// 列の値が定数集合に含まれるかを出力する素性
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchDicPrimFeature {
    field: u32,
    feature: u32,
    match_data: Box<[i32]>,
}

impl MatchDicPrimFeature {
    /// 仕様から初期化します。
    pub fn initialize(ctx: &PrimitiveFeatureContext<'_>, f: &PrimitiveFeature) -> Result<Self> {
        let field = single_reference(f)?;
        ctx.check_field_type(field, &[ColumnType::String, ColumnType::Int])?;
        Ok(Self {
            field,
            feature: f.index,
            match_data: match_set(f)?,
        })
    }

    /// 値が定数集合に含まれるかを返します。
    #[inline(always)]
    pub fn contains(&self, value: i32) -> bool {
        self.match_data.binary_search(&value).is_ok()
    }

    #[inline(always)]
    pub fn apply(
        &self,
        _ctx: &PrimitiveFeatureContext<'_>,
        _entry_ptr: EntryPtr,
        entry: &[i32],
        features: &mut [u64],
    ) {
        *slot(features, self.feature) = u64::from(self.contains(column(entry, self.field)));
    }
}

/// リスト列のいずれかの要素が定数集合に含まれるかを出力する素性
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchAnyDicPrimFeature {
    field: u32,
    feature: u32,
    match_data: Box<[i32]>,
}

impl MatchAnyDicPrimFeature {
    /// 仕様から初期化します。
    pub fn initialize(ctx: &PrimitiveFeatureContext<'_>, f: &PrimitiveFeature) -> Result<Self> {
        let field = single_reference(f)?;
        ctx.check_field_type(field, &[ColumnType::StringList])?;
        Ok(Self {
            field,
            feature: f.index,
            match_data: match_set(f)?,
        })
    }

    /// いずれかの値が定数集合に含まれるかを返します。
    ///
    /// 最初に一致した値で走査を打ち切ります。
    #[inline]
    pub fn matches_any<I>(&self, values: I) -> bool
    where
        I: IntoIterator<Item = i32>,
    {
        values
            .into_iter()
            .any(|v| self.match_data.binary_search(&v).is_ok())
    }

    #[inline]
    pub fn apply(
        &self,
        ctx: &PrimitiveFeatureContext<'_>,
        _entry_ptr: EntryPtr,
        entry: &[i32],
        features: &mut [u64],
    ) {
        let ptr = FieldPtr::from_raw(column(entry, self.field));
        let trav = ctx.traversal(self.field, ptr);
        *slot(features, self.feature) = u64::from(self.matches_any(trav));
    }
}

/// 基本素性の閉じた集合
///
/// 種類は仕様のコンパイル時に決まるため、動的ディスパッチではなく
/// `match`で振り分けます。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimitiveFeatureImpl {
    Copy(CopyPrimFeature),
    Provided(ProvidedPrimFeature),
    Length(LengthPrimFeature),
    MatchDic(MatchDicPrimFeature),
    MatchAnyDic(MatchAnyDicPrimFeature),
}

impl PrimitiveFeatureImpl {
    /// 仕様の種類に応じた実装を初期化します。
    ///
    /// # エラー
    ///
    /// 参照の数が誤っている場合や存在しない列を参照している場合は
    /// [`KaisekiError::InvalidArgument`]、列の型が素性に合わない場合は
    /// [`KaisekiError::InvalidState`]を返します。
    pub fn initialize(ctx: &PrimitiveFeatureContext<'_>, f: &PrimitiveFeature) -> Result<Self> {
        Ok(match f.kind {
            PrimitiveFeatureKind::Copy => Self::Copy(CopyPrimFeature::initialize(ctx, f)?),
            PrimitiveFeatureKind::Provided => {
                Self::Provided(ProvidedPrimFeature::initialize(ctx, f)?)
            }
            PrimitiveFeatureKind::Length => Self::Length(LengthPrimFeature::initialize(ctx, f)?),
            PrimitiveFeatureKind::MatchDic => {
                Self::MatchDic(MatchDicPrimFeature::initialize(ctx, f)?)
            }
            PrimitiveFeatureKind::MatchAnyDic => {
                Self::MatchAnyDic(MatchAnyDicPrimFeature::initialize(ctx, f)?)
            }
        })
    }

    /// 出力スロットに値を書き込みます。
    #[inline(always)]
    pub fn apply(
        &self,
        ctx: &PrimitiveFeatureContext<'_>,
        entry_ptr: EntryPtr,
        entry: &[i32],
        features: &mut [u64],
    ) {
        match self {
            Self::Copy(f) => f.apply(ctx, entry_ptr, entry, features),
            Self::Provided(f) => f.apply(ctx, entry_ptr, entry, features),
            Self::Length(f) => f.apply(ctx, entry_ptr, entry, features),
            Self::MatchDic(f) => f.apply(ctx, entry_ptr, entry, features),
            Self::MatchAnyDic(f) => f.apply(ctx, entry_ptr, entry, features),
        }
    }

    /// 出力スロットの番号を返します。
    pub const fn feature_index(&self) -> u32 {
        match self {
            Self::Copy(f) => f.feature,
            Self::Provided(f) => f.feature,
            Self::Length(f) => f.feature,
            Self::MatchDic(f) => f.feature,
            Self::MatchAnyDic(f) => f.feature,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::analysis::ExtraNodesContext;
    use crate::dictionary::{DictionaryFields, FieldsBuilder};

    fn int_dic() -> DictionaryFields {
        let mut builder = FieldsBuilder::new();
        for name in ["a", "b", "c"] {
            builder.add_column(name, ColumnType::Int).unwrap();
        }
        builder.push_row(&["7", "2", "9"]).unwrap();
        builder.build()
    }

    fn list_dic() -> DictionaryFields {
        let mut builder = FieldsBuilder::new();
        builder.add_column("surface", ColumnType::String).unwrap();
        builder.add_column("tags", ColumnType::StringList).unwrap();
        builder.push_row(&["abc", ""]).unwrap();
        builder.push_row(&["", "x y"]).unwrap();
        builder.build()
    }

    #[test]
    fn test_copy() {
        let dic = int_dic();
        let extra = ExtraNodesContext::new();
        let ctx = PrimitiveFeatureContext::new(&extra, dic.fields());
        let f = PrimitiveFeatureImpl::initialize(&ctx, &PrimitiveFeature::copy("b", 0, 1)).unwrap();

        let mut out = [0u64; 1];
        f.apply(&ctx, EntryPtr::Dic(0), &[7, 2, 9], &mut out);
        assert_eq!([2], out);

        f.apply(&ctx, EntryPtr::Dic(0), &[7, -1, 9], &mut out);
        assert_eq!([u64::MAX], out);
    }

    #[test]
    fn test_copy_unknown_field() {
        let dic = int_dic();
        let extra = ExtraNodesContext::new();
        let ctx = PrimitiveFeatureContext::new(&extra, dic.fields());
        assert!(matches!(
            PrimitiveFeatureImpl::initialize(&ctx, &PrimitiveFeature::copy("z", 0, 3)),
            Err(KaisekiError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_wrong_reference_count() {
        let dic = int_dic();
        let extra = ExtraNodesContext::new();
        let ctx = PrimitiveFeatureContext::new(&extra, dic.fields());
        let mut f = PrimitiveFeature::copy("b", 0, 1);
        f.references.push(2);
        assert!(PrimitiveFeatureImpl::initialize(&ctx, &f).is_err());
        f.references.clear();
        assert!(PrimitiveFeatureImpl::initialize(&ctx, &f).is_err());
    }

    #[test]
    fn test_match_dic() {
        let dic = int_dic();
        let extra = ExtraNodesContext::new();
        let ctx = PrimitiveFeatureContext::new(&extra, dic.fields());
        let f = PrimitiveFeatureImpl::initialize(
            &ctx,
            &PrimitiveFeature::match_dic("m", 0, 0, vec![4, 3]),
        )
        .unwrap();

        let mut out = [9u64; 1];
        f.apply(&ctx, EntryPtr::Dic(0), &[4, 0, 0], &mut out);
        assert_eq!([1], out);
        f.apply(&ctx, EntryPtr::Dic(0), &[9, 0, 0], &mut out);
        assert_eq!([0], out);
    }

    #[test]
    fn test_match_dic_requires_match_data() {
        let dic = int_dic();
        let extra = ExtraNodesContext::new();
        let ctx = PrimitiveFeatureContext::new(&extra, dic.fields());
        assert!(
            PrimitiveFeatureImpl::initialize(&ctx, &PrimitiveFeature::match_dic("m", 0, 0, vec![]))
                .is_err()
        );
    }

    #[test]
    fn test_match_any_dic_stops_at_first_match() {
        let dic = list_dic();
        let extra = ExtraNodesContext::new();
        let ctx = PrimitiveFeatureContext::new(&extra, dic.fields());
        let f = MatchAnyDicPrimFeature::initialize(
            &ctx,
            &PrimitiveFeature::match_any_dic("m", 0, 1, vec![3]),
        )
        .unwrap();

        let consumed = Cell::new(0);
        let values = [10, 3, 7].into_iter().inspect(|_| consumed.set(consumed.get() + 1));
        assert!(f.matches_any(values));
        assert_eq!(2, consumed.get());

        let consumed = Cell::new(0);
        let values = [10, 7].into_iter().inspect(|_| consumed.set(consumed.get() + 1));
        assert!(!f.matches_any(values));
        assert_eq!(2, consumed.get());
    }

    #[test]
    fn test_match_any_dic_reads_stored_list_lazily() {
        // offsets: a=1, bcd=3, ef=7, g=10
        let mut builder = FieldsBuilder::new();
        builder.add_column("tags", ColumnType::StringList).unwrap();
        builder.push_row(&["a bcd ef g"]).unwrap();
        let e = builder.push_row(&["g bcd ef"]).unwrap();
        let dic = builder.build();
        let extra = ExtraNodesContext::new();
        let ctx = PrimitiveFeatureContext::new(&extra, dic.fields());
        let f = MatchAnyDicPrimFeature::initialize(
            &ctx,
            &PrimitiveFeature::match_any_dic("m", 0, 0, vec![3]),
        )
        .unwrap();

        let ptr = FieldPtr::from_raw(dic.entries().entry(e).unwrap()[0]);
        assert_eq!(vec![10, 3, 7], ctx.traversal(0, ptr).collect::<Vec<_>>());

        let mut trav = ctx.traversal(0, ptr);
        assert_eq!(3, trav.remaining());
        assert!(f.matches_any(&mut trav));
        assert_eq!(1, trav.remaining());
        assert_eq!(Some(7), trav.next());

        let mut out = [0u64; 1];
        f.apply(&ctx, e, dic.entries().entry(e).unwrap(), &mut out);
        assert_eq!([1], out);
    }

    #[test]
    fn test_match_any_dic_apply() {
        let dic = list_dic();
        let tags = dic.fields().get(1).unwrap();
        let y = tags.strings().position_of("y").unwrap();
        let extra = ExtraNodesContext::new();
        let ctx = PrimitiveFeatureContext::new(&extra, dic.fields());
        let f = PrimitiveFeatureImpl::initialize(
            &ctx,
            &PrimitiveFeature::match_any_dic("has_y", 0, 1, vec![y]),
        )
        .unwrap();

        let mut out = [0u64; 1];
        f.apply(&ctx, EntryPtr::Dic(1), dic.entries().row(1).unwrap(), &mut out);
        assert_eq!([1], out);
        f.apply(&ctx, EntryPtr::Dic(0), dic.entries().row(0).unwrap(), &mut out);
        assert_eq!([0], out);
    }

    #[test]
    fn test_match_any_dic_rejects_string_column() {
        let dic = list_dic();
        let extra = ExtraNodesContext::new();
        let ctx = PrimitiveFeatureContext::new(&extra, dic.fields());
        let err = PrimitiveFeatureImpl::initialize(
            &ctx,
            &PrimitiveFeature::match_any_dic("m", 0, 0, vec![1]),
        )
        .unwrap_err();
        assert!(err.is_invalid_state());
    }

    #[test]
    fn test_length() {
        let dic = list_dic();
        let extra = ExtraNodesContext::new();
        let ctx = PrimitiveFeatureContext::new(&extra, dic.fields());
        let surface_len =
            PrimitiveFeatureImpl::initialize(&ctx, &PrimitiveFeature::length("sl", 0, 0)).unwrap();
        let tags_len =
            PrimitiveFeatureImpl::initialize(&ctx, &PrimitiveFeature::length("tl", 1, 1)).unwrap();

        let mut out = [u64::MAX; 2];
        let row = dic.entries().row(0).unwrap();
        surface_len.apply(&ctx, EntryPtr::Dic(0), row, &mut out);
        tags_len.apply(&ctx, EntryPtr::Dic(0), row, &mut out);
        assert_eq!([3, 0], out);
    }

    #[test]
    fn test_length_of_extra_node() {
        let dic = list_dic();
        let mut extra = ExtraNodesContext::new();
        let surface = extra.intern_string("ゆらぎ").unwrap();
        let unk = extra.make_unknown(vec![surface.to_raw(), 0], [0; 4]).unwrap();
        let ctx = PrimitiveFeatureContext::new(&extra, dic.fields());
        let f =
            PrimitiveFeatureImpl::initialize(&ctx, &PrimitiveFeature::length("sl", 0, 0)).unwrap();

        let mut out = [0u64; 1];
        let row = extra.node(unk).unwrap().entry();
        f.apply(&ctx, unk, row, &mut out);
        assert_eq!([3], out);
    }

    #[test]
    fn test_length_rejects_int_column() {
        let dic = int_dic();
        let extra = ExtraNodesContext::new();
        let ctx = PrimitiveFeatureContext::new(&extra, dic.fields());
        let err = PrimitiveFeatureImpl::initialize(&ctx, &PrimitiveFeature::length("l", 0, 0))
            .unwrap_err();
        assert!(err.is_invalid_state());
    }

    #[test]
    fn test_provided() {
        let dic = int_dic();
        let mut extra = ExtraNodesContext::new();
        let unk = extra.make_unknown(vec![0, 0, 0], [11, 12, 13, 14]).unwrap();
        let ctx = PrimitiveFeatureContext::new(&extra, dic.fields());
        let f =
            PrimitiveFeatureImpl::initialize(&ctx, &PrimitiveFeature::provided("p", 0, 1)).unwrap();
        assert_eq!(0, f.feature_index());

        let mut out = [0u64; 1];
        f.apply(&ctx, unk, &[0, 0, 0], &mut out);
        assert_eq!([12], out);
        f.apply(&ctx, EntryPtr::Dic(0), &[7, 2, 9], &mut out);
        assert_eq!([0], out);

        assert!(
            PrimitiveFeatureImpl::initialize(&ctx, &PrimitiveFeature::provided("p", 0, 4)).is_err()
        );
    }
}

//! 概率图谱二值化.

use ndarray::{Array3, ArrayView3};

use crate::config::check_threshold;
use crate::{RoiResult, Volume};

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use ndarray::Axis;
        use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};
    }
}

/// 单体素判定: 严格大于阈值为 `1.0`, 否则 (含 NaN) 为 `0.0`.
#[inline]
fn above(p: f32, threshold: f32) -> f32 {
    if p > threshold {
        1.0
    } else {
        0.0
    }
}

/// 以 `threshold` 二值化概率图谱 `atlas`.
///
/// 概率 **严格大于** 阈值的体素为 `1.0`, 其余为 `0.0`. 恰好等于阈值的体素不被包含.
/// 该操作是纯逐元素比较, 不做重采样或排除.
///
/// `threshold` 不在 `[0, 1]` 内时返回 `Err(RoiError::InvalidThreshold)`.
pub fn threshold_atlas(atlas: ArrayView3<f32>, threshold: f32) -> RoiResult<Array3<f32>> {
    check_threshold(threshold)?;
    Ok(atlas.mapv(|p| above(p, threshold)))
}

/// 借助 `rayon`, 按 `i` 轴切片并行地以 `threshold` 二值化概率图谱 `atlas`.
/// 结果与 [`threshold_atlas`] 完全一致.
#[cfg(feature = "rayon")]
pub fn par_threshold_atlas(atlas: ArrayView3<f32>, threshold: f32) -> RoiResult<Array3<f32>> {
    check_threshold(threshold)?;
    let mut ans = Array3::<f32>::zeros(atlas.raw_dim());
    ans.axis_iter_mut(Axis(0))
        .into_par_iter()
        .zip(atlas.axis_iter(Axis(0)).into_par_iter())
        .for_each(|(mut dst, src)| {
            dst.zip_mut_with(&src, |d, &p| *d = above(p, threshold));
        });
    Ok(ans)
}

/// 二值化体数据 `atlas`, 并保留其 header 与仿射.
pub fn binarize(atlas: &Volume, threshold: f32) -> RoiResult<Volume> {
    atlas.with_data(threshold_atlas(atlas.data(), threshold)?)
}
